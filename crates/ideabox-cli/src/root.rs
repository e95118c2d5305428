use ideabox_core::paths;
use std::path::{Path, PathBuf};

/// Resolve the directory that holds (or will hold) `ideas/`.
///
/// Priority:
/// 1. `--root` flag / `IDEABOX_ROOT` env var (passed in as `explicit`)
/// 2. Walk upward from `cwd` looking for `ideas/config.yaml`
/// 3. Walk upward from `cwd` looking for `.git/`
/// 4. Fall back to `cwd`
pub fn resolve_root(explicit: Option<&Path>) -> PathBuf {
    if let Some(p) = explicit {
        return p.to_path_buf();
    }
    let cwd = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
    find_root_from(&cwd)
}

fn find_root_from(start: &Path) -> PathBuf {
    let has_config = |dir: &Path| dir.join(paths::CONFIG_FILE).is_file();
    if let Some(dir) = start.ancestors().find(|d| has_config(d)) {
        return dir.to_path_buf();
    }
    if let Some(dir) = start.ancestors().find(|d| d.join(".git").is_dir()) {
        return dir.to_path_buf();
    }
    start.to_path_buf()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn explicit_root_wins() {
        let dir = TempDir::new().unwrap();
        let result = resolve_root(Some(dir.path()));
        assert_eq!(result, dir.path());
    }

    #[test]
    fn finds_ideas_config_above_cwd() {
        let dir = TempDir::new().unwrap();
        std::fs::create_dir_all(dir.path().join("ideas")).unwrap();
        std::fs::write(dir.path().join("ideas/config.yaml"), "version: 1\n").unwrap();
        let subdir = dir.path().join("src/deep");
        std::fs::create_dir_all(&subdir).unwrap();

        assert_eq!(find_root_from(&subdir), dir.path());
    }

    #[test]
    fn falls_back_to_git_root() {
        let dir = TempDir::new().unwrap();
        std::fs::create_dir_all(dir.path().join(".git")).unwrap();
        let subdir = dir.path().join("a/b");
        std::fs::create_dir_all(&subdir).unwrap();

        assert_eq!(find_root_from(&subdir), dir.path());
    }
}
