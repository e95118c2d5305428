use crate::error::{IdeaError, Result};
use crate::types::Stage;
use regex::Regex;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

// ---------------------------------------------------------------------------
// Directory constants
// ---------------------------------------------------------------------------

pub const IDEAS_DIR: &str = "ideas";
pub const CONFIG_FILE: &str = "ideas/config.yaml";
pub const METADATA_FILE: &str = "idea.md";

const MAX_ID_LEN: usize = 96;

// ---------------------------------------------------------------------------
// Path helpers
// ---------------------------------------------------------------------------

pub fn ideas_dir(root: &Path) -> PathBuf {
    root.join(IDEAS_DIR)
}

pub fn stage_dir(root: &Path, stage: Stage) -> PathBuf {
    ideas_dir(root).join(stage.as_str())
}

pub fn idea_dir(root: &Path, stage: Stage, id: &str) -> PathBuf {
    stage_dir(root, stage).join(id)
}

pub fn metadata_path(root: &Path, stage: Stage, id: &str) -> PathBuf {
    idea_dir(root, stage, id).join(METADATA_FILE)
}

pub fn config_path(root: &Path) -> PathBuf {
    root.join(CONFIG_FILE)
}

// ---------------------------------------------------------------------------
// Ids
// ---------------------------------------------------------------------------

static ID_RE: OnceLock<Regex> = OnceLock::new();
static SEPARATOR_RE: OnceLock<Regex> = OnceLock::new();

fn id_re() -> &'static Regex {
    ID_RE.get_or_init(|| Regex::new(r"^[a-z0-9]+(-[a-z0-9]+)*$").unwrap())
}

fn separator_re() -> &'static Regex {
    SEPARATOR_RE.get_or_init(|| Regex::new(r"[^a-z0-9]+").unwrap())
}

/// Derive an id from a title: lower-case, collapse every run of characters
/// outside `[a-z0-9]` into a single `-`, trim separators from both ends.
///
/// Ids are ASCII-only folder names, so non-ASCII letters act as separators:
/// "Café Themes" becomes `caf-themes`. Returns an empty string when the title
/// has no ASCII alphanumerics; validation then rejects it.
pub fn normalize_id(title: &str) -> String {
    let lower = title.to_lowercase();
    let id = separator_re().replace_all(&lower, "-");
    let id = id.trim_matches('-');
    if id.len() <= MAX_ID_LEN {
        return id.to_string();
    }
    id[..MAX_ID_LEN].trim_end_matches('-').to_string()
}

pub fn validate_id(id: &str) -> Result<()> {
    if id.is_empty() || id.len() > MAX_ID_LEN || !id_re().is_match(id) {
        return Err(IdeaError::InvalidId(id.to_string()));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
