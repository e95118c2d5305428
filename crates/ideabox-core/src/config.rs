use crate::error::{IdeaError, Result};
use crate::paths;
use crate::record::EditField;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;

// ---------------------------------------------------------------------------
// ConfigWarning / WarnLevel
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigWarning {
    pub level: WarnLevel,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WarnLevel {
    Warning,
    Error,
}

// ---------------------------------------------------------------------------
// LifecycleConfig
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LifecycleConfig {
    /// Refuse to promote straight from `idea`; otherwise it is allowed with an advisory.
    #[serde(default)]
    pub require_ready: bool,
    /// At most one active idea per area.
    #[serde(default)]
    pub exclusive_area: bool,
    /// Fields that stay editable while an idea is active.
    #[serde(default = "default_active_editable")]
    pub active_editable: Vec<EditField>,
}

fn default_active_editable() -> Vec<EditField> {
    vec![EditField::AppendFiles]
}

impl Default for LifecycleConfig {
    fn default() -> Self {
        Self {
            require_ready: false,
            exclusive_area: false,
            active_editable: default_active_editable(),
        }
    }
}

// ---------------------------------------------------------------------------
// RequirementsConfig
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RequirementsConfig {
    #[serde(default = "default_generate")]
    pub generate: bool,
    #[serde(default = "default_requirements_filename")]
    pub filename: String,
}

fn default_generate() -> bool {
    true
}

fn default_requirements_filename() -> String {
    "PRD.md".to_string()
}

impl Default for RequirementsConfig {
    fn default() -> Self {
        Self {
            generate: default_generate(),
            filename: default_requirements_filename(),
        }
    }
}

// ---------------------------------------------------------------------------
// Config
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default = "default_version")]
    pub version: u32,
    #[serde(default = "default_areas")]
    pub areas: Vec<String>,
    #[serde(default)]
    pub lifecycle: LifecycleConfig,
    #[serde(default)]
    pub requirements: RequirementsConfig,
}

fn default_version() -> u32 {
    1
}

fn default_areas() -> Vec<String> {
    ["footer", "input", "header", "global", "model-selector"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            version: default_version(),
            areas: default_areas(),
            lifecycle: LifecycleConfig::default(),
            requirements: RequirementsConfig::default(),
        }
    }
}

impl Config {
    pub fn load(root: &Path) -> Result<Self> {
        let path = paths::config_path(root);
        if !path.exists() {
            return Err(IdeaError::NotInitialized);
        }
        let data = std::fs::read_to_string(&path)?;
        let cfg: Config = serde_yaml::from_str(&data)?;
        Ok(cfg)
    }

    pub fn save(&self, root: &Path) -> Result<()> {
        let path = paths::config_path(root);
        let data = serde_yaml::to_string(self)?;
        crate::io::atomic_write(&path, data.as_bytes())
    }

    pub fn has_area(&self, area: &str) -> bool {
        self.areas.iter().any(|a| a == area)
    }

    // -----------------------------------------------------------------------
    // Validation
    // -----------------------------------------------------------------------

    pub fn validate(&self) -> Vec<ConfigWarning> {
        let mut warnings = Vec::new();

        if self.areas.is_empty() {
            warnings.push(ConfigWarning {
                level: WarnLevel::Error,
                message: "area vocabulary is empty: no idea can be created".to_string(),
            });
        }

        let mut seen = HashSet::new();
        for area in &self.areas {
            if !seen.insert(area.as_str()) {
                warnings.push(ConfigWarning {
                    level: WarnLevel::Warning,
                    message: format!("area '{area}' is listed more than once"),
                });
            }
            if paths::normalize_id(area) != *area {
                warnings.push(ConfigWarning {
                    level: WarnLevel::Warning,
                    message: format!(
                        "area '{area}' is not lowercase-hyphenated (expected '{}')",
                        paths::normalize_id(area)
                    ),
                });
            }
        }

        let filename = &self.requirements.filename;
        if crate::artifact::validate_artifact_filename(filename).is_err() {
            warnings.push(ConfigWarning {
                level: WarnLevel::Error,
                message: format!("requirements filename '{filename}' is not a valid artifact name"),
            });
        }

        if self
            .lifecycle
            .active_editable
            .contains(&EditField::Title)
        {
            warnings.push(ConfigWarning {
                level: WarnLevel::Warning,
                message: "title is editable while active; the id will no longer match it"
                    .to_string(),
            });
        }

        warnings
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
