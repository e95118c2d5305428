//! Opaque files that live next to an idea's metadata document.
//!
//! The store moves whole folders, so artifacts travel with their idea without
//! being opened. These helpers only list, read and add them.

use crate::error::{IdeaError, Result};
use crate::paths;
use crate::record::IdeaRecord;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArtifactMeta {
    pub filename: String,
    pub size_bytes: u64,
    pub modified_at: DateTime<Utc>,
}

/// Reject filenames that could escape the idea folder or shadow its metadata.
pub fn validate_artifact_filename(filename: &str) -> Result<()> {
    if filename.is_empty()
        || filename.contains('/')
        || filename.contains('\\')
        || filename.contains("..")
        || filename.contains('\0')
        || filename == paths::METADATA_FILE
    {
        return Err(IdeaError::InvalidArtifactFilename(filename.to_string()));
    }
    Ok(())
}

/// List files in an idea folder, skipping the metadata document and subdirectories.
pub fn list_artifacts(dir: &Path) -> Result<Vec<ArtifactMeta>> {
    let mut artifacts = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        let name = entry.file_name().to_string_lossy().into_owned();
        if name == paths::METADATA_FILE || entry.file_type()?.is_dir() {
            continue;
        }
        let meta = entry.metadata()?;
        let modified_at = meta
            .modified()
            .map(DateTime::<Utc>::from)
            .unwrap_or_else(|_| Utc::now());
        artifacts.push(ArtifactMeta {
            filename: name,
            size_bytes: meta.len(),
            modified_at,
        });
    }
    artifacts.sort_by(|a, b| a.filename.cmp(&b.filename));
    Ok(artifacts)
}

pub fn read_artifact(dir: &Path, filename: &str) -> Result<Vec<u8>> {
    validate_artifact_filename(filename)?;
    let path = dir.join(filename);
    if !path.is_file() {
        return Err(IdeaError::ArtifactNotFound(filename.to_string()));
    }
    Ok(std::fs::read(&path)?)
}

/// Add a new artifact. Existing files are never overwritten.
pub fn write_new_artifact(dir: &Path, filename: &str, data: &[u8]) -> Result<()> {
    validate_artifact_filename(filename)?;
    let path = dir.join(filename);
    if path.exists() {
        return Err(IdeaError::ArtifactExists(filename.to_string()));
    }
    crate::io::atomic_write(&path, data)
}

/// Blank requirements document attached on promotion.
pub fn requirements_template(record: &IdeaRecord) -> String {
    format!(
        "# {title}: Requirements\n\n\
         - Idea: `{id}`\n\
         - Area: {area}\n\n\
         ## Problem\n\n\
         ## Requirements\n\n\
         ## Acceptance criteria\n\n\
         ## Out of scope\n",
        title = record.title,
        id = record.id,
        area = record.area,
    )
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
