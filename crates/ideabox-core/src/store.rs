//! Stage store: three directories that partition every idea folder.
//!
//! ```text
//! ideas/
//!   backlog/<id>/idea.md
//!   active/<id>/idea.md
//!   done/<id>/idea.md
//! ```
//!
//! All writes from one process are serialized through a single mutex. A stage
//! change is a directory rename followed by an atomic rewrite of the metadata
//! document; if the rewrite fails the rename is undone.

use crate::config::Config;
use crate::error::{ConflictError, IdeaError, Result, SchemaError};
use crate::io;
use crate::paths;
use crate::record::IdeaRecord;
use crate::types::Stage;
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};
use tracing::{debug, error};

/// A record together with the stage its folder lives in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StoredIdea {
    pub stage: Stage,
    #[serde(flatten)]
    pub record: IdeaRecord,
}

/// One folder found while scanning, parsed or not.
#[derive(Debug, Clone)]
pub struct ScanEntry {
    pub stage: Stage,
    pub id: String,
    pub record: std::result::Result<IdeaRecord, SchemaError>,
}

#[derive(Debug)]
pub struct StageStore {
    root: PathBuf,
    areas: Vec<String>,
    lock: Mutex<()>,
}

impl StageStore {
    /// Create the stage directories and a default config. Idempotent.
    pub fn init(root: &Path) -> Result<Config> {
        for &stage in Stage::all() {
            io::ensure_dir(&paths::stage_dir(root, stage))?;
        }
        let config_path = paths::config_path(root);
        if config_path.exists() {
            return Config::load(root);
        }
        let config = Config::default();
        config.save(root)?;
        Ok(config)
    }

    pub fn open(root: &Path, config: &Config) -> Result<Self> {
        if !paths::ideas_dir(root).is_dir() {
            return Err(IdeaError::NotInitialized);
        }
        Ok(Self {
            root: root.to_path_buf(),
            areas: config.areas.clone(),
            lock: Mutex::new(()),
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn areas(&self) -> &[String] {
        &self.areas
    }

    pub fn idea_dir(&self, stage: Stage, id: &str) -> PathBuf {
        paths::idea_dir(&self.root, stage, id)
    }

    fn guard(&self) -> MutexGuard<'_, ()> {
        // The guarded data is `()`, so a poisoned lock carries no broken state.
        self.lock.lock().unwrap_or_else(|e| e.into_inner())
    }

    // -----------------------------------------------------------------------
    // Reads
    // -----------------------------------------------------------------------

    /// Visible folder names in `stage`, sorted, each flagged with whether it
    /// holds a metadata document.
    fn folders(&self, stage: Stage) -> Result<Vec<(String, bool)>> {
        let dir = paths::stage_dir(&self.root, stage);
        if !dir.exists() {
            return Ok(Vec::new());
        }
        let mut folders = Vec::new();
        for entry in std::fs::read_dir(&dir)? {
            let entry = entry?;
            if !entry.file_type()?.is_dir() {
                continue;
            }
            let name = entry.file_name().to_string_lossy().into_owned();
            if name.starts_with('.') {
                continue;
            }
            let has_metadata = entry.path().join(paths::METADATA_FILE).is_file();
            folders.push((name, has_metadata));
        }
        folders.sort();
        Ok(folders)
    }

    /// Folder names in `stage` that hold a metadata document, sorted.
    pub fn ids(&self, stage: Stage) -> Result<Vec<String>> {
        Ok(self
            .folders(stage)?
            .into_iter()
            .filter_map(|(name, has_metadata)| has_metadata.then_some(name))
            .collect())
    }

    /// Folders in any stage that have no metadata document.
    pub fn orphans(&self) -> Result<Vec<(Stage, String)>> {
        let mut out = Vec::new();
        for &stage in Stage::all() {
            for (name, has_metadata) in self.folders(stage)? {
                if !has_metadata {
                    out.push((stage, name));
                }
            }
        }
        Ok(out)
    }

    /// Every id in every stage. An id present in two stages keeps the first.
    pub fn all_ids(&self) -> Result<BTreeMap<String, Stage>> {
        let mut out = BTreeMap::new();
        for &stage in Stage::all() {
            for id in self.ids(stage)? {
                out.entry(id).or_insert(stage);
            }
        }
        Ok(out)
    }

    pub fn contains(&self, stage: Stage, id: &str) -> bool {
        paths::metadata_path(&self.root, stage, id).is_file()
    }

    /// Stages whose partition holds `id`. More than one means corruption.
    pub fn locate(&self, id: &str) -> Vec<Stage> {
        Stage::all()
            .iter()
            .copied()
            .filter(|&stage| self.contains(stage, id))
            .collect()
    }

    /// First stage holding a folder named `id`, metadata or not.
    fn occupied(&self, id: &str) -> Option<Stage> {
        Stage::all()
            .iter()
            .copied()
            .find(|&stage| self.idea_dir(stage, id).exists())
    }

    fn read(&self, stage: Stage, id: &str) -> Result<IdeaRecord> {
        let path = paths::metadata_path(&self.root, stage, id);
        let content = std::fs::read_to_string(&path)?;
        IdeaRecord::from_document(id, &content, &self.areas)
            .map_err(|source| IdeaError::Malformed { path, source })
    }

    pub fn load(&self, stage: Stage, id: &str) -> Result<IdeaRecord> {
        if !self.contains(stage, id) {
            return Err(IdeaError::NotFound(id.to_string()));
        }
        self.read(stage, id)
    }

    /// Records in one stage, in folder-name order. Fails on the first
    /// malformed document; use [`StageStore::scan`] to see them all.
    pub fn list(&self, stage: Stage) -> Result<Vec<IdeaRecord>> {
        self.ids(stage)?
            .iter()
            .map(|id| self.read(stage, id))
            .collect()
    }

    /// Look an id up across all stages.
    pub fn get(&self, id: &str) -> Result<StoredIdea> {
        paths::validate_id(id)?;
        match self.locate(id).as_slice() {
            [] => Err(IdeaError::NotFound(id.to_string())),
            [stage] => Ok(StoredIdea {
                stage: *stage,
                record: self.read(*stage, id)?,
            }),
            stages => Err(IdeaError::Integrity {
                id: id.to_string(),
                warnings: vec![crate::query::IntegrityWarning::DuplicateId {
                    id: id.to_string(),
                    stages: stages.to_vec(),
                }],
            }),
        }
    }

    /// Every folder in every stage, keeping parse failures instead of stopping.
    pub fn scan(&self) -> Result<Vec<ScanEntry>> {
        let mut entries = Vec::new();
        for &stage in Stage::all() {
            for id in self.ids(stage)? {
                let record = match self.read(stage, &id) {
                    Ok(record) => Ok(record),
                    Err(IdeaError::Malformed { source, .. }) => Err(source),
                    Err(e) => return Err(e),
                };
                entries.push(ScanEntry { stage, id, record });
            }
        }
        Ok(entries)
    }

    // -----------------------------------------------------------------------
    // Writes
    // -----------------------------------------------------------------------

    /// Write a new record into the stage its status names. Any existing
    /// folder with the same name, even one without metadata, is a collision.
    pub fn insert(&self, record: &IdeaRecord) -> Result<StoredIdea> {
        paths::validate_id(&record.id)?;
        let stage = record.status.stage();
        let doc = record.to_document()?;

        let _guard = self.guard();
        if let Some(existing) = self.occupied(&record.id) {
            return Err(ConflictError::DestinationCollision {
                id: record.id.clone(),
                to: existing,
            }
            .into());
        }
        let dir = self.idea_dir(stage, &record.id);
        io::ensure_dir(&dir)?;
        io::atomic_write(&dir.join(paths::METADATA_FILE), doc.as_bytes())?;
        debug!(id = %record.id, %stage, "inserted idea");
        Ok(StoredIdea {
            stage,
            record: record.clone(),
        })
    }

    /// Read-modify-write a record without changing its stage.
    pub fn update<F>(&self, stage: Stage, id: &str, mutate: F) -> Result<IdeaRecord>
    where
        F: FnOnce(&mut IdeaRecord) -> Result<()>,
    {
        let _guard = self.guard();
        if !self.contains(stage, id) {
            return Err(ConflictError::AlreadyMoved {
                id: id.to_string(),
                from: stage,
            }
            .into());
        }
        let mut record = self.read(stage, id)?;
        let created = record.created;
        mutate(&mut record)?;
        debug_assert_eq!(record.created, created, "created is immutable");
        debug_assert_eq!(record.id, id, "id is stable");

        let doc = record.to_document()?;
        io::atomic_write(&paths::metadata_path(&self.root, stage, id), doc.as_bytes())?;
        debug!(id, %stage, "rewrote idea metadata");
        Ok(record)
    }

    /// Move `id` from one stage to another, applying `mutate` to its metadata.
    ///
    /// Either the folder ends up in `to` with the mutated metadata and every
    /// artifact in place, or it stays in `from` untouched. `mutate` runs under
    /// the store lock, so checks it makes cannot be invalidated by another
    /// call into this store.
    pub fn move_atomic<F>(&self, id: &str, from: Stage, to: Stage, mutate: F) -> Result<IdeaRecord>
    where
        F: FnOnce(&mut IdeaRecord) -> Result<()>,
    {
        self.move_with(id, from, to, mutate, io::atomic_write)
    }

    /// `move_atomic` with the metadata writer supplied by the caller.
    fn move_with<F, W>(
        &self,
        id: &str,
        from: Stage,
        to: Stage,
        mutate: F,
        write: W,
    ) -> Result<IdeaRecord>
    where
        F: FnOnce(&mut IdeaRecord) -> Result<()>,
        W: FnOnce(&Path, &[u8]) -> Result<()>,
    {
        let _guard = self.guard();

        if !self.contains(from, id) {
            return Err(ConflictError::AlreadyMoved {
                id: id.to_string(),
                from,
            }
            .into());
        }
        let dst = self.idea_dir(to, id);
        if dst.exists() {
            return Err(ConflictError::DestinationCollision {
                id: id.to_string(),
                to,
            }
            .into());
        }

        let mut record = self.read(from, id)?;
        let created = record.created;
        mutate(&mut record)?;
        debug_assert_eq!(record.created, created, "created is immutable");
        let doc = record.to_document()?;

        let src = self.idea_dir(from, id);
        io::rename_dir(&src, &dst)?;

        if let Err(e) = write(&dst.join(paths::METADATA_FILE), doc.as_bytes()) {
            if let Err(undo) = io::rename_dir(&dst, &src) {
                error!(id, %from, %to, error = %undo, "failed to roll back stage move");
            }
            return Err(e);
        }

        debug!(id, %from, %to, "moved idea");
        Ok(record)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
