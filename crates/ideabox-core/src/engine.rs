//! Lifecycle engine: the only place stage transitions happen.
//!
//! ```text
//! idea ──▶ ready ──▶ active ──▶ done
//!   └──────────────▲   │
//!                      ▼
//!                    ready   (park)
//! ```
//!
//! Every mutating operation first refuses records that carry an integrity
//! warning, then re-checks its precondition inside the store lock.

use crate::artifact::{self, ArtifactMeta};
use crate::config::Config;
use crate::error::{IdeaError, Result, SchemaError};
use crate::io;
use crate::paths;
use crate::query::{IntegrityWarning, ListFilter, Query};
use crate::record::{self, EditField, IdeaRecord, IdeaUpdate, RawMetadata, ValidationContext};
use crate::store::{StageStore, StoredIdea};
use crate::types::{Stage, Status};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_yaml::Value;
use std::fmt;
use std::path::Path;
use tracing::{info, warn};

// ---------------------------------------------------------------------------
// Advisory
// ---------------------------------------------------------------------------

/// Non-blocking notes attached to a successful transition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Advisory {
    PromotedFromIdea { id: String },
    MissingDependency { id: String, dependency: String },
    UnfinishedDependency {
        id: String,
        dependency: String,
        status: Status,
    },
    UnreadableDependency { id: String, dependency: String },
    RequirementsCreated { filename: String },
    RequirementsNotCreated { filename: String, reason: String },
}

impl fmt::Display for Advisory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Advisory::PromotedFromIdea { id } => {
                write!(f, "{id} was promoted without being marked ready")
            }
            Advisory::MissingDependency { id, dependency } => {
                write!(f, "{id} depends on '{dependency}', which does not exist")
            }
            Advisory::UnfinishedDependency {
                id,
                dependency,
                status,
            } => write!(f, "{id} depends on '{dependency}', which is still {status}"),
            Advisory::UnreadableDependency { id, dependency } => {
                write!(f, "{id} depends on '{dependency}', which cannot be read")
            }
            Advisory::RequirementsCreated { filename } => {
                write!(f, "created blank requirements document {filename}")
            }
            Advisory::RequirementsNotCreated { filename, reason } => {
                write!(f, "could not create {filename}: {reason}")
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Transition / RepairStrategy / IdeaDetail
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize)]
pub struct Transition {
    pub from: Stage,
    pub to: Stage,
    pub record: IdeaRecord,
    pub advisories: Vec<Advisory>,
}

/// Which side of a status/stage mismatch is authoritative.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RepairStrategy {
    /// Rewrite `status` to fit the folder's stage.
    TrustStage,
    /// Move the folder to the stage `status` names.
    TrustStatus,
}

impl std::str::FromStr for RepairStrategy {
    type Err = SchemaError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "stage" | "trust_stage" => Ok(RepairStrategy::TrustStage),
            "status" | "trust_status" => Ok(RepairStrategy::TrustStatus),
            other => Err(SchemaError::invalid_enum("trust", other, &["stage", "status"])),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct IdeaDetail {
    #[serde(flatten)]
    pub idea: StoredIdea,
    pub artifacts: Vec<ArtifactMeta>,
}

// ---------------------------------------------------------------------------
// Engine
// ---------------------------------------------------------------------------

pub struct Engine {
    store: StageStore,
    config: Config,
}

fn invalid_transition(id: &str, status: Status, operation: &str) -> IdeaError {
    IdeaError::InvalidTransition {
        id: id.to_string(),
        status,
        operation: operation.to_string(),
    }
}

fn require_status(record: &IdeaRecord, expected: Status, operation: &str) -> Result<()> {
    if record.status != expected {
        return Err(invalid_transition(&record.id, record.status, operation));
    }
    Ok(())
}

impl Engine {
    pub fn open(root: &Path) -> Result<Self> {
        let config = Config::load(root)?;
        let store = StageStore::open(root, &config)?;
        Ok(Self::new(store, config))
    }

    pub fn new(store: StageStore, config: Config) -> Self {
        Self { store, config }
    }

    pub fn store(&self) -> &StageStore {
        &self.store
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn query(&self) -> Query<'_> {
        Query::new(&self.store)
    }

    // -----------------------------------------------------------------------
    // Reads
    // -----------------------------------------------------------------------

    pub fn list(&self, filter: &ListFilter) -> Result<Vec<StoredIdea>> {
        self.query().list(filter)
    }

    pub fn show(&self, id: &str) -> Result<IdeaDetail> {
        let idea = self.store.get(id)?;
        let artifacts = artifact::list_artifacts(&self.store.idea_dir(idea.stage, id))?;
        Ok(IdeaDetail { idea, artifacts })
    }

    pub fn find_inconsistent(&self) -> Result<Vec<IntegrityWarning>> {
        self.query().find_inconsistent()
    }

    // -----------------------------------------------------------------------
    // Creation
    // -----------------------------------------------------------------------

    pub fn create(&self, fields: &RawMetadata) -> Result<StoredIdea> {
        self.create_on(fields, chrono::Local::now().date_naive())
    }

    /// Validate `fields` and write a new record into the backlog.
    /// `status` defaults to `idea`; only backlog statuses are accepted.
    pub fn create_on(&self, fields: &RawMetadata, today: NaiveDate) -> Result<StoredIdea> {
        let mut raw = fields.clone();
        if matches!(raw.get("status"), None | Some(Value::Null)) {
            raw.insert(
                Value::String("status".to_string()),
                Value::String(Status::Idea.as_str().to_string()),
            );
        }

        let existing = self.store.all_ids()?;
        let ctx = ValidationContext {
            areas: &self.config.areas,
            existing: &existing,
            today: Some(today),
        };
        let record = record::validate(&raw, &ctx)?;
        if record.status.stage() != Stage::Backlog {
            return Err(SchemaError::invalid_enum(
                "status",
                record.status.as_str(),
                &[Status::Idea.as_str(), Status::Ready.as_str()],
            )
            .into());
        }

        let stored = self.store.insert(&record)?;
        info!(id = %stored.record.id, area = %stored.record.area, "created idea");
        Ok(stored)
    }

    // -----------------------------------------------------------------------
    // Transitions
    // -----------------------------------------------------------------------

    /// Backlog `idea` → `ready`.
    pub fn mark_ready(&self, id: &str) -> Result<IdeaRecord> {
        let current = self.current(id)?;
        require_status(&current.record, Status::Idea, "mark ready")?;
        let record = self.store.update(Stage::Backlog, id, |r| {
            require_status(r, Status::Idea, "mark ready")?;
            r.status = Status::Ready;
            Ok(())
        })?;
        info!(id, "marked idea ready");
        Ok(record)
    }

    /// Backlog → active. Without an id, the single `ready` idea is chosen.
    pub fn promote(&self, id: Option<&str>) -> Result<Transition> {
        let id = self.target(id, "promote", Stage::Backlog, Status::Ready)?;
        let current = self.current(&id)?;

        let mut advisories = Vec::new();
        match current.record.status {
            Status::Ready => {}
            Status::Idea if !self.config.lifecycle.require_ready => {
                warn!(id = %id, "promoting an idea that was never marked ready");
                advisories.push(Advisory::PromotedFromIdea { id: id.clone() });
            }
            status => return Err(invalid_transition(&id, status, "promote")),
        }

        if self.config.lifecycle.exclusive_area {
            self.check_area_free(&current.record)?;
        }
        advisories.extend(self.dependency_advisories(&current.record));

        let record = self
            .store
            .move_atomic(&id, Stage::Backlog, Stage::Active, |r| {
                if !matches!(r.status, Status::Idea | Status::Ready) {
                    return Err(invalid_transition(&r.id, r.status, "promote"));
                }
                r.status = Status::Active;
                Ok(())
            })?;

        advisories.extend(self.attach_requirements(&record));
        info!(id = %id, "promoted idea to active");
        Ok(Transition {
            from: Stage::Backlog,
            to: Stage::Active,
            record,
            advisories,
        })
    }

    /// Active → backlog with status `ready`. Artifacts stay with the folder.
    pub fn park(&self, id: Option<&str>) -> Result<Transition> {
        self.leave_active(id, "park", Stage::Backlog, Status::Ready)
    }

    /// Active → done. Done is terminal.
    pub fn complete(&self, id: Option<&str>) -> Result<Transition> {
        self.leave_active(id, "complete", Stage::Done, Status::Done)
    }

    fn leave_active(
        &self,
        id: Option<&str>,
        operation: &str,
        to: Stage,
        status: Status,
    ) -> Result<Transition> {
        let id = self.target(id, operation, Stage::Active, Status::Active)?;
        let current = self.current(&id)?;
        require_status(&current.record, Status::Active, operation)?;

        let record = self.store.move_atomic(&id, Stage::Active, to, |r| {
            require_status(r, Status::Active, operation)?;
            r.status = status;
            Ok(())
        })?;
        info!(id = %id, %to, "{operation} succeeded");
        Ok(Transition {
            from: Stage::Active,
            to,
            record,
            advisories: Vec::new(),
        })
    }

    // -----------------------------------------------------------------------
    // Edits
    // -----------------------------------------------------------------------

    /// Apply field updates in place. Backlog records take any update; active
    /// records only the configured allow-list; done records none.
    pub fn edit(&self, id: &str, update: &IdeaUpdate) -> Result<IdeaRecord> {
        let current = self.current(id)?;
        let fields = update.fields();
        self.check_editable(&current.record, &fields)?;
        if fields.is_empty() {
            return Ok(current.record);
        }

        let areas = &self.config.areas;
        let record = self.store.update(current.stage, id, |r| {
            self.check_editable(r, &fields)?;
            update.apply(r, areas)?;
            Ok(())
        })?;
        info!(id, fields = ?fields, "edited idea");
        Ok(record)
    }

    fn check_editable(&self, record: &IdeaRecord, fields: &[EditField]) -> Result<()> {
        let blocked = match record.status {
            Status::Idea | Status::Ready => None,
            Status::Active => fields
                .iter()
                .find(|f| !self.config.lifecycle.active_editable.contains(*f)),
            Status::Done => fields.first(),
        };
        match blocked {
            Some(field) => Err(IdeaError::ImmutableRecord {
                id: record.id.clone(),
                status: record.status,
                field: field.to_string(),
            }),
            None => Ok(()),
        }
    }

    // -----------------------------------------------------------------------
    // Artifacts
    // -----------------------------------------------------------------------

    pub fn attach_artifact(&self, id: &str, filename: &str, data: &[u8]) -> Result<ArtifactMeta> {
        let current = self.current(id)?;
        if current.record.status == Status::Done {
            return Err(IdeaError::ImmutableRecord {
                id: id.to_string(),
                status: Status::Done,
                field: "artifacts".to_string(),
            });
        }
        let dir = self.store.idea_dir(current.stage, id);
        artifact::write_new_artifact(&dir, filename, data)?;
        info!(id, filename, "attached artifact");
        artifact::list_artifacts(&dir)?
            .into_iter()
            .find(|a| a.filename == filename)
            .ok_or_else(|| IdeaError::ArtifactNotFound(filename.to_string()))
    }

    pub fn list_artifacts(&self, id: &str) -> Result<Vec<ArtifactMeta>> {
        let idea = self.store.get(id)?;
        artifact::list_artifacts(&self.store.idea_dir(idea.stage, id))
    }

    pub fn read_artifact(&self, id: &str, filename: &str) -> Result<Vec<u8>> {
        let idea = self.store.get(id)?;
        artifact::read_artifact(&self.store.idea_dir(idea.stage, id), filename)
    }

    // -----------------------------------------------------------------------
    // Repair
    // -----------------------------------------------------------------------

    /// Clear a status/stage mismatch. Duplicates across stages and malformed
    /// metadata need a human.
    pub fn repair(&self, id: &str, strategy: RepairStrategy) -> Result<StoredIdea> {
        paths::validate_id(id)?;
        let warnings = self.query().warnings_for(id)?;

        let mut mismatch = None;
        for warning in &warnings {
            match warning {
                IntegrityWarning::StatusMismatch { stage, status, .. } => {
                    mismatch = Some((*stage, *status));
                }
                IntegrityWarning::DuplicateId { stages, .. } => {
                    return Err(IdeaError::Unrepairable {
                        id: id.to_string(),
                        reason: format!(
                            "present in {} stages; remove all but one folder by hand",
                            stages.len()
                        ),
                    });
                }
                IntegrityWarning::Malformed { error, .. } => {
                    return Err(IdeaError::Unrepairable {
                        id: id.to_string(),
                        reason: format!("fix the metadata by hand: {error}"),
                    });
                }
                IntegrityWarning::Orphaned { stage, .. } => {
                    return Err(IdeaError::Unrepairable {
                        id: id.to_string(),
                        reason: format!(
                            "folder in {stage} has no idea.md; restore it or remove the folder by hand"
                        ),
                    });
                }
            }
        }

        let Some((stage, status)) = mismatch else {
            return self.store.get(id);
        };

        let repaired = match strategy {
            RepairStrategy::TrustStage => {
                let record = self.store.update(stage, id, |r| {
                    r.status = status_for_stage(stage, r.status);
                    Ok(())
                })?;
                StoredIdea { stage, record }
            }
            RepairStrategy::TrustStatus => {
                let to = status.stage();
                let record = self.store.move_atomic(id, stage, to, |_| Ok(()))?;
                StoredIdea { stage: to, record }
            }
        };
        info!(id, stage = %repaired.stage, status = %repaired.record.status, "repaired idea");
        Ok(repaired)
    }

    // -----------------------------------------------------------------------
    // Helpers
    // -----------------------------------------------------------------------

    /// Resolve an explicit id, or the single eligible record when none is given.
    fn target(
        &self,
        id: Option<&str>,
        operation: &str,
        stage: Stage,
        status: Status,
    ) -> Result<String> {
        if let Some(id) = id {
            paths::validate_id(id)?;
            return Ok(id.to_string());
        }
        let candidates: Vec<String> = self
            .query()
            .list(&ListFilter {
                stage: Some(stage),
                status: Some(status),
                area: None,
            })?
            .into_iter()
            .map(|i| i.record.id)
            .collect();
        if candidates.len() > 1 {
            return Err(IdeaError::SelectionRequired {
                operation: operation.to_string(),
                candidates,
            });
        }
        candidates
            .into_iter()
            .next()
            .ok_or_else(|| IdeaError::NothingEligible {
                operation: operation.to_string(),
                status,
            })
    }

    /// Load a record for mutation, refusing it while it carries integrity warnings.
    fn current(&self, id: &str) -> Result<StoredIdea> {
        paths::validate_id(id)?;
        let warnings = self.query().warnings_for(id)?;
        if !warnings.is_empty() {
            warn!(id, count = warnings.len(), "refusing to mutate inconsistent idea");
            return Err(IdeaError::Integrity {
                id: id.to_string(),
                warnings,
            });
        }
        self.store.get(id)
    }

    fn check_area_free(&self, record: &IdeaRecord) -> Result<()> {
        let occupied = self
            .query()
            .list(&ListFilter {
                stage: Some(Stage::Active),
                area: Some(record.area.clone()),
                status: None,
            })?
            .into_iter()
            .find(|i| i.record.id != record.id);
        match occupied {
            Some(other) => Err(IdeaError::AreaOccupied {
                area: record.area.clone(),
                active: other.record.id,
            }),
            None => Ok(()),
        }
    }

    fn dependency_advisories(&self, record: &IdeaRecord) -> Vec<Advisory> {
        let mut out = Vec::new();
        for dep in &record.depends_on {
            let advisory = match self.store.get(dep) {
                Ok(found) if found.record.status == Status::Done => continue,
                Ok(found) => Advisory::UnfinishedDependency {
                    id: record.id.clone(),
                    dependency: dep.clone(),
                    status: found.record.status,
                },
                Err(IdeaError::NotFound(_)) => Advisory::MissingDependency {
                    id: record.id.clone(),
                    dependency: dep.clone(),
                },
                Err(_) => Advisory::UnreadableDependency {
                    id: record.id.clone(),
                    dependency: dep.clone(),
                },
            };
            warn!(id = %record.id, "{advisory}");
            out.push(advisory);
        }
        out
    }

    /// Drop a blank requirements document into a freshly promoted folder.
    /// The move has already happened, so failures become advisories.
    fn attach_requirements(&self, record: &IdeaRecord) -> Option<Advisory> {
        let req = &self.config.requirements;
        if !req.generate {
            return None;
        }
        let written = artifact::validate_artifact_filename(&req.filename).and_then(|_| {
            let path = self
                .store
                .idea_dir(Stage::Active, &record.id)
                .join(&req.filename);
            io::write_if_missing(&path, artifact::requirements_template(record).as_bytes())
        });
        match written {
            Ok(true) => Some(Advisory::RequirementsCreated {
                filename: req.filename.clone(),
            }),
            Ok(false) => None,
            Err(e) => {
                warn!(id = %record.id, error = %e, "could not create requirements document");
                Some(Advisory::RequirementsNotCreated {
                    filename: req.filename.clone(),
                    reason: e.to_string(),
                })
            }
        }
    }
}

fn status_for_stage(stage: Stage, current: Status) -> Status {
    match stage {
        Stage::Backlog if stage.accepts(current) => current,
        Stage::Backlog => Status::Ready,
        Stage::Active => Status::Active,
        Stage::Done => Status::Done,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
