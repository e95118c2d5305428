//! Read-only views over the stage store and the integrity scan.

use crate::error::{Result, SchemaError};
use crate::store::{StageStore, StoredIdea};
use crate::types::{Stage, Status};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;
use tracing::warn;

// ---------------------------------------------------------------------------
// IntegrityWarning
// ---------------------------------------------------------------------------

/// A record whose physical location and declared state disagree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum IntegrityWarning {
    /// `status` is not one the record's stage accepts.
    StatusMismatch {
        id: String,
        stage: Stage,
        status: Status,
    },
    /// The same id has a folder in more than one stage.
    DuplicateId { id: String, stages: Vec<Stage> },
    /// The metadata document does not parse or fails the schema.
    Malformed {
        id: String,
        stage: Stage,
        error: SchemaError,
    },
    /// A folder with no metadata document. It still blocks the id.
    Orphaned { id: String, stage: Stage },
}

impl IntegrityWarning {
    pub fn id(&self) -> &str {
        match self {
            IntegrityWarning::StatusMismatch { id, .. }
            | IntegrityWarning::DuplicateId { id, .. }
            | IntegrityWarning::Malformed { id, .. }
            | IntegrityWarning::Orphaned { id, .. } => id,
        }
    }
}

impl fmt::Display for IntegrityWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IntegrityWarning::StatusMismatch { id, stage, status } => {
                write!(f, "{id}: status '{status}' does not belong in {stage}")
            }
            IntegrityWarning::DuplicateId { id, stages } => {
                let stages: Vec<_> = stages.iter().map(|s| s.as_str()).collect();
                write!(f, "{id}: present in {}", stages.join(" and "))
            }
            IntegrityWarning::Malformed { id, stage, error } => {
                write!(f, "{id}: malformed metadata in {stage}: {error}")
            }
            IntegrityWarning::Orphaned { id, stage } => {
                write!(f, "{id}: folder in {stage} has no idea.md")
            }
        }
    }
}

// ---------------------------------------------------------------------------
// ListFilter
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListFilter {
    pub stage: Option<Stage>,
    pub area: Option<String>,
    pub status: Option<Status>,
}

impl ListFilter {
    fn matches(&self, idea: &StoredIdea) -> bool {
        self.stage.map_or(true, |s| s == idea.stage)
            && self.area.as_deref().map_or(true, |a| a == idea.record.area)
            && self.status.map_or(true, |s| s == idea.record.status)
    }
}

// ---------------------------------------------------------------------------
// Query
// ---------------------------------------------------------------------------

pub struct Query<'a> {
    store: &'a StageStore,
}

impl<'a> Query<'a> {
    pub fn new(store: &'a StageStore) -> Self {
        Self { store }
    }

    /// Every readable record matching `filter`, oldest first.
    ///
    /// Malformed folders are skipped with a warning; they show up in
    /// [`Query::find_inconsistent`].
    pub fn list(&self, filter: &ListFilter) -> Result<Vec<StoredIdea>> {
        let mut out = Vec::new();
        for entry in self.store.scan()? {
            if filter.stage.is_some_and(|s| s != entry.stage) {
                continue;
            }
            match entry.record {
                Ok(record) => {
                    let idea = StoredIdea {
                        stage: entry.stage,
                        record,
                    };
                    if filter.matches(&idea) {
                        out.push(idea);
                    }
                }
                Err(e) => warn!(id = %entry.id, stage = %entry.stage, error = %e, "skipping malformed idea"),
            }
        }
        out.sort_by(|a, b| {
            a.record
                .created
                .cmp(&b.record.created)
                .then_with(|| a.record.id.cmp(&b.record.id))
        });
        Ok(out)
    }

    pub fn list_by_stage(&self, stage: Stage) -> Result<Vec<StoredIdea>> {
        self.list(&ListFilter {
            stage: Some(stage),
            ..Default::default()
        })
    }

    pub fn list_by_area(&self, area: &str) -> Result<Vec<StoredIdea>> {
        self.list(&ListFilter {
            area: Some(area.to_string()),
            ..Default::default()
        })
    }

    /// Scan all stages for status/stage mismatches, cross-stage duplicates,
    /// unreadable metadata and folders without metadata.
    pub fn find_inconsistent(&self) -> Result<Vec<IntegrityWarning>> {
        let mut warnings = Vec::new();
        let mut seen: BTreeMap<String, Vec<Stage>> = BTreeMap::new();

        for entry in self.store.scan()? {
            seen.entry(entry.id.clone()).or_default().push(entry.stage);
            match entry.record {
                Ok(record) if !entry.stage.accepts(record.status) => {
                    warnings.push(IntegrityWarning::StatusMismatch {
                        id: entry.id,
                        stage: entry.stage,
                        status: record.status,
                    });
                }
                Ok(_) => {}
                Err(error) => warnings.push(IntegrityWarning::Malformed {
                    id: entry.id,
                    stage: entry.stage,
                    error,
                }),
            }
        }

        for (id, stages) in seen {
            if stages.len() > 1 {
                warnings.push(IntegrityWarning::DuplicateId { id, stages });
            }
        }
        for (stage, id) in self.store.orphans()? {
            warnings.push(IntegrityWarning::Orphaned { id, stage });
        }
        Ok(warnings)
    }

    pub fn warnings_for(&self, id: &str) -> Result<Vec<IntegrityWarning>> {
        Ok(self
            .find_inconsistent()?
            .into_iter()
            .filter(|w| w.id() == id)
            .collect())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::IdeaRecord;
    use chrono::NaiveDate;
    use std::collections::BTreeSet;
    use tempfile::TempDir;

    fn setup() -> (TempDir, StageStore) {
        let dir = TempDir::new().unwrap();
        let config = StageStore::init(dir.path()).unwrap();
        let store = StageStore::open(dir.path(), &config).unwrap();
        (dir, store)
    }

    fn record(id: &str, area: &str, status: Status, day: u32) -> IdeaRecord {
        IdeaRecord {
            id: id.to_string(),
            title: id.to_string(),
            area: area.to_string(),
            implementation: None,
            effort: None,
            impact: None,
            risk: None,
            status,
            files: Vec::new(),
            extension_api: String::new(),
            created: NaiveDate::from_ymd_opt(2026, 4, day).unwrap(),
            depends_on: BTreeSet::new(),
            body: String::new(),
        }
    }

    fn write_raw(dir: &TempDir, stage: &str, id: &str, doc: &str) {
        let path = dir.path().join("ideas").join(stage).join(id);
        std::fs::create_dir_all(&path).unwrap();
        std::fs::write(path.join("idea.md"), doc).unwrap();
    }

    #[test]
    fn list_sorts_by_created_then_id() {
        let (_dir, store) = setup();
        store.insert(&record("b", "global", Status::Idea, 3)).unwrap();
        store.insert(&record("a", "global", Status::Idea, 3)).unwrap();
        store.insert(&record("c", "footer", Status::Done, 1)).unwrap();

        let all = Query::new(&store).list(&ListFilter::default()).unwrap();
        let ids: Vec<_> = all.iter().map(|i| i.record.id.as_str()).collect();
        assert_eq!(ids, vec!["c", "a", "b"]);
    }

    #[test]
    fn filters_by_stage_area_and_status() {
        let (_dir, store) = setup();
        store.insert(&record("a", "global", Status::Idea, 1)).unwrap();
        store.insert(&record("b", "global", Status::Ready, 2)).unwrap();
        store.insert(&record("c", "footer", Status::Active, 3)).unwrap();
        let q = Query::new(&store);

        assert_eq!(q.list_by_stage(Stage::Backlog).unwrap().len(), 2);
        assert_eq!(q.list_by_area("footer").unwrap()[0].record.id, "c");
        let ready = q
            .list(&ListFilter {
                status: Some(Status::Ready),
                ..Default::default()
            })
            .unwrap();
        assert_eq!(ready.len(), 1);
        assert_eq!(ready[0].record.id, "b");
    }

    #[test]
    fn clean_store_has_no_warnings() {
        let (_dir, store) = setup();
        store.insert(&record("a", "global", Status::Idea, 1)).unwrap();
        store.insert(&record("b", "global", Status::Done, 1)).unwrap();
        assert!(Query::new(&store).find_inconsistent().unwrap().is_empty());
    }

    #[test]
    fn detects_status_mismatch() {
        let (dir, store) = setup();
        write_raw(
            &dir,
            "backlog",
            "manual",
            "---\ntitle: Manual\narea: global\nstatus: done\ncreated: 2026-04-01\n---\n",
        );
        let warnings = Query::new(&store).find_inconsistent().unwrap();
        assert_eq!(
            warnings,
            vec![IntegrityWarning::StatusMismatch {
                id: "manual".to_string(),
                stage: Stage::Backlog,
                status: Status::Done,
            }]
        );
    }

    #[test]
    fn detects_duplicates_and_malformed() {
        let (dir, store) = setup();
        store.insert(&record("twin", "global", Status::Ready, 1)).unwrap();
        write_raw(
            &dir,
            "done",
            "twin",
            "---\ntitle: Twin\narea: global\nstatus: done\ncreated: 2026-04-01\n---\n",
        );
        write_raw(&dir, "active", "broken", "---\ntitle: [unterminated\n---\n");

        let q = Query::new(&store);
        let warnings = q.find_inconsistent().unwrap();
        assert!(warnings.iter().any(|w| matches!(
            w,
            IntegrityWarning::DuplicateId { id, stages } if id == "twin" && stages.len() == 2
        )));
        assert!(warnings.iter().any(|w| matches!(
            w,
            IntegrityWarning::Malformed { id, stage: Stage::Active, .. } if id == "broken"
        )));
        assert_eq!(q.warnings_for("twin").unwrap().len(), 1);

        // listing still works around the broken folder
        assert_eq!(q.list(&ListFilter::default()).unwrap().len(), 2);
    }

    #[test]
    fn reports_folders_without_metadata() {
        let (dir, store) = setup();
        store.insert(&record("kept", "global", Status::Ready, 1)).unwrap();
        let stray = dir.path().join("ideas/active/kept");
        std::fs::create_dir_all(&stray).unwrap();
        std::fs::write(stray.join("PRD.md"), "# left behind").unwrap();

        let q = Query::new(&store);
        assert_eq!(
            q.warnings_for("kept").unwrap(),
            vec![IntegrityWarning::Orphaned {
                id: "kept".to_string(),
                stage: Stage::Active,
            }]
        );
        // the record itself still lists
        assert_eq!(q.list_by_stage(Stage::Backlog).unwrap().len(), 1);
    }
}
