use crate::query::IntegrityWarning;
use crate::types::{Stage, Status};
use serde::Serialize;
use std::path::PathBuf;
use thiserror::Error;

// ---------------------------------------------------------------------------
// SchemaError
// ---------------------------------------------------------------------------

/// Rejection of a metadata document at the schema boundary.
///
/// Always recoverable: the caller corrects the input and tries again.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SchemaError {
    #[error("missing required field '{field}'")]
    MissingField { field: String },

    #[error("invalid value '{value}' for '{field}' (expected one of: {})", allowed.join(", "))]
    InvalidEnum {
        field: String,
        value: String,
        allowed: Vec<String>,
    },

    #[error("invalid '{field}': {reason}")]
    InvalidValue { field: String, reason: String },

    #[error("unknown field '{field}'")]
    UnknownField { field: String },

    #[error("idea '{id}' already exists in {stage}")]
    DuplicateId { id: String, stage: Stage },

    #[error("malformed front matter: {reason}")]
    Malformed { reason: String },
}

impl SchemaError {
    pub fn missing(field: &str) -> Self {
        SchemaError::MissingField {
            field: field.to_string(),
        }
    }

    pub fn invalid_enum(field: &str, value: &str, allowed: &[&str]) -> Self {
        SchemaError::InvalidEnum {
            field: field.to_string(),
            value: value.to_string(),
            allowed: allowed.iter().map(|s| s.to_string()).collect(),
        }
    }

    pub fn invalid_value(field: &str, reason: impl Into<String>) -> Self {
        SchemaError::InvalidValue {
            field: field.to_string(),
            reason: reason.into(),
        }
    }
}

// ---------------------------------------------------------------------------
// ConflictError
// ---------------------------------------------------------------------------

/// A stage move that lost a race or found its destination occupied.
/// Surfaced for manual reconciliation, never retried.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ConflictError {
    #[error("idea '{id}' is no longer in {from}")]
    AlreadyMoved { id: String, from: Stage },

    #[error("idea '{id}' already exists in {to}")]
    DestinationCollision { id: String, to: Stage },
}

// ---------------------------------------------------------------------------
// IdeaError
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum IdeaError {
    #[error("not initialized: run 'ideabox init'")]
    NotInitialized,

    #[error("idea not found: {0}")]
    NotFound(String),

    #[error("invalid id '{0}': must be lowercase alphanumeric with hyphens")]
    InvalidId(String),

    #[error(transparent)]
    Schema(#[from] SchemaError),

    #[error(transparent)]
    Conflict(#[from] ConflictError),

    #[error("cannot {operation} '{id}': status is {status}")]
    InvalidTransition {
        id: String,
        status: Status,
        operation: String,
    },

    #[error("cannot edit '{field}' on '{id}': record is {status}")]
    ImmutableRecord {
        id: String,
        status: Status,
        field: String,
    },

    #[error("idea '{id}' has unresolved integrity warnings: {}", warnings.iter().map(|w| w.to_string()).collect::<Vec<_>>().join("; "))]
    Integrity {
        id: String,
        warnings: Vec<IntegrityWarning>,
    },

    #[error("more than one idea is eligible to {operation} ({}): pass an id", candidates.join(", "))]
    SelectionRequired {
        operation: String,
        candidates: Vec<String>,
    },

    /// Only records with `status` are picked when no id is given.
    #[error("no {status} idea to {operation}: pass an id")]
    NothingEligible { operation: String, status: Status },

    #[error("area '{area}' already has an active idea: {active}")]
    AreaOccupied { area: String, active: String },

    #[error("cannot repair '{id}': {reason}")]
    Unrepairable { id: String, reason: String },

    #[error("invalid artifact filename: {0}")]
    InvalidArtifactFilename(String),

    #[error("artifact not found: {0}")]
    ArtifactNotFound(String),

    #[error("artifact already exists: {0}")]
    ArtifactExists(String),

    #[error("malformed idea document {}: {source}", path.display())]
    Malformed { path: PathBuf, source: SchemaError },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Yaml(#[from] serde_yaml::Error),
}

impl IdeaError {
    /// Stable tag for drivers that branch on the failure class.
    pub fn kind(&self) -> &'static str {
        match self {
            IdeaError::NotInitialized => "not_initialized",
            IdeaError::NotFound(_) => "not_found",
            IdeaError::InvalidId(_) => "invalid_id",
            IdeaError::Schema(_) => "schema_error",
            IdeaError::Conflict(_) => "conflict_error",
            IdeaError::InvalidTransition { .. } => "invalid_transition",
            IdeaError::ImmutableRecord { .. } => "immutable_record",
            IdeaError::Integrity { .. } => "integrity_warning",
            IdeaError::SelectionRequired { .. } => "selection_required",
            IdeaError::NothingEligible { .. } => "nothing_eligible",
            IdeaError::AreaOccupied { .. } => "area_occupied",
            IdeaError::Unrepairable { .. } => "unrepairable",
            IdeaError::InvalidArtifactFilename(_) => "invalid_artifact_filename",
            IdeaError::ArtifactNotFound(_) => "artifact_not_found",
            IdeaError::ArtifactExists(_) => "artifact_exists",
            IdeaError::Malformed { .. } => "malformed",
            IdeaError::Io(_) => "io",
            IdeaError::Yaml(_) => "yaml",
        }
    }
}

pub type Result<T> = std::result::Result<T, IdeaError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn schema_error_serializes_with_kind_tag() {
        let err = SchemaError::missing("title");
        let json = serde_json::to_value(&err).unwrap();
        assert_eq!(json["kind"], "missing_field");
        assert_eq!(json["field"], "title");
    }

    #[test]
    fn invalid_enum_lists_allowed_values() {
        let err = SchemaError::invalid_enum("effort", "huge", &["low", "medium", "high"]);
        assert_eq!(
            err.to_string(),
            "invalid value 'huge' for 'effort' (expected one of: low, medium, high)"
        );
    }

    #[test]
    fn selection_required_names_candidates() {
        let err = IdeaError::SelectionRequired {
            operation: "park".to_string(),
            candidates: vec!["a".to_string(), "b".to_string()],
        };
        assert!(err.to_string().contains("a, b"));
        assert_eq!(err.kind(), "selection_required");
    }
}
