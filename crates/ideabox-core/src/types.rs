use crate::error::SchemaError;
use serde::{Deserialize, Serialize};
use std::fmt;

// ---------------------------------------------------------------------------
// Stage
// ---------------------------------------------------------------------------

/// Physical partition of the id space. Every idea folder lives in exactly one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Backlog,
    Active,
    Done,
}

impl Stage {
    pub fn all() -> &'static [Stage] {
        &[Stage::Backlog, Stage::Active, Stage::Done]
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Stage::Backlog => "backlog",
            Stage::Active => "active",
            Stage::Done => "done",
        }
    }

    /// Statuses a record may declare while it lives in this stage.
    pub fn statuses(self) -> &'static [Status] {
        match self {
            Stage::Backlog => &[Status::Idea, Status::Ready],
            Stage::Active => &[Status::Active],
            Stage::Done => &[Status::Done],
        }
    }

    pub fn accepts(self, status: Status) -> bool {
        self.statuses().contains(&status)
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Stage {
    type Err = SchemaError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "backlog" => Ok(Stage::Backlog),
            "active" => Ok(Stage::Active),
            "done" => Ok(Stage::Done),
            other => Err(SchemaError::invalid_enum(
                "stage",
                other,
                &["backlog", "active", "done"],
            )),
        }
    }
}

// ---------------------------------------------------------------------------
// Status
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Status {
    Idea,
    Ready,
    Active,
    Done,
}

impl Status {
    pub const NAMES: &'static [&'static str] = &["idea", "ready", "active", "done"];

    pub fn all() -> &'static [Status] {
        &[Status::Idea, Status::Ready, Status::Active, Status::Done]
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Status::Idea => "idea",
            Status::Ready => "ready",
            Status::Active => "active",
            Status::Done => "done",
        }
    }

    /// The stage a record with this status belongs in.
    pub fn stage(self) -> Stage {
        match self {
            Status::Idea | Status::Ready => Stage::Backlog,
            Status::Active => Stage::Active,
            Status::Done => Stage::Done,
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Status {
    type Err = SchemaError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "idea" => Ok(Status::Idea),
            "ready" => Ok(Status::Ready),
            "active" => Ok(Status::Active),
            "done" => Ok(Status::Done),
            other => Err(SchemaError::invalid_enum("status", other, Status::NAMES)),
        }
    }
}

// ---------------------------------------------------------------------------
// Implementation
// ---------------------------------------------------------------------------

/// Where the change lands. Informational only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Implementation {
    Extension,
    Core,
    Hybrid,
}

impl Implementation {
    pub const NAMES: &'static [&'static str] = &["extension", "core", "hybrid"];

    pub fn as_str(self) -> &'static str {
        match self {
            Implementation::Extension => "extension",
            Implementation::Core => "core",
            Implementation::Hybrid => "hybrid",
        }
    }
}

impl fmt::Display for Implementation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Implementation {
    type Err = SchemaError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "extension" => Ok(Implementation::Extension),
            "core" => Ok(Implementation::Core),
            "hybrid" => Ok(Implementation::Hybrid),
            other => Err(SchemaError::invalid_enum(
                "implementation",
                other,
                Implementation::NAMES,
            )),
        }
    }
}

// ---------------------------------------------------------------------------
// Level
// ---------------------------------------------------------------------------

/// Ordinal rating shared by effort, impact and risk.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Level {
    Low,
    Medium,
    High,
}

impl Level {
    pub const NAMES: &'static [&'static str] = &["low", "medium", "high"];

    pub fn as_str(self) -> &'static str {
        match self {
            Level::Low => "low",
            Level::Medium => "medium",
            Level::High => "high",
        }
    }

    /// Parse with the offending field name attached to the error.
    pub fn parse_field(field: &str, s: &str) -> Result<Self, SchemaError> {
        match s {
            "low" => Ok(Level::Low),
            "medium" => Ok(Level::Medium),
            "high" => Ok(Level::High),
            other => Err(SchemaError::invalid_enum(field, other, Level::NAMES)),
        }
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Level {
    type Err = SchemaError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Level::parse_field("level", s)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
