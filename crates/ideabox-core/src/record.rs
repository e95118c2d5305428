//! The idea record and its closed schema.
//!
//! A stored idea is a front-matter document: a YAML mapping between `---`
//! fences, followed by a free-form markdown body that is carried verbatim.
//! Everything in here is pure; reading and writing folders is the store's job.

use crate::error::SchemaError;
use crate::paths;
use crate::types::{Implementation, Level, Stage, Status};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_yaml::{Mapping, Value};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

/// Untyped front matter as read from disk or handed over by a driver.
pub type RawMetadata = Mapping;

const FIELDS: &[&str] = &[
    "title",
    "area",
    "implementation",
    "effort",
    "impact",
    "risk",
    "status",
    "files",
    "extensionApi",
    "created",
    "dependsOn",
];

const DATE_FORMAT: &str = "%Y-%m-%d";

// ---------------------------------------------------------------------------
// IdeaRecord
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IdeaRecord {
    pub id: String,
    pub title: String,
    pub area: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub implementation: Option<Implementation>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub effort: Option<Level>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub impact: Option<Level>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub risk: Option<Level>,
    pub status: Status,
    pub files: Vec<String>,
    pub extension_api: String,
    pub created: NaiveDate,
    #[serde(skip_serializing_if = "BTreeSet::is_empty")]
    pub depends_on: BTreeSet<String>,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub body: String,
}

/// The on-disk key set. `id` is the folder name and `body` follows the fence.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct FrontMatter<'a> {
    title: &'a str,
    area: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    implementation: Option<Implementation>,
    #[serde(skip_serializing_if = "Option::is_none")]
    effort: Option<Level>,
    #[serde(skip_serializing_if = "Option::is_none")]
    impact: Option<Level>,
    #[serde(skip_serializing_if = "Option::is_none")]
    risk: Option<Level>,
    status: Status,
    files: &'a [String],
    extension_api: &'a str,
    created: String,
    #[serde(skip_serializing_if = "BTreeSet::is_empty")]
    depends_on: &'a BTreeSet<String>,
}

impl IdeaRecord {
    /// Parse a stored document. `id` comes from the folder name and
    /// `created` must be present.
    pub fn from_document(
        id: &str,
        content: &str,
        areas: &[String],
    ) -> Result<Self, SchemaError> {
        let (raw, body) = split_front_matter(content)?;
        let mut record = parse_fields(&raw, Some(id), areas, None)?;
        record.body = body.to_string();
        Ok(record)
    }

    pub fn to_document(&self) -> Result<String, serde_yaml::Error> {
        let fm = FrontMatter {
            title: &self.title,
            area: &self.area,
            implementation: self.implementation,
            effort: self.effort,
            impact: self.impact,
            risk: self.risk,
            status: self.status,
            files: &self.files,
            extension_api: &self.extension_api,
            created: self.created.format(DATE_FORMAT).to_string(),
            depends_on: &self.depends_on,
        };
        let yaml = serde_yaml::to_string(&fm)?;
        Ok(format!("---\n{yaml}---\n{}", self.body))
    }
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

/// Inputs the validator needs, passed in so validation stays free of I/O.
#[derive(Debug, Clone, Copy)]
pub struct ValidationContext<'a> {
    /// Closed area vocabulary from configuration.
    pub areas: &'a [String],
    /// Every id currently present in any stage.
    pub existing: &'a BTreeMap<String, Stage>,
    /// Stamp for `created` when the metadata does not carry one.
    /// `None` makes `created` a required field.
    pub today: Option<NaiveDate>,
}

/// Validate raw metadata for a new record and derive its id from the title.
pub fn validate(raw: &RawMetadata, ctx: &ValidationContext<'_>) -> Result<IdeaRecord, SchemaError> {
    let record = parse_fields(raw, None, ctx.areas, ctx.today)?;
    if let Some(&stage) = ctx.existing.get(&record.id) {
        return Err(SchemaError::DuplicateId {
            id: record.id,
            stage,
        });
    }
    Ok(record)
}

fn parse_fields(
    raw: &RawMetadata,
    id: Option<&str>,
    areas: &[String],
    today: Option<NaiveDate>,
) -> Result<IdeaRecord, SchemaError> {
    for key in raw.keys() {
        match key.as_str() {
            Some(k) if FIELDS.contains(&k) => {}
            Some(k) => {
                return Err(SchemaError::UnknownField {
                    field: k.to_string(),
                })
            }
            None => return Err(SchemaError::invalid_value("front matter", "keys must be strings")),
        }
    }

    let title = parse_title(opt_str(raw, "title")?)?;
    let id = match id {
        Some(id) => id.to_string(),
        None => {
            let id = paths::normalize_id(&title);
            if id.is_empty() {
                return Err(SchemaError::invalid_value(
                    "title",
                    "must contain at least one ASCII letter or digit",
                ));
            }
            id
        }
    };

    let area = opt_str(raw, "area")?.ok_or_else(|| SchemaError::missing("area"))?;
    let area = parse_area(area, areas)?;

    let status: Status = opt_str(raw, "status")?
        .ok_or_else(|| SchemaError::missing("status"))?
        .parse()?;

    let implementation = opt_str(raw, "implementation")?
        .map(|s| s.parse::<Implementation>())
        .transpose()?;
    let effort = opt_level(raw, "effort")?;
    let impact = opt_level(raw, "impact")?;
    let risk = opt_level(raw, "risk")?;

    let files = str_list(raw, "files")?;
    let extension_api = opt_str(raw, "extensionApi")?.unwrap_or_default();

    let created = match opt_str(raw, "created")? {
        Some(s) => NaiveDate::parse_from_str(s.trim(), DATE_FORMAT).map_err(|e| {
            SchemaError::invalid_value("created", format!("'{s}' is not a YYYY-MM-DD date: {e}"))
        })?,
        None => today.ok_or_else(|| SchemaError::missing("created"))?,
    };

    let depends_on = parse_depends_on(str_list(raw, "dependsOn")?, &id)?;

    Ok(IdeaRecord {
        id,
        title,
        area,
        implementation,
        effort,
        impact,
        risk,
        status,
        files,
        extension_api,
        created,
        depends_on,
        body: String::new(),
    })
}

fn parse_title(title: Option<String>) -> Result<String, SchemaError> {
    title
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
        .ok_or_else(|| SchemaError::missing("title"))
}

fn parse_area(area: String, areas: &[String]) -> Result<String, SchemaError> {
    let area = area.trim().to_string();
    if !areas.iter().any(|a| *a == area) {
        return Err(SchemaError::InvalidEnum {
            field: "area".to_string(),
            value: area,
            allowed: areas.to_vec(),
        });
    }
    Ok(area)
}

fn parse_depends_on(deps: Vec<String>, own_id: &str) -> Result<BTreeSet<String>, SchemaError> {
    let mut out = BTreeSet::new();
    for dep in deps {
        let dep = dep.trim().to_string();
        if paths::validate_id(&dep).is_err() {
            return Err(SchemaError::invalid_value(
                "dependsOn",
                format!("'{dep}' is not a valid idea id"),
            ));
        }
        if dep == own_id {
            return Err(SchemaError::invalid_value(
                "dependsOn",
                "an idea cannot depend on itself",
            ));
        }
        out.insert(dep);
    }
    Ok(out)
}

fn scalar_to_string(field: &str, value: &Value) -> Result<Option<String>, SchemaError> {
    match value {
        Value::Null => Ok(None),
        Value::String(s) => Ok(Some(s.clone())),
        Value::Number(n) => Ok(Some(n.to_string())),
        Value::Bool(b) => Ok(Some(b.to_string())),
        _ => Err(SchemaError::invalid_value(field, "expected a single value")),
    }
}

fn opt_str(raw: &RawMetadata, field: &str) -> Result<Option<String>, SchemaError> {
    match raw.get(field) {
        None => Ok(None),
        Some(v) => scalar_to_string(field, v),
    }
}

fn opt_level(raw: &RawMetadata, field: &str) -> Result<Option<Level>, SchemaError> {
    opt_str(raw, field)?
        .map(|s| Level::parse_field(field, &s))
        .transpose()
}

fn str_list(raw: &RawMetadata, field: &str) -> Result<Vec<String>, SchemaError> {
    match raw.get(field) {
        None | Some(Value::Null) => Ok(Vec::new()),
        Some(Value::Sequence(items)) => {
            let mut out = Vec::with_capacity(items.len());
            for item in items {
                match scalar_to_string(field, item)? {
                    Some(s) => out.push(s),
                    None => {
                        return Err(SchemaError::invalid_value(field, "list entries cannot be empty"))
                    }
                }
            }
            Ok(out)
        }
        Some(other) => Ok(scalar_to_string(field, other)?.into_iter().collect()),
    }
}

// ---------------------------------------------------------------------------
// Front matter
// ---------------------------------------------------------------------------

/// Split a document into its YAML mapping and the verbatim body.
pub fn split_front_matter(content: &str) -> Result<(RawMetadata, &str), SchemaError> {
    let malformed = |reason: &str| SchemaError::Malformed {
        reason: reason.to_string(),
    };

    let rest = content
        .strip_prefix("---")
        .ok_or_else(|| malformed("document must start with '---'"))?;
    let rest = rest
        .strip_prefix('\n')
        .or_else(|| rest.strip_prefix("\r\n"))
        .ok_or_else(|| malformed("opening '---' must be on its own line"))?;

    let (yaml, after) = if let Some(after) = rest.strip_prefix("---") {
        ("", after)
    } else {
        let end = rest
            .find("\n---")
            .ok_or_else(|| malformed("missing closing '---'"))?;
        (&rest[..end], &rest[end + 4..])
    };
    let body = after
        .strip_prefix('\n')
        .or_else(|| after.strip_prefix("\r\n"))
        .unwrap_or(after);

    let value: Value = serde_yaml::from_str(yaml).map_err(|e| SchemaError::Malformed {
        reason: e.to_string(),
    })?;
    let raw = match value {
        Value::Null => Mapping::new(),
        Value::Mapping(m) => m,
        _ => return Err(malformed("front matter must be a key/value mapping")),
    };
    Ok((raw, body))
}

// ---------------------------------------------------------------------------
// Edits
// ---------------------------------------------------------------------------

/// Names of editable fields, as used by the active-stage allow-list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EditField {
    Title,
    Area,
    Implementation,
    Effort,
    Impact,
    Risk,
    Files,
    AppendFiles,
    ExtensionApi,
    DependsOn,
}

impl EditField {
    pub fn as_str(self) -> &'static str {
        match self {
            EditField::Title => "title",
            EditField::Area => "area",
            EditField::Implementation => "implementation",
            EditField::Effort => "effort",
            EditField::Impact => "impact",
            EditField::Risk => "risk",
            EditField::Files => "files",
            EditField::AppendFiles => "append_files",
            EditField::ExtensionApi => "extension_api",
            EditField::DependsOn => "depends_on",
        }
    }
}

impl fmt::Display for EditField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// In-place field updates. `id`, `status` and `created` are not editable:
/// the id is stable even when the title changes.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct IdeaUpdate {
    pub title: Option<String>,
    pub area: Option<String>,
    pub implementation: Option<Implementation>,
    pub effort: Option<Level>,
    pub impact: Option<Level>,
    pub risk: Option<Level>,
    pub files: Option<Vec<String>>,
    pub append_files: Vec<String>,
    pub extension_api: Option<String>,
    pub depends_on: Option<Vec<String>>,
}

impl IdeaUpdate {
    pub fn fields(&self) -> Vec<EditField> {
        let mut out = Vec::new();
        if self.title.is_some() {
            out.push(EditField::Title);
        }
        if self.area.is_some() {
            out.push(EditField::Area);
        }
        if self.implementation.is_some() {
            out.push(EditField::Implementation);
        }
        if self.effort.is_some() {
            out.push(EditField::Effort);
        }
        if self.impact.is_some() {
            out.push(EditField::Impact);
        }
        if self.risk.is_some() {
            out.push(EditField::Risk);
        }
        if self.files.is_some() {
            out.push(EditField::Files);
        }
        if !self.append_files.is_empty() {
            out.push(EditField::AppendFiles);
        }
        if self.extension_api.is_some() {
            out.push(EditField::ExtensionApi);
        }
        if self.depends_on.is_some() {
            out.push(EditField::DependsOn);
        }
        out
    }

    pub fn is_empty(&self) -> bool {
        self.fields().is_empty()
    }

    /// Validate every change, then apply them all. On error `record` is untouched.
    pub fn apply(&self, record: &mut IdeaRecord, areas: &[String]) -> Result<(), SchemaError> {
        let title = self.title.clone().map(|t| parse_title(Some(t))).transpose()?;
        let area = self.area.clone().map(|a| parse_area(a, areas)).transpose()?;
        let depends_on = self
            .depends_on
            .clone()
            .map(|deps| parse_depends_on(deps, &record.id))
            .transpose()?;

        if let Some(title) = title {
            record.title = title;
        }
        if let Some(area) = area {
            record.area = area;
        }
        if let Some(v) = self.implementation {
            record.implementation = Some(v);
        }
        if let Some(v) = self.effort {
            record.effort = Some(v);
        }
        if let Some(v) = self.impact {
            record.impact = Some(v);
        }
        if let Some(v) = self.risk {
            record.risk = Some(v);
        }
        if let Some(files) = &self.files {
            record.files = files.clone();
        }
        for file in &self.append_files {
            if !record.files.contains(file) {
                record.files.push(file.clone());
            }
        }
        if let Some(api) = &self.extension_api {
            record.extension_api = api.clone();
        }
        if let Some(deps) = depends_on {
            record.depends_on = deps;
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
