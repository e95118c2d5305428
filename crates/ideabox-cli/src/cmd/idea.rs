use crate::cmd::open_engine;
use crate::output::{or_dash, print_json, print_table};
use anyhow::Context;
use clap::Args;
use ideabox_core::{
    query::ListFilter,
    record::{IdeaUpdate, RawMetadata},
    types::{Implementation, Level, Stage, Status},
};
use serde_yaml::Value;
use std::path::Path;

// ---------------------------------------------------------------------------
// Argument types
// ---------------------------------------------------------------------------

#[derive(Args)]
pub struct CreateArgs {
    /// Human-readable title; the id is derived from it
    pub title: String,
    /// One of the areas in ideas/config.yaml
    #[arg(long)]
    pub area: Option<String>,
    /// extension, core or hybrid
    #[arg(long)]
    pub implementation: Option<String>,
    /// low, medium or high
    #[arg(long)]
    pub effort: Option<String>,
    /// low, medium or high
    #[arg(long)]
    pub impact: Option<String>,
    /// low, medium or high
    #[arg(long)]
    pub risk: Option<String>,
    /// Source file the idea touches (repeatable)
    #[arg(long = "file", value_name = "PATH")]
    pub files: Vec<String>,
    #[arg(long)]
    pub extension_api: Option<String>,
    /// Id of an idea this one builds on (repeatable)
    #[arg(long = "depends-on", value_name = "ID")]
    pub depends_on: Vec<String>,
    /// Create with status `ready` instead of `idea`
    #[arg(long)]
    pub ready: bool,
}

#[derive(Args)]
pub struct EditArgs {
    pub id: String,
    #[arg(long)]
    pub title: Option<String>,
    #[arg(long)]
    pub area: Option<String>,
    #[arg(long)]
    pub implementation: Option<String>,
    #[arg(long)]
    pub effort: Option<String>,
    #[arg(long)]
    pub impact: Option<String>,
    #[arg(long)]
    pub risk: Option<String>,
    /// Replace the file list (repeatable)
    #[arg(long = "file", value_name = "PATH")]
    pub files: Vec<String>,
    /// Append to the file list; allowed while active (repeatable)
    #[arg(long = "add-file", value_name = "PATH")]
    pub add_files: Vec<String>,
    #[arg(long)]
    pub extension_api: Option<String>,
    /// Replace the dependency list (repeatable)
    #[arg(long = "depends-on", value_name = "ID")]
    pub depends_on: Vec<String>,
}

// ---------------------------------------------------------------------------
// create
// ---------------------------------------------------------------------------

fn raw_fields(args: CreateArgs) -> RawMetadata {
    let mut raw = RawMetadata::new();
    let mut put = |key: &str, value: Value| {
        raw.insert(Value::from(key), value);
    };

    put("title", Value::from(args.title));
    if args.ready {
        put("status", Value::from(Status::Ready.as_str()));
    }
    let optional = [
        ("area", args.area),
        ("implementation", args.implementation),
        ("effort", args.effort),
        ("impact", args.impact),
        ("risk", args.risk),
        ("extensionApi", args.extension_api),
    ];
    for (key, value) in optional {
        if let Some(v) = value {
            put(key, Value::from(v));
        }
    }
    if !args.files.is_empty() {
        put("files", Value::from(args.files));
    }
    if !args.depends_on.is_empty() {
        put("dependsOn", Value::from(args.depends_on));
    }
    raw
}

pub fn create(root: &Path, args: CreateArgs, json: bool) -> anyhow::Result<()> {
    let engine = open_engine(root)?;
    let title = args.title.clone();
    let stored = engine
        .create(&raw_fields(args))
        .with_context(|| format!("failed to create idea '{title}'"))?;

    if json {
        print_json(&stored)?;
    } else {
        let r = &stored.record;
        println!("Created idea: {} ({}, {})", r.id, r.area, r.status);
        if r.status == Status::Idea {
            println!("Next: ideabox ready {}", r.id);
        } else {
            println!("Next: ideabox promote {}", r.id);
        }
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// list
// ---------------------------------------------------------------------------

pub fn list(
    root: &Path,
    stage: Option<&str>,
    area: Option<String>,
    status: Option<&str>,
    json: bool,
) -> anyhow::Result<()> {
    let filter = ListFilter {
        stage: stage.map(str::parse::<Stage>).transpose()?,
        area,
        status: status.map(str::parse::<Status>).transpose()?,
    };
    let engine = open_engine(root)?;
    let ideas = engine.list(&filter).context("failed to list ideas")?;

    if json {
        print_json(&ideas)?;
        return Ok(());
    }

    if ideas.is_empty() {
        println!("No ideas yet.");
        return Ok(());
    }

    let rows: Vec<Vec<String>> = ideas
        .iter()
        .map(|i| {
            let r = &i.record;
            vec![
                r.id.clone(),
                i.stage.to_string(),
                r.status.to_string(),
                r.area.clone(),
                or_dash(r.effort),
                or_dash(r.impact),
                r.title.clone(),
            ]
        })
        .collect();
    print_table(
        &["ID", "STAGE", "STATUS", "AREA", "EFFORT", "IMPACT", "TITLE"],
        rows,
    );
    Ok(())
}

// ---------------------------------------------------------------------------
// show
// ---------------------------------------------------------------------------

pub fn show(root: &Path, id: &str, json: bool) -> anyhow::Result<()> {
    let engine = open_engine(root)?;
    let detail = engine.show(id).with_context(|| format!("cannot show '{id}'"))?;

    if json {
        print_json(&detail)?;
        return Ok(());
    }

    let r = &detail.idea.record;
    println!("Idea:    {} ({})", r.title, r.id);
    println!("Stage:   {} / {}", detail.idea.stage, r.status);
    println!("Area:    {}", r.area);
    println!("Created: {}", r.created);
    println!(
        "Impl:    {}   effort {}   impact {}   risk {}",
        or_dash(r.implementation),
        or_dash(r.effort),
        or_dash(r.impact),
        or_dash(r.risk)
    );
    if !r.extension_api.is_empty() {
        println!("API:     {}", r.extension_api);
    }
    if !r.depends_on.is_empty() {
        let deps: Vec<&str> = r.depends_on.iter().map(String::as_str).collect();
        println!("Deps:    {}", deps.join(", "));
    }
    if !r.files.is_empty() {
        println!("\nFiles:");
        for f in &r.files {
            println!("  {f}");
        }
    }
    if !detail.artifacts.is_empty() {
        println!("\nArtifacts:");
        for a in &detail.artifacts {
            println!("  {:<24} {:>8} bytes", a.filename, a.size_bytes);
        }
    }
    if !r.body.trim().is_empty() {
        println!("\n{}", r.body.trim_end());
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// ready
// ---------------------------------------------------------------------------

pub fn ready(root: &Path, id: &str, json: bool) -> anyhow::Result<()> {
    let engine = open_engine(root)?;
    let record = engine
        .mark_ready(id)
        .with_context(|| format!("cannot mark '{id}' ready"))?;

    if json {
        print_json(&record)?;
    } else {
        println!("{}: idea -> ready", record.id);
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// edit
// ---------------------------------------------------------------------------

fn parse_level(field: &str, value: Option<String>) -> anyhow::Result<Option<Level>> {
    Ok(value
        .map(|v| Level::parse_field(field, &v))
        .transpose()?)
}

fn non_empty(values: Vec<String>) -> Option<Vec<String>> {
    (!values.is_empty()).then_some(values)
}

fn update_from(args: EditArgs) -> anyhow::Result<IdeaUpdate> {
    Ok(IdeaUpdate {
        title: args.title,
        area: args.area,
        implementation: args
            .implementation
            .map(|v| v.parse::<Implementation>())
            .transpose()?,
        effort: parse_level("effort", args.effort)?,
        impact: parse_level("impact", args.impact)?,
        risk: parse_level("risk", args.risk)?,
        files: non_empty(args.files),
        append_files: args.add_files,
        extension_api: args.extension_api,
        depends_on: non_empty(args.depends_on),
    })
}

pub fn edit(root: &Path, args: EditArgs, json: bool) -> anyhow::Result<()> {
    let id = args.id.clone();
    let update = update_from(args)?;
    if update.is_empty() {
        anyhow::bail!("nothing to change: pass at least one field flag");
    }

    let engine = open_engine(root)?;
    let record = engine
        .edit(&id, &update)
        .with_context(|| format!("cannot edit '{id}'"))?;

    if json {
        print_json(&record)?;
    } else {
        let fields: Vec<&str> = update.fields().iter().map(|f| f.as_str()).collect();
        println!("Updated {}: {}", record.id, fields.join(", "));
    }
    Ok(())
}
