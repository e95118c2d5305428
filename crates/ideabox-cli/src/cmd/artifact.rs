use crate::cmd::open_engine;
use crate::output::{print_json, print_table};
use anyhow::Context;
use clap::Subcommand;
use std::io::Write;
use std::path::{Path, PathBuf};

#[derive(Subcommand)]
pub enum ArtifactSubcommand {
    /// List files stored alongside an idea
    List { id: String },
    /// Copy a file into an idea's folder (never overwrites)
    Add {
        id: String,
        /// File to copy
        path: PathBuf,
        /// Store under a different filename
        #[arg(long)]
        name: Option<String>,
    },
    /// Write an artifact's bytes to stdout
    Show { id: String, filename: String },
}

pub fn run(root: &Path, subcmd: ArtifactSubcommand, json: bool) -> anyhow::Result<()> {
    match subcmd {
        ArtifactSubcommand::List { id } => list(root, &id, json),
        ArtifactSubcommand::Add { id, path, name } => add(root, &id, &path, name, json),
        ArtifactSubcommand::Show { id, filename } => show(root, &id, &filename),
    }
}

fn list(root: &Path, id: &str, json: bool) -> anyhow::Result<()> {
    let engine = open_engine(root)?;
    let artifacts = engine
        .list_artifacts(id)
        .with_context(|| format!("cannot list artifacts of '{id}'"))?;

    if json {
        print_json(&artifacts)?;
        return Ok(());
    }
    if artifacts.is_empty() {
        println!("No artifacts.");
        return Ok(());
    }
    let rows = artifacts
        .iter()
        .map(|a| {
            vec![
                a.filename.clone(),
                a.size_bytes.to_string(),
                a.modified_at.format("%Y-%m-%d %H:%M").to_string(),
            ]
        })
        .collect();
    print_table(&["FILENAME", "BYTES", "MODIFIED"], rows);
    Ok(())
}

fn add(root: &Path, id: &str, path: &Path, name: Option<String>, json: bool) -> anyhow::Result<()> {
    let filename = match name {
        Some(n) => n,
        None => path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .with_context(|| format!("{} has no filename", path.display()))?,
    };
    let data =
        std::fs::read(path).with_context(|| format!("failed to read {}", path.display()))?;

    let engine = open_engine(root)?;
    let meta = engine
        .attach_artifact(id, &filename, &data)
        .with_context(|| format!("cannot attach '{filename}' to '{id}'"))?;

    if json {
        print_json(&meta)?;
    } else {
        println!("Attached {} to {id} ({} bytes)", meta.filename, meta.size_bytes);
    }
    Ok(())
}

fn show(root: &Path, id: &str, filename: &str) -> anyhow::Result<()> {
    let engine = open_engine(root)?;
    let data = engine
        .read_artifact(id, filename)
        .with_context(|| format!("cannot read '{filename}' from '{id}'"))?;
    let mut stdout = std::io::stdout().lock();
    stdout.write_all(&data)?;
    stdout.flush()?;
    Ok(())
}
