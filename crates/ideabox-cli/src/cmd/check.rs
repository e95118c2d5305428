use crate::cmd::open_engine;
use crate::output::{print_json, print_table};
use anyhow::Context;
use ideabox_core::{query::IntegrityWarning, RepairStrategy};
use std::path::Path;

// ---------------------------------------------------------------------------
// check
// ---------------------------------------------------------------------------

fn kind(w: &IntegrityWarning) -> &'static str {
    match w {
        IntegrityWarning::StatusMismatch { .. } => "status_mismatch",
        IntegrityWarning::DuplicateId { .. } => "duplicate_id",
        IntegrityWarning::Malformed { .. } => "malformed",
        IntegrityWarning::Orphaned { .. } => "orphaned",
    }
}

pub fn check(root: &Path, json: bool) -> anyhow::Result<()> {
    let engine = open_engine(root)?;
    let warnings = engine
        .find_inconsistent()
        .context("failed to scan ideas")?;

    if json {
        print_json(&serde_json::json!({ "warnings": warnings }))?;
    } else if warnings.is_empty() {
        println!("All ideas are consistent.");
    } else {
        let rows = warnings
            .iter()
            .map(|w| vec![w.id().to_string(), kind(w).to_string(), w.to_string()])
            .collect();
        print_table(&["ID", "PROBLEM", "DETAIL"], rows);
        println!("\nFix with: ideabox repair <id> --trust stage|status");
    }

    if !warnings.is_empty() {
        anyhow::bail!("{} integrity problem(s) found", warnings.len());
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// repair
// ---------------------------------------------------------------------------

pub fn repair(root: &Path, id: &str, trust: &str, json: bool) -> anyhow::Result<()> {
    let strategy: RepairStrategy = trust.parse()?;
    let engine = open_engine(root)?;
    let repaired = engine
        .repair(id, strategy)
        .with_context(|| format!("cannot repair '{id}'"))?;

    if json {
        print_json(&repaired)?;
    } else {
        println!(
            "{}: {} / {}",
            repaired.record.id, repaired.stage, repaired.record.status
        );
    }
    Ok(())
}
