use crate::cmd::open_engine;
use crate::output::{print_advisories, print_json};
use anyhow::Context;
use ideabox_core::Transition;
use std::path::Path;

fn report(transition: &Transition, json: bool) -> anyhow::Result<()> {
    if json {
        return print_json(transition);
    }
    print_advisories(&transition.advisories);
    let r = &transition.record;
    println!(
        "{}: {} -> {} (status {})",
        r.id, transition.from, transition.to, r.status
    );
    Ok(())
}

fn describe(id: Option<&str>) -> String {
    id.map(|i| format!("'{i}'"))
        .unwrap_or_else(|| "the eligible idea".to_string())
}

pub fn promote(root: &Path, id: Option<&str>, json: bool) -> anyhow::Result<()> {
    let engine = open_engine(root)?;
    let transition = engine
        .promote(id)
        .with_context(|| format!("cannot promote {}", describe(id)))?;
    report(&transition, json)
}

pub fn park(root: &Path, id: Option<&str>, json: bool) -> anyhow::Result<()> {
    let engine = open_engine(root)?;
    let transition = engine
        .park(id)
        .with_context(|| format!("cannot park {}", describe(id)))?;
    report(&transition, json)
}

pub fn complete(root: &Path, id: Option<&str>, json: bool) -> anyhow::Result<()> {
    let engine = open_engine(root)?;
    let transition = engine
        .complete(id)
        .with_context(|| format!("cannot complete {}", describe(id)))?;
    report(&transition, json)
}
