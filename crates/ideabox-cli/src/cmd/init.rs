use crate::output::print_json;
use anyhow::Context;
use ideabox_core::{paths, store::StageStore, types::Stage};
use std::path::Path;

pub fn run(root: &Path, json: bool) -> anyhow::Result<()> {
    let existed = paths::config_path(root).exists();
    let config = StageStore::init(root)
        .with_context(|| format!("failed to initialize ideas/ in {}", root.display()))?;

    if json {
        print_json(&serde_json::json!({
            "root": root,
            "config_created": !existed,
            "config": config,
        }))?;
        return Ok(());
    }

    println!("Initializing ideabox in: {}", root.display());
    for stage in Stage::all() {
        println!("  ready:   {}/{stage}/", paths::IDEAS_DIR);
    }
    if existed {
        println!("  exists:  {}", paths::CONFIG_FILE);
    } else {
        println!("  created: {}", paths::CONFIG_FILE);
    }
    println!("Areas: {}", config.areas.join(", "));
    Ok(())
}
