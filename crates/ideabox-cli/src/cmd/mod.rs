pub mod artifact;
pub mod check;
pub mod config;
pub mod idea;
pub mod init;
pub mod lifecycle;

use anyhow::Context;
use ideabox_core::Engine;
use std::path::Path;

/// Load config and open the stage store under `root`.
pub fn open_engine(root: &Path) -> anyhow::Result<Engine> {
    Engine::open(root).with_context(|| format!("cannot open ideas/ under {}", root.display()))
}
