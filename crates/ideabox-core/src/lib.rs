pub mod artifact;
pub mod config;
pub mod engine;
pub mod error;
pub mod io;
pub mod paths;
pub mod query;
pub mod record;
pub mod store;
pub mod types;

pub use engine::{Advisory, Engine, RepairStrategy, Transition};
pub use error::{IdeaError, Result};
