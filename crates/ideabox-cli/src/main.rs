mod cmd;
mod output;
mod root;

use clap::{Parser, Subcommand};
use cmd::{
    artifact::ArtifactSubcommand,
    config::ConfigSubcommand,
    idea::{CreateArgs, EditArgs},
};
use ideabox_core::IdeaError;
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "ideabox",
    about = "Track improvement ideas through backlog, active and done",
    version,
    propagate_version = true
)]
struct Cli {
    /// Project root (default: auto-detect from ideas/ or .git/)
    #[arg(long, global = true, env = "IDEABOX_ROOT")]
    root: Option<PathBuf>,

    /// Output as JSON
    #[arg(long, global = true, short = 'j')]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create ideas/ with its three stages and a default config
    Init,

    /// Add a new idea to the backlog
    Create(CreateArgs),

    /// List ideas, oldest first
    List {
        /// backlog, active or done
        #[arg(long)]
        stage: Option<String>,
        #[arg(long)]
        area: Option<String>,
        /// idea, ready, active or done
        #[arg(long)]
        status: Option<String>,
    },

    /// Show one idea with its artifacts
    Show { id: String },

    /// Mark a backlog idea as ready to promote
    Ready { id: String },

    /// Move an idea from backlog to active
    Promote {
        /// Omit to promote the only ready idea
        id: Option<String>,
    },

    /// Move an active idea back to the backlog
    Park {
        /// Omit to park the only active idea
        id: Option<String>,
    },

    /// Move an active idea to done
    Complete {
        /// Omit to complete the only active idea
        id: Option<String>,
    },

    /// Change fields of an existing idea
    Edit(EditArgs),

    /// Report ideas whose folder and status disagree, duplicates and broken metadata
    Check,

    /// Resolve a status/stage mismatch on one idea
    Repair {
        id: String,
        /// Which side wins: `stage` rewrites the status, `status` moves the folder
        #[arg(long)]
        trust: String,
    },

    /// List, add and read files stored alongside an idea
    Artifact {
        #[command(subcommand)]
        subcommand: ArtifactSubcommand,
    },

    /// Inspect ideas/config.yaml
    Config {
        #[command(subcommand)]
        subcommand: ConfigSubcommand,
    },
}

fn main() {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::WARN.into()),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    let root = root::resolve_root(cli.root.as_deref());
    let json = cli.json;

    let result = match cli.command {
        Commands::Init => cmd::init::run(&root, json),
        Commands::Create(args) => cmd::idea::create(&root, args, json),
        Commands::List {
            stage,
            area,
            status,
        } => cmd::idea::list(&root, stage.as_deref(), area, status.as_deref(), json),
        Commands::Show { id } => cmd::idea::show(&root, &id, json),
        Commands::Ready { id } => cmd::idea::ready(&root, &id, json),
        Commands::Promote { id } => cmd::lifecycle::promote(&root, id.as_deref(), json),
        Commands::Park { id } => cmd::lifecycle::park(&root, id.as_deref(), json),
        Commands::Complete { id } => cmd::lifecycle::complete(&root, id.as_deref(), json),
        Commands::Edit(args) => cmd::idea::edit(&root, args, json),
        Commands::Check => cmd::check::check(&root, json),
        Commands::Repair { id, trust } => cmd::check::repair(&root, &id, &trust, json),
        Commands::Artifact { subcommand } => cmd::artifact::run(&root, subcommand, json),
        Commands::Config { subcommand } => cmd::config::run(&root, subcommand, json),
    };

    if let Err(e) = result {
        if json {
            let kind = e
                .downcast_ref::<IdeaError>()
                .map(IdeaError::kind)
                .unwrap_or("error");
            let value = serde_json::json!({
                "error": { "kind": kind, "message": format!("{e:#}") },
            });
            eprintln!("{value}");
        } else {
            eprintln!("error: {e:#}");
        }
        std::process::exit(1);
    }
}
