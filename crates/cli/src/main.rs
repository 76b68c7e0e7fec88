//! Mentat CLI — the main entry point.
//!
//! Commands:
//! - `ask`    — Run one query through the cognitive loop
//! - `ingest` — Embed a transcript file into the vector index
//! - `search` — Semantic search over ingested material
//! - `facts`  — List the stored fact memory

use clap::{Parser, Subcommand};
use std::path::PathBuf;

mod commands;

#[derive(Parser)]
#[command(
    name = "mentat",
    about = "Mentat — an iteration-bounded cognitive agent",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Ask the agent a question
    Ask {
        query: String,

        /// User preference as key=value; repeatable
        #[arg(short, long = "pref")]
        preferences: Vec<String>,
    },

    /// Ingest a transcript file (JSON array of timed segments)
    Ingest {
        file: PathBuf,

        /// Group identity for the ingested chunks (e.g. a video id)
        #[arg(short, long)]
        group_id: String,
    },

    /// Semantic search over ingested material
    Search {
        query: String,

        /// Restrict results to one group
        #[arg(short, long)]
        group: Option<String>,

        #[arg(short = 'k', long, default_value_t = 5)]
        top_k: usize,
    },

    /// List the stored fact memory
    Facts,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter)),
        )
        .with_target(false)
        .init();

    match cli.command {
        Commands::Ask { query, preferences } => commands::ask::run(query, preferences).await?,
        Commands::Ingest { file, group_id } => commands::ingest::run(file, group_id).await?,
        Commands::Search {
            query,
            group,
            top_k,
        } => commands::search::run(query, group, top_k).await?,
        Commands::Facts => commands::facts::run().await?,
    }

    Ok(())
}
