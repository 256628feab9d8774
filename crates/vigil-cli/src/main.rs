//! Vigil CLI - vigil command

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

mod cmd;
mod settings;
mod util;

/// Vigil - Shadow-copy file change tracker
#[derive(Parser)]
#[command(name = "vigil")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Watch a directory and record every file change
    Watch {
        /// Directory to watch (default: current directory)
        path: Option<PathBuf>,

        /// Journal location (default: <root>/.vigil/changes.db; note that
        /// `log` and `status` only look in the default location)
        #[arg(long)]
        journal: Option<PathBuf>,

        /// Shadow store location (default: <root>/.vigil/shadow)
        #[arg(long)]
        shadow_dir: Option<PathBuf>,

        /// Debounce window in milliseconds (default: 200)
        #[arg(long)]
        debounce_ms: Option<u64>,

        /// Worker count (default: CPU count, capped at 8)
        #[arg(long)]
        workers: Option<usize>,

        /// Do not honor the root's .gitignore
        #[arg(long)]
        no_gitignore: bool,

        /// Extra ignore pattern, gitignore syntax (repeatable)
        #[arg(long = "ignore")]
        ignore: Vec<String>,
    },
    /// Show recorded changes
    Log {
        /// Number of records to show (default: 20)
        #[arg(long)]
        limit: Option<usize>,

        /// Only changes for this path (relative to the watch root)
        #[arg(long)]
        file: Option<String>,

        /// Print one JSON object per record instead of the report format
        #[arg(long)]
        json: bool,
    },
    /// Show journal and shadow store summary
    Status,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Watch {
            path,
            journal,
            shadow_dir,
            debounce_ms,
            workers,
            no_gitignore,
            ignore,
        } => {
            cmd::watch::run(path, journal, shadow_dir, debounce_ms, workers, no_gitignore, ignore)
                .await
        }
        Commands::Log { limit, file, json } => cmd::log::run(limit, file, json).await,
        Commands::Status => cmd::status::run().await,
    }
}
