//! # code-atlas CLI (`atlas`)
//!
//! The `atlas` binary drives the codebase knowledge extraction
//! pipeline: fetch a repository, preview chunking, and run the full
//! LLM-backed analysis.
//!
//! ## Usage
//!
//! ```bash
//! atlas --config ./atlas.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `atlas fetch` | Shallow-clone the configured repository if missing |
//! | `atlas chunks` | Print chunking statistics without calling the oracle |
//! | `atlas analyze` | Run the full pipeline and write the JSON report |
//!
//! ## Examples
//!
//! ```bash
//! # Preview how much work a run would do
//! atlas analyze --dry-run --config ./atlas.toml
//!
//! # Analyze with a higher concurrency cap, writing to a custom path
//! atlas analyze --concurrency 4 --output ./out/report.json
//!
//! # Machine-readable progress for wrapping scripts
//! atlas analyze --progress json 2> progress.ndjson
//! ```

mod aggregate;
mod analyze;
mod chunk;
mod config;
mod dispatch;
mod fetch;
mod models;
mod oracle;
mod progress;
mod report;
mod scan;
mod summary;

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use crate::analyze::AnalyzeOptions;
use crate::progress::ProgressMode;

/// code-atlas CLI — LLM-driven codebase analysis and knowledge
/// extraction.
#[derive(Parser)]
#[command(
    name = "atlas",
    about = "code-atlas — LLM-driven codebase analysis and knowledge extraction",
    version,
    long_about = "code-atlas ingests a source tree, splits it into bounded text chunks, \
    analyzes each chunk with an external LLM oracle under a concurrency cap with \
    retry/backoff, and merges all per-chunk results into a single JSON knowledge report."
)]
struct Cli {
    /// Path to configuration file (TOML).
    #[arg(long, global = true, default_value = "./atlas.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

/// Top-level CLI commands.
#[derive(Subcommand)]
enum Commands {
    /// Run the analysis pipeline and write the JSON report.
    ///
    /// Scans the source tree, chunks every matching file, summarizes
    /// the README, analyzes each chunk with the oracle, and writes the
    /// merged report. Failed chunks are recorded as notes; no single
    /// chunk failure aborts the run.
    Analyze {
        /// Show file and chunk counts without calling the oracle.
        #[arg(long)]
        dry_run: bool,

        /// Maximum number of chunks to analyze.
        #[arg(long)]
        limit: Option<usize>,

        /// Override the concurrency cap from config.
        #[arg(long)]
        concurrency: Option<usize>,

        /// Write the report to this path instead of the configured one.
        /// Use `-` for stdout.
        #[arg(long)]
        output: Option<PathBuf>,

        /// Progress reporting on stderr: `off`, `human`, or `json`.
        /// Defaults to `human` when stderr is a TTY.
        #[arg(long)]
        progress: Option<String>,
    },

    /// Print chunking statistics for the source tree.
    ///
    /// Scans and chunks every matching file, then reports totals.
    /// Never contacts the oracle.
    Chunks,

    /// Clone the configured source repository if missing.
    ///
    /// Shallow-clones `source.repo_url` into `source.root`. A no-op
    /// when the root already exists.
    Fetch,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let cfg = config::load_config(&cli.config)?;

    match cli.command {
        Commands::Analyze {
            dry_run,
            limit,
            concurrency,
            output,
            progress,
        } => {
            let mode = ProgressMode::from_flag(progress.as_deref())?;
            let reporter = mode.reporter();
            let opts = AnalyzeOptions {
                dry_run,
                limit,
                concurrency,
                output,
            };
            analyze::run_analyze(&cfg, &opts, reporter.as_ref()).await?;
        }
        Commands::Chunks => {
            analyze::run_chunks(&cfg)?;
        }
        Commands::Fetch => {
            let cloned = fetch::fetch_source(&cfg.source)?;
            if cloned {
                println!("fetched {} into {}", cfg.source.repo_url.as_deref().unwrap_or(""), cfg.source.root.display());
            } else {
                println!("source root already present: {}", cfg.source.root.display());
            }
            println!("ok");
        }
    }

    Ok(())
}
