//! Analysis pipeline orchestration.
//!
//! Coordinates the full extraction flow: scan → chunk → project
//! summary → bounded oracle dispatch → aggregation → report. Supports
//! a dry-run mode that stops before any oracle call.

use anyhow::Result;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use crate::aggregate::{Aggregate, Aggregator};
use crate::chunk;
use crate::config::Config;
use crate::dispatch;
use crate::models::Chunk;
use crate::oracle::{ChatTransport, OracleClient, OracleTransport};
use crate::progress::{AnalyzeEvent, ProgressReporter};
use crate::report;
use crate::scan;
use crate::summary;

/// Flags from the `atlas analyze` command line.
#[derive(Debug, Default)]
pub struct AnalyzeOptions {
    pub dry_run: bool,
    pub limit: Option<usize>,
    pub concurrency: Option<usize>,
    pub output: Option<PathBuf>,
}

/// Counters accumulated while folding the completion stream.
#[derive(Debug, Default, Clone, Copy)]
pub struct PipelineStats {
    pub completed: u64,
    pub failures: u64,
}

pub async fn run_analyze(
    config: &Config,
    opts: &AnalyzeOptions,
    reporter: &dyn ProgressReporter,
) -> Result<()> {
    reporter.report(AnalyzeEvent::Scanning {
        root: config.source.root.display().to_string(),
    });

    let files = scan::scan_source_tree(&config.source)?;
    let mut chunks = chunk::chunk_files(&files, &config.chunking);
    if let Some(limit) = opts.limit {
        chunks.truncate(limit);
    }

    if opts.dry_run {
        println!("analyze (dry-run)");
        println!("  files scanned: {}", files.len());
        println!("  chunks: {}", chunks.len());
        return Ok(());
    }

    let transport: Arc<dyn OracleTransport> = Arc::new(ChatTransport::new(&config.oracle)?);
    let client = Arc::new(OracleClient::new(
        transport.clone(),
        config.oracle.max_retries,
        Duration::from_secs_f64(config.oracle.base_delay_secs),
    ));

    let readme = summary::find_readme(&config.source.root);
    let project_info = summary::summarize(transport.as_ref(), readme.as_deref()).await;

    let concurrency = opts.concurrency.unwrap_or(config.analysis.concurrency);
    let total_chunks = chunks.len();
    let (aggregate, stats) =
        run_pipeline(client, chunks, concurrency, project_info, reporter).await;

    let output_path = opts
        .output
        .clone()
        .unwrap_or_else(|| config.output.path.clone());
    report::write_report(&aggregate, &output_path)?;

    println!("analyze");
    println!("  files scanned: {}", files.len());
    println!("  chunks analyzed: {}", total_chunks);
    println!("  methods extracted: {}", aggregate.methods.len());
    println!("  failed chunks: {}", stats.failures);
    println!("  report: {}", output_path.display());
    println!("ok");

    Ok(())
}

/// Drive all chunks through the oracle and fold the completion stream.
///
/// The aggregator is the only writer to the aggregate; the dispatcher
/// delivers completions in whatever order chunks finish.
pub async fn run_pipeline(
    client: Arc<OracleClient>,
    chunks: Vec<Chunk>,
    concurrency: usize,
    project_info: Option<serde_json::Value>,
    reporter: &dyn ProgressReporter,
) -> (Aggregate, PipelineStats) {
    let total = chunks.len() as u64;
    let mut rx = dispatch::run(client, chunks, concurrency);

    let mut aggregator = Aggregator::new(project_info);
    let mut stats = PipelineStats::default();

    while let Some((chunk, result)) = rx.recv().await {
        if result.is_failure() {
            stats.failures += 1;
        }
        stats.completed += 1;
        aggregator.absorb(&chunk, result);
        reporter.report(AnalyzeEvent::Analyzing {
            n: stats.completed,
            total,
        });
    }

    (aggregator.finish(), stats)
}

/// Print chunking statistics for the configured source tree without
/// touching the oracle.
pub fn run_chunks(config: &Config) -> Result<()> {
    let files = scan::scan_source_tree(&config.source)?;

    let mut total_chunks = 0usize;
    let mut largest: Option<(String, usize)> = None;

    for file in &files {
        let count = chunk::chunk_file(
            &file.file_id,
            &file.body,
            config.chunking.chunk_size_chars,
            config.chunking.overlap_chars,
        )
        .len();
        total_chunks += count;

        if largest.as_ref().map_or(true, |(_, c)| count > *c) {
            largest = Some((file.file_id.clone(), count));
        }
    }

    println!("chunks");
    println!("  files scanned: {}", files.len());
    println!("  chunks: {}", total_chunks);
    if let Some((file, count)) = largest {
        println!("  largest file: {} ({} chunks)", file, count);
    }
    println!("ok");

    Ok(())
}
