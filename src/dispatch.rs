//! Bounded-concurrency fan-out of oracle calls over all chunks.
//!
//! Results are delivered in **completion order**, not input order: a
//! chunk stuck in rate-limit backoff never stalls chunks that finished
//! quickly. Every input chunk yields exactly one `(Chunk,
//! AnalysisResult)` pair: worker panics are converted to failures
//! rather than dropped, and attribution is always recoverable because
//! each pair carries its originating chunk.

use std::sync::Arc;
use tokio::sync::{mpsc, Semaphore};

use crate::models::{AnalysisResult, Chunk, FailureKind};
use crate::oracle::OracleClient;

/// Spawn a bounded worker per chunk and return the completion stream.
///
/// At most `concurrency` oracle calls are in flight at any instant;
/// the rest queue on the semaphore until a slot frees. The channel
/// closes once every chunk has reported. Dropping the receiver is the
/// caller-initiated abort: in-flight calls finish and their sends fail
/// silently.
pub fn run(
    client: Arc<OracleClient>,
    chunks: Vec<Chunk>,
    concurrency: usize,
) -> mpsc::Receiver<(Chunk, AnalysisResult)> {
    let concurrency = concurrency.max(1);
    let (tx, rx) = mpsc::channel(concurrency);
    let semaphore = Arc::new(Semaphore::new(concurrency));

    for chunk in chunks {
        let tx = tx.clone();
        let client = client.clone();
        let semaphore = semaphore.clone();

        tokio::spawn(async move {
            // The semaphore is never closed, so acquisition only fails
            // if the runtime is tearing down.
            let Ok(_permit) = semaphore.acquire_owned().await else {
                return;
            };

            // Run the analysis on its own task so a panic surfaces
            // here as a JoinError instead of losing the chunk.
            let worker = tokio::spawn({
                let client = client.clone();
                let chunk = chunk.clone();
                async move { client.analyze(&chunk).await }
            });

            let result = match worker.await {
                Ok(result) => result,
                Err(e) => AnalysisResult::failure(FailureKind::Join, e.to_string()),
            };

            let _ = tx.send((chunk, result)).await;
        });
    }

    rx
}
