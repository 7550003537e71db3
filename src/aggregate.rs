//! Merge per-chunk outcomes into the final knowledge report.
//!
//! The [`Aggregator`] is the single consumer of the dispatcher's
//! completion stream. All merges are serialized through it, so the
//! aggregate needs no locks. It does not assume any delivery order;
//! every entry carries the identity of the chunk that produced it.

use serde::Serialize;
use std::collections::HashSet;
use tokio::sync::mpsc;

use crate::models::{AnalysisResult, Chunk, MethodFact};

/// An aggregate entry attributed to the chunk that produced it.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct TaggedEntry {
    pub file: String,
    pub chunk_index: i64,
    pub text: String,
}

impl TaggedEntry {
    fn new(chunk: &Chunk, text: String) -> Self {
        Self {
            file: chunk.file_id.clone(),
            chunk_index: chunk.chunk_index,
            text,
        }
    }
}

/// The merged knowledge report.
///
/// Key names and nesting are fixed for downstream consumers of the
/// JSON output. Grows append-only during folding (`methods` also
/// checks for structural duplicates) and is frozen once every chunk
/// has reported.
#[derive(Debug, Default, Serialize)]
pub struct Aggregate {
    pub project_info: Option<serde_json::Value>,
    pub overview: Vec<TaggedEntry>,
    pub methods: Vec<MethodFact>,
    pub complexity: Vec<TaggedEntry>,
    pub notes: Vec<TaggedEntry>,
}

/// Single-threaded consumer that owns the aggregate while folding.
pub struct Aggregator {
    aggregate: Aggregate,
    seen_methods: HashSet<MethodFact>,
}

impl Aggregator {
    pub fn new(project_info: Option<serde_json::Value>) -> Self {
        Self {
            aggregate: Aggregate {
                project_info,
                ..Aggregate::default()
            },
            seen_methods: HashSet::new(),
        }
    }

    /// Fold one chunk outcome into the aggregate.
    ///
    /// Every outcome contributes at least one entry: successes append
    /// their present fields (an all-empty success still gets a note),
    /// failures are recorded as `"<kind>: <message>"` notes. No
    /// chunk's outcome is ever lost.
    pub fn absorb(&mut self, chunk: &Chunk, result: AnalysisResult) {
        match result {
            AnalysisResult::Success(analysis) => {
                if analysis.is_empty() {
                    self.aggregate.notes.push(TaggedEntry::new(
                        chunk,
                        "oracle response contained no recognized fields".to_string(),
                    ));
                    return;
                }

                if let Some(text) = analysis.overview {
                    self.aggregate.overview.push(TaggedEntry::new(chunk, text));
                }
                for fact in analysis.methods {
                    if self.seen_methods.insert(fact.clone()) {
                        self.aggregate.methods.push(fact);
                    }
                }
                if let Some(text) = analysis.complexity {
                    self.aggregate.complexity.push(TaggedEntry::new(chunk, text));
                }
                if let Some(text) = analysis.notes {
                    self.aggregate.notes.push(TaggedEntry::new(chunk, text));
                }
            }
            AnalysisResult::Failure { kind, message } => {
                self.aggregate
                    .notes
                    .push(TaggedEntry::new(chunk, format!("{}: {}", kind, message)));
            }
        }
    }

    /// Consume the completion stream until it closes, then freeze.
    pub async fn fold(
        mut self,
        mut rx: mpsc::Receiver<(Chunk, AnalysisResult)>,
    ) -> Aggregate {
        while let Some((chunk, result)) = rx.recv().await {
            self.absorb(&chunk, result);
        }
        self.finish()
    }

    pub fn finish(self) -> Aggregate {
        self.aggregate
    }
}
