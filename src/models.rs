//! Core data models used throughout code-atlas.
//!
//! These types represent the source files, chunks, and per-chunk
//! analysis outcomes that flow through the extraction pipeline.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// A file discovered under the source root, prior to chunking.
#[derive(Debug, Clone)]
pub struct SourceFile {
    /// Path relative to the source root. Stable across machines, used
    /// as the file half of every chunk identity.
    pub file_id: String,
    pub body: String,
}

/// A bounded slice of one source file's text.
///
/// `(file_id, chunk_index)` is the stable identity used to attribute
/// every downstream result back to its origin. Chunks are immutable:
/// created by the chunker, consumed exactly once by the dispatcher.
#[derive(Debug, Clone)]
pub struct Chunk {
    pub file_id: String,
    pub chunk_index: i64,
    pub text: String,
    /// SHA-256 of the text, for staleness detection and debugging.
    pub hash: String,
}

impl Chunk {
    pub fn new(file_id: &str, chunk_index: i64, text: &str) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(text.as_bytes());
        let hash = format!("{:x}", hasher.finalize());

        Self {
            file_id: file_id.to_string(),
            chunk_index,
            text: text.to_string(),
            hash,
        }
    }
}

/// One key method or function described by the oracle.
///
/// Equality is structural: two facts are duplicates iff all three
/// fields match, which drives deduplication in the aggregate.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MethodFact {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub signature: String,
    #[serde(default)]
    pub description: String,
}

/// Parsed payload of a successful per-chunk analysis.
///
/// Every field is optional: the oracle omits keys it has nothing to
/// say about, and the aggregator appends only what is present.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ChunkAnalysis {
    #[serde(default)]
    pub overview: Option<String>,
    #[serde(default)]
    pub methods: Vec<MethodFact>,
    #[serde(default)]
    pub complexity: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
}

impl ChunkAnalysis {
    /// True when the oracle returned an object with none of the
    /// recognized fields populated.
    pub fn is_empty(&self) -> bool {
        self.overview.is_none()
            && self.methods.is_empty()
            && self.complexity.is_none()
            && self.notes.is_none()
    }
}

/// Why a chunk's analysis terminally failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// Oracle output did not normalize to valid JSON. Not transient.
    Parse,
    /// Rate limiting persisted through every retry.
    RateLimit,
    /// Any other transport or invocation fault. Not retried.
    Oracle,
    /// The worker task died (panicked) before producing a result.
    Join,
}

impl FailureKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            FailureKind::Parse => "ParseError",
            FailureKind::RateLimit => "RateLimitExceeded",
            FailureKind::Oracle => "OracleError",
            FailureKind::Join => "JoinError",
        }
    }
}

impl std::fmt::Display for FailureKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of one chunk's trip through the oracle.
///
/// Exactly one variant holds per completed chunk. Failures are data,
/// not errors: the pipeline records them and keeps going.
#[derive(Debug, Clone)]
pub enum AnalysisResult {
    Success(ChunkAnalysis),
    Failure { kind: FailureKind, message: String },
}

impl AnalysisResult {
    pub fn failure(kind: FailureKind, message: impl Into<String>) -> Self {
        AnalysisResult::Failure {
            kind,
            message: message.into(),
        }
    }

    pub fn is_failure(&self) -> bool {
        matches!(self, AnalysisResult::Failure { .. })
    }
}
