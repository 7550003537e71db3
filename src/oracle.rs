//! Oracle client: prompt construction, transport, retry/backoff, and
//! response normalization.
//!
//! The oracle is the external text-analysis service (an LLM chat
//! endpoint) invoked once per chunk. [`OracleClient::analyze`] owns the
//! full per-call lifecycle and **never returns an error**: every
//! failure is captured as an [`AnalysisResult::Failure`] so the
//! pipeline can record it and move on.
//!
//! # Retry Strategy
//!
//! Only rate limiting is transient. A call whose error message matches
//! "rate limit", "429", or "rate_limit_exceeded" (case-insensitive) is
//! retried after an exponential backoff of `base_delay × 2^attempt`,
//! up to `max_retries` attempts. Any other transport fault aborts
//! immediately with `OracleError`; malformed response JSON is never
//! retried (`ParseError`; bad output is not transient).

use anyhow::{anyhow, bail, Result};
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

use crate::config::OracleConfig;
use crate::models::{AnalysisResult, Chunk, ChunkAnalysis, FailureKind};

/// Raw text transport to the analysis oracle.
///
/// This is the single seam between the pipeline and the outside world:
/// production uses [`ChatTransport`], tests substitute scripted
/// implementations.
#[async_trait]
pub trait OracleTransport: Send + Sync {
    /// Send one prompt and return the oracle's raw text response.
    async fn complete(&self, prompt: &str) -> Result<String>;
}

/// Transport calling an OpenAI-style `/v1/chat/completions` endpoint.
pub struct ChatTransport {
    endpoint: String,
    model: String,
    api_key: String,
    client: reqwest::Client,
}

impl ChatTransport {
    /// Create a transport from configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the API key environment variable is unset
    /// or the HTTP client cannot be constructed.
    pub fn new(config: &OracleConfig) -> Result<Self> {
        let api_key = std::env::var(&config.api_key_env)
            .map_err(|_| anyhow!("{} environment variable not set", config.api_key_env))?;

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            endpoint: config.endpoint.clone(),
            model: config.model.clone(),
            api_key,
            client,
        })
    }
}

#[async_trait]
impl OracleTransport for ChatTransport {
    async fn complete(&self, prompt: &str) -> Result<String> {
        let body = serde_json::json!({
            "model": self.model,
            "temperature": 0,
            "messages": [{ "role": "user", "content": prompt }],
        });

        let response = self
            .client
            .post(&self.endpoint)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body_text = response.text().await.unwrap_or_default();
            bail!("oracle API error {}: {}", status, body_text);
        }

        let json: serde_json::Value = response.json().await?;
        json.get("choices")
            .and_then(|c| c.get(0))
            .and_then(|c| c.get("message"))
            .and_then(|m| m.get("content"))
            .and_then(|c| c.as_str())
            .map(|s| s.to_string())
            .ok_or_else(|| anyhow!("oracle response missing choices[0].message.content"))
    }
}

/// Drives a single chunk through the oracle with retry and exponential
/// backoff on transient rate limiting.
///
/// Holds no mutable state. Every invocation is independent, so one
/// client is shared across all dispatcher workers without locking.
pub struct OracleClient {
    transport: Arc<dyn OracleTransport>,
    max_retries: u32,
    base_delay: Duration,
}

impl OracleClient {
    pub fn new(transport: Arc<dyn OracleTransport>, max_retries: u32, base_delay: Duration) -> Self {
        Self {
            transport,
            max_retries,
            base_delay,
        }
    }

    /// Analyze one chunk. All failures are returned as data; this
    /// function never errors.
    ///
    /// The backoff sleep suspends only this invocation; concurrent
    /// analyses of other chunks keep making progress.
    pub async fn analyze(&self, chunk: &Chunk) -> AnalysisResult {
        let prompt = build_prompt(&chunk.text);
        let mut attempt: u32 = 0;

        loop {
            if attempt >= self.max_retries {
                return AnalysisResult::failure(
                    FailureKind::RateLimit,
                    format!("rate limit exceeded after {} retries", self.max_retries),
                );
            }

            match self.transport.complete(&prompt).await {
                Ok(raw) => {
                    debug!(
                        file = %chunk.file_id,
                        chunk_index = chunk.chunk_index,
                        "oracle response received"
                    );
                    let cleaned = clean_json_payload(&raw);
                    return match serde_json::from_str::<ChunkAnalysis>(&cleaned) {
                        Ok(analysis) => AnalysisResult::Success(analysis),
                        Err(e) => AnalysisResult::failure(
                            FailureKind::Parse,
                            format!("invalid oracle JSON: {}", e),
                        ),
                    };
                }
                Err(e) => {
                    let message = format!("{:#}", e);
                    if !is_rate_limited(&message) {
                        return AnalysisResult::failure(FailureKind::Oracle, message);
                    }

                    let delay = self.base_delay * 2u32.saturating_pow(attempt.min(20));
                    warn!(
                        file = %chunk.file_id,
                        chunk_index = chunk.chunk_index,
                        delay_secs = delay.as_secs_f64(),
                        attempt = attempt + 1,
                        max_retries = self.max_retries,
                        "oracle rate limited, backing off"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
            }
        }
    }
}

/// Transient-failure classification: rate limiting in any of the
/// shapes upstream APIs report it.
fn is_rate_limited(message: &str) -> bool {
    let lower = message.to_lowercase();
    lower.contains("rate limit") || lower.contains("429") || lower.contains("rate_limit_exceeded")
}

/// Normalize a raw oracle response into parseable JSON.
///
/// Keeps only the outermost `{...}` span (models tend to wrap output
/// in prose or markdown fences) and drops trailing commas before a
/// closing brace or bracket. Returns an empty string when no object
/// span exists, which the caller turns into a `ParseError`.
pub fn clean_json_payload(raw: &str) -> String {
    let start = match raw.find('{') {
        Some(i) => i,
        None => return String::new(),
    };
    let end = match raw.rfind('}') {
        Some(i) => i + 1,
        None => return String::new(),
    };
    if start >= end {
        return String::new();
    }
    let span = &raw[start..end];

    let chars: Vec<char> = span.chars().collect();
    let mut out = String::with_capacity(span.len());
    let mut i = 0;
    while i < chars.len() {
        if chars[i] == ',' {
            let mut j = i + 1;
            while j < chars.len() && chars[j].is_whitespace() {
                j += 1;
            }
            if j < chars.len() && (chars[j] == '}' || chars[j] == ']') {
                i += 1;
                continue;
            }
        }
        out.push(chars[i]);
        i += 1;
    }
    out
}

/// Fixed-shape analysis prompt embedding the chunk text.
fn build_prompt(chunk_text: &str) -> String {
    format!(
        "You are an expert software architect analyzing a codebase to produce onboarding \
         documentation.\n\
         Analyze the following code chunk and return a JSON object with these keys:\n\
         - \"overview\": a concise, high-level summary of the code's purpose\n\
         - \"methods\": an array of objects, one per key function, each with \"name\", \
         \"signature\", and \"description\"\n\
         - \"complexity\": a brief assessment (simple, moderate, complex) and why\n\
         - \"notes\": design patterns, dependencies, or potential issues worth recording\n\
         All property names and string values must use double quotes. Do not use trailing \
         commas. Return ONLY the JSON object, with no commentary or markdown.\n\n\
         Code chunk:\n{}\n",
        chunk_text
    )
}
