use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub source: SourceConfig,
    #[serde(default)]
    pub chunking: ChunkingConfig,
    #[serde(default)]
    pub oracle: OracleConfig,
    #[serde(default)]
    pub analysis: AnalysisConfig,
    #[serde(default)]
    pub output: OutputConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct SourceConfig {
    pub root: PathBuf,
    #[serde(default)]
    pub repo_url: Option<String>,
    #[serde(default = "default_include_globs")]
    pub include_globs: Vec<String>,
    #[serde(default)]
    pub exclude_globs: Vec<String>,
    #[serde(default)]
    pub follow_symlinks: bool,
}

pub fn default_include_globs() -> Vec<String> {
    [
        "**/*.rs", "**/*.py", "**/*.js", "**/*.ts", "**/*.go", "**/*.java", "**/*.c",
        "**/*.h", "**/*.cpp", "**/*.cs", "**/*.rb", "**/*.php", "**/*.sh", "**/*.sql",
        "**/*.kt", "**/*.swift", "**/*.scala",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

#[derive(Debug, Deserialize, Clone)]
pub struct ChunkingConfig {
    #[serde(default = "default_chunk_size_chars")]
    pub chunk_size_chars: usize,
    #[serde(default = "default_overlap_chars")]
    pub overlap_chars: usize,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            chunk_size_chars: default_chunk_size_chars(),
            overlap_chars: default_overlap_chars(),
        }
    }
}

fn default_chunk_size_chars() -> usize {
    2000
}
fn default_overlap_chars() -> usize {
    100
}

#[derive(Debug, Deserialize, Clone)]
pub struct OracleConfig {
    #[serde(default = "default_endpoint")]
    pub endpoint: String,
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    #[serde(default = "default_base_delay_secs")]
    pub base_delay_secs: f64,
}

impl Default for OracleConfig {
    fn default() -> Self {
        Self {
            endpoint: default_endpoint(),
            model: default_model(),
            api_key_env: default_api_key_env(),
            timeout_secs: default_timeout_secs(),
            max_retries: default_max_retries(),
            base_delay_secs: default_base_delay_secs(),
        }
    }
}

fn default_endpoint() -> String {
    "https://api.openai.com/v1/chat/completions".to_string()
}
fn default_model() -> String {
    "gpt-3.5-turbo".to_string()
}
fn default_api_key_env() -> String {
    "OPENAI_API_KEY".to_string()
}
fn default_timeout_secs() -> u64 {
    60
}
fn default_max_retries() -> u32 {
    5
}
fn default_base_delay_secs() -> f64 {
    5.0
}

#[derive(Debug, Deserialize, Clone)]
pub struct AnalysisConfig {
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            concurrency: default_concurrency(),
        }
    }
}

fn default_concurrency() -> usize {
    2
}

#[derive(Debug, Deserialize, Clone)]
pub struct OutputConfig {
    #[serde(default = "default_output_path")]
    pub path: PathBuf,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            path: default_output_path(),
        }
    }
}

fn default_output_path() -> PathBuf {
    PathBuf::from("./output/extracted_knowledge.json")
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config: Config = toml::from_str(&content).with_context(|| "Failed to parse config file")?;

    // Validate chunking
    if config.chunking.chunk_size_chars == 0 {
        anyhow::bail!("chunking.chunk_size_chars must be > 0");
    }
    if config.chunking.overlap_chars >= config.chunking.chunk_size_chars {
        anyhow::bail!("chunking.overlap_chars must be < chunking.chunk_size_chars");
    }

    // Validate analysis
    if config.analysis.concurrency < 1 {
        anyhow::bail!("analysis.concurrency must be >= 1");
    }

    // Validate oracle
    if config.oracle.endpoint.is_empty() {
        anyhow::bail!("oracle.endpoint must not be empty");
    }
    if config.oracle.model.is_empty() {
        anyhow::bail!("oracle.model must not be empty");
    }
    if config.oracle.max_retries < 1 {
        anyhow::bail!("oracle.max_retries must be >= 1");
    }
    if !(config.oracle.base_delay_secs > 0.0) || !config.oracle.base_delay_secs.is_finite() {
        anyhow::bail!("oracle.base_delay_secs must be a positive number");
    }

    Ok(config)
}
