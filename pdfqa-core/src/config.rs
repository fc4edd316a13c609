use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    FileRead(#[from] std::io::Error),

    #[error("Failed to parse config: {0}")]
    Parse(#[from] serde_yaml::Error),

    #[error("Invalid config: {0}")]
    Invalid(String),
}

pub type Result<T> = std::result::Result<T, ConfigError>;

/// Configuration for the whole question-answering pipeline.
///
/// Every section has defaults, so a partial `config.yaml` only needs to
/// name the values it overrides.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub llm: LlmConfig,
    #[serde(default)]
    pub rag: RagConfig,
}

/// Which HTTP backend serves chat completions and embeddings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum ProviderKind {
    /// Local or remote Ollama server
    Ollama { base_url: String },
    /// Any OpenAI-compatible endpoint (Groq, OpenAI, vLLM, ...)
    ///
    /// The API key is read from the named environment variable at startup
    /// so it never lands in the config file.
    Openai { base_url: String, api_key_env: String },
}

impl Default for ProviderKind {
    fn default() -> Self {
        Self::Ollama {
            base_url: "http://localhost:11434".to_string(),
        }
    }
}

/// Configuration for the generative model.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    pub provider: ProviderKind,
    pub model: String,
    pub temperature: f64,
    /// Deadline for a single generation call, in seconds
    pub request_timeout_secs: u64,
}

impl LlmConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

fn default_request_timeout_secs() -> u64 {
    120
}

/// Configuration for retrieval: embedding, chunking and relevance filtering.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RagConfig {
    pub embedding_model: String,
    /// Target chunk size in characters
    pub chunk_size: usize,
    /// Characters carried over from the end of one chunk into the next
    pub chunk_overlap: usize,
    /// Split separators, highest priority first. `""` splits on characters.
    pub separators: Vec<String>,
    /// Number of nearest chunks to retrieve per question
    pub top_k: usize,
    /// Minimum cosine similarity for a chunk to be used as context
    pub similarity_threshold: f32,
}

pub(crate) fn default_separators() -> Vec<String> {
    ["\n\n", "\n", ".", " ", ""]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

fn default_top_k() -> usize {
    3
}

fn default_similarity_threshold() -> f32 {
    0.3
}

impl Default for RagConfig {
    fn default() -> Self {
        Self {
            embedding_model: "all-minilm".to_string(),
            chunk_size: 1200,
            chunk_overlap: 200,
            separators: default_separators(),
            top_k: default_top_k(),
            similarity_threshold: default_similarity_threshold(),
        }
    }
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: ProviderKind::default(),
            model: "llama3.2:latest".to_string(),
            temperature: 0.2,
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

impl Config {
    /// Load configuration from a YAML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        let config: Config = serde_yaml::from_str(&contents)?;
        config.validate()?;

        Ok(config)
    }

    /// Load configuration from `config.yaml` if it exists, otherwise use defaults.
    pub fn load_or_default() -> Self {
        Self::load("config.yaml").unwrap_or_default()
    }

    /// Rejects settings the chunker or retriever cannot work with.
    pub fn validate(&self) -> Result<()> {
        let rag = &self.rag;
        if rag.chunk_size == 0 {
            return Err(ConfigError::Invalid("rag.chunk_size must be positive".into()));
        }
        if rag.chunk_overlap >= rag.chunk_size {
            return Err(ConfigError::Invalid(format!(
                "rag.chunk_overlap ({}) must be smaller than rag.chunk_size ({})",
                rag.chunk_overlap, rag.chunk_size
            )));
        }
        if rag.top_k == 0 {
            return Err(ConfigError::Invalid("rag.top_k must be at least 1".into()));
        }
        if !(-1.0..=1.0).contains(&rag.similarity_threshold) {
            return Err(ConfigError::Invalid(format!(
                "rag.similarity_threshold ({}) must be within [-1, 1]",
                rag.similarity_threshold
            )));
        }
        if self.llm.request_timeout_secs == 0 {
            return Err(ConfigError::Invalid(
                "llm.request_timeout_secs must be positive".into(),
            ));
        }
        Ok(())
    }
}
