//! LLM provider abstraction layer.
//!
//! This module defines a common interface for different LLM backends
//! (Ollama, OpenAI-compatible servers) to provide chat completions and embeddings.

mod types;
pub mod ollama;
pub mod openai;

// Re-export common types
pub use types::{
    Provider,
    ProviderError,
    Result,
    ChatRequest,
    ChatResponse,
    Message,
    EmbedRequest,
};

// Re-export provider implementations
pub use ollama::OllamaProvider;
pub use openai::OpenAiProvider;

use crate::config::{LlmConfig, ProviderKind};
use std::sync::Arc;

/// Creates the provider selected by the `llm.provider` section.
///
/// For OpenAI-compatible backends the API key is read from the configured
/// environment variable; a missing key fails here rather than on first request.
pub fn create_provider(config: &LlmConfig) -> Result<Arc<dyn Provider>> {
    match &config.provider {
        ProviderKind::Ollama { base_url } => Ok(Arc::new(OllamaProvider::new(base_url))),
        ProviderKind::Openai { base_url, api_key_env } => {
            let api_key = std::env::var(api_key_env).map_err(|_| {
                ProviderError::Other(format!(
                    "environment variable {} is not set",
                    api_key_env
                ))
            })?;
            Ok(Arc::new(OpenAiProvider::new(base_url, api_key)))
        }
    }
}
