//! Deadline-bounded calls to the generative model.

use crate::config::LlmConfig;
use crate::provider::{ChatRequest, Message, Provider, ProviderError};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub enum GenerateError {
    #[error("Language model request failed: {0}")]
    Provider(#[from] ProviderError),

    #[error("Language model did not answer within {0:?}")]
    Timeout(Duration),
}

pub type Result<T> = std::result::Result<T, GenerateError>;

/// A chat model plus the settings every request to it uses.
#[derive(Clone)]
pub struct Generator {
    provider: Arc<dyn Provider>,
    model: String,
    temperature: f64,
    timeout: Duration,
}

impl Generator {
    pub fn new(provider: Arc<dyn Provider>, config: &LlmConfig) -> Self {
        Self {
            provider,
            model: config.model.clone(),
            temperature: config.temperature,
            timeout: config.request_timeout(),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Sends `messages` and returns the complete reply.
    ///
    /// Fails with [`GenerateError::Timeout`] when the model takes longer than
    /// the configured deadline.
    pub async fn generate(&self, messages: Vec<Message>) -> Result<String> {
        let request = ChatRequest::new(&self.model, messages).with_temperature(self.temperature);

        debug!(model = %self.model, timeout = ?self.timeout, "Sending generation request");
        match tokio::time::timeout(self.timeout, self.provider.complete(request)).await {
            Ok(reply) => Ok(reply?),
            Err(_) => Err(GenerateError::Timeout(self.timeout)),
        }
    }
}
