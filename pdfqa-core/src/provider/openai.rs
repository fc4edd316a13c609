//! OpenAI-compatible provider implementation.
//!
//! Works against any server exposing `/chat/completions` and `/embeddings`
//! under a common base URL (Groq, OpenAI, vLLM, llama.cpp server).

use super::types::*;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// OpenAI-compatible HTTP API provider.
///
/// Chat completions are requested without streaming; the callback receives a
/// single `done` chunk holding the full answer.
#[derive(Debug, Clone)]
pub struct OpenAiProvider {
    base_url: String,
    api_key: String,
    http_client: reqwest::Client,
}

impl OpenAiProvider {
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            http_client: reqwest::Client::new(),
        }
    }

    async fn post<T: Serialize + ?Sized>(&self, path: &str, body: &T) -> Result<reqwest::Response> {
        let url = format!("{}/{}", self.base_url, path);

        let response = self.http_client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(body)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await?;
            return Err(ProviderError::Api(format!("HTTP {}: {}", status, error_text)));
        }

        Ok(response)
    }
}

#[async_trait]
impl Provider for OpenAiProvider {
    async fn chat<'a>(
        &'a self,
        request: ChatRequest,
        mut callback: Box<dyn FnMut(ChatResponse) + Send + 'a>,
    ) -> Result<()> {
        let body = CompletionRequest {
            model: &request.model,
            messages: &request.messages,
            temperature: request.temperature,
            stream: false,
        };

        let completion = self
            .post("chat/completions", &body)
            .await?
            .json::<CompletionResponse>()
            .await?;

        let choice = completion
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| ProviderError::Other("No completion choices returned".to_string()))?;

        callback(ChatResponse {
            model: completion.model,
            content: choice.message.content.unwrap_or_default(),
            done: true,
        });

        Ok(())
    }

    async fn embed(&self, texts: &[String], model: &str) -> Result<Vec<Vec<f32>>> {
        let body = EmbeddingRequest { model, input: texts };

        let mut response = self
            .post("embeddings", &body)
            .await?
            .json::<EmbeddingResponse>()
            .await?;

        if response.data.len() != texts.len() {
            return Err(ProviderError::Other(format!(
                "Server returned {} embeddings for {} inputs",
                response.data.len(),
                texts.len()
            )));
        }

        // The API does not promise response order, only an index per item.
        response.data.sort_by_key(|item| item.index);
        Ok(response.data.into_iter().map(|item| item.embedding).collect())
    }
}

// Wire types (internal)

#[derive(Debug, Serialize)]
struct CompletionRequest<'a> {
    model: &'a str,
    messages: &'a [Message],
    temperature: f64,
    stream: bool,
}

#[derive(Debug, Deserialize)]
struct CompletionResponse {
    #[serde(default)]
    model: String,
    choices: Vec<CompletionChoice>,
}

#[derive(Debug, Deserialize)]
struct CompletionChoice {
    message: CompletionMessage,
}

#[derive(Debug, Deserialize)]
struct CompletionMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: &'a [String],
}

#[derive(Debug, Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingItem>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingItem {
    index: usize,
    embedding: Vec<f32>,
}
