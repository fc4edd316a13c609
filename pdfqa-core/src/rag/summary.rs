//! Map-reduce summarization of a chunked document.

use super::generate::{Generator, Result};
use crate::provider::Message;
use tracing::info;

#[derive(Clone)]
pub struct Summarizer {
    generator: Generator,
}

impl Summarizer {
    pub fn new(generator: Generator) -> Self {
        Self { generator }
    }

    /// Summarizes each chunk, then summarizes the partial summaries.
    ///
    /// No chunks yields an empty summary without calling the model.
    pub async fn summarize(&self, chunks: &[String]) -> Result<String> {
        if chunks.is_empty() {
            return Ok(String::new());
        }

        let mut partials = Vec::with_capacity(chunks.len());
        for (i, chunk) in chunks.iter().enumerate() {
            info!(chunk = i + 1, total = chunks.len(), "Summarizing chunk");
            partials.push(self.summarize_text(chunk).await?);
        }

        info!(partials = partials.len(), "Combining partial summaries");
        self.summarize_text(&partials.join("\n\n")).await
    }

    async fn summarize_text(&self, text: &str) -> Result<String> {
        let prompt = format!("Summarize the following text clearly:\n{}", text);
        let summary = self.generator.generate(vec![Message::user(prompt)]).await?;
        Ok(summary.trim().to_string())
    }
}
