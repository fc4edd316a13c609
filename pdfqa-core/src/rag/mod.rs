//! Retrieval Augmented Generation (RAG) over a single PDF document.
//!
//! This module implements the complete pipeline for answering questions from
//! the content of one uploaded document.
//!
//! # Overview
//!
//! RAG (Retrieval Augmented Generation) is a technique that combines:
//! 1. **Retrieval**: Finding the passages of the document closest to a question
//! 2. **Augmentation**: Adding those passages as context to the LLM prompt
//! 3. **Generation**: The LLM answers using only that context
//!
//! # Architecture
//!
//! - [`normalize_text`]: cleans up raw PDF text
//! - [`Chunker`]: recursive, overlapping text chunking
//! - [`Embedder`]: unit-length embeddings through a [`Provider`]
//! - [`FlatIndex`]: exact k-nearest-neighbor search by squared L2 distance
//! - [`DocumentSession`]: the active `(index, chunks)` pair
//! - [`Answerer`]: relevance filtering and answer synthesis
//! - [`RagEngine`]: orchestrates all of the above
//!
//! # How It Works
//!
//! 1. **Indexing Phase** ([`RagEngine::build_index`]):
//!    - Text is extracted from the PDF and normalized
//!    - The text is split into chunks (default: 1200 chars with 200 char overlap)
//!    - Each chunk is embedded and the vectors are indexed
//!    - The new index replaces the session's previous document
//!
//! 2. **Retrieval Phase** ([`RagEngine::retrieve`]):
//!    - The question is embedded
//!    - The index returns the top-k nearest chunks
//!    - Chunks below the cosine similarity threshold are discarded
//!
//! 3. **Generation Phase** ([`RagEngine::search`]):
//!    - Surviving chunks become the prompt context
//!    - The LLM answers from that context only, or declines
//!
//! # Concurrency
//!
//! Searches read an immutable snapshot of the session and may run in
//! parallel. Builds are serialized per session and swap the new document in
//! atomically; a search never observes a half-built index.

mod answer;
mod chunker;
mod embedder;
mod generate;
mod index;
mod normalize;
mod session;
mod summary;
mod types;

pub use answer::{Answer, AnswerOutcome, Answerer, NO_ANSWER};
pub use chunker::{Chunk, Chunker};
pub use embedder::{Embedder, EmbedderError};
pub use generate::{GenerateError, Generator};
pub use index::{FlatIndex, IndexError, Neighbor};
pub use normalize::normalize_text;
pub use session::{BuildGuard, DocumentSession, IndexedDocument};
pub use summary::Summarizer;
pub use types::{BuildSummary, DocumentStats, SearchHit};

use crate::config::{Config, RagConfig};
use crate::pdf::{ExtractError, PdfExtractor, TextExtractor};
use crate::provider::Provider;
use serde::Serialize;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info};

/// Number of chunks reported by [`RagEngine::inspect`].
const SAMPLE_CHUNKS: usize = 3;

#[derive(Debug, Error)]
pub enum RagError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("No index has been built yet")]
    IndexNotBuilt,

    #[error("Could not read document: {0}")]
    Extract(#[from] ExtractError),

    #[error("Embedder error: {0}")]
    Embedder(#[from] EmbedderError),

    #[error("Index error: {0}")]
    Index(#[from] IndexError),

    #[error("Generation error: {0}")]
    Generation(#[from] GenerateError),
}

/// Coarse error classes callers branch on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Bad payload or empty query. Nothing was changed; fix the input.
    InvalidInput,
    /// No document has been indexed yet.
    IndexNotBuilt,
    /// Vectors of different sizes met. A logic error, not recoverable.
    DimensionMismatch,
    /// The embedding or language model service failed. Safe to retry.
    UpstreamUnavailable,
}

impl RagError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            RagError::InvalidInput(_) | RagError::Extract(_) => ErrorKind::InvalidInput,
            RagError::IndexNotBuilt | RagError::Index(IndexError::NotBuilt) => {
                ErrorKind::IndexNotBuilt
            }
            RagError::Index(IndexError::DimensionMismatch { .. })
            | RagError::Embedder(EmbedderError::DimensionMismatch { .. }) => {
                ErrorKind::DimensionMismatch
            }
            RagError::Embedder(_) | RagError::Generation(_) => ErrorKind::UpstreamUnavailable,
        }
    }
}

pub type Result<T> = std::result::Result<T, RagError>;

/// The main RAG engine orchestrating all components.
///
/// The engine ties together text extraction, chunking, embedding, the vector
/// index and answer synthesis. Model handles are created once and injected;
/// the engine itself holds no global state.
///
/// # Thread Safety
///
/// The engine is `Clone` and can be shared across tasks. Clones share the same
/// [`DocumentSession`].
///
/// # Configuration
///
/// The engine uses configuration from [`Config`]:
/// - `rag.embedding_model`: Model for generating embeddings
/// - `rag.chunk_size` / `rag.chunk_overlap` / `rag.separators`: chunking policy
/// - `rag.top_k`: Number of chunks retrieved per question
/// - `rag.similarity_threshold`: Minimum cosine similarity for a chunk to be used
/// - `llm.*`: generation model, temperature and deadline
#[derive(Clone)]
pub struct RagEngine {
    embedder: Embedder,
    extractor: Arc<dyn TextExtractor>,
    chunker: Chunker,
    answerer: Answerer,
    summarizer: Summarizer,
    session: Arc<DocumentSession>,
    top_k: usize,
    similarity_threshold: f32,
}

impl RagEngine {
    /// Creates a new RAG engine, loading the embedding model.
    ///
    /// The same provider serves embeddings and generation.
    ///
    /// # Example
    ///
    /// ```no_run
    /// # use pdfqa_core::{Config, RagEngine, provider::create_provider};
    /// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
    /// let config = Config::default();
    /// let provider = create_provider(&config.llm)?;
    /// let engine = RagEngine::new(&config, provider).await?;
    ///
    /// let pdf = std::fs::read("paper.pdf")?;
    /// engine.build_index(&pdf).await?;
    /// let answer = engine.search("What is the main result?").await?;
    /// println!("{}", answer.answer);
    /// # Ok(())
    /// # }
    /// ```
    pub async fn new(config: &Config, provider: Arc<dyn Provider>) -> Result<Self> {
        let embedder = Embedder::load(Arc::clone(&provider), config.rag.embedding_model.clone()).await?;
        Ok(Self::with_embedder(config, provider, embedder))
    }

    /// Creates an engine around an already loaded embedder.
    pub fn with_embedder(config: &Config, provider: Arc<dyn Provider>, embedder: Embedder) -> Self {
        let generator = Generator::new(provider, &config.llm);

        Self {
            embedder,
            extractor: Arc::new(PdfExtractor),
            chunker: Chunker::from_config(&config.rag),
            answerer: Answerer::new(generator.clone()),
            summarizer: Summarizer::new(generator),
            session: Arc::new(DocumentSession::new()),
            top_k: config.rag.top_k,
            similarity_threshold: config.rag.similarity_threshold,
        }
    }

    /// Replaces the PDF text extractor.
    pub fn with_extractor(mut self, extractor: Arc<dyn TextExtractor>) -> Self {
        self.extractor = extractor;
        self
    }

    pub fn session(&self) -> &Arc<DocumentSession> {
        &self.session
    }

    /// Extracts raw text from a PDF payload on the blocking thread pool.
    pub async fn extract_text(&self, pdf_bytes: &[u8]) -> Result<String> {
        let extractor = Arc::clone(&self.extractor);
        let bytes = pdf_bytes.to_vec();

        tokio::task::spawn_blocking(move || extractor.extract(&bytes))
            .await
            .map_err(|e| RagError::InvalidInput(format!("text extraction aborted: {}", e)))?
            .map_err(RagError::from)
    }

    /// Normalizes raw text and splits it into cleaned, non-empty chunks.
    pub fn chunk_document(&self, raw_text: &str) -> Vec<String> {
        chunk_normalized(&self.chunker, &normalize_text(raw_text))
    }

    /// Builds the index for a PDF, replacing the session's current document.
    ///
    /// The payload is validated before anything is touched: an unreadable PDF
    /// fails with [`ErrorKind::InvalidInput`] and leaves the session as it was.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The payload is empty or not a readable PDF
    /// - Embedding generation fails (the session is then left empty)
    pub async fn build_index(&self, pdf_bytes: &[u8]) -> Result<BuildSummary> {
        let text = self.extract_text(pdf_bytes).await?;
        self.build_index_from_text(&text).await
    }

    /// Builds the index from already extracted raw text.
    pub async fn build_index_from_text(&self, raw_text: &str) -> Result<BuildSummary> {
        let build = self.session.begin_build().await;
        build.reset();

        let chunks = self.chunk_document(raw_text);
        info!(chunks = chunks.len(), "Chunked document");

        let vectors = self.embedder.embed_batch(&chunks).await?;
        let mut index = FlatIndex::new(self.embedder.dimension());
        index.build(&vectors)?;

        let summary = BuildSummary {
            total_chunks: chunks.len(),
            embedding_dimension: index.dimension(),
        };
        build.install(IndexedDocument::new(index, chunks));

        info!(
            chunks = summary.total_chunks,
            dimension = summary.embedding_dimension,
            "Index built"
        );
        Ok(summary)
    }

    /// Finds the chunks relevant to `query`.
    ///
    /// Returns at most `top_k` hits, most relevant first, keeping only those
    /// whose cosine similarity is at least the configured threshold. An empty
    /// result is not an error.
    ///
    /// # Errors
    ///
    /// - [`ErrorKind::InvalidInput`] if the query is blank
    /// - [`ErrorKind::IndexNotBuilt`] if no document has been indexed
    pub async fn retrieve(&self, query: &str) -> Result<Vec<SearchHit>> {
        let question = query.trim();
        if question.is_empty() {
            return Err(RagError::InvalidInput("Query is required".to_string()));
        }

        let document = self.session.snapshot().ok_or(RagError::IndexNotBuilt)?;

        debug!(query = %question, "Embedding query");
        let query_vector = self.embedder.embed(question).await?;
        let neighbors = document.index().search(&query_vector, self.top_k)?;

        let hits: Vec<SearchHit> = neighbors
            .into_iter()
            .filter(|n| n.similarity() >= self.similarity_threshold)
            .filter_map(|n| {
                document.chunk(n.index).map(|text| SearchHit {
                    chunk_index: n.index,
                    text: text.to_string(),
                    distance: n.distance,
                    similarity: n.similarity(),
                })
            })
            .collect();

        for hit in &hits {
            debug!(chunk = hit.chunk_index, similarity = hit.similarity, "Relevant chunk");
        }
        info!(
            hits = hits.len(),
            threshold = self.similarity_threshold,
            "Retrieved relevant chunks"
        );
        Ok(hits)
    }

    /// Answers `query` from the indexed document.
    ///
    /// When no chunk is relevant the canned [`NO_ANSWER`] reply is returned
    /// with [`AnswerOutcome::NoRelevantContent`]; this is a successful result.
    ///
    /// # Errors
    ///
    /// Everything [`retrieve`](Self::retrieve) returns, plus
    /// [`ErrorKind::UpstreamUnavailable`] when the language model fails or
    /// misses its deadline.
    pub async fn search(&self, query: &str) -> Result<Answer> {
        let question = query.trim();
        let hits = self.retrieve(question).await?;

        if hits.is_empty() {
            return Ok(Answer::no_relevant_content(question));
        }

        let sources = hits.into_iter().map(|hit| hit.text).collect();
        Ok(self.answerer.answer(question, sources).await?)
    }

    /// Reports size figures for a PDF without indexing it.
    pub async fn inspect(&self, pdf_bytes: &[u8]) -> Result<DocumentStats> {
        let text = self.extract_text(pdf_bytes).await?;
        Ok(self.stats_for_text(&text))
    }

    /// Reports size figures for raw text under the current chunking policy.
    pub fn stats_for_text(&self, raw_text: &str) -> DocumentStats {
        text_stats(&self.chunker, raw_text)
    }

    /// Summarizes a PDF with the language model. Does not touch the session.
    pub async fn summarize(&self, pdf_bytes: &[u8]) -> Result<String> {
        let text = self.extract_text(pdf_bytes).await?;
        self.summarize_text(&text).await
    }

    /// Summarizes already extracted raw text.
    pub async fn summarize_text(&self, raw_text: &str) -> Result<String> {
        let chunks = self.chunk_document(raw_text);
        Ok(self.summarizer.summarize(&chunks).await?)
    }
}

fn chunk_normalized(chunker: &Chunker, text: &str) -> Vec<String> {
    chunker
        .split_text(text)
        .iter()
        .map(|chunk| normalize_text(chunk))
        .filter(|chunk| !chunk.is_empty())
        .collect()
}

fn text_stats(chunker: &Chunker, raw_text: &str) -> DocumentStats {
    let text = normalize_text(raw_text);
    let chunks = chunk_normalized(chunker, &text);

    DocumentStats {
        total_characters: text.chars().count(),
        total_words: text.split_whitespace().count(),
        total_chunks: chunks.len(),
        sample_chunks: chunks.into_iter().take(SAMPLE_CHUNKS).collect(),
    }
}

/// Reports size figures for a document without any model.
///
/// Uses the same extraction, normalization and chunking as indexing, so the
/// chunk count matches what [`RagEngine::build_index`] would produce.
pub fn document_stats(
    config: &RagConfig,
    extractor: &dyn TextExtractor,
    pdf_bytes: &[u8],
) -> Result<DocumentStats> {
    let text = extractor.extract(pdf_bytes)?;
    Ok(text_stats(&Chunker::from_config(config), &text))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::{ChatRequest, ChatResponse, ProviderError};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Mutex;

    const VOCABULARY: [&str; 8] = [
        "capital", "france", "paris", "banana", "yellow", "fruit", "sky", "color",
    ];

    /// Keyword-count embeddings and a scripted chat reply.
    struct FakeProvider {
        reply: std::result::Result<String, String>,
        prompts: Mutex<Vec<String>>,
        embed_down: AtomicBool,
    }

    impl FakeProvider {
        fn replying(reply: &str) -> Arc<Self> {
            Arc::new(Self {
                reply: Ok(reply.to_string()),
                prompts: Mutex::new(Vec::new()),
                embed_down: AtomicBool::new(false),
            })
        }

        fn failing(message: &str) -> Arc<Self> {
            Arc::new(Self {
                reply: Err(message.to_string()),
                prompts: Mutex::new(Vec::new()),
                embed_down: AtomicBool::new(false),
            })
        }

        fn prompts(&self) -> Vec<String> {
            self.prompts.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl Provider for FakeProvider {
        async fn chat<'a>(
            &'a self,
            request: ChatRequest,
            mut callback: Box<dyn FnMut(ChatResponse) + Send + 'a>,
        ) -> crate::provider::Result<()> {
            let prompt = request.messages.last().map(|m| m.content.clone()).unwrap_or_default();
            self.prompts.lock().unwrap().push(prompt);

            match &self.reply {
                Ok(reply) => {
                    callback(ChatResponse {
                        model: request.model,
                        content: reply.clone(),
                        done: true,
                    });
                    Ok(())
                }
                Err(message) => Err(ProviderError::Api(message.clone())),
            }
        }

        async fn embed(&self, texts: &[String], _model: &str) -> crate::provider::Result<Vec<Vec<f32>>> {
            if self.embed_down.load(Ordering::SeqCst) {
                return Err(ProviderError::Api("embedding service unavailable".to_string()));
            }
            Ok(texts.iter().map(|t| keyword_vector(t)).collect())
        }
    }

    fn keyword_vector(text: &str) -> Vec<f32> {
        let lower = text.to_lowercase();
        let mut vector: Vec<f32> = VOCABULARY
            .iter()
            .map(|word| if lower.contains(word) { 1.0 } else { 0.0 })
            .collect();
        // Keeps every vector non-zero.
        vector.push(0.1);
        vector
    }

    /// Treats the payload as UTF-8 text instead of PDF.
    struct PlainTextExtractor;

    impl TextExtractor for PlainTextExtractor {
        fn extract(&self, bytes: &[u8]) -> crate::pdf::Result<String> {
            if bytes.is_empty() {
                return Err(ExtractError::Empty);
            }
            String::from_utf8(bytes.to_vec()).map_err(|e| ExtractError::Unreadable(e.to_string()))
        }
    }

    fn test_config() -> Config {
        let mut config = Config::default();
        config.rag.chunk_size = 40;
        config.rag.chunk_overlap = 0;
        config
    }

    async fn engine(provider: Arc<FakeProvider>) -> RagEngine {
        engine_with(&test_config(), provider).await
    }

    async fn engine_with(config: &Config, provider: Arc<FakeProvider>) -> RagEngine {
        RagEngine::new(config, provider)
            .await
            .unwrap()
            .with_extractor(Arc::new(PlainTextExtractor))
    }

    const FRUIT_AND_CAPITALS: &str = "The capital of France is Paris.\nBananas are yellow fruit.";

    /// Two chunks that both mention the capital; the second matches the
    /// France question more closely than the first.
    const TWO_CAPITALS: &str = "The capital is Paris.\nFrance has a capital.";

    #[tokio::test]
    async fn test_build_reports_chunks_and_dimension() {
        let engine = engine(FakeProvider::replying("Paris.")).await;
        let summary = engine.build_index(FRUIT_AND_CAPITALS.as_bytes()).await.unwrap();

        assert_eq!(summary, BuildSummary { total_chunks: 2, embedding_dimension: 9 });
        let document = engine.session().snapshot().unwrap();
        assert_eq!(
            document.chunks(),
            ["The capital of France is Paris.", "Bananas are yellow fruit."]
        );
        assert_eq!(document.index().len(), document.chunks().len());
    }

    #[tokio::test]
    async fn test_relevant_chunk_is_used_as_source() {
        let provider = FakeProvider::replying("Paris.");
        let engine = engine(provider.clone()).await;
        engine.build_index(FRUIT_AND_CAPITALS.as_bytes()).await.unwrap();

        let hits = engine.retrieve("What is the capital of France?").await.unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].chunk_index, 0);
        assert!(hits[0].similarity >= 0.3);

        let answer = engine.search("What is the capital of France?").await.unwrap();
        assert_eq!(answer.question, "What is the capital of France?");
        assert_eq!(answer.answer, "Paris.");
        assert_eq!(answer.sources, vec!["The capital of France is Paris."]);
        assert_eq!(answer.outcome, AnswerOutcome::Answered);

        let prompts = provider.prompts();
        assert_eq!(prompts.len(), 1);
        assert!(prompts[0].contains("The capital of France is Paris."));
        assert!(!prompts[0].contains("Bananas"));
    }

    #[tokio::test]
    async fn test_irrelevant_question_gets_canned_answer() {
        let provider = FakeProvider::replying("should not be called");
        let engine = engine(provider.clone()).await;
        engine.build_index(FRUIT_AND_CAPITALS.as_bytes()).await.unwrap();

        let answer = engine.search("What color is the sky?").await.unwrap();
        assert_eq!(answer.answer, NO_ANSWER);
        assert!(answer.sources.is_empty());
        assert_eq!(answer.outcome, AnswerOutcome::NoRelevantContent);
        assert!(provider.prompts().is_empty());
    }

    #[tokio::test]
    async fn test_search_before_build() {
        let engine = engine(FakeProvider::replying("x")).await;
        let err = engine.search("What is the capital of France?").await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::IndexNotBuilt);
    }

    #[tokio::test]
    async fn test_empty_query_is_invalid() {
        let engine = engine(FakeProvider::replying("x")).await;
        engine.build_index(FRUIT_AND_CAPITALS.as_bytes()).await.unwrap();

        let err = engine.search("   ").await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidInput);
    }

    #[tokio::test]
    async fn test_empty_query_checked_before_index() {
        let engine = engine(FakeProvider::replying("x")).await;
        let err = engine.search("").await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidInput);
    }

    #[tokio::test]
    async fn test_second_build_replaces_first() {
        let engine = engine(FakeProvider::replying("Blue.")).await;
        engine.build_index(FRUIT_AND_CAPITALS.as_bytes()).await.unwrap();
        engine.build_index(b"The sky has a blue color.").await.unwrap();

        let document = engine.session().snapshot().unwrap();
        assert_eq!(document.chunks(), ["The sky has a blue color."]);

        let sky = engine.search("What color is the sky?").await.unwrap();
        assert_eq!(sky.sources, vec!["The sky has a blue color."]);

        let france = engine.search("What is the capital of France?").await.unwrap();
        assert_eq!(france.outcome, AnswerOutcome::NoRelevantContent);
        assert!(france.sources.is_empty());
    }

    #[tokio::test]
    async fn test_invalid_payload_leaves_session_untouched() {
        let engine = engine(FakeProvider::replying("x")).await;
        engine.build_index(FRUIT_AND_CAPITALS.as_bytes()).await.unwrap();

        let err = engine.build_index(&[]).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidInput);

        let document = engine.session().snapshot().unwrap();
        assert_eq!(document.chunks().len(), 2);
    }

    #[tokio::test]
    async fn test_default_extractor_rejects_non_pdf() {
        let engine = RagEngine::new(&test_config(), FakeProvider::replying("x")).await.unwrap();
        let err = engine.build_index(b"just some text").await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidInput);
        assert!(!engine.session().is_built());
    }

    #[tokio::test]
    async fn test_upstream_failure_is_an_error() {
        let engine = engine(FakeProvider::failing("service unavailable")).await;
        engine.build_index(FRUIT_AND_CAPITALS.as_bytes()).await.unwrap();

        let err = engine.search("What is the capital of France?").await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UpstreamUnavailable);
    }

    #[tokio::test]
    async fn test_model_decline_is_reported() {
        let engine = engine(FakeProvider::replying(NO_ANSWER)).await;
        engine.build_index(FRUIT_AND_CAPITALS.as_bytes()).await.unwrap();

        let answer = engine.search("What is the capital of France?").await.unwrap();
        assert_eq!(answer.outcome, AnswerOutcome::Declined);
        assert_eq!(answer.sources.len(), 1);
    }

    #[tokio::test]
    async fn test_empty_document_builds_empty_index() {
        let engine = engine(FakeProvider::replying("x")).await;
        let summary = engine.build_index_from_text("  \n ").await.unwrap();
        assert_eq!(summary.total_chunks, 0);

        let answer = engine.search("What is the capital of France?").await.unwrap();
        assert_eq!(answer.outcome, AnswerOutcome::NoRelevantContent);
    }

    #[tokio::test]
    async fn test_clones_share_session() {
        let engine = engine(FakeProvider::replying("Paris.")).await;
        let clone = engine.clone();
        engine.build_index(FRUIT_AND_CAPITALS.as_bytes()).await.unwrap();
        assert!(clone.session().is_built());
    }

    #[tokio::test]
    async fn test_stats_for_text() {
        let engine = engine(FakeProvider::replying("x")).await;
        let stats = engine.stats_for_text(FRUIT_AND_CAPITALS);

        assert_eq!(stats.total_words, 10);
        assert_eq!(stats.total_chunks, 2);
        assert_eq!(stats.total_characters, "The capital of France is Paris. Bananas are yellow fruit.".len());
        assert_eq!(stats.sample_chunks.len(), 2);
    }

    #[tokio::test]
    async fn test_summarize_map_reduce() {
        let provider = FakeProvider::replying("summary");
        let engine = engine(provider.clone()).await;

        let summary = engine.summarize_text(FRUIT_AND_CAPITALS).await.unwrap();
        assert_eq!(summary, "summary");

        // One call per chunk plus the combining call
        let prompts = provider.prompts();
        assert_eq!(prompts.len(), 3);
        assert!(prompts[2].contains("summary\n\nsummary"));
        assert!(!engine.session().is_built());
    }

    #[tokio::test]
    async fn test_summarize_empty_text_skips_model() {
        let provider = FakeProvider::replying("summary");
        let engine = engine(provider.clone()).await;
        assert_eq!(engine.summarize_text("").await.unwrap(), "");
        assert!(provider.prompts().is_empty());
    }

    #[tokio::test]
    async fn test_sources_are_ordered_by_relevance() {
        let provider = FakeProvider::replying("Paris.");
        let engine = engine(provider.clone()).await;
        engine.build_index(TWO_CAPITALS.as_bytes()).await.unwrap();

        let hits = engine.retrieve("What is the capital of France?").await.unwrap();
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].chunk_index, 1);
        assert_eq!(hits[1].chunk_index, 0);
        assert!(hits[0].similarity > hits[1].similarity);
        assert!(hits[0].distance < hits[1].distance);

        let answer = engine.search("What is the capital of France?").await.unwrap();
        assert_eq!(answer.sources, vec!["France has a capital.", "The capital is Paris."]);

        // Context follows the same order as the sources
        let prompts = provider.prompts();
        assert_eq!(prompts.len(), 1);
        assert!(prompts[0].contains("France has a capital. The capital is Paris."));
    }

    #[tokio::test]
    async fn test_threshold_is_inclusive() {
        let mut config = test_config();
        config.rag.similarity_threshold = -1.0;
        let open = engine_with(&config, FakeProvider::replying("Paris.")).await;
        open.build_index(TWO_CAPITALS.as_bytes()).await.unwrap();
        let weakest = open.retrieve("What is the capital of France?").await.unwrap()[1].similarity;

        config.rag.similarity_threshold = weakest;
        let exact = engine_with(&config, FakeProvider::replying("Paris.")).await;
        exact.build_index(TWO_CAPITALS.as_bytes()).await.unwrap();
        let hits = exact.retrieve("What is the capital of France?").await.unwrap();
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[1].similarity, weakest);

        config.rag.similarity_threshold = f32::from_bits(weakest.to_bits() + 1);
        let above = engine_with(&config, FakeProvider::replying("Paris.")).await;
        above.build_index(TWO_CAPITALS.as_bytes()).await.unwrap();
        let hits = above.retrieve("What is the capital of France?").await.unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].text, "France has a capital.");
    }

    #[tokio::test]
    async fn test_embedding_failure_leaves_session_empty() {
        let provider = FakeProvider::replying("x");
        let engine = engine(provider.clone()).await;
        engine.build_index(FRUIT_AND_CAPITALS.as_bytes()).await.unwrap();
        assert!(engine.session().is_built());

        provider.embed_down.store(true, Ordering::SeqCst);
        let err = engine.build_index(b"zzz").await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UpstreamUnavailable);
        assert!(!engine.session().is_built());

        let err = engine.search("What is the capital of France?").await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::IndexNotBuilt);
    }

    #[tokio::test]
    async fn test_question_is_trimmed() {
        let provider = FakeProvider::replying("Paris.");
        let engine = engine(provider.clone()).await;
        engine.build_index(FRUIT_AND_CAPITALS.as_bytes()).await.unwrap();

        let answer = engine.search("  What is the capital of France?\n").await.unwrap();
        assert_eq!(answer.question, "What is the capital of France?");
        assert!(provider.prompts()[0].contains("Question:\nWhat is the capital of France?\n\nAnswer:"));

        let none = engine.search(" What color is the sky? ").await.unwrap();
        assert_eq!(none.question, "What color is the sky?");
    }

    #[tokio::test]
    async fn test_summarize_single_chunk_still_reduces() {
        let provider = FakeProvider::replying("summary");
        let engine = engine(provider.clone()).await;

        let summary = engine.summarize_text("The sky has a blue color.").await.unwrap();
        assert_eq!(summary, "summary");

        let prompts = provider.prompts();
        assert_eq!(prompts.len(), 2);
        assert!(prompts[0].ends_with("The sky has a blue color."));
        assert!(prompts[1].ends_with(":\nsummary"));
    }

    #[tokio::test]
    async fn test_engine_inspect_matches_free_stats() {
        let engine = engine(FakeProvider::replying("x")).await;
        let stats = engine.inspect(FRUIT_AND_CAPITALS.as_bytes()).await.unwrap();
        let expected =
            document_stats(&test_config().rag, &PlainTextExtractor, FRUIT_AND_CAPITALS.as_bytes())
                .unwrap();
        assert_eq!(stats, expected);
        assert!(!engine.session().is_built());
    }

    #[test]
    fn test_document_stats_without_model() {
        let stats =
            document_stats(&test_config().rag, &PlainTextExtractor, FRUIT_AND_CAPITALS.as_bytes())
                .unwrap();
        assert_eq!(stats.total_chunks, 2);
        assert_eq!(stats.sample_chunks[0], "The capital of France is Paris.");

        let err = document_stats(&test_config().rag, &PlainTextExtractor, &[]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidInput);
    }

    #[test]
    fn test_error_kinds() {
        assert_eq!(RagError::IndexNotBuilt.kind(), ErrorKind::IndexNotBuilt);
        assert_eq!(RagError::from(IndexError::NotBuilt).kind(), ErrorKind::IndexNotBuilt);
        assert_eq!(
            RagError::from(IndexError::DimensionMismatch { expected: 3, actual: 4 }).kind(),
            ErrorKind::DimensionMismatch
        );
        assert_eq!(RagError::from(ExtractError::NotPdf).kind(), ErrorKind::InvalidInput);
        assert_eq!(
            RagError::from(GenerateError::Timeout(std::time::Duration::from_secs(1))).kind(),
            ErrorKind::UpstreamUnavailable
        );
        assert_eq!(
            RagError::from(EmbedderError::NoEmbeddings).kind(),
            ErrorKind::UpstreamUnavailable
        );
    }
}
