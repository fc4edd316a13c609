//! pdfqa-core - Question answering over a single PDF document
//!
//! Provides the components for a retrieval-augmented PDF assistant:
//! - PDF text extraction and normalization
//! - Overlapping text chunking and embedding
//! - Exact nearest-neighbor retrieval with a relevance threshold
//! - LLM provider abstraction (Ollama, OpenAI-compatible servers)
//! - Configuration management
//!
//! ## Primary API
//!
//! Users should interact with pdfqa via [`RagEngine`]: build an index from a
//! PDF with [`RagEngine::build_index`], then ask questions with
//! [`RagEngine::search`].

// Public modules
pub mod config;
pub mod pdf;
pub mod provider;
pub mod rag;

// Public exports
pub use config::{Config, ConfigError, LlmConfig, ProviderKind, RagConfig};
pub use pdf::{ExtractError, PdfExtractor, TextExtractor};
pub use rag::{
    document_stats, Answer, AnswerOutcome, BuildSummary, DocumentSession, DocumentStats,
    ErrorKind, RagEngine, RagError, SearchHit, NO_ANSWER,
};

// Provider exports
pub use provider::{create_provider, ChatRequest, ChatResponse, Message, Provider, ProviderError};
