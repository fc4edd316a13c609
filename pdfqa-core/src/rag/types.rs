use serde::{Deserialize, Serialize};

/// Outcome of a successful index build.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildSummary {
    pub total_chunks: usize,
    pub embedding_dimension: usize,
}

/// A retrieved chunk with its scores.
///
/// Returned by [`RagEngine::retrieve`](super::RagEngine::retrieve), most
/// relevant first.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchHit {
    /// Position of the chunk in the document
    pub chunk_index: usize,
    pub text: String,
    /// Squared Euclidean distance between unit vectors, in `[0, 4]`
    pub distance: f32,
    /// Cosine similarity, `1 - distance / 2`
    pub similarity: f32,
}

/// Size figures for a document under the current chunking policy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentStats {
    pub total_characters: usize,
    pub total_words: usize,
    pub total_chunks: usize,
    /// The first few chunks, for eyeballing the chunking
    pub sample_chunks: Vec<String>,
}
