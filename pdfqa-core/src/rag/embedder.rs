//! Embedding generation using LLM providers.
//!
//! This module provides functionality to convert text into unit-length vector
//! embeddings using provider embedding models.

use crate::provider::{Provider, ProviderError};
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info};

/// Texts sent to the provider per embedding request.
const BATCH_SIZE: usize = 32;

/// Text embedded once at load time to discover the model's dimension.
const DIMENSION_PROBE: &str = "dimension probe";

/// Errors that can occur during embedding generation.
#[derive(Debug, Error)]
pub enum EmbedderError {
    /// The provider API returned an error.
    #[error("Provider error: {0}")]
    Provider(#[from] ProviderError),

    /// The API response contained no embeddings.
    ///
    /// This typically indicates a problem with the model or request format.
    #[error("No embeddings returned")]
    NoEmbeddings,

    /// The provider returned a different number of vectors than texts sent.
    #[error("Expected {expected} embeddings, got {actual}")]
    CountMismatch { expected: usize, actual: usize },

    /// A vector's length differs from the dimension discovered at load time.
    #[error("Embedding dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    /// A zero vector cannot be normalized to unit length.
    #[error("Provider returned a zero-length embedding")]
    ZeroVector,
}

/// Result type for embedding operations.
pub type Result<T> = std::result::Result<T, EmbedderError>;

/// Generates unit-norm vector embeddings for text.
///
/// Vectors are L2-normalized client-side, so squared Euclidean distance `d²`
/// and cosine similarity `s` are related by `s = 1 - d²/2`.
///
/// The dimension is discovered once in [`Embedder::load`] and every later
/// vector is checked against it. Create the embedder at startup and share it;
/// cloning is cheap.
#[derive(Clone)]
pub struct Embedder {
    provider: Arc<dyn Provider>,
    model: String,
    dimension: usize,
}

impl Embedder {
    /// Loads the embedder, probing the model once for its output dimension.
    pub async fn load(provider: Arc<dyn Provider>, model: impl Into<String>) -> Result<Self> {
        let model = model.into();
        let probe = provider
            .embed(&[DIMENSION_PROBE.to_string()], &model)
            .await?
            .into_iter()
            .next()
            .ok_or(EmbedderError::NoEmbeddings)?;

        if probe.is_empty() {
            return Err(EmbedderError::NoEmbeddings);
        }

        info!(model = %model, dimension = probe.len(), "Embedding model loaded");
        Ok(Self::with_dimension(provider, model, probe.len()))
    }

    /// Creates an embedder for a model whose dimension is already known.
    pub fn with_dimension(
        provider: Arc<dyn Provider>,
        model: impl Into<String>,
        dimension: usize,
    ) -> Self {
        Self {
            provider,
            model: model.into(),
            dimension,
        }
    }

    pub fn dimension(&self) -> usize {
        self.dimension
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// Generates a unit-length embedding for a single text.
    pub async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        self.embed_batch(&[text.to_string()])
            .await?
            .pop()
            .ok_or(EmbedderError::NoEmbeddings)
    }

    /// Generates one unit-length embedding per text, in input order.
    ///
    /// An empty input returns an empty result without contacting the provider.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The provider API is unreachable or rejects the request
    /// - The provider returns the wrong number of vectors
    /// - A vector has the wrong dimension or zero length
    pub async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let mut embeddings = Vec::with_capacity(texts.len());

        for batch in texts.chunks(BATCH_SIZE) {
            debug!(batch = batch.len(), "Requesting embeddings");
            let vectors = self.provider.embed(batch, &self.model).await?;

            if vectors.len() != batch.len() {
                return Err(EmbedderError::CountMismatch {
                    expected: batch.len(),
                    actual: vectors.len(),
                });
            }

            for mut vector in vectors {
                if vector.len() != self.dimension {
                    return Err(EmbedderError::DimensionMismatch {
                        expected: self.dimension,
                        actual: vector.len(),
                    });
                }
                l2_normalize(&mut vector)?;
                embeddings.push(vector);
            }
        }

        Ok(embeddings)
    }
}

/// Scales `vector` to unit length in place.
fn l2_normalize(vector: &mut [f32]) -> Result<()> {
    let norm = vector.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm == 0.0 || !norm.is_finite() {
        return Err(EmbedderError::ZeroVector);
    }
    for x in vector.iter_mut() {
        *x /= norm;
    }
    Ok(())
}
