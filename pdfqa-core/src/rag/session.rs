//! The document currently loaded for question answering.
//!
//! A session holds at most one [`IndexedDocument`]. Searches take a cheap
//! snapshot (`Arc` clone) and work on it without holding any lock, so a build
//! that swaps in a new document never disturbs a search in flight. Builds are
//! serialized through [`DocumentSession::begin_build`].

use super::index::FlatIndex;
use std::sync::{Arc, PoisonError, RwLock};
use tokio::sync::{Mutex, MutexGuard};
use tracing::debug;

/// A built index together with the chunk texts its rows refer to.
///
/// Row `i` of the index is the embedding of `chunks[i]`.
#[derive(Debug)]
pub struct IndexedDocument {
    index: FlatIndex,
    chunks: Vec<String>,
}

impl IndexedDocument {
    pub(crate) fn new(index: FlatIndex, chunks: Vec<String>) -> Self {
        debug_assert_eq!(index.len(), chunks.len());
        Self { index, chunks }
    }

    pub fn index(&self) -> &FlatIndex {
        &self.index
    }

    pub fn chunks(&self) -> &[String] {
        &self.chunks
    }

    pub fn chunk(&self, position: usize) -> Option<&str> {
        self.chunks.get(position).map(String::as_str)
    }
}

/// Process-wide holder of the active document.
#[derive(Debug, Default)]
pub struct DocumentSession {
    current: RwLock<Option<Arc<IndexedDocument>>>,
    build_lock: Mutex<()>,
}

impl DocumentSession {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the active document, if one has been built.
    pub fn snapshot(&self) -> Option<Arc<IndexedDocument>> {
        self.current
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn is_built(&self) -> bool {
        self.snapshot().is_some()
    }

    /// Waits until no other build is running on this session.
    ///
    /// Hold the returned guard for the whole build.
    pub async fn begin_build(&self) -> BuildGuard<'_> {
        BuildGuard {
            session: self,
            _lock: self.build_lock.lock().await,
        }
    }

    fn replace(&self, document: Option<Arc<IndexedDocument>>) {
        *self.current.write().unwrap_or_else(PoisonError::into_inner) = document;
    }
}

/// Exclusive right to rebuild a session.
pub struct BuildGuard<'a> {
    session: &'a DocumentSession,
    _lock: MutexGuard<'a, ()>,
}

impl BuildGuard<'_> {
    /// Drops the active document.
    pub fn reset(&self) {
        debug!("Resetting document session");
        self.session.replace(None);
    }

    /// Makes `document` the active document in one step.
    pub fn install(&self, document: IndexedDocument) -> Arc<IndexedDocument> {
        let document = Arc::new(document);
        self.session.replace(Some(Arc::clone(&document)));
        document
    }
}
