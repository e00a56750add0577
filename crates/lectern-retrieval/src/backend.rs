//! Collaborator traits for nearest-neighbor search and index lifecycle.
//!
//! Lectern never computes embeddings or walks a vector index itself; it
//! consumes a retrieval capability through these traits. Production code
//! binds them to a real vector store, tests use the mocks in [`crate::mock`].

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;

use lectern_core::types::Passage;

use crate::error::RetrievalError;

/// Nearest-neighbor lookup against one built index.
///
/// A backend is bound to the index contents at build time; the requested
/// neighbor count `k` varies per call.
#[async_trait]
pub trait SearchBackend: Send + Sync {
    /// Return the `k` passages closest to `query`.
    async fn search(&self, query: &str, k: usize) -> Result<Vec<Passage>, RetrievalError>;
}

/// Builds or loads a search backend for an index location.
///
/// Building is the expensive path; the per-session cache exists to avoid
/// repeating it. Returns [`RetrievalError::IndexNotFound`] when nothing has
/// been indexed at `location`.
#[async_trait]
pub trait IndexProvider: Send + Sync {
    async fn build_or_load(
        &self,
        location: &Path,
    ) -> Result<Arc<dyn SearchBackend>, RetrievalError>;
}
