//! Per-session single-slot retriever cache.
//!
//! A session holds at most one live [`RetrieverHandle`] at a time. Changing
//! the requested neighbor count `k` reconfigures the handle in place and
//! never touches the underlying backend; changing the index location, or an
//! explicit [`RetrieverCache::invalidate`] after the session's document set
//! mutates, discards the handle so the next query rebuilds it.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{debug, info};

use crate::backend::{IndexProvider, SearchBackend};
use crate::error::RetrievalError;

/// Live binding of an index location, a neighbor count, and a built backend.
pub struct RetrieverHandle {
    location: PathBuf,
    k: usize,
    backend: Arc<dyn SearchBackend>,
}

impl RetrieverHandle {
    pub fn location(&self) -> &Path {
        &self.location
    }

    pub fn k(&self) -> usize {
        self.k
    }

    /// Shared reference to the built backend.
    pub fn backend(&self) -> Arc<dyn SearchBackend> {
        Arc::clone(&self.backend)
    }

    /// Reconfigure the neighbor count in place. Cheap: the backend is kept.
    pub fn set_k(&mut self, k: usize) {
        self.k = k;
    }
}

impl std::fmt::Debug for RetrieverHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RetrieverHandle")
            .field("location", &self.location)
            .field("k", &self.k)
            .finish()
    }
}

/// Tagged cache state: either nothing is bound, or one handle is.
#[derive(Debug, Default)]
pub enum CacheSlot {
    #[default]
    Empty,
    Bound(RetrieverHandle),
}

/// Single-slot cache for a session's retriever handle.
#[derive(Debug, Default)]
pub struct RetrieverCache {
    slot: CacheSlot,
}

impl RetrieverCache {
    pub fn new() -> Self {
        Self {
            slot: CacheSlot::Empty,
        }
    }

    /// Resolve a handle for `location` with neighbor count `k`.
    ///
    /// - Empty slot, or a slot bound to a different location: build a new
    ///   backend through `provider` (expensive).
    /// - Slot bound to the same location with a different `k`: reconfigure
    ///   in place (cheap, the backend is reused).
    pub async fn get_or_create(
        &mut self,
        provider: &dyn IndexProvider,
        location: &Path,
        k: usize,
    ) -> Result<&RetrieverHandle, RetrievalError> {
        let rebuild = match &self.slot {
            CacheSlot::Bound(handle) if handle.location == location => false,
            _ => true,
        };

        if rebuild {
            let backend = provider.build_or_load(location).await?;
            self.slot = CacheSlot::Bound(RetrieverHandle {
                location: location.to_path_buf(),
                k,
                backend,
            });
            info!(location = %location.display(), k, "Retriever built");
        }

        let CacheSlot::Bound(handle) = &mut self.slot else {
            return Err(RetrievalError::IndexUnavailable(
                "retriever slot empty after build".to_string(),
            ));
        };

        if handle.k != k {
            debug!(old_k = handle.k, new_k = k, "Reconfigured retriever neighbor count");
            handle.set_k(k);
        }

        Ok(handle)
    }

    /// Discard the bound handle, forcing a rebuild on the next query.
    ///
    /// Called by every mutation of the session's document set: the physical
    /// index path may be stable while its contents changed, so location
    /// comparison alone is not enough.
    pub fn invalidate(&mut self) {
        if matches!(self.slot, CacheSlot::Bound(_)) {
            debug!("Retriever slot invalidated");
        }
        self.slot = CacheSlot::Empty;
    }

    pub fn is_bound(&self) -> bool {
        matches!(self.slot, CacheSlot::Bound(_))
    }

    /// The currently bound handle, if any.
    pub fn handle(&self) -> Option<&RetrieverHandle> {
        match &self.slot {
            CacheSlot::Bound(handle) => Some(handle),
            CacheSlot::Empty => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::MockIndexProvider;

    #[tokio::test]
    async fn test_empty_slot_builds() {
        let provider = MockIndexProvider::new();
        let mut cache = RetrieverCache::new();

        let handle = cache
            .get_or_create(&provider, Path::new("/data/s1/index"), 5)
            .await
            .unwrap();
        assert_eq!(handle.k(), 5);
        assert_eq!(provider.build_calls(), 1);
        assert!(cache.is_bound());
    }

    #[tokio::test]
    async fn test_same_location_same_k_is_a_hit() {
        let provider = MockIndexProvider::new();
        let mut cache = RetrieverCache::new();
        let location = Path::new("/data/s1/index");

        cache.get_or_create(&provider, location, 5).await.unwrap();
        cache.get_or_create(&provider, location, 5).await.unwrap();
        assert_eq!(provider.build_calls(), 1);
    }

    #[tokio::test]
    async fn test_k_change_reconfigures_without_rebuild() {
        let provider = MockIndexProvider::new();
        let mut cache = RetrieverCache::new();
        let location = Path::new("/data/s1/index");

        cache.get_or_create(&provider, location, 5).await.unwrap();
        let handle = cache.get_or_create(&provider, location, 3).await.unwrap();

        assert_eq!(handle.k(), 3);
        assert_eq!(provider.build_calls(), 1);
    }

    #[tokio::test]
    async fn test_location_change_rebuilds() {
        let provider = MockIndexProvider::new();
        let mut cache = RetrieverCache::new();

        cache
            .get_or_create(&provider, Path::new("/data/s1/index"), 5)
            .await
            .unwrap();
        cache
            .get_or_create(&provider, Path::new("/data/s1/index-v2"), 5)
            .await
            .unwrap();
        assert_eq!(provider.build_calls(), 2);
    }

    #[tokio::test]
    async fn test_invalidate_forces_rebuild() {
        let provider = MockIndexProvider::new();
        let mut cache = RetrieverCache::new();
        let location = Path::new("/data/s1/index");

        cache.get_or_create(&provider, location, 5).await.unwrap();
        cache.invalidate();
        assert!(!cache.is_bound());

        cache.get_or_create(&provider, location, 5).await.unwrap();
        assert_eq!(provider.build_calls(), 2);
    }

    #[tokio::test]
    async fn test_provider_failure_propagates_and_slot_stays_empty() {
        let provider = MockIndexProvider::failing();
        let mut cache = RetrieverCache::new();

        let result = cache
            .get_or_create(&provider, Path::new("/data/missing"), 5)
            .await;
        assert!(matches!(result, Err(RetrievalError::IndexNotFound { .. })));
        assert!(!cache.is_bound());
    }

    #[tokio::test]
    async fn test_handle_accessor() {
        let provider = MockIndexProvider::new();
        let mut cache = RetrieverCache::new();
        assert!(cache.handle().is_none());

        cache
            .get_or_create(&provider, Path::new("/data/s1/index"), 7)
            .await
            .unwrap();
        let handle = cache.handle().unwrap();
        assert_eq!(handle.k(), 7);
        assert_eq!(handle.location(), Path::new("/data/s1/index"));
    }
}
