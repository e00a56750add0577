//! Mock collaborators for tests.
//!
//! `MockSearchBackend` returns canned passages per query with optional
//! injected failures and latencies, and records call counts plus the peak
//! number of concurrent calls. `MockIndexProvider` counts build calls so
//! cache tests can distinguish hits from rebuilds. Both live in production
//! code so downstream crates can use them in their own tests.

use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;

use lectern_core::types::Passage;

use crate::backend::{IndexProvider, SearchBackend};
use crate::error::RetrievalError;

/// Canned-response search backend with failure and latency injection.
#[derive(Default)]
pub struct MockSearchBackend {
    responses: HashMap<String, Vec<Passage>>,
    failures: HashSet<String>,
    latencies: HashMap<String, Duration>,
    default_latency: Option<Duration>,
    search_calls: AtomicUsize,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
    seen_queries: Mutex<Vec<String>>,
}

impl MockSearchBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return `passages` (truncated to the requested `k`) for `query`.
    pub fn with_response(mut self, query: &str, passages: Vec<Passage>) -> Self {
        self.responses.insert(query.to_string(), passages);
        self
    }

    /// Fail every search for `query` with a backend error.
    pub fn with_failure(mut self, query: &str) -> Self {
        self.failures.insert(query.to_string());
        self
    }

    /// Sleep this long before answering `query`.
    pub fn with_latency(mut self, query: &str, latency: Duration) -> Self {
        self.latencies.insert(query.to_string(), latency);
        self
    }

    /// Sleep this long before answering any query without its own latency.
    pub fn with_default_latency(mut self, latency: Duration) -> Self {
        self.default_latency = Some(latency);
        self
    }

    /// Total number of search calls made.
    pub fn search_calls(&self) -> usize {
        self.search_calls.load(Ordering::SeqCst)
    }

    /// Peak number of concurrent in-flight search calls observed.
    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    /// Queries searched so far, in call order.
    pub fn seen_queries(&self) -> Vec<String> {
        self.seen_queries.lock().map(|q| q.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl SearchBackend for MockSearchBackend {
    async fn search(&self, query: &str, k: usize) -> Result<Vec<Passage>, RetrievalError> {
        self.search_calls.fetch_add(1, Ordering::SeqCst);
        if let Ok(mut seen) = self.seen_queries.lock() {
            seen.push(query.to_string());
        }

        let current = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(current, Ordering::SeqCst);

        let latency = self
            .latencies
            .get(query)
            .copied()
            .or(self.default_latency);
        if let Some(latency) = latency {
            tokio::time::sleep(latency).await;
        }

        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        if self.failures.contains(query) {
            return Err(RetrievalError::Backend(format!(
                "injected failure for query '{}'",
                query
            )));
        }

        let mut passages = self.responses.get(query).cloned().unwrap_or_default();
        passages.truncate(k);
        Ok(passages)
    }
}

/// Index provider that counts builds and can be switched to fail.
pub struct MockIndexProvider {
    backend: Arc<MockSearchBackend>,
    build_calls: AtomicUsize,
    fail: bool,
}

impl MockIndexProvider {
    /// Provider that hands out an empty backend.
    pub fn new() -> Self {
        Self::with_backend(MockSearchBackend::new())
    }

    /// Provider that hands out the given backend on every build.
    pub fn with_backend(backend: MockSearchBackend) -> Self {
        Self {
            backend: Arc::new(backend),
            build_calls: AtomicUsize::new(0),
            fail: false,
        }
    }

    /// Provider whose every build fails with `IndexNotFound`.
    pub fn failing() -> Self {
        Self {
            backend: Arc::new(MockSearchBackend::new()),
            build_calls: AtomicUsize::new(0),
            fail: true,
        }
    }

    /// How many times `build_or_load` was called.
    pub fn build_calls(&self) -> usize {
        self.build_calls.load(Ordering::SeqCst)
    }

    /// The backend handed out by this provider.
    pub fn backend(&self) -> Arc<MockSearchBackend> {
        Arc::clone(&self.backend)
    }
}

impl Default for MockIndexProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl IndexProvider for MockIndexProvider {
    async fn build_or_load(
        &self,
        location: &Path,
    ) -> Result<Arc<dyn SearchBackend>, RetrievalError> {
        self.build_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(RetrievalError::IndexNotFound {
                location: location.to_path_buf(),
            });
        }
        Ok(Arc::clone(&self.backend) as Arc<dyn SearchBackend>)
    }
}
