//! Bounded parallel retrieval fan-out.
//!
//! One search call is issued per query string, at most `max_concurrent` in
//! flight at a time so a burst of reformulations cannot overwhelm the
//! backend. Results are aggregated in submission order regardless of
//! completion order, which keeps the downstream dedup deterministic.

use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::sync::Semaphore;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use lectern_core::config::RetrievalConfig;
use lectern_core::types::Passage;

use crate::backend::SearchBackend;
use crate::error::RetrievalError;

/// Combined result of one fan-out batch.
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct RetrievalBatch {
    /// All retrieved passages, concatenated in query submission order.
    pub passages: Vec<Passage>,
    /// Queries whose retrieval call failed; their contribution was empty.
    pub failed_queries: Vec<String>,
}

/// Fans a set of query strings out to a search backend concurrently.
pub struct ParallelRetriever {
    max_concurrent: usize,
    timeout: Duration,
}

impl ParallelRetriever {
    /// `max_concurrent` is clamped to at least 1.
    pub fn new(max_concurrent: usize, timeout: Duration) -> Self {
        Self {
            max_concurrent: max_concurrent.max(1),
            timeout,
        }
    }

    pub fn from_config(config: &RetrievalConfig) -> Self {
        Self::new(
            config.max_concurrent,
            Duration::from_secs(config.timeout_secs),
        )
    }

    /// Issue one search call per query, bounded by `max_concurrent` permits.
    ///
    /// A single query's failure (or timeout) is absorbed: it is logged,
    /// recorded in `failed_queries`, and contributes an empty passage list.
    /// Cancellation is the only batch-level failure.
    pub async fn retrieve_all(
        &self,
        backend: Arc<dyn SearchBackend>,
        queries: &[String],
        k: usize,
        cancel: &CancellationToken,
    ) -> Result<RetrievalBatch, RetrievalError> {
        let semaphore = Arc::new(Semaphore::new(self.max_concurrent));
        let mut handles = Vec::with_capacity(queries.len());

        for query in queries {
            let backend = Arc::clone(&backend);
            let semaphore = Arc::clone(&semaphore);
            let cancel = cancel.clone();
            let task_query = query.clone();
            let timeout = self.timeout;

            let handle = tokio::spawn(async move {
                let permit = tokio::select! {
                    _ = cancel.cancelled() => return Err(RetrievalError::Cancelled),
                    permit = semaphore.acquire() => permit,
                };
                let Ok(_permit) = permit else {
                    return Err(RetrievalError::Cancelled);
                };

                tokio::select! {
                    _ = cancel.cancelled() => Err(RetrievalError::Cancelled),
                    result = tokio::time::timeout(timeout, backend.search(&task_query, k)) => {
                        match result {
                            Ok(inner) => inner,
                            Err(_) => Err(RetrievalError::Timeout {
                                timeout_secs: timeout.as_secs(),
                            }),
                        }
                    }
                }
            });
            handles.push((query.clone(), handle));
        }

        // Await in submission order so aggregation order is deterministic
        // even though execution order is not.
        let mut batch = RetrievalBatch::default();
        let mut cancelled = false;

        for (query, handle) in handles {
            match handle.await {
                Ok(Ok(passages)) => {
                    debug!(query = %query, count = passages.len(), "Query retrieved");
                    batch.passages.extend(passages);
                }
                Ok(Err(RetrievalError::Cancelled)) => cancelled = true,
                Ok(Err(e)) => {
                    warn!(query = %query, error = %e, "Retrieval failed for query; contributing no passages");
                    batch.failed_queries.push(query);
                }
                Err(e) => {
                    warn!(query = %query, error = %e, "Retrieval task aborted");
                    batch.failed_queries.push(query);
                }
            }
        }

        if cancelled {
            return Err(RetrievalError::Cancelled);
        }
        Ok(batch)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::MockSearchBackend;

    fn passage(content: &str) -> Passage {
        Passage::new(content).with_metadata("filename", "doc.pdf")
    }

    fn retriever() -> ParallelRetriever {
        ParallelRetriever::new(4, Duration::from_secs(5))
    }

    #[tokio::test]
    async fn test_aggregation_matches_submission_order() {
        // The first query is the slowest; its passages must still come first.
        let backend = MockSearchBackend::new()
            .with_response("slow", vec![passage("from slow")])
            .with_latency("slow", Duration::from_millis(80))
            .with_response("fast", vec![passage("from fast")]);

        let queries = vec!["slow".to_string(), "fast".to_string()];
        let batch = retriever()
            .retrieve_all(Arc::new(backend), &queries, 2, &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(batch.passages[0].content, "from slow");
        assert_eq!(batch.passages[1].content, "from fast");
        assert!(batch.failed_queries.is_empty());
    }

    #[tokio::test]
    async fn test_single_failure_is_absorbed() {
        let backend = MockSearchBackend::new()
            .with_response("one", vec![passage("p1")])
            .with_failure("two")
            .with_response("three", vec![passage("p3")]);

        let queries = vec!["one".to_string(), "two".to_string(), "three".to_string()];
        let batch = retriever()
            .retrieve_all(Arc::new(backend), &queries, 2, &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(batch.passages.len(), 2);
        assert_eq!(batch.failed_queries, vec!["two".to_string()]);
    }

    #[tokio::test]
    async fn test_all_failures_yield_empty_batch() {
        let backend = MockSearchBackend::new().with_failure("a").with_failure("b");

        let queries = vec!["a".to_string(), "b".to_string()];
        let batch = retriever()
            .retrieve_all(Arc::new(backend), &queries, 2, &CancellationToken::new())
            .await
            .unwrap();

        assert!(batch.passages.is_empty());
        assert_eq!(batch.failed_queries.len(), 2);
    }

    #[tokio::test]
    async fn test_concurrency_is_bounded() {
        let backend = Arc::new(
            MockSearchBackend::new().with_default_latency(Duration::from_millis(40)),
        );
        let queries: Vec<String> = (0..8).map(|i| format!("query {}", i)).collect();

        let retriever = ParallelRetriever::new(2, Duration::from_secs(5));
        retriever
            .retrieve_all(Arc::clone(&backend) as Arc<dyn SearchBackend>, &queries, 2, &CancellationToken::new())
            .await
            .unwrap();

        assert!(backend.max_in_flight() <= 2);
        assert_eq!(backend.search_calls(), 8);
    }

    #[tokio::test]
    async fn test_timeout_is_absorbed_per_query() {
        let backend = MockSearchBackend::new()
            .with_response("ok", vec![passage("p")])
            .with_response("stuck", vec![passage("never seen")])
            .with_latency("stuck", Duration::from_secs(10));

        let queries = vec!["ok".to_string(), "stuck".to_string()];
        let retriever = ParallelRetriever::new(4, Duration::from_millis(50));
        let batch = retriever
            .retrieve_all(Arc::new(backend), &queries, 2, &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(batch.passages.len(), 1);
        assert_eq!(batch.failed_queries, vec!["stuck".to_string()]);
    }

    #[tokio::test]
    async fn test_pre_cancelled_token_fails_batch() {
        let backend = MockSearchBackend::new().with_response("q", vec![passage("p")]);
        let cancel = CancellationToken::new();
        cancel.cancel();

        let result = retriever()
            .retrieve_all(Arc::new(backend), &["q".to_string()], 2, &cancel)
            .await;
        assert!(matches!(result, Err(RetrievalError::Cancelled)));
    }

    #[tokio::test]
    async fn test_cancel_during_flight_fails_batch() {
        let backend = MockSearchBackend::new()
            .with_response("slow", vec![passage("p")])
            .with_latency("slow", Duration::from_secs(10));
        let cancel = CancellationToken::new();

        let cancel_clone = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(30)).await;
            cancel_clone.cancel();
        });

        let result = retriever()
            .retrieve_all(Arc::new(backend), &["slow".to_string()], 2, &cancel)
            .await;
        assert!(matches!(result, Err(RetrievalError::Cancelled)));
    }

    #[tokio::test]
    async fn test_empty_query_set_yields_empty_batch() {
        let backend = MockSearchBackend::new();
        let batch = retriever()
            .retrieve_all(Arc::new(backend), &[], 2, &CancellationToken::new())
            .await
            .unwrap();
        assert!(batch.passages.is_empty());
        assert!(batch.failed_queries.is_empty());
    }

    #[tokio::test]
    async fn test_zero_max_concurrent_clamped_to_one() {
        let backend = MockSearchBackend::new().with_response("q", vec![passage("p")]);
        let retriever = ParallelRetriever::new(0, Duration::from_secs(5));
        let batch = retriever
            .retrieve_all(Arc::new(backend), &["q".to_string()], 2, &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(batch.passages.len(), 1);
    }
}
