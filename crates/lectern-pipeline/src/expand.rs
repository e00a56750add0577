//! Best-effort query expansion.
//!
//! Wraps the external reformulation model: cleans up its output (models
//! love bullet lists), caps the variant count, and converts any failure
//! into an explicit degraded outcome instead of an error — expansion never
//! aborts a pipeline run.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, warn};

use lectern_core::config::PipelineConfig;

use crate::llm::ReformulationModel;

/// Result of one expansion attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExpansionOutcome {
    /// Cleaned, order-preserved variants; possibly empty.
    Expanded(Vec<String>),
    /// The model call failed or timed out; the run continues without
    /// expansion. Already logged.
    Failed,
}

/// Adapter over a [`ReformulationModel`].
pub struct QueryReformulator {
    model: Arc<dyn ReformulationModel>,
    count: usize,
    timeout: Duration,
}

impl QueryReformulator {
    pub fn new(model: Arc<dyn ReformulationModel>, count: usize, timeout: Duration) -> Self {
        Self {
            model,
            count,
            timeout,
        }
    }

    pub fn from_config(model: Arc<dyn ReformulationModel>, config: &PipelineConfig) -> Self {
        Self::new(
            model,
            config.expansion_count,
            Duration::from_secs(config.expansion_timeout_secs),
        )
    }

    /// Ask the model for up to `count` variants of `query`.
    pub async fn expand(&self, query: &str) -> ExpansionOutcome {
        let call = self.model.reformulate(query, self.count);
        match tokio::time::timeout(self.timeout, call).await {
            Ok(Ok(lines)) => {
                let variants = clean_variants(lines, self.count);
                debug!(count = variants.len(), "Query expanded");
                ExpansionOutcome::Expanded(variants)
            }
            Ok(Err(e)) => {
                warn!(error = %e, "Query expansion failed");
                ExpansionOutcome::Failed
            }
            Err(_) => {
                warn!(timeout_secs = self.timeout.as_secs(), "Query expansion timed out");
                ExpansionOutcome::Failed
            }
        }
    }
}

/// Strip leading bullet/dash decoration and surrounding whitespace, drop
/// empty lines, truncate to `n` items. Order is preserved.
fn clean_variants(lines: Vec<String>, n: usize) -> Vec<String> {
    lines
        .iter()
        .map(|line| {
            line.trim()
                .trim_start_matches(|c| matches!(c, '-' | '*' | '\u{2022}' | ' '))
                .trim()
                .to_string()
        })
        .filter(|line| !line.is_empty())
        .take(n)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::MockReformulationModel;

    fn reformulator(model: MockReformulationModel, count: usize) -> QueryReformulator {
        QueryReformulator::new(Arc::new(model), count, Duration::from_secs(5))
    }

    #[tokio::test]
    async fn test_bullets_and_whitespace_stripped() {
        let model = MockReformulationModel::returning(vec![
            "- What does working memory do?  ".to_string(),
            "\u{2022} How is working memory defined?".to_string(),
            "* What role does working memory play?".to_string(),
        ]);

        let outcome = reformulator(model, 5).expand("what is working memory?").await;
        assert_eq!(
            outcome,
            ExpansionOutcome::Expanded(vec![
                "What does working memory do?".to_string(),
                "How is working memory defined?".to_string(),
                "What role does working memory play?".to_string(),
            ])
        );
    }

    #[tokio::test]
    async fn test_empty_lines_dropped() {
        let model = MockReformulationModel::returning(vec![
            "first".to_string(),
            "".to_string(),
            "-  ".to_string(),
            "second".to_string(),
        ]);

        let outcome = reformulator(model, 5).expand("q").await;
        assert_eq!(
            outcome,
            ExpansionOutcome::Expanded(vec!["first".to_string(), "second".to_string()])
        );
    }

    #[tokio::test]
    async fn test_truncated_to_requested_count() {
        let lines: Vec<String> = (0..8).map(|i| format!("variant {}", i)).collect();
        let model = MockReformulationModel::returning(lines);

        let outcome = reformulator(model, 3).expand("q").await;
        match outcome {
            ExpansionOutcome::Expanded(variants) => {
                assert_eq!(variants.len(), 3);
                assert_eq!(variants[0], "variant 0");
                assert_eq!(variants[2], "variant 2");
            }
            ExpansionOutcome::Failed => panic!("expected expansion"),
        }
    }

    #[tokio::test]
    async fn test_model_failure_is_absorbed() {
        let model = MockReformulationModel::failing();
        let outcome = reformulator(model, 5).expand("q").await;
        assert_eq!(outcome, ExpansionOutcome::Failed);
    }

    #[tokio::test]
    async fn test_model_timeout_is_absorbed() {
        let model = MockReformulationModel::returning(vec!["late".to_string()])
            .with_latency(Duration::from_secs(10));
        let reformulator =
            QueryReformulator::new(Arc::new(model), 5, Duration::from_millis(50));

        let outcome = reformulator.expand("q").await;
        assert_eq!(outcome, ExpansionOutcome::Failed);
    }

    #[tokio::test]
    async fn test_model_returning_nothing_is_empty_expansion() {
        let model = MockReformulationModel::returning(vec![]);
        let outcome = reformulator(model, 5).expand("q").await;
        assert_eq!(outcome, ExpansionOutcome::Expanded(vec![]));
    }

    #[test]
    fn test_clean_variants_interior_dashes_kept() {
        let cleaned = clean_variants(
            vec!["- short-term memory vs working memory".to_string()],
            5,
        );
        assert_eq!(cleaned, vec!["short-term memory vs working memory"]);
    }
}
