//! Collaborator traits for the two language-model calls the pipeline makes.
//!
//! Prompt wording aside, model choice, transport and authentication all
//! belong to the implementations; the pipeline only consumes these traits.

use async_trait::async_trait;

use lectern_core::error::LecternError;

/// Errors from external language-model calls.
#[derive(Debug, thiserror::Error)]
pub enum LlmError {
    #[error("model request failed: {0}")]
    Request(String),
    #[error("model response malformed: {0}")]
    Response(String),
    #[error("model call timed out after {timeout_secs}s")]
    Timeout { timeout_secs: u64 },
}

impl From<LlmError> for LecternError {
    fn from(err: LlmError) -> Self {
        LecternError::Model(err.to_string())
    }
}

/// Rewrites one query into up to `n` semantically-equivalent variants.
///
/// Implementations should instruct the model to preserve the original
/// intent while varying wording or focus, and to never hint at an answer.
/// Returned lines may carry list decoration; the adapter cleans them up.
#[async_trait]
pub trait ReformulationModel: Send + Sync {
    async fn reformulate(&self, query: &str, n: usize) -> Result<Vec<String>, LlmError>;
}

/// Produces the final grounded answer.
///
/// `context` is the fully rendered grounding prompt (retrieved passages and
/// the question embedded in the pipeline's fixed template); `query` is the
/// original question on its own, for implementations that split system and
/// user content.
#[async_trait]
pub trait SynthesisModel: Send + Sync {
    async fn synthesize(&self, context: &str, query: &str) -> Result<String, LlmError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display() {
        assert_eq!(
            LlmError::Request("connection refused".to_string()).to_string(),
            "model request failed: connection refused"
        );
        assert_eq!(
            LlmError::Timeout { timeout_secs: 30 }.to_string(),
            "model call timed out after 30s"
        );
    }

    #[test]
    fn test_converts_to_top_level_error() {
        let top: LecternError = LlmError::Response("empty body".to_string()).into();
        assert!(matches!(top, LecternError::Model(_)));
    }
}
