//! Error types for the retrieval layer.

use std::path::PathBuf;

use lectern_core::error::LecternError;

/// Errors from index lifecycle and nearest-neighbor search.
#[derive(Debug, thiserror::Error)]
pub enum RetrievalError {
    #[error("no index found at {location}")]
    IndexNotFound { location: PathBuf },
    #[error("index unavailable: {0}")]
    IndexUnavailable(String),
    #[error("backend error: {0}")]
    Backend(String),
    #[error("retrieval call timed out after {timeout_secs}s")]
    Timeout { timeout_secs: u64 },
    #[error("retrieval cancelled")]
    Cancelled,
}

impl From<RetrievalError> for LecternError {
    fn from(err: RetrievalError) -> Self {
        LecternError::Retrieval(err.to_string())
    }
}
