//! Error types for the query pipeline.

use lectern_core::error::LecternError;
use lectern_retrieval::RetrievalError;
use lectern_session::SessionError;

/// Errors that abort a pipeline run.
///
/// Deliberately small: expansion failures, per-query retrieval failures,
/// empty results and synthesis failures are all absorbed into the returned
/// outcome (see `Degradation`), not raised here.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("query cannot be empty")]
    EmptyQuery,
    /// No retriever could be built or found for the session — the single
    /// hard-failure path, raised from the initialization stage.
    #[error("index unavailable: {0}")]
    IndexUnavailable(#[source] RetrievalError),
    #[error("retrieval failed: {0}")]
    Retrieval(#[source] RetrievalError),
    #[error("query processing cancelled")]
    Cancelled,
    #[error(transparent)]
    Session(#[from] SessionError),
}

impl From<PipelineError> for LecternError {
    fn from(err: PipelineError) -> Self {
        LecternError::Pipeline(err.to_string())
    }
}
