//! Error types for session and document bookkeeping.

use lectern_core::error::LecternError;
use uuid::Uuid;

/// Errors from session document operations.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("document not found: {id}")]
    DocumentNotFound { id: Uuid },
    #[error("no documents selected")]
    NoDocumentsSelected,
    #[error("session not found: {0}")]
    SessionNotFound(String),
    #[error("session store lock poisoned: {0}")]
    LockPoisoned(String),
}

impl From<SessionError> for LecternError {
    fn from(err: SessionError) -> Self {
        LecternError::Session(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display() {
        let id = Uuid::nil();
        let err = SessionError::DocumentNotFound { id };
        assert_eq!(
            err.to_string(),
            "document not found: 00000000-0000-0000-0000-000000000000"
        );

        assert_eq!(
            SessionError::NoDocumentsSelected.to_string(),
            "no documents selected"
        );
    }

    #[test]
    fn test_converts_to_top_level_error() {
        let err = SessionError::SessionNotFound("s1".to_string());
        let top: LecternError = err.into();
        assert!(matches!(top, LecternError::Session(_)));
        assert!(top.to_string().contains("s1"));
    }
}
