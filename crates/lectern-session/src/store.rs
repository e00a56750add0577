//! The session store: owner of every session and its on-disk artifacts.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, Mutex, MutexGuard};

use chrono::{Duration, Utc};
use tokio::sync::Mutex as AsyncMutex;
use tracing::{info, warn};

use crate::session::Session;
use crate::SessionError;

type SessionMap = HashMap<String, Arc<AsyncMutex<Session>>>;

/// Result of a retention sweep.
#[derive(Debug, Clone, Default)]
pub struct SweepResult {
    /// Sessions removed from the store.
    pub sessions_removed: usize,
    /// Artifact directories deleted from disk.
    pub artifacts_removed: usize,
}

/// Maps opaque session tokens to live sessions.
///
/// Sessions are created on first reference to an unknown token. Each session
/// is wrapped in its own async mutex: the orchestrator holds it for the
/// whole of a pipeline run, which serializes queries within a session while
/// leaving independent sessions fully concurrent.
pub struct SessionStore {
    data_root: PathBuf,
    retention_days: u32,
    sessions: Mutex<SessionMap>,
}

impl SessionStore {
    pub fn new(data_root: impl Into<PathBuf>, retention_days: u32) -> Self {
        Self {
            data_root: data_root.into(),
            retention_days,
            sessions: Mutex::new(HashMap::new()),
        }
    }

    fn map(&self) -> Result<MutexGuard<'_, SessionMap>, SessionError> {
        self.sessions
            .lock()
            .map_err(|e| SessionError::LockPoisoned(e.to_string()))
    }

    /// Look up a session, creating it (and its artifact directory) if the
    /// token is unknown.
    pub fn get_or_create(&self, session_id: &str) -> Result<Arc<AsyncMutex<Session>>, SessionError> {
        let mut sessions = self.map()?;
        Ok(Arc::clone(sessions.entry(session_id.to_string()).or_insert_with(|| {
            let dir = self.data_root.join(session_id);
            if let Err(e) = std::fs::create_dir_all(&dir) {
                warn!(session = session_id, dir = %dir.display(), error = %e, "Failed to create session directory");
            }
            info!(session = session_id, "Session created");
            Arc::new(AsyncMutex::new(Session::new(session_id, dir)))
        })))
    }

    /// Look up an existing session without creating one.
    pub fn get(&self, session_id: &str) -> Result<Option<Arc<AsyncMutex<Session>>>, SessionError> {
        Ok(self.map()?.get(session_id).map(Arc::clone))
    }

    /// Explicitly destroy a session and its artifact directory.
    pub fn remove(&self, session_id: &str) -> Result<(), SessionError> {
        let removed = self
            .map()?
            .remove(session_id)
            .ok_or_else(|| SessionError::SessionNotFound(session_id.to_string()))?;
        drop(removed);

        self.remove_artifacts(session_id);
        info!(session = session_id, "Session removed");
        Ok(())
    }

    pub fn session_count(&self) -> usize {
        self.sessions.lock().map(|s| s.len()).unwrap_or(0)
    }

    /// Remove sessions whose most recent completed query is older than the
    /// retention window, along with their artifact directories.
    ///
    /// Sessions with no query history are not eligible: a session is "alive"
    /// once it has ever completed a query, and upload-only sessions are
    /// deliberately never reclaimed by this sweep.
    pub async fn sweep_expired(&self) -> Result<SweepResult, SessionError> {
        let cutoff = Utc::now() - Duration::days(i64::from(self.retention_days));

        let candidates: Vec<(String, Arc<AsyncMutex<Session>>)> = self
            .map()?
            .iter()
            .map(|(id, session)| (id.clone(), Arc::clone(session)))
            .collect();

        let mut expired = Vec::new();
        for (id, session) in candidates {
            let session = session.lock().await;
            if let Some(last) = session.last_query_at() {
                if last < cutoff {
                    expired.push(id);
                }
            }
        }

        let mut result = SweepResult::default();
        {
            let mut sessions = self.map()?;
            for id in &expired {
                if sessions.remove(id).is_some() {
                    result.sessions_removed += 1;
                }
            }
        }

        for id in &expired {
            if self.remove_artifacts(id) {
                result.artifacts_removed += 1;
            }
        }

        if result.sessions_removed > 0 {
            info!(
                removed = result.sessions_removed,
                retention_days = self.retention_days,
                "Retention sweep reclaimed sessions"
            );
        }
        Ok(result)
    }

    /// Delete a session's artifact directory. Returns whether anything was
    /// deleted; failures are logged, not propagated.
    fn remove_artifacts(&self, session_id: &str) -> bool {
        let dir = self.data_root.join(session_id);
        if !dir.exists() {
            return false;
        }
        match std::fs::remove_dir_all(&dir) {
            Ok(()) => true,
            Err(e) => {
                warn!(session = session_id, dir = %dir.display(), error = %e, "Failed to delete session artifacts");
                false
            }
        }
    }
}
