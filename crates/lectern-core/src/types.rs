use std::collections::hash_map::DefaultHasher;
use std::collections::BTreeMap;
use std::hash::{Hash, Hasher};
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// =============================================================================
// Enums
// =============================================================================

/// Lifecycle status of a document within a session.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentStatus {
    /// Stored on disk but not yet part of the session's index.
    Uploaded,
    /// Included in the most recent index build.
    Indexed,
}

/// Why a pipeline run produced a degraded (but still successful) outcome.
///
/// Absorbed failures are reported as explicit values rather than swallowed,
/// so callers and tests can assert on the reason an answer was degraded.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Degradation {
    /// Query expansion failed; the run continued with the original query only.
    ExpansionFailed,
    /// One query's retrieval call failed; its contribution was empty.
    RetrievalPartialFailure { query: String },
    /// No passages matched any query; the fixed fallback answer was returned.
    NoResultsFound,
    /// Answer synthesis failed; the answer text describes the error.
    SynthesisFailed,
}

// =============================================================================
// Records
// =============================================================================

/// A document registered with a session.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DocumentRecord {
    /// Unique within the owning session.
    pub id: Uuid,
    /// Original filename as supplied at upload.
    pub filename: String,
    /// Where the uploaded bytes live on disk.
    pub path: PathBuf,
    /// Whether this document is part of the current index.
    pub indexed: bool,
    pub status: DocumentStatus,
    pub uploaded_at: DateTime<Utc>,
}

impl DocumentRecord {
    /// Create a fresh record in `Uploaded` status.
    pub fn new(filename: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Self {
            id: Uuid::new_v4(),
            filename: filename.into(),
            path: path.into(),
            indexed: false,
            status: DocumentStatus::Uploaded,
            uploaded_at: Utc::now(),
        }
    }
}

/// One completed query-answer exchange, appended to a session's history.
///
/// Immutable once appended; only a fully completed (or terminally degraded)
/// pipeline run produces one.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct QueryRecord {
    pub query: String,
    pub answer: String,
    /// The reformulated variants actually used during retrieval.
    pub expanded_queries: Vec<String>,
    /// Whether expansion was requested by the caller.
    pub expand_used: bool,
    /// Neighbor count in effect for this run.
    pub k: usize,
    pub timestamp: DateTime<Utc>,
}

// =============================================================================
// Passage
// =============================================================================

/// A retrieved unit of text plus its metadata (e.g. source filename).
///
/// Passages carry no assigned id: identity for deduplication is the
/// content+metadata fingerprint. `BTreeMap` keeps metadata iteration order
/// deterministic so equal passages always produce equal fingerprints.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Passage {
    pub content: String,
    pub metadata: BTreeMap<String, String>,
}

impl Passage {
    /// Create a passage with no metadata.
    pub fn new(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            metadata: BTreeMap::new(),
        }
    }

    /// Builder-style metadata insertion.
    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    /// Fingerprint over exact content and metadata equality.
    ///
    /// Two passages collide iff their content text and metadata maps are both
    /// equal. Stable within a platform, not across platforms or processes
    /// with differing hasher seeds — callers must not persist fingerprints.
    pub fn fingerprint(&self) -> u64 {
        let mut hasher = DefaultHasher::new();
        self.content.hash(&mut hasher);
        for (key, value) in &self.metadata {
            key.hash(&mut hasher);
            value.hash(&mut hasher);
        }
        hasher.finish()
    }
}
