//! One user's documents, retriever slot, and query history.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use tracing::{debug, warn};
use uuid::Uuid;

use lectern_core::types::{DocumentRecord, DocumentStatus, QueryRecord};
use lectern_retrieval::RetrieverCache;

use crate::error::SessionError;

/// All state owned by one session.
///
/// Documents map id to record; the retriever slot caches the session's one
/// live handle; history is append-only. Every mutation of the document set
/// invalidates the retriever slot, because the index contents no longer
/// match what the handle was built from.
pub struct Session {
    id: String,
    /// Directory owning this session's uploads and index.
    dir: PathBuf,
    documents: HashMap<Uuid, DocumentRecord>,
    retriever: RetrieverCache,
    history: Vec<QueryRecord>,
    created_at: DateTime<Utc>,
}

impl Session {
    pub(crate) fn new(id: impl Into<String>, dir: impl Into<PathBuf>) -> Self {
        Self {
            id: id.into(),
            dir: dir.into(),
            documents: HashMap::new(),
            retriever: RetrieverCache::new(),
            history: Vec::new(),
            created_at: Utc::now(),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// This session's artifact directory (uploads and index live under it).
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Where this session's index is built.
    pub fn index_location(&self) -> PathBuf {
        self.dir.join("index")
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    // -------------------------------------------------------------------
    // Documents
    // -------------------------------------------------------------------

    /// Register an uploaded file; returns the new record.
    pub fn add_document(
        &mut self,
        filename: impl Into<String>,
        path: impl Into<PathBuf>,
    ) -> DocumentRecord {
        let record = DocumentRecord::new(filename, path);
        debug!(session = %self.id, document = %record.id, filename = %record.filename, "Document registered");
        self.documents.insert(record.id, record.clone());
        record
    }

    /// Remove a document: drop the record, delete the stored file
    /// (best-effort), and invalidate the retriever slot.
    pub fn remove_document(&mut self, doc_id: Uuid) -> Result<DocumentRecord, SessionError> {
        let record = self
            .documents
            .remove(&doc_id)
            .ok_or(SessionError::DocumentNotFound { id: doc_id })?;

        if let Err(e) = std::fs::remove_file(&record.path) {
            warn!(session = %self.id, path = %record.path.display(), error = %e, "Failed to delete stored file");
        }

        self.retriever.invalidate();
        debug!(session = %self.id, document = %doc_id, "Document removed, retriever invalidated");
        Ok(record)
    }

    /// Flip the given documents to `Indexed` after a successful external
    /// index build, and invalidate the retriever slot so the next query
    /// picks up the new index contents.
    ///
    /// Validates ids before mutating anything: an empty selection or an
    /// unknown id leaves every record untouched.
    pub fn mark_indexed(&mut self, doc_ids: &[Uuid]) -> Result<(), SessionError> {
        if doc_ids.is_empty() {
            return Err(SessionError::NoDocumentsSelected);
        }
        if let Some(missing) = doc_ids.iter().find(|id| !self.documents.contains_key(id)) {
            return Err(SessionError::DocumentNotFound { id: *missing });
        }

        for id in doc_ids {
            if let Some(record) = self.documents.get_mut(id) {
                record.indexed = true;
                record.status = DocumentStatus::Indexed;
            }
        }

        self.retriever.invalidate();
        debug!(session = %self.id, count = doc_ids.len(), "Documents marked indexed, retriever invalidated");
        Ok(())
    }

    pub fn document(&self, doc_id: Uuid) -> Option<&DocumentRecord> {
        self.documents.get(&doc_id)
    }

    /// All document records, in no particular order.
    pub fn documents(&self) -> impl Iterator<Item = &DocumentRecord> {
        self.documents.values()
    }

    pub fn document_count(&self) -> usize {
        self.documents.len()
    }

    // -------------------------------------------------------------------
    // Retriever slot & history
    // -------------------------------------------------------------------

    pub fn retriever(&self) -> &RetrieverCache {
        &self.retriever
    }

    pub fn retriever_mut(&mut self) -> &mut RetrieverCache {
        &mut self.retriever
    }

    /// Append one completed query record. Records are immutable once added.
    pub fn record_query(&mut self, record: QueryRecord) {
        self.history.push(record);
    }

    pub fn history(&self) -> &[QueryRecord] {
        &self.history
    }

    /// Timestamp of the most recent completed query, if any.
    pub fn last_query_at(&self) -> Option<DateTime<Utc>> {
        self.history.last().map(|record| record.timestamp)
    }
}
