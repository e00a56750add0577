//! The pipeline orchestrator: staged execution with partial-failure policy.
//!
//! Stage order is `initialization, expansion, retrieval, generation,
//! completion`. Expansion failures, per-query retrieval failures and
//! synthesis failures degrade the outcome; an empty retrieval short-circuits
//! with a fixed fallback answer. The only hard failure is a session whose
//! index cannot be built or found.

use std::sync::Arc;

use chrono::Utc;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use lectern_core::config::LecternConfig;
use lectern_core::events::{ProgressBus, ProgressEvent, Stage};
use lectern_core::types::{Degradation, QueryRecord};
use lectern_retrieval::{
    IndexProvider, ParallelRetriever, PassageDeduplicator, RetrievalError,
};
use lectern_session::SessionStore;

use crate::context::{format_context, synthesis_prompt};
use crate::error::PipelineError;
use crate::expand::{ExpansionOutcome, QueryReformulator};
use crate::llm::{ReformulationModel, SynthesisModel};

/// Fallback answer when retrieval finds nothing.
const NO_RESULTS_ANSWER: &str = "I couldn't find any relevant documents to answer \
                                 your question. Please make sure documents are indexed.";

/// Per-query options supplied by the caller.
#[derive(Clone, Debug)]
pub struct QueryOptions {
    /// Whether to expand the query into variants before retrieval.
    pub expand: bool,
    /// Neighbor count; falls back to the configured default.
    pub k: Option<usize>,
    /// Cancelling this token aborts the run with [`PipelineError::Cancelled`].
    pub cancel: CancellationToken,
}

impl Default for QueryOptions {
    fn default() -> Self {
        Self {
            expand: true,
            k: None,
            cancel: CancellationToken::new(),
        }
    }
}

/// Result of one completed pipeline run.
#[derive(Clone, Debug)]
pub struct QueryOutcome {
    pub answer: String,
    /// The reformulated variants used during retrieval (empty when expansion
    /// was off, returned nothing, or failed).
    pub expanded_queries: Vec<String>,
    /// Deduplicated passages handed to synthesis.
    pub passages_used: usize,
    /// Why the outcome is degraded, if it is.
    pub degradations: Vec<Degradation>,
}

/// Drives the end-to-end query sequence for every session.
pub struct PipelineOrchestrator {
    store: Arc<SessionStore>,
    provider: Arc<dyn IndexProvider>,
    reformulator: QueryReformulator,
    synthesizer: Arc<dyn SynthesisModel>,
    retriever: ParallelRetriever,
    bus: ProgressBus,
    default_k: usize,
    synthesis_timeout: std::time::Duration,
}

impl PipelineOrchestrator {
    pub fn new(
        store: Arc<SessionStore>,
        provider: Arc<dyn IndexProvider>,
        reformulation: Arc<dyn ReformulationModel>,
        synthesis: Arc<dyn SynthesisModel>,
        config: &LecternConfig,
    ) -> Self {
        Self {
            store,
            provider,
            reformulator: QueryReformulator::from_config(reformulation, &config.pipeline),
            synthesizer: synthesis,
            retriever: ParallelRetriever::from_config(&config.retrieval),
            bus: ProgressBus::new(),
            default_k: config.pipeline.default_k,
            synthesis_timeout: std::time::Duration::from_secs(
                config.pipeline.synthesis_timeout_secs,
            ),
        }
    }

    /// Subscribe to progress events for all runs on this orchestrator.
    pub fn subscribe(&self) -> tokio::sync::broadcast::Receiver<ProgressEvent> {
        self.bus.subscribe()
    }

    /// The session store this orchestrator operates on.
    pub fn store(&self) -> &Arc<SessionStore> {
        &self.store
    }

    /// Run the full pipeline for one query against one session.
    ///
    /// Queries within a session are serialized (the session lock is held for
    /// the whole run); independent sessions run concurrently. Returns the
    /// answer plus diagnostics, or one of the few hard failures: an empty
    /// query, a session with no usable index, or cancellation.
    pub async fn process_query(
        &self,
        session_id: &str,
        query: &str,
        options: QueryOptions,
    ) -> Result<QueryOutcome, PipelineError> {
        let query = query.trim();
        if query.is_empty() {
            return Err(PipelineError::EmptyQuery);
        }

        let session = self.store.get_or_create(session_id)?;
        let mut session = session.lock().await;
        let k = options.k.unwrap_or(self.default_k);
        let mut degradations = Vec::new();

        info!(session = session_id, query, expand = options.expand, k, "Processing query");

        // Stage 1: initialization. The single fatal path — reconfigures or
        // rebuilds the session's retriever before anything else runs.
        self.emit(Stage::Initialization, 10, "Loading retriever...");
        let location = session.index_location();
        let backend = session
            .retriever_mut()
            .get_or_create(self.provider.as_ref(), &location, k)
            .await
            .map_err(PipelineError::IndexUnavailable)?
            .backend();

        if options.cancel.is_cancelled() {
            return Err(PipelineError::Cancelled);
        }

        // Stage 2: expansion (best-effort).
        let expanded_queries = if options.expand {
            self.emit(Stage::Expansion, 20, "Expanding query...");
            match self.reformulator.expand(query).await {
                ExpansionOutcome::Expanded(variants) => {
                    self.bus.publish(
                        ProgressEvent::new(
                            Stage::Expansion,
                            30,
                            format!("Generated {} query variations", variants.len()),
                        )
                        .with_details(serde_json::json!({ "expanded_queries": variants.clone() })),
                    );
                    variants
                }
                ExpansionOutcome::Failed => {
                    degradations.push(Degradation::ExpansionFailed);
                    self.emit(
                        Stage::Expansion,
                        30,
                        "Query expansion failed; continuing with the original query",
                    );
                    Vec::new()
                }
            }
        } else {
            Vec::new()
        };

        // Stage 3: retrieval. Original query first, then the variants.
        self.emit(Stage::Retrieval, 40, "Retrieving relevant documents...");
        let mut queries = Vec::with_capacity(1 + expanded_queries.len());
        queries.push(query.to_string());
        queries.extend(expanded_queries.iter().cloned());

        let batch = self
            .retriever
            .retrieve_all(backend, &queries, k, &options.cancel)
            .await
            .map_err(|e| match e {
                RetrievalError::Cancelled => PipelineError::Cancelled,
                other => PipelineError::Retrieval(other),
            })?;

        for failed in batch.failed_queries {
            degradations.push(Degradation::RetrievalPartialFailure { query: failed });
        }

        let passages = PassageDeduplicator::dedupe(batch.passages);
        self.emit(
            Stage::Retrieval,
            60,
            format!("Retrieved {} documents", passages.len()),
        );

        if passages.is_empty() {
            // Normal terminal outcome, not an error: generation is skipped
            // entirely and the run still counts as completed.
            self.emit(Stage::Retrieval, 70, "No relevant documents found");
            degradations.push(Degradation::NoResultsFound);
            let outcome = QueryOutcome {
                answer: NO_RESULTS_ANSWER.to_string(),
                expanded_queries,
                passages_used: 0,
                degradations,
            };
            session.record_query(self.make_record(query, &outcome, options.expand, k));
            return Ok(outcome);
        }

        if options.cancel.is_cancelled() {
            return Err(PipelineError::Cancelled);
        }

        // Stage 4: generation. Failures become the answer text.
        self.emit(Stage::Generation, 70, "Generating answer...");
        let context = format_context(&passages);
        let prompt = synthesis_prompt(&context, query);

        let call = self.synthesizer.synthesize(&prompt, query);
        let answer = match tokio::time::timeout(self.synthesis_timeout, call).await {
            Ok(Ok(text)) => {
                self.emit(Stage::Generation, 90, "Answer generated successfully");
                text.trim().to_string()
            }
            Ok(Err(e)) => {
                warn!(error = %e, "Answer synthesis failed");
                degradations.push(Degradation::SynthesisFailed);
                self.emit(Stage::Generation, 70, format!("Generation error: {}", e));
                format!("Error during answer generation: {}", e)
            }
            Err(_) => {
                let timeout_secs = self.synthesis_timeout.as_secs();
                warn!(timeout_secs, "Answer synthesis timed out");
                degradations.push(Degradation::SynthesisFailed);
                self.emit(Stage::Generation, 70, "Generation error: synthesis timed out");
                format!(
                    "Error during answer generation: model call timed out after {}s",
                    timeout_secs
                )
            }
        };

        // Stage 5: completion.
        self.emit(Stage::Completion, 100, "Query processing completed");
        let outcome = QueryOutcome {
            answer,
            expanded_queries,
            passages_used: passages.len(),
            degradations,
        };
        session.record_query(self.make_record(query, &outcome, options.expand, k));
        Ok(outcome)
    }

    fn make_record(
        &self,
        query: &str,
        outcome: &QueryOutcome,
        expand_used: bool,
        k: usize,
    ) -> QueryRecord {
        QueryRecord {
            query: query.to_string(),
            answer: outcome.answer.clone(),
            expanded_queries: outcome.expanded_queries.clone(),
            expand_used,
            k,
            timestamp: Utc::now(),
        }
    }

    fn emit(&self, stage: Stage, percent: u8, message: impl Into<String>) {
        self.bus.publish(ProgressEvent::new(stage, percent, message));
    }
}
