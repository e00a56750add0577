//! Pipeline progress events and the bus they are published on.
//!
//! The orchestrator publishes a [`ProgressEvent`] at each stage transition;
//! consumers (a web layer, a CLI spinner, tests) subscribe independently via
//! [`ProgressBus::subscribe`]. Publishing never blocks and never fails the
//! pipeline: events to a channel with no live subscribers are dropped.

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

/// Default capacity of the progress broadcast channel.
const DEFAULT_CAPACITY: usize = 256;

/// A named phase of the query pipeline.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    /// Resolving the session's retriever handle.
    Initialization,
    /// Reformulating the query into variants.
    Expansion,
    /// Fanning queries out to the index and merging results.
    Retrieval,
    /// Synthesizing the answer from the merged context.
    Generation,
    /// Terminal state; one event at 100%.
    Completion,
}

impl Stage {
    /// Stable lowercase name, matching the serialized form.
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Initialization => "initialization",
            Stage::Expansion => "expansion",
            Stage::Retrieval => "retrieval",
            Stage::Generation => "generation",
            Stage::Completion => "completion",
        }
    }
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single progress report: `(stage, percent, message, details?)`.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ProgressEvent {
    pub stage: Stage,
    /// 0..=100.
    pub percent: u8,
    pub message: String,
    /// Optional structured payload (e.g. the expanded queries).
    pub details: Option<serde_json::Value>,
}

impl ProgressEvent {
    pub fn new(stage: Stage, percent: u8, message: impl Into<String>) -> Self {
        Self {
            stage,
            percent,
            message: message.into(),
            details: None,
        }
    }

    /// Attach a structured details payload.
    pub fn with_details(mut self, details: serde_json::Value) -> Self {
        self.details = Some(details);
        self
    }
}

/// Broadcast bus for progress events.
///
/// Cheap to clone; every clone publishes into the same channel.
#[derive(Clone, Debug)]
pub struct ProgressBus {
    tx: broadcast::Sender<ProgressEvent>,
}

impl ProgressBus {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    /// Subscribe to all events published after this call.
    pub fn subscribe(&self) -> broadcast::Receiver<ProgressEvent> {
        self.tx.subscribe()
    }

    /// Publish an event. A send error only means no subscriber is listening,
    /// which is not a failure from the pipeline's perspective.
    pub fn publish(&self, event: ProgressEvent) {
        tracing::debug!(
            stage = %event.stage,
            percent = event.percent,
            message = %event.message,
            "pipeline progress"
        );
        let _ = self.tx.send(event);
    }
}

impl Default for ProgressBus {
    fn default() -> Self {
        Self::new()
    }
}
