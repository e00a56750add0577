//! Mock language models for tests.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;

use crate::llm::{LlmError, ReformulationModel, SynthesisModel};

/// Reformulation model returning canned lines, optionally failing or slow.
#[derive(Default)]
pub struct MockReformulationModel {
    lines: Vec<String>,
    fail: bool,
    latency: Option<Duration>,
    calls: AtomicUsize,
}

impl MockReformulationModel {
    /// Return these lines on every call (before adapter clean-up).
    pub fn returning(lines: Vec<String>) -> Self {
        Self {
            lines,
            ..Self::default()
        }
    }

    /// Fail every call with a request error.
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    /// Sleep this long before answering.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ReformulationModel for MockReformulationModel {
    async fn reformulate(&self, _query: &str, _n: usize) -> Result<Vec<String>, LlmError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }
        if self.fail {
            return Err(LlmError::Request("injected reformulation failure".to_string()));
        }
        Ok(self.lines.clone())
    }
}

/// Synthesis model returning a canned answer and recording its inputs.
pub struct MockSynthesisModel {
    answer: String,
    fail: bool,
    calls: AtomicUsize,
    seen: Mutex<Vec<(String, String)>>,
}

impl MockSynthesisModel {
    /// Return this answer on every call.
    pub fn answering(answer: &str) -> Self {
        Self {
            answer: answer.to_string(),
            fail: false,
            calls: AtomicUsize::new(0),
            seen: Mutex::new(Vec::new()),
        }
    }

    /// Fail every call with a request error.
    pub fn failing() -> Self {
        Self {
            answer: String::new(),
            fail: true,
            calls: AtomicUsize::new(0),
            seen: Mutex::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// `(context, query)` pairs seen so far, in call order.
    pub fn seen(&self) -> Vec<(String, String)> {
        self.seen.lock().map(|s| s.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl SynthesisModel for MockSynthesisModel {
    async fn synthesize(&self, context: &str, query: &str) -> Result<String, LlmError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Ok(mut seen) = self.seen.lock() {
            seen.push((context.to_string(), query.to_string()));
        }
        if self.fail {
            return Err(LlmError::Request("injected synthesis failure".to_string()));
        }
        Ok(self.answer.clone())
    }
}
