//! Query pipeline for Lectern.
//!
//! Drives the end-to-end sequence — reformulate, retrieve in parallel,
//! deduplicate, synthesize — with staged progress events and explicit
//! partial-failure semantics. Only a missing index is fatal; every other
//! failure degrades the outcome instead of aborting it.

pub mod context;
pub mod error;
pub mod expand;
pub mod llm;
pub mod mock;
pub mod orchestrator;

pub use context::{format_context, synthesis_prompt};
pub use error::PipelineError;
pub use expand::{ExpansionOutcome, QueryReformulator};
pub use llm::{LlmError, ReformulationModel, SynthesisModel};
pub use mock::{MockReformulationModel, MockSynthesisModel};
pub use orchestrator::{PipelineOrchestrator, QueryOptions, QueryOutcome};
