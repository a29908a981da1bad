//! Research pipeline orchestration for the arXiv assistant.
//!
//! This crate ties together query formulation, arXiv discovery, bounded PDF
//! extraction, aggregation, and answer synthesis into one durable workflow
//! ([`pipeline::ResearchPipeline`]).

pub mod aggregate;
pub mod keepalive;
pub mod pipeline;
pub mod progress;
pub mod query;
pub mod sources;
pub mod steps;
pub mod synthesis;

pub use pipeline::{PipelineOutcome, PipelineSettings, ResearchPipeline, load_request};
pub use progress::{ProgressReporter, SilentProgress};
pub use steps::{MemoryJournal, StepContext, StepJournal, durable_step};
