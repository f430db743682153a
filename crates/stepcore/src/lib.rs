//! Core abstractions for the step graph engine
//!
//! This crate provides the fundamental types and traits that all other
//! components depend on: the step contract, the run state threaded through a
//! pipeline, the declarative graph schema and the error taxonomy.

mod error;
pub mod events;
mod event;
mod schema;
mod state;
mod step;

pub use error::{ConfigError, PipelineError, RunError, StepError};
pub use event::Event;
pub use events::{EventBus, ExecutionEvent, RunId};
pub use schema::{EdgeConfig, GraphSchema, StepId};
pub use state::{RunState, NEXT_NODE};
pub use step::Step;

/// Result type for pipeline operations
pub type Result<T> = std::result::Result<T, PipelineError>;
