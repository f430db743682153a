//! Pipeline execution runtime
//!
//! This crate validates step graphs, builds the step instances a graph needs
//! and interprets the graph against events, following static edges and the
//! decisions routers make at run time.

mod dot;
mod loader;
mod pipeline;
mod registry;
mod router;
mod runtime;
mod validator;

pub use dot::to_dot;
pub use loader::{PipelineDefinition, StepDeclaration};
pub use pipeline::Pipeline;
pub use registry::{ConfigField, StepFactory, StepKind, StepKinds, StepMetadata, StepRegistry};
pub use router::{FieldRule, RouteRule, Router};
pub use runtime::{PipelineRuntime, RuntimeConfig};
pub use validator::{validate, Validator};
