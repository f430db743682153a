//! Standard step library
//!
//! Collection of built-in step kinds for pipelines loaded from JSON

mod debug;
mod routing;
mod time;
mod transform;

pub use debug::{FailStep, FailStepKind, LogStep, LogStepKind};
pub use routing::MatchRouterKind;
pub use time::{DelayStep, DelayStepKind};
pub use transform::{ExtractStep, ExtractStepKind, SetMetadataStep, SetMetadataStepKind};
use stepruntime::StepKinds;

use std::sync::Arc;

/// Register all standard step kinds
pub fn register_all(kinds: &mut StepKinds) {
    kinds.register(Arc::new(debug::LogStepKind));
    kinds.register(Arc::new(debug::FailStepKind));
    kinds.register(Arc::new(transform::ExtractStepKind));
    kinds.register(Arc::new(transform::SetMetadataStepKind));
    kinds.register(Arc::new(time::DelayStepKind));
    kinds.register(Arc::new(routing::MatchRouterKind));
}
