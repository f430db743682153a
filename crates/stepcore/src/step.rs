use crate::{RunState, StepError};
use async_trait::async_trait;

/// Core trait that every step in a pipeline implements.
///
/// One instance of each step lives for the whole lifetime of the pipeline and
/// is shared by every run, including concurrent ones. Implementations must
/// keep run-scoped data in the `RunState` they are handed, never in `self`.
#[async_trait]
pub trait Step: Send + Sync {
    /// Name the step records its results under (e.g. "AnalyzeTicket")
    fn name(&self) -> &str;

    /// Consume the run state and return it updated
    async fn process(&self, state: RunState) -> Result<RunState, StepError>;
}
