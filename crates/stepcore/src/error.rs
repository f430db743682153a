use crate::StepId;
use thiserror::Error;

/// Top-level error for everything built on top of the engine
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("Step error: {0}")]
    Step(#[from] StepError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Execution error: {0}")]
    Run(#[from] RunError),

    #[error("Unknown pipeline: {0}")]
    UnknownPipeline(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Errors raised by a step's `process`
#[derive(Error, Debug)]
pub enum StepError {
    #[error("Missing required input: {0}")]
    MissingInput(String),

    #[error("Invalid input for '{field}': expected {expected}, got {actual}")]
    InvalidInput {
        field: String,
        expected: String,
        actual: String,
    },

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Execution failed: {0}")]
    ExecutionFailed(String),

    #[error(transparent)]
    Other(#[from] Box<dyn std::error::Error + Send + Sync>),
}

impl StepError {
    /// Wrap any error a step implementation encountered
    pub fn other<E>(err: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        StepError::Other(Box::new(err))
    }
}

/// Schema defects, detected before any step is instantiated or run
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Step '{0}' has more than one edge configuration")]
    DuplicateStep(StepId),

    #[error("Start step '{0}' has no edge configuration")]
    MissingStart(StepId),

    #[error("Schema contains a cycle: {}", join(members))]
    Cycle { members: Vec<StepId> },

    #[error("The following steps are unreachable: {}", join(steps))]
    Unreachable { steps: Vec<StepId> },

    #[error("Step '{step}' has multiple connections but is not marked as a router")]
    NotARouter { step: StepId },

    #[error("No factory registered for step '{0}'")]
    UnknownStep(StepId),

    #[error("Router '{step}' records its decision as '{name}'; a router's name must match its step id")]
    NameMismatch { step: StepId, name: String },

    #[error("Unknown step kind: {0}")]
    UnknownKind(String),

    #[error("Failed to create step '{step}': {source}")]
    StepInit {
        step: StepId,
        #[source]
        source: StepError,
    },
}

/// Failures of a single `run`; the pipeline itself stays usable
#[derive(Error, Debug)]
pub enum RunError {
    #[error("Step '{step}' failed: {source}")]
    Step {
        step: StepId,
        #[source]
        source: StepError,
    },

    #[error("Router '{router}' chose '{target}', which is not part of the pipeline")]
    UnknownStep { router: StepId, target: StepId },

    #[error("Step '{step}' was routed to twice in one run")]
    StepRevisited { step: StepId },
}

impl RunError {
    /// Identity of the step the failure is attributed to
    pub fn step(&self) -> &StepId {
        match self {
            RunError::Step { step, .. } => step,
            RunError::UnknownStep { router, .. } => router,
            RunError::StepRevisited { step } => step,
        }
    }
}

fn join(ids: &[StepId]) -> String {
    ids.iter()
        .map(|id| id.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}
