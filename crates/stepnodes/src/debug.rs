use async_trait::async_trait;
use serde_json::{json, Map, Value};
use stepcore::{RunState, Step, StepError, StepId};
use stepruntime::{ConfigField, StepKind, StepMetadata};

/// Simple debug step that logs the event it sees
pub struct LogStep {
    name: StepId,
    message: Option<String>,
}

impl LogStep {
    pub fn new(name: impl Into<StepId>) -> Self {
        Self {
            name: name.into(),
            message: None,
        }
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }
}

#[async_trait]
impl Step for LogStep {
    fn name(&self) -> &str {
        self.name.as_str()
    }

    async fn process(&self, mut state: RunState) -> Result<RunState, StepError> {
        let message = self.message.as_deref().unwrap_or("(no message)");

        tracing::info!("DEBUG [{}]: {}", self.name, message);
        tracing::debug!("  event {}: {}", state.event.id, state.event.payload);

        state.record(
            self.name.to_string(),
            json!({
                "message": message,
                "event_id": state.event.id.to_string(),
            }),
        );
        Ok(state)
    }
}

pub struct LogStepKind;

impl StepKind for LogStepKind {
    fn kind(&self) -> &str {
        "debug.log"
    }

    fn build(&self, id: &StepId, config: &Map<String, Value>) -> Result<Box<dyn Step>, StepError> {
        let mut step = LogStep::new(id.clone());
        if let Some(message) = config.get("message") {
            let message = message.as_str().ok_or_else(|| StepError::InvalidInput {
                field: "message".to_string(),
                expected: "string".to_string(),
                actual: message.to_string(),
            })?;
            step = step.with_message(message);
        }
        Ok(Box::new(step))
    }

    fn metadata(&self) -> StepMetadata {
        StepMetadata {
            description: "Logs the event and records a message".to_string(),
            category: "debug".to_string(),
            config: vec![ConfigField::optional("message", "Message to log")],
        }
    }
}

/// Step that always fails; useful to exercise failure handling
pub struct FailStep {
    name: StepId,
    message: String,
}

#[async_trait]
impl Step for FailStep {
    fn name(&self) -> &str {
        self.name.as_str()
    }

    async fn process(&self, _state: RunState) -> Result<RunState, StepError> {
        Err(StepError::ExecutionFailed(self.message.clone()))
    }
}

pub struct FailStepKind;

impl StepKind for FailStepKind {
    fn kind(&self) -> &str {
        "debug.fail"
    }

    fn build(&self, id: &StepId, config: &Map<String, Value>) -> Result<Box<dyn Step>, StepError> {
        let message = config
            .get("message")
            .and_then(|v| v.as_str())
            .unwrap_or("step failed on purpose")
            .to_string();

        Ok(Box::new(FailStep {
            name: id.clone(),
            message,
        }))
    }

    fn metadata(&self) -> StepMetadata {
        StepMetadata {
            description: "Always fails with the configured message".to_string(),
            category: "debug".to_string(),
            config: vec![ConfigField::optional("message", "Error message")],
        }
    }
}
