use async_trait::async_trait;
use serde_json::{json, Map, Value};
use stepcore::{RunState, Step, StepError, StepId};
use stepruntime::{ConfigField, StepKind, StepMetadata};
use tokio::time::{sleep, Duration};

/// Delay the run for a fixed duration
pub struct DelayStep {
    name: StepId,
    delay_ms: u64,
}

#[async_trait]
impl Step for DelayStep {
    fn name(&self) -> &str {
        self.name.as_str()
    }

    async fn process(&self, mut state: RunState) -> Result<RunState, StepError> {
        tracing::debug!("Delaying for {}ms", self.delay_ms);

        sleep(Duration::from_millis(self.delay_ms)).await;

        state.record(self.name.to_string(), json!({"delay_ms": self.delay_ms}));
        Ok(state)
    }
}

pub struct DelayStepKind;

impl StepKind for DelayStepKind {
    fn kind(&self) -> &str {
        "time.delay"
    }

    fn build(&self, id: &StepId, config: &Map<String, Value>) -> Result<Box<dyn Step>, StepError> {
        let delay_ms = config
            .get("delay_ms")
            .and_then(|v| v.as_u64())
            .unwrap_or(1000); // Default to 1 second if not specified

        Ok(Box::new(DelayStep {
            name: id.clone(),
            delay_ms,
        }))
    }

    fn metadata(&self) -> StepMetadata {
        StepMetadata {
            description: "Delay execution for specified milliseconds".to_string(),
            category: "time".to_string(),
            config: vec![ConfigField::optional("delay_ms", "Milliseconds to wait (default 1000)")],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use stepcore::Event;

    #[tokio::test]
    async fn test_delay_records_duration() {
        let mut config = Map::new();
        config.insert("delay_ms".to_string(), json!(5));
        let step = DelayStepKind.build(&StepId::from("Wait"), &config).unwrap();

        let state = step.process(RunState::new(Event::new(json!({})))).await.unwrap();

        assert_eq!(state.result("Wait"), Some(&json!({"delay_ms": 5})));
    }
}
