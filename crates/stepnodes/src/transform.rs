use async_trait::async_trait;
use serde_json::{Map, Value};
use stepcore::{RunState, Step, StepError, StepId};
use stepruntime::{ConfigField, StepKind, StepMetadata};

/// Copy values addressed by state pointers into this step's result record
pub struct ExtractStep {
    name: StepId,
    /// (output key, state pointer)
    fields: Vec<(String, String)>,
    required: bool,
}

#[async_trait]
impl Step for ExtractStep {
    fn name(&self) -> &str {
        self.name.as_str()
    }

    async fn process(&self, mut state: RunState) -> Result<RunState, StepError> {
        let mut record = Map::new();

        for (key, pointer) in &self.fields {
            let value = match state.lookup(pointer) {
                Some(value) => value.clone(),
                None if self.required => return Err(StepError::MissingInput(pointer.clone())),
                None => Value::Null,
            };
            record.insert(key.clone(), value);
        }

        state.record(self.name.to_string(), record);
        Ok(state)
    }
}

pub struct ExtractStepKind;

impl StepKind for ExtractStepKind {
    fn kind(&self) -> &str {
        "transform.extract"
    }

    fn build(&self, id: &StepId, config: &Map<String, Value>) -> Result<Box<dyn Step>, StepError> {
        let fields = config
            .get("fields")
            .and_then(|v| v.as_object())
            .ok_or_else(|| StepError::Configuration("Missing config: fields".to_string()))?;

        let fields = fields
            .iter()
            .map(|(key, pointer)| {
                pointer
                    .as_str()
                    .map(|p| (key.clone(), p.to_string()))
                    .ok_or_else(|| StepError::InvalidInput {
                        field: format!("fields.{}", key),
                        expected: "pointer string".to_string(),
                        actual: pointer.to_string(),
                    })
            })
            .collect::<Result<Vec<_>, _>>()?;

        let required = config
            .get("required")
            .and_then(|v| v.as_bool())
            .unwrap_or(false);

        Ok(Box::new(ExtractStep {
            name: id.clone(),
            fields,
            required,
        }))
    }

    fn metadata(&self) -> StepMetadata {
        StepMetadata {
            description: "Copy values from the event, earlier results or metadata".to_string(),
            category: "transform".to_string(),
            config: vec![
                ConfigField::required("fields", "Map of output key to state pointer"),
                ConfigField::optional("required", "Fail when a pointer resolves to nothing"),
            ],
        }
    }
}

/// Merge fixed values into the run's metadata
pub struct SetMetadataStep {
    name: StepId,
    values: Map<String, Value>,
}

#[async_trait]
impl Step for SetMetadataStep {
    fn name(&self) -> &str {
        self.name.as_str()
    }

    async fn process(&self, mut state: RunState) -> Result<RunState, StepError> {
        for (key, value) in &self.values {
            state.metadata.insert(key.clone(), value.clone());
        }

        let keys: Vec<Value> = self.values.keys().cloned().map(Value::String).collect();
        let mut record = Map::new();
        record.insert("keys".to_string(), Value::Array(keys));
        state.record(self.name.to_string(), record);
        Ok(state)
    }
}

pub struct SetMetadataStepKind;

impl StepKind for SetMetadataStepKind {
    fn kind(&self) -> &str {
        "metadata.set"
    }

    fn build(&self, id: &StepId, config: &Map<String, Value>) -> Result<Box<dyn Step>, StepError> {
        let values = config
            .get("values")
            .and_then(|v| v.as_object())
            .cloned()
            .ok_or_else(|| StepError::Configuration("Missing config: values".to_string()))?;

        Ok(Box::new(SetMetadataStep {
            name: id.clone(),
            values,
        }))
    }

    fn metadata(&self) -> StepMetadata {
        StepMetadata {
            description: "Merge values into the run metadata".to_string(),
            category: "transform".to_string(),
            config: vec![ConfigField::required("values", "Object merged into metadata")],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use stepcore::Event;

    fn config(value: Value) -> Map<String, Value> {
        value.as_object().cloned().unwrap()
    }

    #[tokio::test]
    async fn test_extract_fields() {
        let step = ExtractStepKind
            .build(
                &StepId::from("Extract"),
                &config(json!({"fields": {"subject": "/event/subject", "tier": "/event/customer/tier"}})),
            )
            .unwrap();

        let state = RunState::new(Event::new(json!({"subject": "Invoice #12"})));
        let state = step.process(state).await.unwrap();

        assert_eq!(
            state.result("Extract"),
            Some(&json!({"subject": "Invoice #12", "tier": null}))
        );
    }

    #[tokio::test]
    async fn test_extract_required_field_missing() {
        let step = ExtractStepKind
            .build(
                &StepId::from("Extract"),
                &config(json!({"fields": {"tier": "/event/customer/tier"}, "required": true})),
            )
            .unwrap();

        let err = step
            .process(RunState::new(Event::new(json!({}))))
            .await
            .err()
            .unwrap();
        assert!(matches!(err, StepError::MissingInput(p) if p == "/event/customer/tier"));
    }

    #[test]
    fn test_extract_requires_fields() {
        let err = ExtractStepKind
            .build(&StepId::from("Extract"), &Map::new())
            .err()
            .unwrap();
        assert!(matches!(err, StepError::Configuration(_)));
    }

    #[tokio::test]
    async fn test_set_metadata() {
        let step = SetMetadataStepKind
            .build(
                &StepId::from("Tag"),
                &config(json!({"values": {"priority": "high", "queue": "billing"}})),
            )
            .unwrap();

        let state = step.process(RunState::new(Event::new(json!({})))).await.unwrap();

        assert_eq!(state.metadata.get("priority"), Some(&json!("high")));
        assert_eq!(state.metadata.get("queue"), Some(&json!("billing")));
        assert_eq!(state.result("Tag"), Some(&json!({"keys": ["priority", "queue"]})));
    }
}
