// crates/stepruntime/src/loader.rs

use crate::registry::{StepKinds, StepRegistry};
use crate::Pipeline;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use stepcore::{ConfigError, GraphSchema, PipelineError, StepId};
use std::collections::BTreeMap;
use std::path::Path;

/// A pipeline declared in a JSON file: the graph plus how to build each step
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineDefinition {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub schema: GraphSchema,
    #[serde(default)]
    pub steps: BTreeMap<StepId, StepDeclaration>,
}

/// Which step kind serves a step, and with what configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepDeclaration {
    pub kind: String,
    #[serde(default)]
    pub config: Map<String, Value>,
}

impl PipelineDefinition {
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, PipelineError> {
        let file = std::fs::File::open(path.as_ref())?;
        Ok(serde_json::from_reader(std::io::BufReader::new(file))?)
    }

    pub fn from_json(json: &str) -> Result<Self, PipelineError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Turn the step declarations into a registry of factories.
    ///
    /// Nothing is instantiated here; each factory builds its step when the
    /// pipeline asks for it.
    pub fn registry(&self, kinds: &StepKinds) -> Result<StepRegistry, ConfigError> {
        let mut registry = StepRegistry::new();

        for (id, decl) in &self.steps {
            let kind = kinds
                .get(&decl.kind)
                .ok_or_else(|| ConfigError::UnknownKind(decl.kind.clone()))?;
            let config = decl.config.clone();
            registry.register_fn(id.clone(), move |id: &StepId| kind.build(id, &config));
        }

        Ok(registry)
    }

    /// Validate the schema and build the pipeline
    pub fn build(&self, kinds: &StepKinds) -> Result<Pipeline, ConfigError> {
        let registry = self.registry(kinds)?;
        Pipeline::new(self.schema.clone(), &registry)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DEFINITION: &str = r#"{
        "name": "support",
        "schema": {
            "start": "Analyze",
            "nodes": [
                {"step": "Analyze", "connections": ["Route"]},
                {"step": "Route", "connections": ["Escalate", "Respond"], "is_router": true}
            ]
        },
        "steps": {
            "Analyze": {"kind": "debug.log"},
            "Route": {"kind": "router.match", "config": {"fallback": "Respond"}},
            "Escalate": {"kind": "debug.log", "config": {"message": "escalating"}},
            "Respond": {"kind": "debug.log"}
        }
    }"#;

    #[test]
    fn test_parse_definition() {
        let def = PipelineDefinition::from_json(DEFINITION).unwrap();

        assert_eq!(def.name, "support");
        assert_eq!(def.schema.start, StepId::from("Analyze"));
        assert_eq!(def.steps.len(), 4);
        assert_eq!(def.steps[&StepId::from("Route")].kind, "router.match");
        assert!(def.steps[&StepId::from("Analyze")].config.is_empty());
    }

    #[test]
    fn test_unknown_kind() {
        let def = PipelineDefinition::from_json(DEFINITION).unwrap();
        let err = def.registry(&StepKinds::new()).err().unwrap();

        assert!(matches!(err, ConfigError::UnknownKind(_)));
    }

    #[test]
    fn test_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("support.json");
        std::fs::write(&path, DEFINITION).unwrap();

        let def = PipelineDefinition::from_file(&path).unwrap();
        assert_eq!(def.name, "support");

        let missing = PipelineDefinition::from_file(dir.path().join("missing.json"));
        assert!(matches!(missing, Err(PipelineError::Io(_))));
    }
}
