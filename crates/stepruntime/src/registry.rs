use serde_json::{Map, Value};
use stepcore::{ConfigError, Step, StepError, StepId};
use std::collections::HashMap;
use std::sync::Arc;

/// Constructor for the single instance of one step
pub trait StepFactory: Send + Sync {
    /// Create the instance that will serve the step `id`
    fn create(&self, id: &StepId) -> Result<Box<dyn Step>, StepError>;
}

impl<F> StepFactory for F
where
    F: Fn(&StepId) -> Result<Box<dyn Step>, StepError> + Send + Sync,
{
    fn create(&self, id: &StepId) -> Result<Box<dyn Step>, StepError> {
        self(id)
    }
}

/// Registry mapping step ids to their constructors.
///
/// A pipeline instantiates every step it references through this registry
/// exactly once, when it is constructed.
#[derive(Default)]
pub struct StepRegistry {
    factories: HashMap<StepId, Arc<dyn StepFactory>>,
}

impl StepRegistry {
    pub fn new() -> Self {
        Self {
            factories: HashMap::new(),
        }
    }

    /// Register a step factory
    pub fn register(&mut self, id: impl Into<StepId>, factory: Arc<dyn StepFactory>) {
        let id = id.into();
        tracing::debug!("Registering step: {}", id);
        self.factories.insert(id, factory);
    }

    /// Register a plain constructor function
    pub fn register_fn<F>(&mut self, id: impl Into<StepId>, factory: F)
    where
        F: Fn(&StepId) -> Result<Box<dyn Step>, StepError> + Send + Sync + 'static,
    {
        self.register(id, Arc::new(factory));
    }

    pub fn contains(&self, id: &StepId) -> bool {
        self.factories.contains_key(id)
    }

    /// Create the instance for a step id
    pub fn instantiate(&self, id: &StepId) -> Result<Arc<dyn Step>, ConfigError> {
        let factory = self
            .factories
            .get(id)
            .ok_or_else(|| ConfigError::UnknownStep(id.clone()))?;

        factory
            .create(id)
            .map(Arc::from)
            .map_err(|source| ConfigError::StepInit {
                step: id.clone(),
                source,
            })
    }

    /// All registered step ids, sorted
    pub fn list_steps(&self) -> Vec<StepId> {
        let mut ids: Vec<StepId> = self.factories.keys().cloned().collect();
        ids.sort();
        ids
    }
}

/// A reusable kind of step that can be configured from a pipeline file
pub trait StepKind: Send + Sync {
    /// Kind identifier (e.g. "debug.log", "router.match")
    fn kind(&self) -> &str;

    /// Build a step instance named `id` from its declared configuration
    fn build(&self, id: &StepId, config: &Map<String, Value>) -> Result<Box<dyn Step>, StepError>;

    fn metadata(&self) -> StepMetadata {
        StepMetadata::default()
    }
}

/// Metadata about a step kind
#[derive(Debug, Clone)]
pub struct StepMetadata {
    pub description: String,
    pub category: String,
    pub config: Vec<ConfigField>,
}

impl Default for StepMetadata {
    fn default() -> Self {
        Self {
            description: String::new(),
            category: "general".to_string(),
            config: Vec::new(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ConfigField {
    pub name: String,
    pub description: String,
    pub required: bool,
}

impl ConfigField {
    pub fn required(name: &str, description: &str) -> Self {
        Self {
            name: name.to_string(),
            description: description.to_string(),
            required: true,
        }
    }

    pub fn optional(name: &str, description: &str) -> Self {
        Self {
            name: name.to_string(),
            description: description.to_string(),
            required: false,
        }
    }
}

/// Catalog of step kinds available to declarative pipelines
#[derive(Default)]
pub struct StepKinds {
    kinds: HashMap<String, Arc<dyn StepKind>>,
}

impl StepKinds {
    pub fn new() -> Self {
        Self {
            kinds: HashMap::new(),
        }
    }

    pub fn register(&mut self, kind: Arc<dyn StepKind>) {
        let name = kind.kind().to_string();
        tracing::info!("Registering step kind: {}", name);
        self.kinds.insert(name, kind);
    }

    pub fn get(&self, kind: &str) -> Option<Arc<dyn StepKind>> {
        self.kinds.get(kind).cloned()
    }

    /// All registered kinds, sorted
    pub fn list_kinds(&self) -> Vec<String> {
        let mut kinds: Vec<String> = self.kinds.keys().cloned().collect();
        kinds.sort();
        kinds
    }

    pub fn get_metadata(&self, kind: &str) -> Option<StepMetadata> {
        self.kinds.get(kind).map(|k| k.metadata())
    }
}
