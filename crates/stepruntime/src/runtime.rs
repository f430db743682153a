use crate::Pipeline;
use serde::{Deserialize, Serialize};
use stepcore::{Event, EventBus, ExecutionEvent, PipelineError, RunState};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Holds named pipelines and picks one for each incoming event
pub struct PipelineRuntime {
    config: RuntimeConfig,
    event_bus: Arc<EventBus>,
    pipelines: Arc<RwLock<HashMap<String, Arc<Pipeline>>>>,
}

impl PipelineRuntime {
    /// Create a new runtime with default settings
    pub fn new() -> Self {
        Self::with_config(RuntimeConfig::default())
    }

    /// Create a new runtime with custom configuration
    pub fn with_config(config: RuntimeConfig) -> Self {
        let event_bus = Arc::new(EventBus::new(config.event_buffer_size));

        Self {
            config,
            event_bus,
            pipelines: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    pub fn config(&self) -> &RuntimeConfig {
        &self.config
    }

    /// Register a pipeline under `name`; its runs report to the runtime's event bus
    pub async fn register_pipeline(&self, name: impl Into<String>, pipeline: Pipeline) {
        let name = name.into();
        tracing::info!("Registering pipeline: {}", name);

        let pipeline = pipeline.with_event_bus(self.event_bus.clone());
        let mut pipelines = self.pipelines.write().await;
        pipelines.insert(name, Arc::new(pipeline));
    }

    /// Names of all registered pipelines, sorted
    pub async fn list_pipelines(&self) -> Vec<String> {
        let pipelines = self.pipelines.read().await;
        let mut names: Vec<String> = pipelines.keys().cloned().collect();
        names.sort();
        names
    }

    /// Routing key for an event.
    ///
    /// Reads the string at `route_key` in the payload; e-mail addresses select
    /// by their local part, so `support@example.com` maps to `support`.
    pub fn pipeline_key(&self, event: &Event) -> Option<String> {
        let value = event.get(&self.config.route_key)?.as_str()?;
        let key = value.split('@').next().unwrap_or(value);
        Some(key.to_string())
    }

    /// Pick the pipeline that should handle `event`
    pub async fn select(&self, event: &Event) -> Result<Arc<Pipeline>, PipelineError> {
        let key = self.pipeline_key(event).ok_or_else(|| {
            PipelineError::UnknownPipeline(format!(
                "event {} has no routing key at {}",
                event.id, self.config.route_key
            ))
        })?;

        let pipelines = self.pipelines.read().await;
        let pipeline = pipelines
            .get(&key)
            .cloned()
            .ok_or(PipelineError::UnknownPipeline(key.clone()))?;

        tracing::info!("Using pipeline: {}", key);
        Ok(pipeline)
    }

    /// Select the pipeline for `event` and run it
    pub async fn dispatch(&self, event: Event) -> Result<RunState, PipelineError> {
        let pipeline = self.select(&event).await?;
        Ok(pipeline.run(event).await?)
    }

    /// Subscribe to execution events of every registered pipeline
    pub fn subscribe_events(&self) -> tokio::sync::broadcast::Receiver<ExecutionEvent> {
        self.event_bus.subscribe()
    }

    pub fn event_bus(&self) -> &Arc<EventBus> {
        &self.event_bus
    }
}

impl Default for PipelineRuntime {
    fn default() -> Self {
        Self::new()
    }
}

/// Configuration for the runtime
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    pub event_buffer_size: usize,
    /// JSON pointer into the event payload holding the pipeline key
    pub route_key: String,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            event_buffer_size: 1000,
            route_key: "/to_email".to_string(),
        }
    }
}
