use crate::registry::StepRegistry;
use crate::validator::Validator;
use chrono::Utc;
use stepcore::{
    ConfigError, Event, EventBus, ExecutionEvent, GraphSchema, RunError, RunId, RunState, Step,
    StepId,
};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Instant;
use tracing::Instrument;

/// Executes one validated step graph against events.
///
/// Every step the schema references is instantiated once, when the pipeline
/// is built, and those instances serve every subsequent run. Each run gets
/// its own fresh `RunState`, so concurrent runs on the same pipeline never
/// observe each other's results.
pub struct Pipeline {
    schema: GraphSchema,
    steps: HashMap<StepId, Arc<dyn Step>>,
    event_bus: Option<Arc<EventBus>>,
}

impl Pipeline {
    /// Validate the schema, then instantiate each referenced step
    pub fn new(schema: GraphSchema, registry: &StepRegistry) -> Result<Self, ConfigError> {
        Validator::new(&schema).validate()?;

        let mut steps = HashMap::new();
        for id in schema.step_ids() {
            let step = registry.instantiate(&id)?;
            if step.name() != id.as_str() {
                // decisions are read back under the step id
                if schema.edge(&id).is_some_and(|edge| edge.is_router) {
                    return Err(ConfigError::NameMismatch {
                        step: id,
                        name: step.name().to_string(),
                    });
                }
                tracing::warn!(
                    "Step {} records its results under '{}' instead of its step id",
                    id,
                    step.name()
                );
            }
            steps.insert(id, step);
        }

        tracing::info!(
            "Pipeline ready: start={}, {} steps",
            schema.start,
            steps.len()
        );

        Ok(Self {
            schema,
            steps,
            event_bus: None,
        })
    }

    /// Emit execution events to `bus`
    pub fn with_event_bus(mut self, bus: Arc<EventBus>) -> Self {
        self.event_bus = Some(bus);
        self
    }

    pub fn schema(&self) -> &GraphSchema {
        &self.schema
    }

    /// The instance serving `id`
    pub fn step(&self, id: &StepId) -> Option<&Arc<dyn Step>> {
        self.steps.get(id)
    }

    /// Drive one event through the graph.
    ///
    /// A failing step aborts the run; the partially built state is dropped
    /// and only the error, tagged with the failing step, is returned.
    pub async fn run(&self, event: Event) -> Result<RunState, RunError> {
        let run_id = RunId::new_v4();
        let start_time = Instant::now();

        self.emit(ExecutionEvent::RunStarted {
            run_id,
            event_id: event.id,
            start: self.schema.start.clone(),
            timestamp: Utc::now(),
        });

        tracing::info!("Starting run {} for event {}", run_id, event.id);

        let result = self
            .execute(run_id, event)
            .instrument(tracing::info_span!("run", %run_id))
            .await;

        let duration_ms = start_time.elapsed().as_millis() as u64;
        self.emit(ExecutionEvent::RunCompleted {
            run_id,
            success: result.is_ok(),
            duration_ms,
            timestamp: Utc::now(),
        });

        result
    }

    async fn execute(&self, run_id: RunId, event: Event) -> Result<RunState, RunError> {
        let mut state = RunState::new(event);
        let mut visited = HashSet::new();
        let mut previous: Option<StepId> = None;
        let mut current = Some(self.schema.start.clone());

        while let Some(step_id) = current {
            if !visited.insert(step_id.clone()) {
                return Err(RunError::StepRevisited { step: step_id });
            }

            let step = match self.steps.get(&step_id) {
                Some(step) => step,
                None => {
                    return Err(RunError::UnknownStep {
                        router: previous.unwrap_or_else(|| step_id.clone()),
                        target: step_id,
                    })
                }
            };

            state = self.execute_step(run_id, &step_id, step.as_ref(), state).await?;
            current = self.next_step(run_id, &step_id, &state);
            previous = Some(step_id);
        }

        Ok(state)
    }

    async fn execute_step(
        &self,
        run_id: RunId,
        id: &StepId,
        step: &dyn Step,
        state: RunState,
    ) -> Result<RunState, RunError> {
        let start_time = Instant::now();

        self.emit(ExecutionEvent::StepStarted {
            run_id,
            step: id.clone(),
            timestamp: Utc::now(),
        });

        let result = async {
            let _scope = StepScope::enter(id);
            let result = step.process(state).await;
            if let Err(e) = &result {
                tracing::error!("Error in step {}: {}", id, e);
            }
            result
        }
        .instrument(tracing::info_span!("step", step = %id))
        .await;

        match result {
            Ok(state) => {
                self.emit(ExecutionEvent::StepCompleted {
                    run_id,
                    step: id.clone(),
                    duration_ms: start_time.elapsed().as_millis() as u64,
                    timestamp: Utc::now(),
                });
                Ok(state)
            }
            Err(source) => {
                self.emit(ExecutionEvent::StepFailed {
                    run_id,
                    step: id.clone(),
                    error: source.to_string(),
                    timestamp: Utc::now(),
                });
                Err(RunError::Step {
                    step: id.clone(),
                    source,
                })
            }
        }
    }

    /// Follow the static edge, or the decision a router recorded while it ran
    fn next_step(&self, run_id: RunId, current: &StepId, state: &RunState) -> Option<StepId> {
        let edge = self.schema.edge(current)?;
        if edge.connections.is_empty() {
            return None;
        }

        if edge.is_router {
            let next = state.routing_decision(current);
            self.emit(ExecutionEvent::RouteChosen {
                run_id,
                router: current.clone(),
                next: next.clone(),
                timestamp: Utc::now(),
            });
            return next;
        }

        edge.connections.first().cloned()
    }

    fn emit(&self, event: ExecutionEvent) {
        if let Some(bus) = &self.event_bus {
            bus.emit(event);
        }
    }
}

/// Logs entry to a step, and exit from it on every path out, including
/// failures and early returns.
struct StepScope<'a> {
    step: &'a StepId,
}

impl<'a> StepScope<'a> {
    fn enter(step: &'a StepId) -> Self {
        tracing::info!("Entering step: {}", step);
        Self { step }
    }
}

impl Drop for StepScope<'_> {
    fn drop(&mut self) {
        tracing::info!("Leaving step: {}", self.step);
    }
}
