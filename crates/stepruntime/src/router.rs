use async_trait::async_trait;
use serde_json::{Map, Value};
use stepcore::{RunState, Step, StepError, StepId, NEXT_NODE};

/// One routing rule: inspects the run state and optionally picks the next step
pub trait RouteRule: Send + Sync {
    fn determine_next(&self, state: &RunState) -> Option<StepId>;
}

impl<F> RouteRule for F
where
    F: Fn(&RunState) -> Option<StepId> + Send + Sync,
{
    fn determine_next(&self, state: &RunState) -> Option<StepId> {
        self(state)
    }
}

/// A step that chooses its outgoing edge at run time.
///
/// Rules are evaluated in order and the first one that picks a step wins;
/// when none does, the fallback (if any) is used. The decision is recorded in
/// the run state as `{"next_node": <id or null>}` under the router's name,
/// which is where the pipeline reads it from.
pub struct Router {
    name: StepId,
    rules: Vec<Box<dyn RouteRule>>,
    fallback: Option<StepId>,
}

impl Router {
    pub fn new(name: impl Into<StepId>) -> Self {
        Self {
            name: name.into(),
            rules: Vec::new(),
            fallback: None,
        }
    }

    /// Append a rule; rules are evaluated in the order they were added
    pub fn rule(mut self, rule: impl RouteRule + 'static) -> Self {
        self.rules.push(Box::new(rule));
        self
    }

    pub fn fallback(mut self, step: impl Into<StepId>) -> Self {
        self.fallback = Some(step.into());
        self
    }

    /// First matching rule's choice, else the fallback, else nothing
    pub fn route(&self, state: &RunState) -> Option<StepId> {
        self.rules
            .iter()
            .find_map(|rule| rule.determine_next(state))
            .or_else(|| self.fallback.clone())
    }
}

#[async_trait]
impl Step for Router {
    fn name(&self) -> &str {
        self.name.as_str()
    }

    async fn process(&self, mut state: RunState) -> Result<RunState, StepError> {
        let next = self.route(&state);
        match &next {
            Some(step) => tracing::debug!("Router {} chose {}", self.name, step),
            None => tracing::debug!("Router {} found no next step", self.name),
        }

        let mut record = Map::new();
        record.insert(
            NEXT_NODE.to_string(),
            next.map(|id| Value::String(id.to_string())).unwrap_or(Value::Null),
        );
        state.record(self.name.to_string(), record);
        Ok(state)
    }
}

/// Rule that matches a value addressed by a state pointer.
///
/// With `equals` set the value must be equal to it; without, any truthy value
/// matches (not null, not false, not zero, not empty).
#[derive(Debug, Clone)]
pub struct FieldRule {
    pointer: String,
    equals: Option<Value>,
    target: StepId,
}

impl FieldRule {
    /// Match when the value at `pointer` is truthy
    pub fn truthy(pointer: impl Into<String>, target: impl Into<StepId>) -> Self {
        Self {
            pointer: pointer.into(),
            equals: None,
            target: target.into(),
        }
    }

    /// Match when the value at `pointer` equals `value`
    pub fn equals(pointer: impl Into<String>, value: impl Into<Value>, target: impl Into<StepId>) -> Self {
        Self {
            pointer: pointer.into(),
            equals: Some(value.into()),
            target: target.into(),
        }
    }
}

impl RouteRule for FieldRule {
    fn determine_next(&self, state: &RunState) -> Option<StepId> {
        let value = state.lookup(&self.pointer)?;
        let matched = match &self.equals {
            Some(expected) => value == expected,
            None => is_truthy(value),
        };
        matched.then(|| self.target.clone())
    }
}

fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().map(|f| f != 0.0).unwrap_or(true),
        Value::String(s) => !s.is_empty(),
        Value::Array(a) => !a.is_empty(),
        Value::Object(o) => !o.is_empty(),
    }
}
