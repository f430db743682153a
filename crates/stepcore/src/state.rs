use crate::{Event, StepId};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Key under which a router records its decision in its result record
pub const NEXT_NODE: &str = "next_node";

/// Mutable context threaded through the steps of one run.
///
/// A fresh `RunState` is created for every run and never shared between
/// runs, so it is the only place a step may keep run-scoped data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunState {
    /// Event that triggered the run
    pub event: Event,

    /// Per-step result records keyed by step name, in execution order
    #[serde(default)]
    pub results: Map<String, Value>,

    /// Free-form run-level metadata
    #[serde(default)]
    pub metadata: Map<String, Value>,
}

impl RunState {
    pub fn new(event: Event) -> Self {
        Self {
            event,
            results: Map::new(),
            metadata: Map::new(),
        }
    }

    /// Store the result record for a step, replacing any previous one
    pub fn record(&mut self, step: impl Into<String>, value: impl Into<Value>) {
        self.results.insert(step.into(), value.into());
    }

    pub fn result(&self, step: &str) -> Option<&Value> {
        self.results.get(step)
    }

    /// Decision a router recorded during this run.
    ///
    /// Returns `None` both when the router has not run and when it ran but
    /// found no next step.
    pub fn routing_decision(&self, router: &StepId) -> Option<StepId> {
        self.results
            .get(router.as_str())?
            .get(NEXT_NODE)?
            .as_str()
            .map(StepId::from)
    }

    /// Resolve a pointer into the state.
    ///
    /// The first segment selects the section (`event`, `results` or
    /// `metadata`); the rest is a JSON pointer into it, so
    /// `/results/AnalyzeTicket/intent` reads the `intent` field recorded by
    /// `AnalyzeTicket`, and `/event/subject` reads the event payload.
    pub fn lookup(&self, pointer: &str) -> Option<&Value> {
        let path = pointer.strip_prefix('/')?;
        let (section, rest) = match path.split_once('/') {
            Some((section, rest)) => (section, rest),
            None => (path, ""),
        };

        match section {
            "event" if rest.is_empty() => Some(&self.event.payload),
            "event" => self.event.payload.pointer(&format!("/{}", rest)),
            "results" => lookup_in(&self.results, rest),
            "metadata" => lookup_in(&self.metadata, rest),
            _ => None,
        }
    }
}

fn lookup_in<'a>(map: &'a Map<String, Value>, rest: &str) -> Option<&'a Value> {
    let (key, tail) = match rest.split_once('/') {
        Some((key, tail)) => (key, Some(tail)),
        None => (rest, None),
    };
    let value = map.get(key)?;
    match tail {
        Some(tail) => value.pointer(&format!("/{}", tail)),
        None => Some(value),
    }
}
