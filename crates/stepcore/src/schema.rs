use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;

/// Identifier of a step variant within a schema
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StepId(String);

impl StepId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for StepId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for StepId {
    fn from(s: &str) -> Self {
        StepId(s.to_string())
    }
}

impl From<String> for StepId {
    fn from(s: String) -> Self {
        StepId(s)
    }
}

impl AsRef<str> for StepId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Declared outgoing edges of one step
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EdgeConfig {
    pub step: StepId,
    #[serde(default)]
    pub connections: Vec<StepId>,
    #[serde(default)]
    pub is_router: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl EdgeConfig {
    pub fn new(step: impl Into<StepId>) -> Self {
        Self {
            step: step.into(),
            connections: Vec::new(),
            is_router: false,
            description: None,
        }
    }

    /// Append a connection target
    pub fn connect(mut self, target: impl Into<StepId>) -> Self {
        self.connections.push(target.into());
        self
    }

    /// Mark this step as a router
    pub fn router(mut self) -> Self {
        self.is_router = true;
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

/// Declarative description of a step graph.
///
/// Building a schema performs no graph-level checking; a schema only becomes
/// executable once it has passed validation when a pipeline is constructed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphSchema {
    pub start: StepId,
    #[serde(default)]
    pub nodes: Vec<EdgeConfig>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl GraphSchema {
    pub fn new(start: impl Into<StepId>) -> Self {
        Self {
            start: start.into(),
            nodes: Vec::new(),
            description: None,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Add an edge configuration
    pub fn node(mut self, edge: EdgeConfig) -> Self {
        self.nodes.push(edge);
        self
    }

    /// Edge configuration declared for `step`, if any
    pub fn edge(&self, step: &StepId) -> Option<&EdgeConfig> {
        self.nodes.iter().find(|nc| &nc.step == step)
    }

    /// Every step id the schema references, either as a node key or as a
    /// connection target, in order of first appearance.
    pub fn step_ids(&self) -> Vec<StepId> {
        let mut seen = HashSet::new();
        let mut ids = Vec::new();

        if self.edge(&self.start).is_none() && seen.insert(self.start.clone()) {
            ids.push(self.start.clone());
        }
        for edge in &self.nodes {
            if seen.insert(edge.step.clone()) {
                ids.push(edge.step.clone());
            }
            for target in &edge.connections {
                if seen.insert(target.clone()) {
                    ids.push(target.clone());
                }
            }
        }

        ids
    }
}
