use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::Bfs;
use stepcore::{ConfigError, GraphSchema, StepId};
use std::collections::{HashMap, HashSet};

/// Index-addressed view of a schema: one graph node per referenced step,
/// one edge per declared connection.
pub(crate) struct StepGraph {
    pub(crate) graph: DiGraph<StepId, ()>,
    pub(crate) index: HashMap<StepId, NodeIndex>,
}

impl StepGraph {
    pub(crate) fn build(schema: &GraphSchema) -> Self {
        let mut graph = DiGraph::new();
        let mut index = HashMap::new();

        for id in schema.step_ids() {
            let idx = graph.add_node(id.clone());
            index.insert(id, idx);
        }

        for edge in &schema.nodes {
            let from = index[&edge.step];
            for target in &edge.connections {
                graph.add_edge(from, index[target], ());
            }
        }

        Self { graph, index }
    }

    /// Members of the first cycle found, in path order.
    ///
    /// Depth-first with an explicit stack: a node is "open" while it is on
    /// the current path and "done" once all of its successors are explored.
    /// Reaching an open node closes a cycle, which also covers self-loops.
    fn find_cycle(&self) -> Option<Vec<StepId>> {
        #[derive(Clone, Copy, PartialEq)]
        enum Mark {
            New,
            Open,
            Done,
        }

        let mut marks = vec![Mark::New; self.graph.node_count()];

        for root in self.graph.node_indices() {
            if marks[root.index()] != Mark::New {
                continue;
            }

            marks[root.index()] = Mark::Open;
            let mut stack = vec![(root, self.graph.neighbors(root))];

            while let Some((node, neighbors)) = stack.last_mut() {
                let node = *node;
                let next = neighbors.next();

                match next {
                    Some(next) => match marks[next.index()] {
                        Mark::New => {
                            marks[next.index()] = Mark::Open;
                            stack.push((next, self.graph.neighbors(next)));
                        }
                        Mark::Open => {
                            let pos = stack.iter().position(|(n, _)| *n == next).unwrap_or(0);
                            return Some(
                                stack[pos..]
                                    .iter()
                                    .map(|(n, _)| self.graph[*n].clone())
                                    .collect(),
                            );
                        }
                        Mark::Done => {}
                    },
                    None => {
                        marks[node.index()] = Mark::Done;
                        stack.pop();
                    }
                }
            }
        }

        None
    }

    fn reachable_from(&self, start: &StepId) -> HashSet<NodeIndex> {
        let mut reached = HashSet::new();
        if let Some(&start) = self.index.get(start) {
            let mut bfs = Bfs::new(&self.graph, start);
            while let Some(nx) = bfs.next(&self.graph) {
                reached.insert(nx);
            }
        }
        reached
    }
}

/// Checks that a schema forms a rooted DAG with valid routing.
///
/// Checks run in a fixed order and stop at the first failure: structure
/// (duplicate or missing start), cycles, reachability, routing arity.
pub struct Validator<'a> {
    schema: &'a GraphSchema,
}

impl<'a> Validator<'a> {
    pub fn new(schema: &'a GraphSchema) -> Self {
        Self { schema }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.validate_structure()?;

        let graph = StepGraph::build(self.schema);
        if let Some(members) = graph.find_cycle() {
            return Err(ConfigError::Cycle { members });
        }

        self.validate_reachability(&graph)?;
        self.validate_connections()
    }

    fn validate_structure(&self) -> Result<(), ConfigError> {
        let mut seen = HashSet::new();
        for edge in &self.schema.nodes {
            if !seen.insert(&edge.step) {
                return Err(ConfigError::DuplicateStep(edge.step.clone()));
            }
        }

        if self.schema.edge(&self.schema.start).is_none() {
            return Err(ConfigError::MissingStart(self.schema.start.clone()));
        }

        Ok(())
    }

    fn validate_reachability(&self, graph: &StepGraph) -> Result<(), ConfigError> {
        let reached = graph.reachable_from(&self.schema.start);

        let mut unreachable: Vec<StepId> = self
            .schema
            .nodes
            .iter()
            .filter(|edge| !reached.contains(&graph.index[&edge.step]))
            .map(|edge| edge.step.clone())
            .collect();

        if unreachable.is_empty() {
            return Ok(());
        }

        unreachable.sort();
        Err(ConfigError::Unreachable { steps: unreachable })
    }

    /// Only routers may declare more than one connection
    fn validate_connections(&self) -> Result<(), ConfigError> {
        for edge in &self.schema.nodes {
            if edge.connections.len() > 1 && !edge.is_router {
                return Err(ConfigError::NotARouter {
                    step: edge.step.clone(),
                });
            }
        }
        Ok(())
    }
}

/// Validate a schema
pub fn validate(schema: &GraphSchema) -> Result<(), ConfigError> {
    Validator::new(schema).validate()
}

#[cfg(test)]
mod tests {
    use super::*;
    use stepcore::EdgeConfig;

    fn ids(names: &[&str]) -> Vec<StepId> {
        names.iter().map(|n| StepId::from(*n)).collect()
    }

    #[test]
    fn test_linear_schema_is_valid() {
        let schema = GraphSchema::new("A")
            .node(EdgeConfig::new("A").connect("B"))
            .node(EdgeConfig::new("B").connect("C"))
            .node(EdgeConfig::new("C"));

        assert!(validate(&schema).is_ok());
    }

    #[test]
    fn test_connection_target_without_edge_config_is_valid() {
        let schema = GraphSchema::new("Analyze")
            .node(EdgeConfig::new("Analyze").connect("Router"))
            .node(EdgeConfig::new("Router").connect("Escalate").connect("Respond").router());

        assert!(validate(&schema).is_ok());
    }

    #[test]
    fn test_self_loop_is_a_cycle() {
        let schema = GraphSchema::new("A").node(EdgeConfig::new("A").connect("A"));

        match validate(&schema) {
            Err(ConfigError::Cycle { members }) => assert_eq!(members, ids(&["A"])),
            other => panic!("expected cycle, got {:?}", other),
        }
    }

    #[test]
    fn test_cycle_members_reported_in_path_order() {
        let schema = GraphSchema::new("A")
            .node(EdgeConfig::new("A").connect("B"))
            .node(EdgeConfig::new("B").connect("C"))
            .node(EdgeConfig::new("C").connect("B"));

        match validate(&schema) {
            Err(ConfigError::Cycle { members }) => assert_eq!(members, ids(&["B", "C"])),
            other => panic!("expected cycle, got {:?}", other),
        }
    }

    #[test]
    fn test_diamond_is_not_a_cycle() {
        let schema = GraphSchema::new("A")
            .node(EdgeConfig::new("A").connect("B").connect("C").router())
            .node(EdgeConfig::new("B").connect("D"))
            .node(EdgeConfig::new("C").connect("D"))
            .node(EdgeConfig::new("D"));

        assert!(validate(&schema).is_ok());
    }

    #[test]
    fn test_unreachable_steps_reported_together() {
        let schema = GraphSchema::new("A")
            .node(EdgeConfig::new("A").connect("B"))
            .node(EdgeConfig::new("B"))
            .node(EdgeConfig::new("Z").connect("Y"))
            .node(EdgeConfig::new("Y"))
            .node(EdgeConfig::new("X"));

        match validate(&schema) {
            Err(ConfigError::Unreachable { steps }) => assert_eq!(steps, ids(&["X", "Y", "Z"])),
            other => panic!("expected unreachable, got {:?}", other),
        }
    }

    #[test]
    fn test_cycle_reported_before_unreachable() {
        let schema = GraphSchema::new("A")
            .node(EdgeConfig::new("A").connect("B"))
            .node(EdgeConfig::new("B").connect("A"))
            .node(EdgeConfig::new("Orphan"));

        assert!(matches!(validate(&schema), Err(ConfigError::Cycle { .. })));
    }

    #[test]
    fn test_unreachable_reported_before_arity() {
        let schema = GraphSchema::new("A")
            .node(EdgeConfig::new("A").connect("B").connect("C"))
            .node(EdgeConfig::new("Orphan"));

        assert!(matches!(validate(&schema), Err(ConfigError::Unreachable { .. })));
    }

    #[test]
    fn test_multiple_connections_require_router() {
        let schema = GraphSchema::new("A")
            .node(EdgeConfig::new("A").connect("B").connect("C"));

        match validate(&schema) {
            Err(ConfigError::NotARouter { step }) => assert_eq!(step.as_str(), "A"),
            other => panic!("expected arity error, got {:?}", other),
        }
    }

    #[test]
    fn test_router_with_zero_or_one_connection_is_legal() {
        let schema = GraphSchema::new("A")
            .node(EdgeConfig::new("A").connect("R").router())
            .node(EdgeConfig::new("R").router());

        assert!(validate(&schema).is_ok());
    }

    #[test]
    fn test_duplicate_edge_config() {
        let schema = GraphSchema::new("A")
            .node(EdgeConfig::new("A").connect("B"))
            .node(EdgeConfig::new("A"));

        assert!(matches!(validate(&schema), Err(ConfigError::DuplicateStep(id)) if id.as_str() == "A"));
    }

    #[test]
    fn test_start_needs_edge_config() {
        let schema = GraphSchema::new("Start").node(EdgeConfig::new("Other"));

        assert!(matches!(validate(&schema), Err(ConfigError::MissingStart(id)) if id.as_str() == "Start"));
    }

    #[test]
    fn test_deep_chain_does_not_overflow() {
        let mut schema = GraphSchema::new("s0");
        for i in 0..10_000 {
            schema = schema.node(EdgeConfig::new(format!("s{}", i)).connect(format!("s{}", i + 1)));
        }

        assert!(validate(&schema).is_ok());
    }
}
