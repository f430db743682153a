use petgraph::dot::{Config, Dot};
use petgraph::graph::DiGraph;
use std::collections::HashMap;
use std::fmt;
use stepcore::GraphSchema;

struct DotStep {
    label: String,
    shape: &'static str,
}

impl fmt::Display for DotStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.label)
    }
}

/// Render a schema as a Graphviz digraph.
///
/// Routers are drawn as diamonds; an `Event` ellipse feeds the start step.
pub fn to_dot(schema: &GraphSchema) -> String {
    let mut graph: DiGraph<DotStep, &'static str> = DiGraph::new();
    let mut index = HashMap::new();

    let event = graph.add_node(DotStep {
        label: "Event".to_string(),
        shape: "ellipse",
    });

    for id in schema.step_ids() {
        let is_router = schema.edge(&id).map(|e| e.is_router).unwrap_or(false);
        let idx = graph.add_node(DotStep {
            label: id.to_string(),
            shape: if is_router { "diamond" } else { "box" },
        });
        index.insert(id, idx);
    }

    if let Some(&start) = index.get(&schema.start) {
        graph.add_edge(event, start, "");
    }
    for edge in &schema.nodes {
        for target in &edge.connections {
            graph.add_edge(index[&edge.step], index[target], "");
        }
    }

    let dot = Dot::with_attr_getters(
        &graph,
        &[Config::EdgeNoLabel, Config::NodeNoLabel],
        &|_, _| String::new(),
        &|_, (_, step)| {
            format!(
                "label = \"{}\" shape = {}",
                step.label.replace('"', "\\\""),
                step.shape
            )
        },
    );

    format!("{}", dot).replacen("{\n", "{\n    rankdir=LR\n", 1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use stepcore::EdgeConfig;

    #[test]
    fn test_render_support_schema() {
        let schema = GraphSchema::new("AnalyzeTicket")
            .node(EdgeConfig::new("AnalyzeTicket").connect("TicketRouter"))
            .node(
                EdgeConfig::new("TicketRouter")
                    .connect("EscalateTicket")
                    .connect("GenerateResponse")
                    .router(),
            )
            .node(EdgeConfig::new("GenerateResponse").connect("SendReply"));

        let dot = to_dot(&schema);

        assert!(dot.starts_with("digraph"));
        assert!(dot.contains("rankdir=LR"));
        assert!(dot.contains("label = \"Event\" shape = ellipse"));
        assert!(dot.contains("label = \"TicketRouter\" shape = diamond"));
        assert!(dot.contains("label = \"SendReply\" shape = box"));
        // event edge plus four declared connections
        assert_eq!(dot.matches(" -> ").count(), 5);
    }
}
