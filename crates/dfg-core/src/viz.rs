//! Petgraph projection of the dialog graph, for analysis and DOT output.
//!
//! The arena stores edges as role maps on the nodes; [`GraphView`] copies
//! the part reachable from a set of goals into a `StableGraph` so petgraph's
//! algorithms and the DOT writer can be used on it.

use std::collections::HashMap;
use std::fmt;

use petgraph::dot::Dot;
use petgraph::stable_graph::{NodeIndex, StableGraph};

use crate::context::DialogContext;
use crate::id::NodeId;
use crate::signature::ViewMode;

/// Vertex weight: a node's id and its one-line label.
#[derive(Debug, Clone, PartialEq)]
pub struct NodeLabel {
    pub id: NodeId,
    pub label: String,
    pub evaluated: bool,
}

impl fmt::Display for NodeLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{} {}", self.id, self.label)
    }
}

/// Edge weight, pointing from parent to child.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ViewEdge {
    Input { role: String, view: ViewMode },
    Result,
}

impl fmt::Display for ViewEdge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ViewEdge::Input {
                role,
                view: ViewMode::Intension,
            } => write!(f, "!{role}"),
            ViewEdge::Input { role, .. } => f.write_str(role),
            ViewEdge::Result => f.write_str("result"),
        }
    }
}

/// Read-only petgraph copy of the graph under some goals.
#[derive(Debug, Clone)]
pub struct GraphView {
    graph: StableGraph<NodeLabel, ViewEdge>,
    index: HashMap<NodeId, NodeIndex>,
}

impl GraphView {
    /// Project every node reachable from `goals` through inputs and results.
    pub fn from_goals(ctx: &DialogContext, goals: &[NodeId]) -> Self {
        let reachable = ctx.reachable_from(goals.iter().copied());
        let mut graph = StableGraph::new();
        let mut index = HashMap::new();

        for id in &reachable {
            let Some(node) = ctx.node(*id) else { continue };
            let label = match &node.data {
                Some(value) => format!("{}({})", node.display_type(), value),
                None => node.display_type(),
            };
            let ix = graph.add_node(NodeLabel {
                id: *id,
                label,
                evaluated: node.evaluated,
            });
            index.insert(*id, ix);
        }

        for id in &reachable {
            let Some(node) = ctx.node(*id) else { continue };
            let Some(&from) = index.get(id) else { continue };
            for (role, input) in &node.inputs {
                if let Some(&to) = index.get(&input.node()) {
                    graph.add_edge(
                        from,
                        to,
                        ViewEdge::Input {
                            role: role.clone(),
                            view: input.view(),
                        },
                    );
                }
            }
            if let Some(&to) = node.result.and_then(|r| index.get(&r)) {
                graph.add_edge(from, to, ViewEdge::Result);
            }
        }

        GraphView { graph, index }
    }

    pub fn graph(&self) -> &StableGraph<NodeLabel, ViewEdge> {
        &self.graph
    }

    pub fn node_index(&self, id: NodeId) -> Option<NodeIndex> {
        self.index.get(&id).copied()
    }

    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    /// Graphviz DOT text.
    pub fn to_dot(&self) -> String {
        format!("{}", Dot::new(&self.graph))
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::registry::TypeRegistry;
    use crate::value::Value;

    #[test]
    fn projects_inputs_and_results() {
        let mut ctx = DialogContext::new(Arc::new(TypeRegistry::new()));
        let and = ctx.create("AND").unwrap();
        let a = ctx.create_value(Value::Bool(true)).unwrap();
        let r = ctx.create_value(Value::Bool(true)).unwrap();
        let stray = ctx.create("Node").unwrap();
        ctx.add_input(and, "pos1", a, ViewMode::Extension).unwrap();
        ctx.set_result(and, r).unwrap();

        let view = GraphView::from_goals(&ctx, &[and]);
        assert_eq!(view.node_count(), 3);
        assert_eq!(view.edge_count(), 2);
        assert!(view.node_index(stray).is_none());

        let dot = view.to_dot();
        assert!(dot.starts_with("digraph"));
        assert!(dot.contains("AND"));
        assert!(dot.contains("result"));
        assert!(dot.contains("Bool(true)"));
    }
}
