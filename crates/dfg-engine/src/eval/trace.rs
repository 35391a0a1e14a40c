//! Evaluation trace recording.
//!
//! When [`EvalConfig::trace_enabled`](super::EvalConfig::trace_enabled) is
//! set, the evaluator records a [`TraceEntry`] for every node it visits, in
//! completion order (children before parents).

use dfg_core::{ExceptionId, NodeId};

/// One node visit.
#[derive(Debug, Clone, PartialEq)]
pub struct TraceEntry {
    pub node_id: NodeId,
    /// Type name with constraint markers.
    pub node_type: String,
    /// Whether the node's own `evaluate` hook ran during this visit.
    pub evaluated: bool,
    pub ok: bool,
    /// Exceptions collected from this node's subtree.
    pub exceptions: Vec<ExceptionId>,
    /// Result node, when distinct from the node itself.
    pub result: Option<NodeId>,
}
