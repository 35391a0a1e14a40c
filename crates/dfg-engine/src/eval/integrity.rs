//! Graph integrity sweep.
//!
//! Checks that the parent-side input maps and the child-side back-references
//! describe the same edges, and that result links point at live nodes.
//! Violations are logged and returned; nothing is repaired.

use std::fmt;

use dfg_core::{DialogContext, NodeId};

/// One broken edge.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IntegrityViolation {
    /// An input names a node that is not in the arena.
    MissingChild {
        parent: NodeId,
        role: String,
        child: NodeId,
    },
    /// An input with no matching back-reference on the child.
    UnmirroredInput {
        parent: NodeId,
        role: String,
        child: NodeId,
    },
    /// A back-reference to a parent that is gone.
    MissingParent {
        child: NodeId,
        role: String,
        parent: NodeId,
    },
    /// A back-reference the parent's inputs do not confirm.
    StaleBackRef {
        child: NodeId,
        role: String,
        parent: NodeId,
    },
    DanglingResult { node: NodeId, result: NodeId },
}

impl fmt::Display for IntegrityViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IntegrityViolation::MissingChild { parent, role, child } => {
                write!(f, "node {parent} input '{role}' points at missing node {child}")
            }
            IntegrityViolation::UnmirroredInput { parent, role, child } => {
                write!(f, "edge {parent} -{role}-> {child} has no back-reference")
            }
            IntegrityViolation::MissingParent { child, role, parent } => {
                write!(f, "node {child} back-reference ({role}, {parent}) names a missing parent")
            }
            IntegrityViolation::StaleBackRef { child, role, parent } => {
                write!(f, "node {child} back-reference ({role}, {parent}) has no matching input")
            }
            IntegrityViolation::DanglingResult { node, result } => {
                write!(f, "node {node} result points at missing node {result}")
            }
        }
    }
}

/// Sweep the whole arena for broken edges.
pub fn check_dangling_nodes(ctx: &DialogContext) -> Vec<IntegrityViolation> {
    let mut violations = Vec::new();
    for node in ctx.nodes() {
        for (role, input) in &node.inputs {
            let child_id = input.node();
            match ctx.node(child_id) {
                None => violations.push(IntegrityViolation::MissingChild {
                    parent: node.id,
                    role: role.clone(),
                    child: child_id,
                }),
                Some(child) => {
                    let mirrored = child
                        .outputs
                        .iter()
                        .any(|(r, p)| r == role && *p == node.id);
                    if !mirrored {
                        violations.push(IntegrityViolation::UnmirroredInput {
                            parent: node.id,
                            role: role.clone(),
                            child: child_id,
                        });
                    }
                }
            }
        }
        for (role, parent_id) in &node.outputs {
            match ctx.node(*parent_id) {
                None => violations.push(IntegrityViolation::MissingParent {
                    child: node.id,
                    role: role.clone(),
                    parent: *parent_id,
                }),
                Some(parent) => {
                    if parent.input(role) != Some(node.id) {
                        violations.push(IntegrityViolation::StaleBackRef {
                            child: node.id,
                            role: role.clone(),
                            parent: *parent_id,
                        });
                    }
                }
            }
        }
        if let Some(result) = node.result {
            if !ctx.contains(result) {
                violations.push(IntegrityViolation::DanglingResult {
                    node: node.id,
                    result,
                });
            }
        }
    }
    for violation in &violations {
        tracing::warn!(%violation, "graph integrity violation");
    }
    violations
}
