//! Operator flattening.

use std::collections::HashSet;

use dfg_core::{DialogContext, NodeId};

use crate::error::SimplifyError;

const JUNCTIONS: [&str; 2] = ["AND", "OR"];

/// Replace every `AND`/`OR` under `root` that has a single input with that
/// input, innermost first. Returns the number of operators removed.
pub fn clean_operators(ctx: &mut DialogContext, root: NodeId) -> Result<usize, SimplifyError> {
    let mut removed = 0;
    let mut order = Vec::new();
    post_order(ctx, root, &mut HashSet::new(), &mut order);
    for id in order {
        let Some(node) = ctx.node(id) else { continue };
        if node.constraint_level > 0 || !JUNCTIONS.contains(&node.type_name.as_str()) {
            continue;
        }
        if node.inputs.len() != 1 {
            continue;
        }
        let Some(child) = node.children().next() else { continue };
        tracing::debug!(operator = %id, %child, "flattening single-input operator");
        ctx.replace_node(id, child)?;
        ctx.delete_unreferenced(id);
        removed += 1;
    }
    Ok(removed)
}

fn post_order(
    ctx: &DialogContext,
    id: NodeId,
    seen: &mut HashSet<NodeId>,
    out: &mut Vec<NodeId>,
) {
    if !seen.insert(id) {
        return;
    }
    let Some(node) = ctx.node(id) else { return };
    for child in node.children() {
        post_order(ctx, child, seen, out);
    }
    out.push(id);
}
