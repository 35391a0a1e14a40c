//! Dead-assignment elimination for `do(Let(...), ..., body)` sequences.

use std::collections::BTreeSet;

use dfg_core::builtins::{LET, SEQUENCE};
use dfg_core::signature::positional_role;
use dfg_core::{DialogContext, NodeId};

use crate::error::SimplifyError;

/// One `Let` step of a sequence.
#[derive(Debug, Clone)]
struct Assignment {
    let_node: NodeId,
    name: Option<String>,
    value: NodeId,
}

/// Drop unused bindings from every `let` sequence under `root` and inline
/// bindings used exactly once. A sequence left without bindings is replaced
/// by its final expression.
///
/// Returns the number of bindings removed.
pub fn simplify_unused_assign(ctx: &mut DialogContext, root: NodeId) -> Result<usize, SimplifyError> {
    let mut sequences: Vec<NodeId> = ctx
        .reachable_from([root])
        .into_iter()
        .filter(|id| ctx.node(*id).is_some_and(|n| n.type_name == SEQUENCE))
        .collect();
    // Inner sequences have higher ids than the sequences that contain them.
    sequences.reverse();

    let mut removed = 0;
    for seq in sequences {
        if ctx.contains(seq) {
            removed += simplify_sequence(ctx, seq)?;
        }
    }
    Ok(removed)
}

/// Returns `None` when `seq` is not a run of `Let` steps followed by a body.
fn split_sequence(ctx: &DialogContext, seq: NodeId) -> Option<(Vec<Assignment>, NodeId)> {
    let node = ctx.node(seq)?;
    let mut steps: Vec<NodeId> = node.children().collect();
    let body = steps.pop()?;
    let mut assignments = Vec::with_capacity(steps.len());
    for step in steps {
        let let_node = ctx.node(step)?;
        if let_node.type_name != LET {
            return None;
        }
        assignments.push(Assignment {
            let_node: step,
            name: ctx
                .input_data(step, "name")
                .and_then(|v| v.as_str())
                .map(str::to_owned),
            value: let_node.input("value")?,
        });
    }
    Some((assignments, body))
}

fn simplify_sequence(ctx: &mut DialogContext, seq: NodeId) -> Result<usize, SimplifyError> {
    let Some((assignments, body)) = split_sequence(ctx, seq) else {
        return Ok(0);
    };
    if assignments.is_empty() {
        return Ok(0);
    }

    // Bindings reachable from the body, directly or through other used bindings.
    let mut live = ctx.reachable_from([body]);
    let mut used: BTreeSet<NodeId> = BTreeSet::new();
    loop {
        let newly: Vec<&Assignment> = assignments
            .iter()
            .filter(|a| !used.contains(&a.let_node) && live.contains(&a.value))
            .collect();
        if newly.is_empty() {
            break;
        }
        for a in newly {
            used.insert(a.let_node);
            live.extend(ctx.reachable_from([a.value]));
        }
    }

    let mut removed = 0;
    for a in assignments.iter().filter(|a| !used.contains(&a.let_node)) {
        tracing::debug!(binding = ?a.name, "dropping unused binding");
        drop_assignment(ctx, seq, a)?;
        removed += 1;
    }
    for a in assignments.iter().filter(|a| used.contains(&a.let_node)) {
        let uses = ctx
            .get(a.value)?
            .outputs
            .iter()
            .filter(|(_, parent)| *parent != a.let_node)
            .count();
        if uses == 1 {
            tracing::debug!(binding = ?a.name, "inlining single-use binding");
            drop_assignment(ctx, seq, a)?;
            removed += 1;
        }
    }

    if removed > 0 {
        renumber(ctx, seq)?;
    }
    let bindings_left = split_sequence(ctx, seq).is_some_and(|(rest, _)| !rest.is_empty());
    if !bindings_left {
        ctx.replace_node(seq, body)?;
        ctx.delete_unreferenced(seq);
    }
    Ok(removed)
}

/// Detach one `Let` step from `seq`, forget its name and delete whatever
/// nothing else uses.
fn drop_assignment(ctx: &mut DialogContext, seq: NodeId, a: &Assignment) -> Result<(), SimplifyError> {
    if let Some(name) = &a.name {
        if ctx.lookup(name) == Some(a.value) {
            ctx.unbind(name);
        }
    }
    let roles: Vec<String> = ctx
        .get(seq)?
        .inputs
        .iter()
        .filter(|(_, input)| input.node() == a.let_node)
        .map(|(role, _)| role.clone())
        .collect();
    for role in roles {
        ctx.remove_input(seq, &role)?;
    }
    ctx.delete_unreferenced(a.let_node);
    Ok(())
}

/// Re-key the remaining steps as `pos1..posN`.
fn renumber(ctx: &mut DialogContext, seq: NodeId) -> Result<(), SimplifyError> {
    let steps: Vec<_> = ctx
        .get(seq)?
        .inputs
        .iter()
        .map(|(role, input)| (role.clone(), *input))
        .collect();
    for (role, _) in &steps {
        ctx.remove_input(seq, role)?;
    }
    for (i, (_, input)) in steps.into_iter().enumerate() {
        ctx.add_input(seq, &positional_role(i + 1), input.node(), input.view())?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::construct::{construct_graph, ConstructOptions};
    use dfg_core::printer::to_expression;
    use dfg_core::TypeRegistry;

    fn ctx() -> DialogContext {
        DialogContext::new(Arc::new(TypeRegistry::new()))
    }

    #[test]
    fn unused_binding_is_dropped() {
        let mut ctx = ctx();
        let root = construct_graph(
            &mut ctx,
            "let((x, yes, y, no), AND($x, $x))",
            &ConstructOptions::default(),
        )
        .unwrap();
        let let_y = ctx.node(root).unwrap().input("pos2").unwrap();
        let dead = ctx.reachable_from([let_y]);
        assert!(dead.contains(&ctx.lookup("y").unwrap()));

        let removed = simplify_unused_assign(&mut ctx, root).unwrap();
        assert_eq!(removed, 1);
        assert_eq!(ctx.lookup("y"), None);
        for id in &dead {
            assert!(!ctx.contains(*id), "node {id} of the dropped binding survived");
        }
        let seq = ctx.node(root).unwrap();
        assert_eq!(seq.inputs.len(), 2);
        assert!(seq.inputs.contains_key("pos1") && seq.inputs.contains_key("pos2"));
        ctx.assert_consistency();
    }

    #[test]
    fn single_use_binding_is_inlined_and_sequence_collapses() {
        let mut ctx = ctx();
        let root = construct_graph(&mut ctx, "let((x, yes), NOT($x))", &ConstructOptions::default()).unwrap();
        ctx.add_goal(root).unwrap();
        simplify_unused_assign(&mut ctx, root).unwrap();
        assert!(!ctx.contains(root));
        let goal = ctx.goals()[0];
        assert_eq!(to_expression(&ctx, goal), "NOT(true)");
        ctx.assert_consistency();
    }

    #[test]
    fn transitive_use_keeps_binding() {
        let mut ctx = ctx();
        let root = construct_graph(
            &mut ctx,
            "let((x, yes, y, NOT($x)), AND($y, $y, $x))",
            &ConstructOptions::default(),
        )
        .unwrap();
        let removed = simplify_unused_assign(&mut ctx, root).unwrap();
        assert_eq!(removed, 0);
        assert!(ctx.lookup("x").is_some());
        assert!(ctx.lookup("y").is_some());
    }
}
