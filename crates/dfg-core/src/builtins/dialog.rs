//! Builtins that reach back into earlier turns.
//!
//! Both search the goals that were on the list before the current goal was
//! added, newest goal first and, within a goal, newest node first.

use std::collections::HashMap;
use std::sync::Arc;

use crate::behavior::{NodeBehavior, NodeError};
use crate::context::DialogContext;
use crate::exception::DomainError;
use crate::id::NodeId;
use crate::matching::match_constraint;
use crate::signature::{ParamDef, Signature};

use super::UNIVERSAL;

pub fn types() -> Vec<Arc<dyn NodeBehavior>> {
    vec![Arc::new(Refer::new()), Arc::new(Revise::new())]
}

/// Earlier goals with their prior-turn nodes, most recent first.
fn history(ctx: &DialogContext) -> Vec<(NodeId, Vec<NodeId>)> {
    let before = ctx.prev_reachable();
    ctx.goals()
        .iter()
        .rev()
        .filter(|g| before.contains(g))
        .map(|goal| {
            let nodes = ctx
                .reachable_from([*goal])
                .into_iter()
                .rev()
                .filter(|n| before.contains(n))
                .collect();
            (*goal, nodes)
        })
        .collect()
}

/// First earlier object matching `constraint`, with the goal it was found in.
fn find_match(ctx: &DialogContext, constraint: NodeId) -> Option<(NodeId, NodeId)> {
    history(ctx).into_iter().find_map(|(goal, nodes)| {
        nodes
            .into_iter()
            .find(|n| {
                ctx.node(*n).is_some_and(|node| !node.is_constraint())
                    && match_constraint(ctx, constraint, *n)
            })
            .map(|found| (goal, found))
    })
}

fn describe(ctx: &DialogContext, constraint: NodeId) -> String {
    ctx.node(constraint)
        .map(|n| n.type_name.clone())
        .unwrap_or_else(|| "object".to_string())
}

// ---------------------------------------------------------------------------
// refer
// ---------------------------------------------------------------------------

/// `refer(T?(...))`: the most recent earlier object matching the constraint.
#[derive(Debug)]
pub struct Refer {
    sig: Signature,
}

impl Refer {
    pub fn new() -> Self {
        Refer {
            sig: Signature::new("refer")
                .param(ParamDef::new("constraint").positional().required().intension())
                .output(UNIVERSAL),
        }
    }
}

impl Default for Refer {
    fn default() -> Self {
        Self::new()
    }
}

impl NodeBehavior for Refer {
    fn signature(&self) -> &Signature {
        &self.sig
    }

    fn evaluate(&self, ctx: &mut DialogContext, node: NodeId) -> Result<(), NodeError> {
        let constraint = ctx
            .input(node, "constraint")
            .ok_or_else(|| DomainError::new("refer needs a constraint").at(node))?;
        match find_match(ctx, constraint) {
            Some((_, found)) => {
                tracing::debug!(%node, %found, "reference resolved");
                ctx.set_result(node, found)?;
                Ok(())
            }
            None => {
                let what = describe(ctx, constraint);
                Err(DomainError::new(format!("could not find a matching {what}"))
                    .at(node)
                    .hint(format!("mention the {what} explicitly"))
                    .into())
            }
        }
    }
}

// ---------------------------------------------------------------------------
// revise
// ---------------------------------------------------------------------------

/// `revise(old=C?, new=X)`: re-run the most recent goal containing an object
/// matching `old`, with that object replaced by `new`.
#[derive(Debug)]
pub struct Revise {
    sig: Signature,
}

impl Revise {
    pub fn new() -> Self {
        Revise {
            sig: Signature::new("revise")
                .param(ParamDef::new("old").positional().required().intension())
                .param(ParamDef::new("new").positional().required().intension())
                .output(UNIVERSAL),
        }
    }
}

impl Default for Revise {
    fn default() -> Self {
        Self::new()
    }
}

impl NodeBehavior for Revise {
    fn signature(&self) -> &Signature {
        &self.sig
    }

    fn eval_res(&self) -> bool {
        true
    }

    fn res_block(&self) -> bool {
        true
    }

    fn evaluate(&self, ctx: &mut DialogContext, node: NodeId) -> Result<(), NodeError> {
        let old = ctx
            .input(node, "old")
            .ok_or_else(|| DomainError::new("revise needs something to replace").at(node))?;
        let new = ctx
            .input(node, "new")
            .ok_or_else(|| DomainError::new("revise needs a replacement").at(node))?;
        let Some((goal, found)) = find_match(ctx, old) else {
            let what = describe(ctx, old);
            return Err(DomainError::new(format!("nothing earlier matches the {what} to change"))
                .at(node)
                .into());
        };
        let revised = ctx.duplicate_subgraph(goal, &HashMap::from([(found, new)]))?;
        tracing::debug!(%node, %goal, %found, %revised, "goal revised");
        ctx.set_result(node, revised)?;
        Ok(())
    }
}
