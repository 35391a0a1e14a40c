//! The per-type behavior interface.
//!
//! Every registered node type is a [`NodeBehavior`] object. The node records
//! in the arena are plain data; their type name selects the behavior object
//! from the [`TypeRegistry`](crate::registry::TypeRegistry). Hooks take the
//! context and the node id, mutate through the context, and return a
//! [`NodeError`] on failure.

use indexmap::IndexSet;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::context::DialogContext;
use crate::error::CoreError;
use crate::exception::DomainError;
use crate::id::{ExceptionId, NodeId};
use crate::signature::Signature;

/// Failure of a behavior hook.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum NodeError {
    /// A user-level failure; recorded on the context, evaluation goes on.
    #[error(transparent)]
    Domain(#[from] DomainError),

    /// A programming or consistency error, handled by the fault policy.
    #[error("internal fault at node {node:?}: {message}")]
    Fault {
        node: Option<NodeId>,
        message: String,
    },
}

impl NodeError {
    pub fn fault(node: NodeId, message: impl Into<String>) -> Self {
        NodeError::Fault {
            node: Some(node),
            message: message.into(),
        }
    }
}

impl From<CoreError> for NodeError {
    fn from(err: CoreError) -> Self {
        let node = match &err {
            CoreError::NodeNotFound { id } | CoreError::MissingInput { node: id, .. } => Some(*id),
            _ => None,
        };
        NodeError::Fault {
            node,
            message: err.to_string(),
        }
    }
}

/// What a node does when some of its inputs failed.
#[derive(Debug, Clone, PartialEq)]
pub enum ExceptionAction {
    /// Stay failed; the node is not evaluated.
    Decline,
    /// Ignore the failure and evaluate anyway.
    Proceed,
    /// Stay failed and record this exception, chained to the input failure.
    Chain(DomainError),
}

/// Aggressiveness of simplification rewrites.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SimplifyMode {
    #[default]
    Conservative,
    Aggressive,
}

/// Behavior of one node type.
pub trait NodeBehavior: Send + Sync {
    fn signature(&self) -> &Signature;

    /// Evaluate the result node too, once this node has a distinct result.
    fn eval_res(&self) -> bool {
        false
    }

    /// A failure while evaluating the result fails this node.
    fn res_block(&self) -> bool {
        false
    }

    /// Skip remaining inputs after the first one fails.
    fn stop_eval_on_exception(&self) -> bool {
        false
    }

    /// May the simplifier delete nodes of this type when they become unused.
    fn deletable(&self) -> bool {
        true
    }

    /// Structural check run bottom-up after construction.
    fn valid_input(&self, ctx: &DialogContext, node: NodeId) -> Result<(), DomainError> {
        default_valid_input(ctx, node, self.signature())
    }

    /// Compute the node. May set data, set a result, create nodes, or add
    /// messages through the context.
    fn evaluate(&self, _ctx: &mut DialogContext, _node: NodeId) -> Result<(), NodeError> {
        Ok(())
    }

    fn allows_exception(
        &self,
        _ctx: &DialogContext,
        _node: NodeId,
        _failed: &IndexSet<ExceptionId>,
    ) -> ExceptionAction {
        ExceptionAction::Decline
    }

    /// Bottom-up rewrite. Returns the node that should take this node's
    /// place (the node itself when nothing changes).
    fn pre_simplify(
        &self,
        _ctx: &mut DialogContext,
        node: NodeId,
        _top: NodeId,
        _mode: SimplifyMode,
    ) -> Result<NodeId, NodeError> {
        Ok(node)
    }

    /// Top-down rewrite, same contract as [`pre_simplify`](Self::pre_simplify).
    fn simplify(
        &self,
        _ctx: &mut DialogContext,
        node: NodeId,
        _top: NodeId,
        _mode: SimplifyMode,
    ) -> Result<NodeId, NodeError> {
        Ok(node)
    }

    /// Natural-language rendering of a failure for the user.
    fn explain(&self, _ctx: &DialogContext, _node: NodeId, error: &DomainError) -> String {
        error.message.clone()
    }
}

/// Shared input check: required parameters present on objects, and every
/// typed parameter bound to a compatible node.
pub fn default_valid_input(
    ctx: &DialogContext,
    node: NodeId,
    sig: &Signature,
) -> Result<(), DomainError> {
    let n = ctx
        .node(node)
        .ok_or_else(|| DomainError::new(format!("node {node} is missing")))?;

    if n.constraint_level == 0 {
        if let Some(missing) = sig
            .params
            .iter()
            .find(|p| p.required && !n.inputs.contains_key(&p.name))
        {
            return Err(DomainError::new(format!(
                "{} is missing required parameter '{}'",
                sig.name, missing.name
            ))
            .at(node));
        }
    }

    for (role, input) in &n.inputs {
        let Some(param) = sig.get(role) else { continue };
        if param.types.is_empty() {
            continue;
        }
        let Some(child) = ctx.node(input.node()) else {
            return Err(DomainError::new(format!("input '{role}' of {} is missing", sig.name)).at(node));
        };
        if !ctx.registry().is_compatible(child, &param.types) {
            return Err(DomainError::new(format!(
                "wrong type for {}.{}: expected {}, got {}",
                sig.name,
                role,
                param.types.join(" or "),
                child.display_type()
            ))
            .at(node));
        }
    }
    Ok(())
}
