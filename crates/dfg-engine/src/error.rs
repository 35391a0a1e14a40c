//! Error types for graph construction, evaluation and simplification.

use dfg_core::error::{CoreError, ParseError, SugarError};
use dfg_core::{DomainError, NodeError, NodeId};
use thiserror::Error;

/// Why an expression could not be built into a graph.
///
/// A failed construction leaves the context as it was before the call.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConstructError {
    #[error("syntax error: {0}")]
    Parse(#[from] ParseError),

    #[error("unknown node type: '{name}'")]
    UnknownNodeType { name: String },

    /// Malformed sugar, bad arguments, or a failed input check.
    #[error("semantic error: {message}")]
    Semantic {
        node: Option<NodeId>,
        message: String,
    },

    #[error(transparent)]
    Core(CoreError),
}

impl ConstructError {
    pub fn semantic(message: impl Into<String>) -> Self {
        ConstructError::Semantic {
            node: None,
            message: message.into(),
        }
    }

    /// Parse and semantic failures, as opposed to unknown types or arena faults.
    pub fn is_semantic(&self) -> bool {
        matches!(self, ConstructError::Parse(_) | ConstructError::Semantic { .. })
    }
}

impl From<CoreError> for ConstructError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::UnknownNodeType { name } => ConstructError::UnknownNodeType { name },
            CoreError::InvalidConstraint { .. } => ConstructError::semantic(err.to_string()),
            other => ConstructError::Core(other),
        }
    }
}

impl From<SugarError> for ConstructError {
    fn from(err: SugarError) -> Self {
        ConstructError::semantic(err.to_string())
    }
}

impl From<DomainError> for ConstructError {
    fn from(err: DomainError) -> Self {
        ConstructError::Semantic {
            node: err.node,
            message: err.message,
        }
    }
}

/// Errors surfaced by evaluation.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EngineError {
    #[error(transparent)]
    Construct(#[from] ConstructError),

    /// A domain exception, returned only when exceptions are not suppressed.
    #[error("domain exception: {0}")]
    Domain(DomainError),

    /// An internal fault under the propagate policy.
    #[error("internal fault at node {node:?}: {message}")]
    Fault {
        node: Option<NodeId>,
        message: String,
    },

    #[error(transparent)]
    Core(#[from] CoreError),

    #[error(transparent)]
    Simplify(#[from] SimplifyError),
}

/// Errors from the simplifier.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SimplifyError {
    #[error("simplification hook failed at node {node}: {message}")]
    Hook { node: NodeId, message: String },

    #[error("no fixed point after {rewrites} rewrites at node {node}")]
    NoFixedPoint { node: NodeId, rewrites: usize },

    #[error(transparent)]
    Core(#[from] CoreError),
}

impl SimplifyError {
    pub(crate) fn from_hook(node: NodeId, err: NodeError) -> Self {
        SimplifyError::Hook {
            node,
            message: err.to_string(),
        }
    }
}
