//! Domain exceptions: user-facing failures raised during evaluation.
//!
//! A [`DomainError`] describes something the user should hear about (a
//! missing attendee, an unknown reference). It is recorded on the
//! [`DialogContext`](crate::context::DialogContext) rather than unwinding the
//! evaluation. Internal faults are a separate channel, see
//! [`NodeError::Fault`](crate::behavior::NodeError::Fault).

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::id::{ExceptionId, NodeId};

/// A follow-up expression the dialog layer may offer the user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Suggestion {
    pub expression: String,
    /// Accept without asking when the user just confirms.
    pub implicit_accept: bool,
}

/// A user-level failure reported by a node.
#[derive(Debug, Clone, PartialEq, Error, Serialize, Deserialize)]
#[error("{message}")]
pub struct DomainError {
    pub message: String,
    /// Node that raised the failure.
    pub node: Option<NodeId>,
    pub hints: Vec<String>,
    pub suggestions: Vec<Suggestion>,
    /// Earlier exception this one wraps.
    pub chained_from: Option<ExceptionId>,
}

impl DomainError {
    pub fn new(message: impl Into<String>) -> Self {
        DomainError {
            message: message.into(),
            node: None,
            hints: Vec::new(),
            suggestions: Vec::new(),
            chained_from: None,
        }
    }

    pub fn at(mut self, node: NodeId) -> Self {
        self.node = Some(node);
        self
    }

    pub fn hint(mut self, hint: impl Into<String>) -> Self {
        self.hints.push(hint.into());
        self
    }

    pub fn suggest(mut self, expression: impl Into<String>, implicit_accept: bool) -> Self {
        self.suggestions.push(Suggestion {
            expression: expression.into(),
            implicit_accept,
        });
        self
    }

    pub fn chained_from(mut self, prior: ExceptionId) -> Self {
        self.chained_from = Some(prior);
        self
    }
}

/// An exception as stored on the context.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExceptionRecord {
    pub id: ExceptionId,
    /// Turn during which it was raised.
    pub turn: u32,
    pub error: DomainError,
}

/// A message a node produced for the user while evaluating.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub turn: u32,
    pub node: Option<NodeId>,
    pub text: String,
}
