//! Core error types for dfg-core.
//!
//! Uses `thiserror` for structured, matchable error variants covering the
//! registry, the node arena and the expression parser.

use thiserror::Error;

use crate::id::NodeId;

/// Errors produced by the type registry and the dialog context arena.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CoreError {
    /// Two node types were registered under the same name.
    #[error("duplicate type name: '{name}'")]
    DuplicateTypeName { name: String },

    /// An expression or caller asked for a type the registry does not know.
    #[error("unknown node type: '{name}'")]
    UnknownNodeType { name: String },

    /// A type name with malformed constraint markers.
    #[error("invalid constraint syntax: '{name}': {reason}")]
    InvalidConstraint { name: String, reason: String },

    /// A node id was not found in the context.
    #[error("node not found: NodeId({id})", id = id.0)]
    NodeNotFound { id: NodeId },

    /// A node has no input under the given role.
    #[error("node {node} has no input '{role}'")]
    MissingInput { node: NodeId, role: String },

    /// A restore point with this name was never created.
    #[error("unknown restore point: '{name}'")]
    UnknownRestorePoint { name: String },

    /// Linking two nodes would break arena consistency.
    #[error("graph inconsistency: {reason}")]
    GraphInconsistency { reason: String },
}

/// Errors produced while tokenizing and parsing an expression.
///
/// Positions are character offsets into the source text.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ParseError {
    #[error("unexpected '{found}' at {pos}, expected {expected}")]
    UnexpectedChar {
        pos: usize,
        found: char,
        expected: String,
    },

    #[error("unexpected end of expression, expected {expected}")]
    UnexpectedEnd { expected: String },

    #[error("trailing input at {pos}: '{rest}'")]
    TrailingInput { pos: usize, rest: String },

    #[error("invalid node reference at {pos}: '{text}'")]
    InvalidReference { pos: usize, text: String },

    #[error("more than one binding on a single expression at {pos}")]
    MultipleBindings { pos: usize },

    #[error("empty expression")]
    Empty,
}

/// Errors raised while expanding syntactic sugar on a parsed tree.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SugarError {
    #[error("let expects exactly two arguments: a binding list and a body")]
    LetArity,

    #[error("let bindings must be a parenthesized list of name/value pairs")]
    LetBindingList,

    #[error("let binding list has an odd number of elements")]
    LetOddBindings,

    #[error("let binding name must be a plain token, got '{found}'")]
    LetBindingName { found: String },

    #[error("'{name}(_)' expects a single '_' argument")]
    ListShorthand { name: String },
}
