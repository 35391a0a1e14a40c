//! Parse tree for dialog expressions.
//!
//! The parser produces an [`AstNode`] tree; [`desugar`](crate::desugar)
//! rewrites shorthand forms in it; the engine's constructor turns it into
//! graph nodes.

use serde::{Deserialize, Serialize};

use crate::signature::{positional_role, ViewMode};

/// A `$name` or `$#N` reference to an existing node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Reference {
    Name(String),
    Id(u32),
}

/// A `{name}` (node) or `{name~}` (result) binding on an expression.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Binding {
    pub name: String,
    pub to_result: bool,
}

/// One parsed expression.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AstNode {
    /// Type name with constraint markers for calls; literal text for terminals.
    pub name: String,
    /// Arguments in source order, each with its role.
    pub args: Vec<(String, AstNode)>,
    pub is_terminal: bool,
    /// Terminal came from a quoted string.
    pub quoted: bool,
    pub reference: Option<Reference>,
    pub binding: Option<Binding>,
    /// Explicit `!`/`@` marker.
    pub view: Option<ViewMode>,
    /// `^tag` / `^tag=value` annotations; empty value for bare tags.
    pub tags: Vec<(String, String)>,
}

impl AstNode {
    fn blank(name: impl Into<String>) -> Self {
        AstNode {
            name: name.into(),
            args: Vec::new(),
            is_terminal: false,
            quoted: false,
            reference: None,
            binding: None,
            view: None,
            tags: Vec::new(),
        }
    }

    /// An unquoted literal token.
    pub fn terminal(text: impl Into<String>) -> Self {
        AstNode {
            is_terminal: true,
            ..Self::blank(text)
        }
    }

    /// A quoted string literal.
    pub fn quoted(text: impl Into<String>) -> Self {
        AstNode {
            quoted: true,
            ..Self::terminal(text)
        }
    }

    pub fn call(name: impl Into<String>, args: Vec<(String, AstNode)>) -> Self {
        AstNode {
            args,
            ..Self::blank(name)
        }
    }

    /// A call whose arguments are all positional.
    pub fn positional_call(name: impl Into<String>, args: Vec<AstNode>) -> Self {
        let args = args
            .into_iter()
            .enumerate()
            .map(|(i, a)| (positional_role(i + 1), a))
            .collect();
        Self::call(name, args)
    }

    pub fn reference(reference: Reference) -> Self {
        AstNode {
            reference: Some(reference),
            ..Self::blank("")
        }
    }

    pub fn is_reference(&self) -> bool {
        self.reference.is_some()
    }

    /// A plain token with no arguments, markers or annotations.
    pub fn is_plain_token(&self) -> bool {
        self.is_terminal
            && !self.quoted
            && self.binding.is_none()
            && self.view.is_none()
            && self.tags.is_empty()
    }

    pub fn arg(&self, role: &str) -> Option<&AstNode> {
        self.args.iter().find(|(r, _)| r == role).map(|(_, a)| a)
    }
}
