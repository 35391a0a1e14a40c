//! The node record stored in the dialog context arena.
//!
//! Nodes hold their incoming edges as an ordered role map and mirror every
//! edge as a `(role, parent)` back-reference on the child, so the graph can be
//! walked in both directions. Edges are only ever changed through
//! [`DialogContext`](crate::context::DialogContext), which keeps the two sides
//! in sync.

use std::collections::BTreeMap;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

use crate::id::NodeId;
use crate::signature::ViewMode;
use crate::value::Value;

/// One incoming edge: the child node and how the parent views it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum InputRef {
    /// The child node itself.
    Direct(NodeId),
    /// The child's evaluation result.
    ViaResult(NodeId),
}

impl InputRef {
    pub fn new(node: NodeId, view: ViewMode) -> Self {
        match view {
            ViewMode::Intension => InputRef::Direct(node),
            ViewMode::Extension => InputRef::ViaResult(node),
        }
    }

    pub fn node(self) -> NodeId {
        match self {
            InputRef::Direct(n) | InputRef::ViaResult(n) => n,
        }
    }

    pub fn view(self) -> ViewMode {
        match self {
            InputRef::Direct(_) => ViewMode::Intension,
            InputRef::ViaResult(_) => ViewMode::Extension,
        }
    }

    /// Same view, different child.
    pub fn with_node(self, node: NodeId) -> Self {
        InputRef::new(node, self.view())
    }
}

/// A node in the dialog graph.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    pub id: NodeId,
    /// Registered type name, without constraint markers.
    pub type_name: String,
    /// 0 = ordinary object, 1 = constraint over objects, 2 = constraint over
    /// constraints.
    pub constraint_level: u8,
    /// Output type named by `Constraint[T/Out]` syntax.
    pub output_type: Option<String>,
    pub inputs: IndexMap<String, InputRef>,
    /// Back-references: `(role, parent)` for every parent that uses this node.
    pub outputs: SmallVec<[(String, NodeId); 2]>,
    /// Evaluation result, when it is a node other than this one.
    pub result: Option<NodeId>,
    pub data: Option<Value>,
    /// Free-form annotations; an empty value means a bare tag.
    pub tags: BTreeMap<String, String>,
    pub evaluated: bool,
    pub created_turn: u32,
}

impl Node {
    /// A fresh, unlinked node. The context assigns the real id on registration.
    pub fn new(type_name: impl Into<String>, constraint_level: u8, created_turn: u32) -> Self {
        Node {
            id: NodeId(u32::MAX),
            type_name: type_name.into(),
            constraint_level,
            output_type: None,
            inputs: IndexMap::new(),
            outputs: SmallVec::new(),
            result: None,
            data: None,
            tags: BTreeMap::new(),
            evaluated: false,
            created_turn,
        }
    }

    /// The node's result, or the node itself when it has none.
    pub fn result_id(&self) -> NodeId {
        self.result.unwrap_or(self.id)
    }

    pub fn is_constraint(&self) -> bool {
        self.constraint_level > 0
    }

    /// Raw child under `role`, ignoring the view.
    pub fn input(&self, role: &str) -> Option<NodeId> {
        self.inputs.get(role).map(|i| i.node())
    }

    pub fn children(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.inputs.values().map(|i| i.node())
    }

    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.contains_key(tag)
    }

    /// Type name with constraint markers, as written in expressions.
    pub fn display_type(&self) -> String {
        match &self.output_type {
            Some(out) if self.constraint_level > 0 => {
                let mut name = format!("{}/{}", self.type_name, out);
                for _ in 0..self.constraint_level {
                    name = format!("Constraint[{name}]");
                }
                name
            }
            _ => format!(
                "{}{}",
                self.type_name,
                "?".repeat(self.constraint_level as usize)
            ),
        }
    }
}
