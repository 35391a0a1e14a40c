//! Stable ID newtypes for dialog-graph entities.
//!
//! Nodes and recorded exceptions are addressed by distinct `u32` newtypes so
//! that an exception id can never be used to look up a node.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Stable node identifier, unique within one [`DialogContext`](crate::context::DialogContext).
///
/// Ids are handed out in creation order and never reused within a session;
/// expressions refer to them with the `$#N` syntax.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NodeId(pub u32);

/// Identifier of a recorded domain exception.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ExceptionId(pub u32);

// Display implementations -- just print the inner value.

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for ExceptionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_display_inner_value() {
        assert_eq!(NodeId(7).to_string(), "7");
        assert_eq!(ExceptionId(3).to_string(), "3");
    }

    #[test]
    fn node_ids_order_by_creation() {
        let mut ids = vec![NodeId(4), NodeId(1), NodeId(3)];
        ids.sort();
        assert_eq!(ids, vec![NodeId(1), NodeId(3), NodeId(4)]);
    }

    #[test]
    fn serde_roundtrip() {
        let json = serde_json::to_string(&NodeId(12)).unwrap();
        assert_eq!(json, "12");
        let back: NodeId = serde_json::from_str(&json).unwrap();
        assert_eq!(back, NodeId(12));
    }
}
