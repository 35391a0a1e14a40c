//! Dump/restore conversions between a DialogContext and a flat snapshot.
//!
//! [`dump_context`] flattens a context into a [`SessionSnapshot`]: one
//! [`NodeRecord`] per node with ordered input records, plus goals, exceptions,
//! messages and bindings. [`restore_context`] rebuilds a context with the
//! exact same node ids, recomputing back-references from the inputs.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use dfg_core::context::ContextState;
use dfg_core::exception::{ExceptionRecord, Message};
use dfg_core::printer::to_expression;
use dfg_core::{
    DialogContext, InputRef, Node, NodeId, SessionConfig, TypeRegistry, Value, ViewMode,
};

use crate::error::StorageError;

/// Current snapshot format version.
pub const SNAPSHOT_VERSION: u32 = 1;

/// One input edge of a node, in role order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InputRecord {
    pub role: String,
    pub node: NodeId,
    pub view: ViewMode,
}

/// A node without its back-references.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeRecord {
    pub id: NodeId,
    pub type_name: String,
    pub constraint_level: u8,
    pub output_type: Option<String>,
    pub inputs: Vec<InputRecord>,
    pub data: Option<Value>,
    pub tags: BTreeMap<String, String>,
    pub evaluated: bool,
    pub created_turn: u32,
    pub result: Option<NodeId>,
}

/// A goal with its printed form, kept for readability of stored sessions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GoalRecord {
    pub id: NodeId,
    pub expression: String,
}

/// Everything needed to rebuild a session's context.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionSnapshot {
    pub version: u32,
    pub turn_num: u32,
    pub next_id: u32,
    pub next_exception_id: u32,
    pub config: SessionConfig,
    pub nodes: Vec<NodeRecord>,
    pub goals: Vec<GoalRecord>,
    pub exceptions: Vec<ExceptionRecord>,
    pub messages: Vec<Message>,
    pub bindings: Vec<(String, NodeId)>,
    pub pending_result_bindings: Vec<(String, NodeId)>,
}

/// Flattens `ctx` into a snapshot. Nodes are ordered by id.
pub fn dump_context(ctx: &DialogContext) -> SessionSnapshot {
    let state = ctx.state();
    let nodes = state
        .nodes
        .values()
        .map(|node| NodeRecord {
            id: node.id,
            type_name: node.type_name.clone(),
            constraint_level: node.constraint_level,
            output_type: node.output_type.clone(),
            inputs: node
                .inputs
                .iter()
                .map(|(role, input)| InputRecord {
                    role: role.clone(),
                    node: input.node(),
                    view: input.view(),
                })
                .collect(),
            data: node.data.clone(),
            tags: node.tags.clone(),
            evaluated: node.evaluated,
            created_turn: node.created_turn,
            result: node.result,
        })
        .collect();
    let goals = state
        .goals
        .iter()
        .map(|id| GoalRecord {
            id: *id,
            expression: to_expression(ctx, *id),
        })
        .collect();

    SessionSnapshot {
        version: SNAPSHOT_VERSION,
        turn_num: state.turn_num,
        next_id: state.next_id,
        next_exception_id: state.next_exception_id,
        config: ctx.config().clone(),
        nodes,
        goals,
        exceptions: state.exceptions.clone(),
        messages: state.messages.clone(),
        bindings: state.assign.iter().map(|(k, v)| (k.clone(), *v)).collect(),
        pending_result_bindings: state.pending_result_bindings.clone(),
    }
}

/// Rebuilds a context from `snapshot` against `registry`.
///
/// Fails on an unknown snapshot version, a type missing from the registry,
/// a node id recorded twice, or any reference to a node the snapshot does
/// not contain.
pub fn restore_context(
    registry: Arc<TypeRegistry>,
    snapshot: SessionSnapshot,
) -> Result<DialogContext, StorageError> {
    if snapshot.version != SNAPSHOT_VERSION {
        return Err(StorageError::UnsupportedVersion {
            found: snapshot.version,
            expected: SNAPSHOT_VERSION,
        });
    }

    let ids: BTreeSet<NodeId> = snapshot.nodes.iter().map(|r| r.id).collect();
    let check = |from: String, to: NodeId| -> Result<(), StorageError> {
        if ids.contains(&to) {
            Ok(())
        } else {
            Err(StorageError::DanglingReference { from, to })
        }
    };

    let mut nodes = BTreeMap::new();
    for record in snapshot.nodes {
        if !registry.contains(&record.type_name) {
            return Err(StorageError::UnknownNodeType {
                node: record.id,
                type_name: record.type_name,
            });
        }
        let mut node = Node::new(record.type_name, record.constraint_level, record.created_turn);
        node.id = record.id;
        node.output_type = record.output_type;
        node.data = record.data;
        node.tags = record.tags;
        node.evaluated = record.evaluated;
        if let Some(result) = record.result {
            check(format!("result of node {}", record.id), result)?;
            node.result = Some(result);
        }
        let mut inputs = IndexMap::with_capacity(record.inputs.len());
        for input in record.inputs {
            check(format!("input '{}' of node {}", input.role, record.id), input.node)?;
            inputs.insert(input.role, InputRef::new(input.node, input.view));
        }
        node.inputs = inputs;
        if nodes.insert(record.id, node).is_some() {
            return Err(StorageError::DuplicateNode(record.id));
        }
    }

    // Back-references mirror the inputs.
    let edges: Vec<(NodeId, String, NodeId)> = nodes
        .values()
        .flat_map(|parent: &Node| {
            parent
                .inputs
                .iter()
                .map(move |(role, input)| (input.node(), role.clone(), parent.id))
        })
        .collect();
    for (child, role, parent) in edges {
        if let Some(c) = nodes.get_mut(&child) {
            c.outputs.push((role, parent));
        }
    }

    for goal in &snapshot.goals {
        check("goal list".to_string(), goal.id)?;
    }
    for (name, id) in snapshot.bindings.iter().chain(&snapshot.pending_result_bindings) {
        check(format!("binding '{name}'"), *id)?;
    }
    for record in &snapshot.exceptions {
        if let Some(node) = record.error.node {
            check(format!("exception {}", record.id), node)?;
        }
    }

    let next_id = ids
        .iter()
        .next_back()
        .map_or(0, |max| max.0 + 1)
        .max(snapshot.next_id);
    let state = ContextState {
        nodes,
        next_id,
        goals: snapshot.goals.into_iter().map(|g| g.id).collect(),
        exceptions: snapshot.exceptions,
        next_exception_id: snapshot.next_exception_id,
        messages: snapshot.messages,
        assign: snapshot.bindings.into_iter().collect(),
        pending_result_bindings: snapshot.pending_result_bindings,
        turn_num: snapshot.turn_num,
        prev_reachable: BTreeSet::new(),
    };
    tracing::debug!(nodes = state.nodes.len(), turn = state.turn_num, "context restored");
    Ok(DialogContext::from_parts(registry, snapshot.config, state))
}

#[cfg(test)]
mod tests {
    use super::*;
    use dfg_engine::{process_turn, ConstructOptions};

    fn session() -> DialogContext {
        let mut ctx = DialogContext::new(Arc::new(TypeRegistry::new()));
        for text in ["{a}AND(yes, NOT(no))", "OR(:value(Let(x, $a)), no)"] {
            process_turn(&mut ctx, text, &ConstructOptions::tagged("t")).unwrap();
        }
        ctx
    }

    #[test]
    fn dump_restore_preserves_state() {
        let ctx = session();
        let snapshot = dump_context(&ctx);
        assert_eq!(snapshot.goals.len(), 2);
        assert_eq!(snapshot.goals[0].expression, "{a}AND(true, NOT(false))");

        let restored = restore_context(ctx.registry().clone(), snapshot.clone()).unwrap();
        assert_eq!(restored.state().nodes, ctx.state().nodes);
        assert_eq!(restored.goals(), ctx.goals());
        assert_eq!(restored.bindings(), ctx.bindings());
        assert_eq!(restored.turn_num(), 2);
        assert_eq!(dump_context(&restored), snapshot);
        restored.assert_consistency();
    }

    #[test]
    fn restored_context_keeps_allocating_fresh_ids() {
        let ctx = session();
        let mut restored = restore_context(ctx.registry().clone(), dump_context(&ctx)).unwrap();
        let id = restored.create("AND").unwrap();
        assert!(!ctx.contains(id));
    }

    #[test]
    fn unknown_type_is_rejected() {
        let ctx = session();
        let mut snapshot = dump_context(&ctx);
        snapshot.nodes[0].type_name = "Flight".into();
        match restore_context(ctx.registry().clone(), snapshot) {
            Err(StorageError::UnknownNodeType { type_name, .. }) => assert_eq!(type_name, "Flight"),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn dangling_input_is_rejected() {
        let ctx = session();
        let mut snapshot = dump_context(&ctx);
        snapshot.nodes[0].inputs[0].node = NodeId(999);
        assert!(matches!(
            restore_context(ctx.registry().clone(), snapshot),
            Err(StorageError::DanglingReference { to: NodeId(999), .. })
        ));
    }

    #[test]
    fn duplicate_node_id_is_rejected() {
        let ctx = session();
        let mut snapshot = dump_context(&ctx);
        let mut copy = snapshot.nodes[1].clone();
        copy.id = snapshot.nodes[0].id;
        copy.inputs.clear();
        snapshot.nodes.push(copy);
        assert!(matches!(
            restore_context(ctx.registry().clone(), snapshot),
            Err(StorageError::DuplicateNode(NodeId(0)))
        ));
    }

    #[test]
    fn version_is_checked() {
        let ctx = session();
        let mut snapshot = dump_context(&ctx);
        snapshot.version = 7;
        assert!(matches!(
            restore_context(ctx.registry().clone(), snapshot),
            Err(StorageError::UnsupportedVersion { found: 7, .. })
        ));
    }
}
