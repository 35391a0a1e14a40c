//! The dialog context: arena of nodes plus per-session dialog state.
//!
//! [`DialogContext`] owns every node created during a session, the goal list,
//! recorded exceptions, user messages and named bindings. Nodes refer to each
//! other by [`NodeId`]; all edge mutations go through the methods here so the
//! parent-side input map and the child-side back-references stay in sync.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::Arc;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::behavior::NodeBehavior;
use crate::config::{ExceptionRetention, SessionConfig};
use crate::error::CoreError;
use crate::exception::{DomainError, ExceptionRecord, Message};
use crate::id::{ExceptionId, NodeId};
use crate::node::{InputRef, Node};
use crate::registry::TypeRegistry;
use crate::signature::ViewMode;
use crate::value::Value;

// ---------------------------------------------------------------------------
// State
// ---------------------------------------------------------------------------

/// Everything in a context that changes during a session.
///
/// Kept as one value so restore points are plain clones and persistence
/// layers can rebuild a context with [`DialogContext::from_parts`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ContextState {
    pub nodes: BTreeMap<NodeId, Node>,
    pub next_id: u32,
    pub goals: Vec<NodeId>,
    pub exceptions: Vec<ExceptionRecord>,
    pub next_exception_id: u32,
    pub messages: Vec<Message>,
    /// Named bindings from `{name}` in expressions.
    pub assign: IndexMap<String, NodeId>,
    /// `{name~}` bindings waiting for their node's result.
    pub pending_result_bindings: Vec<(String, NodeId)>,
    pub turn_num: u32,
    /// Nodes reachable from the goal list before the current goal was added.
    pub prev_reachable: BTreeSet<NodeId>,
}

/// Snapshot of allocation state taken before a construction pass.
///
/// While a mark is open, tag writes are journaled so a rollback can undo
/// them on nodes that existed before the mark.
#[derive(Debug, Clone)]
pub struct ConstructionMark {
    next_id: u32,
    assign: IndexMap<String, NodeId>,
    pending: usize,
}

/// Previous value of one tag written under an open mark.
type TagUndo = (NodeId, String, Option<String>);

// ---------------------------------------------------------------------------
// DialogContext
// ---------------------------------------------------------------------------

/// Arena and dialog state for one session.
#[derive(Debug)]
pub struct DialogContext {
    registry: Arc<TypeRegistry>,
    config: SessionConfig,
    state: ContextState,
    restore_points: IndexMap<String, ContextState>,
    tag_journal: Option<Vec<TagUndo>>,
}

impl DialogContext {
    pub fn new(registry: Arc<TypeRegistry>) -> Self {
        Self::with_config(registry, SessionConfig::default())
    }

    pub fn with_config(registry: Arc<TypeRegistry>, config: SessionConfig) -> Self {
        DialogContext {
            registry,
            config,
            state: ContextState::default(),
            restore_points: IndexMap::new(),
            tag_journal: None,
        }
    }

    /// Rebuild a context from previously captured state.
    pub fn from_parts(registry: Arc<TypeRegistry>, config: SessionConfig, state: ContextState) -> Self {
        DialogContext {
            registry,
            config,
            state,
            restore_points: IndexMap::new(),
            tag_journal: None,
        }
    }

    /// A fresh context sharing this one's registry and configuration.
    pub fn fresh(&self) -> Self {
        Self::with_config(self.registry.clone(), self.config.clone())
    }

    pub fn registry(&self) -> &Arc<TypeRegistry> {
        &self.registry
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn config_mut(&mut self) -> &mut SessionConfig {
        &mut self.config
    }

    pub fn state(&self) -> &ContextState {
        &self.state
    }

    /// Drop all session state. Registry and configuration are kept.
    pub fn clear(&mut self) {
        self.state = ContextState::default();
        self.restore_points.clear();
    }

    pub fn turn_num(&self) -> u32 {
        self.state.turn_num
    }

    /// Advance to the next turn and return its number.
    pub fn begin_turn(&mut self) -> u32 {
        self.state.turn_num += 1;
        self.state.turn_num
    }

    /// Step back over a turn that produced nothing, so the next one reuses
    /// its number.
    pub fn abandon_turn(&mut self) {
        self.state.turn_num = self.state.turn_num.saturating_sub(1);
    }

    // -----------------------------------------------------------------------
    // Nodes
    // -----------------------------------------------------------------------

    /// Add a node to the arena, assigning the next id.
    pub fn register(&mut self, mut node: Node) -> NodeId {
        let id = NodeId(self.state.next_id);
        self.state.next_id += 1;
        node.id = id;
        node.inputs.clear();
        node.outputs.clear();
        self.state.nodes.insert(id, node);
        id
    }

    /// Create and register a node of `type_name` (constraint markers allowed).
    pub fn create(&mut self, type_name: &str) -> Result<NodeId, CoreError> {
        let registry = self.registry.clone();
        registry.create(self, type_name, &[])
    }

    /// Create a base-type node holding `value`.
    pub fn create_value(&mut self, value: Value) -> Result<NodeId, CoreError> {
        let id = self.create(value.kind().type_name())?;
        self.set_data(id, value)?;
        Ok(id)
    }

    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.state.nodes.get(&id)
    }

    pub fn node_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        self.state.nodes.get_mut(&id)
    }

    pub fn get(&self, id: NodeId) -> Result<&Node, CoreError> {
        self.state
            .nodes
            .get(&id)
            .ok_or(CoreError::NodeNotFound { id })
    }

    fn get_mut(&mut self, id: NodeId) -> Result<&mut Node, CoreError> {
        self.state
            .nodes
            .get_mut(&id)
            .ok_or(CoreError::NodeNotFound { id })
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.state.nodes.contains_key(&id)
    }

    pub fn nodes(&self) -> impl Iterator<Item = &Node> {
        self.state.nodes.values()
    }

    pub fn node_count(&self) -> usize {
        self.state.nodes.len()
    }

    pub fn behavior_of(&self, id: NodeId) -> Result<Arc<dyn NodeBehavior>, CoreError> {
        let node = self.get(id)?;
        self.registry.behavior(&node.type_name)
    }

    pub fn set_data(&mut self, id: NodeId, value: Value) -> Result<(), CoreError> {
        self.get_mut(id)?.data = Some(value);
        Ok(())
    }

    /// Point `node`'s result at `result`. Setting a node as its own result
    /// clears the link.
    pub fn set_result(&mut self, node: NodeId, result: NodeId) -> Result<(), CoreError> {
        if !self.contains(result) {
            return Err(CoreError::NodeNotFound { id: result });
        }
        let n = self.get_mut(node)?;
        n.result = (result != node).then_some(result);
        Ok(())
    }

    pub fn mark_evaluated(&mut self, id: NodeId) -> Result<(), CoreError> {
        self.get_mut(id)?.evaluated = true;
        Ok(())
    }

    pub fn add_tag(&mut self, id: NodeId, tag: &str, value: &str) -> Result<(), CoreError> {
        let previous = self
            .get_mut(id)?
            .tags
            .insert(tag.to_string(), value.to_string());
        if let Some(journal) = self.tag_journal.as_mut() {
            journal.push((id, tag.to_string(), previous));
        }
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Edges
    // -----------------------------------------------------------------------

    /// Link `child` under `parent` as `role`. An existing input under the
    /// same role is replaced in place.
    pub fn add_input(
        &mut self,
        parent: NodeId,
        role: &str,
        child: NodeId,
        view: ViewMode,
    ) -> Result<(), CoreError> {
        if !self.contains(child) {
            return Err(CoreError::NodeNotFound { id: child });
        }
        let previous = self
            .get_mut(parent)?
            .inputs
            .insert(role.to_string(), InputRef::new(child, view));
        if let Some(old) = previous {
            self.drop_back_ref(old.node(), role, parent);
        }
        self.get_mut(child)?.outputs.push((role.to_string(), parent));
        Ok(())
    }

    /// Re-point an existing input at `child`, keeping its position and view.
    pub fn set_input(&mut self, parent: NodeId, role: &str, child: NodeId) -> Result<(), CoreError> {
        let view = self
            .get(parent)?
            .inputs
            .get(role)
            .map(|i| i.view())
            .ok_or_else(|| CoreError::MissingInput {
                node: parent,
                role: role.to_string(),
            })?;
        self.add_input(parent, role, child, view)
    }

    pub fn remove_input(&mut self, parent: NodeId, role: &str) -> Result<Option<InputRef>, CoreError> {
        let removed = self.get_mut(parent)?.inputs.shift_remove(role);
        if let Some(input) = removed {
            self.drop_back_ref(input.node(), role, parent);
        }
        Ok(removed)
    }

    fn drop_back_ref(&mut self, child: NodeId, role: &str, parent: NodeId) {
        if let Some(c) = self.state.nodes.get_mut(&child) {
            if let Some(pos) = c
                .outputs
                .iter()
                .position(|(r, p)| r == role && *p == parent)
            {
                c.outputs.remove(pos);
            }
        }
    }

    /// Make every user of `old` use `new` instead: parents, goals and bindings.
    pub fn replace_node(&mut self, old: NodeId, new: NodeId) -> Result<(), CoreError> {
        if old == new {
            return Ok(());
        }
        if !self.contains(new) {
            return Err(CoreError::NodeNotFound { id: new });
        }
        let parents: Vec<(String, NodeId)> = self.get(old)?.outputs.iter().cloned().collect();
        for (role, parent) in parents {
            if parent == new {
                continue;
            }
            self.set_input(parent, &role, new)?;
        }
        for goal in self.state.goals.iter_mut() {
            if *goal == old {
                *goal = new;
            }
        }
        dedup_keep_last(&mut self.state.goals);
        for bound in self.state.assign.values_mut() {
            if *bound == old {
                *bound = new;
            }
        }
        Ok(())
    }

    /// Follow result links to the node a view-by-result lands on.
    pub fn effective(&self, id: NodeId) -> NodeId {
        let mut current = id;
        let mut seen = BTreeSet::new();
        while let Some(next) = self.node(current).and_then(|n| n.result) {
            if !seen.insert(current) {
                break;
            }
            current = next;
        }
        current
    }

    /// The node an input edge designates, honoring its view.
    pub fn resolve(&self, input: InputRef) -> NodeId {
        match input {
            InputRef::Direct(n) => n,
            InputRef::ViaResult(n) => self.effective(n),
        }
    }

    /// View-aware lookup of `parent`'s input under `role`.
    pub fn input(&self, parent: NodeId, role: &str) -> Option<NodeId> {
        let input = *self.node(parent)?.inputs.get(role)?;
        Some(self.resolve(input))
    }

    /// Data of the node `parent`'s input under `role` resolves to.
    pub fn input_data(&self, parent: NodeId, role: &str) -> Option<&Value> {
        self.node(self.input(parent, role)?)?.data.as_ref()
    }

    /// All inputs of `parent`, view-resolved, in role order.
    pub fn resolved_inputs(&self, parent: NodeId) -> Vec<(String, NodeId)> {
        self.node(parent)
            .map(|n| {
                n.inputs
                    .iter()
                    .map(|(role, input)| (role.clone(), self.resolve(*input)))
                    .collect()
            })
            .unwrap_or_default()
    }

    // -----------------------------------------------------------------------
    // Removal
    // -----------------------------------------------------------------------

    /// Remove a node and every edge touching it. Result links pointing at it
    /// are cleared; goals and bindings naming it are dropped.
    pub fn remove_node(&mut self, id: NodeId) -> Result<Node, CoreError> {
        let node = self
            .state
            .nodes
            .remove(&id)
            .ok_or(CoreError::NodeNotFound { id })?;
        for (role, input) in &node.inputs {
            self.drop_back_ref(input.node(), role, id);
        }
        for (role, parent) in &node.outputs {
            if let Some(p) = self.state.nodes.get_mut(parent) {
                p.inputs.shift_remove(role);
            }
        }
        for other in self.state.nodes.values_mut() {
            if other.result == Some(id) {
                other.result = None;
            }
        }
        self.state.goals.retain(|g| *g != id);
        self.state.assign.retain(|_, bound| *bound != id);
        self.state.pending_result_bindings.retain(|(_, n)| *n != id);
        Ok(node)
    }

    /// Whether anything still needs this node: a parent, a goal, a binding
    /// or another node's result link.
    pub fn is_referenced(&self, id: NodeId) -> bool {
        let Some(node) = self.node(id) else {
            return false;
        };
        !node.outputs.is_empty()
            || self.state.goals.contains(&id)
            || self.state.assign.values().any(|b| *b == id)
            || self.state.pending_result_bindings.iter().any(|(_, n)| *n == id)
            || self.state.nodes.values().any(|n| n.result == Some(id))
    }

    /// Delete `id` if nothing references it, then cascade into its children.
    /// Returns how many nodes were removed.
    pub fn delete_unreferenced(&mut self, id: NodeId) -> usize {
        let mut removed = 0;
        let mut stack = vec![id];
        while let Some(current) = stack.pop() {
            if self.is_referenced(current) {
                continue;
            }
            let deletable = self
                .behavior_of(current)
                .map(|b| b.deletable())
                .unwrap_or(true);
            if !deletable {
                continue;
            }
            if let Ok(node) = self.remove_node(current) {
                stack.extend(node.children());
                stack.extend(node.result);
                removed += 1;
            }
        }
        removed
    }

    /// Nodes reachable from `roots` through inputs and result links.
    pub fn reachable_from<I>(&self, roots: I) -> BTreeSet<NodeId>
    where
        I: IntoIterator<Item = NodeId>,
    {
        let mut seen = BTreeSet::new();
        let mut stack: Vec<NodeId> = roots.into_iter().collect();
        while let Some(id) = stack.pop() {
            let Some(node) = self.node(id) else { continue };
            if !seen.insert(id) {
                continue;
            }
            stack.extend(node.children());
            stack.extend(node.result);
        }
        seen
    }

    /// Deep-copy the graph under `root` as fresh, unevaluated nodes.
    ///
    /// Nodes listed in `replace` are not copied; the mapped node is linked in
    /// their place. Shared sub-nodes stay shared in the copy.
    pub fn duplicate_subgraph(
        &mut self,
        root: NodeId,
        replace: &HashMap<NodeId, NodeId>,
    ) -> Result<NodeId, CoreError> {
        let mut copies = HashMap::new();
        self.duplicate_rec(root, replace, &mut copies)
    }

    fn duplicate_rec(
        &mut self,
        id: NodeId,
        replace: &HashMap<NodeId, NodeId>,
        copies: &mut HashMap<NodeId, NodeId>,
    ) -> Result<NodeId, CoreError> {
        if let Some(target) = replace.get(&id) {
            return Ok(*target);
        }
        if let Some(copy) = copies.get(&id) {
            return Ok(*copy);
        }
        let source = self.get(id)?.clone();
        let mut copy = Node::new(source.type_name.clone(), source.constraint_level, self.turn_num());
        copy.output_type = source.output_type.clone();
        copy.data = source.data.clone();
        copy.tags = source.tags.clone();
        let copy_id = self.register(copy);
        copies.insert(id, copy_id);
        for (role, input) in &source.inputs {
            let child = self.duplicate_rec(input.node(), replace, copies)?;
            self.add_input(copy_id, role, child, input.view())?;
        }
        Ok(copy_id)
    }

    // -----------------------------------------------------------------------
    // Goals
    // -----------------------------------------------------------------------

    pub fn goals(&self) -> &[NodeId] {
        &self.state.goals
    }

    /// Append a goal. A goal already on the list moves to the end; for
    /// configured unique types, earlier goals of the same type are dropped.
    pub fn add_goal(&mut self, id: NodeId) -> Result<(), CoreError> {
        let type_name = self.get(id)?.type_name.clone();
        if self.config.unique_goal_types.contains(&type_name) {
            let nodes = &self.state.nodes;
            self.state
                .goals
                .retain(|g| nodes.get(g).map(|n| n.type_name != type_name).unwrap_or(false));
        }
        self.state.goals.retain(|g| *g != id);
        self.state.goals.push(id);
        Ok(())
    }

    pub fn remove_goal(&mut self, id: NodeId) {
        self.state.goals.retain(|g| *g != id);
    }

    pub fn prev_reachable(&self) -> &BTreeSet<NodeId> {
        &self.state.prev_reachable
    }

    pub fn set_prev_reachable(&mut self, nodes: BTreeSet<NodeId>) {
        self.state.prev_reachable = nodes;
    }

    // -----------------------------------------------------------------------
    // Exceptions and messages
    // -----------------------------------------------------------------------

    /// Record a domain exception according to the retention policy.
    pub fn record_exception(&mut self, error: DomainError) -> ExceptionId {
        let id = ExceptionId(self.state.next_exception_id);
        self.state.next_exception_id += 1;
        if self.config.exception_retention == ExceptionRetention::KeepLast {
            self.state.exceptions.clear();
        }
        self.state.exceptions.push(ExceptionRecord {
            id,
            turn: self.state.turn_num,
            error,
        });
        id
    }

    pub fn exceptions(&self) -> &[ExceptionRecord] {
        &self.state.exceptions
    }

    pub fn exception(&self, id: ExceptionId) -> Option<&ExceptionRecord> {
        self.state.exceptions.iter().find(|e| e.id == id)
    }

    pub fn clear_exceptions(&mut self) {
        self.state.exceptions.clear();
    }

    pub fn add_message(&mut self, node: Option<NodeId>, text: impl Into<String>) {
        self.state.messages.push(Message {
            turn: self.state.turn_num,
            node,
            text: text.into(),
        });
    }

    pub fn messages(&self) -> &[Message] {
        &self.state.messages
    }

    // -----------------------------------------------------------------------
    // Bindings
    // -----------------------------------------------------------------------

    pub fn bind(&mut self, name: &str, id: NodeId) {
        self.state.assign.insert(name.to_string(), id);
    }

    /// Bind `name` to `id`'s result once `id` has evaluated.
    pub fn bind_result(&mut self, name: &str, id: NodeId) {
        self.state
            .pending_result_bindings
            .push((name.to_string(), id));
    }

    /// Settle `{name~}` bindings waiting on `id`.
    pub fn resolve_result_bindings(&mut self, id: NodeId) {
        let (ready, waiting): (Vec<_>, Vec<_>) = std::mem::take(&mut self.state.pending_result_bindings)
            .into_iter()
            .partition(|(_, n)| *n == id);
        self.state.pending_result_bindings = waiting;
        let target = self.effective(id);
        for (name, _) in ready {
            self.bind(&name, target);
        }
    }

    pub fn lookup(&self, name: &str) -> Option<NodeId> {
        self.state.assign.get(name).copied()
    }

    pub fn unbind(&mut self, name: &str) -> Option<NodeId> {
        self.state.assign.shift_remove(name)
    }

    pub fn bindings(&self) -> &IndexMap<String, NodeId> {
        &self.state.assign
    }

    /// The name bound to `id`, if any.
    pub fn name_of(&self, id: NodeId) -> Option<&str> {
        self.state
            .assign
            .iter()
            .find(|(_, bound)| **bound == id)
            .map(|(name, _)| name.as_str())
    }

    // -----------------------------------------------------------------------
    // Transactions and restore points
    // -----------------------------------------------------------------------

    /// Remember the allocation state before building a graph. The mark must
    /// end in [`commit`](Self::commit) or [`rollback`](Self::rollback).
    pub fn mark(&mut self) -> ConstructionMark {
        self.tag_journal = Some(Vec::new());
        ConstructionMark {
            next_id: self.state.next_id,
            assign: self.state.assign.clone(),
            pending: self.state.pending_result_bindings.len(),
        }
    }

    /// Keep everything done since `mark`.
    pub fn commit(&mut self, _mark: ConstructionMark) {
        self.tag_journal = None;
    }

    /// Undo a failed construction: drop every node created since `mark`,
    /// along with back-references and tags it added to older nodes.
    pub fn rollback(&mut self, mark: ConstructionMark) {
        let first_new = NodeId(mark.next_id);
        let journal = self.tag_journal.take().unwrap_or_default();
        for (id, tag, previous) in journal.into_iter().rev() {
            if id >= first_new {
                continue;
            }
            if let Some(node) = self.state.nodes.get_mut(&id) {
                match previous {
                    Some(value) => node.tags.insert(tag, value),
                    None => node.tags.remove(&tag),
                };
            }
        }
        let removed = self.state.nodes.split_off(&first_new);
        for node in self.state.nodes.values_mut() {
            node.outputs.retain(|(_, parent)| *parent < first_new);
            node.inputs.retain(|_, input| input.node() < first_new);
            if node.result.is_some_and(|r| r >= first_new) {
                node.result = None;
            }
        }
        self.state.goals.retain(|g| *g < first_new);
        self.state.assign = mark.assign;
        self.state.pending_result_bindings.truncate(mark.pending);
        self.state.next_id = mark.next_id;
        tracing::debug!(removed = removed.len(), "rolled back construction");
    }

    /// Save the session state under `name`, replacing an older point.
    pub fn make_restore_point(&mut self, name: &str) {
        self.restore_points
            .insert(name.to_string(), self.state.clone());
    }

    /// Return to a saved restore point. The point stays available.
    pub fn restore(&mut self, name: &str) -> Result<(), CoreError> {
        let saved = self
            .restore_points
            .get(name)
            .cloned()
            .ok_or_else(|| CoreError::UnknownRestorePoint {
                name: name.to_string(),
            })?;
        self.state = saved;
        Ok(())
    }

    pub fn restore_points(&self) -> impl Iterator<Item = &str> {
        self.restore_points.keys().map(String::as_str)
    }

    /// Verify that inputs and back-references mirror each other.
    ///
    /// # Panics
    /// Panics with a description of the first mismatch.
    pub fn assert_consistency(&self) {
        for node in self.state.nodes.values() {
            for (role, input) in &node.inputs {
                let child = self
                    .node(input.node())
                    .unwrap_or_else(|| panic!("node {} input '{role}' points at missing {}", node.id, input.node()));
                let mirrored = child
                    .outputs
                    .iter()
                    .filter(|(r, p)| r == role && *p == node.id)
                    .count();
                assert_eq!(mirrored, 1, "edge {} -{role}-> {} not mirrored once", node.id, child.id);
            }
            for (role, parent) in &node.outputs {
                let p = self
                    .node(*parent)
                    .unwrap_or_else(|| panic!("node {} back-ref to missing parent {parent}", node.id));
                assert_eq!(
                    p.inputs.get(role).map(|i| i.node()),
                    Some(node.id),
                    "back-ref ({role}, {parent}) on {} has no matching input",
                    node.id
                );
            }
        }
    }
}

fn dedup_keep_last(ids: &mut Vec<NodeId>) {
    let mut seen = BTreeSet::new();
    let mut kept: Vec<NodeId> = ids.iter().rev().filter(|id| seen.insert(**id)).copied().collect();
    kept.reverse();
    *ids = kept;
}
