//! Graph simplification.
//!
//! The simplifier is type-agnostic: each node type supplies its rewrites
//! through [`NodeBehavior::pre_simplify`] and [`NodeBehavior::simplify`].
//! A rewrite returns the node that should take the current node's place;
//! the simplifier rewires every user of the old node onto the new one and
//! deletes whatever became unreachable.
//!
//! [`simplify_graph`] runs, in order:
//! 1. the pre pass, bottom-up, each node to a fixed point;
//! 2. the main pass, top-down, each node to a fixed point before its
//!    (possibly new) children are visited;
//! 3. dead-assignment elimination on `let` sequences;
//! 4. flattening of single-input `AND`/`OR`.
//!
//! A `DummyRoot` sits above the root for the duration so that rewrites of
//! the root itself have a parent to reattach to.
//!
//! [`NodeBehavior::pre_simplify`]: dfg_core::NodeBehavior::pre_simplify
//! [`NodeBehavior::simplify`]: dfg_core::NodeBehavior::simplify

use std::collections::HashSet;

use dfg_core::builtins::DUMMY_ROOT;
use dfg_core::{CoreError, DialogContext, NodeId, SimplifyMode, ViewMode};
use serde::{Deserialize, Serialize};

use crate::error::SimplifyError;

pub mod operators;
pub mod sequence;

pub use operators::clean_operators;
pub use sequence::simplify_unused_assign;

const DUMMY_ROLE: &str = "root";

/// Switches for [`simplify_graph`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimplifyOptions {
    pub mode: SimplifyMode,
    /// Rewrites allowed on one node before giving up on a fixed point.
    pub max_rewrites: usize,
    /// Run dead-assignment elimination.
    pub unused_assign: bool,
    /// Flatten single-input junctions.
    pub clean_operators: bool,
}

impl Default for SimplifyOptions {
    fn default() -> Self {
        SimplifyOptions {
            mode: SimplifyMode::Conservative,
            max_rewrites: 64,
            unused_assign: true,
            clean_operators: true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Pass {
    Pre,
    Main,
}

/// Simplify the graph under `root` in place and return the new root.
///
/// On error the graph may be partially rewritten; the temporary root is
/// removed either way.
pub fn simplify_graph(
    ctx: &mut DialogContext,
    root: NodeId,
    options: &SimplifyOptions,
) -> Result<NodeId, SimplifyError> {
    ctx.get(root)?;
    let before = ctx.node_count();
    let dummy = ctx.create(DUMMY_ROOT)?;
    ctx.add_input(dummy, DUMMY_ROLE, root, ViewMode::Intension)?;

    let outcome = Simplifier { ctx: &mut *ctx, options, top: dummy }.run();

    let new_root = ctx.get(dummy)?.input(DUMMY_ROLE);
    ctx.remove_node(dummy)?;
    outcome?;

    let new_root = new_root.ok_or_else(|| CoreError::MissingInput {
        node: dummy,
        role: DUMMY_ROLE.to_string(),
    })?;
    tracing::debug!(
        %root,
        %new_root,
        removed = before.saturating_sub(ctx.node_count()),
        "graph simplified"
    );
    Ok(new_root)
}

struct Simplifier<'a> {
    ctx: &'a mut DialogContext,
    options: &'a SimplifyOptions,
    top: NodeId,
}

impl Simplifier<'_> {
    fn run(&mut self) -> Result<(), SimplifyError> {
        self.pre_pass(self.top, &mut HashSet::new())?;
        self.main_pass(self.top, &mut HashSet::new())?;
        if self.options.unused_assign {
            simplify_unused_assign(self.ctx, self.top)?;
        }
        if self.options.clean_operators {
            clean_operators(self.ctx, self.top)?;
        }
        Ok(())
    }

    fn pre_pass(&mut self, id: NodeId, visited: &mut HashSet<NodeId>) -> Result<NodeId, SimplifyError> {
        if !self.ctx.contains(id) || !visited.insert(id) {
            return Ok(id);
        }
        let children: Vec<NodeId> = self.ctx.get(id)?.children().collect();
        for child in children {
            self.pre_pass(child, visited)?;
        }
        let id = self.to_fixed_point(id, Pass::Pre)?;
        visited.insert(id);
        Ok(id)
    }

    fn main_pass(&mut self, id: NodeId, visited: &mut HashSet<NodeId>) -> Result<(), SimplifyError> {
        if !self.ctx.contains(id) || !visited.insert(id) {
            return Ok(());
        }
        let replaced = self.to_fixed_point(id, Pass::Main)?;
        if replaced != id && !visited.insert(replaced) {
            return Ok(());
        }
        let children: Vec<NodeId> = self.ctx.get(replaced)?.children().collect();
        for child in children {
            self.main_pass(child, visited)?;
        }
        Ok(())
    }

    /// Apply one hook until the node it returns is the node it was given.
    fn to_fixed_point(&mut self, mut id: NodeId, pass: Pass) -> Result<NodeId, SimplifyError> {
        let mut rewrites = 0;
        loop {
            let behavior = self.ctx.behavior_of(id)?;
            let next = match pass {
                Pass::Pre => behavior.pre_simplify(self.ctx, id, self.top, self.options.mode),
                Pass::Main => behavior.simplify(self.ctx, id, self.top, self.options.mode),
            }
            .map_err(|err| SimplifyError::from_hook(id, err))?;
            if next == id {
                return Ok(id);
            }
            rewrites += 1;
            if rewrites > self.options.max_rewrites {
                return Err(SimplifyError::NoFixedPoint { node: id, rewrites });
            }
            self.ctx.get(next)?;
            tracing::debug!(?pass, old = %id, new = %next, "rewrite");
            self.ctx.replace_node(id, next)?;
            self.ctx.delete_unreferenced(id);
            id = next;
        }
    }
}
