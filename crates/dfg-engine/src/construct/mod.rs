//! Graph construction: expression text to typed nodes in a context.
//!
//! Construction parses the text, expands sugar, builds nodes top-down, then
//! runs every node's input check bottom-up. Any failure rolls the context
//! back to where it was before the call.

use std::collections::HashSet;
use std::sync::Arc;

use dfg_core::ast::{AstNode, Reference};
use dfg_core::desugar::desugar;
use dfg_core::parser::parse_expression;
use dfg_core::{DialogContext, NodeId, ParamDef, TypeRegistry, ViewMode};
use serde::{Deserialize, Serialize};

use crate::error::ConstructError;

pub mod args;
mod literal;

/// Tag key under which [`ConstructOptions::pass_tag`] is recorded.
pub const PASS_TAG: &str = "pass";

/// Options for one construction pass.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConstructOptions {
    /// Recorded on every node this pass creates, under [`PASS_TAG`].
    pub pass_tag: Option<String>,
    /// Skip the bottom-up input checks.
    pub skip_checks: bool,
}

impl ConstructOptions {
    pub fn tagged(tag: impl Into<String>) -> Self {
        ConstructOptions {
            pass_tag: Some(tag.into()),
            ..Self::default()
        }
    }
}

/// Where a child is being attached.
#[derive(Debug, Clone)]
pub(crate) struct Slot {
    pub parent: NodeId,
    pub role: String,
    pub param: Option<ParamDef>,
}

/// Parse `text` and build it into `ctx`, returning the root node.
pub fn construct_graph(
    ctx: &mut DialogContext,
    text: &str,
    options: &ConstructOptions,
) -> Result<NodeId, ConstructError> {
    let ast = parse_expression(text)?;
    construct_from_ast(ctx, ast, options)
}

/// Build an already parsed expression into `ctx`.
///
/// A bare `$#N` or `$name` expression returns the existing node without
/// creating anything.
pub fn construct_from_ast(
    ctx: &mut DialogContext,
    ast: AstNode,
    options: &ConstructOptions,
) -> Result<NodeId, ConstructError> {
    let ast = desugar(ast)?;
    if let Some(reference) = &ast.reference {
        if ast.binding.is_none() && ast.tags.is_empty() {
            return resolve_reference(ctx, reference);
        }
    }
    if ast.is_terminal {
        return Err(ConstructError::semantic(format!(
            "an expression must start with a node type, not the literal '{}'",
            ast.name
        )));
    }

    let mark = ctx.mark();
    let before = ctx.node_count();
    match build_and_check(ctx, &ast, options) {
        Ok(root) => {
            ctx.commit(mark);
            tracing::debug!(
                %root,
                created = ctx.node_count() - before,
                "graph constructed"
            );
            Ok(root)
        }
        Err(err) => {
            ctx.rollback(mark);
            tracing::debug!(%err, "construction failed, context rolled back");
            Err(err)
        }
    }
}

fn build_and_check(
    ctx: &mut DialogContext,
    ast: &AstNode,
    options: &ConstructOptions,
) -> Result<NodeId, ConstructError> {
    let registry = ctx.registry().clone();
    let root = Builder {
        ctx: &mut *ctx,
        registry,
        options,
    }
    .build(ast, None)?
    .ok_or_else(|| ConstructError::semantic("expression produced no node"))?;
    if !options.skip_checks {
        check_constr_graph(ctx, root)?;
    }
    Ok(root)
}

/// Run every node's input check, children before parents.
pub fn check_constr_graph(ctx: &DialogContext, root: NodeId) -> Result<(), ConstructError> {
    let mut visited = HashSet::new();
    check_rec(ctx, root, &mut visited)
}

fn check_rec(
    ctx: &DialogContext,
    id: NodeId,
    visited: &mut HashSet<NodeId>,
) -> Result<(), ConstructError> {
    if !visited.insert(id) {
        return Ok(());
    }
    let node = ctx.get(id)?;
    for child in node.children() {
        check_rec(ctx, child, visited)?;
    }
    let behavior = ctx.registry().behavior(&node.type_name)?;
    behavior.valid_input(ctx, id)?;
    Ok(())
}

fn resolve_reference(ctx: &DialogContext, reference: &Reference) -> Result<NodeId, ConstructError> {
    match reference {
        Reference::Name(name) => ctx
            .lookup(name)
            .ok_or_else(|| ConstructError::semantic(format!("unknown reference '${name}'"))),
        Reference::Id(n) => {
            let id = NodeId(*n);
            if ctx.contains(id) {
                Ok(id)
            } else {
                Err(ConstructError::semantic(format!("no node #{n}")))
            }
        }
    }
}

struct Builder<'a> {
    ctx: &'a mut DialogContext,
    registry: Arc<TypeRegistry>,
    options: &'a ConstructOptions,
}

impl Builder<'_> {
    fn build(&mut self, ast: &AstNode, slot: Option<&Slot>) -> Result<Option<NodeId>, ConstructError> {
        let (id, created) = if let Some(reference) = &ast.reference {
            (resolve_reference(self.ctx, reference)?, false)
        } else if ast.is_terminal {
            let Some(slot) = slot else {
                return Err(ConstructError::semantic("a literal needs an enclosing node"));
            };
            match literal::resolve_terminal(self.ctx, &self.registry, ast, slot)? {
                Some(id) => (id, true),
                None => return Ok(None),
            }
        } else {
            (self.build_call(ast)?, true)
        };

        if let Some(slot) = slot {
            let view = ast
                .view
                .or(slot.param.as_ref().map(|p| p.view))
                .unwrap_or_default();
            self.ctx.add_input(slot.parent, &slot.role, id, view)?;
        }
        self.annotate(id, ast, created)?;
        Ok(Some(id))
    }

    fn build_call(&mut self, ast: &AstNode) -> Result<NodeId, ConstructError> {
        if ast.name.is_empty() {
            return Err(ConstructError::semantic(
                "a parenthesized group is only allowed as a let binding list",
            ));
        }
        let spec = TypeRegistry::resolve_constraint_syntax(&ast.name)?;
        let behavior = self.registry.behavior(&spec.base)?;
        let bound = args::bind_arguments(behavior.signature(), &ast.args)?;
        let registry = self.registry.clone();
        let id = registry.create(self.ctx, &ast.name, &[])?;
        for arg in bound {
            let slot = Slot {
                parent: id,
                role: arg.role,
                param: arg.param,
            };
            self.build(arg.ast, Some(&slot))?;
        }
        Ok(id)
    }

    fn annotate(&mut self, id: NodeId, ast: &AstNode, created: bool) -> Result<(), ConstructError> {
        for (tag, value) in &ast.tags {
            self.ctx.add_tag(id, tag, value)?;
        }
        if created {
            if let Some(pass) = &self.options.pass_tag {
                self.ctx.add_tag(id, PASS_TAG, pass)?;
            }
        }
        if let Some(binding) = &ast.binding {
            if binding.to_result {
                self.ctx.bind_result(&binding.name, id);
            } else {
                self.ctx.bind(&binding.name, id);
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dfg_core::Value;

    fn ctx() -> DialogContext {
        DialogContext::new(Arc::new(TypeRegistry::new()))
    }

    #[test]
    fn builds_operator_over_literals() {
        let mut ctx = ctx();
        let root = construct_graph(&mut ctx, "AND(true, no)", &ConstructOptions::default()).unwrap();
        let node = ctx.node(root).unwrap();
        assert_eq!(node.type_name, "AND");
        let first = node.input("pos1").unwrap();
        assert_eq!(ctx.node(first).unwrap().data, Some(Value::Bool(true)));
        ctx.assert_consistency();
    }

    #[test]
    fn base_type_literal_goes_into_parent() {
        let mut ctx = ctx();
        let root = construct_graph(&mut ctx, "Int(10)", &ConstructOptions::default()).unwrap();
        assert_eq!(ctx.node(root).unwrap().data, Some(Value::Int(10)));
        assert_eq!(ctx.node_count(), 1);

        let err = construct_graph(&mut ctx, "Int(ten)", &ConstructOptions::default()).unwrap_err();
        assert!(err.is_semantic());
    }

    #[test]
    fn literal_root_is_rejected() {
        let mut ctx = ctx();
        let err = construct_graph(&mut ctx, "42", &ConstructOptions::default()).unwrap_err();
        assert!(err.is_semantic());
    }

    #[test]
    fn id_reference_root_reuses_node() {
        let mut ctx = ctx();
        let root = construct_graph(&mut ctx, "OR(yes)", &ConstructOptions::default()).unwrap();
        let count = ctx.node_count();
        let again = construct_graph(&mut ctx, &format!("$#{root}"), &ConstructOptions::default()).unwrap();
        assert_eq!(again, root);
        assert_eq!(ctx.node_count(), count);
    }

    #[test]
    fn pass_tag_marks_created_nodes() {
        let mut ctx = ctx();
        let root = construct_graph(&mut ctx, "NOT(yes)", &ConstructOptions::tagged("t1")).unwrap();
        assert_eq!(ctx.node(root).unwrap().tags.get(PASS_TAG).map(String::as_str), Some("t1"));
    }

    #[test]
    fn failures_roll_back() {
        let mut ctx = ctx();
        construct_graph(&mut ctx, "{keep}AND(1)", &ConstructOptions::default()).unwrap();
        let count = ctx.node_count();
        let err = construct_graph(&mut ctx, "{x}AND(1, Flight(2))", &ConstructOptions::default()).unwrap_err();
        assert_eq!(err, ConstructError::UnknownNodeType { name: "Flight".into() });
        assert_eq!(ctx.node_count(), count);
        assert_eq!(ctx.lookup("x"), None);
        assert!(ctx.lookup("keep").is_some());
        ctx.assert_consistency();
    }
}
