//! Placement of literal tokens.
//!
//! A literal lands in one of four places, tried in order:
//! 1. the data of its parent, when the parent is a base type;
//! 2. a new base node, when the receiving parameter accepts only base types;
//! 3. a new leaf node wrapping a base node, when the parameter's single type
//!    is a leaf type;
//! 4. otherwise a base node of the literal's inferred type.

use dfg_core::ast::AstNode;
use dfg_core::{BaseKind, DialogContext, NodeId, TypeRegistry, Value};

use super::Slot;
use crate::error::ConstructError;

/// Returns `None` when the literal was stored on the parent itself.
pub(crate) fn resolve_terminal(
    ctx: &mut DialogContext,
    registry: &TypeRegistry,
    ast: &AstNode,
    slot: &Slot,
) -> Result<Option<NodeId>, ConstructError> {
    let text = ast.name.as_str();
    let parent = ctx.get(slot.parent)?;

    if let Some(kind) = registry.base_kind(&parent.type_name) {
        if parent.data.is_some() {
            return Err(ConstructError::semantic(format!(
                "{} takes a single literal",
                parent.type_name
            )));
        }
        if ast.binding.is_some() || !ast.tags.is_empty() {
            return Err(ConstructError::semantic(format!(
                "literal '{text}' inside {kind}(...) cannot carry a binding or tags"
            )));
        }
        let value = coerce(text, kind).ok_or_else(|| {
            ConstructError::semantic(format!("'{text}' is not a valid {kind}"))
        })?;
        ctx.set_data(slot.parent, value)?;
        return Ok(None);
    }

    let inferred = infer(text, ast.quoted);
    let accepted = slot
        .param
        .as_ref()
        .map(|p| p.types.as_slice())
        .unwrap_or_default();

    if !accepted.is_empty() && accepted.iter().all(|t| registry.is_base(t)) {
        let kinds: Vec<BaseKind> = accepted.iter().filter_map(|t| registry.base_kind(t)).collect();
        let value = select(text, inferred, &kinds)?;
        return Ok(Some(ctx.create_value(value)?));
    }

    if let [only] = accepted {
        if let Some(leaf_param) = registry.leaf_param(only).cloned() {
            let kinds: Vec<BaseKind> = leaf_param
                .types
                .iter()
                .filter_map(|t| registry.base_kind(t))
                .collect();
            let value = select(text, inferred, &kinds)?;
            let leaf = registry.create(ctx, only, &[])?;
            let inner = ctx.create_value(value)?;
            ctx.add_input(leaf, &leaf_param.name, inner, leaf_param.view)?;
            return Ok(Some(leaf));
        }
    }

    Ok(Some(ctx.create_value(inferred)?))
}

fn infer(text: &str, quoted: bool) -> Value {
    if quoted {
        Value::Str(text.to_string())
    } else {
        Value::infer(text)
    }
}

fn coerce(text: &str, kind: BaseKind) -> Option<Value> {
    Value::coerce(text, kind)
}

/// Keep the inferred value when its kind is accepted, else convert to the
/// first accepted kind the text allows.
fn select(text: &str, inferred: Value, kinds: &[BaseKind]) -> Result<Value, ConstructError> {
    if kinds.contains(&inferred.kind()) {
        return Ok(inferred);
    }
    kinds
        .iter()
        .find_map(|k| coerce(text, *k))
        .ok_or_else(|| {
            let expected: Vec<&str> = kinds.iter().map(|k| k.type_name()).collect();
            ConstructError::semantic(format!(
                "'{text}' is not a valid {}",
                expected.join(" or ")
            ))
        })
}
