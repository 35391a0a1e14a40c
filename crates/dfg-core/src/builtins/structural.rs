//! Structural builtins: property access, grouping, local bindings and
//! sequencing.

use std::sync::Arc;

use crate::behavior::{NodeBehavior, NodeError, SimplifyMode};
use crate::context::DialogContext;
use crate::exception::DomainError;
use crate::id::NodeId;
use crate::node::InputRef;
use crate::signature::{ParamDef, Signature};

use super::{DUMMY_ROOT, GETATTR, LET, SEQUENCE, UNIVERSAL};

pub fn types() -> Vec<Arc<dyn NodeBehavior>> {
    vec![
        Arc::new(GetAttr::new()),
        Arc::new(Aggregate::new("SET")),
        Arc::new(Aggregate::new("List")),
        Arc::new(LetBinding::new()),
        Arc::new(Sequence::new()),
        Arc::new(DummyRoot::new()),
    ]
}

// ---------------------------------------------------------------------------
// getattr
// ---------------------------------------------------------------------------

/// `getattr(name, obj)`: the input of `obj` stored under role `name`.
/// Written `:name(obj)` in expressions.
#[derive(Debug)]
pub struct GetAttr {
    sig: Signature,
}

impl GetAttr {
    pub fn new() -> Self {
        GetAttr {
            sig: Signature::new(GETATTR)
                .param(ParamDef::new("name").types(["Str"]).positional().required())
                .param(ParamDef::new("obj").positional().required())
                .output(UNIVERSAL),
        }
    }
}

impl Default for GetAttr {
    fn default() -> Self {
        Self::new()
    }
}

fn property_name(ctx: &DialogContext, node: NodeId) -> Option<String> {
    ctx.input_data(node, "name")
        .and_then(|v| v.as_str())
        .map(str::to_owned)
}

impl NodeBehavior for GetAttr {
    fn signature(&self) -> &Signature {
        &self.sig
    }

    fn eval_res(&self) -> bool {
        true
    }

    fn evaluate(&self, ctx: &mut DialogContext, node: NodeId) -> Result<(), NodeError> {
        let name = property_name(ctx, node)
            .ok_or_else(|| DomainError::new("getattr needs a property name").at(node))?;
        let obj = ctx
            .input(node, "obj")
            .ok_or_else(|| DomainError::new("getattr needs an object").at(node))?;
        let target = ctx.get(obj)?.inputs.get(&name).copied();
        match target {
            Some(input) => {
                let value = ctx.resolve(input);
                ctx.set_result(node, value)?;
                Ok(())
            }
            None => {
                let obj_type = ctx.get(obj)?.type_name.clone();
                Err(DomainError::new(format!("{obj_type} has no '{name}'"))
                    .at(node)
                    .hint(format!("add {name} to the {obj_type}"))
                    .into())
            }
        }
    }

    /// Fold `:p(T(p=x))` to `x` while the object has no separate result.
    fn pre_simplify(
        &self,
        ctx: &mut DialogContext,
        node: NodeId,
        _top: NodeId,
        _mode: SimplifyMode,
    ) -> Result<NodeId, NodeError> {
        let Some(name) = property_name(ctx, node) else {
            return Ok(node);
        };
        let Some(obj_ref) = ctx.get(node)?.inputs.get("obj").copied() else {
            return Ok(node);
        };
        let obj = ctx.get(obj_ref.node())?;
        if matches!(obj_ref, InputRef::ViaResult(_)) && obj.result.is_some() {
            return Ok(node);
        }
        Ok(obj.input(&name).unwrap_or(node))
    }
}

// ---------------------------------------------------------------------------
// SET / List
// ---------------------------------------------------------------------------

/// Aggregators: collect any number of positional inputs.
#[derive(Debug)]
pub struct Aggregate {
    sig: Signature,
}

impl Aggregate {
    pub fn new(name: &str) -> Self {
        Aggregate {
            sig: Signature::new(name).aggregator().operator(),
        }
    }
}

impl NodeBehavior for Aggregate {
    fn signature(&self) -> &Signature {
        &self.sig
    }
}

// ---------------------------------------------------------------------------
// Let / do
// ---------------------------------------------------------------------------

/// `Let(name, value)`: one local binding inside a `do` sequence.
#[derive(Debug)]
pub struct LetBinding {
    sig: Signature,
}

impl LetBinding {
    pub fn new() -> Self {
        LetBinding {
            sig: Signature::new(LET)
                .param(ParamDef::new("name").types(["Str"]).positional().required())
                .param(ParamDef::new("value").positional().required()),
        }
    }
}

impl Default for LetBinding {
    fn default() -> Self {
        Self::new()
    }
}

impl NodeBehavior for LetBinding {
    fn signature(&self) -> &Signature {
        &self.sig
    }
}

/// `do(a, b, ..., body)`: evaluates inputs in order, result is the last one.
#[derive(Debug)]
pub struct Sequence {
    sig: Signature,
}

impl Sequence {
    pub fn new() -> Self {
        Sequence {
            sig: Signature::new(SEQUENCE).operator().output(UNIVERSAL),
        }
    }
}

impl Default for Sequence {
    fn default() -> Self {
        Self::new()
    }
}

impl NodeBehavior for Sequence {
    fn signature(&self) -> &Signature {
        &self.sig
    }

    fn stop_eval_on_exception(&self) -> bool {
        true
    }

    fn evaluate(&self, ctx: &mut DialogContext, node: NodeId) -> Result<(), NodeError> {
        if let Some((_, last)) = ctx.resolved_inputs(node).pop() {
            ctx.set_result(node, last)?;
        }
        Ok(())
    }

    fn simplify(
        &self,
        ctx: &mut DialogContext,
        node: NodeId,
        _top: NodeId,
        _mode: SimplifyMode,
    ) -> Result<NodeId, NodeError> {
        let n = ctx.get(node)?;
        if n.inputs.len() == 1 {
            return Ok(n.children().next().unwrap_or(node));
        }
        Ok(node)
    }
}

// ---------------------------------------------------------------------------
// DummyRoot
// ---------------------------------------------------------------------------

/// Temporary parent the simplifier puts above a graph so the real root can
/// be rewritten like any other input.
#[derive(Debug)]
pub struct DummyRoot {
    sig: Signature,
}

impl DummyRoot {
    pub fn new() -> Self {
        DummyRoot {
            sig: Signature::new(DUMMY_ROOT).param(ParamDef::new("root").positional().intension()),
        }
    }
}

impl Default for DummyRoot {
    fn default() -> Self {
        Self::new()
    }
}

impl NodeBehavior for DummyRoot {
    fn signature(&self) -> &Signature {
        &self.sig
    }

    fn deletable(&self) -> bool {
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::TypeRegistry;
    use crate::signature::ViewMode;
    use crate::value::Value;

    fn ctx() -> DialogContext {
        DialogContext::new(Arc::new(TypeRegistry::new()))
    }

    fn getattr(ctx: &mut DialogContext, name: &str, obj: NodeId) -> NodeId {
        let g = ctx.create("getattr").unwrap();
        let n = ctx.create_value(Value::Str(name.into())).unwrap();
        ctx.add_input(g, "name", n, ViewMode::Extension).unwrap();
        ctx.add_input(g, "obj", obj, ViewMode::Extension).unwrap();
        g
    }

    #[test]
    fn getattr_reads_property() {
        let mut ctx = ctx();
        let obj = ctx.create("Let").unwrap();
        let value = ctx.create_value(Value::Int(5)).unwrap();
        ctx.add_input(obj, "value", value, ViewMode::Extension).unwrap();
        let g = getattr(&mut ctx, "value", obj);

        GetAttr::new().evaluate(&mut ctx, g).unwrap();
        assert_eq!(ctx.effective(g), value);
    }

    #[test]
    fn getattr_missing_property_is_domain_error() {
        let mut ctx = ctx();
        let obj = ctx.create("Let").unwrap();
        let g = getattr(&mut ctx, "size", obj);
        match GetAttr::new().evaluate(&mut ctx, g) {
            Err(NodeError::Domain(e)) => {
                assert_eq!(e.message, "Let has no 'size'");
                assert_eq!(e.node, Some(g));
            }
            other => panic!("expected domain error, got {other:?}"),
        }
    }

    #[test]
    fn getattr_folds_when_object_has_no_result() {
        let mut ctx = ctx();
        let obj = ctx.create("Let").unwrap();
        let value = ctx.create_value(Value::Int(5)).unwrap();
        ctx.add_input(obj, "value", value, ViewMode::Extension).unwrap();
        let g = getattr(&mut ctx, "value", obj);
        let folded = GetAttr::new()
            .pre_simplify(&mut ctx, g, g, SimplifyMode::Conservative)
            .unwrap();
        assert_eq!(folded, value);
    }

    #[test]
    fn sequence_result_is_last_input() {
        let mut ctx = ctx();
        let seq = ctx.create("do").unwrap();
        let a = ctx.create_value(Value::Int(1)).unwrap();
        let b = ctx.create_value(Value::Int(2)).unwrap();
        ctx.add_input(seq, "pos1", a, ViewMode::Extension).unwrap();
        ctx.add_input(seq, "pos2", b, ViewMode::Extension).unwrap();
        Sequence::new().evaluate(&mut ctx, seq).unwrap();
        assert_eq!(ctx.effective(seq), b);
    }
}
