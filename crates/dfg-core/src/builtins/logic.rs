//! Logical operators and comparison qualifiers.
//!
//! Inside constraints these combine sub-constraints (see
//! [`match_constraint`](crate::matching::match_constraint)). Over plain
//! boolean inputs they also compute a `Bool` result.

use std::sync::Arc;

use crate::behavior::{NodeBehavior, NodeError, SimplifyMode};
use crate::context::DialogContext;
use crate::id::NodeId;
use crate::signature::{ParamDef, Signature};
use crate::value::Value;

pub fn types() -> Vec<Arc<dyn NodeBehavior>> {
    let mut types: Vec<Arc<dyn NodeBehavior>> = vec![
        Arc::new(Junction::new(JunctionKind::And)),
        Arc::new(Junction::new(JunctionKind::Or)),
        Arc::new(Not::new()),
    ];
    for q in Qualifier::ALL {
        types.push(Arc::new(QualifierType::new(q)));
    }
    types
}

/// Boolean values of all view-resolved inputs, or `None` if any input is
/// not a boolean.
fn boolean_inputs(ctx: &DialogContext, node: NodeId) -> Option<Vec<bool>> {
    ctx.resolved_inputs(node)
        .into_iter()
        .map(|(_, child)| ctx.node(child)?.data.as_ref()?.as_bool())
        .collect()
}

fn set_bool_result(ctx: &mut DialogContext, node: NodeId, value: bool) -> Result<(), NodeError> {
    let result = ctx.create_value(Value::Bool(value))?;
    ctx.set_result(node, result)?;
    Ok(())
}

// ---------------------------------------------------------------------------
// AND / OR
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JunctionKind {
    And,
    Or,
}

/// `AND(...)` / `OR(...)`, written `a & b` / `a | b`.
#[derive(Debug)]
pub struct Junction {
    sig: Signature,
    kind: JunctionKind,
}

impl Junction {
    pub fn new(kind: JunctionKind) -> Self {
        let name = match kind {
            JunctionKind::And => "AND",
            JunctionKind::Or => "OR",
        };
        Junction {
            sig: Signature::new(name).operator().output("Bool"),
            kind,
        }
    }
}

impl NodeBehavior for Junction {
    fn signature(&self) -> &Signature {
        &self.sig
    }

    fn evaluate(&self, ctx: &mut DialogContext, node: NodeId) -> Result<(), NodeError> {
        let Some(values) = boolean_inputs(ctx, node) else {
            return Ok(());
        };
        if values.is_empty() {
            return Ok(());
        }
        let value = match self.kind {
            JunctionKind::And => values.iter().all(|v| *v),
            JunctionKind::Or => values.iter().any(|v| *v),
        };
        set_bool_result(ctx, node, value)
    }

    /// A junction over a single input is that input.
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
// NOT
// ---------------------------------------------------------------------------

#[derive(Debug)]
pub struct Not {
    sig: Signature,
}

impl Not {
    pub fn new() -> Self {
        Not {
            sig: Signature::new("NOT")
                .param(ParamDef::new("arg").positional().required())
                .output("Bool"),
        }
    }
}

impl Default for Not {
    fn default() -> Self {
        Self::new()
    }
}

impl NodeBehavior for Not {
    fn signature(&self) -> &Signature {
        &self.sig
    }

    fn evaluate(&self, ctx: &mut DialogContext, node: NodeId) -> Result<(), NodeError> {
        match boolean_inputs(ctx, node).as_deref() {
            Some([value]) => set_bool_result(ctx, node, !value),
            _ => Ok(()),
        }
    }

    /// `NOT(NOT(x))` -> `x`, aggressive mode only.
    fn simplify(
        &self,
        ctx: &mut DialogContext,
        node: NodeId,
        _top: NodeId,
        mode: SimplifyMode,
    ) -> Result<NodeId, NodeError> {
        if mode != SimplifyMode::Aggressive {
            return Ok(node);
        }
        let Some(inner) = ctx.get(node)?.input("arg") else {
            return Ok(node);
        };
        let inner_node = ctx.get(inner)?;
        if inner_node.type_name == "NOT" {
            if let Some(x) = inner_node.input("arg") {
                return Ok(x);
            }
        }
        Ok(node)
    }
}

// ---------------------------------------------------------------------------
// Qualifiers
// ---------------------------------------------------------------------------

/// Comparison applied to a candidate value when matching a constraint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Qualifier {
    Lt,
    Gt,
    Le,
    Ge,
    Eq,
    Neq,
    Like,
}

impl Qualifier {
    pub const ALL: [Qualifier; 7] = [
        Qualifier::Lt,
        Qualifier::Gt,
        Qualifier::Le,
        Qualifier::Ge,
        Qualifier::Eq,
        Qualifier::Neq,
        Qualifier::Like,
    ];

    pub fn type_name(self) -> &'static str {
        match self {
            Qualifier::Lt => "LT",
            Qualifier::Gt => "GT",
            Qualifier::Le => "LE",
            Qualifier::Ge => "GE",
            Qualifier::Eq => "EQ",
            Qualifier::Neq => "NEQ",
            Qualifier::Like => "LIKE",
        }
    }

    pub fn from_type_name(name: &str) -> Option<Qualifier> {
        Qualifier::ALL.into_iter().find(|q| q.type_name() == name)
    }

    /// Does `actual` satisfy this qualifier against `expected`?
    ///
    /// `LIKE` is a case-insensitive substring test on strings and equality
    /// otherwise. Values of incomparable kinds never satisfy an ordering.
    pub fn holds(self, actual: &Value, expected: &Value) -> bool {
        use std::cmp::Ordering::*;
        let ord = actual.compare(expected);
        match self {
            Qualifier::Lt => ord == Some(Less),
            Qualifier::Gt => ord == Some(Greater),
            Qualifier::Le => matches!(ord, Some(Less | Equal)),
            Qualifier::Ge => matches!(ord, Some(Greater | Equal)),
            Qualifier::Eq => ord == Some(Equal),
            Qualifier::Neq => ord != Some(Equal),
            Qualifier::Like => match (actual, expected) {
                (Value::Str(a), Value::Str(e)) => a.to_lowercase().contains(&e.to_lowercase()),
                _ => ord == Some(Equal),
            },
        }
    }
}

#[derive(Debug)]
pub struct QualifierType {
    sig: Signature,
}

impl QualifierType {
    pub fn new(q: Qualifier) -> Self {
        QualifierType {
            sig: Signature::new(q.type_name())
                .param(ParamDef::new("value").positional().required())
                .qualifier(),
        }
    }
}

impl NodeBehavior for QualifierType {
    fn signature(&self) -> &Signature {
        &self.sig
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::TypeRegistry;
    use crate::signature::ViewMode;

    fn ctx() -> DialogContext {
        DialogContext::new(Arc::new(TypeRegistry::new()))
    }

    fn junction(ctx: &mut DialogContext, name: &str, values: &[bool]) -> NodeId {
        let j = ctx.create(name).unwrap();
        for (i, v) in values.iter().enumerate() {
            let b = ctx.create_value(Value::Bool(*v)).unwrap();
            ctx.add_input(j, &format!("pos{}", i + 1), b, ViewMode::Extension).unwrap();
        }
        j
    }

    #[test]
    fn and_or_compute_booleans() {
        let mut ctx = ctx();
        let and = junction(&mut ctx, "AND", &[true, false]);
        Junction::new(JunctionKind::And).evaluate(&mut ctx, and).unwrap();
        let r = ctx.effective(and);
        assert_eq!(ctx.node(r).unwrap().data, Some(Value::Bool(false)));

        let or = junction(&mut ctx, "OR", &[true, false]);
        Junction::new(JunctionKind::Or).evaluate(&mut ctx, or).unwrap();
        let r = ctx.effective(or);
        assert_eq!(ctx.node(r).unwrap().data, Some(Value::Bool(true)));
    }

    #[test]
    fn and_over_non_booleans_has_no_result() {
        let mut ctx = ctx();
        let and = ctx.create("AND").unwrap();
        let s = ctx.create_value(Value::Str("x".into())).unwrap();
        ctx.add_input(and, "pos1", s, ViewMode::Extension).unwrap();
        Junction::new(JunctionKind::And).evaluate(&mut ctx, and).unwrap();
        assert_eq!(ctx.effective(and), and);
    }

    #[test]
    fn single_input_junction_collapses() {
        let mut ctx = ctx();
        let and = junction(&mut ctx, "AND", &[true]);
        let only = ctx.node(and).unwrap().input("pos1").unwrap();
        let out = Junction::new(JunctionKind::And)
            .simplify(&mut ctx, and, and, SimplifyMode::Conservative)
            .unwrap();
        assert_eq!(out, only);
    }

    #[test]
    fn double_negation_only_in_aggressive_mode() {
        let mut ctx = ctx();
        let outer = ctx.create("NOT").unwrap();
        let inner = ctx.create("NOT").unwrap();
        let x = ctx.create_value(Value::Bool(true)).unwrap();
        ctx.add_input(outer, "arg", inner, ViewMode::Extension).unwrap();
        ctx.add_input(inner, "arg", x, ViewMode::Extension).unwrap();
        let not = Not::new();
        assert_eq!(not.simplify(&mut ctx, outer, outer, SimplifyMode::Conservative).unwrap(), outer);
        assert_eq!(not.simplify(&mut ctx, outer, outer, SimplifyMode::Aggressive).unwrap(), x);
    }

    #[test]
    fn qualifiers_compare() {
        assert!(Qualifier::Lt.holds(&Value::Int(3), &Value::Int(5)));
        assert!(!Qualifier::Gt.holds(&Value::Int(3), &Value::Float(5.0)));
        assert!(Qualifier::Ge.holds(&Value::Int(5), &Value::Float(5.0)));
        assert!(Qualifier::Like.holds(&Value::Str("Team Sync".into()), &Value::Str("sync".into())));
        assert!(Qualifier::Neq.holds(&Value::Str("a".into()), &Value::Int(1)));
        assert!(!Qualifier::Lt.holds(&Value::Str("a".into()), &Value::Int(1)));
    }
}
