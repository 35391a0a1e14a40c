//! Constraint matching and structural comparison of graphs.

use std::collections::HashMap;

use crate::builtins::logic::Qualifier;
use crate::builtins::UNIVERSAL;
use crate::context::DialogContext;
use crate::id::NodeId;

const MAX_DEPTH: usize = 64;

/// Does the object `candidate` satisfy the constraint graph rooted at
/// `constraint`?
///
/// A constraint matches when the types agree (the universal type matches
/// anything), any literal agrees, and every input of the constraint matches
/// the candidate's input under the same role. `AND`, `OR` and `NOT` combine
/// sub-constraints; qualifiers compare the candidate's value.
pub fn match_constraint(ctx: &DialogContext, constraint: NodeId, candidate: NodeId) -> bool {
    matches_at(ctx, constraint, candidate, 0)
}

fn matches_at(ctx: &DialogContext, constraint: NodeId, candidate: NodeId, depth: usize) -> bool {
    if depth > MAX_DEPTH {
        return false;
    }
    let (Some(c), Some(k)) = (ctx.node(constraint), ctx.node(candidate)) else {
        return false;
    };
    let registry = ctx.registry();

    match c.type_name.as_str() {
        "AND" => {
            return c
                .children()
                .all(|sub| matches_at(ctx, sub, candidate, depth + 1))
        }
        "OR" => {
            return c
                .children()
                .any(|sub| matches_at(ctx, sub, candidate, depth + 1))
        }
        "NOT" => {
            return c
                .children()
                .next()
                .is_some_and(|sub| !matches_at(ctx, sub, candidate, depth + 1))
        }
        _ => {}
    }

    if let Some(q) = Qualifier::from_type_name(&c.type_name) {
        let expected = ctx.input_data(constraint, "value");
        let actual = ctx.node(ctx.effective(candidate)).and_then(|n| n.data.as_ref());
        return match (actual, expected) {
            (Some(a), Some(e)) => q.holds(a, e),
            _ => false,
        };
    }

    let wanted = registry.canonical_name(&c.type_name);
    let type_ok = wanted == UNIVERSAL
        || wanted == k.type_name
        || k.output_type.as_deref() == Some(wanted)
        || registry
            .signature(&k.type_name)
            .and_then(|s| s.output_type.as_deref())
            == Some(wanted);
    if !type_ok {
        return false;
    }

    if let Some(expected) = &c.data {
        match &k.data {
            Some(actual) if actual.loosely_eq(expected) => {}
            _ => return false,
        }
    }

    c.inputs.iter().all(|(role, input)| {
        ctx.input(candidate, role)
            .is_some_and(|sub_k| matches_at(ctx, input.node(), sub_k, depth + 1))
    })
}

/// Whether two graphs are identical up to node numbering.
///
/// Compares types, constraint levels, output types, literals and the
/// ordered role/view structure of inputs. Tags and evaluation state are
/// ignored. Sharing must correspond: a node shared in one graph must map to
/// a single node in the other.
pub fn structurally_equal(
    left_ctx: &DialogContext,
    left: NodeId,
    right_ctx: &DialogContext,
    right: NodeId,
) -> bool {
    let mut mapping = HashMap::new();
    equal_rec(left_ctx, left, right_ctx, right, &mut mapping)
}

fn equal_rec(
    lc: &DialogContext,
    l: NodeId,
    rc: &DialogContext,
    r: NodeId,
    mapping: &mut HashMap<NodeId, NodeId>,
) -> bool {
    if let Some(seen) = mapping.get(&l) {
        return *seen == r;
    }
    let (Some(ln), Some(rn)) = (lc.node(l), rc.node(r)) else {
        return false;
    };
    if ln.type_name != rn.type_name
        || ln.constraint_level != rn.constraint_level
        || ln.output_type != rn.output_type
        || ln.data != rn.data
        || ln.inputs.len() != rn.inputs.len()
    {
        return false;
    }
    mapping.insert(l, r);
    ln.inputs
        .iter()
        .zip(rn.inputs.iter())
        .all(|((lrole, linput), (rrole, rinput))| {
            lrole == rrole
                && linput.view() == rinput.view()
                && equal_rec(lc, linput.node(), rc, rinput.node(), mapping)
        })
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::builtins::testing::Simple;
    use crate::registry::TypeRegistry;
    use crate::signature::{ParamDef, Signature, ViewMode};
    use crate::value::Value;

    fn ctx() -> DialogContext {
        let reg = TypeRegistry::register_types([Simple::arc(
            Signature::new("Event")
                .param(ParamDef::new("subject").types(["Str"]).positional())
                .param(ParamDef::new("size").types(["Int"])),
        )])
        .unwrap();
        DialogContext::new(Arc::new(reg))
    }

    fn event(ctx: &mut DialogContext, subject: &str, size: i64) -> NodeId {
        let e = ctx.create("Event").unwrap();
        let s = ctx.create_value(Value::Str(subject.into())).unwrap();
        let n = ctx.create_value(Value::Int(size)).unwrap();
        ctx.add_input(e, "subject", s, ViewMode::Extension).unwrap();
        ctx.add_input(e, "size", n, ViewMode::Extension).unwrap();
        e
    }

    fn constraint(ctx: &mut DialogContext, role: &str, child: NodeId) -> NodeId {
        let c = ctx.create("Event?").unwrap();
        ctx.add_input(c, role, child, ViewMode::Extension).unwrap();
        c
    }

    #[test]
    fn type_and_literal_matching() {
        let mut ctx = ctx();
        let e = event(&mut ctx, "sync", 3);
        let any_event = ctx.create("Event?").unwrap();
        assert!(match_constraint(&ctx, any_event, e));

        let subject = ctx.create_value(Value::Str("sync".into())).unwrap();
        let c = constraint(&mut ctx, "subject", subject);
        assert!(match_constraint(&ctx, c, e));

        let other = ctx.create_value(Value::Str("lunch".into())).unwrap();
        let c = constraint(&mut ctx, "subject", other);
        assert!(!match_constraint(&ctx, c, e));

        let anything = ctx.create("Node?").unwrap();
        assert!(match_constraint(&ctx, anything, e));
        let int = ctx.create("Int?").unwrap();
        assert!(!match_constraint(&ctx, int, e));
    }

    #[test]
    fn qualifiers_and_junctions() {
        let mut ctx = ctx();
        let e = event(&mut ctx, "Team Sync", 3);

        let lt = ctx.create("LT").unwrap();
        let five = ctx.create_value(Value::Int(5)).unwrap();
        ctx.add_input(lt, "value", five, ViewMode::Extension).unwrap();
        let small = constraint(&mut ctx, "size", lt);
        assert!(match_constraint(&ctx, small, e));

        let like = ctx.create("LIKE").unwrap();
        let pat = ctx.create_value(Value::Str("sync".into())).unwrap();
        ctx.add_input(like, "value", pat, ViewMode::Extension).unwrap();
        let named = constraint(&mut ctx, "subject", like);

        let and = ctx.create("AND").unwrap();
        ctx.add_input(and, "pos1", small, ViewMode::Extension).unwrap();
        ctx.add_input(and, "pos2", named, ViewMode::Extension).unwrap();
        assert!(match_constraint(&ctx, and, e));

        let not = ctx.create("NOT").unwrap();
        ctx.add_input(not, "arg", and, ViewMode::Extension).unwrap();
        assert!(!match_constraint(&ctx, not, e));
    }

    #[test]
    fn missing_property_fails_match() {
        let mut ctx = ctx();
        let e = ctx.create("Event").unwrap();
        let subject = ctx.create_value(Value::Str("sync".into())).unwrap();
        let c = constraint(&mut ctx, "subject", subject);
        assert!(!match_constraint(&ctx, c, e));
    }

    #[test]
    fn structural_equality_ignores_numbering() {
        let mut a = ctx();
        a.create("Node").unwrap();
        let ea = event(&mut a, "sync", 3);
        let mut b = ctx();
        let eb = event(&mut b, "sync", 3);
        assert!(structurally_equal(&a, ea, &b, eb));

        let ec = event(&mut b, "sync", 4);
        assert!(!structurally_equal(&a, ea, &b, ec));
    }
}
