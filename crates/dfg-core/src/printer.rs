//! Render graphs back to expression text.
//!
//! Output re-parses to a structurally equal graph: roles that the parser
//! would assign positionally are printed unnamed, ambiguous strings are
//! quoted, and bound nodes print `{x}...` the first time and `$x` after.
//! Unbound nodes shared by several parents are printed in full at each use.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::builtins::GETATTR;
use crate::context::DialogContext;
use crate::id::NodeId;
use crate::node::{InputRef, Node};
use crate::signature::{positional_role_index, Signature, ViewMode};
use crate::value::{BaseKind, Value};

/// Rendering switches.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PrintOptions {
    /// Print `10` rather than `Int(10)` where the literal re-infers correctly.
    pub trim_base: bool,
    /// Print `:name(obj)` for `getattr`.
    pub sugar: bool,
    pub show_tags: bool,
    /// Print `!`/`@` where an input's view differs from its parameter default.
    pub show_views: bool,
    /// Print `{x}` / `$x` for named bindings.
    pub bindings: bool,
}

impl Default for PrintOptions {
    fn default() -> Self {
        PrintOptions {
            trim_base: true,
            sugar: true,
            show_tags: false,
            show_views: true,
            bindings: true,
        }
    }
}

/// Print the graph rooted at `root`.
pub fn print_node(ctx: &DialogContext, root: NodeId, options: &PrintOptions) -> String {
    let mut printer = Printer {
        ctx,
        options,
        printed: HashSet::new(),
        active: HashSet::new(),
    };
    let mut out = String::new();
    printer.expr(root, true, None, &mut out);
    out
}

/// Print with default options.
pub fn to_expression(ctx: &DialogContext, root: NodeId) -> String {
    print_node(ctx, root, &PrintOptions::default())
}

struct Printer<'a> {
    ctx: &'a DialogContext,
    options: &'a PrintOptions,
    /// Bound nodes already printed once.
    printed: HashSet<NodeId>,
    /// Nodes on the current path, to stop on cycles.
    active: HashSet<NodeId>,
}

impl Printer<'_> {
    fn expr(&mut self, id: NodeId, root: bool, accepted: Option<&[String]>, out: &mut String) {
        let Some(node) = self.ctx.node(id) else {
            out.push_str(&format!("$#{id}"));
            return;
        };

        if self.options.bindings {
            if let Some(name) = self.ctx.name_of(id) {
                if !self.printed.insert(id) {
                    out.push_str(&format!("${name}"));
                    return;
                }
                out.push_str(&format!("{{{name}}}"));
            }
        }
        if !self.active.insert(id) {
            out.push_str(&format!("$#{id}"));
            return;
        }

        if self.options.show_tags {
            for (tag, value) in &node.tags {
                out.push('^');
                out.push_str(tag);
                if !value.is_empty() {
                    out.push('=');
                    out.push_str(&quote_if_needed(value));
                }
                out.push(' ');
            }
        }

        let kind = self.ctx.registry().base_kind(&node.type_name);
        match (kind, &node.data) {
            (Some(kind), Some(value)) if node.inputs.is_empty() && node.constraint_level == 0 => {
                if !root && self.options.trim_base && literal_is_unambiguous(kind, value, accepted) {
                    out.push_str(&literal_text(value));
                } else {
                    out.push_str(&format!("{}({})", node.type_name, literal_text(value)));
                }
            }
            _ if self.options.sugar && self.getattr_sugar(node, out) => {}
            _ => self.call(node, out),
        }
        self.active.remove(&id);
    }

    fn getattr_sugar(&mut self, node: &Node, out: &mut String) -> bool {
        if node.type_name != GETATTR || node.constraint_level > 0 || node.inputs.len() != 2 {
            return false;
        }
        let (Some(InputRef::ViaResult(name_id)), Some(obj)) =
            (node.inputs.get("name").copied(), node.inputs.get("obj").copied())
        else {
            return false;
        };
        let Some(name) = self
            .ctx
            .node(name_id)
            .and_then(|n| n.data.as_ref())
            .and_then(Value::as_str)
        else {
            return false;
        };
        if !is_bare_safe(name) || self.ctx.name_of(name_id).is_some() || obj.view() != ViewMode::Extension {
            return false;
        }
        out.push(':');
        out.push_str(name);
        out.push('(');
        self.expr(obj.node(), false, None, out);
        out.push(')');
        true
    }

    fn call(&mut self, node: &Node, out: &mut String) {
        let sig = self.ctx.registry().signature(&node.type_name);
        out.push_str(&node.display_type());
        if let Some(value) = &node.data {
            out.push('(');
            out.push_str(&literal_text(value));
            out.push(')');
            return;
        }
        out.push('(');
        let mut next_positional = 1;
        for (i, (role, input)) in node.inputs.iter().enumerate() {
            if i > 0 {
                out.push_str(", ");
            }
            let param = sig.and_then(|s| s.get(role));
            if unnamed_here(sig, role, next_positional) {
                next_positional += 1;
            } else {
                if let Some(index) = positional_role_index(role) {
                    next_positional = next_positional.max(index + 1);
                }
                out.push_str(role);
                out.push('=');
            }
            if self.options.show_views {
                let default = param.map(|p| p.view).unwrap_or_default();
                match (input.view(), default) {
                    (ViewMode::Intension, ViewMode::Extension) => out.push('!'),
                    (ViewMode::Extension, ViewMode::Intension) => out.push('@'),
                    _ => {}
                }
            }
            let accepted = param.map(|p| p.types.as_slice());
            self.expr(input.node(), false, accepted, out);
        }
        out.push(')');
    }
}

/// Would the parser assign `role` to the next unnamed argument?
fn unnamed_here(sig: Option<&Signature>, role: &str, next_positional: usize) -> bool {
    if positional_role_index(role) == Some(next_positional) {
        return sig.map_or(true, |s| s.positional_param(next_positional).is_none());
    }
    sig.and_then(|s| s.positional_index(role)) == Some(next_positional)
}

/// Can `value` be printed bare and come back as the same kind?
fn literal_is_unambiguous(kind: BaseKind, value: &Value, accepted: Option<&[String]>) -> bool {
    if let Value::Str(s) = value {
        if !is_bare_safe(s) {
            return true;
        }
    }
    let literal = value.to_literal();
    if Value::infer(&literal).kind() == kind {
        return true;
    }
    matches!(accepted, Some([only]) if only == kind.type_name())
}

fn literal_text(value: &Value) -> String {
    match value {
        Value::Str(s) => quote_if_needed(s),
        other => other.to_literal(),
    }
}

fn is_bare_safe(s: &str) -> bool {
    !s.is_empty()
        && s.chars().all(|c| !c.is_whitespace() && !"()[],=\":{}$^#?!|@~<>/&".contains(c))
}

fn quote_if_needed(s: &str) -> String {
    if is_bare_safe(s) {
        s.to_string()
    } else {
        let escaped = s.replace('\\', "\\\\").replace('"', "\\\"");
        format!("\"{escaped}\"")
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::builtins::testing::Simple;
    use crate::registry::TypeRegistry;
    use crate::signature::{ParamDef, Signature};

    fn ctx() -> DialogContext {
        let reg = TypeRegistry::register_types([
            Simple::arc(
                Signature::new("Event")
                    .param(ParamDef::new("subject").types(["Str"]).positional())
                    .param(ParamDef::new("size").types(["Int"])),
            ),
            Simple::arc(Signature::new("Code").param(ParamDef::new("text").types(["Str"]).positional())),
        ])
        .unwrap();
        DialogContext::new(Arc::new(reg))
    }

    fn link(ctx: &mut DialogContext, parent: NodeId, role: &str, child: NodeId) {
        ctx.add_input(parent, role, child, ViewMode::Extension).unwrap();
    }

    #[test]
    fn positional_params_print_unnamed() {
        let mut ctx = ctx();
        let e = ctx.create("Event").unwrap();
        let s = ctx.create_value(Value::Str("sync".into())).unwrap();
        let n = ctx.create_value(Value::Int(3)).unwrap();
        link(&mut ctx, e, "subject", s);
        link(&mut ctx, e, "size", n);
        insta::assert_snapshot!(to_expression(&ctx, e), @"Event(sync, size=3)");
    }

    #[test]
    fn ambiguous_strings_are_quoted_or_wrapped() {
        let mut ctx = ctx();
        let e = ctx.create("Event").unwrap();
        let s = ctx.create_value(Value::Str("team sync".into())).unwrap();
        link(&mut ctx, e, "subject", s);
        insta::assert_snapshot!(to_expression(&ctx, e), @r#"Event("team sync")"#);

        let and = ctx.create("AND").unwrap();
        let digits = ctx.create_value(Value::Str("42".into())).unwrap();
        link(&mut ctx, and, "pos1", digits);
        insta::assert_snapshot!(to_expression(&ctx, and), @"AND(Str(42))");

        let code = ctx.create("Code").unwrap();
        let digits = ctx.create_value(Value::Str("42".into())).unwrap();
        link(&mut ctx, code, "text", digits);
        insta::assert_snapshot!(to_expression(&ctx, code), @"Code(42)");
    }

    #[test]
    fn root_literal_keeps_wrapper() {
        let mut ctx = ctx();
        let n = ctx.create_value(Value::Float(2.0)).unwrap();
        insta::assert_snapshot!(to_expression(&ctx, n), @"Float(2.0)");
    }

    #[test]
    fn bindings_print_once_then_reference() {
        let mut ctx = ctx();
        let and = ctx.create("AND").unwrap();
        let e = ctx.create("Event?").unwrap();
        link(&mut ctx, and, "pos1", e);
        link(&mut ctx, and, "pos2", e);
        ctx.bind("x", e);
        insta::assert_snapshot!(to_expression(&ctx, and), @"AND({x}Event?(), $x)");
    }

    #[test]
    fn getattr_sugar_and_views() {
        let mut ctx = ctx();
        let g = ctx.create("getattr").unwrap();
        let name = ctx.create_value(Value::Str("subject".into())).unwrap();
        let e = ctx.create("Event").unwrap();
        link(&mut ctx, g, "name", name);
        link(&mut ctx, g, "obj", e);
        insta::assert_snapshot!(to_expression(&ctx, g), @":subject(Event())");

        let refer = ctx.create("refer").unwrap();
        let c = ctx.create("Event?").unwrap();
        ctx.add_input(refer, "constraint", c, ViewMode::Intension).unwrap();
        let and = ctx.create("AND").unwrap();
        ctx.add_input(and, "pos1", refer, ViewMode::Intension).unwrap();
        insta::assert_snapshot!(to_expression(&ctx, and), @"AND(!refer(Event?()))");
    }

    #[test]
    fn output_type_constraints() {
        let mut ctx = ctx();
        let c = ctx.create("Constraint[Event/Code]").unwrap();
        insta::assert_snapshot!(to_expression(&ctx, c), @"Constraint[Event/Code]()");
    }
}
