//! Expansion of shorthand forms on a parsed tree.
//!
//! - `let((x0, v0, x1, v1, ...), body)` becomes
//!   `do(Let(x0, {x0}v0), Let(x1, {x1}v1), ..., body)`.
//! - `List_T(_)` becomes `List(T?)`.

use crate::ast::AstNode;
use crate::builtins::{LET, SEQUENCE};
use crate::error::SugarError;

const LET_SUGAR: &str = "let";
const LIST_PREFIX: &str = "List_";

/// Rewrite all shorthand in `ast`, innermost arguments included.
pub fn desugar(ast: AstNode) -> Result<AstNode, SugarError> {
    let mut node = if ast.is_terminal || ast.is_reference() {
        ast
    } else if ast.name == LET_SUGAR {
        expand_let(ast)?
    } else if ast.name.len() > LIST_PREFIX.len() && ast.name.starts_with(LIST_PREFIX) {
        expand_list(ast)?
    } else {
        ast
    };
    node.args = std::mem::take(&mut node.args)
        .into_iter()
        .map(|(role, arg)| Ok((role, desugar(arg)?)))
        .collect::<Result<_, SugarError>>()?;
    Ok(node)
}

fn expand_let(ast: AstNode) -> Result<AstNode, SugarError> {
    let AstNode {
        args,
        binding,
        view,
        tags,
        ..
    } = ast;
    let [(_, list), (_, body)]: [(String, AstNode); 2] =
        args.try_into().map_err(|_| SugarError::LetArity)?;
    if list.is_terminal || list.is_reference() || !list.name.is_empty() {
        return Err(SugarError::LetBindingList);
    }
    if list.args.len() % 2 != 0 {
        return Err(SugarError::LetOddBindings);
    }

    let mut steps = Vec::with_capacity(list.args.len() / 2 + 1);
    let mut pairs = list.args.into_iter().map(|(_, a)| a);
    while let (Some(name), Some(mut value)) = (pairs.next(), pairs.next()) {
        if !name.is_plain_token() {
            return Err(SugarError::LetBindingName {
                found: describe(&name),
            });
        }
        value.binding = Some(crate::ast::Binding {
            name: name.name.clone(),
            to_result: false,
        });
        steps.push(AstNode::positional_call(LET, vec![name, value]));
    }
    steps.push(body);

    let mut seq = AstNode::positional_call(SEQUENCE, steps);
    seq.binding = binding;
    seq.view = view;
    seq.tags = tags;
    Ok(seq)
}

fn expand_list(ast: AstNode) -> Result<AstNode, SugarError> {
    let element = ast.name[LIST_PREFIX.len()..].to_string();
    let shorthand_arg = matches!(
        ast.args.as_slice(),
        [(_, arg)] if arg.is_plain_token() && arg.name == "_"
    );
    if !shorthand_arg {
        return Err(SugarError::ListShorthand { name: ast.name });
    }
    let constraint = AstNode::call(format!("{element}?"), Vec::new());
    let mut list = AstNode::positional_call("List", vec![constraint]);
    list.binding = ast.binding;
    list.view = ast.view;
    list.tags = ast.tags;
    Ok(list)
}

fn describe(node: &AstNode) -> String {
    if node.is_reference() {
        "a reference".to_string()
    } else if node.is_terminal {
        node.name.clone()
    } else {
        format!("{}(...)", node.name)
    }
}
