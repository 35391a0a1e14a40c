//! Binding call arguments to a type's parameters.

use std::collections::HashSet;

use dfg_core::ast::AstNode;
use dfg_core::signature::positional_role_index;
use dfg_core::{ParamDef, Signature};

use crate::error::ConstructError;

/// One argument, resolved to its canonical role.
#[derive(Debug, Clone)]
pub struct BoundArg<'a> {
    pub role: String,
    /// Declared parameter, absent for extra operator/aggregator inputs.
    pub param: Option<ParamDef>,
    pub ast: &'a AstNode,
}

/// Map parsed argument roles onto `sig`.
///
/// `posN` roles bind to the N-th positional parameter, other roles to a
/// parameter name or alias. Types that accept extra inputs keep unknown
/// roles as they are. Positional parameters must not go backwards, whether
/// written as `posN`, by name or by alias, and no parameter may be given
/// twice.
pub fn bind_arguments<'a>(
    sig: &Signature,
    args: &'a [(String, AstNode)],
) -> Result<Vec<BoundArg<'a>>, ConstructError> {
    let mut bound = Vec::with_capacity(args.len());
    let mut seen = HashSet::new();
    let mut last_positional = 0usize;

    for (role, ast) in args {
        let (canonical, param) = if let Some(index) = positional_role_index(role) {
            match sig.positional_param(index) {
                Some(p) => (p.name.clone(), Some(p.clone())),
                None if sig.accepts_extra_inputs() => (role.clone(), None),
                None => {
                    return Err(ConstructError::semantic(format!(
                        "{} takes no positional argument {index}",
                        sig.name
                    )))
                }
            }
        } else if let Some(p) = sig.resolve_alias(role) {
            (p.name.clone(), Some(p.clone()))
        } else if sig.accepts_extra_inputs() {
            (role.clone(), None)
        } else {
            return Err(ConstructError::semantic(format!(
                "{} does not allow parameter '{role}'",
                sig.name
            )));
        };

        // Named and aliased positional parameters count too.
        let position = positional_role_index(role).or_else(|| {
            param
                .as_ref()
                .filter(|p| p.positional)
                .and_then(|p| sig.positional_index(&p.name))
        });
        if let Some(index) = position {
            if index < last_positional {
                return Err(ConstructError::semantic(format!(
                    "positional parameters out of order in {}: '{role}' after pos{last_positional}",
                    sig.name
                )));
            }
            last_positional = index;
        }

        if !seen.insert(canonical.clone()) {
            return Err(ConstructError::semantic(format!(
                "duplicate parameter '{canonical}' for {}",
                sig.name
            )));
        }
        bound.push(BoundArg {
            role: canonical,
            param,
            ast,
        });
    }
    Ok(bound)
}

#[cfg(test)]
mod tests {
    use super::*;
    use dfg_core::parser::parse_expression;

    fn event() -> Signature {
        Signature::new("Event")
            .param(ParamDef::new("subject").types(["Str"]).positional().alias("title"))
            .param(ParamDef::new("start").positional())
            .param(ParamDef::new("location"))
    }

    fn roles(sig: &Signature, text: &str) -> Result<Vec<String>, ConstructError> {
        let ast = parse_expression(text).unwrap();
        bind_arguments(sig, &ast.args).map(|b| b.into_iter().map(|a| a.role).collect())
    }

    #[test]
    fn positional_named_and_alias() {
        let sig = event();
        assert_eq!(roles(&sig, "Event(a, b, location=c)").unwrap(), ["subject", "start", "location"]);
        assert_eq!(roles(&sig, "Event(title=a)").unwrap(), ["subject"]);
        assert_eq!(roles(&sig, "Event(a, start=b)").unwrap(), ["subject", "start"]);
        assert_eq!(roles(&sig, "Event(location=c, title=a, start=b)").unwrap(), ["location", "subject", "start"]);
    }

    #[test]
    fn rejects_unknown_duplicate_and_disorder() {
        let sig = event();
        let err = roles(&sig, "Event(colour=red)").unwrap_err();
        assert_eq!(err.to_string(), "semantic error: Event does not allow parameter 'colour'");

        let err = roles(&sig, "Event(a, title=b)").unwrap_err();
        assert!(err.to_string().contains("duplicate parameter 'subject'"));

        let err = roles(&sig, "Event(pos2=a, pos1=b)").unwrap_err();
        assert!(err.to_string().contains("positional parameters out of order"));

        let err = roles(&sig, "Event(start=b, a)").unwrap_err();
        assert!(err.to_string().contains("positional parameters out of order"));

        let err = roles(&sig, "Event(start=b, title=a)").unwrap_err();
        assert!(err.to_string().contains("positional parameters out of order"));

        let err = roles(&sig, "Event(a, b, c)").unwrap_err();
        assert!(err.to_string().contains("no positional argument 3"));
    }

    #[test]
    fn operators_take_extra_inputs() {
        let sig = Signature::new("AND").operator();
        assert_eq!(roles(&sig, "AND(a, b, c)").unwrap(), ["pos1", "pos2", "pos3"]);
        assert!(roles(&sig, "AND(pos2=a, pos1=b)").is_err());
    }
}
