//! The universal type and the scalar base types.

use std::sync::Arc;

use crate::behavior::NodeBehavior;
use crate::context::DialogContext;
use crate::exception::DomainError;
use crate::id::NodeId;
use crate::signature::Signature;
use crate::value::BaseKind;

use super::UNIVERSAL;

/// `Node` (synonym `Any`): the root of the type hierarchy.
#[derive(Debug)]
pub struct Universal {
    sig: Signature,
}

impl Universal {
    pub fn new() -> Self {
        Universal {
            sig: Signature::new(UNIVERSAL).output(UNIVERSAL),
        }
    }
}

impl Default for Universal {
    fn default() -> Self {
        Self::new()
    }
}

impl NodeBehavior for Universal {
    fn signature(&self) -> &Signature {
        &self.sig
    }
}

/// `Int`, `Float`, `Bool` and `Str`: nodes that carry a literal.
#[derive(Debug)]
pub struct Scalar {
    sig: Signature,
    kind: BaseKind,
}

impl Scalar {
    pub fn new(kind: BaseKind) -> Self {
        Scalar {
            sig: Signature::new(kind.type_name()).base(kind),
            kind,
        }
    }
}

impl NodeBehavior for Scalar {
    fn signature(&self) -> &Signature {
        &self.sig
    }

    /// Objects hold exactly one literal of their kind and no inputs.
    /// Constraints over a base type may be empty or hold qualifiers.
    fn valid_input(&self, ctx: &DialogContext, node: NodeId) -> Result<(), DomainError> {
        let n = ctx
            .node(node)
            .ok_or_else(|| DomainError::new(format!("node {node} is missing")))?;
        if n.is_constraint() {
            return Ok(());
        }
        if !n.inputs.is_empty() {
            return Err(DomainError::new(format!("{} takes a single literal value", self.kind)).at(node));
        }
        match &n.data {
            None => Err(DomainError::new(format!("{} requires a value", self.kind)).at(node)),
            Some(v) if v.kind() != self.kind => Err(DomainError::new(format!(
                "{} cannot hold {} value '{}'",
                self.kind,
                v.kind(),
                v
            ))
            .at(node)),
            Some(_) => Ok(()),
        }
    }
}

pub fn scalar_types() -> Vec<Arc<dyn NodeBehavior>> {
    BaseKind::ALL
        .into_iter()
        .map(|k| Arc::new(Scalar::new(k)) as Arc<dyn NodeBehavior>)
        .collect()
}
