//! Builtin node types every registry starts with.
//!
//! - [`base`]: the universal `Node` type and the four scalar types.
//! - [`structural`]: `getattr`, `SET`, `List`, `Let`, `do`, `DummyRoot`.
//! - [`logic`]: `AND`, `OR`, `NOT` and the comparison qualifiers.
//! - [`dialog`]: `refer` and `revise`, which look back at earlier goals.

use std::sync::Arc;

use crate::behavior::NodeBehavior;

pub mod base;
pub mod dialog;
pub mod logic;
pub mod structural;

#[cfg(test)]
pub(crate) mod testing;

/// Name of the type every other type is compatible with.
pub const UNIVERSAL: &str = "Node";

pub const GETATTR: &str = "getattr";
pub const LET: &str = "Let";
pub const SEQUENCE: &str = "do";
pub const DUMMY_ROOT: &str = "DummyRoot";

/// All builtin behaviors, in registration order.
pub fn builtin_types() -> Vec<Arc<dyn NodeBehavior>> {
    let mut types: Vec<Arc<dyn NodeBehavior>> = vec![Arc::new(base::Universal::new())];
    types.extend(base::scalar_types());
    types.extend(structural::types());
    types.extend(logic::types());
    types.extend(dialog::types());
    types
}
