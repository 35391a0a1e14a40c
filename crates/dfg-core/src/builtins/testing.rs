//! Minimal catalog types for unit tests.

use std::sync::Arc;

use crate::behavior::NodeBehavior;
use crate::signature::Signature;

/// A type with a signature and default behavior.
#[derive(Debug)]
pub struct Simple {
    sig: Signature,
}

impl Simple {
    pub fn arc(sig: Signature) -> Arc<dyn NodeBehavior> {
        Arc::new(Simple { sig })
    }
}

impl NodeBehavior for Simple {
    fn signature(&self) -> &Signature {
        &self.sig
    }
}
