//! Content digests for stored snapshots using blake3.
//!
//! A digest is computed over the canonical JSON encoding of a
//! [`SessionSnapshot`]. Snapshots hold no hash maps (nodes are ordered by
//! id, tags by key), so equal snapshots always encode to the same bytes.

use crate::convert::SessionSnapshot;
use crate::error::StorageError;

/// Canonical byte encoding of a snapshot.
pub fn canonical_bytes(snapshot: &SessionSnapshot) -> Result<Vec<u8>, StorageError> {
    Ok(serde_json::to_vec(snapshot)?)
}

/// blake3 digest of the snapshot's canonical encoding.
pub fn snapshot_digest(snapshot: &SessionSnapshot) -> Result<blake3::Hash, StorageError> {
    Ok(digest_bytes(&canonical_bytes(snapshot)?))
}

pub fn digest_bytes(bytes: &[u8]) -> blake3::Hash {
    let mut hasher = blake3::Hasher::new();
    hasher.update(bytes);
    hasher.finalize()
}

/// Checks `bytes` against a stored hex digest.
pub fn verify_digest(bytes: &[u8], expected_hex: &str, session: i64) -> Result<(), StorageError> {
    if digest_bytes(bytes).to_hex().as_str() == expected_hex {
        Ok(())
    } else {
        Err(StorageError::DigestMismatch { session })
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::convert::dump_context;
    use dfg_core::{DialogContext, TypeRegistry};
    use dfg_engine::{process_turn, ConstructOptions};

    fn snapshot(text: &str) -> SessionSnapshot {
        let mut ctx = DialogContext::new(Arc::new(TypeRegistry::new()));
        process_turn(&mut ctx, text, &ConstructOptions::default()).unwrap();
        dump_context(&ctx)
    }

    #[test]
    fn digest_is_deterministic() {
        let a = snapshot("AND(yes, no)");
        let b = snapshot("AND(yes, no)");
        assert_eq!(snapshot_digest(&a).unwrap(), snapshot_digest(&b).unwrap());
    }

    #[test]
    fn digest_changes_with_content() {
        let a = snapshot("AND(yes, no)");
        let b = snapshot("AND(yes, yes)");
        assert_ne!(snapshot_digest(&a).unwrap(), snapshot_digest(&b).unwrap());
    }

    #[test]
    fn verification_detects_tampering() {
        let a = snapshot("OR(no)");
        let bytes = canonical_bytes(&a).unwrap();
        let hex = digest_bytes(&bytes).to_hex().to_string();
        assert!(verify_digest(&bytes, &hex, 1).is_ok());

        let mut tampered = bytes.clone();
        tampered.push(b' ');
        assert!(matches!(
            verify_digest(&tampered, &hex, 1),
            Err(StorageError::DigestMismatch { session: 1 })
        ));
    }
}
