//! Persistence for dialog sessions.
//!
//! A session's [`DialogContext`](dfg_core::DialogContext) is flattened into a
//! [`SessionSnapshot`] and stored behind the [`SessionStore`] trait, with
//! [`InMemoryStore`] and [`SqliteStore`] as backends.
//!
//! # Modules
//!
//! - [`error`]: StorageError enum with all failure modes
//! - [`types`]: SessionId, SessionSummary
//! - [`convert`]: dump/restore between contexts and snapshots
//! - [`hash`]: blake3 snapshot digests
//! - [`traits`]: SessionStore trait definition
//! - [`memory`]: InMemoryStore implementation
//! - [`sqlite`]: SqliteStore implementation with embedded migrations

pub mod convert;
pub mod error;
pub mod hash;
pub mod memory;
pub mod sqlite;
pub mod traits;
pub mod types;

pub use convert::{dump_context, restore_context, SessionSnapshot, SNAPSHOT_VERSION};
pub use error::StorageError;
pub use hash::snapshot_digest;
pub use memory::InMemoryStore;
pub use sqlite::SqliteStore;
pub use traits::SessionStore;
pub use types::{SessionId, SessionSummary};
