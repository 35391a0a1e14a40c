//! Core data model for dialogue dataflow graphs.
//!
//! A user turn is written as an expression, parsed into an [`ast::AstNode`]
//! tree and built into typed nodes stored in a [`context::DialogContext`]
//! arena. Node types are [`behavior::NodeBehavior`] objects held in a shared
//! [`registry::TypeRegistry`]. Construction, evaluation and simplification
//! live in `dfg-engine`; persistence in `dfg-storage`.

pub mod ast;
pub mod behavior;
pub mod builtins;
pub mod config;
pub mod context;
pub mod desugar;
pub mod error;
pub mod exception;
pub mod id;
pub mod matching;
pub mod node;
pub mod parser;
pub mod printer;
pub mod registry;
pub mod signature;
pub mod value;
pub mod viz;

pub use behavior::{ExceptionAction, NodeBehavior, NodeError, SimplifyMode};
pub use config::{ExceptionRetention, FaultPolicy, SessionConfig};
pub use context::DialogContext;
pub use error::{CoreError, ParseError, SugarError};
pub use exception::DomainError;
pub use id::{ExceptionId, NodeId};
pub use node::{InputRef, Node};
pub use registry::TypeRegistry;
pub use signature::{ParamDef, Signature, ViewMode};
pub use value::{BaseKind, Value};
