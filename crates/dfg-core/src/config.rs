//! Per-session configuration.
//!
//! Lives on the [`DialogContext`](crate::context::DialogContext) and
//! survives [`clear`](crate::context::DialogContext::clear). The CLI loads it
//! from JSON; every field has a default so partial files are fine.

use serde::{Deserialize, Serialize};

/// How many exceptions the context keeps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExceptionRetention {
    /// Only the most recent exception is kept.
    #[default]
    KeepLast,
    Accumulate,
}

/// What happens when a behavior reports an internal fault.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FaultPolicy {
    /// Log and terminate the process.
    Abort,
    /// Return the fault to the caller as an error.
    #[default]
    Propagate,
}

/// Session configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    pub exception_retention: ExceptionRetention,
    /// Goal types of which at most one instance is kept on the goal list.
    pub unique_goal_types: Vec<String>,
    /// Keep domain exceptions on the context instead of returning them.
    pub suppress_exceptions: bool,
    pub fault_policy: FaultPolicy,
    /// Run the graph integrity sweep after every evaluation.
    pub check_integrity: bool,
}

impl Default for SessionConfig {
    fn default() -> Self {
        SessionConfig {
            exception_retention: ExceptionRetention::KeepLast,
            unique_goal_types: Vec::new(),
            suppress_exceptions: true,
            fault_policy: FaultPolicy::Propagate,
            check_integrity: false,
        }
    }
}
