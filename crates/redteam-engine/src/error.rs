//! Error taxonomy for the iterative attack engine.
//!
//! Malformed attacker output and evaluator failures are absorbed locally
//! (see `json_extract` and `strategy`) and never surface here. Only the
//! failures that must propagate out of a run are represented.

use thiserror::Error;

use crate::record::IterationRecord;

/// Which collaborator a failed invocation belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelRole {
    Attacker,
    Target,
    Judge,
}

impl std::fmt::Display for ModelRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Attacker => write!(f, "attacker"),
            Self::Target => write!(f, "target"),
            Self::Judge => write!(f, "judge"),
        }
    }
}

/// Unified error type for all engine operations.
#[derive(Debug, Error)]
pub enum EngineError {
    /// The attacker or target invocation failed mid-run.
    ///
    /// Carries the iterations already appended so a caller can still
    /// inspect partial progress instead of losing it entirely.
    #[error("{role} call failed on iteration {iteration} for goal {goal:?}: {source}")]
    ModelCallFailed {
        role: ModelRole,
        goal: String,
        iteration: usize,
        source: String,
        partial: Vec<IterationRecord>,
    },

    /// A message-list prompt had no message with role `human`.
    #[error("no human message found in prompt")]
    NoHumanMessage,

    /// Escape hatch for collaborator errors that don't decompose above.
    #[error("internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

/// Result type alias for engine operations.
pub type EngineResult<T> = Result<T, EngineError>;
