//! Planner error types
//!
//! Error codes:
//! - INDEX_UNSUPPORTED_PREDICATE (REJECT)
//!
//! A rejected expression cannot be narrowed by the field index at all. The
//! caller's query-planning stage must rewrite it (bounded ranges for raw
//! inequalities, no negations) before evaluating again.

use thiserror::Error;

/// Planner error type with full context
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum PlannerError {
    /// The term has no index-range representation at this layer
    #[error("unsupported predicate `{predicate}`: {reason}")]
    UnsupportedPredicate { predicate: String, reason: String },
}

impl PlannerError {
    /// Create an unsupported predicate error
    pub fn unsupported(predicate: impl Into<String>, reason: impl Into<String>) -> Self {
        PlannerError::UnsupportedPredicate {
            predicate: predicate.into(),
            reason: reason.into(),
        }
    }

    /// Returns the stable error code
    pub fn code(&self) -> &'static str {
        match self {
            PlannerError::UnsupportedPredicate { .. } => "INDEX_UNSUPPORTED_PREDICATE",
        }
    }

    /// Returns the offending term in canonical form
    pub fn predicate(&self) -> &str {
        match self {
            PlannerError::UnsupportedPredicate { predicate, .. } => predicate,
        }
    }
}

/// Result type for planner operations
pub type PlannerResult<T> = Result<T, PlannerError>;
