//! Evaluation error types
//!
//! Error codes:
//! - INDEX_UNSUPPORTED_PREDICATE (REJECT): the query cannot be narrowed by the index
//! - INDEX_SCAN_FAILED / INDEX_SCAN_TIMEOUT / INDEX_SCAN_WORKER_FAILED
//!   (RETRYABLE): transient store failure, the whole query may be retried
//! - INDEX_CONFIGURATION_INVALID (REJECT): misconfiguration, raised before scanning
//!
//! No error is ever folded into an empty result.

use std::fmt;

use thiserror::Error;

use crate::index::ScanError;
use crate::planner::PlannerError;

/// How a caller should react to an error
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// Do not retry; the request itself must change
    Reject,
    /// The same request may succeed later
    Retryable,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Reject => write!(f, "REJECT"),
            Severity::Retryable => write!(f, "RETRYABLE"),
        }
    }
}

/// Evaluation error with full context
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum EvalError {
    #[error(transparent)]
    UnsupportedPredicate(#[from] PlannerError),

    #[error(transparent)]
    Scan(#[from] ScanError),

    #[error("invalid evaluator configuration: {0}")]
    Configuration(String),
}

impl EvalError {
    /// Create a configuration error
    pub fn configuration(reason: impl Into<String>) -> Self {
        EvalError::Configuration(reason.into())
    }

    /// Returns the stable error code
    pub fn code(&self) -> &'static str {
        match self {
            EvalError::UnsupportedPredicate(e) => e.code(),
            EvalError::Scan(e) => e.code(),
            EvalError::Configuration(_) => "INDEX_CONFIGURATION_INVALID",
        }
    }

    /// Returns the severity level
    pub fn severity(&self) -> Severity {
        match self {
            EvalError::Scan(_) => Severity::Retryable,
            _ => Severity::Reject,
        }
    }

    /// Returns true if re-running the whole query may succeed
    pub fn is_retryable(&self) -> bool {
        self.severity() == Severity::Retryable
    }
}

/// Result type for evaluation
pub type EvalResult<T> = Result<T, EvalError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codes_and_severity() {
        let unsupported: EvalError = PlannerError::unsupported("!(F == 'x')", "negation").into();
        assert_eq!(unsupported.code(), "INDEX_UNSUPPORTED_PREDICATE");
        assert_eq!(unsupported.severity(), Severity::Reject);

        let scan: EvalError = ScanError::timeout(10).into();
        assert_eq!(scan.code(), "INDEX_SCAN_TIMEOUT");
        assert!(scan.is_retryable());

        let config = EvalError::configuration("no cost source");
        assert_eq!(config.code(), "INDEX_CONFIGURATION_INVALID");
        assert!(!config.is_retryable());
    }

    #[test]
    fn test_error_display() {
        let err: EvalError = ScanError::store("tablet offline").into();
        assert!(err.to_string().contains("tablet offline"));
        assert_eq!(Severity::Retryable.to_string(), "RETRYABLE");
    }
}
