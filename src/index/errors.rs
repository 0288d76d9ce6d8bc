//! Scan error types
//!
//! Error codes:
//! - INDEX_SCAN_FAILED (RETRYABLE)
//! - INDEX_SCAN_TIMEOUT (RETRYABLE)
//! - INDEX_SCAN_WORKER_FAILED (RETRYABLE)
//!
//! Every scan error fails the whole evaluation. Retrying belongs to the store
//! client beneath `IndexScan` or to the caller re-running the query.

use thiserror::Error;

/// Failure of the underlying range-scan primitive
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ScanError {
    /// The store rejected or aborted the scan
    #[error("index scan failed: {cause}")]
    Store { cause: String },

    /// The caller's deadline expired while the scan was in flight
    #[error("index scan timed out after {elapsed_ms}ms")]
    Timeout { elapsed_ms: u64 },

    /// A parallel scan worker died before reporting a result
    #[error("index scan worker failed: {cause}")]
    Worker { cause: String },
}

impl ScanError {
    /// Create a store failure
    pub fn store(cause: impl Into<String>) -> Self {
        ScanError::Store {
            cause: cause.into(),
        }
    }

    /// Create a timeout failure
    pub fn timeout(elapsed_ms: u64) -> Self {
        ScanError::Timeout { elapsed_ms }
    }

    /// Create a worker failure
    pub fn worker(cause: impl Into<String>) -> Self {
        ScanError::Worker {
            cause: cause.into(),
        }
    }

    /// Returns the stable error code
    pub fn code(&self) -> &'static str {
        match self {
            ScanError::Store { .. } => "INDEX_SCAN_FAILED",
            ScanError::Timeout { .. } => "INDEX_SCAN_TIMEOUT",
            ScanError::Worker { .. } => "INDEX_SCAN_WORKER_FAILED",
        }
    }

    /// Returns true if this is a deadline expiry
    pub fn is_timeout(&self) -> bool {
        matches!(self, ScanError::Timeout { .. })
    }
}

/// Result type for scan operations
pub type ScanResult<T> = Result<T, ScanError>;
