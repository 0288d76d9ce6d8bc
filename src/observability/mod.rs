//! Observability subsystem
//!
//! - Structured lifecycle events through `tracing`
//! - Scan and evaluation counters
//!
//! # Principles
//!
//! 1. Observability is read-only
//! 2. No side effects on evaluation results
//! 3. Event names are SCREAMING_CASE `{SUBSYSTEM}_{PHASE}`
//!
//! # Usage
//!
//! ```ignore
//! use shardindex::observability::{ObservationScope, ScanMetrics};
//!
//! let metrics = ScanMetrics::new();
//! let scope = ObservationScope::with_fields("INDEX_EVAL", &[("shard", "20240101_0")]);
//! metrics.increment_scans_opened();
//! scope.complete();
//! ```

mod metrics;
mod scope;

pub use metrics::{MetricsSnapshot, ScanMetrics};
pub use scope::ObservationScope;
