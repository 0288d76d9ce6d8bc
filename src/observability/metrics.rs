//! Scan and evaluation counters
//!
//! - Counters only, monotonic
//! - Thread-safe; parallel scan workers update them concurrently
//! - Read-only with respect to evaluation: nothing here changes results

use std::sync::atomic::{AtomicU64, Ordering};

/// Counters shared by every leaf scan of an evaluator
///
/// Uses Relaxed ordering; values are exact once the evaluation that produced
/// them has returned.
#[derive(Debug, Default)]
pub struct ScanMetrics {
    scans_opened: AtomicU64,
    scans_failed: AtomicU64,
    entries_read: AtomicU64,
    ids_matched: AtomicU64,
    short_circuits: AtomicU64,
    evaluations: AtomicU64,
    evaluations_failed: AtomicU64,
}

impl ScanMetrics {
    /// Create a registry with all counters at zero
    pub fn new() -> Self {
        Self::default()
    }

    // Scan metrics

    pub fn increment_scans_opened(&self) {
        self.scans_opened.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_scans_failed(&self) {
        self.scans_failed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn add_entries_read(&self, entries: u64) {
        self.entries_read.fetch_add(entries, Ordering::Relaxed);
    }

    pub fn add_ids_matched(&self, ids: u64) {
        self.ids_matched.fetch_add(ids, Ordering::Relaxed);
    }

    /// An AND stopped before evaluating all of its children
    pub fn increment_short_circuits(&self) {
        self.short_circuits.fetch_add(1, Ordering::Relaxed);
    }

    // Evaluation metrics

    pub fn increment_evaluations(&self) {
        self.evaluations.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_evaluations_failed(&self) {
        self.evaluations_failed.fetch_add(1, Ordering::Relaxed);
    }

    /// Get scans opened
    pub fn scans_opened(&self) -> u64 {
        self.scans_opened.load(Ordering::Relaxed)
    }

    /// Point-in-time copy of every counter
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            scans_opened: self.scans_opened.load(Ordering::Relaxed),
            scans_failed: self.scans_failed.load(Ordering::Relaxed),
            entries_read: self.entries_read.load(Ordering::Relaxed),
            ids_matched: self.ids_matched.load(Ordering::Relaxed),
            short_circuits: self.short_circuits.load(Ordering::Relaxed),
            evaluations: self.evaluations.load(Ordering::Relaxed),
            evaluations_failed: self.evaluations_failed.load(Ordering::Relaxed),
        }
    }
}

/// Immutable copy of [`ScanMetrics`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize)]
pub struct MetricsSnapshot {
    pub scans_opened: u64,
    pub scans_failed: u64,
    pub entries_read: u64,
    pub ids_matched: u64,
    pub short_circuits: u64,
    pub evaluations: u64,
    pub evaluations_failed: u64,
}
