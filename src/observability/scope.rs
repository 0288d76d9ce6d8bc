//! ObservationScope for automatic begin/complete logging
//!
//! - Logs `{name}_BEGIN` on creation
//! - Logs `{name}_COMPLETE` or `{name}_FAILED` when finished
//! - Logs `{name}_INCOMPLETE` on drop if never finished

use std::time::Instant;

/// A scope that logs lifecycle events through `tracing`
///
/// # Usage
///
/// ```ignore
/// let scope = ObservationScope::with_fields("INDEX_EVAL", &[("shard", shard)]);
/// // ... do work ...
/// scope.complete_with_fields(&[("matches", count.as_str())]);
/// ```
pub struct ObservationScope {
    name: &'static str,
    completed: bool,
    fields: String,
    started: Instant,
}

fn render(fields: &[(&str, &str)]) -> String {
    let mut sorted: Vec<_> = fields.iter().collect();
    sorted.sort_by_key(|(k, _)| *k);
    sorted
        .iter()
        .map(|(k, v)| format!("{}={}", k, v))
        .collect::<Vec<_>>()
        .join(" ")
}

impl ObservationScope {
    /// Create a new observation scope
    pub fn new(name: &'static str) -> Self {
        Self::with_fields(name, &[])
    }

    /// Create a new observation scope with context fields
    ///
    /// Fields are rendered in key order and repeated on every event of the
    /// scope.
    pub fn with_fields(name: &'static str, fields: &[(&str, &str)]) -> Self {
        let fields = render(fields);
        tracing::info!(event = %format!("{}_BEGIN", name), fields = %fields);
        Self {
            name,
            completed: false,
            fields,
            started: Instant::now(),
        }
    }

    /// Milliseconds since the scope began
    pub fn elapsed_ms(&self) -> u64 {
        self.started.elapsed().as_millis() as u64
    }

    /// Mark the scope as successfully completed
    pub fn complete(self) {
        self.complete_with_fields(&[]);
    }

    /// Mark the scope as successfully completed with additional fields
    pub fn complete_with_fields(mut self, extra_fields: &[(&str, &str)]) {
        self.completed = true;
        tracing::info!(
            event = %format!("{}_COMPLETE", self.name),
            fields = %self.fields,
            result = %render(extra_fields),
            elapsed_ms = self.elapsed_ms(),
        );
    }

    /// Mark the scope as failed with a stable error code and reason
    pub fn fail(mut self, code: &str, reason: &str) {
        self.completed = true;
        tracing::error!(
            event = %format!("{}_FAILED", self.name),
            fields = %self.fields,
            code,
            reason,
            elapsed_ms = self.elapsed_ms(),
        );
    }

    /// Check if the scope has been completed
    pub fn is_completed(&self) -> bool {
        self.completed
    }
}

impl Drop for ObservationScope {
    fn drop(&mut self) {
        if !self.completed {
            tracing::warn!(
                event = %format!("{}_INCOMPLETE", self.name),
                fields = %self.fields,
                reason = "scope dropped without completion",
            );
        }
    }
}
