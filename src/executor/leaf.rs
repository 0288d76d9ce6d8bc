//! Leaf scanner
//!
//! Fetches the document ids matching one predicate: build the scan, open one
//! cursor per range, keep entries that pass the value and document filters.
//! Scan failures propagate as-is; retrying is the store client's business.

use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::index::{Bounds, CursorGuard, DocumentId, IndexScan, ScanError, ScanResult};
use crate::observability::ScanMetrics;
use crate::planner::{Predicate, RangeBuilder, ScanSpec, Term};

use super::errors::EvalResult;
use super::result::ResultSet;

/// Runs single-term scans against an [`IndexScan`]
pub struct LeafScanner {
    scan: Arc<dyn IndexScan>,
    builder: RangeBuilder,
    metrics: Arc<ScanMetrics>,
    started: Instant,
    deadline: Option<Instant>,
}

impl LeafScanner {
    /// Creates a scanner with no deadline
    pub fn new(scan: Arc<dyn IndexScan>, builder: RangeBuilder, metrics: Arc<ScanMetrics>) -> Self {
        Self {
            scan,
            builder,
            metrics,
            started: Instant::now(),
            deadline: None,
        }
    }

    /// Fail any scan still running `timeout` after this call
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.started = Instant::now();
        self.deadline = Some(self.started + timeout);
        self
    }

    pub fn builder(&self) -> &RangeBuilder {
        &self.builder
    }

    pub fn metrics(&self) -> &ScanMetrics {
        &self.metrics
    }

    /// Scan `predicate` in `shard`, optionally restricted to `bound`
    pub fn scan(
        &self,
        shard: &str,
        predicate: &Predicate,
        bound: Option<&Bounds>,
    ) -> EvalResult<ResultSet> {
        let spec = match bound {
            Some(b) => self.builder.build_bounded_range(shard, predicate, b)?,
            None => self.builder.build_range(shard, predicate)?,
        };
        Ok(self.scan_spec(&predicate.canonical(), &spec)?)
    }

    /// Scan a compiled term, reusing its prebuilt spec when unbounded
    pub fn scan_term(
        &self,
        shard: &str,
        term: &Term,
        bound: Option<&Bounds>,
    ) -> EvalResult<ResultSet> {
        match bound {
            None => Ok(self.scan_spec(&term.canonical, &term.spec)?),
            Some(b) => {
                let spec = self.builder.build_bounded_range(shard, &term.predicate, b)?;
                Ok(self.scan_spec(&term.canonical, &spec)?)
            }
        }
    }

    /// Run a prepared scan. `label` identifies the term in logs.
    pub fn scan_spec(&self, label: &str, spec: &ScanSpec) -> ScanResult<ResultSet> {
        let mut ids = Vec::new();
        let mut entries_read = 0u64;
        let outcome = self.collect(spec, &mut ids, &mut entries_read);
        self.metrics.add_entries_read(entries_read);

        if let Err(e) = outcome {
            self.metrics.increment_scans_failed();
            tracing::warn!(event = "LEAF_SCAN_FAILED", term = label, code = e.code(), error = %e);
            return Err(e);
        }

        let set = if ids.windows(2).all(|w| w[0] < w[1]) {
            ResultSet::from_sorted_unique(ids)
        } else {
            // several values or ranges interleave their document ids
            ResultSet::from_unsorted(ids)
        };
        self.metrics.add_ids_matched(set.len() as u64);
        tracing::debug!(
            event = "LEAF_SCAN_COMPLETE",
            term = label,
            ranges = spec.ranges.len(),
            entries = entries_read,
            matches = set.len(),
            narrowed = spec.narrowed,
        );
        Ok(set)
    }

    fn collect(
        &self,
        spec: &ScanSpec,
        ids: &mut Vec<DocumentId>,
        entries_read: &mut u64,
    ) -> ScanResult<()> {
        for range in &spec.ranges {
            self.check_deadline()?;
            self.metrics.increment_scans_opened();
            let cursor = CursorGuard::new(self.scan.open_scan(range)?);
            for item in cursor {
                let entry = item?;
                *entries_read += 1;
                self.check_deadline()?;
                if !spec.value_filter.accepts(&entry.value) {
                    continue;
                }
                let id = entry.document_id();
                if spec.doc_filter.as_ref().is_some_and(|b| !b.contains(&id)) {
                    continue;
                }
                ids.push(id);
            }
        }
        Ok(())
    }

    fn check_deadline(&self) -> ScanResult<()> {
        match self.deadline {
            Some(deadline) if Instant::now() >= deadline => Err(ScanError::timeout(
                self.started.elapsed().as_millis() as u64,
            )),
            _ => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::{FieldIndex, IndexEntry};

    const SHARD: &str = "20240101_0";

    fn scanner(entries: &[(&str, &str, &str)]) -> LeafScanner {
        let mut index = FieldIndex::new();
        for (field, value, uid) in entries {
            index.insert(SHARD, &IndexEntry::new(*field, *value, "T", *uid));
        }
        LeafScanner::new(Arc::new(index), RangeBuilder::default(), Arc::new(ScanMetrics::new()))
    }

    #[test]
    fn test_equality_round_trip() {
        let leaf = scanner(&[("F", "v", "id1")]);
        let set = leaf.scan(SHARD, &Predicate::eq("F", "v"), None).unwrap();
        assert_eq!(set.uids(), vec!["id1"]);
    }

    #[test]
    fn test_equality_does_not_match_longer_values() {
        let leaf = scanner(&[("F", "v", "1"), ("F", "vv", "2"), ("F", "u", "3")]);
        let set = leaf.scan(SHARD, &Predicate::eq("F", "v"), None).unwrap();
        assert_eq!(set.uids(), vec!["1"]);
    }

    #[test]
    fn test_bounded_range_boundaries() {
        let leaf = scanner(&[("F", "a", "1"), ("F", "b", "2"), ("F", "c", "3")]);
        let set = leaf
            .scan(SHARD, &Predicate::range("F", "a", true, "c", false), None)
            .unwrap();
        assert_eq!(set.uids(), vec!["1", "2"]);

        let set = leaf
            .scan(SHARD, &Predicate::range("F", "a", false, "c", true), None)
            .unwrap();
        assert_eq!(set.uids(), vec!["2", "3"]);
    }

    #[test]
    fn test_range_results_sorted_by_document_id() {
        let leaf = scanner(&[("F", "a", "9"), ("F", "b", "1"), ("F", "c", "5")]);
        let set = leaf
            .scan(SHARD, &Predicate::range("F", "a", true, "c", true), None)
            .unwrap();
        assert_eq!(set.uids(), vec!["1", "5", "9"]);
    }

    #[test]
    fn test_regex_filters_values() {
        let leaf = scanner(&[("F", "alice", "1"), ("F", "alan", "2"), ("F", "bob", "3")]);
        let set = leaf.scan(SHARD, &Predicate::regex("F", "ali.*"), None).unwrap();
        assert_eq!(set.uids(), vec!["1"]);
        let set = leaf.scan(SHARD, &Predicate::regex("F", "al(ice|an)"), None).unwrap();
        assert_eq!(set.uids(), vec!["1", "2"]);
    }

    #[test]
    fn test_bound_drops_out_of_range_ids() {
        let leaf = scanner(&[("F", "v", "1"), ("F", "v", "2"), ("F", "v", "3"), ("F", "w", "4")]);
        let bounds = Bounds::new(DocumentId::new("T", "2"), DocumentId::new("T", "3"));
        let set = leaf.scan(SHARD, &Predicate::eq("F", "v"), Some(&bounds)).unwrap();
        assert_eq!(set.uids(), vec!["2", "3"]);

        let set = leaf
            .scan(SHARD, &Predicate::range("F", "v", true, "w", true), Some(&bounds))
            .unwrap();
        assert_eq!(set.uids(), vec!["2", "3"]);
    }

    #[test]
    fn test_expired_deadline_times_out() {
        let leaf = scanner(&[("F", "v", "1")]).with_timeout(Duration::ZERO);
        let err = leaf.scan(SHARD, &Predicate::eq("F", "v"), None).unwrap_err();
        assert_eq!(err.code(), "INDEX_SCAN_TIMEOUT");
        assert_eq!(leaf.metrics().snapshot().scans_failed, 1);
    }

    #[test]
    fn test_metrics_recorded() {
        let leaf = scanner(&[("F", "v", "1"), ("F", "v", "2")]);
        leaf.scan(SHARD, &Predicate::eq("F", "v"), None).unwrap();
        let snap = leaf.metrics().snapshot();
        assert_eq!(snap.scans_opened, 1);
        assert_eq!(snap.entries_read, 2);
        assert_eq!(snap.ids_matched, 2);
    }
}
