//! Range-scan primitive interface
//!
//! The evaluator never talks to a store directly. It opens one cursor per leaf
//! scan through [`IndexScan`] and always releases it through [`CursorGuard`],
//! including when the scan fails part way through.

use super::errors::ScanResult;
use super::key::{IndexEntry, ScanRange};

/// A forward, sorted cursor over field index entries.
///
/// Items arrive in key order. A cursor may fail mid-stream by yielding an
/// `Err`; callers stop at the first error.
pub trait ScanCursor: Iterator<Item = ScanResult<IndexEntry>> + Send {
    /// Release the scan resource. Called exactly once by [`CursorGuard`].
    fn close(&mut self);
}

/// Store-side range scan, bound to a key-value store client
pub trait IndexScan: Send + Sync {
    /// Open a scan over `range`. The range keys carry the shard as their row.
    fn open_scan(&self, range: &ScanRange) -> ScanResult<Box<dyn ScanCursor>>;

    /// Whether keys order by field, value, then document id, so a scan can be
    /// narrowed to a document id interval within one value
    fn supports_doc_id_bounds(&self) -> bool {
        true
    }
}

/// Owns an open cursor and closes it when dropped
pub struct CursorGuard {
    cursor: Box<dyn ScanCursor>,
    closed: bool,
}

impl CursorGuard {
    /// Take ownership of an open cursor
    pub fn new(cursor: Box<dyn ScanCursor>) -> Self {
        Self {
            cursor,
            closed: false,
        }
    }

    /// Close the cursor now instead of at drop
    pub fn close(mut self) {
        self.close_once();
    }

    fn close_once(&mut self) {
        if !self.closed {
            self.closed = true;
            self.cursor.close();
        }
    }
}

impl Iterator for CursorGuard {
    type Item = ScanResult<IndexEntry>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.closed {
            return None;
        }
        self.cursor.next()
    }
}

impl Drop for CursorGuard {
    fn drop(&mut self) {
        self.close_once();
    }
}

/// Cursor over entries that were already materialized
pub struct VecCursor {
    entries: std::vec::IntoIter<IndexEntry>,
}

impl VecCursor {
    /// Create a cursor that yields `entries` in order
    pub fn new(entries: Vec<IndexEntry>) -> Self {
        Self {
            entries: entries.into_iter(),
        }
    }
}

impl Iterator for VecCursor {
    type Item = ScanResult<IndexEntry>;

    fn next(&mut self) -> Option<Self::Item> {
        self.entries.next().map(Ok)
    }
}

impl ScanCursor for VecCursor {
    fn close(&mut self) {
        // drop anything not consumed
        self.entries = Vec::new().into_iter();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::ScanError;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    struct TrackedCursor {
        items: Vec<ScanResult<IndexEntry>>,
        closes: Arc<AtomicUsize>,
    }

    impl Iterator for TrackedCursor {
        type Item = ScanResult<IndexEntry>;

        fn next(&mut self) -> Option<Self::Item> {
            if self.items.is_empty() {
                None
            } else {
                Some(self.items.remove(0))
            }
        }
    }

    impl ScanCursor for TrackedCursor {
        fn close(&mut self) {
            self.closes.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[test]
    fn test_guard_closes_on_drop() {
        let closes = Arc::new(AtomicUsize::new(0));
        let cursor = TrackedCursor {
            items: vec![Ok(IndexEntry::new("F", "v", "T", "1"))],
            closes: Arc::clone(&closes),
        };

        {
            let mut guard = CursorGuard::new(Box::new(cursor));
            assert!(guard.next().is_some());
        }
        assert_eq!(closes.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_guard_closes_once_after_error() {
        let closes = Arc::new(AtomicUsize::new(0));
        let cursor = TrackedCursor {
            items: vec![Err(ScanError::store("disk")), Ok(IndexEntry::new("F", "v", "T", "1"))],
            closes: Arc::clone(&closes),
        };

        let mut guard = CursorGuard::new(Box::new(cursor));
        assert!(matches!(guard.next(), Some(Err(_))));
        guard.close();
        assert_eq!(closes.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_vec_cursor_yields_in_order() {
        let cursor = VecCursor::new(vec![
            IndexEntry::new("F", "a", "T", "1"),
            IndexEntry::new("F", "b", "T", "2"),
        ]);
        let values: Vec<String> = cursor.map(|e| e.unwrap().value).collect();
        assert_eq!(values, vec!["a", "b"]);
    }
}
