//! BTreeSet-backed field index
//!
//! An in-memory store holding field index keys for any number of shards.
//! Iteration follows key order, so a scan returns entries exactly as a sorted
//! key-value store would.

use std::collections::BTreeSet;

use super::errors::ScanResult;
use super::key::{IndexEntry, IndexKey, ScanRange};
use super::scan::{IndexScan, ScanCursor, VecCursor};

/// In-memory field index
#[derive(Debug, Default)]
pub struct FieldIndex {
    keys: BTreeSet<IndexKey>,
}

impl FieldIndex {
    /// Creates a new empty field index
    pub fn new() -> Self {
        Self {
            keys: BTreeSet::new(),
        }
    }

    /// Insert an entry into `shard`. Returns false if it was already present.
    pub fn insert(&mut self, shard: &str, entry: &IndexEntry) -> bool {
        self.keys.insert(IndexKey::for_entry(shard, entry))
    }

    /// Remove an entry from `shard`. Returns false if it was absent.
    pub fn remove(&mut self, shard: &str, entry: &IndexEntry) -> bool {
        self.keys.remove(&IndexKey::for_entry(shard, entry))
    }

    /// Decoded entries inside `range`, in key order.
    ///
    /// Keys that do not decode as field index entries are skipped.
    pub fn lookup_range(&self, range: &ScanRange) -> Vec<IndexEntry> {
        // BTreeSet::range panics on an inverted or empty-exclusive range
        if range.is_empty() {
            return Vec::new();
        }
        self.keys
            .range::<IndexKey, _>(range.bounds())
            .filter_map(IndexKey::decode)
            .collect()
    }

    /// Returns the number of stored keys
    pub fn len(&self) -> usize {
        self.keys.len()
    }

    /// Returns true if nothing is stored
    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}

impl FromIterator<(String, IndexEntry)> for FieldIndex {
    fn from_iter<I: IntoIterator<Item = (String, IndexEntry)>>(iter: I) -> Self {
        let mut index = FieldIndex::new();
        for (shard, entry) in iter {
            index.insert(&shard, &entry);
        }
        index
    }
}

impl IndexScan for FieldIndex {
    fn open_scan(&self, range: &ScanRange) -> ScanResult<Box<dyn ScanCursor>> {
        Ok(Box::new(VecCursor::new(self.lookup_range(range))))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::NULL;

    fn qualifier_range(shard: &str, field: &str, start: &str, end: &str) -> ScanRange {
        ScanRange::new(
            IndexKey::field_index(shard, field, start),
            true,
            IndexKey::field_index(shard, field, end),
            false,
        )
    }

    #[test]
    fn test_insert_and_lookup() {
        let mut index = FieldIndex::new();
        assert!(index.insert("s0", &IndexEntry::new("NAME", "alice", "T", "u2")));
        assert!(index.insert("s0", &IndexEntry::new("NAME", "alice", "T", "u1")));
        assert!(index.insert("s0", &IndexEntry::new("NAME", "bob", "T", "u3")));
        assert!(!index.insert("s0", &IndexEntry::new("NAME", "alice", "T", "u1")));
        assert_eq!(index.len(), 3);

        let range = qualifier_range("s0", "NAME", &format!("alice{}", NULL), "alice\u{1}");
        let uids: Vec<String> = index.lookup_range(&range).into_iter().map(|e| e.uid).collect();
        assert_eq!(uids, vec!["u1", "u2"]);
    }

    #[test]
    fn test_shards_are_isolated() {
        let mut index = FieldIndex::new();
        index.insert("s0", &IndexEntry::new("F", "v", "T", "a"));
        index.insert("s1", &IndexEntry::new("F", "v", "T", "b"));

        let range = qualifier_range("s1", "F", "v\0", "v\u{1}");
        let entries = index.lookup_range(&range);
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].uid, "b");
    }

    #[test]
    fn test_remove() {
        let mut index = FieldIndex::new();
        let entry = IndexEntry::new("F", "v", "T", "a");
        index.insert("s", &entry);
        assert!(index.remove("s", &entry));
        assert!(!index.remove("s", &entry));
        assert!(index.is_empty());
    }

    #[test]
    fn test_empty_range_does_not_panic() {
        let mut index = FieldIndex::new();
        index.insert("s", &IndexEntry::new("F", "v", "T", "a"));
        let inverted = qualifier_range("s", "F", "z", "a");
        assert!(index.lookup_range(&inverted).is_empty());
    }

    #[test]
    fn test_scan_through_trait() {
        let index: FieldIndex = vec![
            ("s".to_string(), IndexEntry::new("F", "a", "T", "1")),
            ("s".to_string(), IndexEntry::new("F", "b", "T", "2")),
        ]
        .into_iter()
        .collect();

        let range = qualifier_range("s", "F", "a", "c");
        let cursor = index.open_scan(&range).unwrap();
        let uids: Vec<String> = cursor.map(|e| e.unwrap().uid).collect();
        assert_eq!(uids, vec!["1", "2"]);
    }
}
