//! Field index key layout
//!
//! A field index entry is stored under
//!
//! ```text
//! row:               shard
//! column family:     fi\0FIELD
//! column qualifier:  value\0datatype\0uid
//! ```
//!
//! Keys order lexicographically on (row, column family, column qualifier), so
//! within one shard and field the entries sort by value, then datatype, then
//! uid. `String` ordering is byte-wise UTF-8, which matches code point order,
//! so `\0` sorts before every other character and `char::MAX` after.

use std::fmt;
use std::ops::Bound;

/// Separator between key components
pub const NULL: char = '\0';

/// Character immediately after [`NULL`], used to close an equality range
pub const SOH: char = '\u{1}';

/// Largest code point; appended to a prefix to close a prefix range
pub const MAX_SENTINEL: char = char::MAX;

/// Column family prefix of every field index key
pub const FIELD_INDEX_PREFIX: &str = "fi\0";

/// Composite document identifier: `datatype\0uid`.
///
/// Opaque to the evaluator; compared only lexicographically.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct DocumentId(String);

impl DocumentId {
    /// Create a document id from its datatype and uid
    pub fn new(datatype: &str, uid: &str) -> Self {
        let mut id = String::with_capacity(datatype.len() + uid.len() + 1);
        id.push_str(datatype);
        id.push(NULL);
        id.push_str(uid);
        Self(id)
    }

    /// Returns the encoded form
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns the datatype component
    pub fn datatype(&self) -> &str {
        self.0.split_once(NULL).map_or("", |(dt, _)| dt)
    }

    /// Returns the uid component
    pub fn uid(&self) -> &str {
        self.0.split_once(NULL).map_or(self.0.as_str(), |(_, uid)| uid)
    }
}

impl fmt::Display for DocumentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.datatype(), self.uid())
    }
}

/// One decoded field index entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexEntry {
    pub field: String,
    pub value: String,
    pub datatype: String,
    pub uid: String,
}

impl IndexEntry {
    /// Create an entry
    pub fn new(
        field: impl Into<String>,
        value: impl Into<String>,
        datatype: impl Into<String>,
        uid: impl Into<String>,
    ) -> Self {
        Self {
            field: field.into(),
            value: value.into(),
            datatype: datatype.into(),
            uid: uid.into(),
        }
    }

    /// Returns the composite document id this entry points at
    pub fn document_id(&self) -> DocumentId {
        DocumentId::new(&self.datatype, &self.uid)
    }
}

/// A fully encoded field index key
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct IndexKey {
    pub row: String,
    pub column_family: String,
    pub column_qualifier: String,
}

impl IndexKey {
    /// Key for `shard` / `field` with an arbitrary qualifier.
    ///
    /// Range builders use this with partial qualifiers (`value\0`, a prefix,
    /// a prefix followed by the sentinel).
    pub fn field_index(shard: &str, field: &str, qualifier: impl Into<String>) -> Self {
        Self {
            row: shard.to_string(),
            column_family: format!("{}{}", FIELD_INDEX_PREFIX, field),
            column_qualifier: qualifier.into(),
        }
    }

    /// Key under which `entry` is stored in `shard`
    pub fn for_entry(shard: &str, entry: &IndexEntry) -> Self {
        let qualifier = format!(
            "{}{}{}{}{}",
            entry.value, NULL, entry.datatype, NULL, entry.uid
        );
        Self::field_index(shard, &entry.field, qualifier)
    }

    /// Returns the field name encoded in the column family
    pub fn field(&self) -> Option<&str> {
        self.column_family.strip_prefix(FIELD_INDEX_PREFIX)
    }

    /// Decodes a stored key back into an entry.
    ///
    /// The qualifier is split from the right so only the last two separators
    /// are significant.
    pub fn decode(&self) -> Option<IndexEntry> {
        let field = self.field()?;
        let mut parts = self.column_qualifier.rsplitn(3, NULL);
        let uid = parts.next()?;
        let datatype = parts.next()?;
        let value = parts.next()?;
        Some(IndexEntry::new(field, value, datatype, uid))
    }
}

/// A sorted range over field index keys
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanRange {
    pub start: IndexKey,
    pub start_inclusive: bool,
    pub end: IndexKey,
    pub end_inclusive: bool,
}

impl ScanRange {
    /// Create a range
    pub fn new(start: IndexKey, start_inclusive: bool, end: IndexKey, end_inclusive: bool) -> Self {
        Self {
            start,
            start_inclusive,
            end,
            end_inclusive,
        }
    }

    /// Returns true if `key` falls inside this range
    pub fn contains(&self, key: &IndexKey) -> bool {
        let after_start = if self.start_inclusive {
            key >= &self.start
        } else {
            key > &self.start
        };
        let before_end = if self.end_inclusive {
            key <= &self.end
        } else {
            key < &self.end
        };
        after_start && before_end
    }

    /// Returns true if no key can fall inside this range
    pub fn is_empty(&self) -> bool {
        match self.start.cmp(&self.end) {
            std::cmp::Ordering::Greater => true,
            std::cmp::Ordering::Equal => !(self.start_inclusive && self.end_inclusive),
            std::cmp::Ordering::Less => false,
        }
    }

    /// Returns the range as `std::ops::Bound` pairs for `BTreeMap::range`
    pub fn bounds(&self) -> (Bound<&IndexKey>, Bound<&IndexKey>) {
        let start = if self.start_inclusive {
            Bound::Included(&self.start)
        } else {
            Bound::Excluded(&self.start)
        };
        let end = if self.end_inclusive {
            Bound::Included(&self.end)
        } else {
            Bound::Excluded(&self.end)
        };
        (start, end)
    }
}

impl fmt::Display for ScanRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}{:?} {:?} {:?} .. {:?} {:?}{}",
            if self.start_inclusive { '[' } else { '(' },
            self.start.row,
            self.start.column_family,
            self.start.column_qualifier,
            self.end.column_family,
            self.end.column_qualifier,
            if self.end_inclusive { ']' } else { ')' },
        )
    }
}

/// Smallest and largest document id of a known result, used to prune scans
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Bounds {
    pub min: DocumentId,
    pub max: DocumentId,
}

impl Bounds {
    /// Create bounds; `min` must not exceed `max`
    pub fn new(min: DocumentId, max: DocumentId) -> Self {
        debug_assert!(min <= max);
        Self { min, max }
    }

    /// Returns true if `id` lies within `[min, max]`
    pub fn contains(&self, id: &DocumentId) -> bool {
        id >= &self.min && id <= &self.max
    }
}
