//! Field index subsystem
//!
//! The field index is a secondary sorted mapping from (field, value) to
//! document id, partitioned by shard. This module defines its key layout, the
//! range-scan primitive the evaluator consumes, and an in-memory store that
//! implements that primitive.
//!
//! # Invariants
//!
//! - Scans yield entries in key order
//! - Every opened cursor is closed exactly once, on every exit path
//! - Document ids are opaque and compared only lexicographically

mod btree;
mod errors;
mod key;
mod scan;

pub use btree::FieldIndex;
pub use errors::{ScanError, ScanResult};
pub use key::{
    Bounds, DocumentId, IndexEntry, IndexKey, ScanRange, FIELD_INDEX_PREFIX, MAX_SENTINEL, NULL,
    SOH,
};
pub use scan::{CursorGuard, IndexScan, ScanCursor, VecCursor};
