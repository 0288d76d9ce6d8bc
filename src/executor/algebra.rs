//! Set algebra over sorted result sets
//!
//! Pure functions, no I/O. All merges are linear in the input sizes.

use std::cmp::Ordering;

use crate::index::Bounds;

use super::result::ResultSet;

/// Two-pointer intersection. Returns immediately if either side is empty.
pub fn intersect(a: &ResultSet, b: &ResultSet) -> ResultSet {
    if a.is_empty() || b.is_empty() {
        return ResultSet::empty();
    }
    let (a, b) = (a.as_slice(), b.as_slice());
    let mut out = Vec::with_capacity(a.len().min(b.len()));
    let (mut i, mut j) = (0, 0);
    while i < a.len() && j < b.len() {
        match a[i].cmp(&b[j]) {
            Ordering::Less => i += 1,
            Ordering::Greater => j += 1,
            Ordering::Equal => {
                out.push(a[i].clone());
                i += 1;
                j += 1;
            }
        }
    }
    ResultSet::from_sorted_unique(out)
}

/// Sorted merge with de-duplication
pub fn union(a: &ResultSet, b: &ResultSet) -> ResultSet {
    if a.is_empty() {
        return b.clone();
    }
    if b.is_empty() {
        return a.clone();
    }
    let (a, b) = (a.as_slice(), b.as_slice());
    let mut out = Vec::with_capacity(a.len() + b.len());
    let (mut i, mut j) = (0, 0);
    while i < a.len() && j < b.len() {
        match a[i].cmp(&b[j]) {
            Ordering::Less => {
                out.push(a[i].clone());
                i += 1;
            }
            Ordering::Greater => {
                out.push(b[j].clone());
                j += 1;
            }
            Ordering::Equal => {
                out.push(a[i].clone());
                i += 1;
                j += 1;
            }
        }
    }
    out.extend_from_slice(&a[i..]);
    out.extend_from_slice(&b[j..]);
    ResultSet::from_sorted_unique(out)
}

/// Smallest and largest id, or `None` (unbounded) for an empty set
pub fn bounds(a: &ResultSet) -> Option<Bounds> {
    match (a.as_slice().first(), a.as_slice().last()) {
        (Some(min), Some(max)) => Some(Bounds::new(min.clone(), max.clone())),
        _ => None,
    }
}

/// Result of evaluating one plan node
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// The node cannot be resolved at the index layer and constrains nothing
    AllowAll,
    Matches(ResultSet),
}

impl Outcome {
    /// Conjunction; `AllowAll` is the identity
    pub fn and(self, other: Outcome) -> Outcome {
        match (self, other) {
            (Outcome::AllowAll, other) | (other, Outcome::AllowAll) => other,
            (Outcome::Matches(a), Outcome::Matches(b)) => Outcome::Matches(intersect(&a, &b)),
        }
    }

    /// Disjunction; `AllowAll` absorbs, since an unresolved branch may match
    /// any document
    pub fn or(self, other: Outcome) -> Outcome {
        match (self, other) {
            (Outcome::AllowAll, _) | (_, Outcome::AllowAll) => Outcome::AllowAll,
            (Outcome::Matches(a), Outcome::Matches(b)) => Outcome::Matches(union(&a, &b)),
        }
    }

    /// True only for a resolved, empty result
    pub fn is_empty(&self) -> bool {
        matches!(self, Outcome::Matches(set) if set.is_empty())
    }

    pub fn is_allow_all(&self) -> bool {
        matches!(self, Outcome::AllowAll)
    }

    /// Bounds of a resolved result
    pub fn bounds(&self) -> Option<Bounds> {
        match self {
            Outcome::Matches(set) => bounds(set),
            Outcome::AllowAll => None,
        }
    }

    /// Drop ids outside `b`; `AllowAll` is left untouched
    pub fn restrict(self, b: &Bounds) -> Outcome {
        match self {
            Outcome::Matches(set) => Outcome::Matches(set.restrict(b)),
            Outcome::AllowAll => Outcome::AllowAll,
        }
    }
}
