//! Result types for index evaluation

use crate::index::{Bounds, DocumentId};

/// Ordered, de-duplicated set of document ids
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResultSet {
    ids: Vec<DocumentId>,
}

impl ResultSet {
    /// Creates an empty result
    pub fn empty() -> Self {
        Self::default()
    }

    /// Build from ids in any order, with duplicates
    pub fn from_unsorted(mut ids: Vec<DocumentId>) -> Self {
        ids.sort_unstable();
        ids.dedup();
        Self { ids }
    }

    /// Build from ids already sorted ascending and unique
    pub(crate) fn from_sorted_unique(ids: Vec<DocumentId>) -> Self {
        debug_assert!(ids.windows(2).all(|w| w[0] < w[1]));
        Self { ids }
    }

    /// Returns true if no documents matched
    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// Returns the number of ids
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    /// Returns the ids as a sorted slice
    pub fn as_slice(&self) -> &[DocumentId] {
        &self.ids
    }

    /// Returns the uid component of every id, in id order
    pub fn uids(&self) -> Vec<&str> {
        self.ids.iter().map(DocumentId::uid).collect()
    }

    /// Returns true if `id` is present
    pub fn contains(&self, id: &DocumentId) -> bool {
        self.ids.binary_search(id).is_ok()
    }

    /// Drop every id outside `bounds`
    pub fn restrict(mut self, bounds: &Bounds) -> Self {
        self.ids.retain(|id| bounds.contains(id));
        self
    }
}

impl FromIterator<DocumentId> for ResultSet {
    fn from_iter<I: IntoIterator<Item = DocumentId>>(iter: I) -> Self {
        Self::from_unsorted(iter.into_iter().collect())
    }
}

impl IntoIterator for ResultSet {
    type Item = DocumentId;
    type IntoIter = std::vec::IntoIter<DocumentId>;

    fn into_iter(self) -> Self::IntoIter {
        self.ids.into_iter()
    }
}

/// What the field index could establish about a query
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Candidates {
    /// Only these documents can satisfy the query
    Narrowed(ResultSet),
    /// No indexed term constrains the query; every document is a candidate
    Unrestricted,
}

impl Candidates {
    /// Returns the narrowed set, if any
    pub fn as_set(&self) -> Option<&ResultSet> {
        match self {
            Candidates::Narrowed(set) => Some(set),
            Candidates::Unrestricted => None,
        }
    }

    /// Consumes self, returning the narrowed set, if any
    pub fn into_set(self) -> Option<ResultSet> {
        match self {
            Candidates::Narrowed(set) => Some(set),
            Candidates::Unrestricted => None,
        }
    }

    pub fn is_unrestricted(&self) -> bool {
        matches!(self, Candidates::Unrestricted)
    }
}
