//! Predicate to scan-range translation
//!
//! Stored qualifiers are `value\0datatype\0uid`, so range ends are expressed
//! on partial qualifiers:
//!
//! | Predicate | start | end |
//! |---|---|---|
//! | `F == v` | `v\0` inclusive | `v\1` exclusive |
//! | `F >= lo` | `lo` inclusive | |
//! | `F > lo` | `lo\0<MAX>` exclusive | |
//! | `F <= hi` | | `hi\0<MAX>` inclusive |
//! | `F < hi` | | `hi` exclusive |
//! | `F =~ p` | `prefix` inclusive | `prefix<MAX>` exclusive |
//!
//! Bounded-range inclusivity flags pass through to the range unchanged; only
//! the key material carries the suffix that makes the flag apply to the whole
//! value rather than to a single stored key.

use regex::Regex;

use crate::index::{Bounds, IndexKey, ScanRange, MAX_SENTINEL, NULL, SOH};

use super::ast::Predicate;
use super::errors::{PlannerError, PlannerResult};
use super::geo::{self, BoundingBox, WITHIN_BOUNDING_BOX};
use super::literal::literal_prefix;

/// Check applied to each scanned value before its document id is kept
#[derive(Debug, Clone)]
pub enum ValueFilter {
    /// Every value inside the ranges matches
    All,
    /// Value must fully match the pattern
    Regex(Regex),
    /// Value must decode to a geohash cell touching the box
    Within(BoundingBox),
}

impl ValueFilter {
    /// Returns true if `value` satisfies the predicate
    pub fn accepts(&self, value: &str) -> bool {
        match self {
            ValueFilter::All => true,
            ValueFilter::Regex(re) => re.is_match(value),
            ValueFilter::Within(bbox) => {
                geo::decode(value).is_some_and(|cell| bbox.intersects(&cell))
            }
        }
    }
}

/// Everything a leaf scan needs: key ranges plus post-scan filters
#[derive(Debug, Clone)]
pub struct ScanSpec {
    /// Sorted, non-overlapping key ranges
    pub ranges: Vec<ScanRange>,
    pub value_filter: ValueFilter,
    /// Document ids outside these bounds are dropped after the scan
    pub doc_filter: Option<Bounds>,
    /// True when a bound overlay narrowed the key ranges themselves
    pub narrowed: bool,
}

impl ScanSpec {
    fn single(range: ScanRange, value_filter: ValueFilter, doc_filter: Option<&Bounds>) -> Self {
        Self {
            ranges: vec![range],
            value_filter,
            doc_filter: doc_filter.cloned(),
            narrowed: false,
        }
    }

    /// Returns the range if this spec has exactly one
    pub fn range(&self) -> Option<&ScanRange> {
        match self.ranges.as_slice() {
            [range] => Some(range),
            _ => None,
        }
    }
}

/// Translates predicates into scan specifications for one shard
#[derive(Debug, Clone)]
pub struct RangeBuilder {
    doc_id_bounds: bool,
    max_geo_cells: usize,
}

impl Default for RangeBuilder {
    fn default() -> Self {
        Self {
            doc_id_bounds: true,
            max_geo_cells: 32,
        }
    }
}

impl RangeBuilder {
    /// Creates a builder.
    ///
    /// `doc_id_bounds` must only be true when the store orders keys by field,
    /// value, then document id.
    pub fn new(doc_id_bounds: bool, max_geo_cells: usize) -> Self {
        Self {
            doc_id_bounds,
            max_geo_cells: max_geo_cells.max(1),
        }
    }

    /// Build the unbounded scan for `predicate` in `shard`
    pub fn build_range(&self, shard: &str, predicate: &Predicate) -> PlannerResult<ScanSpec> {
        self.build(shard, predicate, None)
    }

    /// Build the scan for `predicate`, restricted to document ids in `bounds`.
    ///
    /// Equality scans are narrowed at the key level when the store supports
    /// it. Every other case keeps the unbounded key ranges and drops
    /// out-of-bounds ids after the scan, which is always correct.
    pub fn build_bounded_range(
        &self,
        shard: &str,
        predicate: &Predicate,
        bounds: &Bounds,
    ) -> PlannerResult<ScanSpec> {
        self.build(shard, predicate, Some(bounds))
    }

    fn build(
        &self,
        shard: &str,
        predicate: &Predicate,
        bounds: Option<&Bounds>,
    ) -> PlannerResult<ScanSpec> {
        match predicate {
            Predicate::Equals { field, value } => Ok(self.equals(shard, field, value, bounds)),
            Predicate::BoundedRange {
                field,
                lower,
                lower_inclusive,
                upper,
                upper_inclusive,
            } => {
                if lower > upper {
                    return Err(PlannerError::unsupported(
                        predicate.canonical(),
                        "lower bound exceeds upper bound",
                    ));
                }
                let start = if *lower_inclusive {
                    lower.clone()
                } else {
                    format!("{}{}{}", lower, NULL, MAX_SENTINEL)
                };
                let end = if *upper_inclusive {
                    format!("{}{}{}", upper, NULL, MAX_SENTINEL)
                } else {
                    upper.clone()
                };
                let range = ScanRange::new(
                    IndexKey::field_index(shard, field, start),
                    *lower_inclusive,
                    IndexKey::field_index(shard, field, end),
                    *upper_inclusive,
                );
                Ok(ScanSpec::single(range, ValueFilter::All, bounds))
            }
            Predicate::Regex { field, pattern } => {
                let prefix = literal_prefix(pattern).ok_or_else(|| {
                    PlannerError::unsupported(predicate.canonical(), "regex has no leading literal")
                })?;
                let re = Regex::new(&format!("^(?:{})$", pattern)).map_err(|e| {
                    let reason = format!("invalid regex: {}", e);
                    PlannerError::unsupported(predicate.canonical(), reason)
                })?;
                Ok(ScanSpec::single(
                    prefix_range(shard, field, &prefix),
                    ValueFilter::Regex(re),
                    bounds,
                ))
            }
            Predicate::Function { name, args } if name == WITHIN_BOUNDING_BOX => {
                let (field, coords) = args.split_first().ok_or_else(|| {
                    PlannerError::unsupported(predicate.canonical(), "missing field argument")
                })?;
                let bbox = BoundingBox::from_args(coords)
                    .map_err(|reason| PlannerError::unsupported(predicate.canonical(), reason))?;
                let cells = geo::cover(&bbox, self.max_geo_cells).ok_or_else(|| {
                    PlannerError::unsupported(
                        predicate.canonical(),
                        format!("box needs more than {} geohash cells", self.max_geo_cells),
                    )
                })?;
                let ranges = cells
                    .iter()
                    .map(|cell| prefix_range(shard, field, cell))
                    .collect();
                Ok(ScanSpec {
                    ranges,
                    value_filter: ValueFilter::Within(bbox),
                    doc_filter: bounds.cloned(),
                    narrowed: false,
                })
            }
            Predicate::Function { name, .. } => Err(PlannerError::unsupported(
                predicate.canonical(),
                format!("function '{}' has no index representation", name),
            )),
            Predicate::Compare { .. } => Err(PlannerError::unsupported(
                predicate.canonical(),
                "raw inequality must be rewritten into a bounded range",
            )),
            Predicate::NotEquals { .. } => Err(PlannerError::unsupported(
                predicate.canonical(),
                "negated equality",
            )),
            Predicate::NotRegex { .. } => Err(PlannerError::unsupported(
                predicate.canonical(),
                "negated regex",
            )),
        }
    }

    fn equals(&self, shard: &str, field: &str, value: &str, bounds: Option<&Bounds>) -> ScanSpec {
        match bounds {
            Some(b) if self.doc_id_bounds => {
                // value\0datatype\0uid == value\0 + document id
                let start = format!("{}{}{}", value, NULL, b.min.as_str());
                let end = format!("{}{}{}", value, NULL, b.max.as_str());
                ScanSpec {
                    ranges: vec![ScanRange::new(
                        IndexKey::field_index(shard, field, start),
                        true,
                        IndexKey::field_index(shard, field, end),
                        true,
                    )],
                    value_filter: ValueFilter::All,
                    doc_filter: None,
                    narrowed: true,
                }
            }
            _ => {
                let range = ScanRange::new(
                    IndexKey::field_index(shard, field, format!("{}{}", value, NULL)),
                    true,
                    IndexKey::field_index(shard, field, format!("{}{}", value, SOH)),
                    false,
                );
                ScanSpec::single(range, ValueFilter::All, bounds)
            }
        }
    }
}

fn prefix_range(shard: &str, field: &str, prefix: &str) -> ScanRange {
    ScanRange::new(
        IndexKey::field_index(shard, field, prefix),
        true,
        IndexKey::field_index(shard, field, format!("{}{}", prefix, MAX_SENTINEL)),
        false,
    )
}
