//! Query planner subsystem
//!
//! Turns a parsed boolean expression into an [`EvalPlan`]: a numbered tree
//! whose indexed leaves carry ready-to-run scan specifications.
//!
//! # Range Translation
//!
//! - Equality: one value, half-open `[v\0, v\1)`
//! - Bounded range: inclusivity flags pass through unchanged
//! - Regex: longest literal prefix to prefix + sentinel; no prefix, no scan
//! - `geo:within_bounding_box`: one prefix range per covering geohash cell
//!
//! Raw inequalities, negated predicates and NOT nodes have no range
//! representation and are rejected with [`PlannerError`].

mod ast;
mod errors;
mod geo;
mod literal;
mod plan;
mod range;

pub use ast::{CompareOp, Expression, Predicate};
pub use errors::{PlannerError, PlannerResult};
pub use geo::{BoundingBox, WITHIN_BOUNDING_BOX};
pub use literal::literal_prefix;
pub use plan::{EvalPlan, NodeId, PlanNode, Term, TermId};
pub use range::{RangeBuilder, ScanSpec, ValueFilter};

/// Geohash helpers for geo field values
pub mod geohash {
    pub use super::geo::{cover, decode, encode, MAX_PRECISION};
}
