//! Query evaluation subsystem for shardindex
//!
//! Resolves a boolean expression into the set of candidate document ids of
//! one shard by scanning the field index.
//!
//! # Evaluation Flow
//!
//! 1. Compile the expression into an `EvalPlan`, rejecting negations and
//!    unsupported indexed predicates before any scan
//! 2. Pick the strategy (serial, parallel, cost-ordered)
//! 3. Scan each indexed term through `LeafScanner`
//! 4. Combine with the set algebra: And intersects, Or unions, unindexed
//!    leaves are the identity of And and absorb Or
//!
//! # Invariants
//!
//! - All strategies return the same result for the same plan and index state
//! - Results are sorted by document id and contain no duplicates
//! - A failed scan fails the evaluation; it is never reported as empty
//! - Every cursor opened is closed on every exit path

mod algebra;
mod cost;
mod errors;
mod evaluator;
mod leaf;
mod parallel;
mod result;
mod serial;

pub use algebra::{bounds, intersect, union, Outcome};
pub use cost::{CostOrderedEvaluator, CostTable, TermCost};
pub use errors::{EvalError, EvalResult, Severity};
pub use evaluator::Evaluator;
pub use leaf::LeafScanner;
pub use parallel::ParallelEvaluator;
pub use result::{Candidates, ResultSet};
pub use serial::SerialEvaluator;
