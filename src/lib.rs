//! shardindex - indexed boolean query evaluation over a sharded field index
//!
//! Narrows a query to the documents of a shard that can possibly match it,
//! using only the field index. Leaves on unindexed fields are deferred to
//! document-level evaluation by the caller.

pub mod config;
pub mod executor;
pub mod index;
pub mod observability;
pub mod planner;

pub use config::{EvaluatorConfig, Strategy};
pub use executor::{Candidates, EvalError, EvalResult, Evaluator, ResultSet, TermCost};
pub use index::{DocumentId, FieldIndex, IndexEntry, IndexScan};
pub use planner::{Expression, Predicate};
