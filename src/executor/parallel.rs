//! Parallel per-term evaluation
//!
//! Every distinct term of the plan is scanned on a blocking worker, at most
//! `pool_size` at a time. The And/Or recursion then runs over the
//! materialized results without touching the store again.
//!
//! # Invariants
//!
//! - Each distinct term is scanned at most once per evaluation
//! - Any failed scan fails the evaluation with the first error observed
//! - Every spawned task is awaited before returning, success or not
//! - Once a failure is seen, no further scans are spawned

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::Semaphore;
use tokio::task::{JoinError, JoinSet};

use crate::index::ScanError;
use crate::planner::{EvalPlan, NodeId, PlanNode, TermId};

use super::algebra::Outcome;
use super::errors::{EvalError, EvalResult};
use super::leaf::LeafScanner;
use super::result::ResultSet;

type TermOutput = (TermId, EvalResult<ResultSet>);

/// Evaluator that scans all terms up front on a bounded pool
pub struct ParallelEvaluator {
    leaf: Arc<LeafScanner>,
    permits: Arc<Semaphore>,
}

impl ParallelEvaluator {
    /// Creates an evaluator allowing `pool_size` concurrent scans
    pub fn new(leaf: Arc<LeafScanner>, pool_size: usize) -> Self {
        Self {
            leaf,
            permits: Arc::new(Semaphore::new(pool_size.max(1))),
        }
    }

    /// Scan every term, then combine
    pub async fn evaluate(&self, plan: &EvalPlan) -> EvalResult<Outcome> {
        let results = self.scan_all(plan).await?;
        Ok(combine(plan, plan.root(), &results))
    }

    async fn scan_all(&self, plan: &EvalPlan) -> EvalResult<HashMap<TermId, ResultSet>> {
        let mut tasks: JoinSet<TermOutput> = JoinSet::new();
        let mut results = HashMap::with_capacity(plan.term_count());
        let mut first_error: Option<EvalError> = None;

        for term in plan.terms() {
            // Acquire before spawning so at most pool_size scans are in flight
            let permit = match Arc::clone(&self.permits).acquire_owned().await {
                Ok(permit) => permit,
                Err(e) => {
                    first_error.get_or_insert(ScanError::worker(e.to_string()).into());
                    break;
                }
            };

            while let Some(joined) = tasks.try_join_next() {
                record(joined, &mut results, &mut first_error);
            }
            if first_error.is_some() {
                break;
            }

            let leaf = Arc::clone(&self.leaf);
            let shard = plan.shard().to_string();
            let term = term.clone();
            tasks.spawn_blocking(move || {
                let _permit = permit;
                (term.id, leaf.scan_term(&shard, &term, None))
            });
        }

        // Drain everything, including tasks still running after a failure
        while let Some(joined) = tasks.join_next().await {
            record(joined, &mut results, &mut first_error);
        }

        match first_error {
            Some(e) => {
                tracing::warn!(event = "PARALLEL_SCAN_FAILED", code = e.code(), error = %e);
                Err(e)
            }
            None => {
                tracing::debug!(event = "PARALLEL_SCAN_COMPLETE", terms = results.len());
                Ok(results)
            }
        }
    }
}

fn record(
    joined: Result<TermOutput, JoinError>,
    results: &mut HashMap<TermId, ResultSet>,
    first_error: &mut Option<EvalError>,
) {
    match joined {
        Ok((id, Ok(set))) => {
            results.insert(id, set);
        }
        Ok((_, Err(e))) => {
            first_error.get_or_insert(e);
        }
        Err(e) => {
            first_error.get_or_insert(ScanError::worker(e.to_string()).into());
        }
    }
}

/// And/Or recursion over materialized term results
fn combine(plan: &EvalPlan, id: NodeId, results: &HashMap<TermId, ResultSet>) -> Outcome {
    match plan.node(id) {
        PlanNode::Term(term) => Outcome::Matches(results.get(term).cloned().unwrap_or_default()),
        PlanNode::Unresolved(_) => Outcome::AllowAll,
        PlanNode::And(children) => {
            let mut running = Outcome::AllowAll;
            for child in children {
                running = running.and(combine(plan, *child, results));
                if running.is_empty() {
                    break;
                }
            }
            running
        }
        PlanNode::Or(children) => children
            .iter()
            .fold(Outcome::Matches(ResultSet::empty()), |acc, child| {
                acc.or(combine(plan, *child, results))
            }),
    }
}
