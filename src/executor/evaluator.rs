//! Evaluator facade
//!
//! Entry point for resolving a query expression against one shard of the
//! field index. Compiles the expression, picks the strategy, runs it and
//! reports the candidate documents.

use std::collections::HashSet;
use std::sync::Arc;

use crate::config::{EvaluatorConfig, Strategy};
use crate::index::{IndexScan, ScanError};
use crate::observability::{MetricsSnapshot, ObservationScope, ScanMetrics};
use crate::planner::{EvalPlan, Expression, RangeBuilder};

use super::algebra::Outcome;
use super::cost::{CostOrderedEvaluator, TermCost};
use super::errors::{EvalError, EvalResult};
use super::leaf::LeafScanner;
use super::parallel::ParallelEvaluator;
use super::result::Candidates;
use super::serial::SerialEvaluator;

/// Resolves query expressions into candidate document sets
///
/// One evaluator may serve many concurrent evaluations; each call builds
/// its own plan and scan deadline.
pub struct Evaluator {
    scan: Arc<dyn IndexScan>,
    config: EvaluatorConfig,
    costs: Option<Arc<dyn TermCost>>,
    metrics: Arc<ScanMetrics>,
}

impl Evaluator {
    /// Creates an evaluator over `scan`. Fails if `config` is invalid.
    pub fn new(scan: Arc<dyn IndexScan>, config: EvaluatorConfig) -> EvalResult<Self> {
        config.validate()?;
        Ok(Self {
            scan,
            config,
            costs: None,
            metrics: Arc::new(ScanMetrics::new()),
        })
    }

    /// Supply the cost source required by [`Strategy::CostOrdered`]
    pub fn with_cost_source(mut self, costs: Arc<dyn TermCost>) -> Self {
        self.costs = Some(costs);
        self
    }

    pub fn config(&self) -> &EvaluatorConfig {
        &self.config
    }

    /// Counters accumulated over every evaluation so far
    pub fn metrics(&self) -> MetricsSnapshot {
        self.metrics.snapshot()
    }

    /// Evaluate with the configured default strategy
    pub async fn evaluate_configured(
        &self,
        shard: &str,
        expression: &Expression,
        indexed_fields: &HashSet<String>,
    ) -> EvalResult<Candidates> {
        self.evaluate(shard, expression, indexed_fields, self.config.strategy)
            .await
    }

    /// Evaluate `expression` against `shard`.
    ///
    /// Leaves on fields outside `indexed_fields` constrain nothing. Returns
    /// [`Candidates::Unrestricted`] when no indexed term narrows the query.
    ///
    /// # Errors
    ///
    /// - `UnsupportedPredicate` before any scan, for negations and indexed
    ///   predicates with no range form
    /// - `Configuration` before any scan, for cost ordering without a cost
    ///   source
    /// - `Scan` when any leaf scan fails or times out
    pub async fn evaluate(
        &self,
        shard: &str,
        expression: &Expression,
        indexed_fields: &HashSet<String>,
        strategy: Strategy,
    ) -> EvalResult<Candidates> {
        self.metrics.increment_evaluations();
        let scope = ObservationScope::with_fields(
            "INDEX_EVAL",
            &[("shard", shard), ("strategy", strategy.as_str())],
        );

        match self.run(shard, expression, indexed_fields, strategy).await {
            Ok(candidates) => {
                let matches = match &candidates {
                    Candidates::Narrowed(set) => set.len().to_string(),
                    Candidates::Unrestricted => "unrestricted".to_string(),
                };
                scope.complete_with_fields(&[("matches", matches.as_str())]);
                Ok(candidates)
            }
            Err(e) => {
                self.metrics.increment_evaluations_failed();
                scope.fail(e.code(), &e.to_string());
                Err(e)
            }
        }
    }

    async fn run(
        &self,
        shard: &str,
        expression: &Expression,
        indexed_fields: &HashSet<String>,
        strategy: Strategy,
    ) -> EvalResult<Candidates> {
        if strategy == Strategy::CostOrdered && self.costs.is_none() {
            return Err(EvalError::configuration(
                "cost_ordered strategy requires a cost source",
            ));
        }

        let builder = RangeBuilder::new(
            self.config.doc_id_bounds && self.scan.supports_doc_id_bounds(),
            self.config.max_geo_cells,
        );
        let plan = EvalPlan::compile(shard, expression, indexed_fields, &builder)?;
        let strategy = self.resolve(strategy, &plan);
        tracing::debug!(
            event = "INDEX_PLAN_COMPILED",
            shard,
            terms = plan.term_count(),
            nodes = plan.node_count(),
            strategy = strategy.as_str(),
        );

        let mut leaf =
            LeafScanner::new(Arc::clone(&self.scan), builder, Arc::clone(&self.metrics));
        if let Some(timeout) = self.config.scan_timeout() {
            leaf = leaf.with_timeout(timeout);
        }

        let leaf = Arc::new(leaf);
        let outcome = match strategy {
            Strategy::Parallel => {
                ParallelEvaluator::new(leaf, self.config.worker_pool_size)
                    .evaluate(&plan)
                    .await?
            }
            _ => {
                // Cursor reads block; keep them off the runtime's worker threads
                let costs = match strategy {
                    Strategy::CostOrdered => self.costs.clone(),
                    _ => None,
                };
                tokio::task::spawn_blocking(move || match costs {
                    Some(costs) => {
                        CostOrderedEvaluator::new(&leaf, &plan, costs.as_ref()).evaluate()
                    }
                    None => SerialEvaluator::new(&leaf, &plan).evaluate(),
                })
                .await
                .map_err(|e| EvalError::from(ScanError::worker(e.to_string())))??
            }
        };

        Ok(match outcome {
            Outcome::Matches(set) => Candidates::Narrowed(set),
            Outcome::AllowAll => Candidates::Unrestricted,
        })
    }

    /// Replace `Auto` with a concrete strategy for `plan`
    fn resolve(&self, strategy: Strategy, plan: &EvalPlan) -> Strategy {
        match strategy {
            Strategy::Auto if plan.term_count() >= self.config.parallel_term_threshold => {
                Strategy::Parallel
            }
            Strategy::Auto => Strategy::Serial,
            other => other,
        }
    }
}
