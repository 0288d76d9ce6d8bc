//! Cost-ordered evaluation
//!
//! Siblings run cheapest first. Under an And, each later sibling is scanned
//! with the bounds of the running result as an overlay, so an expensive term
//! only reads the slice of the index the cheap terms left open. Or branches
//! do not bound each other; they all receive the bound inherited from the
//! enclosing And chain.
//!
//! # Invariants
//!
//! - Ordering is a stable sort: equal costs keep sibling order
//! - A node reports the fields whose scans consumed its bound; when nothing
//!   consumed it, the parent restricts the child's result itself
//! - The overlay only ever removes ids the enclosing And would discard, so
//!   results equal the serial evaluator's

use std::collections::{BTreeSet, HashMap};

use crate::index::Bounds;
use crate::planner::{EvalPlan, NodeId, PlanNode, Predicate};

use super::algebra::Outcome;
use super::errors::EvalResult;
use super::leaf::LeafScanner;
use super::result::ResultSet;

/// External estimate of how expensive scanning a predicate is
///
/// Lower is cheaper. Typically backed by index cardinality statistics.
pub trait TermCost: Send + Sync {
    fn cost(&self, predicate: &Predicate) -> u64;
}

impl<F> TermCost for F
where
    F: Fn(&Predicate) -> u64 + Send + Sync,
{
    fn cost(&self, predicate: &Predicate) -> u64 {
        self(predicate)
    }
}

/// Fixed costs keyed by canonical predicate, then by field
#[derive(Debug, Clone, Default)]
pub struct CostTable {
    by_term: HashMap<String, u64>,
    by_field: HashMap<String, u64>,
    default: u64,
}

impl CostTable {
    /// Creates a table where unknown predicates cost `default`
    pub fn new(default: u64) -> Self {
        Self {
            default,
            ..Default::default()
        }
    }

    /// Cost of one exact predicate
    pub fn with_term(mut self, predicate: &Predicate, cost: u64) -> Self {
        self.by_term.insert(predicate.canonical(), cost);
        self
    }

    /// Cost of any predicate on `field`
    pub fn with_field(mut self, field: impl Into<String>, cost: u64) -> Self {
        self.by_field.insert(field.into(), cost);
        self
    }
}

impl TermCost for CostTable {
    fn cost(&self, predicate: &Predicate) -> u64 {
        if let Some(cost) = self.by_term.get(&predicate.canonical()) {
            return *cost;
        }
        predicate
            .field()
            .and_then(|field| self.by_field.get(field))
            .copied()
            .unwrap_or(self.default)
    }
}

/// What a subtree learned while being evaluated
#[derive(Debug, Default)]
struct ExpandData {
    /// Bounds of the subtree's result, if resolved and non-empty
    found_bound: Option<Bounds>,
    /// Fields whose scans applied the inherited bound
    used_bound_fields: BTreeSet<String>,
}

impl ExpandData {
    fn used_bound(&self) -> bool {
        !self.used_bound_fields.is_empty()
    }
}

/// Evaluator that orders siblings by cost and bounds later And siblings
pub struct CostOrderedEvaluator<'a> {
    leaf: &'a LeafScanner,
    plan: &'a EvalPlan,
    costs: Vec<u64>,
}

impl<'a> CostOrderedEvaluator<'a> {
    /// Creates an evaluator, costing every node of `plan` once
    pub fn new(leaf: &'a LeafScanner, plan: &'a EvalPlan, term_cost: &dyn TermCost) -> Self {
        let costs = plan.node_costs(|term| term_cost.cost(&term.predicate));
        Self { leaf, plan, costs }
    }

    /// Evaluate the plan root
    pub fn evaluate(&self) -> EvalResult<Outcome> {
        let (outcome, _) = self.eval(self.plan.root(), None)?;
        Ok(outcome)
    }

    fn ordered(&self, children: &[NodeId]) -> Vec<NodeId> {
        let mut order = children.to_vec();
        order.sort_by_key(|child| self.costs[child.index()]);
        order
    }

    /// Evaluate `child` under `bound`, restricting its result when the child
    /// did not consume the bound
    fn settle(&self, child: NodeId, bound: Option<&Bounds>) -> EvalResult<(Outcome, ExpandData)> {
        let (outcome, data) = self.eval(child, bound)?;
        match bound {
            Some(b) if !data.used_bound() => Ok((outcome.restrict(b), data)),
            _ => Ok((outcome, data)),
        }
    }

    fn eval(&self, id: NodeId, bound: Option<&Bounds>) -> EvalResult<(Outcome, ExpandData)> {
        let mut data = ExpandData::default();
        let outcome = match self.plan.node(id) {
            PlanNode::Term(term_id) => {
                let term = self.plan.term(*term_id);
                let set = self.leaf.scan_term(self.plan.shard(), term, bound)?;
                if bound.is_some() {
                    data.used_bound_fields.insert(term.field.clone());
                }
                Outcome::Matches(set)
            }
            PlanNode::Unresolved(_) => Outcome::AllowAll,
            PlanNode::And(children) => {
                let order = self.ordered(children);
                let mut running = Outcome::AllowAll;
                let mut current = bound.cloned();
                for (i, child) in order.iter().enumerate() {
                    let (outcome, child_data) = self.settle(*child, current.as_ref())?;
                    data.used_bound_fields.extend(child_data.used_bound_fields);
                    running = running.and(outcome);

                    let skipped = order.len() - i - 1;
                    if running.is_empty() {
                        if skipped > 0 {
                            self.leaf.metrics().increment_short_circuits();
                            tracing::debug!(event = "AND_SHORT_CIRCUIT", skipped);
                        }
                        break;
                    }
                    if let Some(tighter) = running.bounds() {
                        current = Some(tighter);
                    }
                }
                running
            }
            PlanNode::Or(children) => {
                let mut running = Outcome::Matches(ResultSet::empty());
                for child in self.ordered(children) {
                    let (outcome, child_data) = self.settle(child, bound)?;
                    data.used_bound_fields.extend(child_data.used_bound_fields);
                    running = running.or(outcome);
                    if running.is_allow_all() {
                        break;
                    }
                }
                running
            }
        };
        data.found_bound = outcome.bounds();
        tracing::trace!(
            event = "COST_NODE_EVALUATED",
            node = id.index(),
            bounded = bound.is_some(),
            found_bound = data.found_bound.is_some(),
            used_bound_fields = data.used_bound_fields.len(),
        );
        Ok((outcome, data))
    }
}
