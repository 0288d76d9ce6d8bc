//! Depth-first evaluation on the calling thread
//!
//! And children run left to right and stop at the first empty running
//! result. Or children are unioned; an unresolved branch makes the whole Or
//! unrestricted, so the remaining branches are skipped.

use crate::planner::{EvalPlan, NodeId, PlanNode};

use super::algebra::Outcome;
use super::errors::EvalResult;
use super::leaf::LeafScanner;
use super::result::ResultSet;

/// Serial evaluator over a compiled plan
pub struct SerialEvaluator<'a> {
    leaf: &'a LeafScanner,
    plan: &'a EvalPlan,
}

impl<'a> SerialEvaluator<'a> {
    pub fn new(leaf: &'a LeafScanner, plan: &'a EvalPlan) -> Self {
        Self { leaf, plan }
    }

    /// Evaluate the plan root
    pub fn evaluate(&self) -> EvalResult<Outcome> {
        self.eval(self.plan.root())
    }

    fn eval(&self, id: NodeId) -> EvalResult<Outcome> {
        match self.plan.node(id) {
            PlanNode::Term(term) => {
                let set = self
                    .leaf
                    .scan_term(self.plan.shard(), self.plan.term(*term), None)?;
                Ok(Outcome::Matches(set))
            }
            PlanNode::Unresolved(canonical) => {
                tracing::trace!(event = "LEAF_UNRESOLVED", term = %canonical);
                Ok(Outcome::AllowAll)
            }
            PlanNode::And(children) => {
                let mut running = Outcome::AllowAll;
                for (i, child) in children.iter().enumerate() {
                    running = running.and(self.eval(*child)?);
                    let skipped = children.len() - i - 1;
                    if running.is_empty() && skipped > 0 {
                        self.leaf.metrics().increment_short_circuits();
                        tracing::debug!(event = "AND_SHORT_CIRCUIT", skipped);
                        break;
                    }
                }
                Ok(running)
            }
            PlanNode::Or(children) => {
                let mut running = Outcome::Matches(ResultSet::empty());
                for child in children {
                    running = running.or(self.eval(*child)?);
                    if running.is_allow_all() {
                        break;
                    }
                }
                Ok(running)
            }
        }
    }
}
