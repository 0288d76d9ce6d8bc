//! Compiled evaluation plan
//!
//! The expression tree is numbered once into an arena. Nodes refer to each
//! other and to their terms by integer id, never by address, so evaluators
//! can key per-node and per-term state on plain integers.
//!
//! Compilation validates every reachable node before any scan runs:
//! negations and indexed leaves without a range representation are rejected
//! here, so evaluation never starts on an expression it cannot finish.

use std::collections::{HashMap, HashSet};
use std::fmt;

use super::ast::{Expression, Predicate};
use super::errors::{PlannerError, PlannerResult};
use super::range::{RangeBuilder, ScanSpec};

/// Index of a node in [`EvalPlan`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

/// Index of a distinct indexed term in [`EvalPlan`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TermId(usize);

impl NodeId {
    /// Position in the arena; children always precede their parent
    pub fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for TermId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "t{}", self.0)
    }
}

/// One node of the compiled tree
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlanNode {
    And(Vec<NodeId>),
    Or(Vec<NodeId>),
    Term(TermId),
    /// Leaf the index cannot resolve; deferred to document evaluation.
    /// Holds the canonical form for logging.
    Unresolved(String),
}

/// A distinct indexed predicate with its prebuilt unbounded scan
#[derive(Debug, Clone)]
pub struct Term {
    pub id: TermId,
    pub predicate: Predicate,
    pub field: String,
    pub canonical: String,
    pub spec: ScanSpec,
}

/// Immutable plan for one (shard, expression, indexed fields) evaluation
#[derive(Debug, Clone)]
pub struct EvalPlan {
    shard: String,
    nodes: Vec<PlanNode>,
    terms: Vec<Term>,
    root: NodeId,
}

impl EvalPlan {
    /// Compiles `expression` for `shard`.
    ///
    /// Leaves on fields outside `indexed_fields` become
    /// [`PlanNode::Unresolved`]. Textually repeated predicates share one
    /// [`TermId`].
    pub fn compile(
        shard: &str,
        expression: &Expression,
        indexed_fields: &HashSet<String>,
        builder: &RangeBuilder,
    ) -> PlannerResult<Self> {
        let mut compiler = Compiler {
            shard,
            indexed_fields,
            builder,
            nodes: Vec::new(),
            terms: Vec::new(),
            by_canonical: HashMap::new(),
        };
        let root = compiler.add(expression)?;
        Ok(Self {
            shard: shard.to_string(),
            nodes: compiler.nodes,
            terms: compiler.terms,
            root,
        })
    }

    pub fn shard(&self) -> &str {
        &self.shard
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn node(&self, id: NodeId) -> &PlanNode {
        &self.nodes[id.0]
    }

    pub fn term(&self, id: TermId) -> &Term {
        &self.terms[id.0]
    }

    /// All distinct indexed terms, in first-appearance order
    pub fn terms(&self) -> &[Term] {
        &self.terms
    }

    pub fn term_count(&self) -> usize {
        self.terms.len()
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Cost of every node, indexed by [`NodeId::index`].
    ///
    /// A term costs what `term_cost` says, an And its cheapest child and an
    /// Or the sum of its children. Unresolved leaves cost `u64::MAX` so they
    /// sort last.
    pub fn node_costs(&self, mut term_cost: impl FnMut(&Term) -> u64) -> Vec<u64> {
        let mut costs: Vec<u64> = Vec::with_capacity(self.nodes.len());
        for node in &self.nodes {
            let cost = match node {
                PlanNode::Term(id) => term_cost(self.term(*id)),
                PlanNode::Unresolved(_) => u64::MAX,
                PlanNode::And(children) => children
                    .iter()
                    .map(|c| costs[c.0])
                    .min()
                    .unwrap_or(u64::MAX),
                PlanNode::Or(children) => children
                    .iter()
                    .fold(0u64, |sum, c| sum.saturating_add(costs[c.0])),
            };
            costs.push(cost);
        }
        costs
    }
}

struct Compiler<'a> {
    shard: &'a str,
    indexed_fields: &'a HashSet<String>,
    builder: &'a RangeBuilder,
    nodes: Vec<PlanNode>,
    terms: Vec<Term>,
    by_canonical: HashMap<String, TermId>,
}

impl Compiler<'_> {
    fn add(&mut self, expression: &Expression) -> PlannerResult<NodeId> {
        let node = match expression {
            Expression::And(children) => PlanNode::And(self.add_all(children)?),
            Expression::Or(children) => PlanNode::Or(self.add_all(children)?),
            Expression::Not(_) => {
                return Err(PlannerError::unsupported(
                    expression.to_string(),
                    "negation cannot be resolved against the field index",
                ))
            }
            Expression::Leaf(predicate) => match predicate.field() {
                Some(field) if self.indexed_fields.contains(field) => {
                    PlanNode::Term(self.intern(predicate, field)?)
                }
                _ => PlanNode::Unresolved(predicate.canonical()),
            },
        };
        self.nodes.push(node);
        Ok(NodeId(self.nodes.len() - 1))
    }

    fn add_all(&mut self, children: &[Expression]) -> PlannerResult<Vec<NodeId>> {
        children.iter().map(|child| self.add(child)).collect()
    }

    fn intern(&mut self, predicate: &Predicate, field: &str) -> PlannerResult<TermId> {
        let canonical = predicate.canonical();
        if let Some(id) = self.by_canonical.get(&canonical) {
            return Ok(*id);
        }
        let spec = self.builder.build_range(self.shard, predicate)?;
        let id = TermId(self.terms.len());
        self.terms.push(Term {
            id,
            predicate: predicate.clone(),
            field: field.to_string(),
            canonical: canonical.clone(),
            spec,
        });
        self.by_canonical.insert(canonical, id);
        Ok(id)
    }
}
