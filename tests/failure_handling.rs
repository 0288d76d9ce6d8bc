//! Failure Handling Tests
//!
//! Tests for failure invariants:
//! - Unsupported predicates fail before any scan is opened
//! - A scan failing mid-stream fails the evaluation under every strategy
//! - Every cursor opened is closed, on success and on failure
//! - Deadlines surface as retryable timeouts, never as empty results
//! - AND short-circuits once its running result is empty
//! - Blocking scans never stall the async runtime

use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{mpsc, Arc, Mutex};
use std::time::Duration;

use shardindex::config::{EvaluatorConfig, Strategy};
use shardindex::executor::{CostTable, EvalError, Evaluator};
use shardindex::index::{
    FieldIndex, IndexEntry, IndexScan, ScanCursor, ScanError, ScanRange, ScanResult,
};
use shardindex::planner::{CompareOp, Expression, Predicate};

const SHARD: &str = "20240101_0";
const EVALUATING: [Strategy; 3] = [Strategy::Serial, Strategy::Parallel, Strategy::CostOrdered];

// =============================================================================
// Instrumented Store
// =============================================================================

/// Counts cursors opened and closed; optionally fails scans of one field
/// after yielding `fail_after` entries.
struct InstrumentedIndex {
    inner: FieldIndex,
    opened: AtomicUsize,
    closed: Arc<AtomicUsize>,
    failing_field: Option<&'static str>,
    fail_after: usize,
}

impl InstrumentedIndex {
    fn new(inner: FieldIndex) -> Self {
        Self {
            inner,
            opened: AtomicUsize::new(0),
            closed: Arc::new(AtomicUsize::new(0)),
            failing_field: None,
            fail_after: 0,
        }
    }

    fn failing(inner: FieldIndex, field: &'static str, fail_after: usize) -> Self {
        Self {
            failing_field: Some(field),
            fail_after,
            ..Self::new(inner)
        }
    }

    fn opened(&self) -> usize {
        self.opened.load(Ordering::SeqCst)
    }

    fn closed(&self) -> usize {
        self.closed.load(Ordering::SeqCst)
    }
}

impl IndexScan for InstrumentedIndex {
    fn open_scan(&self, range: &ScanRange) -> ScanResult<Box<dyn ScanCursor>> {
        self.opened.fetch_add(1, Ordering::SeqCst);
        let fails = self.failing_field.is_some() && range.start.field() == self.failing_field;
        Ok(Box::new(TrackedCursor {
            entries: self.inner.lookup_range(range).into_iter(),
            yielded: 0,
            fail_after: fails.then_some(self.fail_after),
            closed: Arc::clone(&self.closed),
        }))
    }
}

struct TrackedCursor {
    entries: std::vec::IntoIter<IndexEntry>,
    yielded: usize,
    fail_after: Option<usize>,
    closed: Arc<AtomicUsize>,
}

impl Iterator for TrackedCursor {
    type Item = ScanResult<IndexEntry>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.fail_after.is_some_and(|n| self.yielded >= n) {
            return Some(Err(ScanError::store("tablet server connection reset")));
        }
        self.yielded += 1;
        self.entries.next().map(Ok)
    }
}

impl ScanCursor for TrackedCursor {
    fn close(&mut self) {
        self.closed.fetch_add(1, Ordering::SeqCst);
    }
}

/// Holds every scan open until another task releases it
struct GatedIndex {
    inner: FieldIndex,
    gate: Mutex<mpsc::Receiver<()>>,
}

impl IndexScan for GatedIndex {
    fn open_scan(&self, range: &ScanRange) -> ScanResult<Box<dyn ScanCursor>> {
        let gate = self.gate.lock().map_err(|_| ScanError::store("gate poisoned"))?;
        gate.recv_timeout(Duration::from_secs(5))
            .map_err(|_| ScanError::store("scan was never released"))?;
        self.inner.open_scan(range)
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

fn people() -> FieldIndex {
    [
        ("NAME", "alice", "u1"),
        ("NAME", "alice", "u2"),
        ("NAME", "bob", "u3"),
        ("CITY", "nyc", "u1"),
        ("CITY", "nyc", "u3"),
        ("CITY", "sf", "u2"),
    ]
    .iter()
    .map(|(field, value, uid)| (SHARD.to_string(), IndexEntry::new(*field, *value, "T", *uid)))
    .collect()
}

fn evaluator(store: Arc<InstrumentedIndex>, config: EvaluatorConfig) -> Evaluator {
    let costs = CostTable::new(10).with_field("CITY", 1);
    Evaluator::new(store, config)
        .unwrap()
        .with_cost_source(Arc::new(costs))
}

fn indexed() -> HashSet<String> {
    ["NAME", "CITY"].iter().map(|s| s.to_string()).collect()
}

async fn expect_error(eval: &Evaluator, expr: &Expression, strategy: Strategy) -> EvalError {
    match eval.evaluate(SHARD, expr, &indexed(), strategy).await {
        Ok(result) => panic!("{:?} returned {:?} instead of failing", strategy, result),
        Err(e) => e,
    }
}

// =============================================================================
// Unsupported Predicates
// =============================================================================

/// A bare NOT is rejected before any scan.
#[tokio::test]
async fn test_not_rejected_before_scanning() {
    let store = Arc::new(InstrumentedIndex::new(people()));
    let eval = evaluator(Arc::clone(&store), EvaluatorConfig::default());
    let expr = Expression::not(Expression::eq("FIELD", "x"));

    for strategy in EVALUATING {
        let err = expect_error(&eval, &expr, strategy).await;
        assert_eq!(err.code(), "INDEX_UNSUPPORTED_PREDICATE");
        assert!(!err.is_retryable());
    }
    assert_eq!(store.opened(), 0);
}

/// A NOT deep inside an otherwise indexable tree still fails up front.
#[tokio::test]
async fn test_nested_not_rejected_before_scanning() {
    let store = Arc::new(InstrumentedIndex::new(people()));
    let eval = evaluator(Arc::clone(&store), EvaluatorConfig::default());
    let expr = Expression::and([
        Expression::eq("NAME", "alice"),
        Expression::or([
            Expression::eq("CITY", "nyc"),
            Expression::not(Expression::eq("CITY", "sf")),
        ]),
    ]);

    for strategy in EVALUATING {
        let err = expect_error(&eval, &expr, strategy).await;
        assert_eq!(err.code(), "INDEX_UNSUPPORTED_PREDICATE");
    }
    assert_eq!(store.opened(), 0);
}

/// Raw inequalities and negated predicates on indexed fields are rejected.
#[tokio::test]
async fn test_inequalities_rejected() {
    let store = Arc::new(InstrumentedIndex::new(people()));
    let eval = evaluator(Arc::clone(&store), EvaluatorConfig::default());
    let predicates = [
        Predicate::compare("NAME", CompareOp::Gt, "alice"),
        Predicate::ne("NAME", "alice"),
        Predicate::not_regex("NAME", "al.*"),
    ];

    for predicate in predicates {
        let expr = Expression::and([Expression::eq("CITY", "nyc"), predicate.into()]);
        for strategy in EVALUATING {
            let err = expect_error(&eval, &expr, strategy).await;
            assert!(matches!(err, EvalError::UnsupportedPredicate(_)));
        }
    }
    assert_eq!(store.opened(), 0);
}

// =============================================================================
// Scan Failures
// =============================================================================

/// A scan failing part way through fails every strategy and closes every cursor.
#[tokio::test]
async fn test_mid_stream_failure_propagates() {
    let store = Arc::new(InstrumentedIndex::failing(people(), "CITY", 1));
    let eval = evaluator(Arc::clone(&store), EvaluatorConfig::default());
    let expr = Expression::and([Expression::eq("NAME", "alice"), Expression::eq("CITY", "nyc")]);

    for strategy in EVALUATING {
        let err = expect_error(&eval, &expr, strategy).await;
        assert_eq!(err.code(), "INDEX_SCAN_FAILED");
        assert!(err.is_retryable());
        assert!(err.to_string().contains("connection reset"));
    }
    assert!(store.opened() > 0);
    assert_eq!(store.opened(), store.closed());
    assert_eq!(eval.metrics().evaluations_failed, 3);
}

/// A failure under OR is not masked by the other branch's results.
#[tokio::test]
async fn test_failure_under_or_is_not_masked() {
    let store = Arc::new(InstrumentedIndex::failing(people(), "CITY", 0));
    let eval = evaluator(Arc::clone(&store), EvaluatorConfig::default());
    let expr = Expression::or([Expression::eq("NAME", "bob"), Expression::eq("CITY", "sf")]);

    for strategy in EVALUATING {
        let err = expect_error(&eval, &expr, strategy).await;
        assert!(matches!(err, EvalError::Scan(ScanError::Store { .. })));
    }
    assert_eq!(store.opened(), store.closed());
}

/// With a single worker, every outstanding task is still drained.
#[tokio::test]
async fn test_parallel_drains_after_failure() {
    let store = Arc::new(InstrumentedIndex::failing(people(), "NAME", 0));
    let config = EvaluatorConfig {
        worker_pool_size: 1,
        ..Default::default()
    };
    let eval = evaluator(Arc::clone(&store), config);
    let expr = Expression::or([
        Expression::eq("NAME", "alice"),
        Expression::eq("NAME", "bob"),
        Expression::eq("CITY", "nyc"),
        Expression::eq("CITY", "sf"),
    ]);

    let err = expect_error(&eval, &expr, Strategy::Parallel).await;
    assert_eq!(err.code(), "INDEX_SCAN_FAILED");
    assert_eq!(store.opened(), store.closed());
}

// =============================================================================
// Deadlines
// =============================================================================

/// An expired deadline fails the evaluation with a timeout.
#[tokio::test]
async fn test_timeout_fails_evaluation() {
    let store = Arc::new(InstrumentedIndex::new(people()));
    let config = EvaluatorConfig {
        scan_timeout_ms: Some(0),
        ..Default::default()
    };
    let eval = evaluator(Arc::clone(&store), config);
    let expr = Expression::or([Expression::eq("NAME", "alice"), Expression::eq("CITY", "sf")]);

    for strategy in EVALUATING {
        let err = expect_error(&eval, &expr, strategy).await;
        assert_eq!(err.code(), "INDEX_SCAN_TIMEOUT");
        assert!(matches!(err, EvalError::Scan(ref e) if e.is_timeout()));
    }
    assert_eq!(store.opened(), store.closed());
}

/// A generous deadline changes nothing.
#[tokio::test]
async fn test_generous_timeout_succeeds() {
    let store = Arc::new(InstrumentedIndex::new(people()));
    let config = EvaluatorConfig {
        scan_timeout_ms: Some(60_000),
        ..Default::default()
    };
    let eval = evaluator(store, config);
    let expr = Expression::and([Expression::eq("NAME", "alice"), Expression::eq("CITY", "nyc")]);

    for strategy in EVALUATING {
        let result = eval.evaluate(SHARD, &expr, &indexed(), strategy).await.unwrap();
        assert_eq!(result.as_set().unwrap().uids(), vec!["u1"]);
    }
}

// =============================================================================
// Short-Circuit
// =============================================================================

/// An empty first AND child stops the serial evaluator before the second scan.
#[tokio::test]
async fn test_and_short_circuit_skips_scans() {
    let store = Arc::new(InstrumentedIndex::new(people()));
    let eval = evaluator(Arc::clone(&store), EvaluatorConfig::default());
    let expr = Expression::and([Expression::eq("NAME", "nobody"), Expression::eq("CITY", "nyc")]);

    let result = eval
        .evaluate(SHARD, &expr, &indexed(), Strategy::Serial)
        .await
        .unwrap();
    assert!(result.as_set().unwrap().is_empty());
    assert_eq!(store.opened(), 1);
    assert_eq!(store.closed(), 1);
    assert_eq!(eval.metrics().short_circuits, 1);
}

// =============================================================================
// Configuration
// =============================================================================

/// Cost ordering without a cost source fails before scanning.
#[tokio::test]
async fn test_cost_ordered_without_cost_source() {
    let store = Arc::new(InstrumentedIndex::new(people()));
    let eval = Evaluator::new(Arc::clone(&store) as Arc<dyn IndexScan>, EvaluatorConfig::default())
        .unwrap();
    let err = expect_error(&eval, &Expression::eq("NAME", "alice"), Strategy::CostOrdered).await;
    assert!(matches!(err, EvalError::Configuration(_)));
    assert_eq!(store.opened(), 0);
}

// =============================================================================
// Runtime
// =============================================================================

/// A slow serial scan leaves the runtime free to run other tasks.
#[tokio::test]
async fn test_blocking_scan_does_not_stall_runtime() {
    let (release, gate) = mpsc::channel();
    let store = Arc::new(GatedIndex {
        inner: people(),
        gate: Mutex::new(gate),
    });
    let eval = Evaluator::new(store, EvaluatorConfig::default())
        .unwrap()
        .with_cost_source(Arc::new(CostTable::new(1)));
    let expr = Expression::eq("NAME", "alice");

    for strategy in [Strategy::Serial, Strategy::CostOrdered] {
        let release = release.clone();
        // Only runs if the evaluation yields the runtime thread
        let releaser = tokio::spawn(async move { release.send(()).unwrap() });
        let result = eval.evaluate(SHARD, &expr, &indexed(), strategy).await.unwrap();
        assert_eq!(result.as_set().unwrap().uids(), vec!["u1", "u2"]);
        releaser.await.unwrap();
    }
}
