//! Evaluator configuration
//!
//! Every field has a default, so an empty JSON object is a valid config.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::executor::{EvalError, EvalResult};

/// Evaluation strategy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Strategy {
    /// Depth-first on the calling thread
    Serial,
    /// Every leaf scanned concurrently, then combined
    Parallel,
    /// Cheapest sibling first, later siblings bounded by earlier results
    CostOrdered,
    /// Serial below `parallel_term_threshold` distinct terms, Parallel above
    Auto,
}

impl Strategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            Strategy::Serial => "serial",
            Strategy::Parallel => "parallel",
            Strategy::CostOrdered => "cost_ordered",
            Strategy::Auto => "auto",
        }
    }
}

/// Evaluator configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluatorConfig {
    /// Default strategy (default: auto)
    #[serde(default = "default_strategy")]
    pub strategy: Strategy,

    /// Concurrent scans allowed by the parallel strategy (default: 8)
    #[serde(default = "default_worker_pool_size")]
    pub worker_pool_size: usize,

    /// Distinct indexed terms at which `auto` switches to parallel (default: 10)
    #[serde(default = "default_parallel_term_threshold")]
    pub parallel_term_threshold: usize,

    /// Deadline for a whole evaluation, in milliseconds (default: none)
    #[serde(default)]
    pub scan_timeout_ms: Option<u64>,

    /// Allow bound overlays to narrow key ranges (default: true)
    #[serde(default = "default_doc_id_bounds")]
    pub doc_id_bounds: bool,

    /// Most geohash cells one geospatial term may scan (default: 32).
    /// Boxes needing more cells even at precision 1 are rejected.
    #[serde(default = "default_max_geo_cells")]
    pub max_geo_cells: usize,
}

fn default_strategy() -> Strategy {
    Strategy::Auto
}

fn default_worker_pool_size() -> usize {
    8
}

fn default_parallel_term_threshold() -> usize {
    10
}

fn default_doc_id_bounds() -> bool {
    true
}

fn default_max_geo_cells() -> usize {
    32
}

impl Default for EvaluatorConfig {
    fn default() -> Self {
        Self {
            strategy: default_strategy(),
            worker_pool_size: default_worker_pool_size(),
            parallel_term_threshold: default_parallel_term_threshold(),
            scan_timeout_ms: None,
            doc_id_bounds: default_doc_id_bounds(),
            max_geo_cells: default_max_geo_cells(),
        }
    }
}

impl EvaluatorConfig {
    /// Parse a JSON config
    pub fn from_json_str(json: &str) -> EvalResult<Self> {
        let config: Self = serde_json::from_str(json)
            .map_err(|e| EvalError::configuration(format!("invalid config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Read and parse a JSON config file
    pub fn from_file(path: impl AsRef<Path>) -> EvalResult<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|e| {
            EvalError::configuration(format!("cannot read {}: {}", path.display(), e))
        })?;
        Self::from_json_str(&json)
    }

    /// Reject values no evaluator can run with
    pub fn validate(&self) -> EvalResult<()> {
        if self.worker_pool_size == 0 {
            return Err(EvalError::configuration("worker_pool_size must be at least 1"));
        }
        if self.max_geo_cells == 0 {
            return Err(EvalError::configuration("max_geo_cells must be at least 1"));
        }
        Ok(())
    }

    /// Evaluation deadline as a duration
    pub fn scan_timeout(&self) -> Option<Duration> {
        self.scan_timeout_ms.map(Duration::from_millis)
    }
}
