//! Router-wide configuration.
//!
//! Per-request parameters live in [`RoutingRequest`](crate::state::RoutingRequest);
//! this holds the policy shared by every request a router serves: time
//! budgets, retry caps and the multi-objective dominance policy. All
//! fields have defaults, so a JSON file only needs to name what it changes.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::search::SimilarityPolicy;

/// Error loading a configuration file.
#[derive(Debug, Clone, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {message}")]
    Io { path: String, message: String },

    #[error("invalid config: {0}")]
    Json(String),
}

/// Configuration for every search engine.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RouterConfig {
    pub astar: AStarConfig,
    pub multi_objective: MultiObjectiveConfig,
    pub raptor: RaptorConfig,
    pub contraction: ContractionConfig,
    pub heuristic: HeuristicConfig,
}

impl RouterConfig {
    /// Parse a JSON document.
    ///
    /// # Examples
    ///
    /// ```
    /// use transit_router::config::RouterConfig;
    ///
    /// let config = RouterConfig::from_json_str(r#"{"raptor": {"max_rounds": 4}}"#).unwrap();
    /// assert_eq!(config.raptor.max_rounds, 4);
    /// assert_eq!(config.multi_objective.epsilon, 0.05);
    /// ```
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        serde_json::from_str(json).map_err(|e| ConfigError::Json(e.to_string()))
    }

    /// Read and parse a JSON file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        Self::from_json_str(&text)
    }
}

/// Single-objective search.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AStarConfig {
    /// Budget for one search (milliseconds).
    pub timeout_ms: u64,

    /// How many times the planner re-searches after banning the trips of
    /// paths already found.
    pub max_banned_trip_retries: usize,

    /// Collect this many times the requested itinerary count before
    /// ranking and truncating.
    pub oversearch_multiplier: f64,
}

impl AStarConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

impl Default for AStarConfig {
    fn default() -> Self {
        Self {
            timeout_ms: 5_000,
            max_banned_trip_retries: 3,
            oversearch_multiplier: 1.5,
        }
    }
}

/// Multi-objective (ε-dominance) search.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MultiObjectiveConfig {
    /// Relative tolerance when comparing objectives.
    pub epsilon: f64,

    /// Which states are compared against each other at all.
    pub similarity: SimilarityPolicy,

    /// Hard budget for the whole search (milliseconds).
    pub timeout_ms: u64,

    /// Budget granted after the k-th path is found (milliseconds); the last
    /// entry repeats. The first entry applies before any path is found.
    pub path_timeouts_ms: Vec<u64>,

    /// The walk limit is never widened past this (metres).
    pub max_walk_ceiling_m: f64,

    /// How many times the walk limit may be doubled.
    pub max_walk_retries: usize,
}

impl MultiObjectiveConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Budget once `found` paths have been collected.
    pub fn path_timeout(&self, found: usize) -> Duration {
        let ms = self
            .path_timeouts_ms
            .get(found)
            .or(self.path_timeouts_ms.last())
            .copied()
            .unwrap_or(self.timeout_ms);
        Duration::from_millis(ms)
    }
}

impl Default for MultiObjectiveConfig {
    fn default() -> Self {
        Self {
            epsilon: 0.05,
            similarity: SimilarityPolicy::SameRouteSequence,
            timeout_ms: 8_000,
            path_timeouts_ms: vec![5_000, 2_000, 1_000, 500],
            max_walk_ceiling_m: 10_000.0,
            max_walk_retries: 3,
        }
    }
}

/// Round-based transit search.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RaptorConfig {
    /// Most transit boardings considered.
    pub max_rounds: usize,

    pub board_slack_s: i32,
    pub alight_slack_s: i32,

    /// Added to every boarding after the first.
    pub transfer_slack_s: i32,

    /// Generalized cost of a boarding, in seconds of riding.
    pub board_cost: f64,
    /// Generalized cost of each boarding after the first.
    pub transfer_cost: f64,
    pub wait_reluctance: f64,
    pub transit_reluctance: f64,

    /// Longest walk to or from a stop (metres).
    pub access_max_walk_m: f64,

    pub timeout_ms: u64,
}

impl RaptorConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

impl Default for RaptorConfig {
    fn default() -> Self {
        Self {
            max_rounds: 8,
            board_slack_s: 0,
            alight_slack_s: 0,
            transfer_slack_s: 120,
            board_cost: 600.0,
            transfer_cost: 0.0,
            wait_reluctance: 1.0,
            transit_reluctance: 1.0,
            access_max_walk_m: 1_500.0,
            timeout_ms: 2_000,
        }
    }
}

/// Contraction hierarchy construction and queries.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ContractionConfig {
    /// Vertices a witness search may settle before a shortcut is added
    /// anyway.
    pub witness_settle_limit: usize,

    pub timeout_ms: u64,
}

impl ContractionConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

impl Default for ContractionConfig {
    fn default() -> Self {
        Self {
            witness_settle_limit: 64,
            timeout_ms: 1_000,
        }
    }
}

/// Remaining-weight estimation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HeuristicConfig {
    /// No vehicle in the network is faster than this (metres per second).
    pub max_transit_speed_mps: f64,

    /// Precompute exact lower bounds on a background thread for transit
    /// searches.
    pub bidirectional: bool,
}

impl Default for HeuristicConfig {
    fn default() -> Self {
        Self {
            max_transit_speed_mps: 40.0,
            bidirectional: true,
        }
    }
}
