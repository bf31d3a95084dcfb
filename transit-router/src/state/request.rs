//! Per-request search options.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::{FeedScopedId, TraverseMode, TraverseModeSet, epoch_seconds};
use crate::graph::TripTimes;

/// Which search engine answers a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SearchAlgorithm {
    /// Single-objective best-first search.
    #[default]
    AStar,
    /// Several materially different itineraries via ε-dominance.
    MultiObjective,
    /// Round-based transit search.
    Raptor,
    /// Precomputed street hierarchy, falling back to A*.
    Contraction,
}

/// The parameters of one search.
///
/// Immutable while a search runs. Retries (a widened walk limit, banned
/// trips) clone the request and change the clone.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RoutingRequest {
    pub modes: TraverseModeSet,
    /// Departure time, or arrival time when `arrive_by` is set (epoch seconds).
    pub date_time: i64,
    pub arrive_by: bool,
    /// Longest total walk in metres; `None` means unlimited.
    pub max_walk_distance: Option<f64>,

    /// Metres per second.
    pub walk_speed: f64,
    pub bike_speed: f64,
    pub car_speed: f64,

    /// Weight per second spent in each mode.
    pub walk_reluctance: f64,
    pub bike_reluctance: f64,
    pub car_reluctance: f64,
    pub wait_reluctance: f64,
    pub transit_reluctance: f64,

    /// Weight added for every boarding.
    pub board_cost: f64,
    /// Weight added for every boarding after the first.
    pub transfer_penalty: f64,
    /// Seconds required between alighting and boarding again.
    pub min_transfer_time: i64,

    pub wheelchair_accessible: bool,
    pub banned_trips: BTreeSet<FeedScopedId>,
    pub banned_stops: BTreeSet<FeedScopedId>,

    pub num_itineraries: usize,
    pub max_transfers: Option<u32>,
    pub max_weight: Option<f64>,
    pub max_duration_s: Option<i64>,
    /// Multiplier applied to heuristic estimates; above 1 trades
    /// optimality for speed.
    pub heuristic_weight: f64,
    /// How many successive trips a board edge may offer.
    pub boarding_candidates: usize,
    pub algorithm: SearchAlgorithm,
    /// Overrides the configured time budget for this request.
    pub timeout_ms: Option<u64>,
}

impl Default for RoutingRequest {
    fn default() -> Self {
        Self {
            modes: TraverseModeSet::of(&[TraverseMode::Walk, TraverseMode::Transit]),
            date_time: 0,
            arrive_by: false,
            max_walk_distance: None,
            walk_speed: 1.33,
            bike_speed: 5.0,
            car_speed: 11.2,
            walk_reluctance: 2.0,
            bike_reluctance: 2.0,
            car_reluctance: 1.0,
            wait_reluctance: 1.0,
            transit_reluctance: 1.0,
            board_cost: 600.0,
            transfer_penalty: 0.0,
            min_transfer_time: 0,
            wheelchair_accessible: false,
            banned_trips: BTreeSet::new(),
            banned_stops: BTreeSet::new(),
            num_itineraries: 3,
            max_transfers: None,
            max_weight: None,
            max_duration_s: None,
            heuristic_weight: 1.0,
            boarding_candidates: 1,
            algorithm: SearchAlgorithm::AStar,
            timeout_ms: None,
        }
    }
}

impl RoutingRequest {
    /// A request for the given modes, departing at epoch second zero.
    pub fn new(modes: TraverseModeSet) -> Self {
        Self {
            modes,
            ..Self::default()
        }
    }

    pub fn with_date_time(mut self, date_time: DateTime<Utc>) -> Self {
        self.date_time = epoch_seconds(date_time);
        self
    }

    pub fn with_arrive_by(mut self, arrive_by: bool) -> Self {
        self.arrive_by = arrive_by;
        self
    }

    pub fn with_algorithm(mut self, algorithm: SearchAlgorithm) -> Self {
        self.algorithm = algorithm;
        self
    }

    /// Speed in metres per second for a street mode.
    pub fn speed(&self, mode: TraverseMode) -> f64 {
        match mode {
            TraverseMode::Walk | TraverseMode::Transit => self.walk_speed,
            TraverseMode::Bicycle => self.bike_speed,
            TraverseMode::Car => self.car_speed,
        }
    }

    pub fn reluctance(&self, mode: TraverseMode) -> f64 {
        match mode {
            TraverseMode::Walk => self.walk_reluctance,
            TraverseMode::Bicycle => self.bike_reluctance,
            TraverseMode::Car => self.car_reluctance,
            TraverseMode::Transit => self.transit_reluctance,
        }
    }

    /// The street mode a search starts in: walking when allowed, then
    /// cycling, then driving.
    pub fn initial_street_mode(&self) -> TraverseMode {
        self.modes
            .street_modes()
            .next()
            .unwrap_or(TraverseMode::Walk)
    }

    pub fn exceeds_max_walk(&self, walk_distance: f64) -> bool {
        self.max_walk_distance
            .is_some_and(|limit| walk_distance > limit)
    }

    /// Returns true if a state with `boardings` may not board again.
    pub fn max_boardings_reached(&self, boardings: u32) -> bool {
        self.max_transfers.is_some_and(|max| boardings > max)
    }

    /// Returns true if `trip` passes the request's trip filters.
    pub fn trip_allowed(&self, trip: &TripTimes, with_bicycle: bool) -> bool {
        if self.banned_trips.contains(trip.trip_id()) {
            return false;
        }
        if self.wheelchair_accessible && !trip.wheelchair_accessible() {
            return false;
        }
        if with_bicycle && !trip.bikes_allowed() {
            return false;
        }
        true
    }

    /// Returns true if the request can only use the street network.
    pub fn is_street_only(&self) -> bool {
        !self.modes.has_transit()
    }
}
