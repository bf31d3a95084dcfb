//! Building successor states.

use tracing::warn;

use crate::domain::FeedScopedId;
use crate::graph::{EdgeId, TripRef, VertexId};

use super::arena::StateId;
use super::traverse_state::State;

/// Derives a new [`State`] from a parent.
///
/// Times are incremented in the direction of the search, so edge code
/// never needs to care whether the search runs forward or backward.
/// Anomalies (negative durations, negative or NaN weights) are logged and
/// make [`make_state`](Self::make_state) return `None`.
#[derive(Debug)]
pub struct StateEditor {
    child: State,
    parent_time: i64,
    valid: bool,
}

impl StateEditor {
    pub fn new(parent_id: StateId, parent: &State, edge: EdgeId, vertex: VertexId) -> Self {
        let mut child = parent.clone();
        child.vertex = vertex;
        child.back_edge = Some(edge);
        child.back_state = Some(parent_id);
        Self {
            child,
            parent_time: parent.time,
            valid: true,
        }
    }

    /// Advance the clock by `seconds` in the search direction.
    pub fn increment_time(&mut self, seconds: i64) {
        if seconds < 0 {
            warn!(seconds, vertex = ?self.child.vertex, "negative time increment");
            self.valid = false;
            return;
        }
        if self.child.arrive_by {
            self.child.time -= seconds;
        } else {
            self.child.time += seconds;
        }
    }

    /// Set an absolute time, e.g. a vehicle's departure.
    pub fn set_time(&mut self, time: i64) {
        self.child.time = time;
    }

    pub fn increment_weight(&mut self, weight: f64) {
        if weight.is_nan() || weight < 0.0 {
            warn!(weight, vertex = ?self.child.vertex, "invalid weight increment");
            self.valid = false;
            return;
        }
        self.child.weight += weight;
    }

    pub fn increment_walk_distance(&mut self, meters: f64) {
        if meters.is_nan() || meters < 0.0 {
            warn!(meters, "invalid walk distance increment");
            self.valid = false;
            return;
        }
        self.child.walk_distance += meters;
    }

    /// Get on `trip` of `route`, counting a boarding.
    pub fn board_trip(&mut self, trip: TripRef, route: &FeedScopedId) {
        self.child.trip = Some(trip);
        self.child.num_boardings += 1;
        self.child.route_sequence = self.child.route_sequence.push(route);
    }

    /// Stay on the same vehicle as it continues as `trip` of `route`.
    pub fn continue_on_trip(&mut self, trip: TripRef, route: &FeedScopedId) {
        self.child.trip = Some(trip);
        self.child.route_sequence = self.child.route_sequence.push(route);
    }

    pub fn alight(&mut self) {
        self.child.trip = None;
    }

    /// Finish editing. Returns `None` if an increment was invalid or the
    /// clock moved against the search direction.
    pub fn make_state(self) -> Option<State> {
        if !self.valid {
            return None;
        }
        let monotonic = if self.child.arrive_by {
            self.child.time <= self.parent_time
        } else {
            self.child.time >= self.parent_time
        };
        if !monotonic {
            warn!(
                parent_time = self.parent_time,
                time = self.child.time,
                "time moved against the search direction"
            );
            return None;
        }
        Some(self.child)
    }
}
