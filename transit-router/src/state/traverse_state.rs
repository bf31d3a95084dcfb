//! The immutable search state.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

use crate::domain::{FeedScopedId, TraverseMode};
use crate::graph::{EdgeId, TripRef, VertexId};

use super::arena::StateId;

/// A fingerprint of the routes ridden so far, in boarding order.
///
/// Multi-objective search compares states only when their route
/// sequences are similar; the fingerprint makes that check O(1).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct RouteSequence {
    hash: u64,
    last: Option<u64>,
    len: u32,
}

impl RouteSequence {
    /// The sequence with `route` appended.
    pub fn push(self, route: &FeedScopedId) -> Self {
        let mut hasher = DefaultHasher::new();
        route.hash(&mut hasher);
        let route_hash = hasher.finish();

        let mut hasher = DefaultHasher::new();
        (self.hash, route_hash).hash(&mut hasher);
        Self {
            hash: hasher.finish(),
            last: Some(route_hash),
            len: self.len + 1,
        }
    }

    pub fn len(&self) -> u32 {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Returns true if both sequences ride the same routes in the same
    /// order.
    pub fn same_routes(&self, other: &RouteSequence) -> bool {
        self.len == other.len && self.hash == other.hash
    }

    /// Returns true if both sequences end on the same route (or neither
    /// has ridden anything).
    pub fn same_last_route(&self, other: &RouteSequence) -> bool {
        self.last == other.last
    }
}

/// Being at a vertex at a moment in time, with everything accumulated on
/// the way there.
///
/// States are never changed once built; [`StateEditor`](super::StateEditor)
/// produces successors. `back_state` links each state to its predecessor
/// in the search's [`StateArena`](super::StateArena), so many states can
/// share one history.
#[derive(Debug, Clone, PartialEq)]
pub struct State {
    pub(super) vertex: VertexId,
    pub(super) time: i64,
    pub(super) start_time: i64,
    pub(super) weight: f64,
    pub(super) walk_distance: f64,
    pub(super) num_boardings: u32,
    pub(super) street_mode: TraverseMode,
    pub(super) trip: Option<TripRef>,
    pub(super) route_sequence: RouteSequence,
    pub(super) back_edge: Option<EdgeId>,
    pub(super) back_state: Option<StateId>,
    pub(super) arrive_by: bool,
}

impl State {
    /// The root state of a search.
    pub fn initial(vertex: VertexId, time: i64, street_mode: TraverseMode, arrive_by: bool) -> Self {
        Self {
            vertex,
            time,
            start_time: time,
            weight: 0.0,
            walk_distance: 0.0,
            num_boardings: 0,
            street_mode,
            trip: None,
            route_sequence: RouteSequence::default(),
            back_edge: None,
            back_state: None,
            arrive_by,
        }
    }

    pub fn vertex(&self) -> VertexId {
        self.vertex
    }

    /// Epoch seconds.
    pub fn time(&self) -> i64 {
        self.time
    }

    pub fn start_time(&self) -> i64 {
        self.start_time
    }

    /// Seconds since the search started, positive in both directions.
    pub fn elapsed_seconds(&self) -> i64 {
        (self.time - self.start_time).abs()
    }

    pub fn weight(&self) -> f64 {
        self.weight
    }

    pub fn walk_distance(&self) -> f64 {
        self.walk_distance
    }

    pub fn num_boardings(&self) -> u32 {
        self.num_boardings
    }

    pub fn street_mode(&self) -> TraverseMode {
        self.street_mode
    }

    /// The trip the rider is on, if on board.
    pub fn trip(&self) -> Option<TripRef> {
        self.trip
    }

    pub fn route_sequence(&self) -> &RouteSequence {
        &self.route_sequence
    }

    pub fn back_edge(&self) -> Option<EdgeId> {
        self.back_edge
    }

    pub fn back_state(&self) -> Option<StateId> {
        self.back_state
    }

    pub fn is_arrive_by(&self) -> bool {
        self.arrive_by
    }

    /// A detached copy shifted onto the end of an earlier leg: weight,
    /// walk distance and boardings are offset by `prior`'s totals.
    pub(crate) fn continued_from(&self, prior: &State) -> State {
        State {
            start_time: prior.start_time,
            weight: self.weight + prior.weight,
            walk_distance: self.walk_distance + prior.walk_distance,
            num_boardings: self.num_boardings + prior.num_boardings,
            back_state: None,
            ..self.clone()
        }
    }
}
