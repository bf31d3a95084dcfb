//! Paths read back out of a search.

use crate::domain::FeedScopedId;
use crate::graph::{Edge, EdgeKind, VertexId};
use crate::state::{RoutingContext, State, StateArena, StateId};

/// A route through the graph, in travel order.
///
/// `states[0]` is at the origin and `states[n - 1]` at the destination,
/// whichever direction the search ran. `edges[i]` leads from `states[i]`
/// to `states[i + 1]`.
#[derive(Debug, Clone, PartialEq)]
pub struct GraphPath {
    states: Vec<State>,
    edges: Vec<Edge>,
    arrive_by: bool,
    trips: Vec<FeedScopedId>,
}

impl GraphPath {
    /// Follow the back-state chain of `terminal` to the root of its search.
    ///
    /// Depart-by chains run destination-first and are reversed; arrive-by
    /// chains already start at the origin.
    pub fn from_terminal(arena: &StateArena, terminal: StateId, ctx: &RoutingContext<'_>) -> Self {
        let mut states: Vec<State> = arena.chain(terminal).map(|(_, s)| s.clone()).collect();
        let arrive_by = states.first().is_some_and(State::is_arrive_by);

        let edges: Vec<Edge> = if arrive_by {
            // Each state knows the edge it was reached over, which in an
            // arrive-by search leads away from it.
            states[..states.len().saturating_sub(1)]
                .iter()
                .filter_map(|s| s.back_edge())
                .map(|e| ctx.edge(e).clone())
                .collect()
        } else {
            states.reverse();
            states
                .iter()
                .skip(1)
                .filter_map(|s| s.back_edge())
                .map(|e| ctx.edge(e).clone())
                .collect()
        };

        let trips = trips_ridden(&states, ctx);
        Self {
            states,
            edges,
            arrive_by,
            trips,
        }
    }

    /// Join legs searched separately, in travel order, with a
    /// [`LegSwitch`](EdgeKind::LegSwitch) edge at each seam.
    ///
    /// Totals (weight, walk distance, boardings) carry across the seams.
    /// Returns `None` for an empty list or for legs searched in different
    /// directions.
    pub fn concat(legs: Vec<GraphPath>) -> Option<GraphPath> {
        let arrive_by = legs.first()?.arrive_by;
        if legs.iter().any(|leg| leg.arrive_by != arrive_by) {
            return None;
        }

        // Totals accumulate in search order: forward for depart-by,
        // backward for arrive-by.
        let mut adjusted: Vec<Vec<State>> = Vec::with_capacity(legs.len());
        let mut carried: Option<State> = None;
        let order: Vec<usize> = if arrive_by {
            (0..legs.len()).rev().collect()
        } else {
            (0..legs.len()).collect()
        };
        for &i in &order {
            let leg = &legs[i];
            let states: Vec<State> = match &carried {
                Some(prior) => leg.states.iter().map(|s| s.continued_from(prior)).collect(),
                None => leg.states.clone(),
            };
            let terminal = if arrive_by {
                states.first()
            } else {
                states.last()
            };
            carried = Some(terminal?.clone());
            adjusted.push(states);
        }
        if arrive_by {
            adjusted.reverse();
        }

        let mut states: Vec<State> = Vec::new();
        let mut edges = Vec::new();
        let mut trips = Vec::new();
        for (leg, leg_states) in legs.into_iter().zip(adjusted) {
            if let (Some(last), Some(first)) = (states.last(), leg_states.first()) {
                edges.push(Edge::new(last.vertex(), first.vertex(), EdgeKind::LegSwitch));
            }
            states.extend(leg_states);
            edges.extend(leg.edges);
            trips.extend(leg.trips);
        }

        Some(GraphPath {
            states,
            edges,
            arrive_by,
            trips,
        })
    }

    pub fn states(&self) -> &[State] {
        &self.states
    }

    pub fn edges(&self) -> &[Edge] {
        &self.edges
    }

    pub fn vertices(&self) -> Vec<VertexId> {
        self.states.iter().map(State::vertex).collect()
    }

    pub fn is_arrive_by(&self) -> bool {
        self.arrive_by
    }

    /// Trips ridden, in travel order.
    pub fn trips(&self) -> &[FeedScopedId] {
        &self.trips
    }

    /// Epoch seconds at the origin.
    pub fn start_time(&self) -> i64 {
        self.states.first().map_or(0, State::time)
    }

    /// Epoch seconds at the destination.
    pub fn end_time(&self) -> i64 {
        self.states.last().map_or(0, State::time)
    }

    /// Seconds from origin to destination.
    pub fn duration(&self) -> i64 {
        self.end_time() - self.start_time()
    }

    pub fn weight(&self) -> f64 {
        self.terminal().map_or(0.0, State::weight)
    }

    pub fn walk_distance(&self) -> f64 {
        self.terminal().map_or(0.0, State::walk_distance)
    }

    pub fn num_boardings(&self) -> u32 {
        self.terminal().map_or(0, State::num_boardings)
    }

    /// The state where the search ended, which holds the totals.
    fn terminal(&self) -> Option<&State> {
        if self.arrive_by {
            self.states.first()
        } else {
            self.states.last()
        }
    }
}

fn trips_ridden(states: &[State], ctx: &RoutingContext<'_>) -> Vec<FeedScopedId> {
    let graph = ctx.graph();
    let mut trips = Vec::new();
    let mut previous = None;
    for state in states {
        let trip = state.trip();
        match trip {
            Some(t) if trip != previous => {
                trips.push(graph.pattern(t.pattern).trip(t.trip_index).trip_id().clone());
            }
            _ => {}
        }
        previous = trip;
    }
    trips
}
