//! Edges and their traversal rules.
//!
//! Every edge kind shares one contract: given the state at one end, produce
//! the states reachable at the other end. Depart-by searches walk edges
//! forward; arrive-by searches walk them backward in time. Traversal reads
//! the graph and the request and nothing else.

use std::sync::Arc;

use crate::domain::{TraverseMode, TraverseModeSet};
use crate::state::{RoutingContext, RoutingRequest, State, StateEditor, StateId};

use super::transit::{PatternId, StopId, TripRef, TripTimes};
use super::vertex::{EdgeId, VertexId};

/// Physical attributes of a street segment.
#[derive(Debug, Clone, PartialEq)]
pub struct StreetSegment {
    pub name: Option<Arc<str>>,
    pub length_m: f64,
    pub permission: TraverseModeSet,
    pub wheelchair_accessible: bool,
}

impl StreetSegment {
    /// An unnamed segment usable by every street mode.
    pub fn new(length_m: f64) -> Self {
        Self {
            name: None,
            length_m,
            permission: TraverseModeSet::ALL_STREET,
            wheelchair_accessible: true,
        }
    }

    pub fn named(mut self, name: &str) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_permission(mut self, permission: TraverseModeSet) -> Self {
        self.permission = permission;
        self
    }

    pub fn with_wheelchair_accessible(mut self, accessible: bool) -> Self {
        self.wheelchair_accessible = accessible;
        self
    }
}

/// Staying on board from the last stop of one pattern to the first stop
/// of another.
#[derive(Debug, Clone, PartialEq)]
pub struct Interline {
    pub from_pattern: PatternId,
    pub to_pattern: PatternId,
    /// `(from trip index, to trip index)` pairs run by the same vehicle.
    pub trips: Vec<(usize, usize)>,
}

/// The kind of an edge, with the data its traversal needs.
#[derive(Debug, Clone, PartialEq)]
pub enum EdgeKind {
    Street(StreetSegment),
    /// Between a street vertex and a stop, in either direction.
    StreetTransitLink { stop: StopId },
    /// From a stop onto the vehicle leaving `stop_index`.
    Board { pattern: PatternId, stop_index: usize },
    /// From the vehicle reaching `stop_index` onto the stop.
    Alight { pattern: PatternId, stop_index: usize },
    /// Riding from `stop_index` to `stop_index + 1`.
    Hop { pattern: PatternId, stop_index: usize },
    /// Staying on board while the vehicle waits at `stop_index`.
    Dwell { pattern: PatternId, stop_index: usize },
    InterlineDwell(Interline),
    /// A walk between two stops.
    Transfer { distance_m: f64, min_time_s: i64 },
    /// Zero-cost seam between two separately searched legs.
    LegSwitch,
}

/// A directed transition between two vertices.
#[derive(Debug, Clone, PartialEq)]
pub struct Edge {
    from: VertexId,
    to: VertexId,
    kind: EdgeKind,
}

impl Edge {
    pub fn new(from: VertexId, to: VertexId, kind: EdgeKind) -> Self {
        Self { from, to, kind }
    }

    pub fn from(&self) -> VertexId {
        self.from
    }

    pub fn to(&self) -> VertexId {
        self.to
    }

    pub fn kind(&self) -> &EdgeKind {
        &self.kind
    }

    /// The same edge pointing the other way.
    pub fn reversed(&self) -> Edge {
        Edge::new(self.to, self.from, self.kind.clone())
    }

    /// Distance covered on foot or wheels, zero for transit edges.
    pub fn distance_m(&self) -> f64 {
        match &self.kind {
            EdgeKind::Street(seg) => seg.length_m,
            EdgeKind::Transfer { distance_m, .. } => *distance_m,
            _ => 0.0,
        }
    }

    /// Traverse this edge from `parent` in the direction of the search.
    ///
    /// Returns every successor state; most edges yield zero or one, board
    /// edges may yield one per candidate trip.
    pub fn traverse(
        &self,
        id: EdgeId,
        parent_id: StateId,
        parent: &State,
        ctx: &RoutingContext<'_>,
    ) -> Vec<State> {
        let next = if parent.is_arrive_by() { self.from } else { self.to };
        let editor = StateEditor::new(parent_id, parent, id, next);
        let request = ctx.request();

        match &self.kind {
            EdgeKind::Street(seg) => traverse_street(seg, editor, parent, request)
                .into_iter()
                .collect(),
            EdgeKind::StreetTransitLink { stop } => {
                traverse_link(*stop, editor, parent, ctx).into_iter().collect()
            }
            EdgeKind::Board {
                pattern,
                stop_index,
            } => {
                let at = TransitAt {
                    pattern: *pattern,
                    stop_index: *stop_index,
                };
                if parent.is_arrive_by() {
                    at.leave(editor, parent, ctx, true)
                        .into_iter()
                        .collect()
                } else {
                    at.enter(parent_id, parent, id, next, ctx, true)
                }
            }
            EdgeKind::Alight {
                pattern,
                stop_index,
            } => {
                let at = TransitAt {
                    pattern: *pattern,
                    stop_index: *stop_index,
                };
                if parent.is_arrive_by() {
                    at.enter(parent_id, parent, id, next, ctx, false)
                } else {
                    at.leave(editor, parent, ctx, false)
                        .into_iter()
                        .collect()
                }
            }
            EdgeKind::Hop {
                pattern,
                stop_index,
            } => traverse_ride(*pattern, editor, parent, ctx, |t| {
                t.arrival(stop_index + 1) - t.departure(*stop_index)
            })
            .into_iter()
            .collect(),
            EdgeKind::Dwell {
                pattern,
                stop_index,
            } => traverse_ride(*pattern, editor, parent, ctx, |t| {
                t.departure(*stop_index) - t.arrival(*stop_index)
            })
            .into_iter()
            .collect(),
            EdgeKind::InterlineDwell(interline) => {
                traverse_interline(interline, editor, parent, ctx)
                    .into_iter()
                    .collect()
            }
            EdgeKind::Transfer {
                distance_m,
                min_time_s,
            } => traverse_transfer(*distance_m, *min_time_s, editor, parent, request)
                .into_iter()
                .collect(),
            EdgeKind::LegSwitch => editor.make_state().into_iter().collect(),
        }
    }

    /// A time-independent lower bound on the weight any traversal of this
    /// edge adds under `request`. Used by heuristics.
    pub fn lower_bound_weight(&self, ctx: &RoutingContext<'_>) -> f64 {
        let request = ctx.request();
        match &self.kind {
            EdgeKind::Street(seg) => seg
                .permission
                .street_modes()
                .filter(|m| request.modes.contains(*m))
                .map(|m| seg.length_m / request.speed(m) * request.reluctance(m))
                .fold(f64::INFINITY, f64::min),
            EdgeKind::Hop {
                pattern,
                stop_index,
            } => {
                let p = ctx.graph().pattern(*pattern);
                f64::from(p.min_hop_time(*stop_index).max(0)) * request.transit_reluctance
            }
            EdgeKind::Dwell {
                pattern,
                stop_index,
            } => {
                let p = ctx.graph().pattern(*pattern);
                f64::from(p.min_dwell_time(*stop_index).max(0)) * request.transit_reluctance
            }
            EdgeKind::InterlineDwell(interline) => {
                let graph = ctx.graph();
                let from = graph.pattern(interline.from_pattern);
                let to = graph.pattern(interline.to_pattern);
                let last = from.num_stops() - 1;
                interline
                    .trips
                    .iter()
                    .map(|&(a, b)| to.trip(b).departure(0) - from.trip(a).arrival(last))
                    .min()
                    .map_or(0.0, |dt| f64::from(dt.max(0)) * request.transit_reluctance)
            }
            EdgeKind::Transfer {
                distance_m,
                min_time_s,
            } => transfer_seconds(*distance_m, *min_time_s, request) * request.walk_reluctance,
            EdgeKind::StreetTransitLink { .. }
            | EdgeKind::Board { .. }
            | EdgeKind::Alight { .. }
            | EdgeKind::LegSwitch => 0.0,
        }
    }
}

fn traverse_street(
    seg: &StreetSegment,
    mut editor: StateEditor,
    parent: &State,
    request: &RoutingRequest,
) -> Option<State> {
    let mode = parent.street_mode();
    if parent.trip().is_some() || !seg.permission.contains(mode) || !request.modes.contains(mode)
    {
        return None;
    }
    if request.wheelchair_accessible && !seg.wheelchair_accessible {
        return None;
    }

    let seconds = seg.length_m / request.speed(mode);
    editor.increment_time(seconds.round() as i64);
    editor.increment_weight(seconds * request.reluctance(mode));

    if mode == TraverseMode::Walk {
        editor.increment_walk_distance(seg.length_m);
        if request.exceeds_max_walk(parent.walk_distance() + seg.length_m) {
            return None;
        }
    }

    editor.make_state()
}

fn traverse_link(
    stop: StopId,
    editor: StateEditor,
    parent: &State,
    ctx: &RoutingContext<'_>,
) -> Option<State> {
    let request = ctx.request();
    if !request.modes.has_transit()
        || parent.trip().is_some()
        || parent.street_mode() != TraverseMode::Walk
    {
        return None;
    }
    if request.wheelchair_accessible && !ctx.graph().stop(stop).wheelchair_boarding() {
        return None;
    }
    editor.make_state()
}

fn transfer_seconds(distance_m: f64, min_time_s: i64, request: &RoutingRequest) -> f64 {
    (distance_m / request.walk_speed).max(min_time_s as f64)
}

fn traverse_transfer(
    distance_m: f64,
    min_time_s: i64,
    mut editor: StateEditor,
    parent: &State,
    request: &RoutingRequest,
) -> Option<State> {
    if parent.trip().is_some() || parent.street_mode() != TraverseMode::Walk {
        return None;
    }
    if request.exceeds_max_walk(parent.walk_distance() + distance_m) {
        return None;
    }

    let seconds = transfer_seconds(distance_m, min_time_s, request);
    editor.increment_time(seconds.round() as i64);
    editor.increment_weight(seconds * request.walk_reluctance);
    editor.increment_walk_distance(distance_m);
    editor.make_state()
}

/// Ride along a hop or dwell of the trip the parent is on.
fn traverse_ride(
    pattern: PatternId,
    mut editor: StateEditor,
    parent: &State,
    ctx: &RoutingContext<'_>,
    duration: impl Fn(&TripTimes) -> i32,
) -> Option<State> {
    let trip = parent.trip().filter(|t| t.pattern == pattern)?;
    let times = ctx.graph().pattern(pattern).trip(trip.trip_index);
    let seconds = duration(times);

    editor.increment_time(i64::from(seconds));
    editor.increment_weight(f64::from(seconds) * ctx.request().transit_reluctance);
    editor.make_state()
}

fn traverse_interline(
    interline: &Interline,
    mut editor: StateEditor,
    parent: &State,
    ctx: &RoutingContext<'_>,
) -> Option<State> {
    let trip = parent.trip()?;
    let graph = ctx.graph();
    let from = graph.pattern(interline.from_pattern);
    let to = graph.pattern(interline.to_pattern);

    let (a, b) = if parent.is_arrive_by() {
        if trip.pattern != interline.to_pattern {
            return None;
        }
        *interline.trips.iter().find(|(_, b)| *b == trip.trip_index)?
    } else {
        if trip.pattern != interline.from_pattern {
            return None;
        }
        *interline.trips.iter().find(|(a, _)| *a == trip.trip_index)?
    };

    let seconds = to.trip(b).departure(0) - from.trip(a).arrival(from.num_stops() - 1);
    if seconds < 0 {
        return None;
    }

    let next = if parent.is_arrive_by() {
        TripRef {
            pattern: interline.from_pattern,
            trip_index: a,
        }
    } else {
        TripRef {
            pattern: interline.to_pattern,
            trip_index: b,
        }
    };
    let route = if parent.is_arrive_by() { from.route_id() } else { to.route_id() };

    editor.increment_time(i64::from(seconds));
    editor.increment_weight(f64::from(seconds) * ctx.request().transit_reluctance);
    editor.continue_on_trip(next, route);
    editor.make_state()
}

/// A boarding or alighting point of a pattern.
struct TransitAt {
    pattern: PatternId,
    stop_index: usize,
}

impl TransitAt {
    /// Get on a vehicle: boarding in a depart-by search, or alighting
    /// traversed backward in an arrive-by search. Searches the timetable
    /// and yields one state per candidate trip.
    fn enter(
        &self,
        parent_id: StateId,
        parent: &State,
        edge: EdgeId,
        next: VertexId,
        ctx: &RoutingContext<'_>,
        boarding: bool,
    ) -> Vec<State> {
        let graph = ctx.graph();
        let request = ctx.request();
        let pattern = graph.pattern(self.pattern);
        let stop = graph.stop(pattern.stop(self.stop_index));

        if !request.modes.has_transit() || parent.trip().is_some() {
            return Vec::new();
        }
        if request.banned_stops.contains(stop.id()) {
            return Vec::new();
        }
        if request.wheelchair_accessible && !stop.wheelchair_boarding() {
            return Vec::new();
        }
        if request.max_boardings_reached(parent.num_boardings()) {
            return Vec::new();
        }

        let day = graph.service_day();
        let transfer_time = if parent.num_boardings() > 0 {
            request.min_transfer_time
        } else {
            0
        };
        let bicycle = parent.street_mode() == TraverseMode::Bicycle;
        let accept = |t: &TripTimes| request.trip_allowed(t, bicycle);

        let candidates = if boarding {
            let earliest = day.seconds_since_midnight(parent.time() + transfer_time);
            pattern.next_departures(self.stop_index, earliest, request.boarding_candidates, accept)
        } else {
            let latest = day.seconds_since_midnight(parent.time() - transfer_time);
            pattern.previous_arrivals(self.stop_index, latest, request.boarding_candidates, accept)
        };

        candidates
            .into_iter()
            .filter_map(|trip_index| {
                let times = pattern.trip(trip_index);
                let vehicle_time = day.to_epoch(if boarding {
                    times.departure(self.stop_index)
                } else {
                    times.arrival(self.stop_index)
                });
                let wait = (vehicle_time - parent.time()).abs();

                let mut editor = StateEditor::new(parent_id, parent, edge, next);
                editor.set_time(vehicle_time);
                editor.increment_weight(wait as f64 * request.wait_reluctance);
                if parent.num_boardings() > 0 {
                    editor.increment_weight(request.transfer_penalty);
                }
                if boarding {
                    editor.increment_weight(request.board_cost);
                }
                editor.board_trip(
                    TripRef {
                        pattern: self.pattern,
                        trip_index,
                    },
                    pattern.route_id(),
                );
                editor.make_state()
            })
            .collect()
    }

    /// Get off a vehicle: alighting in a depart-by search, or boarding
    /// traversed backward in an arrive-by search.
    fn leave(
        &self,
        mut editor: StateEditor,
        parent: &State,
        ctx: &RoutingContext<'_>,
        boarding: bool,
    ) -> Option<State> {
        parent.trip().filter(|t| t.pattern == self.pattern)?;

        let graph = ctx.graph();
        let request = ctx.request();
        let stop = graph.stop(graph.pattern(self.pattern).stop(self.stop_index));
        if request.banned_stops.contains(stop.id()) {
            return None;
        }
        if request.wheelchair_accessible && !stop.wheelchair_boarding() {
            return None;
        }

        if boarding {
            editor.increment_weight(request.board_cost);
        }
        editor.alight();
        editor.make_state()
    }
}
