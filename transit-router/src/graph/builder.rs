//! Incremental graph construction.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::debug;

use crate::domain::{Coordinate, FeedScopedId, IdFactory, ServiceDay, TraverseMode, TraverseModeSet};

use super::GraphError;
use super::edge::{Edge, EdgeKind, Interline, StreetSegment};
use super::network::Graph;
use super::transit::{
    PatternId, StopId, TransferConstraint, TransitStop, TripPattern, TripRef, TripTimes,
    TripTransfer,
};
use super::vertex::{EdgeId, Vertex, VertexId, VertexKind};

/// Builds a [`Graph`].
///
/// Identifiers for stops, routes and trips are minted by the builder's
/// [`IdFactory`], so the feed a graph belongs to is explicit.
///
/// # Examples
///
/// ```
/// use transit_router::domain::{Coordinate, IdFactory, ServiceDay};
/// use transit_router::graph::{GraphBuilder, StreetSegment};
///
/// let mut builder = GraphBuilder::new(IdFactory::new("city"), ServiceDay::default());
/// let a = builder.add_intersection("A", Coordinate::new(0.0, 0.0)).unwrap();
/// let b = builder.add_intersection("B", Coordinate::new(0.0, 0.001)).unwrap();
/// builder.add_street_pair(a, b, StreetSegment::new(120.0)).unwrap();
///
/// let graph = builder.build();
/// assert_eq!(graph.vertex_count(), 2);
/// assert_eq!(graph.edge_count(), 2);
/// ```
#[derive(Debug)]
pub struct GraphBuilder {
    ids: IdFactory,
    service_day: ServiceDay,
    vertices: Vec<Vertex>,
    edges: Vec<Edge>,
    labels: HashMap<Arc<str>, VertexId>,
    stops: Vec<TransitStop>,
    stop_ids: HashMap<FeedScopedId, StopId>,
    patterns: Vec<TripPattern>,
    trip_transfers: Vec<TripTransfer>,
}

impl GraphBuilder {
    pub fn new(ids: IdFactory, service_day: ServiceDay) -> Self {
        Self {
            ids,
            service_day,
            vertices: Vec::new(),
            edges: Vec::new(),
            labels: HashMap::new(),
            stops: Vec::new(),
            stop_ids: HashMap::new(),
            patterns: Vec::new(),
            trip_transfers: Vec::new(),
        }
    }

    /// The factory used for this graph's identifiers.
    pub fn ids(&self) -> &IdFactory {
        &self.ids
    }

    pub fn service_day(&self) -> ServiceDay {
        self.service_day
    }

    fn push_vertex(&mut self, vertex: Vertex) -> Result<VertexId, GraphError> {
        if self.labels.contains_key(vertex.label()) {
            return Err(GraphError::DuplicateLabel(vertex.label().to_string()));
        }
        let id = VertexId(self.vertices.len() as u32);
        self.labels.insert(vertex.label().into(), id);
        self.vertices.push(vertex);
        Ok(id)
    }

    fn push_edge(&mut self, from: VertexId, to: VertexId, kind: EdgeKind) -> Result<EdgeId, GraphError> {
        for v in [from, to] {
            if v.index() >= self.vertices.len() {
                return Err(GraphError::UnknownVertex(v));
            }
        }
        let id = EdgeId(self.edges.len() as u32);
        self.edges.push(Edge::new(from, to, kind));
        Ok(id)
    }

    fn vertex_coordinate(&self, v: VertexId) -> Coordinate {
        self.vertices[v.index()].coordinate()
    }

    pub fn add_intersection(
        &mut self,
        label: &str,
        coordinate: Coordinate,
    ) -> Result<VertexId, GraphError> {
        self.push_vertex(Vertex::new(label, coordinate, VertexKind::Intersection))
    }

    /// Add a one-way street segment.
    pub fn add_street(
        &mut self,
        from: VertexId,
        to: VertexId,
        segment: StreetSegment,
    ) -> Result<EdgeId, GraphError> {
        if !segment.length_m.is_finite() || segment.length_m < 0.0 {
            return Err(GraphError::InvalidLength(segment.length_m));
        }
        self.push_edge(from, to, EdgeKind::Street(segment))
    }

    /// Add a street segment in both directions.
    pub fn add_street_pair(
        &mut self,
        a: VertexId,
        b: VertexId,
        segment: StreetSegment,
    ) -> Result<(EdgeId, EdgeId), GraphError> {
        let forward = self.add_street(a, b, segment.clone())?;
        let backward = self.add_street(b, a, segment)?;
        Ok((forward, backward))
    }

    /// Add a walk-only street pair whose length is the straight-line
    /// distance between its ends.
    pub fn add_footpath(&mut self, a: VertexId, b: VertexId) -> Result<(EdgeId, EdgeId), GraphError> {
        let length = self
            .vertex_coordinate(a)
            .distance_meters(&self.vertex_coordinate(b));
        let segment = StreetSegment::new(length)
            .with_permission(TraverseModeSet::single(TraverseMode::Walk));
        self.add_street_pair(a, b, segment)
    }

    /// Add a transit stop with its own off-board vertex, labelled by the
    /// stop's feed-scoped id.
    pub fn add_stop(
        &mut self,
        id: &str,
        name: &str,
        coordinate: Coordinate,
        wheelchair_boarding: bool,
    ) -> Result<StopId, GraphError> {
        let stop_id = self.ids.create(id);
        let stop = StopId(self.stops.len() as u32);
        let vertex = self.push_vertex(Vertex::new(
            &stop_id.to_string(),
            coordinate,
            VertexKind::TransitStop(stop),
        ))?;

        self.stop_ids.insert(stop_id.clone(), stop);
        self.stops
            .push(TransitStop::new(stop_id, name, vertex, wheelchair_boarding));
        Ok(stop)
    }

    fn stop_vertex(&self, stop: StopId) -> Result<VertexId, GraphError> {
        self.stops
            .get(stop.index())
            .map(TransitStop::vertex)
            .ok_or_else(|| GraphError::UnknownStop(format!("{stop:?}")))
    }

    /// Connect a stop to a street vertex in both directions.
    pub fn link_stop(&mut self, stop: StopId, street: VertexId) -> Result<(), GraphError> {
        let stop_vertex = self.stop_vertex(stop)?;
        self.push_edge(street, stop_vertex, EdgeKind::StreetTransitLink { stop })?;
        self.push_edge(stop_vertex, street, EdgeKind::StreetTransitLink { stop })?;
        Ok(())
    }

    /// Add a one-way walking transfer between two stops.
    pub fn add_transfer(
        &mut self,
        from: StopId,
        to: StopId,
        distance_m: f64,
        min_time_s: i64,
    ) -> Result<EdgeId, GraphError> {
        if !distance_m.is_finite() || distance_m < 0.0 {
            return Err(GraphError::InvalidLength(distance_m));
        }
        let from = self.stop_vertex(from)?;
        let to = self.stop_vertex(to)?;
        self.push_edge(
            from,
            to,
            EdgeKind::Transfer {
                distance_m,
                min_time_s,
            },
        )
    }

    /// Add a trip pattern serving `stops` in order, creating its on-board
    /// vertices and its board, alight, hop and dwell edges.
    pub fn add_pattern(
        &mut self,
        route_id: &str,
        stops: &[StopId],
        trips: Vec<TripTimes>,
    ) -> Result<PatternId, GraphError> {
        if stops.len() < 2 {
            return Err(GraphError::ShortPattern(stops.len()));
        }
        for trip in &trips {
            if trip.num_stops() != stops.len() {
                return Err(GraphError::StopTimeCount {
                    trip: trip.trip_id().to_string(),
                    expected: stops.len(),
                    found: trip.num_stops(),
                });
            }
        }
        let stop_vertices = stops
            .iter()
            .map(|&s| self.stop_vertex(s))
            .collect::<Result<Vec<_>, _>>()?;

        let pattern = PatternId(self.patterns.len() as u32);
        let route = self.ids.create(route_id);
        let last = stops.len() - 1;

        // Every on-board vertex is checked before any is added, so a
        // failed pattern leaves the builder unchanged.
        let mut onboard = Vec::with_capacity(2 * last);
        for pos in 0..stops.len() {
            let coordinate = self.vertex_coordinate(stop_vertices[pos]);
            if pos < last {
                onboard.push(Vertex::new(
                    &format!("{route}/{}/depart/{pos}", pattern.0),
                    coordinate,
                    VertexKind::PatternDepart {
                        pattern,
                        stop_index: pos,
                    },
                ));
            }
            if pos > 0 {
                onboard.push(Vertex::new(
                    &format!("{route}/{}/arrive/{pos}", pattern.0),
                    coordinate,
                    VertexKind::PatternArrive {
                        pattern,
                        stop_index: pos,
                    },
                ));
            }
        }
        if let Some(taken) = onboard.iter().find(|v| self.labels.contains_key(v.label())) {
            return Err(GraphError::DuplicateLabel(taken.label().to_string()));
        }

        let mut depart_vertices = Vec::with_capacity(last);
        let mut arrive_vertices = Vec::with_capacity(last);
        for vertex in onboard {
            let is_depart = matches!(vertex.kind(), VertexKind::PatternDepart { .. });
            let id = self.push_vertex(vertex)?;
            if is_depart {
                depart_vertices.push(id);
            } else {
                arrive_vertices.push(id);
            }
        }

        for pos in 0..stops.len() {
            let stop_index = pos;
            if pos < last {
                let depart = depart_vertices[pos];
                self.push_edge(stop_vertices[pos], depart, EdgeKind::Board { pattern, stop_index })?;
                self.push_edge(depart, arrive_vertices[pos], EdgeKind::Hop { pattern, stop_index })?;
            }
            if pos > 0 {
                let arrive = arrive_vertices[pos - 1];
                self.push_edge(arrive, stop_vertices[pos], EdgeKind::Alight { pattern, stop_index })?;
                if pos < last {
                    self.push_edge(arrive, depart_vertices[pos], EdgeKind::Dwell { pattern, stop_index })?;
                }
            }
        }

        debug!(pattern = ?pattern, route = %route, stops = stops.len(), trips = trips.len(), "added trip pattern");
        self.patterns.push(TripPattern::new(
            pattern,
            route,
            stops.to_vec(),
            trips,
            depart_vertices,
            arrive_vertices,
        ));
        Ok(pattern)
    }

    fn pattern(&self, id: PatternId) -> Result<&TripPattern, GraphError> {
        self.patterns
            .get(id.index())
            .ok_or(GraphError::UnknownPattern(id))
    }

    fn trip_index(&self, pattern: PatternId, trip: &str) -> Result<usize, GraphError> {
        let trip_id = self.ids.create(trip);
        self.pattern(pattern)?
            .trip_index(&trip_id)
            .ok_or_else(|| GraphError::UnknownTrip(trip_id.to_string()))
    }

    fn find_trip(&self, trip: &str) -> Result<TripRef, GraphError> {
        let trip_id = self.ids.create(trip);
        self.patterns
            .iter()
            .find_map(|p| {
                p.trip_index(&trip_id).map(|trip_index| TripRef {
                    pattern: p.id(),
                    trip_index,
                })
            })
            .ok_or_else(|| GraphError::UnknownTrip(trip_id.to_string()))
    }

    /// Let riders stay on board from the end of `from` to the start of
    /// `to`, for the given `(from trip, to trip)` pairs.
    pub fn add_interline(
        &mut self,
        from: PatternId,
        to: PatternId,
        trips: &[(&str, &str)],
    ) -> Result<EdgeId, GraphError> {
        let pairs = trips
            .iter()
            .map(|(a, b)| -> Result<(usize, usize), GraphError> {
                Ok((self.trip_index(from, a)?, self.trip_index(to, b)?))
            })
            .collect::<Result<Vec<_>, _>>()?;

        let from_pattern = self.pattern(from)?;
        let to_pattern = self.pattern(to)?;
        let arrive = from_pattern
            .arrive_vertex(from_pattern.num_stops() - 1)
            .ok_or(GraphError::UnknownPattern(from))?;
        let depart = to_pattern
            .depart_vertex(0)
            .ok_or(GraphError::UnknownPattern(to))?;

        self.push_edge(
            arrive,
            depart,
            EdgeKind::InterlineDwell(Interline {
                from_pattern: from,
                to_pattern: to,
                trips: pairs,
            }),
        )
    }

    /// Constrain the transfer from `from_trip` alighting at `from_stop` to
    /// `to_trip` boarding at `to_stop`.
    pub fn add_trip_transfer(
        &mut self,
        from_trip: &str,
        from_stop: StopId,
        to_trip: &str,
        to_stop: StopId,
        constraint: TransferConstraint,
    ) -> Result<(), GraphError> {
        let from = self.find_trip(from_trip)?;
        let to = self.find_trip(to_trip)?;

        let not_served = |stop: StopId, trip: &str| GraphError::StopNotOnTrip {
            stop: format!("{stop:?}"),
            trip: trip.to_string(),
        };
        let from_stop_pos = self
            .pattern(from.pattern)?
            .stops()
            .iter()
            .rposition(|&s| s == from_stop)
            .filter(|&pos| pos > 0)
            .ok_or_else(|| not_served(from_stop, from_trip))?;
        let to_pattern = self.pattern(to.pattern)?;
        let to_stop_pos = to_pattern
            .stop_position(to_stop)
            .filter(|&pos| pos + 1 < to_pattern.num_stops())
            .ok_or_else(|| not_served(to_stop, to_trip))?;

        self.trip_transfers.push(TripTransfer {
            from,
            from_stop_pos,
            to,
            to_stop_pos,
            constraint,
        });
        Ok(())
    }

    pub fn build(self) -> Graph {
        let mut outgoing = vec![Vec::new(); self.vertices.len()];
        let mut incoming = vec![Vec::new(); self.vertices.len()];
        for (i, edge) in self.edges.iter().enumerate() {
            outgoing[edge.from().index()].push(EdgeId(i as u32));
            incoming[edge.to().index()].push(EdgeId(i as u32));
        }

        debug!(
            vertices = self.vertices.len(),
            edges = self.edges.len(),
            stops = self.stops.len(),
            patterns = self.patterns.len(),
            feed = self.ids.feed_id(),
            "graph built"
        );

        Graph {
            vertices: self.vertices,
            edges: self.edges,
            outgoing,
            incoming,
            labels: self.labels,
            stops: self.stops,
            stop_ids: self.stop_ids,
            patterns: self.patterns,
            trip_transfers: self.trip_transfers,
            service_day: self.service_day,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn builder() -> GraphBuilder {
        GraphBuilder::new(IdFactory::new("t"), ServiceDay::default())
    }

    fn c(lat: f64, lon: f64) -> Coordinate {
        Coordinate::new(lat, lon)
    }

    #[test]
    fn duplicate_label_rejected() {
        let mut b = builder();
        b.add_intersection("A", c(0.0, 0.0)).unwrap();
        assert_eq!(
            b.add_intersection("A", c(1.0, 1.0)),
            Err(GraphError::DuplicateLabel("A".to_string()))
        );
    }

    #[test]
    fn bad_street_rejected() {
        let mut b = builder();
        let a = b.add_intersection("A", c(0.0, 0.0)).unwrap();

        assert!(matches!(
            b.add_street(a, VertexId(7), StreetSegment::new(1.0)),
            Err(GraphError::UnknownVertex(VertexId(7)))
        ));
        assert!(matches!(
            b.add_street(a, a, StreetSegment::new(f64::NAN)),
            Err(GraphError::InvalidLength(_))
        ));
    }

    #[test]
    fn zero_length_street_is_fine() {
        let mut b = builder();
        let a = b.add_intersection("A", c(0.0, 0.0)).unwrap();
        let z = b.add_intersection("Z", c(0.0, 0.0)).unwrap();
        assert!(b.add_street_pair(a, z, StreetSegment::new(0.0)).is_ok());
    }

    #[test]
    fn pattern_creates_onboard_structure() {
        let mut b = builder();
        let stops: Vec<StopId> = (0..3)
            .map(|i| {
                b.add_stop(&format!("S{i}"), "stop", c(0.0, i as f64 * 0.01), true)
                    .unwrap()
            })
            .collect();
        let trip = TripTimes::from_departures(b.ids().create("T1"), vec![0, 60, 120]).unwrap();
        let p = b.add_pattern("R1", &stops, vec![trip]).unwrap();
        let graph = b.build();

        // 3 stop vertices, 2 depart and 2 arrive vertices
        assert_eq!(graph.vertex_count(), 7);
        let kinds: Vec<_> = graph.edges().map(|(_, e)| e.kind().clone()).collect();
        let count = |f: fn(&EdgeKind) -> bool| kinds.iter().filter(|k| f(k)).count();
        assert_eq!(count(|k| matches!(k, EdgeKind::Board { .. })), 2);
        assert_eq!(count(|k| matches!(k, EdgeKind::Alight { .. })), 2);
        assert_eq!(count(|k| matches!(k, EdgeKind::Hop { .. })), 2);
        assert_eq!(count(|k| matches!(k, EdgeKind::Dwell { .. })), 1);

        let pattern = graph.pattern(p);
        assert_eq!(pattern.route_id().to_string(), "t:R1");
        assert_eq!(graph.stop_by_id(&b_id("S1")), Some(stops[1]));
    }

    fn b_id(s: &str) -> FeedScopedId {
        IdFactory::new("t").create(s)
    }

    #[test]
    fn pattern_validation() {
        let mut b = builder();
        let s0 = b.add_stop("S0", "a", c(0.0, 0.0), true).unwrap();
        let s1 = b.add_stop("S1", "b", c(0.0, 0.1), true).unwrap();

        assert_eq!(
            b.add_pattern("R", &[s0], vec![]),
            Err(GraphError::ShortPattern(1))
        );

        let trip = TripTimes::from_departures(b.ids().create("T"), vec![0, 10, 20]).unwrap();
        assert!(matches!(
            b.add_pattern("R", &[s0, s1], vec![trip]),
            Err(GraphError::StopTimeCount { expected: 2, found: 3, .. })
        ));
    }

    #[test]
    fn failed_pattern_leaves_builder_unchanged() {
        let mut b = builder();
        let s0 = b.add_stop("S0", "a", c(0.0, 0.0), true).unwrap();
        let s1 = b.add_stop("S1", "b", c(0.0, 0.1), true).unwrap();
        b.add_intersection("t:R/0/arrive/1", c(1.0, 1.0)).unwrap();
        let (vertices, edges) = (b.vertices.len(), b.edges.len());

        let trip = TripTimes::from_departures(b.ids().create("T"), vec![0, 10]).unwrap();
        assert_eq!(
            b.add_pattern("R", &[s0, s1], vec![trip.clone()]),
            Err(GraphError::DuplicateLabel("t:R/0/arrive/1".to_string()))
        );
        assert_eq!(b.vertices.len(), vertices);
        assert_eq!(b.edges.len(), edges);
        assert!(!b.labels.contains_key("t:R/0/depart/0"));

        assert!(b.add_pattern("Q", &[s0, s1], vec![trip]).is_ok());
        assert_eq!(b.vertices.len(), vertices + 2);
    }

    #[test]
    fn trip_transfer_resolution() {
        let mut b = builder();
        let s: Vec<StopId> = (0..3)
            .map(|i| b.add_stop(&format!("S{i}"), "s", c(0.0, i as f64), true).unwrap())
            .collect();
        let t1 = TripTimes::from_departures(b.ids().create("A"), vec![0, 100]).unwrap();
        let t2 = TripTimes::from_departures(b.ids().create("B"), vec![150, 200]).unwrap();
        let p1 = b.add_pattern("R1", &[s[0], s[1]], vec![t1]).unwrap();
        let p2 = b.add_pattern("R2", &[s[1], s[2]], vec![t2]).unwrap();

        b.add_trip_transfer("A", s[1], "B", s[1], TransferConstraint::Guaranteed)
            .unwrap();
        assert!(matches!(
            b.add_trip_transfer("A", s[2], "B", s[1], TransferConstraint::Guaranteed),
            Err(GraphError::StopNotOnTrip { .. })
        ));
        assert!(matches!(
            b.add_trip_transfer("nope", s[1], "B", s[1], TransferConstraint::Guaranteed),
            Err(GraphError::UnknownTrip(_))
        ));

        let graph = b.build();
        let tt = graph.trip_transfers()[0];
        assert_eq!(tt.from, TripRef { pattern: p1, trip_index: 0 });
        assert_eq!(tt.to, TripRef { pattern: p2, trip_index: 0 });
        assert_eq!((tt.from_stop_pos, tt.to_stop_pos), (1, 0));
    }
}
