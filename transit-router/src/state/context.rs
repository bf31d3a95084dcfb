//! Binding a request to a graph for one search.

use std::collections::HashMap;

use tracing::debug;

use crate::graph::{Edge, EdgeId, EdgeKind, Graph, GraphError, StreetSegment, Vertex, VertexId, VertexKind};

use super::arena::StateId;
use super::request::RoutingRequest;
use super::traverse_state::State;

/// Where a search endpoint sits in the graph.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LocatedPoint {
    /// Exactly at a vertex.
    Vertex(VertexId),
    /// Part way along a street edge; `fraction` runs from the edge's start
    /// (0.0) to its end (1.0).
    OnEdge { edge: EdgeId, fraction: f64 },
}

/// Fractions closer than this to an edge's end snap to the end vertex.
const SNAP_FRACTION: f64 = 1e-6;

/// A temporary vertex placed part way along a street edge.
#[derive(Debug, Clone, Copy)]
struct Split {
    edge: EdgeId,
    fraction: f64,
    vertex: VertexId,
    origin: bool,
}

/// A request bound to a graph and to origin and destination vertices.
///
/// The context may add temporary vertices and edges, for example to start a
/// search part way along a street. They are numbered after the graph's own
/// elements and exist only in this context: the shared graph is never
/// touched, and they disappear when the context is dropped.
#[derive(Debug, Clone)]
pub struct RoutingContext<'g> {
    graph: &'g Graph,
    request: RoutingRequest,
    origin: Option<VertexId>,
    destination: Option<VertexId>,
    temp_vertices: Vec<Vertex>,
    temp_edges: Vec<Edge>,
    temp_outgoing: HashMap<VertexId, Vec<EdgeId>>,
    temp_incoming: HashMap<VertexId, Vec<EdgeId>>,
    splits: Vec<Split>,
}

impl<'g> RoutingContext<'g> {
    pub fn new(graph: &'g Graph, request: RoutingRequest) -> Self {
        Self {
            graph,
            request,
            origin: None,
            destination: None,
            temp_vertices: Vec::new(),
            temp_edges: Vec::new(),
            temp_outgoing: HashMap::new(),
            temp_incoming: HashMap::new(),
            splits: Vec::new(),
        }
    }

    /// A context between two existing vertices.
    pub fn between(
        graph: &'g Graph,
        request: RoutingRequest,
        origin: VertexId,
        destination: Option<VertexId>,
    ) -> Self {
        let mut ctx = Self::new(graph, request);
        ctx.origin = Some(origin);
        ctx.destination = destination;
        ctx
    }

    /// The same endpoints and temporary elements under another request.
    pub fn with_request(&self, request: RoutingRequest) -> Self {
        Self {
            request,
            ..self.clone()
        }
    }

    pub fn graph(&self) -> &'g Graph {
        self.graph
    }

    pub fn request(&self) -> &RoutingRequest {
        &self.request
    }

    pub fn origin(&self) -> Option<VertexId> {
        self.origin
    }

    pub fn destination(&self) -> Option<VertexId> {
        self.destination
    }

    /// Place the origin, splitting a street edge if needed.
    pub fn set_origin(&mut self, point: LocatedPoint) -> Result<VertexId, GraphError> {
        let v = self.locate(point, true)?;
        self.origin = Some(v);
        Ok(v)
    }

    /// Place the destination, splitting a street edge if needed.
    pub fn set_destination(&mut self, point: LocatedPoint) -> Result<VertexId, GraphError> {
        let v = self.locate(point, false)?;
        self.destination = Some(v);
        Ok(v)
    }

    pub fn clear_destination(&mut self) {
        self.destination = None;
    }

    /// Drop the endpoint the search would stop at, so that it explores
    /// everything reachable from its start.
    pub fn clear_search_target(&mut self) {
        if self.request.arrive_by {
            self.origin = None;
        } else {
            self.destination = None;
        }
    }

    /// Where the search begins: the destination for arrive-by requests.
    pub fn search_start(&self) -> Option<VertexId> {
        if self.request.arrive_by {
            self.destination
        } else {
            self.origin
        }
    }

    /// Where the search ends, if anywhere.
    pub fn search_target(&self) -> Option<VertexId> {
        if self.request.arrive_by {
            self.origin
        } else {
            self.destination
        }
    }

    /// The root state at [`search_start`](Self::search_start).
    pub fn initial_state(&self) -> Option<State> {
        let start = self.search_start()?;
        Some(State::initial(
            start,
            self.request.date_time,
            self.request.initial_street_mode(),
            self.request.arrive_by,
        ))
    }

    pub fn vertex_count(&self) -> usize {
        self.graph.vertex_count() + self.temp_vertices.len()
    }

    pub fn edge_count(&self) -> usize {
        self.graph.edge_count() + self.temp_edges.len()
    }

    pub fn temporary_vertex_count(&self) -> usize {
        self.temp_vertices.len()
    }

    pub fn vertex(&self, id: VertexId) -> &Vertex {
        match id.index().checked_sub(self.graph.vertex_count()) {
            Some(i) => &self.temp_vertices[i],
            None => self.graph.vertex(id),
        }
    }

    pub fn edge(&self, id: EdgeId) -> &Edge {
        match id.index().checked_sub(self.graph.edge_count()) {
            Some(i) => &self.temp_edges[i],
            None => self.graph.edge(id),
        }
    }

    pub fn outgoing(&self, v: VertexId) -> impl Iterator<Item = EdgeId> + '_ {
        let temp = self.temp_outgoing.get(&v).map(Vec::as_slice).unwrap_or(&[]);
        self.graph.outgoing(v).iter().chain(temp).copied()
    }

    pub fn incoming(&self, v: VertexId) -> impl Iterator<Item = EdgeId> + '_ {
        let temp = self.temp_incoming.get(&v).map(Vec::as_slice).unwrap_or(&[]);
        self.graph.incoming(v).iter().chain(temp).copied()
    }

    /// Edges to explore from `v`: outgoing for depart-by, incoming for
    /// arrive-by.
    pub fn search_edges(&self, v: VertexId) -> impl Iterator<Item = EdgeId> + '_ {
        let (persistent, temp) = if self.request.arrive_by {
            (self.graph.incoming(v), &self.temp_incoming)
        } else {
            (self.graph.outgoing(v), &self.temp_outgoing)
        };
        let temp = temp.get(&v).map(Vec::as_slice).unwrap_or(&[]);
        persistent.iter().chain(temp).copied()
    }

    /// Traverse `edge` from the state `parent`, stored as `parent_id`.
    pub fn traverse(&self, edge: EdgeId, parent_id: StateId, parent: &State) -> Vec<State> {
        self.edge(edge).traverse(edge, parent_id, parent, self)
    }

    fn locate(&mut self, point: LocatedPoint, origin: bool) -> Result<VertexId, GraphError> {
        match point {
            LocatedPoint::Vertex(v) => {
                if v.index() >= self.vertex_count() {
                    return Err(GraphError::UnknownVertex(v));
                }
                Ok(v)
            }
            LocatedPoint::OnEdge { edge, fraction } => self.split_edge(edge, fraction, origin),
        }
    }

    /// Create a temporary vertex `fraction` of the way along street edge
    /// `edge`, connected to the edge's ends (and to the ends of its twin
    /// running the other way, if there is one).
    ///
    /// An origin gets edges leaving the new vertex; a destination gets
    /// edges entering it. An origin and destination split on the same
    /// street are also joined directly, in whichever direction the street
    /// runs between them.
    pub fn split_edge(
        &mut self,
        edge: EdgeId,
        fraction: f64,
        origin: bool,
    ) -> Result<VertexId, GraphError> {
        if edge.index() >= self.graph.edge_count() {
            return Err(GraphError::NotAStreetEdge(edge));
        }
        let base = self.graph.edge(edge);
        let EdgeKind::Street(segment) = base.kind() else {
            return Err(GraphError::NotAStreetEdge(edge));
        };

        let fraction = if fraction.is_finite() {
            fraction.clamp(0.0, 1.0)
        } else {
            0.0
        };
        if fraction < SNAP_FRACTION {
            return Ok(base.from());
        }
        if fraction > 1.0 - SNAP_FRACTION {
            return Ok(base.to());
        }

        let (u, v) = (base.from(), base.to());
        let coordinate = self
            .graph
            .vertex(u)
            .coordinate()
            .interpolate(&self.graph.vertex(v).coordinate(), fraction);
        let role = if origin { "origin" } else { "destination" };
        let label = format!("temporary {role} {}", self.temp_vertices.len());
        let split = VertexId(self.vertex_count() as u32);
        self.temp_vertices
            .push(Vertex::new(&label, coordinate, VertexKind::Temporary));

        let part = |share: f64| StreetSegment {
            length_m: segment.length_m * share,
            ..segment.clone()
        };
        let twin = self.graph.street_edge_between(v, u);

        if origin {
            self.push_temp_edge(Edge::new(split, v, EdgeKind::Street(part(1.0 - fraction))));
            if twin.is_some() {
                self.push_temp_edge(Edge::new(split, u, EdgeKind::Street(part(fraction))));
            }
        } else {
            self.push_temp_edge(Edge::new(u, split, EdgeKind::Street(part(fraction))));
            if twin.is_some() {
                self.push_temp_edge(Edge::new(v, split, EdgeKind::Street(part(1.0 - fraction))));
            }
        }

        self.join_splits_on_street(edge, fraction, split, origin, twin);
        self.splits.push(Split {
            edge,
            fraction,
            vertex: split,
            origin,
        });

        debug!(vertex = ?split, edge = ?edge, fraction, role, "split street edge");
        Ok(split)
    }

    /// Connect a new split to the earlier splits of the other role on
    /// `edge` or on its `twin`. Positions are measured along `edge`.
    fn join_splits_on_street(
        &mut self,
        edge: EdgeId,
        fraction: f64,
        split: VertexId,
        origin: bool,
        twin: Option<EdgeId>,
    ) {
        let others: Vec<(f64, VertexId)> = self
            .splits
            .iter()
            .filter(|s| s.origin != origin)
            .filter_map(|s| {
                if s.edge == edge {
                    Some((s.fraction, s.vertex))
                } else if Some(s.edge) == twin {
                    Some((1.0 - s.fraction, s.vertex))
                } else {
                    None
                }
            })
            .collect();

        for (other_fraction, other) in others {
            let (from, to, from_at, to_at) = if origin {
                (split, other, fraction, other_fraction)
            } else {
                (other, split, other_fraction, fraction)
            };
            // Travel along `edge` when the destination lies ahead of the
            // origin, along its twin otherwise.
            let along = if to_at >= from_at { Some(edge) } else { twin };
            let Some(along) = along else {
                continue;
            };
            let EdgeKind::Street(segment) = self.graph.edge(along).kind() else {
                continue;
            };
            let joined = StreetSegment {
                length_m: segment.length_m * (to_at - from_at).abs(),
                ..segment.clone()
            };
            self.push_temp_edge(Edge::new(from, to, EdgeKind::Street(joined)));
        }
    }

    fn push_temp_edge(&mut self, edge: Edge) {
        let id = EdgeId(self.edge_count() as u32);
        self.temp_outgoing.entry(edge.from()).or_default().push(id);
        self.temp_incoming.entry(edge.to()).or_default().push(id);
        self.temp_edges.push(edge);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Coordinate, TraverseMode, TraverseModeSet};
    use crate::graph::fixtures;
    use crate::heuristic::TrivialHeuristic;
    use crate::search::{SearchLimits, astar};

    fn street_edge(graph: &Graph, from: &str, to: &str) -> EdgeId {
        let from = graph.vertex_by_label(from).unwrap();
        let to = graph.vertex_by_label(to).unwrap();
        graph.street_edge_between(from, to).unwrap()
    }

    #[test]
    fn split_origin_adds_outgoing_edges() {
        let graph = fixtures::line(2);
        let mut ctx = RoutingContext::new(&graph, RoutingRequest::default());
        let edge = street_edge(&graph, "V0", "V1");

        let origin = ctx
            .set_origin(LocatedPoint::OnEdge {
                edge,
                fraction: 0.25,
            })
            .unwrap();

        assert_eq!(origin.index(), graph.vertex_count());
        assert_eq!(ctx.vertex(origin).kind(), VertexKind::Temporary);

        let lengths: Vec<f64> = ctx.outgoing(origin).map(|e| ctx.edge(e).distance_m()).collect();
        assert_eq!(lengths, vec![75.0, 25.0]);

        // The new edges enter the original vertices without changing the graph.
        let v1 = graph.vertex_by_label("V1").unwrap();
        assert_eq!(ctx.incoming(v1).count(), graph.incoming(v1).len() + 1);
        assert_eq!(graph.vertex_count(), 2);
    }

    #[test]
    fn split_destination_adds_incoming_edges() {
        let graph = fixtures::line(2);
        let mut ctx = RoutingContext::new(&graph, RoutingRequest::default());
        let edge = street_edge(&graph, "V0", "V1");

        let dest = ctx
            .set_destination(LocatedPoint::OnEdge {
                edge,
                fraction: 0.5,
            })
            .unwrap();

        assert_eq!(ctx.incoming(dest).count(), 2);
        assert_eq!(ctx.outgoing(dest).count(), 0);
        assert_eq!(ctx.destination(), Some(dest));
    }

    #[test]
    fn split_at_ends_snaps() {
        let graph = fixtures::line(2);
        let mut ctx = RoutingContext::new(&graph, RoutingRequest::default());
        let edge = street_edge(&graph, "V0", "V1");

        let v = ctx
            .set_origin(LocatedPoint::OnEdge { edge, fraction: 1.0 })
            .unwrap();
        assert_eq!(v, graph.vertex_by_label("V1").unwrap());
        assert_eq!(ctx.temporary_vertex_count(), 0);
    }

    #[test]
    fn temporary_vertices_are_per_context() {
        let graph = fixtures::line(2);
        let edge = street_edge(&graph, "V0", "V1");

        let mut a = RoutingContext::new(&graph, RoutingRequest::default());
        a.set_origin(LocatedPoint::OnEdge { edge, fraction: 0.5 }).unwrap();
        let b = RoutingContext::new(&graph, RoutingRequest::default());

        assert_eq!(a.vertex_count(), 3);
        assert_eq!(b.vertex_count(), 2);
    }

    #[test]
    fn non_street_edges_cannot_be_split() {
        let graph = fixtures::small_transit();
        let (board, _) = graph
            .edges()
            .find(|(_, e)| matches!(e.kind(), EdgeKind::Board { .. }))
            .unwrap();
        let mut ctx = RoutingContext::new(&graph, RoutingRequest::default());

        assert_eq!(
            ctx.set_origin(LocatedPoint::OnEdge {
                edge: board,
                fraction: 0.5
            }),
            Err(GraphError::NotAStreetEdge(board))
        );
    }

    fn unit_walk() -> RoutingRequest {
        RoutingRequest {
            walk_speed: 1.0,
            walk_reluctance: 1.0,
            ..RoutingRequest::new(TraverseModeSet::single(TraverseMode::Walk))
        }
    }

    fn walk_between(request: RoutingRequest, origin: f64, destination: f64, destination_first: bool) -> f64 {
        let graph = fixtures::line(2);
        let edge = street_edge(&graph, "V0", "V1");
        let mut ctx = RoutingContext::new(&graph, request);
        let origin = LocatedPoint::OnEdge { edge, fraction: origin };
        let destination = LocatedPoint::OnEdge { edge, fraction: destination };
        if destination_first {
            ctx.set_destination(destination).unwrap();
            ctx.set_origin(origin).unwrap();
        } else {
            ctx.set_origin(origin).unwrap();
            ctx.set_destination(destination).unwrap();
        }

        let target = ctx.search_target().unwrap();
        let tree = astar(&ctx, &mut TrivialHeuristic, SearchLimits::default()).unwrap();
        let (_, state) = tree.best_state(target).unwrap();
        assert_eq!(state.walk_distance(), state.weight());
        state.weight()
    }

    #[test]
    fn endpoints_on_one_street_are_joined_directly() {
        assert_eq!(walk_between(unit_walk(), 0.25, 0.75, false), 50.0);
        assert_eq!(walk_between(unit_walk(), 0.25, 0.75, true), 50.0);
        // Back along the twin edge.
        assert_eq!(walk_between(unit_walk(), 0.75, 0.25, false), 50.0);
        let arrive_by = RoutingRequest {
            date_time: 1_000,
            ..unit_walk().with_arrive_by(true)
        };
        assert_eq!(walk_between(arrive_by, 0.25, 0.75, false), 50.0);
    }

    #[test]
    fn endpoints_on_twin_edges_are_joined() {
        let graph = fixtures::line(2);
        let forward = street_edge(&graph, "V0", "V1");
        let backward = street_edge(&graph, "V1", "V0");
        let mut ctx = RoutingContext::new(&graph, unit_walk());
        // 0.8 along V1->V0 is 0.2 along V0->V1.
        ctx.set_origin(LocatedPoint::OnEdge { edge: backward, fraction: 0.8 }).unwrap();
        let dest = ctx
            .set_destination(LocatedPoint::OnEdge { edge: forward, fraction: 0.6 })
            .unwrap();

        let tree = astar(&ctx, &mut TrivialHeuristic, SearchLimits::default()).unwrap();
        let weight = tree.best_state(dest).unwrap().1.weight();
        assert!((weight - 40.0).abs() < 1e-9);
    }

    #[test]
    fn one_way_street_is_not_joined_backward() {
        let mut b = fixtures::builder();
        let u = b.add_intersection("U", Coordinate::new(0.0, 0.0)).unwrap();
        let v = b.add_intersection("V", Coordinate::new(0.0, 0.001)).unwrap();
        let edge = b.add_street(u, v, StreetSegment::new(100.0)).unwrap();
        let graph = b.build();

        let mut ctx = RoutingContext::new(&graph, unit_walk());
        ctx.set_origin(LocatedPoint::OnEdge { edge, fraction: 0.75 }).unwrap();
        ctx.set_destination(LocatedPoint::OnEdge { edge, fraction: 0.25 }).unwrap();

        assert!(astar(&ctx, &mut TrivialHeuristic, SearchLimits::default()).is_none());
    }

    #[test]
    fn search_direction() {
        let graph = fixtures::line(3);
        let v0 = graph.vertex_by_label("V0").unwrap();
        let v2 = graph.vertex_by_label("V2").unwrap();

        let request = RoutingRequest::default().with_arrive_by(true);
        let ctx = RoutingContext::between(&graph, request, v0, Some(v2));

        assert_eq!(ctx.search_start(), Some(v2));
        assert_eq!(ctx.search_target(), Some(v0));
        assert_eq!(ctx.initial_state().unwrap().vertex(), v2);
        assert!(ctx.search_edges(v2).all(|e| ctx.edge(e).to() == v2));
    }
}
