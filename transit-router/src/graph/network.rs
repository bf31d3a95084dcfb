//! The immutable routing graph.

use std::collections::HashMap;
use std::sync::Arc;

use crate::domain::{FeedScopedId, ServiceDay};

use super::edge::{Edge, EdgeKind};
use super::transit::{PatternId, StopId, TransitStop, TripPattern, TripTransfer};
use super::vertex::{EdgeId, Vertex, VertexId};

/// Street and transit network, read-only once built.
///
/// Searches borrow a `Graph` for their whole run and never write to it;
/// per-search additions live in a [`RoutingContext`](crate::state::RoutingContext).
#[derive(Debug, Clone)]
pub struct Graph {
    pub(super) vertices: Vec<Vertex>,
    pub(super) edges: Vec<Edge>,
    pub(super) outgoing: Vec<Vec<EdgeId>>,
    pub(super) incoming: Vec<Vec<EdgeId>>,
    pub(super) labels: HashMap<Arc<str>, VertexId>,
    pub(super) stops: Vec<TransitStop>,
    pub(super) stop_ids: HashMap<FeedScopedId, StopId>,
    pub(super) patterns: Vec<TripPattern>,
    pub(super) trip_transfers: Vec<TripTransfer>,
    pub(super) service_day: ServiceDay,
}

impl Graph {
    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    pub fn vertex(&self, id: VertexId) -> &Vertex {
        &self.vertices[id.index()]
    }

    pub fn edge(&self, id: EdgeId) -> &Edge {
        &self.edges[id.index()]
    }

    pub fn vertices(&self) -> impl Iterator<Item = (VertexId, &Vertex)> {
        self.vertices
            .iter()
            .enumerate()
            .map(|(i, v)| (VertexId(i as u32), v))
    }

    pub fn edges(&self) -> impl Iterator<Item = (EdgeId, &Edge)> {
        self.edges
            .iter()
            .enumerate()
            .map(|(i, e)| (EdgeId(i as u32), e))
    }

    /// Edges leaving `v`. Empty for ids outside the graph.
    pub fn outgoing(&self, v: VertexId) -> &[EdgeId] {
        self.outgoing.get(v.index()).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Edges entering `v`. Empty for ids outside the graph.
    pub fn incoming(&self, v: VertexId) -> &[EdgeId] {
        self.incoming.get(v.index()).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn contains_vertex(&self, v: VertexId) -> bool {
        v.index() < self.vertices.len()
    }

    pub fn vertex_by_label(&self, label: &str) -> Option<VertexId> {
        self.labels.get(label).copied()
    }

    pub fn stop(&self, id: StopId) -> &TransitStop {
        &self.stops[id.index()]
    }

    pub fn stops(&self) -> &[TransitStop] {
        &self.stops
    }

    pub fn stop_by_id(&self, id: &FeedScopedId) -> Option<StopId> {
        self.stop_ids.get(id).copied()
    }

    pub fn pattern(&self, id: PatternId) -> &TripPattern {
        &self.patterns[id.index()]
    }

    pub fn patterns(&self) -> &[TripPattern] {
        &self.patterns
    }

    /// Trip-to-trip transfer constraints.
    pub fn trip_transfers(&self) -> &[TripTransfer] {
        &self.trip_transfers
    }

    pub fn service_day(&self) -> ServiceDay {
        self.service_day
    }

    /// The first street edge from `from` to `to`, if any.
    pub fn street_edge_between(&self, from: VertexId, to: VertexId) -> Option<EdgeId> {
        self.outgoing(from).iter().copied().find(|&e| {
            let edge = self.edge(e);
            edge.to() == to && matches!(edge.kind(), EdgeKind::Street(_))
        })
    }

    /// The same network with every edge pointing the other way.
    ///
    /// Only street edges keep their meaning under reversal; transit edges
    /// are reversed too but describe impossible rides.
    pub fn reversed(&self) -> Graph {
        let edges: Vec<Edge> = self.edges.iter().map(Edge::reversed).collect();
        Graph {
            vertices: self.vertices.clone(),
            edges,
            outgoing: self.incoming.clone(),
            incoming: self.outgoing.clone(),
            labels: self.labels.clone(),
            stops: self.stops.clone(),
            stop_ids: self.stop_ids.clone(),
            patterns: self.patterns.clone(),
            trip_transfers: self.trip_transfers.clone(),
            service_day: self.service_day,
        }
    }
}
