//! Turning the places a caller names into points in the graph.

use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::domain::{Coordinate, FeedScopedId, TraverseModeSet};
use crate::graph::{EdgeKind, Graph, VertexId, VertexKind};
use crate::state::LocatedPoint;

/// A place a trip starts, ends or passes through.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Place {
    /// A vertex, by label.
    Vertex(String),
    /// A transit stop, by feed-scoped id.
    Stop(FeedScopedId),
    /// Anywhere; snapped to the network by a [`VertexLocator`].
    Coordinate(Coordinate),
}

/// Which input a place was.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum PlaceRole {
    From,
    To,
    /// Zero-based position among the intermediate places.
    Intermediate(usize),
}

impl fmt::Display for PlaceRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PlaceRole::From => write!(f, "from"),
            PlaceRole::To => write!(f, "to"),
            PlaceRole::Intermediate(i) => write!(f, "intermediate place {i}"),
        }
    }
}

/// Finds where a coordinate joins the network.
pub trait VertexLocator {
    /// The point nearest `coordinate` usable by one of `modes`, if any is
    /// close enough.
    fn locate(&self, graph: &Graph, coordinate: Coordinate, modes: TraverseModeSet) -> Option<LocatedPoint>;
}

/// Snaps to the nearest street vertex with a usable street leaving it.
///
/// Scans every vertex, which suits the small graphs this crate is tested
/// on; a spatial index can stand in through [`VertexLocator`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NearestVertexLocator {
    /// Coordinates farther than this from every vertex are not found.
    pub max_distance_m: f64,
}

impl Default for NearestVertexLocator {
    fn default() -> Self {
        Self {
            max_distance_m: 1_000.0,
        }
    }
}

impl NearestVertexLocator {
    fn usable(graph: &Graph, v: VertexId, modes: TraverseModeSet) -> bool {
        graph.outgoing(v).iter().any(|&e| match graph.edge(e).kind() {
            EdgeKind::Street(segment) => modes.street_modes().any(|m| segment.permission.contains(m)),
            _ => false,
        })
    }
}

impl VertexLocator for NearestVertexLocator {
    fn locate(&self, graph: &Graph, coordinate: Coordinate, modes: TraverseModeSet) -> Option<LocatedPoint> {
        let (vertex, distance) = graph
            .vertices()
            .filter(|(_, v)| v.kind() == VertexKind::Intersection)
            .filter(|&(id, _)| Self::usable(graph, id, modes))
            .map(|(id, v)| (id, v.coordinate().distance_meters(&coordinate)))
            .min_by(|a, b| a.1.total_cmp(&b.1))?;
        trace!(?vertex, distance, "nearest vertex");
        (distance <= self.max_distance_m).then_some(LocatedPoint::Vertex(vertex))
    }
}

/// Find `place` in `graph`.
pub fn resolve(
    graph: &Graph,
    place: &Place,
    locator: &dyn VertexLocator,
    modes: TraverseModeSet,
) -> Option<LocatedPoint> {
    match place {
        Place::Vertex(label) => graph.vertex_by_label(label).map(LocatedPoint::Vertex),
        Place::Stop(id) => graph
            .stop_by_id(id)
            .map(|stop| LocatedPoint::Vertex(graph.stop(stop).vertex())),
        Place::Coordinate(coordinate) => locator.locate(graph, *coordinate, modes),
    }
}
