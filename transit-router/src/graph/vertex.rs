//! Vertices and the dense identifiers used to address graph elements.

use std::fmt;
use std::sync::Arc;

use crate::domain::Coordinate;

use super::transit::{PatternId, StopId};

/// Index of a vertex.
///
/// Persistent vertices occupy `0..graph.vertex_count()`; temporary vertices
/// created by a routing context are numbered after them.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct VertexId(pub u32);

impl VertexId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Debug for VertexId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "v{}", self.0)
    }
}

/// Index of an edge. Numbered like [`VertexId`].
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EdgeId(pub u32);

impl EdgeId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Debug for EdgeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "e{}", self.0)
    }
}

/// What a vertex represents, which decides the edges that may touch it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VertexKind {
    /// A street intersection or other point on the street network.
    Intersection,
    /// A transit stop, off board.
    TransitStop(StopId),
    /// On board a vehicle of `pattern`, about to leave `stop_index`.
    PatternDepart { pattern: PatternId, stop_index: usize },
    /// On board a vehicle of `pattern`, having just reached `stop_index`.
    PatternArrive { pattern: PatternId, stop_index: usize },
    /// A point created for one search (e.g. an origin snapped onto a street).
    Temporary,
}

impl VertexKind {
    /// Returns true if a rider at this vertex is on board a vehicle.
    pub fn is_onboard(self) -> bool {
        matches!(
            self,
            VertexKind::PatternDepart { .. } | VertexKind::PatternArrive { .. }
        )
    }
}

/// A point in the combined street and transit network.
#[derive(Debug, Clone, PartialEq)]
pub struct Vertex {
    label: Arc<str>,
    coordinate: Coordinate,
    kind: VertexKind,
}

impl Vertex {
    pub fn new(label: &str, coordinate: Coordinate, kind: VertexKind) -> Self {
        Self {
            label: label.into(),
            coordinate,
            kind,
        }
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn coordinate(&self) -> Coordinate {
        self.coordinate
    }

    pub fn kind(&self) -> VertexKind {
        self.kind
    }
}
