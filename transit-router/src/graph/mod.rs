//! The routing graph: vertices, typed edges and transit schedules.
//!
//! A [`Graph`] is built once with a [`GraphBuilder`] and then only read.
//! Street intersections, transit stops and the on-board vertices of each
//! trip pattern all live in the same vertex space, so every search engine
//! walks one uniform structure.

mod builder;
mod edge;
mod error;
mod network;
mod transit;
mod vertex;

#[cfg(test)]
pub(crate) mod fixtures;

pub use builder::GraphBuilder;
pub use edge::{Edge, EdgeKind, Interline, StreetSegment};
pub use error::GraphError;
pub use network::Graph;
pub use transit::{
    PatternId, StopId, TransferConstraint, TransitStop, TripPattern, TripRef, TripTimes,
    TripTransfer,
};
pub use vertex::{EdgeId, Vertex, VertexId, VertexKind};
