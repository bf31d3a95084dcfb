//! Graph construction errors.

use super::transit::PatternId;
use super::vertex::{EdgeId, VertexId};

/// Error from building or editing a graph.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum GraphError {
    #[error("duplicate vertex label: {0}")]
    DuplicateLabel(String),

    #[error("unknown vertex: {0:?}")]
    UnknownVertex(VertexId),

    #[error("unknown stop: {0}")]
    UnknownStop(String),

    #[error("unknown trip: {0}")]
    UnknownTrip(String),

    #[error("unknown pattern: {0:?}")]
    UnknownPattern(PatternId),

    #[error("trip {trip} has {found} stop times, expected {expected}")]
    StopTimeCount {
        trip: String,
        expected: usize,
        found: usize,
    },

    #[error("trip {trip} runs backwards in time at stop position {position}")]
    DecreasingTimes { trip: String, position: usize },

    #[error("a pattern needs at least two stops, got {0}")]
    ShortPattern(usize),

    #[error("stop {stop} is not served by trip {trip}")]
    StopNotOnTrip { stop: String, trip: String },

    #[error("invalid street length: {0}")]
    InvalidLength(f64),

    #[error("edge {0:?} is not a street edge")]
    NotAStreetEdge(EdgeId),
}
