//! The fixed edge weights a hierarchy is built for.

use serde::{Deserialize, Serialize};

use crate::domain::TraverseMode;
use crate::graph::{Edge, EdgeKind};
use crate::state::RoutingRequest;

/// A street mode with its speed and reluctance.
///
/// A hierarchy stores precomputed shortest paths for exactly one profile,
/// so only requests that weigh streets the same way can use it.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WeightProfile {
    pub mode: TraverseMode,
    /// Metres per second.
    pub speed: f64,
    pub reluctance: f64,
    pub wheelchair_accessible: bool,
}

impl WeightProfile {
    /// The profile `request` weighs streets with, or `None` for requests
    /// that may ride transit.
    pub fn for_request(request: &RoutingRequest) -> Option<Self> {
        if !request.is_street_only() {
            return None;
        }
        let mode = request.initial_street_mode();
        Some(Self {
            mode,
            speed: request.speed(mode),
            reluctance: request.reluctance(mode),
            wheelchair_accessible: request.wheelchair_accessible,
        })
    }

    pub fn walking(request: &RoutingRequest) -> Self {
        Self {
            mode: TraverseMode::Walk,
            speed: request.walk_speed,
            reluctance: request.walk_reluctance,
            wheelchair_accessible: request.wheelchair_accessible,
        }
    }

    /// Returns true if `request` weighs every street edge as this profile
    /// does.
    pub fn matches(&self, request: &RoutingRequest) -> bool {
        Self::for_request(request).is_some_and(|p| p == *self)
    }

    /// The weight of traversing `edge`, or `None` if the profile cannot
    /// use it.
    pub fn edge_weight(&self, edge: &Edge) -> Option<f64> {
        let EdgeKind::Street(segment) = edge.kind() else {
            return None;
        };
        if !segment.permission.contains(self.mode) {
            return None;
        }
        if self.wheelchair_accessible && !segment.wheelchair_accessible {
            return None;
        }
        Some(segment.length_m / self.speed * self.reluctance)
    }
}
