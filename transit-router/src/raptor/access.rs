//! Street legs between the endpoints and the transit network.

use tracing::debug;

use crate::config::RaptorConfig;
use crate::graph::{EdgeKind, StopId, VertexKind};
use crate::heuristic::TrivialHeuristic;
use crate::search::{SearchLimits, astar};
use crate::state::RoutingContext;

/// A street leg to (access) or from (egress) a stop.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RaptorAccess {
    pub stop: StopId,
    /// Seconds on the street.
    pub duration: i32,
    /// Street weight times 100.
    pub cost: i64,
    pub distance_m: f64,
}

fn street_or_link(kind: &EdgeKind) -> bool {
    matches!(kind, EdgeKind::Street(_) | EdgeKind::StreetTransitLink { .. })
}

/// Every stop reachable on the street from the search start of `ctx`.
///
/// Runs a search without a target that never leaves the street and its
/// stop links, so one search finds every stop. The walk limit is the smaller of the request's and the
/// configured access limit. With `arrive_by` set on the request the legs
/// lead from the stops to the start vertex instead.
pub fn street_legs(ctx: &RoutingContext<'_>, config: &RaptorConfig) -> Vec<RaptorAccess> {
    let mut request = ctx.request().clone();
    request.max_walk_distance = Some(
        request
            .max_walk_distance
            .map_or(config.access_max_walk_m, |limit| limit.min(config.access_max_walk_m)),
    );
    request.max_weight = None;
    request.max_duration_s = None;

    let mut street_ctx = ctx.with_request(request);
    street_ctx.clear_search_target();
    let limits = SearchLimits {
        edge_filter: Some(street_or_link),
        ..SearchLimits::default()
    };
    let Some(tree) = astar(&street_ctx, &mut TrivialHeuristic, limits) else {
        return Vec::new();
    };

    let mut legs: Vec<RaptorAccess> = tree
        .reached()
        .filter_map(|vertex| {
            let VertexKind::TransitStop(stop) = street_ctx.vertex(vertex).kind() else {
                return None;
            };
            let (_, state) = tree.best_state(vertex)?;
            Some(RaptorAccess {
                stop,
                duration: i32::try_from(state.elapsed_seconds()).unwrap_or(i32::MAX),
                cost: (state.weight() * 100.0).round() as i64,
                distance_m: state.walk_distance(),
            })
        })
        .collect();
    legs.sort_by_key(|leg| (leg.stop, leg.duration));
    debug!(stops = legs.len(), arrive_by = ctx.request().arrive_by, "street legs found");
    legs
}
