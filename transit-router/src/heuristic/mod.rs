//! Remaining-weight estimators for goal-directed search.
//!
//! Every estimator is admissible: it never returns more than the weight
//! actually needed to reach the search target from a state. Searches add
//! the estimate to a state's weight to order the queue, so an
//! overestimate would make them miss optimal paths.

mod bidirectional;
mod euclidean;

pub use bidirectional::BidirectionalHeuristic;
pub use euclidean::EuclideanHeuristic;

use crate::config::HeuristicConfig;
use crate::state::{RoutingContext, State};

/// Estimates the weight still needed to reach the search target.
pub trait RemainingWeightHeuristic: Send {
    /// Prepare for a search in `ctx`. Called once before the first
    /// [`estimate`](Self::estimate).
    fn initialize(&mut self, ctx: &RoutingContext<'_>);

    /// A lower bound on the weight from `state` to the target.
    /// `f64::INFINITY` means the target cannot be reached from `state`.
    fn estimate(&self, state: &State, ctx: &RoutingContext<'_>) -> f64;

    /// Release any background work. Called when the search ends.
    fn abort(&mut self) {}
}

/// Always zero, which turns A* into Dijkstra's algorithm.
#[derive(Debug, Clone, Copy, Default)]
pub struct TrivialHeuristic;

impl RemainingWeightHeuristic for TrivialHeuristic {
    fn initialize(&mut self, _ctx: &RoutingContext<'_>) {}

    fn estimate(&self, _state: &State, _ctx: &RoutingContext<'_>) -> f64 {
        0.0
    }
}

/// The default estimator for a search in `ctx`.
///
/// Searches without a target get [`TrivialHeuristic`]. Transit searches get
/// the precomputed [`BidirectionalHeuristic`] when `config` enables it;
/// everything else uses [`EuclideanHeuristic`].
pub fn default_heuristic(
    ctx: &RoutingContext<'_>,
    config: &HeuristicConfig,
) -> Box<dyn RemainingWeightHeuristic> {
    if ctx.search_target().is_none() {
        return Box::new(TrivialHeuristic);
    }
    if config.bidirectional && ctx.request().modes.has_transit() {
        Box::new(BidirectionalHeuristic::new(config))
    } else {
        Box::new(EuclideanHeuristic::new(config))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{TraverseMode, TraverseModeSet};
    use crate::graph::fixtures;
    use crate::state::RoutingRequest;

    #[test]
    fn trivial_is_zero() {
        let graph = fixtures::line(2);
        let v0 = graph.vertex_by_label("V0").unwrap();
        let ctx = RoutingContext::between(&graph, RoutingRequest::default(), v0, None);
        let state = ctx.initial_state().unwrap();

        let mut h = TrivialHeuristic;
        h.initialize(&ctx);
        assert_eq!(h.estimate(&state, &ctx), 0.0);
    }

    #[test]
    fn default_choice() {
        let graph = fixtures::line(2);
        let v0 = graph.vertex_by_label("V0").unwrap();
        let v1 = graph.vertex_by_label("V1").unwrap();
        let walk = RoutingRequest::new(TraverseModeSet::single(TraverseMode::Walk));
        let config = HeuristicConfig::default();

        // Without a target nothing can be estimated.
        let ctx = RoutingContext::between(&graph, walk.clone(), v0, None);
        let mut h = default_heuristic(&ctx, &config);
        h.initialize(&ctx);
        let state = ctx.initial_state().unwrap();
        assert_eq!(h.estimate(&state, &ctx), 0.0);

        // Street-only searches with a target get a positive straight-line bound.
        let ctx = RoutingContext::between(&graph, walk, v0, Some(v1));
        let mut h = default_heuristic(&ctx, &config);
        h.initialize(&ctx);
        assert!(h.estimate(&state, &ctx) > 0.0);
    }
}
