//! Straight-line distance bound.

use crate::config::HeuristicConfig;
use crate::domain::Coordinate;
use crate::state::{RoutingContext, RoutingRequest, State};

use super::RemainingWeightHeuristic;

/// Straight-line distance to the target times the cheapest weight per
/// metre any allowed mode can achieve.
///
/// Assumes street lengths are never shorter than the straight line between
/// their ends and that stops sit at the street vertices they link to.
#[derive(Debug, Clone)]
pub struct EuclideanHeuristic {
    max_transit_speed_mps: f64,
    target: Option<Coordinate>,
    cost_per_meter: f64,
}

impl EuclideanHeuristic {
    pub fn new(config: &HeuristicConfig) -> Self {
        Self {
            max_transit_speed_mps: config.max_transit_speed_mps,
            target: None,
            cost_per_meter: 0.0,
        }
    }

    /// Cheapest weight per metre under `request`.
    pub(crate) fn min_cost_per_meter(request: &RoutingRequest, max_transit_speed_mps: f64) -> f64 {
        let street = request
            .modes
            .street_modes()
            .map(|m| request.reluctance(m) / request.speed(m))
            .fold(f64::INFINITY, f64::min);
        let transit = if request.modes.has_transit() && max_transit_speed_mps > 0.0 {
            request.transit_reluctance / max_transit_speed_mps
        } else {
            f64::INFINITY
        };
        let cost = street.min(transit);
        if cost.is_finite() && cost > 0.0 { cost } else { 0.0 }
    }
}

impl RemainingWeightHeuristic for EuclideanHeuristic {
    fn initialize(&mut self, ctx: &RoutingContext<'_>) {
        self.target = ctx.search_target().map(|v| ctx.vertex(v).coordinate());
        self.cost_per_meter = Self::min_cost_per_meter(ctx.request(), self.max_transit_speed_mps);
    }

    fn estimate(&self, state: &State, ctx: &RoutingContext<'_>) -> f64 {
        let Some(target) = self.target else {
            return 0.0;
        };
        let here = ctx.vertex(state.vertex()).coordinate();
        here.distance_meters(&target) * self.cost_per_meter
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{TraverseMode, TraverseModeSet};
    use crate::graph::fixtures;

    #[test]
    fn cheapest_mode_sets_the_rate() {
        let walk = RoutingRequest::new(TraverseModeSet::single(TraverseMode::Walk));
        assert_eq!(
            EuclideanHeuristic::min_cost_per_meter(&walk, 40.0),
            2.0 / 1.33
        );

        let walk_car = RoutingRequest::new(TraverseModeSet::ALL_STREET);
        assert_eq!(
            EuclideanHeuristic::min_cost_per_meter(&walk_car, 40.0),
            1.0 / 11.2
        );

        let transit = RoutingRequest::default();
        assert_eq!(
            EuclideanHeuristic::min_cost_per_meter(&transit, 40.0),
            1.0 / 40.0
        );
    }

    #[test]
    fn never_exceeds_street_weight() {
        let graph = fixtures::line(4);
        let v0 = graph.vertex_by_label("V0").unwrap();
        let v3 = graph.vertex_by_label("V3").unwrap();
        let request = RoutingRequest::new(TraverseModeSet::single(TraverseMode::Walk));
        let ctx = RoutingContext::between(&graph, request, v0, Some(v3));

        let mut h = EuclideanHeuristic::new(&HeuristicConfig::default());
        h.initialize(&ctx);
        let estimate = h.estimate(&ctx.initial_state().unwrap(), &ctx);

        let actual = 300.0 / 1.33 * 2.0;
        assert!(estimate > 0.9 * actual, "{estimate} vs {actual}");
        assert!(estimate <= actual);
    }

    #[test]
    fn without_target_is_zero() {
        let graph = fixtures::line(2);
        let v0 = graph.vertex_by_label("V0").unwrap();
        let ctx = RoutingContext::between(&graph, RoutingRequest::default(), v0, None);

        let mut h = EuclideanHeuristic::new(&HeuristicConfig::default());
        h.initialize(&ctx);
        assert_eq!(h.estimate(&ctx.initial_state().unwrap(), &ctx), 0.0);
    }
}
