//! Generalized cost of transit journeys.
//!
//! Costs are integers in centi-seconds so that sums stay exact across
//! rounds. Street legs enter as their search weight times 100.

use crate::config::RaptorConfig;
use crate::graph::TransferConstraint;
use crate::state::RoutingRequest;

/// Prices the parts of a transit journey.
///
/// [`calculate_min_cost`](Self::calculate_min_cost) is used to prune and
/// must never exceed what the other methods would charge for the same
/// time and number of boardings.
pub trait CostCalculator {
    /// Waiting from `prev_arrival_time` to `board_time`, plus the board
    /// penalty. The first boarding of a journey pays no transfer cost;
    /// a stay-seated transfer pays neither.
    fn boarding_cost(
        &self,
        first_boarding: bool,
        prev_arrival_time: i32,
        board_time: i32,
        constraint: TransferConstraint,
    ) -> i64;

    /// Riding from `board_time` to `time`.
    fn on_trip_riding_cost(&self, board_time: i32, time: i32) -> i64;

    /// Cost on arrival: the cost when boarding plus the ride.
    fn transit_arrival_cost(&self, cost_at_board: i64, board_time: i32, alight_time: i32) -> i64 {
        cost_at_board + self.on_trip_riding_cost(board_time, alight_time)
    }

    /// Waiting `seconds` at a stop, between a ride and the egress or a
    /// transfer walk.
    fn waiting_cost(&self, seconds: i32) -> i64;

    /// Walking a transfer of `seconds`.
    fn walk_cost(&self, seconds: i32) -> i64;

    /// A lower bound on the cost of `min_time` seconds of travel with at
    /// least `min_boardings` boardings.
    fn calculate_min_cost(&self, min_time: i32, min_boardings: u32) -> i64;

    /// The cost of an egress leg whose street weight is `weight`.
    fn cost_egress(&self, weight: f64) -> i64 {
        (weight * 100.0).round() as i64
    }
}

/// Linear costs from reluctances and fixed penalties.
#[derive(Debug, Clone, PartialEq)]
pub struct DefaultCostCalculator {
    board_cost: i64,
    transfer_cost: i64,
    wait_factor: i64,
    transit_factor: i64,
    walk_factor: i64,
    /// Cheapest factor of all, used by the lower bound.
    min_factor: i64,
    /// Some transfer may waive the board cost.
    waivable_board_cost: bool,
}

impl DefaultCostCalculator {
    pub fn new(config: &RaptorConfig, request: &RoutingRequest, waivable_board_cost: bool) -> Self {
        let factor = |f: f64| (f.max(0.0) * 100.0).round() as i64;
        let wait_factor = factor(config.wait_reluctance);
        let transit_factor = factor(config.transit_reluctance);
        let walk_factor = factor(request.walk_reluctance);
        let street_factor = request
            .modes
            .street_modes()
            .map(|m| factor(request.reluctance(m)))
            .min()
            .unwrap_or(walk_factor);
        let min_factor = [wait_factor, transit_factor, walk_factor, street_factor]
            .into_iter()
            .min()
            .unwrap_or(0);

        Self {
            board_cost: factor(config.board_cost),
            transfer_cost: factor(config.transfer_cost),
            wait_factor,
            transit_factor,
            walk_factor,
            min_factor,
            waivable_board_cost,
        }
    }
}

impl CostCalculator for DefaultCostCalculator {
    fn boarding_cost(
        &self,
        first_boarding: bool,
        prev_arrival_time: i32,
        board_time: i32,
        constraint: TransferConstraint,
    ) -> i64 {
        let wait = i64::from((board_time - prev_arrival_time).abs());
        let penalty = match constraint {
            TransferConstraint::StaySeated => 0,
            _ if first_boarding => self.board_cost,
            TransferConstraint::Guaranteed => self.board_cost,
            _ => self.board_cost + self.transfer_cost,
        };
        wait * self.wait_factor + penalty
    }

    fn on_trip_riding_cost(&self, board_time: i32, time: i32) -> i64 {
        i64::from((time - board_time).abs()) * self.transit_factor
    }

    fn waiting_cost(&self, seconds: i32) -> i64 {
        i64::from(seconds.max(0)) * self.wait_factor
    }

    fn walk_cost(&self, seconds: i32) -> i64 {
        i64::from(seconds.max(0)) * self.walk_factor
    }

    fn calculate_min_cost(&self, min_time: i32, min_boardings: u32) -> i64 {
        let travel = i64::from(min_time.max(0)) * self.min_factor;
        if self.waivable_board_cost {
            return travel;
        }
        let boardings = i64::from(min_boardings);
        travel + self.board_cost * boardings
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn calculator() -> DefaultCostCalculator {
        let config = RaptorConfig {
            board_cost: 60.0,
            transfer_cost: 30.0,
            wait_reluctance: 0.5,
            transit_reluctance: 1.0,
            ..RaptorConfig::default()
        };
        let request = RoutingRequest {
            walk_reluctance: 2.0,
            ..RoutingRequest::default()
        };
        DefaultCostCalculator::new(&config, &request, false)
    }

    #[test]
    fn first_boarding_skips_transfer_cost() {
        let c = calculator();
        // 100 s wait at 0.5, plus the board cost.
        assert_eq!(c.boarding_cost(true, 0, 100, TransferConstraint::Regular), 5_000 + 6_000);
        assert_eq!(
            c.boarding_cost(false, 0, 100, TransferConstraint::Regular),
            5_000 + 6_000 + 3_000
        );
    }

    #[test]
    fn facilitated_transfers_are_cheaper() {
        let c = calculator();
        assert_eq!(c.boarding_cost(false, 100, 100, TransferConstraint::StaySeated), 0);
        assert_eq!(c.boarding_cost(false, 100, 100, TransferConstraint::Guaranteed), 6_000);
    }

    #[test]
    fn riding_is_symmetric_in_time() {
        let c = calculator();
        assert_eq!(c.on_trip_riding_cost(100, 160), 6_000);
        assert_eq!(c.on_trip_riding_cost(160, 100), 6_000);
        assert_eq!(c.transit_arrival_cost(500, 100, 160), 6_500);
    }

    #[test]
    fn waiting_walking_and_egress() {
        let c = calculator();
        assert_eq!(c.waiting_cost(10), 500);
        assert_eq!(c.waiting_cost(-5), 0);
        assert_eq!(c.walk_cost(10), 2_000);
        assert_eq!(c.cost_egress(12.34), 1_234);
    }

    #[test]
    fn min_cost_never_exceeds_a_real_journey() {
        let c = calculator();
        // 300 s riding with one boarding and no wait.
        let real = c.boarding_cost(true, 0, 0, TransferConstraint::Regular)
            + c.on_trip_riding_cost(0, 300);
        assert!(c.calculate_min_cost(300, 1) <= real);
        assert_eq!(c.calculate_min_cost(300, 1), 300 * 50 + 6_000);
    }

    #[test]
    fn waivable_board_cost_drops_out_of_the_bound() {
        let config = RaptorConfig::default();
        let c = DefaultCostCalculator::new(&config, &RoutingRequest::default(), true);
        assert_eq!(c.calculate_min_cost(10, 3), 10 * 100);
    }
}
