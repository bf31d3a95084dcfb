//! Running a transit search for a routing request.

use std::time::{Duration, Instant};

use tracing::debug;

use crate::config::RouterConfig;
use crate::state::RoutingContext;

use super::access::street_legs;
use super::cost::DefaultCostCalculator;
use super::heuristic::RaptorHeuristic;
use super::schedule::RaptorTransitData;
use super::slack::DefaultSlackProvider;
use super::trip_search::SearchDirection;
use super::worker::{RaptorParams, RaptorResult, RaptorWorker};

/// Transit itineraries between the origin and destination of `ctx`.
///
/// Street legs to and from stops come from street-only searches at both
/// ends. Arrive-by requests search backward from the destination. The
/// number of rounds is the configured cap, lowered by the request's
/// transfer limit. Returns an empty result when either endpoint is
/// missing or no stop is in reach.
pub fn raptor_search(ctx: &RoutingContext<'_>, config: &RouterConfig) -> RaptorResult {
    let request = ctx.request();
    if ctx.origin().is_none() || ctx.destination().is_none() {
        return RaptorResult::default();
    }
    let started = Instant::now();
    let raptor = &config.raptor;

    let mut outbound = request.clone();
    outbound.arrive_by = false;
    let mut inbound = request.clone();
    inbound.arrive_by = true;
    let from_origin = street_legs(&ctx.with_request(outbound), raptor);
    let to_destination = street_legs(&ctx.with_request(inbound), raptor);
    if from_origin.is_empty() || to_destination.is_empty() {
        debug!(
            origin_stops = from_origin.len(),
            destination_stops = to_destination.len(),
            "no stops in reach"
        );
        return RaptorResult::default();
    }

    let (direction, access, egress) = if request.arrive_by {
        (SearchDirection::Reverse, to_destination, from_origin)
    } else {
        (SearchDirection::Forward, from_origin, to_destination)
    };

    let graph = ctx.graph();
    let data = RaptorTransitData::new(graph, request);
    let cost = DefaultCostCalculator::new(raptor, request, data.constraints().has_facilitated());
    let slack = DefaultSlackProvider::new(raptor, request);
    let heuristic = RaptorHeuristic::new(&data, direction, &egress);

    let max_rounds = request
        .max_transfers
        .map_or(raptor.max_rounds, |t| raptor.max_rounds.min(t as usize + 1));
    let timeout = request
        .timeout_ms
        .map_or(raptor.timeout(), Duration::from_millis);
    let params = RaptorParams {
        direction,
        start_time: graph.service_day().seconds_since_midnight(request.date_time),
        access: &access,
        egress: &egress,
        max_rounds,
        deadline: Some(started + timeout),
        max_cost: request.max_weight.map(|w| (w * 100.0).round() as i64),
    };

    RaptorWorker::new(&data, &cost, &slack)
        .with_heuristic(&heuristic)
        .route(&params)
}


#[cfg(test)]
mod proptests {
    use proptest::prelude::*;

    use super::super::access::RaptorAccess;
    use super::super::cost::DefaultCostCalculator;
    use super::super::schedule::RaptorTransitData;
    use super::super::slack::DefaultSlackProvider;
    use super::super::trip_search::SearchDirection;
    use super::super::worker::{RaptorParams, RaptorWorker};
    use crate::config::RaptorConfig;
    use crate::domain::Coordinate;
    use crate::graph::{Graph, StopId, TripTimes, fixtures};
    use crate::state::RoutingRequest;

    const STOPS: usize = 6;

    /// Stop sequence, whether to run it backward, and trips as a start
    /// time plus hop times.
    type PatternShape = (Vec<usize>, bool, Vec<(i32, Vec<i32>)>);

    fn pattern_shape() -> impl Strategy<Value = PatternShape> {
        (
            prop::sample::subsequence((0..STOPS).collect::<Vec<_>>(), 2..=4),
            any::<bool>(),
            prop::collection::vec((0..600i32, prop::collection::vec(1..300i32, 3)), 1..4),
        )
    }

    fn build(patterns: &[PatternShape], transfers: &[(usize, usize, u16)]) -> Graph {
        let mut b = fixtures::builder();
        let stops: Vec<StopId> = (0..STOPS)
            .map(|i| {
                b.add_stop(&format!("S{i}"), "stop", Coordinate::new(0.0, i as f64 * 0.001), true)
                    .unwrap()
            })
            .collect();
        for (p, (sequence, backward, trips)) in patterns.iter().enumerate() {
            let mut sequence: Vec<StopId> = sequence.iter().map(|&i| stops[i]).collect();
            if *backward {
                sequence.reverse();
            }
            let trips = trips
                .iter()
                .enumerate()
                .map(|(t, (start, hops))| {
                    let mut times = vec![*start];
                    for hop in hops.iter().take(sequence.len() - 1) {
                        times.push(times[times.len() - 1] + hop);
                    }
                    TripTimes::from_departures(b.ids().create(&format!("P{p}T{t}")), times)
                        .unwrap()
                })
                .collect();
            b.add_pattern(&format!("R{p}"), &sequence, trips).unwrap();
        }
        for &(from, to, distance) in transfers {
            if from != to {
                b.add_transfer(stops[from], stops[to], f64::from(distance), 0)
                    .unwrap();
            }
        }
        b.build()
    }

    proptest! {
        #[test]
        fn rounds_only_improve(
            patterns in prop::collection::vec(pattern_shape(), 1..5),
            transfers in prop::collection::vec((0..STOPS, 0..STOPS, 0..500u16), 0..4),
            reverse in any::<bool>(),
        ) {
            let graph = build(&patterns, &transfers);
            let request = RoutingRequest::default();
            let config = RaptorConfig { transfer_slack_s: 30, ..RaptorConfig::default() };
            let data = RaptorTransitData::new(&graph, &request);
            let cost = DefaultCostCalculator::new(&config, &request, false);
            let slack = DefaultSlackProvider::new(&config, &request);

            let (direction, start_time) = if reverse {
                (SearchDirection::Reverse, 2_000)
            } else {
                (SearchDirection::Forward, 0)
            };
            let access = [RaptorAccess { stop: StopId(0), duration: 0, cost: 0, distance_m: 0.0 }];
            let egress = [RaptorAccess { stop: StopId(STOPS as u32 - 1), duration: 10, cost: 0, distance_m: 0.0 }];
            let params = RaptorParams {
                direction,
                start_time,
                access: &access,
                egress: &egress,
                max_rounds: 6,
                deadline: None,
                max_cost: None,
            };
            let result = RaptorWorker::new(&data, &cost, &slack).route(&params);

            for k in 1..=result.rounds {
                let before = result.round_best_times(k - 1).unwrap();
                let after = result.round_best_times(k).unwrap();
                for (b, a) in before.iter().zip(after) {
                    if let Some(b) = b {
                        let a = a.expect("a stop reached earlier stays reached");
                        prop_assert!(!direction.is_better(*b, a));
                    }
                }
                if before == after {
                    prop_assert_eq!(result.rounds, k);
                }
            }

            // Each path beats the one with fewer boardings.
            for w in result.paths.windows(2) {
                prop_assert!(w[0].num_boardings() < w[1].num_boardings());
                if reverse {
                    prop_assert!(w[1].departure_time() > w[0].departure_time());
                } else {
                    prop_assert!(w[1].arrival_time() < w[0].arrival_time());
                }
            }
        }
    }
}
