//! The round-based search.
//!
//! Round `k` holds the best arrival at every stop using at most `k`
//! boardings. Each round scans the patterns serving stops improved in the
//! previous round, then walks transfers from the stops its rides reached.
//! The same code runs backward in time from the destination, with
//! departures and arrivals trading places.

use std::time::Instant;

use fixedbitset::FixedBitSet;
use tracing::{debug, trace, warn};

use crate::graph::{PatternId, StopId, TransferConstraint};

use super::access::RaptorAccess;
use super::constrained::{ConstrainedBoardingSearch, IncomingTrip};
use super::cost::CostCalculator;
use super::heuristic::RaptorHeuristic;
use super::path::{RaptorLeg, RaptorPath};
use super::schedule::RaptorTransitData;
use super::slack::SlackProvider;
use super::trip_search::{BoardOrAlightEvent, SearchDirection, TripScheduleSearch};

/// How a stop was reached.
#[derive(Debug, Clone, Copy, PartialEq)]
struct Arrival {
    /// When the rider is ready at the stop, slack included.
    time: i32,
    /// Centi-seconds.
    cost: i64,
    /// The round that produced this arrival.
    round: usize,
    leg: ArrivalLeg,
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum ArrivalLeg {
    Access(RaptorAccess),
    Transit(Ride),
    Transfer { from: StopId, distance_m: f64 },
}

/// A trip ridden between two positions, in search direction.
#[derive(Debug, Clone, Copy, PartialEq)]
struct Ride {
    pattern: PatternId,
    trip_index: usize,
    board_stop: StopId,
    board_pos: usize,
    alight_pos: usize,
    constraint: TransferConstraint,
    /// Boarded through a constrained transfer from the ride that reached
    /// this stop in the previous round.
    via_ride_at: Option<StopId>,
}

impl Arrival {
    fn incoming_trip(&self) -> Option<IncomingTrip> {
        match self.leg {
            ArrivalLeg::Transit(ride) => Some(IncomingTrip {
                pattern: ride.pattern,
                trip_index: ride.trip_index,
                alight_pos: ride.alight_pos,
            }),
            _ => None,
        }
    }

    fn is_access(&self) -> bool {
        matches!(self.leg, ArrivalLeg::Access(_))
    }
}

#[derive(Debug, Clone)]
struct Round {
    /// Best arrival with at most this many boardings.
    arrivals: Vec<Option<Arrival>>,
    /// Arrivals by a ride in this round, before transfers.
    rides: Vec<Option<Arrival>>,
    /// Stops improved in this round.
    marked: FixedBitSet,
}

impl Round {
    fn new(stops: usize) -> Self {
        Self {
            arrivals: vec![None; stops],
            rides: vec![None; stops],
            marked: FixedBitSet::with_capacity(stops),
        }
    }

    fn next(&self) -> Self {
        let stops = self.arrivals.len();
        Self {
            arrivals: self.arrivals.clone(),
            rides: vec![None; stops],
            marked: FixedBitSet::with_capacity(stops),
        }
    }

    fn times(&self) -> Vec<Option<i32>> {
        self.arrivals.iter().map(|a| a.map(|a| a.time)).collect()
    }
}

/// The trip currently ridden while scanning a pattern.
#[derive(Debug, Clone, Copy)]
struct OnBoard {
    trip_index: usize,
    board_pos: usize,
    board_stop: StopId,
    board_time: i32,
    cost_at_board: i64,
    constraint: TransferConstraint,
    via_ride_at: Option<StopId>,
}

/// Where the search reached the far end.
#[derive(Debug, Clone, Copy)]
struct DestinationArrival {
    round: usize,
    stop: StopId,
    egress: RaptorAccess,
    time: i32,
    cost: i64,
}

/// Inputs of one search.
#[derive(Debug, Clone)]
pub struct RaptorParams<'a> {
    pub direction: SearchDirection,
    /// Seconds since service midnight: the departure going forward, the
    /// arrival going backward.
    pub start_time: i32,
    /// Legs from the search start to stops.
    pub access: &'a [RaptorAccess],
    /// Legs from stops to the search end.
    pub egress: &'a [RaptorAccess],
    pub max_rounds: usize,
    pub deadline: Option<Instant>,
    /// Arrivals whose cost bound exceeds this are pruned (centi-seconds).
    pub max_cost: Option<i64>,
}

/// Paths found by [`RaptorWorker::route`].
#[derive(Debug, Clone, Default)]
pub struct RaptorResult {
    /// Paths in travel order. Each uses more boardings than the one before
    /// and reaches the far end sooner.
    pub paths: Vec<RaptorPath>,
    /// Rounds run, not counting the access round.
    pub rounds: usize,
    pub timed_out: bool,
    round_times: Vec<Vec<Option<i32>>>,
}

impl RaptorResult {
    /// The best time at each stop with at most `round` boardings.
    pub fn round_best_times(&self, round: usize) -> Option<&[Option<i32>]> {
        self.round_times.get(round).map(Vec::as_slice)
    }
}

/// Runs searches over one [`RaptorTransitData`].
pub struct RaptorWorker<'a, 'g> {
    data: &'a RaptorTransitData<'g>,
    cost: &'a dyn CostCalculator,
    slack: &'a dyn SlackProvider,
    heuristic: Option<&'a RaptorHeuristic>,
    direction: SearchDirection,
    best: Vec<i32>,
    best_destination: i32,
    max_cost: Option<i64>,
}

impl<'a, 'g> RaptorWorker<'a, 'g> {
    pub fn new(
        data: &'a RaptorTransitData<'g>,
        cost: &'a dyn CostCalculator,
        slack: &'a dyn SlackProvider,
    ) -> Self {
        Self {
            data,
            cost,
            slack,
            heuristic: None,
            direction: SearchDirection::Forward,
            best: Vec::new(),
            best_destination: i32::MAX,
            max_cost: None,
        }
    }

    /// Prune with per-stop bounds towards the search end. The bounds must
    /// have been computed for the direction and egress legs of the search.
    pub fn with_heuristic(mut self, heuristic: &'a RaptorHeuristic) -> Self {
        self.heuristic = Some(heuristic);
        self
    }

    pub fn route(&mut self, params: &RaptorParams<'_>) -> RaptorResult {
        let dir = params.direction;
        let stops = self.data.stop_count();
        self.direction = dir;
        self.best = vec![dir.unreached(); stops];
        self.best_destination = dir.unreached();
        self.max_cost = params.max_cost;

        let mut egress_by_stop: Vec<Vec<RaptorAccess>> = vec![Vec::new(); stops];
        for leg in params.egress {
            egress_by_stop[leg.stop.index()].push(*leg);
        }

        let mut first = Round::new(stops);
        for leg in params.access {
            let arrival = Arrival {
                time: dir.plus(params.start_time, leg.duration),
                cost: leg.cost,
                round: 0,
                leg: ArrivalLeg::Access(*leg),
            };
            self.try_arrival(leg.stop, arrival, &mut first, false);
        }
        let mut rounds = vec![first];

        let mut destinations = Vec::new();
        let mut timed_out = false;
        for k in 1..=params.max_rounds {
            let prev = &rounds[k - 1];
            if prev.marked.is_clear() {
                break;
            }
            if params.deadline.is_some_and(|d| Instant::now() >= d) {
                warn!(round = k, "transit search timed out");
                timed_out = true;
                break;
            }

            let mut round = prev.next();
            let patterns = self.touched_patterns(&prev.marked);
            for &(pattern, start_pos) in &patterns {
                self.scan_pattern(pattern, start_pos, k, prev, &mut round);
            }
            self.apply_transfers(k, &mut round);

            if let Some(found) = self.reach_destination(k, &round, &egress_by_stop) {
                destinations.push(found);
            }
            trace!(
                round = k,
                patterns = patterns.len(),
                improved = round.marked.count_ones(..),
                "round complete"
            );
            rounds.push(round);
        }

        let paths: Vec<RaptorPath> = destinations
            .iter()
            .filter_map(|d| self.reconstruct(&rounds, d, params))
            .collect();
        debug!(
            rounds = rounds.len() - 1,
            paths = paths.len(),
            timed_out,
            forward = dir.is_forward(),
            "transit search complete"
        );
        RaptorResult {
            paths,
            rounds: rounds.len() - 1,
            timed_out,
            round_times: rounds.iter().map(Round::times).collect(),
        }
    }

    /// Patterns serving a marked stop, each with the first marked position
    /// in scan order.
    fn touched_patterns(&self, marked: &FixedBitSet) -> Vec<(PatternId, usize)> {
        let mut first: Vec<Option<usize>> = vec![None; self.data.graph().patterns().len()];
        for stop in marked.ones() {
            for &(pattern, pos) in self.data.patterns_at(StopId(stop as u32)) {
                let entry = &mut first[pattern.index()];
                *entry = Some(match *entry {
                    None => pos,
                    Some(current) if self.direction.is_forward() => current.min(pos),
                    Some(current) => current.max(pos),
                });
            }
        }
        first
            .into_iter()
            .enumerate()
            .filter_map(|(i, pos)| pos.map(|pos| (PatternId(i as u32), pos)))
            .collect()
    }

    fn scan_pattern(
        &mut self,
        pattern_id: PatternId,
        start_pos: usize,
        k: usize,
        prev: &Round,
        round: &mut Round,
    ) {
        let dir = self.direction;
        let data = self.data;
        let trips = data.trips(pattern_id);
        if trips.is_empty() {
            return;
        }
        let pattern = data.pattern(pattern_id);
        let n = pattern.num_stops();
        let search = TripScheduleSearch::new(pattern, trips, dir);
        let constrained = ConstrainedBoardingSearch::new(data, dir);
        let arrival_slack = self.slack.arrival_slack(pattern_id, dir);
        let departure_slack = self.slack.departure_slack(pattern_id, dir);

        let mut on_board: Option<OnBoard> = None;
        for pos in dir.positions(n).skip_while(|&pos| pos != start_pos) {
            let stop = pattern.stop(pos);

            if let Some(b) = on_board {
                let raw = dir.alight_time(pattern, b.trip_index, pos);
                let cost = self.cost.transit_arrival_cost(b.cost_at_board, b.board_time, raw)
                    + self.cost.waiting_cost(arrival_slack);
                let arrival = Arrival {
                    time: dir.plus(raw, arrival_slack),
                    cost,
                    round: k,
                    leg: ArrivalLeg::Transit(Ride {
                        pattern: pattern_id,
                        trip_index: b.trip_index,
                        board_stop: b.board_stop,
                        board_pos: b.board_pos,
                        alight_pos: pos,
                        constraint: b.constraint,
                        via_ride_at: b.via_ride_at,
                    }),
                };
                self.try_arrival(stop, arrival, round, true);
            }

            if !dir.can_board(pos, n) || !prev.marked.contains(stop.index()) {
                continue;
            }
            let Some(from) = prev.arrivals[stop.index()] else {
                continue;
            };
            let transfer_slack = if from.is_access() {
                0
            } else {
                self.slack.transfer_slack()
            };
            let earliest = dir.plus(from.time, departure_slack + transfer_slack);

            let found = constrained.find(
                pattern_id,
                pos,
                earliest,
                from.incoming_trip(),
                |s| prev.rides[s.index()].and_then(|a| a.incoming_trip()),
            );
            let (event, source, via_ride_at) = match found.event {
                Some((event, ride_stop)) => match prev.rides[ride_stop.index()] {
                    Some(ride) => (event, ride, Some(ride_stop)),
                    None => continue,
                },
                None => {
                    let limit = if pattern.is_fifo() {
                        on_board.map(|b| b.trip_index)
                    } else {
                        None
                    };
                    let event = if found.excluded.is_empty() {
                        search.search(earliest, pos, limit)
                    } else {
                        search.search_with(earliest, pos, limit, |t| !found.excluded.contains(&t))
                    };
                    (event, from, None)
                }
            };

            let BoardOrAlightEvent::Found {
                trip_index,
                time,
                constraint,
                ..
            } = event
            else {
                continue;
            };
            let improves = on_board.is_none_or(|b| {
                b.trip_index != trip_index
                    && dir.is_better(time, dir.board_time(pattern, b.trip_index, pos))
            });
            if !improves {
                continue;
            }
            let boarding_cost =
                self.cost
                    .boarding_cost(source.is_access(), source.time, time, constraint);
            on_board = Some(OnBoard {
                trip_index,
                board_pos: pos,
                board_stop: stop,
                board_time: time,
                cost_at_board: source.cost + boarding_cost,
                constraint,
                via_ride_at,
            });
        }
    }

    fn apply_transfers(&mut self, k: usize, round: &mut Round) {
        let sources: Vec<(StopId, Arrival)> = round
            .rides
            .iter()
            .enumerate()
            .filter_map(|(i, a)| a.map(|a| (StopId(i as u32), a)))
            .collect();
        for (stop, ride) in sources {
            let transfers = if self.direction.is_forward() {
                self.data.transfers_from(stop)
            } else {
                self.data.transfers_to(stop)
            };
            for transfer in transfers {
                let arrival = Arrival {
                    time: self.direction.plus(ride.time, transfer.duration),
                    cost: ride.cost + self.cost.walk_cost(transfer.duration),
                    round: k,
                    leg: ArrivalLeg::Transfer {
                        from: stop,
                        distance_m: transfer.distance_m,
                    },
                };
                self.try_arrival(transfer.stop, arrival, round, false);
            }
        }
    }

    /// Record `arrival` at `stop` if it beats every earlier arrival there
    /// and the bounds do not rule it out.
    fn try_arrival(&mut self, stop: StopId, arrival: Arrival, round: &mut Round, by_ride: bool) -> bool {
        let i = stop.index();
        if !self.direction.is_better(arrival.time, self.best[i]) || self.pruned(stop, &arrival) {
            return false;
        }
        self.best[i] = arrival.time;
        round.arrivals[i] = Some(arrival);
        if by_ride {
            round.rides[i] = Some(arrival);
        }
        round.marked.insert(i);
        true
    }

    fn pruned(&self, stop: StopId, arrival: &Arrival) -> bool {
        let Some(heuristic) = self.heuristic else {
            return false;
        };
        let Some(remaining) = heuristic.min_time(stop) else {
            return true;
        };
        let dir = self.direction;
        if self.best_destination != dir.unreached()
            && !dir.is_better(dir.plus(arrival.time, remaining), self.best_destination)
        {
            return true;
        }
        match self.max_cost {
            Some(max) => {
                let boardings = heuristic.min_boardings(stop).unwrap_or(0);
                arrival.cost + self.cost.calculate_min_cost(remaining, boardings) > max
            }
            None => false,
        }
    }

    /// The best way to the far end from stops improved in round `k`, if it
    /// beats every earlier round.
    fn reach_destination(
        &mut self,
        k: usize,
        round: &Round,
        egress_by_stop: &[Vec<RaptorAccess>],
    ) -> Option<DestinationArrival> {
        let dir = self.direction;
        let mut best: Option<DestinationArrival> = None;
        for i in round.marked.ones() {
            let Some(arrival) = round.arrivals[i] else {
                continue;
            };
            for egress in &egress_by_stop[i] {
                let candidate = DestinationArrival {
                    round: k,
                    stop: StopId(i as u32),
                    egress: *egress,
                    time: dir.plus(arrival.time, egress.duration),
                    cost: arrival.cost + egress.cost,
                };
                let better = best.is_none_or(|b| {
                    dir.is_better(candidate.time, b.time)
                        || (candidate.time == b.time && candidate.cost < b.cost)
                });
                if better {
                    best = Some(candidate);
                }
            }
        }
        let best = best.filter(|b| dir.is_better(b.time, self.best_destination))?;
        self.best_destination = best.time;
        Some(best)
    }

    /// Follow arrivals back from `destination` to the access leg.
    fn reconstruct(
        &self,
        rounds: &[Round],
        destination: &DestinationArrival,
        params: &RaptorParams<'_>,
    ) -> Option<RaptorPath> {
        let dir = self.direction;
        let data = self.data;
        let mut legs: Vec<RaptorLeg> = Vec::new();

        let mut stop = destination.stop;
        let mut current = rounds[destination.round].arrivals[stop.index()]?;
        legs.push(street_leg(
            &destination.egress,
            current.time,
            destination.time,
            !dir.is_forward(),
        ));

        loop {
            match current.leg {
                ArrivalLeg::Access(access) => {
                    legs.push(street_leg(
                        &access,
                        params.start_time,
                        current.time,
                        dir.is_forward(),
                    ));
                    break;
                }
                ArrivalLeg::Transit(ride) => {
                    let pattern = data.pattern(ride.pattern);
                    let board_pos = ride.board_pos.min(ride.alight_pos);
                    let alight_pos = ride.board_pos.max(ride.alight_pos);
                    let trip = pattern.trip(ride.trip_index);
                    legs.push(RaptorLeg::Transit {
                        trip_id: trip.trip_id().clone(),
                        pattern: ride.pattern,
                        board_stop: pattern.stop(board_pos),
                        alight_stop: pattern.stop(alight_pos),
                        board_pos,
                        alight_pos,
                        board_time: trip.departure(board_pos),
                        alight_time: trip.arrival(alight_pos),
                        constraint: ride.constraint,
                    });
                    let before = rounds.get(current.round.checked_sub(1)?)?;
                    let next = match ride.via_ride_at {
                        Some(ride_stop) => {
                            stop = ride_stop;
                            before.rides[ride_stop.index()]
                        }
                        None => {
                            stop = ride.board_stop;
                            before.arrivals[ride.board_stop.index()]
                        }
                    };
                    current = next?;
                }
                ArrivalLeg::Transfer { from, distance_m } => {
                    let ride = rounds[current.round].rides[from.index()]?;
                    let (walk_from, walk_to) = if dir.is_forward() {
                        (from, stop)
                    } else {
                        (stop, from)
                    };
                    let (start, end) = ordered(ride.time, current.time);
                    legs.push(RaptorLeg::Transfer {
                        from: walk_from,
                        to: walk_to,
                        departure_time: start,
                        arrival_time: end,
                        distance_m,
                    });
                    stop = from;
                    current = ride;
                }
            }
        }

        if dir.is_forward() {
            legs.reverse();
        }
        Some(RaptorPath::new(legs, destination.cost))
    }
}

/// A street leg between `a` and `b`, in either order. `from_endpoint` says
/// whether it leads from the origin to the stop.
fn street_leg(leg: &RaptorAccess, a: i32, b: i32, from_endpoint: bool) -> RaptorLeg {
    let (departure_time, arrival_time) = ordered(a, b);
    if from_endpoint {
        RaptorLeg::Access {
            stop: leg.stop,
            departure_time,
            arrival_time,
            distance_m: leg.distance_m,
        }
    } else {
        RaptorLeg::Egress {
            stop: leg.stop,
            departure_time,
            arrival_time,
            distance_m: leg.distance_m,
        }
    }
}

fn ordered(a: i32, b: i32) -> (i32, i32) {
    (a.min(b), a.max(b))
}
