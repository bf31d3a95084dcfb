//! Transfers negotiated between specific trips.
//!
//! A constrained transfer names the trip a rider arrives on and the trip
//! they continue on. Stay-seated and guaranteed transfers override the
//! generic earliest-trip rule and need no slack; a not-allowed transfer
//! removes one trip from the generic search.

use std::collections::HashMap;

use crate::graph::{PatternId, StopId, TransferConstraint, TripTransfer};

use super::schedule::RaptorTransitData;
use super::trip_search::{BoardOrAlightEvent, SearchDirection};

/// Trip-to-trip transfers indexed by where they are boarded.
#[derive(Debug, Clone, Default)]
pub struct ConstrainedTransfers {
    /// Keyed by the pattern and position of the trip transferred to.
    by_target: HashMap<(PatternId, usize), Vec<TripTransfer>>,
    /// Keyed by the pattern and position of the trip transferred from.
    by_source: HashMap<(PatternId, usize), Vec<TripTransfer>>,
}

impl ConstrainedTransfers {
    pub fn new(transfers: &[TripTransfer]) -> Self {
        let mut by_target: HashMap<_, Vec<_>> = HashMap::new();
        let mut by_source: HashMap<_, Vec<_>> = HashMap::new();
        for &t in transfers {
            by_target
                .entry((t.to.pattern, t.to_stop_pos))
                .or_default()
                .push(t);
            by_source
                .entry((t.from.pattern, t.from_stop_pos))
                .or_default()
                .push(t);
        }
        Self {
            by_target,
            by_source,
        }
    }

    /// Transfers onto `pattern` at `pos`.
    pub fn boarding(&self, pattern: PatternId, pos: usize) -> &[TripTransfer] {
        self.by_target
            .get(&(pattern, pos))
            .map_or(&[], Vec::as_slice)
    }

    /// Transfers off `pattern` at `pos`.
    pub fn alighting(&self, pattern: PatternId, pos: usize) -> &[TripTransfer] {
        self.by_source
            .get(&(pattern, pos))
            .map_or(&[], Vec::as_slice)
    }

    pub fn is_empty(&self) -> bool {
        self.by_target.is_empty()
    }

    /// Returns true if any transfer waives boarding costs.
    pub fn has_facilitated(&self) -> bool {
        self.by_target
            .values()
            .flatten()
            .any(|t| t.constraint.is_facilitated())
    }
}

/// The trip a rider got off, as the constrained search needs it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IncomingTrip {
    pub pattern: PatternId,
    pub trip_index: usize,
    /// Where the trip was left, in search direction.
    pub alight_pos: usize,
}

/// Outcome of looking for a constrained transfer at one stop.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConstrainedBoarding {
    /// The trip a facilitated transfer leads to, with the stop the rider
    /// came from.
    pub event: Option<(BoardOrAlightEvent, StopId)>,
    /// Trips the generic search must skip.
    pub excluded: Vec<usize>,
}

/// Looks up constrained transfers for a pattern position, given the trips
/// riders reached each stop on in the previous round.
#[derive(Debug, Clone, Copy)]
pub struct ConstrainedBoardingSearch<'a, 'g> {
    data: &'a RaptorTransitData<'g>,
    direction: SearchDirection,
}

impl<'a, 'g> ConstrainedBoardingSearch<'a, 'g> {
    pub fn new(data: &'a RaptorTransitData<'g>, direction: SearchDirection) -> Self {
        Self { data, direction }
    }

    /// Look for a constrained transfer onto `pattern` at `pos`.
    ///
    /// `arrived_on(stop)` names the trip a rider reached `stop` on in the
    /// previous round, if any. `boarded_from` is the trip of the arrival the
    /// generic search boards from; not-allowed transfers are matched only
    /// against it. Returns the first facilitated transfer whose timing
    /// works, preferring the best boarding time.
    pub fn find(
        &self,
        pattern: PatternId,
        pos: usize,
        earliest_board_time: i32,
        boarded_from: Option<IncomingTrip>,
        arrived_on: impl Fn(StopId) -> Option<IncomingTrip>,
    ) -> ConstrainedBoarding {
        let constraints = self.data.constraints();
        let candidates = match self.direction {
            SearchDirection::Forward => constraints.boarding(pattern, pos),
            SearchDirection::Reverse => constraints.alighting(pattern, pos),
        };
        let mut result = ConstrainedBoarding::default();

        for transfer in candidates {
            // The side of the transfer the rider already rode, and the
            // trip this pattern offers.
            let (ridden, ridden_pos, offered) = match self.direction {
                SearchDirection::Forward => (transfer.from, transfer.from_stop_pos, transfer.to),
                SearchDirection::Reverse => (transfer.to, transfer.to_stop_pos, transfer.from),
            };
            let expected = IncomingTrip {
                pattern: ridden.pattern,
                trip_index: ridden.trip_index,
                alight_pos: ridden_pos,
            };

            match transfer.constraint {
                TransferConstraint::NotAllowed => {
                    if boarded_from == Some(expected) {
                        result.excluded.push(offered.trip_index);
                    }
                }
                TransferConstraint::Regular => {}
                TransferConstraint::StaySeated | TransferConstraint::Guaranteed => {
                    if !self.data.trips(pattern).contains(&offered.trip_index) {
                        continue;
                    }
                    let from_stop = self.data.pattern(ridden.pattern).stop(ridden_pos);
                    if arrived_on(from_stop) != Some(expected) {
                        continue;
                    }
                    let Some(event) = self.timed_event(transfer, earliest_board_time) else {
                        continue;
                    };
                    let better = result.event.as_ref().is_none_or(|(current, _)| {
                        let (a, b) = (event.time(), current.time());
                        matches!((a, b), (Some(a), Some(b)) if self.direction.is_better(a, b))
                    });
                    if better {
                        result.event = Some((event, from_stop));
                    }
                }
            }
        }
        result
    }

    /// The board event for a facilitated transfer, if the continuing trip
    /// does not leave before the arriving one gets in.
    fn timed_event(&self, transfer: &TripTransfer, earliest_board_time: i32) -> Option<BoardOrAlightEvent> {
        let from = self.data.pattern(transfer.from.pattern).trip(transfer.from.trip_index);
        let to = self.data.pattern(transfer.to.pattern).trip(transfer.to.trip_index);
        let arrival = from.arrival(transfer.from_stop_pos);
        let departure = to.departure(transfer.to_stop_pos);
        if departure < arrival {
            return None;
        }
        let (trip_index, stop_pos, time) = match self.direction {
            SearchDirection::Forward => (transfer.to.trip_index, transfer.to_stop_pos, departure),
            SearchDirection::Reverse => (transfer.from.trip_index, transfer.from_stop_pos, arrival),
        };
        Some(BoardOrAlightEvent::Found {
            trip_index,
            stop_pos,
            time,
            earliest_board_time,
            constraint: transfer.constraint,
        })
    }
}
