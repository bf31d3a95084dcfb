//! Finding the trip to board at a stop.

use crate::graph::{TransferConstraint, TripPattern};

/// Which way a round-based search runs through time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchDirection {
    /// From the origin, forward in time.
    Forward,
    /// From the destination, backward in time.
    Reverse,
}

impl SearchDirection {
    pub fn is_forward(self) -> bool {
        self == SearchDirection::Forward
    }

    /// Returns true if time `a` is strictly better than `b`: earlier going
    /// forward, later going backward.
    pub fn is_better(self, a: i32, b: i32) -> bool {
        match self {
            SearchDirection::Forward => a < b,
            SearchDirection::Reverse => a > b,
        }
    }

    /// Move `seconds` along the search direction from `time`.
    pub fn plus(self, time: i32, seconds: i32) -> i32 {
        match self {
            SearchDirection::Forward => time.saturating_add(seconds),
            SearchDirection::Reverse => time.saturating_sub(seconds),
        }
    }

    /// Seconds between `from` and the later (in search order) `to`.
    pub fn duration(self, from: i32, to: i32) -> i32 {
        match self {
            SearchDirection::Forward => to - from,
            SearchDirection::Reverse => from - to,
        }
    }

    /// A time worse than every real one.
    pub fn unreached(self) -> i32 {
        match self {
            SearchDirection::Forward => i32::MAX,
            SearchDirection::Reverse => i32::MIN,
        }
    }

    /// Stop positions of a pattern with `n` stops in scan order.
    pub fn positions(self, n: usize) -> Box<dyn Iterator<Item = usize>> {
        match self {
            SearchDirection::Forward => Box::new(0..n),
            SearchDirection::Reverse => Box::new((0..n).rev()),
        }
    }

    /// Returns true if a vehicle can be boarded at `pos`: not at the last
    /// stop going forward, not at the first going backward.
    pub fn can_board(self, pos: usize, n: usize) -> bool {
        match self {
            SearchDirection::Forward => pos + 1 < n,
            SearchDirection::Reverse => pos > 0,
        }
    }

    /// The time a trip is boarded at `pos` in this direction: its
    /// departure going forward, its arrival going backward.
    pub fn board_time(self, pattern: &TripPattern, trip: usize, pos: usize) -> i32 {
        match self {
            SearchDirection::Forward => pattern.trip(trip).departure(pos),
            SearchDirection::Reverse => pattern.trip(trip).arrival(pos),
        }
    }

    /// The time a trip is left at `pos` in this direction.
    pub fn alight_time(self, pattern: &TripPattern, trip: usize, pos: usize) -> i32 {
        match self {
            SearchDirection::Forward => pattern.trip(trip).arrival(pos),
            SearchDirection::Reverse => pattern.trip(trip).departure(pos),
        }
    }
}

/// The result of searching a timetable at one stop.
///
/// A search that finds nothing still yields an event, carrying the time it
/// searched from, so callers can always read
/// [`earliest_board_time`](Self::earliest_board_time).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BoardOrAlightEvent {
    Found {
        trip_index: usize,
        stop_pos: usize,
        /// Departure (forward) or arrival (reverse) of the trip at the stop.
        time: i32,
        earliest_board_time: i32,
        constraint: TransferConstraint,
    },
    Empty {
        earliest_board_time: i32,
    },
}

impl BoardOrAlightEvent {
    pub fn empty(earliest_board_time: i32) -> Self {
        BoardOrAlightEvent::Empty {
            earliest_board_time,
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, BoardOrAlightEvent::Empty { .. })
    }

    pub fn earliest_board_time(&self) -> i32 {
        match *self {
            BoardOrAlightEvent::Found {
                earliest_board_time,
                ..
            }
            | BoardOrAlightEvent::Empty {
                earliest_board_time,
            } => earliest_board_time,
        }
    }

    pub fn trip_index(&self) -> Option<usize> {
        match *self {
            BoardOrAlightEvent::Found { trip_index, .. } => Some(trip_index),
            BoardOrAlightEvent::Empty { .. } => None,
        }
    }

    pub fn time(&self) -> Option<i32> {
        match *self {
            BoardOrAlightEvent::Found { time, .. } => Some(time),
            BoardOrAlightEvent::Empty { .. } => None,
        }
    }

    pub fn constraint(&self) -> TransferConstraint {
        match *self {
            BoardOrAlightEvent::Found { constraint, .. } => constraint,
            BoardOrAlightEvent::Empty { .. } => TransferConstraint::Regular,
        }
    }
}

/// Searches the usable trips of one pattern.
///
/// `trips` holds trip indices of `pattern` in ascending order. For a FIFO
/// pattern that is also time order at every stop, and the search is a
/// binary search; otherwise every trip is inspected.
#[derive(Debug, Clone, Copy)]
pub struct TripScheduleSearch<'a> {
    pattern: &'a TripPattern,
    trips: &'a [usize],
    direction: SearchDirection,
}

impl<'a> TripScheduleSearch<'a> {
    pub fn new(pattern: &'a TripPattern, trips: &'a [usize], direction: SearchDirection) -> Self {
        Self {
            pattern,
            trips,
            direction,
        }
    }

    /// The best trip usable at `stop_pos` from `earliest_board_time`.
    ///
    /// Going forward this is the trip with the smallest departure not
    /// before the bound; going backward the one with the latest arrival not
    /// after it. `trip_index_limit` restricts the search to trips before
    /// (forward) or after (reverse) the trip already on board, which only
    /// helps for FIFO patterns.
    pub fn search(
        &self,
        earliest_board_time: i32,
        stop_pos: usize,
        trip_index_limit: Option<usize>,
    ) -> BoardOrAlightEvent {
        self.search_with(earliest_board_time, stop_pos, trip_index_limit, |_| true)
    }

    /// Like [`search`](Self::search), skipping trips `accept` rejects.
    pub fn search_with(
        &self,
        earliest_board_time: i32,
        stop_pos: usize,
        trip_index_limit: Option<usize>,
        accept: impl Fn(usize) -> bool,
    ) -> BoardOrAlightEvent {
        let candidates = self.candidates(trip_index_limit);
        let time_at = |trip: usize| self.direction.board_time(self.pattern, trip, stop_pos);
        let usable = |trip: usize| !self.direction.is_better(time_at(trip), earliest_board_time);

        let found = if self.pattern.is_fifo() {
            match self.direction {
                SearchDirection::Forward => {
                    let first = candidates.partition_point(|&t| time_at(t) < earliest_board_time);
                    candidates[first..].iter().copied().find(|&t| accept(t))
                }
                SearchDirection::Reverse => {
                    let end = candidates.partition_point(|&t| time_at(t) <= earliest_board_time);
                    candidates[..end].iter().rev().copied().find(|&t| accept(t))
                }
            }
        } else {
            candidates
                .iter()
                .copied()
                .filter(|&t| usable(t) && accept(t))
                .reduce(|best, t| {
                    if self.direction.is_better(time_at(t), time_at(best)) {
                        t
                    } else {
                        best
                    }
                })
        };

        match found {
            Some(trip_index) => BoardOrAlightEvent::Found {
                trip_index,
                stop_pos,
                time: time_at(trip_index),
                earliest_board_time,
                constraint: TransferConstraint::Regular,
            },
            None => BoardOrAlightEvent::empty(earliest_board_time),
        }
    }

    fn candidates(&self, limit: Option<usize>) -> &'a [usize] {
        let Some(limit) = limit else {
            return self.trips;
        };
        match self.direction {
            SearchDirection::Forward => {
                let end = self.trips.partition_point(|&t| t < limit);
                &self.trips[..end]
            }
            SearchDirection::Reverse => {
                let start = self.trips.partition_point(|&t| t <= limit);
                &self.trips[start..]
            }
        }
    }
}
