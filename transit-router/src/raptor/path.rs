//! Transit itineraries found by the round-based search.

use crate::domain::FeedScopedId;
use crate::graph::{PatternId, StopId, TransferConstraint};

/// One part of a [`RaptorPath`], in travel order.
///
/// Times are seconds since service midnight.
#[derive(Debug, Clone, PartialEq)]
pub enum RaptorLeg {
    /// From the origin to the first stop.
    Access {
        stop: StopId,
        departure_time: i32,
        arrival_time: i32,
        distance_m: f64,
    },
    Transit {
        trip_id: FeedScopedId,
        pattern: PatternId,
        board_stop: StopId,
        alight_stop: StopId,
        board_pos: usize,
        alight_pos: usize,
        board_time: i32,
        alight_time: i32,
        /// How the trip was boarded.
        constraint: TransferConstraint,
    },
    Transfer {
        from: StopId,
        to: StopId,
        departure_time: i32,
        arrival_time: i32,
        distance_m: f64,
    },
    /// From the last stop to the destination.
    Egress {
        stop: StopId,
        departure_time: i32,
        arrival_time: i32,
        distance_m: f64,
    },
}

impl RaptorLeg {
    pub fn departure_time(&self) -> i32 {
        match *self {
            RaptorLeg::Access { departure_time, .. }
            | RaptorLeg::Transfer { departure_time, .. }
            | RaptorLeg::Egress { departure_time, .. } => departure_time,
            RaptorLeg::Transit { board_time, .. } => board_time,
        }
    }

    pub fn arrival_time(&self) -> i32 {
        match *self {
            RaptorLeg::Access { arrival_time, .. }
            | RaptorLeg::Transfer { arrival_time, .. }
            | RaptorLeg::Egress { arrival_time, .. } => arrival_time,
            RaptorLeg::Transit { alight_time, .. } => alight_time,
        }
    }

    pub fn is_transit(&self) -> bool {
        matches!(self, RaptorLeg::Transit { .. })
    }
}

/// A transit itinerary from origin to destination.
#[derive(Debug, Clone, PartialEq)]
pub struct RaptorPath {
    legs: Vec<RaptorLeg>,
    cost: i64,
}

impl RaptorPath {
    /// `legs` must be in travel order.
    pub fn new(legs: Vec<RaptorLeg>, cost: i64) -> Self {
        Self { legs, cost }
    }

    pub fn legs(&self) -> &[RaptorLeg] {
        &self.legs
    }

    pub fn departure_time(&self) -> i32 {
        self.legs.first().map_or(0, RaptorLeg::departure_time)
    }

    pub fn arrival_time(&self) -> i32 {
        self.legs.last().map_or(0, RaptorLeg::arrival_time)
    }

    pub fn duration(&self) -> i32 {
        self.arrival_time() - self.departure_time()
    }

    /// Generalized cost in centi-seconds.
    pub fn cost(&self) -> i64 {
        self.cost
    }

    pub fn num_boardings(&self) -> usize {
        self.legs.iter().filter(|l| l.is_transit()).count()
    }

    pub fn num_transfers(&self) -> usize {
        self.num_boardings().saturating_sub(1)
    }

    /// Trips ridden, in travel order.
    pub fn trips(&self) -> Vec<&FeedScopedId> {
        self.legs
            .iter()
            .filter_map(|leg| match leg {
                RaptorLeg::Transit { trip_id, .. } => Some(trip_id),
                _ => None,
            })
            .collect()
    }

    /// Seconds spent at stops between getting off one trip and boarding
    /// the next, for each transfer.
    pub fn transfer_waits(&self) -> Vec<i32> {
        let mut waits = Vec::new();
        let mut last_alight: Option<i32> = None;
        let mut walked = 0;
        for leg in &self.legs {
            match leg {
                RaptorLeg::Transit {
                    board_time,
                    alight_time,
                    ..
                } => {
                    if let Some(alight) = last_alight {
                        waits.push(board_time - alight - walked);
                    }
                    last_alight = Some(*alight_time);
                    walked = 0;
                }
                RaptorLeg::Transfer {
                    departure_time,
                    arrival_time,
                    ..
                } => walked += arrival_time - departure_time,
                _ => {}
            }
        }
        waits
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn transit(trip: &str, board_time: i32, alight_time: i32) -> RaptorLeg {
        RaptorLeg::Transit {
            trip_id: FeedScopedId::new("test", trip),
            pattern: PatternId(0),
            board_stop: StopId(0),
            alight_stop: StopId(1),
            board_pos: 0,
            alight_pos: 1,
            board_time,
            alight_time,
            constraint: TransferConstraint::Regular,
        }
    }

    #[test]
    fn times_and_counts() {
        let path = RaptorPath::new(
            vec![
                RaptorLeg::Access {
                    stop: StopId(0),
                    departure_time: 0,
                    arrival_time: 30,
                    distance_m: 40.0,
                },
                transit("T1", 40, 100),
                RaptorLeg::Transfer {
                    from: StopId(1),
                    to: StopId(2),
                    departure_time: 100,
                    arrival_time: 160,
                    distance_m: 80.0,
                },
                transit("T2", 400, 500),
                RaptorLeg::Egress {
                    stop: StopId(3),
                    departure_time: 500,
                    arrival_time: 520,
                    distance_m: 25.0,
                },
            ],
            1_000,
        );

        assert_eq!(path.departure_time(), 0);
        assert_eq!(path.arrival_time(), 520);
        assert_eq!(path.duration(), 520);
        assert_eq!(path.num_boardings(), 2);
        assert_eq!(path.num_transfers(), 1);
        assert_eq!(path.trips().len(), 2);
        assert_eq!(path.trips()[1].id(), "T2");
        assert_eq!(path.transfer_waits(), vec![240]);
        assert_eq!(path.cost(), 1_000);
    }

    #[test]
    fn empty_path() {
        let path = RaptorPath::new(Vec::new(), 0);
        assert_eq!(path.duration(), 0);
        assert_eq!(path.num_transfers(), 0);
        assert!(path.transfer_waits().is_empty());
    }
}
