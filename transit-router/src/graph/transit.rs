//! Scheduled transit data: stops, trip times and trip patterns.
//!
//! A [`TripPattern`] is the set of trips that visit the same ordered list of
//! stops. Its trips are kept sorted by first departure, and the pattern
//! remembers whether they also stay in order at every later stop (FIFO).
//! FIFO timetables are searched by bisection; the rest fall back to a scan.

use std::fmt;

use tracing::warn;

use crate::domain::FeedScopedId;

use super::GraphError;
use super::vertex::VertexId;

/// Index of a transit stop.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StopId(pub u32);

impl StopId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Debug for StopId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "s{}", self.0)
    }
}

/// Index of a trip pattern.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PatternId(pub u32);

impl PatternId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Debug for PatternId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "p{}", self.0)
    }
}

/// A specific trip: the pattern it runs on and its index in that
/// pattern's sorted timetable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TripRef {
    pub pattern: PatternId,
    pub trip_index: usize,
}

/// A transit stop.
#[derive(Debug, Clone, PartialEq)]
pub struct TransitStop {
    id: FeedScopedId,
    name: String,
    vertex: VertexId,
    wheelchair_boarding: bool,
}

impl TransitStop {
    pub(crate) fn new(
        id: FeedScopedId,
        name: &str,
        vertex: VertexId,
        wheelchair_boarding: bool,
    ) -> Self {
        Self {
            id,
            name: name.to_string(),
            vertex,
            wheelchair_boarding,
        }
    }

    pub fn id(&self) -> &FeedScopedId {
        &self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// The off-board vertex of this stop.
    pub fn vertex(&self) -> VertexId {
        self.vertex
    }

    pub fn wheelchair_boarding(&self) -> bool {
        self.wheelchair_boarding
    }
}

/// Arrival and departure times of one trip, in seconds since the service
/// day's midnight, one entry per stop of its pattern.
#[derive(Debug, Clone, PartialEq)]
pub struct TripTimes {
    trip_id: FeedScopedId,
    arrivals: Vec<i32>,
    departures: Vec<i32>,
    wheelchair_accessible: bool,
    bikes_allowed: bool,
}

impl TripTimes {
    /// Create trip times, checking that time never runs backwards along
    /// the trip.
    ///
    /// # Examples
    ///
    /// ```
    /// use transit_router::domain::FeedScopedId;
    /// use transit_router::graph::TripTimes;
    ///
    /// let id = FeedScopedId::new("bus", "t1");
    /// let trip = TripTimes::new(id.clone(), vec![0, 100, 200], vec![0, 110, 200]).unwrap();
    /// assert_eq!(trip.departure(1), 110);
    ///
    /// assert!(TripTimes::new(id, vec![0, 100], vec![0, 90, 200]).is_err());
    /// ```
    pub fn new(
        trip_id: FeedScopedId,
        arrivals: Vec<i32>,
        departures: Vec<i32>,
    ) -> Result<Self, GraphError> {
        if arrivals.len() != departures.len() {
            return Err(GraphError::StopTimeCount {
                trip: trip_id.to_string(),
                expected: arrivals.len(),
                found: departures.len(),
            });
        }

        for pos in 0..arrivals.len() {
            let dwell_ok = departures[pos] >= arrivals[pos];
            let hop_ok = pos + 1 >= arrivals.len() || arrivals[pos + 1] >= departures[pos];
            if !dwell_ok || !hop_ok {
                return Err(GraphError::DecreasingTimes {
                    trip: trip_id.to_string(),
                    position: pos,
                });
            }
        }

        Ok(Self {
            trip_id,
            arrivals,
            departures,
            wheelchair_accessible: true,
            bikes_allowed: false,
        })
    }

    /// Trip times with no dwell: arrival equals departure at every stop.
    pub fn from_departures(trip_id: FeedScopedId, times: Vec<i32>) -> Result<Self, GraphError> {
        Self::new(trip_id, times.clone(), times)
    }

    pub fn with_wheelchair_accessible(mut self, accessible: bool) -> Self {
        self.wheelchair_accessible = accessible;
        self
    }

    pub fn with_bikes_allowed(mut self, allowed: bool) -> Self {
        self.bikes_allowed = allowed;
        self
    }

    pub fn trip_id(&self) -> &FeedScopedId {
        &self.trip_id
    }

    pub fn arrival(&self, pos: usize) -> i32 {
        self.arrivals[pos]
    }

    pub fn departure(&self, pos: usize) -> i32 {
        self.departures[pos]
    }

    pub fn arrivals(&self) -> &[i32] {
        &self.arrivals
    }

    pub fn departures(&self) -> &[i32] {
        &self.departures
    }

    pub fn num_stops(&self) -> usize {
        self.arrivals.len()
    }

    pub fn wheelchair_accessible(&self) -> bool {
        self.wheelchair_accessible
    }

    pub fn bikes_allowed(&self) -> bool {
        self.bikes_allowed
    }
}

/// All trips running along one ordered list of stops.
#[derive(Debug, Clone, PartialEq)]
pub struct TripPattern {
    id: PatternId,
    route_id: FeedScopedId,
    stops: Vec<StopId>,
    trips: Vec<TripTimes>,
    depart_vertices: Vec<VertexId>,
    arrive_vertices: Vec<VertexId>,
    fifo: bool,
}

impl TripPattern {
    /// Assemble a pattern. Trips are sorted by first departure.
    ///
    /// `depart_vertices[i]` is the on-board vertex leaving stop `i`
    /// (for `i < n - 1`) and `arrive_vertices[i - 1]` the one reaching
    /// stop `i` (for `i >= 1`).
    pub(crate) fn new(
        id: PatternId,
        route_id: FeedScopedId,
        stops: Vec<StopId>,
        mut trips: Vec<TripTimes>,
        depart_vertices: Vec<VertexId>,
        arrive_vertices: Vec<VertexId>,
    ) -> Self {
        trips.sort_by_key(|t| t.departures.first().copied().unwrap_or_default());

        let fifo = trips.windows(2).all(|w| {
            let (a, b) = (&w[0], &w[1]);
            (0..a.num_stops())
                .all(|pos| a.departures[pos] <= b.departures[pos] && a.arrivals[pos] <= b.arrivals[pos])
        });
        if !fifo {
            warn!(pattern = ?id, route = %route_id, "trips overtake each other, timetable is not FIFO");
        }

        Self {
            id,
            route_id,
            stops,
            trips,
            depart_vertices,
            arrive_vertices,
            fifo,
        }
    }

    pub fn id(&self) -> PatternId {
        self.id
    }

    pub fn route_id(&self) -> &FeedScopedId {
        &self.route_id
    }

    pub fn stops(&self) -> &[StopId] {
        &self.stops
    }

    pub fn stop(&self, pos: usize) -> StopId {
        self.stops[pos]
    }

    pub fn num_stops(&self) -> usize {
        self.stops.len()
    }

    /// First position at which `stop` is visited.
    pub fn stop_position(&self, stop: StopId) -> Option<usize> {
        self.stops.iter().position(|&s| s == stop)
    }

    pub fn trips(&self) -> &[TripTimes] {
        &self.trips
    }

    pub fn trip(&self, index: usize) -> &TripTimes {
        &self.trips[index]
    }

    pub fn trip_index(&self, trip_id: &FeedScopedId) -> Option<usize> {
        self.trips.iter().position(|t| t.trip_id() == trip_id)
    }

    /// Returns true if trips never overtake each other.
    pub fn is_fifo(&self) -> bool {
        self.fifo
    }

    pub fn depart_vertex(&self, pos: usize) -> Option<VertexId> {
        self.depart_vertices.get(pos).copied()
    }

    pub fn arrive_vertex(&self, pos: usize) -> Option<VertexId> {
        pos.checked_sub(1)
            .and_then(|i| self.arrive_vertices.get(i).copied())
    }

    /// Up to `count` trips leaving `pos` at or after `earliest`, earliest
    /// first, skipping trips `accept` rejects.
    pub fn next_departures(
        &self,
        pos: usize,
        earliest: i32,
        count: usize,
        accept: impl Fn(&TripTimes) -> bool,
    ) -> Vec<usize> {
        if self.fifo {
            let first = self
                .trips
                .partition_point(|t| t.departures[pos] < earliest);
            return (first..self.trips.len())
                .filter(|&i| accept(&self.trips[i]))
                .take(count)
                .collect();
        }

        let mut candidates: Vec<usize> = (0..self.trips.len())
            .filter(|&i| self.trips[i].departures[pos] >= earliest && accept(&self.trips[i]))
            .collect();
        candidates.sort_by_key(|&i| self.trips[i].departures[pos]);
        candidates.truncate(count);
        candidates
    }

    /// Up to `count` trips reaching `pos` at or before `latest`, latest
    /// first, skipping trips `accept` rejects.
    pub fn previous_arrivals(
        &self,
        pos: usize,
        latest: i32,
        count: usize,
        accept: impl Fn(&TripTimes) -> bool,
    ) -> Vec<usize> {
        if self.fifo {
            let end = self.trips.partition_point(|t| t.arrivals[pos] <= latest);
            return (0..end)
                .rev()
                .filter(|&i| accept(&self.trips[i]))
                .take(count)
                .collect();
        }

        let mut candidates: Vec<usize> = (0..self.trips.len())
            .filter(|&i| self.trips[i].arrivals[pos] <= latest && accept(&self.trips[i]))
            .collect();
        candidates.sort_by_key(|&i| std::cmp::Reverse(self.trips[i].arrivals[pos]));
        candidates.truncate(count);
        candidates
    }

    /// Shortest running time of any trip from `pos` to `pos + 1`.
    pub fn min_hop_time(&self, pos: usize) -> i32 {
        self.trips
            .iter()
            .map(|t| t.arrivals[pos + 1] - t.departures[pos])
            .min()
            .unwrap_or(0)
    }

    /// Shortest dwell of any trip at `pos`.
    pub fn min_dwell_time(&self, pos: usize) -> i32 {
        self.trips
            .iter()
            .map(|t| t.departures[pos] - t.arrivals[pos])
            .min()
            .unwrap_or(0)
    }
}

/// How a transfer between two specific trips is treated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum TransferConstraint {
    /// No special treatment.
    #[default]
    Regular,
    /// The transfer may not be made.
    NotAllowed,
    /// The rider stays on the vehicle; the two trips are one run.
    StaySeated,
    /// The second trip waits for the first.
    Guaranteed,
}

impl TransferConstraint {
    /// Returns true if the transfer needs no slack and the second trip
    /// is boarded regardless of the generic earliest-trip rule.
    pub fn is_facilitated(self) -> bool {
        matches!(
            self,
            TransferConstraint::StaySeated | TransferConstraint::Guaranteed
        )
    }
}

/// A constraint on transferring from one trip at one stop to another trip
/// at another (usually the same) stop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TripTransfer {
    pub from: TripRef,
    pub from_stop_pos: usize,
    pub to: TripRef,
    pub to_stop_pos: usize,
    pub constraint: TransferConstraint,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(s: &str) -> FeedScopedId {
        FeedScopedId::new("test", s)
    }

    fn trip(name: &str, times: &[i32]) -> TripTimes {
        TripTimes::from_departures(id(name), times.to_vec()).unwrap()
    }

    fn pattern(trips: Vec<TripTimes>) -> TripPattern {
        TripPattern::new(
            PatternId(0),
            id("route"),
            vec![StopId(0), StopId(1), StopId(2)],
            trips,
            vec![VertexId(10), VertexId(11)],
            vec![VertexId(20), VertexId(21)],
        )
    }

    #[test]
    fn trip_times_validation() {
        assert!(TripTimes::new(id("t"), vec![0, 10], vec![5, 10]).is_ok());

        let err = TripTimes::new(id("t"), vec![0, 10], vec![20, 30]).unwrap_err();
        assert_eq!(
            err,
            GraphError::DecreasingTimes {
                trip: "test:t".to_string(),
                position: 0
            }
        );

        assert!(matches!(
            TripTimes::new(id("t"), vec![0], vec![0, 1]),
            Err(GraphError::StopTimeCount { .. })
        ));
    }

    #[test]
    fn trips_are_sorted_and_fifo() {
        let p = pattern(vec![trip("late", &[200, 300, 400]), trip("early", &[100, 200, 300])]);

        assert!(p.is_fifo());
        assert_eq!(p.trip(0).trip_id(), &id("early"));
        assert_eq!(p.trip_index(&id("late")), Some(1));
    }

    #[test]
    fn vertex_lookup_by_position() {
        let p = pattern(vec![trip("a", &[0, 10, 20])]);

        assert_eq!(p.depart_vertex(0), Some(VertexId(10)));
        assert_eq!(p.depart_vertex(2), None);
        assert_eq!(p.arrive_vertex(0), None);
        assert_eq!(p.arrive_vertex(2), Some(VertexId(21)));
    }

    #[test]
    fn next_departures_fifo() {
        let p = pattern(vec![
            trip("a", &[100, 200, 300]),
            trip("b", &[150, 250, 350]),
            trip("c", &[200, 300, 400]),
        ]);

        assert_eq!(p.next_departures(1, 210, 5, |_| true), vec![1, 2]);
        assert_eq!(p.next_departures(1, 200, 1, |_| true), vec![0]);
        assert_eq!(
            p.next_departures(0, 0, 5, |t| t.trip_id() != &id("b")),
            vec![0, 2]
        );
        assert!(p.next_departures(2, 401, 5, |_| true).is_empty());
    }

    #[test]
    fn previous_arrivals_fifo() {
        let p = pattern(vec![
            trip("a", &[100, 200, 300]),
            trip("b", &[150, 250, 350]),
        ]);

        assert_eq!(p.previous_arrivals(2, 360, 5, |_| true), vec![1, 0]);
        assert_eq!(p.previous_arrivals(2, 349, 5, |_| true), vec![0]);
        assert!(p.previous_arrivals(2, 299, 5, |_| true).is_empty());
    }

    #[test]
    fn overtaking_trips_use_scan() {
        let p = pattern(vec![
            trip("slow", &[100, 300, 500]),
            trip("fast", &[150, 200, 250]),
        ]);

        assert!(!p.is_fifo());
        // The fast trip leaves later but reaches stop 1 first.
        assert_eq!(p.next_departures(1, 0, 1, |_| true), vec![1]);
        assert_eq!(p.previous_arrivals(2, 1000, 1, |_| true), vec![0]);
    }

    #[test]
    fn min_times() {
        let p = pattern(vec![
            TripTimes::new(id("a"), vec![0, 100, 200], vec![0, 110, 200]).unwrap(),
            TripTimes::new(id("b"), vec![50, 140, 260], vec![50, 145, 260]).unwrap(),
        ]);

        assert_eq!(p.min_hop_time(0), 90);
        assert_eq!(p.min_hop_time(1), 90);
        assert_eq!(p.min_dwell_time(1), 5);
    }

    #[test]
    fn constraint_facilitation() {
        assert!(TransferConstraint::StaySeated.is_facilitated());
        assert!(TransferConstraint::Guaranteed.is_facilitated());
        assert!(!TransferConstraint::Regular.is_facilitated());
        assert!(!TransferConstraint::NotAllowed.is_facilitated());
    }
}
