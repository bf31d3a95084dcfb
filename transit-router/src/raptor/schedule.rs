//! The transit network as the round-based search sees it.

use tracing::debug;

use crate::domain::TraverseMode;
use crate::graph::{
    EdgeKind, Graph, PatternId, StopId, TransferConstraint, TripPattern, TripRef, TripTransfer,
    VertexKind,
};
use crate::state::RoutingRequest;

use super::constrained::ConstrainedTransfers;

/// A walk between two stops.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RaptorTransfer {
    /// The stop at the other end.
    pub stop: StopId,
    pub duration: i32,
    pub distance_m: f64,
}

/// Stops, patterns and transfers of a graph, filtered by one request.
///
/// Trips the request may not use (banned, inaccessible, no bikes) are left
/// out of each pattern's trip list; banned stops lose their patterns and
/// transfers. Trip indices stay those of the underlying
/// [`TripPattern`], so they remain comparable with the graph's.
#[derive(Debug)]
pub struct RaptorTransitData<'g> {
    graph: &'g Graph,
    trips: Vec<Vec<usize>>,
    patterns_by_stop: Vec<Vec<(PatternId, usize)>>,
    transfers: Vec<Vec<RaptorTransfer>>,
    reverse_transfers: Vec<Vec<RaptorTransfer>>,
    constraints: ConstrainedTransfers,
}

impl<'g> RaptorTransitData<'g> {
    pub fn new(graph: &'g Graph, request: &RoutingRequest) -> Self {
        let with_bicycle = request.initial_street_mode() == TraverseMode::Bicycle;
        let banned_stop = |stop: StopId| request.banned_stops.contains(graph.stop(stop).id());

        let trips: Vec<Vec<usize>> = graph
            .patterns()
            .iter()
            .map(|pattern| {
                (0..pattern.trips().len())
                    .filter(|&i| request.trip_allowed(pattern.trip(i), with_bicycle))
                    .collect()
            })
            .collect();

        let mut patterns_by_stop = vec![Vec::new(); graph.stops().len()];
        for pattern in graph.patterns() {
            for (pos, &stop) in pattern.stops().iter().enumerate() {
                if !banned_stop(stop) {
                    patterns_by_stop[stop.index()].push((pattern.id(), pos));
                }
            }
        }

        let mut transfers = vec![Vec::new(); graph.stops().len()];
        let mut reverse_transfers = vec![Vec::new(); graph.stops().len()];
        for (_, edge) in graph.edges() {
            let EdgeKind::Transfer {
                distance_m,
                min_time_s,
            } = *edge.kind()
            else {
                continue;
            };
            let (VertexKind::TransitStop(from), VertexKind::TransitStop(to)) =
                (graph.vertex(edge.from()).kind(), graph.vertex(edge.to()).kind())
            else {
                continue;
            };
            if banned_stop(from) || banned_stop(to) || request.exceeds_max_walk(distance_m) {
                continue;
            }
            let seconds = (distance_m / request.walk_speed).max(min_time_s as f64);
            let duration = seconds.round() as i32;
            transfers[from.index()].push(RaptorTransfer {
                stop: to,
                duration,
                distance_m,
            });
            reverse_transfers[to.index()].push(RaptorTransfer {
                stop: from,
                duration,
                distance_m,
            });
        }

        let mut trip_transfers: Vec<TripTransfer> = graph.trip_transfers().to_vec();
        trip_transfers.extend(same_stop_interlines(graph));
        let constraints = ConstrainedTransfers::new(&trip_transfers);

        debug!(
            patterns = trips.len(),
            stops = patterns_by_stop.len(),
            constraints = trip_transfers.len(),
            "transit data prepared"
        );

        Self {
            graph,
            trips,
            patterns_by_stop,
            transfers,
            reverse_transfers,
            constraints,
        }
    }

    pub fn graph(&self) -> &'g Graph {
        self.graph
    }

    pub fn stop_count(&self) -> usize {
        self.patterns_by_stop.len()
    }

    pub fn pattern(&self, id: PatternId) -> &'g TripPattern {
        self.graph.pattern(id)
    }

    /// Usable trip indices of `pattern`, in the pattern's order.
    pub fn trips(&self, pattern: PatternId) -> &[usize] {
        &self.trips[pattern.index()]
    }

    /// Patterns visiting `stop`, with the position of the visit.
    pub fn patterns_at(&self, stop: StopId) -> &[(PatternId, usize)] {
        &self.patterns_by_stop[stop.index()]
    }

    /// Walks leaving `stop`.
    pub fn transfers_from(&self, stop: StopId) -> &[RaptorTransfer] {
        &self.transfers[stop.index()]
    }

    /// Walks arriving at `stop`, each listing the stop it leaves from.
    pub fn transfers_to(&self, stop: StopId) -> &[RaptorTransfer] {
        &self.reverse_transfers[stop.index()]
    }

    pub fn constraints(&self) -> &ConstrainedTransfers {
        &self.constraints
    }
}

/// Interline edges that stay at one stop are stay-seated transfers
/// between each trip pair they join.
fn same_stop_interlines(graph: &Graph) -> Vec<TripTransfer> {
    let mut found = Vec::new();
    for (_, edge) in graph.edges() {
        let EdgeKind::InterlineDwell(interline) = edge.kind() else {
            continue;
        };
        let from = graph.pattern(interline.from_pattern);
        let to = graph.pattern(interline.to_pattern);
        let last = from.num_stops() - 1;
        if from.stop(last) != to.stop(0) {
            continue;
        }
        found.extend(interline.trips.iter().map(|&(a, b)| TripTransfer {
            from: TripRef {
                pattern: from.id(),
                trip_index: a,
            },
            from_stop_pos: last,
            to: TripRef {
                pattern: to.id(),
                trip_index: b,
            },
            to_stop_pos: 0,
            constraint: TransferConstraint::StaySeated,
        }));
    }
    found
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Coordinate, FeedScopedId};
    use crate::graph::{TripTimes, fixtures};

    #[test]
    fn interline_becomes_stay_seated() {
        let graph = fixtures::interline(true);
        let data = RaptorTransitData::new(&graph, &RoutingRequest::default());

        let x = graph.stop_by_id(&FeedScopedId::new("test", "X")).unwrap();
        let p2 = data.patterns_at(x).iter().find(|(_, pos)| *pos == 0).unwrap().0;
        let found = data.constraints().boarding(p2, 0);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].constraint, TransferConstraint::StaySeated);
        assert_eq!(found[0].from_stop_pos, 1);
    }

    #[test]
    fn no_interline_no_constraints() {
        let graph = fixtures::interline(false);
        let data = RaptorTransitData::new(&graph, &RoutingRequest::default());
        let x = graph.stop_by_id(&FeedScopedId::new("test", "X")).unwrap();
        for &(pattern, pos) in data.patterns_at(x) {
            assert!(data.constraints().boarding(pattern, pos).is_empty());
        }
    }

    #[test]
    fn banned_trips_are_filtered() {
        let graph = fixtures::small_transit();
        let mut request = RoutingRequest::default();
        request.banned_trips.insert(FeedScopedId::new("test", "T1"));
        let data = RaptorTransitData::new(&graph, &request);

        let pattern = graph.patterns()[0].id();
        assert_eq!(data.trips(pattern), &[1]);
        assert_eq!(data.pattern(pattern).trip(1).trip_id().id(), "T2");
    }

    #[test]
    fn banned_stops_lose_patterns() {
        let graph = fixtures::small_transit();
        let mut request = RoutingRequest::default();
        request.banned_stops.insert(FeedScopedId::new("test", "S2"));
        let data = RaptorTransitData::new(&graph, &request);

        let s1 = graph.stop_by_id(&FeedScopedId::new("test", "S1")).unwrap();
        let s2 = graph.stop_by_id(&FeedScopedId::new("test", "S2")).unwrap();
        assert_eq!(data.patterns_at(s1).len(), 1);
        assert!(data.patterns_at(s2).is_empty());
    }

    #[test]
    fn transfers_in_both_directions() {
        let mut b = fixtures::builder();
        let s1 = b.add_stop("S1", "One", Coordinate::new(0.0, 0.0), true).unwrap();
        let s2 = b.add_stop("S2", "Two", Coordinate::new(0.0, 0.001), true).unwrap();
        b.add_transfer(s1, s2, 133.0, 30).unwrap();
        let trip = TripTimes::from_departures(b.ids().create("T"), vec![0, 60]).unwrap();
        b.add_pattern("R", &[s1, s2], vec![trip]).unwrap();
        let graph = b.build();

        let request = RoutingRequest {
            walk_speed: 1.33,
            ..RoutingRequest::default()
        };
        let data = RaptorTransitData::new(&graph, &request);

        assert_eq!(data.transfers_from(s1).len(), 1);
        assert_eq!(data.transfers_from(s1)[0].stop, s2);
        assert_eq!(data.transfers_from(s1)[0].duration, 100);
        assert_eq!(data.transfers_to(s2)[0].stop, s1);
        assert!(data.transfers_from(s2).is_empty());
    }
}
