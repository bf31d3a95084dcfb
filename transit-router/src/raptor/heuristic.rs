//! Lower bounds from each stop to the end of the search.
//!
//! Computed once per search, independent of the time of day: riding uses
//! each pattern's shortest hop times, transfers their walking time, and
//! the search ends at the egress stops with their street time.

use std::cmp::Reverse;
use std::collections::BinaryHeap;

use tracing::trace;

use crate::graph::StopId;

use super::access::RaptorAccess;
use super::schedule::RaptorTransitData;
use super::trip_search::SearchDirection;

/// Per-stop lower bounds on remaining travel time and boardings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RaptorHeuristic {
    times: Vec<Option<u64>>,
    boardings: Vec<Option<u64>>,
}

impl RaptorHeuristic {
    /// Bounds towards `egress`, for a search in `direction`.
    ///
    /// Going forward the bound runs from a stop to the destination;
    /// going backward from the origin to a stop, with `egress` then being
    /// the origin's access legs.
    pub fn new(data: &RaptorTransitData<'_>, direction: SearchDirection, egress: &[RaptorAccess]) -> Self {
        let n = data.stop_count();
        let mut time_edges: Vec<Vec<(usize, u64)>> = vec![Vec::new(); n];
        let mut boarding_edges: Vec<Vec<(usize, u64)>> = vec![Vec::new(); n];
        let mut add = |from: StopId, to: StopId, seconds: i32, boardings: u64| {
            // Edges point against the search so the bound grows from the
            // egress stops outward.
            let (key, other) = if direction.is_forward() {
                (to.index(), from.index())
            } else {
                (from.index(), to.index())
            };
            let seconds = u64::try_from(seconds.max(0)).unwrap_or(0);
            time_edges[key].push((other, seconds));
            boarding_edges[key].push((other, boardings));
        };

        for pattern in data.graph().patterns() {
            if data.trips(pattern.id()).is_empty() {
                continue;
            }
            let stops = pattern.stops();
            let mut offsets = Vec::with_capacity(stops.len());
            let mut total = 0;
            offsets.push(0);
            for pos in 0..stops.len() - 1 {
                total += pattern.min_hop_time(pos).max(0);
                offsets.push(total);
            }
            for i in 0..stops.len() {
                for j in i + 1..stops.len() {
                    add(stops[i], stops[j], offsets[j] - offsets[i], 1);
                }
            }
        }
        for from in 0..n {
            let from = StopId(from as u32);
            for transfer in data.transfers_from(from) {
                add(from, transfer.stop, transfer.duration, 0);
            }
        }

        let seeds = || {
            egress
                .iter()
                .map(|leg| (leg.stop.index(), u64::try_from(leg.duration.max(0)).unwrap_or(0)))
        };
        let times = dijkstra(&time_edges, seeds());
        let boardings = dijkstra(&boarding_edges, seeds().map(|(stop, _)| (stop, 0)));
        trace!(
            reachable = times.iter().filter(|t| t.is_some()).count(),
            stops = n,
            "stop bounds computed"
        );
        Self { times, boardings }
    }

    /// Fewest seconds from `stop` to the end of the search, or `None` if it
    /// cannot be reached.
    pub fn min_time(&self, stop: StopId) -> Option<i32> {
        self.times[stop.index()].map(|t| i32::try_from(t).unwrap_or(i32::MAX))
    }

    /// Fewest boardings from `stop` to the end of the search.
    pub fn min_boardings(&self, stop: StopId) -> Option<u32> {
        self.boardings[stop.index()].map(|b| u32::try_from(b).unwrap_or(u32::MAX))
    }

    pub fn is_reachable(&self, stop: StopId) -> bool {
        self.times[stop.index()].is_some()
    }
}

fn dijkstra(edges: &[Vec<(usize, u64)>], seeds: impl Iterator<Item = (usize, u64)>) -> Vec<Option<u64>> {
    let mut dist: Vec<Option<u64>> = vec![None; edges.len()];
    let mut heap = BinaryHeap::new();
    for (stop, d) in seeds {
        if dist[stop].is_none_or(|current| d < current) {
            dist[stop] = Some(d);
            heap.push(Reverse((d, stop)));
        }
    }
    while let Some(Reverse((d, stop))) = heap.pop() {
        if dist[stop].is_some_and(|best| d > best) {
            continue;
        }
        for &(next, w) in &edges[stop] {
            let candidate = d.saturating_add(w);
            if dist[next].is_none_or(|current| candidate < current) {
                dist[next] = Some(candidate);
                heap.push(Reverse((candidate, next)));
            }
        }
    }
    dist
}
