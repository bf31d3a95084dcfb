//! Exact lower bounds computed on a background thread.

use std::cmp::Reverse;
use std::collections::BinaryHeap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, OnceLock};
use std::thread::JoinHandle;

use ordered_float::OrderedFloat;
use tracing::{debug, warn};

use crate::config::HeuristicConfig;
use crate::state::{RoutingContext, State};

use super::RemainingWeightHeuristic;
use super::euclidean::EuclideanHeuristic;

/// How many vertices the worker settles between cancellation checks.
const CANCEL_CHECK_INTERVAL: usize = 1024;

/// Lower bounds from a time-independent Dijkstra run backward from the
/// search target, using each edge's
/// [`lower_bound_weight`](crate::graph::Edge::lower_bound_weight).
///
/// The table is computed on a background thread started by
/// [`initialize`](RemainingWeightHeuristic::initialize). Until it is
/// ready, estimates fall back to [`EuclideanHeuristic`]; once ready they
/// are the larger of the two. Vertices the table cannot reach estimate as
/// infinite, which lets the search prune them.
///
/// [`cancel`](Self::cancel) (also run by `abort` and on drop) stops the
/// worker at its next check.
#[derive(Debug)]
pub struct BidirectionalHeuristic {
    euclidean: EuclideanHeuristic,
    table: Arc<OnceLock<Vec<f64>>>,
    cancelled: Arc<AtomicBool>,
    worker: Option<JoinHandle<()>>,
}

impl BidirectionalHeuristic {
    pub fn new(config: &HeuristicConfig) -> Self {
        Self {
            euclidean: EuclideanHeuristic::new(config),
            table: Arc::new(OnceLock::new()),
            cancelled: Arc::new(AtomicBool::new(false)),
            worker: None,
        }
    }

    /// Returns true once the background table is available.
    pub fn is_ready(&self) -> bool {
        self.table.get().is_some()
    }

    /// Ask the background worker to stop.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Relaxed);
    }

    /// Block until the background worker has finished or stopped.
    pub fn wait(&mut self) {
        let Some(worker) = self.worker.take() else {
            return;
        };
        if worker.join().is_err() {
            warn!("bidirectional heuristic worker panicked");
        }
    }
}

impl RemainingWeightHeuristic for BidirectionalHeuristic {
    fn initialize(&mut self, ctx: &RoutingContext<'_>) {
        self.euclidean.initialize(ctx);
        let Some(target) = ctx.search_target() else {
            return;
        };

        let graph = LowerBoundGraph::snapshot(ctx);
        let table = Arc::clone(&self.table);
        let cancelled = Arc::clone(&self.cancelled);
        let spawned = std::thread::Builder::new()
            .name("bidirectional-heuristic".to_owned())
            .spawn(move || {
                if let Some(weights) = graph.dijkstra(target.index(), &cancelled) {
                    let _ = table.set(weights);
                }
            });
        match spawned {
            Ok(handle) => self.worker = Some(handle),
            Err(e) => warn!(error = %e, "failed to start heuristic worker, using straight-line bounds"),
        }
    }

    fn estimate(&self, state: &State, ctx: &RoutingContext<'_>) -> f64 {
        let euclidean = self.euclidean.estimate(state, ctx);
        match self.table.get() {
            Some(table) => table
                .get(state.vertex().index())
                .map_or(euclidean, |&exact| exact.max(euclidean)),
            None => euclidean,
        }
    }

    fn abort(&mut self) {
        self.cancel();
    }
}

impl Drop for BidirectionalHeuristic {
    fn drop(&mut self) {
        self.cancel();
    }
}

/// An owned copy of the context's edges, pointed backward from the target
/// and weighted by lower bounds, so the worker does not borrow the graph.
struct LowerBoundGraph {
    /// `adjacency[v]` lists `(u, w)`: from `v`, the search target is at
    /// most `w` closer through `u`.
    adjacency: Vec<Vec<(u32, f64)>>,
}

impl LowerBoundGraph {
    fn snapshot(ctx: &RoutingContext<'_>) -> Self {
        let mut adjacency = vec![Vec::new(); ctx.vertex_count()];
        let arrive_by = ctx.request().arrive_by;
        for index in 0..ctx.edge_count() {
            let edge = ctx.edge(crate::graph::EdgeId(index as u32));
            let weight = edge.lower_bound_weight(ctx);
            if !weight.is_finite() {
                continue;
            }
            // A depart-by search moves from `from` to `to`, so the backward
            // sweep from the target steps from `to` to `from`.
            let (near, far) = if arrive_by {
                (edge.from(), edge.to())
            } else {
                (edge.to(), edge.from())
            };
            adjacency[near.index()].push((far.0, weight));
        }
        Self { adjacency }
    }

    /// Shortest lower-bound weight from `source` to every vertex, or `None`
    /// if cancelled.
    fn dijkstra(&self, source: usize, cancelled: &AtomicBool) -> Option<Vec<f64>> {
        let mut dist = vec![f64::INFINITY; self.adjacency.len()];
        let mut heap = BinaryHeap::new();
        if source >= dist.len() {
            return Some(dist);
        }
        dist[source] = 0.0;
        heap.push(Reverse((OrderedFloat(0.0), source)));

        let mut settled = 0usize;
        while let Some(Reverse((OrderedFloat(d), v))) = heap.pop() {
            if d > dist[v] {
                continue;
            }
            settled += 1;
            if settled % CANCEL_CHECK_INTERVAL == 0 && cancelled.load(Ordering::Relaxed) {
                debug!(settled, "bidirectional heuristic cancelled");
                return None;
            }
            for &(u, w) in &self.adjacency[v] {
                let u = u as usize;
                let candidate = d + w;
                if candidate < dist[u] {
                    dist[u] = candidate;
                    heap.push(Reverse((OrderedFloat(candidate), u)));
                }
            }
        }
        debug!(settled, "bidirectional heuristic ready");
        Some(dist)
    }
}
