//! Best-first search ordered by weight plus a remaining-weight estimate.

use std::cmp::Reverse;
use std::collections::BinaryHeap;
use std::time::Instant;

use ordered_float::OrderedFloat;
use tracing::{debug, trace, warn};

use crate::domain::TraverseMode;
use crate::graph::EdgeKind;
use crate::heuristic::RemainingWeightHeuristic;
use crate::state::{RoutingContext, State, StateId};

use super::dominance::DominanceRule;
use super::tree::ShortestPathTree;

/// Restricts which edges a search may use.
pub type EdgeFilter = fn(&EdgeKind) -> bool;

/// How many states come off the queue between clock checks.
const DEADLINE_CHECK_INTERVAL: usize = 64;

/// Limits on one search beyond those in its request.
#[derive(Debug, Clone, Copy, Default)]
pub struct SearchLimits {
    /// Give up at this wall-clock instant.
    pub deadline: Option<Instant>,
    /// Only traverse edges this accepts.
    pub edge_filter: Option<EdgeFilter>,
}

impl SearchLimits {
    pub fn with_deadline(deadline: Instant) -> Self {
        Self {
            deadline: Some(deadline),
            edge_filter: None,
        }
    }
}

/// The queue and tree of a running best-first search.
///
/// Callers drive it: [`pop`](Self::pop) the next state, decide whether it
/// ends the search, and [`expand`](Self::expand) it otherwise. A* and the
/// multi-objective search differ only in that loop and in the
/// [`DominanceRule`] of the tree.
pub(crate) struct BestFirst<'a, 'g> {
    ctx: &'a RoutingContext<'g>,
    heuristic: &'a mut dyn RemainingWeightHeuristic,
    limits: SearchLimits,
    tree: ShortestPathTree,
    queue: BinaryHeap<Reverse<(OrderedFloat<f64>, u64, StateId)>>,
    pushed: u64,
    popped: usize,
    timed_out: bool,
    walk_limit_hits: usize,
}

impl<'a, 'g> BestFirst<'a, 'g> {
    /// Prepare the heuristic and queue the context's initial state.
    pub(crate) fn new(
        ctx: &'a RoutingContext<'g>,
        heuristic: &'a mut dyn RemainingWeightHeuristic,
        limits: SearchLimits,
        rule: DominanceRule,
    ) -> Self {
        heuristic.initialize(ctx);
        let mut search = Self {
            ctx,
            heuristic,
            limits,
            tree: ShortestPathTree::new(rule),
            queue: BinaryHeap::new(),
            pushed: 0,
            popped: 0,
            timed_out: false,
            walk_limit_hits: 0,
        };
        if let Some(initial) = ctx.initial_state() {
            search.push(initial);
        }
        search
    }

    pub(crate) fn set_deadline(&mut self, deadline: Option<Instant>) {
        self.limits.deadline = deadline;
    }

    pub(crate) fn timed_out(&self) -> bool {
        self.timed_out
    }

    /// How many successors were lost to the request's walk limit.
    pub(crate) fn walk_limit_hits(&self) -> usize {
        self.walk_limit_hits
    }

    pub(crate) fn tree(&self) -> &ShortestPathTree {
        &self.tree
    }

    /// The next live state in key order. `None` once the queue is empty or
    /// the deadline has passed.
    pub(crate) fn pop(&mut self) -> Option<StateId> {
        while let Some(Reverse((_, _, id))) = self.queue.pop() {
            self.popped += 1;
            if self.popped % DEADLINE_CHECK_INTERVAL == 0 && self.past_deadline() {
                self.timed_out = true;
                return None;
            }
            if self.tree.is_live(id) {
                return Some(id);
            }
        }
        None
    }

    /// Queue the successors of `id` over every edge the limits allow.
    pub(crate) fn expand(&mut self, id: StateId) {
        let ctx = self.ctx;
        let v = self.tree.get(id).vertex();
        for edge in ctx.search_edges(v) {
            let edge_ref = ctx.edge(edge);
            if self
                .limits
                .edge_filter
                .is_some_and(|accept| !accept(edge_ref.kind()))
            {
                continue;
            }
            let parent = self.tree.get(id);
            let successors = ctx.traverse(edge, id, parent);
            if successors.is_empty() && self.hit_walk_limit(parent, edge_ref.distance_m()) {
                self.walk_limit_hits += 1;
            }
            for state in successors {
                self.push(state);
            }
        }
    }

    /// Stop the heuristic and hand over the tree.
    pub(crate) fn finish(self) -> ShortestPathTree {
        self.heuristic.abort();
        debug!(
            states = self.tree.state_count(),
            popped = self.popped,
            timed_out = self.timed_out,
            "best-first search finished"
        );
        self.tree
    }

    fn push(&mut self, state: State) {
        let request = self.ctx.request();
        if request.max_weight.is_some_and(|max| state.weight() > max) {
            return;
        }
        if request
            .max_duration_s
            .is_some_and(|max| state.elapsed_seconds() > max)
        {
            return;
        }
        let estimate = self.heuristic.estimate(&state, self.ctx);
        let key = state.weight() + estimate * request.heuristic_weight;
        if !key.is_finite() {
            trace!(vertex = ?state.vertex(), "target unreachable, pruned");
            return;
        }
        if let Some(id) = self.tree.add(state) {
            self.queue.push(Reverse((OrderedFloat(key), self.pushed, id)));
            self.pushed += 1;
        }
    }

    fn past_deadline(&self) -> bool {
        self.limits
            .deadline
            .is_some_and(|deadline| Instant::now() >= deadline)
    }

    fn hit_walk_limit(&self, parent: &State, distance_m: f64) -> bool {
        distance_m > 0.0
            && parent.street_mode() == TraverseMode::Walk
            && parent.trip().is_none()
            && self
                .ctx
                .request()
                .exceeds_max_walk(parent.walk_distance() + distance_m)
    }
}

/// Single-objective search from the context's start.
///
/// With a target, stops as soon as the target's best state leaves the
/// queue and returns the tree; returns `None` if the target was never
/// reached. Without a target, explores everything reachable. Returns
/// `None` on timeout either way.
///
/// # Examples
///
/// ```
/// use chrono::NaiveDate;
/// use transit_router::domain::{Coordinate, IdFactory, ServiceDay, TraverseMode, TraverseModeSet};
/// use transit_router::graph::{GraphBuilder, StreetSegment};
/// use transit_router::heuristic::TrivialHeuristic;
/// use transit_router::search::{SearchLimits, astar};
/// use transit_router::state::{RoutingContext, RoutingRequest};
///
/// let day = ServiceDay::new(NaiveDate::from_ymd_opt(2024, 3, 15).unwrap());
/// let mut b = GraphBuilder::new(IdFactory::new("demo"), day);
/// let a = b.add_intersection("A", Coordinate::new(0.0, 0.0)).unwrap();
/// let c = b.add_intersection("C", Coordinate::new(0.0, 0.001)).unwrap();
/// b.add_street_pair(a, c, StreetSegment::new(120.0)).unwrap();
/// let graph = b.build();
///
/// let request = RoutingRequest::new(TraverseModeSet::single(TraverseMode::Walk));
/// let ctx = RoutingContext::between(&graph, request, a, Some(c));
/// let tree = astar(&ctx, &mut TrivialHeuristic, SearchLimits::default()).unwrap();
/// let (_, best) = tree.best_state(c).unwrap();
/// assert_eq!(best.time(), 90);
/// ```
pub fn astar(
    ctx: &RoutingContext<'_>,
    heuristic: &mut dyn RemainingWeightHeuristic,
    limits: SearchLimits,
) -> Option<ShortestPathTree> {
    let target = ctx.search_target();
    let mut search = BestFirst::new(ctx, heuristic, limits, DominanceRule::WeightThenTime);
    let mut found = false;
    while let Some(id) = search.pop() {
        if Some(search.tree().get(id).vertex()) == target {
            found = true;
            break;
        }
        search.expand(id);
    }

    let timed_out = search.timed_out();
    let tree = search.finish();
    if timed_out {
        warn!(target = ?target, "A* search timed out");
        return None;
    }
    if target.is_some() && !found {
        debug!(target = ?target, "A* search exhausted without reaching target");
        return None;
    }
    Some(tree)
}
