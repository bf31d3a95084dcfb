//! Several materially different itineraries from one search.

use std::time::{Duration, Instant};

use tracing::debug;

use crate::config::RouterConfig;
use crate::heuristic::default_heuristic;
use crate::path::GraphPath;
use crate::state::{RoutingContext, StateId};

use super::astar::{BestFirst, SearchLimits};
use super::dominance::{DominanceRule, EpsilonDominance};

/// Paths found by [`multi_objective_search`].
#[derive(Debug, Clone)]
pub struct MultiObjectiveResult {
    /// No path here ε-dominates another.
    pub paths: Vec<GraphPath>,
    /// A deadline ended the search. With paths present this is still a
    /// success.
    pub timed_out: bool,
    /// The walk limit of the attempt that produced the result.
    pub max_walk_distance: Option<f64>,
}

impl MultiObjectiveResult {
    fn empty(timed_out: bool, max_walk_distance: Option<f64>) -> Self {
        Self {
            paths: Vec::new(),
            timed_out,
            max_walk_distance,
        }
    }
}

/// Best-first search keeping every state no similar state ε-dominates.
///
/// Each state settled at the target is recorded as a path and not
/// expanded. The first path gets the longest time budget and each further
/// one a shorter budget, all capped by the overall timeout. The search
/// ends when `num_itineraries` paths are found, the queue empties, or the
/// active budget runs out.
///
/// When nothing is found and the walk limit turned states away, the
/// search reruns with the limit doubled (capped by the configured
/// ceiling), a bounded number of times.
pub fn multi_objective_search(
    ctx: &RoutingContext<'_>,
    config: &RouterConfig,
) -> MultiObjectiveResult {
    let mo = &config.multi_objective;
    let started = Instant::now();
    let timeout = ctx
        .request()
        .timeout_ms
        .map_or(mo.timeout(), Duration::from_millis);
    let hard_deadline = started + timeout;

    let mut request = ctx.request().clone();
    for attempt in 0..=mo.max_walk_retries {
        let attempt_ctx = ctx.with_request(request.clone());
        let outcome = search_once(&attempt_ctx, config, started, hard_deadline);
        debug!(
            attempt,
            paths = outcome.paths.len(),
            timed_out = outcome.timed_out,
            walk_limit_hits = outcome.walk_limit_hits,
            "multi-objective attempt complete"
        );
        if !outcome.paths.is_empty() || outcome.timed_out {
            return MultiObjectiveResult {
                paths: outcome.paths,
                timed_out: outcome.timed_out,
                max_walk_distance: request.max_walk_distance,
            };
        }

        match request.max_walk_distance {
            Some(limit) if outcome.walk_limit_hits > 0 && limit < mo.max_walk_ceiling_m => {
                let widened = (limit * 2.0).min(mo.max_walk_ceiling_m);
                debug!(from = limit, to = widened, "no paths, widening walk limit");
                request.max_walk_distance = Some(widened);
            }
            _ => break,
        }
    }
    MultiObjectiveResult::empty(false, request.max_walk_distance)
}

struct Attempt {
    paths: Vec<GraphPath>,
    timed_out: bool,
    walk_limit_hits: usize,
}

fn search_once(
    ctx: &RoutingContext<'_>,
    config: &RouterConfig,
    started: Instant,
    hard_deadline: Instant,
) -> Attempt {
    let mo = &config.multi_objective;
    let rule = EpsilonDominance::new(mo.epsilon, mo.similarity);
    let Some(target) = ctx.search_target() else {
        return Attempt {
            paths: Vec::new(),
            timed_out: false,
            walk_limit_hits: 0,
        };
    };
    let wanted = ctx.request().num_itineraries.max(1);
    let budget = |found: usize, from: Instant| (from + mo.path_timeout(found)).min(hard_deadline);

    let mut heuristic = default_heuristic(ctx, &config.heuristic);
    let limits = SearchLimits::with_deadline(budget(0, started));
    let mut search = BestFirst::new(ctx, heuristic.as_mut(), limits, DominanceRule::Epsilon(rule));

    let mut found: Vec<StateId> = Vec::new();
    while let Some(id) = search.pop() {
        if search.tree().get(id).vertex() != target {
            search.expand(id);
            continue;
        }
        found.push(id);
        debug!(found = found.len(), weight = search.tree().get(id).weight(), "path found");
        if found.len() >= wanted {
            break;
        }
        search.set_deadline(Some(budget(found.len(), Instant::now())));
    }

    let timed_out = search.timed_out();
    let walk_limit_hits = search.walk_limit_hits();
    let tree = search.finish();

    // Keep only terminal states no other kept one dominates.
    let mut kept: Vec<StateId> = Vec::with_capacity(found.len());
    for id in found {
        let state = tree.get(id);
        if kept.iter().any(|&k| rule.dominates(tree.get(k), state)) {
            continue;
        }
        kept.retain(|&k| !rule.dominates(state, tree.get(k)));
        kept.push(id);
    }

    let paths = kept
        .into_iter()
        .map(|id| GraphPath::from_terminal(tree.arena(), id, ctx))
        .collect();
    Attempt {
        paths,
        timed_out,
        walk_limit_hits,
    }
}
