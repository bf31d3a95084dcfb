//! Shortest paths through a hierarchy, with A* when none applies.

use std::time::Instant;

use tracing::debug;

use crate::config::HeuristicConfig;
use crate::graph::{EdgeId, VertexId};
use crate::heuristic::default_heuristic;
use crate::path::GraphPath;
use crate::search::{SearchLimits, astar};
use crate::state::{RoutingContext, StateArena, StateId};

use super::hierarchy::{ContractionHierarchy, QueryFailure};

/// Answers point-to-point queries from a hierarchy when it fits the
/// request, and from A* over the full graph otherwise.
#[derive(Debug, Clone)]
pub struct ContractionRouter<'h> {
    hierarchy: Option<&'h ContractionHierarchy>,
    heuristic: HeuristicConfig,
}

/// The outcome of trying the hierarchy.
enum Attempt {
    Found(GraphPath),
    NoPath,
    NotApplicable(&'static str),
}

impl<'h> ContractionRouter<'h> {
    pub fn new(hierarchy: Option<&'h ContractionHierarchy>, heuristic: &HeuristicConfig) -> Self {
        Self {
            hierarchy,
            heuristic: heuristic.clone(),
        }
    }

    /// The lowest-weight path between the origin and destination of
    /// `ctx`, or `None` if there is none or the deadline passes first.
    pub fn shortest_path(&self, ctx: &RoutingContext<'_>, deadline: Option<Instant>) -> Option<GraphPath> {
        let origin = ctx.origin()?;
        let destination = ctx.destination()?;
        match self.try_hierarchy(ctx, origin, destination, deadline) {
            Attempt::Found(path) => Some(path),
            Attempt::NoPath => None,
            Attempt::NotApplicable(reason) => {
                debug!(reason, "hierarchy not usable, falling back to A*");
                self.astar_path(ctx, deadline)
            }
        }
    }

    fn try_hierarchy(
        &self,
        ctx: &RoutingContext<'_>,
        origin: VertexId,
        destination: VertexId,
        deadline: Option<Instant>,
    ) -> Attempt {
        let Some(hierarchy) = self.hierarchy else {
            return Attempt::NotApplicable("no hierarchy");
        };
        if !hierarchy.fits(ctx.graph()) {
            return Attempt::NotApplicable("built for another graph");
        }
        if !hierarchy.profile().matches(ctx.request()) {
            return Attempt::NotApplicable("profile differs from request");
        }
        if ctx.temporary_vertex_count() > 0 {
            return Attempt::NotApplicable("temporary endpoints");
        }

        let found = match hierarchy.query(origin, destination, deadline) {
            Ok(found) => found,
            Err(QueryFailure::Unreachable | QueryFailure::TimedOut) => return Attempt::NoPath,
        };
        debug!(
            edges = found.edges.len(),
            weight = found.weight,
            "hierarchy query complete"
        );
        match replay(ctx, &found.edges) {
            Some(path) => Attempt::Found(path),
            // The request limits something the profile does not, such as
            // walking distance.
            None => Attempt::NotApplicable("request rejects the hierarchy path"),
        }
    }

    fn astar_path(&self, ctx: &RoutingContext<'_>, deadline: Option<Instant>) -> Option<GraphPath> {
        let target = ctx.search_target()?;
        let mut heuristic = default_heuristic(ctx, &self.heuristic);
        let limits = SearchLimits {
            deadline,
            ..SearchLimits::default()
        };
        let tree = astar(ctx, heuristic.as_mut(), limits)?;
        let (terminal, _) = tree.best_state(target)?;
        Some(GraphPath::from_terminal(tree.arena(), terminal, ctx))
    }
}

/// Traverse `edges`, given origin to destination, from the initial state
/// of `ctx` so the path carries the request's own times and weights.
///
/// Arrive-by contexts start at the destination and walk the edges
/// backward. Returns `None` if any edge refuses the state.
fn replay(ctx: &RoutingContext<'_>, edges: &[EdgeId]) -> Option<GraphPath> {
    let mut arena = StateArena::new();
    let mut current: StateId = arena.push(ctx.initial_state()?);
    let order: Box<dyn Iterator<Item = &EdgeId>> = if ctx.request().arrive_by {
        Box::new(edges.iter().rev())
    } else {
        Box::new(edges.iter())
    };
    for &edge in order {
        let parent = arena.get(current).clone();
        let next = ctx.traverse(edge, current, &parent).into_iter().next()?;
        current = arena.push(next);
    }
    Some(GraphPath::from_terminal(&arena, current, ctx))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ContractionConfig;
    use crate::contraction::WeightProfile;
    use crate::domain::{TraverseMode, TraverseModeSet};
    use crate::graph::{Graph, fixtures};
    use crate::state::{LocatedPoint, RoutingRequest};

    fn unit_walk() -> RoutingRequest {
        RoutingRequest {
            walk_speed: 1.0,
            walk_reluctance: 1.0,
            ..RoutingRequest::new(TraverseModeSet::single(TraverseMode::Walk))
        }
    }

    fn hierarchy(graph: &Graph) -> ContractionHierarchy {
        let profile = WeightProfile::for_request(&unit_walk()).unwrap();
        ContractionHierarchy::build(graph, profile, &ContractionConfig::default())
    }

    fn labels(graph: &Graph, path: &GraphPath) -> Vec<String> {
        path.vertices()
            .into_iter()
            .map(|v| graph.vertex(v).label().to_owned())
            .collect()
    }

    #[test]
    fn hierarchy_and_astar_agree() {
        let graph = fixtures::triangle();
        let ch = hierarchy(&graph);
        let a = graph.vertex_by_label("A").unwrap();
        let b = graph.vertex_by_label("B").unwrap();
        let ctx = RoutingContext::between(&graph, unit_walk(), a, Some(b));

        let config = HeuristicConfig::default();
        let fast = ContractionRouter::new(Some(&ch), &config)
            .shortest_path(&ctx, None)
            .unwrap();
        let slow = ContractionRouter::new(None, &config)
            .shortest_path(&ctx, None)
            .unwrap();

        assert_eq!(labels(&graph, &fast), vec!["A", "C", "B"]);
        assert_eq!(fast.weight(), 2.0);
        assert_eq!(labels(&graph, &slow), labels(&graph, &fast));
        assert_eq!(slow.weight(), fast.weight());
        assert_eq!(slow.end_time(), fast.end_time());
    }

    #[test]
    fn arrive_by_replays_backward() {
        let graph = fixtures::triangle();
        let ch = hierarchy(&graph);
        let a = graph.vertex_by_label("A").unwrap();
        let b = graph.vertex_by_label("B").unwrap();
        let request = RoutingRequest {
            date_time: 1_000,
            ..unit_walk().with_arrive_by(true)
        };
        let ctx = RoutingContext::between(&graph, request, a, Some(b));

        let path = ContractionRouter::new(Some(&ch), &HeuristicConfig::default())
            .shortest_path(&ctx, None)
            .unwrap();
        assert_eq!(labels(&graph, &path), vec!["A", "C", "B"]);
        assert_eq!(path.start_time(), 998);
        assert_eq!(path.end_time(), 1_000);
    }

    #[test]
    fn other_profile_falls_back() {
        let graph = fixtures::triangle();
        let ch = hierarchy(&graph);
        let a = graph.vertex_by_label("A").unwrap();
        let b = graph.vertex_by_label("B").unwrap();
        let request = RoutingRequest {
            walk_reluctance: 3.0,
            ..unit_walk()
        };
        let ctx = RoutingContext::between(&graph, request, a, Some(b));

        let path = ContractionRouter::new(Some(&ch), &HeuristicConfig::default())
            .shortest_path(&ctx, None)
            .unwrap();
        assert_eq!(path.weight(), 6.0);
    }

    #[test]
    fn walk_limit_falls_back_and_finds_nothing() {
        let graph = fixtures::line(4);
        let ch = hierarchy(&graph);
        let v0 = graph.vertex_by_label("V0").unwrap();
        let v3 = graph.vertex_by_label("V3").unwrap();
        let request = RoutingRequest {
            max_walk_distance: Some(150.0),
            ..unit_walk()
        };
        let ctx = RoutingContext::between(&graph, request, v0, Some(v3));

        let router = ContractionRouter::new(Some(&ch), &HeuristicConfig::default());
        assert!(router.shortest_path(&ctx, None).is_none());
    }

    #[test]
    fn passed_deadline_finds_nothing() {
        let past = Instant::now() - std::time::Duration::from_secs(1);

        let graph = fixtures::line(6);
        let ch = hierarchy(&graph);
        let v0 = graph.vertex_by_label("V0").unwrap();
        let v5 = graph.vertex_by_label("V5").unwrap();
        let ctx = RoutingContext::between(&graph, unit_walk(), v0, Some(v5));
        let router = ContractionRouter::new(Some(&ch), &HeuristicConfig::default());
        assert!(router.shortest_path(&ctx, Some(past)).is_none());

        // The A* fallback honours the deadline too.
        let long = fixtures::line(200);
        let first = long.vertex_by_label("V0").unwrap();
        let last = long.vertex_by_label("V199").unwrap();
        let ctx = RoutingContext::between(&long, unit_walk(), first, Some(last));
        let router = ContractionRouter::new(None, &HeuristicConfig::default());
        assert!(router.shortest_path(&ctx, Some(past)).is_none());
    }

    #[test]
    fn temporary_endpoint_falls_back() {
        let graph = fixtures::line(3);
        let ch = hierarchy(&graph);
        let v0 = graph.vertex_by_label("V0").unwrap();
        let v2 = graph.vertex_by_label("V2").unwrap();
        let edge = graph.street_edge_between(v0, graph.vertex_by_label("V1").unwrap()).unwrap();

        let mut ctx = RoutingContext::new(&graph, unit_walk());
        ctx.set_origin(LocatedPoint::OnEdge { edge, fraction: 0.5 }).unwrap();
        ctx.set_destination(LocatedPoint::Vertex(v2)).unwrap();

        let path = ContractionRouter::new(Some(&ch), &HeuristicConfig::default())
            .shortest_path(&ctx, None)
            .unwrap();
        assert_eq!(path.weight(), 150.0);
    }

    #[test]
    fn transit_request_uses_astar() {
        let graph = fixtures::small_transit();
        let ch = hierarchy(&graph);
        let o = graph.vertex_by_label("O").unwrap();
        let d = graph.vertex_by_label("D").unwrap();
        let request = RoutingRequest {
            date_time: fixtures::service_day().time("07:55").unwrap(),
            ..RoutingRequest::default()
        };
        let ctx = RoutingContext::between(&graph, request, o, Some(d));

        let path = ContractionRouter::new(Some(&ch), &HeuristicConfig::default())
            .shortest_path(&ctx, None)
            .unwrap();
        assert_eq!(path.num_boardings(), 1);
    }
}
