//! The planner facade: resolve places, pick an engine, rank the results.

use std::time::{Duration, Instant};

use tracing::{debug, info};

use crate::config::RouterConfig;
use crate::contraction::{ContractionHierarchy, ContractionRouter};
use crate::graph::Graph;
use crate::heuristic::default_heuristic;
use crate::path::{GraphPath, deduplicate, rank_paths};
use crate::raptor::{RaptorPath, raptor_search};
use crate::search::{SearchLimits, astar, multi_objective_search};
use crate::state::{LocatedPoint, RoutingContext, RoutingRequest, SearchAlgorithm};

use super::place::{NearestVertexLocator, Place, PlaceRole, VertexLocator, resolve};

/// Error from planning a trip.
///
/// Only problems with the inputs are errors. Finding no path, or running
/// out of time, gives an empty [`PlanResult`].
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum PlanError {
    /// Every place that could not be found in the graph.
    #[error("places not found: {}", list_roles(.places))]
    NotFound { places: Vec<PlaceRole> },

    #[error("invalid plan request: {0}")]
    InvalidRequest(String),
}

fn list_roles(roles: &[PlaceRole]) -> String {
    roles
        .iter()
        .map(PlaceRole::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// A trip to plan.
#[derive(Debug, Clone, PartialEq)]
pub struct PlanRequest {
    pub from: Place,
    pub to: Place,
    /// Places to pass through, in order.
    pub intermediate: Vec<Place>,
    pub routing: RoutingRequest,
}

impl PlanRequest {
    pub fn new(from: Place, to: Place, routing: RoutingRequest) -> Self {
        Self {
            from,
            to,
            intermediate: Vec::new(),
            routing,
        }
    }

    pub fn via(mut self, place: Place) -> Self {
        self.intermediate.push(place);
        self
    }

    /// Reject requests no engine can answer.
    pub fn validate(&self) -> Result<(), PlanError> {
        if self.routing.modes.is_empty() {
            return Err(PlanError::InvalidRequest("no modes allowed".to_string()));
        }
        if self.routing.num_itineraries == 0 {
            return Err(PlanError::InvalidRequest(
                "at least one itinerary must be requested".to_string(),
            ));
        }
        let speeds = [
            self.routing.walk_speed,
            self.routing.bike_speed,
            self.routing.car_speed,
        ];
        if speeds.iter().any(|s| !s.is_finite() || *s <= 0.0) {
            return Err(PlanError::InvalidRequest("speeds must be positive".to_string()));
        }
        if self.routing.algorithm == SearchAlgorithm::Raptor {
            if self.routing.is_street_only() {
                return Err(PlanError::InvalidRequest(
                    "transit search needs transit among the modes".to_string(),
                ));
            }
            if !self.intermediate.is_empty() {
                return Err(PlanError::InvalidRequest(
                    "transit search cannot pass through intermediate places".to_string(),
                ));
            }
        }
        Ok(())
    }
}

/// Itineraries for a [`PlanRequest`].
#[derive(Debug, Clone, Default)]
pub struct PlanResult {
    /// Graph paths, in chronological order.
    pub paths: Vec<GraphPath>,
    /// Round-based transit itineraries, for transit searches.
    pub transit_paths: Vec<RaptorPath>,
    /// A deadline cut the search short.
    pub timed_out: bool,
}

impl PlanResult {
    pub fn is_empty(&self) -> bool {
        self.paths.is_empty() && self.transit_paths.is_empty()
    }
}

/// Plans trips over one graph.
///
/// The graph is borrowed per planner, so a caller can swap in a new graph
/// by building a new planner.
pub struct Planner<'g> {
    graph: &'g Graph,
    config: RouterConfig,
    hierarchy: Option<&'g ContractionHierarchy>,
    locator: Box<dyn VertexLocator + 'g>,
}

impl<'g> Planner<'g> {
    pub fn new(graph: &'g Graph, config: RouterConfig) -> Self {
        Self {
            graph,
            config,
            hierarchy: None,
            locator: Box::new(NearestVertexLocator::default()),
        }
    }

    pub fn with_hierarchy(mut self, hierarchy: &'g ContractionHierarchy) -> Self {
        self.hierarchy = Some(hierarchy);
        self
    }

    pub fn with_locator(mut self, locator: impl VertexLocator + 'g) -> Self {
        self.locator = Box::new(locator);
        self
    }

    pub fn config(&self) -> &RouterConfig {
        &self.config
    }

    /// Plan `plan` with the engine its request names.
    pub fn plan(&self, plan: &PlanRequest) -> Result<PlanResult, PlanError> {
        plan.validate()?;
        let places = self.resolve_all(plan)?;
        let request = &plan.routing;
        let started = Instant::now();

        let mut result = match request.algorithm {
            SearchAlgorithm::Raptor => self.plan_transit(request, places[0], places[1])?,
            _ if places.len() > 2 => self.plan_via(request, &places, started)?,
            SearchAlgorithm::AStar => self.plan_alternatives(request, places[0], places[1], started)?,
            SearchAlgorithm::MultiObjective => {
                let ctx = self.context(request.clone(), places[0], places[1])?;
                let found = multi_objective_search(&ctx, &self.config);
                PlanResult {
                    paths: found.paths,
                    timed_out: found.timed_out,
                    ..PlanResult::default()
                }
            }
            SearchAlgorithm::Contraction => {
                let ctx = self.context(request.clone(), places[0], places[1])?;
                let deadline = started + self.timeout(request, self.config.contraction.timeout());
                let router = ContractionRouter::new(self.hierarchy, &self.config.heuristic);
                let path = router.shortest_path(&ctx, Some(deadline));
                PlanResult {
                    timed_out: path.is_none() && Instant::now() >= deadline,
                    paths: path.into_iter().collect(),
                    ..PlanResult::default()
                }
            }
        };
        result.paths = rank_paths(deduplicate(result.paths));
        result.paths.truncate(request.num_itineraries);
        info!(
            algorithm = ?request.algorithm,
            paths = result.paths.len(),
            transit_paths = result.transit_paths.len(),
            timed_out = result.timed_out,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "plan complete"
        );
        Ok(result)
    }

    /// Origin, intermediate places, destination, in travel order.
    fn resolve_all(&self, plan: &PlanRequest) -> Result<Vec<LocatedPoint>, PlanError> {
        let modes = plan.routing.modes;
        let named = std::iter::once((PlaceRole::From, &plan.from))
            .chain(
                plan.intermediate
                    .iter()
                    .enumerate()
                    .map(|(i, p)| (PlaceRole::Intermediate(i), p)),
            )
            .chain(std::iter::once((PlaceRole::To, &plan.to)));

        let mut points = Vec::new();
        let mut missing = Vec::new();
        for (role, place) in named {
            match resolve(self.graph, place, self.locator.as_ref(), modes) {
                Some(point) => points.push(point),
                None => missing.push(role),
            }
        }
        if !missing.is_empty() {
            missing.sort();
            debug!(?missing, "unresolved places");
            return Err(PlanError::NotFound { places: missing });
        }
        Ok(points)
    }

    fn context(
        &self,
        request: RoutingRequest,
        from: LocatedPoint,
        to: LocatedPoint,
    ) -> Result<RoutingContext<'g>, PlanError> {
        let mut ctx = RoutingContext::new(self.graph, request);
        let mut missing = Vec::new();
        if ctx.set_origin(from).is_err() {
            missing.push(PlaceRole::From);
        }
        if ctx.set_destination(to).is_err() {
            missing.push(PlaceRole::To);
        }
        if missing.is_empty() {
            Ok(ctx)
        } else {
            Err(PlanError::NotFound { places: missing })
        }
    }

    fn timeout(&self, request: &RoutingRequest, configured: Duration) -> Duration {
        request.timeout_ms.map_or(configured, Duration::from_millis)
    }

    fn plan_transit(
        &self,
        request: &RoutingRequest,
        from: LocatedPoint,
        to: LocatedPoint,
    ) -> Result<PlanResult, PlanError> {
        let ctx = self.context(request.clone(), from, to)?;
        let found = raptor_search(&ctx, &self.config);
        let mut transit_paths = found.paths;
        // Most boardings last means soonest arrival last; show the fastest
        // first.
        transit_paths.reverse();
        transit_paths.truncate(request.num_itineraries);
        Ok(PlanResult {
            transit_paths,
            timed_out: found.timed_out,
            ..PlanResult::default()
        })
    }

    /// Repeated A* searches, banning the trips of each path found so the
    /// next search finds something else.
    fn plan_alternatives(
        &self,
        request: &RoutingRequest,
        from: LocatedPoint,
        to: LocatedPoint,
        started: Instant,
    ) -> Result<PlanResult, PlanError> {
        let astar_config = &self.config.astar;
        let deadline = started + self.timeout(request, astar_config.timeout());
        let wanted = (request.num_itineraries as f64 * astar_config.oversearch_multiplier)
            .ceil()
            .max(1.0) as usize;

        let mut attempt_request = request.clone();
        let mut paths = Vec::new();
        for attempt in 0..=astar_config.max_banned_trip_retries {
            let ctx = self.context(attempt_request.clone(), from, to)?;
            let Some(path) = self.best_path(&ctx, deadline) else {
                break;
            };
            debug!(
                attempt,
                weight = path.weight(),
                trips = path.trips().len(),
                "alternative found"
            );
            let trips = path.trips().to_vec();
            paths.push(path);
            if trips.is_empty() || paths.len() >= wanted {
                break;
            }
            attempt_request.banned_trips.extend(trips);
        }
        Ok(PlanResult {
            timed_out: Instant::now() >= deadline,
            paths,
            ..PlanResult::default()
        })
    }

    /// One best path per leg between consecutive places, joined in travel
    /// order. Arrive-by requests plan the last leg first.
    fn plan_via(
        &self,
        request: &RoutingRequest,
        places: &[LocatedPoint],
        started: Instant,
    ) -> Result<PlanResult, PlanError> {
        let deadline = started + self.timeout(request, self.config.astar.timeout());
        let legs = places.len() - 1;
        let order: Vec<usize> = if request.arrive_by {
            (0..legs).rev().collect()
        } else {
            (0..legs).collect()
        };

        let mut found: Vec<Option<GraphPath>> = vec![None; legs];
        let mut time = request.date_time;
        for i in order {
            let leg_request = RoutingRequest {
                date_time: time,
                ..request.clone()
            };
            let ctx = self.context(leg_request, places[i], places[i + 1])?;
            let path = match request.algorithm {
                SearchAlgorithm::Contraction => {
                    ContractionRouter::new(self.hierarchy, &self.config.heuristic)
                        .shortest_path(&ctx, Some(deadline))
                }
                SearchAlgorithm::MultiObjective => multi_objective_search(&ctx, &self.config)
                    .paths
                    .into_iter()
                    .next(),
                _ => self.best_path(&ctx, deadline),
            };
            let Some(path) = path else {
                debug!(leg = i, "no path for leg");
                return Ok(PlanResult {
                    timed_out: Instant::now() >= deadline,
                    ..PlanResult::default()
                });
            };
            time = if request.arrive_by {
                path.start_time()
            } else {
                path.end_time()
            };
            found[i] = Some(path);
        }

        let joined = GraphPath::concat(found.into_iter().flatten().collect());
        Ok(PlanResult {
            paths: joined.into_iter().collect(),
            ..PlanResult::default()
        })
    }

    fn best_path(&self, ctx: &RoutingContext<'_>, deadline: Instant) -> Option<GraphPath> {
        let target = ctx.search_target()?;
        let mut heuristic = default_heuristic(ctx, &self.config.heuristic);
        let tree = astar(ctx, heuristic.as_mut(), SearchLimits::with_deadline(deadline))?;
        let (terminal, _) = tree.best_state(target)?;
        Some(GraphPath::from_terminal(tree.arena(), terminal, ctx))
    }
}
