use std::error::Error;

use chrono::NaiveDate;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use transit_router::config::RouterConfig;
use transit_router::contraction::{ContractionHierarchy, WeightProfile};
use transit_router::domain::{
    Coordinate, IdFactory, ServiceDay, TraverseMode, TraverseModeSet, format_service_time,
};
use transit_router::graph::{Graph, GraphBuilder, StreetSegment, TripTimes};
use transit_router::planner::{Place, PlanRequest, Planner};
use transit_router::state::{RoutingRequest, SearchAlgorithm};

/// A short street with a stop at each end and one route between them.
fn demo_network() -> Result<Graph, Box<dyn Error>> {
    let date = NaiveDate::from_ymd_opt(2024, 3, 15).ok_or("invalid service date")?;
    let mut b = GraphBuilder::new(IdFactory::new("demo"), ServiceDay::new(date));

    let corners: Vec<_> = (0..5)
        .map(|i| b.add_intersection(&format!("corner-{i}"), Coordinate::new(51.5, -0.1 + i as f64 * 0.01)))
        .collect::<Result<_, _>>()?;
    for pair in corners.windows(2) {
        b.add_street_pair(pair[0], pair[1], StreetSegment::new(700.0))?;
    }

    let west = b.add_stop("W", "West", Coordinate::new(51.5, -0.1), true)?;
    let east = b.add_stop("E", "East", Coordinate::new(51.5, -0.06), true)?;
    b.link_stop(west, corners[0])?;
    b.link_stop(east, corners[4])?;

    let trips = (0..6)
        .map(|i| {
            let departs = 8 * 3600 + i * 900;
            TripTimes::from_departures(b.ids().create(&format!("trip-{i}")), vec![departs, departs + 420])
        })
        .collect::<Result<Vec<_>, _>>()?;
    b.add_pattern("crosstown", &[west, east], trips)?;
    Ok(b.build())
}

fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = match std::env::args().nth(1) {
        Some(path) => RouterConfig::load(&path)?,
        None => RouterConfig::default(),
    };

    let graph = demo_network()?;
    info!(
        vertices = graph.vertex_count(),
        edges = graph.edge_count(),
        "network built"
    );

    let departure = graph.service_day().time("07:50")?;
    let walk_only = RoutingRequest::new(TraverseModeSet::single(TraverseMode::Walk));
    let hierarchy = WeightProfile::for_request(&walk_only)
        .map(|profile| ContractionHierarchy::build(&graph, profile, &config.contraction));
    let mut planner = Planner::new(&graph, config);
    if let Some(hierarchy) = &hierarchy {
        planner = planner.with_hierarchy(hierarchy);
    }

    let from = Place::Vertex("corner-0".to_string());
    let to = Place::Vertex("corner-4".to_string());
    let requests = [
        RoutingRequest::default().with_algorithm(SearchAlgorithm::AStar),
        RoutingRequest::default().with_algorithm(SearchAlgorithm::MultiObjective),
        RoutingRequest::default().with_algorithm(SearchAlgorithm::Raptor),
        walk_only.with_algorithm(SearchAlgorithm::Contraction),
    ];

    for request in requests {
        let request = RoutingRequest {
            date_time: departure,
            ..request
        };
        let algorithm = request.algorithm;
        let plan = PlanRequest::new(from.clone(), to.clone(), request);
        let result = match planner.plan(&plan) {
            Ok(result) => result,
            Err(e) => {
                error!(?algorithm, "planning failed: {e}");
                continue;
            }
        };
        if result.is_empty() {
            warn!(?algorithm, timed_out = result.timed_out, "no itineraries");
        }
        for path in &result.paths {
            let trips: Vec<String> = path.trips().iter().map(ToString::to_string).collect();
            info!(
                ?algorithm,
                depart = path.start_time(),
                arrive = path.end_time(),
                weight = path.weight(),
                ?trips,
                "itinerary"
            );
        }
        for path in &result.transit_paths {
            info!(
                ?algorithm,
                depart = %format_service_time(path.departure_time()),
                arrive = %format_service_time(path.arrival_time()),
                boardings = path.num_boardings(),
                "transit itinerary"
            );
        }
    }
    Ok(())
}
