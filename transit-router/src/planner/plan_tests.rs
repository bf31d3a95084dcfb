//! Unit tests for the planner facade.

use std::time::Instant;

use super::*;
use crate::config::{ContractionConfig, RaptorConfig, RouterConfig};
use crate::contraction::{ContractionHierarchy, WeightProfile};
use crate::domain::{Coordinate, FeedScopedId, TraverseMode, TraverseModeSet};
use crate::graph::{Graph, fixtures};
use crate::path::GraphPath;
use crate::state::{RoutingRequest, SearchAlgorithm};

fn vertex(label: &str) -> Place {
    Place::Vertex(label.to_string())
}

fn unit_walk() -> RoutingRequest {
    RoutingRequest {
        walk_speed: 1.0,
        walk_reluctance: 1.0,
        ..RoutingRequest::new(TraverseModeSet::single(TraverseMode::Walk))
    }
}

fn labels(graph: &Graph, path: &GraphPath) -> Vec<String> {
    path.vertices()
        .into_iter()
        .map(|v| graph.vertex(v).label().to_owned())
        .collect()
}

fn trip_names(path: &GraphPath) -> Vec<&str> {
    path.trips().iter().map(FeedScopedId::id).collect()
}

#[test]
fn lists_every_missing_place() {
    let graph = fixtures::triangle();
    let planner = Planner::new(&graph, RouterConfig::default());
    let plan = PlanRequest::new(vertex("nowhere"), vertex("B"), unit_walk())
        .via(vertex("C"))
        .via(vertex("also nowhere"));

    let err = planner.plan(&plan).unwrap_err();
    assert_eq!(
        err,
        PlanError::NotFound {
            places: vec![PlaceRole::From, PlaceRole::Intermediate(1)]
        }
    );
    assert_eq!(
        err.to_string(),
        "places not found: from, intermediate place 1"
    );
}

#[test]
fn far_coordinate_is_not_found() {
    let graph = fixtures::triangle();
    let planner = Planner::new(&graph, RouterConfig::default());
    let plan = PlanRequest::new(
        vertex("A"),
        Place::Coordinate(Coordinate::new(10.0, 10.0)),
        unit_walk(),
    );
    assert_eq!(
        planner.plan(&plan).unwrap_err(),
        PlanError::NotFound {
            places: vec![PlaceRole::To]
        }
    );
}

#[test]
fn rejects_contradictory_requests() {
    let graph = fixtures::triangle();
    let planner = Planner::new(&graph, RouterConfig::default());

    let no_modes = RoutingRequest::new(TraverseModeSet::default());
    let plan = PlanRequest::new(vertex("A"), vertex("B"), no_modes);
    assert!(matches!(planner.plan(&plan), Err(PlanError::InvalidRequest(_))));

    let transit_without_transit = unit_walk().with_algorithm(SearchAlgorithm::Raptor);
    let plan = PlanRequest::new(vertex("A"), vertex("B"), transit_without_transit);
    assert!(matches!(planner.plan(&plan), Err(PlanError::InvalidRequest(_))));

    let none_wanted = RoutingRequest {
        num_itineraries: 0,
        ..unit_walk()
    };
    let plan = PlanRequest::new(vertex("A"), vertex("B"), none_wanted);
    assert!(matches!(planner.plan(&plan), Err(PlanError::InvalidRequest(_))));
}

#[test]
fn street_trip_has_one_answer() {
    let graph = fixtures::triangle();
    let planner = Planner::new(&graph, RouterConfig::default());
    let plan = PlanRequest::new(vertex("A"), vertex("B"), unit_walk());

    let result = planner.plan(&plan).unwrap();
    assert_eq!(result.paths.len(), 1);
    assert_eq!(labels(&graph, &result.paths[0]), vec!["A", "C", "B"]);
    assert_eq!(result.paths[0].weight(), 2.0);
    assert!(result.transit_paths.is_empty());
    assert!(!result.timed_out);
}

#[test]
fn banning_trips_finds_alternatives() {
    let graph = fixtures::small_transit();
    let planner = Planner::new(&graph, RouterConfig::default());
    let request = RoutingRequest {
        date_time: fixtures::service_day().time("07:55").unwrap(),
        ..RoutingRequest::default()
    };
    let plan = PlanRequest::new(vertex("O"), vertex("D"), request);

    let result = planner.plan(&plan).unwrap();
    assert_eq!(result.paths.len(), 3);
    assert_eq!(trip_names(&result.paths[0]), vec!["T1"]);
    assert_eq!(trip_names(&result.paths[1]), vec!["T2"]);
    // With both trips banned only the long walk is left.
    assert!(result.paths[2].trips().is_empty());
    assert!(result.paths[0].end_time() < result.paths[1].end_time());
}

#[test]
fn transit_search_rides_the_interline() {
    let graph = fixtures::interline(true);
    let config = RouterConfig {
        raptor: RaptorConfig {
            transfer_slack_s: 60,
            ..RaptorConfig::default()
        },
        ..RouterConfig::default()
    };
    let planner = Planner::new(&graph, config);
    let request = RoutingRequest {
        date_time: fixtures::service_day().to_epoch(0),
        ..RoutingRequest::default().with_algorithm(SearchAlgorithm::Raptor)
    };
    let plan = PlanRequest::new(vertex("a"), vertex("b"), request);

    let result = planner.plan(&plan).unwrap();
    assert!(result.paths.is_empty());
    let trips: Vec<&str> = result.transit_paths[0]
        .trips()
        .into_iter()
        .map(FeedScopedId::id)
        .collect();
    assert_eq!(trips, vec!["T1", "T2"]);
    assert_eq!(result.transit_paths[0].transfer_waits(), vec![0]);
}

#[test]
fn contraction_uses_the_hierarchy() {
    let graph = fixtures::line(5);
    let profile = WeightProfile::for_request(&unit_walk()).unwrap();
    let ch = ContractionHierarchy::build(&graph, profile, &ContractionConfig::default());
    let planner = Planner::new(&graph, RouterConfig::default()).with_hierarchy(&ch);
    let request = unit_walk().with_algorithm(SearchAlgorithm::Contraction);
    let plan = PlanRequest::new(vertex("V0"), vertex("V4"), request);

    let result = planner.plan(&plan).unwrap();
    assert_eq!(result.paths.len(), 1);
    assert_eq!(result.paths[0].weight(), 400.0);
    assert_eq!(result.paths[0].end_time(), 400);
}

#[test]
fn multi_objective_with_one_itinerary() {
    let graph = fixtures::triangle();
    let planner = Planner::new(&graph, RouterConfig::default());
    let request = RoutingRequest {
        num_itineraries: 1,
        ..unit_walk().with_algorithm(SearchAlgorithm::MultiObjective)
    };
    let plan = PlanRequest::new(vertex("A"), vertex("B"), request);

    let started = Instant::now();
    let result = planner.plan(&plan).unwrap();
    assert_eq!(result.paths.len(), 1);
    assert!(started.elapsed() < planner.config().multi_objective.timeout());
}

#[test]
fn timeout_with_a_path_is_a_result() {
    let graph = fixtures::spur(300);
    let mut config = RouterConfig::default();
    config.multi_objective.path_timeouts_ms = vec![60_000, 0];
    let planner = Planner::new(&graph, config);
    let request = RoutingRequest {
        num_itineraries: 5,
        ..unit_walk().with_algorithm(SearchAlgorithm::MultiObjective)
    };
    let plan = PlanRequest::new(vertex("O"), vertex("T"), request);

    let result = planner.plan(&plan).unwrap();
    assert!(result.timed_out);
    assert_eq!(result.paths.len(), 1);
    assert_eq!(labels(&graph, &result.paths[0]), vec!["O", "T"]);
}

#[test]
fn intermediate_places_join_legs() {
    let graph = fixtures::line(4);
    let planner = Planner::new(&graph, RouterConfig::default());
    let plan = PlanRequest::new(vertex("V0"), vertex("V1"), unit_walk()).via(vertex("V3"));

    let result = planner.plan(&plan).unwrap();
    let path = &result.paths[0];
    assert_eq!(
        labels(&graph, path),
        vec!["V0", "V1", "V2", "V3", "V3", "V2", "V1"]
    );
    assert_eq!(path.weight(), 500.0);
    assert_eq!(path.end_time(), 500);
}

#[test]
fn intermediate_places_arrive_by() {
    let graph = fixtures::line(4);
    let planner = Planner::new(&graph, RouterConfig::default());
    let request = RoutingRequest {
        date_time: 1_000,
        ..unit_walk().with_arrive_by(true)
    };
    let plan = PlanRequest::new(vertex("V0"), vertex("V1"), request).via(vertex("V3"));

    let result = planner.plan(&plan).unwrap();
    let path = &result.paths[0];
    assert_eq!(path.start_time(), 500);
    assert_eq!(path.end_time(), 1_000);
    assert_eq!(labels(&graph, path).first().map(String::as_str), Some("V0"));
}

mod proptests {
    use proptest::prelude::*;

    use super::*;
    use crate::graph::{StreetSegment, VertexId};

    fn street_graph(streets: &[(usize, usize, u32)]) -> Graph {
        let mut b = fixtures::builder();
        let vertices: Vec<VertexId> = (0..6)
            .map(|i| {
                // One shared coordinate keeps the distance heuristic at zero.
                b.add_intersection(&format!("V{i}"), Coordinate::new(0.0, 0.0)).unwrap()
            })
            .collect();
        for &(from, to, length) in streets {
            if from != to {
                b.add_street(vertices[from], vertices[to], StreetSegment::new(f64::from(length)))
                    .unwrap();
            }
        }
        b.build()
    }

    proptest! {
        #[test]
        fn arrive_by_on_the_reversed_graph_mirrors_depart_by(
            streets in prop::collection::vec((0..6usize, 0..6usize, 1..100u32), 1..15),
            from in 0..6usize,
            to in 0..6usize,
        ) {
            prop_assume!(from != to);
            let graph = street_graph(&streets);
            let reversed = graph.reversed();
            let (a, b) = (format!("V{from}"), format!("V{to}"));

            let forward = Planner::new(&graph, RouterConfig::default())
                .plan(&PlanRequest::new(vertex(&a), vertex(&b), unit_walk()))
                .unwrap();
            let backward_request = RoutingRequest { date_time: 10_000, ..unit_walk().with_arrive_by(true) };
            let backward = Planner::new(&reversed, RouterConfig::default())
                .plan(&PlanRequest::new(vertex(&b), vertex(&a), backward_request))
                .unwrap();

            prop_assert_eq!(forward.paths.len(), backward.paths.len());
            if let (Some(f), Some(r)) = (forward.paths.first(), backward.paths.first()) {
                prop_assert!((f.weight() - r.weight()).abs() < 1e-9);
                let mut mirrored = labels(&reversed, r);
                mirrored.reverse();
                let original = labels(&graph, f);
                prop_assert_eq!(mirrored.first(), original.first());
                prop_assert_eq!(mirrored.last(), original.last());
                prop_assert_eq!(f.duration(), r.duration());
            }
        }
    }
}
