//! Trip planning over a routing graph.
//!
//! A [`Planner`] turns a [`PlanRequest`] naming places into itineraries:
//! it resolves the places to graph locations, runs the engine the request
//! asks for (A*, multi-objective search, RAPTOR, or a contraction
//! hierarchy), and ranks what comes back. Requests naming intermediate
//! places are planned one leg at a time and joined.

mod place;
mod plan;
#[cfg(test)]
mod plan_tests;

pub use place::{NearestVertexLocator, Place, PlaceRole, VertexLocator, resolve};
pub use plan::{PlanError, PlanRequest, PlanResult, Planner};
