//! Multimodal trip planning.
//!
//! A routing graph of streets, stops and timetabled trips, and the search
//! engines that plan trips over it: A* with pluggable heuristics, a
//! multi-objective search that keeps several non-dominated options,
//! round-based RAPTOR over the timetable, and contraction hierarchies for
//! fast street-only queries. The [`planner`] module ties them together.

pub mod config;
pub mod contraction;
pub mod domain;
pub mod graph;
pub mod heuristic;
pub mod path;
pub mod planner;
pub mod raptor;
pub mod search;
pub mod state;
