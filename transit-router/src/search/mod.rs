//! Best-first search over the graph.
//!
//! [`astar`] keeps one state per vertex and finds the cheapest path.
//! [`multi_objective_search`] keeps every state no similar state
//! ε-dominates, and returns several materially different itineraries.

mod astar;
mod dominance;
mod multi_objective;
mod tree;

pub(crate) use astar::BestFirst;
pub use astar::{EdgeFilter, SearchLimits, astar};
pub use dominance::{DominanceRule, EpsilonDominance, SimilarityPolicy};
pub use multi_objective::{MultiObjectiveResult, multi_objective_search};
pub use tree::ShortestPathTree;
