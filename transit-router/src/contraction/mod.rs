//! Contraction hierarchies for street-only queries.
//!
//! [`ContractionHierarchy::build`] contracts vertices one at a time, least
//! important first, adding a shortcut around each contracted vertex
//! wherever a witness search finds no path at least as cheap that avoids
//! it. Importance is the edge difference plus the number of neighbours
//! already contracted, recomputed lazily when a vertex reaches the front
//! of the queue.
//!
//! A hierarchy is only valid for the [`WeightProfile`] it was built with.
//! [`ContractionRouter`] checks that before every query and runs A* over
//! the full graph when the hierarchy does not apply.

mod hierarchy;
mod profile;
mod router;

pub use hierarchy::{ContractionHierarchy, HierarchyError, HierarchyPath, QueryFailure};
pub use profile::WeightProfile;
pub use router::ContractionRouter;
