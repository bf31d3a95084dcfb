//! Turning search results into paths.
//!
//! A [`GraphPath`] is read from the back-state chain of a terminal state
//! and always runs in travel order. Legs searched separately are joined
//! with [`GraphPath::concat`].

mod graph_path;
mod rank;

pub use graph_path::GraphPath;
pub use rank::{compare_chronological, compare_duration, deduplicate, rank_paths};
