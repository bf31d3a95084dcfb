//! Traversal state and the options that drive a search.
//!
//! A search grows a tree of immutable [`State`]s stored in a
//! [`StateArena`]; each state points back at its parent by [`StateId`].
//! Edges derive successors through a [`StateEditor`]. A
//! [`RoutingContext`] binds a [`RoutingRequest`] to one graph and to the
//! search's endpoints.

mod arena;
mod context;
mod editor;
mod request;
mod traverse_state;

pub use arena::{StateArena, StateId};
pub use context::{LocatedPoint, RoutingContext};
pub use editor::StateEditor;
pub use request::{RoutingRequest, SearchAlgorithm};
pub use traverse_state::{RouteSequence, State};
