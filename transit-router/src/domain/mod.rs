//! Domain types shared by every part of the router.
//!
//! These are small value types that enforce their invariants at
//! construction time: feed-scoped identifiers, travel modes, coordinates
//! and service-day time arithmetic.

mod coordinate;
mod ids;
mod mode;
mod time;

pub use coordinate::Coordinate;
pub use ids::{FeedScopedId, IdFactory, InvalidFeedScopedId};
pub use mode::{TraverseMode, TraverseModeSet};
pub use time::{ServiceDay, TimeError, epoch_seconds, format_service_time, parse_service_time};
