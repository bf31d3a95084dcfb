//! Round-based transit search.
//!
//! Round `k` finds the best arrival at every stop using at most `k`
//! boardings: each round scans the patterns serving stops improved in the
//! round before, then relaxes walking transfers from the stops reached by
//! riding. Searches run forward from a departure time or backward from an
//! arrival time; [`SearchDirection`] hides the difference from the rest of
//! the engine.
//!
//! Trip-to-trip constraints (stay-seated, guaranteed and forbidden
//! transfers) are honoured when boarding. A time and boarding lower bound
//! per stop ([`RaptorHeuristic`]) prunes arrivals that cannot beat the best
//! destination found so far.

mod access;
mod constrained;
mod cost;
mod heuristic;
mod path;
mod router;
mod schedule;
mod slack;
mod trip_search;
mod worker;

pub use access::{RaptorAccess, street_legs};
pub use constrained::{ConstrainedBoarding, ConstrainedBoardingSearch, ConstrainedTransfers, IncomingTrip};
pub use cost::{CostCalculator, DefaultCostCalculator};
pub use heuristic::RaptorHeuristic;
pub use path::{RaptorLeg, RaptorPath};
pub use router::raptor_search;
pub use schedule::{RaptorTransfer, RaptorTransitData};
pub use slack::{DefaultSlackProvider, SlackProvider};
pub use trip_search::{BoardOrAlightEvent, SearchDirection, TripScheduleSearch};
pub use worker::{RaptorParams, RaptorResult, RaptorWorker};
