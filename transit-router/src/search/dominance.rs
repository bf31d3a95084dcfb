//! When one state makes another at the same vertex redundant.

use serde::{Deserialize, Serialize};

use crate::state::State;

/// Which states are compared with each other at all under ε-dominance.
///
/// States that are not similar never prune each other, which keeps
/// genuinely different strategies (other routes, other vehicles) alive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SimilarityPolicy {
    /// Same routes ridden in the same order.
    #[default]
    SameRouteSequence,
    /// Same route ridden most recently.
    SameLastRoute,
    /// Every pair of states is comparable: plain ε-Pareto.
    Any,
}

impl SimilarityPolicy {
    pub fn similar(self, a: &State, b: &State) -> bool {
        match self {
            SimilarityPolicy::SameRouteSequence => {
                a.route_sequence().same_routes(b.route_sequence())
            }
            SimilarityPolicy::SameLastRoute => {
                a.route_sequence().same_last_route(b.route_sequence())
            }
            SimilarityPolicy::Any => true,
        }
    }
}

/// Relaxed Pareto comparison over weight, elapsed time, walk distance and
/// boardings.
///
/// `a` dominates `b` when they are similar and `a` is no more than a
/// factor of `1 + epsilon` worse than `b` on weight, elapsed time and
/// walk distance, and has no more boardings. The relation is not
/// antisymmetric: two close states may dominate each other, and whichever
/// was kept first wins.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EpsilonDominance {
    pub epsilon: f64,
    pub similarity: SimilarityPolicy,
}

impl EpsilonDominance {
    pub fn new(epsilon: f64, similarity: SimilarityPolicy) -> Self {
        Self {
            epsilon,
            similarity,
        }
    }

    pub fn dominates(&self, a: &State, b: &State) -> bool {
        if !self.similarity.similar(a, b) {
            return false;
        }
        let slack = 1.0 + self.epsilon;
        a.weight() <= b.weight() * slack
            && a.elapsed_seconds() as f64 <= b.elapsed_seconds() as f64 * slack
            && a.walk_distance() <= b.walk_distance() * slack
            && a.num_boardings() <= b.num_boardings()
    }
}

/// The rule a [`ShortestPathTree`](super::ShortestPathTree) applies at
/// each vertex.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DominanceRule {
    /// Lower weight wins, ties go to the shorter elapsed time. Leaves one
    /// state per vertex.
    WeightThenTime,
    /// Keeps every state no similar state ε-dominates.
    Epsilon(EpsilonDominance),
}

impl DominanceRule {
    /// Returns true if `a` makes `b` redundant.
    pub fn dominates(&self, a: &State, b: &State) -> bool {
        match self {
            DominanceRule::WeightThenTime => {
                a.weight() < b.weight()
                    || (a.weight() == b.weight() && a.elapsed_seconds() <= b.elapsed_seconds())
            }
            DominanceRule::Epsilon(rule) => rule.dominates(a, b),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{FeedScopedId, TraverseMode};
    use crate::graph::{EdgeId, PatternId, TripRef, VertexId};
    use crate::state::{StateEditor, StateId};

    /// A state `secs` after the root with the given totals, optionally
    /// having boarded `route`.
    fn state(secs: i64, weight: f64, walk: f64, route: Option<&str>) -> State {
        let root = State::initial(VertexId(0), 0, TraverseMode::Walk, false);
        let mut e = StateEditor::new(StateId(0), &root, EdgeId(0), VertexId(1));
        e.increment_time(secs);
        e.increment_weight(weight);
        e.increment_walk_distance(walk);
        if let Some(route) = route {
            let trip = TripRef {
                pattern: PatternId(0),
                trip_index: 0,
            };
            e.board_trip(trip, &FeedScopedId::new("t", route));
            e.alight();
        }
        e.make_state().unwrap()
    }

    #[test]
    fn weight_then_time() {
        let rule = DominanceRule::WeightThenTime;
        let cheap = state(100, 10.0, 0.0, None);
        let dear = state(50, 11.0, 0.0, None);
        let cheap_slow = state(120, 10.0, 0.0, None);

        assert!(rule.dominates(&cheap, &dear));
        assert!(!rule.dominates(&dear, &cheap));
        assert!(rule.dominates(&cheap, &cheap_slow));
        assert!(!rule.dominates(&cheap_slow, &cheap));
        // Identical states dominate each other, so duplicates are dropped.
        assert!(rule.dominates(&cheap, &cheap.clone()));
    }

    #[test]
    fn epsilon_tolerates_small_losses() {
        let rule = EpsilonDominance::new(0.05, SimilarityPolicy::Any);
        let a = state(100, 100.0, 100.0, None);
        let b = state(98, 97.0, 96.0, None);

        // a is within 5% of b everywhere, and vice versa.
        assert!(rule.dominates(&a, &b));
        assert!(rule.dominates(&b, &a));

        let much_faster = state(50, 104.0, 100.0, None);
        assert!(!rule.dominates(&a, &much_faster));
    }

    #[test]
    fn boardings_are_compared_exactly() {
        let rule = EpsilonDominance::new(0.05, SimilarityPolicy::Any);
        let walked = state(100, 100.0, 0.0, None);
        let rode = state(100, 100.0, 0.0, Some("R"));

        assert!(rule.dominates(&walked, &rode));
        assert!(!rule.dominates(&rode, &walked));
    }

    #[test]
    fn dissimilar_routes_never_dominate() {
        let same = EpsilonDominance::new(0.05, SimilarityPolicy::SameRouteSequence);
        let last = EpsilonDominance::new(0.05, SimilarityPolicy::SameLastRoute);
        let r1 = state(100, 100.0, 0.0, Some("R1"));
        let r2 = state(200, 200.0, 0.0, Some("R2"));
        let r1_again = state(200, 200.0, 0.0, Some("R1"));

        assert!(!same.dominates(&r1, &r2));
        assert!(!last.dominates(&r1, &r2));
        assert!(same.dominates(&r1, &r1_again));
        assert!(last.dominates(&r1, &r1_again));
        assert!(EpsilonDominance::new(0.05, SimilarityPolicy::Any).dominates(&r1, &r2));
    }
}
