//! The states a search keeps, per vertex.

use std::collections::HashMap;

use fixedbitset::FixedBitSet;

use crate::graph::VertexId;
use crate::state::{State, StateArena, StateId};

use super::dominance::DominanceRule;

/// Every state a search produced, and which of them are still
/// non-dominated at their vertex.
///
/// States displaced by a better one stay in the arena (later states may
/// descend from them) but are no longer live: the search skips them when
/// they come off the queue, and [`states`](Self::states) omits them.
#[derive(Debug, Clone)]
pub struct ShortestPathTree {
    arena: StateArena,
    states: HashMap<VertexId, Vec<StateId>>,
    removed: FixedBitSet,
    rule: DominanceRule,
}

impl ShortestPathTree {
    pub fn new(rule: DominanceRule) -> Self {
        Self {
            arena: StateArena::new(),
            states: HashMap::new(),
            removed: FixedBitSet::new(),
            rule,
        }
    }

    pub fn rule(&self) -> DominanceRule {
        self.rule
    }

    /// Offer `state` to its vertex.
    ///
    /// Returns `None` if a live state there dominates it. Otherwise stores
    /// it, retires the live states it dominates, and returns its id.
    pub fn add(&mut self, state: State) -> Option<StateId> {
        let here = self.states.entry(state.vertex()).or_default();
        if here
            .iter()
            .any(|&id| self.rule.dominates(self.arena.get(id), &state))
        {
            return None;
        }

        let id = self.arena.push(state);
        self.removed.grow(self.arena.len());
        let new_state = self.arena.get(id);
        here.retain(|&old| {
            let keep = !self.rule.dominates(new_state, self.arena.get(old));
            if !keep {
                self.removed.insert(old.index());
            }
            keep
        });
        here.push(id);
        Some(id)
    }

    /// Returns true if `id` has not been dominated since it was added.
    pub fn is_live(&self, id: StateId) -> bool {
        id.index() < self.arena.len() && !self.removed.contains(id.index())
    }

    pub fn get(&self, id: StateId) -> &State {
        self.arena.get(id)
    }

    /// Live states at `v`.
    pub fn states(&self, v: VertexId) -> impl Iterator<Item = (StateId, &State)> {
        self.states
            .get(&v)
            .into_iter()
            .flatten()
            .map(|&id| (id, self.arena.get(id)))
    }

    /// The live state at `v` with the lowest weight.
    pub fn best_state(&self, v: VertexId) -> Option<(StateId, &State)> {
        self.states(v)
            .min_by(|(_, a), (_, b)| a.weight().total_cmp(&b.weight()))
    }

    /// Vertices holding at least one live state.
    pub fn reached(&self) -> impl Iterator<Item = VertexId> + '_ {
        self.states
            .iter()
            .filter(|(_, ids)| !ids.is_empty())
            .map(|(&v, _)| v)
    }

    pub fn arena(&self) -> &StateArena {
        &self.arena
    }

    /// Number of states ever stored, live or not.
    pub fn state_count(&self) -> usize {
        self.arena.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::TraverseMode;
    use crate::graph::EdgeId;
    use crate::search::{EpsilonDominance, SimilarityPolicy};
    use crate::state::StateEditor;

    fn at(v: u32, secs: i64, weight: f64) -> State {
        let root = State::initial(VertexId(0), 0, TraverseMode::Walk, false);
        let mut e = StateEditor::new(StateId(0), &root, EdgeId(0), VertexId(v));
        e.increment_time(secs);
        e.increment_weight(weight);
        e.make_state().unwrap()
    }

    #[test]
    fn single_best_state_per_vertex() {
        let mut tree = ShortestPathTree::new(DominanceRule::WeightThenTime);
        let first = tree.add(at(1, 10, 5.0)).unwrap();
        assert!(tree.add(at(1, 10, 6.0)).is_none());

        let better = tree.add(at(1, 20, 4.0)).unwrap();
        assert!(!tree.is_live(first));
        assert!(tree.is_live(better));
        assert_eq!(tree.states(VertexId(1)).count(), 1);
        assert_eq!(tree.best_state(VertexId(1)).unwrap().0, better);
        // The retired state is still readable.
        assert_eq!(tree.get(first).weight(), 5.0);
        assert_eq!(tree.state_count(), 2);
    }

    #[test]
    fn vertices_are_independent() {
        let mut tree = ShortestPathTree::new(DominanceRule::WeightThenTime);
        tree.add(at(1, 10, 5.0)).unwrap();
        tree.add(at(2, 10, 9.0)).unwrap();

        let mut reached: Vec<_> = tree.reached().collect();
        reached.sort();
        assert_eq!(reached, vec![VertexId(1), VertexId(2)]);
        assert!(tree.best_state(VertexId(3)).is_none());
    }

    #[test]
    fn epsilon_keeps_trade_offs() {
        let rule = DominanceRule::Epsilon(EpsilonDominance::new(0.05, SimilarityPolicy::Any));
        let mut tree = ShortestPathTree::new(rule);

        let fast = tree.add(at(1, 100, 200.0)).unwrap();
        let cheap = tree.add(at(1, 300, 100.0)).unwrap();
        assert_eq!(tree.states(VertexId(1)).count(), 2);

        // Better on both counts: retires both.
        let best = tree.add(at(1, 90, 90.0)).unwrap();
        assert!(!tree.is_live(fast));
        assert!(!tree.is_live(cheap));
        assert_eq!(
            tree.states(VertexId(1)).map(|(id, _)| id).collect::<Vec<_>>(),
            vec![best]
        );
    }
}
