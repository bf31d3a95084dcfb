//! Append-only storage for the states of one search.

use std::fmt;

use super::traverse_state::State;

/// Handle to a state stored in a [`StateArena`].
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StateId(pub u32);

impl StateId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Debug for StateId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Every state a search has published, addressed by [`StateId`].
///
/// Entries are never modified or removed, so back-references stay valid
/// for the arena's whole life.
#[derive(Debug, Clone, Default)]
pub struct StateArena {
    states: Vec<State>,
}

impl StateArena {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, state: State) -> StateId {
        let id = StateId(self.states.len() as u32);
        self.states.push(state);
        id
    }

    pub fn get(&self, id: StateId) -> &State {
        &self.states[id.index()]
    }

    pub fn len(&self) -> usize {
        self.states.len()
    }

    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }

    /// Walk from `id` back to the root of its search.
    pub fn chain(&self, id: StateId) -> impl Iterator<Item = (StateId, &State)> {
        std::iter::successors(Some(id), |&cur| self.get(cur).back_state())
            .map(|cur| (cur, self.get(cur)))
    }
}
