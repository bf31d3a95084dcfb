//! Travel modes and compact mode sets.

use std::fmt;

use serde::{Deserialize, Serialize};

/// A way of moving through the network.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TraverseMode {
    Walk,
    Bicycle,
    Car,
    Transit,
}

impl TraverseMode {
    /// All modes, in bit order.
    pub const ALL: [TraverseMode; 4] = [
        TraverseMode::Walk,
        TraverseMode::Bicycle,
        TraverseMode::Car,
        TraverseMode::Transit,
    ];

    /// Returns true for modes that move along streets.
    pub fn is_street(self) -> bool {
        !matches!(self, TraverseMode::Transit)
    }

    fn bit(self) -> u8 {
        match self {
            TraverseMode::Walk => 1,
            TraverseMode::Bicycle => 1 << 1,
            TraverseMode::Car => 1 << 2,
            TraverseMode::Transit => 1 << 3,
        }
    }
}

impl fmt::Display for TraverseMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TraverseMode::Walk => "walk",
            TraverseMode::Bicycle => "bicycle",
            TraverseMode::Car => "car",
            TraverseMode::Transit => "transit",
        };
        f.write_str(name)
    }
}

/// A set of [`TraverseMode`]s packed into one byte.
///
/// Used both for the modes a request allows and for the modes a street
/// segment permits.
///
/// # Examples
///
/// ```
/// use transit_router::domain::{TraverseMode, TraverseModeSet};
///
/// let modes = TraverseModeSet::of(&[TraverseMode::Walk, TraverseMode::Transit]);
/// assert!(modes.contains(TraverseMode::Walk));
/// assert!(!modes.contains(TraverseMode::Car));
/// assert!(modes.has_transit());
/// assert_eq!(modes.street_modes().count(), 1);
/// ```
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(from = "Vec<TraverseMode>", into = "Vec<TraverseMode>")]
pub struct TraverseModeSet(u8);

impl TraverseModeSet {
    /// The empty set.
    pub const EMPTY: TraverseModeSet = TraverseModeSet(0);

    /// Every street mode (walk, bicycle, car).
    pub const ALL_STREET: TraverseModeSet = TraverseModeSet(0b0111);

    /// Build a set from a list of modes.
    pub fn of(modes: &[TraverseMode]) -> Self {
        modes.iter().fold(Self::EMPTY, |set, &m| set.with(m))
    }

    /// A set holding one mode.
    pub fn single(mode: TraverseMode) -> Self {
        Self(mode.bit())
    }

    /// Returns a copy of this set with `mode` added.
    pub fn with(self, mode: TraverseMode) -> Self {
        Self(self.0 | mode.bit())
    }

    /// Returns a copy of this set with `mode` removed.
    pub fn without(self, mode: TraverseMode) -> Self {
        Self(self.0 & !mode.bit())
    }

    pub fn contains(self, mode: TraverseMode) -> bool {
        self.0 & mode.bit() != 0
    }

    pub fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// Returns true if the two sets share a mode.
    pub fn intersects(self, other: TraverseModeSet) -> bool {
        self.0 & other.0 != 0
    }

    pub fn has_transit(self) -> bool {
        self.contains(TraverseMode::Transit)
    }

    /// Iterate over the modes in the set.
    pub fn iter(self) -> impl Iterator<Item = TraverseMode> {
        TraverseMode::ALL.into_iter().filter(move |m| self.contains(*m))
    }

    /// Iterate over the street modes in the set.
    pub fn street_modes(self) -> impl Iterator<Item = TraverseMode> {
        self.iter().filter(|m| m.is_street())
    }
}

impl fmt::Debug for TraverseModeSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.iter()).finish()
    }
}

impl From<Vec<TraverseMode>> for TraverseModeSet {
    fn from(modes: Vec<TraverseMode>) -> Self {
        Self::of(&modes)
    }
}

impl From<TraverseModeSet> for Vec<TraverseMode> {
    fn from(set: TraverseModeSet) -> Self {
        set.iter().collect()
    }
}
