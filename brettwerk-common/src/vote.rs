use crate::model::{Id, user::UserMarker};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Hash)]
pub enum VoteDirection {
    Up,
    Down,
}

impl VoteDirection {
    #[must_use]
    pub fn opposite(self) -> Self {
        match self {
            VoteDirection::Up => VoteDirection::Down,
            VoteDirection::Down => VoteDirection::Up,
        }
    }
}

/// The voters of a single post or comment. A user is in at most one of
/// the two sets at any time; [`VoteSets::toggle`] is the only mutation
/// and maintains that invariant.
#[derive(Clone, Eq, PartialEq, Debug, Default, Deserialize, Serialize)]
pub struct VoteSets {
    pub up: HashSet<Id<UserMarker>>,
    pub down: HashSet<Id<UserMarker>>,
}

impl VoteSets {
    /// Casts or retracts a vote. Voting in the direction already cast
    /// retracts it; voting in the other direction moves the vote over in
    /// one step. Returns the vote in effect afterwards.
    pub fn toggle(
        &mut self,
        voter: Id<UserMarker>,
        direction: VoteDirection,
    ) -> Option<VoteDirection> {
        if self.set_mut(direction).remove(&voter) {
            return None;
        }

        self.set_mut(direction.opposite()).remove(&voter);
        self.set_mut(direction).insert(voter);
        Some(direction)
    }

    #[must_use]
    pub fn cast_by(&self, voter: Id<UserMarker>) -> Option<VoteDirection> {
        if self.up.contains(&voter) {
            Some(VoteDirection::Up)
        } else if self.down.contains(&voter) {
            Some(VoteDirection::Down)
        } else {
            None
        }
    }

    fn set_mut(&mut self, direction: VoteDirection) -> &mut HashSet<Id<UserMarker>> {
        match direction {
            VoteDirection::Up => &mut self.up,
            VoteDirection::Down => &mut self.down,
        }
    }
}
