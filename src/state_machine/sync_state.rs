//! Rendezvous barrier for parallel branches.
//!
//! Every tick the machine hands the barrier its candidate transitions: the
//! enabled incoming transitions whose source state is active and allowed to
//! exit. The barrier either keeps the whole set or discards it. Nothing is
//! carried over between ticks.

use crate::state_machine::id::TransitionId;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncMode {
    /// Every enabled incoming transition must be a candidate.
    #[default]
    WaitAll,
    /// Exactly `count` candidates. More or fewer both block.
    WaitCount,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SyncState {
    mode: SyncMode,
    count: usize,
    allowed: Vec<TransitionId>,
}

impl SyncState {
    pub fn wait_all() -> Self {
        Self {
            mode: SyncMode::WaitAll,
            count: 0,
            allowed: Vec::new(),
        }
    }

    pub fn wait_count(count: usize) -> Self {
        Self {
            mode: SyncMode::WaitCount,
            count,
            allowed: Vec::new(),
        }
    }

    pub fn mode(&self) -> SyncMode {
        self.mode
    }

    pub fn count(&self) -> usize {
        self.count
    }

    /// Recompute the allowed set for this tick.
    ///
    /// `total_incoming` counts enabled incoming transitions only. Returns
    /// whether the barrier opened.
    pub fn update_allowed(&mut self, candidates: Vec<TransitionId>, total_incoming: usize) -> bool {
        let open = match self.mode {
            SyncMode::WaitAll => candidates.len() == total_incoming,
            SyncMode::WaitCount => candidates.len() == self.count,
        };
        self.allowed = if open { candidates } else { Vec::new() };
        open
    }

    pub fn can_enter(&self, transition: TransitionId) -> bool {
        self.allowed.contains(&transition)
    }

    pub fn allowed(&self) -> &[TransitionId] {
        &self.allowed
    }

    pub fn reset(&mut self) {
        self.allowed.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids(n: u32) -> Vec<TransitionId> {
        (0..n).map(TransitionId).collect()
    }

    #[test]
    fn test_wait_all_needs_every_branch() {
        let mut sync = SyncState::wait_all();
        assert!(sync.update_allowed(ids(3), 3));
        assert!(sync.can_enter(TransitionId(2)));

        assert!(!sync.update_allowed(ids(2), 3));
        assert!(sync.allowed().is_empty());
        assert!(!sync.can_enter(TransitionId(0)));
    }

    #[test]
    fn test_wait_count_is_exact() {
        let mut sync = SyncState::wait_count(2);
        assert!(!sync.update_allowed(ids(1), 4));
        assert!(sync.update_allowed(ids(2), 4));
        assert!(!sync.update_allowed(ids(3), 4));
        assert!(sync.allowed().is_empty());
    }

    #[test]
    fn test_wait_all_without_incoming_opens_trivially() {
        let mut sync = SyncState::wait_all();
        assert!(sync.update_allowed(Vec::new(), 0));
        assert!(!sync.can_enter(TransitionId(0)));
    }

    #[test]
    fn test_reset_forgets_allowed_set() {
        let mut sync = SyncState::wait_count(1);
        sync.update_allowed(ids(1), 2);
        sync.reset();
        assert!(!sync.can_enter(TransitionId(0)));
    }
}
