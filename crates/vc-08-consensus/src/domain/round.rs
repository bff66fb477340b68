//! Per-height round bookkeeping for the local validator.

use shared_types::Hash;

/// Progress of the height currently being decided.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoundPhase {
    /// No proposal seen for the current view.
    Idle,
    /// A valid proposal is known for the current view.
    Proposed,
    /// PREPARE quorum observed (or, single-round, local vote cast).
    Prepared,
    /// Local COMMIT sent; terminal until the height is confirmed.
    Committed,
}

/// Local state for the height `last_confirmed + 1`.
#[derive(Debug, Clone)]
pub struct RoundState {
    pub height: u64,
    pub view: u64,
    pub phase: RoundPhase,
    /// View in which this node sent its own PROPOSE.
    pub proposed_view: Option<u64>,
    /// First-round vote: PREPARE (three-phase) or the signature vote
    /// (single-round). At most one per view.
    pub voted: Option<(u64, Hash)>,
    /// Three-phase COMMIT lock. Once set, no other hash is voted for at
    /// this height.
    pub committed: Option<Hash>,
    /// Highest view this node asked to move to.
    pub requested_view: Option<u64>,
    /// Consecutive ticks without progress.
    pub stalled_ticks: u32,
    /// Candidate message count seen at the end of the previous tick.
    pub observed_votes: usize,
}

impl RoundState {
    pub fn new(height: u64) -> Self {
        Self {
            height,
            view: 0,
            phase: RoundPhase::Idle,
            proposed_view: None,
            voted: None,
            committed: None,
            requested_view: None,
            stalled_ticks: 0,
            observed_votes: 0,
        }
    }

    /// Reset for a newly confirmed head.
    pub fn advance_to(&mut self, height: u64) {
        *self = Self::new(height);
    }

    /// Move to a higher view after a VIEWCHANGE quorum.
    pub fn adopt_view(&mut self, view: u64) {
        if view <= self.view {
            return;
        }
        self.view = view;
        self.stalled_ticks = 0;
        if self.phase != RoundPhase::Committed {
            self.phase = RoundPhase::Idle;
        }
    }

    /// Whether a first-round vote may be cast in the current view.
    pub fn can_vote(&self) -> bool {
        self.voted.map_or(true, |(view, _)| view < self.view)
    }

    /// Whether voting for `hash` respects the commit lock.
    pub fn compatible_with_lock(&self, hash: &Hash) -> bool {
        self.committed.map_or(true, |locked| &locked == hash)
    }

    /// Advance the phase marker; never moves backwards within a view.
    pub fn reach(&mut self, phase: RoundPhase) {
        if rank(phase) > rank(self.phase) {
            self.phase = phase;
        }
    }
}

fn rank(phase: RoundPhase) -> u8 {
    match phase {
        RoundPhase::Idle => 0,
        RoundPhase::Proposed => 1,
        RoundPhase::Prepared => 2,
        RoundPhase::Committed => 3,
    }
}
