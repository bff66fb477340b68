//! Voting and finalization.
//!
//! Vote rules, per height:
//! - the first-round vote (PREPARE, or COMMIT in single-round mode) is cast
//!   at most once per view, for the smallest-hash proposal made in the
//!   current view that extends the head;
//! - a three-phase COMMIT is sent once some candidate holds a PREPARE
//!   quorum, and locks the validator to that hash for the rest of the
//!   height;
//! - a candidate finalizes once its certificate is complete, smallest
//!   hash first.

use super::{AgreementEngine, EngineState, Outbound};
use crate::domain::RoundPhase;
use shared_types::{short_hash, Hash, Phase};
use std::sync::atomic::Ordering;
use tracing::{debug, info, warn};

impl AgreementEngine {
    /// Vote and finalize until the current height is undecided. Returns
    /// the heights finalized.
    pub(super) async fn advance_rounds(&self, state: &mut EngineState) -> Vec<u64> {
        let mut finalized = Vec::new();
        loop {
            if self.active.load(Ordering::Acquire) {
                self.cast_votes(state);
            }
            match self.try_finalize(state).await {
                Some(height) => finalized.push(height),
                None => break,
            }
        }
        finalized
    }

    fn cast_votes(&self, state: &mut EngineState) {
        let (height, view) = (state.round.height, state.round.view);
        let parent = self.store.read().last_hash();
        let quorum = self.registry.quorum_size();
        let three_phase = self.registry.mode().uses_prepare();

        if state.round.can_vote() {
            if let Some(hash) = self.vote_target(state, &parent) {
                let phase = if three_phase {
                    Phase::Prepare
                } else {
                    Phase::Commit
                };
                let message = self.sign_message(phase, view, height, hash, None);
                self.emit(state, message);
                state.round.voted = Some((view, hash));
                if three_phase {
                    state.round.reach(RoundPhase::Proposed);
                } else {
                    state.round.committed = Some(hash);
                    state.round.reach(RoundPhase::Committed);
                }
                debug!(%phase, height, view, hash = %short_hash(&hash), "Voted");
            }
        }

        if three_phase && state.round.committed.is_none() {
            let prepared = state
                .arena
                .candidates_at(height)
                .find(|(_, candidate)| {
                    candidate
                        .block
                        .as_ref()
                        .is_some_and(|block| block.prev_hash == parent)
                        && candidate.has_quorum(Phase::Prepare, quorum)
                })
                .map(|(hash, _)| *hash);

            if let Some(hash) = prepared {
                state.round.reach(RoundPhase::Prepared);
                let message = self.sign_message(Phase::Commit, view, height, hash, None);
                self.emit(state, message);
                state.round.committed = Some(hash);
                state.round.reach(RoundPhase::Committed);
                debug!(height, view, hash = %short_hash(&hash), "Committed");
            }
        }
    }

    /// Smallest-hash proposal from the current view that extends `parent`
    /// and does not conflict with our commit lock.
    fn vote_target(&self, state: &EngineState, parent: &Hash) -> Option<Hash> {
        let view = state.round.view;
        state
            .arena
            .candidates_at(state.round.height)
            .find(|(hash, candidate)| {
                candidate.proposal_view() == Some(view)
                    && candidate
                        .block
                        .as_ref()
                        .is_some_and(|block| &block.prev_hash == parent)
                    && state.round.compatible_with_lock(hash)
            })
            .map(|(hash, _)| *hash)
    }

    /// Finalize the current height if a candidate's certificate is complete.
    async fn try_finalize(&self, state: &mut EngineState) -> Option<u64> {
        let height = state.round.height;
        let parent = self.store.read().last_hash();
        let hash = state.arena.decided(
            height,
            &parent,
            self.registry.quorum_size(),
            self.registry.mode().uses_prepare(),
        )?;
        let confirmed = state.arena.candidate(height, &hash)?.to_confirmed()?;
        let view = state.round.view;
        let txs = confirmed.block.transactions.len();

        if let Err(e) = self.commit_block(state, confirmed.clone()).await {
            warn!(height, error = %e, "Failed to persist finalized block");
            return None;
        }
        state.outbox.push(Outbound::Block(confirmed));
        info!(height, view, hash = %short_hash(&hash), txs, "Finalized block");
        Some(height)
    }
}
