//! Proposer rotation when a height stops making progress.
//!
//! VIEWCHANGE requests name a target view and are anchored on the last
//! confirmed hash, so requests for a different chain head never count.
//! The engine moves to the highest view holding a quorum of requests, and
//! joins a request as soon as enough validators ask for it that at least
//! one of them must be honest.

use super::{AgreementEngine, EngineState};
use crate::metrics;
use shared_types::{short_hash, Hash, Phase};
use std::sync::atomic::Ordering;
use tracing::{debug, warn};

impl AgreementEngine {
    /// Adopt, join or start a view change. Returns whether a VIEWCHANGE was
    /// sent this tick.
    pub(super) fn check_view_change(&self, state: &mut EngineState, progressed: bool) -> bool {
        let height = state.round.height;
        let anchor = self.store.read().last_hash();
        let quorum = self.registry.quorum_size();

        if let Some(view) = state.arena.highest_view_with(height, &anchor, quorum) {
            if view > state.round.view {
                warn!(height, from = state.round.view, to = view, "View changed");
                state.round.adopt_view(view);
                metrics::record_view_change();
            }
        }

        if !self.active.load(Ordering::Acquire) {
            return false;
        }

        let join_threshold = self.registry.len() - quorum + 1;
        if let Some(view) = state.arena.highest_view_with(height, &anchor, join_threshold) {
            let already_requested = state.round.requested_view.is_some_and(|r| r >= view);
            if view > state.round.view && !already_requested {
                self.request_view(state, view, &anchor);
                return true;
            }
        }

        let votes = state.arena.vote_count(height);
        if progressed || votes > state.round.observed_votes {
            state.round.observed_votes = votes;
            state.round.stalled_ticks = 0;
            return false;
        }
        state.round.stalled_ticks += 1;
        if state.round.stalled_ticks < self.config.view_change_after_ticks {
            return false;
        }

        // Escalate past any view we already asked for, skipping proposers
        // we cannot reach. Requests stay within the view horizon peers
        // accept; once there we keep repeating the furthest one.
        let ceiling = state.round.view + self.view_horizon() / 2;
        let base = state
            .round
            .requested_view
            .map_or(state.round.view, |r| r.max(state.round.view))
            .min(ceiling);
        let self_id = self.self_id();
        let target = self.registry.next_view_where(height, base, |id| {
            *id == self_id || state.peers.is_reachable(id)
        });
        match target {
            Some(view) => {
                self.request_view(state, view, &anchor);
                true
            }
            None => {
                debug!(height, "No reachable proposer for a view change");
                false
            }
        }
    }

    fn request_view(&self, state: &mut EngineState, view: u64, anchor: &Hash) {
        let height = state.round.height;
        let message = self.sign_message(Phase::ViewChange, view, height, *anchor, None);
        self.emit(state, message);
        state.round.requested_view = Some(view);
        state.round.stalled_ticks = 0;
        warn!(
            height,
            view = state.round.view,
            target = view,
            proposer = %short_hash(self.registry.proposer_for(height, view)),
            "Requested view change"
        );
    }
}
