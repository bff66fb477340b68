//! Admission of peer input and the tick-side drain of the inbox.

use super::{AgreementEngine, EngineState, Inbound};
use crate::domain::{ConsensusError, ConsensusResult, InboxRejection, Insertion};
use shared_types::{short_hash, ConfirmedBlock, ConsensusMessage, Hash, NodeStatus, ValidatorId};
use tracing::{debug, info, trace, warn};

impl AgreementEngine {
    /// Reject messages at or below the confirmed height, or too far above it.
    pub(super) fn check_window(&self, seq: u64) -> ConsensusResult<()> {
        let last = self.height.get();
        if seq <= last {
            return Err(ConsensusError::StaleMessage { seq, last });
        }
        let horizon = last + 1 + self.config.future_height_window;
        if seq > horizon {
            return Err(ConsensusError::FutureMessage { seq, horizon });
        }
        Ok(())
    }

    /// Reject views more than two rotations past our own. A stalled
    /// validator escalates at most that far before the others follow.
    pub(super) fn check_view(&self, view: u64) -> ConsensusResult<()> {
        let horizon = self.current_view() + self.view_horizon();
        if view > horizon {
            return Err(ConsensusError::FutureView { view, horizon });
        }
        Ok(())
    }

    pub(super) fn view_horizon(&self) -> u64 {
        2 * self.registry.len() as u64
    }

    fn enqueue(&self, sender: ValidatorId, key: Hash, item: Inbound) -> ConsensusResult<()> {
        match self.inbox.lock().push(sender, key, item) {
            Ok(true) => Ok(()),
            Ok(false) => {
                trace!(sender = %short_hash(&sender), "Already queued");
                Ok(())
            }
            Err(InboxRejection::Full { capacity }) => Err(ConsensusError::InboxFull { capacity }),
            Err(InboxRejection::QuotaExceeded { quota }) => {
                Err(ConsensusError::SignerQuotaExceeded {
                    signer: short_hash(&sender),
                    quota,
                })
            }
        }
    }

    /// Stateless checks, then queue for the next tick.
    pub(super) fn admit_message(&self, message: ConsensusMessage) -> ConsensusResult<()> {
        self.check_window(message.seq)?;
        self.check_view(message.view)?;
        self.validator.verify_message(&message)?;
        trace!(
            phase = %message.phase,
            seq = message.seq,
            view = message.view,
            signer = %short_hash(&message.signer),
            "Queued consensus message"
        );
        self.enqueue(message.signer, message.digest(), Inbound::Message(message))
    }

    /// Queue a peer's freshly confirmed block when it is the next height.
    ///
    /// Blocks we already hold are accepted silently; blocks further ahead
    /// are left to sync.
    pub(super) fn admit_block(&self, block: ConfirmedBlock) -> ConsensusResult<()> {
        let last = self.height.get();
        let height = block.height();
        if height <= last {
            return Ok(());
        }
        if height > last + 1 {
            trace!(height, last, "Confirmed block ahead of local head, leaving to sync");
            return Ok(());
        }
        self.validator.verify_certificate(&block)?;
        self.enqueue(block.block.proposer, block.hash(), Inbound::Block(block))
    }

    /// Verify a peer's status and queue the messages it piggybacks.
    ///
    /// Non-members (followers) are answered but contribute nothing.
    pub(super) fn accept_status(&self, status: NodeStatus) -> ConsensusResult<()> {
        if !self.registry.is_member(&status.signer) {
            return Ok(());
        }
        self.validator.verify_status(&status, &status.signer)?;
        for message in status.messages {
            if let Err(e) = self.admit_message(message) {
                trace!(error = %e, "Skipped gossiped message");
            }
        }
        Ok(())
    }

    /// Insert a message into the arena during a tick. The message must
    /// already be verified.
    pub(super) fn insert_verified(&self, state: &mut EngineState, message: ConsensusMessage) {
        // The head may have moved since the message was admitted.
        if message.seq <= self.height.get() {
            return;
        }
        let (phase, seq, view, signer) = (message.phase, message.seq, message.view, message.signer);
        match state.arena.insert(message) {
            Insertion::Accepted => {
                debug!(%phase, seq, view, signer = %short_hash(&signer), "Accepted consensus message");
            }
            Insertion::Duplicate => {}
            Insertion::Equivocation => {
                warn!(%phase, seq, view, signer = %short_hash(&signer), "Conflicting statement ignored");
            }
        }
    }

    /// Move queued input into engine state. Returns the number of blocks
    /// appended from confirmed-block broadcasts.
    pub(super) async fn drain_inbox(&self, state: &mut EngineState) -> usize {
        let queued = self.inbox.lock().drain();
        let mut appended = 0;

        for item in queued {
            match item {
                Inbound::Message(message) => self.insert_verified(state, message),
                Inbound::Block(block) => {
                    if self.apply_broadcast_block(state, block).await {
                        appended += 1;
                    }
                }
            }
        }
        appended
    }

    async fn apply_broadcast_block(&self, state: &mut EngineState, block: ConfirmedBlock) -> bool {
        let (last_height, last_hash) = {
            let store = self.store.read();
            (store.last_height(), store.last_hash())
        };
        let height = block.height();
        if height != last_height + 1 || block.block.prev_hash != last_hash {
            trace!(height, "Confirmed block no longer extends the head");
            return false;
        }

        let hash = block.hash();
        match self.commit_block(state, block).await {
            Ok(()) => {
                info!(height, hash = %short_hash(&hash), "Appended block confirmed by peer");
                true
            }
            Err(e) => {
                warn!(height, error = %e, "Failed to append confirmed block");
                false
            }
        }
    }
}
