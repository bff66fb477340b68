//! Peer probing, status gossip and the active flag.

use super::{AgreementEngine, EngineState};
use crate::domain::{ConsensusResult, ValidatorInfo};
use shared_types::{short_hash, ConsensusMessage, NodeStatus};
use std::sync::atomic::Ordering;
use tracing::{debug, info, trace};

impl AgreementEngine {
    /// Ping and exchange status with every peer concurrently, then decide
    /// whether enough of the set is reachable to take part in agreement.
    pub(super) async fn refresh_liveness(&self, state: &mut EngineState) {
        let status = self.local_status(state.arena.messages_at(state.round.height));
        let now = self.time.now_millis();
        let peers: Vec<&ValidatorInfo> = self.registry.peers().collect();

        let checks = peers
            .iter()
            .map(|peer| self.check_peer(peer, status.clone(), now));
        let results = futures::future::join_all(checks).await;

        for (peer, result) in peers.iter().zip(results) {
            match result {
                Ok(remote) => {
                    state.peers.record_reachable(peer.id, remote.last_height);
                    self.merge_gossip(state, remote.messages);
                }
                Err(e) => {
                    trace!(peer = %short_hash(&peer.id), error = %e, "Peer unreachable");
                    state.peers.record_unreachable(peer.id);
                }
            }
        }

        let reachable = state.peers.reachable_count();
        let present = reachable + usize::from(self.registry.is_validator());
        let active = self.registry.is_validator() && present >= self.registry.quorum_size();
        let was_active = self.active.swap(active, Ordering::AcqRel);
        if active != was_active {
            info!(
                active,
                reachable,
                quorum = self.registry.quorum_size(),
                "Agreement participation changed"
            );
        }
    }

    /// Ping, then exchange signed status. Either failing makes the peer
    /// unreachable for this tick.
    async fn check_peer(
        &self,
        peer: &ValidatorInfo,
        status: NodeStatus,
        now: u64,
    ) -> ConsensusResult<NodeStatus> {
        self.with_deadline(self.link.ping(peer, now)).await?;
        let remote = self
            .with_deadline(self.link.exchange_status(peer, status))
            .await?;
        self.validator.verify_status(&remote, &peer.id)?;
        Ok(remote)
    }

    /// Verify and insert messages piggybacked on a peer's status.
    fn merge_gossip(&self, state: &mut EngineState, messages: Vec<ConsensusMessage>) {
        for message in messages {
            let verified = self
                .check_window(message.seq)
                .and_then(|()| self.validator.verify_message(&message));
            match verified {
                Ok(()) => self.insert_verified(state, message),
                Err(e) => debug!(
                    phase = %message.phase,
                    signer = %short_hash(&message.signer),
                    error = %e,
                    "Dropped gossiped message"
                ),
            }
        }
    }
}
