//! Catch-up from peers that report a higher confirmed height.
//!
//! Batches are bounded by `sync_batch_size`. Every block is checked on its
//! own (producer signature, link to the current head, quorum certificate);
//! a block that fails is dropped and the rest of the batch is still tried.
//! A batch that appends nothing counts against `sync_max_retries` and the
//! serving peer is not asked again until its next status report.

use super::{AgreementEngine, EngineState};
use crate::metrics;
use shared_types::{short_hash, ConfirmedBlock, ValidatorId};
use tracing::{debug, info, warn};

impl AgreementEngine {
    /// Fetch and append blocks until no reachable peer is ahead. Returns
    /// the number of blocks appended.
    pub(super) async fn synchronize(&self, state: &mut EngineState) -> usize {
        let start = self.height.get();
        let mut appended = 0;
        let mut failures = 0;

        loop {
            let local = self.height.get();
            let Some((peer_id, peer_height)) = state.peers.best_ahead_of(local) else {
                break;
            };
            let Some(peer) = self.registry.get(&peer_id).cloned() else {
                break;
            };

            let count = (peer_height - local).min(u64::from(self.config.sync_batch_size)) as u32;
            let gained = match self
                .with_deadline(self.link.fetch_block_range(&peer, local + 1, count))
                .await
            {
                Ok(blocks) => self.apply_batch(state, &peer_id, blocks).await,
                Err(e) => {
                    debug!(peer = %short_hash(&peer_id), error = %e, "Block range request failed");
                    0
                }
            };

            if gained > 0 {
                appended += gained;
                continue;
            }
            state.peers.demote(&peer_id, local);
            failures += 1;
            if failures >= self.config.sync_max_retries {
                warn!(
                    height = local,
                    attempts = failures,
                    "Giving up sync for this tick, no peer served a verifiable block"
                );
                break;
            }
        }

        if appended > 0 {
            metrics::record_blocks_synced(appended);
            info!(
                from = start,
                to = self.height.get(),
                blocks = appended,
                "Synchronized with peers"
            );
        }
        appended
    }

    async fn apply_batch(
        &self,
        state: &mut EngineState,
        peer: &ValidatorId,
        blocks: Vec<ConfirmedBlock>,
    ) -> usize {
        let mut appended = 0;
        for confirmed in blocks {
            let height = confirmed.height();
            let (last_height, last_hash) = {
                let store = self.store.read();
                (store.last_height(), store.last_hash())
            };
            if height <= last_height {
                continue;
            }
            if height != last_height + 1 || confirmed.block.prev_hash != last_hash {
                warn!(
                    height,
                    peer = %short_hash(peer),
                    "Synced block does not extend the local chain, dropped"
                );
                metrics::record_message_dropped("unlinked_block");
                continue;
            }
            if let Err(e) = self.validator.verify_certificate(&confirmed) {
                warn!(height, peer = %short_hash(peer), error = %e, "Synced block failed verification, dropped");
                metrics::record_message_dropped(e.reason());
                continue;
            }

            let hash = confirmed.hash();
            match self.commit_block(state, confirmed).await {
                Ok(()) => {
                    debug!(height, hash = %short_hash(&hash), "Appended synced block");
                    appended += 1;
                }
                Err(e) => warn!(height, error = %e, "Failed to append synced block"),
            }
        }
        appended
    }
}
