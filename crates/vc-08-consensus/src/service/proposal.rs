use super::{AgreementEngine, EngineState};
use crate::domain::RoundPhase;
use shared_types::{short_hash, Block, Phase, Transaction};
use std::collections::HashSet;
use std::sync::atomic::Ordering;
use tracing::info;

impl AgreementEngine {
    /// Body for the next block: pending pool transactions in pool order,
    /// duplicates removed, at most `max_txs_per_block`.
    pub async fn submit_candidate_transaction_set(&self) -> Vec<Transaction> {
        let max = self.config.max_txs_per_block;
        let pending = self.pool.pending_transactions(max).await;
        let mut seen = HashSet::with_capacity(pending.len());
        pending
            .into_iter()
            .filter(|tx| seen.insert(tx.id()))
            .take(max)
            .collect()
    }

    /// Propose a block if we are the scheduled proposer for the current
    /// view and have not proposed in it yet.
    pub(super) async fn propose(&self, state: &mut EngineState) -> bool {
        if !self.active.load(Ordering::Acquire) {
            return false;
        }
        let (height, view) = (state.round.height, state.round.view);
        if self.registry.proposer_for(height, view) != self.registry.self_id()
            || state.round.proposed_view == Some(view)
        {
            return false;
        }

        let (parent_hash, parent_timestamp) = {
            let store = self.store.read();
            (store.last_hash(), store.last_confirmed().block.timestamp)
        };
        let transactions = self.submit_candidate_transaction_set().await;
        let timestamp = self.time.now_millis().max(parent_timestamp + 1);

        let block = Block::new(height, parent_hash, timestamp, self.self_id(), transactions);
        let hash = block.hash();
        let block = block.with_signature(self.signer.sign(&hash));
        let txs = block.transactions.len();

        let message = self.sign_message(Phase::Propose, view, height, hash, Some(block));
        self.emit(state, message);
        state.round.proposed_view = Some(view);
        state.round.reach(RoundPhase::Proposed);

        info!(height, view, hash = %short_hash(&hash), txs, "Proposed block");
        true
    }
}
