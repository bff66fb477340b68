use crate::ports::BlockObserver;
use parking_lot::Mutex;
use shared_types::{short_hash, ConfirmedBlock};
use tracing::info;

/// Logs every confirmed block.
#[derive(Debug, Default, Clone, Copy)]
pub struct LoggingObserver;

impl BlockObserver for LoggingObserver {
    fn on_confirmed_block(&self, block: &ConfirmedBlock) {
        info!(
            height = block.height(),
            hash = %short_hash(&block.hash()),
            txs = block.block.transactions.len(),
            "Confirmed block"
        );
    }
}

/// Keeps every confirmed block in memory, in notification order.
#[derive(Debug, Default)]
pub struct RecordingObserver {
    blocks: Mutex<Vec<ConfirmedBlock>>,
}

impl RecordingObserver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn blocks(&self) -> Vec<ConfirmedBlock> {
        self.blocks.lock().clone()
    }

    pub fn heights(&self) -> Vec<u64> {
        self.blocks.lock().iter().map(ConfirmedBlock::height).collect()
    }
}

impl BlockObserver for RecordingObserver {
    fn on_confirmed_block(&self, block: &ConfirmedBlock) {
        self.blocks.lock().push(block.clone());
    }
}
