use super::mode::AgreementMode;
use std::time::Duration;

/// Agreement engine configuration.
#[derive(Debug, Clone)]
pub struct ConsensusConfig {
    /// Agreement variant.
    pub mode: AgreementMode,
    /// Scheduler cadence.
    pub tick_interval: Duration,
    /// Deadline applied to every outbound peer call.
    pub rpc_timeout: Duration,
    /// Ticks without progress at a height before requesting a view change.
    pub view_change_after_ticks: u32,
    /// Maximum blocks requested per sync batch.
    pub sync_batch_size: u32,
    /// Maximum encoded bytes served per block-range response.
    pub sync_max_bytes: u64,
    /// Consecutive unproductive sync attempts per tick before giving up.
    pub sync_max_retries: u32,
    /// Maximum transactions per proposed block.
    pub max_txs_per_block: usize,
    /// Heights above the next one for which messages are buffered.
    pub future_height_window: u64,
    /// Bound on messages queued by inbound handlers between ticks.
    pub inbox_capacity: usize,
    /// Bound on messages queued per signer between ticks.
    pub inbox_per_signer: usize,
}

impl Default for ConsensusConfig {
    fn default() -> Self {
        Self {
            mode: AgreementMode::ThreePhase,
            tick_interval: Duration::from_secs(5),
            rpc_timeout: Duration::from_secs(1),
            view_change_after_ticks: 2,
            sync_batch_size: 64,
            sync_max_bytes: 3 * 1024 * 1024,
            sync_max_retries: 3,
            max_txs_per_block: 10_000,
            future_height_window: 16,
            inbox_capacity: 10_000,
            inbox_per_signer: 512,
        }
    }
}

impl ConsensusConfig {
    /// Config with the given mode and default timings.
    pub fn with_mode(mode: AgreementMode) -> Self {
        Self {
            mode,
            ..Self::default()
        }
    }

    /// Short timings for in-process tests.
    pub fn for_testing(mode: AgreementMode) -> Self {
        Self {
            mode,
            tick_interval: Duration::from_millis(50),
            rpc_timeout: Duration::from_millis(200),
            sync_batch_size: 2,
            ..Self::default()
        }
    }
}
