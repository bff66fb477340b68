//! Driving ports (API exposed to transports and host applications)

use crate::domain::ConsensusResult;
use async_trait::async_trait;
use shared_types::{ConfirmedBlock, ConsensusMessage, NodeStatus};

/// Requests a remote validator can make of this node.
///
/// Handlers never block on a running tick: messages and blocks are checked
/// statelessly and queued for the next tick, and status and block-range
/// reads use lock-free snapshots.
#[async_trait]
pub trait ConsensusApi: Send + Sync {
    /// Liveness ping. Returns the local clock (ms).
    async fn ping(&self, timestamp: u64) -> u64;

    /// Accept the caller's signed status and answer with ours.
    async fn exchange_status(&self, status: NodeStatus) -> ConsensusResult<NodeStatus>;

    /// Accept a PROPOSE, PREPARE, COMMIT or VIEWCHANGE message.
    async fn handle_message(&self, message: ConsensusMessage) -> ConsensusResult<()>;

    /// Accept a block the sender just finalized.
    async fn handle_confirmed_block(&self, block: ConfirmedBlock) -> ConsensusResult<()>;

    /// Serve confirmed blocks starting at `from` for a syncing peer.
    async fn block_range(&self, from: u64, count: u32) -> ConsensusResult<Vec<ConfirmedBlock>>;

    /// Last confirmed height.
    fn current_height(&self) -> u64;

    /// Whether enough peers are reachable to propose and vote.
    fn is_active(&self) -> bool;
}
