//! Driven ports (Outbound dependencies)

use crate::domain::ValidatorInfo;
use async_trait::async_trait;
use shared_types::{
    ConfirmedBlock, ConsensusMessage, Hash, NodeStatus, PublicKey, Signature, Transaction,
};

/// Transport failures. All of them mean "unreachable for this tick".
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LinkError {
    #[error("Deadline exceeded")]
    Timeout,

    #[error("Peer unreachable: {0}")]
    Unreachable(String),

    #[error("Peer rejected request: {0}")]
    Remote(String),

    #[error("Malformed response: {0}")]
    Protocol(String),
}

/// Request/response channel to remote validators.
///
/// The engine wraps every call in its own deadline; implementations may
/// apply tighter ones.
#[async_trait]
pub trait PeerLink: Send + Sync {
    async fn ping(&self, peer: &ValidatorInfo, timestamp: u64) -> Result<u64, LinkError>;

    async fn exchange_status(
        &self,
        peer: &ValidatorInfo,
        status: NodeStatus,
    ) -> Result<NodeStatus, LinkError>;

    async fn send_message(
        &self,
        peer: &ValidatorInfo,
        message: ConsensusMessage,
    ) -> Result<(), LinkError>;

    async fn send_block(&self, peer: &ValidatorInfo, block: ConfirmedBlock)
        -> Result<(), LinkError>;

    async fn fetch_block_range(
        &self,
        peer: &ValidatorInfo,
        from: u64,
        count: u32,
    ) -> Result<Vec<ConfirmedBlock>, LinkError>;
}

/// Source of block bodies.
#[async_trait]
pub trait TransactionPool: Send + Sync {
    /// Up to `max` pending transactions in inclusion order.
    async fn pending_transactions(&self, max: usize) -> Vec<Transaction>;

    /// Drop transactions included in a confirmed block.
    async fn remove(&self, ids: &[Hash]);
}

/// Local signing key.
pub trait BlockSigner: Send + Sync {
    fn public_key(&self) -> PublicKey;

    fn sign(&self, digest: &Hash) -> Signature;
}

/// Signature verification service.
pub trait SignatureVerifier: Send + Sync {
    fn verify(&self, public_key: &PublicKey, message: &[u8], signature: &Signature) -> bool;
}

/// Notified after every block appended to the chain, whether finalized
/// locally or obtained through sync.
pub trait BlockObserver: Send + Sync {
    fn on_confirmed_block(&self, block: &ConfirmedBlock);
}

/// Time source for timestamps.
pub trait TimeSource: Send + Sync {
    /// Current unix time in milliseconds.
    fn now_millis(&self) -> u64;
}

/// Default time source using system time.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemTimeSource;

impl TimeSource for SystemTimeSource {
    fn now_millis(&self) -> u64 {
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map(|d| d.as_millis() as u64)
            .unwrap_or(0)
    }
}
