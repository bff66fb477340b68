//! Error types for the agreement engine.
//!
//! Per-message and per-peer errors are logged and dropped inside the engine;
//! only construction failures (registry, key, mode, store) are fatal.

use super::mode::AgreementMode;
use crate::ports::LinkError;
use shared_types::Phase;
use vc_02_chain_store::ChainStoreError;

/// Result alias for consensus operations.
pub type ConsensusResult<T> = Result<T, ConsensusError>;

/// Consensus error types.
#[derive(Debug, thiserror::Error)]
pub enum ConsensusError {
    #[error("Unknown validator: {0}")]
    UnknownValidator(String),

    #[error("Signature verification failed for {phase} from {signer}")]
    SignatureVerificationFailed { phase: Phase, signer: String },

    #[error("Stale message for height {seq}, last confirmed is {last}")]
    StaleMessage { seq: u64, last: u64 },

    #[error("Message for height {seq} is beyond the acceptance horizon {horizon}")]
    FutureMessage { seq: u64, horizon: u64 },

    #[error("Invalid proposal: {0}")]
    InvalidProposal(String),

    #[error("Unexpected block payload on {0} message")]
    UnexpectedPayload(Phase),

    #[error("Proposal for height {seq} view {view} not signed by the scheduled proposer")]
    WrongProposer { seq: u64, view: u64 },

    #[error("Invalid quorum certificate at height {height}: {reason}")]
    InvalidCertificate { height: u64, reason: String },

    #[error("Invalid status report: {0}")]
    InvalidStatus(String),

    #[error("Inbox full ({capacity} pending), message dropped")]
    InboxFull { capacity: usize },

    #[error("{signer} already has {quota} messages pending, message dropped")]
    SignerQuotaExceeded { signer: String, quota: usize },

    #[error("Message for view {view} is beyond the view horizon {horizon}")]
    FutureView { view: u64, horizon: u64 },

    #[error("Signing key does not match registry identity")]
    KeyMismatch,

    #[error("Configured mode {configured} differs from registry mode {registry}")]
    ModeMismatch {
        configured: AgreementMode,
        registry: AgreementMode,
    },

    #[error(transparent)]
    Registry(#[from] RegistryError),

    #[error(transparent)]
    Store(#[from] ChainStoreError),

    #[error(transparent)]
    Link(#[from] LinkError),
}

impl ConsensusError {
    /// Short label for drop metrics.
    pub fn reason(&self) -> &'static str {
        match self {
            ConsensusError::UnknownValidator(_) => "unknown_validator",
            ConsensusError::SignatureVerificationFailed { .. } => "bad_signature",
            ConsensusError::StaleMessage { .. } => "stale",
            ConsensusError::FutureMessage { .. } => "future",
            ConsensusError::InvalidProposal(_)
            | ConsensusError::UnexpectedPayload(_)
            | ConsensusError::WrongProposer { .. } => "invalid_proposal",
            ConsensusError::InvalidCertificate { .. } => "invalid_certificate",
            ConsensusError::InvalidStatus(_) => "invalid_status",
            ConsensusError::InboxFull { .. } | ConsensusError::SignerQuotaExceeded { .. } => {
                "backpressure"
            }
            ConsensusError::FutureView { .. } => "future",
            ConsensusError::KeyMismatch
            | ConsensusError::ModeMismatch { .. }
            | ConsensusError::Registry(_) => "config",
            ConsensusError::Store(_) => "store",
            ConsensusError::Link(_) => "link",
        }
    }
}

/// Validator registry construction errors.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RegistryError {
    #[error("Validator set is empty; no quorum can be computed")]
    Empty,

    #[error("Validator {0} listed more than once")]
    Duplicate(String),
}
