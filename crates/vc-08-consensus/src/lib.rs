//! # vc-08-consensus
//!
//! Block agreement for a permissioned validator set.
//!
//! ## Architecture
//!
//! One `AgreementEngine` implements both agreement variants. The
//! `AgreementMode` chosen at startup selects the strategy:
//!
//! | Mode | Rounds | Quorum |
//! |------|--------|--------|
//! | `pbft` (three-phase) | PROPOSE, PREPARE, COMMIT | `n - f`, `f = (n-1)/3` (`2f+1` of `3f+1`) |
//! | `ebft` (single-round) | PROPOSE, COMMIT | `n/2 + 1` |
//!
//! A `Scheduler` ticks the engine at a fixed interval. Each tick runs, under
//! the engine lock:
//!
//! ```text
//! liveness ──→ sync ──→ propose ──→ vote / finalize ──→ view change
//!    │                                    │
//!    └─ ping + signed status to peers     └─ ChainStore::append, onConfirmedBlock
//! ```
//!
//! Peers reach the engine through the `ConsensusApi` port; the engine
//! reaches them through `PeerLink`. Both are transport-agnostic: the
//! `vc-05-peer-link` crate provides TCP, and `LocalPeerNetwork` wires
//! engines together in-process for simulations.
//!
//! ## Safety
//!
//! - Every message is signature-checked against the registry before it is
//!   counted; message sets are keyed by signer so re-delivery never
//!   inflates a quorum.
//! - A validator sends at most one COMMIT hash per height, so two
//!   conflicting certificates would need an overlapping honest signer.
//! - When several candidates are certified, the smallest block hash wins.
//! - Blocks obtained from peers are only appended after their quorum
//!   certificate verifies.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use vc_08_consensus::{AgreementEngine, EngineDeps, Scheduler};
//!
//! let engine = Arc::new(AgreementEngine::new(config, registry, store, deps)?);
//! let scheduler = Scheduler::new(Arc::clone(&engine), config.tick_interval);
//! let handle = scheduler.spawn(shutdown_rx);
//! ```

pub mod adapters;
pub mod domain;
pub mod metrics;
pub mod ports;
pub mod scheduler;
pub mod service;
pub mod validation;

// Re-export main types
pub use adapters::{
    Ed25519Signer, Ed25519Verifier, InMemoryTransactionPool, LocalPeerLink, LocalPeerNetwork,
    LoggingObserver, RecordingObserver,
};
pub use domain::{
    AgreementMode, CandidateArena, CandidateBlock, ConsensusConfig, ConsensusError,
    ConsensusResult, RegistryError, ValidatorInfo, ValidatorRegistry,
};
pub use ports::{
    BlockObserver, BlockSigner, ConsensusApi, LinkError, PeerLink, SignatureVerifier,
    SystemTimeSource, TimeSource, TransactionPool,
};
pub use scheduler::Scheduler;
pub use service::{AgreementEngine, EngineDeps, TickReport};
pub use validation::MessageValidator;
