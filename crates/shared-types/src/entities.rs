//! # Core Domain Entities
//!
//! The chain is a linear sequence of `Block`s, each carrying an ordered list
//! of `Transaction`s and the producer's signature over the block hash.
//!
//! ## Hashing
//!
//! `Block::hash` covers every header field plus the transaction root and
//! excludes the producer signature, so a block can be signed after it is
//! hashed and the signature never changes its identity.

use serde::{Deserialize, Serialize};
use serde_with::{serde_as, Bytes};
use shared_crypto::KeccakHasher;

/// A 32-byte Keccak-256 hash.
pub type Hash = [u8; 32];

/// A 64-byte Ed25519 signature.
pub type Signature = [u8; 64];

/// A 32-byte Ed25519 public key.
pub type PublicKey = [u8; 32];

/// Validators are identified by their public key.
pub type ValidatorId = PublicKey;

/// The all-zero hash; the genesis block's `prev_hash`.
pub const ZERO_HASH: Hash = [0u8; 32];

/// Placeholder signature carried by the unsigned genesis block.
pub const EMPTY_SIGNATURE: Signature = [0u8; 64];

/// A transaction as held in the pool and embedded in blocks.
///
/// Execution semantics are outside the agreement engine; it only needs a
/// stable identity for de-duplication and pool cleanup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    /// Submitting account's public key.
    pub from: PublicKey,
    /// Sender's nonce.
    pub nonce: u64,
    /// Opaque payload (contract call data, etc.).
    pub payload: Vec<u8>,
    /// Unix timestamp (ms) when the transaction was created.
    pub timestamp: u64,
}

impl Transaction {
    /// Create a new transaction.
    pub fn new(from: PublicKey, nonce: u64, payload: Vec<u8>, timestamp: u64) -> Self {
        Self {
            from,
            nonce,
            payload,
            timestamp,
        }
    }

    /// Transaction id: Keccak-256 over the canonical field layout.
    pub fn id(&self) -> Hash {
        let mut hasher = KeccakHasher::new();
        hasher
            .update(&self.from)
            .update_u64(self.nonce)
            .update_u64(self.timestamp)
            .update_u64(self.payload.len() as u64)
            .update(&self.payload);
        hasher.finalize()
    }
}

/// A block of the replicated chain.
#[serde_as]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Block {
    /// Position in the chain; genesis is 0.
    pub height: u64,
    /// Hash of the block at `height - 1`.
    pub prev_hash: Hash,
    /// Unix timestamp (ms) at proposal time.
    pub timestamp: u64,
    /// Validator that produced the block.
    pub proposer: PublicKey,
    /// Ordered transactions.
    pub transactions: Vec<Transaction>,
    /// Producer signature over `hash()`.
    #[serde_as(as = "Bytes")]
    pub signature: Signature,
}

impl Block {
    /// Build an unsigned block; call `Block::with_signature` once signed.
    pub fn new(
        height: u64,
        prev_hash: Hash,
        timestamp: u64,
        proposer: PublicKey,
        transactions: Vec<Transaction>,
    ) -> Self {
        Self {
            height,
            prev_hash,
            timestamp,
            proposer,
            transactions,
            signature: EMPTY_SIGNATURE,
        }
    }

    /// Build the genesis block. It has no producer and no signature.
    pub fn genesis(timestamp: u64, transactions: Vec<Transaction>) -> Self {
        Self::new(0, ZERO_HASH, timestamp, [0u8; 32], transactions)
    }

    /// Attach the producer signature.
    pub fn with_signature(mut self, signature: Signature) -> Self {
        self.signature = signature;
        self
    }

    /// Block hash (excludes `signature`).
    pub fn hash(&self) -> Hash {
        let mut hasher = KeccakHasher::new();
        hasher
            .update_u64(self.height)
            .update(&self.prev_hash)
            .update_u64(self.timestamp)
            .update(&self.proposer)
            .update(&self.transactions_root());
        hasher.finalize()
    }

    /// Keccak-256 over the ordered transaction ids.
    pub fn transactions_root(&self) -> Hash {
        let mut hasher = KeccakHasher::new();
        hasher.update_u64(self.transactions.len() as u64);
        for tx in &self.transactions {
            hasher.update(&tx.id());
        }
        hasher.finalize()
    }

    /// Ids of every transaction in the block.
    pub fn transaction_ids(&self) -> Vec<Hash> {
        self.transactions.iter().map(Transaction::id).collect()
    }

    /// True for the height-0 anchor block.
    pub fn is_genesis(&self) -> bool {
        self.height == 0 && self.prev_hash == ZERO_HASH
    }
}

/// Short hex prefix of a hash for log lines.
pub fn short_hash(hash: &Hash) -> String {
    hash[..4].iter().map(|b| format!("{b:02x}")).collect()
}
