//! # Domain Errors
//!
//! Error types for the chain store. Everything except `HeightGap` and
//! `BrokenLink` indicates a local storage fault rather than a bad block.

use shared_types::Hash;
use thiserror::Error;

/// Errors from chain store operations.
#[derive(Debug, Error)]
pub enum ChainStoreError {
    /// Underlying key-value store failed.
    #[error(transparent)]
    Store(#[from] KVStoreError),

    /// Stored bytes could not be (de)serialized.
    #[error(transparent)]
    Serialization(#[from] SerializationError),

    /// The block offered as genesis is not a height-0 block.
    #[error("Invalid genesis block: height {height}")]
    InvalidGenesis { height: u64 },

    /// The store was created with a different genesis block.
    #[error("Genesis mismatch: stored {stored:02x?}, configured {configured:02x?}")]
    GenesisMismatch { stored: Hash, configured: Hash },

    /// Append attempted at a height other than `last + 1`.
    #[error("Height gap: expected {expected}, got {actual}")]
    HeightGap { expected: u64, actual: u64 },

    /// Block does not reference the hash of the block below it.
    #[error("Block at height {height} does not link to its parent")]
    BrokenLink { height: u64 },

    /// Height index points at nothing.
    #[error("Missing block at height {0}")]
    MissingHeight(u64),

    /// Head record is unreadable.
    #[error("Corrupt chain metadata: {0}")]
    CorruptMetadata(String),
}

/// Key-value store errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum KVStoreError {
    /// I/O error during read/write.
    #[error("KV store I/O error: {message}")]
    IOError { message: String },
    /// Data corruption in the store.
    #[error("KV store corruption: {message}")]
    CorruptionError { message: String },
}

/// Block (de)serialization failure.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("Serialization error: {message}")]
pub struct SerializationError {
    pub message: String,
}
