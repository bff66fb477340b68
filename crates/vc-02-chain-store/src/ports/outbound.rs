//! # Outbound Ports (Driven Ports)
//!
//! Dependencies the chain store requires from the host application.
//!
//! Production: `RocksDbStore` (node-runtime/adapters/storage/rocksdb_adapter.rs)
//! Testing: `InMemoryKVStore` (adapters/memory.rs)

use crate::domain::{KVStoreError, SerializationError};
use shared_types::ConfirmedBlock;

/// Abstract interface for key-value database operations.
pub trait KeyValueStore: Send + Sync {
    /// Get a value by key.
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>, KVStoreError>;

    /// Put a single key-value pair.
    fn put(&mut self, key: &[u8], value: &[u8]) -> Result<(), KVStoreError>;

    /// Execute an atomic batch write.
    ///
    /// Either ALL operations in the batch are applied, or NONE are.
    fn atomic_batch_write(&mut self, operations: Vec<BatchOperation>) -> Result<(), KVStoreError>;

    /// Check if a key exists.
    fn exists(&self, key: &[u8]) -> Result<bool, KVStoreError>;
}

/// Batch operation for atomic writes.
#[derive(Debug, Clone)]
pub enum BatchOperation {
    /// Put a key-value pair.
    Put { key: Vec<u8>, value: Vec<u8> },
}

impl BatchOperation {
    /// Create a Put operation.
    pub fn put(key: impl Into<Vec<u8>>, value: impl Into<Vec<u8>>) -> Self {
        BatchOperation::Put {
            key: key.into(),
            value: value.into(),
        }
    }
}

/// Abstract interface for confirmed-block serialization.
pub trait BlockSerializer: Send + Sync {
    /// Serialize a confirmed block to bytes.
    fn serialize(&self, block: &ConfirmedBlock) -> Result<Vec<u8>, SerializationError>;

    /// Deserialize bytes to a confirmed block.
    fn deserialize(&self, data: &[u8]) -> Result<ConfirmedBlock, SerializationError>;
}
