//! Ports for the chain store.

pub mod outbound;

pub use outbound::{BatchOperation, BlockSerializer, KeyValueStore};
