//! Storage backends plugged into the chain store's `KeyValueStore` port.

pub mod storage;
