//! # Production Storage Adapters
//!
//! Enable the `rocksdb` feature for a durable chain store:
//!
//! ```toml
//! node-runtime = { path = "...", features = ["rocksdb"] }
//! ```
//!
//! Without it the node keeps its chain in `InMemoryKVStore` and re-syncs
//! from peers after a restart.

#[cfg(feature = "rocksdb")]
pub mod rocksdb_adapter;

#[cfg(feature = "rocksdb")]
pub use rocksdb_adapter::{RocksDbConfig, RocksDbStore};

pub use vc_02_chain_store::InMemoryKVStore;
