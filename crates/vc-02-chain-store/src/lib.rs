//! # vc-02-chain-store
//!
//! Durable storage of confirmed blocks for Validator-Chain.
//!
//! ## Layout
//!
//! | Key | Value |
//! |-----|-------|
//! | `blk:` + hash | encoded `ConfirmedBlock` |
//! | `idx:` + height (big-endian) | block hash |
//! | `meta:last_height` | last confirmed height (big-endian) |
//!
//! The store is append-only with a single writer (the agreement engine).
//! Every append writes the block, its index entry and the new head in one
//! atomic batch. The last confirmed height is also published through a
//! `HeightHandle` so status readers never wait on the writer.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use vc_02_chain_store::{ChainStore, InMemoryKVStore};
//!
//! let mut store = ChainStore::open(Box::new(InMemoryKVStore::new()), genesis)?;
//! store.append(confirmed_block)?;
//! assert_eq!(store.last_height(), 1);
//! ```

pub mod adapters;
pub mod domain;
pub mod ports;
pub mod service;

pub use adapters::{BincodeBlockSerializer, InMemoryKVStore};
pub use domain::{ChainStoreError, HeightHandle, KVStoreError, SerializationError};
pub use ports::{BatchOperation, BlockSerializer, KeyValueStore};
pub use service::ChainStore;
