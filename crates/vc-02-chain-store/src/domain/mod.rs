//! Domain layer for the chain store.

pub mod errors;
pub mod height;
pub mod keys;

pub use errors::{ChainStoreError, KVStoreError, SerializationError};
pub use height::HeightHandle;
