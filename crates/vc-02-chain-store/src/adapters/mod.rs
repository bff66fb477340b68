//! Adapters for the chain store ports.

pub mod memory;
pub mod serializer;

pub use memory::InMemoryKVStore;
pub use serializer::BincodeBlockSerializer;
