//! Adapters for the agreement engine's outbound ports.

mod crypto;
mod local_network;
mod observer;
mod pool;

pub use crypto::{Ed25519Signer, Ed25519Verifier};
pub use local_network::{Delivery, DeliveryPayload, LocalPeerLink, LocalPeerNetwork};
pub use observer::{LoggingObserver, RecordingObserver};
pub use pool::InMemoryTransactionPool;
