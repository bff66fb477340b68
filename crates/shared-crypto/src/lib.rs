//! # Shared Crypto - Signing and Hashing Primitives
//!
//! ## Components
//!
//! | Module | Algorithm | Use Case |
//! |--------|-----------|----------|
//! | `hashing` | Keccak-256 | Block ids, signing digests |
//! | `signatures` | Ed25519 | Validator identity, block and vote signing |
//!
//! ## Security Properties
//!
//! - **Ed25519**: Deterministic nonces, no RNG dependency when signing
//! - Secret key material is zeroized on drop

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod errors;
pub mod hashing;
pub mod signatures;

// Re-exports
pub use errors::CryptoError;
pub use hashing::{keccak256, keccak256_many, KeccakHasher};
pub use signatures::{verify_signature, ValidatorKeyPair};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
