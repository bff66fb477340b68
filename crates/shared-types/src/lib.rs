//! # Shared Types Crate
//!
//! Domain entities shared by every Validator-Chain crate.
//!
//! ## Modules
//!
//! - `entities`: `Block`, `Transaction` and the primitive aliases
//!   (`Hash`, `PublicKey`, `Signature`).
//! - `consensus`: signed `ConsensusMessage`s, the per-candidate
//!   `MessageSet`, `ConfirmedBlock` and the signed `NodeStatus`.
//! - `codec`: the canonical binary encoding used for storage and transport.
//!
//! Hashes are computed field by field over a fixed big-endian layout, so
//! the block id never depends on the serializer.

pub mod codec;
pub mod consensus;
pub mod entities;
pub mod errors;

pub use consensus::*;
pub use entities::*;
pub use errors::*;
