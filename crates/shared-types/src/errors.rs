//! # Error Types
//!
//! Errors shared across crates.

use thiserror::Error;

/// Failure to encode or decode a value with the canonical codec.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CodecError {
    /// Value could not be serialized.
    #[error("Encoding failed: {0}")]
    Encode(String),

    /// Bytes were not a valid encoding of the requested type.
    #[error("Decoding failed: {0}")]
    Decode(String),
}
