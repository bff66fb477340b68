//! # Canonical Codec
//!
//! Fixed-width little-endian bincode, shared by the chain store and the
//! peer wire format. Trailing bytes are rejected so a value has exactly one
//! accepted encoding, and decoding is bounded to stop hostile length
//! prefixes from forcing huge allocations.

use crate::errors::CodecError;
use bincode::Options;
use serde::de::DeserializeOwned;
use serde::Serialize;

/// Upper bound on any encoded value (64 MiB).
pub const MAX_ENCODED_SIZE: u64 = 64 * 1024 * 1024;

fn options() -> impl Options {
    bincode::DefaultOptions::new()
        .with_fixint_encoding()
        .reject_trailing_bytes()
        .with_limit(MAX_ENCODED_SIZE)
}

/// Encode a value.
pub fn encode<T: Serialize>(value: &T) -> Result<Vec<u8>, CodecError> {
    options()
        .serialize(value)
        .map_err(|e| CodecError::Encode(e.to_string()))
}

/// Decode a value, rejecting trailing bytes.
pub fn decode<T: DeserializeOwned>(bytes: &[u8]) -> Result<T, CodecError> {
    options()
        .deserialize(bytes)
        .map_err(|e| CodecError::Decode(e.to_string()))
}

/// Exact encoded length of a value.
pub fn encoded_size<T: Serialize>(value: &T) -> Result<u64, CodecError> {
    options()
        .serialized_size(value)
        .map_err(|e| CodecError::Encode(e.to_string()))
}
