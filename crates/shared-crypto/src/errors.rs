//! Crypto error types.

use thiserror::Error;

/// Failures while loading keys or checking validator signatures.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CryptoError {
    /// The signature does not match the message and signer.
    #[error("signature does not verify")]
    SignatureVerificationFailed,

    /// The bytes are not a valid Ed25519 point.
    #[error("malformed validator public key")]
    InvalidPublicKey,

    /// A signing seed must be exactly 32 bytes.
    #[error("signing seed must be {expected} bytes, got {actual}")]
    InvalidSeedLength {
        /// Required seed length
        expected: usize,
        /// Length supplied
        actual: usize,
    },
}
