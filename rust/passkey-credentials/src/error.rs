//! Error types for key and signature decoding.

use thiserror::Error;

/// Errors raised at any decode boundary of this crate.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CodecError {
    /// The COSE algorithm identifier is not one of `-7` or `-8`.
    #[error("unsupported algorithm: {0}")]
    UnsupportedAlgorithm(i64),

    /// The public key bytes do not decode for the requested algorithm.
    #[error("malformed public key: {0}")]
    MalformedPublicKey(String),

    /// The signature bytes do not decode for the requested algorithm.
    #[error("malformed signature: {0}")]
    MalformedSignature(String),

    /// A transport hint is not one of the WebAuthn transport names.
    #[error("unknown transport: {0}")]
    UnknownTransport(String),

    /// A hex-encoded field could not be decoded.
    #[error("invalid hex: {0}")]
    InvalidHex(String),
}

/// Errors from generating fresh key material.
#[derive(Debug, Clone, Error)]
pub enum KeyGenerationError {
    /// The operating system RNG failed.
    #[error("RNG error: {0}")]
    Rng(getrandom::Error),

    /// The seed has the wrong length (expected 32).
    #[error("expected 32 seed bytes, got {0}")]
    InvalidSeedLength(usize),
}

impl From<getrandom::Error> for KeyGenerationError {
    fn from(e: getrandom::Error) -> Self {
        Self::Rng(e)
    }
}

impl From<hex::FromHexError> for CodecError {
    fn from(e: hex::FromHexError) -> Self {
        Self::InvalidHex(e.to_string())
    }
}
