//! Error types for proof construction, decoding and verification.

use passkey_credentials::{Algorithm, CodecError};
use thiserror::Error;

/// Errors from building or decoding an [`AuthorizationProof`](crate::AuthorizationProof).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProofError {
    /// The signature was produced by a different algorithm than the key.
    #[error("algorithm mismatch: public key is {public_key}, signature is {signature}")]
    AlgorithmMismatch {
        /// Algorithm of the signing public key.
        public_key: Algorithm,
        /// Algorithm of the signature.
        signature: Algorithm,
    },

    /// The signing key is not one of the two multisignature participants.
    #[error("signer is not a participant of the multisignature account")]
    SignerNotParticipant,

    /// A key or signature inside the proof failed to decode.
    #[error(transparent)]
    Codec(#[from] CodecError),

    /// The encoded proof ended before a field was complete.
    #[error("proof truncated while reading {0}")]
    Truncated(&'static str),

    /// Bytes remain after the last field of the proof.
    #[error("{0} bytes trail the proof")]
    TrailingBytes(usize),

    /// The header carries a flag this decoder does not understand.
    #[error("unknown proof flags: {0:#04x}")]
    UnknownFlags(u8),

    /// The header names an algorithm code this decoder does not know.
    #[error("unknown proof algorithm code: {0}")]
    UnknownAlgorithm(u8),

    /// The compact client-data extra fields are not UTF-8.
    #[error("client data extra fields are not valid UTF-8")]
    InvalidUtf8,
}

/// Errors from verifying a WebAuthn assertion or an authorization proof.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum VerifyError {
    /// The signature does not verify against the signed data.
    #[error("invalid signature: {0}")]
    InvalidSignature(String),

    /// The `clientDataJSON` could not be parsed or has the wrong type.
    #[error("invalid clientDataJSON: {0}")]
    InvalidClientData(String),

    /// The challenge in `clientDataJSON` is not the expected one.
    #[error("challenge mismatch")]
    ChallengeMismatch,

    /// The origin in `clientDataJSON` is not the expected one.
    #[error("origin mismatch: expected {expected}, found {found}")]
    OriginMismatch {
        /// Origin the verifier expected.
        expected: String,
        /// Origin the client data carries.
        found: String,
    },

    /// The authenticator data is shorter than its fixed header.
    #[error("invalid authenticator data")]
    InvalidAuthenticatorData,
}

/// Errors when parsing a user-friendly account address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Error)]
pub enum AddressError {
    /// The address does not start with the country code.
    #[error("address must start with \"NQ\"")]
    InvalidPrefix,

    /// The address has the wrong number of characters.
    #[error("address must have 36 characters without spaces, got {0}")]
    InvalidLength(usize),

    /// A character is outside the address alphabet.
    #[error("invalid address character {0:?}")]
    InvalidCharacter(char),

    /// The check digits do not match the address body.
    #[error("address checksum mismatch")]
    ChecksumMismatch,
}
