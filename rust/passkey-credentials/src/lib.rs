//! Public key, signature and credential codecs for WebAuthn-authorized
//! transactions.
//!
//! Authenticators hand back key and signature material in shapes that depend
//! on the negotiated COSE algorithm (SPKI exports, DER-encoded ECDSA
//! signatures, raw Ed25519 bytes). This crate normalizes all of them into a
//! closed set of canonical representations:
//!
//! - [`Algorithm`]: the negotiated signature scheme (`-7` ES256 or `-8` EdDSA)
//! - [`PublicKey`]: compressed P-256 point or raw Ed25519 key
//! - [`Signature`]: fixed-width `r || s` bytes for either scheme
//! - [`Credential`]: the durable record kept per registered authenticator

pub mod algorithm;
pub mod credential;
pub mod der;
mod error;
pub mod multisig;
pub mod public_key;
pub mod signature;

pub use algorithm::Algorithm;
pub use credential::{Credential, Transport};
pub use error::{CodecError, KeyGenerationError};
pub use multisig::MultisigKeyPair;
pub use public_key::PublicKey;
pub use signature::Signature;
