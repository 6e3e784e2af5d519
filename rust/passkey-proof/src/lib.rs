//! Authorization proofs and account identifiers for WebAuthn-signed
//! transactions.
//!
//! This crate turns the normalized output of an authenticator assertion
//! (see [`passkey_credentials`]) into a compact [`AuthorizationProof`] that a
//! chain can verify, and derives the [`AccountIdentifier`] such proofs
//! authorize for.
//!
//! ```text
//! PublicKey + Signature + authenticatorData + clientDataJSON
//!     │
//!     ├─ ProofBuilder::new()      full clientDataJSON
//!     └─ ProofBuilder::compact()  ClientDataContext (flags + extra fields)
//!     │
//!     ▼
//! AuthorizationProof ── to_bytes() ──▶ wire format
//!     │
//!     └─ account() ──▶ AccountIdentifier (single key or Merkle root of two)
//! ```

pub mod address;
pub mod client_data;
mod error;
pub mod proof;
pub mod verify;
mod wire;

pub use address::{AccountIdentifier, merkle_root};
pub use client_data::{ClientDataContext, ClientDataFlags};
pub use error::{AddressError, ProofError, VerifyError};
pub use proof::{AuthorizationProof, ClientDataPayload, ProofBuilder, ProofKind, SignerPosition};
pub use verify::{verify_assertion, verify_client_data};
