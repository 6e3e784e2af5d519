//! Credential lifecycle for WebAuthn-authorized accounts.
//!
//! A [`CredentialLifecycle`] drives three ceremonies against a
//! [`PlatformAuthenticator`] and a [`RelyingParty`]:
//!
//! - [`register`](CredentialLifecycle::register): create a passkey, normalize
//!   its public key, optionally pair it with a generated second key, and
//!   register it with the relying party
//! - [`login`](CredentialLifecycle::login): discover a passkey (modally or
//!   through conditional mediation) and look up its registered key
//! - [`sign`](CredentialLifecycle::sign): have the passkey sign a transaction
//!   hash and serialize the authorization proof
//!
//! At most one discovery attempt is live at a time; registration and new
//! logins cancel an outstanding one first.
//!
//! # Example
//!
//! ```
//! use passkey_session::{
//!     CredentialLifecycle, MemoryRelyingParty, SessionConfig, SoftwareAuthenticator,
//! };
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let origin = "https://wallet.example.com";
//! let lifecycle = CredentialLifecycle::new(
//!     SoftwareAuthenticator::new(origin),
//!     MemoryRelyingParty::new(),
//!     SessionConfig::new(origin),
//! );
//!
//! let registration = lifecycle.register().await?;
//! println!("account {}", registration.account);
//!
//! let proof = lifecycle.sign(&registration.credential, &[0u8; 32]).await?;
//! assert!(!proof.is_empty());
//! # Ok(())
//! # }
//! ```

mod config;
pub mod discovery;
mod error;
mod lifecycle;
pub mod platform;
pub mod relying_party;
mod sync;

pub use config::SessionConfig;
pub use discovery::{DiscoveryAttempt, DiscoverySlot};
pub use error::{Ceremony, FailureReason, LifecycleError, PlatformError, RelyingPartyError};
pub use lifecycle::{CredentialLifecycle, Registration};
#[cfg(all(target_arch = "wasm32", target_os = "unknown"))]
pub use platform::browser::BrowserAuthenticator;
pub use platform::software::{ClientDataStyle, SoftwareAuthenticator};
pub use platform::{
    Assertion, CreationOptions, CredentialDescriptor, Mediation, NewCredential,
    PlatformAuthenticator, RequestOptions, UserVerification,
};
pub use relying_party::{
    ChallengeVerification, MemoryRelyingParty, RegisteredKey, RegistrationRequest, RelyingParty,
};
#[cfg(feature = "rest")]
pub use relying_party::{AuthMethod, RestRelyingParty, RestRelyingPartyConfig};
pub use sync::{ConditionalSend, ConditionalSync};

pub use passkey_credentials::{
    Algorithm, Credential, MultisigKeyPair, PublicKey, Signature, Transport,
};
pub use passkey_proof::{AccountIdentifier, AuthorizationProof};
