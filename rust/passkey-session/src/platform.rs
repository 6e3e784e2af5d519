//! The platform credential capability.
//!
//! A [`PlatformAuthenticator`] is whatever can create credentials and produce
//! assertions for them: `navigator.credentials` in a browser
//! ([`browser::BrowserAuthenticator`], wasm only) or an in-process software
//! authenticator ([`software::SoftwareAuthenticator`]). The lifecycle only
//! sees opaque byte buffers coming back; decoding them is the codecs' job.

use crate::PlatformError;
use crate::sync::{ConditionalSend, ConditionalSync};
use passkey_credentials::{Algorithm, Transport};
use std::future::Future;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

#[cfg(all(target_arch = "wasm32", target_os = "unknown"))]
pub mod browser;
pub mod software;

/// User verification requirement of a ceremony.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UserVerification {
    /// The authenticator must verify the user.
    Required,
    /// Verify the user if the authenticator can.
    #[default]
    Preferred,
    /// Do not verify the user.
    Discouraged,
}

impl UserVerification {
    /// The WebAuthn string for this requirement.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Required => "required",
            Self::Preferred => "preferred",
            Self::Discouraged => "discouraged",
        }
    }
}

/// How an assertion request interacts with the user.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Mediation {
    /// A modal prompt.
    #[default]
    Optional,
    /// Passive discovery through the browser's autofill UI. Does not block
    /// on the user and is expected to be cancelled when another flow starts.
    Conditional,
}

impl Mediation {
    /// The WebAuthn string for this mediation.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Optional => "optional",
            Self::Conditional => "conditional",
        }
    }
}

/// A credential an assertion may be produced with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CredentialDescriptor {
    /// Credential identifier.
    pub id: Vec<u8>,
    /// Transport hints for reaching the authenticator.
    pub transports: Vec<Transport>,
}

/// Parameters of a credential creation ceremony.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreationOptions {
    /// Random registration challenge.
    pub challenge: Vec<u8>,
    /// Relying party identifier.
    pub rp_id: String,
    /// Relying party display name.
    pub rp_name: String,
    /// User handle.
    pub user_id: Vec<u8>,
    /// User account name.
    pub user_name: String,
    /// User display name.
    pub user_display_name: String,
    /// Acceptable algorithms, most preferred first.
    pub algorithms: Vec<Algorithm>,
    /// Whether the credential must be discoverable.
    pub resident_key_required: bool,
    /// User verification requirement.
    pub user_verification: UserVerification,
    /// Ceremony timeout.
    pub timeout: Duration,
}

/// Parameters of an assertion ceremony.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestOptions {
    /// The challenge to sign (a transaction hash when signing).
    pub challenge: Vec<u8>,
    /// Relying party identifier.
    pub rp_id: String,
    /// Credentials to choose from; empty for discovery.
    pub allow_credentials: Vec<CredentialDescriptor>,
    /// User verification requirement.
    pub user_verification: UserVerification,
    /// Ceremony timeout.
    pub timeout: Duration,
    /// Modal or conditional mediation.
    pub mediation: Mediation,
}

/// What a creation ceremony hands back.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewCredential {
    /// Credential identifier (`rawId`).
    pub id: Vec<u8>,
    /// The public key export (`getPublicKey()`), if the platform provided one.
    pub public_key: Option<Vec<u8>>,
    /// The negotiated COSE algorithm (`getPublicKeyAlgorithm()`).
    pub algorithm: Option<i64>,
    /// Transport hints (`getTransports()`).
    pub transports: Vec<Transport>,
}

/// What an assertion ceremony hands back.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Assertion {
    /// Identifier of the credential that signed.
    pub credential_id: Vec<u8>,
    /// Raw authenticator data.
    pub authenticator_data: Vec<u8>,
    /// Raw `clientDataJSON`.
    pub client_data_json: Vec<u8>,
    /// Signature as emitted by the authenticator (DER or raw).
    pub signature: Vec<u8>,
    /// User handle of a discoverable credential.
    pub user_handle: Option<Vec<u8>>,
    /// Transport hints the platform reported for the credential, if any.
    pub transports: Vec<Transport>,
}

/// A capability that creates credentials and produces assertions.
///
/// Both operations resolve to `Ok(None)` when the platform finishes without a
/// result, and to [`PlatformError::Aborted`] once `cancel` fires.
pub trait PlatformAuthenticator: ConditionalSync {
    /// Create a new credential.
    fn create(
        &self,
        options: &CreationOptions,
        cancel: &CancellationToken,
    ) -> impl Future<Output = Result<Option<NewCredential>, PlatformError>> + ConditionalSend;

    /// Produce an assertion over `options.challenge`.
    fn get(
        &self,
        options: &RequestOptions,
        cancel: &CancellationToken,
    ) -> impl Future<Output = Result<Option<Assertion>, PlatformError>> + ConditionalSend;
}
