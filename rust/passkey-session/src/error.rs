//! Error types for the credential lifecycle and its collaborators.

use passkey_credentials::{CodecError, KeyGenerationError};
use passkey_proof::ProofError;
use thiserror::Error;

/// Errors reported by a platform credential capability.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PlatformError {
    /// The ceremony was aborted through its cancellation token.
    #[error("ceremony aborted")]
    Aborted,

    /// The user dismissed the prompt or the ceremony timed out.
    #[error("not allowed: {0}")]
    NotAllowed(String),

    /// The capability does not exist in this environment.
    #[error("WebAuthn API not available: {0}")]
    NotAvailable(String),

    /// Any other platform failure.
    #[error("platform error: {0}")]
    Other(String),
}

/// Errors reported by the relying-party lookup service, surfaced verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RelyingPartyError {
    /// The request did not reach the service or the response was cut short.
    #[error("transport error: {0}")]
    Transport(String),

    /// The service answered with a non-success status.
    #[error("rejected with HTTP {status}: {body}")]
    Rejected {
        /// HTTP status code.
        status: u16,
        /// Response body as returned by the service.
        body: String,
    },

    /// The service has no key registered for the credential.
    #[error("unknown credential")]
    UnknownCredential,

    /// The service answered with a body this client cannot interpret.
    #[error("invalid response: {0}")]
    InvalidResponse(String),
}

/// The lifecycle ceremony an error belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Ceremony {
    /// Credential creation.
    Registration,
    /// Credential discovery (login).
    Discovery,
    /// Transaction signing.
    Signing,
}

impl std::fmt::Display for Ceremony {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Registration => f.write_str("registration"),
            Self::Discovery => f.write_str("discovery"),
            Self::Signing => f.write_str("signing"),
        }
    }
}

/// Why a ceremony produced no usable result.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FailureReason {
    /// The platform returned no credential or assertion.
    #[error("no credential produced")]
    NoCredentialProduced,

    /// The new credential did not expose its public key.
    #[error("no public key returned")]
    NoPublicKey,

    /// The relying-party lookup failed.
    #[error("remote lookup failed: {0}")]
    RemoteLookupFailed(#[source] RelyingPartyError),
}

/// Terminal failure of a lifecycle operation.
#[derive(Debug, Clone, Error)]
pub enum LifecycleError {
    /// The user cancelled, or the ceremony was superseded by another one.
    #[error("{0} cancelled")]
    PlatformCancelled(Ceremony),

    /// Registration did not produce a usable credential.
    #[error("registration failed: {0}")]
    RegistrationFailed(FailureReason),

    /// Discovery did not produce a usable credential.
    #[error("discovery failed: {0}")]
    DiscoveryFailed(FailureReason),

    /// Signing did not produce an assertion.
    #[error("signing failed: {0}")]
    SigningFailed(FailureReason),

    /// The platform capability failed for a reason other than cancellation.
    #[error("{0} failed on the platform: {1}")]
    Platform(Ceremony, #[source] PlatformError),

    /// Key or signature material failed to decode.
    #[error(transparent)]
    Codec(#[from] CodecError),

    /// The authorization proof could not be built.
    #[error(transparent)]
    Proof(#[from] ProofError),

    /// A multisignature key could not be generated.
    #[error(transparent)]
    KeyGeneration(#[from] KeyGenerationError),

    /// The random challenge could not be generated.
    #[error("RNG error: {0}")]
    Rng(String),
}

impl LifecycleError {
    /// Whether the failure calls for the user to act (retry the prompt, pick
    /// another authenticator) rather than indicating a fault.
    #[must_use]
    pub const fn is_user_action_needed(&self) -> bool {
        matches!(
            self,
            Self::PlatformCancelled(_)
                | Self::RegistrationFailed(FailureReason::NoCredentialProduced)
                | Self::DiscoveryFailed(FailureReason::NoCredentialProduced)
                | Self::SigningFailed(FailureReason::NoCredentialProduced)
        )
    }

    /// The ceremony-specific failure for `reason`.
    pub(crate) fn failed(ceremony: Ceremony, reason: FailureReason) -> Self {
        match ceremony {
            Ceremony::Registration => Self::RegistrationFailed(reason),
            Ceremony::Discovery => Self::DiscoveryFailed(reason),
            Ceremony::Signing => Self::SigningFailed(reason),
        }
    }
}

impl From<getrandom::Error> for LifecycleError {
    fn from(e: getrandom::Error) -> Self {
        Self::Rng(e.to_string())
    }
}
