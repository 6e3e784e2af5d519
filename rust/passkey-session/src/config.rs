//! Session configuration.

use crate::platform::UserVerification;
use passkey_credentials::{Algorithm, Transport};
use std::time::Duration;

/// Settings shared by every ceremony of a [`CredentialLifecycle`](crate::CredentialLifecycle).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SessionConfig {
    /// Relying party identifier, usually the origin's host.
    pub rp_id: String,

    /// Human-readable relying party name shown during registration.
    pub rp_name: String,

    /// Origin the client data is expected to carry.
    pub origin: String,

    /// Opaque user handle stored with new credentials.
    pub user_id: Vec<u8>,

    /// Account name shown during registration.
    pub user_name: String,

    /// Display name shown during registration.
    pub user_display_name: String,

    /// Algorithms to offer at registration, most preferred first.
    pub algorithms: Vec<Algorithm>,

    /// User verification requirement for every ceremony.
    pub user_verification: UserVerification,

    /// Whether new credentials must be discoverable (resident keys).
    pub resident_key_required: bool,

    /// Ceremony timeout passed to the platform.
    pub timeout: Duration,

    /// Whether registration also generates a second, local key for a
    /// two-of-two account.
    pub multisig: bool,

    /// Whether proofs carry compact client data instead of the full JSON.
    pub compact_client_data: bool,

    /// Transport hints used for credentials that carry none.
    pub default_transports: Vec<Transport>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            rp_id: "localhost".to_string(),
            rp_name: "Albatross Webauthn Demo".to_string(),
            origin: "http://localhost".to_string(),
            user_id: vec![0; 16],
            user_name: "Webauthn Demo Account".to_string(),
            user_display_name: "Webauthn Demo User".to_string(),
            algorithms: vec![Algorithm::EddsaEd25519, Algorithm::EcdsaP256Sha256],
            user_verification: UserVerification::Preferred,
            resident_key_required: true,
            timeout: Duration::from_secs(60),
            multisig: false,
            compact_client_data: false,
            default_transports: vec![Transport::Usb, Transport::Nfc, Transport::Ble],
        }
    }
}

impl SessionConfig {
    /// Create a configuration for `origin`, deriving the relying party id
    /// from its host.
    pub fn new(origin: impl Into<String>) -> Self {
        let origin = origin.into();
        Self {
            rp_id: host_of(&origin).to_string(),
            origin,
            ..Default::default()
        }
    }

    /// Override the relying party id
    pub fn with_rp_id(mut self, rp_id: impl Into<String>) -> Self {
        self.rp_id = rp_id.into();
        self
    }

    /// Set the relying party name
    pub fn with_rp_name(mut self, rp_name: impl Into<String>) -> Self {
        self.rp_name = rp_name.into();
        self
    }

    /// Set the user handle, account name and display name
    pub fn with_user(
        mut self,
        id: impl Into<Vec<u8>>,
        name: impl Into<String>,
        display_name: impl Into<String>,
    ) -> Self {
        self.user_id = id.into();
        self.user_name = name.into();
        self.user_display_name = display_name.into();
        self
    }

    /// Set the algorithm preference order
    pub fn with_algorithms(mut self, algorithms: impl Into<Vec<Algorithm>>) -> Self {
        self.algorithms = algorithms.into();
        self
    }

    /// Set the user verification requirement
    pub fn with_user_verification(mut self, user_verification: UserVerification) -> Self {
        self.user_verification = user_verification;
        self
    }

    /// Set whether credentials must be discoverable
    pub fn with_resident_key(mut self, required: bool) -> Self {
        self.resident_key_required = required;
        self
    }

    /// Set the ceremony timeout
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Enable or disable two-of-two accounts at registration
    pub fn with_multisig(mut self, enabled: bool) -> Self {
        self.multisig = enabled;
        self
    }

    /// Enable or disable compact client data in proofs
    pub fn with_compact_client_data(mut self, enabled: bool) -> Self {
        self.compact_client_data = enabled;
        self
    }

    /// Set the fallback transport hints
    pub fn with_default_transports(mut self, transports: impl Into<Vec<Transport>>) -> Self {
        self.default_transports = transports.into();
        self
    }
}

/// The host part of an origin, without scheme or port.
fn host_of(origin: &str) -> &str {
    let authority = origin
        .split_once("://")
        .map_or(origin, |(_, rest)| rest);
    let authority = authority.split('/').next().unwrap_or(authority);
    match authority.rsplit_once(':') {
        Some((host, port)) if port.chars().all(|c| c.is_ascii_digit()) => host,
        _ => authority,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rp_id_is_the_origin_host() {
        assert_eq!(
            SessionConfig::new("https://wallet.example.com").rp_id,
            "wallet.example.com"
        );
        assert_eq!(SessionConfig::new("http://localhost:5173").rp_id, "localhost");
        assert_eq!(
            SessionConfig::new("https://wallet.example.com/").rp_id,
            "wallet.example.com"
        );
    }

    #[test]
    fn defaults_follow_the_demo_setup() {
        let config = SessionConfig::default();
        assert_eq!(
            config.algorithms,
            vec![Algorithm::EddsaEd25519, Algorithm::EcdsaP256Sha256]
        );
        assert_eq!(config.user_verification, UserVerification::Preferred);
        assert_eq!(config.timeout, Duration::from_secs(60));
        assert!(!config.multisig);
        assert!(!config.compact_client_data);
        assert_eq!(
            config.default_transports,
            vec![Transport::Usb, Transport::Nfc, Transport::Ble]
        );
    }

    #[test]
    fn builders_override_fields() {
        let config = SessionConfig::new("https://a.example")
            .with_rp_id("example")
            .with_algorithms([Algorithm::EcdsaP256Sha256])
            .with_multisig(true)
            .with_compact_client_data(true)
            .with_user(b"alice".to_vec(), "alice", "Alice");
        assert_eq!(config.rp_id, "example");
        assert_eq!(config.algorithms, vec![Algorithm::EcdsaP256Sha256]);
        assert!(config.multisig && config.compact_client_data);
        assert_eq!(config.user_id, b"alice");
    }
}
