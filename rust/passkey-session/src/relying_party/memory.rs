//! In-memory relying party for testing

use std::collections::HashMap;
use std::sync::Arc;

use passkey_credentials::{PublicKey, Signature};
use tokio::sync::RwLock;

use super::{ChallengeVerification, RegisteredKey, RegistrationRequest, RelyingParty};
use crate::RelyingPartyError;

/// In-memory relying party.
///
/// Clones share one registry, so a lifecycle and a test can observe the same
/// registrations. Assertions are checked against the registered key before
/// the key is handed back.
///
/// # Examples
///
/// ```
/// use passkey_session::{MemoryRelyingParty, RelyingParty, RegistrationRequest};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let relying_party = MemoryRelyingParty::new();
/// let observer = relying_party.clone();
///
/// relying_party
///     .register(&RegistrationRequest {
///         credential_id: vec![1, 2, 3],
///         spki_public_key: vec![0; 32],
///         algorithm: Some(-8),
///         multisig_pub_key: None,
///     })
///     .await?;
///
/// assert!(observer.lookup(&[1, 2, 3]).await.is_some());
/// # Ok(())
/// # }
/// ```
#[derive(Clone, Default)]
pub struct MemoryRelyingParty {
    keys: Arc<RwLock<HashMap<Vec<u8>, RegisteredKey>>>,
}

impl MemoryRelyingParty {
    /// Create an empty relying party
    pub fn new() -> Self {
        Self::default()
    }

    /// The key registered for `credential_id`, if any
    pub async fn lookup(&self, credential_id: &[u8]) -> Option<RegisteredKey> {
        self.keys.read().await.get(credential_id).cloned()
    }

    /// Number of registered credentials
    pub async fn len(&self) -> usize {
        self.keys.read().await.len()
    }

    /// Whether nothing has been registered yet
    pub async fn is_empty(&self) -> bool {
        self.keys.read().await.is_empty()
    }

    /// Forget a registration
    pub async fn remove(&self, credential_id: &[u8]) -> Option<RegisteredKey> {
        self.keys.write().await.remove(credential_id)
    }
}

fn bad_request(reason: impl std::fmt::Display) -> RelyingPartyError {
    RelyingPartyError::Rejected {
        status: 400,
        body: reason.to_string(),
    }
}

impl RelyingParty for MemoryRelyingParty {
    async fn register(&self, request: &RegistrationRequest) -> Result<(), RelyingPartyError> {
        PublicKey::decode_from_wire_format(&request.spki_public_key, request.algorithm)
            .map_err(bad_request)?;

        let mut keys = self.keys.write().await;
        if keys.contains_key(&request.credential_id) {
            return Err(RelyingPartyError::Rejected {
                status: 409,
                body: "credential already registered".to_string(),
            });
        }
        keys.insert(request.credential_id.clone(), RegisteredKey::from(request));
        Ok(())
    }

    async fn verify_challenge(
        &self,
        verification: &ChallengeVerification,
    ) -> Result<RegisteredKey, RelyingPartyError> {
        let registered = self
            .lookup(&verification.credential_id)
            .await
            .ok_or(RelyingPartyError::UnknownCredential)?;

        let public_key =
            PublicKey::decode_from_wire_format(&registered.spki_public_key, registered.algorithm)
                .map_err(bad_request)?;
        let signature = Signature::decode_from_assertion(
            &verification.signature,
            Some(public_key.algorithm().cose_identifier()),
        )
        .map_err(bad_request)?;

        passkey_proof::verify_assertion(
            &public_key,
            &signature,
            &verification.authenticator_data,
            &verification.client_data_json,
        )
        .map_err(|e| RelyingPartyError::Rejected {
            status: 401,
            body: e.to_string(),
        })?;

        Ok(registered)
    }
}
