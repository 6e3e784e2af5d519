//! Register, discover and sign with a platform credential.

use crate::config::SessionConfig;
use crate::discovery::DiscoverySlot;
use crate::error::{Ceremony, FailureReason};
use crate::platform::{
    CredentialDescriptor, CreationOptions, Mediation, PlatformAuthenticator, RequestOptions,
};
use crate::relying_party::{ChallengeVerification, RegistrationRequest, RelyingParty};
use crate::{LifecycleError, PlatformError};
use passkey_credentials::{Algorithm, Credential, MultisigKeyPair, PublicKey, Signature};
use passkey_proof::{AccountIdentifier, AuthorizationProof, ProofBuilder};
use tokio_util::sync::CancellationToken;

const CHALLENGE_LEN: usize = 32;

/// The outcome of a successful registration.
#[derive(Debug)]
pub struct Registration {
    /// The durable credential record.
    pub credential: Credential,
    /// The generated second key of a two-of-two account. The caller owns it
    /// from here on; the lifecycle keeps no copy.
    pub multisig_key: Option<MultisigKeyPair>,
    /// The account the credential controls.
    pub account: AccountIdentifier,
}

/// Drives the register, login and sign ceremonies of one session.
///
/// The lifecycle owns the platform capability, the relying-party
/// collaborator, the session configuration and the discovery slot. It holds no
/// credential state of its own: callers keep the [`Credential`] returned by
/// [`register`](Self::register) or [`login`](Self::login) and pass it back in
/// to [`sign`](Self::sign).
pub struct CredentialLifecycle<P, R> {
    platform: P,
    relying_party: R,
    config: SessionConfig,
    discovery: DiscoverySlot,
}

impl<P, R> CredentialLifecycle<P, R>
where
    P: PlatformAuthenticator,
    R: RelyingParty,
{
    /// Create a lifecycle over `platform` and `relying_party`.
    pub fn new(platform: P, relying_party: R, config: SessionConfig) -> Self {
        Self {
            platform,
            relying_party,
            config,
            discovery: DiscoverySlot::new(),
        }
    }

    /// The session configuration.
    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// The platform capability.
    pub fn platform(&self) -> &P {
        &self.platform
    }

    /// The relying-party collaborator.
    pub fn relying_party(&self) -> &R {
        &self.relying_party
    }

    /// Whether a discovery attempt is outstanding.
    pub fn is_discovering(&self) -> bool {
        self.discovery.is_active()
    }

    /// Cancel the outstanding discovery attempt, if any.
    pub fn cancel_discovery(&self) -> bool {
        self.discovery.cancel()
    }

    /// Create a new credential and register it with the relying party.
    ///
    /// Any outstanding discovery is cancelled first. Nothing generated during
    /// a failed registration outlives the call.
    pub async fn register(&self) -> Result<Registration, LifecycleError> {
        const CEREMONY: Ceremony = Ceremony::Registration;

        if self.discovery.cancel() {
            tracing::info!("cancelled outstanding discovery before registration");
        }
        tracing::info!(rp_id = %self.config.rp_id, "registration started");

        let options = CreationOptions {
            challenge: random_challenge()?,
            rp_id: self.config.rp_id.clone(),
            rp_name: self.config.rp_name.clone(),
            user_id: self.config.user_id.clone(),
            user_name: self.config.user_name.clone(),
            user_display_name: self.config.user_display_name.clone(),
            algorithms: self.config.algorithms.clone(),
            resident_key_required: self.config.resident_key_required,
            user_verification: self.config.user_verification,
            timeout: self.config.timeout,
        };
        let cancel = CancellationToken::new();
        let created = self
            .platform
            .create(&options, &cancel)
            .await
            .map_err(|e| platform_failure(CEREMONY, &cancel, e))?
            .ok_or_else(|| LifecycleError::failed(CEREMONY, FailureReason::NoCredentialProduced))?;

        let exported = created
            .public_key
            .ok_or_else(|| LifecycleError::failed(CEREMONY, FailureReason::NoPublicKey))?;
        tracing::debug!(
            credential_id = %hex::encode(&created.id),
            exported_key = %hex::encode(&exported),
            algorithm = ?created.algorithm,
            "credential created"
        );
        let public_key = PublicKey::decode_from_wire_format(&exported, created.algorithm)?;
        tracing::debug!(public_key = %public_key, "public key decoded");

        let multisig_key = if self.config.multisig {
            Some(MultisigKeyPair::generate()?)
        } else {
            None
        };

        let mut credential =
            Credential::new(created.id, public_key).with_transports(created.transports);
        if let Some(key) = &multisig_key {
            credential = credential.with_multisig_public_key(key.public_key());
        }

        let request = RegistrationRequest {
            credential_id: credential.id.clone(),
            spki_public_key: exported,
            algorithm: created.algorithm,
            multisig_pub_key: credential
                .multisig_public_key
                .as_ref()
                .map(|key| key.as_bytes().to_vec()),
        };
        self.relying_party
            .register(&request)
            .await
            .map_err(|e| LifecycleError::failed(CEREMONY, FailureReason::RemoteLookupFailed(e)))?;

        let account = AccountIdentifier::from_credential(&credential);
        tracing::info!(
            credential_id = %credential.id_hex(),
            algorithm = %credential.public_key.algorithm(),
            multisig = credential.is_multisig(),
            %account,
            "registration finished"
        );

        Ok(Registration {
            credential,
            multisig_key,
            account,
        })
    }

    /// Discover a credential and fetch its registered key.
    ///
    /// With [`Mediation::Conditional`] the request waits passively in the
    /// platform's autofill UI until the user picks a passkey or the attempt is
    /// cancelled by [`register`](Self::register), another login, or
    /// [`cancel_discovery`](Self::cancel_discovery).
    pub async fn login(&self, mediation: Mediation) -> Result<Credential, LifecycleError> {
        const CEREMONY: Ceremony = Ceremony::Discovery;

        let challenge = random_challenge()?;
        let attempt = self.discovery.begin();
        tracing::info!(mediation = mediation.as_str(), "discovery started");

        let options = RequestOptions {
            challenge,
            rp_id: self.config.rp_id.clone(),
            allow_credentials: Vec::new(),
            user_verification: self.config.user_verification,
            timeout: self.config.timeout,
            mediation,
        };
        let outcome = self.platform.get(&options, attempt.token()).await;
        self.discovery.finish(&attempt);

        let assertion = outcome
            .map_err(|e| platform_failure(CEREMONY, attempt.token(), e))?
            .ok_or_else(|| LifecycleError::failed(CEREMONY, FailureReason::NoCredentialProduced))?;
        tracing::debug!(
            credential_id = %hex::encode(&assertion.credential_id),
            authenticator_data = %hex::encode(&assertion.authenticator_data),
            client_data = %hex::encode(&assertion.client_data_json),
            signature = %hex::encode(&assertion.signature),
            "assertion received"
        );

        let registered = self
            .relying_party
            .verify_challenge(&ChallengeVerification {
                credential_id: assertion.credential_id.clone(),
                authenticator_data: assertion.authenticator_data,
                client_data_json: assertion.client_data_json,
                signature: assertion.signature,
            })
            .await
            .map_err(|e| LifecycleError::failed(CEREMONY, FailureReason::RemoteLookupFailed(e)))?;

        let public_key =
            PublicKey::decode_from_wire_format(&registered.spki_public_key, registered.algorithm)?;
        let mut credential = Credential::new(assertion.credential_id, public_key)
            .with_transports(assertion.transports);
        if let Some(second) = &registered.multisig_pub_key {
            credential = credential.with_multisig_public_key(PublicKey::from_bytes(
                Algorithm::EddsaEd25519,
                second,
            )?);
        }

        tracing::info!(
            credential_id = %credential.id_hex(),
            algorithm = %credential.public_key.algorithm(),
            multisig = credential.is_multisig(),
            "discovery finished"
        );
        Ok(credential)
    }

    /// Have the platform sign `tx_hash` with `credential` and build the
    /// authorization proof.
    pub async fn authorize(
        &self,
        credential: &Credential,
        tx_hash: &[u8],
    ) -> Result<AuthorizationProof, LifecycleError> {
        const CEREMONY: Ceremony = Ceremony::Signing;

        tracing::info!(credential_id = %credential.id_hex(), "signing started");

        let transports = match &credential.transports {
            Some(transports) if !transports.is_empty() => transports.clone(),
            _ => self.config.default_transports.clone(),
        };
        let options = RequestOptions {
            challenge: tx_hash.to_vec(),
            rp_id: self.config.rp_id.clone(),
            allow_credentials: vec![CredentialDescriptor {
                id: credential.id.clone(),
                transports,
            }],
            user_verification: self.config.user_verification,
            timeout: self.config.timeout,
            mediation: Mediation::Optional,
        };
        let cancel = CancellationToken::new();
        let assertion = self
            .platform
            .get(&options, &cancel)
            .await
            .map_err(|e| platform_failure(CEREMONY, &cancel, e))?
            .ok_or_else(|| LifecycleError::failed(CEREMONY, FailureReason::NoCredentialProduced))?;
        tracing::debug!(
            authenticator_data = %hex::encode(&assertion.authenticator_data),
            client_data = %hex::encode(&assertion.client_data_json),
            signature = %hex::encode(&assertion.signature),
            "assertion received"
        );

        let algorithm = credential.public_key.algorithm();
        let signature =
            Signature::decode_from_assertion(&assertion.signature, Some(algorithm.cose_identifier()))?;
        tracing::debug!(signature = %hex::encode(signature.as_bytes()), "signature decoded");

        let builder = if self.config.compact_client_data {
            ProofBuilder::compact(self.config.origin.clone(), tx_hash)
        } else {
            ProofBuilder::new()
        };
        let proof = match credential.multisig_public_key {
            Some(second) => builder.build_multi_sig(
                credential.public_key,
                [credential.public_key, second],
                signature,
                &assertion.authenticator_data,
                &assertion.client_data_json,
            )?,
            None => builder.build_single_sig(
                credential.public_key,
                signature,
                &assertion.authenticator_data,
                &assertion.client_data_json,
            )?,
        };

        tracing::info!(account = %proof.account(), "signing finished");
        Ok(proof)
    }

    /// Sign `tx_hash` and serialize the proof for embedding in the
    /// transaction.
    pub async fn sign(
        &self,
        credential: &Credential,
        tx_hash: &[u8],
    ) -> Result<Vec<u8>, LifecycleError> {
        let proof = self.authorize(credential, tx_hash).await?.to_bytes();
        tracing::debug!(proof = %hex::encode(&proof), "proof serialized");
        Ok(proof)
    }
}

fn random_challenge() -> Result<Vec<u8>, LifecycleError> {
    let mut challenge = vec![0u8; CHALLENGE_LEN];
    getrandom::getrandom(&mut challenge)?;
    Ok(challenge)
}

/// Dismissal and abort both surface as cancellation; the platform reports
/// either when the user closes the prompt.
fn platform_failure(
    ceremony: Ceremony,
    cancel: &CancellationToken,
    error: PlatformError,
) -> LifecycleError {
    if cancel.is_cancelled() {
        return LifecycleError::PlatformCancelled(ceremony);
    }
    match error {
        PlatformError::Aborted | PlatformError::NotAllowed(_) => {
            tracing::info!(%ceremony, %error, "ceremony cancelled on the platform");
            LifecycleError::PlatformCancelled(ceremony)
        }
        error => {
            tracing::warn!(%ceremony, %error, "platform failure");
            LifecycleError::Platform(ceremony, error)
        }
    }
}
