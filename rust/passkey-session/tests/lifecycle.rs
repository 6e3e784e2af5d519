//! Lifecycle integration tests.
//!
//! Every ceremony runs against the in-process [`SoftwareAuthenticator`] and
//! the [`MemoryRelyingParty`], so proofs are produced from the same byte
//! shapes a browser hands back and checked the way a chain would check them.

use passkey_session::{
    AccountIdentifier, Algorithm, AuthorizationProof, Ceremony, ChallengeVerification,
    ClientDataStyle, CredentialLifecycle, FailureReason, LifecycleError, Mediation,
    MemoryRelyingParty, RegisteredKey, RegistrationRequest, RelyingParty, RelyingPartyError,
    SessionConfig, SoftwareAuthenticator,
};
use passkey_proof::{ClientDataPayload, ProofKind, SignerPosition};
use pretty_assertions::assert_eq;
use testresult::TestResult;

const ORIGIN: &str = "https://wallet.example.com";
const TX_HASH: [u8; 32] = [0x42; 32];

fn lifecycle(
    authenticator: SoftwareAuthenticator,
    config: SessionConfig,
) -> CredentialLifecycle<SoftwareAuthenticator, MemoryRelyingParty> {
    CredentialLifecycle::new(authenticator, MemoryRelyingParty::new(), config)
}

#[tokio::test]
async fn it_registers_and_signs_with_each_algorithm() -> TestResult {
    for algorithm in [Algorithm::EddsaEd25519, Algorithm::EcdsaP256Sha256] {
        let lifecycle = lifecycle(
            SoftwareAuthenticator::new(ORIGIN),
            SessionConfig::new(ORIGIN).with_algorithms([algorithm]),
        );

        let registration = lifecycle.register().await?;
        assert_eq!(registration.credential.public_key.algorithm(), algorithm);
        assert!(registration.multisig_key.is_none());
        assert_eq!(
            registration.account,
            AccountIdentifier::from_single_key(&registration.credential.public_key)
        );

        let bytes = lifecycle.sign(&registration.credential, &TX_HASH).await?;
        let proof = AuthorizationProof::from_bytes(&bytes)?;
        proof.verify(&TX_HASH, ORIGIN)?;
        assert_eq!(proof.kind, ProofKind::SingleSig);
        assert_eq!(proof.account(), registration.account);
    }
    Ok(())
}

#[tokio::test]
async fn it_prefers_eddsa_when_the_platform_supports_both() -> TestResult {
    let lifecycle = lifecycle(SoftwareAuthenticator::new(ORIGIN), SessionConfig::new(ORIGIN));
    let registration = lifecycle.register().await?;
    assert_eq!(
        registration.credential.public_key.algorithm(),
        Algorithm::EddsaEd25519
    );

    let fallback = self::lifecycle(
        SoftwareAuthenticator::new(ORIGIN).with_algorithms([Algorithm::EcdsaP256Sha256]),
        SessionConfig::new(ORIGIN),
    );
    let registration = fallback.register().await?;
    assert_eq!(
        registration.credential.public_key.algorithm(),
        Algorithm::EcdsaP256Sha256
    );
    Ok(())
}

#[tokio::test]
async fn it_registers_the_platform_export_with_the_relying_party() -> TestResult {
    let lifecycle = lifecycle(SoftwareAuthenticator::new(ORIGIN), SessionConfig::new(ORIGIN));
    let registration = lifecycle.register().await?;

    let registered = lifecycle
        .relying_party()
        .lookup(&registration.credential.id)
        .await
        .ok_or("credential was not registered")?;
    assert_eq!(registered.algorithm, Some(-8));
    assert_eq!(registered.spki_public_key.len(), 44);
    assert_eq!(registered.multisig_pub_key, None);
    Ok(())
}

#[tokio::test]
async fn login_recovers_the_registered_credential() -> TestResult {
    let lifecycle = lifecycle(
        SoftwareAuthenticator::new(ORIGIN),
        SessionConfig::new(ORIGIN).with_multisig(true),
    );
    let registration = lifecycle.register().await?;

    let credential = lifecycle.login(Mediation::Optional).await?;
    assert_eq!(credential, registration.credential);
    assert!(!lifecycle.is_discovering());

    let proof = lifecycle.authorize(&credential, &TX_HASH).await?;
    proof.verify(&TX_HASH, ORIGIN)?;
    assert_eq!(proof.account(), registration.account);
    Ok(())
}

#[tokio::test]
async fn multisig_accounts_depend_on_key_order() -> TestResult {
    let lifecycle = lifecycle(
        SoftwareAuthenticator::new(ORIGIN),
        SessionConfig::new(ORIGIN).with_multisig(true),
    );
    let registration = lifecycle.register().await?;

    let multisig_key = registration
        .multisig_key
        .as_ref()
        .ok_or("no multisig key generated")?;
    let (first, second) = (
        registration.credential.public_key,
        multisig_key.public_key(),
    );
    assert_eq!(registration.credential.multisig_public_key, Some(second));
    assert_eq!(
        registration.account,
        AccountIdentifier::from_multisig(&first, &second)
    );
    assert_ne!(
        registration.account,
        AccountIdentifier::from_multisig(&second, &first)
    );

    let proof = lifecycle.authorize(&registration.credential, &TX_HASH).await?;
    proof.verify(&TX_HASH, ORIGIN)?;
    assert_eq!(
        proof.kind,
        ProofKind::MultiSig {
            cosigner: second,
            signer_position: SignerPosition::First,
        }
    );
    assert_eq!(proof.account(), registration.account);
    Ok(())
}

#[tokio::test]
async fn registration_cancels_a_pending_conditional_login() -> TestResult {
    let lifecycle = lifecycle(
        SoftwareAuthenticator::new(ORIGIN).with_held_conditional_requests(true),
        SessionConfig::new(ORIGIN),
    );

    let (login, registration) = tokio::join!(
        lifecycle.login(Mediation::Conditional),
        lifecycle.register()
    );

    assert!(matches!(
        login,
        Err(LifecycleError::PlatformCancelled(Ceremony::Discovery))
    ));
    assert!(login.is_err_and(|e| e.is_user_action_needed()));
    registration?;
    assert!(!lifecycle.is_discovering());
    Ok(())
}

#[tokio::test]
async fn a_new_login_supersedes_a_pending_one() -> TestResult {
    let lifecycle = lifecycle(
        SoftwareAuthenticator::new(ORIGIN).with_held_conditional_requests(true),
        SessionConfig::new(ORIGIN),
    );
    let registration = lifecycle.register().await?;

    let (pending, explicit) = tokio::join!(lifecycle.login(Mediation::Conditional), async {
        tokio::task::yield_now().await;
        lifecycle.login(Mediation::Optional).await
    });

    assert!(matches!(
        pending,
        Err(LifecycleError::PlatformCancelled(Ceremony::Discovery))
    ));
    assert_eq!(explicit?, registration.credential);
    Ok(())
}

#[tokio::test]
async fn cancel_discovery_ends_a_pending_login() {
    let lifecycle = lifecycle(
        SoftwareAuthenticator::new(ORIGIN).with_held_conditional_requests(true),
        SessionConfig::new(ORIGIN),
    );

    let (login, cancelled) = tokio::join!(lifecycle.login(Mediation::Conditional), async {
        tokio::task::yield_now().await;
        lifecycle.cancel_discovery()
    });

    assert!(cancelled);
    assert!(matches!(
        login,
        Err(LifecycleError::PlatformCancelled(Ceremony::Discovery))
    ));
    assert!(!lifecycle.cancel_discovery());
}

#[tokio::test]
async fn unknown_credentials_fail_discovery_verbatim() -> TestResult {
    let lifecycle = lifecycle(SoftwareAuthenticator::new(ORIGIN), SessionConfig::new(ORIGIN));
    let registration = lifecycle.register().await?;
    lifecycle
        .relying_party()
        .remove(&registration.credential.id)
        .await;

    let result = lifecycle.login(Mediation::Optional).await;
    assert!(matches!(
        result,
        Err(LifecycleError::DiscoveryFailed(
            FailureReason::RemoteLookupFailed(RelyingPartyError::UnknownCredential)
        ))
    ));
    assert!(!result.is_err_and(|e| e.is_user_action_needed()));
    Ok(())
}

#[tokio::test]
async fn declined_ceremonies_need_user_action() -> TestResult {
    let lifecycle = lifecycle(
        SoftwareAuthenticator::new(ORIGIN).declining(),
        SessionConfig::new(ORIGIN),
    );

    let result = lifecycle.register().await;
    assert!(matches!(
        result,
        Err(LifecycleError::RegistrationFailed(
            FailureReason::NoCredentialProduced
        ))
    ));
    assert!(result.is_err_and(|e| e.is_user_action_needed()));

    let result = lifecycle.login(Mediation::Optional).await;
    assert!(matches!(
        result,
        Err(LifecycleError::DiscoveryFailed(
            FailureReason::NoCredentialProduced
        ))
    ));
    assert!(lifecycle.relying_party().is_empty().await);
    Ok(())
}

#[tokio::test]
async fn missing_public_key_fails_registration() {
    let lifecycle = lifecycle(
        SoftwareAuthenticator::new(ORIGIN).without_public_key_export(),
        SessionConfig::new(ORIGIN),
    );

    let result = lifecycle.register().await;
    assert!(matches!(
        result,
        Err(LifecycleError::RegistrationFailed(FailureReason::NoPublicKey))
    ));
    assert!(lifecycle.relying_party().is_empty().await);
}

#[tokio::test]
async fn signing_with_an_unknown_credential_produces_nothing() -> TestResult {
    let registrar = lifecycle(SoftwareAuthenticator::new(ORIGIN), SessionConfig::new(ORIGIN));
    let registration = registrar.register().await?;

    let other_device = lifecycle(SoftwareAuthenticator::new(ORIGIN), SessionConfig::new(ORIGIN));
    let result = other_device.sign(&registration.credential, &TX_HASH).await;
    assert!(matches!(
        result,
        Err(LifecycleError::SigningFailed(
            FailureReason::NoCredentialProduced
        ))
    ));
    Ok(())
}

#[tokio::test]
async fn compact_client_data_shrinks_proofs() -> TestResult {
    let styles = [
        ClientDataStyle::default(),
        ClientDataStyle {
            extra_fields: Some(passkey_session::platform::software::CHROME_EXTRA_FIELD.into()),
            ..ClientDataStyle::default()
        },
        ClientDataStyle {
            cross_origin_field: false,
            escape_origin_slashes: true,
            extra_fields: None,
        },
    ];

    for style in styles {
        let full = lifecycle(
            SoftwareAuthenticator::new(ORIGIN).with_client_data_style(style.clone()),
            SessionConfig::new(ORIGIN),
        );
        let registration = full.register().await?;
        let full_proof = full.authorize(&registration.credential, &TX_HASH).await?;
        assert!(matches!(full_proof.client_data, ClientDataPayload::Full(_)));

        let compact = CredentialLifecycle::new(
            SoftwareAuthenticator::new(ORIGIN).with_client_data_style(style),
            full.relying_party().clone(),
            SessionConfig::new(ORIGIN).with_compact_client_data(true),
        );
        let registration = compact.register().await?;
        let compact_proof = compact.authorize(&registration.credential, &TX_HASH).await?;
        assert!(matches!(
            compact_proof.client_data,
            ClientDataPayload::Compact(_)
        ));
        compact_proof.verify(&TX_HASH, ORIGIN)?;
        assert!(compact_proof.to_bytes().len() < full_proof.to_bytes().len());

        let decoded = AuthorizationProof::from_bytes(&compact_proof.to_bytes())?;
        decoded.verify(&TX_HASH, ORIGIN)?;
    }
    Ok(())
}

#[tokio::test]
async fn der_encoded_ed25519_signatures_are_normalized() -> TestResult {
    let lifecycle = lifecycle(
        SoftwareAuthenticator::new(ORIGIN)
            .with_algorithms([Algorithm::EddsaEd25519])
            .with_der_ed25519(true),
        SessionConfig::new(ORIGIN),
    );
    let registration = lifecycle.register().await?;

    let credential = lifecycle.login(Mediation::Optional).await?;
    let proof = lifecycle.authorize(&credential, &TX_HASH).await?;
    proof.verify(&TX_HASH, ORIGIN)?;
    assert_eq!(proof.account(), registration.account);
    Ok(())
}

/// Accepts nothing.
struct RejectingRelyingParty;

impl RelyingParty for RejectingRelyingParty {
    async fn register(&self, _request: &RegistrationRequest) -> Result<(), RelyingPartyError> {
        Err(RelyingPartyError::Rejected {
            status: 503,
            body: "registrations are closed".into(),
        })
    }

    async fn verify_challenge(
        &self,
        _verification: &ChallengeVerification,
    ) -> Result<RegisteredKey, RelyingPartyError> {
        Err(RelyingPartyError::Transport("connection reset".into()))
    }
}

#[tokio::test]
async fn remote_rejection_fails_registration() {
    let lifecycle = CredentialLifecycle::new(
        SoftwareAuthenticator::new(ORIGIN),
        RejectingRelyingParty,
        SessionConfig::new(ORIGIN).with_multisig(true),
    );

    let result = lifecycle.register().await;
    match result {
        Err(LifecycleError::RegistrationFailed(FailureReason::RemoteLookupFailed(
            RelyingPartyError::Rejected { status, body },
        ))) => {
            assert_eq!(status, 503);
            assert_eq!(body, "registrations are closed");
        }
        other => panic!("unexpected registration outcome: {other:?}"),
    }
}
