//! WebAuthn assertion verification.
//!
//! An authenticator signs `authenticatorData || SHA-256(clientDataJSON)`.
//! Verification rebuilds that message and checks it against the normalized
//! key and signature, for either supported algorithm.

use crate::VerifyError;
use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use passkey_credentials::{PublicKey, Signature};
use serde::Deserialize;
use sha2::{Digest, Sha256};

/// RP ID hash, flags and signature counter.
pub const MIN_AUTHENTICATOR_DATA_LEN: usize = 37;

/// The ceremony type an assertion's client data must carry.
pub const ASSERTION_TYPE: &str = "webauthn.get";

#[derive(Deserialize)]
struct ClientData {
    #[serde(rename = "type")]
    kind: String,
    challenge: String,
    origin: String,
}

/// The message an authenticator signs for an assertion.
#[must_use]
pub fn signed_data(authenticator_data: &[u8], client_data_json: &[u8]) -> Vec<u8> {
    let client_data_hash = Sha256::digest(client_data_json);
    let mut signed = Vec::with_capacity(authenticator_data.len() + client_data_hash.len());
    signed.extend_from_slice(authenticator_data);
    signed.extend_from_slice(&client_data_hash);
    signed
}

/// Verify an assertion signature against `public_key`.
///
/// # Errors
///
/// Returns [`VerifyError::InvalidAuthenticatorData`] if the authenticator
/// data is shorter than its fixed header, or
/// [`VerifyError::InvalidSignature`] if the signature does not verify.
pub fn verify_assertion(
    public_key: &PublicKey,
    signature: &Signature,
    authenticator_data: &[u8],
    client_data_json: &[u8],
) -> Result<(), VerifyError> {
    if authenticator_data.len() < MIN_AUTHENTICATOR_DATA_LEN {
        return Err(VerifyError::InvalidAuthenticatorData);
    }
    let message = signed_data(authenticator_data, client_data_json);

    match (public_key, signature) {
        (PublicKey::EcdsaP256(point), Signature::EcdsaP256(raw)) => {
            use p256::ecdsa::signature::Verifier as _;
            let key = p256::ecdsa::VerifyingKey::from_sec1_bytes(point)
                .map_err(|e| VerifyError::InvalidSignature(e.to_string()))?;
            let sig = p256::ecdsa::Signature::from_slice(raw)
                .map_err(|e| VerifyError::InvalidSignature(e.to_string()))?;
            key.verify(&message, &sig)
                .map_err(|e| VerifyError::InvalidSignature(e.to_string()))
        }
        (PublicKey::Ed25519(bytes), Signature::Ed25519(raw)) => {
            let key = ed25519_dalek::VerifyingKey::from_bytes(bytes)
                .map_err(|e| VerifyError::InvalidSignature(e.to_string()))?;
            key.verify_strict(&message, &ed25519_dalek::Signature::from_bytes(raw))
                .map_err(|e| VerifyError::InvalidSignature(e.to_string()))
        }
        (key, sig) => Err(VerifyError::InvalidSignature(format!(
            "{} signature cannot verify against a {} key",
            sig.algorithm(),
            key.algorithm()
        ))),
    }
}

/// Check that `client_data_json` describes an assertion for `challenge`
/// issued by `origin`.
///
/// # Errors
///
/// Returns [`VerifyError::InvalidClientData`] if the JSON is malformed or not
/// an assertion, [`VerifyError::ChallengeMismatch`] or
/// [`VerifyError::OriginMismatch`] if it names a different challenge or origin.
pub fn verify_client_data(
    client_data_json: &[u8],
    challenge: &[u8],
    origin: &str,
) -> Result<(), VerifyError> {
    let client_data: ClientData = serde_json::from_slice(client_data_json)
        .map_err(|e| VerifyError::InvalidClientData(e.to_string()))?;
    if client_data.kind != ASSERTION_TYPE {
        return Err(VerifyError::InvalidClientData(format!(
            "expected type {ASSERTION_TYPE}, found {}",
            client_data.kind
        )));
    }

    let found = URL_SAFE_NO_PAD
        .decode(&client_data.challenge)
        .map_err(|e| VerifyError::InvalidClientData(e.to_string()))?;
    if found != challenge {
        return Err(VerifyError::ChallengeMismatch);
    }

    if client_data.origin != origin {
        return Err(VerifyError::OriginMismatch {
            expected: origin.to_owned(),
            found: client_data.origin,
        });
    }
    Ok(())
}
