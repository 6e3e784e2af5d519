//! An in-process authenticator.
//!
//! [`SoftwareAuthenticator`] keeps its keys in memory and emits the same byte
//! shapes a browser does: SPKI public key exports, DER-encoded ECDSA
//! signatures, raw (or, when configured, DER-encoded) Ed25519 signatures and
//! Chrome-style `clientDataJSON`. It drives the lifecycle outside a browser
//! and in tests.

use super::{
    Assertion, CreationOptions, Mediation, NewCredential, PlatformAuthenticator, RequestOptions,
    UserVerification,
};
use crate::PlatformError;
use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use parking_lot::Mutex;
use passkey_credentials::{Algorithm, PublicKey, Signature, Transport};
use sha2::{Digest, Sha256};
use tokio_util::sync::CancellationToken;

const FLAG_USER_PRESENT: u8 = 0x01;
const FLAG_USER_VERIFIED: u8 = 0x04;

/// Chrome appends this member to a random subset of client data objects.
pub const CHROME_EXTRA_FIELD: &str = r#""other_keys_can_be_added_here":"do not compare clientDataJSON against a template. See https://goo.gl/yabPex""#;

/// Shape of the `clientDataJSON` the authenticator emits.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientDataStyle {
    /// Emit `"crossOrigin":false` after the origin.
    pub cross_origin_field: bool,
    /// Escape `/` in the origin as `\/`.
    pub escape_origin_slashes: bool,
    /// Members appended after the known ones.
    pub extra_fields: Option<String>,
}

impl Default for ClientDataStyle {
    fn default() -> Self {
        Self {
            cross_origin_field: true,
            escape_origin_slashes: false,
            extra_fields: None,
        }
    }
}

impl ClientDataStyle {
    fn render(&self, kind: &str, challenge: &[u8], origin: &str) -> String {
        let origin = if self.escape_origin_slashes {
            origin.replace('/', r"\/")
        } else {
            origin.to_string()
        };
        let mut json = format!(
            r#"{{"type":"{kind}","challenge":"{}","origin":"{origin}""#,
            URL_SAFE_NO_PAD.encode(challenge)
        );
        if self.cross_origin_field {
            json.push_str(r#","crossOrigin":false"#);
        }
        if let Some(extra) = &self.extra_fields {
            json.push(',');
            json.push_str(extra);
        }
        json.push('}');
        json
    }
}

enum SoftwareKey {
    EcdsaP256(p256::ecdsa::SigningKey),
    Ed25519(ed25519_dalek::SigningKey),
}

impl SoftwareKey {
    fn generate(algorithm: Algorithm) -> Result<Self, PlatformError> {
        let mut seed = [0u8; 32];
        getrandom::getrandom(&mut seed).map_err(|e| PlatformError::Other(e.to_string()))?;
        Ok(match algorithm {
            Algorithm::EcdsaP256Sha256 => Self::EcdsaP256(
                p256::ecdsa::SigningKey::from_bytes(&seed.into())
                    .map_err(|e| PlatformError::Other(e.to_string()))?,
            ),
            Algorithm::EddsaEd25519 => Self::Ed25519(ed25519_dalek::SigningKey::from_bytes(&seed)),
        })
    }

    fn public_key(&self) -> PublicKey {
        match self {
            Self::EcdsaP256(key) => PublicKey::from(key.verifying_key()),
            Self::Ed25519(key) => PublicKey::from(&key.verifying_key()),
        }
    }

    fn sign(&self, message: &[u8], der_ed25519: bool) -> Vec<u8> {
        match self {
            Self::EcdsaP256(key) => {
                let sig: p256::ecdsa::Signature = p256::ecdsa::signature::Signer::sign(key, message);
                sig.to_der().as_bytes().to_vec()
            }
            Self::Ed25519(key) => {
                let sig = Signature::from(ed25519_dalek::Signer::sign(key, message));
                if der_ed25519 {
                    sig.to_der()
                } else {
                    sig.as_bytes().to_vec()
                }
            }
        }
    }
}

struct StoredCredential {
    id: Vec<u8>,
    rp_id: String,
    user_handle: Vec<u8>,
    key: SoftwareKey,
    sign_count: u32,
}

/// An authenticator that lives in process memory.
pub struct SoftwareAuthenticator {
    origin: String,
    algorithms: Vec<Algorithm>,
    transports: Vec<Transport>,
    client_data: ClientDataStyle,
    der_ed25519: bool,
    hold_conditional: bool,
    omit_public_key: bool,
    declining: bool,
    credentials: Mutex<Vec<StoredCredential>>,
}

impl SoftwareAuthenticator {
    /// An authenticator for `origin` supporting both algorithms.
    pub fn new(origin: impl Into<String>) -> Self {
        Self {
            origin: origin.into(),
            algorithms: vec![Algorithm::EddsaEd25519, Algorithm::EcdsaP256Sha256],
            transports: vec![Transport::Internal],
            client_data: ClientDataStyle::default(),
            der_ed25519: false,
            hold_conditional: false,
            omit_public_key: false,
            declining: false,
            credentials: Mutex::new(Vec::new()),
        }
    }

    /// Restrict the algorithms this authenticator can create keys for.
    pub fn with_algorithms(mut self, algorithms: impl Into<Vec<Algorithm>>) -> Self {
        self.algorithms = algorithms.into();
        self
    }

    /// Set the transports reported for new credentials.
    pub fn with_transports(mut self, transports: impl Into<Vec<Transport>>) -> Self {
        self.transports = transports.into();
        self
    }

    /// Set the shape of emitted client data.
    pub fn with_client_data_style(mut self, style: ClientDataStyle) -> Self {
        self.client_data = style;
        self
    }

    /// Emit Ed25519 signatures DER-encoded, as some vendors do.
    pub fn with_der_ed25519(mut self, enabled: bool) -> Self {
        self.der_ed25519 = enabled;
        self
    }

    /// Keep conditional requests pending until they are cancelled, the way a
    /// browser waits for the user to pick a passkey from autofill.
    pub fn with_held_conditional_requests(mut self, enabled: bool) -> Self {
        self.hold_conditional = enabled;
        self
    }

    /// Create credentials without exporting their public key.
    pub fn without_public_key_export(mut self) -> Self {
        self.omit_public_key = true;
        self
    }

    /// Finish every ceremony without a result, as when the user closes the
    /// prompt on some platforms.
    pub fn declining(mut self) -> Self {
        self.declining = true;
        self
    }

    /// Number of credentials created so far.
    pub fn credential_count(&self) -> usize {
        self.credentials.lock().len()
    }

    /// The public key of a stored credential.
    pub fn public_key(&self, credential_id: &[u8]) -> Option<PublicKey> {
        self.credentials
            .lock()
            .iter()
            .find(|c| c.id == credential_id)
            .map(|c| c.key.public_key())
    }

    fn authenticator_data(
        rp_id: &str,
        user_verification: UserVerification,
        sign_count: u32,
    ) -> Vec<u8> {
        let mut flags = FLAG_USER_PRESENT;
        if user_verification != UserVerification::Discouraged {
            flags |= FLAG_USER_VERIFIED;
        }
        let mut data = Sha256::digest(rp_id.as_bytes()).to_vec();
        data.push(flags);
        data.extend_from_slice(&sign_count.to_be_bytes());
        data
    }
}

impl PlatformAuthenticator for SoftwareAuthenticator {
    async fn create(
        &self,
        options: &CreationOptions,
        cancel: &CancellationToken,
    ) -> Result<Option<NewCredential>, PlatformError> {
        if cancel.is_cancelled() {
            return Err(PlatformError::Aborted);
        }
        if self.declining {
            return Ok(None);
        }

        let algorithm = options
            .algorithms
            .iter()
            .copied()
            .find(|a| self.algorithms.contains(a))
            .ok_or_else(|| {
                PlatformError::NotAllowed("no requested algorithm is supported".into())
            })?;
        let key = SoftwareKey::generate(algorithm)?;
        let public_key = key
            .public_key()
            .to_spki()
            .map_err(|e| PlatformError::Other(e.to_string()))?;

        let mut id = vec![0u8; 16];
        getrandom::getrandom(&mut id).map_err(|e| PlatformError::Other(e.to_string()))?;

        self.credentials.lock().push(StoredCredential {
            id: id.clone(),
            rp_id: options.rp_id.clone(),
            user_handle: options.user_id.clone(),
            key,
            sign_count: 0,
        });

        Ok(Some(NewCredential {
            id,
            public_key: (!self.omit_public_key).then_some(public_key),
            algorithm: Some(algorithm.cose_identifier()),
            transports: self.transports.clone(),
        }))
    }

    async fn get(
        &self,
        options: &RequestOptions,
        cancel: &CancellationToken,
    ) -> Result<Option<Assertion>, PlatformError> {
        if cancel.is_cancelled() {
            return Err(PlatformError::Aborted);
        }
        if options.mediation == Mediation::Conditional && self.hold_conditional {
            cancel.cancelled().await;
            return Err(PlatformError::Aborted);
        }
        if self.declining {
            return Ok(None);
        }

        let client_data_json = self
            .client_data
            .render("webauthn.get", &options.challenge, &self.origin)
            .into_bytes();

        let mut credentials = self.credentials.lock();
        let Some(credential) = credentials.iter_mut().find(|c| {
            c.rp_id == options.rp_id
                && (options.allow_credentials.is_empty()
                    || options.allow_credentials.iter().any(|d| d.id == c.id))
        }) else {
            return Ok(None);
        };

        credential.sign_count += 1;
        let authenticator_data = Self::authenticator_data(
            &credential.rp_id,
            options.user_verification,
            credential.sign_count,
        );
        let message = passkey_proof::verify::signed_data(&authenticator_data, &client_data_json);

        Ok(Some(Assertion {
            credential_id: credential.id.clone(),
            authenticator_data,
            signature: credential.key.sign(&message, self.der_ed25519),
            client_data_json,
            user_handle: Some(credential.user_handle.clone()),
            transports: self.transports.clone(),
        }))
    }
}
