//! REST relying party

use reqwest::Client;
use serde::Serialize;

use super::{ChallengeVerification, RegisteredKey, RegistrationRequest, RelyingParty};
use crate::RelyingPartyError;

/// Body the service answers a successful registration with.
const REGISTRATION_ACCEPTED: &str = "OK";

/// Authentication methods for the REST relying party
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum AuthMethod {
    /// No authentication
    None,

    /// Bearer token authentication
    ///
    /// Includes `Authorization: Bearer {token}` header in all requests
    Bearer(String),
}

/// Configuration for the REST relying party
#[derive(Clone, Debug)]
pub struct RestRelyingPartyConfig {
    /// Base URL of the service (e.g., "https://api.example.com/webauthn")
    pub endpoint: String,

    /// Authentication method
    pub auth_method: AuthMethod,

    /// Optional timeout for requests in seconds (default: 30)
    pub timeout_seconds: Option<u64>,

    /// Optional custom headers to send with each request
    pub headers: Vec<(String, String)>,
}

impl Default for RestRelyingPartyConfig {
    fn default() -> Self {
        Self {
            endpoint: "http://localhost:8080".to_string(),
            auth_method: AuthMethod::None,
            timeout_seconds: Some(30),
            headers: Vec::new(),
        }
    }
}

impl RestRelyingPartyConfig {
    /// Create a new configuration for `endpoint`
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            ..Default::default()
        }
    }

    /// Set the authentication method
    pub fn with_auth(mut self, auth_method: AuthMethod) -> Self {
        self.auth_method = auth_method;
        self
    }

    /// Set the request timeout
    pub fn with_timeout(mut self, seconds: u64) -> Self {
        self.timeout_seconds = Some(seconds);
        self
    }

    /// Add a custom header
    pub fn with_header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((key.into(), value.into()));
        self
    }
}

/// Relying party reached over HTTP.
///
/// - POST `{endpoint}/register` with a [`RegistrationRequest`]; the service
///   answers `OK`
/// - POST `{endpoint}/verify` with a [`ChallengeVerification`]; the service
///   answers with a [`RegisteredKey`]
///
/// Any other answer is surfaced as a [`RelyingPartyError`] carrying the
/// status and body the service returned.
///
/// # Examples
///
/// ```no_run
/// use passkey_session::{AuthMethod, RestRelyingParty, RestRelyingPartyConfig};
///
/// let config = RestRelyingPartyConfig::new("https://api.example.com/webauthn")
///     .with_auth(AuthMethod::Bearer("my-token".to_string()))
///     .with_timeout(10);
///
/// let relying_party = RestRelyingParty::new(config);
/// ```
#[derive(Clone)]
pub struct RestRelyingParty {
    config: RestRelyingPartyConfig,
    client: Client,
}

impl RestRelyingParty {
    /// Create a new REST relying party with the given configuration
    pub fn new(config: RestRelyingPartyConfig) -> Self {
        let client_builder = Client::builder();

        // Browser fetch has no client-level timeout
        #[cfg(not(target_arch = "wasm32"))]
        let client_builder = match config.timeout_seconds {
            Some(timeout) => client_builder.timeout(std::time::Duration::from_secs(timeout)),
            None => client_builder,
        };

        let client = client_builder.build().unwrap_or_else(|_| Client::new());

        Self { config, client }
    }

    fn url_for(&self, path: &str) -> String {
        format!("{}/{}", self.config.endpoint.trim_end_matches('/'), path)
    }

    /// Build a request with authentication and custom headers
    fn build_request(&self, builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        let mut builder = builder;

        match &self.config.auth_method {
            AuthMethod::None => {}
            AuthMethod::Bearer(token) => {
                builder = builder.bearer_auth(token);
            }
        }

        for (key, value) in &self.config.headers {
            builder = builder.header(key, value);
        }

        builder
    }

    /// POST `body` as JSON and return the status and response text
    async fn post<T: Serialize>(
        &self,
        path: &str,
        body: &T,
    ) -> Result<(reqwest::StatusCode, String), RelyingPartyError> {
        let url = self.url_for(path);
        tracing::debug!(%url, "relying party request");

        let request = self.build_request(self.client.post(&url).json(body));
        let response = request
            .send()
            .await
            .map_err(|e| RelyingPartyError::Transport(format!("HTTP request failed: {}", e)))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| RelyingPartyError::Transport(format!("reading response failed: {}", e)))?;

        Ok((status, text))
    }
}

fn rejected(status: reqwest::StatusCode, body: String) -> RelyingPartyError {
    let body = if body.is_empty() {
        status.canonical_reason().unwrap_or("Unknown").to_string()
    } else {
        body
    };
    RelyingPartyError::Rejected {
        status: status.as_u16(),
        body,
    }
}

/// Interpret the answer to a registration request.
fn registration_outcome(
    status: reqwest::StatusCode,
    body: String,
) -> Result<(), RelyingPartyError> {
    if !status.is_success() {
        return Err(rejected(status, body));
    }

    if body.trim() != REGISTRATION_ACCEPTED {
        return Err(RelyingPartyError::InvalidResponse(body));
    }

    Ok(())
}

/// Interpret the answer to a challenge verification.
fn verification_outcome(
    status: reqwest::StatusCode,
    body: String,
) -> Result<RegisteredKey, RelyingPartyError> {
    if status == reqwest::StatusCode::NOT_FOUND {
        return Err(RelyingPartyError::UnknownCredential);
    }

    if !status.is_success() {
        return Err(rejected(status, body));
    }

    serde_json::from_str(&body).map_err(|e| RelyingPartyError::InvalidResponse(e.to_string()))
}

impl RelyingParty for RestRelyingParty {
    async fn register(&self, request: &RegistrationRequest) -> Result<(), RelyingPartyError> {
        let (status, body) = self.post("register", request).await?;
        registration_outcome(status, body)
    }

    async fn verify_challenge(
        &self,
        verification: &ChallengeVerification,
    ) -> Result<RegisteredKey, RelyingPartyError> {
        let (status, body) = self.post("verify", verification).await?;
        verification_outcome(status, body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::StatusCode;
    use testresult::TestResult;

    #[test]
    fn test_config_builder() {
        let config = RestRelyingPartyConfig::new("https://api.example.com")
            .with_auth(AuthMethod::Bearer("token123".to_string()))
            .with_timeout(60)
            .with_header("X-Custom", "value");

        assert_eq!(config.endpoint, "https://api.example.com");
        assert_eq!(config.auth_method, AuthMethod::Bearer("token123".to_string()));
        assert_eq!(config.timeout_seconds, Some(60));
        assert_eq!(config.headers.len(), 1);
    }

    #[test]
    fn test_url_generation() {
        let relying_party =
            RestRelyingParty::new(RestRelyingPartyConfig::new("https://api.example.com/webauthn/"));
        assert_eq!(
            relying_party.url_for("verify"),
            "https://api.example.com/webauthn/verify"
        );
    }

    #[test]
    fn empty_rejections_carry_the_reason_phrase() {
        assert_eq!(
            rejected(reqwest::StatusCode::FORBIDDEN, String::new()),
            RelyingPartyError::Rejected {
                status: 403,
                body: "Forbidden".to_string(),
            }
        );
        assert_eq!(
            rejected(reqwest::StatusCode::BAD_REQUEST, "bad key".to_string()),
            RelyingPartyError::Rejected {
                status: 400,
                body: "bad key".to_string(),
            }
        );
    }

    #[test]
    fn registration_requires_the_ok_body() {
        assert_eq!(registration_outcome(StatusCode::OK, "OK\n".to_string()), Ok(()));
        assert_eq!(
            registration_outcome(StatusCode::OK, "accepted".to_string()),
            Err(RelyingPartyError::InvalidResponse("accepted".to_string()))
        );
        assert_eq!(
            registration_outcome(StatusCode::CONFLICT, "already registered".to_string()),
            Err(RelyingPartyError::Rejected {
                status: 409,
                body: "already registered".to_string(),
            })
        );
    }

    #[test]
    fn verification_maps_not_found_to_unknown_credential() {
        assert_eq!(
            verification_outcome(StatusCode::NOT_FOUND, "no such credential".to_string()),
            Err(RelyingPartyError::UnknownCredential)
        );
        assert_eq!(
            verification_outcome(StatusCode::UNAUTHORIZED, String::new()),
            Err(RelyingPartyError::Rejected {
                status: 401,
                body: "Unauthorized".to_string(),
            })
        );
    }

    #[test]
    fn verification_decodes_the_registered_key() -> TestResult {
        let key = verification_outcome(
            StatusCode::OK,
            r#"{"spkiPublicKey":"0102","algorithm":-8,"multisigPubKey":"ff"}"#.to_string(),
        )?;
        assert_eq!(
            key,
            RegisteredKey {
                spki_public_key: vec![0x01, 0x02],
                algorithm: Some(-8),
                multisig_pub_key: Some(vec![0xff]),
            }
        );

        let legacy =
            verification_outcome(StatusCode::OK, r#"{"spkiPublicKey":"03"}"#.to_string())?;
        assert_eq!(legacy.algorithm, None);
        assert_eq!(legacy.multisig_pub_key, None);

        assert!(matches!(
            verification_outcome(StatusCode::OK, r#"{"spkiPublicKey":"zz"}"#.to_string()),
            Err(RelyingPartyError::InvalidResponse(_))
        ));
        Ok(())
    }

    #[tokio::test]
    async fn unreachable_services_surface_transport_errors() {
        let relying_party =
            RestRelyingParty::new(RestRelyingPartyConfig::new("http://127.0.0.1:9").with_timeout(1));
        let result = relying_party
            .register(&RegistrationRequest {
                credential_id: vec![1],
                spki_public_key: vec![2],
                algorithm: None,
                multisig_pub_key: None,
            })
            .await;
        assert!(matches!(result, Err(RelyingPartyError::Transport(_))));
    }
}
