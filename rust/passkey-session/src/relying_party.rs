//! The relying-party lookup collaborator.
//!
//! The relying party remembers which public key belongs to which credential
//! identifier. Registration stores the mapping; discovery forwards an
//! assertion and gets the registered key back. All byte fields travel as hex
//! strings in camelCase JSON bodies.

use crate::RelyingPartyError;
use crate::sync::{ConditionalSend, ConditionalSync};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::future::Future;

pub mod memory;
#[cfg(feature = "rest")]
pub mod rest;

pub use memory::MemoryRelyingParty;
#[cfg(feature = "rest")]
pub use rest::{AuthMethod, RestRelyingParty, RestRelyingPartyConfig};

fn serialize_hex<S>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    serializer.serialize_str(&hex::encode(bytes))
}

fn deserialize_hex<'de, D>(deserializer: D) -> Result<Vec<u8>, D::Error>
where
    D: Deserializer<'de>,
{
    let hex_str = String::deserialize(deserializer)?;
    hex::decode(&hex_str).map_err(serde::de::Error::custom)
}

fn serialize_hex_opt<S>(bytes: &Option<Vec<u8>>, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    match bytes {
        Some(bytes) => serialize_hex(bytes, serializer),
        None => serializer.serialize_none(),
    }
}

fn deserialize_hex_opt<'de, D>(deserializer: D) -> Result<Option<Vec<u8>>, D::Error>
where
    D: Deserializer<'de>,
{
    Option::<String>::deserialize(deserializer)?
        .map(|hex_str| hex::decode(&hex_str).map_err(serde::de::Error::custom))
        .transpose()
}

/// Body of a registration request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegistrationRequest {
    /// Credential identifier.
    #[serde(serialize_with = "serialize_hex", deserialize_with = "deserialize_hex")]
    pub credential_id: Vec<u8>,

    /// The public key exactly as the platform exported it.
    #[serde(serialize_with = "serialize_hex", deserialize_with = "deserialize_hex")]
    pub spki_public_key: Vec<u8>,

    /// Negotiated COSE algorithm, when the platform reported one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub algorithm: Option<i64>,

    /// Raw Ed25519 key of the second signer of a two-of-two account.
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        serialize_with = "serialize_hex_opt",
        deserialize_with = "deserialize_hex_opt"
    )]
    pub multisig_pub_key: Option<Vec<u8>>,
}

/// Body of a challenge verification request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChallengeVerification {
    /// Identifier of the credential that signed.
    #[serde(serialize_with = "serialize_hex", deserialize_with = "deserialize_hex")]
    pub credential_id: Vec<u8>,

    /// Raw authenticator data.
    #[serde(serialize_with = "serialize_hex", deserialize_with = "deserialize_hex")]
    pub authenticator_data: Vec<u8>,

    /// Raw `clientDataJSON`.
    #[serde(
        rename = "clientDataJSON",
        serialize_with = "serialize_hex",
        deserialize_with = "deserialize_hex"
    )]
    pub client_data_json: Vec<u8>,

    /// Signature as the authenticator emitted it.
    #[serde(serialize_with = "serialize_hex", deserialize_with = "deserialize_hex")]
    pub signature: Vec<u8>,
}

/// What the relying party has on record for a credential.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisteredKey {
    /// The public key as registered.
    #[serde(serialize_with = "serialize_hex", deserialize_with = "deserialize_hex")]
    pub spki_public_key: Vec<u8>,

    /// COSE algorithm of the key; absent for legacy ECDSA registrations.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub algorithm: Option<i64>,

    /// Second key of a two-of-two account.
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        serialize_with = "serialize_hex_opt",
        deserialize_with = "deserialize_hex_opt"
    )]
    pub multisig_pub_key: Option<Vec<u8>>,
}

impl From<&RegistrationRequest> for RegisteredKey {
    fn from(request: &RegistrationRequest) -> Self {
        Self {
            spki_public_key: request.spki_public_key.clone(),
            algorithm: request.algorithm,
            multisig_pub_key: request.multisig_pub_key.clone(),
        }
    }
}

/// A service mapping credential identifiers to registered public keys.
///
/// Errors are surfaced to the lifecycle caller unchanged; implementations do
/// not retry.
pub trait RelyingParty: ConditionalSync {
    /// Store the key registered for `request.credential_id`.
    fn register(
        &self,
        request: &RegistrationRequest,
    ) -> impl Future<Output = Result<(), RelyingPartyError>> + ConditionalSend;

    /// Check an assertion and return the key registered for its credential.
    fn verify_challenge(
        &self,
        verification: &ChallengeVerification,
    ) -> impl Future<Output = Result<RegisteredKey, RelyingPartyError>> + ConditionalSend;
}
