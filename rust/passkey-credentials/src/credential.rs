//! The durable per-authenticator credential record.

use crate::{CodecError, PublicKey};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::str::FromStr;

/// Transport hint reported by an authenticator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Transport {
    /// Removable USB authenticator.
    Usb,
    /// Near-field communication.
    Nfc,
    /// Bluetooth Low Energy.
    Ble,
    /// Platform (built-in) authenticator.
    Internal,
    /// Cross-device flow (QR code + proximity).
    Hybrid,
    /// ISO/IEC 7816 smart card.
    SmartCard,
}

impl Transport {
    /// The WebAuthn string for this transport.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Usb => "usb",
            Self::Nfc => "nfc",
            Self::Ble => "ble",
            Self::Internal => "internal",
            Self::Hybrid => "hybrid",
            Self::SmartCard => "smart-card",
        }
    }
}

impl FromStr for Transport {
    type Err = CodecError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "usb" => Ok(Self::Usb),
            "nfc" => Ok(Self::Nfc),
            "ble" => Ok(Self::Ble),
            "internal" => Ok(Self::Internal),
            "hybrid" => Ok(Self::Hybrid),
            "smart-card" => Ok(Self::SmartCard),
            other => Err(CodecError::UnknownTransport(other.to_string())),
        }
    }
}

impl std::fmt::Display for Transport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A registered authenticator credential.
///
/// Created once at registration. Only [`Credential::transports`] may be
/// refined afterwards; everything else is fixed for the credential's lifetime.
///
/// Serializes in the storage shape
/// `{ id, publicKey, publicKeyAlgorithm?, transports?, multisigPubKey? }`
/// with hex-encoded byte fields. Records without `publicKeyAlgorithm`
/// predate Ed25519 support and decode as ES256.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credential {
    /// Opaque credential identifier assigned by the authenticator.
    pub id: Vec<u8>,
    /// The credential's normalized public key.
    pub public_key: PublicKey,
    /// Known transport hints, if any were reported.
    pub transports: Option<Vec<Transport>>,
    /// Second participant of a two-of-two multisignature account.
    pub multisig_public_key: Option<PublicKey>,
}

impl Credential {
    /// Create a single-signatory credential record.
    #[must_use]
    pub fn new(id: Vec<u8>, public_key: PublicKey) -> Self {
        Self {
            id,
            public_key,
            transports: None,
            multisig_public_key: None,
        }
    }

    /// Attach the second participant key of a multisignature account.
    #[must_use]
    pub fn with_multisig_public_key(mut self, key: PublicKey) -> Self {
        self.multisig_public_key = Some(key);
        self
    }

    /// Replace the transport hints with a newer observation.
    ///
    /// An empty list carries no information and leaves the record unchanged.
    #[must_use]
    pub fn with_transports(mut self, transports: Vec<Transport>) -> Self {
        if !transports.is_empty() {
            self.transports = Some(transports);
        }
        self
    }

    /// Hex encoding of the credential identifier.
    #[must_use]
    pub fn id_hex(&self) -> String {
        hex::encode(&self.id)
    }

    /// Whether this credential signs for a two-of-two multisignature account.
    #[must_use]
    pub const fn is_multisig(&self) -> bool {
        self.multisig_public_key.is_some()
    }
}

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CredentialRecord {
    id: String,
    public_key: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    public_key_algorithm: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    transports: Option<Vec<Transport>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    multisig_pub_key: Option<String>,
}

impl TryFrom<CredentialRecord> for Credential {
    type Error = CodecError;

    fn try_from(record: CredentialRecord) -> Result<Self, Self::Error> {
        let id = hex::decode(&record.id)?;
        let public_key =
            PublicKey::decode_from_credential(&record.public_key, record.public_key_algorithm)?;
        // The second key is always generated locally as Ed25519.
        let multisig_public_key = record
            .multisig_pub_key
            .as_deref()
            .map(|key| PublicKey::decode_from_credential(key, Some(crate::algorithm::EDDSA)))
            .transpose()?;
        Ok(Self {
            id,
            public_key,
            transports: record.transports,
            multisig_public_key,
        })
    }
}

impl From<&Credential> for CredentialRecord {
    fn from(credential: &Credential) -> Self {
        Self {
            id: credential.id_hex(),
            public_key: credential.public_key.to_hex(),
            public_key_algorithm: Some(credential.public_key.algorithm().cose_identifier()),
            transports: credential.transports.clone(),
            multisig_pub_key: credential.multisig_public_key.map(|key| key.to_hex()),
        }
    }
}

impl Serialize for Credential {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        CredentialRecord::from(self).serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Credential {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let record = CredentialRecord::deserialize(deserializer)?;
        Credential::try_from(record).map_err(serde::de::Error::custom)
    }
}
