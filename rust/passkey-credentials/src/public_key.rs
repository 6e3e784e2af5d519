//! Canonical public keys and their platform encodings.

use crate::{Algorithm, CodecError};

/// SPKI header for a P-256 uncompressed public key (26 bytes).
///
/// ```text
/// SEQUENCE (89 bytes)
///   SEQUENCE (19 bytes)
///     OID 1.2.840.10045.2.1 (ecPublicKey)
///     OID 1.2.840.10045.3.1.7 (prime256v1 / P-256)
///   BIT STRING (66 bytes, 0 unused bits)
///     04 || x || y  (65-byte uncompressed point)
/// ```
const P256_SPKI_HEADER: [u8; 26] = [
    0x30, 0x59, // SEQUENCE, 89 bytes
    0x30, 0x13, // SEQUENCE, 19 bytes
    0x06, 0x07, 0x2a, 0x86, 0x48, 0xce, 0x3d, 0x02, 0x01, // OID ecPublicKey
    0x06, 0x08, 0x2a, 0x86, 0x48, 0xce, 0x3d, 0x03, 0x01, 0x07, // OID prime256v1
    0x03, 0x42, // BIT STRING, 66 bytes
    0x00, // 0 unused bits
];

/// SPKI header for an Ed25519 public key (12 bytes).
///
/// ```text
/// SEQUENCE (42 bytes)
///   SEQUENCE (5 bytes)
///     OID 1.3.101.112 (Ed25519)
///   BIT STRING (33 bytes, 0 unused bits)
///     key (32 bytes)
/// ```
const ED25519_SPKI_HEADER: [u8; 12] = [
    0x30, 0x2a, 0x30, 0x05, 0x06, 0x03, 0x2b, 0x65, 0x70, 0x03, 0x21, 0x00,
];

const P256_UNCOMPRESSED_LEN: usize = 65;
const ED25519_KEY_LEN: usize = 32;

/// A normalized public key tagged with its algorithm.
///
/// The variant is the algorithm tag: a P-256 key is always held as its
/// 33-byte compressed SEC1 point and an Ed25519 key as its 32 raw bytes.
/// Both are validated on construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PublicKey {
    /// Compressed P-256 point (`0x02 | 0x03` prefix followed by `x`).
    EcdsaP256([u8; 33]),

    /// Raw Ed25519 public key.
    Ed25519([u8; 32]),
}

impl PublicKey {
    /// Build a canonical key from bytes already stripped of any container.
    ///
    /// P-256 accepts the 33-byte compressed or 65-byte uncompressed SEC1
    /// point; Ed25519 accepts exactly 32 bytes.
    ///
    /// # Errors
    ///
    /// Returns [`CodecError::MalformedPublicKey`] if the length or prefix does
    /// not match the algorithm, or the bytes are not a point on the curve.
    pub fn from_bytes(algorithm: Algorithm, bytes: &[u8]) -> Result<Self, CodecError> {
        match algorithm {
            Algorithm::EcdsaP256Sha256 => {
                match (bytes.len(), bytes.first().copied()) {
                    (33, Some(0x02 | 0x03)) | (P256_UNCOMPRESSED_LEN, Some(0x04)) => {}
                    (len, prefix) => {
                        return Err(CodecError::MalformedPublicKey(format!(
                            "expected a 33-byte compressed or 65-byte uncompressed P-256 point, \
                             got {len} bytes with prefix {prefix:02x?}"
                        )));
                    }
                }
                let key = p256::ecdsa::VerifyingKey::from_sec1_bytes(bytes)
                    .map_err(|_| malformed("not a point on P-256"))?;
                let compressed: [u8; 33] = key
                    .to_encoded_point(true)
                    .as_bytes()
                    .try_into()
                    .map_err(|_| malformed("compressed point is not 33 bytes"))?;
                Ok(Self::EcdsaP256(compressed))
            }
            Algorithm::EddsaEd25519 => {
                let raw: [u8; ED25519_KEY_LEN] = bytes.try_into().map_err(|_| {
                    CodecError::MalformedPublicKey(format!(
                        "expected 32 Ed25519 key bytes, got {}",
                        bytes.len()
                    ))
                })?;
                ed25519_dalek::VerifyingKey::from_bytes(&raw)
                    .map_err(|_| malformed("not a valid Ed25519 point"))?;
                Ok(Self::Ed25519(raw))
            }
        }
    }

    /// Decode the key a platform returns from a public-key export.
    ///
    /// ES256 (tag absent or `-7`) accepts the 91-byte SPKI export, a raw
    /// uncompressed point or a compressed point. EdDSA (`-8`) takes the last
    /// 32 bytes of the buffer; when the buffer has the SPKI length its header
    /// must be the Ed25519 one.
    ///
    /// # Errors
    ///
    /// Returns [`CodecError::UnsupportedAlgorithm`] for any other tag, or
    /// [`CodecError::MalformedPublicKey`] if the container or key is invalid.
    pub fn decode_from_wire_format(bytes: &[u8], tag: Option<i64>) -> Result<Self, CodecError> {
        match Algorithm::from_cose(tag)? {
            algorithm @ Algorithm::EcdsaP256Sha256 => {
                let point = match bytes.len() {
                    len if len == P256_SPKI_HEADER.len() + P256_UNCOMPRESSED_LEN => {
                        let (header, point) = bytes.split_at(P256_SPKI_HEADER.len());
                        if header != P256_SPKI_HEADER {
                            return Err(malformed("SPKI header does not match P-256"));
                        }
                        point
                    }
                    _ => bytes,
                };
                Self::from_bytes(algorithm, point)
            }
            algorithm @ Algorithm::EddsaEd25519 => {
                if bytes.len() < ED25519_KEY_LEN {
                    return Err(CodecError::MalformedPublicKey(format!(
                        "expected at least 32 bytes for an Ed25519 export, got {}",
                        bytes.len()
                    )));
                }
                let (header, key) = bytes.split_at(bytes.len() - ED25519_KEY_LEN);
                if bytes.len() == ED25519_SPKI_HEADER.len() + ED25519_KEY_LEN
                    && header != ED25519_SPKI_HEADER
                {
                    return Err(malformed("SPKI header does not match Ed25519"));
                }
                Self::from_bytes(algorithm, key)
            }
        }
    }

    /// Decode the hex-encoded canonical key stored in a credential record.
    ///
    /// # Errors
    ///
    /// Returns [`CodecError::UnsupportedAlgorithm`] for tags outside
    /// `{absent, -7, -8}`, [`CodecError::InvalidHex`] for bad hex, or
    /// [`CodecError::MalformedPublicKey`] for an invalid key.
    pub fn decode_from_credential(hex_key: &str, tag: Option<i64>) -> Result<Self, CodecError> {
        let algorithm = Algorithm::from_cose(tag)?;
        let bytes = hex::decode(hex_key)?;
        Self::from_bytes(algorithm, &bytes)
    }

    /// The algorithm this key belongs to.
    #[must_use]
    pub const fn algorithm(&self) -> Algorithm {
        match self {
            Self::EcdsaP256(_) => Algorithm::EcdsaP256Sha256,
            Self::Ed25519(_) => Algorithm::EddsaEd25519,
        }
    }

    /// The canonical key bytes.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        match self {
            Self::EcdsaP256(bytes) => bytes,
            Self::Ed25519(bytes) => bytes,
        }
    }

    /// Hex encoding of the canonical bytes, as stored in a credential record.
    #[must_use]
    pub fn to_hex(&self) -> String {
        hex::encode(self.as_bytes())
    }

    /// Encode the key in the SPKI export shape [`Self::decode_from_wire_format`]
    /// accepts.
    ///
    /// # Errors
    ///
    /// Returns [`CodecError::MalformedPublicKey`] if a P-256 variant was built
    /// by hand from bytes that do not decompress.
    pub fn to_spki(&self) -> Result<Vec<u8>, CodecError> {
        match self {
            Self::EcdsaP256(compressed) => {
                let key = p256::ecdsa::VerifyingKey::from_sec1_bytes(compressed)
                    .map_err(|_| malformed("not a point on P-256"))?;
                let mut spki = Vec::with_capacity(P256_SPKI_HEADER.len() + P256_UNCOMPRESSED_LEN);
                spki.extend_from_slice(&P256_SPKI_HEADER);
                spki.extend_from_slice(key.to_encoded_point(false).as_bytes());
                Ok(spki)
            }
            Self::Ed25519(raw) => {
                let mut spki = Vec::with_capacity(ED25519_SPKI_HEADER.len() + ED25519_KEY_LEN);
                spki.extend_from_slice(&ED25519_SPKI_HEADER);
                spki.extend_from_slice(raw);
                Ok(spki)
            }
        }
    }
}

impl From<&p256::ecdsa::VerifyingKey> for PublicKey {
    fn from(key: &p256::ecdsa::VerifyingKey) -> Self {
        let mut compressed = [0u8; 33];
        compressed.copy_from_slice(key.to_encoded_point(true).as_bytes());
        Self::EcdsaP256(compressed)
    }
}

impl From<&ed25519_dalek::VerifyingKey> for PublicKey {
    fn from(key: &ed25519_dalek::VerifyingKey) -> Self {
        Self::Ed25519(key.to_bytes())
    }
}

impl std::fmt::Display for PublicKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.algorithm(), self.to_hex())
    }
}

fn malformed(reason: &str) -> CodecError {
    CodecError::MalformedPublicKey(reason.to_string())
}
