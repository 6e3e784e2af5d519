//! COSE algorithm tags negotiated for a credential.

use crate::CodecError;
use serde::{Deserialize, Serialize};

/// COSE identifier for ECDSA over P-256 with SHA-256.
pub const ES256: i64 = -7;

/// COSE identifier for EdDSA over Ed25519.
pub const EDDSA: i64 = -8;

/// The signature scheme a credential was registered with.
///
/// Records written before algorithm negotiation existed carry no tag at all;
/// those decode as [`Algorithm::EcdsaP256Sha256`].
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "i64")]
pub enum Algorithm {
    /// ECDSA over P-256 with SHA-256 (COSE `-7`).
    #[default]
    EcdsaP256Sha256,

    /// EdDSA over Ed25519 (COSE `-8`).
    EddsaEd25519,
}

impl Algorithm {
    /// Resolve an optional COSE tag, treating an absent tag as ES256.
    ///
    /// # Errors
    ///
    /// Returns [`CodecError::UnsupportedAlgorithm`] for any tag other than
    /// `-7` or `-8`.
    pub fn from_cose(tag: Option<i64>) -> Result<Self, CodecError> {
        match tag {
            None | Some(ES256) => Ok(Self::EcdsaP256Sha256),
            Some(EDDSA) => Ok(Self::EddsaEd25519),
            Some(other) => Err(CodecError::UnsupportedAlgorithm(other)),
        }
    }

    /// The COSE identifier for this algorithm.
    #[must_use]
    pub const fn cose_identifier(self) -> i64 {
        match self {
            Self::EcdsaP256Sha256 => ES256,
            Self::EddsaEd25519 => EDDSA,
        }
    }

    /// Length of the canonical public key encoding.
    #[must_use]
    pub const fn public_key_len(self) -> usize {
        match self {
            Self::EcdsaP256Sha256 => 33,
            Self::EddsaEd25519 => 32,
        }
    }

    /// Length of the canonical (raw) signature encoding.
    #[must_use]
    pub const fn signature_len(self) -> usize {
        64
    }

    /// Width of each of the two signature integers.
    #[must_use]
    pub const fn scalar_len(self) -> usize {
        32
    }

    /// The algorithm code used in the proof header nibble.
    #[must_use]
    pub const fn proof_code(self) -> u8 {
        match self {
            Self::EddsaEd25519 => 0,
            Self::EcdsaP256Sha256 => 1,
        }
    }

    /// Inverse of [`Algorithm::proof_code`].
    #[must_use]
    pub const fn from_proof_code(code: u8) -> Option<Self> {
        match code {
            0 => Some(Self::EddsaEd25519),
            1 => Some(Self::EcdsaP256Sha256),
            _ => None,
        }
    }
}

impl TryFrom<i64> for Algorithm {
    type Error = CodecError;

    fn try_from(tag: i64) -> Result<Self, Self::Error> {
        Self::from_cose(Some(tag))
    }
}

impl From<Algorithm> for i64 {
    fn from(algorithm: Algorithm) -> Self {
        algorithm.cose_identifier()
    }
}

impl std::fmt::Display for Algorithm {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EcdsaP256Sha256 => f.write_str("ES256"),
            Self::EddsaEd25519 => f.write_str("EdDSA"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn absent_tag_is_es256() {
        assert_eq!(
            Algorithm::from_cose(None).unwrap(),
            Algorithm::from_cose(Some(-7)).unwrap()
        );
    }

    #[test]
    fn unknown_tags_are_rejected() {
        for tag in [-257, -35, 0, 1, 7, 8] {
            assert_eq!(
                Algorithm::from_cose(Some(tag)),
                Err(CodecError::UnsupportedAlgorithm(tag))
            );
        }
    }

    #[test]
    fn proof_codes_are_distinct() {
        for algorithm in [Algorithm::EcdsaP256Sha256, Algorithm::EddsaEd25519] {
            assert_eq!(
                Algorithm::from_proof_code(algorithm.proof_code()),
                Some(algorithm)
            );
        }
        assert_eq!(Algorithm::from_proof_code(2), None);
    }

    #[test]
    fn serializes_as_cose_integer() {
        let json = serde_json::to_string(&Algorithm::EddsaEd25519).unwrap();
        assert_eq!(json, "-8");
        assert!(serde_json::from_str::<Algorithm>("-257").is_err());
    }
}
