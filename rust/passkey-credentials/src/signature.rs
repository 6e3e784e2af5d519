//! Canonical signatures decoded from authenticator assertions.

use crate::{Algorithm, CodecError, der};

/// A normalized signature tagged with its algorithm.
///
/// Both variants hold the fixed-width 64-byte form: `r || s` for ECDSA and
/// `R || S` for Ed25519.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Signature {
    /// Raw P-256 ECDSA signature.
    EcdsaP256([u8; 64]),

    /// Raw Ed25519 signature.
    Ed25519([u8; 64]),
}

impl Signature {
    /// Decode the signature bytes an authenticator returned in an assertion.
    ///
    /// ES256 signatures (tag absent or `-7`) are always DER. EdDSA signatures
    /// (`-8`) are passed through when exactly 64 bytes long and DER-decoded
    /// otherwise, since vendors disagree on the encoding for this algorithm.
    ///
    /// # Errors
    ///
    /// Returns [`CodecError::UnsupportedAlgorithm`] for any other tag, or
    /// [`CodecError::MalformedSignature`] if the DER structure is invalid.
    pub fn decode_from_assertion(bytes: &[u8], tag: Option<i64>) -> Result<Self, CodecError> {
        match Algorithm::from_cose(tag)? {
            Algorithm::EcdsaP256Sha256 => Ok(Self::EcdsaP256(der::decode_signature(bytes)?)),
            Algorithm::EddsaEd25519 => match <[u8; 64]>::try_from(bytes) {
                Ok(raw) => Ok(Self::Ed25519(raw)),
                Err(_) => Ok(Self::Ed25519(der::decode_signature(bytes)?)),
            },
        }
    }

    /// Build a signature from its raw fixed-width bytes.
    ///
    /// # Errors
    ///
    /// Returns [`CodecError::MalformedSignature`] unless `bytes` is exactly
    /// 64 bytes long.
    pub fn from_raw(algorithm: Algorithm, bytes: &[u8]) -> Result<Self, CodecError> {
        let raw = <[u8; 64]>::try_from(bytes).map_err(|_| {
            CodecError::MalformedSignature(format!(
                "expected {} raw signature bytes, got {}",
                algorithm.signature_len(),
                bytes.len()
            ))
        })?;
        Ok(match algorithm {
            Algorithm::EcdsaP256Sha256 => Self::EcdsaP256(raw),
            Algorithm::EddsaEd25519 => Self::Ed25519(raw),
        })
    }

    /// The algorithm this signature belongs to.
    #[must_use]
    pub const fn algorithm(&self) -> Algorithm {
        match self {
            Self::EcdsaP256(_) => Algorithm::EcdsaP256Sha256,
            Self::Ed25519(_) => Algorithm::EddsaEd25519,
        }
    }

    /// The raw fixed-width bytes.
    #[must_use]
    pub const fn as_bytes(&self) -> &[u8; 64] {
        match self {
            Self::EcdsaP256(raw) | Self::Ed25519(raw) => raw,
        }
    }

    /// Encode as a DER `SEQUENCE` of two `INTEGER`s.
    #[must_use]
    pub fn to_der(&self) -> Vec<u8> {
        der::encode_signature(self.as_bytes())
    }
}

impl From<p256::ecdsa::Signature> for Signature {
    fn from(sig: p256::ecdsa::Signature) -> Self {
        let mut raw = [0u8; 64];
        raw.copy_from_slice(&sig.to_bytes());
        Self::EcdsaP256(raw)
    }
}

impl From<ed25519_dalek::Signature> for Signature {
    fn from(sig: ed25519_dalek::Signature) -> Self {
        Self::Ed25519(sig.to_bytes())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use p256::ecdsa::{SigningKey, signature::Signer as _};

    fn p256_der(seed: u8, msg: &[u8]) -> (p256::ecdsa::Signature, Vec<u8>) {
        let sk = SigningKey::from_bytes(&[seed; 32].into()).unwrap();
        let sig: p256::ecdsa::Signature = sk.sign(msg);
        let der = sig.to_der().as_bytes().to_vec();
        (sig, der)
    }

    #[test]
    fn es256_der_matches_reference_decoder() {
        for seed in 1..=16u8 {
            let (reference, der) = p256_der(seed, b"reference vectors");
            let decoded = Signature::decode_from_assertion(&der, Some(-7)).unwrap();
            assert_eq!(decoded.as_bytes().as_slice(), reference.to_bytes().as_slice());
        }
    }

    #[test]
    fn absent_tag_decodes_like_es256() {
        let (_, der) = p256_der(3, b"legacy");
        assert_eq!(
            Signature::decode_from_assertion(&der, None).unwrap(),
            Signature::decode_from_assertion(&der, Some(-7)).unwrap()
        );
    }

    #[test]
    fn es256_never_accepts_raw_bytes() {
        let (reference, _) = p256_der(4, b"raw");
        assert!(matches!(
            Signature::decode_from_assertion(&reference.to_bytes(), Some(-7)),
            Err(CodecError::MalformedSignature(_))
        ));
    }

    #[test]
    fn eddsa_raw_passes_through() {
        let sk = ed25519_dalek::SigningKey::from_bytes(&[5; 32]);
        let sig = ed25519_dalek::Signer::sign(&sk, b"raw eddsa");
        let decoded = Signature::decode_from_assertion(&sig.to_bytes(), Some(-8)).unwrap();
        assert_eq!(decoded, Signature::Ed25519(sig.to_bytes()));
    }

    #[test]
    fn eddsa_der_is_decoded() {
        let sk = ed25519_dalek::SigningKey::from_bytes(&[6; 32]);
        let sig = ed25519_dalek::Signer::sign(&sk, b"der eddsa");
        let der = Signature::Ed25519(sig.to_bytes()).to_der();
        assert_ne!(der.len(), 64);

        let decoded = Signature::decode_from_assertion(&der, Some(-8)).unwrap();
        assert_eq!(decoded.as_bytes(), &sig.to_bytes());
    }

    #[test]
    fn unsupported_tag_is_rejected() {
        let (_, der) = p256_der(1, b"tag");
        assert_eq!(
            Signature::decode_from_assertion(&der, Some(-257)),
            Err(CodecError::UnsupportedAlgorithm(-257))
        );
    }

    #[test]
    fn der_roundtrip_for_both_algorithms() {
        let (reference, _) = p256_der(9, b"roundtrip");
        let ecdsa = Signature::from(reference);
        assert_eq!(
            Signature::decode_from_assertion(&ecdsa.to_der(), Some(-7)).unwrap(),
            ecdsa
        );

        let eddsa = Signature::Ed25519([0xa5; 64]);
        assert_eq!(
            Signature::decode_from_assertion(&eddsa.to_der(), Some(-8)).unwrap(),
            eddsa
        );
    }

    #[test]
    fn from_raw_checks_length() {
        assert!(Signature::from_raw(Algorithm::EddsaEd25519, &[0; 63]).is_err());
        assert_eq!(
            Signature::from_raw(Algorithm::EcdsaP256Sha256, &[1; 64])
                .unwrap()
                .algorithm(),
            Algorithm::EcdsaP256Sha256
        );
    }
}
