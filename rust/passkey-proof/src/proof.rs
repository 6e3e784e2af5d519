//! Authorization proofs built from WebAuthn assertions.
//!
//! An [`AuthorizationProof`] bundles everything a verifier needs to check a
//! WebAuthn signature over a transaction: the signer's key, the normalized
//! signature, the authenticator data and the client data (verbatim or in
//! [compact](crate::client_data) form). Two-of-two accounts additionally carry
//! the cosigner's key and which of the two participants signed.
//!
//! # Wire format
//!
//! ```text
//! u8        header = (flags << 4) | algorithm code   (Ed25519 = 0, ES256 = 1)
//! [u8]      public key (32 or 33 bytes by algorithm)
//! [u8; 64]  signature
//! leb128    authenticator data length, then bytes
//! full:     leb128 client data length, then bytes
//! compact:  u8 client data flags, leb128 extra fields length, then bytes
//! multisig: u8 cosigner algorithm code, then cosigner public key
//! ```

use crate::address::AccountIdentifier;
use crate::client_data::ClientDataContext;
use crate::wire::{Reader, write_prefixed};
use crate::{ProofError, VerifyError, verify};
use passkey_credentials::{Algorithm, PublicKey, Signature};

/// Header flag: the proof carries WebAuthn context. Always set.
pub const WEBAUTHN_FIELDS: u8 = 0x1;
/// Header flag: client data is in compact form.
pub const COMPACT_CLIENT_DATA: u8 = 0x2;
/// Header flag: the proof authorizes a two-of-two account.
pub const MULTISIG: u8 = 0x4;
/// Header flag: the signer is the second participant of the account.
pub const SIGNER_IS_SECOND: u8 = 0x8;

/// How the client data travels inside a proof.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientDataPayload {
    /// The `clientDataJSON` bytes exactly as the authenticator returned them.
    Full(Vec<u8>),
    /// Flags and extra fields; the verifier supplies challenge and origin.
    Compact(ClientDataContext),
}

/// Which participant of a two-of-two account produced the signature.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SignerPosition {
    /// The first key of the registered pair.
    First,
    /// The second key of the registered pair.
    Second,
}

/// The shape of account a proof authorizes for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProofKind {
    /// The signer alone controls the account.
    SingleSig,
    /// The signer and `cosigner` jointly control the account.
    MultiSig {
        /// The participant that did not sign this proof.
        cosigner: PublicKey,
        /// Where the signer sits in the participant order.
        signer_position: SignerPosition,
    },
}

/// A serialized-ready authorization for a transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthorizationProof {
    /// The key that produced [`Self::signature`].
    pub public_key: PublicKey,
    /// The normalized assertion signature.
    pub signature: Signature,
    /// Authenticator data from the assertion.
    pub authenticator_data: Vec<u8>,
    /// Client data from the assertion.
    pub client_data: ClientDataPayload,
    /// Single or multisignature.
    pub kind: ProofKind,
}

impl AuthorizationProof {
    /// The participants of the account in registration order.
    ///
    /// Single-signatory proofs have exactly one participant.
    #[must_use]
    pub fn participants(&self) -> Vec<PublicKey> {
        match self.kind {
            ProofKind::SingleSig => vec![self.public_key],
            ProofKind::MultiSig {
                cosigner,
                signer_position: SignerPosition::First,
            } => vec![self.public_key, cosigner],
            ProofKind::MultiSig {
                cosigner,
                signer_position: SignerPosition::Second,
            } => vec![cosigner, self.public_key],
        }
    }

    /// The account this proof authorizes transactions for.
    #[must_use]
    pub fn account(&self) -> AccountIdentifier {
        match self.participants().as_slice() {
            [first, second] => AccountIdentifier::from_multisig(first, second),
            _ => AccountIdentifier::from_single_key(&self.public_key),
        }
    }

    /// The `clientDataJSON` bytes the signature covers.
    ///
    /// Compact payloads are rebuilt from `challenge` and `origin`.
    #[must_use]
    pub fn client_data_json(&self, challenge: &[u8], origin: &str) -> Vec<u8> {
        match &self.client_data {
            ClientDataPayload::Full(bytes) => bytes.clone(),
            ClientDataPayload::Compact(context) => {
                context.reconstruct(challenge, origin).into_bytes()
            }
        }
    }

    /// Check that this proof authorizes `challenge` from `origin`.
    ///
    /// # Errors
    ///
    /// Returns a [`VerifyError`] if the client data does not name the
    /// challenge and origin, or if the signature does not verify.
    pub fn verify(&self, challenge: &[u8], origin: &str) -> Result<(), VerifyError> {
        let client_data_json = self.client_data_json(challenge, origin);
        verify::verify_client_data(&client_data_json, challenge, origin)?;
        verify::verify_assertion(
            &self.public_key,
            &self.signature,
            &self.authenticator_data,
            &client_data_json,
        )
    }

    /// Encode the proof in its wire format.
    #[must_use]
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut flags = WEBAUTHN_FIELDS;
        if matches!(self.client_data, ClientDataPayload::Compact(_)) {
            flags |= COMPACT_CLIENT_DATA;
        }
        if let ProofKind::MultiSig {
            signer_position, ..
        } = self.kind
        {
            flags |= MULTISIG;
            if signer_position == SignerPosition::Second {
                flags |= SIGNER_IS_SECOND;
            }
        }

        let mut out = Vec::new();
        out.push((flags << 4) | self.public_key.algorithm().proof_code());
        out.extend_from_slice(self.public_key.as_bytes());
        out.extend_from_slice(self.signature.as_bytes());
        write_prefixed(&mut out, &self.authenticator_data);
        match &self.client_data {
            ClientDataPayload::Full(bytes) => write_prefixed(&mut out, bytes),
            ClientDataPayload::Compact(context) => context.write_to(&mut out),
        }
        if let ProofKind::MultiSig { cosigner, .. } = &self.kind {
            out.push(cosigner.algorithm().proof_code());
            out.extend_from_slice(cosigner.as_bytes());
        }
        out
    }

    /// Decode a proof from its wire format.
    ///
    /// # Errors
    ///
    /// Returns a [`ProofError`] if the header is unknown, a field is cut
    /// short, a key fails to decode or bytes trail the proof.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, ProofError> {
        let mut reader = Reader::new(bytes);
        let header = reader.read_u8("header")?;
        let flags = header >> 4;
        if flags & WEBAUTHN_FIELDS == 0 || (flags & SIGNER_IS_SECOND != 0 && flags & MULTISIG == 0)
        {
            return Err(ProofError::UnknownFlags(flags));
        }
        let algorithm = algorithm_from_code(header & 0x0f)?;

        let public_key = read_public_key(&mut reader, algorithm)?;
        let signature = Signature::from_raw(
            algorithm,
            reader.read_exact(algorithm.signature_len(), "signature")?,
        )?;
        let authenticator_data = reader.read_prefixed("authenticator data")?.to_vec();
        let client_data = if flags & COMPACT_CLIENT_DATA != 0 {
            ClientDataPayload::Compact(ClientDataContext::read_from(&mut reader)?)
        } else {
            ClientDataPayload::Full(reader.read_prefixed("client data")?.to_vec())
        };
        let kind = if flags & MULTISIG != 0 {
            let cosigner_algorithm = algorithm_from_code(reader.read_u8("cosigner algorithm")?)?;
            ProofKind::MultiSig {
                cosigner: read_public_key(&mut reader, cosigner_algorithm)?,
                signer_position: if flags & SIGNER_IS_SECOND != 0 {
                    SignerPosition::Second
                } else {
                    SignerPosition::First
                },
            }
        } else {
            ProofKind::SingleSig
        };
        reader.finish()?;

        Ok(Self {
            public_key,
            signature,
            authenticator_data,
            client_data,
            kind,
        })
    }
}

fn algorithm_from_code(code: u8) -> Result<Algorithm, ProofError> {
    Algorithm::from_proof_code(code).ok_or(ProofError::UnknownAlgorithm(code))
}

fn read_public_key(reader: &mut Reader<'_>, algorithm: Algorithm) -> Result<PublicKey, ProofError> {
    let bytes = reader.read_exact(algorithm.public_key_len(), "public key")?;
    Ok(PublicKey::from_bytes(algorithm, bytes)?)
}

/// Assembles [`AuthorizationProof`]s from decoded assertion material.
///
/// The default builder embeds client data verbatim. [`ProofBuilder::compact`]
/// opts into the compact encoding; when the client data does not follow one
/// of the recognized layouts the builder falls back to full embedding.
#[derive(Debug, Clone, Default)]
pub struct ProofBuilder {
    compact: Option<CompactTarget>,
}

#[derive(Debug, Clone)]
struct CompactTarget {
    origin: String,
    challenge: Vec<u8>,
}

impl ProofBuilder {
    /// A builder that embeds client data verbatim.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A builder that compacts client data issued for `challenge` by `origin`.
    #[must_use]
    pub fn compact(origin: impl Into<String>, challenge: impl Into<Vec<u8>>) -> Self {
        Self {
            compact: Some(CompactTarget {
                origin: origin.into(),
                challenge: challenge.into(),
            }),
        }
    }

    /// Build a proof for an account controlled by `public_key` alone.
    ///
    /// # Errors
    ///
    /// Returns [`ProofError::AlgorithmMismatch`] if the signature was not
    /// produced by the key's algorithm.
    pub fn build_single_sig(
        &self,
        public_key: PublicKey,
        signature: Signature,
        authenticator_data: &[u8],
        client_data: &[u8],
    ) -> Result<AuthorizationProof, ProofError> {
        check_algorithms(&public_key, &signature)?;
        Ok(AuthorizationProof {
            public_key,
            signature,
            authenticator_data: authenticator_data.to_vec(),
            client_data: self.client_data_payload(client_data),
            kind: ProofKind::SingleSig,
        })
    }

    /// Build a proof for a two-of-two account.
    ///
    /// `participants` must be in the order the account was derived with at
    /// registration. Reordering them still yields a well-formed proof, but
    /// one for a different account.
    ///
    /// # Errors
    ///
    /// Returns [`ProofError::AlgorithmMismatch`] if the signature was not
    /// produced by the signer's algorithm, or
    /// [`ProofError::SignerNotParticipant`] if `signer` is neither participant.
    pub fn build_multi_sig(
        &self,
        signer: PublicKey,
        participants: [PublicKey; 2],
        signature: Signature,
        authenticator_data: &[u8],
        client_data: &[u8],
    ) -> Result<AuthorizationProof, ProofError> {
        check_algorithms(&signer, &signature)?;
        let [first, second] = participants;
        let (cosigner, signer_position) = if signer == first {
            (second, SignerPosition::First)
        } else if signer == second {
            (first, SignerPosition::Second)
        } else {
            return Err(ProofError::SignerNotParticipant);
        };
        Ok(AuthorizationProof {
            public_key: signer,
            signature,
            authenticator_data: authenticator_data.to_vec(),
            client_data: self.client_data_payload(client_data),
            kind: ProofKind::MultiSig {
                cosigner,
                signer_position,
            },
        })
    }

    fn client_data_payload(&self, client_data: &[u8]) -> ClientDataPayload {
        let Some(target) = &self.compact else {
            return ClientDataPayload::Full(client_data.to_vec());
        };
        let Ok(json) = std::str::from_utf8(client_data) else {
            tracing::warn!("client data is not UTF-8, embedding it in full");
            return ClientDataPayload::Full(client_data.to_vec());
        };

        let context = ClientDataContext::extract(json, &target.origin);
        if context.reconstruct(&target.challenge, &target.origin) == json {
            tracing::debug!(
                flags = context.flags.bits(),
                extra_fields = context.extra_fields.as_deref().unwrap_or_default(),
                "compacted client data"
            );
            ClientDataPayload::Compact(context)
        } else {
            tracing::warn!(
                origin = %target.origin,
                "client data layout not recognized, embedding it in full"
            );
            ClientDataPayload::Full(client_data.to_vec())
        }
    }
}

fn check_algorithms(public_key: &PublicKey, signature: &Signature) -> Result<(), ProofError> {
    if public_key.algorithm() == signature.algorithm() {
        Ok(())
    } else {
        Err(ProofError::AlgorithmMismatch {
            public_key: public_key.algorithm(),
            signature: signature.algorithm(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use base64::Engine;
    use base64::engine::general_purpose::URL_SAFE_NO_PAD;
    use pretty_assertions::assert_eq;

    const ORIGIN: &str = "https://wallet.example.com";

    fn ed25519_key(seed: u8) -> PublicKey {
        PublicKey::from(&ed25519_dalek::SigningKey::from_bytes(&[seed; 32]).verifying_key())
    }

    fn p256_key(seed: u8) -> PublicKey {
        PublicKey::from(
            p256::ecdsa::SigningKey::from_bytes(&[seed; 32].into())
                .unwrap()
                .verifying_key(),
        )
    }

    fn client_data(challenge: &[u8]) -> Vec<u8> {
        format!(
            r#"{{"type":"webauthn.get","challenge":"{}","origin":"{ORIGIN}","crossOrigin":false}}"#,
            URL_SAFE_NO_PAD.encode(challenge)
        )
        .into_bytes()
    }

    #[test]
    fn mismatched_algorithms_are_rejected() {
        let err = ProofBuilder::new()
            .build_single_sig(p256_key(1), Signature::Ed25519([1; 64]), &[0; 37], b"{}")
            .unwrap_err();
        assert_eq!(
            err,
            ProofError::AlgorithmMismatch {
                public_key: Algorithm::EcdsaP256Sha256,
                signature: Algorithm::EddsaEd25519,
            }
        );
    }

    #[test]
    fn outsiders_cannot_sign_for_a_multisig_account() {
        let err = ProofBuilder::new()
            .build_multi_sig(
                ed25519_key(3),
                [ed25519_key(1), ed25519_key(2)],
                Signature::Ed25519([0; 64]),
                &[0; 37],
                b"{}",
            )
            .unwrap_err();
        assert_eq!(err, ProofError::SignerNotParticipant);
    }

    #[test]
    fn header_encodes_flags_and_algorithm() {
        let proof = ProofBuilder::new()
            .build_single_sig(p256_key(1), Signature::EcdsaP256([7; 64]), &[0; 37], b"{}")
            .unwrap();
        let bytes = proof.to_bytes();
        assert_eq!(bytes[0], (WEBAUTHN_FIELDS << 4) | 1);
        assert_eq!(&bytes[1..34], p256_key(1).as_bytes());
        assert_eq!(&bytes[34..98], &[7; 64]);
        assert_eq!(bytes[98], 37);
    }

    #[test]
    fn second_signer_is_flagged() {
        let proof = ProofBuilder::new()
            .build_multi_sig(
                ed25519_key(2),
                [ed25519_key(1), ed25519_key(2)],
                Signature::Ed25519([0; 64]),
                &[0; 37],
                b"{}",
            )
            .unwrap();
        assert_eq!(
            proof.kind,
            ProofKind::MultiSig {
                cosigner: ed25519_key(1),
                signer_position: SignerPosition::Second,
            }
        );
        assert_eq!(proof.participants(), vec![ed25519_key(1), ed25519_key(2)]);
        assert_eq!(
            proof.to_bytes()[0] >> 4,
            WEBAUTHN_FIELDS | MULTISIG | SIGNER_IS_SECOND
        );
    }

    #[test]
    fn compact_builder_compacts_recognized_layouts() {
        let challenge = [9u8; 32];
        let proof = ProofBuilder::compact(ORIGIN, challenge)
            .build_single_sig(
                ed25519_key(1),
                Signature::Ed25519([0; 64]),
                &[0; 37],
                &client_data(&challenge),
            )
            .unwrap();
        assert!(matches!(proof.client_data, ClientDataPayload::Compact(_)));
        assert_eq!(
            proof.client_data_json(&challenge, ORIGIN),
            client_data(&challenge)
        );
    }

    #[test]
    fn compact_builder_falls_back_for_unknown_layouts() {
        let challenge = [9u8; 32];
        let reordered = format!(
            r#"{{"challenge":"{}","type":"webauthn.get","origin":"{ORIGIN}"}}"#,
            URL_SAFE_NO_PAD.encode(challenge)
        );
        let proof = ProofBuilder::compact(ORIGIN, challenge)
            .build_single_sig(
                ed25519_key(1),
                Signature::Ed25519([0; 64]),
                &[0; 37],
                reordered.as_bytes(),
            )
            .unwrap();
        assert_eq!(
            proof.client_data,
            ClientDataPayload::Full(reordered.into_bytes())
        );
    }

    #[test]
    fn compact_builder_falls_back_for_a_different_challenge() {
        let proof = ProofBuilder::compact(ORIGIN, [1u8; 32])
            .build_single_sig(
                ed25519_key(1),
                Signature::Ed25519([0; 64]),
                &[0; 37],
                &client_data(&[2u8; 32]),
            )
            .unwrap();
        assert!(matches!(proof.client_data, ClientDataPayload::Full(_)));
    }

    #[test]
    fn decoding_rejects_malformed_headers() {
        let proof = ProofBuilder::new()
            .build_single_sig(ed25519_key(1), Signature::Ed25519([0; 64]), &[0; 37], b"{}")
            .unwrap();
        let bytes = proof.to_bytes();

        let mut no_webauthn = bytes.clone();
        no_webauthn[0] &= 0x0f;
        assert_eq!(
            AuthorizationProof::from_bytes(&no_webauthn),
            Err(ProofError::UnknownFlags(0))
        );

        let mut second_without_multisig = bytes.clone();
        second_without_multisig[0] |= SIGNER_IS_SECOND << 4;
        assert!(matches!(
            AuthorizationProof::from_bytes(&second_without_multisig),
            Err(ProofError::UnknownFlags(_))
        ));

        let mut unknown_algorithm = bytes.clone();
        unknown_algorithm[0] = (WEBAUTHN_FIELDS << 4) | 0x7;
        assert_eq!(
            AuthorizationProof::from_bytes(&unknown_algorithm),
            Err(ProofError::UnknownAlgorithm(7))
        );

        let mut trailing = bytes.clone();
        trailing.push(0);
        assert_eq!(
            AuthorizationProof::from_bytes(&trailing),
            Err(ProofError::TrailingBytes(1))
        );

        assert_eq!(
            AuthorizationProof::from_bytes(&bytes[..40]),
            Err(ProofError::Truncated("signature"))
        );
    }
}
