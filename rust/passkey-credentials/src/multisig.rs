//! Locally generated second participant for two-of-two accounts.

use crate::{KeyGenerationError, PublicKey};

/// An Ed25519 key pair held outside the authenticator.
///
/// Generated during registration when multisignature support is requested.
/// The caller owns persistence of the seed; nothing in this crate stores it.
#[derive(Clone)]
pub struct MultisigKeyPair {
    key: ed25519_dalek::SigningKey,
}

impl MultisigKeyPair {
    /// Generate a fresh key pair from the operating system RNG.
    ///
    /// # Errors
    ///
    /// Returns an error if the RNG fails.
    pub fn generate() -> Result<Self, KeyGenerationError> {
        let mut seed = [0u8; 32];
        getrandom::getrandom(&mut seed)?;
        Ok(Self {
            key: ed25519_dalek::SigningKey::from_bytes(&seed),
        })
    }

    /// Restore a key pair from its 32-byte seed.
    ///
    /// # Errors
    ///
    /// Returns an error if the seed has the wrong length.
    pub fn import(seed: &[u8]) -> Result<Self, KeyGenerationError> {
        let seed: [u8; 32] = seed
            .try_into()
            .map_err(|_| KeyGenerationError::InvalidSeedLength(seed.len()))?;
        Ok(Self {
            key: ed25519_dalek::SigningKey::from_bytes(&seed),
        })
    }

    /// Export the 32-byte seed.
    #[must_use]
    pub fn export(&self) -> [u8; 32] {
        self.key.to_bytes()
    }

    /// The participant's public key.
    #[must_use]
    pub fn public_key(&self) -> PublicKey {
        PublicKey::from(&self.key.verifying_key())
    }

    /// The underlying signing key.
    #[must_use]
    pub const fn signing_key(&self) -> &ed25519_dalek::SigningKey {
        &self.key
    }
}

impl std::fmt::Debug for MultisigKeyPair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MultisigKeyPair")
            .field("public_key", &self.public_key())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Algorithm;

    #[test]
    fn generated_keys_are_ed25519_and_distinct() {
        let a = MultisigKeyPair::generate().unwrap();
        let b = MultisigKeyPair::generate().unwrap();
        assert_eq!(a.public_key().algorithm(), Algorithm::EddsaEd25519);
        assert_ne!(a.public_key(), b.public_key());
    }

    #[test]
    fn export_import_preserves_public_key() {
        let original = MultisigKeyPair::generate().unwrap();
        let restored = MultisigKeyPair::import(&original.export()).unwrap();
        assert_eq!(restored.public_key(), original.public_key());
    }

    #[test]
    fn import_rejects_short_seed() {
        assert!(matches!(
            MultisigKeyPair::import(&[0u8; 16]),
            Err(KeyGenerationError::InvalidSeedLength(16))
        ));
    }

    #[test]
    fn debug_does_not_leak_the_seed() {
        let pair = MultisigKeyPair::import(&[7u8; 32]).unwrap();
        let debug = format!("{pair:?}");
        assert!(!debug.contains(&hex::encode([7u8; 32])));
    }
}
