//! Account identifiers derived from credential public keys.
//!
//! A single-signatory account is the truncated Blake2b-256 digest of the
//! key's canonical bytes. A two-of-two account is the truncated binary Merkle
//! root over both participants' keys, so the participant order is part of the
//! account: swapping the keys yields a different identifier.

use crate::AddressError;
use blake2::digest::consts::U32;
use blake2::{Blake2b, Digest};
use passkey_credentials::{Credential, PublicKey};
use std::str::FromStr;

type Blake2b256 = Blake2b<U32>;

/// Length of an account identifier in bytes.
pub const ACCOUNT_IDENTIFIER_LEN: usize = 20;

const COUNTRY_CODE: &str = "NQ";
const BASE32_ALPHABET: &[u8; 32] = b"0123456789ABCDEFGHJKLMNPQRSTUVXY";
const BODY_LEN: usize = ACCOUNT_IDENTIFIER_LEN * 8 / 5;
const ADDRESS_LEN: usize = COUNTRY_CODE.len() + 2 + BODY_LEN;

/// The identifier of the account a credential authorizes transactions for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct AccountIdentifier([u8; ACCOUNT_IDENTIFIER_LEN]);

impl AccountIdentifier {
    /// Derive the account of a single-signatory credential.
    #[must_use]
    pub fn from_single_key(key: &PublicKey) -> Self {
        Self::from_digest(&blake2b(&[key.as_bytes()]))
    }

    /// Derive the account shared by two participants, in the given order.
    #[must_use]
    pub fn from_multisig(first: &PublicKey, second: &PublicKey) -> Self {
        Self::from_digest(&merkle_root(&[first.as_bytes(), second.as_bytes()]))
    }

    /// Derive the account a credential record controls: the multisig account
    /// `[credential key, second key]` when it carries a second key, the
    /// single-key account otherwise.
    #[must_use]
    pub fn from_credential(credential: &Credential) -> Self {
        match &credential.multisig_public_key {
            Some(second) => Self::from_multisig(&credential.public_key, second),
            None => Self::from_single_key(&credential.public_key),
        }
    }

    /// Wrap raw identifier bytes.
    #[must_use]
    pub const fn from_bytes(bytes: [u8; ACCOUNT_IDENTIFIER_LEN]) -> Self {
        Self(bytes)
    }

    /// The raw identifier bytes.
    #[must_use]
    pub const fn as_bytes(&self) -> &[u8; ACCOUNT_IDENTIFIER_LEN] {
        &self.0
    }

    fn from_digest(digest: &[u8; 32]) -> Self {
        let mut bytes = [0u8; ACCOUNT_IDENTIFIER_LEN];
        bytes.copy_from_slice(&digest[..ACCOUNT_IDENTIFIER_LEN]);
        Self(bytes)
    }
}

/// Binary Merkle root over `leaves`, in order.
///
/// Leaves hash as `H(bytes)` and inner nodes as `H(left || right)`. When a
/// level has an odd number of entries the extra one goes to the left subtree.
#[must_use]
pub fn merkle_root(leaves: &[&[u8]]) -> [u8; 32] {
    match leaves {
        [] => blake2b(&[]),
        [leaf] => blake2b(&[*leaf]),
        _ => {
            let (left, right) = leaves.split_at(leaves.len().div_ceil(2));
            blake2b(&[merkle_root(left).as_slice(), merkle_root(right).as_slice()])
        }
    }
}

fn blake2b(parts: &[&[u8]]) -> [u8; 32] {
    let mut hasher = Blake2b256::new();
    for part in parts {
        hasher.update(part);
    }
    let mut digest = [0u8; 32];
    digest.copy_from_slice(&hasher.finalize());
    digest
}

impl std::fmt::Display for AccountIdentifier {
    /// Prints the user-friendly form, e.g. `NQ07 0000 ... 0000`.
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let body = base32_encode(&self.0);
        let address = format!("{COUNTRY_CODE}{}{body}", check_digits(&body));
        for (i, chunk) in address.as_bytes().chunks(4).enumerate() {
            if i > 0 {
                f.write_str(" ")?;
            }
            // The address is ASCII by construction.
            f.write_str(std::str::from_utf8(chunk).map_err(|_| std::fmt::Error)?)?;
        }
        Ok(())
    }
}

impl FromStr for AccountIdentifier {
    type Err = AddressError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let compact: String = s
            .chars()
            .filter(|c| !c.is_whitespace())
            .map(|c| c.to_ascii_uppercase())
            .collect();
        if let Some(c) = compact.chars().find(|c| !c.is_ascii()) {
            return Err(AddressError::InvalidCharacter(c));
        }
        if compact.len() != ADDRESS_LEN {
            return Err(AddressError::InvalidLength(compact.len()));
        }
        let rest = compact
            .strip_prefix(COUNTRY_CODE)
            .ok_or(AddressError::InvalidPrefix)?;
        let (check, body) = rest.split_at(2);
        if let Some(c) = check.chars().find(|c| !c.is_ascii_digit()) {
            return Err(AddressError::InvalidCharacter(c));
        }

        let bytes = base32_decode(body)?;
        if check_digits(body) != check {
            return Err(AddressError::ChecksumMismatch);
        }
        Ok(Self(bytes))
    }
}

fn base32_encode(bytes: &[u8; ACCOUNT_IDENTIFIER_LEN]) -> String {
    let mut out = String::with_capacity(BODY_LEN);
    let mut buffer: u16 = 0;
    let mut bits = 0;
    for byte in bytes {
        buffer = (buffer << 8) | u16::from(*byte);
        bits += 8;
        while bits >= 5 {
            bits -= 5;
            out.push(char::from(BASE32_ALPHABET[usize::from((buffer >> bits) & 0x1f)]));
        }
    }
    out
}

fn base32_decode(body: &str) -> Result<[u8; ACCOUNT_IDENTIFIER_LEN], AddressError> {
    let mut bytes = [0u8; ACCOUNT_IDENTIFIER_LEN];
    let mut buffer: u16 = 0;
    let mut bits = 0;
    let mut index = 0;
    for c in body.chars() {
        let value = u8::try_from(c)
            .ok()
            .and_then(|b| BASE32_ALPHABET.iter().position(|a| *a == b))
            .ok_or(AddressError::InvalidCharacter(c))?;
        buffer = (buffer << 5) | value as u16;
        bits += 5;
        if bits >= 8 {
            bits -= 8;
            bytes[index] = (buffer >> bits) as u8;
            index += 1;
        }
    }
    Ok(bytes)
}

/// IBAN check digits (ISO 13616) for `body` under the `NQ` country code.
fn check_digits(body: &str) -> String {
    let remainder = iban_remainder(&format!("{body}{COUNTRY_CODE}00"));
    format!("{:02}", 98 - remainder)
}

fn iban_remainder(text: &str) -> u32 {
    let mut remainder = 0u32;
    for c in text.chars() {
        let value = c.to_digit(36).unwrap_or_default();
        remainder = if value >= 10 {
            (remainder * 100 + value) % 97
        } else {
            (remainder * 10 + value) % 97
        };
    }
    remainder
}
