//! Compact encoding of WebAuthn `clientDataJSON`.
//!
//! Browsers serialize client data as a JSON object whose first three members
//! are fixed (`type`, `challenge`, `origin`), optionally followed by
//! `"crossOrigin":false` and by arbitrary extra members. When the verifier
//! already knows the challenge and the origin, the object can be rebuilt from
//! a flag byte plus the extra members, which is much smaller than the JSON.
//!
//! Two layouts are understood:
//!
//! ```text
//! {"type":"webauthn.get","challenge":"..","origin":"..","crossOrigin":false,<extras>}
//! {"type":"webauthn.get","challenge":"..","origin":"..",<extras>}
//! ```
//!
//! In both, the origin may have its `/` characters escaped as `\/`. Anything
//! else will not survive [`ClientDataContext::reconstruct`]; callers must
//! compare the reconstruction against the original before relying on it.

use crate::ProofError;
use crate::wire::{Reader, write_prefixed};
use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;

const CROSS_ORIGIN_FIELD: &str = r#""crossOrigin":false"#;

/// Flag bits describing the layout of a compacted `clientDataJSON`.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ClientDataFlags(u8);

impl ClientDataFlags {
    /// The JSON has no `"crossOrigin":false` member.
    pub const NO_CROSSORIGIN_FIELD: Self = Self(1 << 0);

    /// The origin's `/` characters are escaped as `\/`.
    pub const ESCAPED_ORIGIN_SLASHES: Self = Self(1 << 1);

    const KNOWN: u8 = Self::NO_CROSSORIGIN_FIELD.0 | Self::ESCAPED_ORIGIN_SLASHES.0;

    /// Interpret a flag byte, rejecting bits this decoder does not know.
    ///
    /// # Errors
    ///
    /// Returns [`ProofError::UnknownFlags`] if unknown bits are set.
    pub fn from_bits(bits: u8) -> Result<Self, ProofError> {
        if bits & !Self::KNOWN != 0 {
            return Err(ProofError::UnknownFlags(bits));
        }
        Ok(Self(bits))
    }

    /// The raw flag byte.
    #[must_use]
    pub const fn bits(self) -> u8 {
        self.0
    }

    /// Whether all bits of `other` are set.
    #[must_use]
    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    /// Set the bits of `other`.
    pub fn insert(&mut self, other: Self) {
        self.0 |= other.0;
    }
}

/// What remains of a `clientDataJSON` once the challenge and origin are
/// stripped out.
#[derive(Debug, Default, Clone, PartialEq, Eq, Hash)]
pub struct ClientDataContext {
    /// Layout flags.
    pub flags: ClientDataFlags,
    /// Members following the last recognized field, without the separating
    /// comma and the closing brace.
    pub extra_fields: Option<String>,
}

impl ClientDataContext {
    /// Scan `client_data` for the known field layouts.
    ///
    /// When neither `"crossOrigin":false` nor the origin member is found the
    /// context keeps its flags but no extra fields.
    #[must_use]
    pub fn extract(client_data: &str, origin: &str) -> Self {
        let standard = origin_field(origin, false);
        let escaped = origin_field(origin, true);
        let mut flags = ClientDataFlags::default();

        let tail = match client_data.split_once(CROSS_ORIGIN_FIELD) {
            Some((head, tail)) => {
                if !head.contains(&standard) && head.contains(&escaped) {
                    flags.insert(ClientDataFlags::ESCAPED_ORIGIN_SLASHES);
                }
                Some(tail)
            }
            None => {
                flags.insert(ClientDataFlags::NO_CROSSORIGIN_FIELD);
                if let Some((_, tail)) = client_data.split_once(&standard) {
                    Some(tail)
                } else if let Some((_, tail)) = client_data.split_once(&escaped) {
                    flags.insert(ClientDataFlags::ESCAPED_ORIGIN_SLASHES);
                    Some(tail)
                } else {
                    None
                }
            }
        };

        Self {
            flags,
            extra_fields: tail.and_then(extra_fields),
        }
    }

    /// Rebuild the `clientDataJSON` text for a `webauthn.get` ceremony.
    #[must_use]
    pub fn reconstruct(&self, challenge: &[u8], origin: &str) -> String {
        let escaped = self
            .flags
            .contains(ClientDataFlags::ESCAPED_ORIGIN_SLASHES);
        let mut json = format!(
            r#"{{"type":"webauthn.get","challenge":"{}",{}"#,
            URL_SAFE_NO_PAD.encode(challenge),
            origin_field(origin, escaped)
        );
        if !self.flags.contains(ClientDataFlags::NO_CROSSORIGIN_FIELD) {
            json.push(',');
            json.push_str(CROSS_ORIGIN_FIELD);
        }
        if let Some(extra) = &self.extra_fields {
            json.push(',');
            json.push_str(extra);
        }
        json.push('}');
        json
    }

    pub(crate) fn write_to(&self, out: &mut Vec<u8>) {
        out.push(self.flags.bits());
        write_prefixed(
            out,
            self.extra_fields.as_deref().unwrap_or_default().as_bytes(),
        );
    }

    pub(crate) fn read_from(reader: &mut Reader<'_>) -> Result<Self, ProofError> {
        let flags = ClientDataFlags::from_bits(reader.read_u8("client data flags")?)?;
        let extra = reader.read_prefixed("client data extra fields")?;
        let extra_fields = if extra.is_empty() {
            None
        } else {
            Some(
                std::str::from_utf8(extra)
                    .map_err(|_| ProofError::InvalidUtf8)?
                    .to_owned(),
            )
        };
        Ok(Self {
            flags,
            extra_fields,
        })
    }
}

fn origin_field(origin: &str, escaped: bool) -> String {
    if escaped {
        format!(r#""origin":"{}""#, origin.replace('/', r"\/"))
    } else {
        format!(r#""origin":"{origin}""#)
    }
}

/// Drop the leading comma and the trailing brace from what follows the last
/// recognized member.
fn extra_fields(tail: &str) -> Option<String> {
    let mut chars = tail.chars();
    chars.next()?;
    chars.next_back()?;
    let extra = chars.as_str();
    (!extra.is_empty()).then(|| extra.to_owned())
}
