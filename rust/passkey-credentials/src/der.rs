//! Minimal DER codec for two-integer signatures.
//!
//! Authenticators emit ECDSA signatures (and, for some vendors, Ed25519
//! signatures) as an ASN.1 `SEQUENCE { r INTEGER, s INTEGER }`. This module
//! understands exactly that shape and nothing else:
//!
//! ```text
//! 30 len
//!    02 len_r r...   (big-endian, leading 0x00 when the high bit is set)
//!    02 len_s s...
//! ```
//!
//! Each integer is stripped of DER's sign padding and left-padded to
//! [`SCALAR_LEN`] bytes, so the result is always the fixed-width `r || s`.

use crate::CodecError;

/// Width of each signature integer in the raw encoding.
pub const SCALAR_LEN: usize = 32;

const SEQUENCE: u8 = 0x30;
const INTEGER: u8 = 0x02;

/// Decode a DER `SEQUENCE` of two `INTEGER`s into raw `r || s`.
///
/// # Errors
///
/// Returns [`CodecError::MalformedSignature`] if the tags or lengths are
/// inconsistent, if bytes trail the sequence, or if an integer is empty,
/// negative, not minimally encoded, or wider than [`SCALAR_LEN`] once sign
/// padding is removed.
pub fn decode_signature(bytes: &[u8]) -> Result<[u8; 2 * SCALAR_LEN], CodecError> {
    let mut outer = DerReader::new(bytes);
    let sequence = outer.read_tlv(SEQUENCE)?;
    if !outer.is_empty() {
        return Err(malformed(format!(
            "{} bytes trail the signature sequence",
            outer.remaining()
        )));
    }

    let mut inner = DerReader::new(sequence);
    let r = inner.read_integer()?;
    let s = inner.read_integer()?;
    if !inner.is_empty() {
        return Err(malformed("sequence holds more than two integers"));
    }

    let mut raw = [0u8; 2 * SCALAR_LEN];
    raw[SCALAR_LEN - r.len()..SCALAR_LEN].copy_from_slice(r);
    raw[2 * SCALAR_LEN - s.len()..].copy_from_slice(s);
    Ok(raw)
}

/// Encode raw `r || s` as a minimal DER `SEQUENCE` of two `INTEGER`s.
#[must_use]
pub fn encode_signature(raw: &[u8; 2 * SCALAR_LEN]) -> Vec<u8> {
    let (r, s) = raw.split_at(SCALAR_LEN);
    let mut body = Vec::with_capacity(2 * (SCALAR_LEN + 3));
    write_integer(&mut body, r);
    write_integer(&mut body, s);

    let mut der = Vec::with_capacity(body.len() + 2);
    der.push(SEQUENCE);
    der.push(body.len() as u8);
    der.extend_from_slice(&body);
    der
}

fn write_integer(out: &mut Vec<u8>, scalar: &[u8]) {
    let first = scalar
        .iter()
        .position(|b| *b != 0)
        .unwrap_or(scalar.len() - 1);
    let digits = &scalar[first..];
    let pad = digits[0] & 0x80 != 0;

    out.push(INTEGER);
    out.push((digits.len() + usize::from(pad)) as u8);
    if pad {
        out.push(0x00);
    }
    out.extend_from_slice(digits);
}

fn malformed(reason: impl Into<String>) -> CodecError {
    CodecError::MalformedSignature(reason.into())
}

struct DerReader<'a> {
    bytes: &'a [u8],
}

impl<'a> DerReader<'a> {
    fn new(bytes: &'a [u8]) -> Self {
        Self { bytes }
    }

    fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    fn remaining(&self) -> usize {
        self.bytes.len()
    }

    fn read_byte(&mut self) -> Result<u8, CodecError> {
        let (first, rest) = self
            .bytes
            .split_first()
            .ok_or_else(|| malformed("unexpected end of input"))?;
        self.bytes = rest;
        Ok(*first)
    }

    /// Short form, or the single-byte long form `0x81 len`.
    fn read_length(&mut self) -> Result<usize, CodecError> {
        match self.read_byte()? {
            len @ 0x00..=0x7f => Ok(usize::from(len)),
            0x81 => {
                let len = self.read_byte()?;
                if len < 0x80 {
                    return Err(malformed("non-minimal length encoding"));
                }
                Ok(usize::from(len))
            }
            other => Err(malformed(format!("unsupported length octet {other:#04x}"))),
        }
    }

    fn read_tlv(&mut self, tag: u8) -> Result<&'a [u8], CodecError> {
        let found = self.read_byte()?;
        if found != tag {
            return Err(malformed(format!(
                "expected tag {tag:#04x}, found {found:#04x}"
            )));
        }
        let len = self.read_length()?;
        if len > self.bytes.len() {
            return Err(malformed(format!(
                "length {len} exceeds the {} remaining bytes",
                self.bytes.len()
            )));
        }
        let (value, rest) = self.bytes.split_at(len);
        self.bytes = rest;
        Ok(value)
    }

    fn read_integer(&mut self) -> Result<&'a [u8], CodecError> {
        let value = self.read_tlv(INTEGER)?;
        let first = *value
            .first()
            .ok_or_else(|| malformed("empty integer"))?;
        if first & 0x80 != 0 {
            return Err(malformed("negative integer"));
        }
        if first == 0x00 && value.get(1).is_some_and(|next| next & 0x80 == 0) {
            return Err(malformed("non-minimal integer encoding"));
        }
        let start = value
            .iter()
            .position(|b| *b != 0)
            .unwrap_or(value.len());
        let digits = &value[start..];
        if digits.len() > SCALAR_LEN {
            return Err(malformed(format!(
                "integer is {} bytes wide, expected at most {SCALAR_LEN}",
                digits.len()
            )));
        }
        Ok(digits)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw(r: u8, s: u8) -> [u8; 64] {
        let mut raw = [0u8; 64];
        raw[..32].fill(r);
        raw[32..].fill(s);
        raw
    }

    #[test]
    fn high_bit_integers_get_a_zero_pad() {
        let der = encode_signature(&raw(0x80, 0x01));
        // 0x80... needs a sign byte, 0x01... does not
        assert_eq!(&der[..5], &[0x30, 0x45, 0x02, 0x21, 0x00]);
        assert_eq!(der.len(), 71);
        assert_eq!(decode_signature(&der).unwrap(), raw(0x80, 0x01));
    }

    #[test]
    fn short_integers_are_left_padded() {
        let der = [0x30, 0x06, 0x02, 0x01, 0x05, 0x02, 0x01, 0x07];
        let decoded = decode_signature(&der).unwrap();
        assert_eq!(decoded[31], 0x05);
        assert_eq!(decoded[63], 0x07);
        assert!(decoded[..31].iter().all(|b| *b == 0));
        assert!(decoded[32..63].iter().all(|b| *b == 0));
    }

    #[test]
    fn zero_scalar_roundtrips() {
        let mut value = raw(0x11, 0x22);
        value[..32].fill(0);
        let der = encode_signature(&value);
        assert_eq!(&der[2..5], &[0x02, 0x01, 0x00]);
        assert_eq!(decode_signature(&der).unwrap(), value);
    }

    #[test]
    fn sequence_length_must_match_content() {
        let mut der = encode_signature(&raw(0x12, 0x34));
        der[1] += 1;
        assert!(matches!(
            decode_signature(&der),
            Err(CodecError::MalformedSignature(_))
        ));

        let mut der = encode_signature(&raw(0x12, 0x34));
        der[1] -= 1;
        assert!(decode_signature(&der).is_err());
    }

    #[test]
    fn trailing_bytes_are_rejected() {
        let mut der = encode_signature(&raw(0x12, 0x34));
        der.push(0x00);
        assert!(decode_signature(&der).is_err());
    }

    #[test]
    fn wrong_tags_are_rejected() {
        let mut der = encode_signature(&raw(0x12, 0x34));
        der[0] = 0x31;
        assert!(decode_signature(&der).is_err());

        let mut der = encode_signature(&raw(0x12, 0x34));
        der[2] = 0x04;
        assert!(decode_signature(&der).is_err());
    }

    #[test]
    fn negative_and_oversized_integers_are_rejected() {
        let negative = [0x30, 0x06, 0x02, 0x01, 0x85, 0x02, 0x01, 0x07];
        assert!(decode_signature(&negative).is_err());

        let mut oversized = vec![0x30, 0x26, 0x02, 0x21];
        oversized.extend_from_slice(&[0x7f; 33]);
        oversized.extend_from_slice(&[0x02, 0x01, 0x01]);
        assert!(decode_signature(&oversized).is_err());
    }

    #[test]
    fn redundant_leading_zeros_are_rejected() {
        let padded = [0x30, 0x07, 0x02, 0x02, 0x00, 0x05, 0x02, 0x01, 0x07];
        assert!(matches!(
            decode_signature(&padded),
            Err(CodecError::MalformedSignature(_))
        ));

        let double_pad = [0x30, 0x08, 0x02, 0x03, 0x00, 0x00, 0x85, 0x02, 0x01, 0x07];
        assert!(decode_signature(&double_pad).is_err());

        // A single zero byte is the minimal encoding of zero
        let zero = [0x30, 0x06, 0x02, 0x01, 0x00, 0x02, 0x01, 0x07];
        assert!(decode_signature(&zero).is_ok());
    }

    #[test]
    fn non_minimal_long_form_length_is_rejected() {
        let short = encode_signature(&raw(0x80, 0x80));
        assert!(short[1] < 0x80);
        let mut long = vec![0x30, 0x81];
        long.extend_from_slice(&short[1..]);
        // 0x46 < 0x80 is non-minimal in long form
        assert!(decode_signature(&long).is_err());
    }

    #[test]
    fn empty_input_is_rejected() {
        assert!(decode_signature(&[]).is_err());
        assert!(decode_signature(&[0x30]).is_err());
        assert!(decode_signature(&[0x30, 0x00]).is_err());
    }
}
