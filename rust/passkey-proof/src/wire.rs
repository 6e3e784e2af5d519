//! Byte-level helpers shared by the proof encoders.

use crate::ProofError;

/// Append `bytes` with an unsigned LEB128 length prefix.
pub(crate) fn write_prefixed(out: &mut Vec<u8>, bytes: &[u8]) {
    leb128::write::unsigned(out, bytes.len() as u64).expect("write to Vec never fails");
    out.extend_from_slice(bytes);
}

/// Forward-only reader over an encoded proof.
///
/// Each read names the field it is reading so truncation errors point at the
/// part of the proof that was cut short.
pub(crate) struct Reader<'a> {
    bytes: &'a [u8],
}

impl<'a> Reader<'a> {
    pub(crate) fn new(bytes: &'a [u8]) -> Self {
        Self { bytes }
    }

    pub(crate) fn read_u8(&mut self, field: &'static str) -> Result<u8, ProofError> {
        let (first, rest) = self
            .bytes
            .split_first()
            .ok_or(ProofError::Truncated(field))?;
        self.bytes = rest;
        Ok(*first)
    }

    pub(crate) fn read_exact(
        &mut self,
        len: usize,
        field: &'static str,
    ) -> Result<&'a [u8], ProofError> {
        if len > self.bytes.len() {
            return Err(ProofError::Truncated(field));
        }
        let (value, rest) = self.bytes.split_at(len);
        self.bytes = rest;
        Ok(value)
    }

    pub(crate) fn read_len(&mut self, field: &'static str) -> Result<usize, ProofError> {
        let mut rest = self.bytes;
        let len =
            leb128::read::unsigned(&mut rest).map_err(|_| ProofError::Truncated(field))?;
        self.bytes = rest;
        usize::try_from(len).map_err(|_| ProofError::Truncated(field))
    }

    pub(crate) fn read_prefixed(&mut self, field: &'static str) -> Result<&'a [u8], ProofError> {
        let len = self.read_len(field)?;
        self.read_exact(len, field)
    }

    pub(crate) fn finish(self) -> Result<(), ProofError> {
        if self.bytes.is_empty() {
            Ok(())
        } else {
            Err(ProofError::TrailingBytes(self.bytes.len()))
        }
    }
}
