// Cursor over an in-memory BPS patch.

use super::checksum::Checksum;
use super::error::PatchError;
use super::varint::{self, VarIntError};

/// Forward-only reader over the patch bytes.
///
/// Every primitive either consumes exactly what it returns or fails without
/// moving the cursor.
#[derive(Debug, Clone)]
pub struct PatchReader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> PatchReader<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    /// Current offset into the patch.
    #[inline]
    pub fn position(&self) -> usize {
        self.pos
    }

    /// Bytes left after the cursor.
    #[inline]
    pub fn remaining(&self) -> usize {
        self.data.len() - self.pos
    }

    /// Total patch length.
    #[inline]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Move the cursor to an absolute offset (clamped to the patch length).
    pub fn seek(&mut self, pos: usize) {
        self.pos = pos.min(self.data.len());
    }

    /// Read the next `n` bytes.
    pub fn read_bytes(&mut self, n: usize) -> Result<&'a [u8], PatchError> {
        let end = self
            .pos
            .checked_add(n)
            .filter(|&end| end <= self.data.len())
            .ok_or(PatchError::TruncatedInput {
                offset: self.pos,
                wanted: n,
            })?;
        let data = self.data;
        let bytes = &data[self.pos..end];
        self.pos = end;
        Ok(bytes)
    }

    /// Read a single byte.
    #[inline]
    pub fn read_u8(&mut self) -> Result<u8, PatchError> {
        Ok(self.read_bytes(1)?[0])
    }

    /// Decode one BPS number.
    ///
    /// A number cut off by the end of the patch is reported as one byte
    /// wanted past the last byte available.
    pub fn read_number(&mut self) -> Result<u64, PatchError> {
        let (value, next) = varint::read_u64(self.data, self.pos).map_err(|e| match e {
            VarIntError::Truncated => PatchError::TruncatedInput {
                offset: self.data.len(),
                wanted: 1,
            },
            VarIntError::Overflow => PatchError::NumberOverflow { offset: self.pos },
        })?;
        self.pos = next;
        Ok(value)
    }

    /// Read a 4-byte footer checksum (stored little-endian).
    pub fn read_checksum(&mut self) -> Result<Checksum, PatchError> {
        let bytes = self.read_bytes(4)?;
        Ok(Checksum(u32::from_le_bytes([
            bytes[0], bytes[1], bytes[2], bytes[3],
        ])))
    }
}
