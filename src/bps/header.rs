// BPS patch header: magic, declared sizes and the metadata block.

use std::borrow::Cow;

use super::error::PatchError;
use super::reader::PatchReader;
use super::varint;

// ---------------------------------------------------------------------------
// BPS magic
// ---------------------------------------------------------------------------

pub const BPS_MAGIC: [u8; 4] = *b"BPS1";

// ---------------------------------------------------------------------------
// Declared sizes
// ---------------------------------------------------------------------------

/// Magic plus the three leading numbers, read before the metadata block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HeaderSizes {
    pub source_size: u64,
    pub target_size: u64,
    pub metadata_len: u64,
}

impl HeaderSizes {
    /// Decode the magic and the three sizes.
    pub fn decode(reader: &mut PatchReader<'_>) -> Result<Self, PatchError> {
        let magic = reader.read_bytes(BPS_MAGIC.len())?;
        if magic != BPS_MAGIC {
            return Err(PatchError::BadMagic {
                found: magic.to_vec(),
            });
        }

        Ok(Self {
            source_size: reader.read_number()?,
            target_size: reader.read_number()?,
            metadata_len: reader.read_number()?,
        })
    }

    /// Check the declared source size against the actual source buffer.
    pub fn check_source(&self, source: &[u8]) -> Result<(), PatchError> {
        if self.source_size != source.len() as u64 {
            return Err(PatchError::SourceSizeMismatch {
                expected: self.source_size,
                actual: source.len(),
            });
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Patch header
// ---------------------------------------------------------------------------

/// Parsed BPS header.
///
/// The metadata block borrows from the patch; it is opaque and carried
/// through unchanged.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PatchHeader<'a> {
    /// Declared length of the source the patch applies to.
    pub source_size: u64,
    /// Declared length of the target the patch produces.
    pub target_size: u64,
    /// Raw metadata bytes (often UTF-8 XML, never interpreted here).
    pub metadata: &'a [u8],
}

impl<'a> PatchHeader<'a> {
    /// Decode the header from the start of a patch.
    ///
    /// Layout:
    /// 1. Magic `"BPS1"` (4 bytes)
    /// 2. source_size, target_size, metadata_len (numbers)
    /// 3. metadata (metadata_len bytes)
    pub fn decode(reader: &mut PatchReader<'a>) -> Result<Self, PatchError> {
        let sizes = HeaderSizes::decode(reader)?;
        Self::read_metadata(sizes, reader)
    }

    /// Finish a header whose sizes were already decoded by reading the
    /// metadata block that follows them.
    pub fn read_metadata(
        sizes: HeaderSizes,
        reader: &mut PatchReader<'a>,
    ) -> Result<Self, PatchError> {
        let metadata_offset = reader.position();
        let metadata_len =
            usize::try_from(sizes.metadata_len).map_err(|_| PatchError::TruncatedInput {
                offset: metadata_offset,
                wanted: usize::MAX,
            })?;
        let metadata = reader.read_bytes(metadata_len)?;

        Ok(Self {
            source_size: sizes.source_size,
            target_size: sizes.target_size,
            metadata,
        })
    }

    pub fn sizes(&self) -> HeaderSizes {
        HeaderSizes {
            source_size: self.source_size,
            target_size: self.target_size,
            metadata_len: self.metadata.len() as u64,
        }
    }

    /// Check the declared source size against the actual source buffer.
    pub fn check_source(&self, source: &[u8]) -> Result<(), PatchError> {
        self.sizes().check_source(source)
    }

    /// Metadata as text, lossily decoded.
    pub fn metadata_str(&self) -> Cow<'a, str> {
        String::from_utf8_lossy(self.metadata)
    }

    /// Append the encoded header to `out`.
    pub fn encode(&self, out: &mut Vec<u8>) {
        out.extend_from_slice(&BPS_MAGIC);
        varint::push_u64(out, self.source_size);
        varint::push_u64(out, self.target_size);
        varint::push_u64(out, self.metadata.len() as u64);
        out.extend_from_slice(self.metadata);
    }

    /// Size of the encoded header in bytes.
    pub fn encoded_len(&self) -> usize {
        BPS_MAGIC.len()
            + varint::sizeof_u64(self.source_size)
            + varint::sizeof_u64(self.target_size)
            + varint::sizeof_u64(self.metadata.len() as u64)
            + self.metadata.len()
    }
}
