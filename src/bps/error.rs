// Errors raised while reading or applying a BPS patch.

use std::fmt;

use super::checksum::{Checksum, ChecksumKind};
use super::command::CommandKind;

/// Every way a patch application can fail.
///
/// All variants are terminal: the partially built target is dropped and
/// never handed back to the caller.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PatchError {
    /// The patch ended before a read or number completed.
    #[error("unexpected end of patch: tried to read {wanted} bytes at {offset:#08x}")]
    TruncatedInput { offset: usize, wanted: usize },

    /// A number in the patch does not fit in 64 bits.
    #[error("number at {offset:#08x} overflows 64 bits")]
    NumberOverflow { offset: usize },

    /// The patch does not start with `BPS1`; `found` holds the bytes read.
    #[error("patch does not have a BPS header (found {})", HexBytes(.found))]
    BadMagic { found: Vec<u8> },

    /// The source length differs from the size declared in the header.
    #[error("expected source size of {expected} bytes, got {actual} bytes instead")]
    SourceSizeMismatch { expected: u64, actual: usize },

    /// A command opcode outside the four defined ones.
    #[error("unrecognized command {opcode:#04x} at {offset:#08x}")]
    UnrecognizedCommand { opcode: u64, offset: usize },

    /// The declared target size cannot be allocated.
    #[error("declared target size of {size} bytes cannot be allocated")]
    TargetTooLarge { size: u64 },

    /// A command reads or writes outside the buffer it addresses.
    #[error("{command}: {len} bytes at {position} exceed limit {limit}")]
    CommandOutOfRange {
        command: CommandKind,
        position: i64,
        len: u64,
        limit: usize,
    },

    /// A command or its literal bytes run into the footer.
    #[error("command stream ended at {actual:#08x}, footer starts at {expected:#08x}")]
    FooterMisalignment { expected: usize, actual: usize },

    /// One of the three footer checksums does not match the computed CRC32.
    #[error("{which} CRC32 mismatch: expected {expected} but computed {actual}")]
    ChecksumMismatch {
        which: ChecksumKind,
        expected: Checksum,
        actual: Checksum,
    },
}

/// Displays bytes as contiguous lowercase hex.
pub struct HexBytes<'a>(pub &'a [u8]);

impl fmt::Display for HexBytes<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for b in self.0 {
            write!(f, "{b:02x}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hex_bytes_display() {
        assert_eq!(HexBytes(&[0x00, 0xab, 0x10]).to_string(), "00ab10");
        assert_eq!(HexBytes(&[]).to_string(), "");
    }

    #[test]
    fn messages_name_offsets_and_values() {
        let e = PatchError::TruncatedInput {
            offset: 0x1a,
            wanted: 4,
        };
        assert_eq!(
            e.to_string(),
            "unexpected end of patch: tried to read 4 bytes at 0x00001a"
        );

        let e = PatchError::BadMagic {
            found: b"PK\x03\x04".to_vec(),
        };
        assert_eq!(
            e.to_string(),
            "patch does not have a BPS header (found 504b0304)"
        );

        let e = PatchError::ChecksumMismatch {
            which: ChecksumKind::Target,
            expected: Checksum(0xdeadbeef),
            actual: Checksum(0x0000_00ff),
        };
        assert_eq!(
            e.to_string(),
            "target CRC32 mismatch: expected deadbeef but computed 000000ff"
        );
    }
}
