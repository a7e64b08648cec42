// BPS patch format implementation.
//
// This module applies BPS ("BPS1") binary patches to an in-memory source.
//
// # Modules
//
// - `varint`      Variable-length integer encoding (base-128, little-endian, end bit)
// - `reader`      Cursor over the patch bytes
// - `header`      Magic, declared sizes and metadata block
// - `command`     The four opcodes, their encoding and an inspection iterator
// - `checksum`    Footer CRC32 triple and verification
// - `diagnostics` Progress reporting seam (log facade by default)
// - `decoder`     Command interpreter and the `apply` entry points
// - `error`       `PatchError`

pub mod checksum;
pub mod command;
pub mod decoder;
pub mod diagnostics;
pub mod error;
pub mod header;
pub mod reader;
pub mod varint;

// Re-export key types for convenience.
pub use checksum::{Checksum, ChecksumKind, FOOTER_LEN, Footer};
pub use command::{Command, CommandEntry, CommandIterator, CommandKind};
pub use decoder::{ApplyStats, CommandCounts, apply, apply_patch, apply_with};
pub use diagnostics::{Diagnostics, LogDiagnostics, NoDiagnostics};
pub use error::{HexBytes, PatchError};
pub use header::{BPS_MAGIC, HeaderSizes, PatchHeader};
pub use reader::PatchReader;

/// Parse a patch's header and footer without applying it.
///
/// Returns the header, the declared footer checksums, and an iterator over
/// the command stream.
pub fn inspect(patch: &[u8]) -> Result<(PatchHeader<'_>, Footer, CommandIterator<'_>), PatchError> {
    let mut reader = PatchReader::new(patch);
    let header = PatchHeader::decode(&mut reader)?;
    let footer = Footer::from_patch(patch)?;
    let end = checksum::footer_start(patch)?;
    Ok((header, footer, CommandIterator::new(reader, end)))
}
