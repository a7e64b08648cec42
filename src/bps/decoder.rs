// BPS patch application: header, command interpreter, footer verification.
//
// The whole source, patch and target live in memory. Capacity for the
// target is reserved up front at its declared size, but bytes are only
// appended as commands produce them, strictly left to right; every command
// is bounds-checked before it touches a buffer.
//
// Performance notes:
//   - SourceRead/SourceCopy/TargetRead are single slice appends
//   - TargetCopy uses `extend_from_within` when the ranges do not overlap
//     and a byte-by-byte loop otherwise (run-length style self references)

use super::checksum::{self, Footer};
use super::command::{Command, CommandKind};
use super::diagnostics::{Diagnostics, LogDiagnostics};
use super::error::PatchError;
use super::header::{HeaderSizes, PatchHeader};
use super::reader::PatchReader;

// ---------------------------------------------------------------------------
// Stats
// ---------------------------------------------------------------------------

/// Per-opcode command counts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CommandCounts {
    pub source_read: u64,
    pub target_read: u64,
    pub source_copy: u64,
    pub target_copy: u64,
}

impl CommandCounts {
    /// Count one command of `kind`.
    pub fn record(&mut self, kind: CommandKind) {
        match kind {
            CommandKind::SourceRead => self.source_read += 1,
            CommandKind::TargetRead => self.target_read += 1,
            CommandKind::SourceCopy => self.source_copy += 1,
            CommandKind::TargetCopy => self.target_copy += 1,
        }
    }

    pub fn get(&self, kind: CommandKind) -> u64 {
        match kind {
            CommandKind::SourceRead => self.source_read,
            CommandKind::TargetRead => self.target_read,
            CommandKind::SourceCopy => self.source_copy,
            CommandKind::TargetCopy => self.target_copy,
        }
    }

    pub fn total(&self) -> u64 {
        self.source_read + self.target_read + self.source_copy + self.target_copy
    }
}

/// Summary of a successful application.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ApplyStats {
    pub source_size: u64,
    pub target_size: u64,
    pub patch_size: u64,
    pub metadata_len: u64,
    pub commands: CommandCounts,
}

// ---------------------------------------------------------------------------
// Interpreter
// ---------------------------------------------------------------------------

/// Target buffer plus the relative cursors, for one application.
///
/// The output cursor is `target.len()`.
struct Interpreter<'s> {
    source: &'s [u8],
    target: Vec<u8>,
    /// Declared target size; the buffer never grows past it.
    target_size: usize,
    /// Offset of the footer; no command byte may reach it.
    stream_end: usize,
    source_relative_offset: usize,
    target_relative_offset: usize,
}

impl<'s> Interpreter<'s> {
    fn new(source: &'s [u8], target_size: u64, stream_end: usize) -> Result<Self, PatchError> {
        let too_large = PatchError::TargetTooLarge { size: target_size };
        let len = usize::try_from(target_size).map_err(|_| too_large.clone())?;
        let mut target = Vec::new();
        target.try_reserve_exact(len).map_err(|_| too_large)?;

        Ok(Self {
            source,
            target,
            target_size: len,
            stream_end,
            source_relative_offset: 0,
            target_relative_offset: 0,
        })
    }

    fn output_offset(&self) -> usize {
        self.target.len()
    }

    /// Claim `len` bytes of output; returns the range about to be written.
    fn claim_output(
        &self,
        kind: CommandKind,
        len: u64,
    ) -> Result<std::ops::Range<usize>, PatchError> {
        let start = self.output_offset();
        usize::try_from(len)
            .ok()
            .and_then(|n| start.checked_add(n))
            .filter(|&end| end <= self.target_size)
            .map(|end| start..end)
            .ok_or(PatchError::CommandOutOfRange {
                command: kind,
                position: start as i64,
                len,
                limit: self.target_size,
            })
    }

    /// Apply a signed delta to a relative cursor.
    fn seek_relative(
        kind: CommandKind,
        cursor: usize,
        delta: i64,
        len: u64,
        limit: usize,
    ) -> Result<usize, PatchError> {
        isize::try_from(delta)
            .ok()
            .and_then(|d| cursor.checked_add_signed(d))
            .ok_or(PatchError::CommandOutOfRange {
                command: kind,
                position: (cursor as i64).saturating_add(delta),
                len,
                limit,
            })
    }

    fn execute<D: Diagnostics + ?Sized>(
        &mut self,
        command: Command,
        reader: &mut PatchReader<'_>,
        diag: &mut D,
    ) -> Result<(), PatchError> {
        let kind = command.kind();
        let out = self.claim_output(kind, command.len())?;
        let len = out.len();

        match command {
            Command::SourceRead { .. } => {
                diag.detail(format_args!(
                    "{kind}: Copy {len} source bytes to {:#08x}",
                    out.start
                ));
                let src = self.source.get(out.clone()).ok_or(PatchError::CommandOutOfRange {
                    command: kind,
                    position: out.start as i64,
                    len: len as u64,
                    limit: self.source.len(),
                })?;
                self.target.extend_from_slice(src);
            }

            Command::TargetRead { .. } => {
                diag.detail(format_args!(
                    "{kind}: Write {len} bytes to {:#08x}",
                    out.start
                ));
                let literal_end = reader.position().saturating_add(len);
                if literal_end > self.stream_end {
                    return Err(PatchError::FooterMisalignment {
                        expected: self.stream_end,
                        actual: literal_end,
                    });
                }
                let literal = reader.read_bytes(len)?;
                self.target.extend_from_slice(literal);
            }

            Command::SourceCopy { delta, .. } => {
                let from = Self::seek_relative(
                    kind,
                    self.source_relative_offset,
                    delta,
                    len as u64,
                    self.source.len(),
                )?;
                diag.detail(format_args!(
                    "{kind}: Copy {len} source bytes at {from:#08x} to {:#08x}",
                    out.start
                ));
                let src = from
                    .checked_add(len)
                    .and_then(|end| self.source.get(from..end))
                    .ok_or(PatchError::CommandOutOfRange {
                        command: kind,
                        position: from as i64,
                        len: len as u64,
                        limit: self.source.len(),
                    })?;
                self.target.extend_from_slice(src);
                self.source_relative_offset = from + len;
            }

            Command::TargetCopy { delta, .. } => {
                let from = Self::seek_relative(
                    kind,
                    self.target_relative_offset,
                    delta,
                    len as u64,
                    out.start,
                )?;
                diag.detail(format_args!(
                    "{kind}: Copy {len} target bytes at {from:#08x} to {:#08x}",
                    out.start
                ));
                // Only bytes already produced may be read.
                if from >= out.start {
                    return Err(PatchError::CommandOutOfRange {
                        command: kind,
                        position: from as i64,
                        len: len as u64,
                        limit: out.start,
                    });
                }
                if from + len <= out.start {
                    self.target.extend_from_within(from..from + len);
                } else {
                    // Overlapping: each read sees bytes written earlier in
                    // this same command.
                    for i in 0..len {
                        let byte = self.target[from + i];
                        self.target.push(byte);
                    }
                }
                self.target_relative_offset = from + len;
            }
        }

        debug_assert_eq!(self.target.len(), out.end);
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Applier
// ---------------------------------------------------------------------------

/// Apply `patch` to `source`, returning the verified target and stats.
///
/// Steps:
/// 1. Header: magic, sizes, metadata; the declared source size must match
/// 2. Commands until the footer offset (`patch.len() - 12`)
/// 3. Footer: source, target and patch CRC32 must all match
pub fn apply_patch<D: Diagnostics + ?Sized>(
    source: &[u8],
    patch: &[u8],
    diag: &mut D,
) -> Result<(Vec<u8>, ApplyStats), PatchError> {
    let mut reader = PatchReader::new(patch);
    let sizes = HeaderSizes::decode(&mut reader)?;
    diag.message(format_args!(
        "BPS patch: source {} bytes, target {} bytes, metadata {} bytes",
        sizes.source_size, sizes.target_size, sizes.metadata_len
    ));
    sizes.check_source(source)?;

    let header = PatchHeader::read_metadata(sizes, &mut reader)?;
    let footer_start = checksum::footer_start(patch)?;
    if !header.metadata.is_empty() {
        diag.message(format_args!("Metadata: {}", header.metadata_str()));
    }

    let mut interp = Interpreter::new(source, header.target_size, footer_start)?;
    let mut counts = CommandCounts::default();

    while reader.position() < footer_start {
        let command = Command::decode(&mut reader)?;
        if reader.position() > footer_start {
            return Err(PatchError::FooterMisalignment {
                expected: footer_start,
                actual: reader.position(),
            });
        }
        interp.execute(command, &mut reader, diag)?;
        counts.record(command.kind());
    }

    // The stream reached the footer while the target still wanted bytes.
    if interp.output_offset() != interp.target_size {
        diag.warning(format_args!(
            "Command stream wrote {} of {} target bytes",
            interp.output_offset(),
            interp.target_size
        ));
        return Err(PatchError::TruncatedInput {
            offset: footer_start,
            wanted: 1,
        });
    }

    let footer = Footer::decode(&mut reader)?;
    footer.verify(source, &interp.target, patch, diag)?;

    let stats = ApplyStats {
        source_size: header.source_size,
        target_size: header.target_size,
        patch_size: patch.len() as u64,
        metadata_len: header.metadata.len() as u64,
        commands: counts,
    };
    diag.message(format_args!(
        "applied {} commands, {} bytes written",
        counts.total(),
        interp.target.len()
    ));
    Ok((interp.target, stats))
}

/// Apply `patch` to `source`, reporting progress through `diag`.
pub fn apply_with<D: Diagnostics + ?Sized>(
    source: &[u8],
    patch: &[u8],
    diag: &mut D,
) -> Result<Vec<u8>, PatchError> {
    apply_patch(source, patch, diag).map(|(target, _)| target)
}

/// Apply `patch` to `source`, reporting progress through the `log` crate.
pub fn apply(source: &[u8], patch: &[u8]) -> Result<Vec<u8>, PatchError> {
    apply_with(source, patch, &mut LogDiagnostics)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
