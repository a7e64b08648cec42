// BPS command stream: the four opcodes and their encoding.
//
// Each command starts with one number: the low 2 bits select the opcode,
// the remaining bits hold `length - 1`. The copy opcodes are followed by a
// second number carrying a signed delta (bit 0 = sign, rest = magnitude)
// applied to that opcode's relative cursor.

use std::fmt;

use super::error::PatchError;
use super::reader::PatchReader;
use super::varint;

pub const SOURCE_READ: u64 = 0;
pub const TARGET_READ: u64 = 1;
pub const SOURCE_COPY: u64 = 2;
pub const TARGET_COPY: u64 = 3;

const OPCODE_MASK: u64 = 3;
const LENGTH_SHIFT: u32 = 2;

/// Opcode without its payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CommandKind {
    SourceRead,
    TargetRead,
    SourceCopy,
    TargetCopy,
}

impl CommandKind {
    pub const ALL: [CommandKind; 4] = [
        CommandKind::SourceRead,
        CommandKind::TargetRead,
        CommandKind::SourceCopy,
        CommandKind::TargetCopy,
    ];

    pub fn from_opcode(opcode: u64) -> Option<Self> {
        match opcode {
            SOURCE_READ => Some(Self::SourceRead),
            TARGET_READ => Some(Self::TargetRead),
            SOURCE_COPY => Some(Self::SourceCopy),
            TARGET_COPY => Some(Self::TargetCopy),
            _ => None,
        }
    }

    pub fn opcode(self) -> u64 {
        match self {
            Self::SourceRead => SOURCE_READ,
            Self::TargetRead => TARGET_READ,
            Self::SourceCopy => SOURCE_COPY,
            Self::TargetCopy => TARGET_COPY,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::SourceRead => "sourceRead",
            Self::TargetRead => "targetRead",
            Self::SourceCopy => "sourceCopy",
            Self::TargetCopy => "targetCopy",
        }
    }
}

impl fmt::Display for CommandKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.name())
    }
}

/// Split a command's leading number into `(opcode, length)`.
#[inline]
pub fn split_command(data: u64) -> (u64, u64) {
    (data & OPCODE_MASK, (data >> LENGTH_SHIFT) + 1)
}

/// Decode a copy delta: bit 0 is the sign, the rest the magnitude.
#[inline]
pub fn decode_delta(data: u64) -> i64 {
    // `data >> 1` always fits in i64.
    let magnitude = (data >> 1) as i64;
    if data & 1 != 0 { -magnitude } else { magnitude }
}

/// Encode a copy delta. `delta` must not be `i64::MIN`.
#[inline]
pub fn encode_delta(delta: i64) -> u64 {
    debug_assert_ne!(delta, i64::MIN, "delta magnitude exceeds 63 bits");
    (delta.unsigned_abs() << 1) | u64::from(delta < 0)
}

/// One decoded command.
///
/// `TargetRead` carries only its length; its literal bytes follow the
/// command in the patch and are consumed when the command executes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    /// Copy `len` bytes from the source at the current output offset.
    SourceRead { len: u64 },
    /// Copy `len` literal bytes from the patch.
    TargetRead { len: u64 },
    /// Move the source cursor by `delta`, then copy `len` source bytes.
    SourceCopy { len: u64, delta: i64 },
    /// Move the target cursor by `delta`, then copy `len` bytes of output.
    TargetCopy { len: u64, delta: i64 },
}

impl Command {
    pub fn kind(&self) -> CommandKind {
        match self {
            Self::SourceRead { .. } => CommandKind::SourceRead,
            Self::TargetRead { .. } => CommandKind::TargetRead,
            Self::SourceCopy { .. } => CommandKind::SourceCopy,
            Self::TargetCopy { .. } => CommandKind::TargetCopy,
        }
    }

    /// Number of target bytes this command produces (always >= 1 when decoded).
    pub fn len(&self) -> u64 {
        match *self {
            Self::SourceRead { len }
            | Self::TargetRead { len }
            | Self::SourceCopy { len, .. }
            | Self::TargetCopy { len, .. } => len,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Decode the next command header (and delta, for copies).
    pub fn decode(reader: &mut PatchReader<'_>) -> Result<Self, PatchError> {
        let offset = reader.position();
        let (opcode, len) = split_command(reader.read_number()?);
        let kind = CommandKind::from_opcode(opcode)
            .ok_or(PatchError::UnrecognizedCommand { opcode, offset })?;

        Ok(match kind {
            CommandKind::SourceRead => Self::SourceRead { len },
            CommandKind::TargetRead => Self::TargetRead { len },
            CommandKind::SourceCopy => Self::SourceCopy {
                len,
                delta: decode_delta(reader.read_number()?),
            },
            CommandKind::TargetCopy => Self::TargetCopy {
                len,
                delta: decode_delta(reader.read_number()?),
            },
        })
    }

    /// Append this command's header (and delta) to `out`.
    ///
    /// `len` must be at least 1. For `TargetRead` the caller appends the
    /// literal bytes afterwards.
    pub fn encode(&self, out: &mut Vec<u8>) {
        let len = self.len();
        debug_assert!(len >= 1, "BPS commands produce at least one byte");
        let data = ((len - 1) << LENGTH_SHIFT) | self.kind().opcode();
        varint::push_u64(out, data);
        match *self {
            Self::SourceCopy { delta, .. } | Self::TargetCopy { delta, .. } => {
                varint::push_u64(out, encode_delta(delta));
            }
            Self::SourceRead { .. } | Self::TargetRead { .. } => {}
        }
    }
}

// ---------------------------------------------------------------------------
// Command iterator (for inspection/debugging)
// ---------------------------------------------------------------------------

/// A command together with where it sits in the patch and the target.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommandEntry {
    /// Offset of the command's first byte in the patch.
    pub patch_offset: usize,
    /// Target offset the command writes to.
    pub output_offset: u64,
    /// For copies: the cursor position after applying the delta.
    pub copy_from: Option<i64>,
    pub command: Command,
}

/// Walks a command stream without a source buffer.
///
/// Literal bytes of `TargetRead` are skipped. Iteration stops at `end`
/// (the footer offset); a stream that overruns it yields a final
/// `FooterMisalignment` error.
pub struct CommandIterator<'a> {
    reader: PatchReader<'a>,
    end: usize,
    output_offset: u64,
    source_relative_offset: i64,
    target_relative_offset: i64,
    done: bool,
}

impl<'a> CommandIterator<'a> {
    /// `reader` must be positioned at the first command.
    pub fn new(reader: PatchReader<'a>, end: usize) -> Self {
        Self {
            reader,
            end,
            output_offset: 0,
            source_relative_offset: 0,
            target_relative_offset: 0,
            done: false,
        }
    }

    /// Total target bytes described by the commands yielded so far.
    pub fn output_offset(&self) -> u64 {
        self.output_offset
    }

    fn next_entry(&mut self) -> Result<CommandEntry, PatchError> {
        let patch_offset = self.reader.position();
        let command = Command::decode(&mut self.reader)?;
        let len = command.len();

        let copy_from = match command {
            Command::TargetRead { len } => {
                let n = usize::try_from(len).unwrap_or(usize::MAX);
                self.reader.read_bytes(n)?;
                None
            }
            Command::SourceRead { .. } => None,
            Command::SourceCopy { delta, .. } => {
                let from = self.source_relative_offset.saturating_add(delta);
                self.source_relative_offset = from.saturating_add_unsigned(len);
                Some(from)
            }
            Command::TargetCopy { delta, .. } => {
                let from = self.target_relative_offset.saturating_add(delta);
                self.target_relative_offset = from.saturating_add_unsigned(len);
                Some(from)
            }
        };

        let entry = CommandEntry {
            patch_offset,
            output_offset: self.output_offset,
            copy_from,
            command,
        };
        self.output_offset = self.output_offset.saturating_add(len);
        Ok(entry)
    }
}

impl Iterator for CommandIterator<'_> {
    type Item = Result<CommandEntry, PatchError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        let pos = self.reader.position();
        if pos >= self.end {
            self.done = true;
            if pos != self.end {
                return Some(Err(PatchError::FooterMisalignment {
                    expected: self.end,
                    actual: pos,
                }));
            }
            return None;
        }

        let item = self.next_entry();
        if item.is_err() {
            self.done = true;
        }
        Some(item)
    }
}
