// BPS footer: three CRC32 checksums and their verification.

use std::fmt;

use super::diagnostics::Diagnostics;
use super::error::PatchError;
use super::reader::PatchReader;

/// Footer length in bytes (source, target and patch CRC32).
pub const FOOTER_LEN: usize = 12;

/// Bytes at the end of the patch not covered by the patch checksum.
const PATCH_CRC_LEN: usize = 4;

/// A CRC32 value. Displays as 8 lowercase hex digits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Checksum(pub u32);

impl Checksum {
    /// CRC32 (IEEE) of `data`.
    #[inline]
    pub fn of(data: &[u8]) -> Self {
        Self(crc32fast::hash(data))
    }
}

impl fmt::Display for Checksum {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:08x}", self.0)
    }
}

/// Which buffer a checksum covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChecksumKind {
    Source,
    Target,
    Patch,
}

impl fmt::Display for ChecksumKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Source => "source",
            Self::Target => "target",
            Self::Patch => "patch",
        })
    }
}

/// Declared checksums from the last 12 bytes of a patch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Footer {
    pub source: Checksum,
    pub target: Checksum,
    pub patch: Checksum,
}

impl Footer {
    /// Decode the footer at the reader's current position.
    pub fn decode(reader: &mut PatchReader<'_>) -> Result<Self, PatchError> {
        Ok(Self {
            source: reader.read_checksum()?,
            target: reader.read_checksum()?,
            patch: reader.read_checksum()?,
        })
    }

    /// Decode the footer from the tail of a complete patch.
    pub fn from_patch(patch: &[u8]) -> Result<Self, PatchError> {
        let start = footer_start(patch)?;
        let mut reader = PatchReader::new(patch);
        reader.seek(start);
        Self::decode(&mut reader)
    }

    /// Append the footer bytes to `out`.
    pub fn encode(&self, out: &mut Vec<u8>) {
        out.extend_from_slice(&self.source.0.to_le_bytes());
        out.extend_from_slice(&self.target.0.to_le_bytes());
        out.extend_from_slice(&self.patch.0.to_le_bytes());
    }

    /// Check every declared checksum against the actual buffers.
    ///
    /// All three comparisons run and every mismatch is reported to
    /// `diag`; the first mismatch (source, target, patch order) is returned.
    pub fn verify<D: Diagnostics + ?Sized>(
        &self,
        source: &[u8],
        target: &[u8],
        patch: &[u8],
        diag: &mut D,
    ) -> Result<(), PatchError> {
        let covered = patch.len().saturating_sub(PATCH_CRC_LEN);
        let checks = [
            (ChecksumKind::Source, self.source, Checksum::of(source)),
            (ChecksumKind::Target, self.target, Checksum::of(target)),
            (ChecksumKind::Patch, self.patch, Checksum::of(&patch[..covered])),
        ];

        let mut first = None;
        for (which, expected, actual) in checks {
            if expected == actual {
                diag.message(format_args!("{which} CRC32 ok: {actual}"));
                continue;
            }
            diag.warning(format_args!(
                "{which} CRC32 mismatch! Expected {expected} but computed {actual}"
            ));
            first.get_or_insert(PatchError::ChecksumMismatch {
                which,
                expected,
                actual,
            });
        }

        match first {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

/// Offset of the footer in a patch of this length.
pub fn footer_start(patch: &[u8]) -> Result<usize, PatchError> {
    patch
        .len()
        .checked_sub(FOOTER_LEN)
        .ok_or(PatchError::TruncatedInput {
            offset: 0,
            wanted: FOOTER_LEN,
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn quiet() -> impl FnMut(&str) {
        |_: &str| {}
    }

    fn footer_for(source: &[u8], target: &[u8], body: &[u8]) -> Vec<u8> {
        let mut patch = body.to_vec();
        patch.extend_from_slice(&Checksum::of(source).0.to_le_bytes());
        patch.extend_from_slice(&Checksum::of(target).0.to_le_bytes());
        let crc = Checksum::of(&patch);
        patch.extend_from_slice(&crc.0.to_le_bytes());
        patch
    }

    #[test]
    fn crc32_matches_known_vector() {
        assert_eq!(Checksum::of(b"123456789"), Checksum(0xcbf43926));
        assert_eq!(Checksum::of(b"").to_string(), "00000000");
    }

    #[test]
    fn footer_roundtrip_through_bytes() {
        let footer = Footer {
            source: Checksum(1),
            target: Checksum(0x0a0b0c0d),
            patch: Checksum(u32::MAX),
        };
        let mut bytes = b"BPS1".to_vec();
        footer.encode(&mut bytes);
        assert_eq!(&bytes[4..8], &[1, 0, 0, 0]);
        assert_eq!(&bytes[8..12], &[0x0d, 0x0c, 0x0b, 0x0a]);
        assert_eq!(Footer::from_patch(&bytes).unwrap(), footer);
    }

    #[test]
    fn short_patch_has_no_footer() {
        assert!(matches!(
            Footer::from_patch(&[0; 11]),
            Err(PatchError::TruncatedInput { .. })
        ));
    }

    #[test]
    fn verify_accepts_matching_buffers() {
        let patch = footer_for(b"src", b"tgt", b"BPS1body");
        let footer = Footer::from_patch(&patch).unwrap();
        footer.verify(b"src", b"tgt", &patch, &mut quiet()).unwrap();
    }

    #[test]
    fn verify_names_the_failing_buffer() {
        let patch = footer_for(b"src", b"tgt", b"BPS1body");
        let footer = Footer::from_patch(&patch).unwrap();

        let err = footer.verify(b"SRC", b"tgt", &patch, &mut quiet()).unwrap_err();
        assert!(matches!(
            err,
            PatchError::ChecksumMismatch {
                which: ChecksumKind::Source,
                ..
            }
        ));

        let err = footer.verify(b"src", b"TGT", &patch, &mut quiet()).unwrap_err();
        assert!(matches!(
            err,
            PatchError::ChecksumMismatch {
                which: ChecksumKind::Target,
                ..
            }
        ));

        let mut bad = patch.clone();
        bad[5] ^= 0x01;
        let err = footer.verify(b"src", b"tgt", &bad, &mut quiet()).unwrap_err();
        assert!(matches!(
            err,
            PatchError::ChecksumMismatch {
                which: ChecksumKind::Patch,
                ..
            }
        ));
    }

    #[test]
    fn verify_reports_every_mismatch() {
        let patch = footer_for(b"src", b"tgt", b"BPS1body");
        let footer = Footer::from_patch(&patch).unwrap();
        let mut messages = Vec::new();
        let mut collect = |m: &str| messages.push(m.to_string());

        let err = footer.verify(b"x", b"y", &patch, &mut collect).unwrap_err();
        assert!(matches!(
            err,
            PatchError::ChecksumMismatch {
                which: ChecksumKind::Source,
                ..
            }
        ));
        let mismatches = messages.iter().filter(|m| m.contains("mismatch")).count();
        assert_eq!(mismatches, 2);
        assert!(messages.iter().any(|m| m.starts_with("patch CRC32 ok")));
    }
}
