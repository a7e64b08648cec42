// File-level helpers for applying BPS patches.
//
// Provides `apply_file()` and `apply_to_writer()` convenience functions that
// read the source and patch from disk, apply the patch in memory and write
// the target through a buffered writer. Optionally computes a SHA-256 of the
// output (feature-gated behind `file-io`).

use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;

#[cfg(feature = "file-io")]
use sha2::Digest;

use crate::bps::decoder::{self, ApplyStats};
use crate::bps::diagnostics::Diagnostics;
use crate::bps::error::PatchError;

// ---------------------------------------------------------------------------
// Stats
// ---------------------------------------------------------------------------

/// Statistics returned by `apply_file()`.
#[derive(Debug, Clone)]
pub struct FileApplyStats {
    /// Header sizes and per-opcode command counts.
    pub patch: ApplyStats,
    /// Bytes written to the output.
    pub output_size: u64,
    /// SHA-256 of the written output (if `file-io` feature is enabled).
    pub output_sha256: Option<[u8; 32]>,
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Error type for file-level operations.
#[derive(Debug, thiserror::Error)]
pub enum IoError {
    /// I/O error (file open, read, write).
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    /// The patch could not be applied.
    #[error("patch error: {0}")]
    Patch(#[from] PatchError),
}

// ---------------------------------------------------------------------------
// Default buffer size
// ---------------------------------------------------------------------------

const BUF_SIZE: usize = 64 * 1024; // 64 KiB

// ---------------------------------------------------------------------------
// apply
// ---------------------------------------------------------------------------

/// Read both inputs fully and apply the patch in memory.
fn load_and_apply<D: Diagnostics + ?Sized>(
    source_path: &Path,
    patch_path: &Path,
    diag: &mut D,
) -> Result<(Vec<u8>, ApplyStats), IoError> {
    let source = std::fs::read(source_path)?;
    let patch = std::fs::read(patch_path)?;
    Ok(decoder::apply_patch(&source, &patch, diag)?)
}

fn file_stats(target: &[u8], patch: ApplyStats) -> FileApplyStats {
    #[cfg(feature = "file-io")]
    let output_sha256 = Some(sha2::Sha256::digest(target).into());
    #[cfg(not(feature = "file-io"))]
    let output_sha256: Option<[u8; 32]> = None;

    FileApplyStats {
        patch,
        output_size: target.len() as u64,
        output_sha256,
    }
}

/// Apply the patch at `patch_path` to the file at `source_path`, writing the
/// target to `writer`.
///
/// Both inputs are read fully into memory. Nothing is written unless the
/// patch applies and verifies.
pub fn apply_to_writer<W: Write, D: Diagnostics + ?Sized>(
    source_path: &Path,
    patch_path: &Path,
    writer: &mut W,
    diag: &mut D,
) -> Result<FileApplyStats, IoError> {
    let (target, stats) = load_and_apply(source_path, patch_path, diag)?;
    writer.write_all(&target)?;
    writer.flush()?;
    Ok(file_stats(&target, stats))
}

/// Apply the patch at `patch_path` to the file at `source_path`, writing the
/// target to `output_path`.
///
/// The output file is only created once the patch has verified.
pub fn apply_file<D: Diagnostics + ?Sized>(
    source_path: &Path,
    patch_path: &Path,
    output_path: &Path,
    diag: &mut D,
) -> Result<FileApplyStats, IoError> {
    let (target, stats) = load_and_apply(source_path, patch_path, diag)?;

    let output_file = File::create(output_path)?;
    let mut output_writer = BufWriter::with_capacity(BUF_SIZE, output_file);
    output_writer.write_all(&target)?;
    output_writer.flush()?;

    Ok(file_stats(&target, stats))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bps::checksum::Checksum;
    use crate::bps::command::Command;
    use crate::bps::diagnostics::NoDiagnostics;
    use crate::bps::header::PatchHeader;

    fn literal_patch(source: &[u8], target: &[u8]) -> Vec<u8> {
        let mut patch = Vec::new();
        PatchHeader {
            source_size: source.len() as u64,
            target_size: target.len() as u64,
            metadata: &[],
        }
        .encode(&mut patch);
        if !target.is_empty() {
            Command::TargetRead {
                len: target.len() as u64,
            }
            .encode(&mut patch);
            patch.extend_from_slice(target);
        }
        patch.extend_from_slice(&Checksum::of(source).0.to_le_bytes());
        patch.extend_from_slice(&Checksum::of(target).0.to_le_bytes());
        let crc = Checksum::of(&patch);
        patch.extend_from_slice(&crc.0.to_le_bytes());
        patch
    }

    #[test]
    fn apply_file_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let source_path = dir.path().join("source.bin");
        let patch_path = dir.path().join("patch.bps");
        let output_path = dir.path().join("output.bin");

        let source = b"The quick brown fox jumps over the lazy dog.";
        let target = b"The quick brown cat sits on the lazy mat.";
        std::fs::write(&source_path, source).unwrap();
        std::fs::write(&patch_path, literal_patch(source, target)).unwrap();

        let stats =
            apply_file(&source_path, &patch_path, &output_path, &mut NoDiagnostics).unwrap();
        assert_eq!(stats.output_size, target.len() as u64);
        assert_eq!(stats.patch.source_size, source.len() as u64);
        assert_eq!(stats.patch.commands.target_read, 1);
        assert_eq!(std::fs::read(&output_path).unwrap(), target);
    }

    #[test]
    fn failed_patch_creates_no_output() {
        let dir = tempfile::tempdir().unwrap();
        let source_path = dir.path().join("source.bin");
        let patch_path = dir.path().join("patch.bps");
        let output_path = dir.path().join("output.bin");

        std::fs::write(&source_path, b"abc").unwrap();
        let mut patch = literal_patch(b"abc", b"xyz");
        let n = patch.len();
        patch[n - 6] ^= 0xff;
        std::fs::write(&patch_path, patch).unwrap();

        let err =
            apply_file(&source_path, &patch_path, &output_path, &mut NoDiagnostics).unwrap_err();
        assert!(matches!(
            err,
            IoError::Patch(PatchError::ChecksumMismatch { .. })
        ));
        assert!(!output_path.exists());
    }

    #[test]
    fn missing_source_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = apply_file(
            &dir.path().join("nope"),
            &dir.path().join("nope.bps"),
            &dir.path().join("out"),
            &mut NoDiagnostics,
        )
        .unwrap_err();
        assert!(matches!(err, IoError::Io(_)));
    }

    #[test]
    fn apply_to_writer_collects_output() {
        let dir = tempfile::tempdir().unwrap();
        let source_path = dir.path().join("source.bin");
        let patch_path = dir.path().join("patch.bps");
        std::fs::write(&source_path, b"").unwrap();
        std::fs::write(&patch_path, literal_patch(b"", b"standalone")).unwrap();

        let mut out = Vec::new();
        let stats =
            apply_to_writer(&source_path, &patch_path, &mut out, &mut NoDiagnostics).unwrap();
        assert_eq!(out, b"standalone");
        assert_eq!(stats.output_size, 10);
    }

    #[cfg(feature = "file-io")]
    #[test]
    fn sha256_of_output() {
        let dir = tempfile::tempdir().unwrap();
        let source_path = dir.path().join("source.bin");
        let patch_path = dir.path().join("patch.bps");
        std::fs::write(&source_path, b"").unwrap();
        std::fs::write(&patch_path, literal_patch(b"", b"abc")).unwrap();

        let stats =
            apply_to_writer(&source_path, &patch_path, &mut io::sink(), &mut NoDiagnostics)
                .unwrap();
        let digest = stats.output_sha256.unwrap();
        // SHA-256("abc")
        assert_eq!(digest[..4], [0xba, 0x78, 0x16, 0xbf]);
    }
}
