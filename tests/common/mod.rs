#![allow(dead_code)]

use oxibps::bps::{Checksum, Command, PatchHeader};

/// Builds a BPS patch from explicit commands, tracking the relative cursors
/// so callers can name absolute copy positions.
pub struct PatchBuilder {
    source: Vec<u8>,
    metadata: Vec<u8>,
    target: Vec<u8>,
    commands: Vec<u8>,
    source_relative_offset: i64,
    target_relative_offset: i64,
}

impl PatchBuilder {
    pub fn new(source: &[u8]) -> Self {
        Self {
            source: source.to_vec(),
            metadata: Vec::new(),
            target: Vec::new(),
            commands: Vec::new(),
            source_relative_offset: 0,
            target_relative_offset: 0,
        }
    }

    pub fn metadata(mut self, metadata: &[u8]) -> Self {
        self.metadata = metadata.to_vec();
        self
    }

    pub fn target_len(&self) -> usize {
        self.target.len()
    }

    pub fn source_read(&mut self, len: usize) -> &mut Self {
        let at = self.target.len();
        self.target.extend_from_slice(&self.source[at..at + len]);
        Command::SourceRead { len: len as u64 }.encode(&mut self.commands);
        self
    }

    pub fn target_read(&mut self, bytes: &[u8]) -> &mut Self {
        self.target.extend_from_slice(bytes);
        Command::TargetRead {
            len: bytes.len() as u64,
        }
        .encode(&mut self.commands);
        self.commands.extend_from_slice(bytes);
        self
    }

    pub fn source_copy(&mut self, from: usize, len: usize) -> &mut Self {
        let delta = from as i64 - self.source_relative_offset;
        self.target.extend_from_slice(&self.source[from..from + len]);
        self.source_relative_offset = (from + len) as i64;
        Command::SourceCopy {
            len: len as u64,
            delta,
        }
        .encode(&mut self.commands);
        self
    }

    pub fn target_copy(&mut self, from: usize, len: usize) -> &mut Self {
        let delta = from as i64 - self.target_relative_offset;
        for i in 0..len {
            let byte = self.target[from + i];
            self.target.push(byte);
        }
        self.target_relative_offset = (from + len) as i64;
        Command::TargetCopy {
            len: len as u64,
            delta,
        }
        .encode(&mut self.commands);
        self
    }

    /// Returns `(patch, expected_target)`.
    pub fn finish(&self) -> (Vec<u8>, Vec<u8>) {
        let mut patch = Vec::new();
        PatchHeader {
            source_size: self.source.len() as u64,
            target_size: self.target.len() as u64,
            metadata: &self.metadata,
        }
        .encode(&mut patch);
        patch.extend_from_slice(&self.commands);
        patch.extend_from_slice(&Checksum::of(&self.source).0.to_le_bytes());
        patch.extend_from_slice(&Checksum::of(&self.target).0.to_le_bytes());
        let crc = Checksum::of(&patch);
        patch.extend_from_slice(&crc.0.to_le_bytes());
        (patch, self.target.clone())
    }
}

pub fn hex_to_bytes(s: &str) -> Vec<u8> {
    let s: String = s.split_whitespace().collect();
    assert!(s.len().is_multiple_of(2), "hex string must have even length");
    (0..s.len())
        .step_by(2)
        .map(|i| u8::from_str_radix(&s[i..i + 2], 16).unwrap())
        .collect()
}
