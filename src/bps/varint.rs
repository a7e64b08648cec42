// BPS variable-length integer encoding.
//
// Little-endian base-128: least-significant group first, 7 value bits per
// byte. The final byte has bit 7 SET (the inverse of LEB128).
// Each continuation also carries an implicit +1 so that every value has
// exactly one encoding: the encoder decrements the remainder after emitting
// a continuation byte, and the decoder adds the next shift back in.

use std::io::{self, Write};

/// Maximum encoded length for a 64-bit value.
pub const MAX_VARINT_LEN: usize = 10;

/// Terminator flag on the final byte of an encoded number.
const END_BIT: u8 = 0x80;

// ---------------------------------------------------------------------------
// Encoding
// ---------------------------------------------------------------------------

/// Encode a `u64` as a BPS number into `buf`.
/// Returns the number of bytes written (1..=10), starting at `buf[0]`.
#[inline]
pub fn encode_u64(mut num: u64, buf: &mut [u8; MAX_VARINT_LEN]) -> usize {
    let mut i = 0;
    loop {
        let low = (num & 0x7F) as u8;
        num >>= 7;
        if num == 0 {
            buf[i] = low | END_BIT;
            return i + 1;
        }
        buf[i] = low;
        i += 1;
        num -= 1;
    }
}

/// Encode a `u64` and append it to `out`.
pub fn push_u64(out: &mut Vec<u8>, num: u64) {
    let mut buf = [0u8; MAX_VARINT_LEN];
    let len = encode_u64(num, &mut buf);
    out.extend_from_slice(&buf[..len]);
}

/// Encode a `u64` and write to a `Write` sink.
pub fn write_u64<W: Write>(w: &mut W, num: u64) -> io::Result<()> {
    let mut buf = [0u8; MAX_VARINT_LEN];
    let len = encode_u64(num, &mut buf);
    w.write_all(&buf[..len])
}

// ---------------------------------------------------------------------------
// Decoding
// ---------------------------------------------------------------------------

/// Decode a `u64` starting at `data[offset]`.
///
/// Returns `(value, next_offset)` where `next_offset` is the index just past
/// the terminator byte.
pub fn read_u64(data: &[u8], offset: usize) -> Result<(u64, usize), VarIntError> {
    let mut value: u64 = 0;
    let mut shift: u64 = 1;
    let mut index = offset;

    loop {
        let byte = *data.get(index).ok_or(VarIntError::Truncated)?;
        index += 1;

        let group = u64::from(byte & 0x7F)
            .checked_mul(shift)
            .ok_or(VarIntError::Overflow)?;
        value = value.checked_add(group).ok_or(VarIntError::Overflow)?;
        if byte & END_BIT != 0 {
            return Ok((value, index));
        }

        shift = shift.checked_mul(128).ok_or(VarIntError::Overflow)?;
        value = value.checked_add(shift).ok_or(VarIntError::Overflow)?;
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Return the encoded byte-length of a `u64` value.
#[inline]
pub fn sizeof_u64(num: u64) -> usize {
    let mut buf = [0u8; MAX_VARINT_LEN];
    encode_u64(num, &mut buf)
}

// ---------------------------------------------------------------------------
// Error type
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum VarIntError {
    /// Input ended before a terminator byte.
    #[error("number truncated (no terminator byte)")]
    Truncated,
    /// Value does not fit in 64 bits.
    #[error("number overflows 64 bits")]
    Overflow,
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
