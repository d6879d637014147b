//! Primitive decoders for the container framing.
//!
//! Only the handful of encodings the block skipper actually touches live
//! here: zigzag base-128 longs, length-prefixed byte runs (strings and
//! bytes share one layout) and fixed-size reads.  Nothing here allocates
//! per call; skipped bytes are drained into [`io::sink`].
//!
//! # Long encoding
//! A long is zigzag-mapped to an unsigned value and written 7 bits at a
//! time, least significant group first, with the high bit of every byte
//! acting as the continuation flag.  The widest legal encoding is 10 bytes
//! and the 10th byte may only carry the single remaining bit.

use std::io::{self, Read};
use thiserror::Error;

/// Longest legal encoding of a 64-bit long.
pub const MAX_VARINT_LEN: usize = 10;

#[derive(Error, Debug)]
pub enum VarintError {
    /// The stream ended part-way through a value.
    #[error("stream ended inside an encoded value")]
    Truncated,
    /// More than [`MAX_VARINT_LEN`] bytes, or bits beyond 64.
    #[error("malformed variable-length integer")]
    Overlong,
    /// A length prefix decoded to a negative number.
    #[error("negative length prefix: {0}")]
    NegativeLength(i64),
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

/// Read one byte, `None` on a clean end-of-stream.
fn read_byte<R: Read>(reader: &mut R) -> io::Result<Option<u8>> {
    let mut buf = [0u8; 1];
    loop {
        match reader.read(&mut buf) {
            Ok(0)  => return Ok(None),
            Ok(_)  => return Ok(Some(buf[0])),
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
}

#[inline]
fn unzigzag(n: u64) -> i64 {
    ((n >> 1) as i64) ^ -((n & 1) as i64)
}

/// Decode a zigzag long.
///
/// Returns `Ok(None)` when the stream is already exhausted before the first
/// byte; that is the only end-of-stream that is not an error.  Running out
/// of input after at least one byte yields [`VarintError::Truncated`].
pub fn read_long<R: Read>(reader: &mut R) -> Result<Option<i64>, VarintError> {
    let mut byte = match read_byte(reader)? {
        Some(b) => b,
        None    => return Ok(None),
    };

    let mut value: u64 = 0;
    let mut shift: u32 = 0;
    loop {
        if shift == 63 && byte > 1 {
            return Err(VarintError::Overlong);
        }
        value |= u64::from(byte & 0x7f) << shift;
        if byte & 0x80 == 0 {
            break;
        }
        shift += 7;
        byte = read_byte(reader)?.ok_or(VarintError::Truncated)?;
    }
    Ok(Some(unzigzag(value)))
}

/// Decode a zigzag long that must be present.
pub fn read_long_required<R: Read>(reader: &mut R) -> Result<i64, VarintError> {
    read_long(reader)?.ok_or(VarintError::Truncated)
}

/// Fill `buf` completely.
pub fn read_fixed<R: Read>(reader: &mut R, buf: &mut [u8]) -> Result<(), VarintError> {
    reader.read_exact(buf).map_err(|e| match e.kind() {
        io::ErrorKind::UnexpectedEof => VarintError::Truncated,
        _                            => VarintError::Io(e),
    })
}

/// Discard exactly `len` bytes without looking at them.
pub fn skip_exact<R: Read>(reader: &mut R, len: u64) -> Result<(), VarintError> {
    let skipped = io::copy(&mut reader.by_ref().take(len), &mut io::sink())?;
    if skipped != len {
        return Err(VarintError::Truncated);
    }
    Ok(())
}

/// Skip a length-prefixed string or byte array.
pub fn skip_length_prefixed<R: Read>(reader: &mut R) -> Result<(), VarintError> {
    let len = read_long_required(reader)?;
    if len < 0 {
        return Err(VarintError::NegativeLength(len));
    }
    skip_exact(reader, len as u64)
}

#[cfg(test)]
pub(crate) fn encode_long(value: i64, out: &mut Vec<u8>) {
    let mut n = ((value << 1) ^ (value >> 63)) as u64;
    while n >= 0x80 {
        out.push((n as u8) | 0x80);
        n >>= 7;
    }
    out.push(n as u8);
}
