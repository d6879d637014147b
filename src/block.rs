use std::io::Read;

use crate::error::{Error, Result};
use crate::header::SYNC_SIZE;
use crate::varint::{read_fixed, read_long, read_long_required, skip_exact};

/// Largest payload skipped in one step.
pub const MAX_BLOCK_SIZE: i64 = i32::MAX as i64;

/// Framing that precedes a block payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockHeader {
    pub record_count: u64,
    pub byte_length:  u64,
}

impl BlockHeader {
    /// Read the two block-leading longs.
    ///
    /// `Ok(None)` means the stream ended exactly on a block boundary.
    pub fn read<R: Read>(mut reader: R) -> Result<Option<Self>> {
        let count = match read_long(&mut reader).map_err(|e| Error::in_block(e, "block header"))? {
            Some(c) => c,
            None    => return Ok(None),
        };
        let size = read_long_required(&mut reader).map_err(|e| Error::in_block(e, "block header"))?;
        Self::validate(count, size).map(Some)
    }

    pub fn validate(count: i64, size: i64) -> Result<Self> {
        if !(0..=MAX_BLOCK_SIZE).contains(&size) {
            return Err(Error::BlockSize(size));
        }
        if count < 0 {
            return Err(Error::NegativeRecordCount(count));
        }
        Ok(Self { record_count: count as u64, byte_length: size as u64 })
    }

    /// Skip this block's payload, then read and compare the trailing marker.
    /// `index` is only used to label a mismatch.
    pub fn skip_payload<R: Read>(
        &self,
        mut reader: R,
        expected_sync: &[u8; SYNC_SIZE],
        index: u64,
    ) -> Result<()> {
        skip_exact(&mut reader, self.byte_length).map_err(|e| Error::in_block(e, "block payload"))?;
        let mut trailer = [0u8; SYNC_SIZE];
        read_fixed(&mut reader, &mut trailer).map_err(|e| Error::in_block(e, "sync marker"))?;
        if &trailer != expected_sync {
            return Err(Error::SyncMismatch { block: index });
        }
        Ok(())
    }
}
