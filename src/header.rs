//! Container file header: magic, metadata map, sync marker.
//!
//! ```text
//! magic      4 bytes   "Obj" 0x01
//! metadata   map<string, bytes>, encoded as counted runs of pairs,
//!            terminated by a zero count.  A negative count is followed
//!            by the run's byte size and means |count| pairs.
//! sync       16 bytes  repeated after every block
//! ```
//!
//! Metadata keys and values are skipped, never copied; the reader has no
//! use for the schema or codec because payloads are never decoded.

use std::io::Read;

use crate::error::{Error, Result};
use crate::varint::{read_fixed, read_long_required, skip_length_prefixed};

pub const MAGIC: &[u8; 4] = b"Obj\x01";
pub const SYNC_SIZE: usize = 16;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContainerHeader {
    pub magic:            [u8; 4],
    /// Number of key/value pairs skipped in the metadata map.
    pub metadata_entries: u64,
    pub sync:             [u8; SYNC_SIZE],
}

impl ContainerHeader {
    pub fn read<R: Read>(mut reader: R) -> Result<Self> {
        let mut magic = [0u8; 4];
        read_fixed(&mut reader, &mut magic).map_err(|e| Error::in_header(e, "magic"))?;
        if &magic != MAGIC {
            return Err(Error::Format(format!(
                "magic mismatch, found {}",
                hex::encode(magic)
            )));
        }

        let metadata_entries = skip_metadata(&mut reader)?;

        let mut sync = [0u8; SYNC_SIZE];
        read_fixed(&mut reader, &mut sync).map_err(|e| Error::in_header(e, "sync marker"))?;

        Ok(Self { magic, metadata_entries, sync })
    }

    pub fn sync_hex(&self) -> String {
        hex::encode(self.sync)
    }
}

fn skip_metadata<R: Read>(reader: &mut R) -> Result<u64> {
    let mut entries = 0u64;
    loop {
        let count = read_long_required(reader).map_err(|e| Error::in_header(e, "metadata count"))?;
        if count == 0 {
            return Ok(entries);
        }
        if count < 0 {
            // run byte size; pairs are still skipped one by one
            read_long_required(reader).map_err(|e| Error::in_header(e, "metadata run size"))?;
        }
        let pairs = count.unsigned_abs();
        for _ in 0..pairs {
            skip_length_prefixed(reader).map_err(|e| Error::in_header(e, "metadata key"))?;
            skip_length_prefixed(reader).map_err(|e| Error::in_header(e, "metadata value"))?;
        }
        entries = entries.saturating_add(pairs);
    }
}
