//! Container file fixtures used only by tests and benches.
//!
//! Files that are counted end to end come from `apache_avro::Writer`, so
//! the reader is checked against an independent implementation of the
//! format and every codec it supports.  [`ContainerWriter`] frames files by
//! hand and reports where every block's framing, payload and trailer live,
//! for tests that corrupt precise byte regions.
#![allow(dead_code)]

use std::fs;
use std::io;
use std::ops::Range;
use std::path::{Path, PathBuf};

use apache_avro::types::Value;
use apache_avro::{Schema, Writer};
use avrocount::{MAGIC, SYNC_SIZE};

pub use apache_avro::Codec as AvroCodec;

pub const INT_RECORD_SCHEMA: &str =
    r#"{"type":"record","name":"IntRecord","fields":[{"name":"value","type":"int"}]}"#;

/// Every codec the count is expected to be indifferent to.
pub const AVRO_CODECS: [AvroCodec; 6] = [
    AvroCodec::Null,
    AvroCodec::Deflate,
    AvroCodec::Snappy,
    AvroCodec::Zstandard,
    AvroCodec::Bzip2,
    AvroCodec::Xz,
];

/// Write `records` int records with the reference writer.
pub fn avro_file(codec: AvroCodec, records: u64) -> Vec<u8> {
    let schema = Schema::parse_str(INT_RECORD_SCHEMA).expect("schema");
    let mut writer = Writer::with_codec(&schema, Vec::new(), codec);
    for value in 0..records {
        let record = Value::Record(vec![("value".to_string(), Value::Int(value as i32))]);
        writer.append(record).expect("append record");
    }
    writer.into_inner().expect("flush container")
}

pub fn write_avro_file(path: &Path, codec: AvroCodec, records: u64) -> io::Result<PathBuf> {
    fs::write(path, avro_file(codec, records))?;
    Ok(path.to_path_buf())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Codec {
    Null,
    Zstandard,
    Xz,
}

pub const ALL_CODECS: [Codec; 3] = [Codec::Null, Codec::Zstandard, Codec::Xz];

impl Codec {
    pub fn name(self) -> &'static str {
        match self {
            Codec::Null      => "null",
            Codec::Zstandard => "zstandard",
            Codec::Xz        => "xz",
        }
    }

    fn compress(self, raw: Vec<u8>) -> Vec<u8> {
        match self {
            Codec::Null      => raw,
            Codec::Zstandard => zstd::encode_all(&raw[..], 3).expect("zstd compress"),
            Codec::Xz        => {
                let mut out = Vec::new();
                lzma_rs::xz_compress(&mut &raw[..], &mut out).expect("xz compress");
                out
            }
        }
    }
}

/// Byte ranges of one written block.
#[derive(Debug, Clone)]
pub struct BlockSpan {
    pub framing: Range<usize>,
    pub payload: Range<usize>,
    pub sync:    Range<usize>,
}

#[derive(Debug, Clone)]
pub struct Container {
    pub bytes:      Vec<u8>,
    pub header_len: usize,
    pub blocks:     Vec<BlockSpan>,
}

impl Container {
    /// Offsets at which the file may legitimately end.
    pub fn block_boundaries(&self) -> Vec<usize> {
        std::iter::once(self.header_len)
            .chain(self.blocks.iter().map(|b| b.sync.end))
            .collect()
    }
}

pub fn put_long(value: i64, out: &mut Vec<u8>) {
    let mut n = ((value << 1) ^ (value >> 63)) as u64;
    while n >= 0x80 {
        out.push((n as u8) | 0x80);
        n >>= 7;
    }
    out.push(n as u8);
}

fn put_bytes(bytes: &[u8], out: &mut Vec<u8>) {
    put_long(bytes.len() as i64, out);
    out.extend_from_slice(bytes);
}

pub fn sync_marker(seed: u64) -> [u8; SYNC_SIZE] {
    let mut sync = [0u8; SYNC_SIZE];
    let mut state = seed.wrapping_mul(0x9E37_79B9_7F4A_7C15) | 1;
    for b in sync.iter_mut() {
        state ^= state << 13;
        state ^= state >> 7;
        state ^= state << 17;
        *b = state as u8;
    }
    sync
}

pub struct ContainerWriter {
    pub codec:             Codec,
    pub records_per_block: u64,
    pub sync:              [u8; SYNC_SIZE],
}

impl ContainerWriter {
    pub fn new(codec: Codec) -> Self {
        Self { codec, records_per_block: 100, sync: sync_marker(42) }
    }

    pub fn records_per_block(mut self, n: u64) -> Self {
        self.records_per_block = n.max(1);
        self
    }

    pub fn sync(mut self, sync: [u8; SYNC_SIZE]) -> Self {
        self.sync = sync;
        self
    }

    pub fn header(&self) -> Vec<u8> {
        let mut out = MAGIC.to_vec();
        put_long(2, &mut out);
        put_bytes(b"avro.schema", &mut out);
        put_bytes(INT_RECORD_SCHEMA.as_bytes(), &mut out);
        put_bytes(b"avro.codec", &mut out);
        put_bytes(self.codec.name().as_bytes(), &mut out);
        put_long(0, &mut out);
        out.extend_from_slice(&self.sync);
        out
    }

    pub fn write(&self, records: u64) -> Container {
        let mut bytes = self.header();
        let header_len = bytes.len();
        let mut blocks = Vec::new();

        let mut next = 0u64;
        while next < records {
            let in_block = self.records_per_block.min(records - next);
            let mut raw = Vec::new();
            for value in next..next + in_block {
                put_long(value as i64, &mut raw);
            }
            let payload = self.codec.compress(raw);

            let start = bytes.len();
            put_long(in_block as i64, &mut bytes);
            put_long(payload.len() as i64, &mut bytes);
            let payload_start = bytes.len();
            bytes.extend_from_slice(&payload);
            let sync_start = bytes.len();
            bytes.extend_from_slice(&self.sync);

            blocks.push(BlockSpan {
                framing: start..payload_start,
                payload: payload_start..sync_start,
                sync:    sync_start..bytes.len(),
            });
            next += in_block;
        }

        Container { bytes, header_len, blocks }
    }

    pub fn write_file(&self, path: &Path, records: u64) -> io::Result<PathBuf> {
        fs::write(path, self.write(records).bytes)?;
        Ok(path.to_path_buf())
    }
}
