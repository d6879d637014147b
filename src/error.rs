use std::io;
use thiserror::Error;

use crate::varint::VarintError;

#[derive(Error, Debug)]
pub enum Error {
    /// Magic mismatch or unreadable header/metadata.
    #[error("Not a data file: {0}")]
    Format(String),
    #[error("Block size invalid or too large for this implementation: {0}")]
    BlockSize(i64),
    #[error("Block declares a negative record count: {0}")]
    NegativeRecordCount(i64),
    #[error("Invalid sync marker after block {block}")]
    SyncMismatch { block: u64 },
    #[error("Stream truncated inside {0}")]
    Truncated(&'static str),
    #[error("Malformed variable-length integer")]
    MalformedVarint,
    #[error("No more blocks")]
    NoMoreBlocks,
    #[error("No block has been read yet")]
    NoPendingBlock,
    #[error("Reader is closed")]
    Closed,
    #[error("Reader stopped at an earlier framing error")]
    ReaderFailed,
    #[error("Record count overflows u64")]
    CountOverflow,
    #[error("{0}")]
    Usage(String),
    #[error("Cannot start worker pool: {0}")]
    WorkerPool(#[from] rayon::ThreadPoolBuildError),
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Map a primitive failure raised while reading block framing.
    pub(crate) fn in_block(err: VarintError, field: &'static str) -> Self {
        match err {
            VarintError::Truncated         => Error::Truncated(field),
            VarintError::Overlong          => Error::MalformedVarint,
            VarintError::NegativeLength(n) => Error::BlockSize(n),
            VarintError::Io(e)             => Error::Io(e),
        }
    }

    /// Map a primitive failure raised while reading the file header.
    /// Everything except a transport failure means "not a container file".
    pub(crate) fn in_header(err: VarintError, field: &'static str) -> Self {
        match err {
            VarintError::Io(e) => Error::Io(e),
            other              => Error::Format(format!("{field}: {other}")),
        }
    }

    /// True for the corruption classes that describe the file contents
    /// rather than the environment or the caller.
    pub fn is_corruption(&self) -> bool {
        matches!(
            self,
            Error::Format(_)
                | Error::BlockSize(_)
                | Error::NegativeRecordCount(_)
                | Error::SyncMismatch { .. }
                | Error::Truncated(_)
                | Error::MalformedVarint
        )
    }
}
