//! Forward-only block cursor over one container stream.
//!
//! [`BlockSkippingReader`] parses the header once, then walks the block
//! framing: two longs (record count, payload length), the payload itself
//! and a 16-byte trailer that must equal the header's sync marker.  Payload
//! bytes are drained without being inspected, so codec and schema never
//! matter.
//!
//! # States
//! ```text
//! open() ──► HeaderParsed ──► BlockPending ⇄ AwaitingNextHeader ──► Exhausted
//!                 │                                   ▲
//!                 └───────────────────────────────────┘   (empty file)
//! ```
//! `Exhausted` is entered only when `has_next_block` sees end-of-stream
//! exactly where a block header would start.  `close()` moves any state to
//! `Closed`.  A framing error moves the reader to `Failed`; from there
//! every cursor call returns [`Error::ReaderFailed`] instead of reading
//! misaligned bytes.

use std::io::Read;

use tracing::{debug, trace};

use crate::block::BlockHeader;
use crate::error::{Error, Result};
use crate::header::ContainerHeader;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReaderState {
    HeaderParsed,
    BlockPending,
    AwaitingNextHeader,
    Exhausted,
    Failed,
    Closed,
}

/// Totals for one drained stream.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StreamTally {
    pub records: u64,
    pub blocks:  u64,
}

pub struct BlockSkippingReader<R: Read> {
    reader:      Option<R>,
    header:      ContainerHeader,
    state:       ReaderState,
    /// Last block header read; stays readable after the block is consumed.
    current:     Option<BlockHeader>,
    blocks_read: u64,
}

impl<R: Read> BlockSkippingReader<R> {
    /// Parse the container header and position the cursor on the first block.
    pub fn open(mut reader: R) -> Result<Self> {
        let header = ContainerHeader::read(&mut reader)?;
        debug!(
            sync = %header.sync_hex(),
            metadata_entries = header.metadata_entries,
            "container header parsed"
        );
        Ok(Self {
            reader:      Some(reader),
            header,
            state:       ReaderState::HeaderParsed,
            current:     None,
            blocks_read: 0,
        })
    }

    pub fn header(&self) -> &ContainerHeader {
        &self.header
    }

    pub fn state(&self) -> ReaderState {
        self.state
    }

    /// Blocks fully consumed so far.
    pub fn blocks_read(&self) -> u64 {
        self.blocks_read
    }

    /// Is another block available?  Idempotent while a block is pending.
    pub fn has_next_block(&mut self) -> Result<bool> {
        match self.state {
            ReaderState::Closed       => return Err(Error::Closed),
            ReaderState::Failed       => return Err(Error::ReaderFailed),
            ReaderState::BlockPending => return Ok(true),
            ReaderState::Exhausted    => return Ok(false),
            ReaderState::HeaderParsed | ReaderState::AwaitingNextHeader => {}
        }

        let reader = self.reader.as_mut().ok_or(Error::Closed)?;
        let next = BlockHeader::read(reader);
        match self.poison_on_error(next)? {
            Some(block) => {
                trace!(
                    block = self.blocks_read,
                    records = block.record_count,
                    bytes = block.byte_length,
                    "block header"
                );
                self.current = Some(block);
                self.state = ReaderState::BlockPending;
                Ok(true)
            }
            None => {
                self.state = ReaderState::Exhausted;
                Ok(false)
            }
        }
    }

    /// Skip the pending block's payload and verify its trailing sync marker.
    pub fn next_block(&mut self) -> Result<()> {
        if !self.has_next_block()? {
            return Err(Error::NoMoreBlocks);
        }
        let block = self.current.ok_or(Error::NoPendingBlock)?;
        let reader = self.reader.as_mut().ok_or(Error::Closed)?;
        let skipped = block.skip_payload(reader, &self.header.sync, self.blocks_read);
        self.poison_on_error(skipped)?;
        self.blocks_read += 1;
        self.state = ReaderState::AwaitingNextHeader;
        Ok(())
    }

    /// Record count of the pending block, or of the block just consumed
    /// until the next `has_next_block` call reads a new header.
    pub fn pending_record_count(&self) -> Result<u64> {
        self.current
            .map(|b| b.record_count)
            .ok_or(Error::NoPendingBlock)
    }

    /// Drain every remaining block.  `stop` is polled before each block;
    /// returning true abandons the stream and yields `Ok(None)`.
    pub fn tally_until<F>(&mut self, mut stop: F) -> Result<Option<StreamTally>>
    where
        F: FnMut() -> bool,
    {
        let mut tally = StreamTally::default();
        loop {
            if stop() {
                return Ok(None);
            }
            if !self.has_next_block()? {
                return Ok(Some(tally));
            }
            self.next_block()?;
            tally.records = tally
                .records
                .checked_add(self.pending_record_count()?)
                .ok_or(Error::CountOverflow)?;
            tally.blocks += 1;
        }
    }

    fn poison_on_error<T>(&mut self, result: Result<T>) -> Result<T> {
        if result.is_err() {
            self.state = ReaderState::Failed;
        }
        result
    }

    /// Drop the underlying stream.  Safe to call more than once.
    pub fn close(&mut self) {
        self.reader = None;
        self.state = ReaderState::Closed;
    }
}

/// Open `reader` as a container stream and sum its block record counts.
pub fn count_records<R: Read>(reader: R) -> Result<u64> {
    let mut stream = BlockSkippingReader::open(reader)?;
    let tally = stream.tally_until(|| false);
    stream.close();
    Ok(tally?.map(|t| t.records).unwrap_or_default())
}
