pub mod error;
pub mod varint;
pub mod header;
pub mod block;
pub mod io_stream;
pub mod source;
pub mod parallel;

pub use error::{Error, Result};
pub use header::{ContainerHeader, MAGIC, SYNC_SIZE};
pub use block::{BlockHeader, MAX_BLOCK_SIZE};
pub use io_stream::{BlockSkippingReader, ReaderState, StreamTally, count_records};
pub use source::{InputSource, NamedStream, resolve};
pub use parallel::{CountOptions, ParallelCounter, StreamCount, effective_workers};
