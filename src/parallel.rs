//! Bounded parallel counting across many streams.
//!
//! Every input is owned by exactly one Rayon task for its whole life: the
//! task opens it, drains it through a [`BlockSkippingReader`], and drops it
//! before reporting.  Tasks never share mutable state; totals are reduced
//! only after the pool has joined.
//!
//! # Failure policy
//! The first failing task raises a shared flag.  Tasks that have not
//! started yet are abandoned, and running tasks stop at their next block
//! boundary.  Results are inspected in submission order and the first
//! genuine failure is returned; abandoned tasks are never reported as the
//! cause.

use std::num::NonZeroUsize;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;

use rayon::prelude::*;
use rayon::ThreadPoolBuilder;
use tracing::{debug, error, warn};

use crate::error::{Error, Result};
use crate::io_stream::{BlockSkippingReader, StreamTally};
use crate::source::{InputSource, NamedStream};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CountOptions {
    /// Upper bound on concurrent workers; `None` means one per stream.
    pub max_parallelism: Option<NonZeroUsize>,
}

/// Number of pool threads for `streams` inputs.
pub fn effective_workers(streams: usize, max_parallelism: Option<NonZeroUsize>) -> usize {
    if streams == 0 {
        return 0;
    }
    match max_parallelism {
        Some(n) => n.get().min(streams),
        None    => streams,
    }
}

/// Per-stream result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamCount {
    pub name:    String,
    pub records: u64,
    pub blocks:  u64,
}

/// Anything a worker can turn into an open stream.
pub trait StreamSource: Send {
    fn label(&self) -> String;
    fn open_stream(self) -> Result<NamedStream>;
}

impl StreamSource for NamedStream {
    fn label(&self) -> String {
        self.name.clone()
    }

    fn open_stream(self) -> Result<NamedStream> {
        Ok(self)
    }
}

impl StreamSource for &InputSource {
    fn label(&self) -> String {
        self.name()
    }

    fn open_stream(self) -> Result<NamedStream> {
        self.open()
    }
}

enum Outcome {
    Counted(StreamCount),
    Failed(Error),
    Cancelled,
}

pub struct ParallelCounter {
    options: CountOptions,
}

impl ParallelCounter {
    pub fn new(options: CountOptions) -> Self {
        Self { options }
    }

    /// Sum the record counts of already-open streams.
    pub fn count(&self, streams: Vec<NamedStream>) -> Result<u64> {
        sum(&self.count_each(streams)?)
    }

    /// Sum the record counts of lazily opened sources.
    pub fn count_sources(&self, sources: &[InputSource]) -> Result<u64> {
        sum(&self.count_each(sources.iter().collect::<Vec<_>>())?)
    }

    /// Per-stream counts, in submission order.
    pub fn count_each<S: StreamSource>(&self, inputs: Vec<S>) -> Result<Vec<StreamCount>> {
        let workers = effective_workers(inputs.len(), self.options.max_parallelism);
        if workers == 0 {
            return Ok(Vec::new());
        }
        debug!("Counting {} stream(s) with {} worker(s)", inputs.len(), workers);

        let pool = ThreadPoolBuilder::new()
            .num_threads(workers)
            .thread_name(|i| format!("avro-count-{i}"))
            .build()?;

        let failed = AtomicBool::new(false);
        let outcomes: Vec<Outcome> = pool.install(|| {
            inputs
                .into_par_iter()
                .map(|input| process(input, &failed))
                .collect()
        });

        reduce(outcomes)
    }
}

/// Sum per-stream totals.
pub fn sum(counts: &[StreamCount]) -> Result<u64> {
    counts
        .iter()
        .try_fold(0u64, |acc, c| acc.checked_add(c.records))
        .ok_or(Error::CountOverflow)
}

fn process<S: StreamSource>(input: S, failed: &AtomicBool) -> Outcome {
    if failed.load(Ordering::Acquire) {
        return Outcome::Cancelled;
    }

    let name = input.label();
    debug!("Started to process {name}");
    let started = Instant::now();

    let result = input.open_stream().and_then(|mut stream| drain(&mut stream, failed));
    match result {
        Ok(Some(tally)) => {
            debug!(
                "Processed {name} in {}ms ({} records in {} blocks)",
                started.elapsed().as_millis(),
                tally.records,
                tally.blocks
            );
            Outcome::Counted(StreamCount { name, records: tally.records, blocks: tally.blocks })
        }
        Ok(None) => {
            debug!("Abandoned {name} after another stream failed");
            Outcome::Cancelled
        }
        Err(e) => {
            error!("Error occurred while processing {name}: {e}");
            failed.store(true, Ordering::Release);
            Outcome::Failed(e)
        }
    }
}

/// The stream is dropped by the caller on every path; the reader only
/// borrows it.
fn drain(stream: &mut NamedStream, failed: &AtomicBool) -> Result<Option<StreamTally>> {
    let mut reader = BlockSkippingReader::open(stream)?;
    let tally = reader.tally_until(|| failed.load(Ordering::Acquire));
    reader.close();
    tally
}

fn reduce(outcomes: Vec<Outcome>) -> Result<Vec<StreamCount>> {
    let cancelled = outcomes
        .iter()
        .filter(|o| matches!(o, Outcome::Cancelled))
        .count();

    let mut counts = Vec::with_capacity(outcomes.len());
    for outcome in outcomes {
        match outcome {
            Outcome::Counted(c) => counts.push(c),
            Outcome::Cancelled  => {}
            Outcome::Failed(e)  => {
                if cancelled > 0 {
                    warn!("{cancelled} stream(s) abandoned after the first failure");
                }
                return Err(e);
            }
        }
    }
    Ok(counts)
}
