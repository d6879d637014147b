//! Turning a user-supplied path into input streams.
//!
//! A path is either `-` (standard input), a single file, or a directory
//! whose direct children are considered.  Only names ending in `.avro`
//! are counted; anything else is reported and left out rather than
//! treated as an error.  Sources are opened lazily so that the number of
//! open handles follows the worker count, not the input size.

use std::fmt;
use std::fs::{self, File};
use std::io::{self, BufReader, Read};
use std::path::{Path, PathBuf};

use tracing::{debug, error};
use walkdir::WalkDir;

use crate::error::{Error, Result};

pub const AVRO_SUFFIX: &str = ".avro";
pub const STDIN_PATH:  &str = "-";

/// A readable byte stream paired with a name for diagnostics.
pub struct NamedStream {
    pub name: String,
    reader:   Box<dyn Read + Send>,
}

impl NamedStream {
    pub fn new<R: Read + Send + 'static>(name: impl Into<String>, reader: R) -> Self {
        Self { name: name.into(), reader: Box::new(reader) }
    }
}

impl Read for NamedStream {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.reader.read(buf)
    }
}

impl fmt::Debug for NamedStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NamedStream").field("name", &self.name).finish_non_exhaustive()
    }
}

/// Something that can be opened into a [`NamedStream`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputSource {
    Stdin,
    File(PathBuf),
}

impl InputSource {
    pub fn name(&self) -> String {
        match self {
            InputSource::Stdin      => STDIN_PATH.to_string(),
            InputSource::File(path) => path.display().to_string(),
        }
    }

    pub fn open(&self) -> Result<NamedStream> {
        Ok(match self {
            InputSource::Stdin => NamedStream::new(STDIN_PATH, BufReader::new(io::stdin())),
            InputSource::File(path) => {
                NamedStream::new(self.name(), BufReader::new(File::open(path)?))
            }
        })
    }
}

pub fn has_avro_suffix(path: &Path) -> bool {
    path.to_string_lossy().ends_with(AVRO_SUFFIX)
}

/// Resolve `path` into the list of sources to count.
pub fn resolve(path: &Path) -> Result<Vec<InputSource>> {
    if path == Path::new(STDIN_PATH) {
        debug!("Using STDIN for input");
        return Ok(vec![InputSource::Stdin]);
    }

    let meta = fs::metadata(path)?;
    if meta.is_file() {
        return Ok(accept(path).into_iter().collect());
    }
    if !meta.is_dir() {
        return Err(Error::Usage(format!(
            "{} is neither a file nor a directory",
            path.display()
        )));
    }

    let mut sources = Vec::new();
    for entry in WalkDir::new(path)
        .min_depth(1)
        .max_depth(1)
        .follow_links(true)
        .sort_by_file_name()
    {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) if e.depth() == 0 => return Err(io::Error::from(e).into()),
            Err(e) => {
                error!("Ignoring unreadable entry under {}: {e}", path.display());
                continue;
            }
        };
        if !entry.file_type().is_file() {
            debug!("Skipping {}, not a regular file", entry.path().display());
            continue;
        }
        sources.extend(accept(entry.path()));
    }
    debug!("Resolved {} input file(s) under {}", sources.len(), path.display());
    Ok(sources)
}

fn accept(path: &Path) -> Option<InputSource> {
    if has_avro_suffix(path) {
        Some(InputSource::File(path.to_path_buf()))
    } else {
        error!("Ignoring file {}, does not have {} suffix", path.display(), AVRO_SUFFIX);
        None
    }
}
