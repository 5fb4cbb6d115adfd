// errors.rs - Error taxonomy for panel, likelihood and batch handling

use std::path::{Path, PathBuf};

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    #[error("failed to access {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("marker panel is empty")]
    EmptyPanel,
    #[error("marker {marker} occurs more than once in the panel")]
    DuplicateMarker { marker: String },
    #[error("invalid marker at {path}:{line}: {msg}")]
    InvalidMarkerLine {
        path: PathBuf,
        line: usize,
        msg: String,
    },
    #[error("invalid pileup record at {path}:{line}: {msg}")]
    InvalidPileupLine {
        path: PathBuf,
        line: usize,
        msg: String,
    },
    #[error("likelihood cache {path} is unreadable: {msg}")]
    CorruptCache { path: PathBuf, msg: String },
    #[error("likelihood cache {path} has format version {found}, expected {expected}")]
    CacheVersion {
        path: PathBuf,
        found: u32,
        expected: u32,
    },
    #[error(
        "likelihood cache {path} was built for a different marker panel \
         (fingerprint {found:08x}, current panel {expected:08x})"
    )]
    CachePanelMismatch {
        path: PathBuf,
        found: u32,
        expected: u32,
    },
    #[error("failed to serialize likelihood cache: {msg}")]
    CacheSerialize { msg: String },
    #[error("invalid comparison policy: {msg}")]
    InvalidPolicy { msg: String },
    #[error("invalid configuration: {msg}")]
    Config { msg: String },
    #[error("no {role} samples loaded")]
    NoSamples { role: &'static str },
    #[error("failed to build worker pool: {msg}")]
    ThreadPool { msg: String },
    #[error("failed to write results: {msg}")]
    Output { msg: String },
}

impl Error {
    pub(crate) fn io(path: &Path, source: std::io::Error) -> Self {
        Error::Io {
            path: path.to_path_buf(),
            source,
        }
    }

    pub(crate) fn config<S: Into<String>>(msg: S) -> Self {
        Error::Config { msg: msg.into() }
    }
}
