//! Error types for the mapping core
//!
//! Only run-level failures live here. A filter hit that fails verification
//! is not an error; the block worker drops it and counts it.

use std::io;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, MapError>;

#[derive(Debug, Error)]
pub enum MapError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Malformed sequence file
    #[error("failed to parse {path}: {msg}")]
    Parse { path: String, msg: String },

    /// An index, hit batch or match buffer could not be allocated.
    /// Fatal to the whole run; partial block results are discarded.
    #[error("out of memory while allocating {what} ({requested} entries)")]
    ResourceExhausted { what: &'static str, requested: usize },

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("failed to build worker pool: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),
}

impl MapError {
    pub(crate) fn exhausted(what: &'static str, requested: usize) -> Self {
        MapError::ResourceExhausted { what, requested }
    }
}

/// Grow `buf` so it can take `additional` more entries, mapping allocator
/// failure to [`MapError::ResourceExhausted`].
pub(crate) fn try_reserve<T>(buf: &mut Vec<T>, additional: usize, what: &'static str) -> Result<()> {
    buf.try_reserve(additional)
        .map_err(|_| MapError::exhausted(what, buf.len().saturating_add(additional)))
}
