//! Parallel read mapping by lossy q-gram filtration and bit-parallel
//! verification.
//!
//! Reads are partitioned into blocks. Each block indexes its reads' q-grams
//! and scans every contig orientation window by window; candidate regions
//! that pass the filter are verified with Myers' bit-vector edit distance.
//! See [`pipeline::map_reads`] for the entry point.

pub mod defaults;
pub mod error;
pub mod filter;
pub mod io;
pub mod map_opt;
pub mod pipeline;
pub mod sequence;
pub mod utils;
pub mod verify;

pub use error::{MapError, Result};
pub use map_opt::{MapOpt, Strands};
pub use pipeline::{map_reads, MappingResult, MappingStats, MatchStore};
pub use sequence::{Contig, Orientation, Read};
pub use verify::Match;
