//! Sequence input and match output

pub mod match_output;
pub mod sequence_reader;

pub use match_output::{format_match, write_matches};
pub use sequence_reader::{read_contigs, read_reads, read_records, SequenceFormat};
