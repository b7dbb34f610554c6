//! Parallel mapping pipeline
//!
//! Reads are split into blocks; each block owns a seed index, one scan
//! cursor per contig pass and a private match buffer. Blocks that finish
//! early hand their thread to blocks still scanning through the
//! availability vector, and the buffers are merged once at the end.

pub mod aggregator;
pub mod availability;
pub mod block_worker;
pub mod blocks;
pub mod orchestrator;

pub use aggregator::{merge, MatchStore};
pub use availability::AvailabilityVector;
pub use block_worker::{BlockStats, BlockWorker, WorkerState};
pub use blocks::{partition_reads, ReadBlock};
pub use orchestrator::{map_reads, MappingResult, MappingStats};
