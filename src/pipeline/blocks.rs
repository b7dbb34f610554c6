// src/pipeline/blocks.rs
//
// Partitioning of the read set into contiguous blocks.

use crate::defaults::MIN_PARALLEL_READS;
use crate::sequence::Read;

/// Contiguous range of reads processed by one block worker
#[derive(Debug, Clone, Copy)]
pub struct ReadBlock<'r> {
    pub id: usize,
    /// Index of the first read of the block in the full read set
    pub first_read: usize,
    pub reads: &'r [Read],
}

impl ReadBlock<'_> {
    pub fn len(&self) -> usize {
        self.reads.len()
    }

    pub fn is_empty(&self) -> bool {
        self.reads.is_empty()
    }
}

/// Split `reads` into `requested` blocks of `n / requested` reads, the last
/// block taking the remainder.
///
/// Small read sets (fewer than [`MIN_PARALLEL_READS`]) are kept in one block.
/// The result is never empty: an empty read set yields one empty block.
pub fn partition_reads(reads: &[Read], requested: usize) -> Vec<ReadBlock<'_>> {
    let n = reads.len();
    let blocks = if n < MIN_PARALLEL_READS {
        1
    } else {
        requested.clamp(1, n)
    };

    if blocks == 1 {
        if n > 0 && requested > 1 {
            log::debug!(
                "Only {} reads, mapping sequentially in one block (parallel from {})",
                n,
                MIN_PARALLEL_READS
            );
        }
        return vec![ReadBlock {
            id: 0,
            first_read: 0,
            reads,
        }];
    }

    let per_block = n / blocks;
    let mut out = Vec::with_capacity(blocks);
    for id in 0..blocks {
        let first = id * per_block;
        let last = if id + 1 == blocks { n } else { first + per_block };
        out.push(ReadBlock {
            id,
            first_read: first,
            reads: &reads[first..last],
        });
    }

    log::debug!(
        "Partitioned {} reads into {} blocks of {} (last {})",
        n,
        blocks,
        per_block,
        out.last().map(|b| b.len()).unwrap_or(0)
    );
    out
}
