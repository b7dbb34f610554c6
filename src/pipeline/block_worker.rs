// src/pipeline/block_worker.rs
//
// One block's unit of work for a contig pass: scan the contig window by
// window with the block's cursor, verify each window's hits and keep the
// matches in the block-owned buffer. Large hit batches are split over
// capacity borrowed from the availability vector.

use std::ops::Range;

use rayon::prelude::*;

use super::availability::AvailabilityVector;
use super::blocks::ReadBlock;
use crate::error::{try_reserve, Result};
use crate::filter::{FilterHit, ScanCursor, SeedIndex};
use crate::map_opt::ScheduleParams;
use crate::sequence::{ContigView, Read};
use crate::verify::{Match, Verifier, VerifyCounters};

/// Lifecycle of a block within one contig pass
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerState {
    NotStarted,
    Scanning,
    Verifying,
    Finished,
}

/// Per-block counters, summed over all passes
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BlockStats {
    pub passes: u64,
    pub windows: u64,
    pub filter_hits: u64,
    /// Windows whose verification was split over borrowed capacity
    pub splits: u64,
    pub verify: VerifyCounters,
}

impl BlockStats {
    pub fn add(&mut self, other: &BlockStats) {
        self.passes += other.passes;
        self.windows += other.windows;
        self.filter_hits += other.filter_hits;
        self.splits += other.splits;
        self.verify.add(&other.verify);
    }
}

pub struct BlockWorker<'r> {
    block: ReadBlock<'r>,
    index: SeedIndex,
    state: WorkerState,
    matches: Vec<Match>,
    stats: BlockStats,
}

impl<'r> BlockWorker<'r> {
    pub fn new(block: ReadBlock<'r>, index: SeedIndex) -> Self {
        debug_assert_eq!(block.len(), index.num_reads());
        Self {
            block,
            index,
            state: WorkerState::NotStarted,
            matches: Vec::new(),
            stats: BlockStats::default(),
        }
    }

    pub fn block_id(&self) -> usize {
        self.block.id
    }

    pub fn state(&self) -> WorkerState {
        self.state
    }

    pub fn matches(&self) -> &[Match] {
        &self.matches
    }

    pub fn stats(&self) -> &BlockStats {
        &self.stats
    }

    /// Hand over the block's match buffer and counters
    pub fn into_parts(self) -> (Vec<Match>, BlockStats) {
        (self.matches, self.stats)
    }

    /// Map the block against one contig orientation.
    ///
    /// `excluded` are view coordinates. The block's capacity is released to
    /// the next active block when the pass ends, also on error.
    pub fn run_pass(
        &mut self,
        view: &ContigView<'_>,
        excluded: &[Range<usize>],
        balancer: &AvailabilityVector,
        params: &ScheduleParams,
        error_rate: f64,
    ) -> Result<()> {
        self.state = WorkerState::NotStarted;
        self.stats.passes += 1;

        let result = if self.block.is_empty() {
            Ok(())
        } else {
            self.scan_and_verify(view, excluded, balancer, params, error_rate)
        };

        self.state = WorkerState::Finished;
        balancer.release(self.block.id);
        result
    }

    fn scan_and_verify(
        &mut self,
        view: &ContigView<'_>,
        excluded: &[Range<usize>],
        balancer: &AvailabilityVector,
        params: &ScheduleParams,
        error_rate: f64,
    ) -> Result<()> {
        let block_id = self.block.id;
        let reads = self.block.reads;
        let mut cursor = ScanCursor::new(block_id, &self.index, view.seq(), excluded);
        let mut owner = Verifier::new(view, error_rate);
        let matches_before = self.matches.len();

        loop {
            self.state = WorkerState::Scanning;
            let window = cursor.advance(params.window_size)?;
            self.stats.windows += 1;
            self.stats.filter_hits += window.hits.len() as u64;

            if !window.hits.is_empty() {
                self.state = WorkerState::Verifying;
                let mut hits = window.hits;
                // stable: same-read hits keep contig order
                hits.sort_by_key(|h| h.local_read);

                let available = if hits.len() >= params.split_threshold.max(1) {
                    balancer.available(block_id)
                } else {
                    0
                };
                let borrowed = if available > 0 {
                    let want = (hits.len() / params.split_threshold.max(1)).max(1);
                    balancer.borrow(block_id, want.min(params.max_borrowed_workers))
                } else {
                    0
                };

                if borrowed == 0 {
                    verify_sequential(&mut owner, reads, &hits, &mut self.matches)?;
                } else {
                    let result = verify_split(view, error_rate, reads, &hits, borrowed + 1);
                    balancer.give_back(block_id, borrowed);
                    let parts = result?;
                    log::trace!(
                        "Block {}: {} hits verified on {} tasks",
                        block_id,
                        hits.len(),
                        parts.len()
                    );
                    self.stats.splits += 1;
                    for (found, counters) in parts {
                        try_reserve(&mut self.matches, found.len(), "block match buffer")?;
                        self.matches.extend(found);
                        self.stats.verify.add(&counters);
                    }
                }
            }

            if !window.has_more {
                break;
            }
        }

        self.stats.verify.add(owner.counters());
        log::debug!(
            "Block {}: contig {} {} done, {} matches",
            block_id,
            view.contig_id,
            view.orientation,
            self.matches.len() - matches_before
        );
        Ok(())
    }
}

fn verify_sequential(
    verifier: &mut Verifier<'_>,
    reads: &[Read],
    hits: &[FilterHit],
    out: &mut Vec<Match>,
) -> Result<()> {
    for hit in hits {
        if let Some(m) = verifier.verify(&reads[hit.local_read as usize], hit) {
            if out.len() == out.capacity() {
                let grow = out.len().max(16);
                try_reserve(out, grow, "block match buffer")?;
            }
            out.push(m);
        }
    }
    Ok(())
}

/// Verify `hits` as `parts` fork-join tasks; results come back in sub-range
/// order.
fn verify_split(
    view: &ContigView<'_>,
    error_rate: f64,
    reads: &[Read],
    hits: &[FilterHit],
    parts: usize,
) -> Result<Vec<(Vec<Match>, VerifyCounters)>> {
    split_by_read(hits, parts)
        .into_par_iter()
        .map(|range| -> Result<(Vec<Match>, VerifyCounters)> {
            let mut verifier = Verifier::new(view, error_rate);
            let mut found = Vec::new();
            verify_sequential(&mut verifier, reads, &hits[range], &mut found)?;
            Ok((found, verifier.into_counters()))
        })
        .collect()
}

/// Cut `hits` (sorted by read) into at most `parts` contiguous ranges of
/// similar size without separating hits of the same read.
pub fn split_by_read(hits: &[FilterHit], parts: usize) -> Vec<Range<usize>> {
    let parts = parts.max(1);
    let target = hits.len().div_ceil(parts).max(1);
    let mut ranges = Vec::with_capacity(parts);
    let mut start = 0usize;
    while start < hits.len() {
        let mut end = (start + target).min(hits.len());
        while end < hits.len() && hits[end].local_read == hits[end - 1].local_read {
            end += 1;
        }
        ranges.push(start..end);
        start = end;
    }
    ranges
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::map_opt::FilterParams;
    use crate::sequence::{reads_from_ascii, Contig, Orientation};

    fn hit(read: u32) -> FilterHit {
        FilterHit {
            block_id: 0,
            local_read: read,
            window_begin: 0,
            window_end: 10,
        }
    }

    fn filter_params(q: usize, error_rate: f64) -> FilterParams {
        FilterParams {
            error_rate,
            seed_len: q,
            min_threshold: 1,
            abundance_cut: 1.0,
        }
    }

    fn schedule(window_size: usize, split_threshold: usize, pool_size: usize) -> ScheduleParams {
        ScheduleParams {
            window_size,
            split_threshold,
            pool_size,
            max_borrowed_workers: pool_size.saturating_sub(1),
        }
    }

    #[test]
    fn test_split_by_read_keeps_reads_together() {
        let hits: Vec<FilterHit> = [0, 0, 0, 1, 2, 2, 3, 3, 3, 3].iter().map(|&r| hit(r)).collect();
        let ranges = split_by_read(&hits, 3);
        assert_eq!(ranges, vec![0..4, 4..10]);
        for r in &ranges {
            if r.end < hits.len() {
                assert_ne!(hits[r.end - 1].local_read, hits[r.end].local_read);
            }
        }
    }

    #[test]
    fn test_split_by_read_single_read() {
        let hits: Vec<FilterHit> = (0..10).map(|_| hit(5)).collect();
        assert_eq!(split_by_read(&hits, 4), vec![0..10]);
        assert!(split_by_read(&[], 4).is_empty());
    }

    #[test]
    fn test_pass_finds_matches_and_finishes() {
        let reads = reads_from_ascii(&["ACGTACGT", "TTTTACGT"]);
        let block = ReadBlock {
            id: 0,
            first_read: 0,
            reads: &reads,
        };
        let index = SeedIndex::build(&reads, &filter_params(4, 0.1)).unwrap();
        let mut worker = BlockWorker::new(block, index);
        assert_eq!(worker.state(), WorkerState::NotStarted);

        let contig = Contig::new(0, "chr", b"GGACGTACGTCCTTTTACGTGG");
        let view = contig.view(Orientation::Forward);
        let av = AvailabilityVector::new(1, 1, 0);
        worker.run_pass(&view, &[], &av, &schedule(5, 100, 1), 0.1).unwrap();

        assert_eq!(worker.state(), WorkerState::Finished);
        assert!(!av.is_active(0));
        let found: Vec<(usize, usize, usize, usize)> = worker
            .matches()
            .iter()
            .filter(|m| m.edit_distance == 0)
            .map(|m| (m.read_id, m.begin, m.end, m.edit_distance))
            .collect();
        assert!(found.contains(&(0, 2, 10, 0)));
        assert!(found.contains(&(1, 12, 20, 0)));
        assert!(worker.stats().windows >= 4);
        assert_eq!(worker.stats().verify.verifications, worker.stats().filter_hits);
    }

    #[test]
    fn test_empty_block_finishes_immediately() {
        let reads: Vec<Read> = Vec::new();
        let block = ReadBlock {
            id: 0,
            first_read: 0,
            reads: &reads,
        };
        let index = SeedIndex::build(&reads, &filter_params(4, 0.1)).unwrap();
        let mut worker = BlockWorker::new(block, index);
        let contig = Contig::new(0, "chr", b"ACGTACGTACGT");
        let view = contig.view(Orientation::Forward);
        let av = AvailabilityVector::new(1, 1, 0);
        worker.run_pass(&view, &[], &av, &schedule(4, 1, 1), 0.1).unwrap();
        assert_eq!(worker.state(), WorkerState::Finished);
        assert!(worker.matches().is_empty());
        assert_eq!(worker.stats().windows, 0);
    }

    #[test]
    fn test_split_verification_matches_sequential() {
        let seqs: Vec<String> = (0..40)
            .map(|i| {
                let unit = ["ACGTTGCA", "TTGACCAG", "GATCCTAG", "CAGTAGGC"][i % 4];
                format!("{}{}", unit, unit)
            })
            .collect();
        let reads = reads_from_ascii(&seqs);
        let contig = Contig::new(
            0,
            "chr",
            b"ACGTTGCAACGTTGCAGGTTGACCAGTTGACCAGGGATCCTAGGATCCTAGCCCAGTAGGCCAGTAGGC",
        );
        let view = contig.view(Orientation::Forward);
        let fp = filter_params(4, 0.1);

        let run = |split_threshold: usize, pool: usize| {
            let block = ReadBlock {
                id: 0,
                first_read: 0,
                reads: &reads,
            };
            let mut worker = BlockWorker::new(block, SeedIndex::build(&reads, &fp).unwrap());
            let av = AvailabilityVector::new(1, pool, pool - 1);
            worker
                .run_pass(&view, &[], &av, &schedule(1_000, split_threshold, pool), 0.1)
                .unwrap();
            worker.into_parts()
        };

        let (sequential, seq_stats) = run(1_000_000, 1);
        let (split, split_stats) = run(2, 4);
        assert_eq!(seq_stats.splits, 0);
        assert!(split_stats.splits > 0);
        assert_eq!(sequential, split);
        assert_eq!(seq_stats.verify, split_stats.verify);
    }
}
