//! Mapping run orchestration
//!
//! ```text
//! reads ──► partition_reads ──► SeedIndex per block (parallel)
//!                                    │
//! for each contig, for each orientation:
//!     ContigView + mirrored excluded ranges + fresh AvailabilityVector
//!     every BlockWorker::run_pass in parallel  ── join ──► next pass
//!                                    │
//! block buffers ──► aggregator::merge ──► MatchStore
//! ```
//!
//! Only one orientation pass runs at a time. A failing block aborts the run
//! and every block buffer is dropped unmerged.

use std::fmt;
use std::time::Instant;

use rayon::prelude::*;

use super::aggregator::{merge, MatchStore};
use super::availability::AvailabilityVector;
use super::block_worker::{BlockStats, BlockWorker};
use super::blocks::partition_reads;
use crate::error::Result;
use crate::filter::{RepeatMasker, SeedIndex};
use crate::map_opt::MapOpt;
use crate::sequence::{Contig, Read};
use crate::utils::cputime;

/// Run-level counters and phase timings
#[derive(Debug, Clone, Default)]
pub struct MappingStats {
    pub reads: usize,
    pub contigs: usize,
    pub blocks: usize,
    /// Contig orientations scanned
    pub passes: usize,
    pub windows: u64,
    pub filter_hits: u64,
    pub verifications: u64,
    pub successful_verifications: u64,
    pub inconsistent_verifications: u64,
    pub split_windows: u64,
    pub matches: usize,
    pub index_secs: f64,
    pub mapping_secs: f64,
    pub merge_secs: f64,
    pub cpu_secs: f64,
}

impl MappingStats {
    fn absorb(&mut self, block: &BlockStats) {
        self.windows += block.windows;
        self.filter_hits += block.filter_hits;
        self.verifications += block.verify.verifications;
        self.successful_verifications += block.verify.successes;
        self.inconsistent_verifications += block.verify.inconsistent;
        self.split_windows += block.splits;
    }
}

impl fmt::Display for MappingStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} reads, {} contigs, {} blocks, {} passes; filtration {}, verifications {} ({} successful), {} matches; index {:.3}s, mapping {:.3}s, merge {:.3}s, cpu {:.3}s",
            self.reads,
            self.contigs,
            self.blocks,
            self.passes,
            self.filter_hits,
            self.verifications,
            self.successful_verifications,
            self.matches,
            self.index_secs,
            self.mapping_secs,
            self.merge_secs,
            self.cpu_secs
        )
    }
}

#[derive(Debug, Clone)]
pub struct MappingResult {
    pub matches: MatchStore,
    pub stats: MappingStats,
}

/// Map `reads` against `contigs` on a dedicated pool of `opt.n_threads`
/// threads.
///
/// `opt` is validated on a copy; corrections are logged, never fatal.
pub fn map_reads(
    contigs: &[Contig],
    reads: &[Read],
    masker: &dyn RepeatMasker,
    opt: &MapOpt,
) -> Result<MappingResult> {
    let mut opt = opt.clone();
    opt.validate();

    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(opt.n_threads)
        .thread_name(|i| format!("ferrous-map-{}", i))
        .build()?;

    pool.install(|| run(contigs, reads, masker, &opt))
}

fn run(contigs: &[Contig], reads: &[Read], masker: &dyn RepeatMasker, opt: &MapOpt) -> Result<MappingResult> {
    let cpu_start = cputime();
    let mut stats = MappingStats {
        reads: reads.len(),
        contigs: contigs.len(),
        ..MappingStats::default()
    };

    // ========================================================================
    // Phase 1: blocks and seed indexes
    // ========================================================================
    let timer = Instant::now();
    let blocks = partition_reads(reads, opt.requested_blocks());
    let filter_params = opt.filter_params();
    let indexes = blocks
        .par_iter()
        .map(|block| SeedIndex::build(block.reads, &filter_params))
        .collect::<Result<Vec<_>>>()?;

    let mut workers: Vec<BlockWorker<'_>> = blocks
        .into_iter()
        .zip(indexes)
        .map(|(block, index)| BlockWorker::new(block, index))
        .collect();
    stats.blocks = workers.len();
    stats.index_secs = timer.elapsed().as_secs_f64();

    log::info!(
        "Indexed {} reads in {} block(s), q={}, {:.3}s",
        reads.len(),
        workers.len(),
        opt.seed_len,
        stats.index_secs
    );

    // ========================================================================
    // Phase 2: one pass per contig orientation
    // ========================================================================
    let timer = Instant::now();
    let schedule = opt.schedule_params();
    for contig in contigs {
        let excluded = masker.excluded_ranges(contig);
        for &orientation in opt.strands.orientations() {
            let view = contig.view(orientation);
            let view_excluded = view.map_ranges(&excluded);
            let balancer =
                AvailabilityVector::new(workers.len(), schedule.pool_size, schedule.max_borrowed_workers);

            log::debug!(
                "Scanning contig {} ({} bp, {}) with {} block(s)",
                contig.name,
                contig.len(),
                orientation,
                workers.len()
            );

            workers.par_iter_mut().try_for_each(|worker| {
                worker.run_pass(&view, &view_excluded, &balancer, &schedule, opt.error_rate)
            })?;
            stats.passes += 1;
        }
    }
    stats.mapping_secs = timer.elapsed().as_secs_f64();

    // ========================================================================
    // Phase 3: merge block buffers
    // ========================================================================
    let timer = Instant::now();
    let mut buffers = Vec::with_capacity(workers.len());
    for worker in workers {
        let (matches, block_stats) = worker.into_parts();
        stats.absorb(&block_stats);
        buffers.push(matches);
    }
    let matches = merge(buffers)?;
    stats.matches = matches.len();
    stats.merge_secs = timer.elapsed().as_secs_f64();
    stats.cpu_secs = cputime() - cpu_start;

    log::info!("Mapping complete: {}", stats);
    if stats.inconsistent_verifications > 0 {
        log::debug!(
            "{} hit(s) dropped after inconsistent verification",
            stats.inconsistent_verifications
        );
    }

    Ok(MappingResult { matches, stats })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::NoRepeats;
    use crate::map_opt::Strands;
    use crate::sequence::{reads_from_ascii, Orientation};

    fn opt(error_rate: f64, q: usize) -> MapOpt {
        MapOpt {
            error_rate,
            seed_len: q,
            n_threads: 2,
            strands: Strands::Forward,
            ..MapOpt::default()
        }
    }

    #[test]
    fn test_two_reads_exact() {
        let reads = reads_from_ascii(&["ACGTACGT", "TTTTACGT"]);
        let contigs = vec![Contig::new(0, "chr", b"GGACGTACGTCCTTTTACGTGG")];
        let result = map_reads(&contigs, &reads, &NoRepeats, &opt(0.1, 4)).unwrap();

        let exact: Vec<(usize, usize, usize)> = result
            .matches
            .iter()
            .filter(|m| m.edit_distance == 0)
            .map(|m| (m.read_id, m.begin, m.end))
            .collect();
        // no deduplication: both buckets of read 0 verify to the same span
        assert_eq!(exact.iter().filter(|&&e| e == (0, 2, 10)).count(), 2);
        assert_eq!(exact.iter().filter(|&&e| e == (1, 12, 20)).count(), 1);
        assert_eq!(result.stats.passes, 1);
        assert_eq!(result.stats.blocks, 1);
        assert_eq!(result.stats.matches, result.matches.len());
    }

    #[test]
    fn test_zero_error_rate_rejects_substitution() {
        let reads = reads_from_ascii(&["ACGTACGT"]);
        let contigs = vec![Contig::new(0, "chr", b"GGACGTTCGTCC")];
        let result = map_reads(&contigs, &reads, &NoRepeats, &opt(0.0, 4)).unwrap();
        assert!(result.matches.is_empty());
    }

    #[test]
    fn test_reverse_strand_in_forward_coordinates() {
        // contig carries the reverse complement of the read at [5, 13)
        let reads = reads_from_ascii(&["ACGTTGCA"]);
        let contigs = vec![Contig::new(0, "chr", b"GGGGGTGCAACGTGGGG")];
        let mut o = opt(0.0, 4);
        o.strands = Strands::Both;
        let result = map_reads(&contigs, &reads, &NoRepeats, &o).unwrap();

        assert_eq!(result.stats.passes, 2);
        let rev: Vec<_> = result
            .matches
            .iter()
            .filter(|m| m.orientation == Orientation::ReverseComplement)
            .collect();
        assert!(!rev.is_empty());
        assert!(rev.iter().all(|m| (m.begin, m.end) == (5, 13)));
    }

    #[test]
    fn test_no_reads_no_matches() {
        let contigs = vec![Contig::new(0, "chr", b"ACGTACGT")];
        let result = map_reads(&contigs, &[], &NoRepeats, &opt(0.1, 4)).unwrap();
        assert!(result.matches.is_empty());
        assert_eq!(result.stats.blocks, 1);
    }
}
