//! Contig regions excluded from scanning
//!
//! Long single-symbol runs (poly-A stretches, N gaps between scaffolds)
//! produce huge numbers of useless filter hits. The scan cursor skips the
//! ranges reported here entirely.

use std::ops::Range;

use crate::sequence::Contig;

/// Source of excluded `[begin, end)` ranges for a contig, forward-strand
/// coordinates, sorted and non-overlapping.
pub trait RepeatMasker: Sync {
    fn excluded_ranges(&self, contig: &Contig) -> Vec<Range<usize>>;
}

/// Excludes nothing
#[derive(Debug, Clone, Copy, Default)]
pub struct NoRepeats;

impl RepeatMasker for NoRepeats {
    fn excluded_ranges(&self, _contig: &Contig) -> Vec<Range<usize>> {
        Vec::new()
    }
}

/// Reports runs of one repeated symbol (period 1) of at least `min_length`
#[derive(Debug, Clone, Copy)]
pub struct HomopolymerMasker {
    pub min_length: usize,
}

impl HomopolymerMasker {
    pub fn new(min_length: usize) -> Self {
        Self { min_length }
    }
}

impl RepeatMasker for HomopolymerMasker {
    fn excluded_ranges(&self, contig: &Contig) -> Vec<Range<usize>> {
        if self.min_length == 0 {
            return Vec::new();
        }
        let ranges = homopolymer_runs(&contig.seq, self.min_length);
        if !ranges.is_empty() {
            let masked: usize = ranges.iter().map(|r| r.len()).sum();
            log::debug!(
                "Contig {}: {} repeat region(s), {} bp excluded from scanning",
                contig.name,
                ranges.len(),
                masked
            );
        }
        ranges
    }
}

/// Fixed list of ranges, e.g. from an external repeat annotation
#[derive(Debug, Clone, Default)]
pub struct StaticRepeats {
    pub ranges: Vec<Vec<Range<usize>>>,
}

impl RepeatMasker for StaticRepeats {
    fn excluded_ranges(&self, contig: &Contig) -> Vec<Range<usize>> {
        self.ranges.get(contig.id).cloned().unwrap_or_default()
    }
}

/// Runs of identical codes of length >= `min_length`
pub fn homopolymer_runs(seq: &[u8], min_length: usize) -> Vec<Range<usize>> {
    let mut runs = Vec::new();
    let mut start = 0usize;
    while start < seq.len() {
        let sym = seq[start];
        let mut end = start + 1;
        while end < seq.len() && seq[end] == sym {
            end += 1;
        }
        if end - start >= min_length {
            runs.push(start..end);
        }
        start = end;
    }
    runs
}
