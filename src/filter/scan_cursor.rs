//! Windowed q-gram scan of one contig orientation for one block
//!
//! The cursor walks the contig base by base, looks up every q-gram in the
//! block's [`SeedIndex`] and counts the occurrences per read and diagonal
//! bucket. A bucket is a parallelogram of `delta + k` adjacent diagonals
//! (`k` = the read's error budget); buckets overlap by `k` diagonals so any
//! alignment with at most `k` indels has all of its q-grams inside one of
//! them. When a bucket collects the read's q-gram threshold it is reported
//! once as a [`FilterHit`] covering the contig region the parallelogram can
//! reach.
//!
//! Work is handed out in windows: [`ScanCursor::advance`] scans the next
//! `window_size` bases and returns the hits found so far. Buckets whose
//! parallelogram extends past the window are carried into the next call.

use std::ops::Range;

use rustc_hash::FxHashMap;

use super::seed_index::{QGramHasher, SeedIndex};
use crate::error::{try_reserve, Result};

/// Unverified candidate: read `local_read` of block `block_id` may align
/// somewhere inside `[window_begin, window_end)` of the scanned contig view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FilterHit {
    pub block_id: usize,
    pub local_read: u32,
    pub window_begin: usize,
    pub window_end: usize,
}

/// Result of one [`ScanCursor::advance`] call
#[derive(Debug, Default)]
pub struct ScanWindow {
    pub hits: Vec<FilterHit>,
    pub has_more: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CursorState {
    NotStarted,
    /// Next base to scan
    Scanning { pos: usize },
    Exhausted,
}

#[derive(Debug, Clone, Copy, Default)]
struct Bucket {
    count: u32,
    reported: bool,
}

/// Parallelogram shape for one read
#[derive(Debug, Clone, Copy)]
struct BucketGeometry {
    delta: i64,
    width: i64,
    errors: i64,
    len: i64,
    threshold: u32,
}

impl BucketGeometry {
    /// Buckets containing diagonal `diag`
    #[inline]
    fn buckets_for(&self, diag: i64) -> Range<i64> {
        let first = (diag - self.width).div_euclid(self.delta) + 1;
        let last = diag.div_euclid(self.delta);
        first..last + 1
    }

    /// Last q-gram start position that can still land in `bucket`
    #[inline]
    fn last_contributor(&self, bucket: i64, q: i64) -> i64 {
        bucket * self.delta + self.width - 1 + self.len - q
    }

    /// Contig region reachable from `bucket`, clamped to `[0, text_len)`
    #[inline]
    fn region(&self, bucket: i64, text_len: usize) -> (usize, usize) {
        let lo = bucket * self.delta - self.errors;
        let hi = bucket * self.delta + self.width + self.len + self.errors;
        let text_len = text_len as i64;
        (lo.clamp(0, text_len) as usize, hi.clamp(0, text_len) as usize)
    }
}

/// Stateful filter over one contig view for one block
pub struct ScanCursor<'a> {
    block_id: usize,
    index: &'a SeedIndex,
    text: &'a [u8],
    excluded: Vec<Range<usize>>,
    next_excluded: usize,
    state: CursorState,
    hasher: QGramHasher,
    geometry: Vec<BucketGeometry>,
    buckets: FxHashMap<(u32, i64), Bucket>,
}

impl<'a> ScanCursor<'a> {
    /// `excluded` are ranges of `text` (view coordinates) never scanned.
    pub fn new(
        block_id: usize,
        index: &'a SeedIndex,
        text: &'a [u8],
        excluded: &[Range<usize>],
    ) -> Self {
        let geometry = index
            .read_infos()
            .iter()
            .map(|info| {
                let k = info.max_errors as i64;
                let delta = ((info.max_errors + 1).next_power_of_two()).max(16) as i64;
                BucketGeometry {
                    delta,
                    width: delta + k,
                    errors: k,
                    len: info.len as i64,
                    threshold: info.threshold.min(u32::MAX as usize) as u32,
                }
            })
            .collect();

        Self {
            block_id,
            index,
            text,
            excluded: merge_ranges(excluded, text.len()),
            next_excluded: 0,
            state: CursorState::NotStarted,
            hasher: QGramHasher::new(index.seed_len()),
            geometry,
            buckets: FxHashMap::default(),
        }
    }

    pub fn state(&self) -> CursorState {
        self.state
    }

    pub fn is_exhausted(&self) -> bool {
        self.state == CursorState::Exhausted
    }

    /// Number of partially filled buckets carried to the next window
    pub fn open_buckets(&self) -> usize {
        self.buckets.len()
    }

    /// Scan the next `window_size` bases.
    ///
    /// Once `has_more` is false the cursor is terminal. Advancing it again is
    /// a logic error: debug builds panic, release builds return another empty
    /// terminal window.
    pub fn advance(&mut self, window_size: usize) -> Result<ScanWindow> {
        let start = match self.state {
            CursorState::NotStarted => 0,
            CursorState::Scanning { pos } => pos,
            CursorState::Exhausted => {
                debug_assert!(false, "scan cursor advanced past its terminal state");
                log::error!(
                    "Block {}: scan cursor advanced after exhaustion, ignoring",
                    self.block_id
                );
                return Ok(ScanWindow::default());
            }
        };

        let q = self.index.seed_len();
        let end = start.saturating_add(window_size.max(1)).min(self.text.len());
        let mut hits = Vec::new();

        let mut pos = start;
        while pos < end {
            if let Some(gap) = self.excluded.get(self.next_excluded) {
                if pos >= gap.start {
                    log::trace!(
                        "Block {}: skipping excluded region [{}, {})",
                        self.block_id,
                        gap.start,
                        gap.end
                    );
                    pos = pos.max(gap.end);
                    self.next_excluded += 1;
                    self.hasher.reset();
                    // Seed state never spans an excluded region
                    self.buckets.clear();
                    continue;
                }
            }

            if let Some(code) = self.hasher.push(self.text[pos]) {
                let qgram_start = (pos + 1 - q) as i64;
                for occ in self.index.lookup(code) {
                    let geo = self.geometry[occ.local_read as usize];
                    let diag = qgram_start - occ.offset as i64;
                    for bucket in geo.buckets_for(diag) {
                        let slot = self.buckets.entry((occ.local_read, bucket)).or_default();
                        slot.count += 1;
                        if !slot.reported && slot.count >= geo.threshold {
                            slot.reported = true;
                            let (window_begin, window_end) = geo.region(bucket, self.text.len());
                            if hits.len() == hits.capacity() {
                                let grow = hits.len().max(64);
                                try_reserve(&mut hits, grow, "filter hits")?;
                            }
                            hits.push(FilterHit {
                                block_id: self.block_id,
                                local_read: occ.local_read,
                                window_begin,
                                window_end,
                            });
                        }
                    }
                }
            }
            pos += 1;
        }

        let has_more = pos < self.text.len();
        if has_more {
            self.state = CursorState::Scanning { pos };
            self.retire_buckets(pos, q);
        } else {
            self.state = CursorState::Exhausted;
            self.buckets.clear();
        }

        Ok(ScanWindow { hits, has_more })
    }

    /// Drop buckets no q-gram starting at or after `pos` can reach.
    /// The next q-gram to complete starts at `pos + 1 - q` at the earliest.
    fn retire_buckets(&mut self, pos: usize, q: usize) {
        let next_start = pos as i64 + 1 - q as i64;
        let geometry = &self.geometry;
        self.buckets.retain(|&(read, bucket), _| {
            geometry[read as usize].last_contributor(bucket, q as i64) >= next_start
        });
    }
}

/// Sort, clamp and merge overlapping ranges
fn merge_ranges(ranges: &[Range<usize>], len: usize) -> Vec<Range<usize>> {
    let mut sorted: Vec<Range<usize>> = ranges
        .iter()
        .map(|r| r.start.min(len)..r.end.min(len))
        .filter(|r| !r.is_empty())
        .collect();
    sorted.sort_by_key(|r| r.start);

    let mut merged: Vec<Range<usize>> = Vec::with_capacity(sorted.len());
    for r in sorted {
        match merged.last_mut() {
            Some(last) if r.start <= last.end => last.end = last.end.max(r.end),
            _ => merged.push(r),
        }
    }
    merged
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::map_opt::FilterParams;
    use crate::sequence::{encode_sequence, reads_from_ascii};

    fn build(reads: &[&str], q: usize, error_rate: f64) -> SeedIndex {
        let params = FilterParams {
            error_rate,
            seed_len: q,
            min_threshold: 1,
            abundance_cut: 1.0,
        };
        SeedIndex::build(&reads_from_ascii(reads), &params).unwrap()
    }

    fn scan_all(cursor: &mut ScanCursor, window: usize) -> Vec<FilterHit> {
        let mut all = Vec::new();
        loop {
            let w = cursor.advance(window).unwrap();
            all.extend(w.hits);
            if !w.has_more {
                break;
            }
        }
        all
    }

    fn covers(hit: &FilterHit, begin: usize, end: usize) -> bool {
        hit.window_begin <= begin && end <= hit.window_end
    }

    #[test]
    fn test_exact_occurrences_are_hit() {
        let index = build(&["ACGTACGT", "TTTTACGT"], 4, 0.1);
        let text = encode_sequence(b"GGACGTACGTCCTTTTACGTGG");
        let mut cursor = ScanCursor::new(0, &index, &text, &[]);
        let hits = scan_all(&mut cursor, 10_000);

        assert!(hits.iter().any(|h| h.local_read == 0 && covers(h, 2, 10)));
        assert!(hits.iter().any(|h| h.local_read == 1 && covers(h, 12, 20)));
        assert!(cursor.is_exhausted());
    }

    #[test]
    fn test_small_windows_find_the_same_hits() {
        let index = build(&["ACGTACGTAC", "TTGCATTGCA"], 4, 0.1);
        let text = encode_sequence(b"CCCCACGTACGTACGGGGGGTTGCATTGCAGGGGACGTACGTAC");
        let mut whole = ScanCursor::new(0, &index, &text, &[]);
        let mut expected = scan_all(&mut whole, 1_000);

        for window in [1, 3, 7, 16] {
            let mut cursor = ScanCursor::new(0, &index, &text, &[]);
            let mut got = scan_all(&mut cursor, window);
            got.sort_by_key(|h| (h.local_read, h.window_begin));
            expected.sort_by_key(|h| (h.local_read, h.window_begin));
            assert_eq!(got, expected, "window size {}", window);
        }
    }

    #[test]
    fn test_buckets_carried_across_window_boundary() {
        // threshold 5 for an exact 8bp read with q=4: every q-gram is needed
        let index = build(&["ACGTTGCA"], 4, 0.0);
        let text = encode_sequence(b"GGGGACGTTGCAGGGG");
        let mut cursor = ScanCursor::new(0, &index, &text, &[]);

        let first = cursor.advance(9).unwrap();
        assert!(first.hits.is_empty());
        assert!(first.has_more);
        assert!(cursor.open_buckets() > 0);

        let second = cursor.advance(100).unwrap();
        assert!(!second.has_more);
        assert_eq!(second.hits.len(), 1);
        assert!(covers(&second.hits[0], 4, 12));
    }

    #[test]
    fn test_mismatch_still_hit_within_tolerance() {
        // 20bp read, q=4, 10% -> k=2, threshold 21 - 12 = 9
        let read = "ACGTTGCAAGCTTCGATGCA";
        let index = build(&[read], 4, 0.1);
        let mut mutated = read.as_bytes().to_vec();
        mutated[10] = b'A';
        let mut contig = b"GGGGGGGGGG".to_vec();
        contig.extend_from_slice(&mutated);
        contig.extend_from_slice(b"GGGGGGGGGG");
        let text = encode_sequence(&contig);

        let mut cursor = ScanCursor::new(0, &index, &text, &[]);
        let hits = scan_all(&mut cursor, 5);
        assert!(hits.iter().any(|h| covers(h, 10, 30)));
    }

    #[test]
    fn test_excluded_region_is_skipped_without_merging() {
        let index = build(&["ACGTTGCA"], 4, 0.0);
        // occurrence split by the excluded range must not be reported
        let text = encode_sequence(b"ACGTTGCAGGACGTAAAAAAAATGCAGGACGTTGCA");
        let mut cursor = ScanCursor::new(0, &index, &text, &[14..22]);
        let hits = scan_all(&mut cursor, 4);

        assert_eq!(hits.len(), 2);
        // right before the gap region and right after it
        assert!(hits.iter().any(|h| covers(h, 0, 8)));
        assert!(hits.iter().any(|h| covers(h, 28, 36)));
    }

    #[test]
    fn test_gap_inside_occurrence_does_not_merge_counts() {
        // 20bp, k=1, threshold 13: 7 q-grams before the gap + 6 after would
        // reach it only if counts were merged across the gap
        let read = "ACGTTGCAAGCTTCGATGCA";
        let index = build(&[read], 4, 0.05);
        let mut contig = b"GGGGG".to_vec();
        contig.extend_from_slice(read.as_bytes());
        contig.extend_from_slice(b"GGGGG");
        let text = encode_sequence(&contig);

        let mut open = ScanCursor::new(0, &index, &text, &[]);
        assert!(scan_all(&mut open, 8).iter().any(|h| covers(h, 5, 25)));

        let mut gapped = ScanCursor::new(0, &index, &text, &[15..16]);
        assert!(!scan_all(&mut gapped, 8).iter().any(|h| covers(h, 5, 25)));
    }

    #[test]
    fn test_text_shorter_than_seed() {
        let index = build(&["ACGTACGT"], 4, 0.0);
        let text = encode_sequence(b"ACG");
        let mut cursor = ScanCursor::new(3, &index, &text, &[]);
        let w = cursor.advance(100).unwrap();
        assert!(w.hits.is_empty());
        assert!(!w.has_more);
        assert_eq!(cursor.state(), CursorState::Exhausted);
    }

    #[test]
    fn test_hits_carry_block_id() {
        let index = build(&["ACGTACGT"], 4, 0.0);
        let text = encode_sequence(b"TTACGTACGTTT");
        let mut cursor = ScanCursor::new(7, &index, &text, &[]);
        let hits = scan_all(&mut cursor, 100);
        assert!(!hits.is_empty());
        assert!(hits.iter().all(|h| h.block_id == 7 && h.window_end <= text.len()));
    }

    #[test]
    #[cfg(debug_assertions)]
    #[should_panic(expected = "terminal state")]
    fn test_advance_after_exhaustion_panics_in_debug() {
        let index = build(&["ACGT"], 4, 0.0);
        let text = encode_sequence(b"ACGT");
        let mut cursor = ScanCursor::new(0, &index, &text, &[]);
        let _ = cursor.advance(100).unwrap();
        let _ = cursor.advance(100);
    }

    #[test]
    fn test_merge_ranges() {
        assert_eq!(
            merge_ranges(&[20..30, 0..5, 3..8, 25..40, 50..60], 45),
            vec![0..8, 20..40]
        );
    }
}
