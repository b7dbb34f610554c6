//! Q-gram index over the reads of one block
//!
//! Every q-gram of every read is recorded as a `(local_read, offset)`
//! occurrence. Occurrences are stored in one array sorted by q-gram code
//! with a hash directory pointing at each code's slice, so a lookup is one
//! hash probe plus a slice borrow.
//!
//! Seeds that occur far more often than the abundance threshold can be
//! disabled. A disabled seed looks exactly like an absent one to the scan
//! cursor, which bounds the number of candidate hits produced by
//! low-complexity read content.

use rustc_hash::FxHashMap;

use crate::defaults::{MAX_SEED_LENGTH, MIN_ABUNDANCE_THRESHOLD};
use crate::error::{try_reserve, MapError, Result};
use crate::map_opt::FilterParams;
use crate::sequence::{max_errors, Read, N_CODE};

/// One occurrence of a seed inside the block's reads
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct SeedOccurrence {
    pub local_read: u32,
    pub offset: u32,
}

/// Per-read filtration parameters derived from the read length
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReadFilterInfo {
    pub len: usize,
    pub max_errors: usize,
    /// Number of q-gram hits a diagonal bucket needs before it is reported
    pub threshold: usize,
    /// False when the q-gram lemma bound is below 1 and the configured
    /// minimum threshold had to be used instead
    pub lossless: bool,
}

#[derive(Debug, Clone, Copy)]
struct DirEntry {
    start: u32,
    end: u32,
    disabled: bool,
}

/// Rolling 2-bit packing of consecutive bases into a q-gram code.
///
/// `push` returns the code of the q-gram ending at the pushed base once `q`
/// valid bases have been seen since the last N.
#[derive(Debug, Clone, Copy)]
pub struct QGramHasher {
    q: usize,
    mask: u64,
    code: u64,
    valid: usize,
}

impl QGramHasher {
    pub fn new(q: usize) -> Self {
        debug_assert!((1..=MAX_SEED_LENGTH).contains(&q));
        let mask = if q >= 32 { u64::MAX } else { (1u64 << (2 * q)) - 1 };
        Self {
            q,
            mask,
            code: 0,
            valid: 0,
        }
    }

    #[inline]
    pub fn push(&mut self, base: u8) -> Option<u64> {
        if base >= N_CODE {
            self.valid = 0;
            self.code = 0;
            return None;
        }
        self.code = ((self.code << 2) | base as u64) & self.mask;
        self.valid += 1;
        if self.valid >= self.q {
            Some(self.code)
        } else {
            None
        }
    }

    pub fn reset(&mut self) {
        self.code = 0;
        self.valid = 0;
    }
}

/// Pack a q-gram into its code, `None` if it contains N
pub fn qgram_code(seed: &[u8]) -> Option<u64> {
    let mut code = 0u64;
    for &b in seed {
        if b >= N_CODE {
            return None;
        }
        code = (code << 2) | b as u64;
    }
    Some(code)
}

/// Read-only seed index of one block
#[derive(Debug)]
pub struct SeedIndex {
    q: usize,
    occurrences: Vec<SeedOccurrence>,
    dir: FxHashMap<u64, DirEntry>,
    reads: Vec<ReadFilterInfo>,
    disabled_seeds: usize,
}

impl SeedIndex {
    /// Build the index over `reads` (local read id = position in the slice).
    pub fn build(reads: &[Read], params: &FilterParams) -> Result<Self> {
        let q = params.seed_len;

        let mut keyed: Vec<(u64, SeedOccurrence)> = Vec::new();
        let total_qgrams: usize = reads.iter().map(|r| r.len().saturating_sub(q - 1)).sum();
        let longest = reads.iter().map(Read::len).max().unwrap_or(0);
        check_index_limits(total_qgrams, reads.len(), longest)?;
        try_reserve(&mut keyed, total_qgrams, "seed occurrences")?;

        let mut infos = Vec::new();
        try_reserve(&mut infos, reads.len(), "read filter parameters")?;

        for (local, read) in reads.iter().enumerate() {
            let mut hasher = QGramHasher::new(q);
            for (pos, &base) in read.seq.iter().enumerate() {
                if let Some(code) = hasher.push(base) {
                    keyed.push((
                        code,
                        SeedOccurrence {
                            local_read: local as u32,
                            offset: (pos + 1 - q) as u32,
                        },
                    ));
                }
            }
            infos.push(read_filter_info(read.len(), params));
        }

        keyed.sort_unstable();

        let abundance_thresh = if params.abundance_cut < 1.0 {
            ((keyed.len() as f64 * params.abundance_cut) as usize).max(MIN_ABUNDANCE_THRESHOLD)
        } else {
            usize::MAX
        };

        let mut dir = FxHashMap::default();
        let mut occurrences = Vec::new();
        try_reserve(&mut occurrences, keyed.len(), "seed occurrences")?;
        let mut disabled_seeds = 0usize;

        let mut i = 0usize;
        while i < keyed.len() {
            let code = keyed[i].0;
            let mut j = i;
            while j < keyed.len() && keyed[j].0 == code {
                occurrences.push(keyed[j].1);
                j += 1;
            }
            let disabled = j - i > abundance_thresh;
            if disabled {
                disabled_seeds += 1;
            }
            dir.insert(
                code,
                DirEntry {
                    start: i as u32,
                    end: j as u32,
                    disabled,
                },
            );
            i = j;
        }

        if disabled_seeds > 0 {
            log::debug!(
                "Seed index: disabled {} over-represented seeds (threshold {})",
                disabled_seeds,
                abundance_thresh
            );
        }

        let lossy = infos.iter().filter(|info| !info.lossless).count();
        if lossy > 0 {
            log::warn!(
                "{} of {} reads are too short for seed length {} at error rate {}; filtration is lossy for them",
                lossy,
                reads.len(),
                q,
                params.error_rate
            );
        }

        Ok(Self {
            q,
            occurrences,
            dir,
            reads: infos,
            disabled_seeds,
        })
    }

    pub fn seed_len(&self) -> usize {
        self.q
    }

    pub fn num_reads(&self) -> usize {
        self.reads.len()
    }

    pub fn num_occurrences(&self) -> usize {
        self.occurrences.len()
    }

    pub fn disabled_seeds(&self) -> usize {
        self.disabled_seeds
    }

    pub fn read_info(&self, local_read: usize) -> &ReadFilterInfo {
        &self.reads[local_read]
    }

    pub fn read_infos(&self) -> &[ReadFilterInfo] {
        &self.reads
    }

    /// All occurrences of the seed with the given code
    #[inline]
    pub fn lookup(&self, code: u64) -> &[SeedOccurrence] {
        match self.dir.get(&code) {
            Some(e) if !e.disabled => &self.occurrences[e.start as usize..e.end as usize],
            _ => &[],
        }
    }

    /// Convenience lookup by encoded sequence
    pub fn lookup_seq(&self, seed: &[u8]) -> &[SeedOccurrence] {
        if seed.len() != self.q {
            return &[];
        }
        match qgram_code(seed) {
            Some(code) => self.lookup(code),
            None => &[],
        }
    }

    pub fn is_disabled(&self, code: u64) -> bool {
        self.dir.get(&code).map(|e| e.disabled).unwrap_or(false)
    }
}

/// Q-gram lemma threshold for one read.
///
/// An occurrence with at most `k` edits keeps at least `n + 1 - q(k+1)`
/// of the read's q-grams intact.
/// Occurrences, read ids and offsets are stored as `u32`.
fn check_index_limits(total_qgrams: usize, num_reads: usize, longest_read: usize) -> Result<()> {
    let limit = u32::MAX as usize;
    if total_qgrams > limit {
        return Err(MapError::exhausted("seed occurrences", total_qgrams));
    }
    if num_reads > limit {
        return Err(MapError::exhausted("block reads", num_reads));
    }
    if longest_read > limit {
        return Err(MapError::exhausted("read offsets", longest_read));
    }
    Ok(())
}

pub fn read_filter_info(len: usize, params: &FilterParams) -> ReadFilterInfo {
    let k = max_errors(len, params.error_rate);
    let lemma = (len + 1) as i64 - (params.seed_len * (k + 1)) as i64;
    let lossless = lemma >= params.min_threshold as i64;
    let threshold = if lossless {
        lemma as usize
    } else {
        params.min_threshold
    };
    ReadFilterInfo {
        len,
        max_errors: k,
        threshold,
        lossless,
    }
}
