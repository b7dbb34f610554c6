//! Myers' bit-vector edit distance, multi-word
//!
//! The pattern is split into 64-row blocks. Each text column updates every
//! block with the classic `pv`/`mv` step; the horizontal delta leaving the
//! top row of one block is carried into the next, so patterns of any length
//! are handled. Only the delta at the pattern's last row is accumulated into
//! the running distance.
//!
//! Two boundary conditions are supported:
//! - [`TextStart::Free`]: the alignment may start anywhere in the text
//!   (semi-global, used to find the best end position),
//! - [`TextStart::Anchored`]: the alignment must start at text position 0
//!   (used on reversed sequences to recover the begin position).

use crate::sequence::ALPHABET_SIZE;

const WORD: usize = 64;
const HIGH_BIT: u64 = 1 << 63;

/// How the first text column is constrained
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextStart {
    Free,
    Anchored,
}

/// Preprocessed pattern: one match mask per symbol and 64-row block
#[derive(Debug, Clone)]
pub struct MyersPattern {
    len: usize,
    blocks: usize,
    peq: Vec<u64>,
    last_mask: u64,
}

impl MyersPattern {
    /// `pattern` holds codes `0..ALPHABET_SIZE`. Code 4 (N) matches nothing.
    pub fn new(pattern: &[u8]) -> Self {
        let len = pattern.len();
        let blocks = len.div_ceil(WORD).max(1);
        let mut peq = vec![0u64; ALPHABET_SIZE * blocks];
        for (i, &sym) in pattern.iter().enumerate() {
            if (sym as usize) < ALPHABET_SIZE - 1 {
                peq[sym as usize * blocks + i / WORD] |= 1u64 << (i % WORD);
            }
        }
        let last_mask = if len == 0 {
            0
        } else {
            1u64 << ((len - 1) % WORD)
        };
        Self {
            len,
            blocks,
            peq,
            last_mask,
        }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    #[inline(always)]
    fn eq(&self, sym: u8, block: usize) -> u64 {
        let sym = (sym as usize).min(ALPHABET_SIZE - 1);
        self.peq[sym * self.blocks + block]
    }
}

/// One column step for one block.
///
/// `hin` is the horizontal delta entering the block's top row (-1, 0, +1);
/// returns the delta leaving the row selected by `out_mask`.
#[inline(always)]
fn advance_block(pv: &mut u64, mv: &mut u64, eq: u64, hin: i32, out_mask: u64) -> i32 {
    let p = *pv;
    let m = *mv;
    let xv = eq | m;
    let eq = eq | (hin < 0) as u64;
    let xh = ((eq & p).wrapping_add(p) ^ p) | eq;
    let mut ph = m | !(xh | p);
    let mut mh = p & xh;

    let hout = if ph & out_mask != 0 {
        1
    } else if mh & out_mask != 0 {
        -1
    } else {
        0
    };

    ph <<= 1;
    mh <<= 1;
    if hin < 0 {
        mh |= 1;
    } else if hin > 0 {
        ph |= 1;
    }

    *pv = mh | !(xv | ph);
    *mv = ph & xv;
    hout
}

/// Run the DP over `text`, calling `on_column(j, distance)` after each text
/// symbol `j` with the edit distance of the whole pattern ending at `j + 1`.
///
/// Stops early when `on_column` returns `false`.
pub fn scan_columns<F>(pattern: &MyersPattern, text: &[u8], start: TextStart, mut on_column: F)
where
    F: FnMut(usize, usize) -> bool,
{
    if pattern.is_empty() {
        for j in 0..text.len() {
            let d = match start {
                TextStart::Free => 0,
                TextStart::Anchored => j + 1,
            };
            if !on_column(j, d) {
                return;
            }
        }
        return;
    }

    let blocks = pattern.blocks;
    let mut pv = vec![u64::MAX; blocks];
    let mut mv = vec![0u64; blocks];
    let mut distance = pattern.len as i64;
    let top_hin = match start {
        TextStart::Free => 0,
        TextStart::Anchored => 1,
    };

    for (j, &sym) in text.iter().enumerate() {
        let mut carry = top_hin;
        for b in 0..blocks {
            let out_mask = if b + 1 == blocks {
                pattern.last_mask
            } else {
                HIGH_BIT
            };
            carry = advance_block(&mut pv[b], &mut mv[b], pattern.eq(sym, b), carry, out_mask);
        }
        distance += carry as i64;
        debug_assert!(distance >= 0);
        if !on_column(j, distance as usize) {
            return;
        }
    }
}

/// Best end position of a semi-global alignment with at most `max_distance`
/// edits.
///
/// Returns `(end, distance)` with `end` exclusive. Among equally good ends
/// the rightmost one is kept.
pub fn best_end(pattern: &MyersPattern, text: &[u8], max_distance: usize) -> Option<(usize, usize)> {
    let mut best: Option<(usize, usize)> = None;
    scan_columns(pattern, text, TextStart::Free, |j, d| {
        if d <= max_distance && best.map_or(true, |(_, bd)| d <= bd) {
            best = Some((j + 1, d));
        }
        true
    });
    best
}

/// Longest text prefix that the whole pattern aligns to with exactly
/// `distance` edits, when the alignment must start at text position 0.
///
/// Used with reversed read and reversed contig to find the leftmost begin
/// position reproducing a forward score. Returns the prefix length, `None`
/// when no prefix reaches `distance` (or better).
pub fn longest_anchored_prefix(pattern: &MyersPattern, text: &[u8], distance: usize) -> Option<usize> {
    let mut found = None;
    let mut better = false;
    scan_columns(pattern, text, TextStart::Anchored, |j, d| {
        if d < distance {
            better = true;
        }
        if d <= distance {
            found = Some(j + 1);
        }
        true
    });
    if better {
        // The forward pass already found the optimum at this end position;
        // anything below it means the two passes disagree.
        return None;
    }
    found
}
