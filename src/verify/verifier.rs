// src/verify/verifier.rs
//
// Turns a filter hit into at most one match: forward Myers pass for the best
// end position, backward pass on reversed sequences for the begin position.

use super::myers::{best_end, longest_anchored_prefix, MyersPattern};
use crate::filter::FilterHit;
use crate::sequence::{max_errors, ContigView, Orientation, Read};

/// Verified approximate occurrence of a read, forward-strand coordinates
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Match {
    /// Position in the final match store; 0 until aggregation
    pub id: usize,
    pub read_id: usize,
    pub contig_id: usize,
    pub begin: usize,
    pub end: usize,
    pub edit_distance: usize,
    pub orientation: Orientation,
}

impl Match {
    /// Percent identity over the read length
    pub fn percent_identity(&self, read_len: usize) -> f64 {
        if read_len == 0 {
            return 100.0;
        }
        let matching = read_len.saturating_sub(self.edit_distance);
        100.0 * matching as f64 / read_len as f64
    }
}

/// Result of verifying one candidate window
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verification {
    /// `[begin, end)` in the coordinates of the verified text
    Found {
        begin: usize,
        end: usize,
        edit_distance: usize,
    },
    /// No alignment within the error budget
    Rejected,
    /// The backward pass could not reproduce the forward score
    Inconsistent,
}

/// Align `read` (codes) inside `text[window]` with at most `k` edits.
///
/// Pure function of its inputs; calling it twice yields the same result.
pub fn verify_window(read: &[u8], text: &[u8], window_begin: usize, window_end: usize, k: usize) -> Verification {
    let window_end = window_end.min(text.len());
    if window_begin >= window_end {
        return Verification::Rejected;
    }
    let infix = &text[window_begin..window_end];

    let pattern = MyersPattern::new(read);
    let (end, distance) = match best_end(&pattern, infix, k) {
        Some(found) => found,
        None => return Verification::Rejected,
    };

    let n = read.len();
    if distance == 0 && end >= n {
        return Verification::Found {
            begin: window_begin + end - n,
            end: window_begin + end,
            edit_distance: 0,
        };
    }

    // Reversed read against the reversed prefix ending at `end`
    let span = (n + k).min(end);
    let rev_read: Vec<u8> = read.iter().rev().copied().collect();
    let rev_text: Vec<u8> = infix[end - span..end].iter().rev().copied().collect();
    let rev_pattern = MyersPattern::new(&rev_read);

    match longest_anchored_prefix(&rev_pattern, &rev_text, distance) {
        Some(len) => Verification::Found {
            begin: window_begin + end - len,
            end: window_begin + end,
            edit_distance: distance,
        },
        None => Verification::Inconsistent,
    }
}

/// Per-verifier counters, summed per block after a run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct VerifyCounters {
    pub verifications: u64,
    pub successes: u64,
    pub inconsistent: u64,
}

impl VerifyCounters {
    pub fn add(&mut self, other: &VerifyCounters) {
        self.verifications += other.verifications;
        self.successes += other.successes;
        self.inconsistent += other.inconsistent;
    }
}

/// Verification context for one contig view.
///
/// A block owns one; helper tasks spawned while a window is split build
/// their own and their counters are merged back afterwards.
pub struct Verifier<'a> {
    view: &'a ContigView<'a>,
    error_rate: f64,
    counters: VerifyCounters,
}

impl<'a> Verifier<'a> {
    pub fn new(view: &'a ContigView<'a>, error_rate: f64) -> Self {
        Self {
            view,
            error_rate,
            counters: VerifyCounters::default(),
        }
    }

    pub fn counters(&self) -> &VerifyCounters {
        &self.counters
    }

    pub fn into_counters(self) -> VerifyCounters {
        self.counters
    }

    /// Verify one hit of `read`, returning the match in forward-strand
    /// coordinates.
    pub fn verify(&mut self, read: &Read, hit: &FilterHit) -> Option<Match> {
        self.counters.verifications += 1;
        let k = max_errors(read.len(), self.error_rate);

        match verify_window(&read.seq, self.view.seq(), hit.window_begin, hit.window_end, k) {
            Verification::Found {
                begin,
                end,
                edit_distance,
            } => {
                self.counters.successes += 1;
                let (begin, end) = self.view.to_forward(begin, end);
                Some(Match {
                    id: 0,
                    read_id: read.id,
                    contig_id: self.view.contig_id,
                    begin,
                    end,
                    edit_distance,
                    orientation: self.view.orientation,
                })
            }
            Verification::Rejected => None,
            Verification::Inconsistent => {
                self.counters.inconsistent += 1;
                log::debug!(
                    "Read {} on contig {} ({}): backward pass disagrees in [{}, {}), dropping hit",
                    read.name,
                    self.view.contig_id,
                    self.view.orientation,
                    hit.window_begin,
                    hit.window_end
                );
                None
            }
        }
    }
}
