// src/pipeline/aggregator.rs
//
// Final match store built from the per-block buffers after every block has
// finished its last pass.

use crate::error::{try_reserve, Result};
use crate::verify::Match;

/// All matches of a run, ids `0..len` in storage order
#[derive(Debug, Clone, Default)]
pub struct MatchStore {
    matches: Vec<Match>,
}

impl MatchStore {
    pub fn len(&self) -> usize {
        self.matches.len()
    }

    pub fn is_empty(&self) -> bool {
        self.matches.is_empty()
    }

    pub fn as_slice(&self) -> &[Match] {
        &self.matches
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Match> {
        self.matches.iter()
    }

    pub fn get(&self, id: usize) -> Option<&Match> {
        self.matches.get(id)
    }

    /// Matches of one read, in storage order
    pub fn for_read(&self, read_id: usize) -> impl Iterator<Item = &Match> + '_ {
        self.matches.iter().filter(move |m| m.read_id == read_id)
    }

    pub fn into_vec(self) -> Vec<Match> {
        self.matches
    }
}

impl<'a> IntoIterator for &'a MatchStore {
    type Item = &'a Match;
    type IntoIter = std::slice::Iter<'a, Match>;

    fn into_iter(self) -> Self::IntoIter {
        self.matches.iter()
    }
}

/// Concatenate block buffers in block order and number the matches.
///
/// Within-block order is kept; the store holds exactly the sum of the
/// buffer lengths.
pub fn merge(buffers: Vec<Vec<Match>>) -> Result<MatchStore> {
    let total: usize = buffers.iter().map(Vec::len).sum();
    let mut matches = Vec::new();
    try_reserve(&mut matches, total, "match store")?;

    for buffer in buffers {
        matches.extend(buffer);
    }
    for (id, m) in matches.iter_mut().enumerate() {
        m.id = id;
    }

    debug_assert_eq!(matches.len(), total);
    Ok(MatchStore { matches })
}
