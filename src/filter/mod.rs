//! Lossy q-gram filtration
//!
//! ```text
//! reads of a block ──► SeedIndex ──► ScanCursor::advance(window) ──► FilterHit batch
//!                                        ▲
//!                       contig view + excluded ranges (RepeatMasker)
//! ```

pub mod repeats;
pub mod scan_cursor;
pub mod seed_index;

pub use repeats::{HomopolymerMasker, NoRepeats, RepeatMasker, StaticRepeats};
pub use scan_cursor::{CursorState, FilterHit, ScanCursor, ScanWindow};
pub use seed_index::{SeedIndex, SeedOccurrence};
