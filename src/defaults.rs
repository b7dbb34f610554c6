// src/defaults.rs

// Filtration
pub const ERROR_RATE: f64 = 0.08;
pub const SEED_LENGTH: usize = 11;
pub const MIN_THRESHOLD: usize = 1;
pub const ABUNDANCE_CUT: f64 = 1.0;
pub const REPEAT_LENGTH: usize = 1000;
pub const MAX_SEED_LENGTH: usize = 32;
pub const MAX_ERROR_RATE: f64 = 0.5;

// Scheduling
pub const WINDOW_SIZE: usize = 10_000;
pub const BLOCKS_PER_CORE: f64 = 1.0;
pub const SPLIT_THRESHOLD: usize = 100;
pub const MIN_PARALLEL_READS: usize = 100;

// Abundance cut never disables a seed with fewer occurrences than this
pub const MIN_ABUNDANCE_THRESHOLD: usize = 100;

// Other
pub const VERBOSITY: i32 = 3;
