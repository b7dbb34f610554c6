// src/map_opt.rs
//
// Mapping options: filtration, verification and scheduling parameters.

use crate::defaults;
use crate::sequence::Orientation;

/// Which orientations of each contig are scanned
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strands {
    Forward,
    Reverse,
    Both,
}

impl Strands {
    /// Orientations in scan order (forward pass first)
    pub fn orientations(self) -> &'static [Orientation] {
        match self {
            Strands::Forward => &[Orientation::Forward],
            Strands::Reverse => &[Orientation::ReverseComplement],
            Strands::Both => &[Orientation::Forward, Orientation::ReverseComplement],
        }
    }
}

/// Mapping options
#[derive(Debug, Clone)]
pub struct MapOpt {
    // Filtration parameters
    pub error_rate: f64,     // Fraction of read length allowed as edit errors
    pub seed_len: usize,     // q-gram length of the seed filter
    pub min_threshold: usize, // Minimum number of matching q-grams per hit
    pub abundance_cut: f64,  // Disable seeds above this fraction of all q-grams (1.0 = off)
    pub repeat_length: usize, // Skip single-symbol runs at least this long (0 = off)
    pub strands: Strands,

    // Scheduling parameters
    pub window_size: usize,     // Contig positions scanned per cursor call
    pub n_threads: usize,       // Worker pool size
    pub blocks_per_core: f64,   // Read blocks per worker thread
    pub split_threshold: usize, // Minimum hits in a window before verification is split
    pub max_borrowed_workers: usize, // Cap on capacity one block may borrow (0 = pool size - 1)

    pub verbosity: i32,
}

/// Parameters consumed by the seed index and scan cursor
#[derive(Debug, Clone, Copy)]
pub struct FilterParams {
    pub error_rate: f64,
    pub seed_len: usize,
    pub min_threshold: usize,
    pub abundance_cut: f64,
}

/// Parameters consumed by block workers and the load balancer
#[derive(Debug, Clone, Copy)]
pub struct ScheduleParams {
    pub window_size: usize,
    pub split_threshold: usize,
    pub pool_size: usize,
    pub max_borrowed_workers: usize,
}

impl Default for MapOpt {
    fn default() -> Self {
        MapOpt {
            error_rate: defaults::ERROR_RATE,
            seed_len: defaults::SEED_LENGTH,
            min_threshold: defaults::MIN_THRESHOLD,
            abundance_cut: defaults::ABUNDANCE_CUT,
            repeat_length: defaults::REPEAT_LENGTH,
            strands: Strands::Both,

            window_size: defaults::WINDOW_SIZE,
            n_threads: num_cpus::get().max(1),
            blocks_per_core: defaults::BLOCKS_PER_CORE,
            split_threshold: defaults::SPLIT_THRESHOLD,
            max_borrowed_workers: 0,

            verbosity: defaults::VERBOSITY,
        }
    }
}

impl MapOpt {
    pub fn filter_params(&self) -> FilterParams {
        FilterParams {
            error_rate: self.error_rate,
            seed_len: self.seed_len,
            min_threshold: self.min_threshold,
            abundance_cut: self.abundance_cut,
        }
    }

    pub fn schedule_params(&self) -> ScheduleParams {
        let pool_size = self.n_threads.max(1);
        let borrow_cap = pool_size.saturating_sub(1);
        let max_borrowed_workers = if self.max_borrowed_workers == 0 {
            borrow_cap
        } else {
            self.max_borrowed_workers.min(borrow_cap)
        };
        ScheduleParams {
            window_size: self.window_size,
            split_threshold: self.split_threshold,
            pool_size,
            max_borrowed_workers,
        }
    }

    /// Requested number of read blocks before clamping to the read count
    pub fn requested_blocks(&self) -> usize {
        let blocks = (self.n_threads as f64 * self.blocks_per_core).round();
        if blocks < 1.0 {
            1
        } else {
            blocks as usize
        }
    }

    /// Clamp out-of-range values in place.
    ///
    /// Configuration problems never abort a run: each offending value is
    /// corrected and a description of the correction is returned (and logged
    /// as a warning).
    pub fn validate(&mut self) -> Vec<String> {
        let mut fixes = Vec::new();

        if !self.error_rate.is_finite() || self.error_rate < 0.0 {
            fixes.push(format!("error rate {} is invalid, using 0", self.error_rate));
            self.error_rate = 0.0;
        } else if self.error_rate > defaults::MAX_ERROR_RATE {
            fixes.push(format!(
                "error rate {} exceeds {}, clamping",
                self.error_rate,
                defaults::MAX_ERROR_RATE
            ));
            self.error_rate = defaults::MAX_ERROR_RATE;
        }

        if self.seed_len == 0 {
            fixes.push("seed length must be >= 1, using 1".to_string());
            self.seed_len = 1;
        } else if self.seed_len > defaults::MAX_SEED_LENGTH {
            fixes.push(format!(
                "seed length {} exceeds {}, clamping",
                self.seed_len,
                defaults::MAX_SEED_LENGTH
            ));
            self.seed_len = defaults::MAX_SEED_LENGTH;
        }

        if self.min_threshold == 0 {
            fixes.push("threshold must be >= 1, using 1".to_string());
            self.min_threshold = 1;
        }

        if !self.abundance_cut.is_finite() || self.abundance_cut <= 0.0 {
            fixes.push(format!(
                "abundance cut {} is invalid, disabling it",
                self.abundance_cut
            ));
            self.abundance_cut = 1.0;
        }

        if self.window_size == 0 {
            fixes.push(format!(
                "window size must be >= 1, using {}",
                defaults::WINDOW_SIZE
            ));
            self.window_size = defaults::WINDOW_SIZE;
        }

        if self.n_threads == 0 {
            fixes.push("thread count must be >= 1, using 1".to_string());
            self.n_threads = 1;
        }

        if !self.blocks_per_core.is_finite() || self.blocks_per_core <= 0.0 {
            fixes.push(format!(
                "blocks per core {} is invalid, using {}",
                self.blocks_per_core,
                defaults::BLOCKS_PER_CORE
            ));
            self.blocks_per_core = defaults::BLOCKS_PER_CORE;
        }

        for fix in &fixes {
            log::warn!("{}", fix);
        }
        fixes
    }
}
