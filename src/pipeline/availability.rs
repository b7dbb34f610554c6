//! Availability vector: idle verification capacity per block
//!
//! Every worker thread of the pool is owned by some block while that block
//! still has contig left to scan. When a block finishes its pass, its thread
//! (plus whatever capacity sat unused in its slot) is handed to the next
//! block that is still active. A block with a large hit batch can then
//! borrow units from its own slot and verify the batch on that many extra
//! tasks.
//!
//! All slots are atomics. Capacity is tracked twice: per slot and as one
//! `lent` total. Additions reserve on `lent` before touching a slot and
//! removals take from a slot before giving back to `lent`, so at every
//! instant
//!
//! ```text
//! sum(slots) <= lent <= capacity
//! ```
//!
//! and no slot ever underflows. Capacity that cannot be placed (budget used
//! up, per-block cap reached, no active block left) is dropped, which only
//! reduces parallelism.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

#[derive(Debug)]
pub struct AvailabilityVector {
    slots: Vec<AtomicUsize>,
    active: Vec<AtomicBool>,
    lent: AtomicUsize,
    capacity: usize,
    max_per_block: usize,
}

impl AvailabilityVector {
    /// `capacity` is the pool size; a slot never holds more than
    /// `max_per_block` units.
    ///
    /// Threads not owned by any block (`capacity > blocks`) are spread over
    /// the slots round-robin.
    pub fn new(blocks: usize, capacity: usize, max_per_block: usize) -> Self {
        let av = Self {
            slots: (0..blocks).map(|_| AtomicUsize::new(0)).collect(),
            active: (0..blocks).map(|_| AtomicBool::new(true)).collect(),
            lent: AtomicUsize::new(0),
            capacity,
            max_per_block,
        };
        if blocks > 0 {
            for i in 0..capacity.saturating_sub(blocks) {
                av.add(i % blocks, 1);
            }
        }
        av
    }

    pub fn num_blocks(&self) -> usize {
        self.slots.len()
    }

    /// Idle units currently attributed to `block`
    pub fn available(&self, block: usize) -> usize {
        self.slots[block].load(Ordering::Acquire)
    }

    /// Units sitting in slots, as accounted by the budget
    pub fn lent(&self) -> usize {
        self.lent.load(Ordering::Acquire)
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn is_active(&self, block: usize) -> bool {
        self.active[block].load(Ordering::Acquire)
    }

    /// Sum of all slots. Only a snapshot while other threads are running.
    pub fn total_available(&self) -> usize {
        self.slots.iter().map(|s| s.load(Ordering::Acquire)).sum()
    }

    /// Put up to `n` units into `block`'s slot; returns how many were placed.
    pub fn add(&self, block: usize, n: usize) -> usize {
        if n == 0 {
            return 0;
        }

        // Reserve on the budget first
        let reserved = match self
            .lent
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |lent| {
                let room = self.capacity.saturating_sub(lent);
                if room == 0 {
                    None
                } else {
                    Some(lent + n.min(room))
                }
            }) {
            Ok(prev) => n.min(self.capacity.saturating_sub(prev)),
            Err(_) => return 0,
        };

        let max = self.max_per_block;
        let placed = match self.slots[block].fetch_update(Ordering::AcqRel, Ordering::Acquire, |s| {
            if s >= max {
                None
            } else {
                Some(s + reserved.min(max - s))
            }
        }) {
            Ok(prev) => reserved.min(max - prev),
            Err(_) => 0,
        };

        let unplaced = reserved - placed;
        if unplaced > 0 {
            self.lent.fetch_sub(unplaced, Ordering::AcqRel);
        }
        placed
    }

    /// Take up to `want` units from `block`'s slot; returns how many were
    /// taken (possibly 0).
    pub fn borrow(&self, block: usize, want: usize) -> usize {
        if want == 0 {
            return 0;
        }
        let taken = match self.slots[block].fetch_update(Ordering::AcqRel, Ordering::Acquire, |s| {
            if s == 0 {
                None
            } else {
                Some(s - s.min(want))
            }
        }) {
            Ok(prev) => prev.min(want),
            Err(_) => 0,
        };
        if taken > 0 {
            self.lent.fetch_sub(taken, Ordering::AcqRel);
        }
        taken
    }

    /// Return units taken with [`borrow`](Self::borrow)
    pub fn give_back(&self, block: usize, n: usize) {
        let placed = self.add(block, n);
        if placed < n {
            log::trace!("Block {}: {} borrowed unit(s) dropped on return", block, n - placed);
        }
    }

    /// Mark `block` finished and move its thread plus its idle units to the
    /// nearest following active block (wrapping).
    ///
    /// Returns the receiving block, `None` when every other block is already
    /// finished or `block` was released before.
    pub fn release(&self, block: usize) -> Option<usize> {
        if !self.active[block].swap(false, Ordering::AcqRel) {
            return None;
        }

        let idle = self.slots[block].swap(0, Ordering::AcqRel);
        if idle > 0 {
            self.lent.fetch_sub(idle, Ordering::AcqRel);
        }

        let blocks = self.slots.len();
        let target = (1..blocks)
            .map(|step| (block + step) % blocks)
            .find(|&b| self.active[b].load(Ordering::Acquire))?;

        let placed = self.add(target, 1 + idle);
        log::trace!(
            "Block {} finished: {} of {} unit(s) handed to block {}",
            block,
            placed,
            1 + idle,
            target
        );
        Some(target)
    }
}
