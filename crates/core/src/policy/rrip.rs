//! RRIP age array and victim selection.
//!
//! Every block carries a re-reference prediction value (RRPV). Zero means
//! "re-referenced soon"; `RRPV_MAX` means "re-referenced in the distant
//! future" and marks the block as an eviction candidate.
//!
//! To find a victim the set is scanned for a block at `RRPV_MAX`. If none
//! exists every block in the set is aged by one and the scan repeats. Aging
//! only moves counters toward the maximum, so after at most `RRPV_MAX` rounds
//! every block is a candidate and the scan succeeds.
//!
//! # Performance
//!
//! - **Time Complexity:**
//!   - `find_victim()`: O(W × R) where R ≤ `RRPV_MAX + 1` aging rounds
//!   - `promote()` / `insert()`: O(1)
//! - **Space Complexity:** O(S × W) counters
//! - **Hardware Cost:** Low - 2 bits per block and a priority encoder

use crate::common::SatCounter;

/// Outcome of an RRIP victim search.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RripVictim {
    /// Selected way.
    pub way: usize,
    /// Aging passes performed before a candidate appeared.
    pub rounds: u32,
}

/// Per-block RRPV storage for the whole cache.
#[derive(Clone, Debug)]
pub struct RripArray {
    rrpv: Vec<SatCounter>,
    ways: usize,
    max: u16,
}

impl RripArray {
    /// Creates the array with every block at `RRPV_MAX`, so cold sets fill
    /// way 0 first.
    ///
    /// # Arguments
    ///
    /// * `sets` - The number of sets in the cache.
    /// * `ways` - The associativity of the cache.
    /// * `max` - `RRPV_MAX`.
    pub fn new(sets: usize, ways: usize, max: u16) -> Self {
        Self {
            rrpv: vec![SatCounter::with_value(max, max); sets * ways],
            ways,
            max,
        }
    }

    /// `RRPV_MAX`.
    pub const fn max(&self) -> u16 {
        self.max
    }

    /// Current RRPV of a block.
    pub fn get(&self, set: usize, way: usize) -> u16 {
        self.rrpv[set * self.ways + way].get()
    }

    /// Marks a block as re-referenced (RRPV 0).
    pub fn promote(&mut self, set: usize, way: usize) {
        self.rrpv[set * self.ways + way].reset();
    }

    /// Stores the insertion RRPV of a newly filled block, clamped to `RRPV_MAX`.
    pub fn insert(&mut self, set: usize, way: usize, rrpv: u16) {
        self.rrpv[set * self.ways + way].set(rrpv);
    }

    /// Finds the first block of `set` at `RRPV_MAX`, aging the set until one exists.
    ///
    /// The scan is bounded: values only move toward the maximum, so the loop
    /// runs at most `RRPV_MAX + 1` times.
    pub fn find_victim(&mut self, set: usize) -> RripVictim {
        let mut rounds = 0;
        for _ in 0..=self.max {
            if let Some(way) = self.first_distant(set) {
                return RripVictim { way, rounds };
            }
            self.age(set);
            rounds += 1;
        }
        // Unreachable: after RRPV_MAX agings every block is at RRPV_MAX.
        RripVictim { way: 0, rounds }
    }

    /// Returns the first way of `set` whose RRPV equals `RRPV_MAX`.
    pub fn first_distant(&self, set: usize) -> Option<usize> {
        self.row(set).iter().position(SatCounter::is_saturated)
    }

    /// Increments every RRPV in the set, saturating at `RRPV_MAX`.
    fn age(&mut self, set: usize) {
        let base = set * self.ways;
        for counter in &mut self.rrpv[base..base + self.ways] {
            counter.increment();
        }
    }

    fn row(&self, set: usize) -> &[SatCounter] {
        let base = set * self.ways;
        &self.rrpv[base..base + self.ways]
    }
}
