//! Dead-block approximation.
//!
//! A 2-bit counter per block slot counts how often the slot's occupant was
//! evicted without ever being re-referenced. A hit clears it. Once it
//! saturates the slot is treated as holding dead-on-arrival data: fills into
//! it insert at distant RRPV and victim selection evicts it first.
//!
//! All counters are decremented periodically so a phase change cannot leave a
//! slot pinned as dead forever.

use crate::common::{SatCounter, max_for_bits};
use crate::config::DeadBlockConfig;

/// Dead-block counters for the whole cache.
#[derive(Clone, Debug)]
pub struct DeadBlockTracker {
    counters: Vec<SatCounter>,
    ways: usize,
}

impl DeadBlockTracker {
    /// Creates all counters at zero.
    pub fn new(sets: usize, ways: usize, config: &DeadBlockConfig) -> Self {
        Self {
            counters: vec![SatCounter::new(max_for_bits(config.counter_bits)); sets * ways],
            ways,
        }
    }

    /// The block in `(set, way)` was re-referenced.
    pub fn on_hit(&mut self, set: usize, way: usize) {
        self.counters[set * self.ways + way].reset();
    }

    /// The block in `(set, way)` was evicted without reuse.
    pub fn on_unreused_eviction(&mut self, set: usize, way: usize) {
        self.counters[set * self.ways + way].increment();
    }

    /// Returns `true` when the slot's counter is saturated.
    pub fn is_dead(&self, set: usize, way: usize) -> bool {
        self.counters[set * self.ways + way].is_saturated()
    }

    /// Counter value of a slot.
    pub fn counter(&self, set: usize, way: usize) -> u16 {
        self.counters[set * self.ways + way].get()
    }

    /// Decrements every counter.
    pub fn decay(&mut self) {
        for counter in &mut self.counters {
            counter.decrement();
        }
    }

    /// Number of slots currently predicted dead.
    pub fn dead_blocks(&self) -> usize {
        self.counters.iter().filter(|c| c.is_saturated()).count()
    }
}
