//! SHiP-lite signature-based reuse predictor.
//!
//! Each fill is tagged with a short signature hashed from the instruction
//! pointer that caused it. A table of saturating counters, indexed by
//! signature, learns whether blocks brought in under that signature tend to be
//! re-referenced: hits raise the counter, evictions of never-reused blocks
//! lower it. The insertion logic reads the counter to decide how long a new
//! block should be protected.
//!
//! Many instruction pointers alias onto the same counter. That is accepted:
//! the table is an approximation, not a map.
//!
//! # Performance
//!
//! - **Time Complexity:** O(1) for every operation except `decay()` and
//!   `histogram()`, which are O(T) in the table size
//! - **Space Complexity:** O(2^B) counters for B signature bits
//! - **Hardware Cost:** Low - one small table and a few XORs

use serde::Serialize;

use crate::common::{SatCounter, max_for_bits};
use crate::config::{ShipConfig, SignatureHash, SignatureSource};

/// Hashed instruction-pointer tag stored with each block.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize)]
pub struct Signature(pub u16);

/// What the outcome counter says about a signature.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ReusePrediction {
    /// Counter at or above the reuse threshold: insert near MRU.
    Reused,
    /// Counter between zero and the threshold: no opinion.
    Neutral,
    /// Counter at zero: blocks under this signature die unused.
    Dead,
}

/// Signature outcome table.
#[derive(Clone, Debug)]
pub struct ShipPredictor {
    table: Vec<SatCounter>,
    mask: u64,
    threshold: u16,
    hash: SignatureHash,
    source: SignatureSource,
    region_shift: u8,
}

impl ShipPredictor {
    /// Creates a predictor from its configuration section.
    ///
    /// The configuration must already be validated (signature width in
    /// `1..=16`, counter width in `1..=8`).
    pub fn new(config: &ShipConfig) -> Self {
        let entries = 1usize << config.signature_bits;
        let max = max_for_bits(config.counter_bits);
        Self {
            table: vec![SatCounter::with_value(config.initial_value, max); entries],
            mask: (entries as u64) - 1,
            threshold: config.reuse_threshold,
            hash: config.hash,
            source: config.source,
            region_shift: config.region_shift,
        }
    }

    /// Computes the signature of an access.
    ///
    /// Any 64-bit input is reduced into the table range by masking, so every
    /// signature is a valid index.
    pub fn signature(&self, pc: u64, paddr: u64) -> Signature {
        let key = match self.source {
            SignatureSource::Pc => pc,
            SignatureSource::PcAndRegion => {
                pc ^ paddr.checked_shr(u32::from(self.region_shift)).unwrap_or(0)
            }
        };
        Signature((hash_pc(self.hash, key) & self.mask) as u16)
    }

    /// Current outcome counter of a signature.
    pub fn outcome(&self, sig: Signature) -> u16 {
        self.table[self.index(sig)].get()
    }

    /// Classifies a signature against the reuse threshold.
    pub fn predict(&self, sig: Signature) -> ReusePrediction {
        let counter = self.table[self.index(sig)];
        if counter.get() >= self.threshold {
            ReusePrediction::Reused
        } else if counter.is_zero() {
            ReusePrediction::Dead
        } else {
            ReusePrediction::Neutral
        }
    }

    /// A block filled under `sig` was re-referenced.
    pub fn on_hit(&mut self, sig: Signature) {
        let idx = self.index(sig);
        self.table[idx].increment();
    }

    /// A block filled under `sig` was evicted without ever being re-referenced.
    pub fn on_evict(&mut self, sig: Signature) {
        let idx = self.index(sig);
        self.table[idx].decrement();
    }

    /// Weakens every counter by one so stale training fades.
    pub fn decay(&mut self) {
        for counter in &mut self.table {
            counter.decrement();
        }
    }

    /// Number of table entries at each counter value, index = value.
    pub fn histogram(&self) -> Vec<u64> {
        let max = self.table.first().map_or(0, SatCounter::max);
        let mut bins = vec![0u64; usize::from(max) + 1];
        for counter in &self.table {
            bins[usize::from(counter.get())] += 1;
        }
        bins
    }

    /// Largest outcome counter value.
    pub fn counter_max(&self) -> u16 {
        self.table.first().map_or(0, SatCounter::max)
    }

    fn index(&self, sig: Signature) -> usize {
        (u64::from(sig.0) & self.mask) as usize
    }
}

/// Folds a 64-bit instruction pointer with the configured hash. The result is
/// masked by the caller.
pub fn hash_pc(hash: SignatureHash, pc: u64) -> u64 {
    match hash {
        SignatureHash::XorFold => pc ^ (pc >> 6) ^ (pc >> 12),
        SignatureHash::ShiftXor => (pc >> 2) ^ (pc >> 7),
        SignatureHash::Mix64 => {
            let mut x = pc;
            x ^= x >> 33;
            x = x.wrapping_mul(0xff51_afd7_ed55_8ccd);
            x ^= x >> 33;
            x = x.wrapping_mul(0xc4ce_b9fe_1a85_ec53);
            x ^ (x >> 33)
        }
    }
}
