//! Per-set streaming (constant-stride) detector.
//!
//! A set that keeps seeing the same nonzero address delta is being walked by
//! a stream: the lines it brings in are unlikely to be touched again before
//! they are evicted. Each set tracks the last address, the last delta and a
//! saturating confidence counter; a repeated nonzero delta raises confidence,
//! anything else lowers it.
//!
//! The first access to a set only records its address. The state uses
//! `Option` rather than a zero sentinel, so address 0 is an ordinary first
//! address and can never be mistaken for a stride.

use crate::common::{SatCounter, max_for_bits};
use crate::config::StreamConfig;

/// Streaming state of one set.
#[derive(Clone, Copy, Debug)]
struct StreamState {
    last_addr: Option<u64>,
    last_delta: i64,
    confidence: SatCounter,
}

/// Streaming detector covering every set of the cache.
#[derive(Clone, Debug)]
pub struct StreamDetector {
    sets: Vec<StreamState>,
    threshold: u16,
    addr_shift: u8,
}

impl StreamDetector {
    /// Creates a detector for `sets` sets.
    pub fn new(sets: usize, config: &StreamConfig) -> Self {
        let state = StreamState {
            last_addr: None,
            last_delta: 0,
            confidence: SatCounter::new(max_for_bits(config.confidence_bits)),
        };
        Self {
            sets: vec![state; sets],
            threshold: config.threshold,
            addr_shift: config.addr_shift,
        }
    }

    /// Feeds one access to `set` and returns the updated streaming verdict.
    pub fn observe(&mut self, set: usize, addr: u64) -> bool {
        let addr = addr.checked_shr(u32::from(self.addr_shift)).unwrap_or(0);
        let state = &mut self.sets[set];

        match state.last_addr {
            Some(last) => {
                let delta = addr.wrapping_sub(last) as i64;
                if delta != 0 && delta == state.last_delta {
                    state.confidence.increment();
                } else {
                    state.confidence.decrement();
                }
                state.last_delta = delta;
            }
            None => state.last_delta = 0,
        }
        state.last_addr = Some(addr);

        state.confidence.get() >= self.threshold
    }

    /// Current verdict for `set` without observing anything.
    pub fn is_streaming(&self, set: usize) -> bool {
        self.sets[set].confidence.get() >= self.threshold
    }

    /// Current confidence of `set`.
    pub fn confidence(&self, set: usize) -> u16 {
        self.sets[set].confidence.get()
    }

    /// Largest confidence value.
    pub fn confidence_max(&self) -> u16 {
        self.sets.first().map_or(0, |s| s.confidence.max())
    }

    /// Number of sets currently classified as streaming.
    pub fn streaming_sets(&self) -> usize {
        self.sets
            .iter()
            .filter(|s| s.confidence.get() >= self.threshold)
            .count()
    }
}
