//! Least Recently Used (LRU) Replacement Policy.
//!
//! This policy evicts the line that has not been accessed for the longest time.
//! It maintains a usage stack for each set. When a line is accessed, it is moved
//! to the top (Most Recently Used position). The bottom of the stack represents
//! the Least Recently Used line. Invalid ways are always filled first.
//!
//! # Performance
//!
//! - **Time Complexity:**
//!   - `update()`: O(W) where W is the number of ways (associativity)
//!   - `find_victim()`: O(W) for the invalid-way scan, O(1) otherwise
//! - **Space Complexity:** O(S × W) where S is the number of sets
//! - **Hardware Cost:** High - requires priority encoding and shifting
//! - **Worst Case:** Scanning patterns larger than cache capacity (thrashing)

use super::{ReplacementPolicy, Victim};
use crate::common::{Access, BlockView};
use crate::stats::{Heartbeat, InsertionReason, PolicyReport, PolicyStats};

/// LRU Policy state.
#[derive(Clone, Debug)]
pub struct LruPolicy {
    /// A vector of usage stacks (one per set).
    /// Index 0 is MRU, last index is LRU.
    usage: Vec<Vec<usize>>,
    ways: usize,
    stats: PolicyStats,
}

impl LruPolicy {
    /// Creates a new LRU policy instance.
    ///
    /// # Arguments
    ///
    /// * `sets` - The number of sets in the cache (at least 1 is used).
    /// * `ways` - The associativity of the cache (at least 1 is used).
    pub fn new(sets: usize, ways: usize) -> Self {
        let sets = sets.max(1);
        let ways = ways.max(1);
        tracing::info!(sets, ways, "LRU policy initialized");
        Self {
            usage: (0..sets).map(|_| (0..ways).collect()).collect(),
            ways,
            stats: PolicyStats::default(),
        }
    }

    /// Position of `way` in the usage stack of `set`: 0 is MRU, `ways - 1` is LRU.
    pub fn stack_position(&self, set: usize, way: usize) -> usize {
        let stack = &self.usage[set % self.usage.len()];
        stack
            .iter()
            .position(|&w| w == way % self.ways)
            .unwrap_or(self.ways - 1)
    }

    /// Statistics gathered so far.
    pub const fn stats(&self) -> &PolicyStats {
        &self.stats
    }

    fn touch(&mut self, set: usize, way: usize) {
        let stack = &mut self.usage[set];
        if let Some(pos) = stack.iter().position(|&x| x == way) {
            let _ = stack.remove(pos);
        }
        stack.insert(0, way);
    }
}

impl ReplacementPolicy for LruPolicy {
    fn name(&self) -> &'static str {
        "lru"
    }

    /// Returns the first invalid way, or the way at the bottom of the usage
    /// stack (LRU position). LRU never bypasses.
    fn find_victim(&mut self, access: &Access, blocks: &[BlockView]) -> Victim {
        if let Some(way) = blocks.iter().take(self.ways).position(|b| !b.valid) {
            self.stats.invalid_victims += 1;
            return Victim::Way(way);
        }
        self.stats.scan_victims += 1;
        let set = access.set % self.usage.len();
        Victim::Way(self.usage[set].last().copied().unwrap_or(0))
    }

    /// Moves the accessed or filled `way` to the MRU position.
    fn update(&mut self, access: &Access, way: Option<usize>, _victim_addr: u64, hit: bool) {
        self.stats.accesses += 1;
        if hit {
            self.stats.hits += 1;
        } else {
            self.stats.misses += 1;
        }

        let Some(way) = way else {
            self.stats.bypasses += 1;
            return;
        };
        if !hit {
            self.stats.fills.record(InsertionReason::Mru);
        }
        let set = access.set % self.usage.len();
        self.touch(set, way % self.ways);
    }

    fn report(&self) -> PolicyReport {
        PolicyReport {
            policy: self.name(),
            sets: self.usage.len(),
            ways: self.ways,
            stats: self.stats,
            dueling: None,
            streaming_sets: None,
            signature_histogram: None,
            dead_blocks: None,
        }
    }

    fn heartbeat(&self) -> Heartbeat {
        Heartbeat {
            accesses: self.stats.accesses,
            hits: self.stats.hits,
            misses: self.stats.misses,
            psel: None,
            streaming_sets: None,
        }
    }
}

