//! Policy-owned pseudo-random number generator.
//!
//! A xorshift64 generator: cheap, deterministic for a given seed, and owned by
//! the policy state so runs are reproducible.

/// Seed substituted for zero, which is a fixed point of xorshift.
const ZERO_SEED_REPLACEMENT: u64 = 123456789;

/// Xorshift64 generator state.
#[derive(Clone, Debug)]
pub struct XorShift64 {
    state: u64,
}

impl XorShift64 {
    /// Creates a generator from `seed`.
    pub const fn new(seed: u64) -> Self {
        Self {
            state: if seed == 0 { ZERO_SEED_REPLACEMENT } else { seed },
        }
    }

    /// Advances the generator and returns the next value.
    pub fn next_u64(&mut self) -> u64 {
        let mut x = self.state;
        x ^= x << 13;
        x ^= x >> 7;
        x ^= x << 17;
        self.state = x;
        x
    }

    /// Returns `true` with probability `1 / n`. `n == 0` never fires.
    pub fn one_in(&mut self, n: u32) -> bool {
        n != 0 && self.next_u64() % u64::from(n) == 0
    }
}
