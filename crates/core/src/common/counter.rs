//! Saturating counters.
//!
//! Every piece of replacement state in this crate is a small saturating
//! counter: RRPVs, SHiP outcome counters, stream confidence, dead-block
//! counters and the set-dueling PSEL register. This module provides the
//! single clamp-based implementation they all share.
//!
//! # Invariant
//!
//! `0 <= value <= max` holds after construction and after every operation.

use serde::Serialize;

/// An unsigned counter clamped to `[0, max]`.
///
/// Values are stored as `u16`, which covers every width in use here
/// (2-bit RRPVs up to a 16-bit PSEL).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct SatCounter {
    value: u16,
    max: u16,
}

impl SatCounter {
    /// Creates a counter at zero with the given maximum.
    pub const fn new(max: u16) -> Self {
        Self { value: 0, max }
    }

    /// Creates a counter with an initial value, clamped to `max`.
    pub const fn with_value(value: u16, max: u16) -> Self {
        Self {
            value: if value > max { max } else { value },
            max,
        }
    }

    /// Creates a counter `bits` wide (maximum `2^bits - 1`) starting at zero.
    pub const fn from_bits(bits: u8) -> Self {
        Self::new(max_for_bits(bits))
    }

    /// Current value.
    #[inline(always)]
    pub const fn get(&self) -> u16 {
        self.value
    }

    /// Upper bound.
    #[inline(always)]
    pub const fn max(&self) -> u16 {
        self.max
    }

    /// Adds one unless already at `max`.
    #[inline(always)]
    pub fn increment(&mut self) {
        if self.value < self.max {
            self.value += 1;
        }
    }

    /// Subtracts one unless already at zero.
    #[inline(always)]
    pub fn decrement(&mut self) {
        if self.value > 0 {
            self.value -= 1;
        }
    }

    /// Stores `value`, clamped to `max`.
    #[inline(always)]
    pub fn set(&mut self, value: u16) {
        self.value = value.min(self.max);
    }

    /// Resets to zero.
    #[inline(always)]
    pub fn reset(&mut self) {
        self.value = 0;
    }

    /// Returns `true` when the counter sits at `max`.
    #[inline(always)]
    pub const fn is_saturated(&self) -> bool {
        self.value == self.max
    }

    /// Returns `true` when the counter sits at zero.
    #[inline(always)]
    pub const fn is_zero(&self) -> bool {
        self.value == 0
    }
}

/// Largest value representable in `bits` bits, capped at `u16::MAX`.
pub const fn max_for_bits(bits: u8) -> u16 {
    if bits >= 16 {
        u16::MAX
    } else {
        (1u16 << bits) - 1
    }
}
