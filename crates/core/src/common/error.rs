//! Configuration error definitions.
//!
//! Replacement policies have no runtime failure modes: every counter saturates
//! and every entry point is total over its inputs. The only fallible step is
//! construction, where a configuration is checked before any table is
//! allocated. This module provides:
//! 1. **Validation errors:** One variant per rejected configuration field.
//! 2. **Parse errors:** Wrapping malformed JSON configuration documents.

use thiserror::Error;

/// Reasons a [`Config`](crate::config::Config) is rejected.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The set count must be a nonzero power of two so set indices can be masked.
    #[error("set count must be a nonzero power of two, got {0}")]
    InvalidSets(usize),

    /// At least one way per set is required.
    #[error("associativity must be at least 1")]
    ZeroWays,

    /// Line size must be a nonzero power of two.
    #[error("line size must be a nonzero power of two, got {0}")]
    InvalidLineBytes(usize),

    /// RRPV width outside the supported range.
    #[error("rrpv_bits must be in 1..=7, got {0}")]
    InvalidRrpvBits(u8),

    /// SHiP signature width outside the supported range.
    #[error("signature_bits must be in 1..=16, got {0}")]
    InvalidSignatureBits(u8),

    /// A saturating counter width outside the supported range.
    #[error("{field} must be in 1..=8 bits, got {bits}")]
    InvalidCounterBits {
        /// Name of the offending field.
        field: &'static str,
        /// Rejected width.
        bits: u8,
    },

    /// A threshold that the corresponding counter can never reach.
    #[error("{field} threshold {threshold} exceeds counter maximum {max}")]
    UnreachableThreshold {
        /// Name of the offending field.
        field: &'static str,
        /// Rejected threshold.
        threshold: u16,
        /// Largest value the counter can hold.
        max: u16,
    },

    /// A counter starting value the counter cannot hold.
    #[error("{field} {value} exceeds counter maximum {max}")]
    InitialOutOfRange {
        /// Name of the offending field.
        field: &'static str,
        /// Rejected starting value.
        value: u16,
        /// Largest value the counter can hold.
        max: u16,
    },

    /// An address shift that would discard the whole address.
    #[error("{field} must be below 64, got {shift}")]
    InvalidShift {
        /// Name of the offending field.
        field: &'static str,
        /// Rejected shift.
        shift: u8,
    },

    /// More leader sets were requested than the cache can dedicate.
    #[error(
        "{leaders} leader sets per policy need at least {} sets, cache has {sets}",
        .leaders * 2
    )]
    TooManyLeaderSets {
        /// Requested leader sets per policy.
        leaders: usize,
        /// Sets in the cache.
        sets: usize,
    },

    /// PSEL width outside the supported range.
    #[error("psel_bits must be in 2..=16, got {0}")]
    InvalidPselBits(u8),

    /// BRRIP near-insertion probability denominator of zero.
    #[error("brrip_inverse_probability must be nonzero")]
    ZeroBrripProbability,

    /// The configuration document could not be parsed.
    #[error("malformed configuration: {0}")]
    Parse(#[from] serde_json::Error),
}
