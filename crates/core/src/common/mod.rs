//! Common utilities and types shared by every policy component.
//!
//! This module provides the small building blocks the policies are assembled from:
//! 1. **Counters:** The saturating counter used for every piece of replacement state.
//! 2. **Accesses:** Descriptors for an LLC access and the simulator's view of a set.
//! 3. **Randomness:** A seeded generator owned by each policy instance.
//! 4. **Errors:** Configuration validation failures.

/// Access descriptors (access type, access, block view).
pub mod access;

/// Saturating counter.
pub mod counter;

/// Configuration error types.
pub mod error;

/// Xorshift pseudo-random generator.
pub mod rng;

pub use access::{Access, AccessType, BlockView};
pub use counter::{SatCounter, max_for_bits};
pub use error::ConfigError;
pub use rng::XorShift64;
