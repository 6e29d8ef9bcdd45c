//! Last-level-cache replacement policy library.
//!
//! This crate implements an RRIP replacement policy for shared LLCs with the following:
//! 1. **Victim selection:** RRIP aging scan with invalid-way and dead-block preference.
//! 2. **Insertion:** SHiP-lite signature prediction, per-set streaming detection and
//!    DRRIP set dueling deciding how long a new block is protected.
//! 3. **Baseline:** A true-LRU policy behind the same plugin contract.
//! 4. **Model:** A set-associative tag array that drives a policy the way a
//!    trace-driven simulator does.
//! 5. **Reporting:** Configuration, statistics and periodic heartbeats.

/// Common types (counters, access descriptors, RNG, errors).
pub mod common;
/// Policy configuration (defaults, enums, per-component sections).
pub mod config;
/// Replacement policies and their components.
pub mod policy;
/// Set-associative LLC model.
pub mod cache;
/// Policy statistics collection and reporting.
pub mod stats;

/// Root configuration type; use `Config::default()` or deserialize from JSON.
pub use crate::config::Config;
/// LLC model; construct with `Llc::new`.
pub use crate::cache::{AccessOutcome, Llc};
/// Plugin contract and the policy wrapper selected by configuration.
pub use crate::policy::{Policy, ReplacementPolicy, Victim};
