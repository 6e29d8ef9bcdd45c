//! LLC replacement policies.
//!
//! Every policy implements [`ReplacementPolicy`], the four-call plugin
//! contract of trace-driven cache simulators: construct, pick a victim in a
//! set, update state after the access resolves, and report statistics.
//!
//! # Policies
//!
//! - `ShipStreamDrrip`: RRIP with SHiP-lite insertion, per-set streaming
//!   detection, DRRIP set dueling and dead-block tracking.
//! - `Lru`: True LRU, kept as the baseline.

/// Dead-block counters per block slot.
pub mod dead_block;

/// DRRIP set dueling (leader sets and PSEL).
pub mod dueling;

/// SHiP-lite + streaming + DRRIP composite policy.
pub mod hybrid;

/// Least Recently Used baseline policy.
pub mod lru;

/// RRIP age array and victim search.
pub mod rrip;

/// SHiP-lite signature outcome table.
pub mod ship;

/// Per-set stride detector.
pub mod stream;

pub use hybrid::ShipStreamDrrip;
pub use lru::LruPolicy;

use crate::common::{Access, BlockView, ConfigError};
use crate::config::{Config, PolicyKind};
use crate::stats::{Heartbeat, PolicyReport};

/// Victim chosen for a miss.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Victim {
    /// Evict and refill this way.
    Way(usize),
    /// Do not allocate the missing line.
    Bypass,
}

/// Trait for LLC replacement policies.
///
/// Set indices are reduced modulo the policy's set count and way indices
/// modulo its associativity, so no input can make a call panic.
pub trait ReplacementPolicy: Send + Sync {
    /// Short policy name used in reports and logs.
    fn name(&self) -> &'static str;

    /// Selects the way to evict from `access.set` on a miss.
    ///
    /// # Arguments
    ///
    /// * `access` - The missing access.
    /// * `blocks` - The simulator's view of the set, one entry per way. Ways
    ///   past the end of the slice are treated as valid. An empty slice lets
    ///   the policy use its own record of which ways it has filled.
    fn find_victim(&mut self, access: &Access, blocks: &[BlockView]) -> Victim;

    /// Updates replacement state once the access has resolved.
    ///
    /// # Arguments
    ///
    /// * `access` - The access.
    /// * `way` - The hit way, the filled way, or `None` when the fill was bypassed.
    /// * `victim_addr` - Line address evicted by the fill (0 when none).
    /// * `hit` - Whether the access hit.
    fn update(&mut self, access: &Access, way: Option<usize>, victim_addr: u64, hit: bool);

    /// End-of-run statistics.
    fn report(&self) -> PolicyReport;

    /// Periodic statistics.
    fn heartbeat(&self) -> Heartbeat;
}

/// Enum wrapper for static dispatch of replacement policies.
/// This avoids vtable lookups on the per-access path.
#[derive(Debug)]
pub enum Policy {
    /// LRU baseline.
    Lru(LruPolicy),
    /// Composite SHiP-lite / streaming / DRRIP policy.
    ShipStreamDrrip(Box<ShipStreamDrrip>),
}

impl Policy {
    /// Builds the policy selected by `config.kind`.
    ///
    /// # Errors
    ///
    /// Returns the first [`ConfigError`] found by [`Config::validate`].
    pub fn new(config: &Config) -> Result<Self, ConfigError> {
        match config.kind {
            PolicyKind::Lru => {
                config.validate()?;
                Ok(Self::Lru(LruPolicy::new(
                    config.geometry.sets,
                    config.geometry.ways,
                )))
            }
            PolicyKind::ShipStreamDrrip => {
                Ok(Self::ShipStreamDrrip(Box::new(ShipStreamDrrip::new(config)?)))
            }
        }
    }
}

impl ReplacementPolicy for Policy {
    #[inline(always)]
    fn name(&self) -> &'static str {
        match self {
            Self::Lru(p) => p.name(),
            Self::ShipStreamDrrip(p) => p.name(),
        }
    }

    #[inline(always)]
    fn find_victim(&mut self, access: &Access, blocks: &[BlockView]) -> Victim {
        match self {
            Self::Lru(p) => p.find_victim(access, blocks),
            Self::ShipStreamDrrip(p) => p.find_victim(access, blocks),
        }
    }

    #[inline(always)]
    fn update(&mut self, access: &Access, way: Option<usize>, victim_addr: u64, hit: bool) {
        match self {
            Self::Lru(p) => p.update(access, way, victim_addr, hit),
            Self::ShipStreamDrrip(p) => p.update(access, way, victim_addr, hit),
        }
    }

    fn report(&self) -> PolicyReport {
        match self {
            Self::Lru(p) => p.report(),
            Self::ShipStreamDrrip(p) => p.report(),
        }
    }

    fn heartbeat(&self) -> Heartbeat {
        match self {
            Self::Lru(p) => p.heartbeat(),
            Self::ShipStreamDrrip(p) => p.heartbeat(),
        }
    }
}
