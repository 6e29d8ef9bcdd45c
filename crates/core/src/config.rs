//! Configuration system for the replacement policies.
//!
//! This module defines every knob the policies expose. It provides:
//! 1. **Defaults:** The canonical constants (2048 sets × 16 ways, 2-bit RRPV,
//!    6-bit signatures, 10-bit PSEL, 32 leader sets per policy).
//! 2. **Structures:** One section per policy component (geometry, RRIP, SHiP,
//!    streaming detector, set dueling, dead-block tracker).
//! 3. **Enums:** Policy kind, signature hash and signature source.
//! 4. **Validation:** [`Config::validate`] rejects configurations the policies
//!    cannot represent before any table is allocated.
//!
//! Configuration is supplied as JSON (every field optional) or built from
//! `Config::default()`.

use serde::{Deserialize, Serialize};

use crate::common::{ConfigError, max_for_bits};

/// Default configuration constants.
mod defaults {
    /// LLC sets (single core, 2 MiB with 64-byte lines and 16 ways).
    pub const SETS: usize = 2048;

    /// LLC associativity.
    pub const WAYS: usize = 16;

    /// Cache line size in bytes.
    pub const LINE_BYTES: usize = 64;

    /// RRPV width; 2 bits gives `RRPV_MAX = 3`.
    pub const RRPV_BITS: u8 = 2;

    /// SHiP signature width (64-entry outcome table).
    pub const SIGNATURE_BITS: u8 = 6;

    /// SHiP outcome counter width.
    pub const SHIP_COUNTER_BITS: u8 = 2;

    /// Outcome counter value at or above which a signature counts as reused.
    pub const REUSE_THRESHOLD: u16 = 2;

    /// Initial outcome counter value ("weakly reused").
    pub const SHIP_INITIAL: u16 = 1;

    /// Address bits dropped before folding the region into a signature (4 KiB pages).
    pub const REGION_SHIFT: u8 = 12;

    /// Stream confidence counter width.
    pub const CONFIDENCE_BITS: u8 = 2;

    /// Confidence at or above which a set is streaming.
    pub const STREAM_THRESHOLD: u16 = 2;

    /// Leader sets dedicated to each dueling policy.
    pub const LEADER_SETS: usize = 32;

    /// PSEL width.
    pub const PSEL_BITS: u8 = 10;

    /// BRRIP inserts near once every this many fills on average.
    pub const BRRIP_INVERSE_PROBABILITY: u32 = 32;

    /// Dead-block counter width.
    pub const DEAD_COUNTER_BITS: u8 = 2;

    /// Accesses between dead-block counter decays.
    pub const DEAD_DECAY_INTERVAL: u64 = 4096;

    /// Seed of the policy-owned random generator.
    pub const SEED: u64 = 0x5EED_CAFE;
}

/// Replacement policy implementations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub enum PolicyKind {
    /// RRIP with SHiP-lite, streaming detection, dead-block tracking and
    /// DRRIP set dueling. Each component can be disabled individually.
    #[default]
    #[serde(alias = "SHIP", alias = "Ship")]
    ShipStreamDrrip,
    /// True LRU baseline.
    #[serde(alias = "LRU")]
    Lru,
}

/// Instruction-pointer hash used to form SHiP signatures.
///
/// No canonical hash exists for SHiP-lite; any deterministic, roughly uniform
/// fold of the instruction pointer works.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub enum SignatureHash {
    /// `pc ^ (pc >> 6) ^ (pc >> 12)`.
    #[default]
    XorFold,
    /// `(pc >> 2) ^ (pc >> 7)`; drops the instruction alignment bits first.
    ShiftXor,
    /// 64-bit murmur3 finalizer; best spread, highest cost.
    Mix64,
}

/// Inputs folded into a SHiP signature.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub enum SignatureSource {
    /// Instruction pointer only.
    #[default]
    Pc,
    /// Instruction pointer combined with the memory region of the access.
    PcAndRegion,
}

/// Root configuration structure.
///
/// # Examples
///
/// ```
/// use llcrepl_core::config::{Config, PolicyKind};
///
/// let config = Config::default();
/// assert_eq!(config.kind, PolicyKind::ShipStreamDrrip);
/// assert_eq!(config.geometry.sets, 2048);
/// assert_eq!(config.rrpv_max(), 3);
/// ```
///
/// Deserializing a partial document keeps defaults for omitted fields:
///
/// ```
/// use llcrepl_core::config::{Config, SignatureHash};
///
/// let json = r#"{
///     "geometry": { "sets": 1024, "ways": 8 },
///     "ship": { "hash": "Mix64", "signature_bits": 5 },
///     "stream": { "bypass": true }
/// }"#;
/// let config = Config::from_json(json).unwrap();
/// assert_eq!(config.geometry.sets, 1024);
/// assert_eq!(config.geometry.line_bytes, 64);
/// assert_eq!(config.ship.hash, SignatureHash::Mix64);
/// assert!(config.stream.bypass);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Which policy to build.
    pub kind: PolicyKind,
    /// Cache shape.
    pub geometry: GeometryConfig,
    /// RRPV array.
    pub rrip: RripConfig,
    /// SHiP-lite predictor.
    pub ship: ShipConfig,
    /// Streaming detector.
    pub stream: StreamConfig,
    /// DRRIP set dueling.
    pub dueling: DuelingConfig,
    /// Dead-block approximation.
    pub dead_block: DeadBlockConfig,
    /// Seed of the policy-owned random generator.
    pub seed: u64,
    /// Accesses between heartbeat log lines of the LLC model (0 disables).
    pub heartbeat_interval: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            kind: PolicyKind::default(),
            geometry: GeometryConfig::default(),
            rrip: RripConfig::default(),
            ship: ShipConfig::default(),
            stream: StreamConfig::default(),
            dueling: DuelingConfig::default(),
            dead_block: DeadBlockConfig::default(),
            seed: defaults::SEED,
            heartbeat_interval: 0,
        }
    }
}

impl Config {
    /// Parses a JSON document and validates it.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Parse`] for malformed JSON and any validation
    /// error reported by [`Config::validate`].
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Largest RRPV value (`2^rrpv_bits - 1`).
    pub const fn rrpv_max(&self) -> u16 {
        max_for_bits(self.rrip.rrpv_bits)
    }

    /// Checks every field against the ranges the policies support.
    ///
    /// Component sections are only checked when the component is enabled,
    /// so a tiny test cache can switch set dueling off instead of shrinking
    /// its leader-set count.
    ///
    /// # Errors
    ///
    /// Returns the first violated constraint.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let g = &self.geometry;
        if g.sets == 0 || !g.sets.is_power_of_two() {
            return Err(ConfigError::InvalidSets(g.sets));
        }
        if g.ways == 0 {
            return Err(ConfigError::ZeroWays);
        }
        if g.line_bytes == 0 || !g.line_bytes.is_power_of_two() {
            return Err(ConfigError::InvalidLineBytes(g.line_bytes));
        }
        if !(1..=7).contains(&self.rrip.rrpv_bits) {
            return Err(ConfigError::InvalidRrpvBits(self.rrip.rrpv_bits));
        }

        if self.ship.enabled {
            if !(1..=16).contains(&self.ship.signature_bits) {
                return Err(ConfigError::InvalidSignatureBits(self.ship.signature_bits));
            }
            check_counter_bits("ship.counter_bits", self.ship.counter_bits)?;
            check_threshold(
                "ship.reuse_threshold",
                self.ship.reuse_threshold,
                self.ship.counter_bits,
            )?;
            let max = max_for_bits(self.ship.counter_bits);
            if self.ship.initial_value > max {
                return Err(ConfigError::InitialOutOfRange {
                    field: "ship.initial_value",
                    value: self.ship.initial_value,
                    max,
                });
            }
            check_shift("ship.region_shift", self.ship.region_shift)?;
        }

        if self.stream.enabled {
            check_counter_bits("stream.confidence_bits", self.stream.confidence_bits)?;
            check_threshold(
                "stream.threshold",
                self.stream.threshold,
                self.stream.confidence_bits,
            )?;
            check_shift("stream.addr_shift", self.stream.addr_shift)?;
        }

        if self.dueling.enabled {
            if !(2..=16).contains(&self.dueling.psel_bits) {
                return Err(ConfigError::InvalidPselBits(self.dueling.psel_bits));
            }
            if self.dueling.leader_sets * 2 > g.sets {
                return Err(ConfigError::TooManyLeaderSets {
                    leaders: self.dueling.leader_sets,
                    sets: g.sets,
                });
            }
            if self.dueling.brrip_inverse_probability == 0 {
                return Err(ConfigError::ZeroBrripProbability);
            }
        }

        if self.dead_block.enabled {
            check_counter_bits("dead_block.counter_bits", self.dead_block.counter_bits)?;
        }

        Ok(())
    }
}

fn check_counter_bits(field: &'static str, bits: u8) -> Result<(), ConfigError> {
    if (1..=8).contains(&bits) {
        Ok(())
    } else {
        Err(ConfigError::InvalidCounterBits { field, bits })
    }
}

const fn check_shift(field: &'static str, shift: u8) -> Result<(), ConfigError> {
    if shift < 64 {
        Ok(())
    } else {
        Err(ConfigError::InvalidShift { field, shift })
    }
}

fn check_threshold(field: &'static str, threshold: u16, bits: u8) -> Result<(), ConfigError> {
    let max = max_for_bits(bits);
    if threshold > max {
        Err(ConfigError::UnreachableThreshold {
            field,
            threshold,
            max,
        })
    } else {
        Ok(())
    }
}

/// Cache geometry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeometryConfig {
    /// Number of sets (power of two).
    #[serde(default = "GeometryConfig::default_sets")]
    pub sets: usize,

    /// Associativity.
    #[serde(default = "GeometryConfig::default_ways")]
    pub ways: usize,

    /// Line size in bytes (power of two). Only the LLC model uses it.
    #[serde(default = "GeometryConfig::default_line_bytes")]
    pub line_bytes: usize,
}

impl GeometryConfig {
    /// Returns the default set count.
    fn default_sets() -> usize {
        defaults::SETS
    }

    /// Returns the default associativity.
    fn default_ways() -> usize {
        defaults::WAYS
    }

    /// Returns the default line size.
    fn default_line_bytes() -> usize {
        defaults::LINE_BYTES
    }
}

impl Default for GeometryConfig {
    fn default() -> Self {
        Self {
            sets: defaults::SETS,
            ways: defaults::WAYS,
            line_bytes: defaults::LINE_BYTES,
        }
    }
}

/// RRPV array configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RripConfig {
    /// Bits per RRPV.
    pub rrpv_bits: u8,
}

impl Default for RripConfig {
    fn default() -> Self {
        Self {
            rrpv_bits: defaults::RRPV_BITS,
        }
    }
}

/// SHiP-lite predictor configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ShipConfig {
    /// Consult and train the predictor.
    pub enabled: bool,
    /// Signature width; the outcome table has `2^signature_bits` entries.
    pub signature_bits: u8,
    /// Outcome counter width.
    pub counter_bits: u8,
    /// Counter value at or above which fills insert at MRU.
    pub reuse_threshold: u16,
    /// Initial value of every outcome counter.
    pub initial_value: u16,
    /// Instruction-pointer hash.
    pub hash: SignatureHash,
    /// What the signature is computed from.
    pub source: SignatureSource,
    /// Address bits dropped before mixing in the region for
    /// [`SignatureSource::PcAndRegion`].
    pub region_shift: u8,
    /// Accesses between outcome-table decays (0 disables).
    pub decay_interval: u64,
}

impl Default for ShipConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            signature_bits: defaults::SIGNATURE_BITS,
            counter_bits: defaults::SHIP_COUNTER_BITS,
            reuse_threshold: defaults::REUSE_THRESHOLD,
            initial_value: defaults::SHIP_INITIAL,
            hash: SignatureHash::default(),
            source: SignatureSource::default(),
            region_shift: defaults::REGION_SHIFT,
            decay_interval: 0,
        }
    }
}

/// Streaming detector configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StreamConfig {
    /// Track per-set strides.
    pub enabled: bool,
    /// Confidence counter width.
    pub confidence_bits: u8,
    /// Confidence at or above which the set is streaming.
    pub threshold: u16,
    /// Address bits dropped before computing deltas (6 observes whole lines).
    pub addr_shift: u8,
    /// Bypass fills into streaming sets instead of inserting them distant.
    pub bypass: bool,
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            confidence_bits: defaults::CONFIDENCE_BITS,
            threshold: defaults::STREAM_THRESHOLD,
            addr_shift: 0,
            bypass: false,
        }
    }
}

/// DRRIP set-dueling configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DuelingConfig {
    /// Duel SRRIP against BRRIP; when off every set inserts SRRIP-style.
    pub enabled: bool,
    /// Leader sets per policy.
    pub leader_sets: usize,
    /// PSEL width.
    pub psel_bits: u8,
    /// BRRIP inserts near with probability `1 / brrip_inverse_probability`.
    pub brrip_inverse_probability: u32,
}

impl Default for DuelingConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            leader_sets: defaults::LEADER_SETS,
            psel_bits: defaults::PSEL_BITS,
            brrip_inverse_probability: defaults::BRRIP_INVERSE_PROBABILITY,
        }
    }
}

/// Dead-block approximation configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DeadBlockConfig {
    /// Track per-block dead counters.
    pub enabled: bool,
    /// Counter width.
    pub counter_bits: u8,
    /// Accesses between decays of every counter (0 disables).
    pub decay_interval: u64,
}

impl Default for DeadBlockConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            counter_bits: defaults::DEAD_COUNTER_BITS,
            decay_interval: defaults::DEAD_DECAY_INTERVAL,
        }
    }
}
