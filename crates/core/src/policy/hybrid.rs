//! SHiP-lite + streaming detector + DRRIP composite policy.
//!
//! Victim selection is RRIP: the first invalid way, then (when dead-block
//! tracking is on) the first never-reused block sitting in a dead slot, then
//! the first block at `RRPV_MAX` after aging. Sets the stream detector has
//! flagged may bypass the fill instead.
//!
//! Insertion depth is decided per fill, first match wins:
//! 1. **Streaming set:** `RRPV_MAX`.
//! 2. **Dead slot:** `RRPV_MAX`.
//! 3. **SHiP verdict:** 0 for reused signatures, `RRPV_MAX` for dead ones.
//! 4. **Set dueling:** SRRIP (`RRPV_MAX - 1`) or BRRIP (mostly `RRPV_MAX`).
//!
//! Hits promote the block to RRPV 0, train its fill signature upward and clear
//! its slot's dead counter. Evicting a block that was never hit trains its
//! fill signature downward and bumps the slot's dead counter. The evicted
//! block's metadata is read before the fill overwrites it.
//!
//! # Performance
//!
//! - **Time Complexity:**
//!   - `find_victim()`: O(W × R) with R ≤ `RRPV_MAX + 1`
//!   - `update()`: O(1), plus O(S × W) on the access that triggers a decay
//! - **Space Complexity:** O(S × W) block metadata, O(S) stream state,
//!   O(2^B) SHiP counters
//! - **Hardware Cost:** Per block 2 RRPV bits, 6 signature bits, 1 reuse bit
//!   and 2 dead bits; per set about 80 bits of stream state

use tracing::{debug, info, trace};

use super::dead_block::DeadBlockTracker;
use super::dueling::{DuelPolicy, SetDueling, SetRole};
use super::rrip::RripArray;
use super::ship::{ReusePrediction, ShipPredictor, Signature};
use super::stream::StreamDetector;
use super::{ReplacementPolicy, Victim};
use crate::common::{Access, BlockView, ConfigError, XorShift64};
use crate::config::Config;
use crate::stats::{DuelingReport, Heartbeat, InsertionReason, PolicyReport, PolicyStats};

/// Replacement metadata of one block.
#[derive(Clone, Copy, Debug, Default)]
struct BlockMeta {
    signature: Signature,
    reused: bool,
    valid: bool,
}

/// The composite LLC replacement policy.
#[derive(Clone, Debug)]
pub struct ShipStreamDrrip {
    sets: usize,
    ways: usize,
    rrip: RripArray,
    blocks: Vec<BlockMeta>,
    ship: Option<ShipPredictor>,
    stream: Option<StreamDetector>,
    dueling: Option<SetDueling>,
    dead: Option<DeadBlockTracker>,
    rng: XorShift64,
    stream_bypass: bool,
    brrip_inverse: u32,
    ship_decay_interval: u64,
    dead_decay_interval: u64,
    stats: PolicyStats,
}

impl ShipStreamDrrip {
    /// Validates `config` and allocates all policy state.
    ///
    /// Components whose section is disabled are not allocated and never
    /// consulted.
    ///
    /// # Errors
    ///
    /// Returns the first [`ConfigError`] found by [`Config::validate`].
    pub fn new(config: &Config) -> Result<Self, ConfigError> {
        config.validate()?;

        let sets = config.geometry.sets;
        let ways = config.geometry.ways;
        let ship = config.ship.enabled.then(|| ShipPredictor::new(&config.ship));
        let stream = config
            .stream
            .enabled
            .then(|| StreamDetector::new(sets, &config.stream));
        let dueling = config
            .dueling
            .enabled
            .then(|| SetDueling::new(sets, &config.dueling));
        let dead = config
            .dead_block
            .enabled
            .then(|| DeadBlockTracker::new(sets, ways, &config.dead_block));

        info!(
            sets,
            ways,
            rrpv_max = config.rrpv_max(),
            ship = config.ship.enabled,
            stream = config.stream.enabled,
            stream_bypass = config.stream.enabled && config.stream.bypass,
            dueling = config.dueling.enabled,
            dead_block = config.dead_block.enabled,
            "SHiP-lite streaming DRRIP policy initialized"
        );

        Ok(Self {
            sets,
            ways,
            rrip: RripArray::new(sets, ways, config.rrpv_max()),
            blocks: vec![BlockMeta::default(); sets * ways],
            ship,
            stream,
            dueling,
            dead,
            rng: XorShift64::new(config.seed),
            stream_bypass: config.stream.bypass,
            brrip_inverse: config.dueling.brrip_inverse_probability,
            ship_decay_interval: if config.ship.enabled {
                config.ship.decay_interval
            } else {
                0
            },
            dead_decay_interval: config.dead_block.decay_interval,
            stats: PolicyStats::default(),
        })
    }

    /// Statistics gathered so far.
    pub const fn stats(&self) -> &PolicyStats {
        &self.stats
    }

    /// `RRPV_MAX`.
    pub const fn rrpv_max(&self) -> u16 {
        self.rrip.max()
    }

    /// Current RRPV of a block.
    pub fn rrpv(&self, set: usize, way: usize) -> u16 {
        self.rrip.get(set % self.sets, way % self.ways)
    }

    /// Whether the block in `(set, way)` has been hit since its fill.
    pub fn is_reused(&self, set: usize, way: usize) -> bool {
        self.blocks[self.slot(set % self.sets, way % self.ways)].reused
    }

    /// Signature the block in `(set, way)` was filled under.
    pub fn fill_signature(&self, set: usize, way: usize) -> Signature {
        self.blocks[self.slot(set % self.sets, way % self.ways)].signature
    }

    /// Signature an access would be filled under, if SHiP is enabled.
    pub fn signature(&self, pc: u64, paddr: u64) -> Option<Signature> {
        self.ship.as_ref().map(|s| s.signature(pc, paddr))
    }

    /// SHiP outcome counter for the signature of `(pc, paddr)`.
    pub fn ship_outcome(&self, pc: u64, paddr: u64) -> Option<u16> {
        self.ship
            .as_ref()
            .map(|s| s.outcome(s.signature(pc, paddr)))
    }

    /// Stream confidence of `set`.
    pub fn stream_confidence(&self, set: usize) -> Option<u16> {
        self.stream.as_ref().map(|s| s.confidence(set % self.sets))
    }

    /// Whether `set` is currently classified as streaming.
    pub fn is_streaming(&self, set: usize) -> bool {
        self.stream
            .as_ref()
            .is_some_and(|s| s.is_streaming(set % self.sets))
    }

    /// Current PSEL value.
    pub fn psel(&self) -> Option<u16> {
        self.dueling.as_ref().map(SetDueling::psel)
    }

    /// Dueling role of `set`.
    pub fn set_role(&self, set: usize) -> Option<SetRole> {
        self.dueling.as_ref().map(|d| d.role(set % self.sets))
    }

    /// Insertion policy currently governing `set`.
    pub fn duel_policy(&self, set: usize) -> DuelPolicy {
        self.dueling
            .as_ref()
            .map_or(DuelPolicy::Srrip, |d| d.policy_for(set % self.sets))
    }

    /// Dead-block counter of the slot `(set, way)`.
    pub fn dead_counter(&self, set: usize, way: usize) -> Option<u16> {
        self.dead
            .as_ref()
            .map(|d| d.counter(set % self.sets, way % self.ways))
    }

    const fn slot(&self, set: usize, way: usize) -> usize {
        set * self.ways + way
    }

    fn is_invalid(&self, set: usize, way: usize, blocks: &[BlockView]) -> bool {
        if blocks.is_empty() {
            !self.blocks[self.slot(set, way)].valid
        } else {
            blocks.get(way).is_some_and(|b| !b.valid)
        }
    }

    /// Picks the insertion RRPV for a fill of `(set, way)` under `sig`.
    fn insertion(
        &mut self,
        set: usize,
        way: usize,
        sig: Signature,
        streaming: bool,
    ) -> (u16, InsertionReason) {
        let max = self.rrip.max();
        let near = max.saturating_sub(1);

        if streaming {
            return (max, InsertionReason::Streaming);
        }
        if self.dead.as_ref().is_some_and(|d| d.is_dead(set, way)) {
            return (max, InsertionReason::DeadBlock);
        }
        if let Some(ship) = &self.ship {
            match ship.predict(sig) {
                ReusePrediction::Reused => return (0, InsertionReason::ShipReused),
                ReusePrediction::Dead => return (max, InsertionReason::ShipDead),
                ReusePrediction::Neutral => {}
            }
        }
        match self.dueling.as_ref().map(|d| d.policy_for(set)) {
            Some(DuelPolicy::Brrip) => {
                let rrpv = if self.rng.one_in(self.brrip_inverse) {
                    near
                } else {
                    max
                };
                (rrpv, InsertionReason::Brrip)
            }
            Some(DuelPolicy::Srrip) | None => (near, InsertionReason::Srrip),
        }
    }

    fn on_hit(&mut self, set: usize, way: usize) {
        let slot = self.slot(set, way);
        self.rrip.promote(set, way);
        self.blocks[slot].reused = true;
        if let Some(ship) = &mut self.ship {
            ship.on_hit(self.blocks[slot].signature);
        }
        if let Some(dead) = &mut self.dead {
            dead.on_hit(set, way);
        }
    }

    fn on_fill(
        &mut self,
        access: &Access,
        set: usize,
        way: usize,
        victim_addr: u64,
        streaming: bool,
    ) {
        let slot = self.slot(set, way);
        let evicted = self.blocks[slot];

        if evicted.valid && !evicted.reused {
            self.stats.unreused_evictions += 1;
            if let Some(ship) = &mut self.ship {
                ship.on_evict(evicted.signature);
            }
            if let Some(dead) = &mut self.dead {
                dead.on_unreused_eviction(set, way);
            }
        }

        let sig = self
            .ship
            .as_ref()
            .map_or_else(Signature::default, |s| s.signature(access.pc, access.paddr));
        let (rrpv, reason) = self.insertion(set, way, sig, streaming);

        self.rrip.insert(set, way, rrpv);
        self.blocks[slot] = BlockMeta {
            signature: sig,
            reused: false,
            valid: true,
        };
        self.stats.fills.record(reason);

        trace!(
            set,
            way,
            pc = access.pc,
            paddr = access.paddr,
            victim_addr,
            signature = sig.0,
            rrpv,
            ?reason,
            "fill"
        );
    }

    fn tick_decay(&mut self) {
        let n = self.stats.accesses;
        if self.dead_decay_interval != 0 && n % self.dead_decay_interval == 0 {
            if let Some(dead) = &mut self.dead {
                dead.decay();
                self.stats.dead_decays += 1;
                debug!(
                    accesses = n,
                    dead_blocks = dead.dead_blocks(),
                    "dead-block counters decayed"
                );
            }
        }
        if self.ship_decay_interval != 0 && n % self.ship_decay_interval == 0 {
            if let Some(ship) = &mut self.ship {
                ship.decay();
                self.stats.ship_decays += 1;
                debug!(accesses = n, "SHiP outcome table decayed");
            }
        }
    }
}

/// Line address the harness reports for `way`, if it passed a view.
fn view_addr(blocks: &[BlockView], way: usize) -> Option<u64> {
    blocks.get(way).map(|b| b.addr)
}

impl ReplacementPolicy for ShipStreamDrrip {
    fn name(&self) -> &'static str {
        "ship-stream-drrip"
    }

    fn find_victim(&mut self, access: &Access, blocks: &[BlockView]) -> Victim {
        let set = access.set % self.sets;

        if let Some(way) = (0..self.ways).find(|&w| self.is_invalid(set, w, blocks)) {
            self.stats.invalid_victims += 1;
            return Victim::Way(way);
        }

        if self.stream_bypass && self.is_streaming(set) {
            return Victim::Bypass;
        }

        if let Some(dead) = &self.dead {
            let base = set * self.ways;
            if let Some(way) = (0..self.ways)
                .find(|&w| !self.blocks[base + w].reused && dead.is_dead(set, w))
            {
                self.stats.dead_victims += 1;
                trace!(set, way, addr = view_addr(blocks, way), "dead-block victim");
                return Victim::Way(way);
            }
        }

        let victim = self.rrip.find_victim(set);
        self.stats.scan_victims += 1;
        self.stats.aging_rounds += u64::from(victim.rounds);
        self.stats.max_aging_rounds = self.stats.max_aging_rounds.max(victim.rounds);
        trace!(
            set,
            way = victim.way,
            rounds = victim.rounds,
            addr = view_addr(blocks, victim.way),
            "rrip victim"
        );
        Victim::Way(victim.way)
    }

    fn update(&mut self, access: &Access, way: Option<usize>, victim_addr: u64, hit: bool) {
        let set = access.set % self.sets;
        self.stats.accesses += 1;

        let streaming = self
            .stream
            .as_mut()
            .is_some_and(|s| s.observe(set, access.paddr));

        if hit {
            self.stats.hits += 1;
            if let Some(way) = way {
                self.on_hit(set, way % self.ways);
            }
        } else {
            self.stats.misses += 1;
            if let Some(dueling) = &mut self.dueling {
                if dueling.record_miss(set) {
                    self.stats.winner_changes += 1;
                    debug!(
                        psel = dueling.psel(),
                        winner = ?dueling.winner(),
                        "set-dueling winner changed"
                    );
                }
            }
            match way {
                Some(way) => self.on_fill(access, set, way % self.ways, victim_addr, streaming),
                None => self.stats.bypasses += 1,
            }
        }

        self.tick_decay();
    }

    fn report(&self) -> PolicyReport {
        PolicyReport {
            policy: self.name(),
            sets: self.sets,
            ways: self.ways,
            stats: self.stats,
            dueling: self.dueling.as_ref().map(|d| DuelingReport {
                psel: d.psel(),
                psel_max: d.psel_max(),
                winner: d.winner(),
            }),
            streaming_sets: self.stream.as_ref().map(StreamDetector::streaming_sets),
            signature_histogram: self.ship.as_ref().map(ShipPredictor::histogram),
            dead_blocks: self.dead.as_ref().map(DeadBlockTracker::dead_blocks),
        }
    }

    fn heartbeat(&self) -> Heartbeat {
        Heartbeat {
            accesses: self.stats.accesses,
            hits: self.stats.hits,
            misses: self.stats.misses,
            psel: self.psel(),
            streaming_sets: self.stream.as_ref().map(StreamDetector::streaming_sets),
        }
    }
}
