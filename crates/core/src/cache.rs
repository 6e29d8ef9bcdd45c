//! Set-associative LLC model.
//!
//! A tag array driven by a [`Policy`]. It performs the same calls a
//! trace-driven simulator makes into a replacement plugin: `find_victim` on
//! every miss and exactly one `update` per access. Timing, coherence and the
//! rest of the hierarchy are not modeled.

use serde::Serialize;
use tracing::info;

use crate::common::{Access, AccessType, BlockView, ConfigError};
use crate::config::Config;
use crate::policy::{Policy, ReplacementPolicy, Victim};
use crate::stats::PolicyReport;

/// Cache line entry containing tag and validity.
#[derive(Clone, Copy, Debug, Default)]
struct CacheLine {
    tag: u64,
    valid: bool,
}

/// Result of one LLC access.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AccessOutcome {
    /// The line was present in `way`.
    Hit {
        /// Way holding the line.
        way: usize,
    },
    /// The line was filled into `way`, evicting `evicted` if the way was valid.
    Miss {
        /// Way that received the line.
        way: usize,
        /// Address of the evicted line.
        evicted: Option<u64>,
    },
    /// The policy declined to allocate the line.
    Bypass,
}

/// LLC-level counters.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct LlcStats {
    /// Total accesses.
    pub accesses: u64,
    /// Hits.
    pub hits: u64,
    /// Misses, bypassed ones included.
    pub misses: u64,
    /// Misses that were not allocated.
    pub bypasses: u64,
    /// Valid lines evicted by fills.
    pub evictions: u64,
}

/// Last-level cache with a pluggable replacement policy.
#[derive(Debug)]
pub struct Llc {
    lines: Vec<CacheLine>,
    view: Vec<BlockView>,
    sets: usize,
    ways: usize,
    line_bytes: usize,
    policy: Policy,
    stats: LlcStats,
    heartbeat_interval: u64,
}

impl Llc {
    /// Creates an empty cache and the policy selected by `config.kind`.
    ///
    /// # Errors
    ///
    /// Returns the first [`ConfigError`] found by [`Config::validate`].
    pub fn new(config: &Config) -> Result<Self, ConfigError> {
        let policy = Policy::new(config)?;
        let sets = config.geometry.sets;
        let ways = config.geometry.ways;
        let line_bytes = config.geometry.line_bytes;

        info!(
            sets,
            ways,
            line_bytes,
            capacity_bytes = sets * ways * line_bytes,
            policy = policy.name(),
            "LLC initialized"
        );

        Ok(Self {
            lines: vec![CacheLine::default(); sets * ways],
            view: vec![BlockView::default(); ways],
            sets,
            ways,
            line_bytes,
            policy,
            stats: LlcStats::default(),
            heartbeat_interval: config.heartbeat_interval,
        })
    }

    /// Set index of `addr`.
    pub const fn set_index(&self, addr: u64) -> usize {
        ((addr / self.line_bytes as u64) % self.sets as u64) as usize
    }

    /// Line-aligned address of `addr`.
    pub const fn line_addr(&self, addr: u64) -> u64 {
        addr - addr % self.line_bytes as u64
    }

    const fn tag(&self, addr: u64) -> u64 {
        addr / (self.line_bytes * self.sets) as u64
    }

    /// Rebuilds the line address stored in `(set, tag)`.
    const fn addr_of(&self, set: usize, tag: u64) -> u64 {
        (tag * self.sets as u64 + set as u64) * self.line_bytes as u64
    }

    /// Checks if the cache holds the line containing `addr`.
    pub fn contains(&self, addr: u64) -> bool {
        self.lookup(self.set_index(addr), self.tag(addr)).is_some()
    }

    fn lookup(&self, set: usize, tag: u64) -> Option<usize> {
        let base = set * self.ways;
        self.lines[base..base + self.ways]
            .iter()
            .position(|l| l.valid && l.tag == tag)
    }

    /// Performs one access: lookup, victim selection on a miss, fill, and
    /// the policy update.
    ///
    /// # Arguments
    ///
    /// * `cpu` - Requesting core.
    /// * `pc` - Instruction pointer of the access.
    /// * `addr` - Physical address.
    /// * `kind` - Access type.
    pub fn access(&mut self, cpu: u32, pc: u64, addr: u64, kind: AccessType) -> AccessOutcome {
        let set = self.set_index(addr);
        let tag = self.tag(addr);
        let access = Access {
            cpu,
            set,
            pc,
            paddr: addr,
            kind,
        };
        self.stats.accesses += 1;

        let outcome = if let Some(way) = self.lookup(set, tag) {
            self.stats.hits += 1;
            self.policy.update(&access, Some(way), 0, true);
            AccessOutcome::Hit { way }
        } else {
            self.stats.misses += 1;
            self.fill(&access, tag)
        };

        if self.heartbeat_interval != 0 && self.stats.accesses % self.heartbeat_interval == 0 {
            info!("heartbeat: {}", self.policy.heartbeat());
        }
        outcome
    }

    fn fill(&mut self, access: &Access, tag: u64) -> AccessOutcome {
        let set = access.set;
        let base = set * self.ways;
        let (sets, line_bytes) = (self.sets as u64, self.line_bytes as u64);
        for (view, line) in self.view.iter_mut().zip(&self.lines[base..base + self.ways]) {
            *view = BlockView {
                valid: line.valid,
                addr: (line.tag * sets + set as u64) * line_bytes,
            };
        }

        match self.policy.find_victim(access, &self.view) {
            Victim::Way(way) => {
                let way = way % self.ways;
                let old = self.lines[base + way];
                let evicted = old.valid.then(|| self.addr_of(set, old.tag));
                if evicted.is_some() {
                    self.stats.evictions += 1;
                }
                self.lines[base + way] = CacheLine { tag, valid: true };
                self.policy
                    .update(access, Some(way), evicted.unwrap_or(0), false);
                AccessOutcome::Miss { way, evicted }
            }
            Victim::Bypass => {
                self.stats.bypasses += 1;
                self.policy.update(access, None, 0, false);
                AccessOutcome::Bypass
            }
        }
    }

    /// Counters gathered so far.
    pub const fn stats(&self) -> &LlcStats {
        &self.stats
    }

    /// The replacement policy.
    pub const fn policy(&self) -> &Policy {
        &self.policy
    }

    /// End-of-run report of the replacement policy.
    pub fn report(&self) -> PolicyReport {
        self.policy.report()
    }
}
