//! DRRIP set dueling.
//!
//! A handful of leader sets always insert SRRIP-style, another handful always
//! insert BRRIP-style, and a saturating policy-selection counter (PSEL) keeps
//! score: a miss in an SRRIP leader pushes PSEL up, a miss in a BRRIP leader
//! pushes it down. Every other set follows whichever policy PSEL currently
//! favors. Dueling only chooses the insertion depth; it never influences
//! victim selection.
//!
//! Leaders are spread evenly across the cache: with
//! `stride = sets / leader_sets`, set `i * stride` leads for SRRIP and set
//! `i * stride + stride / 2` leads for BRRIP.

use serde::Serialize;

use crate::common::{SatCounter, max_for_bits};
use crate::config::DuelingConfig;

/// The two insertion policies being dueled.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum DuelPolicy {
    /// Static RRIP: insert at `RRPV_MAX - 1`.
    Srrip,
    /// Bimodal RRIP: insert at `RRPV_MAX`, occasionally at `RRPV_MAX - 1`.
    Brrip,
}

/// Role of a set in the duel.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SetRole {
    /// Always uses SRRIP and trains PSEL.
    SrripLeader,
    /// Always uses BRRIP and trains PSEL.
    BrripLeader,
    /// Uses the policy PSEL favors.
    Follower,
}

/// Set-dueling state: static leader map plus the global PSEL counter.
#[derive(Clone, Debug)]
pub struct SetDueling {
    roles: Vec<SetRole>,
    psel: SatCounter,
    midpoint: u16,
}

impl SetDueling {
    /// Assigns leader sets and starts PSEL at its midpoint.
    ///
    /// The configuration must already be validated (`2 * leader_sets <= sets`).
    pub fn new(sets: usize, config: &DuelingConfig) -> Self {
        let mut roles = vec![SetRole::Follower; sets];
        if config.leader_sets > 0 {
            let stride = sets / config.leader_sets;
            for i in 0..config.leader_sets {
                roles[i * stride] = SetRole::SrripLeader;
                roles[i * stride + stride / 2] = SetRole::BrripLeader;
            }
        }

        let max = max_for_bits(config.psel_bits);
        let midpoint = max / 2 + 1;
        Self {
            roles,
            psel: SatCounter::with_value(midpoint, max),
            midpoint,
        }
    }

    /// Role of `set`.
    pub fn role(&self, set: usize) -> SetRole {
        self.roles[set]
    }

    /// Policy governing fills into `set`.
    pub fn policy_for(&self, set: usize) -> DuelPolicy {
        match self.roles[set] {
            SetRole::SrripLeader => DuelPolicy::Srrip,
            SetRole::BrripLeader => DuelPolicy::Brrip,
            SetRole::Follower => self.winner(),
        }
    }

    /// Policy followers currently use.
    pub fn winner(&self) -> DuelPolicy {
        if self.psel.get() > self.midpoint {
            DuelPolicy::Brrip
        } else {
            DuelPolicy::Srrip
        }
    }

    /// Records a miss in `set`. Only leader sets move PSEL.
    ///
    /// Returns `true` when the miss changed which policy followers use.
    pub fn record_miss(&mut self, set: usize) -> bool {
        let before = self.winner();
        match self.roles[set] {
            SetRole::SrripLeader => self.psel.increment(),
            SetRole::BrripLeader => self.psel.decrement(),
            SetRole::Follower => return false,
        }
        before != self.winner()
    }

    /// Current PSEL value.
    pub fn psel(&self) -> u16 {
        self.psel.get()
    }

    /// Largest PSEL value.
    pub fn psel_max(&self) -> u16 {
        self.psel.max()
    }

    /// Number of leader sets per policy actually assigned.
    pub fn leader_count(&self, role: SetRole) -> usize {
        self.roles.iter().filter(|r| **r == role).count()
    }
}
