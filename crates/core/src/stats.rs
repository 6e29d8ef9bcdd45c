//! Replacement policy statistics collection and reporting.
//!
//! This module tracks what a policy did over a run. It provides:
//! 1. **Counters:** Accesses, hits, misses, bypasses and victim-selection paths.
//! 2. **Insertion mix:** Fills broken down by the reason that chose their RRPV.
//! 3. **Reports:** An end-of-run [`PolicyReport`] (serializable, printable by
//!    section) and a compact periodic [`Heartbeat`].
//!
//! Reports are snapshots: producing one never changes policy behavior.

use std::fmt;

use serde::Serialize;

use crate::policy::dueling::DuelPolicy;

/// Why a fill received the RRPV it did.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum InsertionReason {
    /// The set was streaming.
    Streaming,
    /// The slot's dead-block counter was saturated.
    DeadBlock,
    /// The SHiP signature predicted reuse.
    ShipReused,
    /// The SHiP signature predicted no reuse.
    ShipDead,
    /// SRRIP depth chosen by set dueling (or dueling disabled).
    Srrip,
    /// BRRIP depth chosen by set dueling.
    Brrip,
    /// Plain MRU insertion (LRU baseline).
    Mru,
}

/// Fill counts per [`InsertionReason`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct FillCounts {
    /// Fills into streaming sets.
    pub streaming: u64,
    /// Fills into dead slots.
    pub dead_block: u64,
    /// Fills predicted reused by SHiP.
    pub ship_reused: u64,
    /// Fills predicted dead by SHiP.
    pub ship_dead: u64,
    /// SRRIP fills.
    pub srrip: u64,
    /// BRRIP fills.
    pub brrip: u64,
    /// MRU fills.
    pub mru: u64,
}

impl FillCounts {
    /// Counts one fill.
    pub fn record(&mut self, reason: InsertionReason) {
        let slot = match reason {
            InsertionReason::Streaming => &mut self.streaming,
            InsertionReason::DeadBlock => &mut self.dead_block,
            InsertionReason::ShipReused => &mut self.ship_reused,
            InsertionReason::ShipDead => &mut self.ship_dead,
            InsertionReason::Srrip => &mut self.srrip,
            InsertionReason::Brrip => &mut self.brrip,
            InsertionReason::Mru => &mut self.mru,
        };
        *slot += 1;
    }

    /// Total fills.
    pub const fn total(&self) -> u64 {
        self.streaming
            + self.dead_block
            + self.ship_reused
            + self.ship_dead
            + self.srrip
            + self.brrip
            + self.mru
    }
}

/// Running counters of one policy instance.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct PolicyStats {
    /// Calls to `update`.
    pub accesses: u64,
    /// Accesses that hit.
    pub hits: u64,
    /// Accesses that missed.
    pub misses: u64,
    /// Misses whose fill was bypassed.
    pub bypasses: u64,
    /// Fill breakdown.
    pub fills: FillCounts,
    /// Victims chosen because the way was invalid.
    pub invalid_victims: u64,
    /// Victims chosen because the block was predicted dead.
    pub dead_victims: u64,
    /// Victims chosen by the RRIP (or LRU) scan.
    pub scan_victims: u64,
    /// Total RRIP aging rounds.
    pub aging_rounds: u64,
    /// Largest aging rounds needed by a single victim search.
    pub max_aging_rounds: u32,
    /// Valid blocks evicted without a single hit.
    pub unreused_evictions: u64,
    /// Times followers switched between SRRIP and BRRIP.
    pub winner_changes: u64,
    /// Dead-block counter decays.
    pub dead_decays: u64,
    /// SHiP table decays.
    pub ship_decays: u64,
}

impl PolicyStats {
    /// Hit rate over all accesses, 0 when nothing was accessed.
    pub fn hit_rate(&self) -> f64 {
        if self.accesses == 0 {
            0.0
        } else {
            self.hits as f64 / self.accesses as f64
        }
    }
}

/// Set-dueling snapshot.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct DuelingReport {
    /// PSEL value.
    pub psel: u16,
    /// PSEL maximum.
    pub psel_max: u16,
    /// Policy followers currently use.
    pub winner: DuelPolicy,
}

/// End-of-run report of a policy.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct PolicyReport {
    /// Policy name.
    pub policy: &'static str,
    /// Sets covered by the policy.
    pub sets: usize,
    /// Ways per set.
    pub ways: usize,
    /// Running counters.
    pub stats: PolicyStats,
    /// Set-dueling state, when dueling is enabled.
    pub dueling: Option<DuelingReport>,
    /// Sets classified as streaming, when the detector is enabled.
    pub streaming_sets: Option<usize>,
    /// SHiP table entries per counter value, when SHiP is enabled.
    pub signature_histogram: Option<Vec<u64>>,
    /// Slots predicted dead, when dead-block tracking is enabled.
    pub dead_blocks: Option<usize>,
}

/// Section names for selective report output.
///
/// Pass an empty slice to [`PolicyReport::print_sections`] to print all sections.
pub const REPORT_SECTIONS: &[&str] = &["summary", "insertion", "ship", "stream", "dueling"];

impl PolicyReport {
    /// Prints only the requested sections to stdout.
    ///
    /// Each element of `sections` should be one of [`REPORT_SECTIONS`]. Pass an
    /// empty slice to print everything. Sections describing a disabled
    /// component are skipped.
    pub fn print_sections(&self, sections: &[String]) {
        print!("{}", self.render_sections(sections));
    }

    /// Renders the requested sections into a string (see [`Self::print_sections`]).
    pub fn render_sections(&self, sections: &[String]) -> String {
        use std::fmt::Write;

        let want = |s: &str| sections.is_empty() || sections.iter().any(|x| x == s);
        let st = &self.stats;
        let fills = st.fills.total().max(1) as f64;
        let mut out = String::new();

        // Writing into a String cannot fail.
        let mut line = |text: String| {
            let _ = writeln!(out, "{text}");
        };

        if want("summary") {
            line("==========================================================".into());
            line(format!("LLC REPLACEMENT POLICY REPORT ({})", self.policy));
            line("==========================================================".into());
            line(format!("geometry                 {} sets x {} ways", self.sets, self.ways));
            line(format!("accesses                 {}", st.accesses));
            line(format!("hits                     {}", st.hits));
            line(format!("misses                   {}", st.misses));
            line(format!("hit_rate                 {:.4}", st.hit_rate()));
            line(format!("bypasses                 {}", st.bypasses));
            line(format!("victims.invalid          {}", st.invalid_victims));
            line(format!("victims.dead             {}", st.dead_victims));
            line(format!("victims.scan             {}", st.scan_victims));
            line(format!(
                "aging_rounds             {} (max {})",
                st.aging_rounds, st.max_aging_rounds
            ));
            line(format!("evictions.unreused       {}", st.unreused_evictions));
            line("----------------------------------------------------------".into());
        }
        if want("insertion") {
            line("INSERTION MIX".into());
            let rows = [
                ("streaming", st.fills.streaming),
                ("dead_block", st.fills.dead_block),
                ("ship_reused", st.fills.ship_reused),
                ("ship_dead", st.fills.ship_dead),
                ("srrip", st.fills.srrip),
                ("brrip", st.fills.brrip),
                ("mru", st.fills.mru),
            ];
            for (name, count) in rows {
                line(format!(
                    "  fills.{name:<17} {count} ({:.2}%)",
                    count as f64 / fills * 100.0
                ));
            }
            line("----------------------------------------------------------".into());
        }
        if want("ship") {
            if let Some(hist) = &self.signature_histogram {
                line("SHIP-LITE".into());
                for (value, count) in hist.iter().enumerate() {
                    line(format!("  signatures.ctr{value:<11} {count}"));
                }
                line(format!("  decays                 {}", st.ship_decays));
                line("----------------------------------------------------------".into());
            }
        }
        if want("stream") {
            if let Some(streaming) = self.streaming_sets {
                line("STREAMING".into());
                line(format!(
                    "  sets.streaming         {streaming} / {} ({:.2}%)",
                    self.sets,
                    streaming as f64 / self.sets.max(1) as f64 * 100.0
                ));
                if let Some(dead) = self.dead_blocks {
                    line(format!("  blocks.dead            {dead}"));
                    line(format!("  dead_decays            {}", st.dead_decays));
                }
                line("----------------------------------------------------------".into());
            }
        }
        if want("dueling") {
            if let Some(d) = &self.dueling {
                line("SET DUELING".into());
                line(format!("  psel                   {} / {}", d.psel, d.psel_max));
                line(format!("  winner                 {:?}", d.winner));
                line(format!("  winner_changes         {}", st.winner_changes));
                line("----------------------------------------------------------".into());
            }
        }
        out
    }
}

/// Compact periodic status line.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct Heartbeat {
    /// Accesses so far.
    pub accesses: u64,
    /// Hits so far.
    pub hits: u64,
    /// Misses so far.
    pub misses: u64,
    /// PSEL, when dueling is enabled.
    pub psel: Option<u16>,
    /// Streaming sets, when the detector is enabled.
    pub streaming_sets: Option<usize>,
}

impl fmt::Display for Heartbeat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rate = if self.accesses == 0 {
            0.0
        } else {
            self.hits as f64 / self.accesses as f64
        };
        write!(
            f,
            "accesses={} hits={} misses={} hit_rate={rate:.4}",
            self.accesses, self.hits, self.misses
        )?;
        if let Some(psel) = self.psel {
            write!(f, " psel={psel}")?;
        }
        if let Some(streaming) = self.streaming_sets {
            write!(f, " streaming_sets={streaming}")?;
        }
        Ok(())
    }
}
