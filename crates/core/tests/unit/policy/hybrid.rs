//! Composite Policy Scenarios.
//!
//! Drives `ShipStreamDrrip` through the test harness and checks the
//! insertion priority (streaming, dead block, SHiP, dueling), training on
//! hits and evictions, and the invariants that must hold for any access
//! sequence.

use std::io;
use std::sync::{Arc, Mutex};

use llcrepl_core::common::{Access, BlockView};
use llcrepl_core::config::Config;
use llcrepl_core::policy::dueling::{DuelPolicy, SetRole};
use llcrepl_core::policy::{ReplacementPolicy, ShipStreamDrrip, Victim};
use proptest::prelude::*;
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::util::SubscriberInitExt;

use crate::common::{Harness, Outcome, config, srrip_only};

const PC: u64 = 0x0040_1a2c;

fn build(config: &Config) -> (ShipStreamDrrip, Harness) {
    let policy = ShipStreamDrrip::new(config).unwrap();
    let harness = Harness::new(config.geometry.sets, config.geometry.ways);
    (policy, harness)
}

// ══════════════════════════════════════════════════════════
// 1. End-to-end scenarios
// ══════════════════════════════════════════════════════════

/// 20 stride-64 accesses to one follower set: the set is streaming from the
/// 4th access, every fill from then on is distant, and nothing hits.
#[test]
fn stride_stream_inserts_distant() {
    let config = Config::default();
    let (mut policy, mut harness) = build(&config);
    let set = 1;
    assert_eq!(policy.set_role(set), Some(SetRole::Follower));

    for i in 0..20u64 {
        let outcome = harness.access(&mut policy, set, PC, i * 64);
        let Outcome::Fill(way) = outcome else {
            panic!("access {i} did not fill: {outcome:?}");
        };
        if i >= 3 {
            assert!(policy.is_streaming(set), "access {i}");
            assert_eq!(policy.rrpv(set, way), 3, "access {i}");
        } else {
            assert!(!policy.is_streaming(set), "access {i}");
            assert_eq!(policy.rrpv(set, way), 2, "access {i}");
        }
    }

    let stats = policy.stats();
    assert_eq!(stats.hits, 0);
    assert_eq!(stats.misses, 20);
    assert_eq!(stats.fills.streaming, 17);
    assert_eq!(stats.fills.srrip, 3);
    assert_eq!(policy.stream_confidence(set), Some(3));
}

/// With bypass enabled the stream fills the empty ways, then bypasses.
#[test]
fn stride_stream_bypasses_once_the_set_is_full() {
    let mut config = Config::default();
    config.stream.bypass = true;
    let (mut policy, mut harness) = build(&config);
    let set = 1;

    let outcomes: Vec<Outcome> = (0..20u64)
        .map(|i| harness.access(&mut policy, set, PC, i * 64))
        .collect();

    assert!(outcomes[..16].iter().all(|o| matches!(o, Outcome::Fill(_))));
    assert!(outcomes[16..].iter().all(|o| *o == Outcome::Bypass));
    assert_eq!(policy.stats().bypasses, 4);
    assert_eq!(policy.stats().hits, 0);
    // Bypassed lines never displaced anything.
    assert_eq!(harness.line(set, 0), Some(0));
}

/// The same line and PC 20 times: one fill, then 19 hits that promote the
/// block to RRPV 0 and saturate its signature's counter.
#[test]
fn repeated_line_is_promoted_and_trains_ship() {
    let config = Config::default();
    let (mut policy, mut harness) = build(&config);
    let addr = 0x8000;

    assert_eq!(harness.access(&mut policy, 0, PC, addr), Outcome::Fill(0));
    // Set 0 leads for SRRIP.
    assert_eq!(policy.rrpv(0, 0), 2);

    for _ in 1..20 {
        assert_eq!(harness.access(&mut policy, 0, PC, addr), Outcome::Hit(0));
        assert_eq!(policy.rrpv(0, 0), 0);
    }

    assert!(policy.is_reused(0, 0));
    assert_eq!(policy.ship_outcome(PC, addr), Some(3));
    assert_eq!(policy.stats().hits, 19);
    assert_eq!(policy.stats().misses, 1);
    assert_eq!(policy.stream_confidence(0), Some(0));
}

// ══════════════════════════════════════════════════════════
// 2. Insertion priority
// ══════════════════════════════════════════════════════════

/// Two hits under a signature make later fills under that signature insert
/// at RRPV 0, in any set.
#[test]
fn ship_reused_signature_inserts_near() {
    let config = Config::default();
    let (mut policy, mut harness) = build(&config);

    let _ = harness.access(&mut policy, 5, PC, 0x1000);
    let _ = harness.access(&mut policy, 5, PC, 0x1000);
    let _ = harness.access(&mut policy, 5, PC, 0x1000);
    assert_eq!(policy.ship_outcome(PC, 0), Some(3));

    let Outcome::Fill(way) = harness.access(&mut policy, 7, PC, 0x9000) else {
        panic!("expected a fill");
    };
    assert_eq!(policy.rrpv(7, way), 0);
    assert_eq!(policy.stats().fills.ship_reused, 1);
}

/// An unreused eviction drives the signature to zero; the next fill under it
/// inserts at RRPV_MAX.
#[test]
fn ship_dead_signature_inserts_distant() {
    let mut config = srrip_only(4, 2);
    config.ship.enabled = true;
    let (mut policy, mut harness) = build(&config);

    assert_eq!(harness.access(&mut policy, 0, PC, 0x100), Outcome::Fill(0));
    assert_eq!(harness.access(&mut policy, 0, PC, 0x200), Outcome::Fill(1));
    // Both at RRPV 2: one aging round, way 0 goes.
    assert_eq!(harness.access(&mut policy, 0, PC, 0x300), Outcome::Fill(0));

    assert_eq!(policy.ship_outcome(PC, 0), Some(0));
    assert_eq!(policy.rrpv(0, 0), 3);
    let stats = policy.stats();
    assert_eq!(stats.fills.ship_dead, 1);
    assert_eq!(stats.unreused_evictions, 1);
    assert_eq!(stats.aging_rounds, 1);
}

/// The evicted block's signature is penalized, not the incoming one.
#[test]
fn eviction_trains_the_evicted_signature() {
    let mut config = srrip_only(4, 1);
    config.ship.enabled = true;
    let (mut policy, mut harness) = build(&config);
    let other_pc = 0x0050_0000;
    let victim_sig = policy.signature(PC, 0);
    assert_ne!(victim_sig, policy.signature(other_pc, 0));

    let _ = harness.access(&mut policy, 0, PC, 0x100);
    let _ = harness.access(&mut policy, 0, other_pc, 0x200);

    assert_eq!(policy.ship_outcome(PC, 0), Some(0));
    assert_eq!(policy.ship_outcome(other_pc, 0), Some(1));
    assert_eq!(policy.fill_signature(0, 0), policy.signature(other_pc, 0).unwrap());
}

/// A slot whose occupants keep dying unreused saturates its dead counter,
/// receives distant insertions and becomes the preferred victim.
#[test]
fn dead_slot_inserts_distant_and_is_evicted_first() {
    let mut config = srrip_only(4, 2);
    config.dead_block.enabled = true;
    let (mut policy, mut harness) = build(&config);

    let ways: Vec<Outcome> = (1..=7u64)
        .map(|i| harness.access(&mut policy, 0, PC, i * 0x1000))
        .collect();
    assert_eq!(
        ways,
        vec![
            Outcome::Fill(0),
            Outcome::Fill(1),
            Outcome::Fill(0),
            Outcome::Fill(1),
            Outcome::Fill(0),
            Outcome::Fill(1),
            Outcome::Fill(0),
        ]
    );
    assert_eq!(policy.dead_counter(0, 0), Some(3));
    assert_eq!(policy.dead_counter(0, 1), Some(2));
    assert_eq!(policy.rrpv(0, 0), 3);
    assert_eq!(policy.stats().fills.dead_block, 1);

    // Both ways sit at RRPV 3; the dead check claims way 0 before the scan.
    assert_eq!(harness.access(&mut policy, 0, PC, 0x8000), Outcome::Fill(0));
    assert_eq!(policy.stats().dead_victims, 1);

    // A hit clears the slot.
    assert_eq!(harness.access(&mut policy, 0, PC, 0x8000), Outcome::Hit(0));
    assert_eq!(policy.dead_counter(0, 0), Some(0));
    assert!(policy.is_reused(0, 0));
}

#[test]
fn dead_counters_decay() {
    let mut config = srrip_only(4, 2);
    config.dead_block.enabled = true;
    config.dead_block.decay_interval = 4;
    let (mut policy, mut harness) = build(&config);

    for i in 1..=3u64 {
        let _ = harness.access(&mut policy, 0, PC, i * 0x1000);
    }
    assert_eq!(policy.dead_counter(0, 0), Some(1));
    let _ = harness.access(&mut policy, 0, PC, 0x4000);
    // The 4th access evicted way 1 (counter 1), then the decay ran.
    assert_eq!(policy.dead_counter(0, 0), Some(0));
    assert_eq!(policy.dead_counter(0, 1), Some(0));
    assert_eq!(policy.stats().dead_decays, 1);
}

/// One miss in an SRRIP leader tips PSEL past the midpoint; followers then
/// insert BRRIP-style.
#[test]
fn followers_switch_to_brrip() {
    let mut config = srrip_only(64, 4);
    config.dueling.enabled = true;
    config.dueling.leader_sets = 4;
    let (mut policy, mut harness) = build(&config);

    assert_eq!(policy.duel_policy(1), DuelPolicy::Srrip);
    let _ = harness.access(&mut policy, 0, PC, 0x40);
    assert_eq!(policy.psel(), Some(513));
    assert_eq!(policy.duel_policy(1), DuelPolicy::Brrip);
    assert_eq!(policy.stats().winner_changes, 1);

    let Outcome::Fill(way) = harness.access(&mut policy, 1, PC, 0x80) else {
        panic!("expected a fill");
    };
    // The seeded generator does not pick the rare near insertion here.
    assert_eq!(policy.rrpv(1, way), 3);
    assert_eq!(policy.stats().fills.brrip, 1);

    // A BRRIP-leader miss pulls PSEL back; the hit that follows does not move it.
    let _ = harness.access(&mut policy, 8, PC, 0xc0);
    let _ = harness.access(&mut policy, 8, PC, 0xc0);
    assert_eq!(policy.psel(), Some(512));
}

/// A BRRIP leader inserts distant most of the time and near about once in
/// `brrip_inverse_probability` fills.
#[test]
fn brrip_leader_mixes_near_and_distant_fills() {
    let mut config = srrip_only(64, 4);
    config.dueling.enabled = true;
    config.dueling.leader_sets = 4;
    let (mut policy, mut harness) = build(&config);
    let set = 8;
    assert_eq!(policy.set_role(set), Some(SetRole::BrripLeader));

    let mut depths = [0u64; 4];
    for i in 0..1000u64 {
        let Outcome::Fill(way) = harness.access(&mut policy, set, PC, (i + 1) * 0x1000) else {
            panic!("access {i} did not fill");
        };
        depths[usize::from(policy.rrpv(set, way))] += 1;
    }

    let (near, distant) = (depths[2], depths[3]);
    assert_eq!(depths[0] + depths[1], 0);
    assert_eq!(near + distant, 1000);
    assert_eq!(policy.stats().fills.brrip, 1000);
    // About 1000 / 32 near fills are expected.
    assert!((10..=60).contains(&near), "near fills: {near}");
    assert!(distant > near);
}

/// The outcome table loses one step of confidence every `decay_interval`
/// accesses, and only while SHiP is enabled.
#[test]
fn ship_table_decays_on_its_interval() {
    let mut config = srrip_only(4, 2);
    config.ship.enabled = true;
    config.ship.decay_interval = 2;
    let (mut policy, mut harness) = build(&config);
    let addr = 0x40;

    assert_eq!(harness.access(&mut policy, 0, PC, addr), Outcome::Fill(0));
    assert_eq!(policy.ship_outcome(PC, addr), Some(1));
    assert_eq!(policy.stats().ship_decays, 0);

    // The hit raises the counter to 2, then the decay on access 2 takes it back.
    assert_eq!(harness.access(&mut policy, 0, PC, addr), Outcome::Hit(0));
    assert_eq!(policy.ship_outcome(PC, addr), Some(1));
    assert_eq!(policy.stats().ship_decays, 1);

    for _ in 0..2 {
        let _ = harness.access(&mut policy, 0, PC, addr);
    }
    assert_eq!(policy.ship_outcome(PC, addr), Some(2));
    assert_eq!(policy.stats().ship_decays, 2);

    config.ship.enabled = false;
    let (mut policy, mut harness) = build(&config);
    for _ in 0..4 {
        let _ = harness.access(&mut policy, 0, PC, addr);
    }
    assert_eq!(policy.stats().ship_decays, 0);
}

#[test]
fn streaming_overrides_a_reused_signature() {
    let config = Config::default();
    let (mut policy, mut harness) = build(&config);

    // Train the PC as reused in another set.
    for _ in 0..3 {
        let _ = harness.access(&mut policy, 9, PC, 0x100);
    }
    for i in 0..5u64 {
        let _ = harness.access(&mut policy, 1, PC, i * 64);
    }
    let stats = policy.stats();
    assert_eq!(stats.fills.ship_reused, 3);
    assert_eq!(stats.fills.streaming, 2);
}

// ══════════════════════════════════════════════════════════
// 3. Contract edges
// ══════════════════════════════════════════════════════════

#[test]
fn empty_view_uses_internal_validity() {
    let mut policy = ShipStreamDrrip::new(&srrip_only(4, 2)).unwrap();
    let access = Access::load(0, PC, 0x40);
    assert_eq!(policy.find_victim(&access, &[]), Victim::Way(0));
    policy.update(&access, Some(0), 0, false);
    assert_eq!(policy.find_victim(&access, &[]), Victim::Way(1));
}

#[test]
fn view_validity_takes_precedence() {
    let mut policy = ShipStreamDrrip::new(&srrip_only(4, 4)).unwrap();
    let mut view = vec![
        BlockView {
            valid: true,
            addr: 0x40
        };
        4
    ];
    view[3].valid = false;
    assert_eq!(
        policy.find_victim(&Access::load(0, PC, 0x80), &view),
        Victim::Way(3)
    );
}

/// Log sink shared between the subscriber and the test.
#[derive(Clone, Default)]
struct Capture(Arc<Mutex<Vec<u8>>>);

impl io::Write for Capture {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Victim events carry the line address the harness reported for the way.
#[test]
fn victim_trace_reports_the_viewed_address() {
    let capture = Capture::default();
    let sink = capture.clone();
    let _guard = tracing_subscriber::fmt()
        .with_max_level(LevelFilter::TRACE)
        .with_ansi(false)
        .with_writer(move || sink.clone())
        .set_default();

    let (mut policy, mut harness) = build(&srrip_only(4, 2));
    for addr in [0x1000, 0x2000, 0x3000] {
        let _ = harness.access(&mut policy, 0, PC, addr);
    }

    let log = String::from_utf8(capture.0.lock().unwrap().clone()).unwrap();
    let victim = log
        .lines()
        .find(|l| l.contains("rrip victim"))
        .unwrap_or_else(|| panic!("no victim event in:\n{log}"));
    assert!(victim.contains("way=0"), "{victim}");
    assert!(victim.contains("addr=4096"), "{victim}");
}

#[test]
fn out_of_range_indices_are_reduced() {
    let config = config(16, 4);
    let mut policy = ShipStreamDrrip::new(&config).unwrap();
    let access = Access::load(16 + 3, PC, 0x40);
    let Victim::Way(way) = policy.find_victim(&access, &[]) else {
        panic!("cold set bypassed");
    };
    policy.update(&access, Some(way + 4), 0, false);
    policy.update(&access, Some(way + 8), 0, true);
    assert_eq!(policy.rrpv(3, way), 0);
    assert!(policy.is_reused(3, way));
}

#[test]
fn invalid_config_is_rejected() {
    let mut config = Config::default();
    config.geometry.sets = 3;
    assert!(ShipStreamDrrip::new(&config).is_err());
}

#[test]
fn report_reflects_component_state() {
    let config = Config::default();
    let (mut policy, mut harness) = build(&config);
    for i in 0..6u64 {
        let _ = harness.access(&mut policy, 1, PC, i * 64);
    }

    let report = policy.report();
    assert_eq!(report.policy, "ship-stream-drrip");
    assert_eq!(report.sets, 2048);
    assert_eq!(report.ways, 16);
    assert_eq!(report.streaming_sets, Some(1));
    assert_eq!(report.dead_blocks, Some(0));
    let histogram = report.signature_histogram.unwrap();
    assert_eq!(histogram.len(), 4);
    assert_eq!(histogram.iter().sum::<u64>(), 64);
    let dueling = report.dueling.unwrap();
    assert_eq!(dueling.psel, 512);
    assert_eq!(dueling.psel_max, 1023);
    assert_eq!(dueling.winner, DuelPolicy::Srrip);

    let beat = policy.heartbeat();
    assert_eq!(beat.accesses, 6);
    assert_eq!(beat.streaming_sets, Some(1));
}

// ══════════════════════════════════════════════════════════
// 4. Invariants under arbitrary traffic
// ══════════════════════════════════════════════════════════

proptest! {
    #[test]
    fn state_stays_bounded(
        bypass in any::<bool>(),
        trace in prop::collection::vec((0usize..8, 0u64..4, 0u64..32), 1..400)
    ) {
        let mut config = config(8, 4);
        config.stream.bypass = bypass;
        config.dueling.leader_sets = 2;
        config.dueling.psel_bits = 4;
        config.dead_block.decay_interval = 64;
        let (mut policy, mut harness) = build(&config);

        for &(set, pc, line) in &trace {
            match harness.access(&mut policy, set, 0x400 + pc * 4, line * 64) {
                Outcome::Hit(way) => prop_assert_eq!(policy.rrpv(set, way), 0),
                Outcome::Fill(way) => prop_assert!(way < 4),
                Outcome::Bypass => prop_assert!(bypass),
            }
            for way in 0..4 {
                prop_assert!(policy.rrpv(set, way) <= 3);
            }
            prop_assert!(policy.psel().unwrap_or(0) <= 15);
        }

        let stats = policy.stats();
        prop_assert_eq!(stats.accesses, trace.len() as u64);
        prop_assert_eq!(stats.hits + stats.misses, stats.accesses);
        prop_assert_eq!(stats.fills.total() + stats.bypasses, stats.misses);
        prop_assert!(u64::from(stats.max_aging_rounds) <= 4);
    }
}

#[test]
fn policies_can_move_between_threads() {
    fn assert_send_sync<T: Send + Sync>() {}
    assert_send_sync::<ShipStreamDrrip>();
    assert_send_sync::<llcrepl_core::Policy>();
    assert_send_sync::<llcrepl_core::Llc>();
}
