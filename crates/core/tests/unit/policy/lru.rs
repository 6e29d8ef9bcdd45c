//! LRU Baseline Tests.
//!
//! Victim selection through the plugin contract: invalid ways first, then the
//! bottom of the usage stack. Index 0 of the stack is MRU.

use llcrepl_core::common::{Access, BlockView};
use llcrepl_core::policy::{LruPolicy, ReplacementPolicy, Victim};

fn full(ways: usize) -> Vec<BlockView> {
    vec![
        BlockView {
            valid: true,
            addr: 0
        };
        ways
    ]
}

fn touch(policy: &mut LruPolicy, way: usize) {
    policy.update(&Access::load(0, 0, 0), Some(way), 0, true);
}

/// Fresh stack is [0, 1, 2, 3], so the last way is the LRU.
#[test]
fn initial_victim_is_last_way() {
    let mut policy = LruPolicy::new(1, 4);
    assert_eq!(policy.find_victim(&Access::load(0, 0, 0), &full(4)), Victim::Way(3));
}

#[test]
fn invalid_ways_are_filled_first() {
    let mut policy = LruPolicy::new(1, 4);
    let mut view = full(4);
    view[2].valid = false;
    assert_eq!(policy.find_victim(&Access::load(0, 0, 0), &view), Victim::Way(2));
    assert_eq!(policy.stats().invalid_victims, 1);
}

/// Access 0,1,2,3 then re-access 0: LRU becomes 1.
#[test]
fn evicts_true_lru_after_reaccess() {
    let mut policy = LruPolicy::new(1, 4);
    let access = Access::load(0, 0, 0);
    for way in 0..4 {
        touch(&mut policy, way);
    }
    assert_eq!(policy.find_victim(&access, &full(4)), Victim::Way(0));

    touch(&mut policy, 0);
    assert_eq!(policy.find_victim(&access, &full(4)), Victim::Way(1));
    assert_eq!(policy.stack_position(0, 0), 0);
    assert_eq!(policy.stack_position(0, 1), 3);
}

#[test]
fn sets_keep_separate_stacks() {
    let mut policy = LruPolicy::new(2, 2);
    policy.update(&Access::load(1, 0, 0), Some(1), 0, true);
    assert_eq!(policy.stack_position(1, 1), 0);
    assert_eq!(policy.stack_position(0, 1), 1);
}

#[test]
fn fills_are_counted_as_mru_insertions() {
    let mut policy = LruPolicy::new(1, 2);
    let access = Access::load(0, 0x400, 0x40);
    policy.update(&access, Some(0), 0, false);
    policy.update(&access, Some(0), 0, true);
    policy.update(&access, None, 0, false);

    let stats = policy.stats();
    assert_eq!(stats.accesses, 3);
    assert_eq!(stats.hits, 1);
    assert_eq!(stats.misses, 2);
    assert_eq!(stats.bypasses, 1);
    assert_eq!(stats.fills.mru, 1);
    assert_eq!(stats.fills.total(), 1);
}

#[test]
fn out_of_range_indices_are_reduced() {
    let mut policy = LruPolicy::new(4, 2);
    policy.update(&Access::load(9, 0, 0), Some(7), 0, true);
    // Set 9 -> 1, way 7 -> 1.
    assert_eq!(policy.stack_position(1, 1), 0);
}

#[test]
fn report_has_no_component_sections() {
    let report = LruPolicy::new(8, 4).report();
    assert_eq!(report.policy, "lru");
    assert_eq!(report.sets, 8);
    assert!(report.dueling.is_none());
    assert!(report.signature_histogram.is_none());
    assert!(report.streaming_sets.is_none());
}
