//! Property-based tests for the red-black aggregation map.

use proptest::prelude::*;
use rustc_hash::FxHashMap;
use tally::{AggregationMap, Aggregator, LinearList, Record};

// =============================================================================
// Test helpers
// =============================================================================

/// Keys drawn from a small alphabet so duplicates are common.
fn arbitrary_key() -> impl Strategy<Value = String> {
    return "[a-e]{1,3}";
}

fn arbitrary_records(max: usize) -> impl Strategy<Value = Vec<Record>> {
    return prop::collection::vec(
        (arbitrary_key(), 0u64..1_000).prop_map(|(key, count)| Record::new(key, count)),
        0..max,
    );
}

/// Reference totals computed with a hash map.
fn oracle(records: &[Record]) -> FxHashMap<String, u64> {
    let mut totals = FxHashMap::default();
    for record in records {
        *totals.entry(record.key.clone()).or_insert(0) += record.count;
    }
    return totals;
}

fn height_bound(distinct: usize) -> f64 {
    return 2.0 * ((distinct + 1) as f64).log2();
}

// =============================================================================
// Structural properties
// =============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(256))]

    /// Every insert sequence leaves a valid red-black tree.
    #[test]
    fn invariants_hold_after_any_inserts(records in arbitrary_records(200)) {
        let mut map = AggregationMap::new();
        for record in &records {
            map.insert(&record.key, record.count);
            prop_assert!(map.check_invariants().is_ok());
        }
    }

    /// Height never exceeds 2 * log2(n + 1).
    #[test]
    fn height_is_bounded(keys in prop::collection::vec("[a-z]{1,8}", 0..300)) {
        let mut map = AggregationMap::new();
        for key in &keys {
            map.insert(key, 1);
        }
        prop_assert!(map.height() as f64 <= height_bound(map.len()));
    }

    /// Sorted input is the worst case for an unbalanced tree.
    #[test]
    fn sorted_input_stays_balanced(n in 1usize..2_000, descending in any::<bool>()) {
        let mut keys: Vec<String> = (0..n).map(|i| format!("{:05}", i)).collect();
        if descending {
            keys.reverse();
        }
        let mut map = AggregationMap::new();
        for key in &keys {
            map.insert(key, 1);
        }
        prop_assert!(map.check_invariants().is_ok());
        prop_assert!(map.height() as f64 <= height_bound(n));
    }
}

// =============================================================================
// Aggregation properties
// =============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(256))]

    /// Totals match a hash-map oracle, and absent keys are not found.
    #[test]
    fn totals_match_oracle(records in arbitrary_records(300), probe in "[a-f]{1,3}") {
        let map: AggregationMap = records.iter().cloned().collect();
        let expected = oracle(&records);

        prop_assert_eq!(map.len(), expected.len());
        for (key, total) in &expected {
            prop_assert_eq!(map.get(key), Some(*total));
        }
        prop_assert_eq!(map.get(&probe), expected.get(&probe).copied());
    }

    /// Grand total is the sum of inputs and the sum of node totals.
    #[test]
    fn grand_total_is_consistent(records in arbitrary_records(300)) {
        let map: AggregationMap = records.iter().cloned().collect();
        let inserted: u64 = records.iter().map(|r| r.count).sum();
        let stored: u64 = map.iter().map(|(_, total)| total).sum();

        prop_assert_eq!(map.grand_total(), inserted);
        prop_assert_eq!(stored, inserted);
    }

    /// A second insert of an existing key changes its total but not the key count.
    #[test]
    fn duplicate_insert_merges(records in arbitrary_records(100), c1 in 0u64..1_000, c2 in 0u64..1_000) {
        let mut map: AggregationMap = records.iter().cloned().collect();
        map.insert("zz", c1);
        let len = map.len();
        let before = map.get("zz").unwrap_or(0);

        map.insert("zz", c2);
        prop_assert_eq!(map.len(), len);
        prop_assert_eq!(map.get("zz"), Some(before + c2));
    }

    /// The map and the linear baseline agree on every key.
    #[test]
    fn strategies_agree(records in arbitrary_records(300)) {
        let map: AggregationMap = records.iter().cloned().collect();
        let list: LinearList = records.iter().cloned().collect();

        prop_assert_eq!(map.grand_total(), list.grand_total());
        for key in oracle(&records).keys() {
            prop_assert_eq!(map.lookup(key).ok(), Some(list.total_for(key).unwrap_or(0)));
            prop_assert_eq!(Aggregator::total(&map, key), Aggregator::total(&list, key));
        }
    }
}
