use orthodraft_upset::{exclusive_intersection, ClusterEnumerator};
use proptest::prelude::*;
use std::collections::{BTreeMap, BTreeSet};

fn named_sets_strategy() -> impl Strategy<Value = BTreeMap<String, BTreeSet<u16>>> {
    prop::collection::btree_map(
        "[a-h]",
        prop::collection::btree_set(0u16..64, 0..24),
        0..7,
    )
}

proptest! {
    #![proptest_config(ProptestConfig {
        cases: 256,
        failure_persistence: None,
        ..ProptestConfig::default()
    })]

    #[test]
    fn exclusive_sets_partition_the_union(sets in named_sets_strategy()) {
        let clusters = ClusterEnumerator::new(false).enumerate(&sets).unwrap();
        let union: BTreeSet<u16> = sets.values().flatten().copied().collect();

        prop_assert_eq!(clusters.len(), (1usize << sets.len()) - 1);
        prop_assert_eq!(clusters.total(), union.len());

        let mut seen = BTreeSet::new();
        for c in clusters.iter() {
            for x in &c.members {
                prop_assert!(seen.insert(*x), "element {} in two clusters", x);
            }
        }
        prop_assert_eq!(seen, union);
    }

    #[test]
    fn enumeration_agrees_with_definition(sets in named_sets_strategy()) {
        for c in ClusterEnumerator::new(false).enumerate(&sets).unwrap() {
            prop_assert_eq!(&c.members, &exclusive_intersection(&sets, &c.labels));
        }
    }

    #[test]
    fn remove_zero_only_drops_empty_subsets(sets in named_sets_strategy()) {
        let all = ClusterEnumerator::new(false).counts(&sets).unwrap();
        let pruned = ClusterEnumerator::new(true).counts(&sets).unwrap();
        let expected: BTreeMap<_, _> = all.into_iter().filter(|(_, n)| *n > 0).collect();
        prop_assert_eq!(pruned, expected);
    }
}
