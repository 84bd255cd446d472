mod common;

use std::collections::BTreeSet;

use proptest::prelude::*;
use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rbtree::RBTree;

use crate::common::init_tracing;

/// `height <= 2 * log2(size + 1)`, in integers.
fn assert_height_bound<K, C>(tree: &RBTree<K, C>) {
    let size = tree.size() as u64;
    let bound = 2 * u64::from((size + 1).ilog2() + 1);
    assert!(
        (tree.height() as u64) <= bound,
        "height {} exceeds bound {bound} for size {size}",
        tree.height()
    );
}

#[derive(Debug, Clone)]
enum Action {
    Insert(u16),
    Remove(u16),
}

fn action() -> impl Strategy<Value = Action> {
    prop_oneof![
        3 => any::<u16>().prop_map(|k| Action::Insert(k % 512)),
        2 => any::<u16>().prop_map(|k| Action::Remove(k % 512)),
    ]
}

proptest! {
    #[test]
    fn inserts_are_sorted_and_unique(input in proptest::collection::vec(any::<i32>(), 0..500)) {
        let mut tree = RBTree::new();
        for key in &input {
            tree.insert(*key);
        }
        tree.assert_valid();

        let expected: Vec<_> = input.iter().copied().collect::<BTreeSet<_>>().into_iter().collect();
        let actual: Vec<_> = tree.iter().copied().collect();
        prop_assert_eq!(actual, expected);
    }

    #[test]
    fn random_actions_match_model(actions in proptest::collection::vec(action(), 1..750)) {
        let mut tree = RBTree::new();
        let mut model = BTreeSet::new();

        for action in actions {
            match action {
                Action::Insert(key) => {
                    tracing::debug!("inserting {key}");
                    let (_, inserted) = tree.insert(key);
                    prop_assert_eq!(inserted, model.insert(key));
                }
                Action::Remove(key) => {
                    tracing::debug!("removing {key}");
                    prop_assert_eq!(tree.remove(&key), model.take(&key));
                }
            }

            tree.assert_valid();
            prop_assert_eq!(tree.size(), model.len());
        }

        prop_assert!(tree.iter().eq(model.iter()));
        assert_height_bound(&tree);
    }

    #[test]
    fn duplicate_insert_changes_nothing(
        input in proptest::collection::btree_set(any::<u32>(), 1..200),
        pick in any::<prop::sample::Index>(),
    ) {
        let mut tree: RBTree<u32> = input.iter().copied().collect();
        let before: Vec<_> = tree.iter().copied().collect();
        let height = tree.height();

        let key = *pick.get(&before);
        let (cursor, inserted) = tree.insert(key);
        prop_assert!(!inserted);
        prop_assert_eq!(cursor.get(), Some(&key));

        prop_assert_eq!(tree.size(), before.len());
        prop_assert_eq!(tree.height(), height);
        prop_assert!(tree.iter().eq(before.iter()));
    }

    #[test]
    fn insert_then_erase(
        input in proptest::collection::btree_set(any::<u32>(), 0..200),
        key in any::<u32>(),
    ) {
        let mut tree: RBTree<u32> = input.iter().copied().collect();
        let (_, inserted) = tree.insert(key);
        let size = tree.size();

        prop_assert_eq!(tree.remove(&key), Some(key));
        prop_assert_eq!(tree.size(), size - 1);
        prop_assert!(!tree.contains(&key));
        prop_assert_eq!(inserted, !input.contains(&key));
        tree.assert_valid();
    }

    #[test]
    fn bounds_match_model(
        input in proptest::collection::btree_set(0_u32..1000, 0..200),
        probe in 0_u32..1100,
    ) {
        let tree: RBTree<u32> = input.iter().copied().collect();

        prop_assert_eq!(tree.lower_bound(&probe).get(), input.range(probe..).next());
        prop_assert_eq!(
            tree.upper_bound(&probe).get(),
            input.range((std::ops::Bound::Excluded(probe), std::ops::Bound::Unbounded)).next()
        );
        prop_assert!(tree.range(probe / 2..probe).eq(input.range(probe / 2..probe)));
    }
}

#[test]
fn height_bound_at_scale() {
    init_tracing();

    let mut rng = StdRng::seed_from_u64(0x5eed);
    let mut keys: Vec<u32> = (0..10_000).collect();
    keys.shuffle(&mut rng);

    let mut tree = RBTree::new();
    for (i, key) in keys.iter().enumerate() {
        tree.insert(*key);
        if i % 1000 == 0 {
            tree.assert_valid();
            assert_height_bound(&tree);
        }
    }
    tree.assert_valid();
    assert_height_bound(&tree);

    keys.shuffle(&mut rng);
    for (i, key) in keys.iter().enumerate() {
        assert_eq!(tree.remove(key), Some(*key));
        if i % 1000 == 0 {
            tree.assert_valid();
            assert_height_bound(&tree);
        }
    }
    assert!(tree.is_empty());
    tree.assert_valid();
}

#[test]
fn sorted_inserts_at_scale() {
    let tree: RBTree<u32> = (0..10_000).collect();
    tree.assert_valid();
    assert_height_bound(&tree);

    let tree: RBTree<u32> = (0..10_000).rev().collect();
    tree.assert_valid();
    assert_height_bound(&tree);
}
