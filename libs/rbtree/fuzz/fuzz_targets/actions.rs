#![no_main]

use std::collections::BTreeSet;

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use rbtree::RBTree;

#[derive(Debug, Arbitrary)]
enum Action {
    Insert(u8),
    InsertOrAssign(u8),
    Remove(u8),
    PopFirst,
    PopLast,
    RemoveAtCursor(u8),
    Merge(Vec<u8>),
    Retain(u8),
    Clear,
}

fuzz_target!(|actions: Vec<Action>| {
    let mut tree: RBTree<u8> = RBTree::new();
    let mut model: BTreeSet<u8> = BTreeSet::new();

    for action in actions {
        match action {
            Action::Insert(key) => {
                let (_, inserted) = tree.insert(key);
                assert_eq!(inserted, model.insert(key));
            }
            Action::InsertOrAssign(key) => {
                let (_, inserted) = tree.insert_or_assign(key);
                assert_eq!(inserted, model.insert(key));
            }
            Action::Remove(key) => {
                assert_eq!(tree.remove(&key), model.take(&key));
            }
            Action::PopFirst => {
                assert_eq!(tree.pop_first(), model.pop_first());
            }
            Action::PopLast => {
                assert_eq!(tree.pop_last(), model.pop_last());
            }
            Action::RemoveAtCursor(key) => {
                let mut cursor = tree.lower_bound_mut(&key);
                let removed = cursor.remove_current();
                let next = cursor.get().copied();

                let expected = model.range(key..).next().copied();
                assert_eq!(removed, expected);
                if let Some(removed) = removed {
                    model.remove(&removed);
                    assert_eq!(next, model.range(removed..).next().copied());
                }
            }
            Action::Merge(keys) => {
                let mut other: RBTree<u8> = keys.iter().copied().collect();
                let other_model: BTreeSet<u8> = keys.into_iter().collect();

                tree.merge(&mut other);
                other.assert_valid();

                assert!(other.iter().eq(other_model.intersection(&model)));
                model.extend(other_model);
            }
            Action::Retain(modulus) => {
                let modulus = modulus.max(1);
                tree.retain(|key| key % modulus != 0);
                model.retain(|key| key % modulus != 0);
            }
            Action::Clear => {
                tree.clear();
                model.clear();
            }
        }

        tree.assert_valid();
        assert_eq!(tree.size(), model.len());
        assert!(tree.iter().eq(model.iter()));
    }
});
