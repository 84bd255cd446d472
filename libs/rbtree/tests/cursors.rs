mod common;

use rbtree::RBTree;

use crate::common::init_tracing;

#[test]
fn forward_walk_wraps_through_end() {
    init_tracing();

    let tree = RBTree::from([2, 4, 6]);
    let mut cursor = tree.begin();

    let mut seen = Vec::new();
    while let Some(key) = cursor.get() {
        seen.push(*key);
        cursor.move_next();
    }
    assert_eq!(seen, [2, 4, 6]);
    assert!(cursor.is_end());
    assert_eq!(cursor, tree.end());

    // moving on from end wraps around to the first key
    cursor.move_next();
    assert_eq!(cursor.get(), Some(&2));
    assert_eq!(cursor, tree.begin());
}

#[test]
fn backward_walk_from_end() {
    let tree = RBTree::from([2, 4, 6]);
    let mut cursor = tree.end();

    cursor.move_prev();
    assert_eq!(cursor.get(), Some(&6));
    cursor.move_prev();
    assert_eq!(cursor.get(), Some(&4));
    cursor.move_prev();
    assert_eq!(cursor.get(), Some(&2));
    cursor.move_prev();
    assert!(cursor.is_end());
}

#[test]
fn peeking_does_not_move() {
    let tree = RBTree::from([1, 2, 3]);
    let cursor = tree.find(&2);

    assert_eq!(cursor.peek_prev(), Some(&1));
    assert_eq!(cursor.peek_next(), Some(&3));
    assert_eq!(cursor.get(), Some(&2));

    let end = tree.end();
    assert_eq!(end.peek_next(), Some(&1));
    assert_eq!(end.peek_prev(), Some(&3));

    let last = tree.find(&3);
    assert_eq!(last.peek_next(), None);
}

#[test]
fn empty_tree_cursors() {
    let tree: RBTree<u8> = RBTree::new();

    assert_eq!(tree.begin(), tree.end());
    let mut cursor = tree.begin();
    cursor.move_next();
    assert!(cursor.is_end());
    cursor.move_prev();
    assert!(cursor.is_end());
    assert_eq!(cursor.get(), None);
}

#[test]
fn cursors_of_different_trees_differ() {
    let a = RBTree::from([1]);
    let b = RBTree::from([1]);

    assert_ne!(a.begin(), b.begin());
    assert_ne!(a.end(), b.end());
}

#[test]
fn remove_current_advances() {
    init_tracing();

    let mut tree: RBTree<u32> = (0..10).collect();

    let mut cursor = tree.find_mut(&4);
    assert_eq!(cursor.remove_current(), Some(4));
    assert_eq!(cursor.get(), Some(&5));
    assert_eq!(cursor.peek_prev(), Some(&3));

    // remove every even key through a single cursor
    let mut cursor = tree.begin_mut();
    while let Some(key) = cursor.get() {
        if key % 2 == 0 {
            cursor.remove_current();
        } else {
            cursor.move_next();
        }
    }
    assert!(cursor.is_end());
    assert_eq!(cursor.remove_current(), None);

    tree.assert_valid();
    assert_eq!(tree.iter().copied().collect::<Vec<_>>(), [1, 3, 5, 7, 9]);
}

#[test]
fn remove_current_at_the_last_key_reaches_end() {
    let mut tree = RBTree::from([1, 2]);

    let mut cursor = tree.end_mut();
    cursor.move_prev();
    assert_eq!(cursor.remove_current(), Some(2));
    assert!(cursor.is_end());
    assert_eq!(cursor.as_cursor().peek_prev(), Some(&1));

    tree.assert_valid();
    assert_eq!(tree.size(), 1);
}

#[test]
fn keys_stay_in_place_across_removals() {
    let mut tree: RBTree<u32> = (0..64).collect();

    let addresses = |tree: &RBTree<u32>| -> Vec<(u32, *const u32)> {
        tree.iter().map(|key| (*key, std::ptr::from_ref(key))).collect()
    };
    let before = addresses(&tree);

    // inner nodes with two children are replaced by their successor node, which keeps its key
    for key in [31, 15, 47, 7, 0, 63] {
        tree.remove(&key);
        tree.assert_valid();
    }

    let after = addresses(&tree);
    for (key, ptr) in &after {
        assert!(before.contains(&(*key, *ptr)), "key {key} was moved");
    }
    assert_eq!(after.len(), 58);
}

#[test]
fn iterators_agree() {
    let tree: RBTree<u32> = [5, 3, 8, 1, 4, 7, 9].into();

    let forward: Vec<_> = tree.iter().copied().collect();
    let mut backward: Vec<_> = tree.iter().rev().copied().collect();
    backward.reverse();
    assert_eq!(forward, backward);
    assert_eq!(forward, [1, 3, 4, 5, 7, 8, 9]);

    let by_ref: Vec<_> = (&tree).into_iter().copied().collect();
    assert_eq!(forward, by_ref);

    // meeting in the middle yields every key exactly once
    let mut iter = tree.iter();
    let mut seen = Vec::new();
    while let (Some(front), back) = (iter.next(), iter.next_back()) {
        seen.push(*front);
        if let Some(back) = back {
            seen.push(*back);
        }
    }
    seen.sort_unstable();
    assert_eq!(seen, forward);
    assert_eq!(iter.next(), None);
}
