#![no_main]

use libfuzzer_sys::fuzz_target;
use rbtree::RBTree;

fuzz_target!(|inserts: Vec<usize>| {
    let mut tree: RBTree<usize> = RBTree::new();

    for i in inserts {
        tree.insert(i);
        tree.assert_valid();
    }
});
