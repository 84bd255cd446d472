use std::collections::BTreeSet;
use std::hint::black_box;

use criterion::{Criterion, criterion_group, criterion_main};
use rand::prelude::SliceRandom;
use rbtree::RBTree;

fn rbtree(inserts: &[usize], deletes: &[usize]) {
    let mut tree: RBTree<usize> = RBTree::new();

    for i in inserts {
        tree.insert(*i);
    }

    for i in deletes {
        black_box(tree.remove(i));
    }
}

fn btree_set(inserts: &[usize], deletes: &[usize]) {
    let mut set: BTreeSet<usize> = BTreeSet::new();

    for i in inserts {
        set.insert(*i);
    }

    for i in deletes {
        black_box(set.remove(i));
    }
}

fn bench_insertions_deletions(c: &mut Criterion) {
    let mut rng = rand::rng();

    let mut nums = (0..700).collect::<Vec<_>>();
    nums.shuffle(&mut rng);
    let inserts = nums.clone();
    nums.shuffle(&mut rng);
    let deletes = nums;

    let mut group = c.benchmark_group("Insertions & Deletions");
    group.bench_function("RBTree", |b| b.iter(|| rbtree(&inserts, &deletes)));
    group.bench_function("BTreeSet", |b| b.iter(|| btree_set(&inserts, &deletes)));
    group.finish();
}

fn bench_search(c: &mut Criterion) {
    let mut rng = rand::rng();

    let mut nums = (0..10_000).collect::<Vec<_>>();
    nums.shuffle(&mut rng);
    let tree: RBTree<usize> = nums.iter().copied().collect();
    nums.shuffle(&mut rng);

    c.bench_function("Search", |b| {
        b.iter(|| {
            for i in &nums {
                black_box(tree.contains(i));
            }
        });
    });
}

criterion_group!(benches, bench_insertions_deletions, bench_search);
criterion_main!(benches);
