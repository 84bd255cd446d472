//! # An ordered red-black tree.
//!
//! A Rust implementation of red-black trees, the self-balancing binary search trees described by
//! [Guibas & Sedgewick (1978)][paper], as the engine underneath ordered set- and map-like
//! collections.
//!
//! The tree keeps a set of *unique* keys sorted under a user supplied total order and guarantees a
//! height of at most `2 * log2(n + 1)` through the red-black coloring rules:
//!
//! 1. the root is black,
//! 2. no red node has a red child,
//! 3. every path from a node down to an empty child crosses the same number of black nodes.
//!
//! Insertions need at most two rotations, deletions at most three. Every node is a separate heap
//! allocation that stays at the same address for as long as its key is part of the tree, so
//! rebalancing never moves keys around and cursors keep pointing at the same element.
//!
//! This crate is self-contained and fully `no_std` (it requires `alloc`).
//!
//! ## when to use this
//!
//! - **want ordered iteration** - keys are always visited in comparator order, forwards or
//!   backwards.
//! - **want range queries** - [`RBTree::lower_bound`], [`RBTree::upper_bound`],
//!   [`RBTree::equal_range`] and [`RBTree::range`] run in logarithmic time.
//! - **want a custom order** - any [`Compare`] implementation (including plain closures) can be
//!   used instead of the key's [`Ord`] implementation.
//! - **want stable positions** - [`Cursor`]s designate nodes, not indices; inserting or removing
//!   *other* keys never moves them.
//!
//! ## when not to use this
//!
//! - **need duplicate keys** - the tree is a set; inserting an equal key is rejected.
//! - **need shared mutation** - the tree is single threaded, callers must serialize access.
//!
//! ## features
//!
//! The following features are available:
//!
//! | Feature   | Default | Explanation                                                                            |
//! |:----------|:--------|:---------------------------------------------------------------------------------------|
//! | `dot`     | `false` | Enables the `RBTree::dot` method, which allows display of the tree in [graphviz format] |
//! | `__bench` | `false` | Compiles out all `tracing` events, used by the benchmarks                              |
//!
//! ## example
//!
//! ```rust
//! use rbtree::RBTree;
//!
//! let mut tree = RBTree::from([10, 20, 30, 5, 15]);
//!
//! assert_eq!(tree.iter().copied().collect::<Vec<_>>(), [5, 10, 15, 20, 30]);
//! assert_eq!(tree.lower_bound(&12).get(), Some(&15));
//! assert_eq!(tree.upper_bound(&10).get(), Some(&15));
//!
//! let (_, inserted) = tree.insert(10);
//! assert!(!inserted);
//!
//! assert_eq!(tree.remove(&10), Some(10));
//! assert!(!tree.contains(&10));
//! ```
//!
//! [paper]: https://doi.org/10.1109/SFCS.1978.3
//! [graphviz format]: https://graphviz.org/doc/info/lang.html

#![cfg_attr(not(test), no_std)]

extern crate alloc;

mod compare;
mod cursors;
#[cfg(feature = "dot")]
mod dot;
mod node;
mod utils;

use crate::node::{Color, Link, Node, link_color};
use crate::utils::Side;
use alloc::boxed::Box;
use core::borrow::Borrow;
use core::cmp::Ordering;
use core::hash::{Hash, Hasher};
use core::marker::PhantomData;
use core::ops::{Bound, RangeBounds};
use core::ptr::NonNull;
use core::{fmt, mem};

pub use compare::{Compare, Natural};
pub use cursors::{Cursor, CursorMut, IntoIter, Iter};
#[cfg(feature = "dot")]
pub use dot::Dot;

/// The empty child slot a new node would be linked into: its parent and the side of the parent,
/// or `None` when the tree is empty.
type Slot<K> = Option<(NonNull<Node<K>>, Side)>;

/// Error returned by [`RBTree::at`] when the requested key is not part of the tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct KeyNotFound;

impl fmt::Display for KeyNotFound {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("key not found")
    }
}

impl core::error::Error for KeyNotFound {}

/// An ordered red-black tree.
///
/// This data structure stores a set of unique keys sorted by the comparator `C` and supports
/// O(log n) lookup, insertion and removal as well as in-order traversal and range queries.
///
/// Keys are immutable once stored: "assigning" a key ([`RBTree::insert_or_assign`],
/// [`RBTree::replace`]) removes the old node and inserts a new one.
///
/// By default keys are ordered by their [`Ord`] implementation ([`Natural`]), a different order
/// can be supplied through [`RBTree::with_comparator`].
pub struct RBTree<K, C = Natural> {
    root: Link<K>,
    size: usize,
    comparator: C,
    _marker: PhantomData<Box<Node<K>>>,
}

// Safety: the tree exclusively owns all of its nodes, so sending it or sharing a reference to it
// is exactly as safe as sending/sharing the keys and the comparator.
unsafe impl<K: Send, C: Send> Send for RBTree<K, C> {}
// Safety: see above
unsafe impl<K: Sync, C: Sync> Sync for RBTree<K, C> {}

impl<K, C> Drop for RBTree<K, C> {
    fn drop(&mut self) {
        self.clear();
    }
}

impl<K, C: Default> Default for RBTree<K, C> {
    fn default() -> Self {
        Self::with_comparator(C::default())
    }
}

impl<K> RBTree<K> {
    /// Creates a new, empty tree ordering keys by their [`Ord`] implementation.
    #[must_use]
    pub const fn new() -> Self {
        Self::with_comparator(Natural)
    }
}

impl<K, C> RBTree<K, C> {
    /// Creates a new, empty tree ordering keys by `comparator`.
    #[must_use]
    pub const fn with_comparator(comparator: C) -> Self {
        Self {
            root: None,
            size: 0,
            comparator,
            _marker: PhantomData,
        }
    }

    /// Returns a reference to the comparator of this tree.
    pub fn comparator(&self) -> &C {
        &self.comparator
    }

    /// Returns the number of keys in the tree.
    pub fn size(&self) -> usize {
        self.size
    }

    /// Returns `true` if the tree contains no keys.
    pub fn is_empty(&self) -> bool {
        debug_assert_eq!(self.root.is_none(), self.size == 0);
        self.size == 0
    }

    /// Returns the theoretical maximum number of keys the tree could hold.
    ///
    /// This is derived from the largest possible allocation and the size of a single node, it does
    /// not reflect the memory actually available.
    pub fn max_size(&self) -> usize {
        isize::MAX.unsigned_abs() / mem::size_of::<Node<K>>().max(1)
    }

    /// Returns the number of nodes on the longest path from the root down to a leaf.
    ///
    /// An empty tree has height `0`, a tree holding a single key height `1`. The red-black rules
    /// guarantee `height <= 2 * log2(size + 1)`.
    pub fn height(&self) -> usize {
        fn height_inner<K>(link: Link<K>) -> usize {
            match link {
                // Safety: links reachable from the root point to live nodes
                Some(node) => unsafe {
                    let links = Node::links(node);
                    1 + height_inner(links.left()).max(height_inner(links.right()))
                },
                None => 0,
            }
        }

        height_inner(self.root)
    }

    /// Returns the smallest key in the tree.
    pub fn first(&self) -> Option<&K> {
        // Safety: the root is a live node
        let node = unsafe { utils::find_minimum(self.root?) };
        // Safety: node is live for as long as `self` is borrowed
        Some(unsafe { Node::key(node) })
    }

    /// Returns the greatest key in the tree.
    pub fn last(&self) -> Option<&K> {
        // Safety: the root is a live node
        let node = unsafe { utils::find_maximum(self.root?) };
        // Safety: node is live for as long as `self` is borrowed
        Some(unsafe { Node::key(node) })
    }

    /// Returns a `Cursor` pointing at the smallest key, or at the end position if the tree is
    /// empty.
    pub fn begin(&self) -> Cursor<'_, K, C> {
        Cursor {
            current: self.first_node(),
            tree: self,
        }
    }

    /// Returns a `Cursor` pointing at the end position, past the greatest key.
    pub fn end(&self) -> Cursor<'_, K, C> {
        Cursor {
            current: None,
            tree: self,
        }
    }

    /// Returns a `CursorMut` pointing at the smallest key, or at the end position if the tree is
    /// empty.
    pub fn begin_mut(&mut self) -> CursorMut<'_, K, C> {
        CursorMut {
            current: self.first_node(),
            tree: self,
        }
    }

    /// Returns a `CursorMut` pointing at the end position, past the greatest key.
    pub fn end_mut(&mut self) -> CursorMut<'_, K, C> {
        CursorMut {
            current: None,
            tree: self,
        }
    }

    /// Gets an iterator over the keys in the tree, in comparator order.
    pub fn iter(&self) -> Iter<'_, K> {
        Iter::new(self.first_node(), self.last_node())
    }

    /// Removes and returns the smallest key in the tree.
    pub fn pop_first(&mut self) -> Option<K> {
        let node = self.first_node()?;
        // Safety: node is part of this tree and is freed exactly once after unlinking
        unsafe {
            self.unlink_node(node);
            Some(Node::into_key(node))
        }
    }

    /// Removes and returns the greatest key in the tree.
    pub fn pop_last(&mut self) -> Option<K> {
        let node = self.last_node()?;
        // Safety: node is part of this tree and is freed exactly once after unlinking
        unsafe {
            self.unlink_node(node);
            Some(Node::into_key(node))
        }
    }

    /// Retains only the keys for which `f` returns `true`, removing all others.
    ///
    /// Keys are visited in ascending order.
    pub fn retain<F>(&mut self, mut f: F)
    where
        F: FnMut(&K) -> bool,
    {
        let mut curr = self.first_node();
        while let Some(node) = curr {
            // Safety: `node` is live; removing it keeps every other node at its address, so the
            // successor computed before the removal remains valid.
            unsafe {
                curr = utils::next(node);
                if !f(Node::key(node)) {
                    self.unlink_node(node);
                    drop(Node::into_key(node));
                }
            }
        }
    }

    /// Removes all keys from the tree.
    ///
    /// This drops every key, which requires visiting every node.
    pub fn clear(&mut self) {
        let size = mem::replace(&mut self.size, 0);
        if let Some(root) = self.root.take() {
            tracing::debug!(size, "clearing tree");
            // Safety: the root was just detached, so nothing else can reach its nodes anymore
            unsafe { Self::clear_inner(root) };
        }
    }

    unsafe fn clear_inner(node: NonNull<Node<K>>) {
        // Safety: ensured by caller, the subtree below `node` is exclusively ours
        unsafe {
            let node_links = Node::links(node);
            if let Some(left) = node_links.left() {
                Self::clear_inner(left);
            }
            if let Some(right) = node_links.right() {
                Self::clear_inner(right);
            }
            node_links.unlink();
            drop(Node::into_key(node));
        }
    }

    /// Swaps the contents of two trees in constant time, without touching any node.
    pub fn swap(&mut self, other: &mut Self) {
        mem::swap(self, other);
    }

    /// Returns a `Cursor` pointing to the key equal to `key`, or at the end position if there is
    /// no such key.
    ///
    /// The key may be any borrowed form of the tree's key type, but the comparator must order
    /// the borrowed form the same way it orders the key type.
    pub fn find<Q>(&self, key: &Q) -> Cursor<'_, K, C>
    where
        K: Borrow<Q>,
        C: Compare<Q>,
        Q: ?Sized,
    {
        Cursor {
            current: self.search(key).ok(),
            tree: self,
        }
    }

    /// Returns a `CursorMut` pointing to the key equal to `key`, or at the end position if there
    /// is no such key.
    ///
    /// The key may be any borrowed form of the tree's key type, but the comparator must order
    /// the borrowed form the same way it orders the key type.
    pub fn find_mut<Q>(&mut self, key: &Q) -> CursorMut<'_, K, C>
    where
        K: Borrow<Q>,
        C: Compare<Q>,
        Q: ?Sized,
    {
        CursorMut {
            current: self.search(key).ok(),
            tree: self,
        }
    }

    /// Returns `true` if the tree contains a key equal to `key`.
    pub fn contains<Q>(&self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        C: Compare<Q>,
        Q: ?Sized,
    {
        self.search(key).is_ok()
    }

    /// Returns the number of keys equal to `key`, which is either `0` or `1`.
    pub fn count<Q>(&self, key: &Q) -> usize
    where
        K: Borrow<Q>,
        C: Compare<Q>,
        Q: ?Sized,
    {
        usize::from(self.contains(key))
    }

    /// Returns a reference to the stored key equal to `key`.
    pub fn get<Q>(&self, key: &Q) -> Option<&K>
    where
        K: Borrow<Q>,
        C: Compare<Q>,
        Q: ?Sized,
    {
        let node = self.search(key).ok()?;
        // Safety: node is live for as long as `self` is borrowed
        Some(unsafe { Node::key(node) })
    }

    /// Returns a reference to the stored key equal to `key`.
    ///
    /// # Errors
    ///
    /// Returns [`KeyNotFound`] if the tree contains no such key.
    pub fn at<Q>(&self, key: &Q) -> Result<&K, KeyNotFound>
    where
        K: Borrow<Q>,
        C: Compare<Q>,
        Q: ?Sized,
    {
        self.get(key).ok_or(KeyNotFound)
    }

    /// Removes the key equal to `key` from the tree, returning the stored key if there was one.
    pub fn remove<Q>(&mut self, key: &Q) -> Option<K>
    where
        K: Borrow<Q>,
        C: Compare<Q>,
        Q: ?Sized,
    {
        let node = self.search(key).ok()?;
        // Safety: node is part of this tree and is freed exactly once after unlinking
        unsafe {
            self.unlink_node(node);
            Some(Node::into_key(node))
        }
    }

    /// Returns a `Cursor` pointing at the smallest key that is not less than `key`, or at the end
    /// position if there is none.
    pub fn lower_bound<Q>(&self, key: &Q) -> Cursor<'_, K, C>
    where
        K: Borrow<Q>,
        C: Compare<Q>,
        Q: ?Sized,
    {
        Cursor {
            current: self.first_in_bound(Bound::Included(key)),
            tree: self,
        }
    }

    /// Returns a `Cursor` pointing at the smallest key that is strictly greater than `key`, or at
    /// the end position if there is none.
    pub fn upper_bound<Q>(&self, key: &Q) -> Cursor<'_, K, C>
    where
        K: Borrow<Q>,
        C: Compare<Q>,
        Q: ?Sized,
    {
        Cursor {
            current: self.first_in_bound(Bound::Excluded(key)),
            tree: self,
        }
    }

    /// Returns a `CursorMut` pointing at the smallest key that is not less than `key`, or at the
    /// end position if there is none.
    pub fn lower_bound_mut<Q>(&mut self, key: &Q) -> CursorMut<'_, K, C>
    where
        K: Borrow<Q>,
        C: Compare<Q>,
        Q: ?Sized,
    {
        CursorMut {
            current: self.first_in_bound(Bound::Included(key)),
            tree: self,
        }
    }

    /// Returns a `CursorMut` pointing at the smallest key that is strictly greater than `key`, or
    /// at the end position if there is none.
    pub fn upper_bound_mut<Q>(&mut self, key: &Q) -> CursorMut<'_, K, C>
    where
        K: Borrow<Q>,
        C: Compare<Q>,
        Q: ?Sized,
    {
        CursorMut {
            current: self.first_in_bound(Bound::Excluded(key)),
            tree: self,
        }
    }

    /// Returns the pair `(lower_bound(key), upper_bound(key))`.
    ///
    /// Since keys are unique, the range spans at most one key.
    pub fn equal_range<Q>(&self, key: &Q) -> (Cursor<'_, K, C>, Cursor<'_, K, C>)
    where
        K: Borrow<Q>,
        C: Compare<Q>,
        Q: ?Sized,
    {
        (self.lower_bound(key), self.upper_bound(key))
    }

    /// Gets an iterator over the keys that fall inside `range`, in comparator order.
    ///
    /// Inverted or empty bounds produce an empty iterator.
    pub fn range<Q, R>(&self, range: R) -> Iter<'_, K>
    where
        K: Borrow<Q>,
        C: Compare<Q>,
        Q: ?Sized,
        R: RangeBounds<Q>,
    {
        let head = self.first_in_bound(range.start_bound());
        let tail = self.last_in_bound(range.end_bound());

        match (head, tail) {
            (Some(head), Some(tail)) => {
                // Safety: both nodes are live for as long as `self` is borrowed
                let (head_key, tail_key): (&Q, &Q) =
                    unsafe { (Node::key(head).borrow(), Node::key(tail).borrow()) };
                if self.comparator.compare(head_key, tail_key) == Ordering::Greater {
                    Iter::new(None, None)
                } else {
                    Iter::new(Some(head), Some(tail))
                }
            }
            _ => Iter::new(None, None),
        }
    }

    #[cfg(feature = "dot")]
    pub fn dot(&self) -> Dot<'_, K, C> {
        Dot { tree: self }
    }

    fn first_node(&self) -> Link<K> {
        // Safety: the root is a live node
        self.root.map(|root| unsafe { utils::find_minimum(root) })
    }

    fn last_node(&self) -> Link<K> {
        // Safety: the root is a live node
        self.root.map(|root| unsafe { utils::find_maximum(root) })
    }

    /// Walks down from the root looking for `key`.
    ///
    /// Returns the matching node, or the empty slot where a node holding `key` would be linked.
    fn search<Q>(&self, key: &Q) -> Result<NonNull<Node<K>>, Slot<K>>
    where
        K: Borrow<Q>,
        C: Compare<Q>,
        Q: ?Sized,
    {
        let mut slot = None;
        let mut tree = self.root;

        while let Some(curr) = tree {
            // Safety: links reachable from the root point to live nodes
            let curr_key: &Q = unsafe { Node::key(curr) }.borrow();

            let side = match self.comparator.compare(key, curr_key) {
                Ordering::Equal => return Ok(curr),
                Ordering::Less => Side::Left,
                Ordering::Greater => Side::Right,
            };

            slot = Some((curr, side));
            // Safety: see above
            tree = unsafe { Node::links(curr).child(side) };
        }

        Err(slot)
    }

    /// Returns the leftmost node whose key lies above the given lower bound.
    fn first_in_bound<Q>(&self, bound: Bound<&Q>) -> Link<K>
    where
        K: Borrow<Q>,
        C: Compare<Q>,
        Q: ?Sized,
    {
        let mut result = None;
        let mut tree = self.root;

        while let Some(curr) = tree {
            // Safety: links reachable from the root point to live nodes
            let (curr_links, curr_key) = unsafe { (Node::links(curr), Node::key(curr)) };
            let curr_key: &Q = curr_key.borrow();

            let in_bound = match bound {
                Bound::Unbounded => true,
                Bound::Included(key) => self.comparator.compare(key, curr_key) != Ordering::Greater,
                Bound::Excluded(key) => self.comparator.compare(key, curr_key) == Ordering::Less,
            };

            if in_bound {
                result = tree;
                tree = curr_links.left();
            } else {
                tree = curr_links.right();
            }
        }

        result
    }

    /// Returns the rightmost node whose key lies below the given upper bound.
    fn last_in_bound<Q>(&self, bound: Bound<&Q>) -> Link<K>
    where
        K: Borrow<Q>,
        C: Compare<Q>,
        Q: ?Sized,
    {
        let mut result = None;
        let mut tree = self.root;

        while let Some(curr) = tree {
            // Safety: links reachable from the root point to live nodes
            let (curr_links, curr_key) = unsafe { (Node::links(curr), Node::key(curr)) };
            let curr_key: &Q = curr_key.borrow();

            let in_bound = match bound {
                Bound::Unbounded => true,
                Bound::Included(key) => self.comparator.compare(curr_key, key) != Ordering::Greater,
                Bound::Excluded(key) => self.comparator.compare(curr_key, key) == Ordering::Less,
            };

            if in_bound {
                result = tree;
                tree = curr_links.right();
            } else {
                tree = curr_links.left();
            }
        }

        result
    }

    /// Links the unlinked `node` into the empty `slot` and restores the red-black rules.
    unsafe fn link_node(&mut self, node: NonNull<Node<K>>, slot: Slot<K>) {
        // Safety: ensured by caller, `node` is live and `slot` belongs to this tree
        unsafe {
            let node_links = Node::links(node);
            debug_assert!(!node_links.is_linked());
            node_links.set_color(Color::Red);

            if let Some((parent, side)) = slot {
                node_links.replace_parent(Some(parent));
                let prev = Node::links(parent).replace_child(side, Some(node));
                debug_assert!(prev.is_none(), "slot {side} is already occupied");
            } else {
                debug_assert!(self.root.is_none());
                self.root = Some(node);
            }

            self.size += 1;
            self.balance_after_insert(node);
        }
    }

    /// Unlinks `node` from the tree and restores the red-black rules.
    ///
    /// The node itself is not freed, but its links are reset so it can be linked into a tree again.
    /// Every *other* node keeps its address and its key.
    unsafe fn unlink_node(&mut self, node: NonNull<Node<K>>) {
        // Safety: ensured by caller, `node` is part of this tree
        unsafe {
            let node_links = Node::links(node);

            // Figure out which node we need to splice out: `node` itself if it has at most one
            // child, its in-order successor otherwise
            let y = if let Some(right) = node_links.right()
                && node_links.left().is_some()
            {
                utils::find_minimum(right)
            } else {
                node
            };

            // Find the child of y that will move up into its place
            let y_links = Node::links(y);
            let x = y_links.left().or(y_links.right());
            let mut x_parent = y_links.parent();
            let removed_color = y_links.color();

            // Replace y with x which will effectively remove y from the tree
            self.replace_in_parent(x_parent, y, x);
            if let Some(x) = x {
                Node::links(x).replace_parent(x_parent);
            }

            // y takes over node's position (and color) in the tree
            if y != node {
                self.swap_in_node_at(node, y);
                if x_parent == Some(node) {
                    x_parent = Some(y);
                }
            }

            // Removing a red node can't change any black-height
            if removed_color == Color::Black {
                self.balance_after_remove(x, x_parent);
            }

            node_links.unlink();
            self.size -= 1;
        }
    }

    unsafe fn balance_after_insert(&mut self, mut node: NonNull<Node<K>>) {
        // Safety: ensured by caller, `node` was just linked into this tree
        unsafe {
            // The new node is red, so the only rule it can break is "no red node has a red child".
            while let Some(mut parent) = Node::links(node).parent() {
                let parent_links = Node::links(parent);
                if parent_links.is_black() {
                    break;
                }

                // The root is always black, so a red parent always has a parent of its own.
                let Some(grandparent) = parent_links.parent() else {
                    break;
                };

                let parent_side = utils::side_of(Some(parent), grandparent);
                let uncle = Node::links(grandparent).child(parent_side.opposite());

                if let Some(uncle) = uncle
                    && Node::links(uncle).is_red()
                {
                    tracing::trace!("insert fix-up: red uncle, recoloring and climbing");
                    parent_links.set_color(Color::Black);
                    Node::links(uncle).set_color(Color::Black);
                    Node::links(grandparent).set_color(Color::Red);

                    node = grandparent;
                    continue;
                }

                if utils::side_of(Some(node), parent) != parent_side {
                    tracing::trace!("insert fix-up: inner grandchild, rotating {parent_side} at parent");

                    self.rotate_at(node, parent_side);
                    mem::swap(&mut node, &mut parent);
                }

                tracing::trace!("insert fix-up: outer grandchild, rotating at grandparent");
                self.rotate_at(parent, parent_side.opposite());
                Node::links(parent).set_color(Color::Black);
                Node::links(grandparent).set_color(Color::Red);
                break;
            }

            if let Some(root) = self.root {
                Node::links(root).set_color(Color::Black);
            }
        }
    }

    /// Restores the black-height rule after a black node was spliced out.
    ///
    /// `x` is the link that took the removed node's place (it carries the missing black) and
    /// `parent` is its parent, which is needed since `x` may be `None`.
    unsafe fn balance_after_remove(&mut self, mut x: Link<K>, mut parent: Link<K>) {
        // Safety: ensured by caller, all involved nodes are part of this tree
        unsafe {
            while x != self.root && link_color(x) == Color::Black {
                let Some(p) = parent else {
                    break;
                };
                let p_links = Node::links(p);

                let x_side = utils::side_of(x, p);
                let Some(mut sibling) = p_links.child(x_side.opposite()) else {
                    unreachable!("black-height violation: deficient {x_side} child has no sibling");
                };

                if Node::links(sibling).is_red() {
                    tracing::trace!("remove fix-up: red sibling, rotating {x_side} at parent");
                    Node::links(sibling).set_color(Color::Black);
                    p_links.set_color(Color::Red);
                    self.rotate_at(sibling, x_side);

                    let Some(new_sibling) = p_links.child(x_side.opposite()) else {
                        unreachable!("black-height violation: red sibling has no {x_side} child");
                    };
                    sibling = new_sibling;
                }

                let sibling_links = Node::links(sibling);
                let near = sibling_links.child(x_side);
                let far = sibling_links.child(x_side.opposite());

                if link_color(near) == Color::Black && link_color(far) == Color::Black {
                    tracing::trace!("remove fix-up: black nephews, pushing deficit up");
                    sibling_links.set_color(Color::Red);

                    x = Some(p);
                    parent = p_links.parent();
                    continue;
                }

                if link_color(far) == Color::Black
                    && let Some(near) = near
                {
                    tracing::trace!("remove fix-up: red inner nephew, rotating at sibling");
                    Node::links(near).set_color(Color::Black);
                    sibling_links.set_color(Color::Red);
                    self.rotate_at(near, x_side.opposite());

                    sibling = near;
                }

                tracing::trace!("remove fix-up: red outer nephew, rotating {x_side} at parent");
                let sibling_links = Node::links(sibling);
                sibling_links.set_color(p_links.color());
                p_links.set_color(Color::Black);
                if let Some(far) = sibling_links.child(x_side.opposite()) {
                    Node::links(far).set_color(Color::Black);
                }
                self.rotate_at(sibling, x_side);

                x = self.root;
                break;
            }

            if let Some(x) = x {
                Node::links(x).set_color(Color::Black);
            }
        }
    }

    /// Rotates `x` up into the position of its parent `z`.
    ///
    /// `z` becomes the `side` child of `x`, and the former `side` child of `x` becomes the
    /// `side.opposite()` child of `z`. In-order sequence and colors are left untouched.
    unsafe fn rotate_at(&mut self, x: NonNull<Node<K>>, side: Side) {
        // Safety: ensured by caller, `x` is a non-root node of this tree
        unsafe {
            let x_links = Node::links(x);
            let y = x_links.child(side);
            let Some(z) = x_links.parent() else {
                unreachable!("cannot rotate the root upwards");
            };
            let z_links = Node::links(z);
            let p_z = z_links.parent();

            // Rotate X into place
            x_links.replace_parent(p_z);
            self.replace_in_parent(p_z, z, Some(x));

            // make z the `side`-child of x
            x_links.replace_child(side, Some(z));
            z_links.replace_parent(Some(x));

            // make y the `opposite side`-child of z
            z_links.replace_child(side.opposite(), y);
            if let Some(y) = y {
                Node::links(y).replace_parent(Some(z));
            }
        }
    }

    /// Moves `new` into the structural position of `old`: parent, children and color.
    ///
    /// `new` must already be spliced out of its previous position.
    unsafe fn swap_in_node_at(&mut self, old: NonNull<Node<K>>, new: NonNull<Node<K>>) {
        // Safety: ensured by caller
        unsafe {
            let old_links = Node::links(old);
            let new_links = Node::links(new);

            let parent = old_links.parent();
            let left = old_links.left();
            let right = old_links.right();

            new_links.replace_parent(parent);
            self.replace_in_parent(parent, old, Some(new));

            new_links.replace_left(left);
            if let Some(left) = left {
                Node::links(left).replace_parent(Some(new));
            }
            old_links.replace_left(None);

            new_links.replace_right(right);
            if let Some(right) = right {
                Node::links(right).replace_parent(Some(new));
            }
            old_links.replace_right(None);

            new_links.set_color(old_links.color());
            old_links.replace_parent(None);
        }
    }

    /// Makes `parent` (or the root, if `parent` is `None`) point to `new` instead of `old`.
    unsafe fn replace_in_parent(&mut self, parent: Link<K>, old: NonNull<Node<K>>, new: Link<K>) {
        if let Some(parent) = parent {
            // Safety: ensured by caller
            let parent_links = unsafe { Node::links(parent) };

            if parent_links.left() == Some(old) {
                parent_links.replace_left(new);
            } else {
                debug_assert_eq!(parent_links.right(), Some(old));
                parent_links.replace_right(new);
            }
        } else {
            // We're replacing the root, so swap in the new candidate
            self.root = new;
        }
    }

    unsafe fn clone_subtree(node: NonNull<Node<K>>, parent: Link<K>) -> NonNull<Node<K>>
    where
        K: Clone,
    {
        // Safety: ensured by caller, `node` is a live node of the source tree
        unsafe {
            let node_links = Node::links(node);

            let new = Node::alloc(Node::key(node).clone());
            let new_links = Node::links(new);
            new_links.set_color(node_links.color());
            new_links.replace_parent(parent);

            if let Some(left) = node_links.left() {
                new_links.replace_left(Some(Self::clone_subtree(left, Some(new))));
            }
            if let Some(right) = node_links.right() {
                new_links.replace_right(Some(Self::clone_subtree(right, Some(new))));
            }

            new
        }
    }
}

impl<K, C> RBTree<K, C>
where
    C: Compare<K>,
{
    /// Inserts `key` into the tree.
    ///
    /// Returns a `Cursor` pointing at the inserted key and `true` if the key was inserted. If the
    /// tree already contains an equal key, the tree is left untouched, `key` is dropped and the
    /// returned cursor points at the existing key together with `false`.
    pub fn insert(&mut self, key: K) -> (Cursor<'_, K, C>, bool) {
        let (node, inserted) = self.insert_internal(key);

        (
            Cursor {
                current: Some(node),
                tree: self,
            },
            inserted,
        )
    }

    /// Inserts `key` into the tree, replacing an equal key if there is one.
    ///
    /// Replacing removes the old node and inserts a new one, it does not overwrite the old key in
    /// place. Returns a `Cursor` pointing at the new key and `true` if the key was newly inserted or
    /// `false` if an existing key was replaced.
    pub fn insert_or_assign(&mut self, key: K) -> (Cursor<'_, K, C>, bool) {
        let (node, old) = self.replace_internal(key);

        (
            Cursor {
                current: Some(node),
                tree: self,
            },
            old.is_none(),
        )
    }

    /// Inserts `key` into the tree, replacing and returning an equal key if there is one.
    pub fn replace(&mut self, key: K) -> Option<K> {
        self.replace_internal(key).1
    }

    /// Returns a reference to the stored key equal to `key`, inserting `key` first if the tree
    /// doesn't contain it yet.
    pub fn get_or_insert(&mut self, key: K) -> &K {
        let (node, _) = self.insert_internal(key);
        // Safety: node is live for as long as `self` is borrowed
        unsafe { Node::key(node) }
    }

    /// Moves every key of `other` whose key is not yet present in `self` into `self`.
    ///
    /// Nodes are moved, not copied: no key is cloned and no allocation takes place. After this call
    /// `other` holds exactly the keys that were already present in `self`.
    pub fn merge<C2>(&mut self, other: &mut RBTree<K, C2>) {
        let mut moved = 0_usize;

        let mut curr = other.first_node();
        while let Some(node) = curr {
            // Safety: `node` is a live node of `other`. Unlinking it keeps every other node of
            // `other` at its address, so the successor computed before is still valid.
            unsafe {
                curr = utils::next(node);

                if let Err(slot) = self.search(Node::key(node)) {
                    other.unlink_node(node);
                    self.link_node(node, slot);
                    moved += 1;
                }
            }
        }

        tracing::debug!(moved, collided = other.size, "merged trees");
    }

    /// Asserts as many of the tree's invariants as possible.
    ///
    /// This checks the local link structure of every node, that every child points back at its
    /// parent, that keys are strictly increasing in-order, the red-black coloring rules and that
    /// the tracked size matches the number of reachable nodes.
    ///
    /// # Panics
    ///
    /// Panics with a description of the first violated invariant.
    #[track_caller]
    pub fn assert_valid(&self) {
        let Some(root) = self.root else {
            assert_eq!(self.size, 0, "size mismatch: empty tree reports size {}", self.size);
            return;
        };

        // Safety: links reachable from the root point to live nodes
        unsafe {
            let root_links = Node::links(root);
            assert!(
                root_links.parent().is_none(),
                "root must not have a parent; root={root_links:#?}"
            );
            assert!(
                root_links.is_black(),
                "red-black violation: root must be black"
            );

            let mut reachable = 0;
            Self::assert_valid_inner(root, &mut reachable);
            assert_eq!(
                reachable, self.size,
                "size mismatch: {reachable} nodes are reachable but tree reports size {}",
                self.size
            );
        }

        let mut keys = self.iter();
        if let Some(mut prev) = keys.next() {
            for key in keys {
                assert_eq!(
                    self.comparator.compare(prev, key),
                    Ordering::Less,
                    "ordering violation: in-order keys must be strictly increasing"
                );
                prev = key;
            }
        }
    }

    /// Returns the black-height of the subtree rooted at `node`, counting `node` itself.
    #[track_caller]
    unsafe fn assert_valid_inner(node: NonNull<Node<K>>, reachable: &mut usize) -> usize {
        // Safety: ensured by caller
        let node_links = unsafe { Node::links(node) };

        // assert that all links are set up correctly (no loops, self references, etc.)
        node_links.assert_valid(node);
        *reachable += 1;

        let mut black_height = |side: Side| -> usize {
            let Some(child) = node_links.child(side) else {
                return 0;
            };
            // Safety: ensured by caller
            let child_links = unsafe { Node::links(child) };

            assert_eq!(
                child_links.parent(),
                Some(node),
                "parent link mismatch: {side} child does not point back at its parent"
            );
            assert!(
                node_links.is_black() || child_links.is_black(),
                "red-black violation: red node has a red {side} child"
            );

            // Safety: ensured by caller
            unsafe { Self::assert_valid_inner(child, reachable) }
        };

        let left = black_height(Side::Left);
        let right = black_height(Side::Right);
        assert_eq!(
            left, right,
            "red-black violation: black-height of left subtree ({left}) differs from right subtree ({right})"
        );

        left + usize::from(node_links.is_black())
    }

    fn insert_internal(&mut self, key: K) -> (NonNull<Node<K>>, bool) {
        match self.search(&key) {
            Ok(existing) => (existing, false),
            Err(slot) => {
                let node = Node::alloc(key);
                // Safety: `node` is freshly allocated and `slot` was just computed
                unsafe { self.link_node(node, slot) };
                (node, true)
            }
        }
    }

    fn replace_internal(&mut self, key: K) -> (NonNull<Node<K>>, Option<K>) {
        match self.search(&key) {
            Ok(existing) => {
                // Safety: `existing` is part of this tree and is freed exactly once after unlinking
                let old = unsafe {
                    self.unlink_node(existing);
                    Node::into_key(existing)
                };
                let (node, inserted) = self.insert_internal(key);
                debug_assert!(inserted);
                (node, Some(old))
            }
            Err(slot) => {
                let node = Node::alloc(key);
                // Safety: `node` is freshly allocated and `slot` was just computed
                unsafe { self.link_node(node, slot) };
                (node, None)
            }
        }
    }
}

impl<K: Clone, C: Clone> Clone for RBTree<K, C> {
    fn clone(&self) -> Self {
        Self {
            // Safety: the root is a live node
            root: self.root.map(|root| unsafe { Self::clone_subtree(root, None) }),
            size: self.size,
            comparator: self.comparator.clone(),
            _marker: PhantomData,
        }
    }
}

impl<K: fmt::Debug, C> fmt::Debug for RBTree<K, C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.iter()).finish()
    }
}

impl<K: PartialEq, C> PartialEq for RBTree<K, C> {
    fn eq(&self, other: &Self) -> bool {
        self.size == other.size && self.iter().eq(other.iter())
    }
}

impl<K: Eq, C> Eq for RBTree<K, C> {}

impl<K: Hash, C> Hash for RBTree<K, C> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        state.write_usize(self.size);
        for key in self {
            key.hash(state);
        }
    }
}

impl<K, C: Compare<K>> Extend<K> for RBTree<K, C> {
    fn extend<I: IntoIterator<Item = K>>(&mut self, iter: I) {
        for key in iter {
            self.insert_internal(key);
        }
    }
}

impl<K, C: Compare<K> + Default> FromIterator<K> for RBTree<K, C> {
    fn from_iter<I: IntoIterator<Item = K>>(iter: I) -> Self {
        let mut tree = Self::default();
        tree.extend(iter);
        tree
    }
}

impl<K: Ord, const N: usize> From<[K; N]> for RBTree<K> {
    fn from(keys: [K; N]) -> Self {
        keys.into_iter().collect()
    }
}

impl<'a, K, C> IntoIterator for &'a RBTree<K, C> {
    type Item = &'a K;
    type IntoIter = Iter<'a, K>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl<K, C> IntoIterator for RBTree<K, C> {
    type Item = K;
    type IntoIter = IntoIter<K, C>;

    fn into_iter(self) -> Self::IntoIter {
        IntoIter { tree: self }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::vec::Vec;
    use rand::prelude::SliceRandom;

    #[cfg(not(target_os = "none"))]
    #[test]
    fn random_inserts_and_removals() {
        let mut tree: RBTree<usize> = RBTree::new();

        let mut rng = rand::rng();

        let mut nums = (0..50).collect::<Vec<_>>();
        nums.shuffle(&mut rng);

        println!("inserts {nums:?}");
        for i in nums.clone() {
            let (_, inserted) = tree.insert(i);
            assert!(inserted);
            tree.assert_valid();
        }

        nums.shuffle(&mut rng);

        println!("deletions {nums:?}");
        for i in nums {
            assert_eq!(tree.remove(&i), Some(i));
            tree.assert_valid();
        }

        assert!(tree.is_empty());
    }

    #[cfg(not(target_os = "none"))]
    #[test]
    fn random_inserts_and_searches() {
        let mut tree: RBTree<usize> = RBTree::new();

        let mut rng = rand::rng();

        let mut nums = (0..50).collect::<Vec<_>>();
        nums.shuffle(&mut rng);

        println!("inserts {nums:?}");
        for i in nums.clone() {
            tree.insert(i);
        }

        nums.shuffle(&mut rng);

        println!("searches {nums:?}");
        for i in nums {
            assert_eq!(tree.find(&i).get(), Some(&i));
        }
        assert!(tree.find(&50).is_end());
    }

    #[test]
    fn ascending_inserts_stay_balanced() {
        let mut tree: RBTree<u32> = RBTree::new();
        for i in 0..1024 {
            tree.insert(i);
        }
        tree.assert_valid();

        // 2 * log2(1024 + 1) rounds down to 20
        assert!(tree.height() <= 20, "height {} too large", tree.height());
    }

    #[test]
    fn root_is_black_after_each_insert() {
        let mut tree: RBTree<u32> = RBTree::new();
        for i in [8, 4, 12, 2, 6, 10, 14, 1] {
            tree.insert(i);
            let root = tree.root.unwrap();
            assert_eq!(unsafe { Node::links(root).color() }, Color::Black);
        }
    }

    #[test]
    fn two_child_removal_keeps_successor_node() {
        let mut tree: RBTree<u32> = (1..=7).collect();

        // the successor of 4 is moved into 4's position, not copied
        let successor = tree.search(&5).unwrap();
        tree.remove(&4);
        tree.assert_valid();

        assert_eq!(tree.search(&5).unwrap(), successor);
    }

    #[test]
    fn violations_are_detected() {
        let tree: RBTree<u32> = (1..=3).collect();
        let root = tree.root.unwrap();

        unsafe { Node::links(root).set_color(Color::Red) };
        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| tree.assert_valid()));
        unsafe { Node::links(root).set_color(Color::Black) };

        assert!(result.is_err());
        tree.assert_valid();
    }

    #[test]
    fn size_and_max_size() {
        let mut tree: RBTree<u64> = RBTree::new();
        assert!(tree.is_empty());
        assert!(tree.max_size() > 0);

        tree.extend([3, 1, 2, 3]);
        assert_eq!(tree.size(), 3);
        assert!(tree.max_size() >= tree.size());

        tree.clear();
        assert_eq!(tree.size(), 0);
        assert_eq!(tree.height(), 0);
        tree.assert_valid();
    }
}
