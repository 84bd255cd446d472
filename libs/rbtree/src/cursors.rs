use crate::node::{Link, Node};
use crate::{RBTree, utils};
use core::iter::FusedIterator;
use core::marker::PhantomData;
use core::{fmt, ptr};

/// A cursor which provides read-only access to an [`RBTree`].
///
/// A cursor points either at a key of the tree or at the *end* position, a "ghost" position
/// sitting between the greatest and the smallest key. Moving forward from the greatest key
/// reaches the end position, moving forward once more wraps around to the smallest key (and
/// likewise backwards).
///
/// Two cursors compare equal if they belong to the same tree and point at the same position.
pub struct Cursor<'a, K, C> {
    pub(crate) current: Link<K>,
    pub(crate) tree: &'a RBTree<K, C>,
}

// Safety: a `Cursor` only hands out shared references into a tree it borrows immutably
unsafe impl<K: Sync, C: Sync> Send for Cursor<'_, K, C> {}
// Safety: see above
unsafe impl<K: Sync, C: Sync> Sync for Cursor<'_, K, C> {}

impl<K, C> Clone for Cursor<'_, K, C> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<K, C> Copy for Cursor<'_, K, C> {}

impl<K, C> PartialEq for Cursor<'_, K, C> {
    fn eq(&self, other: &Self) -> bool {
        ptr::eq(self.tree, other.tree) && self.current == other.current
    }
}

impl<K, C> Eq for Cursor<'_, K, C> {}

impl<K: fmt::Debug, C> fmt::Debug for Cursor<'_, K, C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Cursor").field(&self.get()).finish()
    }
}

impl<'a, K, C> Cursor<'a, K, C> {
    /// Returns a reference to the key the cursor is pointing at, or `None` at the end position.
    pub fn get(&self) -> Option<&'a K> {
        // Safety: the node is live for as long as the tree is borrowed
        self.current.map(|ptr| unsafe { Node::key(ptr) })
    }

    /// Returns `true` if the cursor is at the end position.
    pub fn is_end(&self) -> bool {
        self.current.is_none()
    }

    /// Moves the cursor to the next key in order.
    ///
    /// Moving past the greatest key reaches the end position, moving forward from the end position
    /// wraps around to the smallest key.
    pub fn move_next(&mut self) {
        self.current = next_link(self.tree, self.current);
    }

    /// Moves the cursor to the previous key in order.
    ///
    /// Moving back from the smallest key reaches the end position, moving back from the end
    /// position wraps around to the greatest key.
    pub fn move_prev(&mut self) {
        self.current = prev_link(self.tree, self.current);
    }

    /// Returns the key the cursor would point at after [`Cursor::move_next`].
    pub fn peek_next(&self) -> Option<&'a K> {
        // Safety: the node is live for as long as the tree is borrowed
        next_link(self.tree, self.current).map(|ptr| unsafe { Node::key(ptr) })
    }

    /// Returns the key the cursor would point at after [`Cursor::move_prev`].
    pub fn peek_prev(&self) -> Option<&'a K> {
        // Safety: the node is live for as long as the tree is borrowed
        prev_link(self.tree, self.current).map(|ptr| unsafe { Node::key(ptr) })
    }
}

/// A cursor which provides mutable access to an [`RBTree`].
///
/// In addition to moving around like a [`Cursor`], it can remove the key it is pointing at.
/// Keys themselves stay immutable, changing a key would break the ordering of the tree.
pub struct CursorMut<'a, K, C> {
    pub(crate) current: Link<K>,
    pub(crate) tree: &'a mut RBTree<K, C>,
}

impl<K: fmt::Debug, C> fmt::Debug for CursorMut<'_, K, C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("CursorMut").field(&self.get()).finish()
    }
}

impl<K, C> CursorMut<'_, K, C> {
    /// Returns a reference to the key the cursor is pointing at, or `None` at the end position.
    pub fn get(&self) -> Option<&K> {
        // Safety: the node is live for as long as the tree is borrowed
        self.current.map(|ptr| unsafe { Node::key(ptr) })
    }

    /// Returns `true` if the cursor is at the end position.
    pub fn is_end(&self) -> bool {
        self.current.is_none()
    }

    /// Moves the cursor to the next key in order, see [`Cursor::move_next`].
    pub fn move_next(&mut self) {
        self.current = next_link(self.tree, self.current);
    }

    /// Moves the cursor to the previous key in order, see [`Cursor::move_prev`].
    pub fn move_prev(&mut self) {
        self.current = prev_link(self.tree, self.current);
    }

    /// Returns the key the cursor would point at after [`CursorMut::move_next`].
    pub fn peek_next(&self) -> Option<&K> {
        // Safety: the node is live for as long as the tree is borrowed
        next_link(self.tree, self.current).map(|ptr| unsafe { Node::key(ptr) })
    }

    /// Returns the key the cursor would point at after [`CursorMut::move_prev`].
    pub fn peek_prev(&self) -> Option<&K> {
        // Safety: the node is live for as long as the tree is borrowed
        prev_link(self.tree, self.current).map(|ptr| unsafe { Node::key(ptr) })
    }

    /// Removes the current key from the tree and returns it.
    ///
    /// The cursor moves on to the next key in order (or the end position if the removed key was
    /// the greatest). Does nothing and returns `None` if the cursor is at the end position.
    pub fn remove_current(&mut self) -> Option<K> {
        let node = self.current?;

        // Safety: `node` is part of the tree we borrow exclusively. Removing it keeps every other
        // node at its address, so its successor stays valid.
        unsafe {
            self.current = utils::next(node);
            self.tree.unlink_node(node);
            Some(Node::into_key(node))
        }
    }

    /// Returns a read-only cursor pointing at the same position.
    pub fn as_cursor(&self) -> Cursor<'_, K, C> {
        Cursor {
            current: self.current,
            tree: self.tree,
        }
    }
}

fn next_link<K, C>(tree: &RBTree<K, C>, current: Link<K>) -> Link<K> {
    match current {
        // Safety: the cursor's node is part of `tree`
        Some(node) => unsafe { utils::next(node) },
        None => tree.first_node(),
    }
}

fn prev_link<K, C>(tree: &RBTree<K, C>, current: Link<K>) -> Link<K> {
    match current {
        // Safety: the cursor's node is part of `tree`
        Some(node) => unsafe { utils::prev(node) },
        None => tree.last_node(),
    }
}

/// An iterator over references to the keys of an [`RBTree`], in order.
pub struct Iter<'a, K> {
    head: Link<K>,
    tail: Link<K>,
    _tree: PhantomData<&'a K>,
}

// Safety: an `Iter` only hands out shared references into a tree it borrows immutably
unsafe impl<K: Sync> Send for Iter<'_, K> {}
// Safety: see above
unsafe impl<K: Sync> Sync for Iter<'_, K> {}

impl<K> Iter<'_, K> {
    /// Both ends must be `None`, or point at nodes of the same tree with `head <= tail`.
    pub(crate) fn new(head: Link<K>, tail: Link<K>) -> Self {
        debug_assert_eq!(head.is_none(), tail.is_none());

        Self {
            head,
            tail,
            _tree: PhantomData,
        }
    }
}

impl<K> Clone for Iter<'_, K> {
    #[inline]
    fn clone(&self) -> Self {
        Self::new(self.head, self.tail)
    }
}

impl<K: fmt::Debug> fmt::Debug for Iter<'_, K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.clone()).finish()
    }
}

impl<'a, K> Iterator for Iter<'a, K> {
    type Item = &'a K;

    fn next(&mut self) -> Option<Self::Item> {
        let head = self.head?;

        if Some(head) == self.tail {
            self.head = None;
            self.tail = None;
        } else {
            // Safety: head is a live node between the two ends
            self.head = unsafe { utils::next(head) };
        }

        // Safety: the node is live for as long as the tree is borrowed
        Some(unsafe { Node::key(head) })
    }
}

impl<K> DoubleEndedIterator for Iter<'_, K> {
    fn next_back(&mut self) -> Option<Self::Item> {
        let tail = self.tail?;

        if Some(tail) == self.head {
            self.head = None;
            self.tail = None;
        } else {
            // Safety: tail is a live node between the two ends
            self.tail = unsafe { utils::prev(tail) };
        }

        // Safety: the node is live for as long as the tree is borrowed
        Some(unsafe { Node::key(tail) })
    }
}

impl<K> FusedIterator for Iter<'_, K> {}

/// An owning iterator over the keys of an [`RBTree`], in order.
///
/// Every step detaches one node from the tree, so the remaining keys are dropped together with the
/// iterator.
pub struct IntoIter<K, C> {
    pub(crate) tree: RBTree<K, C>,
}

impl<K: fmt::Debug, C> fmt::Debug for IntoIter<K, C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("IntoIter").field(&self.tree).finish()
    }
}

impl<K, C> Iterator for IntoIter<K, C> {
    type Item = K;

    fn next(&mut self) -> Option<Self::Item> {
        self.tree.pop_first()
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.tree.size(), Some(self.tree.size()))
    }
}

impl<K, C> DoubleEndedIterator for IntoIter<K, C> {
    fn next_back(&mut self) -> Option<Self::Item> {
        self.tree.pop_last()
    }
}

impl<K, C> ExactSizeIterator for IntoIter<K, C> {}

impl<K, C> FusedIterator for IntoIter<K, C> {}
