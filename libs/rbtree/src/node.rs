use crate::utils::Side;
use alloc::boxed::Box;
use core::cell::UnsafeCell;
use core::ptr::NonNull;
use core::{fmt, mem};

pub(crate) type Link<K> = Option<NonNull<Node<K>>>;

/// The color tag of a node.
///
/// Missing children (`None` links) are treated as black everywhere.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub(crate) enum Color {
    Red,
    Black,
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Color::Red => f.write_str("red"),
            Color::Black => f.write_str("black"),
        }
    }
}

/// A heap allocated tree node.
///
/// Every node is allocated through [`Node::alloc`] and handed back to the allocator through
/// [`Node::into_key`]. The tree owns both children of a node exclusively, the parent pointer is a
/// plain back-reference that is only ever used to walk upwards.
pub(crate) struct Node<K> {
    links: Links<K>,
    key: K,
}

impl<K> Node<K> {
    /// Allocates a new, unlinked, red node holding `key`.
    pub(crate) fn alloc(key: K) -> NonNull<Self> {
        NonNull::from(Box::leak(Box::new(Self {
            links: Links::new(),
            key,
        })))
    }

    /// Frees the node and returns the key it was holding.
    ///
    /// # Safety
    ///
    /// `ptr` must have been returned from [`Node::alloc`], must not be reachable from any tree
    /// anymore and must not be used after this call.
    pub(crate) unsafe fn into_key(ptr: NonNull<Self>) -> K {
        // Safety: ensured by caller
        let node = *unsafe { Box::from_raw(ptr.as_ptr()) };
        debug_assert!(!node.links.is_linked(), "freeing a node that is still linked");
        node.key
    }

    /// Returns the links of the node pointed to by `ptr`.
    ///
    /// # Safety
    ///
    /// `ptr` must point to a live node, and the returned reference must not outlive it.
    #[inline]
    pub(crate) unsafe fn links<'a>(ptr: NonNull<Self>) -> &'a Links<K> {
        // Safety: ensured by caller. We only ever borrow the `links` field here, which is
        // interior-mutable, so this never aliases a reference to `key`.
        unsafe { &(*ptr.as_ptr()).links }
    }

    /// Returns the key of the node pointed to by `ptr`.
    ///
    /// # Safety
    ///
    /// `ptr` must point to a live node, and the returned reference must not outlive it.
    #[inline]
    pub(crate) unsafe fn key<'a>(ptr: NonNull<Self>) -> &'a K {
        // Safety: ensured by caller. Keys are never mutated while a node is allocated.
        unsafe { &(*ptr.as_ptr()).key }
    }
}

/// Links to other nodes in an [`RBTree`][crate::RBTree].
///
/// All accessors take `&self` and go through an `UnsafeCell`, so links of several nodes can be
/// rewired at the same time during rotations without ever holding two `&mut` to the same node.
pub(crate) struct Links<K> {
    inner: UnsafeCell<LinksInner<K>>,
}

struct LinksInner<K> {
    color: Color,
    up: Link<K>,
    left: Link<K>,
    right: Link<K>,
}

impl<K> fmt::Debug for Links<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Links")
            .field("self", &format_args!("{self:p}"))
            .field("color", &self.color())
            .field("parent", &self.parent())
            .field("left", &self.left())
            .field("right", &self.right())
            .finish()
    }
}

impl<K> Links<K> {
    /// New nodes always start out red and unlinked.
    const fn new() -> Self {
        Self {
            inner: UnsafeCell::new(LinksInner {
                color: Color::Red,
                up: None,
                left: None,
                right: None,
            }),
        }
    }

    #[inline]
    fn get(&self) -> &LinksInner<K> {
        // Safety: the tree is single threaded and no `&mut LinksInner` ever escapes a setter
        unsafe { &*self.inner.get() }
    }

    #[inline]
    #[allow(clippy::mut_from_ref, reason = "interior mutability through UnsafeCell")]
    fn get_mut(&self) -> &mut LinksInner<K> {
        // Safety: the tree is single threaded and setters never hand out the reference
        unsafe { &mut *self.inner.get() }
    }

    /// Returns `true` if this node is currently linked to another node.
    pub(crate) fn is_linked(&self) -> bool {
        let inner = self.get();
        inner.up.is_some() || inner.left.is_some() || inner.right.is_some()
    }

    /// Resets the links to the state of a freshly allocated node.
    pub(crate) fn unlink(&self) {
        let inner = self.get_mut();
        inner.up = None;
        inner.left = None;
        inner.right = None;
        inner.color = Color::Red;
    }

    #[inline]
    pub(crate) fn color(&self) -> Color {
        self.get().color
    }
    #[inline]
    pub(crate) fn set_color(&self, color: Color) {
        self.get_mut().color = color;
    }
    #[inline]
    pub(crate) fn is_red(&self) -> bool {
        self.color() == Color::Red
    }
    #[inline]
    pub(crate) fn is_black(&self) -> bool {
        self.color() == Color::Black
    }

    #[cfg(feature = "dot")]
    pub(crate) fn is_leaf(&self) -> bool {
        self.left().is_none() && self.right().is_none()
    }

    #[inline]
    pub(crate) fn parent(&self) -> Link<K> {
        self.get().up
    }
    #[inline]
    pub(crate) fn left(&self) -> Link<K> {
        self.get().left
    }
    #[inline]
    pub(crate) fn right(&self) -> Link<K> {
        self.get().right
    }
    #[inline]
    pub(crate) fn child(&self, side: Side) -> Link<K> {
        match side {
            Side::Left => self.left(),
            Side::Right => self.right(),
        }
    }

    #[inline]
    pub(crate) fn replace_parent(&self, lk: Link<K>) -> Link<K> {
        mem::replace(&mut self.get_mut().up, lk)
    }
    #[inline]
    pub(crate) fn replace_left(&self, lk: Link<K>) -> Link<K> {
        mem::replace(&mut self.get_mut().left, lk)
    }
    #[inline]
    pub(crate) fn replace_right(&self, lk: Link<K>) -> Link<K> {
        mem::replace(&mut self.get_mut().right, lk)
    }
    #[inline]
    pub(crate) fn replace_child(&self, side: Side, child: Link<K>) -> Link<K> {
        match side {
            Side::Left => self.replace_left(child),
            Side::Right => self.replace_right(child),
        }
    }

    /// Asserts the local link invariants of this node: no self references and no link pointing
    /// at the same node twice.
    #[track_caller]
    pub(crate) fn assert_valid(&self, this: NonNull<Node<K>>) {
        let this = Some(this);

        assert_ne!(self.parent(), this, "node's parent cannot be itself; node={self:#?}");
        assert_ne!(self.left(), this, "node's left child cannot be itself; node={self:#?}");
        assert_ne!(self.right(), this, "node's right child cannot be itself; node={self:#?}");

        if self.parent().is_some() {
            assert_ne!(
                self.parent(),
                self.left(),
                "node's parent and left child cannot be the same; node={self:#?}"
            );
            assert_ne!(
                self.parent(),
                self.right(),
                "node's parent and right child cannot be the same; node={self:#?}"
            );
        }
        if self.left().is_some() {
            assert_ne!(
                self.left(),
                self.right(),
                "node's left and right children cannot be the same; node={self:#?}"
            );
        }
    }
}

/// Returns the color of a link, treating `None` as black.
#[inline]
pub(crate) fn link_color<K>(link: Link<K>) -> Color {
    match link {
        // Safety: links stored in a tree always point to live nodes
        Some(node) => unsafe { Node::links(node).color() },
        None => Color::Black,
    }
}
