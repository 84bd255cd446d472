use crate::node::{Link, Node};
use core::fmt;
use core::ptr::NonNull;

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub(crate) enum Side {
    Left,
    Right,
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Side::Left => f.write_str("left"),
            Side::Right => f.write_str("right"),
        }
    }
}

impl Side {
    pub(crate) fn opposite(self) -> Side {
        match self {
            Side::Left => Side::Right,
            Side::Right => Side::Left,
        }
    }
}

/// Returns which child of `parent` the given link is.
///
/// `node` may be `None` to ask for the side of an empty slot, in that case the left slot wins if
/// both are empty.
pub(crate) unsafe fn side_of<K>(node: Link<K>, parent: NonNull<Node<K>>) -> Side {
    // Safety: ensured by caller
    let parent_links = unsafe { Node::links(parent) };
    if parent_links.left() == node {
        Side::Left
    } else {
        debug_assert_eq!(
            parent_links.right(),
            node,
            "node is not a child of parent; parent={parent_links:#?}"
        );
        Side::Right
    }
}

pub(crate) unsafe fn find_minimum<K>(mut curr: NonNull<Node<K>>) -> NonNull<Node<K>> {
    // Safety: ensured by caller
    while let Some(left) = unsafe { Node::links(curr).left() } {
        curr = left;
    }

    curr
}

pub(crate) unsafe fn find_maximum<K>(mut curr: NonNull<Node<K>>) -> NonNull<Node<K>> {
    // Safety: ensured by caller
    while let Some(right) = unsafe { Node::links(curr).right() } {
        curr = right;
    }

    curr
}

/// Returns the in-order successor of `node`, or `None` if `node` holds the greatest key.
pub(crate) unsafe fn next<K>(node: NonNull<Node<K>>) -> Link<K> {
    // Safety: ensured by caller, all links reachable from a live node are live
    unsafe {
        // If we have a right child, its least descendant is our next node
        if let Some(right) = Node::links(node).right() {
            return Some(find_minimum(right));
        }

        let mut curr = node;
        while let Some(parent) = Node::links(curr).parent() {
            // if we're not our parent's right/greater child, that parent is our next node
            if Node::links(parent).right() != Some(curr) {
                return Some(parent);
            }
            curr = parent;
        }

        // we reached the tree root without finding a next node
        None
    }
}

/// Returns the in-order predecessor of `node`, or `None` if `node` holds the smallest key.
pub(crate) unsafe fn prev<K>(node: NonNull<Node<K>>) -> Link<K> {
    // Safety: ensured by caller, all links reachable from a live node are live
    unsafe {
        // If we have a left child, its greatest descendant is our previous node
        if let Some(left) = Node::links(node).left() {
            return Some(find_maximum(left));
        }

        let mut curr = node;
        while let Some(parent) = Node::links(curr).parent() {
            // if we're not our parent's left/lesser child, that parent is our previous node
            if Node::links(parent).left() != Some(curr) {
                return Some(parent);
            }
            curr = parent;
        }

        None
    }
}
