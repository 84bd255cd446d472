use core::cmp::Ordering;

/// A strict total order over keys of type `Q`.
///
/// Every ordering decision an [`RBTree`][crate::RBTree] makes goes through its comparator. Two
/// keys are considered *equal* when the comparator returns [`Ordering::Equal`], i.e. when neither
/// is less than the other.
///
/// Implementations must be consistent: antisymmetric, transitive and return the same result for
/// the same inputs for as long as keys are stored in a tree. Violating this does not cause
/// undefined behaviour, but lookups may miss keys and [`RBTree::assert_valid`] will fail.
///
/// This trait is implemented for [`Natural`] (the [`Ord`] order of the key) and for every closure
/// of the shape `Fn(&Q, &Q) -> Ordering`:
///
/// ```rust
/// use core::cmp::Ordering;
/// use rbtree::RBTree;
///
/// let mut tree = RBTree::with_comparator(|a: &u32, b: &u32| b.cmp(a));
/// tree.extend([1, 3, 2]);
///
/// assert_eq!(tree.iter().copied().collect::<Vec<_>>(), [3, 2, 1]);
/// ```
///
/// [`RBTree::assert_valid`]: crate::RBTree::assert_valid
pub trait Compare<Q: ?Sized> {
    /// Compares `a` with `b`.
    fn compare(&self, a: &Q, b: &Q) -> Ordering;
}

/// The comparator ordering keys by their [`Ord`] implementation.
///
/// This is the default comparator of [`RBTree`][crate::RBTree]. It implements [`Compare<Q>`]
/// for every `Q: Ord`, which lets lookups use any borrowed form of the key (e.g. `&str` for
/// `String` keys).
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Natural;

impl<Q: Ord + ?Sized> Compare<Q> for Natural {
    #[inline]
    fn compare(&self, a: &Q, b: &Q) -> Ordering {
        a.cmp(b)
    }
}

impl<Q: ?Sized, F> Compare<Q> for F
where
    F: Fn(&Q, &Q) -> Ordering,
{
    #[inline]
    fn compare(&self, a: &Q, b: &Q) -> Ordering {
        self(a, b)
    }
}
