//! Intrusive red-black trees with subtree counts.
//!
//! Two representations share one balancing core:
//!
//! - [`RbTree`]: nodes embed [`Links`] and are threaded together by pointer. The tree never
//!   allocates; it takes ownership of node handles through [`cordyceps::Linked`] and hands them
//!   back on removal. Parent pointers give O(log n) neighbor steps, and subtree counts give
//!   O(log n) [`rank`](RbTree::rank) and [`nth`](RbTree::nth).
//! - [`compact::RbHash`]: nodes are integer ids into a caller-owned array, and all links live in
//!   a flat table of 8 to 64 bit words, one red-black tree per hash bucket.
//!
//! Both can be checked with the validator in [`diag`].

use core::{
    borrow::Borrow, cell::UnsafeCell, cmp::Ordering, fmt, marker::PhantomPinned, pin::Pin,
    ptr::NonNull,
};

use cordyceps::Linked;

pub mod balance;
pub mod compact;
pub mod diag;
mod error;
mod iter;
pub mod order;
pub mod store;
mod tagged;

#[cfg(any(test, feature = "model"))]
pub mod model;


pub use crate::{
    diag::Violations,
    error::{Error, LayoutError},
    iter::Iter,
    store::{max_path_len, Color, Dir, NodeRead, NodeStore},
};
use crate::tagged::ColorPtr;

pub trait TreeNode<L>: Linked<L> {
    type Key: Ord + fmt::Debug;

    fn key(&self) -> &Self::Key;
}

/// An intrusive red-black tree.
///
/// Equal keys are allowed; a later insert lands after the existing equal nodes in order.
pub struct RbTree<T>
where
    T: TreeNode<Links<T>>,
{
    raw: RawTree<T>,
}

/// Tree links embedded in every node.
///
/// A node is detached exactly when its subtree count is zero.
pub struct Links<T> {
    inner: UnsafeCell<LinksInner<T>>,
}

#[repr(C)]
struct LinksInner<T> {
    parent: ColorPtr<T>,
    children: [Link<T>; 2],
    count: usize,
    _unpin: PhantomPinned,
}

type Link<T> = Option<NonNull<T>>;

// The pointer-linked store driven by `balance`. Kept private so that only pointers to nodes this
// tree owns ever reach the unchecked dereferences below.
pub(crate) struct RawTree<T> {
    root: Link<T>,
    len: usize,
}

impl<T> RawTree<T>
where
    T: TreeNode<Links<T>>,
{
    #[inline]
    fn links<'a>(node: NonNull<T>) -> &'a Links<T> {
        // SAFETY: every pointer reaching the store belongs to a node owned by the tree.
        unsafe { T::links(node).as_ref() }
    }

    #[inline]
    fn links_mut<'a>(node: NonNull<T>) -> &'a mut Links<T> {
        // SAFETY: as above; the tree holds the only access path to linked nodes while `&mut`.
        unsafe { T::links(node).as_mut() }
    }
}

impl<T> NodeRead for RawTree<T>
where
    T: TreeNode<Links<T>>,
{
    type Ref = NonNull<T>;

    const PARENTS: bool = true;
    const COUNTS: bool = true;

    fn root(&self) -> Link<T> {
        self.root
    }

    fn child(&self, node: NonNull<T>, dir: Dir) -> Link<T> {
        Self::links(node).child(dir)
    }

    fn parent(&self, node: NonNull<T>) -> Link<T> {
        Self::links(node).parent()
    }

    fn color(&self, node: NonNull<T>) -> Color {
        Self::links(node).color()
    }

    fn count(&self, node: NonNull<T>) -> usize {
        Self::links(node).count()
    }

    fn compare(&self, a: NonNull<T>, b: NonNull<T>) -> Ordering {
        // SAFETY: both nodes are owned by the tree.
        unsafe { a.as_ref().key().cmp(b.as_ref().key()) }
    }

    fn capacity(&self) -> usize {
        self.len
    }

    fn expected_len(&self) -> Option<usize> {
        Some(self.len)
    }
}

impl<T> NodeStore for RawTree<T>
where
    T: TreeNode<Links<T>>,
{
    fn set_root(&mut self, root: Link<T>) {
        self.root = root;
    }

    fn set_child(&mut self, node: NonNull<T>, dir: Dir, child: Link<T>) {
        Self::links_mut(node).set_child(dir, child);
    }

    fn set_parent(&mut self, node: NonNull<T>, parent: Link<T>) {
        Self::links_mut(node).set_parent(parent);
    }

    fn set_color(&mut self, node: NonNull<T>, color: Color) {
        Self::links_mut(node).set_color(color);
    }

    fn set_count(&mut self, node: NonNull<T>, count: usize) {
        Self::links_mut(node).set_count(count);
    }

    fn is_linked(&self, node: NonNull<T>) -> bool {
        Self::links(node).is_linked()
    }
}

impl<T> RbTree<T>
where
    T: TreeNode<Links<T>>,
{
    /// Returns a new empty tree.
    pub const fn new() -> RbTree<T> {
        RbTree {
            raw: RawTree { root: None, len: 0 },
        }
    }

    /// Returns `true` if the tree contains no elements.
    pub const fn is_empty(&self) -> bool {
        let empty = self.len() == 0;

        if cfg!(debug_assertions) {
            // Can't use assert_eq!() in const fn.
            assert!(empty == self.raw.root.is_none());
        }

        empty
    }

    /// Returns the number of elements in the tree.
    pub const fn len(&self) -> usize {
        self.raw.len
    }

    /// Inserts an item into the tree.
    ///
    /// If the node is already linked into a tree, it is handed back untouched.
    ///
    /// This operation completes in _O(log(n))_ time.
    pub fn insert(&mut self, item: T::Handle) -> Result<NonNull<T>, T::Handle> {
        self.insert_from(None, item)
    }

    /// Inserts an item, starting the search at `hint` instead of the root.
    ///
    /// A hint adjacent to the item's final position makes the descent short. A hint that does not
    /// bound the key is detected and the insert falls back to a search from the root.
    ///
    /// # Safety
    ///
    /// `hint` must be an element of `self`.
    pub unsafe fn insert_near(
        &mut self,
        hint: NonNull<T>,
        item: T::Handle,
    ) -> Result<NonNull<T>, T::Handle> {
        self.insert_from(Some(hint), item)
    }

    fn insert_from(&mut self, hint: Link<T>, item: T::Handle) -> Result<NonNull<T>, T::Handle> {
        let ptr = T::into_ptr(item);

        if !balance::insert(&mut self.raw, hint, ptr) {
            // SAFETY: `ptr` came from `into_ptr` just above and was not linked here.
            return Err(unsafe { T::from_ptr(ptr) });
        }

        self.raw.len += 1;
        Ok(ptr)
    }

    /// Returns a reference to a node whose key equals `key`.
    pub fn get<Q>(&self, key: &Q) -> Option<Pin<&T>>
    where
        T::Key: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        let ptr = self.get_raw(key)?;
        unsafe { Some(Pin::new_unchecked(ptr.as_ref())) }
    }

    pub(crate) fn get_raw<Q>(&self, key: &Q) -> Link<T>
    where
        T::Key: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        balance::find(&self.raw, |node| unsafe { key.cmp(node.as_ref().key().borrow()) })
    }

    /// Returns the minimum element of the tree.
    pub fn first(&self) -> Option<Pin<&T>> {
        self.extreme(Dir::Left)
            .map(|first| unsafe { Pin::new_unchecked(first.as_ref()) })
    }

    /// Returns the maximum element of the tree.
    pub fn last(&self) -> Option<Pin<&T>> {
        self.extreme(Dir::Right)
            .map(|last| unsafe { Pin::new_unchecked(last.as_ref()) })
    }

    fn extreme(&self, dir: Dir) -> Link<T> {
        self.raw
            .root
            .map(|root| balance::extreme(&self.raw, root, dir))
    }

    /// Returns the in-order successor of `node`.
    ///
    /// # Safety
    ///
    /// `node` must be an element of `self`.
    pub unsafe fn successor(&self, node: NonNull<T>) -> Link<T> {
        balance::step(&self.raw, node, Dir::Right)
    }

    /// Returns the in-order predecessor of `node`.
    ///
    /// # Safety
    ///
    /// `node` must be an element of `self`.
    pub unsafe fn predecessor(&self, node: NonNull<T>) -> Link<T> {
        balance::step(&self.raw, node, Dir::Left)
    }

    /// Returns the zero-based in-order position of `node`.
    ///
    /// # Safety
    ///
    /// `node` must be an element of `self`.
    pub unsafe fn rank(&self, node: NonNull<T>) -> usize {
        order::rank(&self.raw, node)
    }

    /// Returns the element at zero-based in-order position `index`.
    pub fn nth(&self, index: usize) -> Option<Pin<&T>> {
        let node = order::select(&self.raw, self.raw.root, index)?;
        unsafe { Some(Pin::new_unchecked(node.as_ref())) }
    }

    /// Removes a node whose key equals `key` and returns its handle.
    pub fn remove<Q>(&mut self, key: &Q) -> Option<T::Handle>
    where
        T::Key: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        let node = self.get_raw(key)?;
        unsafe { Some(self.remove_at(node)) }
    }

    /// Removes an arbitrary node from the tree.
    ///
    /// The node comes back detached and may be inserted again.
    ///
    /// # Safety
    ///
    /// It is the caller's responsibility to ensure that `node` is an element of `self`, and not any
    /// other tree.
    pub unsafe fn remove_at(&mut self, node: NonNull<T>) -> T::Handle {
        balance::remove(&mut self.raw, node);
        self.raw.len -= 1;

        unsafe { T::from_ptr(node) }
    }

    /// Removes and returns the minimum element.
    pub fn pop_first(&mut self) -> Option<T::Handle> {
        let first = self.extreme(Dir::Left)?;
        unsafe { Some(self.remove_at(first)) }
    }

    /// Removes and returns the maximum element.
    pub fn pop_last(&mut self) -> Option<T::Handle> {
        let last = self.extreme(Dir::Right)?;
        unsafe { Some(self.remove_at(last)) }
    }

    /// Clears the tree, detaching and dropping every element.
    ///
    /// Runs in _O(n)_ time without rebalancing.
    pub fn clear(&mut self) {
        let mut opt_cur = self.raw.root;

        while let Some(cur) = opt_cur {
            // Descend to the minimum node. It has no left child and is a left child itself.
            let min = balance::extreme(&self.raw, cur, Dir::Left);
            let parent = self.raw.parent(min);
            let right = self.raw.right(min);

            // Elevate the node's right child (which may be None).
            match parent {
                Some(parent) => self.raw.set_child(parent, Dir::Left, right),
                None => self.raw.set_root(right),
            }
            if let Some(right) = right {
                self.raw.set_parent(right, parent);
            }

            self.raw.detach(min);
            drop(unsafe { T::from_ptr(min) });
            self.raw.len -= 1;

            // Continue in the right subtree, or climb to the parent. If the node had neither, the
            // tree is empty.
            opt_cur = right.or(parent);
        }

        debug_assert!(self.raw.root.is_none());
        debug_assert_eq!(self.len(), 0);
    }

    /// Returns an iterator over the elements in key order.
    pub fn iter(&self) -> Iter<'_, T> {
        Iter::new(&self.raw)
    }

    /// Checks every structural invariant and reports all violations found.
    pub fn validate(&self) -> Violations {
        diag::validate(&self.raw)
    }

    /// Checks structural invariants, stopping at the first violation.
    pub fn validate_first(&self) -> Violations {
        diag::validate_first(&self.raw)
    }

    #[doc(hidden)]
    #[track_caller]
    pub fn assert_invariants(&self) {
        let violations = self.validate();
        assert!(violations.is_empty(), "tree failed validation: {violations:?}");
    }

    /// Writes an indented outline of the tree with each node's key, color and subtree count.
    pub fn dump<W: fmt::Write>(&self, w: W) -> fmt::Result {
        diag::dump(&self.raw, w, |w, node| {
            write!(w, "{:?}", unsafe { node.as_ref().key() })
        })
    }

    /// Writes the tree as a Graphviz digraph named `name`.
    pub fn dotgraph<W: fmt::Write>(&self, name: &str, w: W) -> fmt::Result {
        diag::dotgraph(&self.raw, name, w, |node| {
            format!("{:?}", unsafe { node.as_ref().key() })
        })
    }
}

impl<T> Default for RbTree<T>
where
    T: TreeNode<Links<T>>,
{
    fn default() -> Self {
        RbTree::new()
    }
}

impl<T> Drop for RbTree<T>
where
    T: TreeNode<Links<T>>,
{
    fn drop(&mut self) {
        self.clear();
    }
}

impl<T> Links<T> {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            inner: UnsafeCell::new(LinksInner {
                parent: ColorPtr::null(),
                children: [None; 2],
                count: 0,
                _unpin: PhantomPinned,
            }),
        }
    }

    /// Returns `true` if the node is currently an element of a tree.
    #[inline]
    pub fn is_linked(&self) -> bool {
        self.count() != 0
    }

    #[inline]
    fn parent(&self) -> Link<T> {
        unsafe { (*self.inner.get()).parent.ptr() }
    }

    #[inline]
    fn color(&self) -> Color {
        unsafe { (*self.inner.get()).parent.color() }
    }

    #[inline]
    fn count(&self) -> usize {
        unsafe { (*self.inner.get()).count }
    }

    #[inline]
    fn child(&self, dir: Dir) -> Link<T> {
        unsafe { (*self.inner.get()).children[dir as usize] }
    }

    #[inline]
    fn set_parent(&mut self, parent: Link<T>) {
        self.inner.get_mut().parent.set_ptr(parent);
    }

    #[inline]
    fn set_color(&mut self, color: Color) {
        self.inner.get_mut().parent.set_color(color);
    }

    #[inline]
    fn set_count(&mut self, count: usize) {
        self.inner.get_mut().count = count;
    }

    #[inline]
    fn set_child(&mut self, dir: Dir, child: Link<T>) {
        self.inner.get_mut().children[dir as usize] = child;
    }
}

impl<T> Default for Links<T> {
    fn default() -> Self {
        Links::new()
    }
}

impl<T> fmt::Debug for Links<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Links")
            .field("parent", &self.parent())
            .field("left", &self.child(Dir::Left))
            .field("right", &self.child(Dir::Right))
            .field("color", &self.color())
            .field("count", &self.count())
            .finish()
    }
}
