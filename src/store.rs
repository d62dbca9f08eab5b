//! Node storage capabilities.
//!
//! The balancing algorithms in [`balance`](crate::balance) and the checks in
//! [`diag`](crate::diag) never touch a node directly. They go through [`NodeRead`] and
//! [`NodeStore`], which are implemented once for pointer-linked nodes ([`RbTree`]) and once for
//! packed-array nodes ([`RbHash`] buckets).
//!
//! [`RbTree`]: crate::RbTree
//! [`RbHash`]: crate::compact::RbHash

use core::{cmp::Ordering, fmt, ops::Not};

/// A child direction.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Dir {
    Left = 0,
    Right = 1,
}

impl Dir {
    /// Returns the direction selected by the low bit of `bits`.
    #[inline]
    pub const fn from_bit(bits: usize) -> Dir {
        if bits & 1 == 0 {
            Dir::Left
        } else {
            Dir::Right
        }
    }
}

impl Not for Dir {
    type Output = Dir;

    fn not(self) -> Self::Output {
        match self {
            Dir::Left => Dir::Right,
            Dir::Right => Dir::Left,
        }
    }
}

/// Node color. `Black` is zero so that zeroed storage reads as black.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Color {
    Black = 0,
    Red = 1,
}

impl Color {
    #[inline]
    pub const fn from_bit(bits: usize) -> Color {
        if bits & 1 == 0 {
            Color::Black
        } else {
            Color::Red
        }
    }

    #[inline]
    pub const fn is_red(self) -> bool {
        matches!(self, Color::Red)
    }
}

/// Read-only access to a tree's structure.
///
/// `Ref` is whatever identifies a node in the representation: a pointer for linked nodes, a
/// packed reference for array nodes. A missing child is `None`, which behaves like the shared
/// leaf sentinel: black, with a subtree count of zero.
pub trait NodeRead {
    type Ref: Copy + Eq + fmt::Debug;

    /// Whether [`parent`](NodeRead::parent) returns real parent links.
    const PARENTS: bool;

    /// Whether [`count`](NodeRead::count) returns real subtree counts.
    const COUNTS: bool;

    fn root(&self) -> Option<Self::Ref>;

    fn child(&self, node: Self::Ref, dir: Dir) -> Option<Self::Ref>;

    /// Returns the parent of `node`, or `None` for the root or if parents are not tracked.
    fn parent(&self, node: Self::Ref) -> Option<Self::Ref>;

    fn color(&self, node: Self::Ref) -> Color;

    /// Returns the subtree count of `node`, or zero if counts are not tracked.
    fn count(&self, node: Self::Ref) -> usize;

    /// Orders two linked nodes.
    fn compare(&self, a: Self::Ref, b: Self::Ref) -> Ordering;

    /// Upper bound on the number of nodes the tree may hold. Bounds traversal depth.
    fn capacity(&self) -> usize;

    /// Number of nodes the owning structure believes are linked, if it keeps track.
    fn expected_len(&self) -> Option<usize> {
        None
    }

    /// Returns `false` if the representation's sentinel storage has been overwritten.
    fn sentinel_intact(&self) -> bool {
        true
    }

    /// Returns `false` if `node` does not name a valid slot of the representation.
    fn in_range(&self, _node: Self::Ref) -> bool {
        true
    }

    #[inline]
    fn left(&self, node: Self::Ref) -> Option<Self::Ref> {
        self.child(node, Dir::Left)
    }

    #[inline]
    fn right(&self, node: Self::Ref) -> Option<Self::Ref> {
        self.child(node, Dir::Right)
    }

    /// Color of a possibly-missing node.
    #[inline]
    fn color_of(&self, node: Option<Self::Ref>) -> Color {
        node.map_or(Color::Black, |n| self.color(n))
    }

    /// Subtree count of a possibly-missing node.
    #[inline]
    fn weight(&self, node: Option<Self::Ref>) -> usize {
        node.map_or(0, |n| self.count(n))
    }
}

/// Mutable access to a tree's structure, as needed by the balancing algorithms.
///
/// Setters never cascade: `set_child` does not touch the child's parent link, and nothing
/// recomputes counts implicitly.
pub trait NodeStore: NodeRead {
    fn set_root(&mut self, root: Option<Self::Ref>);

    fn set_child(&mut self, node: Self::Ref, dir: Dir, child: Option<Self::Ref>);

    fn set_parent(&mut self, node: Self::Ref, parent: Option<Self::Ref>);

    fn set_color(&mut self, node: Self::Ref, color: Color);

    /// Sets the subtree count of `node`. Stores without counts ignore this.
    fn set_count(&mut self, node: Self::Ref, count: usize);

    /// Returns `true` if `node` is currently part of a tree.
    fn is_linked(&self, node: Self::Ref) -> bool;

    /// Resets `node` to the detached state.
    fn detach(&mut self, node: Self::Ref) {
        self.set_child(node, Dir::Left, None);
        self.set_child(node, Dir::Right, None);
        self.set_parent(node, None);
        self.set_color(node, Color::Black);
        self.set_count(node, 0);
    }
}

/// Maximum number of references on a root-to-node path in a red-black tree of at most
/// `max_nodes` nodes, counting the root slot itself: `floor(2 * log2(max_nodes / 2 + 1)) + 1`.
///
/// This is one more than the greatest height such a tree can reach.
pub const fn max_path_len(max_nodes: u64) -> usize {
    // floor(2 * log2(n / 2 + 1)) == floor(log2((n + 2)^2)) - 2, which stays in integers.
    let n = if max_nodes > 1 << 63 { 1 << 63 } else { max_nodes };
    let shifted = n as u128 + 2;
    ((shifted * shifted).ilog2() - 2) as usize + 1
}
