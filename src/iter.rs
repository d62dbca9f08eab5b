use core::iter::FusedIterator;

use crate::{balance, Dir, Link, Links, NodeRead, RawTree, TreeNode};

/// In-order iterator over an [`RbTree`](crate::RbTree), stepping along parent pointers.
pub struct Iter<'tree, T: TreeNode<Links<T>>> {
    raw: &'tree RawTree<T>,
    front: Link<T>,
    back: Link<T>,
    len: usize,
}

impl<'tree, T: TreeNode<Links<T>>> Iter<'tree, T> {
    pub(crate) fn new(raw: &'tree RawTree<T>) -> Self {
        let root = raw.root();

        Iter {
            raw,
            front: root.map(|r| balance::extreme(raw, r, Dir::Left)),
            back: root.map(|r| balance::extreme(raw, r, Dir::Right)),
            len: raw.len,
        }
    }
}

impl<'tree, T: TreeNode<Links<T>>> Iterator for Iter<'tree, T> {
    type Item = &'tree T;

    fn next(&mut self) -> Option<Self::Item> {
        if self.len == 0 {
            return None;
        }

        let cur = self.front?;
        self.front = balance::step(self.raw, cur, Dir::Right);
        self.len -= 1;

        Some(unsafe { cur.as_ref() })
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.len, Some(self.len))
    }
}

impl<'tree, T: TreeNode<Links<T>>> DoubleEndedIterator for Iter<'tree, T> {
    fn next_back(&mut self) -> Option<Self::Item> {
        if self.len == 0 {
            return None;
        }

        let cur = self.back?;
        self.back = balance::step(self.raw, cur, Dir::Left);
        self.len -= 1;

        Some(unsafe { cur.as_ref() })
    }
}

impl<'tree, T: TreeNode<Links<T>>> ExactSizeIterator for Iter<'tree, T> {}

impl<'tree, T: TreeNode<Links<T>>> FusedIterator for Iter<'tree, T> {}

impl<'tree, T: TreeNode<Links<T>>> IntoIterator for &'tree crate::RbTree<T> {
    type Item = &'tree T;
    type IntoIter = Iter<'tree, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}
