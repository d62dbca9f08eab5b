//! Order statistics over subtree counts.
//!
//! Both walks are O(log n) in a balanced tree and never compare keys.

use crate::store::NodeRead;

/// Returns the zero-based in-order position of `node`.
///
/// Requires a store that tracks both parents and counts.
pub fn rank<S: NodeRead>(s: &S, node: S::Ref) -> usize {
    debug_assert!(S::PARENTS && S::COUNTS);

    let mut index = s.weight(s.left(node));
    let mut cur = node;

    while let Some(parent) = s.parent(cur) {
        if s.right(parent) == Some(cur) {
            index += s.weight(s.left(parent)) + 1;
        }
        cur = parent;
    }

    index
}

/// Returns the node at zero-based in-order position `index` within the subtree rooted at
/// `subtree`, or `None` if the subtree holds `index` nodes or fewer.
pub fn select<S: NodeRead>(s: &S, subtree: Option<S::Ref>, mut index: usize) -> Option<S::Ref> {
    debug_assert!(S::COUNTS);

    let mut cur = subtree?;

    loop {
        let left = s.left(cur);
        let left_count = s.weight(left);

        if index == left_count {
            return Some(cur);
        }

        if index < left_count {
            cur = left?;
        } else {
            index -= left_count + 1;
            cur = s.right(cur)?;
        }
    }
}
