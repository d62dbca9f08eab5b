//! Red-black insertion, removal and rotation over any [`NodeStore`].
//!
//! Every function here assumes the store holds a valid red-black tree on entry and leaves one on
//! exit. Subtree counts are maintained whenever the store tracks them.

use core::cmp::Ordering;

use crate::store::{Color, Dir, NodeStore};

#[inline]
pub(crate) fn which_child<S: NodeStore>(s: &S, parent: S::Ref, child: S::Ref) -> Dir {
    if s.left(parent) == Some(child) {
        Dir::Left
    } else {
        Dir::Right
    }
}

// Points whatever held `old` at `new`. `new`'s parent link is not updated.
#[inline]
fn replace_child_or_set_root<S: NodeStore>(
    s: &mut S,
    parent: Option<S::Ref>,
    old: S::Ref,
    new: Option<S::Ref>,
) {
    match parent {
        Some(parent) => {
            let dir = which_child(s, parent, old);
            s.set_child(parent, dir, new);
        }
        None => s.set_root(new),
    }
}

// Adds `delta` to the count of `from` and every ancestor of it.
fn adjust_counts<S: NodeStore>(s: &mut S, from: Option<S::Ref>, delta: isize) {
    if !S::COUNTS {
        return;
    }

    let mut cur = from;
    while let Some(node) = cur {
        let count = s.count(node);
        s.set_count(node, count.wrapping_add_signed(delta));
        cur = s.parent(node);
    }
}

/// Rotates `down` towards `dir`, raising its child on the opposite side into its place.
///
/// Only the counts of the two rotated nodes change, and both are recomputed from the subtrees
/// that moved.
pub fn rotate<S: NodeStore>(s: &mut S, down: S::Ref, dir: Dir) {
    let up = s
        .child(down, !dir)
        .expect("rotation requires a child on the rising side");
    let across = s.child(up, dir);

    s.set_child(down, !dir, across);
    if let Some(across) = across {
        s.set_parent(across, Some(down));
    }

    let parent = s.parent(down);
    replace_child_or_set_root(s, parent, down, Some(up));
    s.set_parent(up, parent);

    s.set_child(up, dir, Some(down));
    s.set_parent(down, Some(up));

    if S::COUNTS {
        let total = s.count(down);
        s.set_count(up, total);
        let kept = s.child(down, dir);
        s.set_count(down, 1 + s.weight(kept) + s.weight(across));
    }
}

/// Returns the outermost node of the subtree at `node` in direction `dir`.
pub fn extreme<S: NodeStore>(s: &S, mut node: S::Ref, dir: Dir) -> S::Ref {
    while let Some(next) = s.child(node, dir) {
        node = next;
    }

    node
}

/// Returns the in-order neighbor of `node` in direction `dir` (`Right` for the successor).
pub fn step<S: NodeStore>(s: &S, node: S::Ref, dir: Dir) -> Option<S::Ref> {
    if let Some(child) = s.child(node, dir) {
        return Some(extreme(s, child, !dir));
    }

    let mut cur = node;
    while let Some(parent) = s.parent(cur) {
        if s.child(parent, !dir) == Some(cur) {
            return Some(parent);
        }
        cur = parent;
    }

    None
}

/// Finds a node comparing equal under `cmp`, which orders the search subject against a node.
pub fn find<S, F>(s: &S, mut cmp: F) -> Option<S::Ref>
where
    S: NodeStore,
    F: FnMut(S::Ref) -> Ordering,
{
    let mut cur = s.root();

    while let Some(node) = cur {
        match cmp(node) {
            Ordering::Less => cur = s.left(node),
            Ordering::Equal => return Some(node),
            Ordering::Greater => cur = s.right(node),
        }
    }

    None
}

/// Inserts the detached `node`, starting the descent at `hint` if one is given.
///
/// Returns `false` without touching the tree if `node` is already linked.
pub fn insert<S: NodeStore>(s: &mut S, hint: Option<S::Ref>, node: S::Ref) -> bool {
    if s.is_linked(node) {
        return false;
    }

    let Some(root) = s.root() else {
        s.set_child(node, Dir::Left, None);
        s.set_child(node, Dir::Right, None);
        s.set_parent(node, None);
        s.set_color(node, Color::Black);
        s.set_count(node, 1);
        s.set_root(Some(node));
        return true;
    };

    let mut start = hint.unwrap_or(root);
    let (parent, dir) = loop {
        let (parent, dir, monotonic) = descend(s, start, node);

        if !monotonic || hint_bounds_hold(s, start, node, dir) {
            break (parent, dir);
        }

        tracing::trace!(
            target: "cordyceps_rbtree::balance",
            ?start,
            "insertion hint does not bound the key, restarting from the root"
        );
        start = root;
    };

    s.set_child(node, Dir::Left, None);
    s.set_child(node, Dir::Right, None);
    s.set_parent(node, Some(parent));
    s.set_color(node, Color::Red);
    s.set_count(node, 1);
    s.set_child(parent, dir, Some(node));
    adjust_counts(s, Some(parent), 1);

    rebalance_inserted(s, node);
    true
}

// Walks down from `start` to the null link where `node` belongs.
//
// Returns the would-be parent, the side to attach on, and whether every step went the same way.
fn descend<S: NodeStore>(s: &S, start: S::Ref, node: S::Ref) -> (S::Ref, Dir, bool) {
    let mut cur = start;
    let mut first = None;
    let mut monotonic = true;

    loop {
        let dir = match s.compare(node, cur) {
            Ordering::Less => Dir::Left,
            _ => Dir::Right,
        };

        match first {
            None => first = Some(dir),
            Some(first) if first != dir => monotonic = false,
            Some(_) => (),
        }

        match s.child(cur, dir) {
            Some(child) => cur = child,
            None => return (cur, dir, monotonic),
        }
    }
}

// A descent that only ever went `dir` from `hint` has one open bound: the nearest ancestor whose
// subtree holds `hint` on the opposite side. Checks `node` against that ancestor.
fn hint_bounds_hold<S: NodeStore>(s: &S, hint: S::Ref, node: S::Ref, dir: Dir) -> bool {
    let mut child = hint;

    while let Some(parent) = s.parent(child) {
        if which_child(s, parent, child) != dir {
            let ord = s.compare(node, parent);
            return match dir {
                Dir::Left => ord != Ordering::Less,
                Dir::Right => ord == Ordering::Less,
            };
        }

        child = parent;
    }

    true
}

// Restores the red-black properties after `node` was linked as a red leaf.
fn rebalance_inserted<S: NodeStore>(s: &mut S, node: S::Ref) {
    let mut x = node;

    while let Some(parent) = s.parent(x).filter(|&p| s.color(p).is_red()) {
        let grand = s.parent(parent).expect("a red node is never the root");
        let side = which_child(s, grand, parent);
        let uncle = s.child(grand, !side);

        if let Some(uncle) = uncle.filter(|&u| s.color(u).is_red()) {
            s.set_color(parent, Color::Black);
            s.set_color(uncle, Color::Black);
            s.set_color(grand, Color::Red);
            x = grand;
            continue;
        }

        let mut top = parent;
        if which_child(s, parent, x) != side {
            rotate(s, parent, side);
            top = x;
        }

        rotate(s, grand, !side);
        s.set_color(top, Color::Black);
        s.set_color(grand, Color::Red);
        break;
    }

    if let Some(root) = s.root() {
        s.set_color(root, Color::Black);
    }
}

/// Unlinks `node` from the tree and resets it to the detached state.
pub fn remove<S: NodeStore>(s: &mut S, node: S::Ref) {
    match (s.left(node), s.right(node)) {
        (Some(left), Some(right)) => {
            // Borrow the neighbor from the heavier side.
            let neighbor = if s.weight(Some(left)) > s.weight(Some(right)) {
                extreme(s, left, Dir::Right)
            } else {
                extreme(s, right, Dir::Left)
            };

            unlink_simple(s, neighbor);
            transplant(s, node, neighbor);
        }
        _ => unlink_simple(s, node),
    }

    s.detach(node);
}

// Moves `new` into the exact structural position of `old`.
fn transplant<S: NodeStore>(s: &mut S, old: S::Ref, new: S::Ref) {
    let parent = s.parent(old);

    for dir in [Dir::Left, Dir::Right] {
        let child = s.child(old, dir);
        s.set_child(new, dir, child);
        if let Some(child) = child {
            s.set_parent(child, Some(new));
        }
    }

    replace_child_or_set_root(s, parent, old, Some(new));
    s.set_parent(new, parent);

    let color = s.color(old);
    s.set_color(new, color);
    let count = s.count(old);
    s.set_count(new, count);
}

// Unlinks a node with at most one child.
fn unlink_simple<S: NodeStore>(s: &mut S, node: S::Ref) {
    let child = s.left(node).or(s.right(node));

    if child.is_none() && !s.color(node).is_red() && s.parent(node).is_some() {
        // Rebalance with the black leaf still in place; it stays its parent's child throughout.
        rebalance_removed(s, node);
    }

    let parent = s.parent(node);
    replace_child_or_set_root(s, parent, node, child);

    if let Some(child) = child {
        s.set_parent(child, parent);
        s.set_color(child, Color::Black);
    }

    adjust_counts(s, parent, -1);
}

// Fixes the black-height deficit that removing the black leaf `node` will leave behind.
fn rebalance_removed<S: NodeStore>(s: &mut S, node: S::Ref) {
    let mut x = node;

    while !s.color(x).is_red() {
        let Some(parent) = s.parent(x) else {
            break;
        };

        let side = which_child(s, parent, x);
        let mut sibling = s
            .child(parent, !side)
            .expect("a black non-root node has a sibling");

        if s.color(sibling).is_red() {
            s.set_color(sibling, Color::Black);
            s.set_color(parent, Color::Red);
            rotate(s, parent, side);
            sibling = s
                .child(parent, !side)
                .expect("a red sibling has two black children");
        }

        if !s.color_of(s.child(sibling, !side)).is_red() {
            let Some(near) = s.child(sibling, side).filter(|&n| s.color(n).is_red()) else {
                s.set_color(sibling, Color::Red);
                x = parent;
                continue;
            };

            s.set_color(near, Color::Black);
            s.set_color(sibling, Color::Red);
            rotate(s, sibling, !side);
            sibling = near;
        }

        let parent_color = s.color(parent);
        s.set_color(sibling, parent_color);
        s.set_color(parent, Color::Black);
        if let Some(far) = s.child(sibling, !side) {
            s.set_color(far, Color::Black);
        }
        rotate(s, parent, side);
        return;
    }

    s.set_color(x, Color::Black);
}
