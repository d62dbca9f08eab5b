//! Structural validation and dumping.
//!
//! Everything here is a read-only consumer of [`NodeRead`], so the same checks run against
//! pointer-linked trees and compact buckets.

use core::{cmp::Ordering, fmt, ops};
use std::collections::VecDeque;

use crate::store::{max_path_len, Color, Dir, NodeRead};

/// A set of structural violations. Empty means the tree is valid.
#[derive(Copy, Clone, Default, PartialEq, Eq, Hash)]
pub struct Violations(u8);

impl Violations {
    /// The root is red.
    pub const INVALID_ROOT: Violations = Violations(1 << 0);
    /// Sentinel storage is damaged, or the root has a parent.
    pub const INVALID_SENTINEL: Violations = Violations(1 << 1);
    /// A child does not link back to its parent, a link leaves the valid range, or the structure
    /// is deeper than any red-black tree of its capacity can be.
    pub const DISCONNECTED: Violations = Violations(1 << 2);
    /// A subtree count, or the owner's element count, disagrees with the structure.
    pub const COUNT_MISMATCH: Violations = Violations(1 << 3);
    /// A red node has a red child, or black heights differ.
    pub const COLOR: Violations = Violations(1 << 4);
    /// In-order traversal is not sorted.
    pub const ORDER: Violations = Violations(1 << 5);

    const NAMES: [(Violations, &'static str); 6] = [
        (Violations::INVALID_ROOT, "INVALID_ROOT"),
        (Violations::INVALID_SENTINEL, "INVALID_SENTINEL"),
        (Violations::DISCONNECTED, "DISCONNECTED"),
        (Violations::COUNT_MISMATCH, "COUNT_MISMATCH"),
        (Violations::COLOR, "COLOR"),
        (Violations::ORDER, "ORDER"),
    ];

    pub const fn empty() -> Violations {
        Violations(0)
    }

    pub const fn bits(self) -> u8 {
        self.0
    }

    pub const fn from_bits_truncate(bits: u8) -> Violations {
        Violations(bits & 0x3f)
    }

    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    pub const fn contains(self, other: Violations) -> bool {
        self.0 & other.0 == other.0
    }

    pub fn insert(&mut self, other: Violations) {
        self.0 |= other.0;
    }
}

impl ops::BitOr for Violations {
    type Output = Violations;

    fn bitor(self, rhs: Violations) -> Violations {
        Violations(self.0 | rhs.0)
    }
}

impl ops::BitOrAssign for Violations {
    fn bitor_assign(&mut self, rhs: Violations) {
        self.insert(rhs);
    }
}

impl fmt::Debug for Violations {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            return f.write_str("Violations(VALID)");
        }

        f.write_str("Violations(")?;
        let mut first = true;
        for (flag, name) in Violations::NAMES {
            if self.contains(flag) {
                if !first {
                    f.write_str(" | ")?;
                }
                f.write_str(name)?;
                first = false;
            }
        }
        f.write_str(")")
    }
}

/// Checks every invariant over the whole tree and returns all violations found.
pub fn validate<R: NodeRead>(store: &R) -> Violations {
    Checker::new(store, false).run()
}

/// Checks invariants, stopping at the first violation found.
pub fn validate_first<R: NodeRead>(store: &R) -> Violations {
    Checker::new(store, true).run()
}

struct Checker<'a, R: NodeRead> {
    store: &'a R,
    found: Violations,
    stop_at_first: bool,
    max_depth: usize,
    prev: Option<R::Ref>,
    visited: usize,
}

impl<'a, R: NodeRead> Checker<'a, R> {
    fn new(store: &'a R, stop_at_first: bool) -> Self {
        Checker {
            store,
            found: Violations::empty(),
            stop_at_first,
            // One of the path references is the root slot, not a node.
            max_depth: max_path_len(store.capacity() as u64) - 1,
            prev: None,
            visited: 0,
        }
    }

    fn flag(&mut self, violation: Violations) {
        self.found |= violation;
    }

    fn done(&self) -> bool {
        self.stop_at_first && !self.found.is_empty()
    }

    fn run(mut self) -> Violations {
        if !self.store.sentinel_intact() {
            self.flag(Violations::INVALID_SENTINEL);
        }

        if let Some(root) = self.store.root().filter(|_| !self.done()) {
            if self.store.in_range(root) {
                if self.store.color(root).is_red() {
                    self.flag(Violations::INVALID_ROOT);
                }

                if R::PARENTS && self.store.parent(root).is_some() {
                    self.flag(Violations::INVALID_SENTINEL);
                }
            }

            self.walk(root, 1);
        }

        if let Some(expected) = self.store.expected_len() {
            if !self.done() && expected != self.visited {
                self.flag(Violations::COUNT_MISMATCH);
            }
        }

        if !self.found.is_empty() {
            tracing::debug!(
                target: "cordyceps_rbtree::diag",
                violations = ?self.found,
                visited = self.visited,
                "tree failed validation"
            );
        }

        self.found
    }

    // Returns the black height and the actual size of the subtree at `node`, or `None` if the walk
    // was cut short.
    fn walk(&mut self, node: R::Ref, depth: usize) -> Option<(usize, usize)> {
        if self.done() {
            return None;
        }

        if !self.store.in_range(node) || depth > self.max_depth {
            self.flag(Violations::DISCONNECTED);
            return None;
        }

        self.visited += 1;

        let color = self.store.color(node);
        let mut heights = [1; 2];
        let mut sizes = [0; 2];
        let mut broken = false;

        for dir in [Dir::Left, Dir::Right] {
            if let Some(child) = self.store.child(node, dir) {
                if self.store.in_range(child) {
                    if R::PARENTS && self.store.parent(child) != Some(node) {
                        self.flag(Violations::DISCONNECTED);
                    }

                    if color.is_red() && self.store.color(child).is_red() {
                        self.flag(Violations::COLOR);
                    }
                }

                match self.walk(child, depth + 1) {
                    Some((height, size)) => {
                        heights[dir as usize] = height;
                        sizes[dir as usize] = size;
                    }
                    None if self.done() => return None,
                    None => broken = true,
                }
            }

            if dir == Dir::Left {
                // In-order visit.
                if let Some(prev) = self.prev {
                    if self.store.compare(prev, node) == Ordering::Greater {
                        self.flag(Violations::ORDER);
                    }
                }
                self.prev = Some(node);
            }
        }

        if broken {
            return None;
        }

        if heights[0] != heights[1] {
            self.flag(Violations::COLOR);
        }

        let size = 1 + sizes[0] + sizes[1];
        if R::COUNTS && self.store.count(node) != size {
            self.flag(Violations::COUNT_MISMATCH);
        }

        let height = heights[0].max(heights[1]) + (color == Color::Black) as usize;
        Some((height, size))
    }
}

/// Writes an indented outline of the tree, one node per line, right subtree first so the output
/// reads as the tree rotated a quarter turn.
pub fn dump<R, W, F>(store: &R, mut w: W, mut label: F) -> fmt::Result
where
    R: NodeRead,
    W: fmt::Write,
    F: FnMut(&mut W, R::Ref) -> fmt::Result,
{
    let Some(root) = store.root() else {
        return w.write_str("(empty)\n");
    };

    let max_depth = max_path_len(store.capacity() as u64);
    let mut stack = vec![(root, 0usize, false)];

    while let Some((node, depth, expanded)) = stack.pop() {
        if !store.in_range(node) || depth >= max_depth {
            writeln!(w, "{:indent$}<broken {node:?}>", "", indent = depth * 4)?;
            continue;
        }

        if !expanded {
            if let Some(left) = store.left(node) {
                stack.push((left, depth + 1, false));
            }
            stack.push((node, depth, true));
            if let Some(right) = store.right(node) {
                stack.push((right, depth + 1, false));
            }
            continue;
        }

        write!(w, "{:indent$}", "", indent = depth * 4)?;
        label(&mut w, node)?;
        let color = if store.color(node).is_red() { 'R' } else { 'B' };
        if R::COUNTS {
            writeln!(w, " [{color}:{}]", store.count(node))?;
        } else {
            writeln!(w, " [{color}]")?;
        }
    }

    Ok(())
}

/// Writes the tree as a Graphviz digraph, one rank per tree level.
pub fn dotgraph<R, W, K>(store: &R, name: &str, mut w: W, mut key: K) -> fmt::Result
where
    R: NodeRead,
    W: fmt::Write,
    K: FnMut(R::Ref) -> String,
{
    let root = match store.root() {
        Some(r) => r,
        None => return write!(w, "digraph \"graph-{name}\" {{}}"),
    };

    enum Item<N> {
        Node(N),
        Missing(u32),
    }

    let mut queue = VecDeque::new();
    queue.push_back(Item::Node(root));

    write!(
        w,
        "digraph \"graph-{name}\" {{\n subgraph \"subgraph-{name}\" {{"
    )?;

    let mut missing = 0;
    let mut links = String::new();
    let max_depth = max_path_len(store.capacity() as u64);

    for _level in 0..max_depth {
        use fmt::Write;
        let remaining = queue.len();
        if remaining == 0 {
            break;
        }

        write!(w, "{{rank=same; ")?;

        for _ in 0..remaining {
            let Some(item) = queue.pop_front() else {
                break;
            };

            let node = match item {
                Item::Node(node) if store.in_range(node) => node,
                Item::Node(_) => continue,
                Item::Missing(id) => {
                    write!(w, "\"graph{name}-missing{id}\" [shape=point]; ")?;
                    continue;
                }
            };

            let label = key(node);
            let color = if store.color(node).is_red() { "red" } else { "black" };
            write!(
                w,
                "\"graph{name}-{label}\" [label=\"{label}\", color={color}]; "
            )?;

            for dir in [Dir::Left, Dir::Right] {
                if let Some(child) = store.child(node, dir) {
                    queue.push_back(Item::Node(child));
                    if store.in_range(child) {
                        let child_label = key(child);
                        writeln!(
                            links,
                            "\"graph{name}-{label}\" -> \"graph{name}-{child_label}\";"
                        )?;
                    }
                } else {
                    queue.push_back(Item::Missing(missing));
                    writeln!(
                        links,
                        "\"graph{name}-{label}\" -> \"graph{name}-missing{missing}\";"
                    )?;
                    missing += 1;
                }
            }
        }

        writeln!(w, "}}")?;
    }

    w.write_str(&links)?;

    w.write_str(" }\n}")
}
