//! Compact red-black trees in a flat word array, and the hash index built on them.
//!
//! A table for `capacity` nodes and `buckets` buckets is laid out in words as:
//!
//! ```text
//! [0, 1]                    header: the links of reserved id 0, always zero
//! [2 * id, 2 * id + 1]      left and right link of node `id`, for 1 <= id <= capacity
//! [2 * capacity + 2 + b]    root reference of bucket `b`
//! ```
//!
//! Every link holds a packed reference `child_id << 1 | child_color`, so a node's color lives in
//! the link that points at it and id 0 doubles as the null link. A "ref index" is the position of
//! a link word; for node links it is `id << 1 | side`, which makes `ref ^ 1` the sibling link.
//!
//! The layout contains no addresses and can be copied, persisted or shared as plain words. Node
//! ids are positions in a caller-owned array; the table never stores keys, and every search takes
//! a comparator over node ids.

use core::{cmp::Ordering, marker::PhantomData};

use crate::{
    diag::{self, Violations},
    error::{Error, LayoutError},
    store::{Color, Dir, NodeRead},
};

mod path;
mod word;

use self::word::{color_of, id_of, link, owner_of, pack, sibling_link, side_of};
pub use self::{
    path::{path_limit, Path, PATH_CAPACITY},
    word::{word_bits_for, Word, WORD_BITS},
};

/// Geometry of a compact table.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Layout {
    capacity: usize,
    buckets: usize,
    word_bits: u32,
}

impl Layout {
    /// Sizes a table for `capacity` nodes and `buckets` buckets using the narrowest word width
    /// that can address `capacity`.
    pub fn new(capacity: usize, buckets: usize) -> Result<Layout, LayoutError> {
        let word_bits = word_bits_for(capacity).ok_or(LayoutError::CapacityTooLarge { capacity })?;
        if buckets == 0 {
            return Err(LayoutError::NoBuckets);
        }

        let word_size = (word_bits / 8) as usize;
        capacity
            .checked_mul(2)
            .and_then(|words| words.checked_add(2))
            .and_then(|words| words.checked_add(buckets))
            .and_then(|words| words.checked_mul(word_size))
            .ok_or(LayoutError::CapacityTooLarge { capacity })?;

        Ok(Layout {
            capacity,
            buckets,
            word_bits,
        })
    }

    pub const fn capacity(&self) -> usize {
        self.capacity
    }

    pub const fn buckets(&self) -> usize {
        self.buckets
    }

    pub const fn word_bits(&self) -> u32 {
        self.word_bits
    }

    /// Bytes per word.
    pub const fn word_size(&self) -> usize {
        (self.word_bits / 8) as usize
    }

    /// Word index of bucket 0's root reference.
    pub const fn bucket_offset(&self) -> usize {
        2 * self.capacity + 2
    }

    /// Words in the whole table: `2 * capacity + 2 + buckets`.
    pub const fn table_words(&self) -> usize {
        self.bucket_offset() + self.buckets
    }

    /// Bytes in the whole table: `word_size * (2 * capacity + 2 + buckets)`.
    pub const fn table_bytes(&self) -> usize {
        self.word_size() * self.table_words()
    }
}

/// A hash index whose buckets are compact red-black trees.
///
/// `S` is the caller's word storage (`Vec<W>`, `&mut [W]`, a mapped region...). Choosing the
/// bucket for a key is up to the caller; see [`RbHash::bucket_for`].
pub struct RbHash<W, S> {
    table: S,
    layout: Layout,
    limit: usize,
    _word: PhantomData<W>,
}

impl<W: Word, S: AsRef<[W]>> RbHash<W, S> {
    /// Wraps `table`, which must hold exactly [`Layout::table_words`] words.
    ///
    /// `W` must be the word width [`Layout::new`] picks for `capacity`, so that every table for a
    /// given capacity and bucket count has the same bytes. The table is used as-is: pass zeroed
    /// words for an empty index, or the words of an index saved earlier.
    pub fn new(table: S, capacity: usize, buckets: usize) -> Result<Self, LayoutError> {
        if capacity > W::MAX_ID {
            return Err(LayoutError::WidthTooSmall {
                capacity,
                max_id: W::MAX_ID,
            });
        }

        let layout = Layout::new(capacity, buckets)?;
        if layout.word_bits != W::BITS {
            return Err(LayoutError::WidthMismatch {
                capacity,
                expected: layout.word_bits,
                found: W::BITS,
            });
        }

        let found = table.as_ref().len();
        if found != layout.table_words() {
            return Err(LayoutError::TableSize {
                expected: layout.table_words(),
                found,
            });
        }

        Ok(RbHash {
            table,
            layout,
            limit: path_limit(W::BITS),
            _word: PhantomData,
        })
    }

    pub fn layout(&self) -> Layout {
        self.layout
    }

    pub fn as_words(&self) -> &[W] {
        self.table.as_ref()
    }

    pub fn into_inner(self) -> S {
        self.table
    }

    /// Maps a hash to a bucket index.
    pub fn bucket_for(&self, hash: u64) -> usize {
        (hash % self.layout.buckets as u64) as usize
    }

    #[inline]
    fn word(&self, ref_index: usize) -> usize {
        self.table.as_ref()[ref_index].to_usize()
    }

    fn bucket_slot(&self, bucket: usize) -> Result<usize, Error> {
        if bucket >= self.layout.buckets {
            return Err(Error::BucketOutOfRange {
                bucket,
                buckets: self.layout.buckets,
            });
        }

        Ok(self.layout.bucket_offset() + bucket)
    }

    fn check_id(&self, id: usize) -> Result<(), Error> {
        if id == 0 || id > self.layout.capacity {
            return Err(Error::IdOutOfRange {
                id,
                capacity: self.layout.capacity,
            });
        }

        Ok(())
    }

    fn is_zeroed(&self, id: usize) -> bool {
        self.word(link(id, Dir::Left)) == 0 && self.word(link(id, Dir::Right)) == 0
    }

    // Reads the node referenced from `ref_index`, rejecting ids outside the table.
    fn node_at(&self, ref_index: usize) -> Result<Option<usize>, Error> {
        match id_of(self.word(ref_index)) {
            0 => Ok(None),
            id => self.check_id(id).map(|()| Some(id)),
        }
    }

    /// Returns the root node of `bucket`.
    pub fn root(&self, bucket: usize) -> Result<Option<usize>, Error> {
        let slot = self.bucket_slot(bucket)?;
        self.node_at(slot)
    }

    /// Finds a node in `bucket` for which `cmp` returns `Equal`.
    ///
    /// `cmp` orders the search subject against the node with the given id.
    pub fn find<F>(&self, bucket: usize, mut cmp: F) -> Result<Option<usize>, Error>
    where
        F: FnMut(usize) -> Ordering,
    {
        let mut ref_index = self.bucket_slot(bucket)?;

        for _ in 0..self.limit {
            let Some(id) = self.node_at(ref_index)? else {
                return Ok(None);
            };

            ref_index = match cmp(id) {
                Ordering::Less => link(id, Dir::Left),
                Ordering::Equal => return Ok(Some(id)),
                Ordering::Greater => link(id, Dir::Right),
            };
        }

        Err(Error::PathOverflow { limit: self.limit })
    }

    /// Like [`find`](RbHash::find), but records the traversal in `path`.
    ///
    /// On `Some(id)` the path ends at the link referring to `id`. On `None` it ends at the empty
    /// link where the subject would be inserted, so it can be handed to
    /// [`insert_at`](RbHash::insert_at).
    pub fn find_path<F>(
        &self,
        bucket: usize,
        mut cmp: F,
        path: &mut Path,
    ) -> Result<Option<usize>, Error>
    where
        F: FnMut(usize) -> Ordering,
    {
        path.clear();
        path.push(self.bucket_slot(bucket)?, self.limit)?;

        loop {
            let Some(last) = path.last() else {
                return Ok(None);
            };
            let Some(id) = self.node_at(last)? else {
                return Ok(None);
            };

            let next = match cmp(id) {
                Ordering::Less => link(id, Dir::Left),
                Ordering::Equal => return Ok(Some(id)),
                Ordering::Greater => link(id, Dir::Right),
            };
            path.push(next, self.limit)?;
        }
    }

    /// Points `path` at the minimum node of `bucket`.
    pub fn first_path(&self, bucket: usize, path: &mut Path) -> Result<Option<usize>, Error> {
        path.clear();
        path.push(self.bucket_slot(bucket)?, self.limit)?;
        self.descend_path(path, Dir::Left)
    }

    // Follows `dir` links from the node at the end of `path` for as long as they exist.
    fn descend_path(&self, path: &mut Path, dir: Dir) -> Result<Option<usize>, Error> {
        let Some(mut cur) = path.last().map(|r| self.node_at(r)).transpose()?.flatten() else {
            return Ok(None);
        };

        while let Some(next) = self.node_at(link(cur, dir))? {
            path.push(link(cur, dir), self.limit)?;
            cur = next;
        }

        Ok(Some(cur))
    }

    /// Moves `path` to the in-order neighbor of the node it ends at: the successor for
    /// `Dir::Right`, the predecessor for `Dir::Left`.
    ///
    /// Returns `None` and leaves the path unchanged if there is no such neighbor.
    pub fn path_step(&self, path: &mut Path, dir: Dir) -> Result<Option<usize>, Error> {
        let saved = path.len();
        let Some(cur) = path.last().map(|r| self.node_at(r)).transpose()?.flatten() else {
            return Err(Error::EmptySlot);
        };

        if self.node_at(link(cur, dir))?.is_some() {
            path.push(link(cur, dir), self.limit)?;
            return self.descend_path(path, !dir);
        }

        // Climb while coming up from the `dir` side; the first ancestor reached from the other
        // side is the neighbor.
        while path.len() > 1 {
            let Some(from) = path.pop() else {
                break;
            };

            if side_of(from) != dir {
                return Ok(Some(owner_of(from)));
            }
        }

        path.restore(saved);
        Ok(None)
    }

    // Reports whether `id` is one of the nodes in `bucket` that compare equal under `cmp`. Equal
    // nodes are contiguous in order, so this finds the leftmost and steps right through the run.
    fn among_equals<F>(&self, bucket: usize, id: usize, cmp: &mut F) -> Result<bool, Error>
    where
        F: FnMut(usize) -> Ordering,
    {
        let mut path = Path::new();
        path.push(self.bucket_slot(bucket)?, self.limit)?;
        let mut leftmost = None;

        while let Some(node) = path.last().map(|r| self.node_at(r)).transpose()?.flatten() {
            let dir = match cmp(node) {
                Ordering::Greater => Dir::Right,
                Ordering::Equal => {
                    leftmost = Some(path.len());
                    Dir::Left
                }
                Ordering::Less => Dir::Left,
            };
            path.push(link(node, dir), self.limit)?;
        }

        let Some(len) = leftmost else {
            return Ok(false);
        };
        path.truncate(len);

        let mut cur = path.last().map(|r| self.node_at(r)).transpose()?.flatten();
        while let Some(node) = cur {
            if node == id {
                return Ok(true);
            }
            cur = self.path_step(&mut path, Dir::Right)?;
            if cur.is_some_and(|next| cmp(next) != Ordering::Equal) {
                break;
            }
        }

        Ok(false)
    }

    /// Counts the nodes in `bucket`.
    pub fn bucket_len(&self, bucket: usize) -> Result<usize, Error> {
        let mut path = Path::new();
        let mut len = 0;
        let mut cur = self.first_path(bucket, &mut path)?;

        while cur.is_some() {
            len += 1;
            cur = self.path_step(&mut path, Dir::Right)?;
        }

        Ok(len)
    }

    /// Read-only view of one bucket's tree, for diagnostics.
    ///
    /// `cmp` orders two node ids.
    pub fn view<F>(&self, bucket: usize, cmp: F) -> Result<BucketView<'_, W, F>, Error>
    where
        F: Fn(usize, usize) -> Ordering,
    {
        Ok(BucketView {
            words: self.table.as_ref(),
            slot: self.bucket_slot(bucket)?,
            capacity: self.layout.capacity,
            cmp,
        })
    }

    /// Validates one bucket's tree. See [`diag::validate`].
    pub fn validate<F>(&self, bucket: usize, cmp: F) -> Result<Violations, Error>
    where
        F: Fn(usize, usize) -> Ordering,
    {
        Ok(diag::validate(&self.view(bucket, cmp)?))
    }
}

impl<W: Word, S: AsRef<[W]> + AsMut<[W]>> RbHash<W, S> {
    #[inline]
    fn set(&mut self, ref_index: usize, packed: usize) {
        self.table.as_mut()[ref_index] = W::from_usize(packed);
    }

    #[inline]
    fn set_color(&mut self, ref_index: usize, color: Color) {
        let packed = self.word(ref_index);
        self.set(ref_index, pack(id_of(packed), color));
    }

    #[inline]
    fn is_red(&self, ref_index: usize) -> bool {
        color_of(self.word(ref_index)).is_red()
    }

    // Rotates the node at `ref_index` towards `dir`, raising its child on the other side into the
    // same link. Colors travel with their nodes.
    fn rotate(&mut self, ref_index: usize, dir: Dir) {
        let down = self.word(ref_index);
        let up_ref = link(id_of(down), !dir);
        let up = self.word(up_ref);
        let across_ref = link(id_of(up), dir);

        self.set(up_ref, self.word(across_ref));
        self.set(across_ref, down);
        self.set(ref_index, up);
    }

    /// Inserts node `id` into `bucket`.
    ///
    /// `cmp` orders the new node against the node with the given id; equal nodes go right. `id`
    /// must be detached, with both link words zero.
    ///
    /// A node already in `bucket` is rejected with [`Error::AlreadyLinked`], as is any node with
    /// children. A childless node linked in another bucket has nothing in its own words to show
    /// for it and cannot be told apart from a free id; the caller must not pass one.
    pub fn insert<F>(&mut self, bucket: usize, id: usize, mut cmp: F) -> Result<(), Error>
    where
        F: FnMut(usize) -> Ordering,
    {
        self.check_id(id)?;
        if !self.is_zeroed(id) || self.among_equals(bucket, id, &mut cmp)? {
            return Err(Error::AlreadyLinked { id });
        }

        let mut path = Path::new();
        path.push(self.bucket_slot(bucket)?, self.limit)?;

        while let Some(node) = path.last().map(|r| self.node_at(r)).transpose()?.flatten() {
            if node == id {
                return Err(Error::AlreadyLinked { id });
            }

            let dir = match cmp(node) {
                Ordering::Less => Dir::Left,
                _ => Dir::Right,
            };
            path.push(link(node, dir), self.limit)?;
        }

        self.insert_at(&path, id)
    }

    /// Links node `id` at the empty link ending `path`, as traced by a `find_path` that returned
    /// `None`.
    ///
    /// `id` is rejected if its words are set or it owns a link on `path`. As with
    /// [`insert`](RbHash::insert), the caller must not pass an id linked elsewhere in this or
    /// another bucket.
    pub fn insert_at(&mut self, path: &Path, id: usize) -> Result<(), Error> {
        self.check_id(id)?;
        if !self.is_zeroed(id) || path.refs().iter().skip(1).any(|&r| owner_of(r) == id) {
            return Err(Error::AlreadyLinked { id });
        }

        let refs = path.refs();
        let Some(&slot) = refs.last() else {
            return Err(Error::EmptySlot);
        };
        if self.word(slot) != 0 {
            return Err(Error::OccupiedSlot);
        }

        if refs.len() == 1 {
            self.set(slot, pack(id, Color::Black));
            return Ok(());
        }

        self.set(slot, pack(id, Color::Red));

        // A black parent needs no repair.
        if self.is_red(refs[refs.len() - 2]) {
            self.rebalance_inserted(refs);
        }

        Ok(())
    }

    // `refs` ends at a red node whose parent is also red.
    fn rebalance_inserted(&mut self, refs: &[usize]) {
        tracing::trace!(
            target: "cordyceps_rbtree::compact",
            depth = refs.len(),
            "repairing red parent after insert"
        );

        let mut i = refs.len() - 1;

        loop {
            // The parent is red, so it is not the root and the grandparent exists.
            let parent_ref = refs[i - 1];
            let grand_ref = refs[i - 2];
            let uncle_ref = sibling_link(parent_ref);

            if self.is_red(uncle_ref) {
                self.set_color(parent_ref, Color::Black);
                self.set_color(uncle_ref, Color::Black);
                self.set_color(grand_ref, Color::Red);

                i -= 2;
                if i == 0 {
                    self.set_color(refs[0], Color::Black);
                    return;
                }
                if !self.is_red(refs[i - 1]) {
                    return;
                }
                continue;
            }

            let side = side_of(parent_ref);
            if side_of(refs[i]) != side {
                self.rotate(parent_ref, side);
            }
            self.rotate(grand_ref, !side);

            let top = id_of(self.word(grand_ref));
            self.set_color(grand_ref, Color::Black);
            self.set_color(link(top, !side), Color::Red);
            return;
        }
    }

    /// Removes a node for which `cmp` returns `Equal` from `bucket`, returning its id.
    ///
    /// The removed node's link words are zeroed.
    pub fn delete<F>(&mut self, bucket: usize, cmp: F) -> Result<Option<usize>, Error>
    where
        F: FnMut(usize) -> Ordering,
    {
        let mut path = Path::new();
        match self.find_path(bucket, cmp, &mut path)? {
            Some(_) => self.delete_at(&mut path).map(Some),
            None => Ok(None),
        }
    }

    /// Removes the node at the end of `path`, returning its id.
    ///
    /// A node with two children trades places with its in-order successor first. The compact form
    /// keeps no subtree counts, so the larger side is unknown without walking both subtrees.
    ///
    /// The removed node's link words are zeroed and `path` is cleared, since the repair may
    /// restructure the links it recorded.
    pub fn delete_at(&mut self, path: &mut Path) -> Result<usize, Error> {
        let Some(terminal) = path.len().checked_sub(1) else {
            return Err(Error::EmptySlot);
        };
        let Some(node) = self.node_at(path.refs()[terminal])? else {
            return Err(Error::EmptySlot);
        };

        let has_left = self.word(link(node, Dir::Left)) != 0;
        let has_right = self.word(link(node, Dir::Right)) != 0;

        if has_left && has_right {
            // Trace down to the successor before touching anything.
            let side = Dir::Right;
            if let Err(e) = self.trace_neighbor(path, node, side) {
                path.truncate(terminal + 1);
                return Err(e);
            }

            self.exchange(path, terminal, side);
        }

        self.unlink(path);
        path.clear();
        Ok(node)
    }

    fn trace_neighbor(&self, path: &mut Path, node: usize, side: Dir) -> Result<(), Error> {
        path.push(link(node, side), self.limit)?;
        self.descend_path(path, !side).map(drop)
    }

    // Swaps the structural positions of the node at `refs[k]` and its in-order neighbor on `side`
    // at the end of the path, colors included. Afterwards the path ends at the original node,
    // which has at most one child.
    fn exchange(&mut self, path: &mut Path, k: usize, side: Dir) {
        let refs = path.refs();
        let m = refs.len() - 1;
        let (node_ref, neighbor_ref) = (refs[k], refs[m]);

        let node_packed = self.word(node_ref);
        let neighbor_packed = self.word(neighbor_ref);
        let (node, neighbor) = (id_of(node_packed), id_of(neighbor_packed));

        let node_inner = self.word(link(node, !side));
        let node_outer = self.word(link(node, side));
        let neighbor_outer = self.word(link(neighbor, side));
        debug_assert_eq!(self.word(link(neighbor, !side)), 0);

        if m == k + 1 {
            // The neighbor is the node's direct child.
            self.set(link(neighbor, !side), node_inner);
            self.set(link(neighbor, side), pack(node, color_of(neighbor_packed)));
        } else {
            self.set(neighbor_ref, pack(node, color_of(neighbor_packed)));
            self.set(link(neighbor, !side), node_inner);
            self.set(link(neighbor, side), node_outer);
        }

        self.set(link(node, !side), 0);
        self.set(link(node, side), neighbor_outer);
        self.set(node_ref, pack(neighbor, color_of(node_packed)));

        path.set(k + 1, link(neighbor, side));
    }

    // Removes the node at the end of `path`, which has at most one child.
    fn unlink(&mut self, path: &Path) {
        let refs = path.refs();
        let i = refs.len() - 1;
        let slot = refs[i];
        let packed = self.word(slot);
        let node = id_of(packed);

        let left = self.word(link(node, Dir::Left));
        let right = self.word(link(node, Dir::Right));
        let child = if left != 0 { left } else { right };

        self.set(link(node, Dir::Left), 0);
        self.set(link(node, Dir::Right), 0);

        if child != 0 {
            // A lone child is always a red leaf under a black node.
            self.set(slot, pack(id_of(child), Color::Black));
            return;
        }

        self.set(slot, 0);

        if !color_of(packed).is_red() && i > 0 {
            self.rebalance_removed(refs, i);
        }
    }

    // The subtree hanging from `refs[i]` is one black node short.
    fn rebalance_removed(&mut self, refs: &[usize], mut i: usize) {
        let mut short_ref = refs[i];
        let mut parent_ref = refs[i - 1];

        loop {
            let side = side_of(short_ref);
            let parent = owner_of(short_ref);
            let sibling_ref = sibling_link(short_ref);

            if self.is_red(sibling_ref) {
                // Red sibling: rotate it up; the parent turns red and the short side now has a
                // black sibling.
                let sibling = id_of(self.word(sibling_ref));
                self.rotate(parent_ref, side);
                self.set_color(parent_ref, Color::Black);
                parent_ref = link(sibling, side);
                self.set_color(parent_ref, Color::Red);
            }

            let sibling = id_of(self.word(sibling_ref));
            debug_assert_ne!(sibling, 0, "short subtree without a sibling");

            if !self.is_red(link(sibling, !side)) {
                if !self.is_red(link(sibling, side)) {
                    // Both nephews black: push the shortage up a level.
                    self.set_color(sibling_ref, Color::Red);

                    if self.is_red(parent_ref) {
                        self.set_color(parent_ref, Color::Black);
                        return;
                    }

                    // The parent was black, so no red-sibling rotation happened and `parent_ref`
                    // is still `refs[i - 1]`.
                    i -= 1;
                    if i == 0 {
                        return;
                    }
                    short_ref = parent_ref;
                    parent_ref = refs[i - 1];
                    continue;
                }

                // Near nephew red, far nephew black: turn it into the far-red case.
                self.rotate(sibling_ref, !side);
                self.set_color(sibling_ref, Color::Black);
                let near = id_of(self.word(sibling_ref));
                self.set_color(link(near, !side), Color::Red);
            }

            // Far nephew red: one rotation finishes the repair.
            let sibling = id_of(self.word(sibling_ref));
            let parent_color = color_of(self.word(parent_ref));
            debug_assert_eq!(id_of(self.word(parent_ref)), parent);

            self.rotate(parent_ref, side);
            self.set(parent_ref, pack(sibling, parent_color));
            self.set_color(link(sibling, side), Color::Black);
            self.set_color(link(sibling, !side), Color::Black);
            return;
        }
    }

    /// Moves the node at the end of `path` to the unused id `new_id`.
    ///
    /// The terminal link is pointed at `new_id` (keeping its color), the old node's two link
    /// words are copied to `new_id`, and the old node's words are zeroed. This relocates a node
    /// inside a dense backing array without a delete and reinsert: after deleting element `k`,
    /// trace a path to the last element and swap it into `k`.
    ///
    /// `new_id` is rejected with [`Error::NotZeroed`] if its words are set, and with
    /// [`Error::AlreadyLinked`] if it owns a link on `path` or is a child of the moving node. A
    /// childless `new_id` linked anywhere else cannot be detected; the caller must not pass one.
    pub fn path_swap(&mut self, path: &Path, new_id: usize) -> Result<(), Error> {
        let Some(slot) = path.last() else {
            return Err(Error::EmptySlot);
        };
        let Some(old_id) = self.node_at(slot)? else {
            return Err(Error::EmptySlot);
        };

        self.check_id(new_id)?;
        if new_id == old_id {
            return Ok(());
        }
        if !self.is_zeroed(new_id) {
            return Err(Error::NotZeroed { id: new_id });
        }
        let on_path = path.refs().iter().skip(1).any(|&r| owner_of(r) == new_id);
        let is_child = [Dir::Left, Dir::Right]
            .into_iter()
            .any(|dir| id_of(self.word(link(old_id, dir))) == new_id);
        if on_path || is_child {
            return Err(Error::AlreadyLinked { id: new_id });
        }

        tracing::trace!(
            target: "cordyceps_rbtree::compact",
            old_id,
            new_id,
            "relocating node"
        );

        for dir in [Dir::Left, Dir::Right] {
            let packed = self.word(link(old_id, dir));
            self.set(link(new_id, dir), packed);
            self.set(link(old_id, dir), 0);
        }

        let color = color_of(self.word(slot));
        self.set(slot, pack(new_id, color));
        Ok(())
    }
}

/// One bucket of an [`RbHash`], seen through [`NodeRead`].
///
/// Nodes are identified by their packed reference, so colors come along for free while walking
/// down. Parents and counts are not stored in the compact form.
pub struct BucketView<'a, W, F> {
    words: &'a [W],
    slot: usize,
    capacity: usize,
    cmp: F,
}

impl<'a, W, F> BucketView<'a, W, F>
where
    W: Word,
{
    fn packed(&self, ref_index: usize) -> Option<usize> {
        let packed = self.words.get(ref_index)?.to_usize();
        (packed != 0).then_some(packed)
    }
}

impl<'a, W, F> NodeRead for BucketView<'a, W, F>
where
    W: Word,
    F: Fn(usize, usize) -> Ordering,
{
    type Ref = usize;

    const PARENTS: bool = false;
    const COUNTS: bool = false;

    fn root(&self) -> Option<usize> {
        self.packed(self.slot)
    }

    fn child(&self, node: usize, dir: Dir) -> Option<usize> {
        self.packed(link(id_of(node), dir))
    }

    fn parent(&self, _node: usize) -> Option<usize> {
        None
    }

    fn color(&self, node: usize) -> Color {
        color_of(node)
    }

    fn count(&self, _node: usize) -> usize {
        0
    }

    fn compare(&self, a: usize, b: usize) -> Ordering {
        (self.cmp)(id_of(a), id_of(b))
    }

    fn capacity(&self) -> usize {
        self.capacity
    }

    fn sentinel_intact(&self) -> bool {
        self.words.iter().take(2).all(|w| w.to_usize() == 0)
    }

    fn in_range(&self, node: usize) -> bool {
        (1..=self.capacity).contains(&id_of(node))
    }
}

#[cfg(test)]
mod tests;
