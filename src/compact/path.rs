use crate::{error::Error, store::max_path_len};

/// Inline capacity of a [`Path`]; covers the 64-bit width's bound of 125 references.
pub const PATH_CAPACITY: usize = 128;

/// A traced sequence of ref indices from a bucket slot down to a node or an empty link.
///
/// `refs()[0]` is always the bucket slot. Each later entry is the link word inside the node named
/// by the entry before it, so the terminal entry is the word that refers to the located node (or
/// would refer to it, after an insert).
#[derive(Clone)]
pub struct Path {
    refs: [usize; PATH_CAPACITY],
    len: usize,
}

impl Path {
    /// Returns a new empty path.
    pub const fn new() -> Path {
        Path {
            refs: [0; PATH_CAPACITY],
            len: 0,
        }
    }

    pub const fn len(&self) -> usize {
        self.len
    }

    pub const fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn refs(&self) -> &[usize] {
        &self.refs[..self.len]
    }

    /// The terminal ref index.
    pub fn last(&self) -> Option<usize> {
        self.refs().last().copied()
    }

    pub fn clear(&mut self) {
        self.len = 0;
    }

    pub(crate) fn push(&mut self, ref_index: usize, limit: usize) -> Result<(), Error> {
        let limit = limit.min(PATH_CAPACITY);
        if self.len >= limit {
            tracing::warn!(
                target: "cordyceps_rbtree::compact",
                limit,
                "path exceeded the maximum tree height"
            );
            return Err(Error::PathOverflow { limit });
        }

        self.refs[self.len] = ref_index;
        self.len += 1;
        Ok(())
    }

    pub(crate) fn pop(&mut self) -> Option<usize> {
        let last = self.last()?;
        self.len -= 1;
        Some(last)
    }

    pub(crate) fn set(&mut self, index: usize, ref_index: usize) {
        self.refs[..self.len][index] = ref_index;
    }

    pub(crate) fn truncate(&mut self, len: usize) {
        self.len = self.len.min(len);
    }

    // Entries beyond `len` are left in place so a failed step can be undone.
    pub(crate) fn restore(&mut self, len: usize) {
        debug_assert!(len <= PATH_CAPACITY);
        self.len = len;
    }
}

impl Default for Path {
    fn default() -> Self {
        Path::new()
    }
}

impl core::fmt::Debug for Path {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_list().entries(self.refs()).finish()
    }
}

/// Path bound for a word width of `bits`: the path length of the largest tree its ids allow.
pub const fn path_limit(bits: u32) -> usize {
    max_path_len((1u64 << (bits - 1)) - 1)
}
