use thiserror::Error;

/// Failures reported by compact index operations.
///
/// None of these leave the table modified. [`Error::PathOverflow`] means the table is corrupt or
/// was built for a different word width, and should not be retried.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// The node is already part of a tree.
    #[error("node {id} is already linked")]
    AlreadyLinked { id: usize },
    /// The node id is zero or beyond the table's capacity.
    #[error("node id {id} is outside 1..={capacity}")]
    IdOutOfRange { id: usize, capacity: usize },
    /// The bucket index is beyond the bucket table.
    #[error("bucket {bucket} is outside 0..{buckets}")]
    BucketOutOfRange { bucket: usize, buckets: usize },
    /// The target node's link words are not zero.
    #[error("node {id} still has link words set")]
    NotZeroed { id: usize },
    /// A traced path grew past the maximum height of a valid tree.
    #[error("path exceeded {limit} references; the tree is corrupt")]
    PathOverflow { limit: usize },
    /// The path does not end at a node.
    #[error("path does not end at a node")]
    EmptySlot,
    /// The path ends at a node where an empty slot was required.
    #[error("path does not end at an empty slot")]
    OccupiedSlot,
}

/// Failures constructing a compact table.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum LayoutError {
    /// No supported word width can address this many nodes.
    #[error("capacity {capacity} exceeds every supported word width")]
    CapacityTooLarge { capacity: usize },
    /// The chosen word width cannot address this many nodes.
    #[error("capacity {capacity} exceeds the word's maximum id {max_id}")]
    WidthTooSmall { capacity: usize, max_id: usize },
    /// The word type is not the width [`Layout::new`](crate::compact::Layout::new) picks for
    /// this capacity.
    #[error("capacity {capacity} uses {expected}-bit words, not {found}-bit")]
    WidthMismatch {
        capacity: usize,
        expected: u32,
        found: u32,
    },
    /// A table needs at least one bucket.
    #[error("a table needs at least one bucket")]
    NoBuckets,
    /// The supplied table has the wrong number of words.
    #[error("table holds {found} words, layout needs {expected}")]
    TableSize { expected: usize, found: usize },
}
