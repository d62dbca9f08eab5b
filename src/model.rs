extern crate std;

use std::{collections::BTreeSet, prelude::v1::*, ptr::NonNull};

use arbitrary::Arbitrary;
use cordyceps::Linked;
use proptest::strategy::{Just, Strategy};

use crate::{
    compact::{Layout, Path, RbHash},
    Dir, Links, RbTree, TreeNode,
};

#[derive(Debug)]
#[repr(C)]
pub struct TestNode {
    pub links: Links<TestNode>,
    pub key: u32,
}

impl TestNode {
    pub(crate) fn new(key: u32) -> Box<TestNode> {
        Box::new(TestNode {
            links: Links::new(),
            key,
        })
    }
}

unsafe impl Linked<Links<TestNode>> for TestNode {
    type Handle = Box<TestNode>;

    fn into_ptr(r: Self::Handle) -> NonNull<Self> {
        NonNull::new(Box::into_raw(r)).unwrap()
    }

    unsafe fn from_ptr(ptr: NonNull<Self>) -> Self::Handle {
        unsafe { Box::from_raw(ptr.as_ptr()) }
    }

    unsafe fn links(ptr: NonNull<Self>) -> NonNull<Links<TestNode>> {
        // SAFETY: Self is #[repr(C)] and `links` is first field
        ptr.cast()
    }
}

impl TreeNode<Links<TestNode>> for TestNode {
    type Key = u32;

    fn key(&self) -> &Self::Key {
        &self.key
    }
}

#[derive(Copy, Clone, Debug, Arbitrary)]
pub enum ItemValue {
    Index(usize),
    Random(u32),
}

impl ItemValue {
    fn resolve(self, present: &[u32]) -> u32 {
        match self {
            ItemValue::Index(idx) if present.is_empty() => idx as u32,
            ItemValue::Index(idx) => present[idx % present.len()],
            ItemValue::Random(v) => v,
        }
    }
}

proptest::prop_compose! {
    fn index_strategy()(
        index in 0usize..1000,
    ) -> ItemValue {
        ItemValue::Index(index)
    }
}

proptest::prop_compose! {
    fn random_strategy()(
        random in 0u32..1000,
    ) -> ItemValue {
        ItemValue::Random(random)
    }
}

fn value_strategy() -> impl Strategy<Value = ItemValue> {
    proptest::prop_oneof![index_strategy(), random_strategy()]
}

#[derive(Copy, Clone, Debug, Arbitrary)]
pub enum Op {
    Insert(ItemValue),
    InsertNear(ItemValue, usize),
    Get(ItemValue),
    Remove(ItemValue),
    Rank(ItemValue),
    Nth(usize),
    First,
    PopFirst,
    Last,
    PopLast,
}

impl Op {
    fn finalize(self, sorted: &[u32]) -> FinalOp {
        match self {
            Op::Insert(item) => FinalOp::Insert(item.resolve(sorted)),
            Op::InsertNear(item, hint) => {
                FinalOp::InsertNear(item.resolve(sorted), hint % sorted.len().max(1))
            }
            Op::Get(item) => FinalOp::Get(item.resolve(sorted)),
            Op::Remove(item) => FinalOp::Remove(item.resolve(sorted)),
            Op::Rank(item) => FinalOp::Rank(item.resolve(sorted)),
            Op::Nth(index) => FinalOp::Nth(index % (sorted.len() + 1)),
            Op::First => FinalOp::First,
            Op::PopFirst => FinalOp::PopFirst,
            Op::Last => FinalOp::Last,
            Op::PopLast => FinalOp::PopLast,
        }
    }
}

#[derive(Copy, Clone, Debug)]
enum FinalOp {
    Insert(u32),
    InsertNear(u32, usize),
    Get(u32),
    Remove(u32),
    Rank(u32),
    Nth(usize),
    First,
    PopFirst,
    Last,
    PopLast,
}

pub fn op_strategy() -> impl Strategy<Value = Op> {
    proptest::prop_oneof![
        value_strategy().prop_map(Op::Insert),
        (value_strategy(), 0usize..1000).prop_map(|(item, hint)| Op::InsertNear(item, hint)),
        value_strategy().prop_map(Op::Get),
        value_strategy().prop_map(Op::Remove),
        value_strategy().prop_map(Op::Rank),
        (0usize..1000).prop_map(Op::Nth),
        Just(Op::First),
        Just(Op::PopFirst),
        Just(Op::Last),
        Just(Op::PopLast),
    ]
}

/// Runs `ops` against an [`RbTree`] and a sorted `Vec`, which stands in for a multiset since the
/// tree keeps equal keys.
pub fn run_multiset_equivalence(ops: Vec<Op>) {
    let mut sorted = Vec::with_capacity(ops.len());
    let mut tree: RbTree<TestNode> = RbTree::new();

    fn lower_bound(v: &[u32], value: u32) -> usize {
        v.partition_point(|&x| x < value)
    }

    fn upper_bound(v: &[u32], value: u32) -> usize {
        v.partition_point(|&x| x <= value)
    }

    #[inline]
    #[allow(clippy::boxed_local)]
    fn node_key(node: Box<TestNode>) -> u32 {
        assert!(!node.links.is_linked());
        node.key
    }

    #[inline]
    fn ref_key(node: core::pin::Pin<&TestNode>) -> u32 {
        node.key
    }

    for (op_id, op) in ops.into_iter().enumerate() {
        let final_op = op.finalize(&sorted);

        match final_op {
            FinalOp::Insert(value) => {
                sorted.insert(upper_bound(&sorted, value), value);

                let inserted = tree.insert(TestNode::new(value));
                assert!(inserted.is_ok(), "FinalOp #{op_id}: {final_op:?}");
            }

            FinalOp::InsertNear(value, hint) => {
                sorted.insert(upper_bound(&sorted, value), value);

                // The hint is any node in the tree; a hint that does not bound the key restarts
                // the descent from the root.
                let inserted = match tree.nth(hint).map(|node| NonNull::from(&*node)) {
                    Some(hint) => unsafe { tree.insert_near(hint, TestNode::new(value)) },
                    None => tree.insert(TestNode::new(value)),
                };
                assert!(inserted.is_ok(), "FinalOp #{op_id}: {final_op:?}");
            }

            FinalOp::Get(value) => {
                let from_vec = sorted.binary_search(&value).ok().map(|_| value);
                let from_tree = tree.get(&value).map(ref_key);

                assert_eq!(from_vec, from_tree, "FinalOp #{op_id}: {final_op:?}");
            }

            FinalOp::Remove(value) => {
                let from_vec = sorted
                    .binary_search(&value)
                    .ok()
                    .map(|idx| sorted.remove(idx));
                let from_tree = tree.remove(&value).map(node_key);

                assert_eq!(from_vec, from_tree, "FinalOp #{op_id}: {final_op:?}");
            }

            FinalOp::Rank(value) => {
                let range = lower_bound(&sorted, value)..upper_bound(&sorted, value);

                match tree.get(&value) {
                    Some(node) => {
                        let rank = unsafe { tree.rank(NonNull::from(&*node)) };
                        assert!(range.contains(&rank), "FinalOp #{op_id}: {final_op:?}");
                    }
                    None => assert!(range.is_empty(), "FinalOp #{op_id}: {final_op:?}"),
                }
            }

            FinalOp::Nth(index) => {
                let from_vec = sorted.get(index).copied();
                let from_tree = tree.nth(index).map(ref_key);

                assert_eq!(from_vec, from_tree, "FinalOp #{op_id}: {final_op:?}");
            }

            FinalOp::First => {
                let from_vec = sorted.first().copied();
                let from_tree = tree.first().map(ref_key);

                assert_eq!(from_vec, from_tree, "FinalOp #{op_id}: {final_op:?}");
            }

            FinalOp::PopFirst => {
                let from_vec = (!sorted.is_empty()).then(|| sorted.remove(0));
                let from_tree = tree.pop_first().map(node_key);

                assert_eq!(from_vec, from_tree, "FinalOp #{op_id}: {final_op:?}");
            }

            FinalOp::Last => {
                let from_vec = sorted.last().copied();
                let from_tree = tree.last().map(ref_key);

                assert_eq!(from_vec, from_tree, "FinalOp #{op_id}: {final_op:?}");
            }

            FinalOp::PopLast => {
                let from_vec = sorted.pop();
                let from_tree = tree.pop_last().map(node_key);

                assert_eq!(from_vec, from_tree, "FinalOp #{op_id}: {final_op:?}");
            }
        }

        tree.assert_invariants();
        assert_eq!(sorted.len(), tree.len());
        assert!(sorted.iter().zip(tree.iter()).all(|(&a, b)| a == b.key));
        assert!(sorted.iter().rev().zip(tree.iter().rev()).all(|(&a, b)| a == b.key));
    }
}

/// Node capacity of the compact model's table.
pub const COMPACT_CAPACITY: usize = 64;

/// Bucket count of the compact model's table.
pub const COMPACT_BUCKETS: usize = 8;

#[derive(Copy, Clone, Debug, Arbitrary)]
pub enum CompactOp {
    Insert(ItemValue),
    Get(ItemValue),
    Remove(ItemValue),
    Walk(u8),
}

pub fn compact_op_strategy() -> impl Strategy<Value = CompactOp> {
    proptest::prop_oneof![
        value_strategy().prop_map(CompactOp::Insert),
        value_strategy().prop_map(CompactOp::Get),
        value_strategy().prop_map(CompactOp::Remove),
        proptest::num::u8::ANY.prop_map(CompactOp::Walk),
    ]
}

/// Runs `ops` against an [`RbHash`] over a dense key array and a `BTreeSet`.
///
/// Keys are unique. Removing a key frees its id, and the last id is moved into the hole with
/// [`RbHash::path_swap`] so the key array stays dense.
pub fn run_compact_equivalence(ops: Vec<CompactOp>) {
    let layout = Layout::new(COMPACT_CAPACITY, COMPACT_BUCKETS).unwrap();
    let mut hash: RbHash<u8, Vec<u8>> =
        RbHash::new(vec![0; layout.table_words()], COMPACT_CAPACITY, COMPACT_BUCKETS).unwrap();
    let mut keys: Vec<u32> = Vec::with_capacity(COMPACT_CAPACITY);
    let mut set = BTreeSet::new();

    let bucket_of = |key: u32| key as usize % COMPACT_BUCKETS;

    for (op_id, op) in ops.into_iter().enumerate() {
        let present: Vec<u32> = set.iter().copied().collect();

        match op {
            CompactOp::Insert(item) => {
                let key = item.resolve(&present);
                if set.contains(&key) || keys.len() == COMPACT_CAPACITY {
                    continue;
                }

                set.insert(key);
                keys.push(key);
                let id = keys.len();
                let k = &keys;
                hash.insert(bucket_of(key), id, |n| key.cmp(&k[n - 1]))
                    .unwrap();
            }

            CompactOp::Get(item) => {
                let key = item.resolve(&present);
                let k = &keys;
                let found = hash
                    .find(bucket_of(key), |n| key.cmp(&k[n - 1]))
                    .unwrap()
                    .map(|id| keys[id - 1]);

                assert_eq!(set.get(&key).copied(), found, "op #{op_id}: {op:?}");
            }

            CompactOp::Remove(item) => {
                let key = item.resolve(&present);
                let k = &keys;
                let removed = hash
                    .delete(bucket_of(key), |n| key.cmp(&k[n - 1]))
                    .unwrap();

                assert_eq!(set.remove(&key), removed.is_some(), "op #{op_id}: {op:?}");

                if let Some(id) = removed {
                    assert_eq!(keys[id - 1], key);

                    let last = keys.len();
                    if id != last {
                        let moved = keys[last - 1];
                        let k = &keys;
                        let mut path = Path::new();
                        let at = hash
                            .find_path(bucket_of(moved), |n| moved.cmp(&k[n - 1]), &mut path)
                            .unwrap();
                        assert_eq!(at, Some(last), "op #{op_id}: {op:?}");

                        hash.path_swap(&path, id).unwrap();
                        keys[id - 1] = moved;
                    }
                    keys.pop();
                }
            }

            CompactOp::Walk(bucket) => {
                let bucket = bucket as usize % COMPACT_BUCKETS;
                let expected: Vec<u32> = set
                    .iter()
                    .copied()
                    .filter(|&key| bucket_of(key) == bucket)
                    .collect();

                let mut path = Path::new();
                let mut walked = Vec::new();
                let mut cur = hash.first_path(bucket, &mut path).unwrap();
                while let Some(id) = cur {
                    walked.push(keys[id - 1]);
                    cur = hash.path_step(&mut path, Dir::Right).unwrap();
                }

                assert_eq!(expected, walked, "op #{op_id}: {op:?}");
                assert_eq!(hash.bucket_len(bucket).unwrap(), expected.len());
            }
        }

        assert_eq!(keys.len(), set.len());
        for bucket in 0..COMPACT_BUCKETS {
            let k = &keys;
            let violations = hash
                .validate(bucket, |a, b| k[a - 1].cmp(&k[b - 1]))
                .unwrap();
            assert!(violations.is_empty(), "op #{op_id}: bucket {bucket}: {violations:?}");
        }

        let live = 2 * (keys.len() + 1);
        assert!(hash.as_words()[live..layout.bucket_offset()]
            .iter()
            .all(|&w| w == 0));
    }
}
