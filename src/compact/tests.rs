extern crate std;

use std::{cmp::Ordering, prelude::v1::*};

use super::*;
use crate::diag::Violations;

const CAPACITY: usize = 64;
const BUCKETS: usize = 4;

/// A dense key array backing one table, in the way a caller would pair them.
struct Fixture {
    hash: RbHash<u8, Vec<u8>>,
    keys: Vec<u32>,
}

impl Fixture {
    fn new() -> Fixture {
        let layout = Layout::new(CAPACITY, BUCKETS).unwrap();
        Fixture {
            hash: RbHash::new(vec![0; layout.table_words()], CAPACITY, BUCKETS).unwrap(),
            keys: Vec::new(),
        }
    }

    fn bucket(key: u32) -> usize {
        key as usize % BUCKETS
    }

    fn insert(&mut self, key: u32) -> usize {
        self.keys.push(key);
        let id = self.keys.len();
        let keys = &self.keys;
        self.hash
            .insert(Self::bucket(key), id, |n| key.cmp(&keys[n - 1]))
            .unwrap();
        id
    }

    fn find(&self, key: u32) -> Option<usize> {
        let keys = &self.keys;
        self.hash
            .find(Self::bucket(key), |n| key.cmp(&keys[n - 1]))
            .unwrap()
    }

    fn path_to(&self, key: u32) -> Path {
        let keys = &self.keys;
        let mut path = Path::new();
        self.hash
            .find_path(Self::bucket(key), |n| key.cmp(&keys[n - 1]), &mut path)
            .unwrap();
        path
    }

    fn delete(&mut self, key: u32) -> Option<usize> {
        let keys = &self.keys;
        self.hash
            .delete(Self::bucket(key), |n| key.cmp(&keys[n - 1]))
            .unwrap()
    }

    // Deletes `key`, then moves the last id into the freed slot so ids stay dense.
    fn delete_compacting(&mut self, key: u32) -> bool {
        let Some(id) = self.delete(key) else {
            return false;
        };

        let last = self.keys.len();
        if id != last {
            let moved = self.keys[last - 1];
            let path = self.path_to(moved);
            assert_eq!(path.last().map(|r| self.hash.word(r) >> 1), Some(last));
            self.hash.path_swap(&path, id).unwrap();
            self.keys[id - 1] = moved;
        }
        self.keys.pop();
        true
    }

    fn validate(&self, bucket: usize) -> Violations {
        let keys = &self.keys;
        self.hash
            .validate(bucket, |a, b| keys[a - 1].cmp(&keys[b - 1]))
            .unwrap()
    }

    #[track_caller]
    fn assert_valid(&self) {
        for bucket in 0..BUCKETS {
            assert_eq!(self.validate(bucket), Violations::empty(), "bucket {bucket}");
        }
    }

    fn walk(&self, bucket: usize, dir: Dir) -> Vec<u32> {
        let mut path = Path::new();
        let mut out = Vec::new();

        let mut cur = match dir {
            Dir::Right => self.hash.first_path(bucket, &mut path).unwrap(),
            Dir::Left => {
                path.push(self.hash.bucket_slot(bucket).unwrap(), PATH_CAPACITY)
                    .unwrap();
                self.hash.descend_path(&mut path, Dir::Right).unwrap()
            }
        };

        while let Some(id) = cur {
            out.push(self.keys[id - 1]);
            cur = self.hash.path_step(&mut path, dir).unwrap();
        }

        out
    }

    fn height(&self, bucket: usize) -> usize {
        fn height(hash: &RbHash<u8, Vec<u8>>, ref_index: usize) -> usize {
            match hash.word(ref_index) >> 1 {
                0 => 0,
                id => {
                    1 + height(hash, link(id, Dir::Left)).max(height(hash, link(id, Dir::Right)))
                }
            }
        }

        height(&self.hash, self.hash.bucket_slot(bucket).unwrap())
    }
}

fn permutations(keys: &[u32]) -> Vec<Vec<u32>> {
    if keys.len() <= 1 {
        return vec![keys.to_vec()];
    }

    let mut out = Vec::new();
    for i in 0..keys.len() {
        let mut rest = keys.to_vec();
        let head = rest.remove(i);
        for mut tail in permutations(&rest) {
            tail.insert(0, head);
            out.push(tail);
        }
    }
    out
}

#[test]
fn layout_sizes() {
    let layout = Layout::new(200, 16).unwrap();
    assert_eq!(layout.word_bits(), 16);
    assert_eq!(layout.word_size(), 2);
    assert_eq!(layout.bucket_offset(), 402);
    assert_eq!(layout.table_words(), 418);
    assert_eq!(layout.table_bytes(), 836);

    let small = Layout::new(127, 1).unwrap();
    assert_eq!(small.word_bits(), 8);
    assert_eq!(small.table_bytes(), 2 * 127 + 2 + 1);
}

#[test]
fn layout_errors() {
    assert_eq!(Layout::new(10, 0), Err(LayoutError::NoBuckets));

    assert_eq!(
        RbHash::<u8, _>::new(vec![0u8; 3], 200, 1).err(),
        Some(LayoutError::WidthTooSmall {
            capacity: 200,
            max_id: 127
        })
    );

    assert_eq!(
        RbHash::<u8, _>::new(vec![0u8; 10], 4, 2).err(),
        Some(LayoutError::TableSize {
            expected: 12,
            found: 10
        })
    );

    // Only the narrowest width is accepted, so a capacity always maps to one byte layout.
    assert_eq!(
        RbHash::<u32, _>::new(vec![0u32; 12], 4, 2).err(),
        Some(LayoutError::WidthMismatch {
            capacity: 4,
            expected: 8,
            found: 32
        })
    );
    let canonical = Layout::new(200, 1).unwrap();
    assert_eq!(
        RbHash::<u32, _>::new(vec![0u32; canonical.table_words()], 200, 1).err(),
        Some(LayoutError::WidthMismatch {
            capacity: 200,
            expected: 16,
            found: 32
        })
    );
    let hash = RbHash::<u16, _>::new(vec![0u16; canonical.table_words()], 200, 1).unwrap();
    assert_eq!(hash.layout(), canonical);
}

#[test]
fn single_insert_and_delete() {
    let mut fx = Fixture::new();
    let id = fx.insert(8);

    assert_eq!(fx.find(8), Some(id));
    assert_eq!(fx.hash.root(0).unwrap(), Some(id));
    assert_eq!(fx.hash.bucket_len(0).unwrap(), 1);
    fx.assert_valid();

    assert_eq!(fx.delete(8), Some(id));
    assert_eq!(fx.find(8), None);
    assert_eq!(fx.hash.root(0).unwrap(), None);
    assert!(fx.hash.as_words().iter().all(|&w| w == 0));
}

#[test]
fn ascending_seven_is_shallow() {
    let mut fx = Fixture::new();
    for key in 1..=7 {
        fx.insert(key * BUCKETS as u32);
    }

    fx.assert_valid();
    // Three edges from the root to the deepest leaf.
    assert_eq!(fx.height(0), 4);
    assert_eq!(fx.walk(0, Dir::Right), [4, 8, 12, 16, 20, 24, 28]);
}

#[test]
fn every_insert_and_delete_order() {
    let keys = [4, 8, 12, 16, 20];

    for inserts in permutations(&keys) {
        for deletes in permutations(&keys) {
            let mut fx = Fixture::new();
            for &key in &inserts {
                fx.insert(key);
                fx.assert_valid();
            }

            for (i, &key) in deletes.iter().enumerate() {
                assert!(fx.delete(key).is_some(), "{inserts:?} / {deletes:?}");
                fx.assert_valid();

                let mut rest = deletes[i + 1..].to_vec();
                rest.sort_unstable();
                assert_eq!(fx.walk(0, Dir::Right), rest);
            }

            assert!(fx.hash.as_words().iter().all(|&w| w == 0));
        }
    }
}

#[test]
fn deep_deletes_stay_valid() {
    let mut fx = Fixture::new();
    for key in 0..CAPACITY as u32 {
        fx.insert(key * 7 % 61 * BUCKETS as u32 + 1);
    }
    fx.assert_valid();

    let mut live: Vec<u32> = fx.keys.clone();
    for i in (0..live.len()).rev().step_by(3) {
        let key = live.remove(i);
        assert!(fx.delete(key).is_some());
        fx.assert_valid();
    }

    live.sort_unstable();
    assert_eq!(fx.walk(1, Dir::Right), live);
}

#[test]
fn stepping_both_ways() {
    let mut fx = Fixture::new();
    for key in [50, 10, 90, 30, 70, 20, 60, 80, 40, 0] {
        fx.insert(key * BUCKETS as u32 + 2);
    }

    let forward = fx.walk(2, Dir::Right);
    let mut backward = fx.walk(2, Dir::Left);
    backward.reverse();

    assert_eq!(forward.len(), 10);
    assert!(forward.windows(2).all(|w| w[0] < w[1]));
    assert_eq!(forward, backward);
    assert_eq!(fx.hash.bucket_len(2).unwrap(), 10);
    assert_eq!(fx.hash.bucket_len(3).unwrap(), 0);
}

#[test]
fn step_past_the_end_keeps_the_path() {
    let mut fx = Fixture::new();
    for key in [1, 5, 9] {
        fx.insert(key * BUCKETS as u32);
    }

    let path = fx.path_to(36);
    let mut stepped = path.clone();
    assert_eq!(fx.hash.path_step(&mut stepped, Dir::Right).unwrap(), None);
    assert_eq!(stepped.refs(), path.refs());

    let mut empty = Path::new();
    assert_eq!(fx.hash.first_path(3, &mut empty).unwrap(), None);
    assert_eq!(
        fx.hash.path_step(&mut empty, Dir::Right),
        Err(Error::EmptySlot)
    );
}

#[test]
fn insert_rejections_leave_table_unchanged() {
    let mut fx = Fixture::new();
    let root = fx.insert(12);
    let leaf = fx.insert(16);
    let before = fx.hash.as_words().to_vec();

    assert_eq!(
        fx.hash.insert(0, root, |_| Ordering::Greater),
        Err(Error::AlreadyLinked { id: root })
    );
    // A leaf has no link words set, but the descent meets it.
    assert_eq!(
        fx.hash.insert(0, leaf, |_| Ordering::Greater),
        Err(Error::AlreadyLinked { id: leaf })
    );
    assert_eq!(
        fx.hash.insert(0, 0, |_| Ordering::Less),
        Err(Error::IdOutOfRange {
            id: 0,
            capacity: CAPACITY
        })
    );
    assert_eq!(
        fx.hash.insert(0, CAPACITY + 1, |_| Ordering::Less),
        Err(Error::IdOutOfRange {
            id: CAPACITY + 1,
            capacity: CAPACITY
        })
    );
    assert_eq!(
        fx.hash.insert(BUCKETS, 3, |_| Ordering::Less),
        Err(Error::BucketOutOfRange {
            bucket: BUCKETS,
            buckets: BUCKETS
        })
    );

    // A node with children in another bucket shows it in its own words.
    assert_eq!(
        fx.hash.insert(1, root, |_| Ordering::Less),
        Err(Error::AlreadyLinked { id: root })
    );

    assert_eq!(fx.hash.as_words(), &before[..]);
}

#[test]
fn equal_keys_reject_every_linked_node() {
    let mut fx = Fixture::new();
    for id in 1..=3 {
        fx.hash.insert(0, id, |_| Ordering::Equal).unwrap();
    }
    // Equal keys go right, so the third insert rotates id 2 to the root.
    assert_eq!(fx.hash.root(0).unwrap(), Some(2));

    let before = fx.hash.as_words().to_vec();
    for id in 1..=3 {
        assert_eq!(
            fx.hash.insert(0, id, |_| Ordering::Equal),
            Err(Error::AlreadyLinked { id })
        );
    }
    assert_eq!(fx.hash.as_words(), &before[..]);

    // A run of equal keys between smaller and larger ones, deep enough to spread over both
    // subtrees of the root.
    let mut fx = Fixture::new();
    let key = |id: usize| match id {
        1..=5 => 1,
        6..=25 => 2,
        _ => 3,
    };
    for id in 1..=30 {
        fx.hash.insert(0, id, |n| key(id).cmp(&key(n))).unwrap();
    }

    let before = fx.hash.as_words().to_vec();
    for id in 1..=30 {
        assert_eq!(
            fx.hash.insert(0, id, |n| key(id).cmp(&key(n))),
            Err(Error::AlreadyLinked { id })
        );
    }
    assert_eq!(fx.hash.as_words(), &before[..]);
    assert_eq!(
        fx.hash.validate(0, |a, b| key(a).cmp(&key(b))).unwrap(),
        Violations::empty()
    );

    fx.hash.insert(0, 31, |n| 2.cmp(&key(n))).unwrap();
    assert_eq!(fx.hash.bucket_len(0).unwrap(), 31);
}

#[test]
fn insert_at_a_traced_path() {
    let mut fx = Fixture::new();
    for key in [3, 7, 11] {
        fx.insert(key);
    }

    let occupied = fx.path_to(7);
    assert_eq!(fx.hash.insert_at(&occupied, 9), Err(Error::OccupiedSlot));

    let vacant = fx.path_to(15);
    fx.keys.push(15);
    let id = fx.keys.len();
    fx.hash.insert_at(&vacant, id).unwrap();

    fx.assert_valid();
    assert_eq!(fx.walk(3, Dir::Right), [3, 7, 11, 15]);
}

#[test]
fn delete_missing_key() {
    let mut fx = Fixture::new();
    fx.insert(4);
    assert_eq!(fx.delete(8), None);
    assert_eq!(fx.hash.bucket_len(0).unwrap(), 1);

    let mut path = Path::new();
    assert_eq!(fx.hash.delete_at(&mut path), Err(Error::EmptySlot));
}

#[test]
fn compaction_matches_a_rebuild() {
    let mut fx = Fixture::new();
    for key in 1..=20 {
        fx.insert(key * 3);
    }

    for key in [15, 60, 3, 33, 42] {
        assert!(fx.delete_compacting(key));
        fx.assert_valid();

        // Everything past the live ids is zeroed.
        let live_words = 2 * (fx.keys.len() + 1);
        assert!(fx.hash.as_words()[live_words..2 * (CAPACITY + 1)]
            .iter()
            .all(|&w| w == 0));
    }

    let mut rebuilt = Fixture::new();
    for &key in &fx.keys {
        rebuilt.insert(key);
    }
    rebuilt.assert_valid();

    for bucket in 0..BUCKETS {
        assert_eq!(fx.walk(bucket, Dir::Right), rebuilt.walk(bucket, Dir::Right));
    }
    for &key in &fx.keys {
        assert_eq!(fx.find(key).map(|id| fx.keys[id - 1]), Some(key));
    }
}

#[test]
fn path_swap_rejections() {
    let mut fx = Fixture::new();
    let a = fx.insert(4);
    let b = fx.insert(8);

    let path = fx.path_to(8);
    assert_eq!(fx.hash.path_swap(&path, a), Err(Error::NotZeroed { id: a }));
    assert_eq!(
        fx.hash.path_swap(&path, CAPACITY + 1),
        Err(Error::IdOutOfRange {
            id: CAPACITY + 1,
            capacity: CAPACITY
        })
    );

    // Swapping onto itself is a no-op.
    fx.hash.path_swap(&path, b).unwrap();

    let vacant = fx.path_to(12);
    assert_eq!(fx.hash.path_swap(&vacant, 3), Err(Error::EmptySlot));
}

#[test]
fn path_swap_onto_a_linked_child() {
    let mut fx = Fixture::new();
    let root = fx.insert(8);
    let left = fx.insert(4);
    let right = fx.insert(12);
    let before = fx.hash.as_words().to_vec();

    // Both leaves have zeroed words, but they hang off the moving node.
    let path = fx.path_to(8);
    assert_eq!(path.last().map(|r| fx.hash.word(r) >> 1), Some(root));
    for child in [left, right] {
        assert_eq!(
            fx.hash.path_swap(&path, child),
            Err(Error::AlreadyLinked { id: child })
        );
    }

    assert_eq!(fx.hash.as_words(), &before[..]);
    fx.assert_valid();
}

#[test]
fn corruption_is_detected() {
    let mut fx = Fixture::new();
    for key in 1..=7 {
        fx.insert(key * BUCKETS as u32);
    }
    fx.assert_valid();
    let clean = fx.hash.as_words().to_vec();
    let slot = fx.hash.bucket_slot(0).unwrap();

    // Red root.
    let root = fx.hash.word(slot);
    fx.hash.set(slot, root | 1);
    assert!(fx.validate(0).contains(Violations::INVALID_ROOT));
    fx.hash.table.copy_from_slice(&clean);

    // Damaged header.
    fx.hash.set(1, 2);
    assert!(fx.validate(0).contains(Violations::INVALID_SENTINEL));
    fx.hash.table.copy_from_slice(&clean);

    // A red node recolored black unbalances black heights.
    let red_ref = fx
        .keys
        .clone()
        .into_iter()
        .map(|key| fx.path_to(key))
        .filter_map(|path| path.last())
        .find(|&r| fx.hash.is_red(r))
        .unwrap();
    fx.hash.set_color(red_ref, Color::Black);
    assert!(fx.validate(0).contains(Violations::COLOR));
    fx.hash.table.copy_from_slice(&clean);

    // Keys out of order.
    fx.keys.swap(0, 6);
    assert!(fx.validate(0).contains(Violations::ORDER));
    fx.keys.swap(0, 6);

    // A link past the capacity.
    let leaf = fx.find(4).unwrap();
    fx.hash.set(link(leaf, Dir::Left), pack(CAPACITY + 1, Color::Red));
    assert!(fx.validate(0).contains(Violations::DISCONNECTED));
    fx.hash.table.copy_from_slice(&clean);

    assert_eq!(fx.validate(0), Violations::empty());
}

#[test]
fn cycles_overflow_the_path() {
    let mut fx = Fixture::new();
    let id = fx.insert(4);
    fx.hash.set(link(id, Dir::Left), pack(id, Color::Black));

    let limit = path_limit(8);
    assert_eq!(
        fx.hash.find(0, |_| Ordering::Less),
        Err(Error::PathOverflow { limit })
    );

    let mut path = Path::new();
    assert_eq!(
        fx.hash.first_path(0, &mut path),
        Err(Error::PathOverflow { limit })
    );

    assert!(fx.validate(0).contains(Violations::DISCONNECTED));
}
