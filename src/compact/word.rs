use core::fmt;

use crate::store::{Color, Dir};

mod sealed {
    pub trait Sealed {}
}

/// An unsigned word holding one packed reference.
///
/// The low bit of every reference is the referenced node's color, which leaves `BITS - 1` bits
/// for the node id.
pub trait Word: Copy + Default + Eq + fmt::Debug + sealed::Sealed {
    const BITS: u32;

    /// Largest node id this width can address, `2^(BITS - 1) - 1`.
    const MAX_ID: usize;

    fn to_usize(self) -> usize;

    /// Truncates `value` to the word. Callers keep values within `2 * MAX_ID + 1`.
    fn from_usize(value: usize) -> Self;
}

macro_rules! impl_word {
    ($($ty:ty),*) => {
        $(
            impl sealed::Sealed for $ty {}

            impl Word for $ty {
                const BITS: u32 = <$ty>::BITS;

                const MAX_ID: usize = {
                    let max = (<$ty>::MAX >> 1) as u128;
                    if max > (usize::MAX >> 1) as u128 {
                        usize::MAX >> 1
                    } else {
                        max as usize
                    }
                };

                #[inline]
                fn to_usize(self) -> usize {
                    self as usize
                }

                #[inline]
                fn from_usize(value: usize) -> Self {
                    value as $ty
                }
            }
        )*
    };
}

impl_word!(u8, u16, u32, u64);

/// Supported widths, narrowest first.
pub const WORD_BITS: [u32; 4] = [8, 16, 32, 64];

/// Returns the narrowest supported word width whose maximum id covers `capacity`.
pub const fn word_bits_for(capacity: usize) -> Option<u32> {
    let mut i = 0;
    while i < WORD_BITS.len() {
        let bits = WORD_BITS[i];
        let max_id = (1u128 << (bits - 1)) - 1;
        if max_id >= capacity as u128 {
            return Some(bits);
        }
        i += 1;
    }

    None
}

// Packed references and ref indices. A packed reference is `id << 1 | color`; a ref index names
// the word holding a reference, `id << 1 | side` for node links.

#[inline]
pub(crate) const fn pack(id: usize, color: Color) -> usize {
    id << 1 | color as usize
}

#[inline]
pub(crate) const fn id_of(packed: usize) -> usize {
    packed >> 1
}

#[inline]
pub(crate) const fn color_of(packed: usize) -> Color {
    Color::from_bit(packed)
}

#[inline]
pub(crate) const fn link(id: usize, dir: Dir) -> usize {
    id << 1 | dir as usize
}

/// The side of its parent that the link at `ref_index` hangs from.
#[inline]
pub(crate) const fn side_of(ref_index: usize) -> Dir {
    Dir::from_bit(ref_index)
}

/// The node owning the link at `ref_index`.
#[inline]
pub(crate) const fn owner_of(ref_index: usize) -> usize {
    ref_index >> 1
}

#[inline]
pub(crate) const fn sibling_link(ref_index: usize) -> usize {
    ref_index ^ 1
}
