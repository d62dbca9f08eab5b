use core::ptr::{self, NonNull};

use sptr::Strict;

use crate::store::Color;

/// A parent pointer with the node's color packed into its low bit.
pub(crate) struct ColorPtr<T> {
    ptr: *mut T,
}

impl<T> Clone for ColorPtr<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for ColorPtr<T> {}

impl<T> ColorPtr<T> {
    /// A null parent with a black tag.
    pub(crate) const fn null() -> ColorPtr<T> {
        ColorPtr {
            ptr: ptr::null_mut(),
        }
    }

    pub(crate) fn new(ptr: Option<NonNull<T>>, color: Color) -> ColorPtr<T> {
        let ptr = opt_nonnull_to_raw(ptr);

        assert!(ptr.addr() % 2 == 0);

        ColorPtr {
            ptr: ptr.map_addr(|addr| addr | color as usize),
        }
    }

    pub(crate) fn ptr(&self) -> Option<NonNull<T>> {
        NonNull::new(self.ptr.map_addr(|tagged_addr| tagged_addr & !1_usize))
    }

    pub(crate) fn color(&self) -> Color {
        Color::from_bit(self.ptr.addr())
    }

    pub(crate) fn set_ptr(&mut self, ptr: Option<NonNull<T>>) {
        *self = ColorPtr::new(ptr, self.color());
    }

    pub(crate) fn set_color(&mut self, color: Color) {
        *self = ColorPtr::new(self.ptr(), color);
    }
}

fn opt_nonnull_to_raw<T>(ptr: Option<NonNull<T>>) -> *mut T {
    match ptr {
        Some(p) => p.as_ptr(),
        None => ptr::null_mut(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn color_ptr() {
        let ptr: NonNull<u32> = NonNull::dangling();

        let black = ColorPtr::new(Some(ptr), Color::Black);
        assert_eq!(black.color(), Color::Black);

        let red = ColorPtr::new(Some(ptr), Color::Red);
        assert_eq!(red.color(), Color::Red);

        assert_eq!(black.ptr(), Some(ptr));
        assert_eq!(black.ptr(), red.ptr());
    }

    #[test]
    fn null_keeps_color() {
        let mut tagged: ColorPtr<u64> = ColorPtr::null();
        assert_eq!(tagged.ptr(), None);
        assert_eq!(tagged.color(), Color::Black);

        tagged.set_color(Color::Red);
        assert_eq!(tagged.ptr(), None);
        assert_eq!(tagged.color(), Color::Red);

        let target: NonNull<u64> = NonNull::dangling();
        tagged.set_ptr(Some(target));
        assert_eq!(tagged.ptr(), Some(target));
        assert_eq!(tagged.color(), Color::Red);
    }
}
