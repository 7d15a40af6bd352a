//! Slots: element storage addressed by bucket.
//!
//! The table's occupancy metadata is the source of truth for which slots are
//! live; the `Option` wrapper keeps every access safe and lets drop glue
//! release whatever is still stored. Elements only ever move in and out,
//! they are never duplicated.

use crate::table::Bucket;

#[derive(Clone)]
pub(crate) struct Slots<T> {
    slots: Box<[Option<T>]>,
}

impl<T> Slots<T> {
    pub(crate) fn new(len: usize) -> Self {
        Self {
            slots: core::iter::repeat_with(|| None).take(len).collect(),
        }
    }

    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        self.slots.len()
    }

    #[inline]
    pub(crate) fn get(&self, bucket: Bucket) -> &T {
        self.slots[bucket.offset()]
            .as_ref()
            .expect("occupied bucket must hold an element")
    }

    #[inline]
    pub(crate) fn get_mut(&mut self, bucket: Bucket) -> &mut T {
        self.slots[bucket.offset()]
            .as_mut()
            .expect("occupied bucket must hold an element")
    }

    /// Initialize an empty slot.
    #[inline]
    pub(crate) fn put(&mut self, bucket: Bucket, item: T) {
        let slot = &mut self.slots[bucket.offset()];
        debug_assert!(slot.is_none(), "slot {bucket:?} already initialized");
        *slot = Some(item);
    }

    /// Move the element out, leaving the slot uninitialized.
    #[inline]
    pub(crate) fn take(&mut self, bucket: Bucket) -> T {
        self.slots[bucket.offset()]
            .take()
            .expect("occupied bucket must hold an element")
    }

    /// Move out whatever the slot holds, possibly nothing.
    #[inline]
    pub(crate) fn take_slot(&mut self, bucket: Bucket) -> Option<T> {
        self.slots[bucket.offset()].take()
    }

    /// Swap `item` with the current occupant.
    #[inline]
    pub(crate) fn exchange(&mut self, bucket: Bucket, item: &mut T) {
        core::mem::swap(self.get_mut(bucket), item);
    }

    /// Replace the occupant, returning the previous one.
    #[inline]
    pub(crate) fn replace(&mut self, bucket: Bucket, item: T) -> T {
        core::mem::replace(self.get_mut(bucket), item)
    }

    /// Move the contents of `from` into the empty slot `to`.
    #[inline]
    pub(crate) fn relocate(&mut self, from: Bucket, to: Bucket) {
        debug_assert!(self.slots[to.offset()].is_none(), "relocation target {to:?} is live");
        let moved = self.slots[from.offset()].take();
        self.slots[to.offset()] = moved;
    }

    /// Every slot in bucket order, live or not.
    pub(crate) fn raw_iter_mut(&mut self) -> core::slice::IterMut<'_, Option<T>> {
        self.slots.iter_mut()
    }

    /// Drop every element.
    pub(crate) fn clear(&mut self) {
        self.slots.iter_mut().for_each(|slot| *slot = None);
    }

    #[cfg(test)]
    pub(crate) fn is_initialized(&self, bucket: Bucket) -> bool {
        self.slots[bucket.offset()].is_some()
    }
}
