// THEORY:
// The `Arena` is a bump-style pool of fixed-size records. The region detector
// creates one run record per maximal pixel run and one part record per
// provisional region on every frame; allocating those individually would put
// the global allocator inside the hottest loop of the crate.
//
// Key architectural principles:
// 1.  **Pre-allocation**: The backing storage is filled with default records up
//     front. `push` only writes into the next free slot and bumps a cursor.
// 2.  **Reuse, not release**: `clear` resets the cursor. The backing storage is
//     kept, so the next frame of the same size never touches the allocator.
// 3.  **Index handles**: Slots are addressed by `u32` indices, which stay valid
//     until the next `clear`. Growth may move the storage, indices survive it.
// 4.  **Issuance-order iteration**: `iter` visits exactly the slots issued since
//     the last `clear`, in the order they were handed out.

use std::ops::{Index, IndexMut};

/// A growable pool of `T` slots addressed by `u32` handles.
#[derive(Debug, Clone)]
pub struct Arena<T> {
    /// Backing storage. Every slot past `issued` is scratch.
    slots: Vec<T>,
    /// Number of slots handed out since the last `clear`.
    issued: usize,
}

impl<T: Default> Arena<T> {
    /// Creates an arena with `capacity` pre-allocated slots.
    pub fn new(capacity: usize) -> Self {
        let mut slots = Vec::with_capacity(capacity);
        slots.resize_with(capacity, T::default);
        Self { slots, issued: 0 }
    }

    /// Stores `value` in the next free slot and returns its handle.
    /// Doubles the backing storage when every slot is in use.
    #[inline]
    pub fn push(&mut self, value: T) -> u32 {
        if self.issued == self.slots.len() {
            self.grow();
        }
        let index = self.issued;
        self.slots[index] = value;
        self.issued += 1;
        index as u32
    }

    #[cold]
    fn grow(&mut self) {
        let new_len = (self.slots.len() * 2).max(16);
        log::debug!(
            "arena of {} grew from {} to {} slots",
            std::any::type_name::<T>(),
            self.slots.len(),
            new_len
        );
        self.slots.resize_with(new_len, T::default);
    }
}

impl<T> Arena<T> {
    /// Makes every slot available again without freeing the storage.
    #[inline]
    pub fn clear(&mut self) {
        self.issued = 0;
    }

    /// Number of slots issued since the last `clear`.
    #[inline]
    pub fn len(&self) -> usize {
        self.issued
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.issued == 0
    }

    /// Number of slots currently backed by storage.
    #[inline]
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    #[inline]
    pub fn get(&self, index: u32) -> Option<&T> {
        self.as_slice().get(index as usize)
    }

    #[inline]
    pub fn get_mut(&mut self, index: u32) -> Option<&mut T> {
        let issued = self.issued;
        self.slots[..issued].get_mut(index as usize)
    }

    /// The issued slots, in issuance order.
    #[inline]
    pub fn as_slice(&self) -> &[T] {
        &self.slots[..self.issued]
    }

    /// Iterates over the issued slots, in issuance order.
    pub fn iter(&self) -> std::slice::Iter<'_, T> {
        self.as_slice().iter()
    }
}

impl<T> Index<u32> for Arena<T> {
    type Output = T;

    #[inline]
    fn index(&self, index: u32) -> &T {
        &self.as_slice()[index as usize]
    }
}

impl<T> IndexMut<u32> for Arena<T> {
    #[inline]
    fn index_mut(&mut self, index: u32) -> &mut T {
        let issued = self.issued;
        &mut self.slots[..issued][index as usize]
    }
}

impl<'a, T> IntoIterator for &'a Arena<T> {
    type Item = &'a T;
    type IntoIter = std::slice::Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}
