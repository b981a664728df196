//! A contiguous growable array with explicit control over its storage.
//!
//! [DynamicArray] keeps its elements in a single [RawBuffer] and grows it
//! by the factor `2 * capacity + 1` when an append would overflow it.
//! All operations that may need memory return an [AllocationError] instead
//! of aborting, so that callers can decide how to handle exhaustion.
//!
//! ```
//! use linmat::array::DynamicArray;
//!
//! let mut a = DynamicArray::with_value(2, 7u32).unwrap();
//! a.append(8).unwrap();
//! assert_eq!(a.as_slice(), &[7, 7, 8]);
//! assert_eq!(a.capacity(), 5);
//! ```
mod buffer;

use std::{
    fmt::{self, Debug, Formatter},
    hash::{Hash, Hasher},
    iter::FusedIterator,
    mem,
    ops::{Deref, DerefMut},
    ptr, slice,
};

pub use buffer::AllocationError;
use buffer::RawBuffer;

/// A contiguous array whose elements `[0, len)` are live and whose slots
/// `[len, capacity)` are uninitialized.
pub struct DynamicArray<T> {
    buf: RawBuffer<T>,
}

impl<T> DynamicArray<T> {
    /// Create an empty array. This does not allocate.
    pub const fn new() -> DynamicArray<T> {
        DynamicArray {
            buf: RawBuffer::empty(),
        }
    }

    /// Create an empty array with room for exactly `capacity` elements.
    pub fn with_capacity(capacity: usize) -> Result<DynamicArray<T>, AllocationError> {
        Ok(DynamicArray {
            buf: RawBuffer::allocate(capacity)?,
        })
    }

    /// Create an array of `n` copies of `value`, with capacity `n`.
    pub fn with_value(n: usize, value: T) -> Result<DynamicArray<T>, AllocationError>
    where
        T: Clone,
    {
        let mut a = DynamicArray::with_capacity(n)?;
        if n > 0 {
            for _ in 1..n {
                a.buf.push_within_capacity(value.clone());
            }
            a.buf.push_within_capacity(value);
        }
        Ok(a)
    }

    /// Copy the elements of `data` into a new array with capacity `data.len()`.
    pub fn from_slice(data: &[T]) -> Result<DynamicArray<T>, AllocationError>
    where
        T: Clone,
    {
        let mut a = DynamicArray::with_capacity(data.len())?;
        for x in data {
            a.buf.push_within_capacity(x.clone());
        }
        Ok(a)
    }

    /// Collect an iterator of known length into an array whose capacity
    /// equals the number of elements.
    pub fn from_exact_iter<I>(iter: I) -> Result<DynamicArray<T>, AllocationError>
    where
        I: IntoIterator<Item = T>,
        I::IntoIter: ExactSizeIterator,
    {
        let iter = iter.into_iter();
        let mut a = DynamicArray::with_capacity(iter.len())?;
        for x in iter {
            a.append(x)?;
        }
        Ok(a)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.buf.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.buf.len() == 0
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.buf.capacity()
    }

    /// A pointer to the storage block. Dangling if nothing was allocated.
    #[inline]
    pub fn as_ptr(&self) -> *const T {
        self.buf.as_ptr()
    }

    #[inline]
    pub fn as_slice(&self) -> &[T] {
        // SAFETY: `[0, len)` is live and the pointer is aligned and non-null
        unsafe { slice::from_raw_parts(self.buf.as_ptr(), self.buf.len()) }
    }

    #[inline]
    pub fn as_mut_slice(&mut self) -> &mut [T] {
        let len = self.buf.len();
        // SAFETY: as above, and `&mut self` guarantees exclusivity
        unsafe { slice::from_raw_parts_mut(self.buf.as_mut_ptr(), len) }
    }

    /// The first element, if any.
    #[inline]
    pub fn front(&self) -> Option<&T> {
        self.as_slice().first()
    }

    /// The last element, if any.
    #[inline]
    pub fn back(&self) -> Option<&T> {
        self.as_slice().last()
    }

    /// Add `value` at the end of the array. When the array is full, the
    /// storage is reallocated to `2 * capacity + 1` slots first.
    ///
    /// If the reallocation fails, the array is unchanged and `value` is dropped.
    pub fn append(&mut self, value: T) -> Result<(), AllocationError> {
        if self.len() == self.capacity() {
            let capacity = self.capacity();
            let new_capacity = capacity
                .checked_mul(2)
                .and_then(|c| c.checked_add(1))
                .ok_or(AllocationError::CapacityOverflow { capacity })?;
            self.grow_to(new_capacity)?;
        }

        self.buf.push_within_capacity(value);
        Ok(())
    }

    /// Make room for at least `capacity` elements in total. Grows to exactly
    /// `capacity` if the current storage is smaller, and never shrinks.
    pub fn reserve(&mut self, capacity: usize) -> Result<(), AllocationError> {
        if capacity > self.capacity() {
            self.grow_to(capacity)?;
        }
        Ok(())
    }

    /// Allocate the new block, move the elements over and only then release the old block.
    fn grow_to(&mut self, capacity: usize) -> Result<(), AllocationError> {
        let mut new_buf = RawBuffer::allocate(capacity)?;
        self.buf.relocate_into(&mut new_buf);
        self.buf = new_buf;
        Ok(())
    }

    /// Remove and return the last element.
    pub fn pop(&mut self) -> Option<T> {
        let len = self.len();
        if len == 0 {
            return None;
        }

        // SAFETY: the slot at `len - 1` is live and leaves the live prefix
        unsafe {
            self.buf.set_len(len - 1);
            Some(ptr::read(self.buf.as_ptr().add(len - 1)))
        }
    }

    /// Remove the element at `index`, shifting all later elements one slot to the left.
    pub fn remove(&mut self, index: usize) -> T {
        let len = self.len();
        if index >= len {
            panic!("Removal index {} is out of bounds for length {}", index, len);
        }

        // SAFETY: `index < len`, and the tail `[index + 1, len)` is moved
        // over the vacated slot before shrinking the live prefix
        unsafe {
            let p = self.buf.as_mut_ptr().add(index);
            let value = ptr::read(p);
            ptr::copy(p.add(1), p, len - index - 1);
            self.buf.set_len(len - 1);
            value
        }
    }

    /// Destroy the trailing elements so that `len` elements remain.
    /// Does nothing if the array is not longer than `len`.
    pub fn truncate(&mut self, len: usize) {
        let old_len = self.len();
        if len >= old_len {
            return;
        }

        // shrink first, so that a panicking destructor cannot cause a double drop
        unsafe {
            self.buf.set_len(len);
            self.buf.destroy_range(len, old_len);
        }
    }

    pub fn clear(&mut self) {
        self.truncate(0);
    }

    /// Resize the array to `len` elements. Trailing elements are destroyed
    /// when shrinking; copies of `value` are appended when growing.
    pub fn resize(&mut self, len: usize, value: T) -> Result<(), AllocationError>
    where
        T: Clone,
    {
        let old_len = self.len();
        if len <= old_len {
            self.truncate(len);
            return Ok(());
        }

        self.reserve(len)?;
        for _ in old_len + 1..len {
            self.buf.push_within_capacity(value.clone());
        }
        self.buf.push_within_capacity(value);
        Ok(())
    }

    /// Deep-copy the array into fresh storage whose capacity equals its length.
    ///
    /// If cloning an element panics, the elements copied so far are destroyed
    /// and `self` is untouched.
    pub fn try_clone(&self) -> Result<DynamicArray<T>, AllocationError>
    where
        T: Clone,
    {
        DynamicArray::from_slice(self.as_slice())
    }

    /// Replace the contents of `self` by a copy of `source`. The copy is built
    /// before anything in `self` changes, so on error `self` is unchanged.
    pub fn assign_from(&mut self, source: &DynamicArray<T>) -> Result<(), AllocationError>
    where
        T: Clone,
    {
        let mut tmp = source.try_clone()?;
        mem::swap(self, &mut tmp);
        Ok(())
    }
}

impl<T> Default for DynamicArray<T> {
    fn default() -> Self {
        DynamicArray::new()
    }
}

impl<T> Deref for DynamicArray<T> {
    type Target = [T];

    #[inline]
    fn deref(&self) -> &[T] {
        self.as_slice()
    }
}

impl<T> DerefMut for DynamicArray<T> {
    #[inline]
    fn deref_mut(&mut self) -> &mut [T] {
        self.as_mut_slice()
    }
}

impl<T: Clone> Clone for DynamicArray<T> {
    fn clone(&self) -> Self {
        self.try_clone().unwrap_or_else(|e| e.handle())
    }

    fn clone_from(&mut self, source: &Self) {
        self.assign_from(source).unwrap_or_else(|e| e.handle())
    }
}

impl<T: Debug> Debug for DynamicArray<T> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.iter()).finish()
    }
}

impl<T: PartialEq<U>, U> PartialEq<DynamicArray<U>> for DynamicArray<T> {
    fn eq(&self, other: &DynamicArray<U>) -> bool {
        self.as_slice() == other.as_slice()
    }
}

impl<T: Eq> Eq for DynamicArray<T> {}

impl<T: Hash> Hash for DynamicArray<T> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.as_slice().hash(state)
    }
}

impl<T> FromIterator<T> for DynamicArray<T> {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        let iter = iter.into_iter();
        let mut a = DynamicArray::with_capacity(iter.size_hint().0).unwrap_or_else(|e| e.handle());
        for x in iter {
            a.append(x).unwrap_or_else(|e| e.handle());
        }
        a
    }
}

impl<T> Extend<T> for DynamicArray<T> {
    fn extend<I: IntoIterator<Item = T>>(&mut self, iter: I) {
        for x in iter {
            self.append(x).unwrap_or_else(|e| e.handle());
        }
    }
}

impl<'a, T> IntoIterator for &'a DynamicArray<T> {
    type Item = &'a T;
    type IntoIter = slice::Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl<'a, T> IntoIterator for &'a mut DynamicArray<T> {
    type Item = &'a mut T;
    type IntoIter = slice::IterMut<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter_mut()
    }
}

impl<T> IntoIterator for DynamicArray<T> {
    type Item = T;
    type IntoIter = IntoIter<T>;

    fn into_iter(self) -> IntoIter<T> {
        let DynamicArray { mut buf } = self;
        let end = buf.len();
        // the iterator tracks liveness through `start..end` from now on
        unsafe { buf.set_len(0) };
        IntoIter { buf, start: 0, end }
    }
}

/// An owning iterator over the elements of a [DynamicArray], usable from both ends.
pub struct IntoIter<T> {
    buf: RawBuffer<T>,
    start: usize,
    end: usize,
}

impl<T> Iterator for IntoIter<T> {
    type Item = T;

    fn next(&mut self) -> Option<T> {
        if self.start == self.end {
            return None;
        }

        // SAFETY: `[start, end)` is live; the slot leaves that range
        let x = unsafe { ptr::read(self.buf.as_ptr().add(self.start)) };
        self.start += 1;
        Some(x)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let n = self.end - self.start;
        (n, Some(n))
    }
}

impl<T> DoubleEndedIterator for IntoIter<T> {
    fn next_back(&mut self) -> Option<T> {
        if self.start == self.end {
            return None;
        }

        self.end -= 1;
        // SAFETY: as in `next`
        Some(unsafe { ptr::read(self.buf.as_ptr().add(self.end)) })
    }
}

impl<T> ExactSizeIterator for IntoIter<T> {}

impl<T> FusedIterator for IntoIter<T> {}

impl<T> Drop for IntoIter<T> {
    fn drop(&mut self) {
        // the buffer itself only releases the block
        unsafe { self.buf.destroy_range(self.start, self.end) };
    }
}
