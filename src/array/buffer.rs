//! Raw, uninitialized storage for [DynamicArray](super::DynamicArray).
//!
//! A [RawBuffer] owns one allocation of `capacity` slots and tracks how many
//! of them, counted from the start, hold a live value. It never grows: the
//! owning array allocates a new buffer and relocates into it.

use std::{
    alloc::{self, Layout},
    fmt::{self, Display, Formatter},
    marker::PhantomData,
    mem,
    ptr::{self, NonNull},
};

/// A storage request that could not be satisfied.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AllocationError {
    /// The requested number of elements does not fit in the address space.
    CapacityOverflow { capacity: usize },
    /// The global allocator returned no memory for `layout`.
    OutOfMemory { layout: Layout },
}

impl AllocationError {
    /// Escalate the error for callers that cannot return it, such as
    /// [Clone] implementations. Mirrors the behavior of the standard collections.
    pub fn handle(self) -> ! {
        match self {
            AllocationError::CapacityOverflow { capacity } => {
                panic!("capacity overflow: cannot allocate {} elements", capacity)
            }
            AllocationError::OutOfMemory { layout } => alloc::handle_alloc_error(layout),
        }
    }
}

impl Display for AllocationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            AllocationError::CapacityOverflow { capacity } => {
                write!(f, "Capacity overflow: cannot allocate {} elements", capacity)
            }
            AllocationError::OutOfMemory { layout } => write!(
                f,
                "Out of memory: could not allocate {} bytes with alignment {}",
                layout.size(),
                layout.align()
            ),
        }
    }
}

impl std::error::Error for AllocationError {}

/// A fixed-capacity block of slots for values of type `T`.
///
/// Slots `[0, len)` are live, slots `[len, capacity)` are uninitialized.
/// Dropping the buffer destroys the live prefix and then releases the block.
pub(crate) struct RawBuffer<T> {
    ptr: NonNull<T>,
    capacity: usize,
    len: usize,
    _owned: PhantomData<T>,
}

// SAFETY: the buffer uniquely owns its values, like `Vec<T>`.
unsafe impl<T: Send> Send for RawBuffer<T> {}
unsafe impl<T: Sync> Sync for RawBuffer<T> {}

impl<T> RawBuffer<T> {
    /// A buffer without storage. Never dereferenced.
    pub const fn empty() -> Self {
        RawBuffer {
            ptr: NonNull::dangling(),
            capacity: 0,
            len: 0,
            _owned: PhantomData,
        }
    }

    /// Reserve uninitialized storage for `capacity` values.
    pub fn allocate(capacity: usize) -> Result<Self, AllocationError> {
        let layout = Self::layout(capacity)?;

        if layout.size() == 0 {
            // zero capacity or zero-sized `T`: no memory is needed
            return Ok(RawBuffer {
                ptr: NonNull::dangling(),
                capacity,
                len: 0,
                _owned: PhantomData,
            });
        }

        // SAFETY: the layout has a non-zero size
        let raw = unsafe { alloc::alloc(layout) } as *mut T;
        match NonNull::new(raw) {
            Some(ptr) => Ok(RawBuffer {
                ptr,
                capacity,
                len: 0,
                _owned: PhantomData,
            }),
            None => Err(AllocationError::OutOfMemory { layout }),
        }
    }

    fn layout(capacity: usize) -> Result<Layout, AllocationError> {
        Layout::array::<T>(capacity).map_err(|_| AllocationError::CapacityOverflow { capacity })
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// The number of live values at the start of the buffer.
    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    /// Set the length of the live prefix.
    ///
    /// # Safety
    /// `len <= capacity`, and exactly the slots `[0, len)` must hold live values.
    #[inline]
    pub unsafe fn set_len(&mut self, len: usize) {
        debug_assert!(len <= self.capacity);
        self.len = len;
    }

    #[inline]
    pub fn as_ptr(&self) -> *const T {
        self.ptr.as_ptr()
    }

    #[inline]
    pub fn as_mut_ptr(&mut self) -> *mut T {
        self.ptr.as_ptr()
    }

    /// Move `value` into the uninitialized slot `index`.
    ///
    /// # Safety
    /// `index < capacity` and the slot must not hold a live value.
    #[inline]
    pub unsafe fn construct_at(&mut self, index: usize, value: T) {
        debug_assert!(index < self.capacity);
        ptr::write(self.ptr.as_ptr().add(index), value);
    }

    /// Construct `value` in the first uninitialized slot and extend the live prefix.
    /// The caller must have checked that `len < capacity`.
    #[inline]
    pub fn push_within_capacity(&mut self, value: T) {
        assert!(self.len < self.capacity, "buffer is full");
        // SAFETY: the slot at `len` is in bounds and uninitialized
        unsafe { self.construct_at(self.len, value) };
        self.len += 1;
    }

    /// Run the destructor of the value at `index` without releasing storage.
    ///
    /// # Safety
    /// The slot must hold a live value, which is dead afterwards.
    #[inline]
    pub unsafe fn destroy_at(&mut self, index: usize) {
        debug_assert!(index < self.capacity);
        ptr::drop_in_place(self.ptr.as_ptr().add(index));
    }

    /// Run the destructors of the values in `[begin, end)`.
    ///
    /// # Safety
    /// All slots in the range must hold live values, which are dead afterwards.
    pub unsafe fn destroy_range(&mut self, begin: usize, end: usize) {
        debug_assert!(begin <= end && end <= self.capacity);
        if mem::needs_drop::<T>() {
            for i in begin..end {
                self.destroy_at(i);
            }
        }
    }

    /// Move the live prefix of `self` into `target`, which must be empty and
    /// at least as large. Afterwards `self` has no live values.
    pub fn relocate_into(&mut self, target: &mut RawBuffer<T>) {
        assert!(target.len == 0 && target.capacity >= self.len);
        // SAFETY: the blocks are distinct allocations, or the source holds no
        // bytes; the source prefix is live and the target prefix is free.
        unsafe {
            ptr::copy_nonoverlapping(self.as_ptr(), target.as_mut_ptr(), self.len);
        }
        target.len = self.len;
        self.len = 0;
    }
}

impl<T> Drop for RawBuffer<T> {
    fn drop(&mut self) {
        // SAFETY: `[0, len)` is live by the type invariant
        unsafe { self.destroy_range(0, self.len) };
        self.len = 0;

        if let Ok(layout) = Self::layout(self.capacity) {
            if layout.size() != 0 {
                // SAFETY: the block was obtained from `alloc` with this layout
                unsafe { alloc::dealloc(self.ptr.as_ptr() as *mut u8, layout) };
            }
        }
    }
}
