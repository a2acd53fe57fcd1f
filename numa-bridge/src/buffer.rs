//!
//! Unmanaged memory regions
//!
//! A [NumaBuffer] is memory handed out by a backend's `alloc*` operations. It
//! is never reclaimed on drop: it has to be given back through exactly one
//! `free` call. `free` takes the buffer by value, so safe code can't touch a
//! region after releasing it. A buffer that is dropped without `free` leaks.
use std::alloc::{self, Layout};
use std::fmt::{self, Debug, Formatter};
use std::ptr::NonNull;
use std::slice;

/// Alignment of the regions handed out by the heap, one cache line.
pub const HEAP_ALIGN: usize = 64;

/// Where the memory of a buffer comes from, so it is released the same way.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Origin {
    /// Allocated through libnuma, released with `numa_free`.
    Numa,
    /// Allocated from the process heap, released with the global allocator.
    Heap,
    /// Zero-sized, has no backing memory.
    Empty,
}

///
/// Region of unmanaged memory with a fixed capacity.
pub struct NumaBuffer {
    ptr: NonNull<u8>,
    capacity: usize,
    origin: Origin,
}

// SAFETY: the buffer exclusively owns its region.
unsafe impl Send for NumaBuffer {}
unsafe impl Sync for NumaBuffer {}

impl NumaBuffer {
    /// A buffer of zero bytes.
    pub fn empty() -> Self {
        NumaBuffer {
            ptr: NonNull::dangling(),
            capacity: 0,
            origin: Origin::Empty,
        }
    }

    /// # Safety
    ///
    /// `ptr` must point to `capacity` zero-initialized bytes obtained from the
    /// allocator that `origin` names, and nothing else may own that region.
    pub(crate) unsafe fn from_raw(ptr: NonNull<u8>, capacity: usize, origin: Origin) -> Self {
        NumaBuffer {
            ptr,
            capacity,
            origin,
        }
    }

    /// Start address of the region.
    #[inline]
    pub fn as_ptr(&self) -> *const u8 {
        self.ptr.as_ptr()
    }

    /// Mutable start address of the region.
    #[inline]
    pub fn as_mut_ptr(&mut self) -> *mut u8 {
        self.ptr.as_ptr()
    }

    /// Size of the region in bytes.
    #[inline]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Returns true for a zero-sized buffer.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.capacity == 0
    }

    /// Allocator the region belongs to.
    #[inline]
    pub fn origin(&self) -> Origin {
        self.origin
    }

    /// The region as bytes.
    pub fn as_slice(&self) -> &[u8] {
        unsafe { slice::from_raw_parts(self.ptr.as_ptr(), self.capacity) }
    }

    /// The region as mutable bytes.
    pub fn as_mut_slice(&mut self) -> &mut [u8] {
        unsafe { slice::from_raw_parts_mut(self.ptr.as_ptr(), self.capacity) }
    }

    pub(crate) fn into_raw(self) -> (NonNull<u8>, usize, Origin) {
        (self.ptr, self.capacity, self.origin)
    }
}

impl Debug for NumaBuffer {
    fn fmt(&self, fmt: &mut Formatter) -> fmt::Result {
        fmt.debug_struct("NumaBuffer")
            .field("address", &self.ptr)
            .field("capacity", &self.capacity)
            .field("origin", &self.origin)
            .finish()
    }
}

fn heap_layout(capacity: usize) -> Option<Layout> {
    Layout::from_size_align(capacity, HEAP_ALIGN).ok()
}

/// Zeroed heap region of `capacity` bytes, `None` when the heap refuses it.
/// A zero capacity gets a dangling pointer.
pub(crate) fn heap_alloc(capacity: usize) -> Option<NonNull<u8>> {
    if capacity == 0 {
        return Some(NonNull::dangling());
    }
    let layout = heap_layout(capacity)?;
    NonNull::new(unsafe { alloc::alloc_zeroed(layout) })
}

/// # Safety
///
/// `ptr` must come from [heap_alloc] with the same `capacity` and must not be
/// used afterwards.
pub(crate) unsafe fn heap_free(ptr: NonNull<u8>, capacity: usize) {
    if capacity == 0 {
        return;
    }
    if let Some(layout) = heap_layout(capacity) {
        alloc::dealloc(ptr.as_ptr(), layout);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_buffer() {
        let buf = NumaBuffer::empty();
        assert!(buf.is_empty());
        assert_eq!(buf.as_slice(), &[] as &[u8]);
        assert_eq!(buf.origin(), Origin::Empty);
    }

    #[test]
    fn heap_round_trip() {
        let ptr = heap_alloc(4096).unwrap();
        assert_eq!(ptr.as_ptr() as usize % HEAP_ALIGN, 0);

        let mut buf = unsafe { NumaBuffer::from_raw(ptr, 4096, Origin::Heap) };
        assert!(buf.as_slice().iter().all(|b| *b == 0));
        buf.as_mut_slice()[4095] = 0xAB;
        assert_eq!(buf.as_slice()[4095], 0xAB);

        let (ptr, capacity, origin) = buf.into_raw();
        assert_eq!(origin, Origin::Heap);
        unsafe { heap_free(ptr, capacity) };
    }

    #[test]
    fn heap_refuses_absurd_capacity() {
        assert!(heap_alloc(usize::MAX).is_none());
    }
}
