//! Aligned buffer allocation and fallible boxing.

use std::{
    alloc::{self, Layout},
    ptr::NonNull,
    slice,
};

use tracing::warn;

use crate::error::NodeError;

/// Alignment recommended by the interchange format for every buffer.
pub const DEFAULT_ALIGNMENT: usize = 64;

/// Allocation settings for the buffers of an array tree.
///
/// Children allocated through [`ArrayMut::add_child`](crate::ArrayMut::add_child)
/// inherit the options of their parent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BufferOptions {
    alignment: usize,
    padding: usize,
}

impl BufferOptions {
    pub fn new() -> Self {
        Self {
            alignment: DEFAULT_ALIGNMENT,
            padding: 1,
        }
    }

    /// Set the buffer alignment in bytes (default: 64).
    ///
    /// The value must be a power of two; any other value makes every
    /// allocation fail with [`NodeError::AllocationFailure`].
    pub fn with_alignment(mut self, alignment: usize) -> Self {
        self.alignment = alignment;
        self
    }

    /// Round every allocation up to a multiple of `padding` bytes
    /// (default: 1, no padding).
    pub fn with_padding(mut self, padding: usize) -> Self {
        self.padding = padding.max(1);
        self
    }

    pub fn alignment(&self) -> usize {
        self.alignment
    }

    pub fn padding(&self) -> usize {
        self.padding
    }
}

impl Default for BufferOptions {
    fn default() -> Self {
        Self::new()
    }
}

/// Zero-filled, aligned heap region owned by exactly one array node.
pub(crate) struct OwnedBuffer {
    ptr: NonNull<u8>,
    len: usize,
    layout: Layout,
}

// SAFETY: the buffer is uniquely owned; moving it between threads moves the
// only handle to the allocation.
unsafe impl Send for OwnedBuffer {}

impl OwnedBuffer {
    pub(crate) fn allocate(len: usize, options: &BufferOptions) -> Result<Self, NodeError> {
        let failure = || NodeError::AllocationFailure {
            what: "buffer",
            bytes: len,
        };
        let capacity = len
            .max(1)
            .checked_next_multiple_of(options.padding)
            .ok_or_else(failure)?;
        let layout = Layout::from_size_align(capacity, options.alignment).map_err(|_| failure())?;

        // SAFETY: `layout` has a non-zero size.
        let ptr = unsafe { alloc::alloc_zeroed(layout) };
        let Some(ptr) = NonNull::new(ptr) else {
            warn!(
                bytes = capacity,
                align = options.alignment,
                "buffer allocation failed"
            );
            return Err(failure());
        };

        Ok(Self { ptr, len, layout })
    }

    pub(crate) fn as_ptr(&self) -> *const u8 {
        self.ptr.as_ptr()
    }

    pub(crate) fn len(&self) -> usize {
        self.len
    }

    pub(crate) fn as_bytes(&self) -> &[u8] {
        // SAFETY: `ptr` is valid and initialized for `len <= layout.size()` bytes.
        unsafe { slice::from_raw_parts(self.ptr.as_ptr(), self.len) }
    }

    pub(crate) fn as_bytes_mut(&mut self) -> &mut [u8] {
        // SAFETY: as above, and `&mut self` guarantees exclusive access.
        unsafe { slice::from_raw_parts_mut(self.ptr.as_ptr(), self.len) }
    }
}

impl Drop for OwnedBuffer {
    fn drop(&mut self) {
        // SAFETY: `ptr` was allocated in `allocate` with exactly `layout`.
        unsafe { alloc::dealloc(self.ptr.as_ptr(), self.layout) }
    }
}

/// `Box::new` that reports allocation failure instead of aborting.
pub(crate) fn try_box<T>(value: T, what: &'static str) -> Result<Box<T>, NodeError> {
    let layout = Layout::new::<T>();
    if layout.size() == 0 {
        return Ok(Box::new(value));
    }

    // SAFETY: `layout` has a non-zero size.
    let ptr = unsafe { alloc::alloc(layout) }.cast::<T>();
    let Some(ptr) = NonNull::new(ptr) else {
        warn!(bytes = layout.size(), what, "node allocation failed");
        return Err(NodeError::AllocationFailure {
            what,
            bytes: layout.size(),
        });
    };

    // SAFETY: `ptr` was just allocated with `T`'s layout through the global
    // allocator, which is what `Box` expects to free.
    unsafe {
        ptr.as_ptr().write(value);
        Ok(Box::from_raw(ptr.as_ptr()))
    }
}

/// Reserve room for one more element, mapping failure to [`NodeError`].
pub(crate) fn try_reserve_one<T>(vec: &mut Vec<T>, what: &'static str) -> Result<(), NodeError> {
    vec.try_reserve(1).map_err(|_| NodeError::AllocationFailure {
        what,
        bytes: size_of::<T>(),
    })
}
