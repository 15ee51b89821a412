//! `#[repr(C)]` node structures of the Arrow C Data Interface.
//!
//! [`RawSchema`] and [`RawArray`] match the interface's `ArrowSchema` and
//! `ArrowArray` field for field, so a node built by this crate can be handed
//! to any consumer of the ABI and a node produced elsewhere can be read here.
//!
//! Both types release themselves on drop through their stored callback.
//! Releasing is idempotent: the callback nulls the release pointer, and a
//! node whose release pointer is null is never released again.

use std::{
    ffi::{CStr, c_char, c_void},
    ptr, slice,
};

use bytemuck::{Pod, PodCastError};

use crate::{
    array::built_buffer_len,
    bitmap,
    error::{NodeError, index_out_of_range},
    flags::Flags,
    metadata,
};

/// Interchange schema node: the logical type of one column.
#[repr(C)]
#[derive(Debug)]
pub struct RawSchema {
    pub(crate) format: *const c_char,
    pub(crate) name: *const c_char,
    pub(crate) metadata: *const c_char,
    pub(crate) flags: i64,
    pub(crate) n_children: i64,
    pub(crate) children: *mut *mut RawSchema,
    pub(crate) dictionary: *mut RawSchema,
    pub(crate) release: Option<unsafe extern "C" fn(*mut RawSchema)>,
    pub(crate) private_data: *mut c_void,
}

/// Interchange array node: the physical storage of one column.
#[repr(C)]
#[derive(Debug)]
pub struct RawArray {
    pub(crate) length: i64,
    pub(crate) null_count: i64,
    pub(crate) offset: i64,
    pub(crate) n_buffers: i64,
    pub(crate) n_children: i64,
    pub(crate) buffers: *mut *const c_void,
    pub(crate) children: *mut *mut RawArray,
    pub(crate) dictionary: *mut RawArray,
    pub(crate) release: Option<unsafe extern "C" fn(*mut RawArray)>,
    pub(crate) private_data: *mut c_void,
}

// SAFETY: a node tree is exclusively owned by whoever holds the root. Moving
// the root moves that ownership; the ABI does not allow shared mutation.
unsafe impl Send for RawSchema {}
// SAFETY: see `RawSchema`.
unsafe impl Send for RawArray {}

fn clamp_len(value: i64) -> usize {
    usize::try_from(value).unwrap_or(0)
}

/// # Safety
/// `ptr` must be null or point to a NUL-terminated string that outlives `'a`.
unsafe fn c_str<'a>(ptr: *const c_char, field: &'static str) -> Result<&'a str, NodeError> {
    if ptr.is_null() {
        return Ok("");
    }
    // SAFETY: guaranteed by the caller.
    unsafe { CStr::from_ptr(ptr) }
        .to_str()
        .map_err(|source| NodeError::InvalidUtf8 { field, source })
}

impl RawSchema {
    /// A released schema with every pointer null, usable as export target
    /// storage.
    pub const fn empty() -> Self {
        Self {
            format: ptr::null(),
            name: ptr::null(),
            metadata: ptr::null(),
            flags: 0,
            n_children: 0,
            children: ptr::null_mut(),
            dictionary: ptr::null_mut(),
            release: None,
            private_data: ptr::null_mut(),
        }
    }

    /// Move the schema out of `src`, leaving a released marker behind.
    ///
    /// # Safety
    /// `src` must point to an initialized schema that conforms to the ABI.
    pub unsafe fn from_raw(src: *mut RawSchema) -> Self {
        // SAFETY: guaranteed by the caller.
        unsafe { ptr::replace(src, Self::empty()) }
    }

    pub fn is_released(&self) -> bool {
        self.release.is_none()
    }

    fn ensure_live(&self) -> Result<(), NodeError> {
        if self.is_released() {
            Err(NodeError::Released)
        } else {
            Ok(())
        }
    }

    pub fn format(&self) -> Result<&str, NodeError> {
        self.ensure_live()?;
        // SAFETY: a live schema's format is a NUL-terminated string owned by
        // the schema.
        unsafe { c_str(self.format, "format") }
    }

    /// The field name, `None` when the producer left it null.
    pub fn name(&self) -> Result<Option<&str>, NodeError> {
        self.ensure_live()?;
        if self.name.is_null() {
            return Ok(None);
        }
        // SAFETY: as for `format`.
        unsafe { c_str(self.name, "name") }.map(Some)
    }

    pub fn flags(&self) -> Flags {
        Flags::from_bits(self.flags)
    }

    pub fn is_nullable(&self) -> bool {
        self.flags().contains(Flags::NULLABLE)
    }

    /// Decoded key/value metadata; empty when the metadata pointer is null.
    pub fn metadata(&self) -> Result<Vec<(String, String)>, NodeError> {
        self.ensure_live()?;
        if self.metadata.is_null() {
            return Ok(Vec::new());
        }
        let ptr = self.metadata.cast::<u8>();
        // SAFETY: a live schema's metadata points to a complete encoding.
        let bytes = unsafe { slice::from_raw_parts(ptr, metadata::encoded_len(ptr)?) };
        metadata::decode_metadata(bytes)
    }

    pub fn n_children(&self) -> usize {
        clamp_len(self.n_children)
    }

    fn child_ptr(&self, index: usize) -> Result<*mut RawSchema, NodeError> {
        self.ensure_live()?;
        let count = self.n_children();
        if index >= count {
            return Err(index_out_of_range("child", index, count));
        }
        // SAFETY: a live schema has `n_children` valid child pointers.
        Ok(unsafe { *self.children.add(index) })
    }

    pub fn child(&self, index: usize) -> Result<&RawSchema, NodeError> {
        let child = self.child_ptr(index)?;
        // SAFETY: child pointers of a live schema are valid for its lifetime.
        Ok(unsafe { &*child })
    }

    /// Move child `index` out of the tree. The slot is left released, so the
    /// parent's release skips it; the returned node stays valid on its own.
    pub fn take_child(&mut self, index: usize) -> Result<RawSchema, NodeError> {
        let child = self.child_ptr(index)?;
        // SAFETY: the child is a valid schema exclusively reachable via `self`.
        Ok(unsafe { RawSchema::from_raw(child) })
    }

    pub fn dictionary(&self) -> Option<&RawSchema> {
        if self.is_released() || self.dictionary.is_null() {
            return None;
        }
        // SAFETY: a non-null dictionary of a live schema is valid.
        Some(unsafe { &*self.dictionary })
    }

    /// Invoke the release callback. A no-op once the schema is released.
    pub fn release(&mut self) {
        if let Some(release) = self.release {
            // SAFETY: the callback was installed by the schema's producer for
            // exactly this node.
            unsafe { release(self) }
        }
    }
}

impl Default for RawSchema {
    fn default() -> Self {
        Self::empty()
    }
}

impl Drop for RawSchema {
    fn drop(&mut self) {
        self.release();
    }
}

impl RawArray {
    /// A released array with every pointer null, usable as export target
    /// storage.
    pub const fn empty() -> Self {
        Self {
            length: 0,
            null_count: 0,
            offset: 0,
            n_buffers: 0,
            n_children: 0,
            buffers: ptr::null_mut(),
            children: ptr::null_mut(),
            dictionary: ptr::null_mut(),
            release: None,
            private_data: ptr::null_mut(),
        }
    }

    /// Move the array out of `src`, leaving a released marker behind.
    ///
    /// # Safety
    /// `src` must point to an initialized array that conforms to the ABI.
    pub unsafe fn from_raw(src: *mut RawArray) -> Self {
        // SAFETY: guaranteed by the caller.
        unsafe { ptr::replace(src, Self::empty()) }
    }

    pub fn is_released(&self) -> bool {
        self.release.is_none()
    }

    fn ensure_live(&self) -> Result<(), NodeError> {
        if self.is_released() {
            Err(NodeError::Released)
        } else {
            Ok(())
        }
    }

    pub fn length(&self) -> usize {
        clamp_len(self.length)
    }

    /// Number of null rows; `-1` means the producer did not compute it.
    pub fn null_count(&self) -> i64 {
        self.null_count
    }

    pub fn offset(&self) -> usize {
        clamp_len(self.offset)
    }

    pub fn n_buffers(&self) -> usize {
        clamp_len(self.n_buffers)
    }

    pub fn n_children(&self) -> usize {
        clamp_len(self.n_children)
    }

    pub fn buffer_ptr(&self, index: usize) -> Result<*const c_void, NodeError> {
        self.ensure_live()?;
        let count = self.n_buffers();
        if index >= count {
            return Err(index_out_of_range("buffer", index, count));
        }
        // SAFETY: a live array has `n_buffers` buffer slots.
        Ok(unsafe { *self.buffers.add(index) })
    }

    /// Rows `[0, offset + length)` as one count.
    pub(crate) fn extent(&self) -> Result<usize, NodeError> {
        self.offset()
            .checked_add(self.length())
            .ok_or(NodeError::LengthOverflow { what: "offset + length" })
    }

    /// View buffer `index` as `len` elements of `T`.
    ///
    /// On nodes built by this crate `len` is checked against the allocation.
    ///
    /// # Safety
    /// On nodes from other producers the buffer must hold at least `len`
    /// initialized elements of `T`, which the caller knows from the companion
    /// schema.
    pub unsafe fn buffer_slice<T: Pod>(&self, index: usize, len: usize) -> Result<&[T], NodeError> {
        let ptr = self.buffer_ptr(index)?;
        if len == 0 {
            return Ok(&[]);
        }
        if ptr.is_null() {
            return Err(NodeError::NullBuffer { index });
        }
        if let Some(bytes) = built_buffer_len(self, index) {
            let available = bytes.checked_div(size_of::<T>()).unwrap_or(usize::MAX);
            if len > available {
                return Err(index_out_of_range("buffer element", len - 1, available));
            }
        }
        if !ptr.cast::<T>().is_aligned() {
            return Err(NodeError::BufferCast {
                index,
                type_name: std::any::type_name::<T>(),
                reason: PodCastError::TargetAlignmentGreaterAndInputNotAligned,
            });
        }
        // SAFETY: aligned, non-null and `len` elements long per the caller.
        Ok(unsafe { slice::from_raw_parts(ptr.cast::<T>(), len) })
    }

    /// Validity of logical `row`. Rows of an array without a validity
    /// bitmap are all valid.
    pub fn is_valid(&self, row: usize) -> Result<bool, NodeError> {
        self.ensure_live()?;
        let (offset, length) = (self.offset(), self.length());
        let has_bitmap = self.n_buffers() > 0 && !self.buffer_ptr(0)?.is_null();
        if !has_bitmap {
            if row >= length {
                return Err(index_out_of_range("row", row, length));
            }
            return Ok(true);
        }
        // SAFETY: a conforming bitmap covers `offset + length` bits; on nodes
        // built here `buffer_slice` checks that against the allocation.
        let bits = unsafe { self.buffer_slice::<u8>(0, bitmap::bytes_for(self.extent()?))? };
        bitmap::validity_bit(bits, offset, length, row)
    }

    fn child_ptr(&self, index: usize) -> Result<*mut RawArray, NodeError> {
        self.ensure_live()?;
        let count = self.n_children();
        if index >= count {
            return Err(index_out_of_range("child", index, count));
        }
        // SAFETY: a live array has `n_children` valid child pointers.
        Ok(unsafe { *self.children.add(index) })
    }

    pub fn child(&self, index: usize) -> Result<&RawArray, NodeError> {
        let child = self.child_ptr(index)?;
        // SAFETY: child pointers of a live array are valid for its lifetime.
        Ok(unsafe { &*child })
    }

    /// Move child `index` out of the tree. The slot is left released, so the
    /// parent's release skips it; the returned node stays valid on its own.
    pub fn take_child(&mut self, index: usize) -> Result<RawArray, NodeError> {
        let child = self.child_ptr(index)?;
        // SAFETY: the child is a valid array exclusively reachable via `self`.
        Ok(unsafe { RawArray::from_raw(child) })
    }

    pub fn dictionary(&self) -> Option<&RawArray> {
        if self.is_released() || self.dictionary.is_null() {
            return None;
        }
        // SAFETY: a non-null dictionary of a live array is valid.
        Some(unsafe { &*self.dictionary })
    }

    /// Invoke the release callback. A no-op once the array is released.
    pub fn release(&mut self) {
        if let Some(release) = self.release {
            // SAFETY: the callback was installed by the array's producer for
            // exactly this node.
            unsafe { release(self) }
        }
    }
}

impl Default for RawArray {
    fn default() -> Self {
        Self::empty()
    }
}

impl Drop for RawArray {
    fn drop(&mut self) {
        self.release();
    }
}
