//! Owned array nodes, their release callback and the mutable array view.

use std::{ffi::c_void, ptr};

use bytemuck::Pod;
use tracing::{debug, trace};

use crate::{
    bitmap::{self, ValidityBitmap},
    error::{NodeError, index_out_of_range},
    ffi::RawArray,
    memory::{BufferOptions, OwnedBuffer, try_box, try_reserve_one},
    registry::{Origin, Registry},
};

struct ArrayPrivate {
    /// `None` marks a slot exported as a null pointer.
    buffers: Vec<Option<OwnedBuffer>>,
    buffer_ptrs: Vec<*const c_void>,
    children: Vec<*mut RawArray>,
    registry: Registry<RawArray>,
    options: BufferOptions,
}

impl ArrayPrivate {
    fn release(self, dictionary: *mut RawArray) {
        let Self {
            buffers,
            buffer_ptrs,
            children,
            registry,
            options: _,
        } = self;

        // Vec drops its elements front to back, i.e. in slot order.
        drop(buffers);
        drop(buffer_ptrs);
        for &child in &children {
            // SAFETY: every child pointer refers to a node owned by `registry`.
            unsafe { (*child).release() };
        }
        if !dictionary.is_null() {
            // SAFETY: the dictionary is owned by `registry`.
            unsafe { (*dictionary).release() };
        }
        drop(children);
        drop(registry);
    }
}

pub(crate) fn to_i64(value: usize, what: &'static str) -> Result<i64, NodeError> {
    i64::try_from(value).map_err(|_| NodeError::LengthOverflow { what })
}

/// Byte length of buffer `index` when `raw` was built by this crate and the
/// slot holds an allocation. Foreign nodes yield `None`: their producer
/// vouches for their extents.
pub(crate) fn built_buffer_len(raw: &RawArray, index: usize) -> Option<usize> {
    let release = raw.release?;
    if !ptr::fn_addr_eq(release, release_array as unsafe extern "C" fn(*mut RawArray)) {
        return None;
    }
    // SAFETY: only `new_raw_array` installs `release_array`, next to a live
    // `ArrayPrivate`.
    let private = unsafe { &*raw.private_data.cast::<ArrayPrivate>() };
    private.buffers.get(index)?.as_ref().map(OwnedBuffer::len)
}

fn new_raw_array(options: BufferOptions) -> Result<RawArray, NodeError> {
    let private = try_box(
        ArrayPrivate {
            buffers: Vec::new(),
            buffer_ptrs: Vec::new(),
            children: Vec::new(),
            registry: Registry::new(),
            options,
        },
        "array private data",
    )?;

    Ok(RawArray {
        length: 0,
        null_count: 0,
        offset: 0,
        n_buffers: 0,
        n_children: 0,
        buffers: ptr::null_mut(),
        children: ptr::null_mut(),
        dictionary: ptr::null_mut(),
        release: Some(release_array),
        private_data: Box::into_raw(private).cast::<c_void>(),
    })
}

unsafe extern "C" fn release_array(array: *mut RawArray) {
    // SAFETY: consumers call release with the node it was installed on.
    let Some(array) = (unsafe { array.as_mut() }) else {
        return;
    };
    if array.release.is_none() {
        return;
    }

    // SAFETY: `private_data` came from `Box::into_raw` in `new_raw_array` and
    // is reclaimed once: the release pointer is nulled below.
    let private = *unsafe { Box::from_raw(array.private_data.cast::<ArrayPrivate>()) };
    trace!(
        buffers = private.buffers.len(),
        children = private.children.len(),
        owned = private.registry.len(),
        "releasing array node"
    );
    private.release(array.dictionary);

    array.n_buffers = 0;
    array.n_children = 0;
    array.buffers = ptr::null_mut();
    array.children = ptr::null_mut();
    array.dictionary = ptr::null_mut();
    array.private_data = ptr::null_mut();
    array.release = None;
}

/// Root array owned by the builder.
///
/// A new node has no buffers, no children and zero length. Dropping it
/// releases the whole tree.
#[derive(Debug)]
pub struct ArrayNode {
    raw: RawArray,
}

impl ArrayNode {
    pub fn new() -> Result<Self, NodeError> {
        Self::with_options(BufferOptions::default())
    }

    /// Empty node whose buffers, and those of every child it allocates, use
    /// `options`.
    pub fn with_options(options: BufferOptions) -> Result<Self, NodeError> {
        Ok(Self {
            raw: new_raw_array(options)?,
        })
    }

    pub fn view_mut(&mut self) -> ArrayMut<'_> {
        ArrayMut::new(&mut self.raw)
    }

    pub fn as_raw(&self) -> &RawArray {
        &self.raw
    }

    /// Give up ownership; the returned struct must eventually be released.
    pub fn into_raw(self) -> RawArray {
        debug!(
            length = self.raw.length(),
            buffers = self.raw.n_buffers(),
            children = self.raw.n_children(),
            "handing array tree to consumer"
        );
        self.raw
    }

    /// Move the tree into consumer-provided storage.
    ///
    /// # Safety
    /// `out` must be valid for writes of a `RawArray`. Whatever it held
    /// before is overwritten without being released.
    pub unsafe fn export_to(self, out: *mut RawArray) {
        // SAFETY: guaranteed by the caller.
        unsafe { ptr::write(out, self.into_raw()) }
    }
}

impl From<ArrayNode> for RawArray {
    fn from(node: ArrayNode) -> Self {
        node.into_raw()
    }
}

/// Mutable view over an array node built by this crate.
///
/// Length fields are plain setters; keeping them consistent with the buffers
/// and with the companion schema is up to the caller. Accessors check rows
/// against the allocated buffers and fail with
/// [`NodeError::IndexOutOfRange`] when the fields outgrow them.
#[derive(Debug)]
pub struct ArrayMut<'a> {
    raw: &'a mut RawArray,
}

impl<'a> ArrayMut<'a> {
    /// `raw` must be live and created by `new_raw_array`.
    fn new(raw: &'a mut RawArray) -> Self {
        Self { raw }
    }

    fn private(&self) -> &ArrayPrivate {
        // SAFETY: views only exist over nodes built by `new_raw_array`.
        unsafe { &*self.raw.private_data.cast::<ArrayPrivate>() }
    }

    fn private_mut(&mut self) -> &mut ArrayPrivate {
        // SAFETY: as above; `&mut self` gives exclusive access.
        unsafe { &mut *self.raw.private_data.cast::<ArrayPrivate>() }
    }

    fn sync_buffers(&mut self) -> Result<(), NodeError> {
        let private = self.private_mut();
        let (buffers, count) = (private.buffer_ptrs.as_mut_ptr(), private.buffer_ptrs.len());
        self.raw.buffers = buffers;
        self.raw.n_buffers = to_i64(count, "buffer count")?;
        Ok(())
    }

    fn sync_children(&mut self) -> Result<(), NodeError> {
        let private = self.private_mut();
        let (children, count) = (private.children.as_mut_ptr(), private.children.len());
        self.raw.children = children;
        self.raw.n_children = to_i64(count, "child count")?;
        Ok(())
    }

    pub fn as_raw(&self) -> &RawArray {
        self.raw
    }

    pub fn options(&self) -> BufferOptions {
        self.private().options
    }

    pub fn length(&self) -> usize {
        self.raw.length()
    }

    pub fn set_length(&mut self, length: usize) -> Result<(), NodeError> {
        self.raw.length = to_i64(length, "length")?;
        Ok(())
    }

    pub fn offset(&self) -> usize {
        self.raw.offset()
    }

    pub fn set_offset(&mut self, offset: usize) -> Result<(), NodeError> {
        self.raw.offset = to_i64(offset, "offset")?;
        Ok(())
    }

    pub fn null_count(&self) -> i64 {
        self.raw.null_count
    }

    /// Set the null count directly; `-1` tells consumers it is unknown.
    pub fn set_null_count(&mut self, null_count: i64) {
        self.raw.null_count = null_count;
    }

    pub fn n_buffers(&self) -> usize {
        self.private().buffer_ptrs.len()
    }

    pub fn n_children(&self) -> usize {
        self.private().children.len()
    }

    fn push_buffer(&mut self, buffer: Option<OwnedBuffer>) -> Result<usize, NodeError> {
        let private = self.private_mut();
        try_reserve_one(&mut private.buffers, "buffer list")?;
        try_reserve_one(&mut private.buffer_ptrs, "buffer list")?;
        let ptr = buffer
            .as_ref()
            .map_or(ptr::null(), |buffer| buffer.as_ptr().cast::<c_void>());
        private.buffers.push(buffer);
        private.buffer_ptrs.push(ptr);
        self.sync_buffers()?;
        Ok(self.n_buffers() - 1)
    }

    /// Allocate a zero-filled buffer of `count` elements in the next slot and
    /// return it for writing.
    pub fn add_buffer<T: Pod>(&mut self, count: usize) -> Result<&mut [T], NodeError> {
        let bytes = count
            .checked_mul(size_of::<T>())
            .ok_or(NodeError::AllocationFailure {
                what: "buffer",
                bytes: usize::MAX,
            })?;
        let options = self.options();
        let options = options.with_alignment(options.alignment().max(align_of::<T>()));
        let index = self.push_buffer(Some(OwnedBuffer::allocate(bytes, &options)?))?;
        self.buffer_mut(index)
    }

    /// Append a slot holding a null pointer, e.g. an omitted validity bitmap.
    pub fn add_null_buffer(&mut self) -> Result<usize, NodeError> {
        self.push_buffer(None)
    }

    fn owned_buffer(&self, index: usize) -> Result<&OwnedBuffer, NodeError> {
        let buffers = &self.private().buffers;
        buffers
            .get(index)
            .ok_or_else(|| index_out_of_range("buffer", index, buffers.len()))?
            .as_ref()
            .ok_or(NodeError::NullBuffer { index })
    }

    /// Typed view of buffer `index`. Fails if the buffer length is not a
    /// multiple of `size_of::<T>()`.
    pub fn buffer<T: Pod>(&self, index: usize) -> Result<&[T], NodeError> {
        bytemuck::try_cast_slice(self.owned_buffer(index)?.as_bytes()).map_err(|reason| {
            NodeError::BufferCast {
                index,
                type_name: std::any::type_name::<T>(),
                reason,
            }
        })
    }

    pub fn buffer_mut<T: Pod>(&mut self, index: usize) -> Result<&mut [T], NodeError> {
        self.owned_buffer(index)?;
        let buffer = self.private_mut().buffers[index]
            .as_mut()
            .ok_or(NodeError::NullBuffer { index })?;
        bytemuck::try_cast_slice_mut(buffer.as_bytes_mut()).map_err(|reason| {
            NodeError::BufferCast {
                index,
                type_name: std::any::type_name::<T>(),
                reason,
            }
        })
    }

    fn register_child(
        &mut self,
        child: RawArray,
        origin: Origin,
    ) -> Result<*mut RawArray, NodeError> {
        let private = self.private_mut();
        try_reserve_one(&mut private.children, "array child index")?;
        let node = private.registry.insert(child, origin, "child array")?;
        private.children.push(node.as_ptr());
        self.sync_children()?;
        Ok(node.as_ptr())
    }

    /// Allocate an empty child with this node's buffer options and append it
    /// after the existing ones.
    pub fn add_child(&mut self) -> Result<ArrayMut<'_>, NodeError> {
        let child = new_raw_array(self.options())?;
        let child = self.register_child(child, Origin::Built)?;
        // SAFETY: the child lives in this node's registry, which outlives the
        // borrow of `self`.
        Ok(ArrayMut::new(unsafe { &mut *child }))
    }

    /// Append a separately built node as the next child.
    pub fn append_child(&mut self, child: ArrayNode) -> Result<usize, NodeError> {
        self.register_child(child.raw, Origin::Built)?;
        Ok(self.n_children() - 1)
    }

    /// Take over a node produced elsewhere. The parent's release calls the
    /// child's own release callback, then frees the storage it moved it into.
    pub fn adopt_child(&mut self, child: RawArray) -> Result<usize, NodeError> {
        if child.is_released() {
            return Err(NodeError::Released);
        }
        self.register_child(child, Origin::Adopted)?;
        Ok(self.n_children() - 1)
    }

    pub fn child_mut(&mut self, index: usize) -> Result<ArrayMut<'_>, NodeError> {
        let private = self.private();
        let count = private.children.len();
        let child = *private
            .children
            .get(index)
            .ok_or_else(|| index_out_of_range("child", index, count))?;
        if private.registry.origin_of(child) != Some(Origin::Built) {
            return Err(NodeError::ForeignChild { index });
        }
        // SAFETY: the child is owned by this node's registry.
        let child = unsafe { &mut *child };
        if child.is_released() {
            return Err(NodeError::Released);
        }
        Ok(ArrayMut::new(child))
    }

    /// Set the dictionary values, releasing any previous dictionary.
    pub fn set_dictionary(&mut self, dictionary: ArrayNode) -> Result<(), NodeError> {
        let previous = self.raw.dictionary;
        let node = self
            .private_mut()
            .registry
            .insert(dictionary.raw, Origin::Built, "dictionary array")?;
        if !previous.is_null() {
            self.private_mut().registry.remove(previous);
        }
        self.raw.dictionary = node.as_ptr();
        Ok(())
    }

    /// Bitmap view over buffer 0 for rows `[0, length)`.
    pub fn validity_mut(&mut self) -> Result<ValidityBitmap<'_>, NodeError> {
        let (offset, length) = (self.offset(), self.length());
        let bits = self.buffer_mut::<u8>(0)?;
        ValidityBitmap::new(bits, offset, length)
    }

    fn has_bitmap(&self) -> bool {
        self.private().buffers.first().is_some_and(Option::is_some)
    }

    /// Validity of logical `row`, read from the bitmap actually allocated in
    /// slot 0. Rows of an array without a bitmap are all valid.
    pub fn is_valid(&self, row: usize) -> Result<bool, NodeError> {
        let (offset, length) = (self.offset(), self.length());
        if !self.has_bitmap() {
            if row >= length {
                return Err(index_out_of_range("row", row, length));
            }
            return Ok(true);
        }
        bitmap::validity_bit(self.buffer::<u8>(0)?, offset, length, row)
    }

    /// Mark `row` valid or null, adjusting `null_count` when the bit flips.
    /// An unknown (negative) null count is left untouched.
    pub fn set_valid(&mut self, row: usize, valid: bool) -> Result<(), NodeError> {
        let previous = self.validity_mut()?.set_valid(row, valid)?;
        let null_count = self.raw.null_count;
        if previous != valid && null_count >= 0 {
            self.raw.null_count = if valid {
                (null_count - 1).max(0)
            } else {
                null_count.saturating_add(1)
            };
        }
        Ok(())
    }

    /// Count the null rows of the bitmap and store the result. Without a
    /// bitmap every row is valid.
    pub fn recompute_null_count(&mut self) -> Result<i64, NodeError> {
        let null_count = if self.has_bitmap() {
            to_i64(self.validity_mut()?.null_count(), "null count")?
        } else {
            0
        };
        self.raw.null_count = null_count;
        Ok(null_count)
    }
}
