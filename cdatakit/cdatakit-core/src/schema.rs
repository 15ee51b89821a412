//! Owned schema nodes, their release callback and the mutable schema view.

use std::{
    ffi::{CString, c_char, c_void},
    ptr,
};

use tracing::{debug, trace};

use crate::{
    array::to_i64,
    error::{NodeError, index_out_of_range},
    ffi::RawSchema,
    flags::Flags,
    memory::{try_box, try_reserve_one},
    metadata::{decode_metadata, encode_metadata},
    registry::{Origin, Registry},
};

/// Bookkeeping behind `private_data` of every schema this crate builds.
struct SchemaPrivate {
    format: CString,
    name: CString,
    metadata: Option<Box<[u8]>>,
    children: Vec<*mut RawSchema>,
    registry: Registry<RawSchema>,
}

impl SchemaPrivate {
    fn release(self, dictionary: *mut RawSchema) {
        for &child in &self.children {
            // SAFETY: every child pointer refers to a node owned by `registry`.
            unsafe { (*child).release() };
        }
        if !dictionary.is_null() {
            // SAFETY: the dictionary is owned by `registry`.
            unsafe { (*dictionary).release() };
        }
        // Children and dictionary are released by now; this frees their storage.
        drop(self.registry);
    }
}

fn c_string(value: &str, field: &'static str) -> Result<CString, NodeError> {
    CString::new(value).map_err(|source| NodeError::InteriorNul { field, source })
}

fn new_raw_schema(format: &str, name: &str) -> Result<RawSchema, NodeError> {
    let private = try_box(
        SchemaPrivate {
            format: c_string(format, "format")?,
            name: c_string(name, "name")?,
            metadata: None,
            children: Vec::new(),
            registry: Registry::new(),
        },
        "schema private data",
    )?;

    Ok(RawSchema {
        format: private.format.as_ptr(),
        name: private.name.as_ptr(),
        metadata: ptr::null(),
        flags: Flags::NULLABLE.bits(),
        n_children: 0,
        children: ptr::null_mut(),
        dictionary: ptr::null_mut(),
        release: Some(release_schema),
        private_data: Box::into_raw(private).cast::<c_void>(),
    })
}

unsafe extern "C" fn release_schema(schema: *mut RawSchema) {
    // SAFETY: consumers call release with the node it was installed on.
    let Some(schema) = (unsafe { schema.as_mut() }) else {
        return;
    };
    if schema.release.is_none() {
        return;
    }

    // SAFETY: `private_data` came from `Box::into_raw` in `new_raw_schema` and
    // is reclaimed once: the release pointer is nulled below.
    let private = *unsafe { Box::from_raw(schema.private_data.cast::<SchemaPrivate>()) };
    trace!(
        children = private.children.len(),
        owned = private.registry.len(),
        "releasing schema node"
    );
    private.release(schema.dictionary);

    schema.format = ptr::null();
    schema.name = ptr::null();
    schema.metadata = ptr::null();
    schema.n_children = 0;
    schema.children = ptr::null_mut();
    schema.dictionary = ptr::null_mut();
    schema.private_data = ptr::null_mut();
    schema.release = None;
}

/// Root schema owned by the builder.
///
/// Dropping the node releases the whole tree; [`SchemaNode::into_raw`] hands
/// the tree and the duty to release it to a consumer instead.
#[derive(Debug)]
pub struct SchemaNode {
    raw: RawSchema,
}

impl SchemaNode {
    /// New nullable schema with no children.
    pub fn new(format: &str, name: &str) -> Result<Self, NodeError> {
        Ok(Self {
            raw: new_raw_schema(format, name)?,
        })
    }

    pub fn view_mut(&mut self) -> SchemaMut<'_> {
        SchemaMut::new(&mut self.raw)
    }

    pub fn as_raw(&self) -> &RawSchema {
        &self.raw
    }

    /// Give up ownership; the returned struct must eventually be released.
    pub fn into_raw(self) -> RawSchema {
        debug!(
            format = ?self.raw.format(),
            children = self.raw.n_children(),
            "handing schema tree to consumer"
        );
        self.raw
    }

    /// Move the tree into consumer-provided storage.
    ///
    /// # Safety
    /// `out` must be valid for writes of a `RawSchema`. Whatever it held
    /// before is overwritten without being released.
    pub unsafe fn export_to(self, out: *mut RawSchema) {
        // SAFETY: guaranteed by the caller.
        unsafe { ptr::write(out, self.into_raw()) }
    }
}

impl From<SchemaNode> for RawSchema {
    fn from(node: SchemaNode) -> Self {
        node.into_raw()
    }
}

/// Mutable view over a schema node built by this crate.
///
/// Views borrow the node; hold the view in a binding to keep the children it
/// returns:
///
/// ```
/// # use cdatakit_core::{NodeError, SchemaNode};
/// # fn main() -> Result<(), NodeError> {
/// let mut date = SchemaNode::new("+s", "Date")?;
/// let mut view = date.view_mut();
/// view.add_child("i", "day")?;
/// view.add_child("i", "month")?;
/// assert_eq!(view.n_children(), 2);
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct SchemaMut<'a> {
    raw: &'a mut RawSchema,
}

impl<'a> SchemaMut<'a> {
    /// `raw` must be live and created by `new_raw_schema`.
    fn new(raw: &'a mut RawSchema) -> Self {
        Self { raw }
    }

    fn private(&self) -> &SchemaPrivate {
        // SAFETY: views only exist over nodes built by `new_raw_schema`.
        unsafe { &*self.raw.private_data.cast::<SchemaPrivate>() }
    }

    fn private_mut(&mut self) -> &mut SchemaPrivate {
        // SAFETY: as above; `&mut self` gives exclusive access.
        unsafe { &mut *self.raw.private_data.cast::<SchemaPrivate>() }
    }

    fn sync_children(&mut self) -> Result<(), NodeError> {
        let private = self.private_mut();
        let (children, count) = (private.children.as_mut_ptr(), private.children.len());
        self.raw.children = children;
        self.raw.n_children = to_i64(count, "child count")?;
        Ok(())
    }

    pub fn as_raw(&self) -> &RawSchema {
        self.raw
    }

    pub fn n_children(&self) -> usize {
        self.private().children.len()
    }

    pub fn set_format(&mut self, format: &str) -> Result<(), NodeError> {
        let format = c_string(format, "format")?;
        self.raw.format = format.as_ptr();
        self.private_mut().format = format;
        Ok(())
    }

    pub fn set_name(&mut self, name: &str) -> Result<(), NodeError> {
        let name = c_string(name, "name")?;
        self.raw.name = name.as_ptr();
        self.private_mut().name = name;
        Ok(())
    }

    pub fn set_flags(&mut self, flags: Flags) {
        self.raw.flags = flags.bits();
    }

    pub fn set_nullable(&mut self, nullable: bool) {
        let mut flags = self.raw.flags();
        flags.set(Flags::NULLABLE, nullable);
        self.set_flags(flags);
    }

    /// Store already-encoded metadata bytes. An empty slice clears the
    /// metadata.
    pub fn set_metadata(&mut self, metadata: &[u8]) -> Result<(), NodeError> {
        if metadata.is_empty() {
            self.store_metadata(None);
            return Ok(());
        }
        decode_metadata(metadata)?;
        self.store_metadata(Some(metadata.into()));
        Ok(())
    }

    /// Encode and store key/value metadata. No pairs clears the metadata.
    pub fn set_metadata_pairs<K: AsRef<str>, V: AsRef<str>>(
        &mut self,
        pairs: &[(K, V)],
    ) -> Result<(), NodeError> {
        if pairs.is_empty() {
            self.store_metadata(None);
            return Ok(());
        }
        let encoded = encode_metadata(pairs)?;
        self.store_metadata(Some(encoded.into_boxed_slice()));
        Ok(())
    }

    fn store_metadata(&mut self, metadata: Option<Box<[u8]>>) {
        self.raw.metadata = metadata
            .as_ref()
            .map_or(ptr::null(), |bytes| bytes.as_ptr().cast::<c_char>());
        self.private_mut().metadata = metadata;
    }

    fn register_child(
        &mut self,
        child: RawSchema,
        origin: Origin,
    ) -> Result<*mut RawSchema, NodeError> {
        let private = self.private_mut();
        try_reserve_one(&mut private.children, "schema child index")?;
        let node = private.registry.insert(child, origin, "child schema")?;
        private.children.push(node.as_ptr());
        self.sync_children()?;
        Ok(node.as_ptr())
    }

    /// Allocate a new nullable child and append it after the existing ones.
    pub fn add_child(&mut self, format: &str, name: &str) -> Result<SchemaMut<'_>, NodeError> {
        let child = self.register_child(new_raw_schema(format, name)?, Origin::Built)?;
        // SAFETY: the child lives in this node's registry, which outlives the
        // borrow of `self`.
        Ok(SchemaMut::new(unsafe { &mut *child }))
    }

    /// Append a separately built node as the next child.
    pub fn append_child(&mut self, child: SchemaNode) -> Result<usize, NodeError> {
        self.register_child(child.raw, Origin::Built)?;
        Ok(self.n_children() - 1)
    }

    /// Take over a node produced elsewhere. The parent's release calls the
    /// child's own release callback, then frees the storage it moved it into.
    pub fn adopt_child(&mut self, child: RawSchema) -> Result<usize, NodeError> {
        if child.is_released() {
            return Err(NodeError::Released);
        }
        self.register_child(child, Origin::Adopted)?;
        Ok(self.n_children() - 1)
    }

    pub fn child_mut(&mut self, index: usize) -> Result<SchemaMut<'_>, NodeError> {
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
        Ok(SchemaMut::new(child))
    }

    /// Set the dictionary value type, releasing any previous dictionary.
    pub fn set_dictionary(&mut self, dictionary: SchemaNode) -> Result<(), NodeError> {
        let previous = self.raw.dictionary;
        let node = self
            .private_mut()
            .registry
            .insert(dictionary.raw, Origin::Built, "dictionary schema")?;
        if !previous.is_null() {
            self.private_mut().registry.remove(previous);
        }
        self.raw.dictionary = node.as_ptr();
        Ok(())
    }
}
