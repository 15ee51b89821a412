//! Typed node kinds composed from the raw growth operations.
//!
//! A primitive array has two buffers: a validity bitmap in slot 0 and a value
//! buffer in slot 1. A struct array has only the validity bitmap and one child
//! per field. Newly built arrays start with every row null.

use std::{fmt, marker::PhantomData, ops::Range};

use crate::{
    ArrayMut, ArrayNode, BufferOptions, NodeError, RawArray, RawSchema, SchemaMut, SchemaNode,
    array::to_i64,
    bitmap,
    error::index_out_of_range,
};

/// Logical column kinds with a typed constructor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Kind {
    Int8,
    Int16,
    Int32,
    Int64,
    UInt8,
    UInt16,
    UInt32,
    UInt64,
    Float32,
    Float64,
    Struct,
}

impl Kind {
    const ALL: [Kind; 11] = [
        Kind::Int8,
        Kind::Int16,
        Kind::Int32,
        Kind::Int64,
        Kind::UInt8,
        Kind::UInt16,
        Kind::UInt32,
        Kind::UInt64,
        Kind::Float32,
        Kind::Float64,
        Kind::Struct,
    ];

    /// Interchange format code.
    pub const fn format(self) -> &'static str {
        match self {
            Kind::Int8 => "c",
            Kind::Int16 => "s",
            Kind::Int32 => "i",
            Kind::Int64 => "l",
            Kind::UInt8 => "C",
            Kind::UInt16 => "S",
            Kind::UInt32 => "I",
            Kind::UInt64 => "L",
            Kind::Float32 => "f",
            Kind::Float64 => "g",
            Kind::Struct => "+s",
        }
    }

    pub fn from_format(format: &str) -> Option<Kind> {
        Self::ALL.into_iter().find(|kind| kind.format() == format)
    }

    /// Element width of the value buffer, `None` for nested kinds.
    pub const fn byte_width(self) -> Option<usize> {
        match self {
            Kind::Int8 | Kind::UInt8 => Some(1),
            Kind::Int16 | Kind::UInt16 => Some(2),
            Kind::Int32 | Kind::UInt32 | Kind::Float32 => Some(4),
            Kind::Int64 | Kind::UInt64 | Kind::Float64 => Some(8),
            Kind::Struct => None,
        }
    }

    pub const fn is_primitive(self) -> bool {
        self.byte_width().is_some()
    }
}

impl fmt::Display for Kind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.format())
    }
}

mod sealed {
    pub trait Sealed {}
}

/// Rust element type of a primitive kind.
pub trait NativeType: bytemuck::Pod + sealed::Sealed {
    const KIND: Kind;
}

macro_rules! native_type {
    ($($ty:ty => $kind:ident),* $(,)?) => {
        $(
            impl sealed::Sealed for $ty {}
            impl NativeType for $ty {
                const KIND: Kind = Kind::$kind;
            }
        )*
    };
}

native_type! {
    i8 => Int8,
    i16 => Int16,
    i32 => Int32,
    i64 => Int64,
    u8 => UInt8,
    u16 => UInt16,
    u32 => UInt32,
    u64 => UInt64,
    f32 => Float32,
    f64 => Float64,
}

fn init_validity(array: &mut ArrayMut<'_>, len: usize) -> Result<(), NodeError> {
    array.add_buffer::<u8>(bitmap::bytes_for(len))?;
    array.set_length(len)?;
    array.set_null_count(to_i64(len, "null count")?);
    Ok(())
}

fn init_primitive<T: NativeType>(array: &mut ArrayMut<'_>, len: usize) -> Result<(), NodeError> {
    init_validity(array, len)?;
    array.add_buffer::<T>(len)?;
    Ok(())
}

impl SchemaNode {
    pub fn of_kind(kind: Kind, name: &str) -> Result<Self, NodeError> {
        Self::new(kind.format(), name)
    }
}

impl SchemaMut<'_> {
    pub fn add_child_of_kind(
        &mut self,
        kind: Kind,
        name: &str,
    ) -> Result<SchemaMut<'_>, NodeError> {
        self.add_child(kind.format(), name)
    }
}

impl ArrayNode {
    /// Primitive array of `len` rows, all null, values zeroed.
    pub fn new_primitive<T: NativeType>(len: usize) -> Result<Self, NodeError> {
        Self::new_primitive_with::<T>(len, BufferOptions::default())
    }

    pub fn new_primitive_with<T: NativeType>(
        len: usize,
        options: BufferOptions,
    ) -> Result<Self, NodeError> {
        let mut node = Self::with_options(options)?;
        init_primitive::<T>(&mut node.view_mut(), len)?;
        Ok(node)
    }

    /// Struct array of `len` rows, all null, with no children yet.
    pub fn new_struct(len: usize) -> Result<Self, NodeError> {
        Self::new_struct_with(len, BufferOptions::default())
    }

    pub fn new_struct_with(len: usize, options: BufferOptions) -> Result<Self, NodeError> {
        let mut node = Self::with_options(options)?;
        init_validity(&mut node.view_mut(), len)?;
        Ok(node)
    }

    pub fn as_primitive<T: NativeType>(&mut self) -> Result<PrimitiveArrayMut<'_, T>, NodeError> {
        self.view_mut().into_primitive()
    }

    pub fn as_struct(&mut self) -> Result<StructArrayMut<'_>, NodeError> {
        self.view_mut().into_struct()
    }
}

impl<'a> ArrayMut<'a> {
    pub fn add_primitive_child<T: NativeType>(
        &mut self,
        len: usize,
    ) -> Result<PrimitiveArrayMut<'_, T>, NodeError> {
        let mut child = self.add_child()?;
        init_primitive::<T>(&mut child, len)?;
        child.into_primitive()
    }

    pub fn add_struct_child(&mut self, len: usize) -> Result<StructArrayMut<'_>, NodeError> {
        let mut child = self.add_child()?;
        init_validity(&mut child, len)?;
        child.into_struct()
    }

    /// Reinterpret this node as a primitive array of `T`. Buffer 1 must hold
    /// at least `offset + length` values.
    pub fn into_primitive<T: NativeType>(self) -> Result<PrimitiveArrayMut<'a, T>, NodeError> {
        let needed = self
            .offset()
            .checked_add(self.length())
            .ok_or(NodeError::LengthOverflow { what: "offset + length" })?;
        let available = self.buffer::<T>(1)?.len();
        if needed > available {
            return Err(index_out_of_range("value", needed - 1, available));
        }
        Ok(PrimitiveArrayMut {
            array: self,
            _type: PhantomData,
        })
    }

    pub fn into_struct(self) -> Result<StructArrayMut<'a>, NodeError> {
        if self.n_buffers() == 0 {
            return Err(index_out_of_range("buffer", 0, 0));
        }
        Ok(StructArrayMut { array: self })
    }
}

/// Typed view over a primitive array: validity in slot 0, `T` values in
/// slot 1. Rows are logical, i.e. relative to the array offset.
#[derive(Debug)]
pub struct PrimitiveArrayMut<'a, T> {
    array: ArrayMut<'a>,
    _type: PhantomData<T>,
}

impl<'a, T: NativeType> PrimitiveArrayMut<'a, T> {
    pub fn len(&self) -> usize {
        self.array.length()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn null_count(&self) -> i64 {
        self.array.null_count()
    }

    fn range(&self) -> Result<Range<usize>, NodeError> {
        let offset = self.array.offset();
        let end = offset
            .checked_add(self.len())
            .ok_or(NodeError::LengthOverflow { what: "offset + length" })?;
        Ok(offset..end)
    }

    fn check_row(&self, row: usize) -> Result<(), NodeError> {
        let len = self.len();
        if row >= len {
            return Err(index_out_of_range("row", row, len));
        }
        Ok(())
    }

    /// Values of rows `[0, len)`, including those stored under null rows.
    /// Fails if the value buffer no longer covers the rows, e.g. after the
    /// length was raised through [`as_array_mut`](Self::as_array_mut).
    pub fn values(&self) -> Result<&[T], NodeError> {
        let range = self.range()?;
        let values = self.array.buffer::<T>(1)?;
        let available = values.len();
        values
            .get(range.clone())
            .ok_or_else(|| index_out_of_range("value", range.end - 1, available))
    }

    /// Mutable values; writing here does not touch validity.
    pub fn values_mut(&mut self) -> Result<&mut [T], NodeError> {
        let range = self.range()?;
        let end = range.end;
        let values = self.array.buffer_mut::<T>(1)?;
        let available = values.len();
        values
            .get_mut(range)
            .ok_or_else(|| index_out_of_range("value", end - 1, available))
    }

    pub fn get(&self, row: usize) -> Result<Option<T>, NodeError> {
        self.check_row(row)?;
        let value = self
            .values()?
            .get(row)
            .copied()
            .ok_or_else(|| index_out_of_range("row", row, self.len()))?;
        Ok(self.array.is_valid(row)?.then_some(value))
    }

    /// Store `value` at `row`; `None` marks the row null and keeps the stored
    /// value.
    pub fn set(&mut self, row: usize, value: Option<T>) -> Result<(), NodeError> {
        self.check_row(row)?;
        if let Some(value) = value {
            let len = self.len();
            let slot = self
                .values_mut()?
                .get_mut(row)
                .ok_or_else(|| index_out_of_range("row", row, len))?;
            *slot = value;
        }
        self.array.set_valid(row, value.is_some())
    }

    pub fn set_valid(&mut self, row: usize, valid: bool) -> Result<(), NodeError> {
        self.array.set_valid(row, valid)
    }

    pub fn is_valid(&self, row: usize) -> Result<bool, NodeError> {
        self.array.is_valid(row)
    }

    pub fn as_array_mut(&mut self) -> &mut ArrayMut<'a> {
        &mut self.array
    }

    pub fn into_inner(self) -> ArrayMut<'a> {
        self.array
    }
}

/// Typed view over a struct array: validity in slot 0, one child per field.
#[derive(Debug)]
pub struct StructArrayMut<'a> {
    array: ArrayMut<'a>,
}

impl<'a> StructArrayMut<'a> {
    pub fn len(&self) -> usize {
        self.array.length()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn null_count(&self) -> i64 {
        self.array.null_count()
    }

    pub fn n_children(&self) -> usize {
        self.array.n_children()
    }

    pub fn set_valid(&mut self, row: usize, valid: bool) -> Result<(), NodeError> {
        self.array.set_valid(row, valid)
    }

    pub fn is_valid(&self, row: usize) -> Result<bool, NodeError> {
        self.array.is_valid(row)
    }

    /// Append a primitive field with as many rows as the struct.
    pub fn add_primitive_child<T: NativeType>(
        &mut self,
    ) -> Result<PrimitiveArrayMut<'_, T>, NodeError> {
        let len = self.len();
        self.array.add_primitive_child(len)
    }

    /// Append a nested struct field with as many rows as the struct.
    pub fn add_struct_child(&mut self) -> Result<StructArrayMut<'_>, NodeError> {
        let len = self.len();
        self.array.add_struct_child(len)
    }

    pub fn child_mut(&mut self, index: usize) -> Result<ArrayMut<'_>, NodeError> {
        self.array.child_mut(index)
    }

    pub fn as_array_mut(&mut self) -> &mut ArrayMut<'a> {
        &mut self.array
    }

    pub fn into_inner(self) -> ArrayMut<'a> {
        self.array
    }
}

/// Borrow the logical values of a primitive column described by `schema`.
///
/// Works on any conforming pair, including nodes imported from another
/// producer. On nodes built by this crate, an `offset + length` beyond the
/// value buffer fails with [`NodeError::IndexOutOfRange`].
pub fn primitive_values<'a, T: NativeType>(
    schema: &RawSchema,
    array: &'a RawArray,
) -> Result<&'a [T], NodeError> {
    let format = schema.format()?;
    if format != T::KIND.format() {
        return Err(NodeError::FormatMismatch {
            expected: T::KIND.format(),
            actual: format.to_owned(),
        });
    }
    let offset = array.offset();
    // SAFETY: the schema says buffer 1 holds `T` values covering
    // `offset + length` rows; on nodes built here `buffer_slice` checks that
    // against the allocation.
    let values = unsafe { array.buffer_slice::<T>(1, array.extent()?)? };
    values
        .get(offset..)
        .ok_or_else(|| index_out_of_range("value", offset, values.len()))
}
