//! Owned builders for the Arrow C Data Interface.
//!
//! This crate builds schema and array node trees that conform bit-for-bit to
//! the interchange ABI ([`RawSchema`] / [`RawArray`]) and owns every buffer
//! and child they reference. Each tree is released through the single release
//! callback stored on its root, whichever side of the ABI invokes it.
//!
//! Ownership is layered:
//! - [`SchemaNode`] / [`ArrayNode`] own a root and release it on drop.
//! - [`SchemaMut`] / [`ArrayMut`] borrow a node to grow it (`add_child`,
//!   `add_buffer`) and to read and write its typed buffers.
//! - [`PrimitiveArrayMut`] / [`StructArrayMut`] are typed views for the kinds
//!   in [`Kind`].
//!
//! # Typical Flow
//! ```rust
//! use cdatakit_core::{ArrayNode, Kind, NodeError, RawArray, RawSchema, SchemaNode};
//!
//! # fn main() -> Result<(), NodeError> {
//! let schema = SchemaNode::of_kind(Kind::Int32, "day")?;
//! let mut array = ArrayNode::new_primitive::<i32>(5)?;
//! let mut days = array.as_primitive::<i32>()?;
//! for (row, day) in [1, 12, 17, 23, 28].into_iter().enumerate() {
//!     days.set(row, Some(day))?;
//! }
//! assert_eq!(days.null_count(), 0);
//!
//! // Hand the pair to a consumer; it now has to call `release` once.
//! let (mut schema, mut array): (RawSchema, RawArray) = (schema.into_raw(), array.into_raw());
//! array.release();
//! schema.release();
//! assert!(array.is_released() && schema.is_released());
//! # Ok(())
//! # }
//! ```

mod array;
pub mod bitmap;
mod describe;
mod error;
mod ffi;
mod flags;
mod kinds;
mod memory;
mod metadata;
mod registry;
mod schema;

pub use array::{ArrayMut, ArrayNode};
pub use bitmap::ValidityBitmap;
pub use describe::{format_array_tree, format_schema_tree};
pub use error::NodeError;
pub use ffi::{RawArray, RawSchema};
pub use flags::Flags;
pub use kinds::{Kind, NativeType, PrimitiveArrayMut, StructArrayMut, primitive_values};
pub use memory::{BufferOptions, DEFAULT_ALIGNMENT};
pub use metadata::{decode_metadata, encode_metadata};
pub use schema::{SchemaMut, SchemaNode};
