//! Arrow integration layer for `cdatakit`.
//!
//! Moves node trees between `cdatakit-core` and the `arrow` crate through the
//! C Data Interface, with no copies of buffer contents:
//! - [`export_record_batch`] / [`export_array`] hand arrow data out as a
//!   [`RawSchema`](cdatakit_core::RawSchema) / [`RawArray`](cdatakit_core::RawArray)
//!   pair owned by the caller.
//! - [`import_record_batch`] / [`import_array`] consume such a pair, whoever
//!   built it.
//! - [`transform_record_batch`] chains the two around a user transform.
//!
//! # Typical Flow
//! ```rust
//! use std::sync::Arc;
//!
//! use arrow::{
//!     array::Int32Array,
//!     datatypes::{DataType, Field, Schema},
//!     record_batch::RecordBatch,
//! };
//! use cdatakit_arrow::{BridgeError, export_record_batch, import_record_batch};
//!
//! # fn main() -> Result<(), BridgeError> {
//! let schema = Arc::new(Schema::new(vec![Field::new("day", DataType::Int32, true)]));
//! let batch = RecordBatch::try_new(schema, vec![Arc::new(Int32Array::from(vec![1, 12, 17]))])?;
//!
//! let (schema, array) = export_record_batch(&batch)?;
//! assert_eq!(schema.child(0)?.name()?, Some("day"));
//! let round_trip = import_record_batch(schema, array)?;
//! assert_eq!(round_trip, batch);
//! # Ok(())
//! # }
//! ```
mod abi;
pub mod error;
pub mod export;
pub mod import;
pub mod transform;

pub use error::BridgeError;
pub use export::{export_array, export_record_batch};
pub use import::{import_array, import_record_batch};
pub use transform::transform_record_batch;
