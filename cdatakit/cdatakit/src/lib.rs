//! Builders and owners for Arrow C Data Interface node trees.
//!
//! [`core`] holds the ABI structs, the release protocol and the typed
//! builders. With the default `arrow` feature, [`arrow`] moves trees in and
//! out of the `arrow` crate.

#[cfg(feature = "arrow")]
pub use cdatakit_arrow as arrow;
pub use cdatakit_core as core;

#[cfg(feature = "arrow")]
pub use cdatakit_arrow::BridgeError;
pub use cdatakit_core::{
    ArrayMut, ArrayNode, Kind, NodeError, RawArray, RawSchema, SchemaMut, SchemaNode,
};
