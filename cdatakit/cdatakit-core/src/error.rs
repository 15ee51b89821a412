//! Error types for node construction and access.

use std::{ffi::NulError, str::Utf8Error};

use bytemuck::PodCastError;

/// Error returned by node builders and accessors.
///
/// Releasing a node never fails, so no variant describes a release error.
#[derive(Debug, thiserror::Error)]
pub enum NodeError {
    /// The allocator could not satisfy a buffer, child or bookkeeping request,
    /// or the requested size overflowed. The node under construction must be
    /// abandoned; dropping it releases whatever was built so far.
    #[error("failed to allocate {bytes} bytes for {what}")]
    AllocationFailure { what: &'static str, bytes: usize },

    /// An accessor was called with an index beyond the current count.
    #[error("{what} index {index} out of range (count {count})")]
    IndexOutOfRange {
        what: &'static str,
        index: usize,
        count: usize,
    },

    /// A length, offset or count does not fit the signed 64-bit fields of
    /// the interchange structs, or a row range overflows `usize`.
    #[error("{what} overflows the interchange length fields")]
    LengthOverflow { what: &'static str },

    /// A format or name string cannot be passed through the ABI as a C string.
    #[error("{field} contains an interior NUL byte")]
    InteriorNul {
        field: &'static str,
        #[source]
        source: NulError,
    },

    /// A C string read from a node is not valid UTF-8.
    #[error("{field} is not valid UTF-8")]
    InvalidUtf8 {
        field: &'static str,
        #[source]
        source: Utf8Error,
    },

    /// A buffer's size or alignment does not fit the requested element type.
    #[error("buffer {index} cannot be viewed as {type_name}: {reason:?}")]
    BufferCast {
        index: usize,
        type_name: &'static str,
        reason: PodCastError,
    },

    /// The buffer slot exists but holds a null pointer.
    #[error("buffer {index} is a null slot")]
    NullBuffer { index: usize },

    /// The node's release callback has already run (or it was moved out).
    #[error("node has already been released")]
    Released,

    /// The child was produced by another library; only its release callback
    /// may be used.
    #[error("child {index} was adopted from another producer and cannot be mutated")]
    ForeignChild { index: usize },

    /// The schema format does not describe the requested element type.
    #[error("expected format '{expected}', found '{actual}'")]
    FormatMismatch {
        expected: &'static str,
        actual: String,
    },

    /// Metadata bytes do not follow the interchange key/value layout.
    #[error("invalid metadata: {reason}")]
    InvalidMetadata { reason: String },

    #[error(transparent)]
    Format(#[from] std::fmt::Error),
}

pub(crate) fn index_out_of_range(what: &'static str, index: usize, count: usize) -> NodeError {
    NodeError::IndexOutOfRange { what, index, count }
}
