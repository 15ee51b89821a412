//! Moves between the core node structs and arrow's FFI structs.
//!
//! Both sides implement the same `#[repr(C)]` ABI, so ownership moves by
//! taking the value out of one and reading it as the other.

use std::ptr;

use arrow::ffi::{FFI_ArrowArray, FFI_ArrowSchema};
use cdatakit_core::{RawArray, RawSchema};

const _: () = {
    assert!(size_of::<RawSchema>() == size_of::<FFI_ArrowSchema>());
    assert!(align_of::<RawSchema>() == align_of::<FFI_ArrowSchema>());
    assert!(size_of::<RawArray>() == size_of::<FFI_ArrowArray>());
    assert!(align_of::<RawArray>() == align_of::<FFI_ArrowArray>());
};

pub(crate) fn schema_to_ffi(mut schema: RawSchema) -> FFI_ArrowSchema {
    // SAFETY: identical layouts; `schema` is left as a released marker.
    unsafe { FFI_ArrowSchema::from_raw(ptr::from_mut(&mut schema).cast()) }
}

pub(crate) fn array_to_ffi(mut array: RawArray) -> FFI_ArrowArray {
    // SAFETY: identical layouts; `array` is left as a released marker.
    unsafe { FFI_ArrowArray::from_raw(ptr::from_mut(&mut array).cast()) }
}

pub(crate) fn schema_from_ffi(mut schema: FFI_ArrowSchema) -> RawSchema {
    // SAFETY: identical layouts; arrow drops the released marker left behind.
    unsafe { RawSchema::from_raw(ptr::from_mut(&mut schema).cast()) }
}

pub(crate) fn array_from_ffi(mut array: FFI_ArrowArray) -> RawArray {
    // SAFETY: as above.
    unsafe { RawArray::from_raw(ptr::from_mut(&mut array).cast()) }
}
