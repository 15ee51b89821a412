use arrow::{
    array::{Array, StructArray},
    ffi::{FFI_ArrowArray, FFI_ArrowSchema, to_ffi},
    record_batch::RecordBatch,
};
use cdatakit_core::{RawArray, RawSchema};
use tracing::debug;

use crate::{
    abi::{array_from_ffi, schema_from_ffi},
    error::BridgeError,
};

/// Export a record batch as a struct-rooted node pair.
///
/// The batch schema (including field and schema metadata) becomes the root
/// schema; the columns become the children of a `+s` array. The buffers are
/// shared with `batch` and stay alive until the pair is released.
pub fn export_record_batch(batch: &RecordBatch) -> Result<(RawSchema, RawArray), BridgeError> {
    let schema = FFI_ArrowSchema::try_from(batch.schema().as_ref())?;
    let data = StructArray::from(batch.clone()).into_data();
    let array = FFI_ArrowArray::new(&data);

    debug!(
        rows = batch.num_rows(),
        columns = batch.num_columns(),
        "exported record batch"
    );
    Ok((schema_from_ffi(schema), array_from_ffi(array)))
}

/// Export a single array. The root schema has an empty name.
pub fn export_array(array: &dyn Array) -> Result<(RawSchema, RawArray), BridgeError> {
    let (ffi_array, ffi_schema) = to_ffi(&array.to_data())?;

    debug!(
        data_type = %array.data_type(),
        rows = array.len(),
        "exported array"
    );
    Ok((schema_from_ffi(ffi_schema), array_from_ffi(ffi_array)))
}
