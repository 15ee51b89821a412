use std::sync::Arc;

use arrow::{
    array::{Array, ArrayRef, StructArray, make_array},
    datatypes::Schema,
    ffi::from_ffi,
    record_batch::{RecordBatch, RecordBatchOptions},
};
use cdatakit_core::{RawArray, RawSchema};
use tracing::debug;

use crate::{
    abi::{array_to_ffi, schema_to_ffi},
    error::BridgeError,
};

/// Import a node pair as an arrow array. The pair is consumed: arrow calls
/// the array's release callback once the last buffer reference is dropped,
/// and the schema is released on return.
pub fn import_array(schema: RawSchema, array: RawArray) -> Result<ArrayRef, BridgeError> {
    let ffi_schema = schema_to_ffi(schema);
    // SAFETY: the pair was produced as a conforming tree and ownership of the
    // array moves to arrow.
    let data = unsafe { from_ffi(array_to_ffi(array), &ffi_schema)? };
    let array = make_array(data);

    debug!(
        data_type = %array.data_type(),
        rows = array.len(),
        "imported array"
    );
    Ok(array)
}

/// Import a struct-rooted node pair as a record batch.
///
/// Fails with [`BridgeError::NotAStruct`] for any other root format and with
/// [`BridgeError::NullRootRows`] if the root has null rows.
pub fn import_record_batch(
    schema: RawSchema,
    array: RawArray,
) -> Result<RecordBatch, BridgeError> {
    let format = schema.format()?;
    if format != "+s" {
        return Err(BridgeError::NotAStruct {
            format: format.to_owned(),
        });
    }

    let ffi_schema = schema_to_ffi(schema);
    let arrow_schema = Schema::try_from(&ffi_schema)?;
    // SAFETY: as in `import_array`.
    let data = unsafe { from_ffi(array_to_ffi(array), &ffi_schema)? };
    let rows = data.len();
    let (_, columns, nulls) = StructArray::from(data).into_parts();
    if let Some(nulls) = nulls.filter(|nulls| nulls.null_count() > 0) {
        return Err(BridgeError::NullRootRows {
            null_count: nulls.null_count(),
        });
    }

    let options = RecordBatchOptions::new().with_row_count(Some(rows));
    let batch = RecordBatch::try_new_with_options(Arc::new(arrow_schema), columns, &options)?;

    debug!(
        rows = batch.num_rows(),
        columns = batch.num_columns(),
        "imported record batch"
    );
    Ok(batch)
}
