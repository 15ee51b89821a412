use arrow::record_batch::RecordBatch;
use cdatakit_core::{ArrayNode, RawArray, RawSchema, SchemaNode};
use tracing::debug;

use crate::{error::BridgeError, export::export_record_batch, import::import_record_batch};

/// Run a node-level transform over a record batch.
///
/// `batch` is exported, the borrowed pair is handed to `transform`, which
/// builds a fresh struct-rooted pair, and the result is imported as a new
/// batch. The exported input is released before the output is imported,
/// whether or not `transform` succeeds.
pub fn transform_record_batch<F>(
    batch: &RecordBatch,
    transform: F,
) -> Result<RecordBatch, BridgeError>
where
    F: FnOnce(&RawSchema, &RawArray) -> Result<(SchemaNode, ArrayNode), BridgeError>,
{
    let (mut schema, mut array) = export_record_batch(batch)?;
    let output = transform(&schema, &array);
    array.release();
    schema.release();

    let (schema, array) = output?;
    debug!(
        rows = array.as_raw().length(),
        columns = array.as_raw().n_children(),
        "transform produced output tree"
    );
    import_record_batch(schema.into_raw(), array.into_raw())
}
