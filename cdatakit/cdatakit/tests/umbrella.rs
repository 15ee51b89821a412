use cdatakit::{ArrayNode, Kind, NodeError, SchemaNode, core::format_array_tree};

#[test]
fn core_is_reachable_without_the_bridge() -> Result<(), NodeError> {
    let schema = SchemaNode::of_kind(Kind::Int64, "ticks")?;
    let mut array = ArrayNode::new_primitive::<i64>(2)?;
    array.as_primitive::<i64>()?.set(0, Some(42))?;

    assert_eq!(schema.as_raw().format()?, "l");
    assert_eq!(
        format_array_tree(array.as_raw())?,
        "array: { length: 2, null_count: 1, offset: 0, buffers: 2 }\n"
    );
    Ok(())
}

#[cfg(feature = "arrow")]
#[test]
fn bridge_is_reexported() -> Result<(), cdatakit::BridgeError> {
    use arrow::array::{Array, AsArray};
    use arrow::datatypes::Int64Type;

    let schema = SchemaNode::of_kind(Kind::Int64, "ticks")?;
    let mut array = ArrayNode::new_primitive::<i64>(3)?;
    let mut ticks = array.as_primitive::<i64>()?;
    ticks.set(0, Some(5))?;
    ticks.set(2, Some(-5))?;

    let imported = cdatakit::arrow::import_array(schema.into_raw(), array.into_raw())?;
    let ticks = imported.as_primitive::<Int64Type>();
    assert_eq!(ticks.null_count(), 1);
    assert_eq!(ticks.value(2), -5);
    Ok(())
}
