use cdatakit_core::{
    ArrayNode, Flags, Kind, NodeError, SchemaNode, format_array_tree, format_schema_tree,
};

#[test]
fn leaf_schema_is_one_line() -> Result<(), NodeError> {
    let schema = SchemaNode::of_kind(Kind::Int32, "day")?;
    assert_eq!(
        format_schema_tree(schema.as_raw())?,
        "day: { format: i, flags: nullable }\n"
    );
    Ok(())
}

#[test]
fn nested_schema_keeps_indentation() -> Result<(), NodeError> {
    let mut schema = SchemaNode::of_kind(Kind::Struct, "Date")?;
    let mut view = schema.view_mut();
    view.set_nullable(false);
    view.set_metadata_pairs(&[("unit", "calendar")])?;
    view.add_child_of_kind(Kind::Int32, "day")?;
    let mut time = view.add_child_of_kind(Kind::Struct, "time")?;
    time.set_flags(Flags::NULLABLE | Flags::MAP_KEYS_SORTED);
    time.add_child_of_kind(Kind::UInt8, "hour")?.set_flags(Flags::empty());

    let expected = "\
Date:
    format: +s
    flags: none
    metadata:
        unit: calendar
    children:
        day: { format: i, flags: nullable }
        time:
            format: +s
            flags: nullable | map_keys_sorted
            children:
                hour: { format: C, flags: none }
";
    assert_eq!(format_schema_tree(schema.as_raw())?, expected);
    Ok(())
}

#[test]
fn dictionary_and_released_children_are_rendered() -> Result<(), NodeError> {
    let mut schema = SchemaNode::of_kind(Kind::Struct, "root")?;
    let mut view = schema.view_mut();
    view.add_child_of_kind(Kind::Int8, "code")?
        .set_dictionary(SchemaNode::of_kind(Kind::Int64, "")?)?;
    view.add_child_of_kind(Kind::Int8, "gone")?;

    let mut raw = schema.into_raw();
    let mut gone = raw.take_child(1)?;
    gone.release();

    let expected = "\
root:
    format: +s
    flags: nullable
    children:
        code:
            format: c
            flags: nullable
            dictionary: { format: l, flags: nullable }
        schema: <released>
";
    assert_eq!(format_schema_tree(&raw)?, expected);
    raw.release();
    assert_eq!(format_schema_tree(&raw)?, "schema: <released>\n");
    Ok(())
}

#[test]
fn array_tree_shows_extents() -> Result<(), NodeError> {
    let mut array = ArrayNode::new_struct(3)?;
    let mut date = array.as_struct()?;
    date.set_valid(0, true)?;
    date.set_valid(1, true)?;
    let mut day = date.add_primitive_child::<i32>()?;
    day.set(0, Some(10))?;
    day.set(1, Some(20))?;

    let expected = "\
array:
    length: 3
    null_count: 1
    offset: 0
    buffers: 1
    children:
        child 0: { length: 3, null_count: 1, offset: 0, buffers: 2 }
";
    assert_eq!(format_array_tree(array.as_raw())?, expected);
    Ok(())
}

#[test]
fn array_dictionary_is_labelled() -> Result<(), NodeError> {
    let mut array = ArrayNode::new_primitive::<i8>(2)?;
    array
        .view_mut()
        .set_dictionary(ArrayNode::new_primitive::<f64>(5)?)?;

    let expected = "\
array:
    length: 2
    null_count: 2
    offset: 0
    buffers: 2
    dictionary: { length: 5, null_count: 5, offset: 0, buffers: 2 }
";
    assert_eq!(format_array_tree(array.as_raw())?, expected);
    Ok(())
}
