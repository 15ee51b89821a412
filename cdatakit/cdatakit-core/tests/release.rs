use cdatakit_core::{
    ArrayNode, Kind, NodeError, RawArray, RawSchema, SchemaNode, primitive_values,
};

fn date_schema() -> Result<SchemaNode, NodeError> {
    let mut schema = SchemaNode::of_kind(Kind::Struct, "Date")?;
    let mut view = schema.view_mut();
    view.add_child_of_kind(Kind::Int32, "day")?;
    view.add_child_of_kind(Kind::Int32, "month")?;
    Ok(schema)
}

fn date_array() -> Result<ArrayNode, NodeError> {
    let mut array = ArrayNode::new_struct(2)?;
    let mut date = array.as_struct()?;
    date.add_primitive_child::<i32>()?
        .values_mut()?
        .copy_from_slice(&[3, 14]);
    date.add_primitive_child::<i32>()?
        .values_mut()?
        .copy_from_slice(&[1, 7]);
    Ok(array)
}

#[test]
fn release_twice_is_a_no_op() -> Result<(), NodeError> {
    let mut schema = date_schema()?.into_raw();
    let mut array = date_array()?.into_raw();

    schema.release();
    array.release();
    assert!(schema.is_released());
    assert!(array.is_released());

    schema.release();
    array.release();
    assert!(schema.is_released());
    assert!(array.is_released());
    Ok(())
}

#[test]
fn released_node_rejects_accessors() -> Result<(), NodeError> {
    let mut schema = date_schema()?.into_raw();
    schema.release();

    assert!(matches!(schema.format(), Err(NodeError::Released)));
    assert!(matches!(schema.child(0), Err(NodeError::Released)));
    assert_eq!(schema.n_children(), 0);
    assert!(schema.dictionary().is_none());
    Ok(())
}

#[test]
fn dropping_the_owner_releases_the_tree() -> Result<(), NodeError> {
    // Built and dropped without an explicit release; the allocation-counting
    // tests in `leaks.rs` check that nothing is left behind.
    let schema = date_schema()?;
    let array = date_array()?;
    assert_eq!(schema.as_raw().n_children(), 2);
    assert_eq!(array.as_raw().n_children(), 2);
    Ok(())
}

#[test]
fn child_moved_out_survives_parent_release() -> Result<(), NodeError> {
    let mut schema = date_schema()?.into_raw();
    let mut array = date_array()?.into_raw();

    let mut month_schema = schema.take_child(1)?;
    let mut month = array.take_child(1)?;
    assert!(schema.child(1)?.is_released());
    assert!(array.child(1)?.is_released());

    schema.release();
    array.release();

    assert_eq!(month_schema.name()?, Some("month"));
    assert_eq!(primitive_values::<i32>(&month_schema, &month)?, &[1, 7]);

    month.release();
    month_schema.release();
    assert!(month.is_released());
    Ok(())
}

#[test]
fn export_to_moves_the_tree_into_consumer_storage() -> Result<(), NodeError> {
    let mut schema_slot = RawSchema::empty();
    let mut array_slot = RawArray::empty();

    // SAFETY: both slots are valid for writes and hold released markers.
    unsafe {
        date_schema()?.export_to(&mut schema_slot);
        date_array()?.export_to(&mut array_slot);
    }

    assert_eq!(schema_slot.format()?, "+s");
    assert_eq!(array_slot.length(), 2);
    assert_eq!(array_slot.n_children(), 2);

    // SAFETY: the slots hold conforming nodes.
    let (mut schema, mut array) = unsafe {
        (
            RawSchema::from_raw(&mut schema_slot),
            RawArray::from_raw(&mut array_slot),
        )
    };
    assert!(schema_slot.is_released());
    assert!(array_slot.is_released());

    schema.release();
    array.release();
    Ok(())
}

#[test]
fn adopted_child_is_released_through_its_own_callback() -> Result<(), NodeError> {
    let foreign = ArrayNode::new_primitive::<i64>(4)?.into_raw();
    let foreign_schema = SchemaNode::of_kind(Kind::Int64, "ticks")?.into_raw();

    let mut schema = SchemaNode::of_kind(Kind::Struct, "wrapper")?;
    let mut array = ArrayNode::new_struct(4)?;

    assert_eq!(schema.view_mut().adopt_child(foreign_schema)?, 0);
    let mut view = array.view_mut();
    assert_eq!(view.adopt_child(foreign)?, 0);
    assert!(matches!(
        view.child_mut(0),
        Err(NodeError::ForeignChild { index: 0 })
    ));
    assert_eq!(view.as_raw().child(0)?.length(), 4);

    let mut array = array.into_raw();
    array.release();
    assert!(array.is_released());
    Ok(())
}

#[test]
fn adopting_a_released_node_fails() -> Result<(), NodeError> {
    let mut schema = SchemaNode::of_kind(Kind::Struct, "wrapper")?;
    let result = schema.view_mut().adopt_child(RawSchema::empty());
    assert!(matches!(result, Err(NodeError::Released)));
    assert_eq!(schema.view_mut().n_children(), 0);
    Ok(())
}

#[test]
fn dictionary_is_released_with_its_parent() -> Result<(), NodeError> {
    let mut schema = SchemaNode::of_kind(Kind::Int8, "category")?;
    schema
        .view_mut()
        .set_dictionary(SchemaNode::of_kind(Kind::Int64, "")?)?;
    // Replacing releases the previous dictionary.
    schema
        .view_mut()
        .set_dictionary(SchemaNode::of_kind(Kind::Float64, "")?)?;

    let mut array = ArrayNode::new_primitive::<i8>(2)?;
    array
        .view_mut()
        .set_dictionary(ArrayNode::new_primitive::<f64>(3)?)?;

    let mut schema = schema.into_raw();
    let mut array = array.into_raw();
    assert_eq!(
        schema.dictionary().map(RawSchema::format).transpose()?,
        Some("g")
    );
    assert_eq!(array.dictionary().map(RawArray::length), Some(3));

    schema.release();
    array.release();
    assert!(schema.dictionary().is_none());
    assert!(array.dictionary().is_none());
    Ok(())
}
