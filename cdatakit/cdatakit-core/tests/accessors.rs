use cdatakit_core::{ArrayNode, BufferOptions, DEFAULT_ALIGNMENT, NodeError, SchemaNode};

#[test]
fn typed_buffer_round_trip() -> Result<(), NodeError> {
    let mut array = ArrayNode::new()?;
    let mut view = array.view_mut();

    let written = [1.5_f64, -0.25, 1e300, f64::MIN_POSITIVE];
    view.add_buffer::<f64>(written.len())?
        .copy_from_slice(&written);
    let words = view.add_buffer::<u16>(3)?;
    words.copy_from_slice(&[7, 8, 9]);

    assert_eq!(view.n_buffers(), 2);
    assert_eq!(view.buffer::<f64>(0)?, &written);
    assert_eq!(view.buffer::<u16>(1)?, &[7, 8, 9]);
    assert_eq!(view.buffer::<u8>(1)?.len(), 6);
    Ok(())
}

#[test]
fn new_buffers_are_zero_filled() -> Result<(), NodeError> {
    let mut array = ArrayNode::new()?;
    let mut view = array.view_mut();
    assert!(view.add_buffer::<u64>(33)?.iter().all(|&v| v == 0));
    assert!(view.add_buffer::<u8>(0)?.is_empty());
    Ok(())
}

#[test]
fn out_of_range_indices_are_reported() -> Result<(), NodeError> {
    let mut array = ArrayNode::new()?;
    let mut view = array.view_mut();
    view.add_buffer::<u8>(1)?;
    view.add_child()?;

    assert!(matches!(
        view.buffer::<u8>(1),
        Err(NodeError::IndexOutOfRange {
            what: "buffer",
            index: 1,
            count: 1
        })
    ));
    assert!(matches!(
        view.child_mut(1),
        Err(NodeError::IndexOutOfRange {
            what: "child",
            index: 1,
            count: 1
        })
    ));
    assert!(matches!(
        view.as_raw().child(5),
        Err(NodeError::IndexOutOfRange { index: 5, .. })
    ));

    let mut schema = SchemaNode::new("+s", "root")?;
    assert!(matches!(
        schema.view_mut().child_mut(0),
        Err(NodeError::IndexOutOfRange { count: 0, .. })
    ));
    Ok(())
}

#[test]
fn mismatched_element_type_is_rejected() -> Result<(), NodeError> {
    let mut array = ArrayNode::new()?;
    let mut view = array.view_mut();
    view.add_buffer::<u8>(6)?;
    assert!(matches!(
        view.buffer::<u32>(0),
        Err(NodeError::BufferCast { index: 0, .. })
    ));
    Ok(())
}

#[test]
fn null_buffer_slot() -> Result<(), NodeError> {
    let mut array = ArrayNode::new()?;
    let mut view = array.view_mut();
    assert_eq!(view.add_null_buffer()?, 0);
    view.add_buffer::<i32>(3)?;
    view.set_length(3)?;

    assert!(view.as_raw().buffer_ptr(0)?.is_null());
    assert!(matches!(
        view.buffer::<u8>(0),
        Err(NodeError::NullBuffer { index: 0 })
    ));
    // Without a bitmap every row is valid.
    assert!(view.is_valid(2)?);
    assert_eq!(view.recompute_null_count()?, 0);
    Ok(())
}

#[test]
fn children_keep_insertion_order() -> Result<(), NodeError> {
    let names = ["year", "month", "day", "hour"];

    let mut schema = SchemaNode::new("+s", "timestamp")?;
    let mut array = ArrayNode::new()?;
    let mut schema_view = schema.view_mut();
    let mut array_view = array.view_mut();
    for (i, name) in names.into_iter().enumerate() {
        schema_view.add_child("i", name)?;
        array_view.add_child()?.set_length(i + 10)?;
    }

    let (schema, array) = (schema.as_raw(), array.as_raw());
    assert_eq!(schema.n_children(), names.len());
    assert_eq!(array.n_children(), names.len());
    for (i, name) in names.into_iter().enumerate() {
        assert_eq!(schema.child(i)?.name()?, Some(name));
        assert_eq!(array.child(i)?.length(), i + 10);
    }
    Ok(())
}

#[test]
fn child_views_mutate_in_place() -> Result<(), NodeError> {
    let mut schema = SchemaNode::new("+s", "root")?;
    let mut view = schema.view_mut();
    view.add_child("i", "a")?;
    view.add_child("+s", "b")?.add_child("l", "b0")?;

    let mut b = view.child_mut(1)?;
    b.set_name("nested")?;
    b.child_mut(0)?.set_format("L")?;
    b.set_nullable(false);

    let b = schema.as_raw().child(1)?;
    assert_eq!(b.name()?, Some("nested"));
    assert!(!b.is_nullable());
    assert_eq!(b.child(0)?.format()?, "L");
    Ok(())
}

#[test]
fn interior_nul_is_rejected() {
    assert!(matches!(
        SchemaNode::new("i", "bad\0name"),
        Err(NodeError::InteriorNul { field: "name", .. })
    ));
}

#[test]
fn buffers_follow_configured_alignment() -> Result<(), NodeError> {
    let mut array = ArrayNode::new()?;
    let mut view = array.view_mut();
    view.add_buffer::<u8>(3)?;
    assert_eq!(view.as_raw().buffer_ptr(0)? as usize % DEFAULT_ALIGNMENT, 0);

    let options = BufferOptions::new().with_alignment(256).with_padding(64);
    let mut array = ArrayNode::with_options(options)?;
    let mut view = array.view_mut();
    let mut child = view.add_child()?;
    assert_eq!(child.options(), options);
    child.add_buffer::<u8>(5)?;
    assert_eq!(child.as_raw().buffer_ptr(0)? as usize % 256, 0);
    // Padding affects the allocation, not the visible length.
    assert_eq!(child.buffer::<u8>(0)?.len(), 5);
    Ok(())
}

#[test]
fn invalid_alignment_fails_allocation() -> Result<(), NodeError> {
    let mut array = ArrayNode::with_options(BufferOptions::new().with_alignment(48))?;
    let result = array.view_mut().add_buffer::<u8>(4).map(|_| ());
    assert!(matches!(
        result,
        Err(NodeError::AllocationFailure { what: "buffer", .. })
    ));
    assert_eq!(array.view_mut().n_buffers(), 0);
    Ok(())
}

#[test]
fn oversized_request_fails_allocation() -> Result<(), NodeError> {
    let mut array = ArrayNode::new()?;
    let result = array.view_mut().add_buffer::<u64>(usize::MAX / 4).map(|_| ());
    assert!(matches!(result, Err(NodeError::AllocationFailure { .. })));
    Ok(())
}

#[cfg(target_pointer_width = "64")]
#[test]
fn lengths_beyond_the_interchange_range_are_rejected() -> Result<(), NodeError> {
    let mut array = ArrayNode::new()?;
    let mut view = array.view_mut();
    assert!(matches!(
        view.set_length(usize::MAX),
        Err(NodeError::LengthOverflow { what: "length" })
    ));
    assert!(matches!(
        view.set_offset(usize::MAX),
        Err(NodeError::LengthOverflow { what: "offset" })
    ));
    assert_eq!(view.length(), 0);
    assert_eq!(view.offset(), 0);
    Ok(())
}
