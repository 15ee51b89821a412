use cdatakit_core::{Kind, NodeError, SchemaNode, decode_metadata, encode_metadata};

fn len(value: i32) -> [u8; 4] {
    value.to_ne_bytes()
}

#[test]
fn encoding_follows_the_interchange_layout() -> Result<(), NodeError> {
    let encoded = encode_metadata(&[("key", "v1"), ("", "x")])?;

    let mut expected: Vec<u8> = Vec::new();
    expected.extend(len(2));
    expected.extend(len(3));
    expected.extend(b"key");
    expected.extend(len(2));
    expected.extend(b"v1");
    expected.extend(len(0));
    expected.extend(len(1));
    expected.extend(b"x");
    assert_eq!(encoded, expected);

    let decoded = decode_metadata(&encoded)?;
    assert_eq!(
        decoded,
        vec![
            ("key".to_owned(), "v1".to_owned()),
            (String::new(), "x".to_owned())
        ]
    );
    Ok(())
}

#[test]
fn malformed_bytes_are_rejected() -> Result<(), NodeError> {
    let mut truncated = encode_metadata(&[("key", "value")])?;
    truncated.pop();

    let mut trailing = encode_metadata(&[("key", "value")])?;
    trailing.push(0);

    let mut negative: Vec<u8> = Vec::new();
    negative.extend(len(1));
    negative.extend(len(-4));

    let mut not_utf8: Vec<u8> = Vec::new();
    not_utf8.extend(len(1));
    not_utf8.extend(len(1));
    not_utf8.push(0xff);
    not_utf8.extend(len(0));

    for bytes in [truncated, trailing, negative, not_utf8, vec![1, 0]] {
        assert!(matches!(
            decode_metadata(&bytes),
            Err(NodeError::InvalidMetadata { .. })
        ));
    }
    Ok(())
}

#[test]
fn schema_metadata_is_read_back() -> Result<(), NodeError> {
    let mut schema = SchemaNode::of_kind(Kind::Float64, "temperature")?;
    assert!(schema.as_raw().metadata()?.is_empty());

    schema
        .view_mut()
        .set_metadata_pairs(&[("unit", "celsius"), ("sensor", "t-01")])?;
    assert_eq!(
        schema.as_raw().metadata()?,
        vec![
            ("unit".to_owned(), "celsius".to_owned()),
            ("sensor".to_owned(), "t-01".to_owned())
        ]
    );

    let raw = encode_metadata(&[("origin", "import")])?;
    schema.view_mut().set_metadata(&raw)?;
    assert_eq!(schema.as_raw().metadata()?.len(), 1);

    schema.view_mut().set_metadata(&[])?;
    assert!(schema.as_raw().metadata()?.is_empty());
    Ok(())
}

#[test]
fn invalid_metadata_leaves_the_schema_untouched() -> Result<(), NodeError> {
    let mut schema = SchemaNode::of_kind(Kind::Int8, "flag")?;
    schema.view_mut().set_metadata_pairs(&[("keep", "me")])?;

    let result = schema.view_mut().set_metadata(&[3, 0, 0]);
    assert!(matches!(result, Err(NodeError::InvalidMetadata { .. })));
    assert_eq!(schema.as_raw().metadata()?.len(), 1);
    Ok(())
}
