use std::fmt::{Result, Write as _};

use crate::{NodeError, RawArray, RawSchema};

/// Render a schema tree in a readable style:
/// leaf nodes are rendered in one line, nodes with children, a dictionary or
/// metadata are pretty-printed. Released nodes render as `<released>`.
pub fn format_schema_tree(schema: &RawSchema) -> std::result::Result<String, NodeError> {
    let mut out = String::new();
    let label = schema_label(schema)?;
    format_schema(schema, &label, 0, &mut out)?;
    Ok(out)
}

/// Render an array tree in the same style as [`format_schema_tree`]. Children
/// are labelled by position since arrays carry no names.
pub fn format_array_tree(array: &RawArray) -> std::result::Result<String, NodeError> {
    let mut out = String::new();
    format_array(array, "array", 0, &mut out)?;
    Ok(out)
}

fn schema_label(schema: &RawSchema) -> std::result::Result<String, NodeError> {
    if schema.is_released() {
        return Ok("schema".to_owned());
    }
    Ok(schema.name()?.unwrap_or_default().to_owned())
}

fn format_schema(
    schema: &RawSchema,
    label: &str,
    indent: usize,
    out: &mut String,
) -> std::result::Result<(), NodeError> {
    let pad = " ".repeat(indent);
    if schema.is_released() {
        writeln!(out, "{pad}{label}: <released>")?;
        return Ok(());
    }

    let format = schema.format()?;
    let flags = schema.flags();
    let metadata = schema.metadata()?;
    if schema.n_children() == 0 && schema.dictionary().is_none() && metadata.is_empty() {
        writeln!(out, "{pad}{label}: {{ format: {format}, flags: {flags} }}")?;
        return Ok(());
    }

    writeln!(out, "{pad}{label}:")?;
    writeln!(out, "{pad}    format: {format}")?;
    writeln!(out, "{pad}    flags: {flags}")?;
    if !metadata.is_empty() {
        writeln!(out, "{pad}    metadata:")?;
        for (key, value) in &metadata {
            writeln!(out, "{pad}        {key}: {value}")?;
        }
    }
    if schema.n_children() > 0 {
        writeln!(out, "{pad}    children:")?;
        for i in 0..schema.n_children() {
            let child = schema.child(i)?;
            let label = schema_label(child)?;
            format_schema(child, &label, indent + 8, out)?;
        }
    }
    if let Some(dictionary) = schema.dictionary() {
        format_schema(dictionary, "dictionary", indent + 4, out)?;
    }
    Ok(())
}

fn format_array(
    array: &RawArray,
    label: &str,
    indent: usize,
    out: &mut String,
) -> std::result::Result<(), NodeError> {
    let pad = " ".repeat(indent);
    if array.is_released() {
        writeln!(out, "{pad}{label}: <released>")?;
        return Ok(());
    }

    if array.n_children() == 0 && array.dictionary().is_none() {
        writeln!(out, "{pad}{label}: {{ {} }}", extents(array))?;
        return Ok(());
    }

    writeln!(out, "{pad}{label}:")?;
    write_extents(array, &pad, out)?;
    if array.n_children() > 0 {
        writeln!(out, "{pad}    children:")?;
        for i in 0..array.n_children() {
            format_array(array.child(i)?, &format!("child {i}"), indent + 8, out)?;
        }
    }
    if let Some(dictionary) = array.dictionary() {
        format_array(dictionary, "dictionary", indent + 4, out)?;
    }
    Ok(())
}

fn extents(array: &RawArray) -> String {
    format!(
        "length: {}, null_count: {}, offset: {}, buffers: {}",
        array.length(),
        array.null_count(),
        array.offset(),
        array.n_buffers()
    )
}

fn write_extents(array: &RawArray, pad: &str, out: &mut String) -> Result {
    writeln!(out, "{pad}    length: {}", array.length())?;
    writeln!(out, "{pad}    null_count: {}", array.null_count())?;
    writeln!(out, "{pad}    offset: {}", array.offset())?;
    writeln!(out, "{pad}    buffers: {}", array.n_buffers())
}
