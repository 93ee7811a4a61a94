//! Loading and saving whole JSON documents
//!
//! Output is pretty-printed with non-ASCII text written as-is, and goes
//! through a temporary file in the destination directory so a failed run
//! never leaves a truncated document behind.

use crate::error::{ReforgeError, Result};
use crate::types::Shape;
use log::{debug, info};
use serde::Serialize;
use serde_json::ser::PrettyFormatter;
use serde_json::Value;
use std::collections::BTreeMap;
use std::io::{ErrorKind, Write};
use std::path::Path;
use tempfile::NamedTempFile;

/// Read and decode the document at `path`
pub fn load(path: &Path) -> Result<Value> {
    let text = std::fs::read_to_string(path).map_err(|e| match e.kind() {
        ErrorKind::NotFound => ReforgeError::MissingFile {
            path: path.to_path_buf(),
        },
        _ => ReforgeError::io(path, e),
    })?;

    info!("Reading JSON data from {}", path.display());
    parse(path, &text)
}

/// Decode `text`, attributing errors to `path`
pub fn parse(path: &Path, text: &str) -> Result<Value> {
    // Editors on Windows like to prepend a BOM
    let text = text.strip_prefix('\u{feff}').unwrap_or(text);

    serde_json::from_str(text).map_err(|e| ReforgeError::MalformedJson {
        path: path.to_path_buf(),
        line: e.line(),
        column: e.column(),
        source: e,
    })
}

/// Name of the JSON type of `value`, for error messages
pub fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

/// Reject documents whose root does not have the expected shape
pub fn check_shape(value: &Value, shape: Shape) -> Result<()> {
    let ok = match (shape, value) {
        (Shape::Records, Value::Array(_) | Value::Object(_)) => true,
        (Shape::Array, Value::Array(_)) => true,
        (Shape::Object, Value::Object(_)) => true,
        _ => false,
    };

    if ok {
        Ok(())
    } else {
        Err(ReforgeError::ShapeMismatch {
            expected: shape.describe(),
            found: kind_of(value),
        })
    }
}

/// Read a lookup table: a JSON object mapping old values to new ones
pub fn load_table(path: &Path) -> Result<BTreeMap<String, Value>> {
    match load(path)? {
        Value::Object(obj) => Ok(obj.into_iter().collect()),
        other => Err(ReforgeError::InvalidTable(format!(
            "{} holds {}, expected an object",
            path.display(),
            kind_of(&other)
        ))),
    }
}

/// Number of top-level records: array length, 1 for an object, 0 otherwise
pub fn record_count(value: &Value) -> usize {
    match value {
        Value::Array(arr) => arr.len(),
        Value::Object(_) => 1,
        _ => 0,
    }
}

/// Pretty JSON with `indent` spaces per level
pub fn render<T: Serialize + ?Sized>(value: &T, indent: usize) -> Result<String> {
    let indent = " ".repeat(indent);
    let mut buf = Vec::new();
    let formatter = PrettyFormatter::with_indent(indent.as_bytes());
    let mut ser = serde_json::Serializer::with_formatter(&mut buf, formatter);
    value.serialize(&mut ser)?;

    // serde_json only ever emits UTF-8
    Ok(String::from_utf8_lossy(&buf).into_owned())
}

/// Render `value` and atomically replace `path` with it
pub fn save<T: Serialize + ?Sized>(path: &Path, value: &T, indent: usize) -> Result<()> {
    let rendered = render(value, indent)?;

    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };

    let mut tmp = NamedTempFile::new_in(dir).map_err(|e| ReforgeError::io(dir, e))?;
    tmp.write_all(rendered.as_bytes())
        .and_then(|_| tmp.flush())
        .map_err(|e| ReforgeError::io(tmp.path(), e))?;
    tmp.persist(path)
        .map_err(|e| ReforgeError::io(path, e.error))?;

    debug!("Wrote {} bytes to {}", rendered.len(), path.display());
    Ok(())
}
