//! Intrinsic functions embedded in property values.
//!
//! An input reference is a single-key mapping anywhere in a value tree:
//!
//! ```yaml
//! port: { get_input: port }
//! ```
//!
//! Its argument must be exactly one string. A mapping that has `get_input`
//! next to other keys is plain data.

use serde_json::Value;

use crate::error::DslError;
use crate::types::{value_type_name, GET_INPUT};

/// Detect an input reference at `value`.
///
/// Returns the referenced input name, or `None` when `value` is not a
/// reference.
///
/// # Errors
///
/// Returns `DslError::MalformedReference` if `value` is a `get_input` call
/// whose argument is not a single string.
pub fn input_reference<'a>(value: &'a Value, path: &str) -> Result<Option<&'a str>, DslError> {
    let Value::Object(map) = value else {
        return Ok(None);
    };
    if map.len() != 1 {
        return Ok(None);
    }
    match map.get(GET_INPUT) {
        None => Ok(None),
        Some(Value::String(name)) => Ok(Some(name)),
        Some(other) => Err(DslError::MalformedReference {
            path: path.to_string(),
            actual: value_type_name(other).to_string(),
        }),
    }
}

/// Call `visit` with the name and path of every input reference in `value`,
/// depth first in document order. The argument of a reference is not
/// descended into.
///
/// # Errors
///
/// Stops at the first malformed reference or the first error from `visit`.
pub fn visit_input_references<'a, F>(
    value: &'a Value,
    path: &str,
    visit: &mut F,
) -> Result<(), DslError>
where
    F: FnMut(&'a str, &str) -> Result<(), DslError>,
{
    if let Some(name) = input_reference(value, path)? {
        return visit(name, path);
    }

    match value {
        Value::Object(map) => {
            for (key, child) in map {
                visit_input_references(child, &child_path(path, key), visit)?;
            }
        }
        Value::Array(items) => {
            for (i, item) in items.iter().enumerate() {
                visit_input_references(item, &index_path(path, i), visit)?;
            }
        }
        _ => {}
    }
    Ok(())
}

pub(crate) fn child_path(path: &str, key: &str) -> String {
    if path.is_empty() {
        key.to_string()
    } else {
        format!("{}.{}", path, key)
    }
}

pub(crate) fn index_path(path: &str, index: usize) -> String {
    format!("{}[{}]", path, index)
}
