//! Typed accessors for schemaless documents.
//!
//! Documents are plain [`serde_json::Value`]s. These helpers walk a path of
//! object keys and return a [`ShapeError`] when a segment is missing or the
//! value at the end has a different type than requested.

use serde_json::{Map, Value};

use crate::error::{ShapeError, ShapeResult};

/// Returns the JSON type name of a value, as used in shape errors.
pub fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

fn join(path: &[&str]) -> String {
    path.join(".")
}

/// Walks `path` through nested objects, starting inside `object`.
pub fn value_in<'a>(object: &'a Map<String, Value>, path: &[&str]) -> ShapeResult<&'a Value> {
    let Some((first, rest)) = path.split_first() else {
        return Err(ShapeError::Missing {
            path: String::new(),
        });
    };
    let mut current = object.get(*first).ok_or_else(|| ShapeError::Missing {
        path: (*first).to_string(),
    })?;
    for (offset, key) in rest.iter().enumerate() {
        let depth = offset + 1;
        let object = current.as_object().ok_or_else(|| ShapeError::Mismatch {
            path: join(&path[..depth]),
            expected: "object",
            found: type_name(current),
        })?;
        current = object.get(*key).ok_or_else(|| ShapeError::Missing {
            path: join(&path[..=depth]),
        })?;
    }
    Ok(current)
}

/// Walks `path` through nested objects and returns the value at its end.
///
/// An empty path returns `root` itself.
pub fn value_at<'a>(root: &'a Value, path: &[&str]) -> ShapeResult<&'a Value> {
    if path.is_empty() {
        return Ok(root);
    }
    let object = root.as_object().ok_or_else(|| ShapeError::Mismatch {
        path: String::new(),
        expected: "object",
        found: type_name(root),
    })?;
    value_in(object, path)
}

/// Checks that a value found at `path` is a string.
pub fn expect_str<'a>(value: &'a Value, path: &[&str]) -> ShapeResult<&'a str> {
    value.as_str().ok_or_else(|| ShapeError::Mismatch {
        path: join(path),
        expected: "string",
        found: type_name(value),
    })
}

/// Checks that a value found at `path` is an integer.
pub fn expect_i64(value: &Value, path: &[&str]) -> ShapeResult<i64> {
    value.as_i64().ok_or_else(|| ShapeError::Mismatch {
        path: join(path),
        expected: "integer",
        found: type_name(value),
    })
}

/// Checks that a value found at `path` is an object.
pub fn expect_object<'a>(value: &'a Value, path: &[&str]) -> ShapeResult<&'a Map<String, Value>> {
    value.as_object().ok_or_else(|| ShapeError::Mismatch {
        path: join(path),
        expected: "object",
        found: type_name(value),
    })
}

/// Checks that a value found at `path` is an array.
pub fn expect_array<'a>(value: &'a Value, path: &[&str]) -> ShapeResult<&'a [Value]> {
    value
        .as_array()
        .map(Vec::as_slice)
        .ok_or_else(|| ShapeError::Mismatch {
            path: join(path),
            expected: "array",
            found: type_name(value),
        })
}

/// Returns the string at `path`.
pub fn str_at<'a>(root: &'a Value, path: &[&str]) -> ShapeResult<&'a str> {
    expect_str(value_at(root, path)?, path)
}

/// Returns the integer at `path`.
pub fn i64_at(root: &Value, path: &[&str]) -> ShapeResult<i64> {
    expect_i64(value_at(root, path)?, path)
}

/// Returns the object at `path`.
pub fn object_at<'a>(root: &'a Value, path: &[&str]) -> ShapeResult<&'a Map<String, Value>> {
    expect_object(value_at(root, path)?, path)
}

/// Returns the array at `path`.
pub fn array_at<'a>(root: &'a Value, path: &[&str]) -> ShapeResult<&'a [Value]> {
    expect_array(value_at(root, path)?, path)
}

/// Converts a loose value to an integer the way remote services tend to send
/// them: numbers, numeric strings and booleans are accepted, anything else
/// yields `default`.
pub fn loose_i64(value: Option<&Value>, default: i64) -> i64 {
    match value {
        Some(Value::Number(n)) => n
            .as_i64()
            .or_else(|| n.as_f64().map(|f| f as i64))
            .unwrap_or(default),
        Some(Value::String(s)) => s.trim().parse().unwrap_or(default),
        Some(Value::Bool(b)) => i64::from(*b),
        _ => default,
    }
}
