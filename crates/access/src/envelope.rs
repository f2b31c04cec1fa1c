//! Normalized response envelope.
//!
//! Every network call made through the access layer returns an [`Envelope`].
//! Response bodies come in three shapes (a JSON object, a JSON array of
//! objects, or anything else as plain text) and the envelope keeps them apart
//! while always carrying a success flag.
//!
//! # Rendering
//!
//! [`Envelope::to_value`] produces the flat document form:
//!
//! | Body                | Rendered document                         |
//! |---------------------|-------------------------------------------|
//! | `{"a":1}`           | `{"a":1, "success":true}`                 |
//! | `[{"a":1}]`         | `{"ARRAY":[{"a":1}], "success":true}`     |
//! | `pong`              | `{"STRING":"pong", "success":true}`       |
//! | transport failure   | `{"success":false, "code":-1, "error":…}` |
//!
//! # Example
//!
//! ```
//! use keel_access::envelope::Envelope;
//!
//! let envelope = Envelope::build("\u{feff}\n{\"cluster_uuid\":\"x1\"}", true);
//! assert!(envelope.is_success());
//! assert_eq!(envelope.str_field(&["cluster_uuid"]).unwrap(), "x1");
//! ```

use serde::{Serialize, Serializer};
use serde_json::{Map, Value};

use crate::document;
use crate::error::{ShapeError, ShapeResult};

/// Key carrying the success flag in the rendered document.
pub const SUCCESS_KEY: &str = "success";

/// Key carrying an array body in the rendered document.
pub const ARRAY_KEY: &str = "ARRAY";

/// Key carrying a plain text body in the rendered document.
pub const STRING_KEY: &str = "STRING";

/// Status code used when a structured body could not be parsed.
pub const PARSE_FAILURE_CODE: i32 = 500;

/// Status code used when no HTTP status was ever obtained.
pub const NO_STATUS_CODE: i32 = -1;

/// Longest body prefix, in characters, written to the log on parse failure.
const LOGGED_BODY_CHARS: usize = 256;

/// The body carried by an envelope.
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    /// The body was a JSON object.
    Object(Map<String, Value>),
    /// The body was a JSON array starting with an object.
    Array(Vec<Value>),
    /// The body was anything else, kept verbatim (after trimming).
    Text(String),
    /// No body is carried, as on failure paths.
    Empty,
}

impl Payload {
    fn kind(&self) -> &'static str {
        match self {
            Payload::Object(_) => "object",
            Payload::Array(_) => "array",
            Payload::Text(_) => "string",
            Payload::Empty => "null",
        }
    }
}

/// A normalized success/failure wrapper around one response.
#[derive(Debug, Clone, PartialEq)]
pub struct Envelope {
    success: bool,
    code: Option<i32>,
    error: Option<String>,
    payload: Payload,
}

/// Removes a leading byte-order mark and surrounding whitespace or control
/// characters.
fn clean_body(raw: &str) -> &str {
    let raw = raw.strip_prefix('\u{feff}').unwrap_or(raw);
    raw.trim_matches(|c: char| c.is_whitespace() || c.is_control())
}

/// Cuts `body` to at most [`LOGGED_BODY_CHARS`] characters.
fn body_preview(body: &str) -> &str {
    match body.char_indices().nth(LOGGED_BODY_CHARS) {
        Some((end, _)) => &body[..end],
        None => body,
    }
}

impl Envelope {
    /// Builds an envelope from a raw response body and a success tag.
    ///
    /// Bodies starting with `{` are parsed as objects, bodies starting with
    /// `[{` as arrays, everything else is kept as text. A structured body that
    /// fails to parse yields a failure envelope with code 500.
    pub fn build(raw: &str, success: bool) -> Self {
        let body = clean_body(raw);

        let payload = if body.starts_with('{') {
            serde_json::from_str::<Map<String, Value>>(body).map(Payload::Object)
        } else if body.starts_with("[{") {
            serde_json::from_str::<Vec<Value>>(body).map(Payload::Array)
        } else {
            Ok(Payload::Text(body.to_string()))
        };

        match payload {
            Ok(payload) => Self {
                success,
                code: None,
                error: None,
                payload,
            },
            Err(e) => {
                tracing::error!(
                    error = %e,
                    body_len = body.len(),
                    body = %body_preview(body),
                    "Failed to parse response body"
                );
                tracing::debug!(body = %body, "Unparsed response body");
                Self::failure(
                    PARSE_FAILURE_CODE,
                    Some(format!("result could not be parsed: {}", e)),
                )
            }
        }
    }

    /// Creates a failure envelope.
    pub fn failure(code: i32, error: Option<String>) -> Self {
        Self {
            success: false,
            code: Some(code),
            error,
            payload: Payload::Empty,
        }
    }

    /// Creates a successful envelope around an object.
    pub fn from_object(object: Map<String, Value>) -> Self {
        Self {
            success: true,
            code: None,
            error: None,
            payload: Payload::Object(object),
        }
    }

    /// Returns true if the call succeeded. Check this before any other field.
    pub fn is_success(&self) -> bool {
        self.success
    }

    /// Returns the status code recorded on failure paths.
    pub fn code(&self) -> Option<i32> {
        self.code
    }

    /// Returns the failure description, if any.
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// Returns the carried body.
    pub fn payload(&self) -> &Payload {
        &self.payload
    }

    /// Returns the object body, if the response was an object.
    pub fn as_object(&self) -> Option<&Map<String, Value>> {
        match &self.payload {
            Payload::Object(map) => Some(map),
            _ => None,
        }
    }

    /// Returns the array body, if the response was an array.
    pub fn as_array(&self) -> Option<&[Value]> {
        match &self.payload {
            Payload::Array(items) => Some(items),
            _ => None,
        }
    }

    /// Returns the text body, if the response was neither object nor array.
    pub fn as_text(&self) -> Option<&str> {
        match &self.payload {
            Payload::Text(text) => Some(text),
            _ => None,
        }
    }

    /// Returns true if the object body has a top-level `key`.
    pub fn contains_key(&self, key: &str) -> bool {
        self.as_object().is_some_and(|map| map.contains_key(key))
    }

    /// Returns the top-level field `key` of an object body.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.as_object().and_then(|map| map.get(key))
    }

    /// Walks `path` into the object body.
    pub fn field(&self, path: &[&str]) -> ShapeResult<&Value> {
        match &self.payload {
            Payload::Object(map) => document::value_in(map, path),
            Payload::Empty => Err(ShapeError::Missing {
                path: path.join("."),
            }),
            other => Err(ShapeError::Mismatch {
                path: String::new(),
                expected: "object",
                found: other.kind(),
            }),
        }
    }

    /// Returns the string at `path` in the object body.
    pub fn str_field(&self, path: &[&str]) -> ShapeResult<&str> {
        document::expect_str(self.field(path)?, path)
    }

    /// Returns the integer at `path` in the object body.
    pub fn i64_field(&self, path: &[&str]) -> ShapeResult<i64> {
        document::expect_i64(self.field(path)?, path)
    }

    /// Returns the object at `path` in the object body.
    pub fn object_field(&self, path: &[&str]) -> ShapeResult<&Map<String, Value>> {
        document::expect_object(self.field(path)?, path)
    }

    /// Returns the array at `path` in the object body.
    pub fn array_field(&self, path: &[&str]) -> ShapeResult<&[Value]> {
        document::expect_array(self.field(path)?, path)
    }

    /// Returns a readable summary of a failed call.
    pub fn error_summary(&self) -> String {
        let code = self
            .code
            .map(|c| c.to_string())
            .unwrap_or_else(|| "null".to_string());
        format!("code: {}, error: {}", code, self.error().unwrap_or("null"))
    }

    /// Renders the envelope as a flat JSON document.
    ///
    /// Object bodies have the success flag merged into their own fields; an
    /// existing `success` field in the body is overwritten.
    pub fn to_value(&self) -> Value {
        let mut map = match &self.payload {
            Payload::Object(object) => object.clone(),
            Payload::Array(items) => {
                let mut map = Map::new();
                map.insert(ARRAY_KEY.to_string(), Value::Array(items.clone()));
                map
            }
            Payload::Text(text) => {
                let mut map = Map::new();
                map.insert(STRING_KEY.to_string(), Value::String(text.clone()));
                map
            }
            Payload::Empty => Map::new(),
        };
        map.insert(SUCCESS_KEY.to_string(), Value::Bool(self.success));
        if let Some(code) = self.code {
            map.insert("code".to_string(), Value::from(code));
        }
        if let Some(ref error) = self.error {
            map.insert("error".to_string(), Value::String(error.clone()));
        }
        Value::Object(map)
    }
}

impl Serialize for Envelope {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_value().serialize(serializer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_body_preview_is_bounded() {
        assert_eq!(body_preview("{\"a\":"), "{\"a\":");

        let long = "é".repeat(LOGGED_BODY_CHARS * 4);
        let preview = body_preview(&long);
        assert_eq!(preview.chars().count(), LOGGED_BODY_CHARS);
        assert!(long.starts_with(preview));
    }

    #[test]
    fn test_object_body_keeps_every_key() {
        let envelope = Envelope::build(r#"{"_id":"a1","found":true,"n":3}"#, true);
        assert!(envelope.is_success());
        assert_eq!(envelope.code(), None);

        let rendered = envelope.to_value();
        assert_eq!(rendered["_id"], "a1");
        assert_eq!(rendered["found"], true);
        assert_eq!(rendered["n"], 3);
        assert_eq!(rendered[SUCCESS_KEY], true);
        assert_eq!(rendered.as_object().unwrap().len(), 4);
    }

    #[test]
    fn test_array_body_goes_under_array_key() {
        let envelope = Envelope::build(r#"[{"a":1},{"a":2}]"#, true);
        assert_eq!(envelope.as_array().unwrap().len(), 2);

        let rendered = envelope.to_value();
        assert_eq!(rendered[ARRAY_KEY], json!([{"a": 1}, {"a": 2}]));
        assert_eq!(rendered[SUCCESS_KEY], true);
    }

    #[test]
    fn test_scalar_array_is_text() {
        let envelope = Envelope::build("[1,2,3]", true);
        assert_eq!(envelope.as_text(), Some("[1,2,3]"));
    }

    #[test]
    fn test_plain_text_body() {
        let envelope = Envelope::build("  pong\r\n", true);
        assert_eq!(envelope.as_text(), Some("pong"));
        assert_eq!(envelope.to_value()[STRING_KEY], "pong");
    }

    #[test]
    fn test_empty_body_is_empty_text() {
        let envelope = Envelope::build("", true);
        assert!(envelope.is_success());
        assert_eq!(envelope.as_text(), Some(""));
    }

    #[test]
    fn test_bom_and_leading_control_characters_are_stripped() {
        let envelope = Envelope::build("\u{feff}\r\n\t{\"ok\":1}", true);
        assert!(envelope.is_success());
        assert_eq!(envelope.get("ok"), Some(&json!(1)));
    }

    #[test]
    fn test_broken_object_is_parse_failure() {
        let envelope = Envelope::build("{\"unterminated\": ", true);
        assert!(!envelope.is_success());
        assert_eq!(envelope.code(), Some(PARSE_FAILURE_CODE));
        assert!(envelope.error().unwrap().contains("could not be parsed"));
        assert_eq!(envelope.payload(), &Payload::Empty);
    }

    #[test]
    fn test_broken_array_is_parse_failure() {
        let envelope = Envelope::build("[{\"a\":1},", true);
        assert!(!envelope.is_success());
        assert_eq!(envelope.code(), Some(PARSE_FAILURE_CODE));
    }

    #[test]
    fn test_success_tag_false_is_carried() {
        let envelope = Envelope::build(r#"{"a":1}"#, false);
        assert!(!envelope.is_success());
        assert_eq!(envelope.to_value()[SUCCESS_KEY], false);
    }

    #[test]
    fn test_failure_rendering_and_summary() {
        let envelope = Envelope::failure(404, Some("not found".to_string()));
        assert_eq!(
            envelope.to_value(),
            json!({"success": false, "code": 404, "error": "not found"})
        );
        assert_eq!(envelope.error_summary(), "code: 404, error: not found");

        let bare = Envelope::failure(NO_STATUS_CODE, None);
        assert_eq!(bare.error_summary(), "code: -1, error: null");
    }

    #[test]
    fn test_field_accessors() {
        let envelope = Envelope::build(
            r#"{"hits":{"hits":[{"_id":"x"}]},"count":4,"_id":"abc"}"#,
            true,
        );
        assert_eq!(envelope.array_field(&["hits", "hits"]).unwrap().len(), 1);
        assert_eq!(envelope.i64_field(&["count"]).unwrap(), 4);
        assert_eq!(envelope.str_field(&["_id"]).unwrap(), "abc");
        assert!(envelope.object_field(&["hits"]).is_ok());
        assert!(matches!(
            envelope.str_field(&["count"]),
            Err(ShapeError::Mismatch { .. })
        ));
        assert!(matches!(
            envelope.field(&["missing"]),
            Err(ShapeError::Missing { .. })
        ));
    }

    #[test]
    fn test_field_on_text_payload_is_mismatch() {
        let envelope = Envelope::build("hello", true);
        assert!(matches!(
            envelope.field(&["a"]),
            Err(ShapeError::Mismatch { found: "string", .. })
        ));
    }

    #[test]
    fn test_serialize_matches_to_value() {
        let envelope = Envelope::build(r#"{"a":"b"}"#, true);
        let serialized = serde_json::to_value(&envelope).unwrap();
        assert_eq!(serialized, envelope.to_value());
    }
}
