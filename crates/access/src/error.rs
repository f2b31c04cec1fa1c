//! Error types for the access layer.
//!
//! The call adapter and the store operations never return these: their
//! failures travel as data inside an [`Envelope`](crate::envelope::Envelope).
//! The types here cover everything outside that boundary: building the HTTP
//! client, strict fetches, reading fields out of schemaless documents, and
//! authentication outcomes.

// Error enum variant fields are self-documenting via their #[error(...)] messages
#![allow(missing_docs)]

use thiserror::Error;

/// The primary error type for the access layer.
#[derive(Error, Debug)]
pub enum AccessError {
    /// Transport setup and strict fetch errors
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// Document shape errors
    #[error(transparent)]
    Shape(#[from] ShapeError),

    /// Authentication errors
    #[error(transparent)]
    Auth(#[from] AuthError),
}

/// Errors raised by the HTTP layer outside the envelope boundary.
#[derive(Error, Debug)]
pub enum TransportError {
    /// The underlying HTTP client could not be constructed.
    #[error("failed to build HTTP client: {message}")]
    ClientBuild {
        message: String,
        #[source]
        source: reqwest::Error,
    },

    /// A strict request could not be completed.
    #[error("could not get '{url}', error: {message}")]
    Request { url: String, message: String },

    /// A strict request returned a status other than 200.
    #[error("could not get '{url}': response code {status}")]
    Status { url: String, status: u16 },
}

/// Errors raised when a schemaless document does not have the expected shape.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ShapeError {
    /// Nothing is stored at the requested path.
    #[error("missing field: {path}")]
    Missing { path: String },

    /// A value exists at the path but has a different type.
    #[error("field '{path}' is {found}, expected {expected}")]
    Mismatch {
        path: String,
        expected: &'static str,
        found: &'static str,
    },

    /// A body that should have been JSON could not be parsed.
    #[error("result could not be parsed: {message}")]
    Unparseable { message: String },
}

/// Errors related to user authentication.
#[derive(Error, Debug)]
pub enum AuthError {
    /// The authentication endpoint could not be reached or answered with an error.
    #[error("authentication endpoint failed (code {code:?}): {message}")]
    Communication { code: Option<i64>, message: String },

    /// The endpoint answered but rejected the credentials.
    #[error("access denied for user '{user_id}'")]
    AccessDenied { user_id: String },

    /// The endpoint answered with a document that could not be interpreted.
    #[error("malformed authentication response: {0}")]
    MalformedResponse(#[from] ShapeError),
}

impl AuthError {
    /// Returns the historical integer code for this failure.
    ///
    /// `1` communication, `2` access denied, `3` communication or denied
    /// (the endpoint did not answer successfully), `4` unknown.
    pub fn legacy_code(&self) -> i32 {
        match self {
            AuthError::Communication { code: None, .. } => 1,
            AuthError::Communication { .. } => 3,
            AuthError::AccessDenied { .. } => 2,
            AuthError::MalformedResponse(_) => 4,
        }
    }
}

/// Result type alias for access layer operations.
pub type AccessResult<T> = Result<T, AccessError>;

/// Result type alias for document accessors.
pub type ShapeResult<T> = Result<T, ShapeError>;

impl From<serde_json::Error> for ShapeError {
    fn from(err: serde_json::Error) -> Self {
        ShapeError::Unparseable {
            message: err.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shape_error_display() {
        let err = ShapeError::Missing {
            path: "hits.hits".to_string(),
        };
        assert_eq!(err.to_string(), "missing field: hits.hits");

        let err = ShapeError::Mismatch {
            path: "_id".to_string(),
            expected: "string",
            found: "number",
        };
        assert_eq!(err.to_string(), "field '_id' is number, expected string");
    }

    #[test]
    fn test_transport_error_display() {
        let err = TransportError::Status {
            url: "http://localhost:8011/".to_string(),
            status: 503,
        };
        assert_eq!(
            err.to_string(),
            "could not get 'http://localhost:8011/': response code 503"
        );
    }

    #[test]
    fn test_auth_error_legacy_codes() {
        let unreachable = AuthError::Communication {
            code: None,
            message: "connection refused".to_string(),
        };
        assert_eq!(unreachable.legacy_code(), 1);

        let rejected_status = AuthError::Communication {
            code: Some(400),
            message: "bad request".to_string(),
        };
        assert_eq!(rejected_status.legacy_code(), 3);

        let denied = AuthError::AccessDenied {
            user_id: "uid1".to_string(),
        };
        assert_eq!(denied.legacy_code(), 2);
        assert!(denied.to_string().contains("uid1"));
    }

    #[test]
    fn test_access_error_from_parts() {
        let err: AccessError = ShapeError::Missing {
            path: "x".to_string(),
        }
        .into();
        assert!(matches!(err, AccessError::Shape(_)));

        let err: AccessError = AuthError::AccessDenied {
            user_id: "u".to_string(),
        }
        .into();
        assert!(matches!(err, AccessError::Auth(_)));
    }

    #[test]
    fn test_shape_error_from_serde() {
        let parse_err = serde_json::from_str::<serde_json::Value>("{broken").unwrap_err();
        let err: ShapeError = parse_err.into();
        assert!(matches!(err, ShapeError::Unparseable { .. }));
    }
}
