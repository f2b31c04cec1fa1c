//! Core store traits and abstractions.
//!
//! - [`DocumentStore`] - index/type/id document operations on a search engine
//! - [`KeyValueStore`] - table/index/key operations on a key-value store
//!
//! Both traits return [`Envelope`](crate::envelope::Envelope)s or small
//! outcome types built from them. No operation returns `Err`: backend failures
//! are data.

mod document_store;
mod key_value;

pub use document_store::{CreateOutcome, DocumentStore, ResultCode, WriteOutcome, hits};
pub use key_value::{KeyValueConfig, KeyValueStore};

/// Identifies the kind of backend behind a store or collaborator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BackendKind {
    /// Elasticsearch (search engine).
    Elasticsearch,
    /// DynamoDB-compatible key-value store.
    DynamoDb,
    /// Remote authentication endpoint.
    RemoteAuthentication,
    /// Custom or unknown backend.
    Custom(&'static str),
}

impl BackendKind {
    /// Prefix used for this backend's operation names in statistics.
    pub fn api_name(&self) -> &'static str {
        match self {
            BackendKind::Elasticsearch => "Elasticsearch",
            BackendKind::DynamoDb => "DynamoDB",
            BackendKind::RemoteAuthentication => "RemoteAuthentication",
            BackendKind::Custom(name) => name,
        }
    }

    /// Returns `"{Backend}:{operation}"`, or `"{Backend}:{operation}-error"`
    /// when the call failed.
    pub fn operation_name(&self, operation: &str, failed: bool) -> String {
        if failed {
            format!("{}:{}-error", self.api_name(), operation)
        } else {
            format!("{}:{}", self.api_name(), operation)
        }
    }
}

impl std::fmt::Display for BackendKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BackendKind::Elasticsearch => write!(f, "elasticsearch"),
            BackendKind::DynamoDb => write!(f, "dynamodb"),
            BackendKind::RemoteAuthentication => write!(f, "remote-authentication"),
            BackendKind::Custom(name) => write!(f, "{}", name),
        }
    }
}
