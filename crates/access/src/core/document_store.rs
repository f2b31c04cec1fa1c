//! Document store trait.
//!
//! This module defines the [`DocumentStore`] trait: schemaless JSON documents
//! addressed by `index/type/id`, with simple and structured search.

use async_trait::async_trait;
use serde_json::{Value, json};

use crate::envelope::Envelope;

/// Message attached to failed write outcomes.
const WRITE_FAILURE_MESSAGE: &str = "no connection to DB or internal error";

/// Two-value result code for callers that only need success or failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResultCode {
    /// The call succeeded.
    Success = 0,
    /// The call failed for any reason.
    Failure = 1,
}

impl ResultCode {
    /// Maps an envelope to its result code.
    pub fn from_envelope(envelope: &Envelope) -> Self {
        if envelope.is_success() {
            ResultCode::Success
        } else {
            ResultCode::Failure
        }
    }

    /// Returns true for [`ResultCode::Success`].
    pub fn is_success(self) -> bool {
        self == ResultCode::Success
    }

    /// Returns the integer form, `0` or `1`.
    pub fn as_i32(self) -> i32 {
        self as i32
    }
}

impl From<ResultCode> for i32 {
    fn from(code: ResultCode) -> Self {
        code.as_i32()
    }
}

/// Outcome of a write, update or delete at a known path.
#[derive(Debug, Clone, PartialEq)]
pub struct WriteOutcome {
    /// Result code.
    pub code: ResultCode,
    /// Full envelope returned by the store.
    pub envelope: Envelope,
}

impl WriteOutcome {
    /// Wraps an envelope returned by the store.
    pub fn from_envelope(envelope: Envelope) -> Self {
        Self {
            code: ResultCode::from_envelope(&envelope),
            envelope,
        }
    }

    /// Returns true if the store accepted the operation.
    pub fn is_success(&self) -> bool {
        self.code.is_success()
    }

    /// Renders `{"result": "success"|"fail", "code": 0|1, "error"?: ...}`.
    pub fn to_value(&self) -> Value {
        match self.code {
            ResultCode::Success => json!({ "result": "success", "code": 0 }),
            ResultCode::Failure => json!({
                "result": "fail",
                "code": 1,
                "error": WRITE_FAILURE_MESSAGE
            }),
        }
    }
}

/// Outcome of a write at a store-generated id.
#[derive(Debug, Clone, PartialEq)]
pub struct CreateOutcome {
    /// Result code.
    pub code: ResultCode,
    /// Generated id, present on success.
    pub id: Option<String>,
    /// Full envelope returned by the store.
    pub envelope: Envelope,
}

impl CreateOutcome {
    /// Wraps an envelope returned by the store, reading the generated `_id`.
    pub fn from_envelope(envelope: Envelope) -> Self {
        let code = ResultCode::from_envelope(&envelope);
        let id = if code.is_success() {
            envelope.str_field(&["_id"]).ok().map(str::to_string)
        } else {
            None
        };
        Self { code, id, envelope }
    }

    /// Renders `{"code": 0, "_id": ...}` or `{"code": 1}`.
    pub fn to_value(&self) -> Value {
        match self.code {
            ResultCode::Success => json!({ "code": 0, "_id": self.id }),
            ResultCode::Failure => json!({ "code": 1 }),
        }
    }
}

/// Returns the `hits.hits` array of a search result, or an empty slice when
/// the result has none.
pub fn hits(search_result: &Envelope) -> &[Value] {
    search_result.array_field(&["hits", "hits"]).unwrap_or(&[])
}

/// Document storage on a search engine.
///
/// Every operation is one network round trip and is recorded in statistics
/// under `"{Backend}:{operation}"`. Failures are returned as data.
///
/// # Example
///
/// ```ignore
/// use keel_access::core::{DocumentStore, hits};
/// use serde_json::json;
///
/// async fn example<S: DocumentStore>(store: &S) {
///     let created = store
///         .set_any_item_data("accounts", "all", &json!({"user": "uid1"}))
///         .await;
///     let id = created.id.unwrap();
///
///     let doc = store.get_item_filtered("accounts", "all", &id, &["user"]).await;
///     assert_eq!(doc.str_field(&["_source", "user"]).unwrap(), "uid1");
///
///     let found = store.search_simple("accounts", "user:uid1").await;
///     println!("{} hits", hits(&found).len());
/// }
/// ```
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Returns a human-readable name for this storage backend.
    fn backend_name(&self) -> &'static str;

    /// Returns true if the store answers a root-level read with its cluster
    /// identity.
    async fn test_connection(&self) -> bool;

    /// Writes `data` at an explicit id, replacing any existing document.
    async fn set_item_data(&self, index: &str, doc_type: &str, id: &str, data: &Value)
    -> WriteOutcome;

    /// Writes `data` at an id generated by the store.
    async fn set_any_item_data(&self, index: &str, doc_type: &str, data: &Value) -> CreateOutcome;

    /// Reads a whole document.
    async fn get_item(&self, index: &str, doc_type: &str, id: &str) -> Envelope;

    /// Reads only the listed top-level fields of a document.
    async fn get_item_filtered(
        &self,
        index: &str,
        doc_type: &str,
        id: &str,
        fields: &[&str],
    ) -> Envelope;

    /// Merges `data` into a document, creating it when absent.
    ///
    /// Payloads carrying a `script` or `doc_as_upsert` key are sent as they
    /// are; anything else is wrapped as `{"doc": data, "doc_as_upsert": true}`.
    async fn update_item_data(
        &self,
        index: &str,
        doc_type: &str,
        id: &str,
        data: &Value,
    ) -> WriteOutcome;

    /// Deletes one document.
    async fn delete_item(&self, index: &str, doc_type: &str, id: &str) -> WriteOutcome;

    /// Deletes whatever lives at `path` (an index, a type, a document).
    async fn delete_anything(&self, path: &str) -> WriteOutcome;

    /// Runs a query-string search for `term` under `path`.
    async fn search_simple(&self, path: &str, term: &str) -> Envelope;

    /// Runs a structured query under `path`.
    async fn search_by_json(&self, path: &str, query: &Value) -> Envelope;

    /// Deletes every document under `path` matching a structured query.
    async fn delete_by_json(&self, path: &str, query: &Value) -> Envelope;
}
