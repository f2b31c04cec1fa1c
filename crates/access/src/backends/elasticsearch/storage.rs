//! DocumentStore implementation for Elasticsearch.

use async_trait::async_trait;
use serde_json::{Value, json};

use crate::core::{CreateOutcome, DocumentStore, ResultCode, WriteOutcome};
use crate::envelope::Envelope;

use super::backend::ElasticsearchBackend;

/// Wraps a partial document as an upsert unless it already carries its own
/// update instructions.
pub(crate) fn upsert_body(data: &Value) -> Value {
    let has_instructions = data.get("script").is_some() || data.get("doc_as_upsert").is_some();
    if has_instructions {
        data.clone()
    } else {
        json!({ "doc": data, "doc_as_upsert": true })
    }
}

/// Joins field names into a `_source` filter with all whitespace removed.
pub(crate) fn source_filter(fields: &[&str]) -> String {
    fields
        .iter()
        .map(|field| field.chars().filter(|c| !c.is_whitespace()).collect::<String>())
        .filter(|field| !field.is_empty())
        .collect::<Vec<_>>()
        .join(",")
}

fn encode_query_term(term: &str) -> String {
    url::form_urlencoded::byte_serialize(term.as_bytes()).collect()
}

impl ElasticsearchBackend {
    // ========================================================================
    // Raw calls
    // ========================================================================

    async fn put_document(&self, index: &str, doc_type: &str, id: &str, data: &Value) -> Envelope {
        let url = self.url(&Self::document_path(index, doc_type, id));
        let body = data.to_string();
        self.instrumented("writeDocument", self.http.put(&url, &body, self.headers()))
            .await
    }

    async fn post_document(&self, index: &str, doc_type: &str, data: &Value) -> Envelope {
        let url = self.url(&format!("{}/{}", index, doc_type));
        let body = data.to_string();
        self.instrumented("writeDocument", self.http.post(&url, &body, self.headers()))
            .await
    }

    async fn post_update(&self, index: &str, doc_type: &str, id: &str, data: &Value) -> Envelope {
        let url = self.url(&format!("{}/_update", Self::document_path(index, doc_type, id)));
        let body = upsert_body(data).to_string();
        self.instrumented("updateDocument", self.http.post(&url, &body, self.headers()))
            .await
    }

    async fn get_document(&self, path: &str) -> Envelope {
        let url = self.url(path);
        self.instrumented("getDocument", self.http.get(&url, self.headers()))
            .await
    }

    async fn delete_path(&self, operation: &str, path: &str) -> Envelope {
        let url = self.url(path);
        self.instrumented(operation, self.http.delete(&url, self.headers()))
            .await
    }

    // ========================================================================
    // Result-code variants
    // ========================================================================

    /// Writes `data` at an explicit id.
    pub async fn write_document(
        &self,
        index: &str,
        doc_type: &str,
        id: &str,
        data: &Value,
    ) -> ResultCode {
        ResultCode::from_envelope(&self.put_document(index, doc_type, id, data).await)
    }

    /// Updates or creates the document at an explicit id.
    pub async fn update_document(
        &self,
        index: &str,
        doc_type: &str,
        id: &str,
        data: &Value,
    ) -> ResultCode {
        ResultCode::from_envelope(&self.post_update(index, doc_type, id, data).await)
    }

    /// Deletes one document.
    pub async fn delete_document(&self, index: &str, doc_type: &str, id: &str) -> ResultCode {
        let path = Self::document_path(index, doc_type, id);
        ResultCode::from_envelope(&self.delete_path("deleteDocument", &path).await)
    }

    /// Deletes whatever lives at `path`.
    pub async fn delete_any(&self, path: &str) -> ResultCode {
        ResultCode::from_envelope(&self.delete_path("deleteAny", path).await)
    }
}

#[async_trait]
impl DocumentStore for ElasticsearchBackend {
    fn backend_name(&self) -> &'static str {
        "elasticsearch"
    }

    async fn test_connection(&self) -> bool {
        let root = self.custom_get("", "", "").await;
        root.is_success() && root.contains_key("cluster_uuid")
    }

    async fn set_item_data(
        &self,
        index: &str,
        doc_type: &str,
        id: &str,
        data: &Value,
    ) -> WriteOutcome {
        WriteOutcome::from_envelope(self.put_document(index, doc_type, id, data).await)
    }

    async fn set_any_item_data(&self, index: &str, doc_type: &str, data: &Value) -> CreateOutcome {
        CreateOutcome::from_envelope(self.post_document(index, doc_type, data).await)
    }

    async fn get_item(&self, index: &str, doc_type: &str, id: &str) -> Envelope {
        self.get_document(&Self::document_path(index, doc_type, id))
            .await
    }

    async fn get_item_filtered(
        &self,
        index: &str,
        doc_type: &str,
        id: &str,
        fields: &[&str],
    ) -> Envelope {
        let filter = source_filter(fields);
        if filter.is_empty() {
            return self.get_item(index, doc_type, id).await;
        }
        let path = format!(
            "{}?_source={}",
            Self::document_path(index, doc_type, id),
            filter
        );
        self.get_document(&path).await
    }

    async fn update_item_data(
        &self,
        index: &str,
        doc_type: &str,
        id: &str,
        data: &Value,
    ) -> WriteOutcome {
        WriteOutcome::from_envelope(self.post_update(index, doc_type, id, data).await)
    }

    async fn delete_item(&self, index: &str, doc_type: &str, id: &str) -> WriteOutcome {
        let path = Self::document_path(index, doc_type, id);
        WriteOutcome::from_envelope(self.delete_path("deleteDocument", &path).await)
    }

    async fn delete_anything(&self, path: &str) -> WriteOutcome {
        WriteOutcome::from_envelope(self.delete_path("deleteAny", path).await)
    }

    async fn search_simple(&self, path: &str, term: &str) -> Envelope {
        let url = format!(
            "{}?q={}",
            self.url(&Self::api_path(path, "_search")),
            encode_query_term(term)
        );
        self.instrumented("searchSimple", self.http.get(&url, self.headers()))
            .await
    }

    async fn search_by_json(&self, path: &str, query: &Value) -> Envelope {
        let url = self.url(&Self::api_path(path, "_search"));
        let body = query.to_string();
        self.instrumented("searchByJson", self.http.post(&url, &body, self.headers()))
            .await
    }

    async fn delete_by_json(&self, path: &str, query: &Value) -> Envelope {
        let url = self.url(&Self::api_path(path, "_delete_by_query"));
        let body = query.to_string();
        self.instrumented("deleteByJson", self.http.post(&url, &body, self.headers()))
            .await
    }
}
