//! Index administration and raw passthrough calls.

use serde_json::Value;

use crate::core::ResultCode;
use crate::envelope::Envelope;

use super::backend::ElasticsearchBackend;

/// Appends a trailing slash to non-empty paths.
fn directory(path: &str) -> String {
    let path = path.trim();
    if path.is_empty() || path.ends_with('/') {
        path.to_string()
    } else {
        format!("{}/", path)
    }
}

impl ElasticsearchBackend {
    /// Creates `index` with the given settings and mappings.
    pub async fn put_mapping(&self, index: &str, mapping: &Value) -> ResultCode {
        let url = self.url(index);
        let body = mapping.to_string();
        let envelope = self
            .instrumented("putMapping", self.http.put(&url, &body, self.headers()))
            .await;
        ResultCode::from_envelope(&envelope)
    }

    /// Issues `GET /{path}/{api}{params}`.
    ///
    /// `api` is an endpoint such as `_search` or `_count` and may be empty;
    /// `params` is a raw, already-encoded fragment such as `?q=user:uid1`.
    pub async fn custom_get(&self, path: &str, api: &str, params: &str) -> Envelope {
        let url = self.url(&format!("{}{}{}", directory(path), api.trim(), params.trim()));
        self.instrumented("customGET", self.http.get(&url, self.headers()))
            .await
    }

    /// Issues `PUT /{path}` with `data` as the body.
    pub async fn custom_put(&self, path: &str, data: &Value) -> Envelope {
        let url = self.url(path.trim());
        let body = data.to_string();
        self.instrumented("customPUT", self.http.put(&url, &body, self.headers()))
            .await
    }

    /// Issues `DELETE /{path}/`.
    pub async fn custom_delete(&self, path: &str) -> Envelope {
        let url = self.url(&directory(path));
        self.instrumented("customDELETE", self.http.delete(&url, self.headers()))
            .await
    }

    /// Returns the number of documents under `path`, if the cluster answered
    /// with a count.
    pub async fn count(&self, path: &str) -> Option<i64> {
        self.custom_get(path, "_count", "")
            .await
            .i64_field(&["count"])
            .ok()
    }
}
