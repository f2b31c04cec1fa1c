//! Common test utilities for the access layer.
//!
//! [`FakeCluster`] is a small axum server that answers the subset of the
//! Elasticsearch REST API the backend uses, a remote authentication endpoint
//! under `/authentication`, and a few fixture routes under `/_fixture` for
//! exercising the HTTP adapter. Every request is recorded.

#![allow(dead_code)]

use std::collections::BTreeMap;
use std::net::SocketAddr;
use std::sync::Arc;

use axum::Json;
use axum::Router;
use axum::extract::State;
use axum::http::{HeaderMap, Method, StatusCode, Uri, header};
use axum::response::{IntoResponse, Response};
use parking_lot::Mutex;
use serde_json::{Map, Value, json};

use keel_access::AccessConfig;

/// Cluster UUID reported by the fake root endpoint.
pub const CLUSTER_UUID: &str = "kx3lR0oJQ0mUe2m0d5CqNA";

/// One request seen by the fake cluster.
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub method: String,
    pub path: String,
    pub query: Option<String>,
    pub authorization: Option<String>,
    pub content_type: Option<String>,
    pub body: String,
}

type DocKey = (String, String, String);

/// In-memory cluster contents.
#[derive(Debug, Default)]
pub struct ClusterState {
    pub indices: BTreeMap<String, Value>,
    pub documents: BTreeMap<DocKey, Value>,
    pub requests: Vec<RecordedRequest>,
    next_id: u64,
}

type Shared = Arc<Mutex<ClusterState>>;

/// A running fake cluster.
pub struct FakeCluster {
    pub addr: SocketAddr,
    pub state: Shared,
}

impl FakeCluster {
    /// Starts the server on an ephemeral local port.
    pub async fn start() -> Self {
        let state: Shared = Arc::new(Mutex::new(ClusterState::default()));
        let app = Router::new()
            .fallback(dispatch)
            .with_state(Arc::clone(&state));

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind fake cluster");
        let addr = listener.local_addr().expect("local addr");
        tokio::spawn(async move {
            axum::serve(listener, app).await.expect("serve fake cluster");
        });

        Self { addr, state }
    }

    /// Base URL, without a trailing slash.
    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// Authentication endpoint URL.
    pub fn auth_url(&self) -> String {
        format!("{}/authentication", self.url())
    }

    /// Configuration pointing every backend at this server.
    pub fn config(&self) -> AccessConfig {
        AccessConfig::for_testing(&self.url(), &self.auth_url())
    }

    /// Stored source of one document.
    pub fn document(&self, index: &str, doc_type: &str, id: &str) -> Option<Value> {
        self.state
            .lock()
            .documents
            .get(&(index.to_string(), doc_type.to_string(), id.to_string()))
            .cloned()
    }

    /// Number of stored documents.
    pub fn document_count(&self) -> usize {
        self.state.lock().documents.len()
    }

    /// The most recent request.
    pub fn last_request(&self) -> Option<RecordedRequest> {
        self.state.lock().requests.last().cloned()
    }

    /// All requests seen so far.
    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.state.lock().requests.clone()
    }
}

// ============================================================================
// Dispatch
// ============================================================================

async fn dispatch(
    State(state): State<Shared>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: String,
) -> Response {
    let header_value = |name: header::HeaderName| {
        headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
    };

    let mut cluster = state.lock();
    cluster.requests.push(RecordedRequest {
        method: method.to_string(),
        path: uri.path().to_string(),
        query: uri.query().map(str::to_string),
        authorization: header_value(header::AUTHORIZATION),
        content_type: header_value(header::CONTENT_TYPE),
        body: body.clone(),
    });

    let params = query_params(uri.query());
    let segments: Vec<&str> = uri.path().split('/').filter(|s| !s.is_empty()).collect();

    match (method.clone(), segments.as_slice()) {
        (Method::GET, []) => ok(json!({
            "name": "fake-node",
            "cluster_name": "keel-test",
            "cluster_uuid": CLUSTER_UUID,
            "version": { "number": "7.17.0" },
            "tagline": "You Know, for Search"
        })),
        (_, ["_fixture", rest @ ..]) => fixture(rest),
        (Method::GET, ["authentication"]) => authentication(&params),
        (_, [scope @ .., "_search"]) => search(&cluster, scope, &params, &body),
        (Method::GET, [scope @ .., "_count"]) => {
            let count = matching(&cluster, scope, &params, "").len();
            ok(json!({ "count": count }))
        }
        (Method::POST, [scope @ .., "_delete_by_query"]) => {
            let keys = matching(&cluster, scope, &params, &body);
            for key in &keys {
                cluster.documents.remove(key);
            }
            ok(json!({ "deleted": keys.len(), "total": keys.len(), "failures": [] }))
        }
        (Method::POST, [index, doc_type, id, "_update"]) => {
            update(&mut cluster, index, doc_type, id, &body)
        }
        (Method::PUT, [index]) => create_index(&mut cluster, index, &body),
        (Method::DELETE, [index]) => delete_index(&mut cluster, index),
        (Method::POST, [index, doc_type]) => {
            cluster.next_id += 1;
            let id = format!("auto{}", cluster.next_id);
            write(&mut cluster, index, doc_type, &id, &body)
        }
        (Method::PUT | Method::POST, [index, doc_type, id]) => {
            write(&mut cluster, index, doc_type, id, &body)
        }
        (Method::GET, [index, doc_type, id]) => read(&cluster, index, doc_type, id, &params),
        (Method::DELETE, [index, doc_type, id]) => {
            let key = doc_key(index, doc_type, id);
            let found = cluster.documents.remove(&key).is_some();
            let status = if found {
                StatusCode::OK
            } else {
                StatusCode::NOT_FOUND
            };
            let result = if found { "deleted" } else { "not_found" };
            respond(
                status,
                json!({ "_index": index, "_type": doc_type, "_id": id, "result": result }),
            )
        }
        _ => respond(
            StatusCode::BAD_REQUEST,
            json!({ "error": format!("unsupported {} {}", method, uri.path()), "status": 400 }),
        ),
    }
}

fn ok(body: Value) -> Response {
    respond(StatusCode::OK, body)
}

fn respond(status: StatusCode, body: Value) -> Response {
    (status, Json(body)).into_response()
}

fn query_params(query: Option<&str>) -> BTreeMap<String, String> {
    query
        .map(|q| url::form_urlencoded::parse(q.as_bytes()).into_owned().collect())
        .unwrap_or_default()
}

fn doc_key(index: &str, doc_type: &str, id: &str) -> DocKey {
    (index.to_string(), doc_type.to_string(), id.to_string())
}

fn parse_body(body: &str) -> Result<Value, Response> {
    serde_json::from_str(body).map_err(|e| {
        respond(
            StatusCode::BAD_REQUEST,
            json!({ "error": { "type": "parse_exception", "reason": e.to_string() }, "status": 400 }),
        )
    })
}

// ============================================================================
// Fixtures
// ============================================================================

fn fixture(rest: &[&str]) -> Response {
    match rest {
        ["text"] => (StatusCode::OK, "OK plain").into_response(),
        ["array"] => (StatusCode::OK, r#"[{"a":1},{"a":2}]"#).into_response(),
        ["broken"] => (StatusCode::OK, r#"{"a":"#).into_response(),
        ["bom"] => (StatusCode::OK, "\u{feff}{\"a\":1}\r\n").into_response(),
        ["empty"] => StatusCode::NOT_FOUND.into_response(),
        ["echo"] => ok(json!({ "echo": true })),
        ["status", code] => {
            let status = code
                .parse::<u16>()
                .ok()
                .and_then(|c| StatusCode::from_u16(c).ok())
                .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
            respond(status, json!({ "error": "boom" }))
        }
        _ => StatusCode::NOT_FOUND.into_response(),
    }
}

// ============================================================================
// Authentication
// ============================================================================

fn authentication(params: &BTreeMap<String, String>) -> Response {
    let key = params.get("KEY").map(String::as_str).unwrap_or_default();
    let (user, password) = key.split_once(';').unwrap_or((key, ""));

    match (user, password) {
        ("uid1", "pwd") => ok(json!({
            "result": "success",
            "access_level": "3",
            "basic_info": {
                "Email": "ann@example.com",
                "Phone": null,
                "language": "en",
                "name": { "first": "Ann" },
                "roles": ["developer", "tester", "astronaut"],
                "team": "core"
            }
        })),
        ("uid2", "pwd") => ok(json!({ "result": "success", "access_level": 0 })),
        ("uid3", "pwd") => ok(json!({
            "result": "success",
            "basic_info": { "roles": "developer" }
        })),
        ("down", _) => (StatusCode::SERVICE_UNAVAILABLE, "maintenance").into_response(),
        _ => ok(json!({ "result": "fail" })),
    }
}

// ============================================================================
// Index and document operations
// ============================================================================

fn create_index(cluster: &mut ClusterState, index: &str, body: &str) -> Response {
    if cluster.indices.contains_key(index) {
        return respond(
            StatusCode::BAD_REQUEST,
            json!({
                "error": { "type": "resource_already_exists_exception", "index": index },
                "status": 400
            }),
        );
    }
    let mapping = if body.trim().is_empty() {
        json!({})
    } else {
        match parse_body(body) {
            Ok(mapping) => mapping,
            Err(response) => return response,
        }
    };
    cluster.indices.insert(index.to_string(), mapping);
    ok(json!({ "acknowledged": true, "shards_acknowledged": true, "index": index }))
}

fn delete_index(cluster: &mut ClusterState, index: &str) -> Response {
    let had_index = cluster.indices.remove(index).is_some();
    let before = cluster.documents.len();
    cluster.documents.retain(|(i, _, _), _| i != index);
    if had_index || cluster.documents.len() != before {
        ok(json!({ "acknowledged": true }))
    } else {
        respond(
            StatusCode::NOT_FOUND,
            json!({ "error": { "type": "index_not_found_exception", "index": index }, "status": 404 }),
        )
    }
}

fn write(cluster: &mut ClusterState, index: &str, doc_type: &str, id: &str, body: &str) -> Response {
    let source = match parse_body(body) {
        Ok(source) => source,
        Err(response) => return response,
    };
    cluster.indices.entry(index.to_string()).or_insert_with(|| json!({}));
    let existed = cluster
        .documents
        .insert(doc_key(index, doc_type, id), source)
        .is_some();
    let (status, result) = if existed {
        (StatusCode::OK, "updated")
    } else {
        (StatusCode::CREATED, "created")
    };
    respond(
        status,
        json!({ "_index": index, "_type": doc_type, "_id": id, "_version": 1, "result": result }),
    )
}

fn read(
    cluster: &ClusterState,
    index: &str,
    doc_type: &str,
    id: &str,
    params: &BTreeMap<String, String>,
) -> Response {
    let Some(source) = cluster.documents.get(&doc_key(index, doc_type, id)) else {
        return respond(
            StatusCode::NOT_FOUND,
            json!({ "_index": index, "_type": doc_type, "_id": id, "found": false }),
        );
    };

    let source = match params.get("_source") {
        Some(filter) => {
            let fields: Vec<&str> = filter.split(',').collect();
            let filtered: Map<String, Value> = source
                .as_object()
                .into_iter()
                .flatten()
                .filter(|(k, _)| fields.contains(&k.as_str()))
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect();
            Value::Object(filtered)
        }
        None => source.clone(),
    };

    ok(json!({
        "_index": index,
        "_type": doc_type,
        "_id": id,
        "_version": 1,
        "found": true,
        "_source": source
    }))
}

fn update(cluster: &mut ClusterState, index: &str, doc_type: &str, id: &str, body: &str) -> Response {
    let request = match parse_body(body) {
        Ok(request) => request,
        Err(response) => return response,
    };
    let Some(partial) = request.get("doc").and_then(Value::as_object) else {
        return respond(
            StatusCode::BAD_REQUEST,
            json!({ "error": { "type": "action_request_validation_exception" }, "status": 400 }),
        );
    };
    let upsert = request
        .get("doc_as_upsert")
        .and_then(Value::as_bool)
        .unwrap_or(false);

    let key = doc_key(index, doc_type, id);
    if let Some(existing) = cluster.documents.get_mut(&key).and_then(Value::as_object_mut) {
        for (k, v) in partial {
            existing.insert(k.clone(), v.clone());
        }
        return ok(json!({ "_index": index, "_type": doc_type, "_id": id, "result": "updated" }));
    }
    if !upsert {
        return respond(
            StatusCode::NOT_FOUND,
            json!({ "error": { "type": "document_missing_exception" }, "status": 404 }),
        );
    }
    cluster.documents.insert(key, Value::Object(partial.clone()));
    ok(json!({ "_index": index, "_type": doc_type, "_id": id, "result": "created" }))
}

// ============================================================================
// Search
// ============================================================================

fn search(
    cluster: &ClusterState,
    scope: &[&str],
    params: &BTreeMap<String, String>,
    body: &str,
) -> Response {
    if !body.trim().is_empty() {
        if let Err(response) = parse_body(body) {
            return response;
        }
    }
    let hits: Vec<Value> = matching(cluster, scope, params, body)
        .into_iter()
        .filter_map(|key| {
            cluster.documents.get(&key).map(|source| {
                json!({
                    "_index": key.0,
                    "_type": key.1,
                    "_id": key.2,
                    "_score": 1.0,
                    "_source": source
                })
            })
        })
        .collect();

    let total = hits.len();
    let max_score = if hits.is_empty() { Value::Null } else { json!(1.0) };
    ok(json!({
        "took": 1,
        "timed_out": false,
        "hits": {
            "total": { "value": total, "relation": "eq" },
            "max_score": max_score,
            "hits": hits
        }
    }))
}

/// Keys of every document in `scope` that matches the `q` parameter or the
/// JSON query in `body`.
fn matching(
    cluster: &ClusterState,
    scope: &[&str],
    params: &BTreeMap<String, String>,
    body: &str,
) -> Vec<DocKey> {
    let query = serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|b| b.get("query").cloned());

    cluster
        .documents
        .iter()
        .filter(|((index, doc_type, _), _)| match scope {
            [] => true,
            [i] => i == index,
            [i, t, ..] => i == index && t == doc_type,
        })
        .filter(|(_, source)| match params.get("q") {
            Some(q) => matches_q(source, q),
            None => true,
        })
        .filter(|(_, source)| match &query {
            Some(query) => matches_query(source, query),
            None => true,
        })
        .map(|(key, _)| key.clone())
        .collect()
}

fn matches_q(source: &Value, q: &str) -> bool {
    if q == "*" {
        return true;
    }
    match q.split_once(':') {
        Some((field, value)) => lookup(source, field)
            .iter()
            .any(|found| value_matches(found, &Value::String(value.to_string()))),
        None => source
            .as_object()
            .into_iter()
            .flatten()
            .any(|(_, found)| value_matches(found, &Value::String(q.to_string()))),
    }
}

fn matches_query(source: &Value, query: &Value) -> bool {
    if query.get("match_all").is_some() {
        return true;
    }
    if let Some(clause) = query.get("match").and_then(Value::as_object) {
        return clause.iter().all(|(field, condition)| {
            let expected = condition.get("query").unwrap_or(condition);
            lookup(source, field)
                .iter()
                .any(|found| value_matches(found, expected))
        });
    }
    if let Some(nested) = query.get("nested") {
        let path = nested.get("path").and_then(Value::as_str).unwrap_or_default();
        let inner = nested.get("query").cloned().unwrap_or(Value::Null);
        let elements = match source.get(path) {
            Some(Value::Array(items)) => items.clone(),
            Some(other) => vec![other.clone()],
            None => Vec::new(),
        };
        return elements.into_iter().any(|element| {
            let mut wrapped = Map::new();
            wrapped.insert(path.to_string(), element);
            matches_query(&Value::Object(wrapped), &inner)
        });
    }
    if let Some(boolean) = query.get("bool") {
        let clauses = |name: &str| {
            boolean
                .get(name)
                .and_then(Value::as_array)
                .cloned()
                .unwrap_or_default()
        };
        let must_ok = clauses("must").iter().all(|c| matches_query(source, c));
        let should = clauses("should");
        let minimum = boolean
            .get("minimum_should_match")
            .and_then(Value::as_u64)
            .unwrap_or(0) as usize;
        let should_ok = should.iter().filter(|c| matches_query(source, c)).count() >= minimum;
        return must_ok && should_ok;
    }
    false
}

/// Values at a dotted path, flattening arrays along the way.
fn lookup(source: &Value, path: &str) -> Vec<Value> {
    let mut current = vec![source.clone()];
    for segment in path.split('.') {
        current = current
            .into_iter()
            .flat_map(|value| match value {
                Value::Array(items) => items,
                other => vec![other],
            })
            .filter_map(|value| value.get(segment).cloned())
            .collect();
    }
    current
        .into_iter()
        .flat_map(|value| match value {
            Value::Array(items) => items,
            other => vec![other],
        })
        .collect()
}

fn value_matches(found: &Value, expected: &Value) -> bool {
    match (found, expected) {
        (Value::String(found), Value::String(expected)) => {
            let expected = expected.to_lowercase();
            found.to_lowercase() == expected
                || found
                    .split_whitespace()
                    .any(|token| token.to_lowercase() == expected)
        }
        (Value::String(found), other) => found == &other.to_string(),
        (found, Value::String(expected)) => &found.to_string() == expected,
        (found, expected) => found == expected,
    }
}
