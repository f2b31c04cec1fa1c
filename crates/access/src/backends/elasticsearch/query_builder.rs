//! Elasticsearch Query DSL builder.
//!
//! Builds `bool` match queries from [`QueryElement`] sequences. The results
//! are plain JSON values ready for
//! [`search_by_json`](crate::core::DocumentStore::search_by_json) or
//! [`delete_by_json`](crate::core::DocumentStore::delete_by_json).

use serde_json::{Value, json};

/// One `match` condition: a field, a value and an optional analyzer.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryElement {
    /// Field name, including any nested path prefix such as `sentences.user`.
    pub field: String,
    /// Value to match.
    pub value: Value,
    /// Analyzer applied to the value, if any.
    pub analyzer: Option<String>,
}

impl QueryElement {
    /// Creates an element without an analyzer.
    pub fn new(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self {
            field: field.into(),
            value: value.into(),
            analyzer: None,
        }
    }

    /// Sets the analyzer. An empty name leaves the element without one.
    pub fn with_analyzer(mut self, analyzer: impl Into<String>) -> Self {
        let analyzer = analyzer.into();
        self.analyzer = (!analyzer.is_empty()).then_some(analyzer);
        self
    }

    /// Returns the `{field: value}` or `{field: {analyzer, query}}` body.
    pub fn to_json(&self) -> Value {
        let condition = match &self.analyzer {
            None => self.value.clone(),
            Some(analyzer) => json!({ "analyzer": analyzer, "query": self.value }),
        };
        let mut body = serde_json::Map::new();
        body.insert(self.field.clone(), condition);
        Value::Object(body)
    }

    /// Returns the element wrapped as a `match` clause.
    pub fn to_match(&self) -> Value {
        json!({ "match": self.to_json() })
    }
}

/// Makes an element list from `(field, value)` pairs.
pub fn query_list<K, V>(pairs: impl IntoIterator<Item = (K, V)>) -> Vec<QueryElement>
where
    K: Into<String>,
    V: Into<Value>,
{
    pairs
        .into_iter()
        .map(|(field, value)| QueryElement::new(field, value))
        .collect()
}

fn match_clauses(elements: &[QueryElement]) -> Vec<Value> {
    elements.iter().map(QueryElement::to_match).collect()
}

fn bool_must(elements: &[QueryElement]) -> Value {
    json!({ "bool": { "must": match_clauses(elements) } })
}

/// `{"query":{"bool":{"must":[...]}}}`; every element must match.
pub fn must_match(elements: &[QueryElement]) -> Value {
    json!({ "query": bool_must(elements) })
}

/// Every `must` element and at least one `should` element must match.
pub fn must_and_should_match(must: &[QueryElement], should: &[QueryElement]) -> Value {
    json!({
        "query": {
            "bool": {
                "must": match_clauses(must),
                "should": match_clauses(should),
                "minimum_should_match": 1
            }
        }
    })
}

/// Must-match query against objects nested under `path`.
///
/// Field names are used as given, so each element should already carry the
/// path prefix (`path = "sentences"`, field `sentences.user`).
pub fn nested_must_match(path: &str, elements: &[QueryElement]) -> Value {
    json!({
        "query": {
            "nested": {
                "path": path,
                "query": bool_must(elements)
            }
        }
    })
}

/// Root-level must clauses plus one nested must clause under `nested_path`,
/// combined in a single `bool.must` array.
pub fn mixed_root_and_nested_must_match(
    root: &[QueryElement],
    nested_path: &str,
    nested: &[QueryElement],
) -> Value {
    let mut must = match_clauses(root);
    must.push(json!({
        "nested": {
            "path": nested_path,
            "query": bool_must(nested)
        }
    }));
    json!({ "query": { "bool": { "must": must } } })
}
