//! Elasticsearch backend implementation.
//!
//! Documents are addressed by `index/type/id` and reached over plain HTTP
//! through the [`HttpAdapter`](crate::transport::HttpAdapter). Every call is
//! recorded in the shared [`Statistics`](crate::statistics::Statistics) as an
//! internal operation:
//!
//! | Operation                                         | Statistics name            |
//! |---------------------------------------------------|----------------------------|
//! | `set_item_data`, `set_any_item_data`, `write_document` | `Elasticsearch:writeDocument` |
//! | `update_item_data`, `update_document`             | `Elasticsearch:updateDocument` |
//! | `get_item`, `get_item_filtered`                   | `Elasticsearch:getDocument` |
//! | `delete_item`, `delete_document`                  | `Elasticsearch:deleteDocument` |
//! | `delete_anything`, `delete_any`                   | `Elasticsearch:deleteAny`  |
//! | `search_simple`                                   | `Elasticsearch:searchSimple` |
//! | `search_by_json`                                  | `Elasticsearch:searchByJson` |
//! | `delete_by_json`                                  | `Elasticsearch:deleteByJson` |
//! | `put_mapping`                                     | `Elasticsearch:putMapping` |
//! | `test_connection`, `count`, `custom_get`          | `Elasticsearch:customGET`  |
//! | `custom_put`                                      | `Elasticsearch:customPUT`  |
//! | `custom_delete`                                   | `Elasticsearch:customDELETE` |
//!
//! Failed calls get an `-error` suffix.
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use keel_access::backends::elasticsearch::{ElasticsearchBackend, ElasticsearchConfig};
//! use keel_access::core::DocumentStore;
//! use keel_access::statistics::Statistics;
//! use keel_access::transport::TransportConfig;
//!
//! let config = ElasticsearchConfig::with_endpoint("http://localhost:9200");
//! let backend = ElasticsearchBackend::new(config, &TransportConfig::default(), Arc::new(Statistics::default()))?;
//! assert!(backend.test_connection().await);
//! ```

mod admin;
mod backend;
pub mod query_builder;
mod storage;

pub use backend::{ElasticsearchAuth, ElasticsearchBackend, ElasticsearchConfig};
pub use query_builder::QueryElement;
