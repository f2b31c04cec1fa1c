//! Elasticsearch backend implementation.

use std::fmt::Debug;
use std::future::Future;
use std::sync::Arc;
use std::time::Instant;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use clap::Args;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::core::BackendKind;
use crate::envelope::Envelope;
use crate::error::TransportError;
use crate::statistics::{CallScope, Statistics};
use crate::transport::{Headers, HttpAdapter, TransportConfig};

/// Authentication configuration for Elasticsearch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ElasticsearchAuth {
    /// Basic username/password authentication.
    Basic {
        /// The username for basic auth.
        username: String,
        /// The password for basic auth.
        password: String,
    },
    /// Bearer token authentication.
    Bearer {
        /// The bearer token.
        token: String,
    },
}

impl ElasticsearchAuth {
    /// Returns the `Authorization` header value.
    pub fn header_value(&self) -> String {
        match self {
            ElasticsearchAuth::Basic { username, password } => {
                format!("Basic {}", STANDARD.encode(format!("{}:{}", username, password)))
            }
            ElasticsearchAuth::Bearer { token } => format!("Bearer {}", token),
        }
    }
}

/// Configuration for the Elasticsearch backend.
#[derive(Debug, Clone, Args, Serialize, Deserialize)]
pub struct ElasticsearchConfig {
    /// Cluster URL (default: `http://localhost:8011`).
    #[arg(
        long = "search-endpoint",
        env = "KEEL_SEARCH_ENDPOINT",
        default_value = "http://localhost:8011"
    )]
    #[serde(default = "default_endpoint")]
    pub endpoint: String,

    /// Username for basic auth.
    #[arg(long = "search-username", env = "KEEL_SEARCH_USERNAME")]
    #[serde(default)]
    pub username: Option<String>,

    /// Password for basic auth.
    #[arg(long = "search-password", env = "KEEL_SEARCH_PASSWORD", hide_env_values = true)]
    #[serde(default)]
    pub password: Option<String>,

    /// Bearer token, used instead of basic auth.
    #[arg(long = "search-token", env = "KEEL_SEARCH_TOKEN", hide_env_values = true)]
    #[serde(default)]
    pub token: Option<String>,
}

fn default_endpoint() -> String {
    "http://localhost:8011".to_string()
}

impl Default for ElasticsearchConfig {
    fn default() -> Self {
        Self {
            endpoint: default_endpoint(),
            username: None,
            password: None,
            token: None,
        }
    }
}

impl ElasticsearchConfig {
    /// Creates a configuration for `endpoint` without credentials.
    pub fn with_endpoint(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            ..Default::default()
        }
    }

    /// Returns the configured credentials. A token wins over basic auth.
    pub fn auth(&self) -> Option<ElasticsearchAuth> {
        if let Some(token) = &self.token {
            return Some(ElasticsearchAuth::Bearer {
                token: token.clone(),
            });
        }
        self.username
            .as_ref()
            .map(|username| ElasticsearchAuth::Basic {
                username: username.clone(),
                password: self.password.clone().unwrap_or_default(),
            })
    }

    /// Returns every problem with this configuration.
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();

        match url::Url::parse(&self.endpoint) {
            Ok(url) if url.scheme() != "http" && url.scheme() != "https" => {
                errors.push(format!(
                    "Search endpoint must use http or https, got '{}'",
                    url.scheme()
                ));
            }
            Ok(_) => {}
            Err(e) => {
                errors.push(format!("Invalid search endpoint '{}': {}", self.endpoint, e));
            }
        }

        if self.password.is_some() && self.username.is_none() {
            errors.push("Search password is set without a username".to_string());
        }

        if self.token.is_some() && self.username.is_some() {
            errors.push("Set either a search token or a search username, not both".to_string());
        }

        errors
    }
}

/// Elasticsearch document store.
///
/// Talks to a single cluster endpoint through the [`HttpAdapter`] and records
/// every call as an internal operation named `Elasticsearch:<op>`, or
/// `Elasticsearch:<op>-error` when the call failed.
pub struct ElasticsearchBackend {
    /// The HTTP adapter.
    pub(crate) http: HttpAdapter,
    /// Configuration.
    config: ElasticsearchConfig,
    /// Authorization header, when credentials are configured.
    headers: Option<Headers>,
    /// Shared call statistics.
    statistics: Arc<Statistics>,
}

impl Debug for ElasticsearchBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ElasticsearchBackend")
            .field("endpoint", &self.config.endpoint)
            .field("authenticated", &self.headers.is_some())
            .finish_non_exhaustive()
    }
}

impl ElasticsearchBackend {
    /// Creates a new backend with its own HTTP adapter.
    pub fn new(
        config: ElasticsearchConfig,
        transport: &TransportConfig,
        statistics: Arc<Statistics>,
    ) -> Result<Self, TransportError> {
        let http = HttpAdapter::new(transport)?;
        Ok(Self::with_adapter(config, http, statistics))
    }

    /// Creates a new backend around an existing HTTP adapter.
    pub fn with_adapter(
        config: ElasticsearchConfig,
        http: HttpAdapter,
        statistics: Arc<Statistics>,
    ) -> Self {
        let headers = config.auth().map(|auth| {
            Headers::from([("Authorization".to_string(), auth.header_value())])
        });

        info!(
            endpoint = %config.endpoint,
            authenticated = headers.is_some(),
            "Elasticsearch backend initialized"
        );

        Self {
            http,
            config,
            headers,
            statistics,
        }
    }

    /// Returns the backend configuration.
    pub fn config(&self) -> &ElasticsearchConfig {
        &self.config
    }

    /// Returns the shared statistics recorder.
    pub fn statistics(&self) -> &Arc<Statistics> {
        &self.statistics
    }

    /// Returns the backend kind.
    pub fn kind(&self) -> BackendKind {
        BackendKind::Elasticsearch
    }

    /// Returns the full URL for a path below the cluster endpoint.
    pub fn url(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.config.endpoint.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }

    /// Returns `index/type/id`.
    pub(crate) fn document_path(index: &str, doc_type: &str, id: &str) -> String {
        format!("{}/{}/{}", index, doc_type, id)
    }

    /// Returns `path/api`, or just `api` for an empty path.
    pub(crate) fn api_path(path: &str, api: &str) -> String {
        let path = path.trim().trim_end_matches('/');
        if path.is_empty() {
            api.to_string()
        } else {
            format!("{}/{}", path, api)
        }
    }

    /// Returns the headers sent with every request.
    pub(crate) fn headers(&self) -> Option<&Headers> {
        self.headers.as_ref()
    }

    /// Awaits `call` and records it under `operation`.
    pub(crate) async fn instrumented<F>(&self, operation: &str, call: F) -> Envelope
    where
        F: Future<Output = Envelope>,
    {
        let started = Instant::now();
        let envelope = call.await;
        let failed = !envelope.is_success();
        let name = self.kind().operation_name(operation, failed);
        self.statistics.record(&name, started, CallScope::Internal);

        if failed {
            warn!(
                operation,
                endpoint = %self.config.endpoint,
                error = %envelope.error_summary(),
                "Elasticsearch call failed"
            );
        }

        envelope
    }
}
