//! Access layer configuration.
//!
//! [`AccessConfig`] gathers the settings of every component. It is built once
//! at startup, from command line arguments with [`clap::Parser::parse`], from
//! the environment with [`AccessConfig::from_env`], or programmatically, and
//! is then passed by reference to whatever needs it.
//!
//! | Variable | Default | Description |
//! |----------|---------|-------------|
//! | `KEEL_LOG_LEVEL` | info | Log level (error, warn, info, debug, trace) |
//! | `KEEL_SEARCH_ENDPOINT` | http://localhost:8011 | Search cluster URL |
//! | `KEEL_SEARCH_USERNAME` / `KEEL_SEARCH_PASSWORD` | | Basic auth for the cluster |
//! | `KEEL_SEARCH_TOKEN` | | Bearer token for the cluster |
//! | `KEEL_AUTH_MODULE` | remote | Authentication module |
//! | `KEEL_AUTH_ENDPOINT` | http://localhost:8001/authentication | Remote auth endpoint |
//! | `KEEL_AUTH_CLIENT` | desktop_browser_v1.0 | Default client name |
//! | `KEEL_KV_REGION` | eu-central-1 | Key-value store region or URL |
//! | `KEEL_KV_ACCESS` / `KEEL_KV_SECRET` | | Key-value store credentials |
//! | `KEEL_CONNECT_TIMEOUT_MS` | 5000 | Connect timeout |
//! | `KEEL_REQUEST_TIMEOUT_MS` | 30000 | Request timeout |
//! | `KEEL_USER_AGENT` | keel-access/<version> | User-Agent header |
//! | `KEEL_INTERNAL_THRESHOLD_MS` | 2000 | Slow internal call threshold |
//! | `KEEL_EXTERNAL_THRESHOLD_MS` | 3000 | Slow external call threshold |

use clap::Parser;
use serde::{Deserialize, Serialize};

use crate::auth::AuthConfig;
use crate::backends::elasticsearch::ElasticsearchConfig;
use crate::core::KeyValueConfig;
use crate::statistics::StatisticsConfig;
use crate::transport::TransportConfig;

const LOG_LEVELS: [&str; 5] = ["error", "warn", "info", "debug", "trace"];

/// Instrumented access to search, key-value and authentication backends.
#[derive(Debug, Clone, Parser, Serialize, Deserialize)]
#[command(name = "keel-access")]
pub struct AccessConfig {
    /// Log level (error, warn, info, debug, trace).
    #[arg(long, env = "KEEL_LOG_LEVEL", default_value = "info")]
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Search cluster settings.
    #[command(flatten)]
    #[serde(default)]
    pub search: ElasticsearchConfig,

    /// Authentication settings.
    #[command(flatten)]
    #[serde(default)]
    pub auth: AuthConfig,

    /// Key-value store settings.
    #[command(flatten)]
    #[serde(default)]
    pub key_value: KeyValueConfig,

    /// HTTP transport settings.
    #[command(flatten)]
    #[serde(default)]
    pub transport: TransportConfig,

    /// Statistics thresholds.
    #[command(flatten)]
    #[serde(default)]
    pub statistics: StatisticsConfig,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for AccessConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            search: ElasticsearchConfig::default(),
            auth: AuthConfig::default(),
            key_value: KeyValueConfig::default(),
            transport: TransportConfig::default(),
            statistics: StatisticsConfig::default(),
        }
    }
}

impl AccessConfig {
    /// Creates a configuration from environment variables and defaults only,
    /// ignoring the process arguments.
    ///
    /// A variable that does not parse fails the whole call; the error names
    /// the offending setting.
    pub fn from_env() -> Result<Self, clap::Error> {
        Self::try_parse_from([env!("CARGO_PKG_NAME")])
    }

    /// Validates the configuration and returns every problem found.
    pub fn validate(&self) -> Result<(), Vec<String>> {
        let mut errors = Vec::new();

        if !LOG_LEVELS.contains(&self.log_level.to_lowercase().as_str()) {
            errors.push(format!(
                "Unknown log level '{}', expected one of {}",
                self.log_level,
                LOG_LEVELS.join(", ")
            ));
        }

        errors.extend(self.search.validate());
        errors.extend(self.auth.validate());

        if self.key_value.region.trim().is_empty() {
            errors.push("Key-value region cannot be empty".to_string());
        }

        if self.transport.connect_timeout_ms == 0 {
            errors.push("Connect timeout cannot be 0".to_string());
        }

        if self.transport.request_timeout_ms == 0 {
            errors.push("Request timeout cannot be 0".to_string());
        }

        if self.statistics.internal_threshold_ms == 0 || self.statistics.external_threshold_ms == 0 {
            errors.push("Statistics thresholds cannot be 0".to_string());
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }

    /// Creates a configuration pointing at local test endpoints, with short
    /// timeouts.
    pub fn for_testing(search_endpoint: &str, auth_endpoint: &str) -> Self {
        Self {
            log_level: "debug".to_string(),
            search: ElasticsearchConfig::with_endpoint(search_endpoint),
            auth: AuthConfig {
                auth_endpoint: auth_endpoint.to_string(),
                ..Default::default()
            },
            transport: TransportConfig {
                connect_timeout_ms: 1000,
                request_timeout_ms: 5000,
                ..Default::default()
            },
            ..Default::default()
        }
    }
}
