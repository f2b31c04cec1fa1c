//! Key-value store contract.
//!
//! Items live in tables and are addressed by a primary index (name and
//! value). Each item holds named keys whose values may be strings, numbers,
//! mappings or lists. No implementation ships with this crate; the contract
//! and its connection settings are shared by whatever backend is plugged in.

use async_trait::async_trait;
use clap::Args;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::envelope::Envelope;

const SERVICE: &str = "dynamodb";

/// Connection settings for a DynamoDB-compatible key-value store.
#[derive(Debug, Clone, Args, Serialize, Deserialize)]
pub struct KeyValueConfig {
    /// Region name, or a full `http(s)://` endpoint for a local instance.
    #[arg(long = "kv-region", env = "KEEL_KV_REGION", default_value = "eu-central-1")]
    #[serde(default = "default_region")]
    pub region: String,

    /// Access key id. Arbitrary for a local instance.
    #[arg(long = "kv-access", env = "KEEL_KV_ACCESS")]
    #[serde(default)]
    pub access: Option<String>,

    /// Secret access key. Arbitrary for a local instance.
    #[arg(long = "kv-secret", env = "KEEL_KV_SECRET")]
    #[serde(default)]
    pub secret: Option<String>,
}

fn default_region() -> String {
    "eu-central-1".to_string()
}

impl Default for KeyValueConfig {
    fn default() -> Self {
        Self {
            region: default_region(),
            access: None,
            secret: None,
        }
    }
}

impl KeyValueConfig {
    /// Service name used in host derivation.
    pub fn service(&self) -> &'static str {
        SERVICE
    }

    /// Returns the host: the region itself when it is already a URL,
    /// `dynamodb.<region>.amazonaws.com` otherwise.
    pub fn host(&self) -> String {
        if self.region.starts_with("http") {
            self.region.clone()
        } else {
            format!("{}.{}.amazonaws.com", SERVICE, self.region)
        }
    }

    /// Returns the endpoint URL for the configured region.
    pub fn endpoint(&self) -> String {
        let host = self.host();
        if host.starts_with("http") {
            host
        } else {
            format!("https://{}", host)
        }
    }
}

/// Key-value storage addressed by table and primary or secondary index.
///
/// Values are dynamic: a string, a number, a mapping or a list, all carried
/// as [`serde_json::Value`].
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    /// Returns a human-readable name for this storage backend.
    fn backend_name(&self) -> &'static str;

    /// Returns true if the store is reachable.
    async fn test_connection(&self) -> bool;

    /// Reads `keys` from the item at the given primary index.
    async fn get_values(
        &self,
        table: &str,
        prime_index_name: &str,
        prime_index_value: &str,
        keys: &[&str],
    ) -> Envelope;

    /// Reads `keys` from the items at the given secondary index.
    async fn get_values_by_secondary_index(
        &self,
        table: &str,
        secondary_index_name: &str,
        secondary_index_value: &str,
        keys: &[&str],
    ) -> Envelope;

    /// Sets `key` to `value` on the item at the given primary index.
    async fn set_value(
        &self,
        table: &str,
        prime_index_name: &str,
        prime_index_value: &str,
        key: &str,
        value: Value,
    ) -> Envelope;

    /// Removes `key` from the item at the given primary index.
    async fn delete_key(
        &self,
        table: &str,
        prime_index_name: &str,
        prime_index_value: &str,
        key: &str,
    ) -> Envelope;

    /// Removes the whole item at the given primary index.
    async fn delete_index(&self, table: &str, prime_index_name: &str, prime_index_value: &str)
    -> Envelope;
}
