//! # keel-access - Instrumented Backend Access Layer
//!
//! This crate gives services one uniform way to talk to their external
//! backends: a search cluster, a key-value store and a remote authentication
//! endpoint. Every call goes through the same HTTP adapter, comes back as a
//! normalized [`Envelope`], and is timed into a shared [`Statistics`]
//! recorder.
//!
//! ## Components
//!
//! - [`envelope`] - normalized success/failure result of every call
//! - [`transport`] - HTTP adapter turning responses into envelopes
//! - [`statistics`] - per-operation hit counts and latency buckets
//! - [`core`] - the [`DocumentStore`](core::DocumentStore) and
//!   [`KeyValueStore`](core::KeyValueStore) contracts
//! - [`backends`] - the Elasticsearch document store and its query builder
//! - [`auth`] - authenticators, with a remote endpoint implementation
//! - [`config`] - CLI and environment configuration
//! - [`document`] - typed access into JSON documents
//!
//! ## Failure model
//!
//! Store operations never return `Err`. A refused connection, a non-2xx
//! status or an unparseable body all come back as an envelope with
//! `is_success() == false`, an optional status code and an optional error
//! message. [`AccessError`] is reserved for construction problems, strict
//! fetches and shape mismatches when reading a successful envelope.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use keel_access::{AccessConfig, AccessState, init_logging};
//! use keel_access::core::DocumentStore;
//! use serde_json::json;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = AccessConfig::from_env()?;
//!     init_logging(&config.log_level);
//!
//!     let state = AccessState::new(config)?;
//!     let store = state.search();
//!
//!     store.set_item_data("accounts", "all", "uid1", &json!({"name": "Ann"})).await;
//!     let doc = store.get_item("accounts", "all", "uid1").await;
//!     if doc.is_success() {
//!         println!("{}", doc.str_field(&["_source", "name"])?);
//!     }
//!
//!     print!("{}", state.statistics().report());
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]

pub mod auth;
pub mod backends;
pub mod config;
pub mod core;
pub mod document;
pub mod envelope;
pub mod error;
pub mod state;
pub mod statistics;
pub mod transport;

// Re-export commonly used types
pub use config::AccessConfig;
pub use envelope::{Envelope, Payload};
pub use error::{AccessError, AccessResult, AuthError, ShapeError, TransportError};
pub use state::AccessState;
pub use statistics::{Bucket, CallScope, Statistics, StatisticsSnapshot};
pub use transport::HttpAdapter;

/// Version of this crate.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Name of this crate.
pub const NAME: &str = env!("CARGO_PKG_NAME");

/// Initializes the tracing subscriber.
///
/// `RUST_LOG` takes precedence; otherwise `level` applies to this crate and
/// to the `keel` binary.
///
/// # Panics
///
/// Panics if a global subscriber is already installed.
pub fn init_logging(level: &str) {
    use tracing_subscriber::{EnvFilter, fmt, prelude::*};

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("keel_access={},keel={}", level, level)));

    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(filter)
        .init();
}
