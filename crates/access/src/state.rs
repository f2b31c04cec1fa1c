//! Shared access layer state.
//!
//! [`AccessState`] wires one [`Statistics`] recorder and one [`HttpAdapter`]
//! into every configured backend so that callers hold a single handle.

use std::sync::Arc;

use crate::auth::{self, Authenticator};
use crate::backends::elasticsearch::ElasticsearchBackend;
use crate::config::AccessConfig;
use crate::error::AccessResult;
use crate::statistics::Statistics;
use crate::transport::HttpAdapter;

/// Handles to every configured backend.
///
/// # Example
///
/// ```rust,ignore
/// use keel_access::{AccessConfig, AccessState};
/// use keel_access::core::DocumentStore;
///
/// let state = AccessState::new(AccessConfig::from_env()?)?;
/// if state.search().test_connection().await {
///     println!("{}", state.statistics().report());
/// }
/// ```
#[derive(Clone)]
pub struct AccessState {
    config: Arc<AccessConfig>,
    statistics: Arc<Statistics>,
    http: HttpAdapter,
    search: Arc<ElasticsearchBackend>,
    authenticator: Arc<dyn Authenticator>,
}

impl std::fmt::Debug for AccessState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AccessState")
            .field("search", &self.search)
            .field("authenticator", &self.authenticator.backend_name())
            .finish_non_exhaustive()
    }
}

impl AccessState {
    /// Builds every backend from `config`.
    pub fn new(config: AccessConfig) -> AccessResult<Self> {
        let statistics = Arc::new(Statistics::new(&config.statistics));
        let http = HttpAdapter::new(&config.transport)?;
        let search = Arc::new(ElasticsearchBackend::with_adapter(
            config.search.clone(),
            http.clone(),
            Arc::clone(&statistics),
        ));
        let authenticator = auth::authenticator(&config.auth, http.clone(), Arc::clone(&statistics));

        Ok(Self {
            config: Arc::new(config),
            statistics,
            http,
            search,
            authenticator,
        })
    }

    /// Returns the configuration.
    pub fn config(&self) -> &AccessConfig {
        &self.config
    }

    /// Returns the shared statistics recorder.
    pub fn statistics(&self) -> &Arc<Statistics> {
        &self.statistics
    }

    /// Returns the shared HTTP adapter.
    pub fn http(&self) -> &HttpAdapter {
        &self.http
    }

    /// Returns the search backend.
    pub fn search(&self) -> &ElasticsearchBackend {
        &self.search
    }

    /// Returns a clone of the search backend Arc.
    pub fn search_arc(&self) -> Arc<ElasticsearchBackend> {
        Arc::clone(&self.search)
    }

    /// Returns the configured authenticator.
    pub fn authenticator(&self) -> &Arc<dyn Authenticator> {
        &self.authenticator
    }
}
