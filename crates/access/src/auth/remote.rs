//! Authentication against a remote endpoint.
//!
//! The check is a single GET:
//!
//! ```text
//! {endpoint}?KEY={user};{password}&action=check&client={client}
//! ```
//!
//! answered with `{"result": "success"|"fail", "access_level": .., "basic_info": {..}}`.

use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use tracing::{debug, warn};

use crate::core::BackendKind;
use crate::document;
use crate::error::AuthError;
use crate::statistics::{CallScope, Statistics};
use crate::transport::HttpAdapter;

use super::{AccountBasicInfo, AuthConfig, AuthenticatedUser, Authenticator, Credentials};

const CHECK_OPERATION: &str = "check";

/// Authenticator backed by a remote authentication endpoint.
#[derive(Debug, Clone)]
pub struct RemoteAuthenticator {
    config: AuthConfig,
    http: HttpAdapter,
    statistics: Arc<Statistics>,
}

impl RemoteAuthenticator {
    /// Creates a remote authenticator.
    pub fn new(config: AuthConfig, http: HttpAdapter, statistics: Arc<Statistics>) -> Self {
        Self {
            config,
            http,
            statistics,
        }
    }

    /// Returns the check URL for `credentials`, falling back to the configured
    /// client name when none is given.
    pub fn check_url(&self, credentials: &Credentials) -> String {
        let client = credentials
            .client
            .as_deref()
            .filter(|c| !c.is_empty())
            .unwrap_or(&self.config.client_info);
        let key = format!("{};{}", credentials.user_id, credentials.password);
        let query = url::form_urlencoded::Serializer::new(String::new())
            .append_pair("KEY", &key)
            .append_pair("action", "check")
            .append_pair("client", client)
            .finish();
        format!("{}?{}", self.config.auth_endpoint, query)
    }
}

#[async_trait]
impl Authenticator for RemoteAuthenticator {
    fn backend_name(&self) -> &'static str {
        "remote"
    }

    async fn authenticate(&self, credentials: &Credentials) -> Result<AuthenticatedUser, AuthError> {
        let user_id = credentials.user_id.as_str();
        if credentials.password.trim().is_empty() {
            warn!(user_id, "Password is empty");
        }

        let started = Instant::now();
        let response = self.http.get(&self.check_url(credentials), None).await;
        self.statistics.record(
            &BackendKind::RemoteAuthentication.operation_name(CHECK_OPERATION, false),
            started,
            CallScope::External,
        );

        if !response.is_success() {
            warn!(user_id, error = %response.error_summary(), "No success in auth response");
            return Err(AuthError::Communication {
                code: response.code().map(i64::from),
                message: response.error().unwrap_or("no response").to_string(),
            });
        }

        if response.str_field(&["result"])? == "fail" {
            debug!(user_id, "Auth endpoint rejected credentials");
            return Err(AuthError::AccessDenied {
                user_id: user_id.to_string(),
            });
        }

        let access_level = document::loose_i64(response.get("access_level"), 0);
        let basic_info = response
            .get("basic_info")
            .filter(|v| !v.is_null())
            .map(AccountBasicInfo::from_value)
            .transpose()?;

        Ok(AuthenticatedUser {
            user_id: user_id.to_string(),
            access_level,
            basic_info,
        })
    }

    async fn logout(&self, user_id: &str, client: &str) -> bool {
        debug!(user_id, client, "Remote logout is not supported");
        false
    }

    async fn logout_all_clients(&self, user_id: &str) -> bool {
        debug!(user_id, "Remote logout is not supported");
        false
    }
}
