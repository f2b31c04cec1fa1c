//! User authentication.
//!
//! An [`Authenticator`] checks [`Credentials`] against some identity service
//! and returns the [`AuthenticatedUser`] on success. The implementation is
//! chosen once at startup from [`AuthConfig::module`] by [`authenticator`].

mod remote;

use std::str::FromStr;
use std::sync::Arc;

use async_trait::async_trait;
use clap::{Args, ValueEnum};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::document;
use crate::error::{AuthError, ShapeResult};
use crate::statistics::Statistics;
use crate::transport::HttpAdapter;

pub use remote::RemoteAuthenticator;

// ============================================================================
// Configuration
// ============================================================================

/// Available authentication modules.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuthModule {
    /// Check credentials against a remote authentication endpoint.
    #[default]
    Remote,
}

/// Authentication settings.
#[derive(Debug, Clone, Args, Serialize, Deserialize)]
pub struct AuthConfig {
    /// Authentication module.
    #[arg(long = "auth-module", env = "KEEL_AUTH_MODULE", value_enum, default_value = "remote")]
    #[serde(default)]
    pub module: AuthModule,

    /// Remote authentication endpoint.
    #[arg(
        long = "auth-endpoint",
        env = "KEEL_AUTH_ENDPOINT",
        default_value = "http://localhost:8001/authentication"
    )]
    #[serde(default = "default_auth_endpoint")]
    pub auth_endpoint: String,

    /// Client name sent when the caller does not give one.
    #[arg(long = "auth-client", env = "KEEL_AUTH_CLIENT", default_value = "desktop_browser_v1.0")]
    #[serde(default = "default_client_info")]
    pub client_info: String,
}

fn default_auth_endpoint() -> String {
    "http://localhost:8001/authentication".to_string()
}

fn default_client_info() -> String {
    "desktop_browser_v1.0".to_string()
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            module: AuthModule::default(),
            auth_endpoint: default_auth_endpoint(),
            client_info: default_client_info(),
        }
    }
}

impl AuthConfig {
    /// Returns every problem with this configuration.
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();
        if let Err(e) = url::Url::parse(&self.auth_endpoint) {
            errors.push(format!(
                "Invalid auth endpoint '{}': {}",
                self.auth_endpoint, e
            ));
        }
        if self.client_info.trim().is_empty() {
            errors.push("Auth client name cannot be empty".to_string());
        }
        errors
    }
}

// ============================================================================
// Accounts
// ============================================================================

/// Account roles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Unrecognized role name.
    Unknown,
    /// Developer.
    Developer,
    /// Senior developer.
    Seniordev,
    /// Lead developer.
    Chiefdev,
    /// Tester.
    Tester,
    /// Translator.
    Translator,
    /// Regular user.
    User,
    /// Administrator.
    Superuser,
    /// Assistant.
    Assistant,
    /// A device rather than a person.
    Thing,
}

impl Role {
    /// Returns the wire name of the role.
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Unknown => "unknown",
            Role::Developer => "developer",
            Role::Seniordev => "seniordev",
            Role::Chiefdev => "chiefdev",
            Role::Tester => "tester",
            Role::Translator => "translator",
            Role::User => "user",
            Role::Superuser => "superuser",
            Role::Assistant => "assistant",
            Role::Thing => "thing",
        }
    }

    /// Parses a wire name; anything unrecognized is [`Role::Unknown`].
    pub fn parse(name: &str) -> Self {
        name.parse().unwrap_or(Role::Unknown)
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "unknown" => Ok(Role::Unknown),
            "developer" => Ok(Role::Developer),
            "seniordev" => Ok(Role::Seniordev),
            "chiefdev" => Ok(Role::Chiefdev),
            "tester" => Ok(Role::Tester),
            "translator" => Ok(Role::Translator),
            "user" => Ok(Role::User),
            "superuser" => Ok(Role::Superuser),
            "assistant" => Ok(Role::Assistant),
            "thing" => Ok(Role::Thing),
            _ => Err(format!("unknown role: {}", s)),
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Basic account info returned by a successful authentication.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct AccountBasicInfo {
    /// Email address.
    pub email: Option<String>,
    /// Phone number.
    pub phone: Option<String>,
    /// Preferred language tag.
    pub language: Option<String>,
    /// Structured name, e.g. `{"first": "Ada", "last": "Lovelace"}`.
    pub name: Option<Map<String, Value>>,
    /// Granted roles.
    pub roles: Vec<Role>,
    /// Role names as the service sent them, including ones not known to
    /// [`Role`]. Empty when the info was built in code.
    pub role_names: Vec<String>,
    /// Every other field of the info document.
    pub more: Map<String, Value>,
}

// Field names of the info document.
#[allow(missing_docs)]
impl AccountBasicInfo {
    pub const EMAIL: &'static str = "Email";
    pub const PHONE: &'static str = "Phone";
    pub const LANGUAGE: &'static str = "language";
    pub const NAME: &'static str = "name";
    pub const ROLES: &'static str = "roles";
    pub const MORE: &'static str = "more";

    /// Reads the info document sent by an identity service.
    pub fn from_value(value: &Value) -> ShapeResult<Self> {
        let object = document::expect_object(value, &[])?;
        let mut info = Self::default();

        for (key, value) in object {
            match key.as_str() {
                Self::EMAIL | Self::PHONE | Self::LANGUAGE | Self::NAME | Self::ROLES
                    if value.is_null() => {}
                Self::EMAIL => info.email = Some(document::expect_str(value, &[Self::EMAIL])?.to_string()),
                Self::PHONE => info.phone = Some(document::expect_str(value, &[Self::PHONE])?.to_string()),
                Self::LANGUAGE => {
                    info.language = Some(document::expect_str(value, &[Self::LANGUAGE])?.to_string())
                }
                Self::NAME => info.name = Some(document::expect_object(value, &[Self::NAME])?.clone()),
                Self::ROLES => {
                    info.role_names = document::expect_array(value, &[Self::ROLES])?
                        .iter()
                        .map(|role| document::expect_str(role, &[Self::ROLES]).map(str::to_string))
                        .collect::<ShapeResult<_>>()?;
                    info.roles = info.role_names.iter().map(|name| Role::parse(name)).collect();
                }
                _ => {
                    info.more.insert(key.clone(), value.clone());
                }
            }
        }

        Ok(info)
    }

    /// Renders the info document, leaving out empty fields.
    pub fn to_value(&self) -> Value {
        let mut out = Map::new();
        let mut put_str = |key: &str, value: &Option<String>| {
            if let Some(v) = value.as_ref().filter(|v| !v.is_empty()) {
                out.insert(key.to_string(), Value::String(v.clone()));
            }
        };
        put_str(Self::EMAIL, &self.email);
        put_str(Self::PHONE, &self.phone);
        put_str(Self::LANGUAGE, &self.language);

        if let Some(name) = self.name.as_ref().filter(|n| !n.is_empty()) {
            out.insert(Self::NAME.to_string(), Value::Object(name.clone()));
        }
        let roles: Vec<Value> = if self.role_names.is_empty() {
            self.roles.iter().map(|r| Value::String(r.as_str().to_string())).collect()
        } else {
            self.role_names.iter().cloned().map(Value::String).collect()
        };
        if !roles.is_empty() {
            out.insert(Self::ROLES.to_string(), Value::Array(roles));
        }
        if !self.more.is_empty() {
            out.insert(Self::MORE.to_string(), Value::Object(self.more.clone()));
        }
        Value::Object(out)
    }

    /// Returns true if the account has `role`.
    pub fn has_role(&self, role: Role) -> bool {
        self.roles.contains(&role)
    }
}

/// Credentials presented for authentication.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Credentials {
    /// User name or id.
    pub user_id: String,
    /// Password or password token.
    pub password: String,
    /// Kind of id, e.g. `uid` or `email`.
    #[serde(default)]
    pub id_type: Option<String>,
    /// Client name; the configured default is used when absent or empty.
    #[serde(default)]
    pub client: Option<String>,
}

impl Credentials {
    /// Creates credentials without id type or client.
    pub fn new(user_id: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            password: password.into(),
            ..Default::default()
        }
    }

    /// Sets the client name.
    pub fn with_client(mut self, client: impl Into<String>) -> Self {
        self.client = Some(client.into());
        self
    }
}

/// A user whose credentials were accepted.
#[derive(Debug, Clone, PartialEq)]
pub struct AuthenticatedUser {
    /// The id the credentials were presented for.
    pub user_id: String,
    /// `0` is the lowest level with access.
    pub access_level: i64,
    /// Account info, when the service sent any.
    pub basic_info: Option<AccountBasicInfo>,
}

// ============================================================================
// Authenticator
// ============================================================================

/// An identity service.
#[async_trait]
pub trait Authenticator: Send + Sync {
    /// Returns a human-readable name for this authentication backend.
    fn backend_name(&self) -> &'static str;

    /// Checks `credentials`.
    async fn authenticate(&self, credentials: &Credentials) -> Result<AuthenticatedUser, AuthError>;

    /// Invalidates the token `user_id` holds for `client`.
    async fn logout(&self, user_id: &str, client: &str) -> bool;

    /// Invalidates every token `user_id` holds.
    async fn logout_all_clients(&self, user_id: &str) -> bool;
}

/// Builds the authenticator selected by `config.module`.
pub fn authenticator(
    config: &AuthConfig,
    http: HttpAdapter,
    statistics: Arc<Statistics>,
) -> Arc<dyn Authenticator> {
    match config.module {
        AuthModule::Remote => Arc::new(RemoteAuthenticator::new(config.clone(), http, statistics)),
    }
}
