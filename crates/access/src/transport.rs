//! HTTP call adapter.
//!
//! [`HttpAdapter`] issues one request per call and converts every outcome,
//! including refused connections, malformed URLs and unreadable bodies, into
//! an [`Envelope`]. Nothing escapes the envelope boundary: the verb methods
//! return `Envelope`, never `Result`.
//!
//! | Outcome                                 | Envelope                              |
//! |-----------------------------------------|---------------------------------------|
//! | 2xx                                     | built from body, `success = true`     |
//! | other status                            | `code = status`, `error = body`       |
//! | failure before a status was received    | `code = -1`, `error = cause`          |
//! | failure after the status was received   | `code = status`, `error = cause`      |
//!
//! Idle connections are not kept between calls; each call opens and tears
//! down its own connection.

use std::collections::HashMap;
use std::time::Duration;

use clap::Args;
use reqwest::header::CONTENT_TYPE;
use reqwest::{Method, StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::debug;

use crate::document;
use crate::envelope::{Envelope, NO_STATUS_CODE};
use crate::error::{AccessResult, ShapeError, TransportError};

/// Request headers, by name.
pub type Headers = HashMap<String, String>;

/// Default `User-Agent` sent with every request.
pub const DEFAULT_USER_AGENT: &str = concat!("keel-access/", env!("CARGO_PKG_VERSION"));

const JSON_CONTENT_TYPE: &str = "application/json";
const FORM_CONTENT_TYPE: &str = "application/x-www-form-urlencoded";

/// Transport settings shared by every backend.
#[derive(Debug, Clone, Args, Serialize, Deserialize)]
pub struct TransportConfig {
    /// Connect timeout in milliseconds.
    #[arg(long, env = "KEEL_CONNECT_TIMEOUT_MS", default_value = "5000")]
    #[serde(default = "default_connect_timeout_ms")]
    pub connect_timeout_ms: u64,

    /// Whole-request timeout in milliseconds.
    #[arg(long, env = "KEEL_REQUEST_TIMEOUT_MS", default_value = "30000")]
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,

    /// User-Agent header value.
    #[arg(long, env = "KEEL_USER_AGENT", default_value = DEFAULT_USER_AGENT)]
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

fn default_connect_timeout_ms() -> u64 {
    5000
}

fn default_request_timeout_ms() -> u64 {
    30000
}

fn default_user_agent() -> String {
    DEFAULT_USER_AGENT.to_string()
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            connect_timeout_ms: default_connect_timeout_ms(),
            request_timeout_ms: default_request_timeout_ms(),
            user_agent: default_user_agent(),
        }
    }
}

/// Stateless HTTP adapter returning normalized envelopes.
#[derive(Debug, Clone)]
pub struct HttpAdapter {
    client: reqwest::Client,
}

impl HttpAdapter {
    /// Creates an adapter from transport settings.
    pub fn new(config: &TransportConfig) -> Result<Self, TransportError> {
        let client = reqwest::Client::builder()
            .user_agent(config.user_agent.clone())
            .connect_timeout(Duration::from_millis(config.connect_timeout_ms))
            .timeout(Duration::from_millis(config.request_timeout_ms))
            .pool_max_idle_per_host(0)
            .build()
            .map_err(|e| TransportError::ClientBuild {
                message: e.to_string(),
                source: e,
            })?;
        Ok(Self { client })
    }

    /// Issues a GET.
    pub async fn get(&self, url: &str, headers: Option<&Headers>) -> Envelope {
        self.execute(Method::GET, url, None, headers).await
    }

    /// Issues a GET after appending raw parameter fragments such as
    /// `"?q=term"` or `"&size=20"` to the URL.
    pub async fn get_with_params(&self, url: &str, params: &[&str]) -> Envelope {
        let full = params.iter().fold(url.to_string(), |mut acc, p| {
            acc.push_str(p);
            acc
        });
        self.get(&full, None).await
    }

    /// Issues a POST with `body`.
    ///
    /// `Content-Type` defaults to `application/json` when `headers` has none.
    pub async fn post(&self, url: &str, body: &str, headers: Option<&Headers>) -> Envelope {
        self.execute(Method::POST, url, Some(body), headers).await
    }

    /// Issues a POST with an `x-www-form-urlencoded` body such as `"a=1&b=2"`.
    pub async fn post_form(&self, url: &str, params: &str) -> Envelope {
        let headers = Headers::from([
            ("Content-Type".to_string(), FORM_CONTENT_TYPE.to_string()),
            ("Content-Language".to_string(), "en-US".to_string()),
        ]);
        self.post(url, params, Some(&headers)).await
    }

    /// Issues a PUT with `body`.
    ///
    /// `Content-Type` defaults to `application/json` when `headers` has none.
    pub async fn put(&self, url: &str, body: &str, headers: Option<&Headers>) -> Envelope {
        self.execute(Method::PUT, url, Some(body), headers).await
    }

    /// Issues a DELETE.
    pub async fn delete(&self, url: &str, headers: Option<&Headers>) -> Envelope {
        self.execute(Method::DELETE, url, None, headers).await
    }

    /// Fetches `url` and returns the body, failing on anything but 200.
    pub async fn fetch_text(&self, url: &str) -> AccessResult<String> {
        let request_error = |e: reqwest::Error| TransportError::Request {
            url: url.to_string(),
            message: e.to_string(),
        };
        let response = self.client.get(url).send().await.map_err(request_error)?;
        let status = response.status();
        if status != StatusCode::OK {
            return Err(TransportError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            }
            .into());
        }
        Ok(response.text().await.map_err(request_error)?)
    }

    /// Fetches `url` and parses the body as a JSON object, failing on anything
    /// but 200.
    pub async fn fetch_json(&self, url: &str) -> AccessResult<Map<String, Value>> {
        let text = self.fetch_text(url).await?;
        let value: Value = serde_json::from_str(text.trim()).map_err(ShapeError::from)?;
        match value {
            Value::Object(map) => Ok(map),
            other => Err(ShapeError::Mismatch {
                path: String::new(),
                expected: "object",
                found: document::type_name(&other),
            }
            .into()),
        }
    }

    async fn execute(
        &self,
        method: Method,
        url: &str,
        body: Option<&str>,
        headers: Option<&Headers>,
    ) -> Envelope {
        let request = match self.prepare(method.clone(), url, body, headers) {
            Ok(request) => request,
            Err(e) => {
                debug!(method = %method, url, error = %e, "Request could not be built");
                return Envelope::failure(NO_STATUS_CODE, Some(e.to_string()));
            }
        };

        let response = match self.client.execute(request).await {
            Ok(response) => response,
            Err(e) => {
                debug!(method = %method, url, error = %e, "Request failed before a status was received");
                return Envelope::failure(NO_STATUS_CODE, Some(e.to_string()));
            }
        };

        let status = response.status();
        let code = i32::from(status.as_u16());
        let text = match response.text().await {
            Ok(text) => text,
            Err(e) => {
                debug!(method = %method, url, status = code, error = %e, "Response body could not be read");
                return Envelope::failure(code, Some(e.to_string()));
            }
        };

        debug!(method = %method, url, status = code, "HTTP call completed");

        if status.is_success() {
            Envelope::build(&text, true)
        } else {
            Envelope::failure(code, (!text.is_empty()).then_some(text))
        }
    }

    fn prepare(
        &self,
        method: Method,
        url: &str,
        body: Option<&str>,
        headers: Option<&Headers>,
    ) -> Result<reqwest::Request, reqwest::Error> {
        let mut builder = self.client.request(method, url);
        let mut has_content_type = false;

        for (name, value) in headers.into_iter().flatten() {
            // Content-Length always follows the body actually sent.
            if name.eq_ignore_ascii_case("content-length") {
                continue;
            }
            if name.eq_ignore_ascii_case("content-type") {
                has_content_type = true;
            }
            builder = builder.header(name.as_str(), value.as_str());
        }

        if let Some(body) = body {
            if !has_content_type {
                builder = builder.header(CONTENT_TYPE, JSON_CONTENT_TYPE);
            }
            builder = builder.body(body.to_owned());
        }

        builder.build()
    }
}
