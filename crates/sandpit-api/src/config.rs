//! Control-plane connection settings.

use crate::error::{ApiError, Result};
use std::time::Duration;

/// Default control-plane base URL.
pub const DEFAULT_API_URL: &str = "https://api.codesandbox.io";

/// Default per-request timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Connection settings for the control-plane REST API.
#[derive(Clone)]
pub struct ApiConfig {
    /// Base URL of the control plane, without a trailing slash.
    pub base_url: String,
    /// Bearer token sent with every request.
    pub token: Option<String>,
    /// Per-request timeout.
    pub timeout: Duration,
    /// Value of the `User-Agent` header.
    pub user_agent: String,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_API_URL.to_string(),
            token: None,
            timeout: DEFAULT_TIMEOUT,
            user_agent: format!("sandpit/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

// The token never shows up in logs.
impl std::fmt::Debug for ApiConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiConfig")
            .field("base_url", &self.base_url)
            .field("token", &self.token.as_ref().map(|_| "<redacted>"))
            .field("timeout", &self.timeout)
            .field("user_agent", &self.user_agent)
            .finish()
    }
}

impl ApiConfig {
    /// Create a config for the given base URL.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            ..Self::default()
        }
    }

    /// Set the bearer token.
    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    /// Set the per-request timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Load configuration from environment variables.
    ///
    /// | Variable | Default |
    /// |----------|---------|
    /// | `SANDPIT_API_URL` | `https://api.codesandbox.io` |
    /// | `SANDPIT_API_TOKEN` | unset |
    /// | `SANDPIT_API_TIMEOUT_SECS` | `30` |
    pub fn from_env() -> Self {
        let default = Self::default();

        Self {
            base_url: std::env::var("SANDPIT_API_URL")
                .map(|v| v.trim_end_matches('/').to_string())
                .unwrap_or(default.base_url),
            token: std::env::var("SANDPIT_API_TOKEN")
                .ok()
                .filter(|v| !v.is_empty()),
            timeout: std::env::var("SANDPIT_API_TIMEOUT_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .map(Duration::from_secs)
                .unwrap_or(default.timeout),
            user_agent: default.user_agent,
        }
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<()> {
        if !(self.base_url.starts_with("http://") || self.base_url.starts_with("https://")) {
            return Err(ApiError::Config(format!(
                "base_url must be an http(s) URL, got {:?}",
                self.base_url
            )));
        }
        if self.timeout.is_zero() {
            return Err(ApiError::Config("timeout must be > 0".into()));
        }
        Ok(())
    }

    /// Join an endpoint path onto the base URL.
    pub fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }
}
