//! Configuration for the MCP server.
//!
//! Configuration is loaded from environment variables with sensible defaults.

use sandpit_api::{ApiConfig, ApiError};
use std::net::{IpAddr, Ipv4Addr, SocketAddr};

/// Default port of the HTTP transport.
pub const DEFAULT_HTTP_PORT: u16 = 8080;

/// Transport mode for the MCP server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TransportMode {
    /// Stdio only (for local AI tools like Claude Desktop)
    Stdio,
    /// HTTP/SSE only (for remote AI agents)
    Http,
    /// Both stdio and HTTP (default - maximum compatibility)
    #[default]
    Both,
}

impl TransportMode {
    /// Parse from string (case-insensitive).
    pub fn parse(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "stdio" => Self::Stdio,
            "http" | "sse" | "remote" => Self::Http,
            _ => Self::Both,
        }
    }

    /// Check if stdio transport should be enabled.
    pub fn stdio_enabled(&self) -> bool {
        matches!(self, Self::Stdio | Self::Both)
    }

    /// Check if HTTP transport should be enabled.
    pub fn http_enabled(&self) -> bool {
        matches!(self, Self::Http | Self::Both)
    }
}

/// Configuration for the Sandpit MCP server.
#[derive(Debug, Clone)]
pub struct SandpitConfig {
    /// Control-plane connection settings.
    pub api: ApiConfig,

    /// Transport mode (default: both stdio and HTTP).
    pub transport_mode: TransportMode,

    /// HTTP server bind address.
    pub http_addr: SocketAddr,
}

/// Configuration validation error.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid control-plane configuration: {0}")]
    Api(#[from] ApiError),

    #[error("no API token configured (set SANDPIT_API_TOKEN)")]
    MissingToken,
}

impl Default for SandpitConfig {
    fn default() -> Self {
        Self {
            api: ApiConfig::default(),
            transport_mode: TransportMode::Both,
            http_addr: SocketAddr::new(IpAddr::V4(Ipv4Addr::UNSPECIFIED), DEFAULT_HTTP_PORT),
        }
    }
}

impl SandpitConfig {
    /// Load configuration from environment variables.
    ///
    /// | Variable | Default |
    /// |----------|---------|
    /// | `SANDPIT_API_URL` | `https://api.codesandbox.io` |
    /// | `SANDPIT_API_TOKEN` | unset |
    /// | `SANDPIT_API_TIMEOUT_SECS` | `30` |
    /// | `SANDPIT_TRANSPORT` | `both` (stdio, http, both) |
    /// | `SANDPIT_HTTP_HOST` | `0.0.0.0` |
    /// | `SANDPIT_HTTP_PORT` | `8080` |
    pub fn from_env() -> Self {
        let default = Self::default();

        let http_host: IpAddr = std::env::var("SANDPIT_HTTP_HOST")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(default.http_addr.ip());

        let http_port: u16 = std::env::var("SANDPIT_HTTP_PORT")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(DEFAULT_HTTP_PORT);

        Self {
            api: ApiConfig::from_env(),
            transport_mode: std::env::var("SANDPIT_TRANSPORT")
                .map(|v| TransportMode::parse(&v))
                .unwrap_or(default.transport_mode),
            http_addr: SocketAddr::new(http_host, http_port),
        }
    }

    /// Validate the configuration.
    ///
    /// Call this at startup to get clear error messages.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.api.validate()?;
        if self.api.token.is_none() {
            return Err(ConfigError::MissingToken);
        }
        Ok(())
    }

    /// Validate configuration but only log warnings instead of failing.
    ///
    /// Use this for development environments pointed at a local mock.
    pub fn validate_warn(&self) {
        if let Err(e) = self.api.validate() {
            tracing::warn!(error = %e, "Control-plane configuration is invalid");
        }

        if self.api.token.is_none() {
            tracing::warn!("No API token configured, control-plane calls will be unauthenticated");
        }
    }
}
