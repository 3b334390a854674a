//! Client configuration.

use sandpit_api::ApiConfig;

/// Template forked when the caller names none, on the staging control plane.
pub const STAGING_TEMPLATE: &str = "7ngcrf";

/// Template forked when the caller names none.
pub const DEFAULT_TEMPLATE: &str = "pcz35m";

/// Immutable settings of a [`SandboxClient`](crate::SandboxClient).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    /// Base URL of the control plane, e.g. `https://api.codesandbox.io`.
    pub base_url: String,
}

impl ClientConfig {
    /// Create a config for the given control-plane base URL.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
        }
    }

    /// Template forked by `create` when none is given.
    pub fn default_template(&self) -> &'static str {
        if self.base_url.contains("codesandbox.stream") {
            STAGING_TEMPLATE
        } else {
            DEFAULT_TEMPLATE
        }
    }

    /// Base URL of the global scheduler.
    ///
    /// Derived by replacing the first `api` in the base URL.
    pub fn scheduler_url(&self) -> String {
        self.base_url.replacen("api", "global-scheduler", 1)
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self::new(sandpit_api::DEFAULT_API_URL)
    }
}

impl From<&ApiConfig> for ClientConfig {
    fn from(config: &ApiConfig) -> Self {
        Self::new(config.base_url.clone())
    }
}
