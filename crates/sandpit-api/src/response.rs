//! The raw result of one control-plane call.
//!
//! The control plane wraps every payload in an envelope:
//!
//! ```text
//! { "success": true, "errors": [], "data": { ... } }
//! ```
//!
//! A transport result keeps the envelope and any error payload side by side,
//! together with the status and headers, so callers decide how to interpret
//! them.

use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::collections::HashMap;
use std::fmt;

/// Header carrying the URL of the manager that actually holds a started VM.
pub const MANAGER_URL_HEADER: &str = "x-pitcher-manager-url";

/// Success envelope around a payload.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(bound = "T: DeserializeOwned")]
pub struct Envelope<T> {
    #[serde(default)]
    pub data: Option<T>,
    #[serde(default)]
    pub success: Option<bool>,
    #[serde(default)]
    pub errors: Vec<serde_json::Value>,
}

impl<T> Envelope<T> {
    /// Wrap a payload.
    pub fn new(data: T) -> Self {
        Self {
            data: Some(data),
            success: Some(true),
            errors: Vec::new(),
        }
    }
}

/// Error payload extracted from a non-success response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorBody {
    pub errors: Vec<String>,
}

impl ErrorBody {
    /// Create an error body from a single message.
    pub fn message(message: impl Into<String>) -> Self {
        Self {
            errors: vec![message.into()],
        }
    }

    /// Interpret a raw error body.
    ///
    /// Understands `{"errors": [...]}`, `{"error": "..."}` and
    /// `{"message": "..."}`; anything else is kept verbatim.
    pub fn from_body(body: &str) -> Self {
        let Ok(value) = serde_json::from_str::<serde_json::Value>(body) else {
            return Self::message(body.trim());
        };

        if let Some(errors) = value.get("errors").and_then(|v| v.as_array()) {
            if !errors.is_empty() {
                return Self {
                    errors: errors.iter().map(value_to_message).collect(),
                };
            }
        }

        for key in ["error", "message"] {
            if let Some(v) = value.get(key) {
                return Self::message(value_to_message(v));
            }
        }

        Self::message(value.to_string())
    }
}

fn value_to_message(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

impl fmt::Display for ErrorBody {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.errors.is_empty() {
            return write!(f, "unknown error");
        }
        write!(f, "{}", self.errors.join("; "))
    }
}

/// Transport result of one control-plane call.
#[derive(Debug, Clone)]
pub struct ApiResponse<T> {
    /// Decoded success envelope, if the call succeeded and had a body.
    pub data: Option<Envelope<T>>,
    /// Error payload, if the control plane rejected the call.
    pub error: Option<ErrorBody>,
    /// HTTP status code.
    pub status: u16,
    /// Response headers, names lower-cased.
    pub headers: HashMap<String, String>,
}

impl<T> ApiResponse<T> {
    /// A 200 response carrying `data`.
    pub fn ok(data: T) -> Self {
        Self {
            data: Some(Envelope::new(data)),
            error: None,
            status: 200,
            headers: HashMap::new(),
        }
    }

    /// A 200 response without any body.
    pub fn empty() -> Self {
        Self {
            data: None,
            error: None,
            status: 200,
            headers: HashMap::new(),
        }
    }

    /// A rejected call.
    pub fn failed(status: u16, error: ErrorBody) -> Self {
        Self {
            data: None,
            error: Some(error),
            status,
            headers: HashMap::new(),
        }
    }

    /// Attach a header.
    pub fn with_header(mut self, name: &str, value: impl Into<String>) -> Self {
        self.headers.insert(name.to_ascii_lowercase(), value.into());
        self
    }

    /// Look up a header by case-insensitive name.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .get(&name.to_ascii_lowercase())
            .map(String::as_str)
    }
}
