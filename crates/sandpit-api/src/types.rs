//! Request and response payloads, as they appear on the wire.
//!
//! Field names follow the control plane's snake_case JSON. Optional request
//! fields are omitted entirely when unset so the control plane applies its
//! own defaults.

use serde::{Deserialize, Serialize};

// ============================================================================
// VM lifecycle
// ============================================================================

/// Body of `POST /vm/{id}/start`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VmStartRequest {
    /// ISO 3166-1 alpha-2 scheduling hint.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ipcountry: Option<String>,
    /// Tier name, e.g. `"Pico"`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tier: Option<String>,
    /// Inactivity period before the VM hibernates.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hibernation_timeout_seconds: Option<u32>,
}

/// `data` of a start response: everything needed to reach the in-VM agent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VmStartData {
    pub bootup_type: String,
    pub cluster: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub latest_pitcher_version: String,
    pub pitcher_manager_version: String,
    pub pitcher_token: String,
    pub pitcher_url: String,
    pub pitcher_version: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reconnect_token: Option<String>,
    pub user_workspace_path: String,
    pub workspace_path: String,
}

/// Body of `POST /vm/{id}/update_specs`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateSpecsRequest {
    pub tier: String,
}

/// Body of `POST /vm/{id}/update_hibernation_timeout`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HibernationTimeoutRequest {
    pub hibernation_timeout_seconds: u32,
}

/// Body of `POST /vm/{id}/sessions`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateSessionRequest {
    pub session_id: String,
    /// `"read"` or `"write"`.
    pub permission: String,
}

/// `data` of a create-session response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionData {
    pub pitcher_token: String,
    pub pitcher_url: String,
    pub user_workspace_path: String,
}

// ============================================================================
// Sandboxes
// ============================================================================

/// Body of `POST /sandbox/{id}/fork`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ForkRequest {
    /// 0 = public, 1 = unlisted, 2 = private.
    pub privacy: u8,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub tags: Vec<String>,
    pub path: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_options: Option<VmStartRequest>,
}

/// `data` of a fork response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ForkData {
    pub id: String,
    /// Present when the control plane already started the new VM.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_response: Option<VmStartData>,
}

/// Query string of `GET /sandbox`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListQuery {
    /// Comma-separated tag filter.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tags: Option<String>,
    pub page: u32,
    pub page_size: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub order_by: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub direction: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
}

/// One sandbox as returned by the list endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SandboxRecord {
    pub id: String,
    pub created_at: String,
    pub updated_at: String,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    /// Kept wide so out-of-range codes reach the caller as an error.
    pub privacy: i64,
    #[serde(default)]
    pub tags: Vec<String>,
}

/// Pagination block of a list response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaginationData {
    pub total_records: u64,
    #[serde(default)]
    pub current_page: Option<u32>,
    #[serde(default)]
    pub next_page: Option<u32>,
}

/// `data` of a list response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListData {
    #[serde(default)]
    pub sandboxes: Vec<SandboxRecord>,
    pub pagination: PaginationData,
}

// ============================================================================
// Preview tokens
// ============================================================================

/// Body of the preview-token create endpoint.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PreviewTokenRequest {
    /// RFC 3339 timestamp; omitted for a non-expiring token.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<String>,
}

/// Body of the preview-token update endpoint.
///
/// Unlike [`PreviewTokenRequest`], an absent expiry is sent as `null` so
/// the control plane clears it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PreviewTokenUpdateRequest {
    #[serde(default)]
    pub expires_at: Option<String>,
}

/// A preview token as returned by the control plane.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PreviewTokenRecord {
    /// The secret; only present in the create response.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
    pub token_id: String,
    pub token_prefix: String,
    #[serde(default)]
    pub expires_at: Option<String>,
    #[serde(default)]
    pub last_used_at: Option<String>,
}

/// `data` of the preview-token create and update endpoints.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PreviewTokenData {
    #[serde(default)]
    pub token: Option<PreviewTokenRecord>,
}

/// `data` of the preview-token list endpoint.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PreviewTokenListData {
    #[serde(default)]
    pub tokens: Option<Vec<PreviewTokenRecord>>,
}
