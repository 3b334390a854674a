//! Tool parameter and response types for MCP tools.
//!
//! These types use serde for serialization and schemars for automatic
//! JSON Schema generation required by MCP.

use schemars::JsonSchema;
use sandpit_core::{Direction, OrderBy, Permission, Privacy};
use serde::{Deserialize, Serialize};

// ============================================================================
// Sandbox Lifecycle
// ============================================================================

/// Sandbox visibility.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum PrivacyParam {
    Public,
    Unlisted,
    Private,
}

impl From<PrivacyParam> for Privacy {
    fn from(p: PrivacyParam) -> Self {
        match p {
            PrivacyParam::Public => Privacy::Public,
            PrivacyParam::Unlisted => Privacy::Unlisted,
            PrivacyParam::Private => Privacy::Private,
        }
    }
}

/// Parameters for creating a new sandbox.
#[derive(Debug, Default, Deserialize, JsonSchema)]
pub struct CreateSandboxParams {
    /// Template or sandbox ID to fork (default: the universal template).
    #[serde(default)]
    pub template_id: Option<String>,

    /// Title of the new sandbox.
    #[serde(default)]
    pub title: Option<String>,

    /// Description of the new sandbox.
    #[serde(default)]
    pub description: Option<String>,

    /// Privacy of the new sandbox (default: public).
    #[serde(default)]
    pub privacy: Option<PrivacyParam>,

    /// Tags for filtering, at most 10. "sdk" is always added.
    #[serde(default)]
    pub tags: Option<Vec<String>>,

    /// Folder to file the sandbox under (default: /SDK).
    #[serde(default)]
    pub path: Option<String>,

    /// VM tier: Pico, Nano, Micro, Small, Medium, Large or XLarge.
    #[serde(default)]
    pub vm_tier: Option<String>,

    /// ISO 3166-1 alpha-2 country code used as a scheduling hint.
    #[serde(default)]
    pub ipcountry: Option<String>,

    /// Seconds of inactivity before the sandbox hibernates.
    #[serde(default)]
    pub hibernation_timeout_seconds: Option<u32>,
}

/// Result of creating a sandbox.
#[derive(Debug, Serialize)]
pub struct CreateSandboxResult {
    /// Unique identifier for the sandbox.
    pub sandbox_id: String,
    /// Start data containing a single-use token to connect to the VM.
    pub start_data: sandpit_core::SandboxStartData,
}

/// Parameters for starting an existing sandbox.
#[derive(Debug, Deserialize, JsonSchema)]
pub struct StartSandboxParams {
    /// ID of the sandbox to start.
    pub sandbox_id: String,

    /// VM tier: Pico, Nano, Micro, Small, Medium, Large or XLarge.
    #[serde(default)]
    pub vm_tier: Option<String>,

    /// ISO 3166-1 alpha-2 country code used as a scheduling hint.
    #[serde(default)]
    pub ipcountry: Option<String>,

    /// Seconds of inactivity before the sandbox hibernates.
    #[serde(default)]
    pub hibernation_timeout_seconds: Option<u32>,
}

/// Parameters naming a single sandbox.
#[derive(Debug, Deserialize, JsonSchema)]
pub struct SandboxIdParams {
    /// ID of the sandbox.
    pub sandbox_id: String,
}

/// Result of an operation without payload.
#[derive(Debug, Serialize)]
pub struct OperationResult {
    /// Whether the operation succeeded.
    pub success: bool,
}

/// Parameters for changing the tier of a sandbox.
#[derive(Debug, Deserialize, JsonSchema)]
pub struct UpdateTierParams {
    /// ID of the sandbox to rescale.
    pub sandbox_id: String,

    /// New VM tier: Pico, Nano, Micro, Small, Medium, Large or XLarge.
    pub tier: String,
}

/// Parameters for changing the hibernation timeout of a sandbox.
#[derive(Debug, Deserialize, JsonSchema)]
pub struct UpdateHibernationTimeoutParams {
    /// ID of the sandbox.
    pub sandbox_id: String,

    /// Seconds of inactivity before the sandbox hibernates (max 86400).
    pub timeout_seconds: u32,
}

// ============================================================================
// Listing
// ============================================================================

/// Sort key for listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum OrderByParam {
    InsertedAt,
    UpdatedAt,
}

impl From<OrderByParam> for OrderBy {
    fn from(o: OrderByParam) -> Self {
        match o {
            OrderByParam::InsertedAt => OrderBy::InsertedAt,
            OrderByParam::UpdatedAt => OrderBy::UpdatedAt,
        }
    }
}

/// Sort direction for listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum DirectionParam {
    Asc,
    Desc,
}

impl From<DirectionParam> for Direction {
    fn from(d: DirectionParam) -> Self {
        match d {
            DirectionParam::Asc => Direction::Asc,
            DirectionParam::Desc => Direction::Desc,
        }
    }
}

/// Parameters for listing sandboxes.
#[derive(Debug, Default, Deserialize, JsonSchema)]
pub struct ListSandboxesParams {
    /// Only sandboxes carrying these tags.
    #[serde(default)]
    pub tags: Vec<String>,

    /// Sort key.
    #[serde(default)]
    pub order_by: Option<OrderByParam>,

    /// Sort direction.
    #[serde(default)]
    pub direction: Option<DirectionParam>,

    /// Only running sandboxes.
    #[serde(default)]
    pub running_only: bool,

    /// Maximum number of sandboxes to return (default: 50).
    #[serde(default)]
    pub limit: Option<usize>,

    /// Page to start from; enables manual paging.
    #[serde(default)]
    pub page: Option<u32>,

    /// Page size for manual paging.
    #[serde(default)]
    pub page_size: Option<u32>,
}

// ============================================================================
// Preview Tokens
// ============================================================================

/// Parameters for creating a preview token.
#[derive(Debug, Deserialize, JsonSchema)]
pub struct CreatePreviewTokenParams {
    /// ID of the sandbox the token grants access to.
    pub sandbox_id: String,

    /// Expiry as an RFC 3339 timestamp; omit for a token that never expires.
    #[serde(default)]
    pub expires_at: Option<String>,
}

/// Parameters for revoking one preview token.
#[derive(Debug, Deserialize, JsonSchema)]
pub struct RevokePreviewTokenParams {
    /// ID of the sandbox the token belongs to.
    pub sandbox_id: String,

    /// ID of the token to revoke.
    pub token_id: String,
}

// ============================================================================
// Sessions
// ============================================================================

/// Session access level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum PermissionParam {
    Read,
    Write,
}

impl From<PermissionParam> for Permission {
    fn from(p: PermissionParam) -> Self {
        match p {
            PermissionParam::Read => Permission::Read,
            PermissionParam::Write => Permission::Write,
        }
    }
}

/// Parameters for creating a session.
#[derive(Debug, Deserialize, JsonSchema)]
pub struct CreateSessionParams {
    /// ID of the sandbox to open a session on.
    pub sandbox_id: String,

    /// Session ID (default: a random UUID).
    #[serde(default)]
    pub session_id: Option<String>,

    /// Access level (default: write).
    #[serde(default)]
    pub permission: Option<PermissionParam>,
}
