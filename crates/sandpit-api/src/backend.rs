//! The control-plane seam.

use crate::error::Result;
use crate::response::ApiResponse;
use crate::types::*;
use async_trait::async_trait;

/// One method per control-plane endpoint.
///
/// Implementations only move bytes: a rejected call is reported through
/// [`ApiResponse::error`], and `Err` is reserved for failures of the
/// transport itself.
#[async_trait]
pub trait ControlPlane: Send + Sync {
    /// Start (or resume) the VM of a sandbox.
    async fn vm_start(
        &self,
        id: &str,
        body: Option<&VmStartRequest>,
    ) -> Result<ApiResponse<VmStartData>>;

    /// Shut the VM of a sandbox down.
    async fn vm_shutdown(&self, id: &str) -> Result<ApiResponse<serde_json::Value>>;

    /// Hibernate the VM of a sandbox.
    async fn vm_hibernate(&self, id: &str) -> Result<ApiResponse<serde_json::Value>>;

    /// Change the tier of a running VM.
    async fn vm_update_specs(
        &self,
        id: &str,
        body: &UpdateSpecsRequest,
    ) -> Result<ApiResponse<serde_json::Value>>;

    /// Change the hibernation timeout of a VM.
    async fn vm_update_hibernation_timeout(
        &self,
        id: &str,
        body: &HibernationTimeoutRequest,
    ) -> Result<ApiResponse<serde_json::Value>>;

    /// Create a collaborative session on a VM.
    async fn vm_create_session(
        &self,
        id: &str,
        body: &CreateSessionRequest,
    ) -> Result<ApiResponse<SessionData>>;

    /// Fork a template or sandbox into a new sandbox.
    async fn sandbox_fork(
        &self,
        template_id: &str,
        body: &ForkRequest,
    ) -> Result<ApiResponse<ForkData>>;

    /// Fetch one page of sandboxes.
    async fn sandbox_list(&self, query: &ListQuery) -> Result<ApiResponse<ListData>>;

    /// Create a preview token.
    async fn preview_token_create(
        &self,
        sandbox_id: &str,
        body: &PreviewTokenRequest,
    ) -> Result<ApiResponse<PreviewTokenData>>;

    /// List the preview tokens of a sandbox.
    async fn preview_token_list(
        &self,
        sandbox_id: &str,
    ) -> Result<ApiResponse<PreviewTokenListData>>;

    /// Update the expiry of a preview token.
    async fn preview_token_update(
        &self,
        sandbox_id: &str,
        token_id: &str,
        body: &PreviewTokenUpdateRequest,
    ) -> Result<ApiResponse<PreviewTokenData>>;

    /// Revoke every preview token of a sandbox.
    async fn preview_token_revoke_all(
        &self,
        sandbox_id: &str,
    ) -> Result<ApiResponse<serde_json::Value>>;

    /// Tell the global scheduler which manager holds a VM.
    ///
    /// `scheduler_url` is the base URL of the scheduler, which lives on a
    /// different host than the control plane.
    async fn report_cluster(
        &self,
        scheduler_url: &str,
        sandbox_id: &str,
        preferred_manager: &str,
    ) -> Result<()>;
}
