//! SandpitServer - MCP server that exposes the sandbox control plane as tools.
//!
//! This module implements ServerHandler manually to expose sandbox lifecycle,
//! listing, preview token and session tools. Sandboxes are never connected
//! from here; tools hand back start bundles or session credentials instead.

use crate::config::SandpitConfig;
use crate::types::*;

use chrono::{DateTime, Utc};
use rmcp::{
    handler::server::ServerHandler,
    model::*,
    service::{RequestContext, RoleServer},
    ErrorData,
};
use sandpit_core::{
    CoreError, CreateOptions, ListOptions, Pagination, SandboxClient, SessionOptions,
    StartOptions, StatusFilter, VmTier,
};
use schemars::schema_for;
use std::sync::Arc;

/// MCP server for Sandpit sandbox operations.
///
/// This server exposes sandbox management, preview tokens and sessions as
/// MCP tools that AI agents can invoke.
#[derive(Clone)]
pub struct SandpitServer {
    /// Control-plane client from sandpit-core
    client: SandboxClient,

    /// Configuration
    config: SandpitConfig,
}

impl SandpitServer {
    /// Create a new SandpitServer talking to the configured control plane.
    pub fn new(config: SandpitConfig) -> Result<Self, CoreError> {
        let client = SandboxClient::from_api_config(config.api.clone())?;
        tracing::info!(base_url = %config.api.base_url, "Control-plane client ready");
        Ok(Self { client, config })
    }

    /// Create a server around an existing client.
    pub fn with_client(client: SandboxClient, config: SandpitConfig) -> Self {
        Self { client, config }
    }

    /// Get a reference to the control-plane client.
    pub fn client(&self) -> &SandboxClient {
        &self.client
    }

    /// Get a reference to the configuration.
    pub fn config(&self) -> &SandpitConfig {
        &self.config
    }

    /// Build start options from the optional tool arguments.
    fn start_options(
        vm_tier: Option<&str>,
        ipcountry: Option<String>,
        hibernation_timeout_seconds: Option<u32>,
    ) -> Result<StartOptions, String> {
        let mut opts = StartOptions::new();
        if let Some(tier) = vm_tier {
            opts = opts.vm_tier(VmTier::from_name(tier).map_err(|e| e.to_string())?);
        }
        if let Some(country) = ipcountry {
            opts = opts.ipcountry(country);
        }
        if let Some(seconds) = hibernation_timeout_seconds {
            opts = opts.hibernation_timeout_seconds(seconds);
        }
        Ok(opts)
    }

    fn parse_expiry(value: &str) -> Result<DateTime<Utc>, String> {
        DateTime::parse_from_rfc3339(value)
            .map(|t| t.with_timezone(&Utc))
            .map_err(|e| format!("Invalid expires_at '{value}': {e}"))
    }

    /// Parse required tool arguments, reporting `missing` when there are none
    /// and the deserialization error otherwise.
    fn parse_params<T: serde::de::DeserializeOwned>(
        args: Option<serde_json::Map<String, serde_json::Value>>,
        missing: &str,
    ) -> Result<T, CallToolResult> {
        match args.map(|a| serde_json::from_value(serde_json::Value::Object(a))) {
            Some(Ok(p)) => Ok(p),
            Some(Err(e)) => Err(Self::error_result(format!("Invalid parameters: {e}"))),
            None => Err(Self::error_result(missing)),
        }
    }

    /// Helper to create success result with JSON content
    fn json_result<T: serde::Serialize>(data: &T) -> CallToolResult {
        match serde_json::to_string_pretty(data) {
            Ok(json) => CallToolResult::success(vec![Content::text(json)]),
            Err(e) => CallToolResult::error(vec![Content::text(format!(
                "JSON serialization error: {e}"
            ))]),
        }
    }

    /// Helper to create error result
    fn error_result(message: impl Into<String>) -> CallToolResult {
        CallToolResult::error(vec![Content::text(message.into())])
    }

    fn operation_result(result: sandpit_core::Result<()>, action: &str, id: &str) -> CallToolResult {
        match result {
            Ok(()) => Self::json_result(&OperationResult { success: true }),
            Err(e) => {
                tracing::error!(sandbox_id = %id, error = %e, "Failed to {action} sandbox");
                Self::error_result(e.to_string())
            }
        }
    }

    /// Convert schemars RootSchema to rmcp JsonObject
    fn schema_to_json_object<T: schemars::JsonSchema>(
    ) -> Arc<serde_json::Map<String, serde_json::Value>> {
        let schema = schema_for!(T);
        let json = serde_json::to_value(&schema.schema).unwrap_or_else(|_| serde_json::json!({}));
        match json {
            serde_json::Value::Object(map) => Arc::new(map),
            _ => Arc::new(serde_json::Map::new()),
        }
    }

    // ========================================================================
    // Tool Implementations
    // ========================================================================

    async fn handle_create_sandbox(
        &self,
        args: Option<serde_json::Map<String, serde_json::Value>>,
    ) -> CallToolResult {
        let params: CreateSandboxParams = match args
            .map(|a| serde_json::from_value(serde_json::Value::Object(a)))
            .transpose()
        {
            Ok(p) => p.unwrap_or_default(),
            Err(e) => return Self::error_result(format!("Invalid parameters: {e}")),
        };

        tracing::debug!("Creating sandbox with params: {:?}", params);

        let start = match Self::start_options(
            params.vm_tier.as_deref(),
            params.ipcountry,
            params.hibernation_timeout_seconds,
        ) {
            Ok(s) => s,
            Err(e) => return Self::error_result(e),
        };

        let mut opts = CreateOptions::new().auto_connect(false).start(start);
        if let Some(template) = params.template_id {
            opts = opts.template(template);
        }
        if let Some(privacy) = params.privacy {
            opts = opts.privacy(privacy.into());
        }
        if let Some(title) = params.title {
            opts = opts.title(title);
        }
        if let Some(description) = params.description {
            opts = opts.description(description);
        }
        if let Some(tags) = params.tags {
            opts = opts.tags(tags);
        }
        if let Some(path) = params.path {
            opts = opts.path(path);
        }

        match self.client.create(opts).await.map(|r| r.unconnected()) {
            Ok(Some(start_data)) => {
                let sandbox_id = start_data.id.clone().unwrap_or_default();
                tracing::info!(sandbox_id = %sandbox_id, "Created sandbox");
                Self::json_result(&CreateSandboxResult {
                    sandbox_id,
                    start_data,
                })
            }
            Ok(None) => Self::error_result("Sandbox was connected instead of returning start data"),
            Err(e) => {
                tracing::error!(error = %e, "Failed to create sandbox");
                Self::error_result(e.to_string())
            }
        }
    }

    async fn handle_start_sandbox(
        &self,
        args: Option<serde_json::Map<String, serde_json::Value>>,
    ) -> CallToolResult {
        let params: StartSandboxParams = match Self::parse_params(
            args,
            "Missing required parameter: sandbox_id",
        ) {
            Ok(p) => p,
            Err(result) => return result,
        };

        let start = match Self::start_options(
            params.vm_tier.as_deref(),
            params.ipcountry,
            params.hibernation_timeout_seconds,
        ) {
            Ok(s) => s,
            Err(e) => return Self::error_result(e),
        };

        match self.client.start(&params.sandbox_id, Some(&start)).await {
            Ok(start_data) => Self::json_result(&CreateSandboxResult {
                sandbox_id: params.sandbox_id,
                start_data,
            }),
            Err(e) => {
                tracing::error!(sandbox_id = %params.sandbox_id, error = %e, "Failed to start sandbox");
                Self::error_result(e.to_string())
            }
        }
    }

    async fn handle_shutdown_sandbox(
        &self,
        args: Option<serde_json::Map<String, serde_json::Value>>,
    ) -> CallToolResult {
        let params: SandboxIdParams = match Self::parse_params(
            args,
            "Missing required parameter: sandbox_id",
        ) {
            Ok(p) => p,
            Err(result) => return result,
        };

        let result = self.client.shutdown(&params.sandbox_id).await;
        Self::operation_result(result, "shut down", &params.sandbox_id)
    }

    async fn handle_hibernate_sandbox(
        &self,
        args: Option<serde_json::Map<String, serde_json::Value>>,
    ) -> CallToolResult {
        let params: SandboxIdParams = match Self::parse_params(
            args,
            "Missing required parameter: sandbox_id",
        ) {
            Ok(p) => p,
            Err(result) => return result,
        };

        let result = self.client.hibernate(&params.sandbox_id).await;
        Self::operation_result(result, "hibernate", &params.sandbox_id)
    }

    async fn handle_list_sandboxes(
        &self,
        args: Option<serde_json::Map<String, serde_json::Value>>,
    ) -> CallToolResult {
        let params: ListSandboxesParams = match args
            .map(|a| serde_json::from_value(serde_json::Value::Object(a)))
            .transpose()
        {
            Ok(p) => p.unwrap_or_default(),
            Err(e) => return Self::error_result(format!("Invalid parameters: {e}")),
        };

        let pagination = (params.page.is_some() || params.page_size.is_some()).then_some(Pagination {
            page: params.page,
            page_size: params.page_size,
        });

        let opts = ListOptions {
            tags: params.tags,
            order_by: params.order_by.map(Into::into),
            direction: params.direction.map(Into::into),
            status: params.running_only.then_some(StatusFilter::Running),
            limit: params.limit,
            pagination,
        };

        match self.client.list(opts).await {
            Ok(response) => Self::json_result(&response),
            Err(e) => {
                tracing::error!(error = %e, "Failed to list sandboxes");
                Self::error_result(e.to_string())
            }
        }
    }

    async fn handle_update_tier(
        &self,
        args: Option<serde_json::Map<String, serde_json::Value>>,
    ) -> CallToolResult {
        let params: UpdateTierParams = match Self::parse_params(
            args,
            "Missing required parameters: sandbox_id, tier",
        ) {
            Ok(p) => p,
            Err(result) => return result,
        };

        let tier = match VmTier::from_name(&params.tier) {
            Ok(t) => t,
            Err(e) => return Self::error_result(e.to_string()),
        };

        let result = self.client.update_tier(&params.sandbox_id, tier).await;
        Self::operation_result(result, "update tier of", &params.sandbox_id)
    }

    async fn handle_update_hibernation_timeout(
        &self,
        args: Option<serde_json::Map<String, serde_json::Value>>,
    ) -> CallToolResult {
        let params: UpdateHibernationTimeoutParams = match Self::parse_params(
            args,
            "Missing required parameters: sandbox_id, timeout_seconds",
        ) {
            Ok(p) => p,
            Err(result) => return result,
        };

        let result = self
            .client
            .update_hibernation_timeout(&params.sandbox_id, params.timeout_seconds)
            .await;
        Self::operation_result(result, "update hibernation timeout of", &params.sandbox_id)
    }

    async fn handle_create_preview_token(
        &self,
        args: Option<serde_json::Map<String, serde_json::Value>>,
    ) -> CallToolResult {
        let params: CreatePreviewTokenParams = match Self::parse_params(
            args,
            "Missing required parameter: sandbox_id",
        ) {
            Ok(p) => p,
            Err(result) => return result,
        };

        let expires_at = match params.expires_at.as_deref().map(Self::parse_expiry).transpose() {
            Ok(t) => t,
            Err(e) => return Self::error_result(e),
        };

        match self
            .client
            .preview_tokens(&params.sandbox_id)
            .create(expires_at)
            .await
        {
            Ok(token) => {
                tracing::info!(sandbox_id = %params.sandbox_id, token_id = %token.token_id, "Created preview token");
                Self::json_result(&token)
            }
            Err(e) => Self::error_result(e.to_string()),
        }
    }

    async fn handle_list_preview_tokens(
        &self,
        args: Option<serde_json::Map<String, serde_json::Value>>,
    ) -> CallToolResult {
        let params: SandboxIdParams = match Self::parse_params(
            args,
            "Missing required parameter: sandbox_id",
        ) {
            Ok(p) => p,
            Err(result) => return result,
        };

        match self.client.preview_tokens(&params.sandbox_id).list().await {
            Ok(tokens) => Self::json_result(&tokens),
            Err(e) => Self::error_result(e.to_string()),
        }
    }

    async fn handle_revoke_preview_token(
        &self,
        args: Option<serde_json::Map<String, serde_json::Value>>,
    ) -> CallToolResult {
        let params: RevokePreviewTokenParams = match Self::parse_params(
            args,
            "Missing required parameters: sandbox_id, token_id",
        ) {
            Ok(p) => p,
            Err(result) => return result,
        };

        match self
            .client
            .preview_tokens(&params.sandbox_id)
            .revoke(&params.token_id)
            .await
        {
            Ok(()) => Self::json_result(&OperationResult { success: true }),
            Err(e) => Self::error_result(e.to_string()),
        }
    }

    async fn handle_revoke_all_preview_tokens(
        &self,
        args: Option<serde_json::Map<String, serde_json::Value>>,
    ) -> CallToolResult {
        let params: SandboxIdParams = match Self::parse_params(
            args,
            "Missing required parameter: sandbox_id",
        ) {
            Ok(p) => p,
            Err(result) => return result,
        };

        match self.client.preview_tokens(&params.sandbox_id).revoke_all().await {
            Ok(()) => Self::json_result(&OperationResult { success: true }),
            Err(e) => Self::error_result(e.to_string()),
        }
    }

    async fn handle_create_session(
        &self,
        args: Option<serde_json::Map<String, serde_json::Value>>,
    ) -> CallToolResult {
        let params: CreateSessionParams = match Self::parse_params(
            args,
            "Missing required parameter: sandbox_id",
        ) {
            Ok(p) => p,
            Err(result) => return result,
        };

        let session_id = params
            .session_id
            .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());
        let opts = SessionOptions {
            permission: params.permission.map(Into::into).unwrap_or_default(),
            auto_connect: false,
        };

        match self
            .client
            .create_session(&params.sandbox_id, &session_id, opts)
            .await
            .map(|r| r.unconnected())
        {
            Ok(Some(info)) => Self::json_result(&info),
            Ok(None) => Self::error_result("Session was connected instead of returning credentials"),
            Err(e) => {
                tracing::error!(sandbox_id = %params.sandbox_id, error = %e, "Failed to create session");
                Self::error_result(e.to_string())
            }
        }
    }

    /// Names of the exposed tools, in listing order.
    pub fn tool_names() -> Vec<String> {
        Self::build_tools_list()
            .into_iter()
            .map(|t| t.name.into_owned())
            .collect()
    }

    /// Build the list of available tools
    fn build_tools_list() -> Vec<Tool> {
        vec![
            Tool::new(
                "create_sandbox",
                "Fork a template into a new sandbox and start it. Returns sandbox_id and start data.",
                Self::schema_to_json_object::<CreateSandboxParams>(),
            ),
            Tool::new(
                "start_sandbox",
                "Start (or resume) an existing sandbox. Returns fresh start data.",
                Self::schema_to_json_object::<StartSandboxParams>(),
            ),
            Tool::new(
                "shutdown_sandbox",
                "Shut a sandbox down. Files are saved and the VM is stopped.",
                Self::schema_to_json_object::<SandboxIdParams>(),
            ),
            Tool::new(
                "hibernate_sandbox",
                "Hibernate a sandbox. Its memory is snapshotted for a fast resume.",
                Self::schema_to_json_object::<SandboxIdParams>(),
            ),
            Tool::new(
                "list_sandboxes",
                "List sandboxes with optional tag, status and ordering filters.",
                Self::schema_to_json_object::<ListSandboxesParams>(),
            ),
            Tool::new(
                "update_tier",
                "Change the VM tier (CPU, memory, disk) of a running sandbox.",
                Self::schema_to_json_object::<UpdateTierParams>(),
            ),
            Tool::new(
                "update_hibernation_timeout",
                "Change how long a sandbox may stay idle before it hibernates.",
                Self::schema_to_json_object::<UpdateHibernationTimeoutParams>(),
            ),
            Tool::new(
                "create_preview_token",
                "Create a token granting access to a private sandbox's preview.",
                Self::schema_to_json_object::<CreatePreviewTokenParams>(),
            ),
            Tool::new(
                "list_preview_tokens",
                "List the preview tokens of a sandbox.",
                Self::schema_to_json_object::<SandboxIdParams>(),
            ),
            Tool::new(
                "revoke_preview_token",
                "Revoke a single preview token.",
                Self::schema_to_json_object::<RevokePreviewTokenParams>(),
            ),
            Tool::new(
                "revoke_all_preview_tokens",
                "Revoke every preview token of a sandbox.",
                Self::schema_to_json_object::<SandboxIdParams>(),
            ),
            Tool::new(
                "create_session",
                "Create a session on a sandbox and return its connection credentials.",
                Self::schema_to_json_object::<CreateSessionParams>(),
            ),
        ]
    }
}

// ============================================================================
// ServerHandler Implementation
// ============================================================================

impl ServerHandler for SandpitServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            protocol_version: ProtocolVersion::V_2024_11_05,
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            server_info: Implementation::from_build_env(),
            instructions: Some(
                "Sandpit MCP Server - Create and manage remote sandboxes. \
                 Use create_sandbox to fork a template, start_sandbox to resume one, \
                 and hibernate_sandbox or shutdown_sandbox when done. Preview tokens \
                 and sessions grant access to a sandbox without sharing the API token."
                    .into(),
            ),
        }
    }

    async fn list_tools(
        &self,
        _request: Option<PaginatedRequestParam>,
        _context: RequestContext<RoleServer>,
    ) -> Result<ListToolsResult, ErrorData> {
        Ok(ListToolsResult {
            tools: Self::build_tools_list(),
            next_cursor: None,
            meta: None,
        })
    }

    async fn call_tool(
        &self,
        request: CallToolRequestParam,
        _context: RequestContext<RoleServer>,
    ) -> Result<CallToolResult, ErrorData> {
        let result = match request.name.as_ref() {
            "create_sandbox" => self.handle_create_sandbox(request.arguments).await,
            "start_sandbox" => self.handle_start_sandbox(request.arguments).await,
            "shutdown_sandbox" => self.handle_shutdown_sandbox(request.arguments).await,
            "hibernate_sandbox" => self.handle_hibernate_sandbox(request.arguments).await,
            "list_sandboxes" => self.handle_list_sandboxes(request.arguments).await,
            "update_tier" => self.handle_update_tier(request.arguments).await,
            "update_hibernation_timeout" => {
                self.handle_update_hibernation_timeout(request.arguments).await
            }
            "create_preview_token" => self.handle_create_preview_token(request.arguments).await,
            "list_preview_tokens" => self.handle_list_preview_tokens(request.arguments).await,
            "revoke_preview_token" => self.handle_revoke_preview_token(request.arguments).await,
            "revoke_all_preview_tokens" => {
                self.handle_revoke_all_preview_tokens(request.arguments).await
            }
            "create_session" => self.handle_create_session(request.arguments).await,
            _ => Self::error_result(format!("Unknown tool: {}", request.name)),
        };

        Ok(result)
    }
}
