//! Preview tokens: signed credentials granting access to the network
//! preview of a private sandbox.

use crate::error::{CoreError, Result};
use crate::info::parse_timestamp;
use crate::resolve::{resolve, resolve_unit};
use chrono::{DateTime, SecondsFormat, Utc};
use sandpit_api::types::{PreviewTokenRecord, PreviewTokenRequest, PreviewTokenUpdateRequest};
use sandpit_api::ControlPlane;
use serde::Serialize;

/// A newly created preview token, including its secret.
///
/// The secret is only ever returned at creation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PreviewToken {
    pub token: String,
    pub token_id: String,
    pub token_prefix: String,
    pub expires_at: Option<DateTime<Utc>>,
    pub last_used_at: Option<DateTime<Utc>>,
}

/// An existing preview token, without its secret.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PreviewTokenInfo {
    pub token_id: String,
    pub token_prefix: String,
    pub expires_at: Option<DateTime<Utc>>,
    pub last_used_at: Option<DateTime<Utc>>,
}

impl TryFrom<PreviewTokenRecord> for PreviewTokenInfo {
    type Error = CoreError;

    fn try_from(record: PreviewTokenRecord) -> Result<Self> {
        Ok(Self {
            token_id: record.token_id,
            token_prefix: record.token_prefix,
            expires_at: parse_optional(record.expires_at.as_deref())?,
            last_used_at: parse_optional(record.last_used_at.as_deref())?,
        })
    }
}

fn parse_optional(value: Option<&str>) -> Result<Option<DateTime<Utc>>> {
    value.map(parse_timestamp).transpose()
}

fn format_timestamp(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Preview-token operations scoped to one sandbox.
///
/// Obtained from [`SandboxClient::preview_tokens`](crate::SandboxClient::preview_tokens)
/// or [`Sandbox::preview_tokens`](crate::Sandbox::preview_tokens).
pub struct PreviewTokens<'a> {
    api: &'a dyn ControlPlane,
    sandbox_id: String,
}

impl<'a> PreviewTokens<'a> {
    pub(crate) fn new(api: &'a dyn ControlPlane, sandbox_id: &str) -> Self {
        Self {
            api,
            sandbox_id: sandbox_id.to_string(),
        }
    }

    pub fn sandbox_id(&self) -> &str {
        &self.sandbox_id
    }

    /// Create a token; `None` means it never expires.
    pub async fn create(&self, expires_at: Option<DateTime<Utc>>) -> Result<PreviewToken> {
        tracing::info!(sandbox_id = %self.sandbox_id, "Creating preview token");
        let body = PreviewTokenRequest {
            expires_at: expires_at.map(format_timestamp),
        };
        let response = self
            .api
            .preview_token_create(&self.sandbox_id, &body)
            .await?;
        let data = resolve(response, "Failed to create preview token")?;

        let Some(mut record) = data.token else {
            return Err(CoreError::Protocol("No token returned from API".into()));
        };
        let Some(token) = record.token.take() else {
            return Err(CoreError::Protocol("No token returned from API".into()));
        };
        let info = PreviewTokenInfo::try_from(record)?;

        Ok(PreviewToken {
            token,
            token_id: info.token_id,
            token_prefix: info.token_prefix,
            expires_at: info.expires_at,
            last_used_at: info.last_used_at,
        })
    }

    /// List the active tokens.
    pub async fn list(&self) -> Result<Vec<PreviewTokenInfo>> {
        let response = self.api.preview_token_list(&self.sandbox_id).await?;
        let data = resolve(response, "Failed to list preview tokens")?;

        data.tokens
            .unwrap_or_default()
            .into_iter()
            .map(PreviewTokenInfo::try_from)
            .collect()
    }

    /// Change the expiry of a token; `None` clears it so the token never
    /// expires.
    pub async fn update(
        &self,
        token_id: &str,
        expires_at: Option<DateTime<Utc>>,
    ) -> Result<PreviewTokenInfo> {
        tracing::info!(sandbox_id = %self.sandbox_id, token_id = %token_id, "Updating preview token");
        let body = PreviewTokenUpdateRequest {
            expires_at: expires_at.map(format_timestamp),
        };
        let response = self
            .api
            .preview_token_update(&self.sandbox_id, token_id, &body)
            .await?;
        let data = resolve(response, "Failed to update preview token")?;

        let record = data
            .token
            .ok_or_else(|| CoreError::Protocol("No token returned from API".into()))?;
        PreviewTokenInfo::try_from(record)
    }

    /// Revoke one token by expiring it now.
    pub async fn revoke(&self, token_id: &str) -> Result<()> {
        tracing::info!(sandbox_id = %self.sandbox_id, token_id = %token_id, "Revoking preview token");
        let body = PreviewTokenUpdateRequest {
            expires_at: Some(format_timestamp(Utc::now())),
        };
        let response = self
            .api
            .preview_token_update(&self.sandbox_id, token_id, &body)
            .await?;
        resolve_unit(response, "Failed to revoke preview token")
    }

    /// Revoke every token of the sandbox at once.
    pub async fn revoke_all(&self) -> Result<()> {
        tracing::info!(sandbox_id = %self.sandbox_id, "Revoking all preview tokens");
        let response = self.api.preview_token_revoke_all(&self.sandbox_id).await?;
        resolve_unit(response, "Failed to revoke preview tokens")
    }
}
