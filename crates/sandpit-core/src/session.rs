//! Collaborative sessions on a running sandbox.

use crate::client::SandboxClient;
use crate::connect::{CredentialSource, MaybeConnected, RealtimeClient, StartCredentials};
use crate::error::Result;
use crate::resolve::resolve;
use crate::sandbox::SandboxSession;
use crate::start::SandboxStartData;
use sandpit_api::types::CreateSessionRequest;
use sandpit_api::MANAGER_URL_HEADER;
use serde::{Deserialize, Serialize};

/// Version string reported for session connections.
const SESSION_VERSION: &str = "1.0.0-session";

/// What a session may do in the sandbox.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Permission {
    Read,
    #[default]
    Write,
}

impl Permission {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Read => "read",
            Self::Write => "write",
        }
    }
}

/// Options for [`SandboxClient::create_session`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionOptions {
    /// Defaults to write.
    pub permission: Permission,
    /// Connect right away. Defaults to `true`.
    pub auto_connect: bool,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            permission: Permission::Write,
            auto_connect: true,
        }
    }
}

/// Credentials for connecting to a session later, e.g. from a browser.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionConnectInfo {
    /// Sandbox the session belongs to.
    pub id: String,
    pub pitcher_token: String,
    pub pitcher_url: String,
    pub user_workspace_path: String,
}

impl SessionConnectInfo {
    /// Start bundle for connecting with these credentials.
    ///
    /// Sessions attach to a VM that is already up, so the bundle reports a
    /// resume on a synthetic `session` cluster.
    pub fn start_data(&self) -> SandboxStartData {
        SandboxStartData {
            bootup_type: "RESUME".to_string(),
            cluster: "session".to_string(),
            id: Some(self.id.clone()),
            latest_pitcher_version: SESSION_VERSION.to_string(),
            pitcher_manager_version: SESSION_VERSION.to_string(),
            pitcher_token: self.pitcher_token.clone(),
            pitcher_url: self.pitcher_url.clone(),
            pitcher_version: SESSION_VERSION.to_string(),
            reconnect_token: Some(String::new()),
            user_workspace_path: self.user_workspace_path.clone(),
            workspace_path: self.user_workspace_path.clone(),
        }
    }
}

impl<R: RealtimeClient> SandboxClient<R> {
    /// Create a session on a sandbox, identified by `session_id`.
    ///
    /// With `auto_connect` the session is connected and returned as a live
    /// handle; otherwise only its credentials are returned.
    pub async fn create_session(
        &self,
        sandbox_id: &str,
        session_id: &str,
        opts: SessionOptions,
    ) -> Result<MaybeConnected<SandboxSession<R>, SessionConnectInfo>> {
        tracing::info!(
            sandbox_id = %sandbox_id,
            session_id = %session_id,
            permission = opts.permission.as_str(),
            "Creating session"
        );

        let body = CreateSessionRequest {
            session_id: session_id.to_string(),
            permission: opts.permission.as_str().to_string(),
        };
        let response = self.api().vm_create_session(sandbox_id, &body).await?;
        let manager_url = response.header(MANAGER_URL_HEADER).map(str::to_string);
        let session = resolve(response, &format!("Failed to create session {session_id}"))?;

        let info = SessionConnectInfo {
            id: sandbox_id.to_string(),
            pitcher_token: session.pitcher_token,
            pitcher_url: session.pitcher_url,
            user_workspace_path: session.user_workspace_path,
        };

        if !opts.auto_connect {
            return Ok(MaybeConnected::Unconnected(info));
        }

        let credentials = StartCredentials {
            data: info.start_data(),
            manager_url,
        };
        let session = self
            .connect_to_sandbox(sandbox_id, CredentialSource::Session(credentials))
            .await?;
        Ok(MaybeConnected::Connected(session))
    }
}
