//! Live connections to running sandboxes.
//!
//! Connecting is a two-phase handshake. The control plane first hands out a
//! start bundle (endpoint URL, single-use token, versions). A
//! [`RealtimeClient`] then turns that bundle into a live connection to the
//! in-VM agent. The real-time client never sees the control plane: it only
//! gets an instance-provider callback it may call again whenever it has to
//! reconnect.
//!
//! ```text
//! SandboxClient ──start──▶ control plane
//!       │                       │ x-pitcher-manager-url?
//!       │                       ▼
//!       │               global scheduler (best effort)
//!       ▼
//! RealtimeClient::connect(RealtimeInit) ──provide_instance()──▶ InstanceInfo
//! ```

use crate::client::SandboxClient;
use crate::error::{CoreError, Result};
use crate::sandbox::Sandbox;
use crate::start::{SandboxStartData, StartOptions};
use async_trait::async_trait;
use futures::future::BoxFuture;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::convert::Infallible;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use tokio::sync::Mutex;

/// Application id announced to the in-VM agent.
pub const APP_ID: &str = "sdk";

// ============================================================================
// Real-time client seam
// ============================================================================

/// Future returned by an [`InstanceProvider`].
pub type InstanceFuture = BoxFuture<'static, Result<InstanceInfo>>;

/// Re-callable credential fetch handed to the real-time client.
pub type InstanceProvider = Arc<dyn Fn() -> InstanceFuture + Send + Sync>;

/// Hook invoked when the focus of the connection changes.
pub type FocusHook = Arc<dyn Fn() + Send + Sync>;

/// Opens live connections to the in-VM agent.
#[async_trait]
pub trait RealtimeClient: Send + Sync + 'static {
    /// Live connection handle.
    type Connection: Send + Sync + 'static;

    /// Establish a connection.
    ///
    /// Implementations call [`RealtimeInit::instance`] to obtain
    /// credentials, and may call it again later to reconnect.
    async fn connect(&self, init: RealtimeInit) -> Result<Self::Connection>;
}

/// Everything a real-time client is initialized with.
#[derive(Clone)]
pub struct RealtimeInit {
    pub app_id: String,
    /// Id of the sandbox being connected to.
    pub instance_id: String,
    pub subscriptions: Subscriptions,
    pub on_focus_change: FocusHook,
    pub provide_instance: InstanceProvider,
}

impl RealtimeInit {
    /// Fetch fresh instance credentials.
    pub async fn instance(&self) -> Result<InstanceInfo> {
        (self.provide_instance)().await
    }
}

impl fmt::Debug for RealtimeInit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RealtimeInit")
            .field("app_id", &self.app_id)
            .field("instance_id", &self.instance_id)
            .field("subscriptions", &self.subscriptions)
            .finish_non_exhaustive()
    }
}

/// Real-time client for facades that never connect.
///
/// Any attempt to connect fails with [`CoreError::Realtime`].
#[derive(Debug, Clone, Copy, Default)]
pub struct Detached;

#[async_trait]
impl RealtimeClient for Detached {
    type Connection = Infallible;

    async fn connect(&self, init: RealtimeInit) -> Result<Self::Connection> {
        Err(CoreError::Realtime(format!(
            "no real-time client configured, cannot connect to {}",
            init.instance_id
        )))
    }
}

/// Outcome of an operation that may or may not connect.
#[derive(Debug)]
pub enum MaybeConnected<C, U> {
    /// A live handle.
    Connected(C),
    /// Only the credentials needed to connect later.
    Unconnected(U),
}

impl<C, U> MaybeConnected<C, U> {
    pub fn is_connected(&self) -> bool {
        matches!(self, Self::Connected(_))
    }

    pub fn connected(self) -> Option<C> {
        match self {
            Self::Connected(c) => Some(c),
            Self::Unconnected(_) => None,
        }
    }

    pub fn unconnected(self) -> Option<U> {
        match self {
            Self::Connected(_) => None,
            Self::Unconnected(u) => Some(u),
        }
    }
}

// ============================================================================
// Instance credentials
// ============================================================================

/// How the VM came up.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum BootupType {
    Running,
    Clean,
    Resume,
    Fork,
}

impl BootupType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Running => "RUNNING",
            Self::Clean => "CLEAN",
            Self::Resume => "RESUME",
            Self::Fork => "FORK",
        }
    }
}

impl FromStr for BootupType {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "RUNNING" => Ok(Self::Running),
            "CLEAN" => Ok(Self::Clean),
            "RESUME" => Ok(Self::Resume),
            "FORK" => Ok(Self::Fork),
            other => Err(CoreError::Protocol(format!("unknown bootup type: {other}"))),
        }
    }
}

/// Credentials in the shape the real-time client consumes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstanceInfo {
    pub bootup_type: BootupType,
    pub pitcher_url: String,
    pub workspace_path: String,
    pub user_workspace_path: String,
    pub pitcher_manager_version: String,
    pub pitcher_version: String,
    pub latest_pitcher_version: String,
    pub pitcher_token: String,
    pub cluster: String,
}

impl TryFrom<SandboxStartData> for InstanceInfo {
    type Error = CoreError;

    fn try_from(data: SandboxStartData) -> Result<Self> {
        Ok(Self {
            bootup_type: data.bootup_type.parse()?,
            pitcher_url: data.pitcher_url,
            workspace_path: data.workspace_path,
            user_workspace_path: data.user_workspace_path,
            pitcher_manager_version: data.pitcher_manager_version,
            pitcher_version: data.pitcher_version,
            latest_pitcher_version: data.latest_pitcher_version,
            pitcher_token: data.pitcher_token,
            cluster: data.cluster,
        })
    }
}

// ============================================================================
// Subscriptions
// ============================================================================

/// Event groups the real-time client subscribes to, e.g. `file.status`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Subscriptions(BTreeMap<String, BTreeMap<String, bool>>);

impl Subscriptions {
    /// No subscriptions at all.
    pub fn empty() -> Self {
        Self(BTreeMap::new())
    }

    /// Subscribe to `group.event`.
    pub fn enable(mut self, group: &str, event: &str) -> Self {
        self.0
            .entry(group.to_string())
            .or_default()
            .insert(event.to_string(), true);
        self
    }

    pub fn is_enabled(&self, group: &str, event: &str) -> bool {
        self.0
            .get(group)
            .and_then(|events| events.get(event))
            .copied()
            .unwrap_or(false)
    }
}

impl Default for Subscriptions {
    fn default() -> Self {
        Self::empty()
            .enable("client", "status")
            .enable("file", "status")
            .enable("file", "selection")
            .enable("file", "ot")
            .enable("fs", "operations")
            .enable("git", "status")
            .enable("git", "operations")
            .enable("port", "status")
            .enable("setup", "progress")
            .enable("shell", "status")
            .enable("system", "metrics")
    }
}

// ============================================================================
// Connector
// ============================================================================

/// A start bundle plus the manager hint that came with it.
#[derive(Debug, Clone)]
pub(crate) struct StartCredentials {
    pub data: SandboxStartData,
    pub manager_url: Option<String>,
}

/// Where the instance provider gets its credentials from.
pub(crate) enum CredentialSource {
    /// Call start every time.
    Start(Option<StartOptions>),
    /// Credentials already fetched alongside a fork. The token is single-use,
    /// so later calls fall back to start.
    Prefetched {
        credentials: Mutex<Option<StartCredentials>>,
        fallback: Option<StartOptions>,
    },
    /// Session credentials, valid for the whole session.
    Session(StartCredentials),
}

impl CredentialSource {
    pub(crate) fn prefetched(credentials: StartCredentials, fallback: Option<StartOptions>) -> Self {
        Self::Prefetched {
            credentials: Mutex::new(Some(credentials)),
            fallback,
        }
    }

    async fn fetch<R: RealtimeClient>(
        &self,
        client: &SandboxClient<R>,
        id: &str,
    ) -> Result<StartCredentials> {
        match self {
            Self::Start(opts) => client.start_with_hint(id, opts.as_ref()).await,
            Self::Prefetched {
                credentials,
                fallback,
            } => {
                let taken = credentials.lock().await.take();
                match taken {
                    Some(credentials) => Ok(credentials),
                    None => client.start_with_hint(id, fallback.as_ref()).await,
                }
            }
            Self::Session(credentials) => Ok(credentials.clone()),
        }
    }
}

impl<R: RealtimeClient> SandboxClient<R> {
    /// Hand the real-time client an instance provider and wrap the
    /// connection it returns.
    pub(crate) async fn connect_to_sandbox(
        &self,
        id: &str,
        source: CredentialSource,
    ) -> Result<Sandbox<R>> {
        tracing::debug!(sandbox_id = %id, "Connecting to sandbox");

        let source = Arc::new(source);
        let client = self.clone();
        let instance_id = id.to_string();
        let provide_instance: InstanceProvider = Arc::new(move || -> InstanceFuture {
            let client = client.clone();
            let source = Arc::clone(&source);
            let id = instance_id.clone();
            Box::pin(async move {
                let credentials = source.fetch(&client, &id).await?;
                client.correct_cluster(&id, &credentials).await;
                InstanceInfo::try_from(credentials.data)
            })
        });

        let init = RealtimeInit {
            app_id: APP_ID.to_string(),
            instance_id: id.to_string(),
            subscriptions: Subscriptions::default(),
            on_focus_change: Arc::new(|| {}),
            provide_instance,
        };

        let connection = self.realtime().connect(init).await.inspect_err(|e| {
            tracing::warn!(sandbox_id = %id, error = %e, "Real-time connection failed");
        })?;

        tracing::info!(sandbox_id = %id, "Connected to sandbox");
        Ok(Sandbox::new(id.to_string(), self.clone(), connection))
    }

    /// Tell the global scheduler which manager actually holds the VM.
    ///
    /// Best effort: runs as its own task, is awaited, and any failure is
    /// only logged.
    async fn correct_cluster(&self, sandbox_id: &str, credentials: &StartCredentials) {
        let Some(hint) = credentials.manager_url.as_deref() else {
            return;
        };

        let preferred_manager = hint.replacen("/api/v1", "", 1).replacen("https://", "", 1);
        let vm_id = credentials
            .data
            .id
            .clone()
            .unwrap_or_else(|| sandbox_id.to_string());
        let scheduler_url = self.config().scheduler_url();
        let api = Arc::clone(self.api());

        tracing::debug!(
            sandbox_id = %vm_id,
            preferred_manager = %preferred_manager,
            "Reporting cluster to global scheduler"
        );

        let task = tokio::spawn(async move {
            api.report_cluster(&scheduler_url, &vm_id, &preferred_manager)
                .await
        });

        match task.await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => {
                tracing::warn!(sandbox_id = %sandbox_id, error = %e, "Cluster affinity update failed");
            }
            Err(e) => {
                tracing::warn!(sandbox_id = %sandbox_id, error = %e, "Cluster affinity task panicked");
            }
        }
    }
}
