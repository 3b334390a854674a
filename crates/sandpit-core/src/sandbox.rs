//! Sandbox type - a live connection to a running VM.

use crate::client::SandboxClient;
use crate::connect::{Detached, RealtimeClient};
use crate::error::Result;
use crate::preview::PreviewTokens;
use crate::tier::VmTier;
use std::fmt;

/// A connected sandbox.
///
/// Wraps the connection returned by the real-time client together with the
/// [`SandboxClient`] that created it, so lifecycle operations can be issued
/// straight from the handle. Only produced by connecting operations.
pub struct Sandbox<R: RealtimeClient = Detached> {
    id: String,
    client: SandboxClient<R>,
    connection: R::Connection,
}

/// A connected collaborative session. Same handle, obtained through
/// [`SandboxClient::create_session`].
pub type SandboxSession<R = Detached> = Sandbox<R>;

impl<R: RealtimeClient> Sandbox<R> {
    pub(crate) fn new(id: String, client: SandboxClient<R>, connection: R::Connection) -> Self {
        Self {
            id,
            client,
            connection,
        }
    }

    /// Get the sandbox ID.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// The client this sandbox was opened through.
    pub fn client(&self) -> &SandboxClient<R> {
        &self.client
    }

    /// The live real-time connection.
    pub fn connection(&self) -> &R::Connection {
        &self.connection
    }

    /// Give up the handle, keeping only the connection.
    pub fn into_connection(self) -> R::Connection {
        self.connection
    }

    pub async fn shutdown(&self) -> Result<()> {
        self.client.shutdown(&self.id).await
    }

    pub async fn hibernate(&self) -> Result<()> {
        self.client.hibernate(&self.id).await
    }

    pub async fn update_tier(&self, tier: VmTier) -> Result<()> {
        self.client.update_tier(&self.id, tier).await
    }

    pub async fn update_hibernation_timeout(&self, timeout_seconds: u32) -> Result<()> {
        self.client
            .update_hibernation_timeout(&self.id, timeout_seconds)
            .await
    }

    /// Preview tokens of this sandbox.
    pub fn preview_tokens(&self) -> PreviewTokens<'_> {
        self.client.preview_tokens(&self.id)
    }
}

impl<R: RealtimeClient> fmt::Debug for Sandbox<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Sandbox")
            .field("id", &self.id)
            .finish_non_exhaustive()
    }
}
