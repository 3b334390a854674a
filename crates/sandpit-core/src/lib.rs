//! # sandpit-core
//!
//! Lifecycle orchestration for Sandpit remote sandboxes.
//!
//! This crate turns the control-plane REST calls of `sandpit-api` into
//! higher-level operations: create-or-fork with auto-connect, deduplicating
//! paginated listing, VM tier selection and the start-then-connect
//! handshake.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │                      sandpit-core                        │
//! ├──────────────────────────────────────────────────────────┤
//! │                                                          │
//! │  ┌─────────────────┐     ┌──────────────────────────┐   │
//! │  │ SandboxClient   │────▶│  dyn ControlPlane        │   │
//! │  │   - start()     │     │  (from sandpit-api)      │   │
//! │  │   - create()    │     └──────────────────────────┘   │
//! │  │   - list()      │                                    │
//! │  └─────────────────┘                                    │
//! │           │ open / create / create_session              │
//! │           ▼                                              │
//! │  ┌─────────────────┐     ┌──────────────────────────┐   │
//! │  │  connector      │────▶│  RealtimeClient          │   │
//! │  │  (provider +    │     │  (your implementation)   │   │
//! │  │   cluster fix)  │     └──────────────────────────┘   │
//! │  └─────────────────┘                │                   │
//! │           │                          │ Connection        │
//! │           ▼                          ▼                   │
//! │  ┌──────────────────────────────────────────────────┐   │
//! │  │  Sandbox<R>  (connection + client back-ref)      │   │
//! │  └──────────────────────────────────────────────────┘   │
//! └──────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```no_run
//! use sandpit_api::ApiConfig;
//! use sandpit_core::{CreateOptions, ListOptions, SandboxClient, VmTier};
//!
//! # async fn example() -> sandpit_core::Result<()> {
//! let client = SandboxClient::from_api_config(ApiConfig::from_env())?;
//!
//! // Fork the default template without connecting
//! let created = client
//!     .create(CreateOptions::new().title("scratch").auto_connect(false))
//!     .await?;
//! if let Some(start) = created.unconnected() {
//!     println!("connect to {} with {}", start.pitcher_url, start.pitcher_token);
//! }
//!
//! // Rescale and list
//! client.update_tier("abc123", VmTier::Small).await?;
//! let listing = client.list(ListOptions::default()).await?;
//! println!("{} of {} sandboxes", listing.sandboxes.len(), listing.total_count);
//! # Ok(())
//! # }
//! ```

mod client;
mod config;
mod connect;
mod error;
mod info;
mod list;
mod preview;
mod resolve;
mod sandbox;
mod session;
mod start;
mod tier;

#[cfg(test)]
mod testing;

pub use client::{CreateOptions, SandboxClient, Template, DEFAULT_PATH, SDK_TAG};
pub use config::{ClientConfig, DEFAULT_TEMPLATE, STAGING_TEMPLATE};
pub use connect::{
    BootupType, Detached, FocusHook, InstanceFuture, InstanceInfo, InstanceProvider,
    MaybeConnected, RealtimeClient, RealtimeInit, Subscriptions, APP_ID,
};
pub use error::{CoreError, Result};
pub use info::{Privacy, SandboxInfo};
pub use list::{
    Direction, ListOptions, ListResponse, OrderBy, PageCursor, Pagination, StatusFilter,
    DEFAULT_LIST_LIMIT,
};
pub use preview::{PreviewToken, PreviewTokenInfo, PreviewTokens};
pub use resolve::{resolve, resolve_unit};
pub use sandbox::{Sandbox, SandboxSession};
pub use session::{Permission, SessionConnectInfo, SessionOptions};
pub use start::{start_request, SandboxStartData, StartOptions};
pub use tier::{VmSpecs, VmTier};
