//! # sandpit-mcp
//!
//! MCP (Model Context Protocol) server exposing Sandpit sandboxes to AI agents.
//!
//! Agents can fork, start, hibernate and list sandboxes on the remote control
//! plane, hand out preview tokens and open sessions. The server never holds a
//! live connection to a sandbox; it returns start bundles and session
//! credentials for the agent's own client to connect with.
//!
//! ## Quick Start
//!
//! ```bash
//! export SANDPIT_API_TOKEN=csb_...
//! cargo run -p sandpit-mcp
//! ```
//!
//! ## MCP Tools
//!
//! | Tool | Description |
//! |------|-------------|
//! | `create_sandbox` | Fork a template and start the new sandbox |
//! | `start_sandbox` | Start or resume a sandbox |
//! | `shutdown_sandbox` | Stop a sandbox |
//! | `hibernate_sandbox` | Snapshot and suspend a sandbox |
//! | `list_sandboxes` | List sandboxes with filters |
//! | `update_tier` | Rescale a sandbox |
//! | `update_hibernation_timeout` | Change the idle timeout |
//! | `create_preview_token` | Grant preview access |
//! | `list_preview_tokens` | List preview tokens |
//! | `revoke_preview_token` | Revoke one preview token |
//! | `revoke_all_preview_tokens` | Revoke every preview token |
//! | `create_session` | Create session credentials |

mod config;
pub mod http;
mod server;
mod types;

pub use config::{ConfigError, SandpitConfig, TransportMode, DEFAULT_HTTP_PORT};
pub use server::SandpitServer;
pub use types::*;
