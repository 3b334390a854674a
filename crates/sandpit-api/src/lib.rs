//! # sandpit-api
//!
//! Control-plane REST transport for Sandpit remote sandboxes.
//! Provides the wire types, the response envelope and a `reqwest` client
//! behind the [`ControlPlane`] trait.
//!
//! ## Quick Start
//!
//! ```no_run
//! use sandpit_api::{ApiConfig, ControlPlane, HttpControlPlane};
//!
//! # async fn example() -> sandpit_api::Result<()> {
//! let api = HttpControlPlane::new(ApiConfig::from_env())?;
//!
//! let response = api.vm_start("abc123", None).await?;
//! if let Some(error) = response.error {
//!     eprintln!("start rejected ({}): {error}", response.status);
//! }
//! # Ok(())
//! # }
//! ```
//!
//! This crate does not interpret responses: a rejected call is still an
//! `Ok(ApiResponse)` with its `error` populated. Interpretation belongs to
//! `sandpit-core`.

mod backend;
mod config;
mod error;
mod http;
mod response;
pub mod types;

pub use backend::ControlPlane;
pub use config::{ApiConfig, DEFAULT_API_URL, DEFAULT_TIMEOUT};
pub use error::{ApiError, Result};
pub use http::HttpControlPlane;
pub use response::{ApiResponse, Envelope, ErrorBody, MANAGER_URL_HEADER};
