//! Interpretation of control-plane responses.

use crate::error::{CoreError, Result};
use sandpit_api::ApiResponse;

/// Unwrap a transport result into its payload.
///
/// A rejected call becomes [`CoreError::Api`] carrying `context` and the
/// HTTP status. A response with neither a payload nor an error is a
/// protocol violation.
pub fn resolve<T>(response: ApiResponse<T>, context: &str) -> Result<T> {
    rejected(&response, context)?;

    response
        .data
        .and_then(|envelope| envelope.data)
        .ok_or_else(|| CoreError::Protocol(format!("{context}: response carried no data")))
}

/// Check a call that returns nothing.
///
/// Only a rejection is an error; any accepted response passes, with or
/// without an envelope or payload.
pub fn resolve_unit<T>(response: ApiResponse<T>, context: &str) -> Result<()> {
    rejected(&response, context)
}

fn rejected<T>(response: &ApiResponse<T>, context: &str) -> Result<()> {
    match response.error {
        Some(ref error) => {
            tracing::debug!(status = response.status, context, error = %error, "Control plane rejected call");
            Err(CoreError::Api {
                context: context.to_string(),
                status: response.status,
                detail: error.to_string(),
            })
        }
        None => Ok(()),
    }
}
