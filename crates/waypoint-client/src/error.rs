//! Error types for the waypoint client.

use thiserror::Error;

/// Errors that can reach a caller of [`crate::WaypointClient`].
///
/// Probe failures and selection timeouts are deliberately absent: both are
/// expected steady-state conditions in a distributed deployment and are
/// absorbed inside the client (logged, with best-effort fallback). Callers
/// only ever see one of the variants below.
#[derive(Error, Debug)]
pub enum ClientError {
    /// Invalid construction-time configuration or call declaration
    /// (empty endpoint set, unknown policy, missing response shape,
    /// bad argument binding).
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Server answered the call with a non-200 status.
    #[error("Remote call failed ({status}): {body}")]
    RemoteCall {
        /// HTTP status code.
        status: u16,
        /// Response body text from the server.
        body: String,
    },

    /// Response payload did not match the declared shape.
    #[error("Decode error: {0}")]
    Decode(String),

    /// Connection, DNS, or timeout failure during the call itself.
    #[error("Transport error: {0}")]
    Transport(#[from] reqwest::Error),
}
