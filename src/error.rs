//! Session negotiation error types.
//!
//! One public enum covers the whole crate. The variants mirror the phases of
//! a negotiation: payload intake (`MalformedPayload`), candidate validation
//! (`IllegalCapabilities`), wire attempts (`Network`), and the terminal
//! outcome (`SessionNotCreated`). `SessionNotCreated` preserves the original
//! capabilities and the last transport failure via `#[source]`, so tools
//! like `anyhow` can display the complete context.

use thiserror::Error;

use crate::caps::Capabilities;

/// Session negotiation errors.
#[derive(Error, Debug)]
pub enum SessionError {
    /// The supplied capability document could not be parsed as JSON.
    ///
    /// Fatal: surfaced before any candidate encoding is attempted.
    #[error("Malformed capability payload: {0}")]
    MalformedPayload(String),

    /// A capability set violates the W3C structural rules.
    ///
    /// Fatal for the candidate it belongs to. When every candidate fails
    /// validation the negotiation fails without network contact.
    #[error("Illegal capabilities: {0}")]
    IllegalCapabilities(String),

    /// Network communication error for a single candidate attempt.
    #[error("Network error: {0}")]
    Network(String),

    /// The server rejected session creation, or every candidate encoding
    /// was exhausted without a match.
    #[error("Session not created: {message}")]
    SessionNotCreated {
        /// Human-readable reason, including the server's message when one
        /// was returned.
        message: String,
        /// Capabilities as supplied by the caller, before any transform.
        capabilities: Capabilities,
        /// Dialect-specific error payload from the last response seen.
        server_payload: Option<serde_json::Value>,
        /// Last transport failure, when exhaustion was network-driven.
        #[source]
        source: Option<Box<SessionError>>,
    },

    /// A logical command could not be resolved to a route.
    #[error("Command dispatch error: {0}")]
    Dispatch(String),

    /// Configuration error.
    #[error("Config error: {0}")]
    Config(String),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// I/O error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for session negotiation operations
pub type Result<T> = std::result::Result<T, SessionError>;

impl From<reqwest::Error> for SessionError {
    fn from(err: reqwest::Error) -> Self {
        SessionError::Network(err.to_string())
    }
}

impl From<toml::de::Error> for SessionError {
    fn from(err: toml::de::Error) -> Self {
        SessionError::Config(err.to_string())
    }
}
