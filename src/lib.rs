//! # Appium Session - WebDriver Session Negotiation
//!
//! Dialect-negotiating new-session client for Appium and Selenium-style
//! servers: one capability payload in, a working session out, whether the
//! remote end speaks the legacy JSON Wire Protocol or the W3C WebDriver
//! standard.
//!
//! ## Features
//!
//! - **Dialect negotiation**: combined, legacy-only and W3C-only request
//!   encodings tried in order against one endpoint
//! - **Capability derivation**: flat maps split into `alwaysMatch`/`firstMatch`
//!   pairs with vendor-aware grouping
//! - **Key normalization**: non-standard keys namespaced under `appium:` per
//!   the W3C extension-capability rules
//! - **Spooled payloads**: large capability documents spill to a temp file
//!   instead of staying resident in memory
//! - **Command routing**: per-dialect route tables for the post-session
//!   command surface
//!
//! ## Negotiation Overview
//!
//! A server is never asked which dialect it speaks; the answer is inferred
//! from how it responds to each candidate encoding of the same new-session
//! request.
//!
//! ### Architecture
//!
//! ```text
//! Capabilities ──> PayloadStore ──> CandidateStream
//!                                        │
//!                    POST /session       v
//!    [combined] ──no match──> [oss-only] ──no match──> [w3c-only]
//!        │                        │                        │
//!     matched                  matched                  matched
//!        └───────────┬────────────┴────────────────────────┘
//!                    v
//!     NegotiatedSession { dialect, session_id, capabilities }
//! ```
//!
//! ### Candidate Order
//!
//! | Encoding  | Body members                                  | Understood by  |
//! |-----------|-----------------------------------------------|----------------|
//! | combined  | `desiredCapabilities` + `capabilities`        | either dialect |
//! | oss-only  | `desiredCapabilities`, `requiredCapabilities` | legacy servers |
//! | w3c-only  | `capabilities.alwaysMatch` / `firstMatch`     | W3C servers    |
//!
//! ### Response Classification
//!
//! | Reply                                              | Verdict             |
//! |----------------------------------------------------|---------------------|
//! | `status == 33` or `error == "session not created"` | rejected, stop      |
//! | session id + capability object, numeric `status`   | matched, legacy     |
//! | session id + capability object, no `status`        | matched, W3C        |
//! | anything else                                      | no match, try next  |
//!
//! A definitive rejection means the server understood the request and
//! refused the capabilities themselves, so re-encoding cannot help and the
//! remaining candidates are skipped.
//!
//! ## Quick Start
//!
//! ### Capability Derivation (Stateless)
//!
//! ```rust
//! use appium_session::{Capabilities, TransformPipeline};
//! use serde_json::json;
//!
//! let pipeline = TransformPipeline::standard();
//! let caps = Capabilities::new()
//!     .with_entry("platformName", json!("Android"))
//!     .with_entry("deviceName", json!("Pixel 8"));
//!
//! let derived = pipeline.derive(&caps);
//!
//! // deviceName is not a W3C standard key, so it travels as appium:deviceName
//! assert!(derived.first_match[0].contains_key("appium:deviceName"));
//! assert!(derived.first_match[0].contains_key("platformName"));
//! ```
//!
//! ### Negotiate a Session
//!
//! ```rust,ignore
//! use appium_session::{Capabilities, Handshake};
//! use serde_json::json;
//!
//! let caps = Capabilities::new()
//!     .with_entry("platformName", json!("iOS"))
//!     .with_entry("appium:app", json!("/tmp/demo.app"));
//!
//! let handshake = Handshake::builder()
//!     .server_url("http://127.0.0.1:4723")
//!     .build()?;
//!
//! let session = handshake.negotiate(&caps).await?;
//! println!("{} session {}", session.dialect, session.session_id);
//! ```
//!
//! ### Raw Payload Documents
//!
//! Callers holding a complete new-session document (already carrying
//! `desiredCapabilities` or W3C regions) can hand it over verbatim:
//!
//! ```rust,ignore
//! use appium_session::{Handshake, PayloadStore};
//!
//! let store = PayloadStore::from_json(
//!     r#"{"desiredCapabilities": {"browserName": "safari"}}"#,
//! )?;
//! let session = Handshake::builder().build()?.negotiate_payload(store).await?;
//! ```
//!
//! ### Command Dispatch
//!
//! ```rust,ignore
//! use appium_session::CommandCodec;
//!
//! let codec = CommandCodec::new(session.dialect);
//! let route = codec.resolve("screenshot", &[("sessionId", &session.session_id)])?;
//! // GET /session/<id>/screenshot
//! ```
//!
//! ## Modules
//!
//! - [`caps`]: Capability maps, transforms and W3C derivation
//! - [`negotiate`]: Candidate encodings and the negotiation loop
//! - [`payload`]: Spooled payload storage and region extraction
//! - [`transport`]: HTTP transport for the new-session endpoint
//! - [`commands`]: Post-session command route tables
//! - [`config`]: Configuration management
//! - [`error`]: Error types and result aliases

pub mod caps;
pub mod commands;
pub mod config;
pub mod error;
pub mod negotiate;
pub mod payload;
pub mod transport;

// Re-exports for convenience
pub use caps::{Capabilities, DerivedCaps, KeyRegistry, TransformPipeline, VENDOR_PREFIX};
pub use commands::{CommandCodec, Route};
pub use config::Config;
pub use error::{Result, SessionError};
pub use negotiate::{classify, Dialect, Handshake, NegotiatedSession, Verdict};
pub use payload::{CapabilityReader, PayloadStore};
pub use transport::{HttpTransport, SessionTransport, WireResponse};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Negotiate a session against a server with default configuration
pub async fn negotiate(server_url: &str, caps: &Capabilities) -> Result<NegotiatedSession> {
    Handshake::builder()
        .server_url(server_url)
        .build()?
        .negotiate(caps)
        .await
}
