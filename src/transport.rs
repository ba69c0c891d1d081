//! Wire transport for session negotiation.
//!
//! The negotiator only ever needs one operation: POST a JSON body to the
//! server's `/session` endpoint and get the status plus raw body back. That
//! operation is a trait, so tests can substitute scripted transports and
//! the negotiation logic never touches a concrete HTTP client.
//!
//! ```text
//! ┌────────────┐  new_session(body)  ┌──────────────────┐
//! │ Negotiator │ ──────────────────> │ SessionTransport │
//! └────────────┘   WireResponse      ├──────────────────┤
//!                                    │ HttpTransport    │ production (reqwest)
//!                                    │ scripted fakes   │ tests
//!                                    └──────────────────┘
//! ```

use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use bytes::Bytes;
use reqwest::header;
use tracing::debug;

use crate::error::{Result, SessionError};

/// Default connect timeout for the HTTP transport.
pub const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 30;
/// Default whole-request timeout; session creation can be slow on device
/// farms, so this is generous.
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 120;

/// Status and raw body of one `POST /session` exchange.
#[derive(Debug, Clone)]
pub struct WireResponse {
    /// HTTP status code.
    pub status: u16,
    /// Raw response body; the negotiator parses it leniently.
    pub body: Bytes,
}

impl WireResponse {
    /// Build a response from parts.
    pub fn new(status: u16, body: impl Into<Bytes>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    /// Whether the status is in the 2xx range.
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Transport trait for session creation requests.
///
/// Implementations handle the network exchange while the negotiator stays
/// transport-agnostic.
pub trait SessionTransport: Send + Sync {
    /// POST the JSON body to the new-session endpoint.
    ///
    /// A transport-level failure (refused connection, timeout) is an error;
    /// any HTTP response, whatever the status, is a `WireResponse`.
    fn new_session(
        &self,
        body: Bytes,
    ) -> Pin<Box<dyn Future<Output = Result<WireResponse>> + Send + '_>>;

    /// Endpoint description for logging.
    fn endpoint(&self) -> &str;
}

/// Production transport over `reqwest`.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
    session_url: String,
}

impl HttpTransport {
    /// Transport for a server base URL with default timeouts.
    pub fn new(base_url: &str) -> Result<Self> {
        Self::with_timeouts(
            base_url,
            Duration::from_secs(DEFAULT_CONNECT_TIMEOUT_SECS),
            Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
        )
    }

    /// Transport with explicit connect and whole-request timeouts.
    pub fn with_timeouts(base_url: &str, connect: Duration, request: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .connect_timeout(connect)
            .timeout(request)
            .build()
            .map_err(|e| SessionError::Network(format!("failed to create HTTP client: {e}")))?;
        Ok(Self::with_client(client, base_url))
    }

    /// Transport over a caller-supplied client (shared pools, proxies).
    pub fn with_client(client: reqwest::Client, base_url: &str) -> Self {
        let session_url = format!("{}/session", base_url.trim_end_matches('/'));
        Self {
            client,
            session_url,
        }
    }
}

impl SessionTransport for HttpTransport {
    fn new_session(
        &self,
        body: Bytes,
    ) -> Pin<Box<dyn Future<Output = Result<WireResponse>> + Send + '_>> {
        Box::pin(async move {
            debug!(url = %self.session_url, bytes = body.len(), "posting new-session request");
            let response = self
                .client
                .post(&self.session_url)
                .header(header::CONTENT_TYPE, "application/json; charset=utf-8")
                .body(body)
                .send()
                .await?;

            let status = response.status().as_u16();
            let body = response.bytes().await?;
            debug!(status, bytes = body.len(), "new-session response");
            Ok(WireResponse { status, body })
        })
    }

    fn endpoint(&self) -> &str {
        &self.session_url
    }
}
