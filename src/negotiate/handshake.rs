//! The negotiation loop and response classification.
//!
//! [`Handshake`] owns a transport and a transform pipeline. Each call to
//! [`Handshake::negotiate`] walks the candidate stream in order, submits
//! every structurally valid candidate, and classifies the reply. The first
//! [`Verdict::Matched`] wins; a [`Verdict::Rejected`] aborts immediately
//! because the server understood the request and said no; everything else
//! falls through to the next candidate.

use serde_json::Value;
use tracing::{debug, info, warn};

use crate::caps::{Capabilities, TransformPipeline};
use crate::config::Config;
use crate::error::{Result, SessionError};
use crate::payload::PayloadStore;
use crate::transport::{HttpTransport, SessionTransport, WireResponse};

use super::candidates::CandidateStream;
use super::{Dialect, OSS_SESSION_NOT_CREATED, W3C_SESSION_NOT_CREATED};

/// A successfully negotiated session.
#[derive(Debug, Clone, PartialEq)]
pub struct NegotiatedSession {
    /// The dialect the server turned out to speak.
    pub dialect: Dialect,
    /// Server-assigned session id.
    pub session_id: String,
    /// The capabilities the server actually granted.
    pub capabilities: Capabilities,
}

/// Classification of one new-session reply.
#[derive(Debug, Clone, PartialEq)]
pub enum Verdict {
    /// The server created a session.
    Matched(NegotiatedSession),
    /// The server understood the request and definitively refused it.
    /// Negotiation stops here; trying another encoding cannot help.
    Rejected {
        /// Human-readable refusal from the server.
        message: String,
        /// The reply body, kept for diagnostics.
        payload: Value,
    },
    /// The server did not understand this encoding. Try the next one.
    NoMatch,
}

/// Classify a new-session reply.
///
/// Definitive rejections are recognized before anything else, whatever the
/// HTTP status: a numeric `status` of 33 marks the legacy "session not
/// created" code, and the string `"session not created"` under `error`
/// (top-level or inside `value`) marks the W3C equivalent. After that a
/// reply only matches when it is 2xx and carries both a session id and a
/// granted capability object; anything else is a [`Verdict::NoMatch`].
///
/// Dialect detection rides on the top-level `status` member: legacy
/// servers always echo a numeric status, W3C servers never do.
pub fn classify(response: &WireResponse) -> Verdict {
    let body: Value = match serde_json::from_slice(&response.body) {
        Ok(body) => body,
        Err(_) => return Verdict::NoMatch,
    };

    if let Some(message) = rejection_message(&body) {
        return Verdict::Rejected {
            message,
            payload: body,
        };
    }

    if !response.is_success() {
        return Verdict::NoMatch;
    }

    let dialect = if body.get("status").is_some_and(Value::is_number) {
        Dialect::Oss
    } else {
        Dialect::W3c
    };

    let Some(session_id) = extract_session_id(&body) else {
        return Verdict::NoMatch;
    };
    let Some(capabilities) = extract_capabilities(&body) else {
        return Verdict::NoMatch;
    };

    Verdict::Matched(NegotiatedSession {
        dialect,
        session_id,
        capabilities,
    })
}

/// The server's refusal message, if the reply is a definitive rejection.
fn rejection_message(body: &Value) -> Option<String> {
    let error_of = |node: &Value| {
        node.get("error")
            .and_then(Value::as_str)
            .map(str::to_owned)
    };
    let message_of = |body: &Value| {
        body.pointer("/value/message")
            .or_else(|| body.get("message"))
            .and_then(Value::as_str)
            .map(str::to_owned)
    };

    if body.get("status").and_then(Value::as_i64) == Some(OSS_SESSION_NOT_CREATED) {
        return Some(message_of(body).unwrap_or_else(|| W3C_SESSION_NOT_CREATED.to_owned()));
    }

    let error = error_of(body).or_else(|| body.get("value").and_then(error_of))?;
    if error == W3C_SESSION_NOT_CREATED {
        return Some(message_of(body).unwrap_or(error));
    }
    None
}

/// Pull the session id out of a reply, wherever the server put it.
fn extract_session_id(body: &Value) -> Option<String> {
    body.pointer("/value/sessionId")
        .or_else(|| body.get("sessionId"))
        .and_then(Value::as_str)
        .map(str::to_owned)
}

/// Pull the granted capabilities out of a reply. Legacy servers put the
/// map straight into `value`; W3C servers nest it under
/// `value.capabilities`; a few put `capabilities` at the top level.
/// `None` when no member holds an object, which keeps a bare session id
/// from passing for a created session.
fn extract_capabilities(body: &Value) -> Option<Capabilities> {
    body.pointer("/value/capabilities")
        .or_else(|| body.get("capabilities"))
        .or_else(|| body.get("value"))
        .and_then(Value::as_object)
        .cloned()
        .map(Capabilities::from)
}

/// Builder for [`Handshake`].
#[derive(Default)]
pub struct HandshakeBuilder {
    server_url: Option<String>,
    transport: Option<Box<dyn SessionTransport>>,
    config: Config,
    forced: Option<Dialect>,
    pipeline: Option<TransformPipeline>,
}

impl HandshakeBuilder {
    /// Set server base URL, overriding the configured one.
    pub fn server_url(mut self, url: impl Into<String>) -> Self {
        self.server_url = Some(url.into());
        self
    }

    /// Use a caller-supplied transport instead of the built-in HTTP one.
    pub fn transport(mut self, transport: impl SessionTransport + 'static) -> Self {
        self.transport = Some(Box::new(transport));
        self
    }

    /// Apply a full configuration.
    pub fn config(mut self, config: Config) -> Self {
        self.config = config;
        self
    }

    /// Pin negotiation to a single dialect, sending only that encoding.
    pub fn force_dialect(mut self, dialect: Dialect) -> Self {
        self.forced = Some(dialect);
        self
    }

    /// Replace the standard transform pipeline.
    pub fn pipeline(mut self, pipeline: TransformPipeline) -> Self {
        self.pipeline = Some(pipeline);
        self
    }

    /// Build the handshake.
    pub fn build(self) -> Result<Handshake> {
        let transport: Box<dyn SessionTransport> = match self.transport {
            Some(transport) => transport,
            None => {
                let url = self
                    .server_url
                    .unwrap_or_else(|| self.config.server.url.clone());
                Box::new(HttpTransport::with_timeouts(
                    &url,
                    self.config.server.connect_timeout(),
                    self.config.server.request_timeout(),
                )?)
            }
        };
        Ok(Handshake {
            transport,
            pipeline: self.pipeline.unwrap_or_default(),
            forced: self.forced,
            spill_threshold: self.config.payload.spill_threshold_bytes,
        })
    }
}

/// Session negotiator.
pub struct Handshake {
    transport: Box<dyn SessionTransport>,
    pipeline: TransformPipeline,
    forced: Option<Dialect>,
    spill_threshold: usize,
}

impl Handshake {
    /// Start building a handshake.
    pub fn builder() -> HandshakeBuilder {
        HandshakeBuilder::default()
    }

    /// Negotiate a session for a flat capability map.
    pub async fn negotiate(&self, caps: &Capabilities) -> Result<NegotiatedSession> {
        let store = PayloadStore::from_capabilities_spooled(caps, self.spill_threshold)?;
        self.negotiate_payload(store).await
    }

    /// Negotiate a session for a caller-supplied payload document. The
    /// store is consumed; its backing file is removed when this returns.
    pub async fn negotiate_payload(&self, mut store: PayloadStore) -> Result<NegotiatedSession> {
        let mut stream = match self.forced {
            Some(dialect) => CandidateStream::pinned(&mut store, &self.pipeline, dialect),
            None => CandidateStream::new(&mut store, &self.pipeline),
        };
        let original = stream.original()?;

        let mut attempts = 0u32;
        let mut last_invalid: Option<SessionError> = None;
        let mut last_network: Option<SessionError> = None;

        while let Some(candidate) = stream.next() {
            let candidate = candidate?;
            let encoding = candidate.encoding();

            if let Err(err) = candidate.validate(self.pipeline.registry()) {
                warn!(encoding = encoding.name(), error = %err, "skipping invalid candidate");
                last_invalid = Some(err);
                continue;
            }

            attempts += 1;
            let body = candidate.encode()?;
            debug!(
                encoding = encoding.name(),
                bytes = body.len(),
                "submitting new-session candidate"
            );

            let response = match self.transport.new_session(body).await {
                Ok(response) => response,
                Err(err) => {
                    warn!(encoding = encoding.name(), error = %err, "candidate failed on the wire");
                    last_network = Some(err);
                    continue;
                }
            };

            match classify(&response) {
                Verdict::Matched(session) => {
                    info!(
                        dialect = session.dialect.name(),
                        session_id = %session.session_id,
                        "session established"
                    );
                    return Ok(session);
                }
                Verdict::Rejected { message, payload } => {
                    return Err(SessionError::SessionNotCreated {
                        message,
                        capabilities: original,
                        server_payload: Some(payload),
                        source: None,
                    });
                }
                Verdict::NoMatch => {
                    debug!(
                        encoding = encoding.name(),
                        status = response.status,
                        "candidate not understood, trying next encoding"
                    );
                }
            }
        }

        if attempts == 0 {
            if let Some(err) = last_invalid {
                return Err(err);
            }
        }
        Err(SessionError::SessionNotCreated {
            message: format!(
                "no candidate encoding was accepted by {}",
                self.transport.endpoint()
            ),
            capabilities: original,
            server_payload: None,
            source: last_network.map(Box::new),
        })
    }
}
