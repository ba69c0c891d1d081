//! Session negotiation: candidate encodings, wire attempts, dialect
//! detection.
//!
//! A remote driver speaks one of two dialects and rarely says which. The
//! negotiator finds out by construction:
//!
//! ```text
//! ┌──────────────┐   ┌───────────────┐   ┌──────────────────────────┐
//! │ PayloadStore │──>│CandidateStream│──>│ POST /session            │
//! └──────────────┘   │ 1. combined   │   │   classify response:     │
//!                    │ 2. OSS-only   │   │   matched  -> done       │
//!                    │ 3. W3C-only   │   │   rejected -> fail now   │
//!                    └───────────────┘   │   no-match -> next       │
//!                                        └──────────────────────────┘
//! ```
//!
//! Response classification per attempt:
//!
//! | Signal                                        | Verdict   |
//! |-----------------------------------------------|-----------|
//! | 2xx + session id + capabilities               | matched   |
//! | `error: "session not created"` or `status 33` | rejected  |
//! | anything else (including non-JSON bodies)     | no-match  |
//!
//! Dialect detection: a numeric top-level `status` member marks the legacy
//! OSS dialect; its absence marks W3C. No candidate is retried and no two
//! attempts overlap; a rejected verdict stops the sequence immediately.

pub mod candidates;
pub mod handshake;

pub use candidates::{CandidateSet, CandidateStream, Encoding};
pub use handshake::{classify, Handshake, HandshakeBuilder, NegotiatedSession, Verdict};

/// OSS status code a server returns when it understood the request but
/// could not create the session.
pub const OSS_SESSION_NOT_CREATED: i64 = 33;

/// W3C error string for the same condition.
pub const W3C_SESSION_NOT_CREATED: &str = "session not created";

/// Wire dialect of an established session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Dialect {
    /// Legacy JSON Wire Protocol: flat capabilities, numeric status codes.
    Oss,
    /// W3C WebDriver: `alwaysMatch`/`firstMatch` capabilities, string
    /// error codes.
    W3c,
}

impl Dialect {
    /// Get descriptive name.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Oss => "OSS",
            Self::W3c => "W3C",
        }
    }
}

impl std::fmt::Display for Dialect {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl std::str::FromStr for Dialect {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "oss" | "jsonwp" | "mjsonwp" => Ok(Self::Oss),
            "w3c" => Ok(Self::W3c),
            _ => Err(format!("Unknown dialect: {}", s)),
        }
    }
}
