//! Accepted-key registry for W3C capability names.
//!
//! The W3C dialect only admits a fixed set of bare capability names plus
//! namespaced extension keys (`vendor:name`). Every other key must be moved
//! under a vendor namespace before it goes on the wire. The registry holds
//! the accepted patterns and performs that rewrite.

use std::borrow::Cow;

use lazy_static::lazy_static;
use regex::Regex;

use super::{Capabilities, VENDOR_PREFIX};

/// Key patterns admitted by the W3C dialect.
///
/// The first pattern covers namespaced extension keys; the rest are the
/// standard bare capability names.
pub static ACCEPTED_KEY_PATTERNS: &[&str] = &[
    r"^[\w-]+:.*$",
    r"^acceptInsecureCerts$",
    r"^browserName$",
    r"^browserVersion$",
    r"^platformName$",
    r"^pageLoadStrategy$",
    r"^proxy$",
    r"^setWindowRect$",
    r"^timeouts$",
    r"^unhandledPromptBehavior$",
];

lazy_static! {
    /// Compiled accepted-key patterns
    static ref ACCEPTED_REGEX: Vec<Regex> = {
        ACCEPTED_KEY_PATTERNS
            .iter()
            .filter_map(|p| Regex::new(p).ok())
            .collect()
    };
}

/// Immutable registry of accepted W3C keys and the vendor namespace used
/// for everything else.
///
/// Built once and shared across the pipeline and the validator, replacing
/// per-call-site key lists.
#[derive(Debug, Clone)]
pub struct KeyRegistry {
    vendor_prefix: String,
}

impl Default for KeyRegistry {
    fn default() -> Self {
        Self::standard()
    }
}

impl KeyRegistry {
    /// Registry with the standard `appium:` vendor namespace.
    pub fn standard() -> Self {
        Self {
            vendor_prefix: VENDOR_PREFIX.to_string(),
        }
    }

    /// Registry with a custom vendor namespace (must end with `:`).
    pub fn with_vendor_prefix(prefix: &str) -> Self {
        let vendor_prefix = if prefix.ends_with(':') {
            prefix.to_string()
        } else {
            format!("{prefix}:")
        };
        Self { vendor_prefix }
    }

    /// The namespace prepended to non-standard keys.
    pub fn vendor_prefix(&self) -> &str {
        &self.vendor_prefix
    }

    /// Whether the key may appear as-is in a W3C capability map.
    pub fn is_accepted(&self, key: &str) -> bool {
        ACCEPTED_REGEX.iter().any(|r| r.is_match(key))
    }

    /// Rewrite a key for the W3C dialect: accepted keys pass through,
    /// anything else gets the vendor namespace.
    pub fn rewrite<'a>(&self, key: &'a str) -> Cow<'a, str> {
        if self.is_accepted(key) {
            Cow::Borrowed(key)
        } else {
            Cow::Owned(format!("{}{key}", self.vendor_prefix))
        }
    }

    /// Rewrite every key of a map. Iteration is in sorted key order, so a
    /// rewrite collision (`platform` vs an existing `appium:platform`)
    /// resolves deterministically by last write.
    pub fn rewrite_map(&self, caps: &Capabilities) -> Capabilities {
        caps.iter()
            .map(|(key, value)| (self.rewrite(key).into_owned(), value.clone()))
            .collect()
    }
}
