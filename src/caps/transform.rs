//! Per-entry capability transforms.
//!
//! A transform inspects one `(key, value)` entry at a time and either keeps
//! it, removes it, or replaces it with a set of entries. Transforms run
//! inside a worklist (`apply_all`): replacement entries with unseen keys are
//! queued for a full pass of their own, a replacement under the same key
//! continues through the remaining transforms, and the seen-key guard stops
//! mutually recursive replacements from looping.

use std::collections::{HashSet, VecDeque};

use serde_json::Value;

use super::Capabilities;

/// Decision a transform makes for a single capability entry.
#[derive(Debug, Clone, PartialEq)]
pub enum TransformOutcome {
    /// Entry passes through unchanged.
    Keep,
    /// Entry is replaced by the given entries. An entry under the same key
    /// substitutes the current one; entries under new keys are enqueued for
    /// their own pass.
    Replace(Vec<(String, Value)>),
    /// Entry is dropped from the output.
    Remove,
}

/// A single rewriting rule applied to capability entries.
pub trait CapabilityTransform: Send + Sync {
    /// Name for diagnostics.
    fn name(&self) -> &'static str;

    /// Judge one entry.
    fn apply(&self, key: &str, value: &Value) -> TransformOutcome;
}

/// Lowercases the `proxyType` member of a `proxy` object.
///
/// Legacy clients sent `proxyType` in screaming case; W3C servers expect
/// lowercase. Other members pass through untouched, non-object values are
/// left alone.
#[derive(Debug, Default)]
pub struct ProxyNormalization;

impl CapabilityTransform for ProxyNormalization {
    fn name(&self) -> &'static str {
        "proxy-normalization"
    }

    fn apply(&self, key: &str, value: &Value) -> TransformOutcome {
        if key != "proxy" {
            return TransformOutcome::Keep;
        }
        let Some(proxy) = value.as_object() else {
            return TransformOutcome::Keep;
        };
        if !proxy.contains_key("proxyType") {
            return TransformOutcome::Keep;
        }

        let mut normalized = proxy.clone();
        if let Some(proxy_type) = normalized.get_mut("proxyType") {
            let lowered = match proxy_type.as_str() {
                Some(s) => s.to_lowercase(),
                None => proxy_type.to_string().to_lowercase(),
            };
            *proxy_type = Value::String(lowered);
        }
        TransformOutcome::Replace(vec![(key.to_string(), Value::Object(normalized))])
    }
}

/// Drops `platform`/`platformName` entries whose value is a wildcard.
///
/// `"ANY"` (any casing), `"*"` and `""` all mean "no constraint"; sending
/// them confuses W3C servers that treat platform names literally.
#[derive(Debug, Default)]
pub struct WildcardPlatformStrip;

impl CapabilityTransform for WildcardPlatformStrip {
    fn name(&self) -> &'static str {
        "wildcard-platform-strip"
    }

    fn apply(&self, key: &str, value: &Value) -> TransformOutcome {
        if key != "platform" && key != "platformName" {
            return TransformOutcome::Keep;
        }
        match value {
            Value::Null => TransformOutcome::Remove,
            Value::String(s) if s.eq_ignore_ascii_case("any") || s == "*" || s.is_empty() => {
                TransformOutcome::Remove
            }
            _ => TransformOutcome::Keep,
        }
    }
}

/// Derives `platformName` from the legacy `platform` key.
///
/// The legacy entry is retained unchanged and a `platformName` entry with
/// the same value is emitted alongside it, casing preserved. Servers that
/// understand only one of the two spellings each see theirs.
#[derive(Debug, Default)]
pub struct PlatformNameDerivation;

impl CapabilityTransform for PlatformNameDerivation {
    fn name(&self) -> &'static str {
        "platform-name-derivation"
    }

    fn apply(&self, key: &str, value: &Value) -> TransformOutcome {
        if key != "platform" {
            return TransformOutcome::Keep;
        }
        TransformOutcome::Replace(vec![
            (key.to_string(), value.clone()),
            ("platformName".to_string(), value.clone()),
        ])
    }
}

/// The standard transform chain, in application order.
///
/// Order matters: wildcard stripping must run before platform-name
/// derivation so a wildcard `platform` is dropped instead of duplicated.
pub fn standard_transforms() -> Vec<Box<dyn CapabilityTransform>> {
    vec![
        Box::new(ProxyNormalization),
        Box::new(WildcardPlatformStrip),
        Box::new(PlatformNameDerivation),
    ]
}

/// Run a transform chain over a capability map via a worklist.
///
/// Entries are processed in sorted key order. Null-valued entries are
/// dropped before any transform sees them. Replacement entries whose key
/// has already been examined are written directly to the output (same-key
/// replacements substitute the in-flight entry instead); unexamined keys
/// are enqueued and get a full transform pass of their own. The examined
/// set guarantees termination.
pub fn apply_all(
    transforms: &[Box<dyn CapabilityTransform>],
    caps: &Capabilities,
) -> Capabilities {
    let mut queue: VecDeque<(String, Value)> =
        caps.iter().map(|(k, v)| (k.clone(), v.clone())).collect();
    let mut seen: HashSet<String> = HashSet::new();
    let mut out = Capabilities::new();

    while let Some(entry) = queue.pop_front() {
        seen.insert(entry.0.clone());
        if entry.1.is_null() {
            continue;
        }

        let mut current = Some(entry);
        for transform in transforms {
            let (key, value) = match current {
                Some(ref entry) => entry.clone(),
                None => break,
            };
            match transform.apply(&key, &value) {
                TransformOutcome::Keep => {}
                TransformOutcome::Remove => {
                    out.remove(&key);
                    current = None;
                }
                TransformOutcome::Replace(entries) => {
                    for (new_key, new_value) in entries {
                        if !seen.contains(&new_key) {
                            queue.push_back((new_key, new_value));
                        } else if new_key == key {
                            current = Some((new_key, new_value));
                        } else {
                            out.insert(new_key, new_value);
                        }
                    }
                }
            }
        }
        if let Some((key, value)) = current {
            out.insert(key, value);
        }
    }

    out
}
