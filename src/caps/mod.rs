//! Capability maps and the transformation pipeline.
//!
//! A capability map is an open set of string keys describing the session a
//! client wants (browser/device name, platform, automation options). Two
//! wire dialects encode them differently:
//!
//! - OSS: one flat map under `desiredCapabilities`
//! - W3C: a split `capabilities` object with `alwaysMatch` (common part)
//!   and `firstMatch` (alternatives)
//!
//! The submodules turn a flat OSS map into a valid W3C pair:
//!
//! ```text
//! flat map -> vendor filters -> alwaysMatch/firstMatch split
//!          -> capability transforms (worklist)
//!          -> key registry rewrite (appium: namespacing)
//!          -> structural validation
//! ```

pub mod pipeline;
pub mod registry;
pub mod transform;
pub mod validate;
pub mod vendor;

pub use pipeline::{DerivedCaps, TransformPipeline};
pub use registry::KeyRegistry;
pub use transform::{CapabilityTransform, TransformOutcome};
pub use vendor::VendorFilter;

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Vendor namespace prefix applied to non-standard capability keys.
pub const VENDOR_PREFIX: &str = "appium:";

/// An ordered capability map.
///
/// Keys are case-sensitive; values are arbitrary JSON. Backed by a sorted
/// map, so iteration order is stable and repeated derivations from the same
/// input are byte-identical. Within one map the last write to a key wins.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Capabilities(Map<String, Value>);

impl Capabilities {
    /// Create an empty capability map.
    pub fn new() -> Self {
        Self(Map::new())
    }

    /// Insert a capability, returning the previous value for the key.
    pub fn insert(&mut self, key: impl Into<String>, value: Value) -> Option<Value> {
        self.0.insert(key.into(), value)
    }

    /// Builder-style insert.
    pub fn with_entry(mut self, key: impl Into<String>, value: Value) -> Self {
        self.insert(key, value);
        self
    }

    /// Look up a capability value.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    /// Look up a capability as a string slice.
    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.0.get(key).and_then(Value::as_str)
    }

    /// Remove a capability.
    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.0.remove(key)
    }

    /// Whether the key is present.
    pub fn contains_key(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    /// Number of capabilities.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the map holds no capabilities.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterate entries in sorted key order.
    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.0.iter()
    }

    /// Iterate keys in sorted order.
    pub fn keys(&self) -> impl Iterator<Item = &String> {
        self.0.keys()
    }

    /// Merge `other` into `self`; entries of `other` win on key conflicts.
    pub fn merge(&mut self, other: &Capabilities) {
        for (key, value) in other.iter() {
            self.0.insert(key.clone(), value.clone());
        }
    }

    /// The map as a JSON value.
    pub fn as_value(&self) -> Value {
        Value::Object(self.0.clone())
    }

    /// Consume the wrapper, yielding the raw JSON map.
    pub fn into_inner(self) -> Map<String, Value> {
        self.0
    }
}

impl From<Map<String, Value>> for Capabilities {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}

impl FromIterator<(String, Value)> for Capabilities {
    fn from_iter<I: IntoIterator<Item = (String, Value)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl IntoIterator for Capabilities {
    type Item = (String, Value);
    type IntoIter = serde_json::map::IntoIter;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl fmt::Display for Capabilities {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let json = serde_json::to_string(&self.0).map_err(|_| fmt::Error)?;
        f.write_str(&json)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_last_write_wins() {
        let mut caps = Capabilities::new();
        caps.insert("browserName", json!("chrome"));
        caps.insert("browserName", json!("firefox"));

        assert_eq!(caps.get_str("browserName"), Some("firefox"));
        assert_eq!(caps.len(), 1);
    }

    #[test]
    fn test_sorted_iteration() {
        let caps = Capabilities::new()
            .with_entry("platformName", json!("iOS"))
            .with_entry("browserName", json!("safari"))
            .with_entry("appium:app", json!("/tmp/app.ipa"));

        let keys: Vec<&String> = caps.keys().collect();
        assert_eq!(keys, ["appium:app", "browserName", "platformName"]);
    }

    #[test]
    fn test_merge_other_wins() {
        let mut base = Capabilities::new()
            .with_entry("platformName", json!("Android"))
            .with_entry("appium:noReset", json!(false));
        let overlay = Capabilities::new().with_entry("appium:noReset", json!(true));

        base.merge(&overlay);
        assert_eq!(base.get("appium:noReset"), Some(&json!(true)));
        assert_eq!(base.get_str("platformName"), Some("Android"));
    }

    #[test]
    fn test_transparent_serde() {
        let caps: Capabilities =
            serde_json::from_value(json!({"browserName": "chrome", "goog:chromeOptions": {}}))
                .unwrap();
        assert!(caps.contains_key("goog:chromeOptions"));
        assert_eq!(serde_json::to_value(&caps).unwrap()["browserName"], "chrome");
    }
}
