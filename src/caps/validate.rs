//! Structural validation of candidate capability sets.
//!
//! Runs once per candidate before it is attempted on the wire. A candidate
//! that fails validation is never sent; when every candidate fails, the
//! negotiation fails without network contact.

use crate::error::{Result, SessionError};

use super::registry::KeyRegistry;
use super::Capabilities;

/// Validate a W3C `alwaysMatch`/`firstMatch` pair.
///
/// Rules, checked in order:
/// - `firstMatch` must hold at least one entry
/// - no key may appear in both `alwaysMatch` and a `firstMatch` entry
/// - no map may carry a JSON `null` value
/// - every key must match an accepted pattern (bare standard name or
///   vendor-namespaced)
pub fn validate_w3c_pair(
    always: &Capabilities,
    first: &[Capabilities],
    registry: &KeyRegistry,
) -> Result<()> {
    if first.is_empty() {
        return Err(SessionError::IllegalCapabilities(
            "firstMatch must contain at least one entry".to_string(),
        ));
    }

    let duplicated: Vec<&str> = first
        .iter()
        .flat_map(|entry| entry.keys())
        .filter(|key| always.contains_key(key))
        .map(String::as_str)
        .collect();
    if !duplicated.is_empty() {
        return Err(SessionError::IllegalCapabilities(format!(
            "keys present in both alwaysMatch and firstMatch: {}",
            duplicated.join(", ")
        )));
    }

    for map in std::iter::once(always).chain(first.iter()) {
        validate_no_nulls(map)?;

        let offending: Vec<&str> = map
            .keys()
            .filter(|key| !registry.is_accepted(key))
            .map(String::as_str)
            .collect();
        if !offending.is_empty() {
            return Err(SessionError::IllegalCapabilities(format!(
                "keys missing a vendor namespace: {}",
                offending.join(", ")
            )));
        }
    }

    Ok(())
}

/// Validate a flat OSS map: the legacy dialect admits any key, but null
/// values are still rejected.
pub fn validate_oss(desired: &Capabilities) -> Result<()> {
    validate_no_nulls(desired)
}

fn validate_no_nulls(map: &Capabilities) -> Result<()> {
    let nulls: Vec<&str> = map
        .iter()
        .filter(|(_, value)| value.is_null())
        .map(|(key, _)| key.as_str())
        .collect();
    if nulls.is_empty() {
        Ok(())
    } else {
        Err(SessionError::IllegalCapabilities(format!(
            "null values for keys: {}",
            nulls.join(", ")
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use serde_json::{json, Value};

    fn registry() -> KeyRegistry {
        KeyRegistry::standard()
    }

    #[test]
    fn test_valid_pair_passes() {
        let always = Capabilities::new().with_entry("platformName", json!("iOS"));
        let first = vec![Capabilities::new().with_entry("appium:app", json!("/a.app"))];
        assert!(validate_w3c_pair(&always, &first, &registry()).is_ok());
    }

    #[test]
    fn test_empty_first_match_rejected() {
        let always = Capabilities::new().with_entry("platformName", json!("iOS"));
        let err = validate_w3c_pair(&always, &[], &registry()).unwrap_err();
        assert!(err.to_string().contains("firstMatch"));
    }

    #[test]
    fn test_overlapping_keys_rejected() {
        let always = Capabilities::new().with_entry("platformName", json!("iOS"));
        let first = vec![Capabilities::new().with_entry("platformName", json!("Android"))];
        let err = validate_w3c_pair(&always, &first, &registry()).unwrap_err();
        assert!(err.to_string().contains("platformName"));
    }

    #[test]
    fn test_null_values_rejected() {
        let always = Capabilities::new().with_entry("appium:udid", Value::Null);
        let first = vec![Capabilities::new()];
        let err = validate_w3c_pair(&always, &first, &registry()).unwrap_err();
        assert!(err.to_string().contains("null"));
    }

    #[test]
    fn test_bare_custom_keys_rejected() {
        let always = Capabilities::new();
        let first = vec![Capabilities::new().with_entry("deviceName", json!("iPhone"))];
        let err = validate_w3c_pair(&always, &first, &registry()).unwrap_err();
        assert!(err.to_string().contains("deviceName"));
    }

    #[test]
    fn test_oss_map_allows_bare_keys_but_not_nulls() {
        let desired = Capabilities::new()
            .with_entry("deviceName", json!("iPhone"))
            .with_entry("platform", json!("MAC"));
        assert!(validate_oss(&desired).is_ok());

        let with_null = desired.with_entry("app", Value::Null);
        assert!(validate_oss(&with_null).is_err());
    }

    proptest! {
        #[test]
        fn prop_nonempty_always_overlaps_itself(
            keys in proptest::collection::btree_set("appium:[a-z]{1,6}", 1..5)
        ) {
            let map: Capabilities = keys
                .into_iter()
                .map(|k| (k, json!(true)))
                .collect();
            // A map paired with itself trips the duplicate-key rule.
            prop_assert!(validate_w3c_pair(&map, &[map.clone()], &registry()).is_err());
            // The same maps with disjoint halves pass.
            prop_assert!(validate_w3c_pair(&Capabilities::new(), &[map], &registry()).is_ok());
        }
    }
}
