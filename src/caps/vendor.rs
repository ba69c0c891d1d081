//! Vendor capability filters.
//!
//! A filter recognizes the capability keys a particular browser vendor owns
//! (its `browserName` plus its option blocks) and claims them out of a flat
//! map. Claimed sub-maps become `firstMatch` candidates; whatever no filter
//! claims stays in `alwaysMatch`.

use serde_json::Value;

use super::Capabilities;

/// Claims vendor-owned keys out of a flat capability map.
pub trait VendorFilter: Send + Sync {
    /// Name for diagnostics.
    fn name(&self) -> &'static str;

    /// The sub-map of keys this vendor owns, or `None` when the map holds
    /// nothing of interest for it.
    fn extract(&self, caps: &Capabilities) -> Option<Capabilities>;
}

fn browser_is(key: &str, value: &Value, browser: &str) -> bool {
    key == "browserName" && value.as_str() == Some(browser)
}

fn collect(
    caps: &Capabilities,
    claims: impl Fn(&str, &Value) -> bool,
) -> Option<Capabilities> {
    let claimed: Capabilities = caps
        .iter()
        .filter(|(k, v)| claims(k, v))
        .map(|(k, v)| (k.clone(), v.clone()))
        .collect();
    if claimed.is_empty() {
        None
    } else {
        Some(claimed)
    }
}

/// Claims `browserName == "chrome"`, the legacy `chromeOptions` block and
/// every `goog:`-namespaced key.
#[derive(Debug, Default)]
pub struct ChromeFilter;

impl VendorFilter for ChromeFilter {
    fn name(&self) -> &'static str {
        "chrome"
    }

    fn extract(&self, caps: &Capabilities) -> Option<Capabilities> {
        collect(caps, |key, value| {
            browser_is(key, value, "chrome")
                || key == "chromeOptions"
                || key.starts_with("goog:")
        })
    }
}

/// Claims `browserName == "firefox"`, legacy `firefox_`-prefixed keys and
/// every `moz:`-namespaced key.
#[derive(Debug, Default)]
pub struct FirefoxFilter;

impl VendorFilter for FirefoxFilter {
    fn name(&self) -> &'static str {
        "firefox"
    }

    fn extract(&self, caps: &Capabilities) -> Option<Capabilities> {
        collect(caps, |key, value| {
            browser_is(key, value, "firefox")
                || key.starts_with("firefox_")
                || key.starts_with("moz:")
        })
    }
}

/// Claims `browserName == "safari"` and the `safari.options` block.
#[derive(Debug, Default)]
pub struct SafariFilter;

impl VendorFilter for SafariFilter {
    fn name(&self) -> &'static str {
        "safari"
    }

    fn extract(&self, caps: &Capabilities) -> Option<Capabilities> {
        collect(caps, |key, value| {
            browser_is(key, value, "safari") || key == "safari.options"
        })
    }
}

/// The standard filter set, in registration order.
pub fn standard_filters() -> Vec<Box<dyn VendorFilter>> {
    vec![
        Box::new(ChromeFilter),
        Box::new(FirefoxFilter),
        Box::new(SafariFilter),
    ]
}
