//! Logical command to HTTP route mapping.
//!
//! Once a session exists, every later command is dispatched by name
//! through a [`CommandCodec`] bound to the negotiated dialect. Three
//! compile-time tables drive resolution: a shared table for routes both
//! dialects agree on, and one override table per dialect for the routes
//! where they diverge (script execution, window geometry, alerts).
//! Caller-registered routes shadow all of them.
//!
//! Path templates mark parameters with a `:` prefix
//! (`/session/:sessionId/element/:elementId/click`); [`CommandCodec::resolve`]
//! substitutes them from the supplied pairs.

use std::collections::{BTreeMap, HashMap};

use http::Method;
use phf::phf_map;

use crate::error::{Result, SessionError};
use crate::negotiate::Dialect;

/// Routes identical in both dialects
static SHARED_ROUTES: phf::Map<&'static str, (Method, &'static str)> = phf_map! {
    // Session lifecycle
    "newSession" => (Method::POST, "/session"),
    "deleteSession" => (Method::DELETE, "/session/:sessionId"),
    "status" => (Method::GET, "/status"),
    // Navigation
    "get" => (Method::POST, "/session/:sessionId/url"),
    "getCurrentUrl" => (Method::GET, "/session/:sessionId/url"),
    "back" => (Method::POST, "/session/:sessionId/back"),
    "forward" => (Method::POST, "/session/:sessionId/forward"),
    "refresh" => (Method::POST, "/session/:sessionId/refresh"),
    "getTitle" => (Method::GET, "/session/:sessionId/title"),
    "getPageSource" => (Method::GET, "/session/:sessionId/source"),
    "screenshot" => (Method::GET, "/session/:sessionId/screenshot"),
    // Elements
    "findElement" => (Method::POST, "/session/:sessionId/element"),
    "findElements" => (Method::POST, "/session/:sessionId/elements"),
    "clickElement" => (Method::POST, "/session/:sessionId/element/:elementId/click"),
    "clearElement" => (Method::POST, "/session/:sessionId/element/:elementId/clear"),
    "sendKeysToElement" => (Method::POST, "/session/:sessionId/element/:elementId/value"),
    "getElementText" => (Method::GET, "/session/:sessionId/element/:elementId/text"),
    "getElementAttribute" => (Method::GET, "/session/:sessionId/element/:elementId/attribute/:name"),
    // Timeouts
    "setTimeouts" => (Method::POST, "/session/:sessionId/timeouts"),
    // Contexts
    "getCurrentContext" => (Method::GET, "/session/:sessionId/context"),
    "getContexts" => (Method::GET, "/session/:sessionId/contexts"),
    "setContext" => (Method::POST, "/session/:sessionId/context"),
    // Vendor endpoints
    "launchApp" => (Method::POST, "/session/:sessionId/appium/app/launch"),
    "closeApp" => (Method::POST, "/session/:sessionId/appium/app/close"),
    "resetApp" => (Method::POST, "/session/:sessionId/appium/app/reset"),
    "backgroundApp" => (Method::POST, "/session/:sessionId/appium/app/background"),
    "hideKeyboard" => (Method::POST, "/session/:sessionId/appium/device/hide_keyboard"),
    "isKeyboardShown" => (Method::GET, "/session/:sessionId/appium/device/is_keyboard_shown"),
    "getDeviceTime" => (Method::GET, "/session/:sessionId/appium/device/system_time"),
    "lock" => (Method::POST, "/session/:sessionId/appium/device/lock"),
    "pushFile" => (Method::POST, "/session/:sessionId/appium/device/push_file"),
    "pullFile" => (Method::POST, "/session/:sessionId/appium/device/pull_file"),
};

/// Legacy-dialect overrides
static OSS_ROUTES: phf::Map<&'static str, (Method, &'static str)> = phf_map! {
    "executeScript" => (Method::POST, "/session/:sessionId/execute"),
    "executeAsyncScript" => (Method::POST, "/session/:sessionId/execute_async"),
    "getWindowSize" => (Method::GET, "/session/:sessionId/window/current/size"),
    "setWindowSize" => (Method::POST, "/session/:sessionId/window/current/size"),
    "getAlertText" => (Method::GET, "/session/:sessionId/alert_text"),
    "acceptAlert" => (Method::POST, "/session/:sessionId/accept_alert"),
    "dismissAlert" => (Method::POST, "/session/:sessionId/dismiss_alert"),
    "setImplicitWaitTimeout" => (Method::POST, "/session/:sessionId/timeouts/implicit_wait"),
};

/// W3C-dialect overrides
static W3C_ROUTES: phf::Map<&'static str, (Method, &'static str)> = phf_map! {
    "executeScript" => (Method::POST, "/session/:sessionId/execute/sync"),
    "executeAsyncScript" => (Method::POST, "/session/:sessionId/execute/async"),
    "getWindowRect" => (Method::GET, "/session/:sessionId/window/rect"),
    "setWindowRect" => (Method::POST, "/session/:sessionId/window/rect"),
    "getAlertText" => (Method::GET, "/session/:sessionId/alert/text"),
    "acceptAlert" => (Method::POST, "/session/:sessionId/alert/accept"),
    "dismissAlert" => (Method::POST, "/session/:sessionId/alert/dismiss"),
};

/// Method and path for one command. The path is a template until
/// [`CommandCodec::resolve`] substitutes its `:param` placeholders.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Route {
    /// HTTP method.
    pub method: Method,
    /// URL path, relative to the server base URL.
    pub path: String,
}

impl std::fmt::Display for Route {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {}", self.method, self.path)
    }
}

/// Dialect-bound command dispatch table.
#[derive(Debug, Clone)]
pub struct CommandCodec {
    dialect: Dialect,
    overlay: HashMap<String, (Method, String)>,
}

impl CommandCodec {
    /// Codec for the given dialect.
    pub fn new(dialect: Dialect) -> Self {
        Self {
            dialect,
            overlay: HashMap::new(),
        }
    }

    /// The dialect this codec serves.
    pub fn dialect(&self) -> Dialect {
        self.dialect
    }

    /// Register a caller-supplied route. Shadows the built-in tables when
    /// the command name collides.
    pub fn with_route(
        mut self,
        command: impl Into<String>,
        method: Method,
        template: impl Into<String>,
    ) -> Self {
        self.overlay.insert(command.into(), (method, template.into()));
        self
    }

    /// Resolve a logical command into a concrete route, substituting
    /// `:param` placeholders from `params`.
    pub fn resolve(&self, command: &str, params: &[(&str, &str)]) -> Result<Route> {
        let (method, template) = self.lookup(command)?;
        let path = substitute(command, &template, params)?;
        Ok(Route { method, path })
    }

    /// Every command this codec can resolve with its template route,
    /// sorted by command name.
    pub fn routes(&self) -> Vec<(String, Route)> {
        let mut routes: BTreeMap<String, Route> = BTreeMap::new();
        for (name, (method, path)) in SHARED_ROUTES.entries() {
            routes.insert(
                (*name).to_string(),
                Route {
                    method: method.clone(),
                    path: (*path).to_string(),
                },
            );
        }
        for (name, (method, path)) in self.dialect_table().entries() {
            routes.insert(
                (*name).to_string(),
                Route {
                    method: method.clone(),
                    path: (*path).to_string(),
                },
            );
        }
        for (name, (method, path)) in &self.overlay {
            routes.insert(
                name.clone(),
                Route {
                    method: method.clone(),
                    path: path.clone(),
                },
            );
        }
        routes.into_iter().collect()
    }

    fn dialect_table(&self) -> &'static phf::Map<&'static str, (Method, &'static str)> {
        match self.dialect {
            Dialect::Oss => &OSS_ROUTES,
            Dialect::W3c => &W3C_ROUTES,
        }
    }

    fn lookup(&self, command: &str) -> Result<(Method, String)> {
        if let Some((method, template)) = self.overlay.get(command) {
            return Ok((method.clone(), template.clone()));
        }
        if let Some((method, template)) = self.dialect_table().get(command) {
            return Ok((method.clone(), (*template).to_string()));
        }
        if let Some((method, template)) = SHARED_ROUTES.get(command) {
            return Ok((method.clone(), (*template).to_string()));
        }
        Err(SessionError::Dispatch(format!(
            "unknown command `{command}` for {} dialect",
            self.dialect
        )))
    }
}

/// Replace each `:param` path segment with its value from `params`.
fn substitute(command: &str, template: &str, params: &[(&str, &str)]) -> Result<String> {
    let mut segments = Vec::new();
    for segment in template.split('/') {
        if let Some(name) = segment.strip_prefix(':') {
            let value = params
                .iter()
                .find(|(key, _)| *key == name)
                .map(|(_, value)| *value)
                .ok_or_else(|| {
                    SessionError::Dispatch(format!(
                        "missing parameter `{name}` for command `{command}`"
                    ))
                })?;
            segments.push(value.to_string());
        } else {
            segments.push(segment.to_string());
        }
    }
    Ok(segments.join("/"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shared_route_same_in_both_dialects() {
        for dialect in [Dialect::Oss, Dialect::W3c] {
            let route = CommandCodec::new(dialect)
                .resolve("newSession", &[])
                .unwrap();
            assert_eq!(route.method, Method::POST);
            assert_eq!(route.path, "/session");
        }
    }

    #[test]
    fn test_execute_script_diverges_by_dialect() {
        let params = [("sessionId", "abc")];

        let oss = CommandCodec::new(Dialect::Oss)
            .resolve("executeScript", &params)
            .unwrap();
        assert_eq!(oss.path, "/session/abc/execute");

        let w3c = CommandCodec::new(Dialect::W3c)
            .resolve("executeScript", &params)
            .unwrap();
        assert_eq!(w3c.path, "/session/abc/execute/sync");
    }

    #[test]
    fn test_multi_param_substitution() {
        let route = CommandCodec::new(Dialect::W3c)
            .resolve(
                "getElementAttribute",
                &[("sessionId", "abc"), ("elementId", "el-9"), ("name", "href")],
            )
            .unwrap();
        assert_eq!(route.method, Method::GET);
        assert_eq!(route.path, "/session/abc/element/el-9/attribute/href");
    }

    #[test]
    fn test_missing_param_is_dispatch_error() {
        let err = CommandCodec::new(Dialect::W3c)
            .resolve("deleteSession", &[])
            .unwrap_err();
        assert!(matches!(err, SessionError::Dispatch(_)));
        assert!(err.to_string().contains("sessionId"));
    }

    #[test]
    fn test_unknown_command_is_dispatch_error() {
        let err = CommandCodec::new(Dialect::Oss)
            .resolve("summonDragon", &[])
            .unwrap_err();
        assert!(matches!(err, SessionError::Dispatch(_)));
    }

    #[test]
    fn test_window_commands_per_dialect_only() {
        assert!(CommandCodec::new(Dialect::Oss)
            .resolve("getWindowSize", &[("sessionId", "s")])
            .is_ok());
        assert!(CommandCodec::new(Dialect::W3c)
            .resolve("getWindowSize", &[("sessionId", "s")])
            .is_err());
        assert!(CommandCodec::new(Dialect::W3c)
            .resolve("getWindowRect", &[("sessionId", "s")])
            .is_ok());
    }

    #[test]
    fn test_overlay_route_shadows_builtin() {
        let codec = CommandCodec::new(Dialect::W3c)
            .with_route("toggleWifi", Method::POST, "/session/:sessionId/appium/device/toggle_wifi")
            .with_route("status", Method::GET, "/healthz");

        let custom = codec.resolve("toggleWifi", &[("sessionId", "abc")]).unwrap();
        assert_eq!(custom.path, "/session/abc/appium/device/toggle_wifi");

        let shadowed = codec.resolve("status", &[]).unwrap();
        assert_eq!(shadowed.path, "/healthz");
    }

    #[test]
    fn test_routes_listing_sorted_and_complete() {
        let routes = CommandCodec::new(Dialect::W3c).routes();
        let names: Vec<&str> = routes.iter().map(|(name, _)| name.as_str()).collect();

        let mut sorted = names.clone();
        sorted.sort_unstable();
        assert_eq!(names, sorted);
        assert!(names.contains(&"hideKeyboard"));
        assert!(names.contains(&"getWindowRect"));
        assert!(!names.contains(&"getWindowSize"));
    }

    #[test]
    fn test_vendor_route_template() {
        let (_, route) = CommandCodec::new(Dialect::Oss)
            .routes()
            .into_iter()
            .find(|(name, _)| name == "getDeviceTime")
            .unwrap();
        assert_eq!(route.to_string(), "GET /session/:sessionId/appium/device/system_time");
    }
}
