//! End-to-end negotiation tests over real HTTP.
//!
//! These tests stand up small axum servers speaking one dialect each and
//! verify that the full client stack (payload store, candidate stream,
//! reqwest transport, classification) lands on the right dialect with
//! real network round trips.

use std::sync::{Arc, Mutex};

use appium_session::{Capabilities, Dialect, Handshake, SessionError};
use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::post;
use axum::{Json, Router};
use serde_json::{json, Value};

/// Request bodies recorded by a test server.
#[derive(Clone, Default)]
struct Recorded {
    bodies: Arc<Mutex<Vec<Value>>>,
}

impl Recorded {
    fn bodies(&self) -> Vec<Value> {
        self.bodies.lock().unwrap().clone()
    }
}

/// Bind an ephemeral port and serve the router in the background.
async fn spawn_server(router: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    format!("http://{addr}")
}

/// W3C server that refuses any body carrying legacy members.
async fn strict_w3c_session(
    State(rec): State<Recorded>,
    Json(body): Json<Value>,
) -> (StatusCode, Json<Value>) {
    rec.bodies.lock().unwrap().push(body.clone());

    if body.get("desiredCapabilities").is_some() || body.get("requiredCapabilities").is_some() {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({
                "value": {"error": "invalid argument", "message": "unrecognized top-level member"}
            })),
        );
    }

    let granted = body["capabilities"]["firstMatch"][0].clone();
    (
        StatusCode::OK,
        Json(json!({"value": {"sessionId": "e2e-w3c", "capabilities": granted}})),
    )
}

/// Legacy server that only understands the flat member and always answers
/// in the numeric-status shape.
async fn legacy_session(State(rec): State<Recorded>, Json(body): Json<Value>) -> Json<Value> {
    rec.bodies.lock().unwrap().push(body.clone());
    let caps = body["desiredCapabilities"].clone();
    Json(json!({"status": 0, "sessionId": "e2e-legacy", "value": caps}))
}

/// Server with no free devices: every request is definitively rejected.
async fn full_farm_session(
    State(rec): State<Recorded>,
    Json(body): Json<Value>,
) -> (StatusCode, Json<Value>) {
    rec.bodies.lock().unwrap().push(body);
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(json!({
            "value": {"error": "session not created", "message": "device farm is full"}
        })),
    )
}

fn ios_caps() -> Capabilities {
    Capabilities::new()
        .with_entry("platformName", json!("iOS"))
        .with_entry("appium:app", json!("/tmp/demo.app"))
}

#[tokio::test]
async fn test_strict_w3c_server_reached_on_third_candidate() {
    let rec = Recorded::default();
    let router = Router::new()
        .route("/session", post(strict_w3c_session))
        .with_state(rec.clone());
    let base = spawn_server(router).await;

    let session = Handshake::builder()
        .server_url(&base)
        .build()
        .unwrap()
        .negotiate(&ios_caps())
        .await
        .unwrap();

    assert_eq!(session.dialect, Dialect::W3c);
    assert_eq!(session.session_id, "e2e-w3c");
    assert_eq!(session.capabilities.get_str("platformName"), Some("iOS"));
    assert_eq!(session.capabilities.get_str("appium:app"), Some("/tmp/demo.app"));

    // All three encodings hit the wire, in order.
    let bodies = rec.bodies();
    assert_eq!(bodies.len(), 3);
    assert!(bodies[0].get("desiredCapabilities").is_some());
    assert!(bodies[0].get("capabilities").is_some());
    assert_eq!(bodies[1]["requiredCapabilities"], json!({}));
    assert!(bodies[2].get("desiredCapabilities").is_none());
}

#[tokio::test]
async fn test_legacy_server_matches_combined_candidate() {
    let rec = Recorded::default();
    let router = Router::new()
        .route("/session", post(legacy_session))
        .with_state(rec.clone());
    let base = spawn_server(router).await;

    let caps = Capabilities::new()
        .with_entry("platform", json!("ANDROID"))
        .with_entry("deviceName", json!("Pixel 8"));

    let session = Handshake::builder()
        .server_url(&base)
        .build()
        .unwrap()
        .negotiate(&caps)
        .await
        .unwrap();

    assert_eq!(session.dialect, Dialect::Oss);
    assert_eq!(session.session_id, "e2e-legacy");
    // The legacy server echoes the flat map out of `value`.
    assert_eq!(session.capabilities.get_str("deviceName"), Some("Pixel 8"));

    // One request sufficed, and its W3C half carried the derived keys.
    let bodies = rec.bodies();
    assert_eq!(bodies.len(), 1);
    let first_match = &bodies[0]["capabilities"]["firstMatch"][0];
    assert_eq!(first_match["platformName"], "ANDROID");
    assert_eq!(first_match["appium:deviceName"], "Pixel 8");
}

#[tokio::test]
async fn test_rejecting_server_fails_after_single_request() {
    let rec = Recorded::default();
    let router = Router::new()
        .route("/session", post(full_farm_session))
        .with_state(rec.clone());
    let base = spawn_server(router).await;

    let err = Handshake::builder()
        .server_url(&base)
        .build()
        .unwrap()
        .negotiate(&ios_caps())
        .await
        .unwrap_err();

    match err {
        SessionError::SessionNotCreated { message, .. } => {
            assert_eq!(message, "device farm is full");
        }
        other => panic!("expected SessionNotCreated, got {other}"),
    }
    assert_eq!(rec.bodies().len(), 1);
}

#[tokio::test]
async fn test_unreachable_server_reports_network_source() {
    // Bind then drop to get a port with nothing listening.
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let base = format!("http://{}", listener.local_addr().unwrap());
    drop(listener);

    let err = Handshake::builder()
        .server_url(&base)
        .build()
        .unwrap()
        .negotiate(&ios_caps())
        .await
        .unwrap_err();

    match err {
        SessionError::SessionNotCreated { source, .. } => {
            assert!(source.is_some());
        }
        other => panic!("expected SessionNotCreated, got {other}"),
    }
}
