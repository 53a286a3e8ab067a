#![allow(clippy::unwrap_used)]
// Integration tests for the request gateway: notifications, error
// normalization, deadlines, and retry composition.

use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use kubecloud_api::{Envelope, HttpClient, MockBackend, MockConfig, TransportConfig};
use kubecloud_core::{
    CoreError, Gateway, NotificationLedger, RequestOptions, RetryPolicy, Severity, with_retry,
};
use serde_json::{Value, json};
use tokio::time::Instant;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

// ── Helpers ─────────────────────────────────────────────────────────

fn ledger() -> NotificationLedger {
    NotificationLedger::new(Duration::from_millis(5000))
}

fn mock_gateway(config: MockConfig) -> Gateway {
    Gateway::new(
        MockBackend::new(config).into(),
        ledger(),
        Duration::from_millis(10_000),
        Duration::from_millis(8000),
    )
}

async fn http_gateway() -> (MockServer, Gateway) {
    let server = MockServer::start().await;
    let client =
        HttpClient::new(&format!("{}/api", server.uri()), &TransportConfig::default()).unwrap();
    let gateway = Gateway::new(
        client.into(),
        ledger(),
        Duration::from_millis(10_000),
        Duration::from_millis(8000),
    );
    (server, gateway)
}

// ── HTTP backend ────────────────────────────────────────────────────

#[tokio::test]
async fn success_returns_envelope_and_notifies() {
    let (server, gateway) = http_gateway().await;
    Mock::given(method("GET"))
        .and(path("/api/clusters"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": [],
            "status": 200,
            "message": "Success"
        })))
        .mount(&server)
        .await;

    let resp = gateway
        .get::<Envelope<Vec<Value>>>("/clusters", RequestOptions::default().success("Loaded"))
        .await
        .unwrap();

    assert_eq!(resp.status, 200);
    assert_eq!(resp.message, "Success");
    assert!(resp.into_payload().is_empty());

    let notes = gateway.ledger().snapshot();
    assert_eq!(notes.len(), 1);
    assert_eq!(notes[0].severity, Severity::Success);
    assert_eq!(notes[0].title, "Success");
    assert_eq!(notes[0].message, "Loaded");
}

#[tokio::test]
async fn http_error_is_normalized_with_long_lived_notification() {
    let (server, gateway) = http_gateway().await;
    Mock::given(method("POST"))
        .and(path("/api/clusters"))
        .respond_with(ResponseTemplate::new(409).set_body_json(json!({
            "message": "Cluster name already in use"
        })))
        .mount(&server)
        .await;

    let err = gateway
        .post::<Value, _>("/clusters", &json!({ "name": "x" }), RequestOptions::default())
        .await
        .unwrap_err();

    assert_eq!(err.to_string(), "Cluster name already in use");
    assert_eq!(err.status(), Some(500));
    assert_eq!(err.code(), "UNKNOWN_ERROR");
    assert_eq!(err.upstream_status(), Some(409));

    let notes = gateway.ledger().snapshot();
    assert_eq!(notes.len(), 1);
    assert_eq!(notes[0].severity, Severity::Error);
    assert_eq!(notes[0].title, "Error");
    assert_eq!(notes[0].message, "Cluster name already in use");
    assert_eq!(notes[0].duration, Duration::from_millis(8000));
}

#[tokio::test]
async fn missing_error_body_uses_status_line() {
    let (server, gateway) = http_gateway().await;
    Mock::given(method("DELETE"))
        .and(path("/api/clusters/cluster-9"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let err = gateway
        .delete::<Value>(
            "/clusters/cluster-9",
            RequestOptions::default().error("Delete failed"),
        )
        .await
        .unwrap_err();

    assert_eq!(err.to_string(), "HTTP 503: Service Unavailable");
    let notes = gateway.ledger().snapshot();
    assert_eq!(notes[0].title, "Delete failed");
}

#[tokio::test]
async fn quiet_requests_emit_nothing() {
    let (server, gateway) = http_gateway().await;
    Mock::given(method("GET"))
        .and(path("/api/users"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let result = gateway
        .get::<Value>(
            "/users",
            RequestOptions::default().quiet().loading("Fetching").success("Done"),
        )
        .await;

    assert!(result.is_err());
    assert!(gateway.ledger().is_empty());
}

#[tokio::test]
async fn undecodable_payload_is_a_request_error() {
    let (server, gateway) = http_gateway().await;
    Mock::given(method("GET"))
        .and(path("/api/clusters"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "data": "nope" })))
        .mount(&server)
        .await;

    let err = gateway
        .get::<Envelope<Vec<Value>>>("/clusters", RequestOptions::default().quiet())
        .await
        .unwrap_err();

    assert!(matches!(err, CoreError::Request { .. }));
    assert!(err.to_string().contains("Invalid response payload"));
}

// ── Simulated backend ───────────────────────────────────────────────

#[tokio::test(start_paused = true)]
async fn loading_notification_lives_while_pending() {
    let gateway = mock_gateway(MockConfig {
        delay: Duration::from_millis(1000),
        error_rate: 0.0,
    });

    let task = {
        let gateway = gateway.clone();
        tokio::spawn(async move {
            gateway
                .get::<Envelope<Vec<Value>>>(
                    "/clusters",
                    RequestOptions::default().loading("Fetching clusters"),
                )
                .await
        })
    };

    tokio::time::sleep(Duration::from_millis(500)).await;
    let pending = gateway.ledger().snapshot();
    assert_eq!(pending.len(), 1);
    assert_eq!(pending[0].title, "Loading");
    assert!(pending[0].is_persistent());

    let resp = task.await.unwrap().unwrap();
    assert_eq!(resp.into_payload().len(), 3);
    assert!(gateway.ledger().is_empty());
}

#[tokio::test(start_paused = true)]
async fn dropped_request_dismisses_loading_notification() {
    let gateway = mock_gateway(MockConfig {
        delay: Duration::from_millis(1000),
        error_rate: 0.0,
    });

    let abandoned = tokio::time::timeout(
        Duration::from_millis(100),
        gateway.get::<Envelope<Vec<Value>>>(
            "/clusters",
            RequestOptions::default().loading("Fetching clusters"),
        ),
    )
    .await;

    assert!(abandoned.is_err());
    assert!(gateway.ledger().is_empty());
    tokio::time::sleep(Duration::from_secs(3600)).await;
    assert!(gateway.ledger().is_empty());
}

#[tokio::test(start_paused = true)]
async fn deadline_yields_timeout() {
    let gateway = mock_gateway(MockConfig {
        delay: Duration::from_millis(1000),
        error_rate: 0.0,
    });
    let start = Instant::now();

    let err = gateway
        .get::<Value>(
            "/clusters",
            RequestOptions::default().timeout(Duration::from_millis(500)),
        )
        .await
        .unwrap_err();

    assert!(err.is_timeout());
    assert_eq!(err.to_string(), "Request timed out");
    assert_eq!(err.status(), Some(500));
    assert_eq!(start.elapsed(), Duration::from_millis(500));

    let notes = gateway.ledger().snapshot();
    assert_eq!(notes[0].message, "Request timed out");
}

#[tokio::test(start_paused = true)]
async fn unknown_mock_route_is_reported() {
    let gateway = mock_gateway(MockConfig::instant());
    let err = gateway
        .get::<Value>("/billing", RequestOptions::default().quiet())
        .await
        .unwrap_err();
    assert_eq!(err.to_string(), "Mock endpoint not found: /billing");
}

#[tokio::test(start_paused = true)]
async fn retry_wraps_gateway_calls() {
    let gateway = mock_gateway(MockConfig {
        delay: Duration::ZERO,
        error_rate: 1.0,
    });
    let attempts = Arc::new(AtomicU32::new(0));
    let start = Instant::now();

    let result = with_retry(RetryPolicy::default(), || {
        let gateway = gateway.clone();
        let attempts = Arc::clone(&attempts);
        async move {
            attempts.fetch_add(1, Ordering::SeqCst);
            gateway
                .get::<Value>("/clusters", RequestOptions::default().quiet())
                .await
        }
    })
    .await;

    let err = result.unwrap_err();
    assert_eq!(err.to_string(), "Mock API error");
    assert_eq!(attempts.load(Ordering::SeqCst), 3);
    assert_eq!(start.elapsed(), Duration::from_millis(3000));
}
