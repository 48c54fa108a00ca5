//! HTTP probe tests against an in-process llama.cpp stand-in.

use std::time::Duration;

use axum::Router;
use axum::http::{HeaderMap, StatusCode};
use axum::routing::get;
use beacon_core::{BeaconError, Deadline, ServerAddr};
use beacon_probe::{LlamaCppProbe, Probe};
use tokio_util::sync::CancellationToken;

async fn serve(router: Router) -> ServerAddr {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    ServerAddr::new("127.0.0.1", port)
}

fn deadline(parent: &CancellationToken) -> Deadline {
    Deadline::new(Duration::from_secs(2), parent)
}

#[tokio::test]
async fn probe_reports_healthy_server() {
    let router = Router::new().route(
        "/health",
        get(|| async { r#"{"status":"ok","slots_idle":2,"slots_processing":0}"# }),
    );
    let addr = serve(router).await;
    let probe = LlamaCppProbe::new(addr, None).unwrap();

    let parent = CancellationToken::new();
    let sample = probe.probe(&deadline(&parent)).await.unwrap();
    assert_eq!(sample.status, "ok");
    assert_eq!(sample.slots_idle, Some(2));
    assert_eq!(sample.slots_processing, Some(0));
}

#[tokio::test]
async fn probe_relays_loading_model() {
    let router = Router::new().route(
        "/health",
        get(|| async {
            (
                StatusCode::SERVICE_UNAVAILABLE,
                r#"{"status":"loading model"}"#,
            )
        }),
    );
    let addr = serve(router).await;
    let probe = LlamaCppProbe::new(addr, None).unwrap();

    let parent = CancellationToken::new();
    let sample = probe.probe(&deadline(&parent)).await.unwrap();
    assert_eq!(sample.status, "loading model");
}

#[tokio::test]
async fn probe_sends_bearer_token() {
    let router = Router::new().route(
        "/health",
        get(|headers: HeaderMap| async move {
            match headers.get("authorization").and_then(|v| v.to_str().ok()) {
                Some("Bearer s3cret") => (StatusCode::OK, r#"{"status":"ok"}"#),
                _ => (StatusCode::UNAUTHORIZED, ""),
            }
        }),
    );
    let addr = serve(router).await;
    let parent = CancellationToken::new();

    let with_key = LlamaCppProbe::new(addr.clone(), Some("s3cret".to_string())).unwrap();
    let sample = with_key.probe(&deadline(&parent)).await.unwrap();
    assert_eq!(sample.status, "ok");

    let without_key = LlamaCppProbe::new(addr, None).unwrap();
    let sample = without_key.probe(&deadline(&parent)).await.unwrap();
    assert_eq!(sample.status, "unauthorized");
}

#[tokio::test]
async fn probe_unexpected_status_is_error() {
    let router = Router::new().route(
        "/health",
        get(|| async { (StatusCode::INTERNAL_SERVER_ERROR, "boom") }),
    );
    let addr = serve(router).await;
    let probe = LlamaCppProbe::new(addr, None).unwrap();

    let parent = CancellationToken::new();
    let err = probe.probe(&deadline(&parent)).await.unwrap_err();
    assert!(matches!(err, BeaconError::Probe(_)));
}

#[tokio::test]
async fn probe_to_closed_port_is_error() {
    let probe = LlamaCppProbe::new(ServerAddr::new("127.0.0.1", 1), None).unwrap();

    let parent = CancellationToken::new();
    let err = probe.probe(&deadline(&parent)).await.unwrap_err();
    assert!(matches!(err, BeaconError::Probe(_)));
}

#[tokio::test]
async fn probe_slow_server_hits_deadline() {
    let router = Router::new().route(
        "/health",
        get(|| async {
            tokio::time::sleep(Duration::from_secs(5)).await;
            r#"{"status":"ok"}"#
        }),
    );
    let addr = serve(router).await;
    let probe = LlamaCppProbe::new(addr, None).unwrap();

    let parent = CancellationToken::new();
    let deadline = Deadline::new(Duration::from_millis(50), &parent);
    let err = probe.probe(&deadline).await.unwrap_err();
    assert!(matches!(err, BeaconError::DeadlineElapsed(_)));
}
