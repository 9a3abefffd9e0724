//! HTTP API tests against a locally bound server.

use std::sync::Arc;

use serde_json::{json, Value};

use squeeze_common::Config;
use squeeze_scanner::data::DemoProvider;
use squeeze_scanner::routes::SESSION_HEADER;
use squeeze_scanner::{build_router, ScannerState};

/// Serve the router on an ephemeral port and return its base URL.
async fn spawn_server() -> (String, Arc<ScannerState>) {
    spawn_server_with_interval(0).await
}

async fn spawn_server_with_interval(cycle_interval_secs: u64) -> (String, Arc<ScannerState>) {
    let mut config = Config::default();
    config.scanner.batch_delay_ms = 0;
    config.scanner.item_stagger_ms = 0;
    config.scanner.cycle_interval_secs = cycle_interval_secs;

    let state = Arc::new(
        ScannerState::with_provider(config, Arc::new(DemoProvider::with_fixed_bucket(42))).unwrap(),
    );
    let app = build_router(Arc::clone(&state));

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    (format!("http://{addr}"), state)
}

#[tokio::test]
async fn test_health() {
    let (base, _) = spawn_server().await;
    let body: Value = reqwest::get(format!("{base}/health")).await.unwrap().json().await.unwrap();

    assert_eq!(body["status"], "healthy");
    assert_eq!(body["service"], "squeeze-scanner");
    assert_eq!(body["provider"], "demo");
}

#[tokio::test]
async fn test_one_shot_scan() {
    let (base, _) = spawn_server().await;
    let response = reqwest::Client::new()
        .post(format!("{base}/api/v1/scan"))
        .json(&json!({ "symbols": ["gme", "AMC", "tsla"] }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);

    let body: Value = response.json().await.unwrap();
    assert_eq!(body["success"], true);
    assert_eq!(body["mode"], "standard");
    assert_eq!(body["summary"]["total"], 3);

    let results = body["results"].as_array().unwrap();
    assert_eq!(results.len(), 3);
    let scores: Vec<u64> = results.iter().map(|r| r["score"].as_u64().unwrap()).collect();
    assert!(scores.windows(2).all(|w| w[0] >= w[1]));
}

#[tokio::test]
async fn test_expanded_scan_default_universe() {
    let (base, _) = spawn_server().await;
    let body: Value = reqwest::Client::new()
        .post(format!("{base}/api/v1/scan"))
        .json(&json!({ "useExpandedData": true }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    assert_eq!(body["mode"], "expanded");
    assert_eq!(body["summary"]["total"], 100);
    assert_eq!(body["summary"]["top_squeezes"].as_array().unwrap().len(), 10);
}

#[tokio::test]
async fn test_bad_requests() {
    let (base, _) = spawn_server().await;
    let client = reqwest::Client::new();

    let response = client
        .post(format!("{base}/api/v1/scan"))
        .json(&json!({ "symbols": ["GME", ""] }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 400);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["success"], false);

    let response = client
        .post(format!("{base}/api/v1/scan"))
        .json(&json!({ "filters": { "minHolyGrail": 150 } }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 400);
}

#[tokio::test]
async fn test_unknown_session() {
    let (base, _) = spawn_server().await;
    let client = reqwest::Client::new();

    let id = uuid::Uuid::new_v4();
    let response = client.post(format!("{base}/api/v1/scan/{id}/stop")).send().await.unwrap();
    assert_eq!(response.status(), 404);

    let response = client.get(format!("{base}/api/v1/scan/{id}")).send().await.unwrap();
    assert_eq!(response.status(), 404);
}

#[tokio::test]
async fn test_stream_one_shot() {
    let (base, state) = spawn_server().await;
    let response = reqwest::Client::new()
        .post(format!("{base}/api/v1/scan/stream"))
        .json(&json!({ "symbols": ["GME", "AMC"] }))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), 200);
    assert!(response.headers().contains_key(SESSION_HEADER));

    // the stream ends once the session finishes
    let body = response.text().await.unwrap().replace("event: ", "event:");
    let started = body.find("event:scan-started").unwrap();
    let update = body.find("event:stock-update").unwrap();
    let complete = body.find("event:scan-complete").unwrap();
    let finished = body.find("event:scan-finished").unwrap();
    assert!(started < update && update < complete && complete < finished);
    assert_eq!(body.matches("event:stock-update").count(), 2);

    // finished sessions leave the registry
    for _ in 0..50 {
        if state.sessions.read().await.is_empty() {
            break;
        }
        tokio::time::sleep(std::time::Duration::from_millis(10)).await;
    }
    assert!(state.sessions.read().await.is_empty());
}

#[tokio::test]
async fn test_stream_stop_continuous() {
    let (base, _) = spawn_server_with_interval(30).await;
    let client = reqwest::Client::new();

    let response = client
        .post(format!("{base}/api/v1/scan/stream"))
        .json(&json!({ "symbols": ["GME"], "autoRefresh": true }))
        .send()
        .await
        .unwrap();
    let id = response.headers()[SESSION_HEADER].to_str().unwrap().to_string();

    let status: Value = client
        .get(format!("{base}/api/v1/scan/{id}"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(status["mode"], "continuous");

    let listed: Value = client
        .get(format!("{base}/api/v1/scan/sessions"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(listed["count"], 1);

    let stop = client.post(format!("{base}/api/v1/scan/{id}/stop")).send().await.unwrap();
    assert_eq!(stop.status(), 200);

    let body = tokio::time::timeout(std::time::Duration::from_secs(10), response.text())
        .await
        .unwrap()
        .unwrap()
        .replace("event: ", "event:");
    assert_eq!(body.matches("event:scan-started").count(), 1);
    assert_eq!(body.matches("event:scan-finished").count(), 1);
}
