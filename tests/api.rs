//! HTTP API integration tests over an in-memory wiring

mod common;

use std::sync::Arc;
use std::sync::atomic::Ordering;

use axum::body::{Body, to_bytes};
use axum::http::{Request, StatusCode, header};
use serde_json::{Value, json};
use tower::ServiceExt;

use aria_gateway::api::{ApiServer, ApiState};
use aria_gateway::backend::ReportBackend;

use common::{RecordingTransport, TestBot, build_bot, build_scheduler};

const VERIFY_TOKEN: &str = "shared-secret";

struct TestApi {
    state: Arc<ApiState>,
    transport: Arc<RecordingTransport>,
    fixture: TestBot,
}

async fn build_api() -> TestApi {
    let fixture = build_bot(None).await;
    let (scheduler, transport) = build_scheduler(
        fixture.analytics.clone(),
        fixture.audio_dir.path().to_path_buf(),
    );

    let state = Arc::new(ApiState {
        db: fixture.pool.clone(),
        bot: Arc::clone(&fixture.bot),
        scheduler,
        profiles: fixture.profiles.clone(),
        analytics: fixture.analytics.clone(),
        speech: Arc::clone(&fixture.speech),
        backend: Arc::clone(&fixture.backend) as Arc<dyn ReportBackend>,
        verify_token: VERIFY_TOKEN.to_string(),
        audio_dir: fixture.audio_dir.path().to_path_buf(),
    });

    TestApi {
        state,
        transport,
        fixture,
    }
}

async fn send(api: &TestApi, request: Request<Body>) -> (StatusCode, Vec<u8>) {
    let response = ApiServer::router(Arc::clone(&api.state))
        .oneshot(request)
        .await
        .unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, bytes.to_vec())
}

async fn get(api: &TestApi, uri: &str) -> (StatusCode, Vec<u8>) {
    send(
        api,
        Request::builder().uri(uri).body(Body::empty()).unwrap(),
    )
    .await
}

fn as_json(body: &[u8]) -> Value {
    serde_json::from_slice(body).unwrap()
}

#[tokio::test]
async fn health_reports_ok_and_version() {
    let api = build_api().await;

    let (status, body) = get(&api, "/health").await;
    assert_eq!(status, StatusCode::OK);

    let json = as_json(&body);
    assert_eq!(json["status"], "ok");
    assert_eq!(json["version"], env!("CARGO_PKG_VERSION"));
}

#[tokio::test]
async fn readiness_degrades_when_backend_is_down() {
    let api = build_api().await;

    let (status, body) = get(&api, "/ready").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(as_json(&body)["status"], "ok");

    // Backend outage: still ready, but degraded
    api.fixture.backend.fail.store(true, Ordering::SeqCst);
    let (status, body) = get(&api, "/ready").await;
    assert_eq!(status, StatusCode::OK);
    let json = as_json(&body);
    assert_eq!(json["status"], "degraded");
    assert_eq!(json["checks"]["backend"]["status"], "fail");
    assert_eq!(json["checks"]["database"]["status"], "ok");
}

#[tokio::test]
async fn webhook_verification_echoes_challenge() {
    let api = build_api().await;

    let (status, body) = get(
        &api,
        &format!("/webhook?hub.mode=subscribe&hub.verify_token={VERIFY_TOKEN}&hub.challenge=4821"),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, b"4821");
}

#[tokio::test]
async fn webhook_verification_rejects_bad_token() {
    let api = build_api().await;

    let (status, _) = get(
        &api,
        "/webhook?hub.mode=subscribe&hub.verify_token=wrong&hub.challenge=4821",
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn webhook_inbound_message_gets_a_reply() {
    let api = build_api().await;

    let payload = json!({
        "entry": [{
            "changes": [{
                "value": {
                    "messages": [{
                        "from": "5926009999",
                        "id": "wamid.test.1",
                        "type": "text",
                        "text": { "body": "hello" }
                    }]
                }
            }]
        }]
    });

    let request = Request::builder()
        .method("POST")
        .uri("/webhook")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(payload.to_string()))
        .unwrap();

    let (status, body) = send(&api, request).await;
    assert_eq!(status, StatusCode::OK);

    let json = as_json(&body);
    assert_eq!(json["status"], "received");
    assert_eq!(json["handled"], 1);

    let texts = api.transport.texts.lock().unwrap();
    assert_eq!(texts.len(), 1);
    assert_eq!(texts[0].0, "5926009999");
    // First contact gets the orientation menu
    assert!(texts[0].1.contains("REPORT"));
}

#[tokio::test]
async fn webhook_status_only_payload_is_acknowledged() {
    let api = build_api().await;

    let request = Request::builder()
        .method("POST")
        .uri("/webhook")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(r#"{"entry": [{"changes": [{"value": {}}]}]}"#))
        .unwrap();

    let (status, body) = send(&api, request).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(as_json(&body)["handled"], 0);
    assert!(api.transport.texts.lock().unwrap().is_empty());
}

#[tokio::test]
async fn preferences_unknown_user_is_not_found() {
    let api = build_api().await;
    let (status, _) = get(&api, "/api/preferences/nobody").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn preferences_partial_update_merges_and_clamps() {
    let api = build_api().await;
    api.fixture.profiles.find_or_create("5926001111").unwrap();

    let (status, body) = get(&api, "/api/preferences/5926001111").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(as_json(&body)["prefs"]["audio_enabled"], true);

    let request = Request::builder()
        .method("PUT")
        .uri("/api/preferences/5926001111")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(
            json!({ "audio_enabled": false, "speech_rate_wpm": 9000 }).to_string(),
        ))
        .unwrap();

    let (status, body) = send(&api, request).await;
    assert_eq!(status, StatusCode::OK);
    let json = as_json(&body);
    assert_eq!(json["prefs"]["audio_enabled"], false);
    // Out-of-range rate is clamped, untouched fields keep their values
    assert_eq!(json["prefs"]["speech_rate_wpm"], 250);
    assert_eq!(json["prefs"]["voice_gender"], "female");

    let stored = api.fixture.profiles.find("5926001111").unwrap().unwrap();
    assert!(!stored.prefs.audio_enabled);
    assert_eq!(stored.prefs.speech_rate_wpm, 250);
}

#[tokio::test]
async fn delivery_test_sends_text_and_schedules_audio() {
    let api = build_api().await;

    let request = Request::builder()
        .method("POST")
        .uri("/api/delivery/test/5926002222")
        .body(Body::empty())
        .unwrap();

    let (status, body) = send(&api, request).await;
    assert_eq!(status, StatusCode::OK);

    let json = as_json(&body);
    assert_eq!(json["status"], "sent");
    assert_eq!(json["audio_scheduled"], true);

    let texts = api.transport.texts.lock().unwrap();
    assert_eq!(texts.len(), 1);
    assert!(texts[0].1.contains("test"));
}

#[tokio::test]
async fn analytics_summary_is_served() {
    let api = build_api().await;

    let (status, body) = get(&api, "/api/analytics?days=3").await;
    assert_eq!(status, StatusCode::OK);
    assert!(as_json(&body).is_object());
}

#[tokio::test]
async fn audio_serves_artifacts_with_mime_type() {
    let api = build_api().await;
    std::fs::write(api.fixture.audio_dir.path().join("clip.mp3"), b"ID3 fake").unwrap();

    let request = Request::builder()
        .uri("/audio/clip.mp3")
        .body(Body::empty())
        .unwrap();
    let response = ApiServer::router(Arc::clone(&api.state))
        .oneshot(request)
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers().get(header::CONTENT_TYPE).unwrap(),
        "audio/mpeg"
    );
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    assert_eq!(&bytes[..], b"ID3 fake");
}

#[tokio::test]
async fn audio_missing_artifact_is_not_found() {
    let api = build_api().await;
    let (status, _) = get(&api, "/audio/nope.mp3").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn audio_rejects_traversal_attempts() {
    let api = build_api().await;
    let (status, _) = get(&api, "/audio/..secret.mp3").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}
