mod common;

use axum::{
    body::{to_bytes, Body},
    http::{Request, StatusCode},
    Router,
};
use common::{drip_config, FakeDirectory, RecordingDispatcher};
use drip_backend::database::MemoryCampaignStore;
use drip_backend::{routes, AppState};
use serde_json::{json, Value as JsonValue};
use std::sync::Arc;
use tower::ServiceExt;

const SECRET: &str = "drip_test_secret";

fn app() -> (Router, Arc<MemoryCampaignStore>) {
    let store = Arc::new(MemoryCampaignStore::new());
    let state = AppState::new(
        &drip_config(),
        store.clone(),
        Arc::new(FakeDirectory::with_count(5)),
        Arc::new(RecordingDispatcher::default()),
        SECRET.to_string(),
    );
    (routes::router(state), store)
}

fn payload(session: &str) -> JsonValue {
    json!({
        "user_id": "user-7",
        "user_type": "guest",
        "stripe_session_id": session,
        "plan_name": "starter",
        "candidate_name": "Dana Reyes",
        "candidate_email": "dana@example.com",
        "resume_url": "https://files.example.com/dana.pdf",
    })
}

fn create_request(secret: Option<&str>, body: &JsonValue) -> Request<Body> {
    let mut builder = Request::builder()
        .method("POST")
        .uri("/api/drip/campaigns")
        .header("content-type", "application/json");
    if let Some(secret) = secret {
        builder = builder.header("x-drip-secret", secret);
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

async fn json_body(resp: axum::response::Response) -> JsonValue {
    let bytes = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn health_reports_ok() {
    let (app, _) = app();
    let resp = app
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(json_body(resp).await["status"], "ok");
}

#[tokio::test]
async fn create_requires_the_shared_secret() {
    let (app, store) = app();

    let resp = app
        .clone()
        .oneshot(create_request(None, &payload("cs_1")))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

    let resp = app
        .oneshot(create_request(Some("wrong"), &payload("cs_1")))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(store.len().await, 0);
}

#[tokio::test]
async fn create_is_accepted_once_per_session() {
    let (app, store) = app();

    let resp = app
        .clone()
        .oneshot(create_request(Some(SECRET), &payload("cs_http")))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::ACCEPTED);
    let first = json_body(resp).await;
    assert_eq!(first["created"], true);
    assert_eq!(first["campaign"]["recruiter_target"], 250);
    assert_eq!(first["campaign"]["waves"].as_array().unwrap().len(), 3);

    let resp = app
        .oneshot(create_request(Some(SECRET), &payload("cs_http")))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::ACCEPTED);
    let second = json_body(resp).await;
    assert_eq!(second["created"], false);
    assert_eq!(second["campaign_id"], first["campaign_id"]);
    assert_eq!(store.len().await, 1);
}

#[tokio::test]
async fn create_rejects_invalid_payload() {
    let (app, store) = app();
    let mut body = payload("cs_bad");
    body["candidate_email"] = json!("not-an-email");

    let resp = app.oneshot(create_request(Some(SECRET), &body)).await.unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    assert_eq!(store.len().await, 0);
}

#[tokio::test]
async fn status_lists_campaigns_for_user() {
    let (app, _) = app();
    app.clone()
        .oneshot(create_request(Some(SECRET), &payload("cs_status")))
        .await
        .unwrap();

    let resp = app
        .clone()
        .oneshot(
            Request::builder()
                .uri("/api/drip/status/user-7")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let body = json_body(resp).await;
    assert_eq!(body["campaigns"].as_array().unwrap().len(), 1);
    assert_eq!(body["campaigns"][0]["plan_name"], "starter");

    let resp = app
        .oneshot(
            Request::builder()
                .uri("/api/drip/status/nobody")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}
