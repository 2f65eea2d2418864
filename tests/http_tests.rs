// HTTP control surface tests, driven through the router without a socket

use axum::body::{to_bytes, Body};
use axum::http::{Request, StatusCode};
use axum::Router;
use serde_json::Value;
use std::time::Duration;
use tower::ServiceExt;
use voice_channel::{
    create_router, AppState, LoopbackConfig, LoopbackEngine, SessionConfig, SessionController,
};

fn app() -> (Router, SessionController) {
    let engine = LoopbackEngine::new(LoopbackConfig {
        join_latency: Duration::from_millis(5),
        leave_latency: Duration::from_millis(5),
    });
    let controller = SessionController::spawn(Box::new(engine), SessionConfig::default());
    (create_router(AppState::new(controller.clone())), controller)
}

async fn call(app: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let request = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(json) => request
            .header("content-type", "application/json")
            .body(Body::from(json.to_string()))
            .unwrap(),
        None => request.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let json = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, json)
}

async fn wait_for_phase(app: &Router, phase: &str) -> Value {
    for _ in 0..100 {
        let (_, body) = call(app, "GET", "/channel", None).await;
        if body["state"]["phase"] == phase {
            return body;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("session never reached {}", phase);
}

#[tokio::test]
async fn test_health_check() {
    let (app, _controller) = app();

    let response = app
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_join_toggle_leave() {
    let (app, _controller) = app();

    let (status, body) = call(
        &app,
        "POST",
        "/channel/join",
        Some(serde_json::json!({ "channel_id": "room1" })),
    )
    .await;
    assert_eq!(status, StatusCode::ACCEPTED);
    assert_eq!(body["status"], "joining");

    let snapshot = wait_for_phase(&app, "joined").await;
    assert_eq!(snapshot["state"]["channel_id"], "room1");

    let (status, body) = call(&app, "POST", "/channel/mute", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["enabled"], true);

    let (status, body) = call(&app, "POST", "/channel/speaker", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["enabled"], true);

    let (status, body) = call(&app, "POST", "/channel/leave", None).await;
    assert_eq!(status, StatusCode::ACCEPTED);
    assert_eq!(body["status"], "leaving");

    wait_for_phase(&app, "idle").await;
}

#[tokio::test]
async fn test_error_statuses() {
    let (app, controller) = app();

    let (status, body) = call(
        &app,
        "POST",
        "/channel/join",
        Some(serde_json::json!({ "channel_id": "" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("Invalid argument"));

    let (status, _) = call(&app, "POST", "/channel/mute", None).await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, _) = call(&app, "POST", "/channel/leave", None).await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, _) = call(
        &app,
        "POST",
        "/channel/join",
        Some(serde_json::json!({ "channel_id": "bad/name" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);

    controller.shutdown().await.unwrap();
    let (status, _) = call(&app, "GET", "/channel", None).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
}
