use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use axum::{
    body::Body,
    extract::{Request, State},
    http::StatusCode,
    response::Json,
    routing::post,
    Router,
};
use checkin_backend::{
    models::{push_rule::PushRule, user::CheckinUser},
    routes,
    storage::UserStorage,
    AppState,
};
use chrono::{DateTime, Duration, Utc};
use serde_json::{json, Value};
use tower::ServiceExt;

/// Captures (query string, JSON body) of every delivery that reaches the
/// fake DingTalk robot endpoint.
#[derive(Clone, Default)]
struct Sink {
    hits: Arc<Mutex<Vec<(String, Value)>>>,
}

async fn robot_send(State(sink): State<Sink>, request: Request) -> Json<Value> {
    let query = request.uri().query().unwrap_or("").to_string();
    let bytes = axum::body::to_bytes(request.into_body(), usize::MAX)
        .await
        .unwrap();
    let body: Value = serde_json::from_slice(&bytes).unwrap();
    sink.hits.lock().unwrap().push((query, body));
    Json(json!({ "errcode": 0, "errmsg": "ok" }))
}

/// 2xx response whose application-level error code reports a rejection.
async fn robot_reject(State(sink): State<Sink>, request: Request) -> Json<Value> {
    let query = request.uri().query().unwrap_or("").to_string();
    let bytes = axum::body::to_bytes(request.into_body(), usize::MAX)
        .await
        .unwrap();
    let body: Value = serde_json::from_slice(&bytes).unwrap();
    sink.hits.lock().unwrap().push((query, body));
    Json(json!({ "errcode": 310000, "errmsg": "keywords not in content" }))
}

async fn robot_unavailable(State(sink): State<Sink>, request: Request) -> (StatusCode, Json<Value>) {
    let query = request.uri().query().unwrap_or("").to_string();
    let bytes = axum::body::to_bytes(request.into_body(), usize::MAX)
        .await
        .unwrap();
    let body: Value = serde_json::from_slice(&bytes).unwrap();
    sink.hits.lock().unwrap().push((query, body));
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(json!({ "errmsg": "robot temporarily unavailable" })),
    )
}

async fn serve_router(app: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{}/robot/send?access_token=test-token", addr)
}

async fn spawn_robot_endpoint() -> (Sink, String) {
    let sink = Sink::default();
    let app = Router::new()
        .route("/robot/send", post(robot_send))
        .with_state(sink.clone());
    let webhook_url = serve_router(app).await;
    (sink, webhook_url)
}

fn sweep_app(state: AppState) -> Router {
    Router::new()
        .route(
            "/trigger-timeout-check",
            post(routes::sweep::trigger_timeout_check),
        )
        .with_state(state)
}

fn dingtalk_user(
    user_id: &str,
    timeout_hours: i64,
    last_checkin_time: Option<DateTime<Utc>>,
    config: HashMap<String, String>,
) -> CheckinUser {
    CheckinUser {
        user_id: user_id.to_string(),
        timeout_duration: timeout_hours,
        push_rules: vec![PushRule {
            id: "r1".to_string(),
            rule_type: "dingtalk".to_string(),
            enabled: true,
            config,
        }],
        last_checkin_time,
        timezone: "Asia/Shanghai".to_string(),
    }
}

async fn trigger(app: &Router) -> Value {
    let resp = app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/trigger-timeout-check")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn timed_out_user_gets_exactly_one_delivery() {
    let (sink, webhook_url) = spawn_robot_endpoint().await;

    let state = AppState::new(UserStorage::memory());
    let user = dingtalk_user(
        "u1",
        1,
        Some(Utc::now() - Duration::hours(2)),
        HashMap::from([("webhook_url".to_string(), webhook_url)]),
    );
    state.storage.save_user(&user).await.unwrap();

    let body = trigger(&sweep_app(state)).await;
    assert_eq!(body["summary"]["evaluated"], 1);
    assert_eq!(body["summary"]["timed_out"], 1);
    assert_eq!(body["summary"]["notified"], 1);
    assert_eq!(body["summary"]["failed"], 0);

    let hits = sink.hits.lock().unwrap();
    assert_eq!(hits.len(), 1);
    let (_, delivery) = &hits[0];
    assert_eq!(delivery["msgtype"], "text");
    let content = delivery["text"]["content"].as_str().unwrap();
    assert!(content.contains("u1"));
    assert!(content.contains("1 hour"));
}

#[tokio::test]
async fn recently_checked_in_user_is_not_notified() {
    let (sink, webhook_url) = spawn_robot_endpoint().await;

    let state = AppState::new(UserStorage::memory());
    let user = dingtalk_user(
        "u1",
        1,
        Some(Utc::now() - Duration::minutes(30)),
        HashMap::from([("webhook_url".to_string(), webhook_url)]),
    );
    state.storage.save_user(&user).await.unwrap();

    let body = trigger(&sweep_app(state)).await;
    assert_eq!(body["summary"]["timed_out"], 0);
    assert_eq!(body["summary"]["notified"], 0);
    assert!(sink.hits.lock().unwrap().is_empty());
}

#[tokio::test]
async fn signed_delivery_appends_timestamp_and_sign() {
    let (sink, webhook_url) = spawn_robot_endpoint().await;

    let state = AppState::new(UserStorage::memory());
    let user = dingtalk_user(
        "u1",
        1,
        Some(Utc::now() - Duration::hours(2)),
        HashMap::from([
            ("webhook_url".to_string(), webhook_url),
            ("secret".to_string(), "SEC0123456789".to_string()),
        ]),
    );
    state.storage.save_user(&user).await.unwrap();

    let body = trigger(&sweep_app(state)).await;
    assert_eq!(body["summary"]["notified"], 1);

    let hits = sink.hits.lock().unwrap();
    assert_eq!(hits.len(), 1);
    let (query, _) = &hits[0];
    assert!(query.contains("access_token=test-token"));
    assert!(query.contains("timestamp="));
    assert!(query.contains("sign="));
}

#[tokio::test]
async fn remote_error_code_counts_as_failed_delivery() {
    let sink = Sink::default();
    let app = Router::new()
        .route("/robot/send", post(robot_reject))
        .with_state(sink.clone());
    let webhook_url = serve_router(app).await;

    let state = AppState::new(UserStorage::memory());
    let user = dingtalk_user(
        "u1",
        1,
        Some(Utc::now() - Duration::hours(2)),
        HashMap::from([("webhook_url".to_string(), webhook_url)]),
    );
    state.storage.save_user(&user).await.unwrap();

    let body = trigger(&sweep_app(state)).await;
    assert_eq!(body["summary"]["timed_out"], 1);
    assert_eq!(body["summary"]["notified"], 0);
    assert_eq!(body["summary"]["failed"], 1);

    // The attempt reached the endpoint; the rejection came from the body.
    assert_eq!(sink.hits.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn non_2xx_status_counts_as_failed_delivery() {
    let sink = Sink::default();
    let app = Router::new()
        .route("/robot/send", post(robot_unavailable))
        .with_state(sink.clone());
    let webhook_url = serve_router(app).await;

    let state = AppState::new(UserStorage::memory());
    let user = dingtalk_user(
        "u1",
        1,
        Some(Utc::now() - Duration::hours(2)),
        HashMap::from([("webhook_url".to_string(), webhook_url)]),
    );
    state.storage.save_user(&user).await.unwrap();

    let body = trigger(&sweep_app(state)).await;
    assert_eq!(body["summary"]["timed_out"], 1);
    assert_eq!(body["summary"]["notified"], 0);
    assert_eq!(body["summary"]["failed"], 1);
    assert_eq!(sink.hits.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn failing_delivery_does_not_block_other_users() {
    let (sink, webhook_url) = spawn_robot_endpoint().await;

    let state = AppState::new(UserStorage::memory());
    let last_checkin = Some(Utc::now() - Duration::hours(2));

    // Nothing listens on port 9; this delivery fails at connect time.
    let broken = dingtalk_user(
        "broken-user",
        1,
        last_checkin,
        HashMap::from([(
            "webhook_url".to_string(),
            "http://127.0.0.1:9/robot/send?access_token=dead".to_string(),
        )]),
    );
    let healthy = dingtalk_user(
        "healthy-user",
        1,
        last_checkin,
        HashMap::from([("webhook_url".to_string(), webhook_url)]),
    );
    state.storage.save_user(&broken).await.unwrap();
    state.storage.save_user(&healthy).await.unwrap();

    let body = trigger(&sweep_app(state)).await;
    assert_eq!(body["summary"]["evaluated"], 2);
    assert_eq!(body["summary"]["timed_out"], 2);
    assert_eq!(body["summary"]["notified"], 1);
    assert_eq!(body["summary"]["failed"], 1);

    let hits = sink.hits.lock().unwrap();
    assert_eq!(hits.len(), 1);
    let content = hits[0].1["text"]["content"].as_str().unwrap();
    assert!(content.contains("healthy-user"));
}
