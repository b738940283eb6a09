use axum::{http::StatusCode, response::IntoResponse, Json};
use serde_json::json;

#[axum::debug_handler]
pub async fn health() -> impl IntoResponse {
    let body = json!({
        "status": "healthy",
        "timestamp": chrono::Utc::now(),
        "service": "check-in timeout monitoring",
    });
    (StatusCode::OK, Json(body))
}
