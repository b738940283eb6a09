use axum::{extract::State, response::{IntoResponse, Json}};
use chrono::Utc;

use crate::{dto::user_dto::SweepTriggerResponse, error::Result, AppState};

/// Manual sweep trigger. The caller gets a completion acknowledgment with
/// aggregate counts; per-rule failures surface only through logs.
#[utoipa::path(
    post,
    path = "/trigger-timeout-check",
    responses(
        (status = 200, description = "Sweep ran to completion", body = Json<SweepTriggerResponse>)
    )
)]
#[axum::debug_handler]
pub async fn trigger_timeout_check(State(state): State<AppState>) -> Result<impl IntoResponse> {
    let users = state.storage.list_users().await?;
    let summary = state.checker.sweep(&users, Utc::now()).await;

    Ok(Json(SweepTriggerResponse {
        message: "Timeout check completed".to_string(),
        timestamp: Utc::now(),
        summary,
    }))
}
