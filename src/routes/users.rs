use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Json},
};
use chrono::Utc;
use serde_json::json;
use validator::Validate;

use crate::{
    dto::user_dto::{
        CheckinResponse, CreateUserPayload, TimeoutConfigResponse, UpdateUserPayload,
    },
    error::{Error, Result},
    models::user::CheckinUser,
    AppState,
};

#[utoipa::path(
    get,
    path = "/users/{user_id}",
    params(
        ("user_id" = String, Path, description = "User ID")
    ),
    responses(
        (status = 200, description = "User record", body = Json<CheckinUser>),
        (status = 404, description = "User not found")
    )
)]
#[axum::debug_handler]
pub async fn get_user(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> Result<impl IntoResponse> {
    let user = state
        .storage
        .get_user(&user_id)
        .await?
        .ok_or_else(|| Error::NotFound("User not found".to_string()))?;
    Ok(Json(user))
}

#[utoipa::path(
    post,
    path = "/users",
    request_body = CreateUserPayload,
    responses(
        (status = 201, description = "User created successfully"),
        (status = 400, description = "Invalid payload")
    )
)]
#[axum::debug_handler]
pub async fn create_user(
    State(state): State<AppState>,
    Json(payload): Json<CreateUserPayload>,
) -> Result<impl IntoResponse> {
    payload.validate()?;
    let user = CheckinUser::from(payload);
    state.storage.save_user(&user).await?;
    Ok((
        StatusCode::CREATED,
        Json(json!({ "message": "User created", "user_id": user.user_id })),
    ))
}

#[utoipa::path(
    put,
    path = "/users/{user_id}",
    params(
        ("user_id" = String, Path, description = "User ID")
    ),
    request_body = UpdateUserPayload,
    responses(
        (status = 200, description = "User updated successfully"),
        (status = 400, description = "Invalid payload"),
        (status = 404, description = "User not found")
    )
)]
#[axum::debug_handler]
pub async fn update_user(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
    Json(payload): Json<UpdateUserPayload>,
) -> Result<impl IntoResponse> {
    payload.validate()?;

    let existing = state
        .storage
        .get_user(&user_id)
        .await?
        .ok_or_else(|| Error::NotFound("User not found".to_string()))?;

    // Configuration edits never reset the check-in clock.
    let user = CheckinUser {
        user_id: user_id.clone(),
        timeout_duration: payload.timeout_duration,
        push_rules: payload.push_rules,
        last_checkin_time: existing.last_checkin_time,
        timezone: payload.timezone,
    };
    state.storage.save_user(&user).await?;

    Ok(Json(json!({ "message": "User updated", "user_id": user_id })))
}

#[utoipa::path(
    delete,
    path = "/users/{user_id}",
    params(
        ("user_id" = String, Path, description = "User ID")
    ),
    responses(
        (status = 204, description = "User deleted successfully"),
        (status = 404, description = "User not found")
    )
)]
#[axum::debug_handler]
pub async fn delete_user(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> Result<impl IntoResponse> {
    if !state.storage.delete_user(&user_id).await? {
        return Err(Error::NotFound("User not found".to_string()));
    }
    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    post,
    path = "/users/{user_id}/checkin",
    params(
        ("user_id" = String, Path, description = "User ID")
    ),
    responses(
        (status = 200, description = "Check-in recorded", body = Json<CheckinResponse>),
        (status = 404, description = "User not found")
    )
)]
#[axum::debug_handler]
pub async fn checkin(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> Result<impl IntoResponse> {
    let mut user = state
        .storage
        .get_user(&user_id)
        .await?
        .ok_or_else(|| Error::NotFound("User not found".to_string()))?;

    let checkin_time = Utc::now();
    user.last_checkin_time = Some(checkin_time);
    state.storage.save_user(&user).await?;

    Ok(Json(CheckinResponse {
        message: "Check-in recorded".to_string(),
        checkin_time,
    }))
}

#[utoipa::path(
    get,
    path = "/users/{user_id}/timeout-config",
    params(
        ("user_id" = String, Path, description = "User ID")
    ),
    responses(
        (status = 200, description = "Timeout configuration", body = Json<TimeoutConfigResponse>),
        (status = 404, description = "User not found")
    )
)]
#[axum::debug_handler]
pub async fn get_timeout_config(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> Result<impl IntoResponse> {
    let user = state
        .storage
        .get_user(&user_id)
        .await?
        .ok_or_else(|| Error::NotFound("User not found".to_string()))?;

    Ok(Json(TimeoutConfigResponse {
        timeout_duration: user.timeout_duration,
        last_checkin_time: user.last_checkin_time,
        push_rules: user.push_rules,
    }))
}
