use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::models::push_rule::PushRule;
use crate::models::user::CheckinUser;
use crate::services::timeout::SweepSummary;

fn default_timezone() -> String {
    "Asia/Shanghai".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CreateUserPayload {
    #[validate(length(min = 1))]
    pub user_id: String,
    #[validate(range(min = 1))]
    pub timeout_duration: i64,
    #[serde(default)]
    pub push_rules: Vec<PushRule>,
    #[serde(default = "default_timezone")]
    pub timezone: String,
}

impl From<CreateUserPayload> for CheckinUser {
    fn from(payload: CreateUserPayload) -> Self {
        Self {
            user_id: payload.user_id,
            timeout_duration: payload.timeout_duration,
            push_rules: payload.push_rules,
            last_checkin_time: None,
            timezone: payload.timezone,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct UpdateUserPayload {
    #[validate(range(min = 1))]
    pub timeout_duration: i64,
    #[serde(default)]
    pub push_rules: Vec<PushRule>,
    #[serde(default = "default_timezone")]
    pub timezone: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckinResponse {
    pub message: String,
    pub checkin_time: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimeoutConfigResponse {
    pub timeout_duration: i64,
    pub last_checkin_time: Option<DateTime<Utc>>,
    pub push_rules: Vec<PushRule>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SweepTriggerResponse {
    pub message: String,
    pub timestamp: DateTime<Utc>,
    pub summary: SweepSummary,
}
