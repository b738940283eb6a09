use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::push_rule::PushRule;

fn default_timezone() -> String {
    "Asia/Shanghai".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckinUser {
    pub user_id: String,
    /// Hours a user may go without checking in before they count as timed out.
    pub timeout_duration: i64,
    #[serde(default)]
    pub push_rules: Vec<PushRule>,
    #[serde(default)]
    pub last_checkin_time: Option<DateTime<Utc>>,
    #[serde(default = "default_timezone")]
    pub timezone: String,
}
