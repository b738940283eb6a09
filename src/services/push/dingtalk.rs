use std::collections::HashMap;

use async_trait::async_trait;
use base64::prelude::*;
use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use reqwest::Client;
use serde_json::{json, Value as JsonValue};
use sha2::Sha256;
use tracing::info;

use super::{PushChannel, PushError};
use crate::models::user::CheckinUser;

type HmacSha256 = Hmac<Sha256>;

/// DingTalk group-robot webhook channel.
///
/// Config keys: `webhook_url` (required), `secret` (optional; when present,
/// deliveries are signed the way the DingTalk robot API expects).
pub struct DingtalkChannel {
    client: Client,
}

impl DingtalkChannel {
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

/// HMAC-SHA256 over `"{timestamp}\n{secret}"` keyed by the secret, base64
/// encoded, then percent encoded for use as a query parameter.
fn sign_request(secret: &str, timestamp_millis: i64) -> String {
    let string_to_sign = format!("{}\n{}", timestamp_millis, secret);
    let mut mac =
        HmacSha256::new_from_slice(secret.as_bytes()).expect("HMAC accepts keys of any length");
    mac.update(string_to_sign.as_bytes());
    let digest = mac.finalize().into_bytes();
    let encoded = BASE64_STANDARD.encode(digest);
    url::form_urlencoded::byte_serialize(encoded.as_bytes()).collect()
}

fn build_message(user: &CheckinUser, now: DateTime<Utc>) -> String {
    let last_checkin = user
        .last_checkin_time
        .map(|t| t.to_rfc3339())
        .unwrap_or_else(|| "never".to_string());
    format!(
        "User {} has not checked in for over {} hour(s).\nLast check-in: {}\nCurrent time: {}",
        user.user_id,
        user.timeout_duration,
        last_checkin,
        now.to_rfc3339()
    )
}

#[async_trait]
impl PushChannel for DingtalkChannel {
    async fn send(
        &self,
        config: &HashMap<String, String>,
        user: &CheckinUser,
    ) -> std::result::Result<(), PushError> {
        let webhook_url = config
            .get("webhook_url")
            .filter(|url| !url.trim().is_empty())
            .ok_or_else(|| PushError::InvalidConfig("missing webhook_url".to_string()))?;
        let secret = config.get("secret").map(String::as_str).unwrap_or("");

        let now = Utc::now();
        let message = build_message(user, now);

        // Robots with a shared secret expect timestamp/sign appended to the
        // access-token URL.
        let target_url = if secret.is_empty() {
            webhook_url.clone()
        } else {
            let timestamp = now.timestamp_millis();
            let sign = sign_request(secret, timestamp);
            format!("{}&timestamp={}&sign={}", webhook_url, timestamp, sign)
        };

        let payload = json!({
            "msgtype": "text",
            "text": {
                "content": message
            }
        });

        let response = self.client.post(&target_url).json(&payload).send().await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(PushError::Delivery(format!(
                "DingTalk API returned status {}: {}",
                status, body
            )));
        }

        let body: JsonValue = response.json().await?;
        match body.get("errcode").and_then(JsonValue::as_i64) {
            Some(0) => {
                info!("DingTalk notification sent for user {}", user.user_id);
                Ok(())
            }
            _ => Err(PushError::Delivery(format!("DingTalk API error: {}", body))),
        }
    }
}
