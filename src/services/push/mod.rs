pub mod dingtalk;
pub mod registry;

use std::collections::HashMap;

use async_trait::async_trait;

use crate::models::user::CheckinUser;

/// A pluggable notification delivery mechanism. Implementations format and
/// deliver a timeout notice for one user; each call is a single attempt.
#[async_trait]
pub trait PushChannel: Send + Sync {
    async fn send(
        &self,
        config: &HashMap<String, String>,
        user: &CheckinUser,
    ) -> std::result::Result<(), PushError>;
}

/// Failures scoped to a single push rule. None of these abort a sweep.
#[derive(Debug, thiserror::Error)]
pub enum PushError {
    #[error("unknown push channel type: {0}")]
    UnknownChannelType(String),

    #[error("invalid channel config: {0}")]
    InvalidConfig(String),

    #[error("delivery failed: {0}")]
    Delivery(String),

    #[error("delivery request failed: {0}")]
    Transport(#[from] reqwest::Error),
}
