use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info};

use super::push::registry::ChannelRegistry;
use crate::models::user::CheckinUser;

/// Outcome counts for one sweep over the full user set.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SweepSummary {
    pub evaluated: usize,
    pub timed_out: usize,
    pub notified: usize,
    pub failed: usize,
}

/// True when the user's last check-in is strictly older than their configured
/// timeout. Users who never checked in are never considered timed out.
pub fn is_timed_out(user: &CheckinUser, now: DateTime<Utc>) -> bool {
    match user.last_checkin_time {
        Some(last_checkin) => {
            (now - last_checkin).num_seconds() > user.timeout_duration.saturating_mul(3600)
        }
        None => false,
    }
}

pub struct TimeoutChecker {
    registry: Arc<ChannelRegistry>,
}

impl TimeoutChecker {
    pub fn new(registry: Arc<ChannelRegistry>) -> Self {
        Self { registry }
    }

    /// One pass over a user snapshot: evaluate every user and dispatch push
    /// notifications for the timed-out ones. Failures stay scoped to the rule
    /// that produced them; the sweep always runs to completion.
    pub async fn sweep(
        &self,
        users: &HashMap<String, CheckinUser>,
        now: DateTime<Utc>,
    ) -> SweepSummary {
        let mut summary = SweepSummary::default();

        for (user_id, user) in users {
            summary.evaluated += 1;

            if !is_timed_out(user, now) {
                debug!("user {} is within their timeout window", user_id);
                continue;
            }

            summary.timed_out += 1;
            info!("user {} timed out, dispatching push notifications", user_id);

            for rule in &user.push_rules {
                if !rule.enabled {
                    continue;
                }

                let channel = match self.registry.resolve(&rule.rule_type) {
                    Ok(channel) => channel,
                    Err(e) => {
                        summary.failed += 1;
                        error!(
                            "cannot resolve channel for user {} rule {} ({}): {}",
                            user_id, rule.id, rule.rule_type, e
                        );
                        continue;
                    }
                };

                match channel.send(&rule.config, user).await {
                    Ok(()) => {
                        summary.notified += 1;
                        info!(
                            "sent {} notification for user {} (rule {})",
                            rule.rule_type, user_id, rule.id
                        );
                    }
                    Err(e) => {
                        summary.failed += 1;
                        error!(
                            "failed to send {} notification for user {} (rule {}): {}",
                            rule.rule_type, user_id, rule.id, e
                        );
                    }
                }
            }
        }

        summary
    }
}
