use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use chrono::{DateTime, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions, SqliteRow};
use sqlx::{Row, SqlitePool};
use tracing::info;

use crate::error::{Error, Result};
use crate::models::push_rule::PushRule;
use crate::models::user::CheckinUser;

/// Key-value store of user records. Backed either by process memory or by a
/// sqlite file, selected at startup; both backends expose the same surface.
#[derive(Clone)]
pub struct UserStorage {
    backend: Backend,
}

#[derive(Clone)]
enum Backend {
    Memory(Arc<RwLock<HashMap<String, CheckinUser>>>),
    Sqlite(SqlitePool),
}

impl UserStorage {
    pub fn memory() -> Self {
        Self {
            backend: Backend::Memory(Arc::new(RwLock::new(HashMap::new()))),
        }
    }

    pub async fn sqlite(path: &str) -> Result<Self> {
        let options = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS users (
                user_id TEXT PRIMARY KEY,
                timeout_duration INTEGER NOT NULL,
                push_rules TEXT NOT NULL,
                last_checkin_time TEXT,
                timezone TEXT DEFAULT 'Asia/Shanghai'
            )
            "#,
        )
        .execute(&pool)
        .await?;

        info!("sqlite user storage ready at {}", path);

        Ok(Self {
            backend: Backend::Sqlite(pool),
        })
    }

    pub async fn get_user(&self, user_id: &str) -> Result<Option<CheckinUser>> {
        match &self.backend {
            Backend::Memory(users) => Ok(users.read().unwrap().get(user_id).cloned()),
            Backend::Sqlite(pool) => {
                let row = sqlx::query(
                    "SELECT user_id, timeout_duration, push_rules, last_checkin_time, timezone \
                     FROM users WHERE user_id = ?",
                )
                .bind(user_id)
                .fetch_optional(pool)
                .await?;

                row.map(|r| row_to_user(&r)).transpose()
            }
        }
    }

    pub async fn save_user(&self, user: &CheckinUser) -> Result<()> {
        match &self.backend {
            Backend::Memory(users) => {
                users
                    .write()
                    .unwrap()
                    .insert(user.user_id.clone(), user.clone());
                Ok(())
            }
            Backend::Sqlite(pool) => {
                let push_rules = serde_json::to_string(&user.push_rules)?;
                let last_checkin_time = user.last_checkin_time.map(|t| t.to_rfc3339());

                sqlx::query(
                    "INSERT OR REPLACE INTO users \
                     (user_id, timeout_duration, push_rules, last_checkin_time, timezone) \
                     VALUES (?, ?, ?, ?, ?)",
                )
                .bind(&user.user_id)
                .bind(user.timeout_duration)
                .bind(push_rules)
                .bind(last_checkin_time)
                .bind(&user.timezone)
                .execute(pool)
                .await?;

                Ok(())
            }
        }
    }

    /// Returns true when a record existed and was removed.
    pub async fn delete_user(&self, user_id: &str) -> Result<bool> {
        match &self.backend {
            Backend::Memory(users) => Ok(users.write().unwrap().remove(user_id).is_some()),
            Backend::Sqlite(pool) => {
                let result = sqlx::query("DELETE FROM users WHERE user_id = ?")
                    .bind(user_id)
                    .execute(pool)
                    .await?;
                Ok(result.rows_affected() > 0)
            }
        }
    }

    /// Full snapshot of all tracked users, keyed by user id.
    pub async fn list_users(&self) -> Result<HashMap<String, CheckinUser>> {
        match &self.backend {
            Backend::Memory(users) => Ok(users.read().unwrap().clone()),
            Backend::Sqlite(pool) => {
                let rows = sqlx::query(
                    "SELECT user_id, timeout_duration, push_rules, last_checkin_time, timezone \
                     FROM users",
                )
                .fetch_all(pool)
                .await?;

                let mut users = HashMap::with_capacity(rows.len());
                for row in &rows {
                    let user = row_to_user(row)?;
                    users.insert(user.user_id.clone(), user);
                }
                Ok(users)
            }
        }
    }
}

fn row_to_user(row: &SqliteRow) -> Result<CheckinUser> {
    let push_rules_raw: String = row.try_get("push_rules")?;
    let push_rules: Vec<PushRule> = serde_json::from_str(&push_rules_raw)?;

    let last_checkin_raw: Option<String> = row.try_get("last_checkin_time")?;
    let last_checkin_time = match last_checkin_raw {
        Some(raw) => Some(
            DateTime::parse_from_rfc3339(&raw)
                .map_err(|e| Error::Internal(format!("invalid last_checkin_time in storage: {}", e)))?
                .with_timezone(&Utc),
        ),
        None => None,
    };

    Ok(CheckinUser {
        user_id: row.try_get("user_id")?,
        timeout_duration: row.try_get("timeout_duration")?,
        push_rules,
        last_checkin_time,
        timezone: row.try_get("timezone")?,
    })
}
