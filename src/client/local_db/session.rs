//! Cached user session
//!
//! A single row holding the last bearer token and user profile, so a client
//! started without network can still attach the token once it reconnects.

use chrono::{DateTime, Utc};
use sqlx::Row;

use crate::client::local_db::{parse_timestamp, LocalDatabase, Result, StorageError};

#[derive(Debug, Clone, PartialEq)]
pub struct CachedSession {
    pub token: String,
    pub user: serde_json::Value,
    pub cached_at: DateTime<Utc>,
}

impl LocalDatabase {
    pub async fn cache_user_session(&self, token: &str, user: &serde_json::Value) -> Result<()> {
        let user_json = serde_json::to_string(user)
            .map_err(|e| StorageError::Corrupt(format!("session user: {}", e)))?;

        sqlx::query(
            "INSERT OR REPLACE INTO user_session (id, token, user_json, cached_at)
             VALUES (1, ?, ?, ?)",
        )
        .bind(token)
        .bind(user_json)
        .bind(Utc::now().to_rfc3339())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn cached_user_session(&self) -> Result<Option<CachedSession>> {
        let row = sqlx::query("SELECT token, user_json, cached_at FROM user_session WHERE id = 1")
            .fetch_optional(&self.pool)
            .await?;

        let Some(row) = row else {
            return Ok(None);
        };

        let user_json: String = row.try_get("user_json")?;
        let cached_at: String = row.try_get("cached_at")?;

        Ok(Some(CachedSession {
            token: row.try_get("token")?,
            user: serde_json::from_str(&user_json)
                .map_err(|e| StorageError::Corrupt(format!("session user: {}", e)))?,
            cached_at: parse_timestamp("cached_at", &cached_at)?,
        }))
    }

    pub async fn clear_user_session(&self) -> Result<()> {
        sqlx::query("DELETE FROM user_session").execute(&self.pool).await?;
        Ok(())
    }
}
