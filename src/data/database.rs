//! SQLite session store
//!
//! Sessions survive restarts. Uses SQLx with embedded migrations.

use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use sqlx::{Pool, Sqlite, SqlitePool};

use super::store::SessionStore;
use crate::auth::session::{SessionId, SessionRecord};
use crate::error::AppError;

/// Session store backed by a SQLite file
///
/// Expiry is a unix timestamp per row; expired rows are invisible to reads
/// and removed by [`SessionStore::purge_expired`].
pub struct SqliteSessionStore {
    pool: Pool<Sqlite>,
    ttl: Duration,
}

impl SqliteSessionStore {
    /// Open (or create) the database file and run migrations
    pub async fn connect(path: &Path, ttl: Duration) -> Result<Self, AppError> {
        // Create parent directory if it doesn't exist
        if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| {
                AppError::SessionPersistence(format!(
                    "failed to create session directory {}: {e}",
                    parent.display()
                ))
            })?;
        }

        let connection_string = format!("sqlite:{}?mode=rwc", path.display());
        let pool = SqlitePool::connect(&connection_string).await?;

        sqlx::migrate!("./migrations")
            .run(&pool)
            .await
            .map_err(|e| {
                tracing::error!("Migration failed: {}", e);
                AppError::SessionPersistence(format!("migration failed: {e}"))
            })?;

        tracing::info!(path = %path.display(), "Session database connected and migrated");

        Ok(Self { pool, ttl })
    }

    fn expires_at(&self) -> i64 {
        let ttl = i64::try_from(self.ttl.as_secs()).unwrap_or(i64::MAX);
        Utc::now().timestamp().saturating_add(ttl)
    }
}

fn record_from_row(state: Option<String>, access_token: Option<String>) -> SessionRecord {
    match (access_token, state) {
        (Some(access_token), _) => SessionRecord::Authenticated { access_token },
        (None, Some(state)) => SessionRecord::AwaitingCallback { state },
        (None, None) => SessionRecord::Anonymous,
    }
}

#[async_trait]
impl SessionStore for SqliteSessionStore {
    async fn get(&self, id: &SessionId) -> Result<Option<SessionRecord>, AppError> {
        let row = sqlx::query_as::<_, (Option<String>, Option<String>)>(
            "SELECT state, access_token FROM sessions WHERE id = ? AND expires_at > ?",
        )
        .bind(id.as_str())
        .bind(Utc::now().timestamp())
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|(state, access_token)| record_from_row(state, access_token)))
    }

    async fn put(&self, id: &SessionId, record: &SessionRecord) -> Result<(), AppError> {
        let (state, access_token) = match record {
            SessionRecord::Anonymous => return self.destroy(id).await,
            SessionRecord::AwaitingCallback { state } => (Some(state.as_str()), None),
            SessionRecord::Authenticated { access_token } => (None, Some(access_token.as_str())),
        };

        sqlx::query(
            r#"
            INSERT INTO sessions (id, state, access_token, expires_at)
            VALUES (?, ?, ?, ?)
            ON CONFLICT(id) DO UPDATE SET
                state = excluded.state,
                access_token = excluded.access_token,
                expires_at = excluded.expires_at
            "#,
        )
        .bind(id.as_str())
        .bind(state)
        .bind(access_token)
        .bind(self.expires_at())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn destroy(&self, id: &SessionId) -> Result<(), AppError> {
        sqlx::query("DELETE FROM sessions WHERE id = ?")
            .bind(id.as_str())
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn take_state(&self, id: &SessionId) -> Result<Option<String>, AppError> {
        // Single statement: SQLite serializes writers, so only one caller
        // can delete the pending row.
        let state = sqlx::query_scalar::<_, String>(
            r#"
            DELETE FROM sessions
            WHERE id = ? AND state IS NOT NULL AND access_token IS NULL AND expires_at > ?
            RETURNING state
            "#,
        )
        .bind(id.as_str())
        .bind(Utc::now().timestamp())
        .fetch_optional(&self.pool)
        .await?;

        Ok(state)
    }

    async fn purge_expired(&self) -> Result<u64, AppError> {
        let result = sqlx::query("DELETE FROM sessions WHERE expires_at <= ?")
            .bind(Utc::now().timestamp())
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }
}
