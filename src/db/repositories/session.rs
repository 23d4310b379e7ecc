//! Session repository
//!
//! Database operations for server-side sessions.
//!
//! This module provides:
//! - `SessionRepository` trait defining the interface for session data access
//! - `SqlxSessionRepository` implementing the trait for SQLite and MySQL

use crate::config::DatabaseDriver;
use crate::db::DynDatabasePool;
use crate::models::Session;
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use sqlx::{MySqlPool, Row, SqlitePool};
use std::collections::BTreeMap;
use std::sync::Arc;

/// Session repository trait
#[async_trait]
pub trait SessionRepository: Send + Sync {
    /// Insert a new session
    async fn create(&self, session: &Session) -> Result<()>;

    /// Get session by ID
    async fn get_by_id(&self, id: &str) -> Result<Option<Session>>;

    /// Persist the key/value bag of an existing session
    async fn save_data(&self, id: &str, data: &BTreeMap<String, String>) -> Result<()>;

    /// Delete a session
    async fn delete(&self, id: &str) -> Result<()>;

    /// Delete expired sessions, returning how many were removed
    async fn delete_expired(&self) -> Result<u64>;
}

/// SQLx-based session repository implementation
pub struct SqlxSessionRepository {
    pool: DynDatabasePool,
}

impl SqlxSessionRepository {
    /// Create a new SQLx session repository
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    /// Create a boxed repository for use with dependency injection
    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn SessionRepository> {
        Arc::new(Self::new(pool))
    }
}

#[async_trait]
impl SessionRepository for SqlxSessionRepository {
    async fn create(&self, session: &Session) -> Result<()> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                create_session_sqlite(self.pool.as_sqlite().unwrap(), session).await
            }
            DatabaseDriver::Mysql => {
                create_session_mysql(self.pool.as_mysql().unwrap(), session).await
            }
        }
    }

    async fn get_by_id(&self, id: &str) -> Result<Option<Session>> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                get_session_by_id_sqlite(self.pool.as_sqlite().unwrap(), id).await
            }
            DatabaseDriver::Mysql => {
                get_session_by_id_mysql(self.pool.as_mysql().unwrap(), id).await
            }
        }
    }

    async fn save_data(&self, id: &str, data: &BTreeMap<String, String>) -> Result<()> {
        let encoded = encode_data(data)?;
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                save_data_sqlite(self.pool.as_sqlite().unwrap(), id, &encoded).await
            }
            DatabaseDriver::Mysql => {
                save_data_mysql(self.pool.as_mysql().unwrap(), id, &encoded).await
            }
        }
    }

    async fn delete(&self, id: &str) -> Result<()> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                delete_session_sqlite(self.pool.as_sqlite().unwrap(), id).await
            }
            DatabaseDriver::Mysql => delete_session_mysql(self.pool.as_mysql().unwrap(), id).await,
        }
    }

    async fn delete_expired(&self) -> Result<u64> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                delete_expired_sessions_sqlite(self.pool.as_sqlite().unwrap()).await
            }
            DatabaseDriver::Mysql => {
                delete_expired_sessions_mysql(self.pool.as_mysql().unwrap()).await
            }
        }
    }
}

fn encode_data(data: &BTreeMap<String, String>) -> Result<String> {
    serde_json::to_string(data).context("Failed to encode session data")
}

/// Corrupt session data is treated as an empty bag
fn decode_data(raw: &str) -> BTreeMap<String, String> {
    serde_json::from_str(raw).unwrap_or_else(|e| {
        tracing::warn!("Discarding unreadable session data: {}", e);
        BTreeMap::new()
    })
}

// ============================================================================
// SQLite implementations
// ============================================================================

async fn create_session_sqlite(pool: &SqlitePool, session: &Session) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO sessions (id, user_id, data, expires_at, created_at)
        VALUES (?, ?, ?, ?, ?)
        "#,
    )
    .bind(&session.id)
    .bind(session.user_id)
    .bind(encode_data(&session.data)?)
    .bind(session.expires_at)
    .bind(session.created_at)
    .execute(pool)
    .await
    .context("Failed to create session")?;

    Ok(())
}

async fn get_session_by_id_sqlite(pool: &SqlitePool, id: &str) -> Result<Option<Session>> {
    let row = sqlx::query(
        r#"
        SELECT id, user_id, data, expires_at, created_at
        FROM sessions
        WHERE id = ?
        "#,
    )
    .bind(id)
    .fetch_optional(pool)
    .await
    .context("Failed to get session by ID")?;

    Ok(row.map(|row| row_to_session_sqlite(&row)))
}

async fn save_data_sqlite(pool: &SqlitePool, id: &str, data: &str) -> Result<()> {
    sqlx::query("UPDATE sessions SET data = ? WHERE id = ?")
        .bind(data)
        .bind(id)
        .execute(pool)
        .await
        .context("Failed to save session data")?;
    Ok(())
}

async fn delete_session_sqlite(pool: &SqlitePool, id: &str) -> Result<()> {
    sqlx::query("DELETE FROM sessions WHERE id = ?")
        .bind(id)
        .execute(pool)
        .await
        .context("Failed to delete session")?;
    Ok(())
}

async fn delete_expired_sessions_sqlite(pool: &SqlitePool) -> Result<u64> {
    let result = sqlx::query("DELETE FROM sessions WHERE expires_at < ?")
        .bind(Utc::now())
        .execute(pool)
        .await
        .context("Failed to delete expired sessions")?;
    Ok(result.rows_affected())
}

fn row_to_session_sqlite(row: &sqlx::sqlite::SqliteRow) -> Session {
    let data: String = row.get("data");
    Session {
        id: row.get("id"),
        user_id: row.get("user_id"),
        data: decode_data(&data),
        expires_at: row.get("expires_at"),
        created_at: row.get("created_at"),
    }
}

// ============================================================================
// MySQL implementations
// ============================================================================

async fn create_session_mysql(pool: &MySqlPool, session: &Session) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO sessions (id, user_id, data, expires_at, created_at)
        VALUES (?, ?, ?, ?, ?)
        "#,
    )
    .bind(&session.id)
    .bind(session.user_id)
    .bind(encode_data(&session.data)?)
    .bind(session.expires_at)
    .bind(session.created_at)
    .execute(pool)
    .await
    .context("Failed to create session")?;

    Ok(())
}

async fn get_session_by_id_mysql(pool: &MySqlPool, id: &str) -> Result<Option<Session>> {
    let row = sqlx::query(
        r#"
        SELECT id, user_id, data, expires_at, created_at
        FROM sessions
        WHERE id = ?
        "#,
    )
    .bind(id)
    .fetch_optional(pool)
    .await
    .context("Failed to get session by ID")?;

    Ok(row.map(|row| row_to_session_mysql(&row)))
}

async fn save_data_mysql(pool: &MySqlPool, id: &str, data: &str) -> Result<()> {
    sqlx::query("UPDATE sessions SET data = ? WHERE id = ?")
        .bind(data)
        .bind(id)
        .execute(pool)
        .await
        .context("Failed to save session data")?;
    Ok(())
}

async fn delete_session_mysql(pool: &MySqlPool, id: &str) -> Result<()> {
    sqlx::query("DELETE FROM sessions WHERE id = ?")
        .bind(id)
        .execute(pool)
        .await
        .context("Failed to delete session")?;
    Ok(())
}

async fn delete_expired_sessions_mysql(pool: &MySqlPool) -> Result<u64> {
    let result = sqlx::query("DELETE FROM sessions WHERE expires_at < ?")
        .bind(Utc::now())
        .execute(pool)
        .await
        .context("Failed to delete expired sessions")?;
    Ok(result.rows_affected())
}

fn row_to_session_mysql(row: &sqlx::mysql::MySqlRow) -> Session {
    let data: String = row.get("data");
    Session {
        id: row.get("id"),
        user_id: row.get("user_id"),
        data: decode_data(&data),
        expires_at: row.get("expires_at"),
        created_at: row.get("created_at"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{create_test_pool, migrations};
    use chrono::Duration;

    async fn setup_test_repo() -> SqlxSessionRepository {
        let pool = create_test_pool().await.expect("Failed to create test pool");
        migrations::run_migrations(&pool)
            .await
            .expect("Failed to run migrations");
        SqlxSessionRepository::new(pool)
    }

    #[tokio::test]
    async fn test_create_and_get_anonymous_session() {
        let repo = setup_test_repo().await;
        let mut session = Session::new(Duration::hours(1));
        session.data.insert("selected_role".to_string(), "faculty".to_string());

        repo.create(&session).await.expect("create");

        let found = repo.get_by_id(&session.id).await.unwrap().expect("found");
        assert!(found.user_id.is_none());
        assert_eq!(found.get("selected_role"), Some("faculty"));
        assert!(!found.is_expired());
    }

    #[tokio::test]
    async fn test_save_data() {
        let repo = setup_test_repo().await;
        let session = Session::new(Duration::hours(1));
        repo.create(&session).await.unwrap();

        let mut data = BTreeMap::new();
        data.insert("student_notice".to_string(), "hello".to_string());
        repo.save_data(&session.id, &data).await.unwrap();

        let found = repo.get_by_id(&session.id).await.unwrap().unwrap();
        assert_eq!(found.data, data);
    }

    #[tokio::test]
    async fn test_delete_and_delete_expired() {
        let repo = setup_test_repo().await;
        let live = Session::new(Duration::hours(1));
        let stale = Session::new(Duration::hours(-1));
        repo.create(&live).await.unwrap();
        repo.create(&stale).await.unwrap();

        assert_eq!(repo.delete_expired().await.unwrap(), 1);
        assert!(repo.get_by_id(&stale.id).await.unwrap().is_none());

        repo.delete(&live.id).await.unwrap();
        assert!(repo.get_by_id(&live.id).await.unwrap().is_none());
    }

    #[test]
    fn test_decode_corrupt_data() {
        assert!(decode_data("not json").is_empty());
        assert_eq!(decode_data(r#"{"a":"b"}"#).get("a").map(String::as_str), Some("b"));
    }
}
