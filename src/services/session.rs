//! Session service
//!
//! Server-side sessions keyed by the cookie value. A session holds an optional
//! user binding and a small string bag used for the selected login role and
//! one-shot notices.

use crate::db::repositories::SessionRepository;
use crate::models::Session;
use anyhow::Context;
use chrono::Duration;
use std::sync::Arc;

/// Session key remembering the role picked on the portal page
pub const SELECTED_ROLE_KEY: &str = "selected_role";

/// Session key for the notice shown once on the student catalog
pub const STUDENT_NOTICE_KEY: &str = "student_notice";

/// Error types for session service operations
#[derive(Debug, thiserror::Error)]
pub enum SessionServiceError {
    /// Internal error
    #[error("Internal error: {0}")]
    InternalError(#[from] anyhow::Error),
}

/// Session service
pub struct SessionService {
    repo: Arc<dyn SessionRepository>,
    ttl: Duration,
}

impl SessionService {
    /// Create a session service whose sessions live for `ttl_hours`
    pub fn new(repo: Arc<dyn SessionRepository>, ttl_hours: i64) -> Self {
        Self {
            repo,
            ttl: Duration::hours(ttl_hours),
        }
    }

    /// Create and persist a fresh anonymous session
    pub async fn start(&self) -> Result<Session, SessionServiceError> {
        let session = Session::new(self.ttl);
        self.repo
            .create(&session)
            .await
            .context("Failed to create session")?;
        Ok(session)
    }

    /// Look up a live session. Expired sessions are deleted and ignored.
    pub async fn load(&self, id: &str) -> Result<Option<Session>, SessionServiceError> {
        let Some(session) = self
            .repo
            .get_by_id(id)
            .await
            .context("Failed to get session")?
        else {
            return Ok(None);
        };

        if session.is_expired() {
            tracing::debug!("Dropping expired session");
            self.repo
                .delete(id)
                .await
                .context("Failed to delete expired session")?;
            return Ok(None);
        }

        Ok(Some(session))
    }

    /// Store `value` under `key`
    pub async fn set(
        &self,
        session: &mut Session,
        key: &str,
        value: impl Into<String>,
    ) -> Result<(), SessionServiceError> {
        session.data.insert(key.to_string(), value.into());
        self.repo
            .save_data(&session.id, &session.data)
            .await
            .context("Failed to save session data")?;
        Ok(())
    }

    /// Remove and return the value under `key`
    pub async fn take(
        &self,
        session: &mut Session,
        key: &str,
    ) -> Result<Option<String>, SessionServiceError> {
        let value = session.data.remove(key);
        if value.is_some() {
            self.repo
                .save_data(&session.id, &session.data)
                .await
                .context("Failed to save session data")?;
        }
        Ok(value)
    }

    /// Bind a user to a brand new session id.
    ///
    /// Data from the previous session carries over except the selected role,
    /// which is consumed by the login. The previous session is deleted.
    pub async fn attach_user(
        &self,
        previous: Option<&Session>,
        user_id: i64,
    ) -> Result<Session, SessionServiceError> {
        let mut session = Session::new(self.ttl);
        session.user_id = Some(user_id);

        if let Some(previous) = previous {
            session.data = previous.data.clone();
            session.data.remove(SELECTED_ROLE_KEY);
        }

        self.repo
            .create(&session)
            .await
            .context("Failed to create session")?;

        if let Some(previous) = previous {
            self.repo
                .delete(&previous.id)
                .await
                .context("Failed to delete previous session")?;
        }

        Ok(session)
    }

    /// Delete a session
    pub async fn destroy(&self, id: &str) -> Result<(), SessionServiceError> {
        self.repo
            .delete(id)
            .await
            .context("Failed to delete session")?;
        Ok(())
    }

    /// Delete every expired session, returning how many were removed
    pub async fn purge_expired(&self) -> Result<u64, SessionServiceError> {
        let removed = self
            .repo
            .delete_expired()
            .await
            .context("Failed to delete expired sessions")?;
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repositories::SqlxSessionRepository;
    use crate::db::{create_test_pool, migrations};

    async fn setup_test_service(ttl_hours: i64) -> SessionService {
        let pool = create_test_pool().await.expect("Failed to create test pool");
        migrations::run_migrations(&pool)
            .await
            .expect("Failed to run migrations");
        sqlx::query("INSERT INTO users (username, password_hash) VALUES ('student1', 'x')")
            .execute(pool.as_sqlite().unwrap())
            .await
            .unwrap();
        SessionService::new(SqlxSessionRepository::boxed(pool), ttl_hours)
    }

    #[tokio::test]
    async fn test_start_and_load() {
        let service = setup_test_service(1).await;
        let session = service.start().await.unwrap();

        let loaded = service.load(&session.id).await.unwrap().expect("session");
        assert!(loaded.user_id.is_none());
        assert!(service.load("missing").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_expired_session_is_removed() {
        let service = setup_test_service(-1).await;
        let session = service.start().await.unwrap();

        assert!(service.load(&session.id).await.unwrap().is_none());
        assert_eq!(service.purge_expired().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_notice_is_returned_once() {
        let service = setup_test_service(1).await;
        let mut session = service.start().await.unwrap();

        service
            .set(&mut session, STUDENT_NOTICE_KEY, "Enrolled in \"Python\" under \"AI-ML\".")
            .await
            .unwrap();

        let mut reloaded = service.load(&session.id).await.unwrap().unwrap();
        let first = service.take(&mut reloaded, STUDENT_NOTICE_KEY).await.unwrap();
        assert_eq!(first.as_deref(), Some("Enrolled in \"Python\" under \"AI-ML\"."));

        let mut reloaded = service.load(&session.id).await.unwrap().unwrap();
        assert!(service.take(&mut reloaded, STUDENT_NOTICE_KEY).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_attach_user_rotates_id_and_consumes_selected_role() {
        let service = setup_test_service(1).await;
        let mut anonymous = service.start().await.unwrap();
        service.set(&mut anonymous, SELECTED_ROLE_KEY, "student").await.unwrap();
        service.set(&mut anonymous, "theme", "dark").await.unwrap();

        let bound = service.attach_user(Some(&anonymous), 1).await.unwrap();
        assert_ne!(bound.id, anonymous.id);
        assert_eq!(bound.user_id, Some(1));
        assert!(bound.get(SELECTED_ROLE_KEY).is_none());
        assert_eq!(bound.get("theme"), Some("dark"));

        assert!(service.load(&anonymous.id).await.unwrap().is_none());
        let stored = service.load(&bound.id).await.unwrap().unwrap();
        assert_eq!(stored.user_id, Some(1));
    }

    #[tokio::test]
    async fn test_destroy() {
        let service = setup_test_service(1).await;
        let session = service.attach_user(None, 1).await.unwrap();
        service.destroy(&session.id).await.unwrap();
        assert!(service.load(&session.id).await.unwrap().is_none());
    }
}
