//! Enrollment repository
//!
//! Database operations for (student, course) memberships.
//!
//! This module provides:
//! - `EnrollmentRepository` trait defining the interface for enrollment data access
//! - `SqlxEnrollmentRepository` implementing the trait for SQLite and MySQL

use crate::config::DatabaseDriver;
use crate::db::DynDatabasePool;
use crate::models::{Enrollment, EnrollmentListing, LedgerFilter};
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use sqlx::{MySqlPool, Row, SqlitePool};
use std::sync::Arc;

/// Enrollment repository trait
#[async_trait]
pub trait EnrollmentRepository: Send + Sync {
    /// Create the enrollment unless it exists. Returns true if a row was inserted.
    async fn create_if_absent(&self, student_id: i64, course_id: i64) -> Result<bool>;

    /// Get the enrollment for a (student, course) pair
    async fn get(&self, student_id: i64, course_id: i64) -> Result<Option<Enrollment>>;

    /// Course ids the student is enrolled in
    async fn list_course_ids(&self, student_id: i64) -> Result<Vec<i64>>;

    /// Count all enrollments
    async fn count(&self) -> Result<i64>;

    /// Enrollments across all students for the admin listing, newest first.
    /// The filter's source and date are ignored.
    async fn list_filtered(&self, filter: &LedgerFilter, limit: i64)
        -> Result<Vec<EnrollmentListing>>;
}

/// SQLx-based enrollment repository implementation
pub struct SqlxEnrollmentRepository {
    pool: DynDatabasePool,
}

impl SqlxEnrollmentRepository {
    /// Create a new SQLx enrollment repository
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    /// Create a boxed repository for use with dependency injection
    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn EnrollmentRepository> {
        Arc::new(Self::new(pool))
    }
}

#[async_trait]
impl EnrollmentRepository for SqlxEnrollmentRepository {
    async fn create_if_absent(&self, student_id: i64, course_id: i64) -> Result<bool> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                create_enrollment_sqlite(self.pool.as_sqlite().unwrap(), student_id, course_id).await
            }
            DatabaseDriver::Mysql => {
                create_enrollment_mysql(self.pool.as_mysql().unwrap(), student_id, course_id).await
            }
        }
    }

    async fn get(&self, student_id: i64, course_id: i64) -> Result<Option<Enrollment>> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                get_enrollment_sqlite(self.pool.as_sqlite().unwrap(), student_id, course_id).await
            }
            DatabaseDriver::Mysql => {
                get_enrollment_mysql(self.pool.as_mysql().unwrap(), student_id, course_id).await
            }
        }
    }

    async fn list_course_ids(&self, student_id: i64) -> Result<Vec<i64>> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                list_course_ids_sqlite(self.pool.as_sqlite().unwrap(), student_id).await
            }
            DatabaseDriver::Mysql => {
                list_course_ids_mysql(self.pool.as_mysql().unwrap(), student_id).await
            }
        }
    }

    async fn count(&self) -> Result<i64> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => count_enrollments_sqlite(self.pool.as_sqlite().unwrap()).await,
            DatabaseDriver::Mysql => count_enrollments_mysql(self.pool.as_mysql().unwrap()).await,
        }
    }

    async fn list_filtered(
        &self,
        filter: &LedgerFilter,
        limit: i64,
    ) -> Result<Vec<EnrollmentListing>> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                list_filtered_sqlite(self.pool.as_sqlite().unwrap(), filter, limit).await
            }
            DatabaseDriver::Mysql => {
                list_filtered_mysql(self.pool.as_mysql().unwrap(), filter, limit).await
            }
        }
    }
}

const FILTERED_SQL: &str = "SELECT e.id, u.username, c.title, cat.name AS category, e.enrolled_at \
     FROM course_enrollments e \
     JOIN users u ON u.id = e.student_id \
     JOIN courses c ON c.id = e.course_id \
     JOIN course_categories cat ON cat.id = c.category_id \
     WHERE (? IS NULL OR cat.id = ?) \
       AND (? IS NULL OR u.username LIKE ? OR c.title LIKE ?) \
     ORDER BY e.enrolled_at DESC, e.id DESC \
     LIMIT ?";

// ============================================================================
// SQLite implementations
// ============================================================================

async fn create_enrollment_sqlite(pool: &SqlitePool, student_id: i64, course_id: i64) -> Result<bool> {
    let result = sqlx::query(
        "INSERT OR IGNORE INTO course_enrollments (student_id, course_id, enrolled_at) VALUES (?, ?, ?)",
    )
    .bind(student_id)
    .bind(course_id)
    .bind(Utc::now())
    .execute(pool)
    .await
    .context("Failed to create enrollment")?;

    Ok(result.rows_affected() > 0)
}

async fn get_enrollment_sqlite(
    pool: &SqlitePool,
    student_id: i64,
    course_id: i64,
) -> Result<Option<Enrollment>> {
    let row = sqlx::query(
        "SELECT id, student_id, course_id, enrolled_at FROM course_enrollments \
         WHERE student_id = ? AND course_id = ?",
    )
    .bind(student_id)
    .bind(course_id)
    .fetch_optional(pool)
    .await
    .context("Failed to get enrollment")?;

    Ok(row.map(|row| Enrollment {
        id: row.get("id"),
        student_id: row.get("student_id"),
        course_id: row.get("course_id"),
        enrolled_at: row.get("enrolled_at"),
    }))
}

async fn list_course_ids_sqlite(pool: &SqlitePool, student_id: i64) -> Result<Vec<i64>> {
    sqlx::query_scalar("SELECT course_id FROM course_enrollments WHERE student_id = ?")
        .bind(student_id)
        .fetch_all(pool)
        .await
        .context("Failed to list enrolled courses")
}

async fn count_enrollments_sqlite(pool: &SqlitePool) -> Result<i64> {
    let row = sqlx::query("SELECT COUNT(*) as count FROM course_enrollments")
        .fetch_one(pool)
        .await
        .context("Failed to count enrollments")?;
    Ok(row.get("count"))
}

async fn list_filtered_sqlite(
    pool: &SqlitePool,
    filter: &LedgerFilter,
    limit: i64,
) -> Result<Vec<EnrollmentListing>> {
    let pattern = filter.search_pattern();
    let rows = sqlx::query(FILTERED_SQL)
        .bind(filter.category_id)
        .bind(filter.category_id)
        .bind(pattern.as_deref())
        .bind(pattern.as_deref())
        .bind(pattern.as_deref())
        .bind(limit)
        .fetch_all(pool)
        .await
        .context("Failed to list enrollments")?;

    Ok(rows
        .iter()
        .map(|row| EnrollmentListing {
            id: row.get("id"),
            student_username: row.get("username"),
            course_title: row.get("title"),
            category_name: row.get("category"),
            enrolled_at: row.get("enrolled_at"),
        })
        .collect())
}

// ============================================================================
// MySQL implementations
// ============================================================================

async fn create_enrollment_mysql(pool: &MySqlPool, student_id: i64, course_id: i64) -> Result<bool> {
    let result = sqlx::query(
        "INSERT IGNORE INTO course_enrollments (student_id, course_id, enrolled_at) VALUES (?, ?, ?)",
    )
    .bind(student_id)
    .bind(course_id)
    .bind(Utc::now())
    .execute(pool)
    .await
    .context("Failed to create enrollment")?;

    Ok(result.rows_affected() > 0)
}

async fn get_enrollment_mysql(
    pool: &MySqlPool,
    student_id: i64,
    course_id: i64,
) -> Result<Option<Enrollment>> {
    let row = sqlx::query(
        "SELECT id, student_id, course_id, enrolled_at FROM course_enrollments \
         WHERE student_id = ? AND course_id = ?",
    )
    .bind(student_id)
    .bind(course_id)
    .fetch_optional(pool)
    .await
    .context("Failed to get enrollment")?;

    Ok(row.map(|row| Enrollment {
        id: row.get("id"),
        student_id: row.get("student_id"),
        course_id: row.get("course_id"),
        enrolled_at: row.get("enrolled_at"),
    }))
}

async fn list_course_ids_mysql(pool: &MySqlPool, student_id: i64) -> Result<Vec<i64>> {
    sqlx::query_scalar("SELECT course_id FROM course_enrollments WHERE student_id = ?")
        .bind(student_id)
        .fetch_all(pool)
        .await
        .context("Failed to list enrolled courses")
}

async fn count_enrollments_mysql(pool: &MySqlPool) -> Result<i64> {
    let row = sqlx::query("SELECT COUNT(*) as count FROM course_enrollments")
        .fetch_one(pool)
        .await
        .context("Failed to count enrollments")?;
    Ok(row.get("count"))
}

async fn list_filtered_mysql(
    pool: &MySqlPool,
    filter: &LedgerFilter,
    limit: i64,
) -> Result<Vec<EnrollmentListing>> {
    let pattern = filter.search_pattern();
    let rows = sqlx::query(FILTERED_SQL)
        .bind(filter.category_id)
        .bind(filter.category_id)
        .bind(pattern.as_deref())
        .bind(pattern.as_deref())
        .bind(pattern.as_deref())
        .bind(limit)
        .fetch_all(pool)
        .await
        .context("Failed to list enrollments")?;

    Ok(rows
        .iter()
        .map(|row| EnrollmentListing {
            id: row.get("id"),
            student_username: row.get("username"),
            course_title: row.get("title"),
            category_name: row.get("category"),
            enrolled_at: row.get("enrolled_at"),
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{create_test_pool, migrations};

    async fn setup_test_repo() -> (DynDatabasePool, SqlxEnrollmentRepository) {
        let pool = create_test_pool().await.expect("Failed to create test pool");
        migrations::run_migrations(&pool)
            .await
            .expect("Failed to run migrations");
        sqlx::query("INSERT INTO users (username, password_hash) VALUES ('student1', 'x')")
            .execute(pool.as_sqlite().unwrap())
            .await
            .unwrap();
        let repo = SqlxEnrollmentRepository::new(pool.clone());
        (pool, repo)
    }

    #[tokio::test]
    async fn test_create_if_absent_once() {
        let (_pool, repo) = setup_test_repo().await;

        assert!(repo.create_if_absent(1, 1).await.unwrap());
        let first = repo.get(1, 1).await.unwrap().expect("enrollment");

        assert!(!repo.create_if_absent(1, 1).await.unwrap());
        let second = repo.get(1, 1).await.unwrap().expect("enrollment");

        assert_eq!(first.id, second.id);
        assert_eq!(first.enrolled_at, second.enrolled_at);
        assert_eq!(repo.count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_list_course_ids() {
        let (_pool, repo) = setup_test_repo().await;
        repo.create_if_absent(1, 2).await.unwrap();
        repo.create_if_absent(1, 5).await.unwrap();

        let mut ids = repo.list_course_ids(1).await.unwrap();
        ids.sort();
        assert_eq!(ids, vec![2, 5]);
        assert!(repo.list_course_ids(42).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_unknown_course_rejected() {
        let (_pool, repo) = setup_test_repo().await;
        assert!(repo.create_if_absent(1, 9_999).await.is_err());
    }

    async fn course_id(pool: &DynDatabasePool, title: &str) -> i64 {
        sqlx::query_scalar("SELECT id FROM courses WHERE title = ?")
            .bind(title)
            .fetch_one(pool.as_sqlite().unwrap())
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_list_filtered_joins_names() {
        let (pool, repo) = setup_test_repo().await;
        let python = course_id(&pool, "Python").await;
        let excel = course_id(&pool, "Advanced Excel").await;
        repo.create_if_absent(1, python).await.unwrap();
        repo.create_if_absent(1, excel).await.unwrap();

        let all = repo.list_filtered(&LedgerFilter::default(), 100).await.unwrap();
        assert_eq!(all.len(), 2);
        assert!(all.iter().all(|e| e.student_username == "student1"));
        assert!(all[0].enrolled_at >= all[1].enrolled_at);

        let office: i64 = sqlx::query_scalar("SELECT id FROM course_categories WHERE name = 'Office'")
            .fetch_one(pool.as_sqlite().unwrap())
            .await
            .unwrap();
        let by_category = LedgerFilter {
            category_id: Some(office),
            ..Default::default()
        };
        let rows = repo.list_filtered(&by_category, 100).await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].course_title, "Advanced Excel");
        assert_eq!(rows[0].category_name, "Office");

        let by_title = LedgerFilter {
            search: Some("pyth".to_string()),
            ..Default::default()
        };
        let rows = repo.list_filtered(&by_title, 100).await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].course_title, "Python");

        let nobody = LedgerFilter {
            search: Some("nobody".to_string()),
            ..Default::default()
        };
        assert!(repo.list_filtered(&nobody, 100).await.unwrap().is_empty());
    }
}
