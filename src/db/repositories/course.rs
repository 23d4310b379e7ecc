//! Course repository
//!
//! Database operations for courses and the catalog listings built on them.
//!
//! This module provides:
//! - `CourseRepository` trait defining the interface for course data access
//! - `SqlxCourseRepository` implementing the trait for SQLite and MySQL

use crate::config::DatabaseDriver;
use crate::db::DynDatabasePool;
use crate::models::{Course, CourseLevel, CourseStats, CourseWithCategory, NewCourse};
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use sqlx::{MySqlPool, Row, SqlitePool};
use std::sync::Arc;

/// Course repository trait
#[async_trait]
pub trait CourseRepository: Send + Sync {
    /// Insert a course unless the (category, title) pair is taken.
    /// Returns `None` when the course already existed.
    async fn create_if_absent(&self, course: &NewCourse) -> Result<Option<Course>>;

    /// Get course by ID
    async fn get_by_id(&self, id: i64) -> Result<Option<Course>>;

    /// Get an active course with its category name
    async fn get_active_with_category(&self, id: i64) -> Result<Option<CourseWithCategory>>;

    /// Active courses ordered by (category name, title)
    async fn list_active_with_category(&self) -> Result<Vec<CourseWithCategory>>;

    /// All courses, active or not, ordered by (category name, title)
    async fn list_with_category(&self) -> Result<Vec<CourseWithCategory>>;

    /// Active courses with enrollment/attendance/lesson counters, ordered by title
    async fn list_active_stats(&self) -> Result<Vec<CourseStats>>;

    /// Count courses
    async fn count(&self) -> Result<i64>;

    /// Delete a course (cascades to lessons, enrollments, attendance).
    /// Returns false if no such course existed.
    async fn delete(&self, id: i64) -> Result<bool>;
}

/// SQLx-based course repository implementation
pub struct SqlxCourseRepository {
    pool: DynDatabasePool,
}

impl SqlxCourseRepository {
    /// Create a new SQLx course repository
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    /// Create a boxed repository for use with dependency injection
    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn CourseRepository> {
        Arc::new(Self::new(pool))
    }
}

#[async_trait]
impl CourseRepository for SqlxCourseRepository {
    async fn create_if_absent(&self, course: &NewCourse) -> Result<Option<Course>> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                create_course_sqlite(self.pool.as_sqlite().unwrap(), course).await
            }
            DatabaseDriver::Mysql => create_course_mysql(self.pool.as_mysql().unwrap(), course).await,
        }
    }

    async fn get_by_id(&self, id: i64) -> Result<Option<Course>> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                get_course_by_id_sqlite(self.pool.as_sqlite().unwrap(), id).await
            }
            DatabaseDriver::Mysql => get_course_by_id_mysql(self.pool.as_mysql().unwrap(), id).await,
        }
    }

    async fn get_active_with_category(&self, id: i64) -> Result<Option<CourseWithCategory>> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                get_active_with_category_sqlite(self.pool.as_sqlite().unwrap(), id).await
            }
            DatabaseDriver::Mysql => {
                get_active_with_category_mysql(self.pool.as_mysql().unwrap(), id).await
            }
        }
    }

    async fn list_active_with_category(&self) -> Result<Vec<CourseWithCategory>> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                list_with_category_sqlite(self.pool.as_sqlite().unwrap(), true).await
            }
            DatabaseDriver::Mysql => {
                list_with_category_mysql(self.pool.as_mysql().unwrap(), true).await
            }
        }
    }

    async fn list_with_category(&self) -> Result<Vec<CourseWithCategory>> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                list_with_category_sqlite(self.pool.as_sqlite().unwrap(), false).await
            }
            DatabaseDriver::Mysql => {
                list_with_category_mysql(self.pool.as_mysql().unwrap(), false).await
            }
        }
    }

    async fn list_active_stats(&self) -> Result<Vec<CourseStats>> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                list_active_stats_sqlite(self.pool.as_sqlite().unwrap()).await
            }
            DatabaseDriver::Mysql => list_active_stats_mysql(self.pool.as_mysql().unwrap()).await,
        }
    }

    async fn count(&self) -> Result<i64> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => count_courses_sqlite(self.pool.as_sqlite().unwrap()).await,
            DatabaseDriver::Mysql => count_courses_mysql(self.pool.as_mysql().unwrap()).await,
        }
    }

    async fn delete(&self, id: i64) -> Result<bool> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => delete_course_sqlite(self.pool.as_sqlite().unwrap(), id).await,
            DatabaseDriver::Mysql => delete_course_mysql(self.pool.as_mysql().unwrap(), id).await,
        }
    }
}

const COURSE_COLUMNS: &str = "c.id, c.category_id, c.title, c.description, c.level, \
     c.duration_hours, c.is_active, c.created_by, c.created_at";

fn with_category_sql(active_only: bool) -> String {
    format!(
        "SELECT {}, cat.name AS category_name \
         FROM courses c JOIN course_categories cat ON cat.id = c.category_id \
         {} ORDER BY cat.name, c.title, c.id",
        COURSE_COLUMNS,
        if active_only { "WHERE c.is_active = 1" } else { "" }
    )
}

fn active_stats_sql() -> String {
    format!(
        "SELECT {}, \
           (SELECT COUNT(*) FROM course_enrollments e WHERE e.course_id = c.id) AS enrollment_count, \
           (SELECT COUNT(*) FROM attendance_records a WHERE a.course_id = c.id) AS attendance_count, \
           (SELECT COUNT(*) FROM lessons l WHERE l.course_id = c.id) AS lesson_count \
         FROM courses c WHERE c.is_active = 1 ORDER BY c.title, c.id",
        COURSE_COLUMNS
    )
}

fn created_course(id: i64, course: &NewCourse, now: chrono::DateTime<Utc>) -> Course {
    Course {
        id,
        category_id: course.category_id,
        title: course.title.clone(),
        description: course.description.clone(),
        level: course.level,
        duration_hours: course.duration_hours,
        is_active: true,
        created_by: course.created_by,
        created_at: now,
    }
}

// ============================================================================
// SQLite implementations
// ============================================================================

async fn create_course_sqlite(pool: &SqlitePool, course: &NewCourse) -> Result<Option<Course>> {
    let now = Utc::now();

    let result = sqlx::query(
        r#"
        INSERT OR IGNORE INTO courses
            (category_id, title, description, level, duration_hours, is_active, created_by, created_at)
        VALUES (?, ?, ?, ?, ?, 1, ?, ?)
        "#,
    )
    .bind(course.category_id)
    .bind(&course.title)
    .bind(&course.description)
    .bind(course.level.as_str())
    .bind(course.duration_hours as i64)
    .bind(course.created_by)
    .bind(now)
    .execute(pool)
    .await
    .context("Failed to create course")?;

    if result.rows_affected() == 0 {
        return Ok(None);
    }
    Ok(Some(created_course(result.last_insert_rowid(), course, now)))
}

async fn get_course_by_id_sqlite(pool: &SqlitePool, id: i64) -> Result<Option<Course>> {
    let row = sqlx::query(&format!("SELECT {} FROM courses c WHERE c.id = ?", COURSE_COLUMNS))
        .bind(id)
        .fetch_optional(pool)
        .await
        .context("Failed to get course by ID")?;

    Ok(row.map(|row| row_to_course_sqlite(&row)))
}

async fn get_active_with_category_sqlite(
    pool: &SqlitePool,
    id: i64,
) -> Result<Option<CourseWithCategory>> {
    let row = sqlx::query(&format!(
        "SELECT {}, cat.name AS category_name \
         FROM courses c JOIN course_categories cat ON cat.id = c.category_id \
         WHERE c.id = ? AND c.is_active = 1",
        COURSE_COLUMNS
    ))
    .bind(id)
    .fetch_optional(pool)
    .await
    .context("Failed to get active course")?;

    Ok(row.map(|row| CourseWithCategory {
        course: row_to_course_sqlite(&row),
        category_name: row.get("category_name"),
    }))
}

async fn list_with_category_sqlite(
    pool: &SqlitePool,
    active_only: bool,
) -> Result<Vec<CourseWithCategory>> {
    let rows = sqlx::query(&with_category_sql(active_only))
        .fetch_all(pool)
        .await
        .context("Failed to list courses")?;

    Ok(rows
        .iter()
        .map(|row| CourseWithCategory {
            course: row_to_course_sqlite(row),
            category_name: row.get("category_name"),
        })
        .collect())
}

async fn list_active_stats_sqlite(pool: &SqlitePool) -> Result<Vec<CourseStats>> {
    let rows = sqlx::query(&active_stats_sql())
        .fetch_all(pool)
        .await
        .context("Failed to list course statistics")?;

    Ok(rows
        .iter()
        .map(|row| CourseStats {
            course: row_to_course_sqlite(row),
            enrollment_count: row.get("enrollment_count"),
            attendance_count: row.get("attendance_count"),
            lesson_count: row.get("lesson_count"),
        })
        .collect())
}

async fn count_courses_sqlite(pool: &SqlitePool) -> Result<i64> {
    let row = sqlx::query("SELECT COUNT(*) as count FROM courses")
        .fetch_one(pool)
        .await
        .context("Failed to count courses")?;
    Ok(row.get("count"))
}

async fn delete_course_sqlite(pool: &SqlitePool, id: i64) -> Result<bool> {
    let result = sqlx::query("DELETE FROM courses WHERE id = ?")
        .bind(id)
        .execute(pool)
        .await
        .context("Failed to delete course")?;
    Ok(result.rows_affected() > 0)
}

fn row_to_course_sqlite(row: &sqlx::sqlite::SqliteRow) -> Course {
    let level: String = row.get("level");
    let duration: i64 = row.get("duration_hours");
    Course {
        id: row.get("id"),
        category_id: row.get("category_id"),
        title: row.get("title"),
        description: row.get("description"),
        level: CourseLevel::parse_or_default(&level),
        duration_hours: u32::try_from(duration).unwrap_or(0),
        is_active: row.get("is_active"),
        created_by: row.get("created_by"),
        created_at: row.get("created_at"),
    }
}

// ============================================================================
// MySQL implementations
// ============================================================================

async fn create_course_mysql(pool: &MySqlPool, course: &NewCourse) -> Result<Option<Course>> {
    let now = Utc::now();

    let result = sqlx::query(
        r#"
        INSERT IGNORE INTO courses
            (category_id, title, description, level, duration_hours, is_active, created_by, created_at)
        VALUES (?, ?, ?, ?, ?, TRUE, ?, ?)
        "#,
    )
    .bind(course.category_id)
    .bind(&course.title)
    .bind(&course.description)
    .bind(course.level.as_str())
    .bind(course.duration_hours)
    .bind(course.created_by)
    .bind(now)
    .execute(pool)
    .await
    .context("Failed to create course")?;

    if result.rows_affected() == 0 {
        return Ok(None);
    }
    Ok(Some(created_course(result.last_insert_id() as i64, course, now)))
}

async fn get_course_by_id_mysql(pool: &MySqlPool, id: i64) -> Result<Option<Course>> {
    let row = sqlx::query(&format!("SELECT {} FROM courses c WHERE c.id = ?", COURSE_COLUMNS))
        .bind(id)
        .fetch_optional(pool)
        .await
        .context("Failed to get course by ID")?;

    Ok(row.map(|row| row_to_course_mysql(&row)))
}

async fn get_active_with_category_mysql(
    pool: &MySqlPool,
    id: i64,
) -> Result<Option<CourseWithCategory>> {
    let row = sqlx::query(&format!(
        "SELECT {}, cat.name AS category_name \
         FROM courses c JOIN course_categories cat ON cat.id = c.category_id \
         WHERE c.id = ? AND c.is_active = 1",
        COURSE_COLUMNS
    ))
    .bind(id)
    .fetch_optional(pool)
    .await
    .context("Failed to get active course")?;

    Ok(row.map(|row| CourseWithCategory {
        course: row_to_course_mysql(&row),
        category_name: row.get("category_name"),
    }))
}

async fn list_with_category_mysql(
    pool: &MySqlPool,
    active_only: bool,
) -> Result<Vec<CourseWithCategory>> {
    let rows = sqlx::query(&with_category_sql(active_only))
        .fetch_all(pool)
        .await
        .context("Failed to list courses")?;

    Ok(rows
        .iter()
        .map(|row| CourseWithCategory {
            course: row_to_course_mysql(row),
            category_name: row.get("category_name"),
        })
        .collect())
}

async fn list_active_stats_mysql(pool: &MySqlPool) -> Result<Vec<CourseStats>> {
    let rows = sqlx::query(&active_stats_sql())
        .fetch_all(pool)
        .await
        .context("Failed to list course statistics")?;

    Ok(rows
        .iter()
        .map(|row| CourseStats {
            course: row_to_course_mysql(row),
            enrollment_count: row.get("enrollment_count"),
            attendance_count: row.get("attendance_count"),
            lesson_count: row.get("lesson_count"),
        })
        .collect())
}

async fn count_courses_mysql(pool: &MySqlPool) -> Result<i64> {
    let row = sqlx::query("SELECT COUNT(*) as count FROM courses")
        .fetch_one(pool)
        .await
        .context("Failed to count courses")?;
    Ok(row.get("count"))
}

async fn delete_course_mysql(pool: &MySqlPool, id: i64) -> Result<bool> {
    let result = sqlx::query("DELETE FROM courses WHERE id = ?")
        .bind(id)
        .execute(pool)
        .await
        .context("Failed to delete course")?;
    Ok(result.rows_affected() > 0)
}

fn row_to_course_mysql(row: &sqlx::mysql::MySqlRow) -> Course {
    let level: String = row.get("level");
    Course {
        id: row.get("id"),
        category_id: row.get("category_id"),
        title: row.get("title"),
        description: row.get("description"),
        level: CourseLevel::parse_or_default(&level),
        duration_hours: row.get("duration_hours"),
        is_active: row.get("is_active"),
        created_by: row.get("created_by"),
        created_at: row.get("created_at"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repositories::{CategoryRepository, SqlxCategoryRepository};
    use crate::db::{create_test_pool, migrations};

    async fn setup_test_repo() -> (DynDatabasePool, SqlxCourseRepository) {
        let pool = create_test_pool().await.expect("Failed to create test pool");
        migrations::run_migrations(&pool)
            .await
            .expect("Failed to run migrations");
        let repo = SqlxCourseRepository::new(pool.clone());
        (pool, repo)
    }

    async fn category_id(pool: &DynDatabasePool, name: &str) -> i64 {
        SqlxCategoryRepository::new(pool.clone())
            .create_or_get(name)
            .await
            .unwrap()
            .id
    }

    fn new_course(category_id: i64, title: &str) -> NewCourse {
        NewCourse {
            category_id,
            title: title.to_string(),
            description: "desc".to_string(),
            level: CourseLevel::Intermediate,
            duration_hours: 12,
            created_by: None,
        }
    }

    #[tokio::test]
    async fn test_create_if_absent() {
        let (pool, repo) = setup_test_repo().await;
        let backend = category_id(&pool, "Backend").await;

        let created = repo
            .create_if_absent(&new_course(backend, "Rust"))
            .await
            .unwrap()
            .expect("created");
        assert!(created.is_active);
        assert_eq!(created.level, CourseLevel::Intermediate);

        let duplicate = repo.create_if_absent(&new_course(backend, "Rust")).await.unwrap();
        assert!(duplicate.is_none());

        let stored = repo.get_by_id(created.id).await.unwrap().unwrap();
        assert_eq!(stored.title, "Rust");
        assert_eq!(stored.duration_hours, 12);
        assert_eq!(stored.description, "desc");
    }

    #[tokio::test]
    async fn test_same_title_in_other_category_allowed() {
        let (pool, repo) = setup_test_repo().await;
        let office = category_id(&pool, "Office").await;
        let created = repo.create_if_absent(&new_course(office, "Python")).await.unwrap();
        assert!(created.is_some());
    }

    #[tokio::test]
    async fn test_list_active_with_category_order() {
        let (pool, repo) = setup_test_repo().await;
        let listed = repo.list_active_with_category().await.unwrap();
        assert_eq!(listed.len(), 16);
        assert_eq!(listed[0].category_name, "Accounting");
        assert_eq!(listed[0].course.title, "Tally Comprehensive");

        // Inactive courses are left out
        sqlx::query("UPDATE courses SET is_active = 0 WHERE title = 'Tally Comprehensive'")
            .execute(pool.as_sqlite().unwrap())
            .await
            .unwrap();
        let listed = repo.list_active_with_category().await.unwrap();
        assert_eq!(listed.len(), 15);
        assert_eq!(repo.list_with_category().await.unwrap().len(), 16);
    }

    #[tokio::test]
    async fn test_get_active_with_category() {
        let (pool, repo) = setup_test_repo().await;
        let python = repo
            .list_active_with_category()
            .await
            .unwrap()
            .into_iter()
            .find(|c| c.course.title == "Python")
            .unwrap();

        let found = repo.get_active_with_category(python.course.id).await.unwrap().unwrap();
        assert_eq!(found.category_name, "Software Development");

        sqlx::query("UPDATE courses SET is_active = 0 WHERE id = ?")
            .bind(python.course.id)
            .execute(pool.as_sqlite().unwrap())
            .await
            .unwrap();
        assert!(repo.get_active_with_category(python.course.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_list_active_stats_counts() {
        let (pool, repo) = setup_test_repo().await;
        let sqlite = pool.as_sqlite().unwrap();
        sqlx::query("INSERT INTO users (username, password_hash) VALUES ('s1', 'x')")
            .execute(sqlite)
            .await
            .unwrap();
        let html = repo
            .list_active_with_category()
            .await
            .unwrap()
            .into_iter()
            .find(|c| c.course.title == "HTML")
            .unwrap()
            .course
            .id;
        sqlx::query("INSERT INTO course_enrollments (student_id, course_id) VALUES (1, ?)")
            .bind(html)
            .execute(sqlite)
            .await
            .unwrap();
        sqlx::query("INSERT INTO lessons (course_id, title) VALUES (?, 'Tags'), (?, 'Forms')")
            .bind(html)
            .bind(html)
            .execute(sqlite)
            .await
            .unwrap();

        let stats = repo.list_active_stats().await.unwrap();
        let titles: Vec<&str> = stats.iter().map(|s| s.course.title.as_str()).collect();
        let mut sorted = titles.clone();
        sorted.sort();
        assert_eq!(titles, sorted);

        let html_stats = stats.iter().find(|s| s.course.id == html).unwrap();
        assert_eq!(html_stats.enrollment_count, 1);
        assert_eq!(html_stats.attendance_count, 0);
        assert_eq!(html_stats.lesson_count, 2);
    }

    #[tokio::test]
    async fn test_delete_course() {
        let (_pool, repo) = setup_test_repo().await;
        assert_eq!(repo.count().await.unwrap(), 16);
        let first = repo.list_with_category().await.unwrap()[0].course.id;
        assert!(repo.delete(first).await.unwrap());
        assert!(!repo.delete(first).await.unwrap());
        assert_eq!(repo.count().await.unwrap(), 15);
    }
}
