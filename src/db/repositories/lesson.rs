//! Lesson repository
//!
//! Database operations for lessons.
//!
//! This module provides:
//! - `LessonRepository` trait defining the interface for lesson data access
//! - `SqlxLessonRepository` implementing the trait for SQLite and MySQL

use crate::config::DatabaseDriver;
use crate::db::DynDatabasePool;
use crate::models::{Lesson, LessonFilter, LessonVisibility, LessonWithCourse, NewLesson};
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use sqlx::{MySqlPool, Row, SqlitePool};
use std::sync::Arc;

/// Lesson repository trait
#[async_trait]
pub trait LessonRepository: Send + Sync {
    /// Insert a lesson
    async fn create(&self, lesson: &NewLesson) -> Result<Lesson>;

    /// Most recent lessons with course and category names
    async fn list_recent(&self, limit: i64) -> Result<Vec<LessonWithCourse>>;

    /// Public lessons of active courses, newest first
    async fn list_public(&self) -> Result<Vec<Lesson>>;

    /// Lessons matching the admin listing filter, newest first
    async fn list_filtered(&self, filter: &LessonFilter, limit: i64)
        -> Result<Vec<LessonWithCourse>>;

    /// Count lessons
    async fn count(&self) -> Result<i64>;
}

/// SQLx-based lesson repository implementation
pub struct SqlxLessonRepository {
    pool: DynDatabasePool,
}

impl SqlxLessonRepository {
    /// Create a new SQLx lesson repository
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    /// Create a boxed repository for use with dependency injection
    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn LessonRepository> {
        Arc::new(Self::new(pool))
    }
}

#[async_trait]
impl LessonRepository for SqlxLessonRepository {
    async fn create(&self, lesson: &NewLesson) -> Result<Lesson> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => create_lesson_sqlite(self.pool.as_sqlite().unwrap(), lesson).await,
            DatabaseDriver::Mysql => create_lesson_mysql(self.pool.as_mysql().unwrap(), lesson).await,
        }
    }

    async fn list_recent(&self, limit: i64) -> Result<Vec<LessonWithCourse>> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                list_recent_lessons_sqlite(self.pool.as_sqlite().unwrap(), limit).await
            }
            DatabaseDriver::Mysql => {
                list_recent_lessons_mysql(self.pool.as_mysql().unwrap(), limit).await
            }
        }
    }

    async fn list_public(&self) -> Result<Vec<Lesson>> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => list_public_lessons_sqlite(self.pool.as_sqlite().unwrap()).await,
            DatabaseDriver::Mysql => list_public_lessons_mysql(self.pool.as_mysql().unwrap()).await,
        }
    }

    async fn list_filtered(
        &self,
        filter: &LessonFilter,
        limit: i64,
    ) -> Result<Vec<LessonWithCourse>> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                list_filtered_lessons_sqlite(self.pool.as_sqlite().unwrap(), filter, limit).await
            }
            DatabaseDriver::Mysql => {
                list_filtered_lessons_mysql(self.pool.as_mysql().unwrap(), filter, limit).await
            }
        }
    }

    async fn count(&self) -> Result<i64> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => count_lessons_sqlite(self.pool.as_sqlite().unwrap()).await,
            DatabaseDriver::Mysql => count_lessons_mysql(self.pool.as_mysql().unwrap()).await,
        }
    }
}

const LESSON_COLUMNS: &str = "l.id, l.course_id, l.title, l.description, l.file_path, \
     l.visibility, l.created_by, l.created_at";

fn recent_sql() -> String {
    format!(
        "SELECT {}, c.title AS course_title, cat.name AS category_name \
         FROM lessons l \
         JOIN courses c ON c.id = l.course_id \
         JOIN course_categories cat ON cat.id = c.category_id \
         ORDER BY l.created_at DESC, l.id DESC LIMIT ?",
        LESSON_COLUMNS
    )
}

fn filtered_sql() -> String {
    format!(
        "SELECT {}, c.title AS course_title, cat.name AS category_name \
         FROM lessons l \
         JOIN courses c ON c.id = l.course_id \
         JOIN course_categories cat ON cat.id = c.category_id \
         WHERE (? IS NULL OR cat.id = ?) \
           AND (? IS NULL OR l.visibility = ?) \
           AND (? IS NULL OR l.title LIKE ? OR l.description LIKE ? OR c.title LIKE ?) \
         ORDER BY l.created_at DESC, l.id DESC LIMIT ?",
        LESSON_COLUMNS
    )
}

fn public_sql() -> String {
    format!(
        "SELECT {} FROM lessons l JOIN courses c ON c.id = l.course_id \
         WHERE l.visibility = 'public' AND c.is_active = 1 \
         ORDER BY l.created_at DESC, l.id DESC",
        LESSON_COLUMNS
    )
}

fn created_lesson(id: i64, lesson: &NewLesson, now: chrono::DateTime<Utc>) -> Lesson {
    Lesson {
        id,
        course_id: lesson.course_id,
        title: lesson.title.clone(),
        description: lesson.description.clone(),
        file_path: lesson.file_path.clone(),
        visibility: lesson.visibility,
        created_by: lesson.created_by,
        created_at: now,
    }
}

// ============================================================================
// SQLite implementations
// ============================================================================

async fn create_lesson_sqlite(pool: &SqlitePool, lesson: &NewLesson) -> Result<Lesson> {
    let now = Utc::now();

    let result = sqlx::query(
        r#"
        INSERT INTO lessons (course_id, title, description, file_path, visibility, created_by, created_at)
        VALUES (?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(lesson.course_id)
    .bind(&lesson.title)
    .bind(&lesson.description)
    .bind(&lesson.file_path)
    .bind(lesson.visibility.as_str())
    .bind(lesson.created_by)
    .bind(now)
    .execute(pool)
    .await
    .context("Failed to create lesson")?;

    Ok(created_lesson(result.last_insert_rowid(), lesson, now))
}

async fn list_recent_lessons_sqlite(pool: &SqlitePool, limit: i64) -> Result<Vec<LessonWithCourse>> {
    let rows = sqlx::query(&recent_sql())
        .bind(limit)
        .fetch_all(pool)
        .await
        .context("Failed to list recent lessons")?;

    Ok(rows
        .iter()
        .map(|row| LessonWithCourse {
            lesson: row_to_lesson_sqlite(row),
            course_title: row.get("course_title"),
            category_name: row.get("category_name"),
        })
        .collect())
}

async fn list_filtered_lessons_sqlite(
    pool: &SqlitePool,
    filter: &LessonFilter,
    limit: i64,
) -> Result<Vec<LessonWithCourse>> {
    let visibility = filter.visibility.map(|v| v.as_str());
    let pattern = filter.search_pattern();
    let rows = sqlx::query(&filtered_sql())
        .bind(filter.category_id)
        .bind(filter.category_id)
        .bind(visibility)
        .bind(visibility)
        .bind(pattern.as_deref())
        .bind(pattern.as_deref())
        .bind(pattern.as_deref())
        .bind(pattern.as_deref())
        .bind(limit)
        .fetch_all(pool)
        .await
        .context("Failed to list lessons")?;

    Ok(rows
        .iter()
        .map(|row| LessonWithCourse {
            lesson: row_to_lesson_sqlite(row),
            course_title: row.get("course_title"),
            category_name: row.get("category_name"),
        })
        .collect())
}

async fn list_public_lessons_sqlite(pool: &SqlitePool) -> Result<Vec<Lesson>> {
    let rows = sqlx::query(&public_sql())
        .fetch_all(pool)
        .await
        .context("Failed to list public lessons")?;

    Ok(rows.iter().map(row_to_lesson_sqlite).collect())
}

async fn count_lessons_sqlite(pool: &SqlitePool) -> Result<i64> {
    let row = sqlx::query("SELECT COUNT(*) as count FROM lessons")
        .fetch_one(pool)
        .await
        .context("Failed to count lessons")?;
    Ok(row.get("count"))
}

fn row_to_lesson_sqlite(row: &sqlx::sqlite::SqliteRow) -> Lesson {
    let visibility: String = row.get("visibility");
    Lesson {
        id: row.get("id"),
        course_id: row.get("course_id"),
        title: row.get("title"),
        description: row.get("description"),
        file_path: row.get("file_path"),
        visibility: LessonVisibility::parse_or_default(&visibility),
        created_by: row.get("created_by"),
        created_at: row.get("created_at"),
    }
}

// ============================================================================
// MySQL implementations
// ============================================================================

async fn create_lesson_mysql(pool: &MySqlPool, lesson: &NewLesson) -> Result<Lesson> {
    let now = Utc::now();

    let result = sqlx::query(
        r#"
        INSERT INTO lessons (course_id, title, description, file_path, visibility, created_by, created_at)
        VALUES (?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(lesson.course_id)
    .bind(&lesson.title)
    .bind(&lesson.description)
    .bind(&lesson.file_path)
    .bind(lesson.visibility.as_str())
    .bind(lesson.created_by)
    .bind(now)
    .execute(pool)
    .await
    .context("Failed to create lesson")?;

    Ok(created_lesson(result.last_insert_id() as i64, lesson, now))
}

async fn list_recent_lessons_mysql(pool: &MySqlPool, limit: i64) -> Result<Vec<LessonWithCourse>> {
    let rows = sqlx::query(&recent_sql())
        .bind(limit)
        .fetch_all(pool)
        .await
        .context("Failed to list recent lessons")?;

    Ok(rows
        .iter()
        .map(|row| LessonWithCourse {
            lesson: row_to_lesson_mysql(row),
            course_title: row.get("course_title"),
            category_name: row.get("category_name"),
        })
        .collect())
}

async fn list_filtered_lessons_mysql(
    pool: &MySqlPool,
    filter: &LessonFilter,
    limit: i64,
) -> Result<Vec<LessonWithCourse>> {
    let visibility = filter.visibility.map(|v| v.as_str());
    let pattern = filter.search_pattern();
    let rows = sqlx::query(&filtered_sql())
        .bind(filter.category_id)
        .bind(filter.category_id)
        .bind(visibility)
        .bind(visibility)
        .bind(pattern.as_deref())
        .bind(pattern.as_deref())
        .bind(pattern.as_deref())
        .bind(pattern.as_deref())
        .bind(limit)
        .fetch_all(pool)
        .await
        .context("Failed to list lessons")?;

    Ok(rows
        .iter()
        .map(|row| LessonWithCourse {
            lesson: row_to_lesson_mysql(row),
            course_title: row.get("course_title"),
            category_name: row.get("category_name"),
        })
        .collect())
}

async fn list_public_lessons_mysql(pool: &MySqlPool) -> Result<Vec<Lesson>> {
    let rows = sqlx::query(&public_sql())
        .fetch_all(pool)
        .await
        .context("Failed to list public lessons")?;

    Ok(rows.iter().map(row_to_lesson_mysql).collect())
}

async fn count_lessons_mysql(pool: &MySqlPool) -> Result<i64> {
    let row = sqlx::query("SELECT COUNT(*) as count FROM lessons")
        .fetch_one(pool)
        .await
        .context("Failed to count lessons")?;
    Ok(row.get("count"))
}

fn row_to_lesson_mysql(row: &sqlx::mysql::MySqlRow) -> Lesson {
    let visibility: String = row.get("visibility");
    Lesson {
        id: row.get("id"),
        course_id: row.get("course_id"),
        title: row.get("title"),
        description: row.get("description"),
        file_path: row.get("file_path"),
        visibility: LessonVisibility::parse_or_default(&visibility),
        created_by: row.get("created_by"),
        created_at: row.get("created_at"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{create_test_pool, migrations};

    async fn setup_test_repo() -> (DynDatabasePool, SqlxLessonRepository) {
        let pool = create_test_pool().await.expect("Failed to create test pool");
        migrations::run_migrations(&pool)
            .await
            .expect("Failed to run migrations");
        let repo = SqlxLessonRepository::new(pool.clone());
        (pool, repo)
    }

    async fn course_id(pool: &DynDatabasePool, title: &str) -> i64 {
        let row: (i64,) = sqlx::query_as("SELECT id FROM courses WHERE title = ?")
            .bind(title)
            .fetch_one(pool.as_sqlite().unwrap())
            .await
            .unwrap();
        row.0
    }

    fn new_lesson(course_id: i64, title: &str, visibility: LessonVisibility) -> NewLesson {
        NewLesson {
            course_id,
            title: title.to_string(),
            description: String::new(),
            file_path: None,
            visibility,
            created_by: None,
        }
    }

    #[tokio::test]
    async fn test_create_lesson() {
        let (pool, repo) = setup_test_repo().await;
        let css = course_id(&pool, "CSS").await;

        let mut input = new_lesson(css, "Selectors", LessonVisibility::Draft);
        input.file_path = Some("lessons/files/abc-selectors.pdf".to_string());
        let created = repo.create(&input).await.unwrap();

        assert!(created.id > 0);
        assert_eq!(created.visibility, LessonVisibility::Draft);
        assert_eq!(repo.count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_list_recent_newest_first_with_names() {
        let (pool, repo) = setup_test_repo().await;
        let css = course_id(&pool, "CSS").await;

        for i in 0..12 {
            repo.create(&new_lesson(css, &format!("Lesson {}", i), LessonVisibility::Public))
                .await
                .unwrap();
        }

        let recent = repo.list_recent(10).await.unwrap();
        assert_eq!(recent.len(), 10);
        assert_eq!(recent[0].lesson.title, "Lesson 11");
        assert_eq!(recent[0].course_title, "CSS");
        assert_eq!(recent[0].category_name, "Software Development");
    }

    #[tokio::test]
    async fn test_list_public_skips_private_and_draft() {
        let (pool, repo) = setup_test_repo().await;
        let css = course_id(&pool, "CSS").await;

        repo.create(&new_lesson(css, "Open", LessonVisibility::Public)).await.unwrap();
        repo.create(&new_lesson(css, "Hidden", LessonVisibility::Private)).await.unwrap();
        repo.create(&new_lesson(css, "Wip", LessonVisibility::Draft)).await.unwrap();

        let public = repo.list_public().await.unwrap();
        assert_eq!(public.len(), 1);
        assert_eq!(public[0].title, "Open");
    }

    #[tokio::test]
    async fn test_list_filtered_by_visibility_category_and_search() {
        let (pool, repo) = setup_test_repo().await;
        let css = course_id(&pool, "CSS").await;
        let excel = course_id(&pool, "Advanced Excel").await;

        let mut pivots = new_lesson(excel, "Pivot tables", LessonVisibility::Public);
        pivots.description = "Summaries over ranges".to_string();
        repo.create(&pivots).await.unwrap();
        repo.create(&new_lesson(css, "Selectors", LessonVisibility::Draft)).await.unwrap();
        repo.create(&new_lesson(css, "Flexbox", LessonVisibility::Public)).await.unwrap();

        let all = repo.list_filtered(&LessonFilter::default(), 100).await.unwrap();
        assert_eq!(all.len(), 3);
        assert_eq!(all[0].lesson.title, "Flexbox");

        let drafts = LessonFilter {
            visibility: Some(LessonVisibility::Draft),
            ..Default::default()
        };
        let rows = repo.list_filtered(&drafts, 100).await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].lesson.title, "Selectors");

        let office: i64 = sqlx::query_scalar("SELECT id FROM course_categories WHERE name = 'Office'")
            .fetch_one(pool.as_sqlite().unwrap())
            .await
            .unwrap();
        let by_category = LessonFilter {
            category_id: Some(office),
            ..Default::default()
        };
        let rows = repo.list_filtered(&by_category, 100).await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].category_name, "Office");

        // Search covers description and course title as well as lesson title
        let by_description = LessonFilter {
            search: Some("summaries".to_string()),
            ..Default::default()
        };
        assert_eq!(repo.list_filtered(&by_description, 100).await.unwrap().len(), 1);

        let by_course = LessonFilter {
            search: Some("CSS".to_string()),
            visibility: Some(LessonVisibility::Public),
            ..Default::default()
        };
        let rows = repo.list_filtered(&by_course, 100).await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].lesson.title, "Flexbox");
    }
}
