//! Course category repository
//!
//! Database operations for course categories.
//!
//! This module provides:
//! - `CategoryRepository` trait defining the interface for category data access
//! - `SqlxCategoryRepository` implementing the trait for SQLite and MySQL
//!
//! Name comparisons are case-insensitive: the SQLite column is declared
//! `COLLATE NOCASE` and MySQL uses its default case-insensitive collation.

use crate::config::DatabaseDriver;
use crate::db::DynDatabasePool;
use crate::models::CourseCategory;
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use sqlx::{MySqlPool, Row, SqlitePool};
use std::sync::Arc;

/// Category repository trait
#[async_trait]
pub trait CategoryRepository: Send + Sync {
    /// Insert a category unless one with the same name (any case) exists,
    /// then return whichever row holds that name.
    async fn create_or_get(&self, name: &str) -> Result<CourseCategory>;

    /// Get category by ID
    async fn get_by_id(&self, id: i64) -> Result<Option<CourseCategory>>;

    /// List all categories ordered by name
    async fn list(&self) -> Result<Vec<CourseCategory>>;

    /// Count categories
    async fn count(&self) -> Result<i64>;

    /// Delete a category and, by cascade, everything under it.
    /// Returns false if no such category existed.
    async fn delete(&self, id: i64) -> Result<bool>;
}

/// SQLx-based category repository implementation
pub struct SqlxCategoryRepository {
    pool: DynDatabasePool,
}

impl SqlxCategoryRepository {
    /// Create a new SQLx category repository
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    /// Create a boxed repository for use with dependency injection
    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn CategoryRepository> {
        Arc::new(Self::new(pool))
    }
}

#[async_trait]
impl CategoryRepository for SqlxCategoryRepository {
    async fn create_or_get(&self, name: &str) -> Result<CourseCategory> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                create_or_get_category_sqlite(self.pool.as_sqlite().unwrap(), name).await
            }
            DatabaseDriver::Mysql => {
                create_or_get_category_mysql(self.pool.as_mysql().unwrap(), name).await
            }
        }
    }

    async fn get_by_id(&self, id: i64) -> Result<Option<CourseCategory>> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                get_category_by_id_sqlite(self.pool.as_sqlite().unwrap(), id).await
            }
            DatabaseDriver::Mysql => {
                get_category_by_id_mysql(self.pool.as_mysql().unwrap(), id).await
            }
        }
    }

    async fn list(&self) -> Result<Vec<CourseCategory>> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => list_categories_sqlite(self.pool.as_sqlite().unwrap()).await,
            DatabaseDriver::Mysql => list_categories_mysql(self.pool.as_mysql().unwrap()).await,
        }
    }

    async fn count(&self) -> Result<i64> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => count_categories_sqlite(self.pool.as_sqlite().unwrap()).await,
            DatabaseDriver::Mysql => count_categories_mysql(self.pool.as_mysql().unwrap()).await,
        }
    }

    async fn delete(&self, id: i64) -> Result<bool> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                delete_category_sqlite(self.pool.as_sqlite().unwrap(), id).await
            }
            DatabaseDriver::Mysql => delete_category_mysql(self.pool.as_mysql().unwrap(), id).await,
        }
    }
}

// ============================================================================
// SQLite implementations
// ============================================================================

async fn create_or_get_category_sqlite(pool: &SqlitePool, name: &str) -> Result<CourseCategory> {
    let result = sqlx::query("INSERT OR IGNORE INTO course_categories (name, created_at) VALUES (?, ?)")
        .bind(name)
        .bind(Utc::now())
        .execute(pool)
        .await
        .context("Failed to create category")?;

    if result.rows_affected() == 0 {
        tracing::debug!("Category {:?} already exists, reusing it", name);
    }

    find_category_by_name_sqlite(pool, name)
        .await?
        .with_context(|| format!("Category {:?} missing after insert", name))
}

async fn get_category_by_id_sqlite(pool: &SqlitePool, id: i64) -> Result<Option<CourseCategory>> {
    let row = sqlx::query("SELECT id, name, created_at FROM course_categories WHERE id = ?")
        .bind(id)
        .fetch_optional(pool)
        .await
        .context("Failed to get category by ID")?;

    Ok(row.map(|row| row_to_category_sqlite(&row)))
}

async fn find_category_by_name_sqlite(
    pool: &SqlitePool,
    name: &str,
) -> Result<Option<CourseCategory>> {
    let row = sqlx::query(
        "SELECT id, name, created_at FROM course_categories WHERE name = ? COLLATE NOCASE LIMIT 1",
    )
    .bind(name)
    .fetch_optional(pool)
    .await
    .context("Failed to get category by name")?;

    Ok(row.map(|row| row_to_category_sqlite(&row)))
}

async fn list_categories_sqlite(pool: &SqlitePool) -> Result<Vec<CourseCategory>> {
    let rows = sqlx::query("SELECT id, name, created_at FROM course_categories ORDER BY name, id")
        .fetch_all(pool)
        .await
        .context("Failed to list categories")?;

    Ok(rows.iter().map(row_to_category_sqlite).collect())
}

async fn count_categories_sqlite(pool: &SqlitePool) -> Result<i64> {
    let row = sqlx::query("SELECT COUNT(*) as count FROM course_categories")
        .fetch_one(pool)
        .await
        .context("Failed to count categories")?;
    Ok(row.get("count"))
}

async fn delete_category_sqlite(pool: &SqlitePool, id: i64) -> Result<bool> {
    let result = sqlx::query("DELETE FROM course_categories WHERE id = ?")
        .bind(id)
        .execute(pool)
        .await
        .context("Failed to delete category")?;
    Ok(result.rows_affected() > 0)
}

fn row_to_category_sqlite(row: &sqlx::sqlite::SqliteRow) -> CourseCategory {
    CourseCategory {
        id: row.get("id"),
        name: row.get("name"),
        created_at: row.get("created_at"),
    }
}

// ============================================================================
// MySQL implementations
// ============================================================================

async fn create_or_get_category_mysql(pool: &MySqlPool, name: &str) -> Result<CourseCategory> {
    let result = sqlx::query("INSERT IGNORE INTO course_categories (name, created_at) VALUES (?, ?)")
        .bind(name)
        .bind(Utc::now())
        .execute(pool)
        .await
        .context("Failed to create category")?;

    if result.rows_affected() == 0 {
        tracing::debug!("Category {:?} already exists, reusing it", name);
    }

    find_category_by_name_mysql(pool, name)
        .await?
        .with_context(|| format!("Category {:?} missing after insert", name))
}

async fn get_category_by_id_mysql(pool: &MySqlPool, id: i64) -> Result<Option<CourseCategory>> {
    let row = sqlx::query("SELECT id, name, created_at FROM course_categories WHERE id = ?")
        .bind(id)
        .fetch_optional(pool)
        .await
        .context("Failed to get category by ID")?;

    Ok(row.map(|row| row_to_category_mysql(&row)))
}

async fn find_category_by_name_mysql(
    pool: &MySqlPool,
    name: &str,
) -> Result<Option<CourseCategory>> {
    let row = sqlx::query("SELECT id, name, created_at FROM course_categories WHERE name = ? LIMIT 1")
        .bind(name)
        .fetch_optional(pool)
        .await
        .context("Failed to get category by name")?;

    Ok(row.map(|row| row_to_category_mysql(&row)))
}

async fn list_categories_mysql(pool: &MySqlPool) -> Result<Vec<CourseCategory>> {
    let rows = sqlx::query("SELECT id, name, created_at FROM course_categories ORDER BY name, id")
        .fetch_all(pool)
        .await
        .context("Failed to list categories")?;

    Ok(rows.iter().map(row_to_category_mysql).collect())
}

async fn count_categories_mysql(pool: &MySqlPool) -> Result<i64> {
    let row = sqlx::query("SELECT COUNT(*) as count FROM course_categories")
        .fetch_one(pool)
        .await
        .context("Failed to count categories")?;
    Ok(row.get("count"))
}

async fn delete_category_mysql(pool: &MySqlPool, id: i64) -> Result<bool> {
    let result = sqlx::query("DELETE FROM course_categories WHERE id = ?")
        .bind(id)
        .execute(pool)
        .await
        .context("Failed to delete category")?;
    Ok(result.rows_affected() > 0)
}

fn row_to_category_mysql(row: &sqlx::mysql::MySqlRow) -> CourseCategory {
    CourseCategory {
        id: row.get("id"),
        name: row.get("name"),
        created_at: row.get("created_at"),
    }
}
