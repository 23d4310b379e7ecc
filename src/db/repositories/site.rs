//! Site asset repository
//!
//! Database operations for the site branding row and website images.
//!
//! This module provides:
//! - `SiteRepository` trait defining the interface for branding/image data access
//! - `SqlxSiteRepository` implementing the trait for SQLite and MySQL

use crate::config::DatabaseDriver;
use crate::db::DynDatabasePool;
use crate::models::{PageSlot, SiteBranding, WebsiteImage};
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use sqlx::{MySqlPool, Row, SqlitePool};
use std::sync::Arc;

/// Site asset repository trait
#[async_trait]
pub trait SiteRepository: Send + Sync {
    /// The most recently updated branding row
    async fn latest_branding(&self) -> Result<Option<SiteBranding>>;

    /// Insert a branding row
    async fn create_branding(&self, site_name: &str, logo_path: Option<&str>) -> Result<SiteBranding>;

    /// Update a branding row and bump its `updated_at`
    async fn update_branding(&self, id: i64, site_name: &str, logo_path: Option<&str>) -> Result<()>;

    /// Insert a website image
    async fn create_image(&self, title: &str, image_path: &str, page: PageSlot) -> Result<WebsiteImage>;

    /// All images, newest first
    async fn list_images(&self) -> Result<Vec<WebsiteImage>>;

    /// Active images, newest first
    async fn list_active_images(&self) -> Result<Vec<WebsiteImage>>;

    /// Set an image's active flag. Returns false if no such image exists.
    async fn set_image_active(&self, id: i64, active: bool) -> Result<bool>;

    /// Get image by ID
    async fn get_image(&self, id: i64) -> Result<Option<WebsiteImage>>;
}

/// SQLx-based site asset repository implementation
pub struct SqlxSiteRepository {
    pool: DynDatabasePool,
}

impl SqlxSiteRepository {
    /// Create a new SQLx site repository
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    /// Create a boxed repository for use with dependency injection
    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn SiteRepository> {
        Arc::new(Self::new(pool))
    }
}

#[async_trait]
impl SiteRepository for SqlxSiteRepository {
    async fn latest_branding(&self) -> Result<Option<SiteBranding>> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => latest_branding_sqlite(self.pool.as_sqlite().unwrap()).await,
            DatabaseDriver::Mysql => latest_branding_mysql(self.pool.as_mysql().unwrap()).await,
        }
    }

    async fn create_branding(&self, site_name: &str, logo_path: Option<&str>) -> Result<SiteBranding> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                create_branding_sqlite(self.pool.as_sqlite().unwrap(), site_name, logo_path).await
            }
            DatabaseDriver::Mysql => {
                create_branding_mysql(self.pool.as_mysql().unwrap(), site_name, logo_path).await
            }
        }
    }

    async fn update_branding(&self, id: i64, site_name: &str, logo_path: Option<&str>) -> Result<()> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                update_branding_sqlite(self.pool.as_sqlite().unwrap(), id, site_name, logo_path).await
            }
            DatabaseDriver::Mysql => {
                update_branding_mysql(self.pool.as_mysql().unwrap(), id, site_name, logo_path).await
            }
        }
    }

    async fn create_image(&self, title: &str, image_path: &str, page: PageSlot) -> Result<WebsiteImage> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                create_image_sqlite(self.pool.as_sqlite().unwrap(), title, image_path, page).await
            }
            DatabaseDriver::Mysql => {
                create_image_mysql(self.pool.as_mysql().unwrap(), title, image_path, page).await
            }
        }
    }

    async fn list_images(&self) -> Result<Vec<WebsiteImage>> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => list_images_sqlite(self.pool.as_sqlite().unwrap(), false).await,
            DatabaseDriver::Mysql => list_images_mysql(self.pool.as_mysql().unwrap(), false).await,
        }
    }

    async fn list_active_images(&self) -> Result<Vec<WebsiteImage>> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => list_images_sqlite(self.pool.as_sqlite().unwrap(), true).await,
            DatabaseDriver::Mysql => list_images_mysql(self.pool.as_mysql().unwrap(), true).await,
        }
    }

    async fn set_image_active(&self, id: i64, active: bool) -> Result<bool> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                set_image_active_sqlite(self.pool.as_sqlite().unwrap(), id, active).await
            }
            DatabaseDriver::Mysql => {
                set_image_active_mysql(self.pool.as_mysql().unwrap(), id, active).await
            }
        }
    }

    async fn get_image(&self, id: i64) -> Result<Option<WebsiteImage>> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => get_image_sqlite(self.pool.as_sqlite().unwrap(), id).await,
            DatabaseDriver::Mysql => get_image_mysql(self.pool.as_mysql().unwrap(), id).await,
        }
    }
}

const LATEST_BRANDING_SQL: &str = "SELECT id, site_name, logo_path, updated_at FROM site_branding \
     ORDER BY updated_at DESC, id DESC LIMIT 1";

fn images_sql(active_only: bool) -> String {
    format!(
        "SELECT id, title, image_path, page, is_active, created_at FROM website_images \
         {} ORDER BY created_at DESC, id DESC",
        if active_only { "WHERE is_active = 1" } else { "" }
    )
}

fn parse_page(raw: &str) -> PageSlot {
    raw.parse().unwrap_or_default()
}

// ============================================================================
// SQLite implementations
// ============================================================================

async fn latest_branding_sqlite(pool: &SqlitePool) -> Result<Option<SiteBranding>> {
    let row = sqlx::query(LATEST_BRANDING_SQL)
        .fetch_optional(pool)
        .await
        .context("Failed to get site branding")?;

    Ok(row.map(|row| SiteBranding {
        id: row.get("id"),
        site_name: row.get("site_name"),
        logo_path: row.get("logo_path"),
        updated_at: row.get("updated_at"),
    }))
}

async fn create_branding_sqlite(
    pool: &SqlitePool,
    site_name: &str,
    logo_path: Option<&str>,
) -> Result<SiteBranding> {
    let now = Utc::now();
    let result = sqlx::query("INSERT INTO site_branding (site_name, logo_path, updated_at) VALUES (?, ?, ?)")
        .bind(site_name)
        .bind(logo_path)
        .bind(now)
        .execute(pool)
        .await
        .context("Failed to create site branding")?;

    Ok(SiteBranding {
        id: result.last_insert_rowid(),
        site_name: site_name.to_string(),
        logo_path: logo_path.map(str::to_string),
        updated_at: now,
    })
}

async fn update_branding_sqlite(
    pool: &SqlitePool,
    id: i64,
    site_name: &str,
    logo_path: Option<&str>,
) -> Result<()> {
    sqlx::query("UPDATE site_branding SET site_name = ?, logo_path = ?, updated_at = ? WHERE id = ?")
        .bind(site_name)
        .bind(logo_path)
        .bind(Utc::now())
        .bind(id)
        .execute(pool)
        .await
        .context("Failed to update site branding")?;
    Ok(())
}

async fn create_image_sqlite(
    pool: &SqlitePool,
    title: &str,
    image_path: &str,
    page: PageSlot,
) -> Result<WebsiteImage> {
    let now = Utc::now();
    let result = sqlx::query(
        "INSERT INTO website_images (title, image_path, page, is_active, created_at) VALUES (?, ?, ?, 1, ?)",
    )
    .bind(title)
    .bind(image_path)
    .bind(page.as_str())
    .bind(now)
    .execute(pool)
    .await
    .context("Failed to create website image")?;

    Ok(WebsiteImage {
        id: result.last_insert_rowid(),
        title: title.to_string(),
        image_path: image_path.to_string(),
        page,
        is_active: true,
        created_at: now,
    })
}

async fn list_images_sqlite(pool: &SqlitePool, active_only: bool) -> Result<Vec<WebsiteImage>> {
    let rows = sqlx::query(&images_sql(active_only))
        .fetch_all(pool)
        .await
        .context("Failed to list website images")?;

    Ok(rows.iter().map(row_to_image_sqlite).collect())
}

async fn set_image_active_sqlite(pool: &SqlitePool, id: i64, active: bool) -> Result<bool> {
    let result = sqlx::query("UPDATE website_images SET is_active = ? WHERE id = ?")
        .bind(active)
        .bind(id)
        .execute(pool)
        .await
        .context("Failed to update website image")?;
    Ok(result.rows_affected() > 0)
}

async fn get_image_sqlite(pool: &SqlitePool, id: i64) -> Result<Option<WebsiteImage>> {
    let row = sqlx::query(
        "SELECT id, title, image_path, page, is_active, created_at FROM website_images WHERE id = ?",
    )
    .bind(id)
    .fetch_optional(pool)
    .await
    .context("Failed to get website image")?;

    Ok(row.map(|row| row_to_image_sqlite(&row)))
}

fn row_to_image_sqlite(row: &sqlx::sqlite::SqliteRow) -> WebsiteImage {
    let page: String = row.get("page");
    WebsiteImage {
        id: row.get("id"),
        title: row.get("title"),
        image_path: row.get("image_path"),
        page: parse_page(&page),
        is_active: row.get("is_active"),
        created_at: row.get("created_at"),
    }
}

// ============================================================================
// MySQL implementations
// ============================================================================

async fn latest_branding_mysql(pool: &MySqlPool) -> Result<Option<SiteBranding>> {
    let row = sqlx::query(LATEST_BRANDING_SQL)
        .fetch_optional(pool)
        .await
        .context("Failed to get site branding")?;

    Ok(row.map(|row| SiteBranding {
        id: row.get("id"),
        site_name: row.get("site_name"),
        logo_path: row.get("logo_path"),
        updated_at: row.get("updated_at"),
    }))
}

async fn create_branding_mysql(
    pool: &MySqlPool,
    site_name: &str,
    logo_path: Option<&str>,
) -> Result<SiteBranding> {
    let now = Utc::now();
    let result = sqlx::query("INSERT INTO site_branding (site_name, logo_path, updated_at) VALUES (?, ?, ?)")
        .bind(site_name)
        .bind(logo_path)
        .bind(now)
        .execute(pool)
        .await
        .context("Failed to create site branding")?;

    Ok(SiteBranding {
        id: result.last_insert_id() as i64,
        site_name: site_name.to_string(),
        logo_path: logo_path.map(str::to_string),
        updated_at: now,
    })
}

async fn update_branding_mysql(
    pool: &MySqlPool,
    id: i64,
    site_name: &str,
    logo_path: Option<&str>,
) -> Result<()> {
    sqlx::query("UPDATE site_branding SET site_name = ?, logo_path = ?, updated_at = ? WHERE id = ?")
        .bind(site_name)
        .bind(logo_path)
        .bind(Utc::now())
        .bind(id)
        .execute(pool)
        .await
        .context("Failed to update site branding")?;
    Ok(())
}

async fn create_image_mysql(
    pool: &MySqlPool,
    title: &str,
    image_path: &str,
    page: PageSlot,
) -> Result<WebsiteImage> {
    let now = Utc::now();
    let result = sqlx::query(
        "INSERT INTO website_images (title, image_path, page, is_active, created_at) VALUES (?, ?, ?, TRUE, ?)",
    )
    .bind(title)
    .bind(image_path)
    .bind(page.as_str())
    .bind(now)
    .execute(pool)
    .await
    .context("Failed to create website image")?;

    Ok(WebsiteImage {
        id: result.last_insert_id() as i64,
        title: title.to_string(),
        image_path: image_path.to_string(),
        page,
        is_active: true,
        created_at: now,
    })
}

async fn list_images_mysql(pool: &MySqlPool, active_only: bool) -> Result<Vec<WebsiteImage>> {
    let rows = sqlx::query(&images_sql(active_only))
        .fetch_all(pool)
        .await
        .context("Failed to list website images")?;

    Ok(rows.iter().map(row_to_image_mysql).collect())
}

async fn set_image_active_mysql(pool: &MySqlPool, id: i64, active: bool) -> Result<bool> {
    let result = sqlx::query("UPDATE website_images SET is_active = ? WHERE id = ?")
        .bind(active)
        .bind(id)
        .execute(pool)
        .await
        .context("Failed to update website image")?;
    // MySQL reports zero affected rows when the value is unchanged
    if result.rows_affected() > 0 {
        return Ok(true);
    }
    Ok(get_image_mysql(pool, id).await?.is_some())
}

async fn get_image_mysql(pool: &MySqlPool, id: i64) -> Result<Option<WebsiteImage>> {
    let row = sqlx::query(
        "SELECT id, title, image_path, page, is_active, created_at FROM website_images WHERE id = ?",
    )
    .bind(id)
    .fetch_optional(pool)
    .await
    .context("Failed to get website image")?;

    Ok(row.map(|row| row_to_image_mysql(&row)))
}

fn row_to_image_mysql(row: &sqlx::mysql::MySqlRow) -> WebsiteImage {
    let page: String = row.get("page");
    WebsiteImage {
        id: row.get("id"),
        title: row.get("title"),
        image_path: row.get("image_path"),
        page: parse_page(&page),
        is_active: row.get("is_active"),
        created_at: row.get("created_at"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{create_test_pool, migrations};

    async fn setup_test_repo() -> SqlxSiteRepository {
        let pool = create_test_pool().await.expect("Failed to create test pool");
        migrations::run_migrations(&pool)
            .await
            .expect("Failed to run migrations");
        SqlxSiteRepository::new(pool)
    }

    #[tokio::test]
    async fn test_default_branding_seeded() {
        let repo = setup_test_repo().await;
        let branding = repo.latest_branding().await.unwrap().expect("seeded branding");
        assert_eq!(branding.site_name, "School Of IT Skills");
        assert!(branding.logo_path.is_none());
    }

    #[tokio::test]
    async fn test_update_branding_becomes_latest() {
        let repo = setup_test_repo().await;
        let seeded = repo.latest_branding().await.unwrap().unwrap();

        repo.update_branding(seeded.id, "SkillHub Academy", Some("branding/logos/logo.png"))
            .await
            .unwrap();

        let latest = repo.latest_branding().await.unwrap().unwrap();
        assert_eq!(latest.id, seeded.id);
        assert_eq!(latest.site_name, "SkillHub Academy");
        assert_eq!(latest.logo_path.as_deref(), Some("branding/logos/logo.png"));
    }

    #[tokio::test]
    async fn test_images_newest_first_and_active_filter() {
        let repo = setup_test_repo().await;
        let banner = repo
            .create_image("Banner", "website/images/banner.png", PageSlot::Home)
            .await
            .unwrap();
        let team = repo
            .create_image("Team", "website/images/team.png", PageSlot::About)
            .await
            .unwrap();

        let all = repo.list_images().await.unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].id, team.id);

        assert!(repo.set_image_active(banner.id, false).await.unwrap());
        let active = repo.list_active_images().await.unwrap();
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].title, "Team");
        assert_eq!(active[0].page, PageSlot::About);

        let stored = repo.get_image(banner.id).await.unwrap().unwrap();
        assert!(!stored.is_active);
        assert!(!repo.set_image_active(9_999, true).await.unwrap());
    }
}
