//! Connection pools
//!
//! One `DatabasePool` trait object is shared by every repository. The SQLite
//! pool enforces foreign keys on each connection so that deleting a category
//! cascades to its courses, lessons, enrollments and attendance.

use anyhow::{Context, Result};
use async_trait::async_trait;
use sqlx::{
    mysql::{MySqlPool, MySqlPoolOptions},
    sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions},
};
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;

use crate::config::{DatabaseConfig, DatabaseDriver};

/// Backend-neutral handle; repositories match on `driver()` and borrow the
/// concrete pool through `as_sqlite` / `as_mysql`.
#[async_trait]
pub trait DatabasePool: Send + Sync {
    /// Run one statement, returning the affected row count
    async fn execute(&self, query: &str) -> Result<u64>;

    async fn ping(&self) -> Result<()>;

    fn driver(&self) -> DatabaseDriver;

    fn as_sqlite(&self) -> Option<&SqlitePool>;

    fn as_mysql(&self) -> Option<&MySqlPool>;
}

/// Where a configured SQLite URL points
#[derive(Debug, PartialEq, Eq)]
enum SqliteTarget {
    Memory,
    File { url: String, path: PathBuf },
}

impl SqliteTarget {
    /// Accepts `:memory:`, `sqlite::memory:`, `sqlite:<path>`,
    /// `sqlite://<path>` and bare paths.
    fn parse(url: &str) -> Self {
        if url == ":memory:" || url.starts_with("sqlite::memory:") || url.contains("mode=memory") {
            return SqliteTarget::Memory;
        }

        let path = url.trim_start_matches("sqlite://").trim_start_matches("sqlite:");
        let path = path.split('?').next().unwrap_or(path);
        let url = if url.starts_with("sqlite:") {
            url.to_string()
        } else {
            format!("sqlite:{}", url)
        };

        SqliteTarget::File {
            url,
            path: PathBuf::from(path),
        }
    }
}

/// SQLite pool
pub struct SqliteDatabase {
    pool: SqlitePool,
}

impl SqliteDatabase {
    pub async fn connect(config: &DatabaseConfig) -> Result<Self> {
        let target = SqliteTarget::parse(&config.url);

        let (connection_url, pool_options) = match &target {
            // Each in-memory connection is a separate database: keep one open forever
            SqliteTarget::Memory => (
                "sqlite::memory:".to_string(),
                SqlitePoolOptions::new()
                    .max_connections(1)
                    .min_connections(1)
                    .idle_timeout(None)
                    .max_lifetime(None),
            ),
            SqliteTarget::File { url, path } => {
                if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                    std::fs::create_dir_all(parent).with_context(|| {
                        format!("Failed to create database directory: {}", parent.display())
                    })?;
                }
                (
                    url.clone(),
                    SqlitePoolOptions::new().max_connections(config.max_connections),
                )
            }
        };

        let options = SqliteConnectOptions::from_str(&connection_url)
            .with_context(|| format!("Invalid SQLite URL: {}", config.url))?
            .create_if_missing(true)
            .foreign_keys(true);

        let pool = pool_options
            .connect_with(options)
            .await
            .with_context(|| format!("Failed to open SQLite database: {}", config.url))?;

        Ok(Self { pool })
    }
}

#[async_trait]
impl DatabasePool for SqliteDatabase {
    async fn execute(&self, query: &str) -> Result<u64> {
        let result = sqlx::query(query)
            .execute(&self.pool)
            .await
            .with_context(|| format!("Failed to execute statement: {}", query))?;
        Ok(result.rows_affected())
    }

    async fn ping(&self) -> Result<()> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .context("SQLite ping failed")?;
        Ok(())
    }

    fn driver(&self) -> DatabaseDriver {
        DatabaseDriver::Sqlite
    }

    fn as_sqlite(&self) -> Option<&SqlitePool> {
        Some(&self.pool)
    }

    fn as_mysql(&self) -> Option<&MySqlPool> {
        None
    }
}

/// MySQL pool
pub struct MysqlDatabase {
    pool: MySqlPool,
}

impl MysqlDatabase {
    pub async fn connect(config: &DatabaseConfig) -> Result<Self> {
        let connection_url = if config.url.starts_with("mysql://") {
            config.url.clone()
        } else {
            format!("mysql://{}", config.url)
        };

        let pool = MySqlPoolOptions::new()
            .max_connections(config.max_connections)
            .connect(&connection_url)
            .await
            .context("Failed to connect to MySQL")?;

        Ok(Self { pool })
    }
}

#[async_trait]
impl DatabasePool for MysqlDatabase {
    async fn execute(&self, query: &str) -> Result<u64> {
        let result = sqlx::query(query)
            .execute(&self.pool)
            .await
            .with_context(|| format!("Failed to execute statement: {}", query))?;
        Ok(result.rows_affected())
    }

    async fn ping(&self) -> Result<()> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .context("MySQL ping failed")?;
        Ok(())
    }

    fn driver(&self) -> DatabaseDriver {
        DatabaseDriver::Mysql
    }

    fn as_sqlite(&self) -> Option<&SqlitePool> {
        None
    }

    fn as_mysql(&self) -> Option<&MySqlPool> {
        Some(&self.pool)
    }
}

/// Shared pool handle
pub type DynDatabasePool = Arc<dyn DatabasePool>;

/// Open the configured database and check that it answers
pub async fn create_pool(config: &DatabaseConfig) -> Result<DynDatabasePool> {
    let pool: DynDatabasePool = match config.driver {
        DatabaseDriver::Sqlite => Arc::new(SqliteDatabase::connect(config).await?),
        DatabaseDriver::Mysql => Arc::new(MysqlDatabase::connect(config).await?),
    };
    pool.ping().await?;
    Ok(pool)
}

/// In-memory SQLite for tests
pub async fn create_test_pool() -> Result<DynDatabasePool> {
    create_pool(&DatabaseConfig {
        driver: DatabaseDriver::Sqlite,
        url: ":memory:".to_string(),
        ..Default::default()
    })
    .await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_sqlite_pool_creation() {
        let pool = create_test_pool().await.expect("Failed to create pool");
        assert_eq!(pool.driver(), DatabaseDriver::Sqlite);
        assert!(pool.as_sqlite().is_some());
        assert!(pool.as_mysql().is_none());
    }

    #[tokio::test]
    async fn test_memory_pool_shares_one_database() {
        let pool = create_test_pool().await.expect("Failed to create pool");

        pool.execute("CREATE TABLE scratch (id INTEGER PRIMARY KEY, name TEXT)")
            .await
            .expect("Failed to create table");
        let affected = pool
            .execute("INSERT INTO scratch (name) VALUES ('a')")
            .await
            .expect("Failed to insert");
        assert_eq!(affected, 1);

        let count: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM scratch")
            .fetch_one(pool.as_sqlite().unwrap())
            .await
            .unwrap();
        assert_eq!(count.0, 1);
    }

    #[tokio::test]
    async fn test_foreign_keys_enabled() {
        let pool = create_test_pool().await.expect("Failed to create pool");
        let row: (i64,) = sqlx::query_as("PRAGMA foreign_keys")
            .fetch_one(pool.as_sqlite().unwrap())
            .await
            .unwrap();
        assert_eq!(row.0, 1);
    }

    #[tokio::test]
    async fn test_sqlite_file_in_new_directory() {
        let temp_dir = tempfile::tempdir().expect("Failed to create temp dir");
        let db_path = temp_dir.path().join("data").join("skillhub.db");

        let config = DatabaseConfig {
            url: db_path.to_string_lossy().to_string(),
            max_connections: 2,
            ..Default::default()
        };

        create_pool(&config).await.expect("Failed to create pool");
        assert!(db_path.exists());
    }

    #[test]
    fn test_sqlite_target_parse() {
        assert_eq!(SqliteTarget::parse(":memory:"), SqliteTarget::Memory);
        assert_eq!(SqliteTarget::parse("sqlite::memory:"), SqliteTarget::Memory);
        assert_eq!(
            SqliteTarget::parse("data/skillhub.db"),
            SqliteTarget::File {
                url: "sqlite:data/skillhub.db".to_string(),
                path: PathBuf::from("data/skillhub.db"),
            }
        );
        assert_eq!(
            SqliteTarget::parse("sqlite://db/app.db?mode=rwc"),
            SqliteTarget::File {
                url: "sqlite://db/app.db?mode=rwc".to_string(),
                path: PathBuf::from("db/app.db"),
            }
        );
    }

    #[tokio::test]
    #[ignore = "Requires MySQL server"]
    async fn test_mysql_pool_creation() {
        let url = std::env::var("MYSQL_TEST_URL")
            .unwrap_or_else(|_| "mysql://root@localhost/skillhub_test".to_string());

        let config = DatabaseConfig {
            driver: DatabaseDriver::Mysql,
            url,
            ..Default::default()
        };

        let pool = create_pool(&config).await.expect("Failed to create pool");
        assert_eq!(pool.driver(), DatabaseDriver::Mysql);
    }
}
