//! Database layer
//!
//! Storage for SkillHub, backed by either:
//! - SQLite (default, single-file deployment)
//! - MySQL
//!
//! The `DatabasePool` trait hides the backend; repositories dispatch on
//! `driver()` and run the matching SQL.
//!
//! # Usage
//!
//! ```ignore
//! use skillhub::config::DatabaseConfig;
//! use skillhub::db::{create_pool, migrations};
//!
//! let pool = create_pool(&DatabaseConfig::default()).await?;
//! migrations::run_migrations(&pool).await?;
//! pool.ping().await?;
//! ```

pub mod migrations;
pub mod pool;
pub mod repositories;

pub use pool::{
    create_pool, create_test_pool, DatabasePool, DynDatabasePool, MysqlDatabase, SqliteDatabase,
};
