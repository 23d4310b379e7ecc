//! Database migrations module
//!
//! Code-based migrations for SkillHub. Every migration is embedded in the
//! binary as SQL strings, one flavour for SQLite and one for MySQL, and is
//! recorded in the `_migrations` table once applied.
//!
//! # Usage
//!
//! ```ignore
//! use skillhub::db::{create_pool, migrations};
//!
//! let pool = create_pool(&config).await?;
//! migrations::run_migrations(&pool).await?;
//! ```

use anyhow::{Context, Result};
use sqlx::{MySqlPool, Row, SqlitePool};
use std::collections::HashSet;

use super::DynDatabasePool;
use crate::config::DatabaseDriver;

/// A database migration with SQL for both SQLite and MySQL
#[derive(Debug, Clone)]
pub struct Migration {
    /// Migration version number (must be unique and sequential)
    pub version: i32,
    /// Human-readable migration name
    pub name: &'static str,
    /// SQL statements for SQLite
    pub up_sqlite: &'static str,
    /// SQL statements for MySQL
    pub up_mysql: &'static str,
}

/// All migrations, applied in order.
pub const MIGRATIONS: &[Migration] = &[
    Migration {
        version: 1,
        name: "create_users_and_roles",
        up_sqlite: r#"
            CREATE TABLE IF NOT EXISTS users (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                username VARCHAR(150) NOT NULL UNIQUE,
                email VARCHAR(255) NOT NULL DEFAULT '',
                first_name VARCHAR(150) NOT NULL DEFAULT '',
                password_hash VARCHAR(255) NOT NULL,
                is_staff BOOLEAN NOT NULL DEFAULT 0,
                is_superuser BOOLEAN NOT NULL DEFAULT 0,
                created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
            );
            CREATE TABLE IF NOT EXISTS user_roles (
                user_id INTEGER NOT NULL,
                role VARCHAR(20) NOT NULL,
                PRIMARY KEY (user_id, role),
                FOREIGN KEY (user_id) REFERENCES users(id) ON DELETE CASCADE
            );
        "#,
        up_mysql: r#"
            CREATE TABLE IF NOT EXISTS users (
                id BIGINT PRIMARY KEY AUTO_INCREMENT,
                username VARCHAR(150) NOT NULL UNIQUE,
                email VARCHAR(255) NOT NULL DEFAULT '',
                first_name VARCHAR(150) NOT NULL DEFAULT '',
                password_hash VARCHAR(255) NOT NULL,
                is_staff BOOLEAN NOT NULL DEFAULT FALSE,
                is_superuser BOOLEAN NOT NULL DEFAULT FALSE,
                created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
            );
            CREATE TABLE IF NOT EXISTS user_roles (
                user_id BIGINT NOT NULL,
                role VARCHAR(20) NOT NULL,
                PRIMARY KEY (user_id, role),
                FOREIGN KEY (user_id) REFERENCES users(id) ON DELETE CASCADE
            );
        "#,
    },
    Migration {
        version: 2,
        name: "create_sessions",
        up_sqlite: r#"
            CREATE TABLE IF NOT EXISTS sessions (
                id VARCHAR(64) PRIMARY KEY,
                user_id INTEGER,
                data TEXT NOT NULL DEFAULT '{}',
                expires_at TIMESTAMP NOT NULL,
                created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
                FOREIGN KEY (user_id) REFERENCES users(id) ON DELETE CASCADE
            );
            CREATE INDEX IF NOT EXISTS idx_sessions_user_id ON sessions(user_id);
            CREATE INDEX IF NOT EXISTS idx_sessions_expires_at ON sessions(expires_at);
        "#,
        up_mysql: r#"
            CREATE TABLE IF NOT EXISTS sessions (
                id VARCHAR(64) PRIMARY KEY,
                user_id BIGINT NULL,
                data TEXT NOT NULL,
                expires_at TIMESTAMP NOT NULL,
                created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
                FOREIGN KEY (user_id) REFERENCES users(id) ON DELETE CASCADE
            );
            CREATE INDEX idx_sessions_user_id ON sessions(user_id);
            CREATE INDEX idx_sessions_expires_at ON sessions(expires_at);
        "#,
    },
    Migration {
        version: 3,
        name: "create_site_branding_and_images",
        up_sqlite: r#"
            CREATE TABLE IF NOT EXISTS site_branding (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                site_name VARCHAR(120) NOT NULL DEFAULT 'School Of IT Skills',
                logo_path VARCHAR(255),
                updated_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
            );
            CREATE TABLE IF NOT EXISTS website_images (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                title VARCHAR(120) NOT NULL,
                image_path VARCHAR(255) NOT NULL,
                page VARCHAR(20) NOT NULL DEFAULT 'global',
                is_active BOOLEAN NOT NULL DEFAULT 1,
                created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
            );
            INSERT INTO site_branding (site_name) VALUES ('School Of IT Skills');
        "#,
        up_mysql: r#"
            CREATE TABLE IF NOT EXISTS site_branding (
                id BIGINT PRIMARY KEY AUTO_INCREMENT,
                site_name VARCHAR(120) NOT NULL DEFAULT 'School Of IT Skills',
                logo_path VARCHAR(255) NULL,
                updated_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
            );
            CREATE TABLE IF NOT EXISTS website_images (
                id BIGINT PRIMARY KEY AUTO_INCREMENT,
                title VARCHAR(120) NOT NULL,
                image_path VARCHAR(255) NOT NULL,
                page VARCHAR(20) NOT NULL DEFAULT 'global',
                is_active BOOLEAN NOT NULL DEFAULT TRUE,
                created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
            );
            INSERT INTO site_branding (site_name) VALUES ('School Of IT Skills');
        "#,
    },
    Migration {
        version: 4,
        name: "create_course_catalog",
        up_sqlite: r#"
            CREATE TABLE IF NOT EXISTS course_categories (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                name VARCHAR(120) NOT NULL UNIQUE COLLATE NOCASE,
                created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
            );
            CREATE TABLE IF NOT EXISTS courses (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                category_id INTEGER NOT NULL,
                title VARCHAR(200) NOT NULL,
                description TEXT NOT NULL DEFAULT '',
                level VARCHAR(20) NOT NULL DEFAULT 'beginner',
                duration_hours INTEGER NOT NULL DEFAULT 0,
                is_active BOOLEAN NOT NULL DEFAULT 1,
                created_by INTEGER,
                created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
                UNIQUE (category_id, title),
                FOREIGN KEY (category_id) REFERENCES course_categories(id) ON DELETE CASCADE,
                FOREIGN KEY (created_by) REFERENCES users(id) ON DELETE SET NULL
            );
            CREATE TABLE IF NOT EXISTS lessons (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                course_id INTEGER NOT NULL,
                title VARCHAR(200) NOT NULL,
                description TEXT NOT NULL DEFAULT '',
                file_path VARCHAR(255),
                visibility VARCHAR(20) NOT NULL DEFAULT 'public',
                created_by INTEGER,
                created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
                FOREIGN KEY (course_id) REFERENCES courses(id) ON DELETE CASCADE,
                FOREIGN KEY (created_by) REFERENCES users(id) ON DELETE SET NULL
            );
            CREATE INDEX IF NOT EXISTS idx_courses_category_id ON courses(category_id);
            CREATE INDEX IF NOT EXISTS idx_lessons_course_id ON lessons(course_id);
        "#,
        up_mysql: r#"
            CREATE TABLE IF NOT EXISTS course_categories (
                id BIGINT PRIMARY KEY AUTO_INCREMENT,
                name VARCHAR(120) NOT NULL UNIQUE,
                created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
            );
            CREATE TABLE IF NOT EXISTS courses (
                id BIGINT PRIMARY KEY AUTO_INCREMENT,
                category_id BIGINT NOT NULL,
                title VARCHAR(200) NOT NULL,
                description TEXT NOT NULL,
                level VARCHAR(20) NOT NULL DEFAULT 'beginner',
                duration_hours INT UNSIGNED NOT NULL DEFAULT 0,
                is_active BOOLEAN NOT NULL DEFAULT TRUE,
                created_by BIGINT NULL,
                created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
                UNIQUE KEY uq_courses_category_title (category_id, title),
                FOREIGN KEY (category_id) REFERENCES course_categories(id) ON DELETE CASCADE,
                FOREIGN KEY (created_by) REFERENCES users(id) ON DELETE SET NULL
            );
            CREATE TABLE IF NOT EXISTS lessons (
                id BIGINT PRIMARY KEY AUTO_INCREMENT,
                course_id BIGINT NOT NULL,
                title VARCHAR(200) NOT NULL,
                description TEXT NOT NULL,
                file_path VARCHAR(255) NULL,
                visibility VARCHAR(20) NOT NULL DEFAULT 'public',
                created_by BIGINT NULL,
                created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
                FOREIGN KEY (course_id) REFERENCES courses(id) ON DELETE CASCADE,
                FOREIGN KEY (created_by) REFERENCES users(id) ON DELETE SET NULL
            );
        "#,
    },
    Migration {
        version: 5,
        name: "create_enrollment_and_attendance",
        up_sqlite: r#"
            CREATE TABLE IF NOT EXISTS course_enrollments (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                student_id INTEGER NOT NULL,
                course_id INTEGER NOT NULL,
                enrolled_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
                UNIQUE (student_id, course_id),
                FOREIGN KEY (student_id) REFERENCES users(id) ON DELETE CASCADE,
                FOREIGN KEY (course_id) REFERENCES courses(id) ON DELETE CASCADE
            );
            CREATE TABLE IF NOT EXISTS attendance_records (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                student_id INTEGER NOT NULL,
                course_id INTEGER NOT NULL,
                attendance_date DATE NOT NULL,
                source VARCHAR(20) NOT NULL DEFAULT 'enter',
                marked_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
                UNIQUE (student_id, course_id, attendance_date),
                FOREIGN KEY (student_id) REFERENCES users(id) ON DELETE CASCADE,
                FOREIGN KEY (course_id) REFERENCES courses(id) ON DELETE CASCADE
            );
            CREATE INDEX IF NOT EXISTS idx_enrollments_course_id ON course_enrollments(course_id);
            CREATE INDEX IF NOT EXISTS idx_attendance_course_id ON attendance_records(course_id);
        "#,
        up_mysql: r#"
            CREATE TABLE IF NOT EXISTS course_enrollments (
                id BIGINT PRIMARY KEY AUTO_INCREMENT,
                student_id BIGINT NOT NULL,
                course_id BIGINT NOT NULL,
                enrolled_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
                UNIQUE KEY uq_enrollments_student_course (student_id, course_id),
                FOREIGN KEY (student_id) REFERENCES users(id) ON DELETE CASCADE,
                FOREIGN KEY (course_id) REFERENCES courses(id) ON DELETE CASCADE
            );
            CREATE TABLE IF NOT EXISTS attendance_records (
                id BIGINT PRIMARY KEY AUTO_INCREMENT,
                student_id BIGINT NOT NULL,
                course_id BIGINT NOT NULL,
                attendance_date DATE NOT NULL,
                source VARCHAR(20) NOT NULL DEFAULT 'enter',
                marked_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
                UNIQUE KEY uq_attendance_student_course_date (student_id, course_id, attendance_date),
                FOREIGN KEY (student_id) REFERENCES users(id) ON DELETE CASCADE,
                FOREIGN KEY (course_id) REFERENCES courses(id) ON DELETE CASCADE
            );
        "#,
    },
    Migration {
        version: 6,
        name: "seed_course_catalog",
        up_sqlite: r#"
            INSERT OR IGNORE INTO course_categories (name) VALUES
                ('Software Development'),
                ('Analysis'),
                ('AI-ML'),
                ('Office'),
                ('Accounting');
            INSERT OR IGNORE INTO courses (category_id, title, description, level, duration_hours, is_active)
            SELECT c.id, s.title, s.title || ' course under ' || c.name || '.', 'beginner', 0, 1
            FROM (
                SELECT 'Software Development' AS category, 'Python' AS title
                UNION ALL SELECT 'Software Development', 'HTML'
                UNION ALL SELECT 'Software Development', 'CSS'
                UNION ALL SELECT 'Software Development', 'JavaScript'
                UNION ALL SELECT 'Software Development', 'React'
                UNION ALL SELECT 'Analysis', 'Data Analysis'
                UNION ALL SELECT 'Analysis', 'Data Science'
                UNION ALL SELECT 'AI-ML', 'AI/ML'
                UNION ALL SELECT 'AI-ML', 'Machine Learning'
                UNION ALL SELECT 'AI-ML', 'Gen AI'
                UNION ALL SELECT 'Office', 'Office Automation'
                UNION ALL SELECT 'Office', 'Advanced Excel'
                UNION ALL SELECT 'Accounting', 'Tally Essential Level 1'
                UNION ALL SELECT 'Accounting', 'Tally Essential Level 2'
                UNION ALL SELECT 'Accounting', 'Tally Essential Level 3'
                UNION ALL SELECT 'Accounting', 'Tally Comprehensive'
            ) AS s
            JOIN course_categories c ON c.name = s.category;
        "#,
        up_mysql: r#"
            INSERT IGNORE INTO course_categories (name) VALUES
                ('Software Development'),
                ('Analysis'),
                ('AI-ML'),
                ('Office'),
                ('Accounting');
            INSERT IGNORE INTO courses (category_id, title, description, level, duration_hours, is_active)
            SELECT c.id, s.title, CONCAT(s.title, ' course under ', c.name, '.'), 'beginner', 0, TRUE
            FROM (
                SELECT 'Software Development' AS category, 'Python' AS title
                UNION ALL SELECT 'Software Development', 'HTML'
                UNION ALL SELECT 'Software Development', 'CSS'
                UNION ALL SELECT 'Software Development', 'JavaScript'
                UNION ALL SELECT 'Software Development', 'React'
                UNION ALL SELECT 'Analysis', 'Data Analysis'
                UNION ALL SELECT 'Analysis', 'Data Science'
                UNION ALL SELECT 'AI-ML', 'AI/ML'
                UNION ALL SELECT 'AI-ML', 'Machine Learning'
                UNION ALL SELECT 'AI-ML', 'Gen AI'
                UNION ALL SELECT 'Office', 'Office Automation'
                UNION ALL SELECT 'Office', 'Advanced Excel'
                UNION ALL SELECT 'Accounting', 'Tally Essential Level 1'
                UNION ALL SELECT 'Accounting', 'Tally Essential Level 2'
                UNION ALL SELECT 'Accounting', 'Tally Essential Level 3'
                UNION ALL SELECT 'Accounting', 'Tally Comprehensive'
            ) AS s
            JOIN course_categories c ON c.name = s.category;
        "#,
    },
];

/// Run all pending migrations
///
/// Creates the `_migrations` tracking table if needed, then applies every
/// migration whose version is not yet recorded, in order.
///
/// # Returns
///
/// Number of migrations applied
pub async fn run_migrations(pool: &DynDatabasePool) -> Result<usize> {
    create_migrations_table(pool).await?;

    let applied = get_applied_versions(pool).await?;
    let mut count = 0;

    for migration in MIGRATIONS {
        if applied.contains(&migration.version) {
            continue;
        }
        tracing::info!(
            "Applying migration {}: {}",
            migration.version,
            migration.name
        );
        apply_migration(pool, migration)
            .await
            .with_context(|| format!("Failed to apply migration: {}", migration.name))?;
        count += 1;
    }

    if count > 0 {
        tracing::info!("Applied {} migration(s)", count);
    } else {
        tracing::debug!("No pending migrations");
    }

    Ok(count)
}

/// Create the migrations tracking table if it doesn't exist
async fn create_migrations_table(pool: &DynDatabasePool) -> Result<()> {
    let sql = match pool.driver() {
        DatabaseDriver::Sqlite => {
            r#"
            CREATE TABLE IF NOT EXISTS _migrations (
                version INTEGER PRIMARY KEY,
                name VARCHAR(255) NOT NULL UNIQUE,
                applied_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
            )
            "#
        }
        DatabaseDriver::Mysql => {
            r#"
            CREATE TABLE IF NOT EXISTS _migrations (
                version INT PRIMARY KEY,
                name VARCHAR(255) NOT NULL UNIQUE,
                applied_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
            )
            "#
        }
    };

    pool.execute(sql).await?;
    Ok(())
}

/// Versions of the migrations already recorded
async fn get_applied_versions(pool: &DynDatabasePool) -> Result<HashSet<i32>> {
    match pool.driver() {
        DatabaseDriver::Sqlite => get_applied_versions_sqlite(pool.as_sqlite().unwrap()).await,
        DatabaseDriver::Mysql => get_applied_versions_mysql(pool.as_mysql().unwrap()).await,
    }
}

async fn get_applied_versions_sqlite(pool: &SqlitePool) -> Result<HashSet<i32>> {
    let rows = sqlx::query("SELECT version FROM _migrations")
        .fetch_all(pool)
        .await
        .context("Failed to read applied migrations")?;

    Ok(rows
        .iter()
        .map(|row| row.get::<i64, _>("version") as i32)
        .collect())
}

async fn get_applied_versions_mysql(pool: &MySqlPool) -> Result<HashSet<i32>> {
    let rows = sqlx::query("SELECT version FROM _migrations")
        .fetch_all(pool)
        .await
        .context("Failed to read applied migrations")?;

    Ok(rows.iter().map(|row| row.get::<i32, _>("version")).collect())
}

/// Apply a single migration
async fn apply_migration(pool: &DynDatabasePool, migration: &Migration) -> Result<()> {
    match pool.driver() {
        DatabaseDriver::Sqlite => {
            apply_migration_sqlite(pool.as_sqlite().unwrap(), migration).await
        }
        DatabaseDriver::Mysql => apply_migration_mysql(pool.as_mysql().unwrap(), migration).await,
    }
}

async fn apply_migration_sqlite(pool: &SqlitePool, migration: &Migration) -> Result<()> {
    let mut tx = pool.begin().await?;

    for statement in split_sql_statements(migration.up_sqlite) {
        sqlx::query(statement)
            .execute(&mut *tx)
            .await
            .with_context(|| format!("Failed to execute: {}", truncate_sql(statement)))?;
    }

    sqlx::query("INSERT INTO _migrations (version, name) VALUES (?, ?)")
        .bind(migration.version)
        .bind(migration.name)
        .execute(&mut *tx)
        .await?;

    tx.commit().await?;
    Ok(())
}

// MySQL DDL commits implicitly, so statements run directly on the pool
async fn apply_migration_mysql(pool: &MySqlPool, migration: &Migration) -> Result<()> {
    for statement in split_sql_statements(migration.up_mysql) {
        sqlx::query(statement)
            .execute(pool)
            .await
            .with_context(|| format!("Failed to execute: {}", truncate_sql(statement)))?;
    }

    sqlx::query("INSERT INTO _migrations (version, name) VALUES (?, ?)")
        .bind(migration.version)
        .bind(migration.name)
        .execute(pool)
        .await?;

    Ok(())
}

/// Truncate SQL for error messages
fn truncate_sql(sql: &str) -> String {
    match sql.char_indices().nth(100) {
        Some((idx, _)) => format!("{}...", &sql[..idx]),
        None => sql.to_string(),
    }
}

/// Split SQL into individual statements, skipping comment-only fragments
fn split_sql_statements(sql: &str) -> Vec<&str> {
    sql.split(';')
        .map(str::trim)
        .filter(|stmt| !stmt.is_empty() && !is_comment_only(stmt))
        .collect()
}

/// Check if a string contains only SQL comments
fn is_comment_only(s: &str) -> bool {
    s.lines()
        .map(str::trim)
        .all(|line| line.is_empty() || line.starts_with("--"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::create_test_pool;

    async fn migrated_pool() -> DynDatabasePool {
        let pool = create_test_pool().await.expect("Failed to create test pool");
        run_migrations(&pool).await.expect("Failed to run migrations");
        pool
    }

    async fn count(pool: &DynDatabasePool, sql: &str) -> i64 {
        let row: (i64,) = sqlx::query_as(sql)
            .fetch_one(pool.as_sqlite().unwrap())
            .await
            .expect("count query");
        row.0
    }

    #[tokio::test]
    async fn test_run_migrations_is_rerunnable() {
        let pool = create_test_pool().await.expect("Failed to create test pool");

        let applied = run_migrations(&pool).await.expect("Failed to run migrations");
        assert_eq!(applied, MIGRATIONS.len());

        let applied = run_migrations(&pool).await.expect("Failed to run migrations");
        assert_eq!(applied, 0);
    }

    #[tokio::test]
    async fn test_seed_catalog() {
        let pool = migrated_pool().await;

        assert_eq!(count(&pool, "SELECT COUNT(*) FROM course_categories").await, 5);
        assert_eq!(count(&pool, "SELECT COUNT(*) FROM courses").await, 16);

        let row = sqlx::query(
            "SELECT c.description, c.level, c.duration_hours, c.is_active
             FROM courses c JOIN course_categories cat ON cat.id = c.category_id
             WHERE c.title = 'AI/ML' AND cat.name = 'AI-ML'",
        )
        .fetch_one(pool.as_sqlite().unwrap())
        .await
        .expect("seeded course");

        let description: String = row.get("description");
        let level: String = row.get("level");
        let duration: i64 = row.get("duration_hours");
        let active: bool = row.get("is_active");
        assert_eq!(description, "AI/ML course under AI-ML.");
        assert_eq!(level, "beginner");
        assert_eq!(duration, 0);
        assert!(active);
    }

    #[tokio::test]
    async fn test_seed_branding() {
        let pool = migrated_pool().await;
        let row = sqlx::query("SELECT site_name, logo_path FROM site_branding")
            .fetch_one(pool.as_sqlite().unwrap())
            .await
            .unwrap();
        let name: String = row.get("site_name");
        let logo: Option<String> = row.get("logo_path");
        assert_eq!(name, "School Of IT Skills");
        assert!(logo.is_none());
    }

    #[tokio::test]
    async fn test_category_name_unique_case_insensitive() {
        let pool = migrated_pool().await;
        let result = sqlx::query("INSERT INTO course_categories (name) VALUES ('analysis')")
            .execute(pool.as_sqlite().unwrap())
            .await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_attendance_unique_per_day() {
        let pool = migrated_pool().await;
        let sqlite = pool.as_sqlite().unwrap();

        sqlx::query("INSERT INTO users (username, password_hash) VALUES ('s', 'x')")
            .execute(sqlite)
            .await
            .unwrap();

        let insert = "INSERT OR IGNORE INTO attendance_records (student_id, course_id, attendance_date, source)
                      VALUES (1, 1, '2024-01-05', ?)";
        let first = sqlx::query(insert).bind("enroll").execute(sqlite).await.unwrap();
        let second = sqlx::query(insert).bind("enter").execute(sqlite).await.unwrap();
        assert_eq!(first.rows_affected(), 1);
        assert_eq!(second.rows_affected(), 0);

        let source: (String,) = sqlx::query_as("SELECT source FROM attendance_records")
            .fetch_one(sqlite)
            .await
            .unwrap();
        assert_eq!(source.0, "enroll");
    }

    #[tokio::test]
    async fn test_session_foreign_key() {
        let pool = migrated_pool().await;
        let result = sqlx::query(
            "INSERT INTO sessions (id, user_id, expires_at) VALUES ('abc', 999, datetime('now', '+1 day'))",
        )
        .execute(pool.as_sqlite().unwrap())
        .await;
        assert!(result.is_err());
    }

    #[test]
    fn test_split_sql_statements() {
        let statements = split_sql_statements("CREATE TABLE a (id INT); CREATE TABLE b (id INT);");
        assert_eq!(statements.len(), 2);

        let statements = split_sql_statements("-- Comment\nCREATE TABLE a (id INT);\n-- trailing\n");
        assert_eq!(statements.len(), 1);
    }

    #[test]
    fn test_is_comment_only() {
        assert!(is_comment_only("-- This is a comment"));
        assert!(is_comment_only("-- Line 1\n-- Line 2"));
        assert!(!is_comment_only("-- Comment\nCREATE TABLE test"));
    }

    #[test]
    fn test_truncate_sql() {
        let long = "x".repeat(150);
        assert_eq!(truncate_sql(&long).len(), 103);
        assert_eq!(truncate_sql("short"), "short");
    }
}
