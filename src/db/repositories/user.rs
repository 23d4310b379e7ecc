//! User repository
//!
//! Database operations for accounts and their role rows.
//!
//! This module provides:
//! - `UserRepository` trait defining the interface for account data access
//! - `SqlxUserRepository` implementing the trait for SQLite and MySQL

use crate::config::DatabaseDriver;
use crate::db::DynDatabasePool;
use crate::models::{NewUser, Role, User};
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use sqlx::{MySqlPool, Row, SqlitePool};
use std::collections::BTreeSet;
use std::sync::Arc;

/// User repository trait
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Create a new account (without roles)
    async fn create(&self, user: &NewUser) -> Result<User>;

    /// Get account by ID, roles included
    async fn get_by_id(&self, id: i64) -> Result<Option<User>>;

    /// Get account by exact username, roles included
    async fn get_by_username(&self, username: &str) -> Result<Option<User>>;

    /// Replace the stored password hash
    async fn set_password_hash(&self, id: i64, password_hash: &str) -> Result<()>;

    /// Grant a role; granting a held role is a no-op
    async fn add_role(&self, id: i64, role: Role) -> Result<()>;
}

/// SQLx-based user repository implementation
pub struct SqlxUserRepository {
    pool: DynDatabasePool,
}

impl SqlxUserRepository {
    /// Create a new SQLx user repository
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    /// Create a boxed repository for use with dependency injection
    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn UserRepository> {
        Arc::new(Self::new(pool))
    }
}

#[async_trait]
impl UserRepository for SqlxUserRepository {
    async fn create(&self, user: &NewUser) -> Result<User> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => create_user_sqlite(self.pool.as_sqlite().unwrap(), user).await,
            DatabaseDriver::Mysql => create_user_mysql(self.pool.as_mysql().unwrap(), user).await,
        }
    }

    async fn get_by_id(&self, id: i64) -> Result<Option<User>> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => get_user_by_id_sqlite(self.pool.as_sqlite().unwrap(), id).await,
            DatabaseDriver::Mysql => get_user_by_id_mysql(self.pool.as_mysql().unwrap(), id).await,
        }
    }

    async fn get_by_username(&self, username: &str) -> Result<Option<User>> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                get_user_by_username_sqlite(self.pool.as_sqlite().unwrap(), username).await
            }
            DatabaseDriver::Mysql => {
                get_user_by_username_mysql(self.pool.as_mysql().unwrap(), username).await
            }
        }
    }

    async fn set_password_hash(&self, id: i64, password_hash: &str) -> Result<()> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                set_password_hash_sqlite(self.pool.as_sqlite().unwrap(), id, password_hash).await
            }
            DatabaseDriver::Mysql => {
                set_password_hash_mysql(self.pool.as_mysql().unwrap(), id, password_hash).await
            }
        }
    }

    async fn add_role(&self, id: i64, role: Role) -> Result<()> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => add_role_sqlite(self.pool.as_sqlite().unwrap(), id, role).await,
            DatabaseDriver::Mysql => add_role_mysql(self.pool.as_mysql().unwrap(), id, role).await,
        }
    }
}

/// Unknown role names in the table are skipped
fn parse_roles(names: Vec<String>) -> BTreeSet<Role> {
    names
        .iter()
        .filter_map(|name| match name.parse::<Role>() {
            Ok(role) => Some(role),
            Err(_) => {
                tracing::warn!("Ignoring unknown role in database: {}", name);
                None
            }
        })
        .collect()
}

// ============================================================================
// SQLite implementations
// ============================================================================

async fn create_user_sqlite(pool: &SqlitePool, user: &NewUser) -> Result<User> {
    let now = Utc::now();

    let result = sqlx::query(
        r#"
        INSERT INTO users (username, email, first_name, password_hash, is_staff, is_superuser, created_at)
        VALUES (?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&user.username)
    .bind(&user.email)
    .bind(&user.first_name)
    .bind(&user.password_hash)
    .bind(user.is_staff)
    .bind(user.is_superuser)
    .bind(now)
    .execute(pool)
    .await
    .with_context(|| format!("Failed to create user {}", user.username))?;

    Ok(User {
        id: result.last_insert_rowid(),
        username: user.username.clone(),
        email: user.email.clone(),
        first_name: user.first_name.clone(),
        password_hash: user.password_hash.clone(),
        is_staff: user.is_staff,
        is_superuser: user.is_superuser,
        roles: BTreeSet::new(),
        created_at: now,
    })
}

const USER_COLUMNS: &str =
    "id, username, email, first_name, password_hash, is_staff, is_superuser, created_at";

async fn get_user_by_id_sqlite(pool: &SqlitePool, id: i64) -> Result<Option<User>> {
    let row = sqlx::query(&format!("SELECT {} FROM users WHERE id = ?", USER_COLUMNS))
        .bind(id)
        .fetch_optional(pool)
        .await
        .context("Failed to get user by ID")?;

    match row {
        Some(row) => Ok(Some(row_to_user_sqlite(pool, &row).await?)),
        None => Ok(None),
    }
}

async fn get_user_by_username_sqlite(pool: &SqlitePool, username: &str) -> Result<Option<User>> {
    let row = sqlx::query(&format!("SELECT {} FROM users WHERE username = ?", USER_COLUMNS))
        .bind(username)
        .fetch_optional(pool)
        .await
        .context("Failed to get user by username")?;

    match row {
        Some(row) => Ok(Some(row_to_user_sqlite(pool, &row).await?)),
        None => Ok(None),
    }
}

async fn set_password_hash_sqlite(pool: &SqlitePool, id: i64, password_hash: &str) -> Result<()> {
    sqlx::query("UPDATE users SET password_hash = ? WHERE id = ?")
        .bind(password_hash)
        .bind(id)
        .execute(pool)
        .await
        .context("Failed to update password")?;
    Ok(())
}

async fn add_role_sqlite(pool: &SqlitePool, id: i64, role: Role) -> Result<()> {
    sqlx::query("INSERT OR IGNORE INTO user_roles (user_id, role) VALUES (?, ?)")
        .bind(id)
        .bind(role.as_str())
        .execute(pool)
        .await
        .context("Failed to add role")?;
    Ok(())
}

async fn load_roles_sqlite(pool: &SqlitePool, id: i64) -> Result<BTreeSet<Role>> {
    let names: Vec<String> = sqlx::query_scalar("SELECT role FROM user_roles WHERE user_id = ?")
        .bind(id)
        .fetch_all(pool)
        .await
        .context("Failed to load user roles")?;
    Ok(parse_roles(names))
}

async fn row_to_user_sqlite(pool: &SqlitePool, row: &sqlx::sqlite::SqliteRow) -> Result<User> {
    let id: i64 = row.get("id");
    Ok(User {
        id,
        username: row.get("username"),
        email: row.get("email"),
        first_name: row.get("first_name"),
        password_hash: row.get("password_hash"),
        is_staff: row.get("is_staff"),
        is_superuser: row.get("is_superuser"),
        roles: load_roles_sqlite(pool, id).await?,
        created_at: row.get("created_at"),
    })
}

// ============================================================================
// MySQL implementations
// ============================================================================

async fn create_user_mysql(pool: &MySqlPool, user: &NewUser) -> Result<User> {
    let now = Utc::now();

    let result = sqlx::query(
        r#"
        INSERT INTO users (username, email, first_name, password_hash, is_staff, is_superuser, created_at)
        VALUES (?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&user.username)
    .bind(&user.email)
    .bind(&user.first_name)
    .bind(&user.password_hash)
    .bind(user.is_staff)
    .bind(user.is_superuser)
    .bind(now)
    .execute(pool)
    .await
    .with_context(|| format!("Failed to create user {}", user.username))?;

    Ok(User {
        id: result.last_insert_id() as i64,
        username: user.username.clone(),
        email: user.email.clone(),
        first_name: user.first_name.clone(),
        password_hash: user.password_hash.clone(),
        is_staff: user.is_staff,
        is_superuser: user.is_superuser,
        roles: BTreeSet::new(),
        created_at: now,
    })
}

async fn get_user_by_id_mysql(pool: &MySqlPool, id: i64) -> Result<Option<User>> {
    let row = sqlx::query(&format!("SELECT {} FROM users WHERE id = ?", USER_COLUMNS))
        .bind(id)
        .fetch_optional(pool)
        .await
        .context("Failed to get user by ID")?;

    match row {
        Some(row) => Ok(Some(row_to_user_mysql(pool, &row).await?)),
        None => Ok(None),
    }
}

async fn get_user_by_username_mysql(pool: &MySqlPool, username: &str) -> Result<Option<User>> {
    let row = sqlx::query(&format!("SELECT {} FROM users WHERE username = ?", USER_COLUMNS))
        .bind(username)
        .fetch_optional(pool)
        .await
        .context("Failed to get user by username")?;

    match row {
        Some(row) => Ok(Some(row_to_user_mysql(pool, &row).await?)),
        None => Ok(None),
    }
}

async fn set_password_hash_mysql(pool: &MySqlPool, id: i64, password_hash: &str) -> Result<()> {
    sqlx::query("UPDATE users SET password_hash = ? WHERE id = ?")
        .bind(password_hash)
        .bind(id)
        .execute(pool)
        .await
        .context("Failed to update password")?;
    Ok(())
}

async fn add_role_mysql(pool: &MySqlPool, id: i64, role: Role) -> Result<()> {
    sqlx::query("INSERT IGNORE INTO user_roles (user_id, role) VALUES (?, ?)")
        .bind(id)
        .bind(role.as_str())
        .execute(pool)
        .await
        .context("Failed to add role")?;
    Ok(())
}

async fn load_roles_mysql(pool: &MySqlPool, id: i64) -> Result<BTreeSet<Role>> {
    let names: Vec<String> = sqlx::query_scalar("SELECT role FROM user_roles WHERE user_id = ?")
        .bind(id)
        .fetch_all(pool)
        .await
        .context("Failed to load user roles")?;
    Ok(parse_roles(names))
}

async fn row_to_user_mysql(pool: &MySqlPool, row: &sqlx::mysql::MySqlRow) -> Result<User> {
    let id: i64 = row.get("id");
    Ok(User {
        id,
        username: row.get("username"),
        email: row.get("email"),
        first_name: row.get("first_name"),
        password_hash: row.get("password_hash"),
        is_staff: row.get("is_staff"),
        is_superuser: row.get("is_superuser"),
        roles: load_roles_mysql(pool, id).await?,
        created_at: row.get("created_at"),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{create_test_pool, migrations};

    async fn setup_test_repo() -> (DynDatabasePool, SqlxUserRepository) {
        let pool = create_test_pool().await.expect("Failed to create test pool");
        migrations::run_migrations(&pool)
            .await
            .expect("Failed to run migrations");
        let repo = SqlxUserRepository::new(pool.clone());
        (pool, repo)
    }

    fn new_user(username: &str) -> NewUser {
        NewUser {
            username: username.to_string(),
            email: format!("{}@example.com", username),
            first_name: "Test".to_string(),
            password_hash: "hash".to_string(),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_create_and_get_user() {
        let (_pool, repo) = setup_test_repo().await;
        let created = repo.create(&new_user("alice")).await.expect("create");
        assert!(created.id > 0);
        assert!(created.roles.is_empty());

        let found = repo.get_by_username("alice").await.unwrap().expect("found");
        assert_eq!(found.id, created.id);
        assert_eq!(found.email, "alice@example.com");
        assert_eq!(found.first_name, "Test");
        assert!(!found.is_staff);

        assert!(repo.get_by_username("bob").await.unwrap().is_none());
        assert!(repo.get_by_id(9999).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_duplicate_username_rejected() {
        let (_pool, repo) = setup_test_repo().await;
        repo.create(&new_user("alice")).await.unwrap();
        assert!(repo.create(&new_user("alice")).await.is_err());
    }

    #[tokio::test]
    async fn test_add_role_is_idempotent() {
        let (_pool, repo) = setup_test_repo().await;
        let user = repo.create(&new_user("carol")).await.unwrap();

        repo.add_role(user.id, Role::Faculty).await.unwrap();
        repo.add_role(user.id, Role::Faculty).await.unwrap();
        repo.add_role(user.id, Role::Student).await.unwrap();

        let found = repo.get_by_id(user.id).await.unwrap().unwrap();
        assert_eq!(found.roles.len(), 2);
        assert!(found.has_role(Role::Faculty));
        assert!(found.has_role(Role::Student));
    }

    #[tokio::test]
    async fn test_set_password_hash() {
        let (_pool, repo) = setup_test_repo().await;
        let user = repo.create(&new_user("dave")).await.unwrap();
        repo.set_password_hash(user.id, "new-hash").await.unwrap();

        let found = repo.get_by_id(user.id).await.unwrap().unwrap();
        assert_eq!(found.password_hash, "new-hash");
    }
}
