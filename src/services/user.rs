//! User service
//!
//! Credential checks for the role login and the admin login, plus account
//! seeding at startup:
//! - three faculty and three student demo accounts
//! - an optional bootstrap administrator from configuration

use crate::config::AdminAccountConfig;
use crate::db::repositories::UserRepository;
use crate::models::{NewUser, Role, User};
use crate::services::password::{hash_password, password_matches};
use anyhow::Context;
use std::sync::Arc;

/// Error types for user service operations.
///
/// The `Display` text of the credential variants is shown on the login form.
#[derive(Debug, thiserror::Error)]
pub enum UserServiceError {
    /// Unknown user or wrong password
    #[error("Invalid username or password.")]
    InvalidCredentials,

    /// The account lacks the role selected on the portal
    #[error("This account is not a {} account.", .0.as_str().to_lowercase())]
    RoleMismatch(Role),

    /// Admin login with a non-staff account
    #[error("This account is not an administrator account.")]
    NotAdministrator,

    /// Internal error
    #[error("Internal error: {0}")]
    InternalError(#[from] anyhow::Error),
}

/// An account created (or repaired) at startup
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeedAccount {
    pub username: String,
    pub password: String,
    pub first_name: String,
    pub role: Role,
}

/// Demo accounts: `faculty1..3` / `Faculty@123` and `student1..3` / `Student@123`
pub fn default_seed_accounts() -> Vec<SeedAccount> {
    [(Role::Faculty, "Faculty@123"), (Role::Student, "Student@123")]
        .into_iter()
        .flat_map(|(role, password)| {
            (1..=3).map(move |i| SeedAccount {
                username: format!("{}{}", role.as_str().to_lowercase(), i),
                password: password.to_string(),
                first_name: format!("{}{}", role.as_str(), i),
                role,
            })
        })
        .collect()
}

/// User service for authentication and account seeding
pub struct UserService {
    user_repo: Arc<dyn UserRepository>,
}

impl UserService {
    /// Create a new user service
    pub fn new(user_repo: Arc<dyn UserRepository>) -> Self {
        Self { user_repo }
    }

    /// Get user by ID
    pub async fn get_by_id(&self, id: i64) -> Result<Option<User>, UserServiceError> {
        let user = self
            .user_repo
            .get_by_id(id)
            .await
            .context("Failed to get user by ID")?;
        Ok(user)
    }

    /// Check a username/password pair. The username is trimmed first.
    pub async fn authenticate(&self, username: &str, password: &str) -> Result<User, UserServiceError> {
        let user = self
            .user_repo
            .get_by_username(username.trim())
            .await
            .context("Failed to get user by username")?
            .ok_or(UserServiceError::InvalidCredentials)?;

        if !password_matches(password, &user.password_hash) {
            return Err(UserServiceError::InvalidCredentials);
        }

        Ok(user)
    }

    /// Role login: credentials first, then the role picked on the portal
    /// page, if any.
    pub async fn login(
        &self,
        username: &str,
        password: &str,
        selected_role: Option<Role>,
    ) -> Result<User, UserServiceError> {
        let user = self.authenticate(username, password).await?;

        if let Some(role) = selected_role {
            if !user.has_role(role) {
                tracing::debug!("Login refused for {}: lacks role {}", user.username, role);
                return Err(UserServiceError::RoleMismatch(role));
            }
        }

        Ok(user)
    }

    /// Administrative console login
    pub async fn admin_login(&self, username: &str, password: &str) -> Result<User, UserServiceError> {
        let user = self.authenticate(username, password).await?;
        if !user.is_admin() {
            return Err(UserServiceError::NotAdministrator);
        }
        Ok(user)
    }

    /// Make sure a seeded account exists with its password and role.
    ///
    /// Returns true when the account was created.
    pub async fn ensure_account(&self, account: &SeedAccount) -> Result<bool, UserServiceError> {
        let existing = self
            .user_repo
            .get_by_username(&account.username)
            .await
            .context("Failed to get user by username")?;

        let (user_id, created) = match existing {
            Some(user) => {
                if !password_matches(&account.password, &user.password_hash) {
                    tracing::info!("Resetting password of seeded account {}", user.username);
                    let hash = hash_password(&account.password)?;
                    self.user_repo
                        .set_password_hash(user.id, &hash)
                        .await
                        .context("Failed to reset password")?;
                }
                (user.id, false)
            }
            None => {
                let user = self
                    .user_repo
                    .create(&NewUser {
                        username: account.username.clone(),
                        email: format!("{}@example.com", account.username),
                        first_name: account.first_name.clone(),
                        password_hash: hash_password(&account.password)?,
                        ..Default::default()
                    })
                    .await
                    .context("Failed to create seeded account")?;
                (user.id, true)
            }
        };

        self.user_repo
            .add_role(user_id, account.role)
            .await
            .context("Failed to grant role")?;

        Ok(created)
    }

    /// Seed the demo faculty and student accounts. Returns how many were created.
    pub async fn seed_default_accounts(&self) -> Result<usize, UserServiceError> {
        let mut created = 0;
        for account in default_seed_accounts() {
            if self.ensure_account(&account).await? {
                created += 1;
            }
        }
        tracing::info!("Seeded default accounts ({} created)", created);
        Ok(created)
    }

    /// Create the configured administrator if no account with that name
    /// exists. Returns true when the account was created.
    pub async fn bootstrap_admin(&self, admin: &AdminAccountConfig) -> Result<bool, UserServiceError> {
        let username = admin.username.trim();
        if self
            .user_repo
            .get_by_username(username)
            .await
            .context("Failed to get user by username")?
            .is_some()
        {
            tracing::debug!("Administrator {} already exists", username);
            return Ok(false);
        }

        self.user_repo
            .create(&NewUser {
                username: username.to_string(),
                email: admin.email.clone().unwrap_or_default(),
                first_name: String::new(),
                password_hash: hash_password(&admin.password)?,
                is_staff: true,
                is_superuser: true,
            })
            .await
            .context("Failed to create administrator")?;

        tracing::info!("Created administrator account {}", username);
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repositories::SqlxUserRepository;
    use crate::db::{create_test_pool, migrations};

    async fn setup_test_service() -> (Arc<dyn UserRepository>, UserService) {
        let pool = create_test_pool().await.expect("Failed to create test pool");
        migrations::run_migrations(&pool)
            .await
            .expect("Failed to run migrations");
        let repo = SqlxUserRepository::boxed(pool);
        (repo.clone(), UserService::new(repo))
    }

    #[test]
    fn test_default_seed_accounts() {
        let accounts = default_seed_accounts();
        assert_eq!(accounts.len(), 6);
        assert_eq!(accounts[0].username, "faculty1");
        assert_eq!(accounts[0].first_name, "Faculty1");
        assert_eq!(accounts[0].password, "Faculty@123");
        assert_eq!(accounts[5].username, "student3");
        assert_eq!(accounts[5].role, Role::Student);
    }

    #[test]
    fn test_error_messages() {
        assert_eq!(
            UserServiceError::RoleMismatch(Role::Faculty).to_string(),
            "This account is not a faculty account."
        );
        assert_eq!(
            UserServiceError::RoleMismatch(Role::Student).to_string(),
            "This account is not a student account."
        );
        assert_eq!(
            UserServiceError::InvalidCredentials.to_string(),
            "Invalid username or password."
        );
    }

    #[tokio::test]
    async fn test_seed_is_idempotent() {
        let (repo, service) = setup_test_service().await;
        assert_eq!(service.seed_default_accounts().await.unwrap(), 6);
        assert_eq!(service.seed_default_accounts().await.unwrap(), 0);

        let faculty = repo.get_by_username("faculty2").await.unwrap().unwrap();
        assert_eq!(faculty.email, "faculty2@example.com");
        assert!(faculty.has_role(Role::Faculty));
        assert!(!faculty.has_role(Role::Student));
    }

    #[tokio::test]
    async fn test_reseed_resets_changed_password() {
        let (repo, service) = setup_test_service().await;
        let account = &default_seed_accounts()[3];
        service.ensure_account(account).await.unwrap();

        let user = repo.get_by_username("student1").await.unwrap().unwrap();
        repo.set_password_hash(user.id, &hash_password("changed").unwrap())
            .await
            .unwrap();
        assert!(service.authenticate("student1", "Student@123").await.is_err());

        service.ensure_account(account).await.unwrap();
        assert!(service.authenticate("student1", "Student@123").await.is_ok());
    }

    #[tokio::test]
    async fn test_login_checks_selected_role() {
        let (_repo, service) = setup_test_service().await;
        service.ensure_account(&default_seed_accounts()[3]).await.unwrap();

        let user = service
            .login(" student1 ", "Student@123", Some(Role::Student))
            .await
            .unwrap();
        assert_eq!(user.username, "student1");

        let err = service
            .login("student1", "Student@123", Some(Role::Faculty))
            .await
            .unwrap_err();
        assert!(matches!(err, UserServiceError::RoleMismatch(Role::Faculty)));

        let err = service.login("student1", "wrong", None).await.unwrap_err();
        assert!(matches!(err, UserServiceError::InvalidCredentials));

        let err = service.login("nobody", "Student@123", None).await.unwrap_err();
        assert!(matches!(err, UserServiceError::InvalidCredentials));
    }

    #[tokio::test]
    async fn test_admin_bootstrap_and_login() {
        let (_repo, service) = setup_test_service().await;
        let admin = AdminAccountConfig {
            username: "root".to_string(),
            password: "s3cret".to_string(),
            email: None,
        };
        assert!(service.bootstrap_admin(&admin).await.unwrap());
        assert!(!service.bootstrap_admin(&admin).await.unwrap());

        let user = service.admin_login("root", "s3cret").await.unwrap();
        assert!(user.is_staff && user.is_superuser);

        service.ensure_account(&default_seed_accounts()[0]).await.unwrap();
        let err = service.admin_login("faculty1", "Faculty@123").await.unwrap_err();
        assert!(matches!(err, UserServiceError::NotAdministrator));
    }
}
