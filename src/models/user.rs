//! User model
//!
//! Accounts carry a set of named roles plus the staff/superuser flags used by
//! the administrative console.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

/// A registered account.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    /// Unique identifier
    pub id: i64,
    /// Username (unique)
    pub username: String,
    /// Email address
    pub email: String,
    /// Display first name
    pub first_name: String,
    /// Password hash (argon2 PHC string)
    #[serde(skip_serializing)]
    pub password_hash: String,
    /// May use the administrative console
    pub is_staff: bool,
    /// Unrestricted administrator
    pub is_superuser: bool,
    /// Named roles held by this account
    pub roles: BTreeSet<Role>,
    /// Creation timestamp
    pub created_at: DateTime<Utc>,
}

impl User {
    /// Check whether the account holds `role`
    pub fn has_role(&self, role: Role) -> bool {
        self.roles.contains(&role)
    }

    /// Staff or superuser accounts are administrators
    pub fn is_admin(&self) -> bool {
        self.is_staff || self.is_superuser
    }
}

/// Named role granted to an account.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Role {
    Faculty,
    Student,
}

impl Role {
    /// The role a guard falls back to when this one is missing
    pub fn other(self) -> Role {
        match self {
            Role::Faculty => Role::Student,
            Role::Student => Role::Faculty,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Faculty => "Faculty",
            Role::Student => "Student",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "faculty" => Ok(Role::Faculty),
            "student" => Ok(Role::Student),
            _ => Err(anyhow::anyhow!("Invalid role: {}", s)),
        }
    }
}

/// Fields needed to insert an account (password already hashed)
#[derive(Debug, Clone, Default)]
pub struct NewUser {
    pub username: String,
    pub email: String,
    pub first_name: String,
    pub password_hash: String,
    pub is_staff: bool,
    pub is_superuser: bool,
}
