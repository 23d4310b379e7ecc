//! Session model

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Server-side session, identified by the cookie value.
///
/// A session may exist before login (to remember the selected role) and is
/// bound to a user once credentials are accepted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    /// Session ID (cookie value)
    pub id: String,
    /// Authenticated user, if any
    pub user_id: Option<i64>,
    /// Small key/value bag stored as JSON
    pub data: BTreeMap<String, String>,
    /// Expiration timestamp
    pub expires_at: DateTime<Utc>,
    /// Creation timestamp
    pub created_at: DateTime<Utc>,
}

impl Session {
    /// A fresh anonymous session with a random id
    pub fn new(ttl: Duration) -> Self {
        let now = Utc::now();
        Self {
            id: generate_session_id(),
            user_id: None,
            data: BTreeMap::new(),
            expires_at: now + ttl,
            created_at: now,
        }
    }

    /// Check if the session has expired
    pub fn is_expired(&self) -> bool {
        self.expires_at < Utc::now()
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.data.get(key).map(String::as_str)
    }
}

/// Two v4 UUIDs without dashes: 64 hex characters
pub fn generate_session_id() -> String {
    format!(
        "{}{}",
        uuid::Uuid::new_v4().simple(),
        uuid::Uuid::new_v4().simple()
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_session_is_anonymous() {
        let session = Session::new(Duration::hours(1));
        assert!(session.user_id.is_none());
        assert!(session.data.is_empty());
        assert!(!session.is_expired());
        assert_eq!(session.id.len(), 64);
    }

    #[test]
    fn test_expired_session() {
        let session = Session::new(Duration::hours(-1));
        assert!(session.is_expired());
    }

    #[test]
    fn test_session_ids_differ() {
        assert_ne!(generate_session_id(), generate_session_id());
    }
}
