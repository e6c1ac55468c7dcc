//! User model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// User account entity
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    /// User ID
    pub id: Uuid,
    /// Email address (unique)
    pub email: String,
    /// Argon2id password hash (PHC string format)
    #[serde(skip_serializing)]
    pub password_hash: String,
    /// Whether the email address has been verified
    pub is_verified: bool,
    /// Creation timestamp
    pub created_at: DateTime<Utc>,
    /// Last update timestamp
    pub updated_at: DateTime<Utc>,
}

impl User {
    /// Create a new unverified user with a fresh ID.
    pub fn new(email: impl Into<String>, password_hash: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            email: email.into(),
            password_hash: password_hash.into(),
            is_verified: false,
            created_at: now,
            updated_at: now,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_user_is_unverified() {
        let user = User::new("a@example.com", "$argon2id$hash");
        assert!(!user.is_verified);
        assert_eq!(user.email, "a@example.com");
    }

    #[test]
    fn test_new_users_get_distinct_ids() {
        let a = User::new("a@example.com", "h");
        let b = User::new("b@example.com", "h");
        assert_ne!(a.id, b.id);
    }

    #[test]
    fn test_password_hash_not_serialized() {
        let user = User::new("a@example.com", "super-secret-hash");
        let json = serde_json::to_string(&user).unwrap();
        assert!(!json.contains("super-secret-hash"));
    }
}
