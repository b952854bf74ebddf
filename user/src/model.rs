use authz::{Principal, Role};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A user account row.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct User {
    pub id: String,
    pub username: String,
    pub email: String,
    #[serde(skip_serializing, default)]
    pub password_hash: String,
    /// Stored string form of the role; use [`User::role`] for the enum.
    #[sqlx(rename = "role")]
    #[serde(rename = "role")]
    pub role_str: String,
    pub bio: String,
    pub first_name: String,
    pub last_name: String,
    pub is_staff: bool,
    pub is_superuser: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    pub fn role(&self) -> Role {
        Role::parse(&self.role_str).unwrap_or_default()
    }

    /// Authorization view of this account.
    pub fn principal(&self) -> Principal {
        Principal::authenticated(&self.id, self.role())
            .with_staff(self.is_staff)
            .with_superuser(self.is_superuser)
    }
}

/// Fields accepted when creating an account.
#[derive(Debug, Clone, Default)]
pub struct NewUser {
    pub username: String,
    pub email: String,
    /// Plain-text password; hashed before it touches storage. Accounts
    /// created through the code exchange may never set one.
    pub password: Option<String>,
    pub role: Role,
    pub bio: String,
    pub first_name: String,
    pub last_name: String,
}

/// Partial update; `None` leaves the column untouched.
#[derive(Debug, Clone, Default)]
pub struct UserPatch {
    pub username: Option<String>,
    pub email: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub bio: Option<String>,
    pub role: Option<Role>,
}

impl UserPatch {
    pub fn is_empty(&self) -> bool {
        self.username.is_none()
            && self.email.is_none()
            && self.first_name.is_none()
            && self.last_name.is_none()
            && self.bio.is_none()
            && self.role.is_none()
    }
}

/// A stored confirmation code row.
#[derive(Debug, Clone, FromRow)]
pub struct ConfirmationCode {
    pub email: String,
    pub code: String,
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_user(role: &str) -> User {
        User {
            id: "01H8XGJWBWBAQ4Z4M9D5K4Z3E1".to_string(),
            username: "reader".to_string(),
            email: "reader@example.com".to_string(),
            password_hash: String::new(),
            role_str: role.to_string(),
            bio: String::new(),
            first_name: String::new(),
            last_name: String::new(),
            is_staff: false,
            is_superuser: false,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_role_parsing_defaults_to_user() {
        assert_eq!(sample_user("moderator").role(), Role::Moderator);
        assert_eq!(sample_user("garbage").role(), Role::User);
    }

    #[test]
    fn test_principal_carries_flags() {
        let mut user = sample_user("admin");
        user.is_staff = true;
        let principal = user.principal();
        assert!(principal.authenticated);
        assert!(principal.is_admin());
        assert!(principal.is_staff);
        assert!(!principal.is_superuser);
    }
}
