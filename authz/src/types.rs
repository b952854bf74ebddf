//! Core authorization types: roles, principals, actions and resources.

use serde::{Deserialize, Serialize};

/// Site-wide role carried by every user account.
///
/// Exactly one role is held at any time. The three predicates below are
/// mutually exclusive and derive purely from the stored role; staff and
/// superuser escalations are separate flags on [`Principal`] and are never
/// consulted here.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    #[default]
    User,
    Moderator,
    Admin,
}

impl Role {
    /// Parse the stored string form. Unknown values are rejected rather than
    /// silently mapped to a default.
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "user" => Some(Role::User),
            "moderator" => Some(Role::Moderator),
            "admin" => Some(Role::Admin),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Moderator => "moderator",
            Role::Admin => "admin",
        }
    }

    pub fn is_admin(&self) -> bool {
        *self == Role::Admin
    }

    pub fn is_moderator(&self) -> bool {
        *self == Role::Moderator
    }

    pub fn is_user(&self) -> bool {
        *self == Role::User
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The actor making a request: an authenticated account or the anonymous
/// visitor.
///
/// Principals must be derived from a verified credential only; never build
/// one from untrusted request data.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Principal {
    /// User id (ULID) for authenticated principals, "anonymous" otherwise.
    pub id: String,

    pub role: Role,

    /// Staff escalation, orthogonal to role.
    pub is_staff: bool,

    /// Superuser escalation, orthogonal to role.
    pub is_superuser: bool,

    pub authenticated: bool,
}

impl Principal {
    /// Principal for a verified user account.
    pub fn authenticated(id: impl Into<String>, role: Role) -> Self {
        Self {
            id: id.into(),
            role,
            is_staff: false,
            is_superuser: false,
            authenticated: true,
        }
    }

    /// The unauthenticated visitor.
    pub fn anonymous() -> Self {
        Self {
            id: "anonymous".to_string(),
            role: Role::User,
            is_staff: false,
            is_superuser: false,
            authenticated: false,
        }
    }

    pub fn with_staff(mut self, is_staff: bool) -> Self {
        self.is_staff = is_staff;
        self
    }

    pub fn with_superuser(mut self, is_superuser: bool) -> Self {
        self.is_superuser = is_superuser;
        self
    }

    pub fn is_admin(&self) -> bool {
        self.role.is_admin()
    }

    pub fn is_moderator(&self) -> bool {
        self.role.is_moderator()
    }

    pub fn is_user(&self) -> bool {
        self.role.is_user()
    }
}

/// The operation being attempted.
///
/// `List` and `Retrieve` are the safe methods; everything else mutates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    List,
    Retrieve,
    Create,
    Update,
    PartialUpdate,
    Delete,
}

impl Action {
    pub fn is_safe(&self) -> bool {
        matches!(self, Action::List | Action::Retrieve)
    }
}

/// Snapshot of an already-loaded target object.
///
/// Object-level rules only need the owner, so this carries the author id
/// when the underlying record has one. Collection-level checks pass no
/// resource at all.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Resource {
    pub id: String,

    /// The kind of resource (e.g. "review", "comment", "user").
    pub kind: String,

    /// Owning user id, when the record has an author.
    pub author: Option<String>,
}

impl Resource {
    pub fn new(id: impl Into<String>, kind: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            kind: kind.into(),
            author: None,
        }
    }

    pub fn authored(
        id: impl Into<String>,
        kind: impl Into<String>,
        author: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            kind: kind.into(),
            author: Some(author.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_predicates_are_exclusive() {
        for role in [Role::User, Role::Moderator, Role::Admin] {
            let set = [role.is_user(), role.is_moderator(), role.is_admin()];
            assert_eq!(set.iter().filter(|v| **v).count(), 1);
        }
    }

    #[test]
    fn test_role_round_trip() {
        for role in [Role::User, Role::Moderator, Role::Admin] {
            assert_eq!(Role::parse(role.as_str()), Some(role));
        }
        assert_eq!(Role::parse("owner"), None);
    }

    #[test]
    fn test_principal_predicates_ignore_flags() {
        let principal = Principal::authenticated("01H8XGJWBWBAQ4Z4M9D5K4Z3E1", Role::User)
            .with_staff(true)
            .with_superuser(true);
        assert!(principal.is_user());
        assert!(!principal.is_admin());
        assert!(!principal.is_moderator());
    }

    #[test]
    fn test_anonymous_principal() {
        let principal = Principal::anonymous();
        assert!(!principal.authenticated);
        assert_eq!(principal.id, "anonymous");
    }

    #[test]
    fn test_safe_actions() {
        assert!(Action::List.is_safe());
        assert!(Action::Retrieve.is_safe());
        for action in [
            Action::Create,
            Action::Update,
            Action::PartialUpdate,
            Action::Delete,
        ] {
            assert!(!action.is_safe());
        }
    }

    #[test]
    fn test_resource_creation() {
        let resource = Resource::authored("42", "review", "user_a");
        assert_eq!(resource.kind, "review");
        assert_eq!(resource.author.as_deref(), Some("user_a"));

        let bare = Resource::new("slug", "category");
        assert!(bare.author.is_none());
    }
}
