use argon2::password_hash::{rand_core::OsRng, PasswordHasher, SaltString};
use argon2::Argon2;
use database::Database;
use tracing::{debug, info};
use ulid::Ulid;

use crate::error::{Result, UserError};
use crate::model::{NewUser, User, UserPatch};

/// Account storage operations over the shared pool.
pub struct UserStore<'a> {
    db: &'a Database,
}

impl<'a> UserStore<'a> {
    pub fn new(db: &'a Database) -> Self {
        Self { db }
    }

    /// Insert a new account. Username and email collisions surface as
    /// validation errors.
    pub async fn create(&self, new_user: NewUser) -> Result<User> {
        let id = Ulid::new().to_string();
        let password_hash = match &new_user.password {
            Some(password) => hash_password(password)?,
            None => String::new(),
        };

        sqlx::query(
            r#"
            INSERT INTO users (id, username, email, password_hash, role, bio, first_name, last_name)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&id)
        .bind(&new_user.username)
        .bind(&new_user.email)
        .bind(&password_hash)
        .bind(new_user.role.as_str())
        .bind(&new_user.bio)
        .bind(&new_user.first_name)
        .bind(&new_user.last_name)
        .execute(self.db.pool())
        .await
        .map_err(|e| UserError::from_write_conflict(e, "A user with this username or email already exists."))?;

        info!("Created user {} ({})", new_user.username, id);

        self.get_by_id(&id).await
    }

    pub async fn get_by_id(&self, id: &str) -> Result<User> {
        sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = ?")
            .bind(id)
            .fetch_optional(self.db.pool())
            .await?
            .ok_or_else(|| UserError::UserNotFound(id.to_string()))
    }

    pub async fn get_by_username(&self, username: &str) -> Result<User> {
        sqlx::query_as::<_, User>("SELECT * FROM users WHERE username = ?")
            .bind(username)
            .fetch_optional(self.db.pool())
            .await?
            .ok_or_else(|| UserError::UserNotFound(username.to_string()))
    }

    pub async fn find_by_email(&self, email: &str) -> Result<Option<User>> {
        let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE email = ?")
            .bind(email)
            .fetch_optional(self.db.pool())
            .await?;
        Ok(user)
    }

    /// Fetch the account registered for this email, creating it when none
    /// exists yet. Used by the code exchange, which must stay idempotent
    /// with respect to user creation.
    pub async fn get_or_create(&self, new_user: NewUser) -> Result<User> {
        if let Some(existing) = self.find_by_email(&new_user.email).await? {
            debug!("Exchange for already-registered email {}", existing.email);
            return Ok(existing);
        }
        self.create(new_user).await
    }

    /// List accounts, username-ordered, optionally filtered by username
    /// substring.
    pub async fn list(&self, search: Option<&str>, limit: i64, offset: i64) -> Result<Vec<User>> {
        let users = match search {
            Some(needle) => {
                sqlx::query_as::<_, User>(
                    r#"
                    SELECT * FROM users
                    WHERE username LIKE '%' || ? || '%'
                    ORDER BY username
                    LIMIT ? OFFSET ?
                    "#,
                )
                .bind(needle)
                .bind(limit)
                .bind(offset)
                .fetch_all(self.db.pool())
                .await?
            }
            None => {
                sqlx::query_as::<_, User>("SELECT * FROM users ORDER BY username LIMIT ? OFFSET ?")
                    .bind(limit)
                    .bind(offset)
                    .fetch_all(self.db.pool())
                    .await?
            }
        };
        Ok(users)
    }

    /// Apply a partial update to the account with this username. Returns the
    /// refreshed row.
    pub async fn update(&self, username: &str, patch: UserPatch) -> Result<User> {
        let user = self.get_by_username(username).await?;
        if patch.is_empty() {
            return Ok(user);
        }

        let mut set_clauses = vec!["updated_at = CURRENT_TIMESTAMP".to_string()];
        let mut values: Vec<String> = Vec::new();

        if let Some(new_username) = &patch.username {
            set_clauses.push("username = ?".to_string());
            values.push(new_username.clone());
        }
        if let Some(email) = &patch.email {
            set_clauses.push("email = ?".to_string());
            values.push(email.clone());
        }
        if let Some(first_name) = &patch.first_name {
            set_clauses.push("first_name = ?".to_string());
            values.push(first_name.clone());
        }
        if let Some(last_name) = &patch.last_name {
            set_clauses.push("last_name = ?".to_string());
            values.push(last_name.clone());
        }
        if let Some(bio) = &patch.bio {
            set_clauses.push("bio = ?".to_string());
            values.push(bio.clone());
        }
        if let Some(role) = patch.role {
            set_clauses.push("role = ?".to_string());
            values.push(role.as_str().to_string());
        }

        let sql = format!("UPDATE users SET {} WHERE id = ?", set_clauses.join(", "));
        let mut query = sqlx::query(&sql);
        for value in &values {
            query = query.bind(value);
        }
        query = query.bind(&user.id);

        query.execute(self.db.pool()).await.map_err(|e| {
            UserError::from_write_conflict(e, "A user with this username or email already exists.")
        })?;

        self.get_by_id(&user.id).await
    }

    pub async fn delete(&self, username: &str) -> Result<()> {
        let result = sqlx::query("DELETE FROM users WHERE username = ?")
            .bind(username)
            .execute(self.db.pool())
            .await?;

        if result.rows_affected() == 0 {
            return Err(UserError::UserNotFound(username.to_string()));
        }

        info!("Deleted user {}", username);
        Ok(())
    }
}

fn hash_password(password: &str) -> Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| UserError::PasswordHash(e.to_string()))?;
    Ok(hash.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use authz::Role;

    async fn test_db() -> Database {
        Database::new_in_memory().await.unwrap()
    }

    fn new_user(username: &str, email: &str) -> NewUser {
        NewUser {
            username: username.to_string(),
            email: email.to_string(),
            ..NewUser::default()
        }
    }

    #[tokio::test]
    async fn test_create_and_fetch() {
        let db = test_db().await;
        let store = UserStore::new(&db);

        let created = store.create(new_user("reader", "reader@example.com")).await.unwrap();
        assert_eq!(created.role(), Role::User);
        assert!(created.password_hash.is_empty());

        let by_username = store.get_by_username("reader").await.unwrap();
        assert_eq!(by_username.id, created.id);

        let by_email = store.find_by_email("reader@example.com").await.unwrap();
        assert_eq!(by_email.unwrap().id, created.id);
    }

    #[tokio::test]
    async fn test_duplicate_username_is_validation_error() {
        let db = test_db().await;
        let store = UserStore::new(&db);

        store.create(new_user("reader", "one@example.com")).await.unwrap();
        let err = store
            .create(new_user("reader", "two@example.com"))
            .await
            .unwrap_err();
        assert!(matches!(err, UserError::Validation(_)));
    }

    #[tokio::test]
    async fn test_get_or_create_is_idempotent() {
        let db = test_db().await;
        let store = UserStore::new(&db);

        let first = store
            .get_or_create(new_user("reader", "reader@example.com"))
            .await
            .unwrap();
        let second = store
            .get_or_create(new_user("reader", "reader@example.com"))
            .await
            .unwrap();
        assert_eq!(first.id, second.id);

        let all = store.list(None, 50, 0).await.unwrap();
        assert_eq!(all.len(), 1);
    }

    #[tokio::test]
    async fn test_password_is_hashed_on_create() {
        let db = test_db().await;
        let store = UserStore::new(&db);

        let mut fields = new_user("reader", "reader@example.com");
        fields.password = Some("hunter2".to_string());
        let user = store.create(fields).await.unwrap();

        assert!(!user.password_hash.is_empty());
        assert_ne!(user.password_hash, "hunter2");
        assert!(user.password_hash.starts_with("$argon2"));
    }

    #[tokio::test]
    async fn test_patch_updates_only_given_fields() {
        let db = test_db().await;
        let store = UserStore::new(&db);

        store.create(new_user("reader", "reader@example.com")).await.unwrap();

        let patch = UserPatch {
            bio: Some("Reads a lot.".to_string()),
            role: Some(Role::Moderator),
            ..UserPatch::default()
        };
        let updated = store.update("reader", patch).await.unwrap();

        assert_eq!(updated.bio, "Reads a lot.");
        assert_eq!(updated.role(), Role::Moderator);
        assert_eq!(updated.email, "reader@example.com");
    }

    #[tokio::test]
    async fn test_list_filters_by_username() {
        let db = test_db().await;
        let store = UserStore::new(&db);

        store.create(new_user("alpha", "a@example.com")).await.unwrap();
        store.create(new_user("beta", "b@example.com")).await.unwrap();

        let hits = store.list(Some("alp"), 50, 0).await.unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].username, "alpha");
    }

    #[tokio::test]
    async fn test_delete_missing_user() {
        let db = test_db().await;
        let store = UserStore::new(&db);
        let err = store.delete("ghost").await.unwrap_err();
        assert!(matches!(err, UserError::UserNotFound(_)));
    }
}
