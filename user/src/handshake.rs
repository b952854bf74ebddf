//! Email confirmation-code handshake.
//!
//! Registration is a two-step state machine keyed by email address:
//! issuing a code (which invalidates any earlier code for the same email)
//! and exchanging a matching code for an account plus a signed credential
//! pair. Codes carry no expiry; the only invalidation is overwrite by
//! reissue. A successful exchange leaves the code in place so the call
//! stays idempotent.

use database::Database;
use rand::RngCore;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{Result, UserError};
use crate::mailer::Mailer;
use crate::model::{ConfirmationCode, NewUser, User};
use crate::store::UserStore;
use crate::token::{self, TokenConfig, TokenPair};

/// Input for the token exchange step.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExchangeRequest {
    pub username: String,
    pub email: String,
    pub confirmation_code: String,
    #[serde(default)]
    pub password: Option<String>,
}

/// Confirmation-code operations over the shared pool.
pub struct Handshake<'a> {
    db: &'a Database,
}

impl<'a> Handshake<'a> {
    pub fn new(db: &'a Database) -> Self {
        Self { db }
    }

    /// Issue a fresh code for the email, replacing any earlier one, and
    /// hand it to the mailer for out-of-band delivery. Returns the
    /// issuance message; delivery failures never surface here.
    pub async fn request_code(&self, mailer: &Mailer, email: &str) -> Result<String> {
        let email = email.trim();
        if !is_valid_email(email) {
            return Err(UserError::Validation("Enter a valid email address.".to_string()));
        }

        // One live code per email: a reissue invalidates the old one.
        sqlx::query("DELETE FROM confirmation_codes WHERE email = ?")
            .bind(email)
            .execute(self.db.pool())
            .await?;

        let code = generate_code();

        sqlx::query("INSERT INTO confirmation_codes (email, code) VALUES (?, ?)")
            .bind(email)
            .bind(&code)
            .execute(self.db.pool())
            .await?;

        info!("Issued confirmation code for {}", email);

        mailer.dispatch_code(email, &code);

        Ok(format!(
            "A message was sent to {email} with a confirmation code."
        ))
    }

    /// Compare a supplied code against the stored one. The stored code is
    /// left untouched in every outcome.
    pub async fn verify_code(&self, email: &str, code: &str) -> Result<()> {
        let stored = self
            .stored_code(email)
            .await?
            .ok_or_else(|| UserError::CodeNotFound(email.to_string()))?;

        if stored.code != code {
            debug!("Confirmation code mismatch for {}", email);
            return Err(UserError::Validation(
                "Confirmation code is not valid".to_string(),
            ));
        }

        Ok(())
    }

    /// Exchange a verified code for an account and a fresh credential pair.
    /// Account creation is get-or-create keyed by email, so retries after a
    /// completed registration succeed rather than tripping a uniqueness
    /// conflict.
    pub async fn exchange(
        &self,
        token_config: &TokenConfig,
        request: ExchangeRequest,
    ) -> Result<(User, TokenPair)> {
        self.verify_code(&request.email, &request.confirmation_code)
            .await?;

        let store = UserStore::new(self.db);
        let user = store
            .get_or_create(NewUser {
                username: request.username,
                email: request.email,
                password: request.password,
                ..NewUser::default()
            })
            .await?;

        let pair = token::issue_pair(token_config, &user.id)?;
        info!("Issued credential pair for {}", user.username);

        Ok((user, pair))
    }

    pub async fn stored_code(&self, email: &str) -> Result<Option<ConfirmationCode>> {
        let row = sqlx::query_as::<_, ConfirmationCode>(
            "SELECT * FROM confirmation_codes WHERE email = ?",
        )
        .bind(email)
        .fetch_optional(self.db.pool())
        .await?;
        Ok(row)
    }
}

/// Generate an opaque single-use code: 16 random bytes, hex-encoded.
fn generate_code() -> String {
    let mut bytes = [0u8; 16];
    rand::thread_rng().fill_bytes(&mut bytes);
    hex::encode(bytes)
}

/// Minimal structural check; the real proof of ownership is the code
/// round-trip itself.
fn is_valid_email(email: &str) -> bool {
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };
    !local.is_empty()
        && !domain.is_empty()
        && domain.contains('.')
        && !domain.starts_with('.')
        && !domain.ends_with('.')
        && !email.chars().any(char::is_whitespace)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mailer::MailerConfig;

    async fn test_db() -> Database {
        Database::new_in_memory().await.unwrap()
    }

    fn mailer() -> Mailer {
        // Points at a closed local port; dispatch is fire-and-forget, so
        // issuance must succeed anyway.
        Mailer::new(MailerConfig::default())
    }

    fn token_config() -> TokenConfig {
        TokenConfig::new("test-secret")
    }

    #[test]
    fn test_generate_code_shape() {
        let code = generate_code();
        assert_eq!(code.len(), 32);
        assert!(code.chars().all(|c| c.is_ascii_hexdigit()));
        assert_ne!(code, generate_code());
    }

    #[test]
    fn test_email_validation() {
        assert!(is_valid_email("reader@example.com"));
        assert!(!is_valid_email("reader"));
        assert!(!is_valid_email("@example.com"));
        assert!(!is_valid_email("reader@"));
        assert!(!is_valid_email("reader@example"));
        assert!(!is_valid_email("rea der@example.com"));
    }

    #[tokio::test]
    async fn test_malformed_email_is_rejected() {
        let db = test_db().await;
        let handshake = Handshake::new(&db);
        let err = handshake
            .request_code(&mailer(), "not-an-email")
            .await
            .unwrap_err();
        assert!(matches!(err, UserError::Validation(_)));
    }

    #[tokio::test]
    async fn test_reissue_replaces_old_code() {
        let db = test_db().await;
        let handshake = Handshake::new(&db);

        handshake
            .request_code(&mailer(), "reader@example.com")
            .await
            .unwrap();
        let first = handshake
            .stored_code("reader@example.com")
            .await
            .unwrap()
            .unwrap();

        handshake
            .request_code(&mailer(), "reader@example.com")
            .await
            .unwrap();
        let second = handshake
            .stored_code("reader@example.com")
            .await
            .unwrap()
            .unwrap();

        assert_ne!(first.code, second.code);

        // Exactly one live row, and the old value no longer verifies.
        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM confirmation_codes WHERE email = ?")
                .bind("reader@example.com")
                .fetch_one(db.pool())
                .await
                .unwrap();
        assert_eq!(count, 1);

        let err = handshake
            .verify_code("reader@example.com", &first.code)
            .await
            .unwrap_err();
        assert!(matches!(err, UserError::Validation(_)));
        handshake
            .verify_code("reader@example.com", &second.code)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_verify_without_issuance() {
        let db = test_db().await;
        let handshake = Handshake::new(&db);
        let err = handshake
            .verify_code("ghost@example.com", "0000")
            .await
            .unwrap_err();
        assert!(matches!(err, UserError::CodeNotFound(_)));
    }

    #[tokio::test]
    async fn test_mismatch_leaves_stored_code_valid() {
        let db = test_db().await;
        let handshake = Handshake::new(&db);

        handshake
            .request_code(&mailer(), "reader@example.com")
            .await
            .unwrap();
        let stored = handshake
            .stored_code("reader@example.com")
            .await
            .unwrap()
            .unwrap();

        let err = handshake
            .verify_code("reader@example.com", "wrong-code")
            .await
            .unwrap_err();
        assert!(matches!(err, UserError::Validation(_)));

        // The correct code still works afterwards.
        handshake
            .verify_code("reader@example.com", &stored.code)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_exchange_creates_user_and_is_idempotent() {
        let db = test_db().await;
        let handshake = Handshake::new(&db);

        handshake
            .request_code(&mailer(), "reader@example.com")
            .await
            .unwrap();
        let code = handshake
            .stored_code("reader@example.com")
            .await
            .unwrap()
            .unwrap()
            .code;

        let request = ExchangeRequest {
            username: "reader".to_string(),
            email: "reader@example.com".to_string(),
            confirmation_code: code,
            password: None,
        };

        let (user, pair) = handshake
            .exchange(&token_config(), request.clone())
            .await
            .unwrap();
        assert_eq!(user.username, "reader");
        assert!(!pair.access.is_empty());
        assert!(!pair.refresh.is_empty());

        // Replaying the exchange neither fails nor duplicates the account.
        let (again, second_pair) = handshake
            .exchange(&token_config(), request)
            .await
            .unwrap();
        assert_eq!(again.id, user.id);
        assert!(!second_pair.access.is_empty());

        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users")
            .fetch_one(db.pool())
            .await
            .unwrap();
        assert_eq!(count, 1);
    }

    #[tokio::test]
    async fn test_exchange_with_wrong_code() {
        let db = test_db().await;
        let handshake = Handshake::new(&db);

        handshake
            .request_code(&mailer(), "reader@example.com")
            .await
            .unwrap();

        let err = handshake
            .exchange(
                &token_config(),
                ExchangeRequest {
                    username: "reader".to_string(),
                    email: "reader@example.com".to_string(),
                    confirmation_code: "ffffffffffffffffffffffffffffffff".to_string(),
                    password: None,
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, UserError::Validation(_)));

        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users")
            .fetch_one(db.pool())
            .await
            .unwrap();
        assert_eq!(count, 0);
    }
}
