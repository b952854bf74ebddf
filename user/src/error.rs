use thiserror::Error;

#[derive(Error, Debug)]
pub enum UserError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("User not found: {0}")]
    UserNotFound(String),

    #[error("No confirmation code issued for: {0}")]
    CodeNotFound(String),

    #[error("{0}")]
    Validation(String),

    #[error("Invalid token: {0}")]
    InvalidToken(String),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Password hashing error: {0}")]
    PasswordHash(String),
}

impl UserError {
    /// Map a failed insert/update onto a domain error when the cause is a
    /// uniqueness conflict, keeping the raw database error otherwise.
    pub fn from_write_conflict(err: sqlx::Error, message: &str) -> Self {
        match &err {
            sqlx::Error::Database(db_err) if db_err.is_unique_violation() => {
                UserError::Validation(message.to_string())
            }
            _ => UserError::Database(err),
        }
    }
}

pub type Result<T> = std::result::Result<T, UserError>;
