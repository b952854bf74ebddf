use thiserror::Error;

pub type Result<T> = std::result::Result<T, CatalogError>;

#[derive(Error, Debug)]
pub enum CatalogError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("{0}")]
    Validation(String),
}

impl CatalogError {
    /// Map a failed insert onto a validation error when the cause is a
    /// uniqueness conflict, keeping the raw database error otherwise.
    pub fn from_write_conflict(err: sqlx::Error, message: &str) -> Self {
        match &err {
            sqlx::Error::Database(db_err) if db_err.is_unique_violation() => {
                CatalogError::Validation(message.to_string())
            }
            _ => CatalogError::Database(err),
        }
    }
}
