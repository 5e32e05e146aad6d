use thiserror::Error;

/// Failure kinds a store backend can signal
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    /// A uniqueness constraint rejected the write
    #[error("duplicate key: {0}")]
    DuplicateKey(String),

    #[error("{0}")]
    Backend(String),
}

pub type StoreResult<T> = Result<T, StoreError>;

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        if let sqlx::Error::Database(db_err) = &err {
            if db_err.is_unique_violation() {
                return StoreError::DuplicateKey(
                    db_err
                        .constraint()
                        .unwrap_or_else(|| db_err.message())
                        .to_string(),
                );
            }
        }
        StoreError::Backend(err.to_string())
    }
}
