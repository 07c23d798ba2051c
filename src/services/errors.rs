use thiserror::Error;

#[derive(Debug, Error)]
pub(crate) enum AttemptError {
    #[error("{0}")]
    NotFound(String),
    #[error("Attempt time has expired")]
    Expired,
    #[error("Cannot finish attempt: {answered} of {total} questions answered")]
    Incomplete { answered: i64, total: i64 },
    #[error("{0}")]
    BadRequest(String),
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl AttemptError {
    pub(crate) fn not_found(message: &str) -> Self {
        Self::NotFound(message.to_string())
    }
}
