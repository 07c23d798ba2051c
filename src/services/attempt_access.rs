use crate::db::models::ExamAttempt;
use crate::repositories;
use crate::services::errors::AttemptError;

/// Loads an attempt owned by `user_id`. Missing and foreign attempts look the same.
pub(crate) async fn load_owned_attempt(
    executor: impl sqlx::PgExecutor<'_>,
    attempt_id: &str,
    user_id: &str,
) -> Result<ExamAttempt, AttemptError> {
    let attempt = repositories::attempts::find_by_id(executor, attempt_id).await?;
    owned_by(attempt, user_id)
}

pub(crate) fn owned_by(
    attempt: Option<ExamAttempt>,
    user_id: &str,
) -> Result<ExamAttempt, AttemptError> {
    match attempt {
        Some(attempt) if attempt.user_id == user_id => Ok(attempt),
        _ => Err(AttemptError::not_found("Attempt not found")),
    }
}
