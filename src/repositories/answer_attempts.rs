use time::PrimitiveDateTime;

use crate::db::models::AnswerAttempt;

pub(crate) const COLUMNS: &str = "id, attempt_id, question_id, created_at, updated_at";

/// Row-locks the record so concurrent writers for the same question queue up.
pub(crate) async fn find_for_update(
    executor: impl sqlx::PgExecutor<'_>,
    attempt_id: &str,
    question_id: &str,
) -> Result<Option<AnswerAttempt>, sqlx::Error> {
    sqlx::query_as::<_, AnswerAttempt>(&format!(
        "SELECT {COLUMNS} FROM answer_attempts
         WHERE attempt_id = $1 AND question_id = $2
         FOR UPDATE"
    ))
    .bind(attempt_id)
    .bind(question_id)
    .fetch_optional(executor)
    .await
}

pub(crate) async fn find_for_question(
    executor: impl sqlx::PgExecutor<'_>,
    attempt_id: &str,
    question_id: &str,
) -> Result<Option<AnswerAttempt>, sqlx::Error> {
    sqlx::query_as::<_, AnswerAttempt>(&format!(
        "SELECT {COLUMNS} FROM answer_attempts WHERE attempt_id = $1 AND question_id = $2"
    ))
    .bind(attempt_id)
    .bind(question_id)
    .fetch_optional(executor)
    .await
}

/// Callers hold the attempt lock, so the `(attempt_id, question_id)` key is free.
pub(crate) async fn create(
    executor: impl sqlx::PgExecutor<'_>,
    id: &str,
    attempt_id: &str,
    question_id: &str,
    now: PrimitiveDateTime,
) -> Result<AnswerAttempt, sqlx::Error> {
    sqlx::query_as::<_, AnswerAttempt>(&format!(
        "INSERT INTO answer_attempts (id, attempt_id, question_id, created_at, updated_at)
         VALUES ($1, $2, $3, $4, $4)
         RETURNING {COLUMNS}"
    ))
    .bind(id)
    .bind(attempt_id)
    .bind(question_id)
    .bind(now)
    .fetch_one(executor)
    .await
}

pub(crate) async fn list_answer_ids(
    executor: impl sqlx::PgExecutor<'_>,
    answer_attempt_id: &str,
) -> Result<Vec<String>, sqlx::Error> {
    sqlx::query_scalar::<_, String>(
        "SELECT answer_id FROM answer_attempt_answers
         WHERE answer_attempt_id = $1
         ORDER BY answer_id",
    )
    .bind(answer_attempt_id)
    .fetch_all(executor)
    .await
}

pub(crate) async fn clear_answers(
    executor: impl sqlx::PgExecutor<'_>,
    answer_attempt_id: &str,
) -> Result<(), sqlx::Error> {
    sqlx::query("DELETE FROM answer_attempt_answers WHERE answer_attempt_id = $1")
        .bind(answer_attempt_id)
        .execute(executor)
        .await?;
    Ok(())
}

pub(crate) async fn insert_answers(
    executor: impl sqlx::PgExecutor<'_>,
    answer_attempt_id: &str,
    answer_ids: &[String],
) -> Result<(), sqlx::Error> {
    if answer_ids.is_empty() {
        return Ok(());
    }

    sqlx::query(
        "INSERT INTO answer_attempt_answers (answer_attempt_id, answer_id)
         SELECT $1, answer_id FROM UNNEST($2::text[]) AS t(answer_id)
         ON CONFLICT DO NOTHING",
    )
    .bind(answer_attempt_id)
    .bind(answer_ids)
    .execute(executor)
    .await?;
    Ok(())
}

pub(crate) async fn touch(
    executor: impl sqlx::PgExecutor<'_>,
    answer_attempt_id: &str,
    now: PrimitiveDateTime,
) -> Result<(), sqlx::Error> {
    sqlx::query("UPDATE answer_attempts SET updated_at = $1 WHERE id = $2")
        .bind(now)
        .bind(answer_attempt_id)
        .execute(executor)
        .await?;
    Ok(())
}

pub(crate) async fn count_by_attempt(
    executor: impl sqlx::PgExecutor<'_>,
    attempt_id: &str,
) -> Result<i64, sqlx::Error> {
    sqlx::query_scalar("SELECT COUNT(*) FROM answer_attempts WHERE attempt_id = $1")
        .bind(attempt_id)
        .fetch_one(executor)
        .await
}

pub(crate) async fn list_answered_question_ids(
    executor: impl sqlx::PgExecutor<'_>,
    attempt_id: &str,
) -> Result<Vec<String>, sqlx::Error> {
    sqlx::query_scalar::<_, String>(
        "SELECT question_id FROM answer_attempts WHERE attempt_id = $1 ORDER BY question_id",
    )
    .bind(attempt_id)
    .fetch_all(executor)
    .await
}

/// Every `(question_id, answer_id)` selection recorded for an attempt. Answer
/// attempts with an empty selection contribute a `(question_id, None)` row so
/// they still count as answered.
pub(crate) async fn list_selections(
    executor: impl sqlx::PgExecutor<'_>,
    attempt_id: &str,
) -> Result<Vec<(String, Option<String>)>, sqlx::Error> {
    sqlx::query_as::<_, (String, Option<String>)>(
        "SELECT aa.question_id, aaa.answer_id
         FROM answer_attempts aa
         LEFT JOIN answer_attempt_answers aaa ON aaa.answer_attempt_id = aa.id
         WHERE aa.attempt_id = $1",
    )
    .bind(attempt_id)
    .fetch_all(executor)
    .await
}
