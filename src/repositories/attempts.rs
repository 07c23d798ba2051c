use sqlx::{PgPool, Postgres, QueryBuilder};
use time::PrimitiveDateTime;

use crate::db::models::ExamAttempt;
use crate::db::types::{AttemptMode, AttemptStatus};

pub(crate) const COLUMNS: &str =
    "id, user_id, created_at, duration_minutes, grade, status, mode, finished_at";

pub(crate) struct CreateAttempt<'a> {
    pub(crate) id: &'a str,
    pub(crate) user_id: &'a str,
    pub(crate) created_at: PrimitiveDateTime,
    pub(crate) duration_minutes: i32,
    pub(crate) mode: AttemptMode,
}

/// Serializes every mutation of one attempt until the surrounding transaction ends.
pub(crate) async fn acquire_attempt_lock(
    executor: impl sqlx::PgExecutor<'_>,
    attempt_id: &str,
) -> Result<(), sqlx::Error> {
    sqlx::query("SELECT pg_advisory_xact_lock(hashtextextended($1, 0))")
        .bind(format!("exam_attempt:{attempt_id}"))
        .execute(executor)
        .await?;
    Ok(())
}

pub(crate) async fn find_by_id(
    executor: impl sqlx::PgExecutor<'_>,
    id: &str,
) -> Result<Option<ExamAttempt>, sqlx::Error> {
    sqlx::query_as::<_, ExamAttempt>(&format!("SELECT {COLUMNS} FROM exam_attempts WHERE id = $1"))
        .bind(id)
        .fetch_optional(executor)
        .await
}

pub(crate) async fn list_by_user(
    pool: &PgPool,
    user_id: &str,
    status: Option<AttemptStatus>,
    skip: i64,
    limit: i64,
) -> Result<Vec<ExamAttempt>, sqlx::Error> {
    let mut builder = QueryBuilder::<Postgres>::new(format!(
        "SELECT {COLUMNS} FROM exam_attempts WHERE user_id = "
    ));
    builder.push_bind(user_id);

    if let Some(status) = status {
        builder.push(" AND status = ");
        builder.push_bind(status);
    }

    builder.push(" ORDER BY created_at DESC, id OFFSET ");
    builder.push_bind(skip.max(0));
    builder.push(" LIMIT ");
    builder.push_bind(limit.clamp(1, 1000));

    builder.build_query_as::<ExamAttempt>().fetch_all(pool).await
}

pub(crate) async fn create(
    executor: impl sqlx::PgExecutor<'_>,
    attempt: CreateAttempt<'_>,
) -> Result<ExamAttempt, sqlx::Error> {
    sqlx::query_as::<_, ExamAttempt>(&format!(
        "INSERT INTO exam_attempts (id, user_id, created_at, duration_minutes, grade, status, mode)
         VALUES ($1, $2, $3, $4, 0, $5, $6)
         RETURNING {COLUMNS}"
    ))
    .bind(attempt.id)
    .bind(attempt.user_id)
    .bind(attempt.created_at)
    .bind(attempt.duration_minutes)
    .bind(AttemptStatus::InProgress)
    .bind(attempt.mode)
    .fetch_one(executor)
    .await
}

pub(crate) async fn link_exams(
    executor: impl sqlx::PgExecutor<'_>,
    attempt_id: &str,
    exam_ids: &[String],
) -> Result<(), sqlx::Error> {
    if exam_ids.is_empty() {
        return Ok(());
    }

    sqlx::query(
        "INSERT INTO exam_attempt_exams (attempt_id, exam_id)
         SELECT $1, exam_id FROM UNNEST($2::text[]) AS t(exam_id)",
    )
    .bind(attempt_id)
    .bind(exam_ids)
    .execute(executor)
    .await?;
    Ok(())
}

/// Stores the sampled questions; slice order becomes the attempt's question order.
pub(crate) async fn link_questions(
    executor: impl sqlx::PgExecutor<'_>,
    attempt_id: &str,
    question_ids: &[String],
) -> Result<(), sqlx::Error> {
    if question_ids.is_empty() {
        return Ok(());
    }

    sqlx::query(
        "INSERT INTO exam_attempt_questions (attempt_id, question_id, position)
         SELECT $1, question_id, (ordinality - 1)::int
         FROM UNNEST($2::text[]) WITH ORDINALITY AS t(question_id, ordinality)",
    )
    .bind(attempt_id)
    .bind(question_ids)
    .execute(executor)
    .await?;
    Ok(())
}

pub(crate) async fn list_exam_ids(
    executor: impl sqlx::PgExecutor<'_>,
    attempt_id: &str,
) -> Result<Vec<String>, sqlx::Error> {
    sqlx::query_scalar::<_, String>(
        "SELECT exam_id FROM exam_attempt_exams WHERE attempt_id = $1 ORDER BY exam_id",
    )
    .bind(attempt_id)
    .fetch_all(executor)
    .await
}

pub(crate) async fn list_question_ids(
    executor: impl sqlx::PgExecutor<'_>,
    attempt_id: &str,
) -> Result<Vec<String>, sqlx::Error> {
    sqlx::query_scalar::<_, String>(
        "SELECT question_id FROM exam_attempt_questions WHERE attempt_id = $1 ORDER BY position",
    )
    .bind(attempt_id)
    .fetch_all(executor)
    .await
}

pub(crate) async fn count_questions(
    executor: impl sqlx::PgExecutor<'_>,
    attempt_id: &str,
) -> Result<i64, sqlx::Error> {
    sqlx::query_scalar("SELECT COUNT(*) FROM exam_attempt_questions WHERE attempt_id = $1")
        .bind(attempt_id)
        .fetch_one(executor)
        .await
}

pub(crate) async fn contains_question(
    executor: impl sqlx::PgExecutor<'_>,
    attempt_id: &str,
    question_id: &str,
) -> Result<bool, sqlx::Error> {
    sqlx::query_scalar(
        "SELECT EXISTS (
            SELECT 1 FROM exam_attempt_questions WHERE attempt_id = $1 AND question_id = $2
         )",
    )
    .bind(attempt_id)
    .bind(question_id)
    .fetch_one(executor)
    .await
}

pub(crate) async fn list_flagged_question_ids(
    executor: impl sqlx::PgExecutor<'_>,
    attempt_id: &str,
) -> Result<Vec<String>, sqlx::Error> {
    sqlx::query_scalar::<_, String>(
        "SELECT f.question_id
         FROM exam_attempt_flags f
         LEFT JOIN exam_attempt_questions q
           ON q.attempt_id = f.attempt_id AND q.question_id = f.question_id
         WHERE f.attempt_id = $1
         ORDER BY q.position NULLS LAST, f.question_id",
    )
    .bind(attempt_id)
    .fetch_all(executor)
    .await
}

pub(crate) async fn add_flag(
    executor: impl sqlx::PgExecutor<'_>,
    attempt_id: &str,
    question_id: &str,
    now: PrimitiveDateTime,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        "INSERT INTO exam_attempt_flags (attempt_id, question_id, flagged_at)
         VALUES ($1, $2, $3)
         ON CONFLICT DO NOTHING",
    )
    .bind(attempt_id)
    .bind(question_id)
    .bind(now)
    .execute(executor)
    .await?;
    Ok(())
}

pub(crate) async fn remove_flag(
    executor: impl sqlx::PgExecutor<'_>,
    attempt_id: &str,
    question_id: &str,
) -> Result<(), sqlx::Error> {
    sqlx::query("DELETE FROM exam_attempt_flags WHERE attempt_id = $1 AND question_id = $2")
        .bind(attempt_id)
        .bind(question_id)
        .execute(executor)
        .await?;
    Ok(())
}

/// Records the grade and closes the attempt. `finished_at` keeps its first value.
pub(crate) async fn finish(
    executor: impl sqlx::PgExecutor<'_>,
    id: &str,
    grade: i32,
    now: PrimitiveDateTime,
) -> Result<ExamAttempt, sqlx::Error> {
    sqlx::query_as::<_, ExamAttempt>(&format!(
        "UPDATE exam_attempts
         SET grade = $1, status = $2, finished_at = COALESCE(finished_at, $3)
         WHERE id = $4
         RETURNING {COLUMNS}"
    ))
    .bind(grade)
    .bind(AttemptStatus::Finished)
    .bind(now)
    .bind(id)
    .fetch_one(executor)
    .await
}

#[cfg(test)]
pub(crate) async fn backdate(
    pool: &PgPool,
    id: &str,
    created_at: PrimitiveDateTime,
) -> Result<(), sqlx::Error> {
    sqlx::query("UPDATE exam_attempts SET created_at = $1 WHERE id = $2")
        .bind(created_at)
        .bind(id)
        .execute(pool)
        .await?;
    Ok(())
}
