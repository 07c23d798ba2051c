#[cfg(test)]
use sqlx::PgPool;

use crate::db::models::Exam;

pub(crate) const COLUMNS: &str =
    "id, subject_id, name, duration_minutes, passing_grade, question_count";

pub(crate) async fn find_by_id(
    executor: impl sqlx::PgExecutor<'_>,
    id: &str,
) -> Result<Option<Exam>, sqlx::Error> {
    sqlx::query_as::<_, Exam>(&format!("SELECT {COLUMNS} FROM exams WHERE id = $1"))
        .bind(id)
        .fetch_optional(executor)
        .await
}

pub(crate) async fn list_by_subject(
    executor: impl sqlx::PgExecutor<'_>,
    subject_id: &str,
) -> Result<Vec<Exam>, sqlx::Error> {
    sqlx::query_as::<_, Exam>(&format!(
        "SELECT {COLUMNS} FROM exams WHERE subject_id = $1 ORDER BY name, id"
    ))
    .bind(subject_id)
    .fetch_all(executor)
    .await
}

/// Exams linked to an attempt.
pub(crate) async fn list_by_attempt(
    executor: impl sqlx::PgExecutor<'_>,
    attempt_id: &str,
) -> Result<Vec<Exam>, sqlx::Error> {
    sqlx::query_as::<_, Exam>(
        "SELECT e.id, e.subject_id, e.name, e.duration_minutes, e.passing_grade, e.question_count
         FROM exams e
         JOIN exam_attempt_exams ae ON ae.exam_id = e.id
         WHERE ae.attempt_id = $1
         ORDER BY e.id",
    )
    .bind(attempt_id)
    .fetch_all(executor)
    .await
}

#[cfg(test)]
pub(crate) struct CreateExam<'a> {
    pub(crate) id: &'a str,
    pub(crate) subject_id: &'a str,
    pub(crate) name: &'a str,
    pub(crate) duration_minutes: i32,
    pub(crate) passing_grade: i32,
    pub(crate) question_count: i32,
}

#[cfg(test)]
pub(crate) async fn create(pool: &PgPool, exam: CreateExam<'_>) -> Result<Exam, sqlx::Error> {
    sqlx::query_as::<_, Exam>(&format!(
        "INSERT INTO exams (id, subject_id, name, duration_minutes, passing_grade, question_count)
         VALUES ($1, $2, $3, $4, $5, $6)
         RETURNING {COLUMNS}"
    ))
    .bind(exam.id)
    .bind(exam.subject_id)
    .bind(exam.name)
    .bind(exam.duration_minutes)
    .bind(exam.passing_grade)
    .bind(exam.question_count)
    .fetch_one(pool)
    .await
}

#[cfg(test)]
pub(crate) async fn update_duration(
    pool: &PgPool,
    id: &str,
    duration_minutes: i32,
) -> Result<(), sqlx::Error> {
    sqlx::query("UPDATE exams SET duration_minutes = $1 WHERE id = $2")
        .bind(duration_minutes)
        .bind(id)
        .execute(pool)
        .await?;
    Ok(())
}
