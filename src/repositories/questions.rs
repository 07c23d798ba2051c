#[cfg(test)]
use sqlx::PgPool;

use crate::db::models::{Question, QuestionOption};

pub(crate) const COLUMNS: &str = "id, exam_id, category_id, text, type, weight";

pub(crate) async fn find_by_id(
    executor: impl sqlx::PgExecutor<'_>,
    id: &str,
) -> Result<Option<Question>, sqlx::Error> {
    sqlx::query_as::<_, Question>(&format!("SELECT {COLUMNS} FROM questions WHERE id = $1"))
        .bind(id)
        .fetch_optional(executor)
        .await
}

/// Candidate pool for an attempt: every question belonging to the given exams.
pub(crate) async fn list_ids_by_exams(
    executor: impl sqlx::PgExecutor<'_>,
    exam_ids: &[String],
) -> Result<Vec<String>, sqlx::Error> {
    if exam_ids.is_empty() {
        return Ok(Vec::new());
    }

    sqlx::query_scalar::<_, String>("SELECT id FROM questions WHERE exam_id = ANY($1) ORDER BY id")
        .bind(exam_ids)
        .fetch_all(executor)
        .await
}

/// Both correct and wrong options for a question, in storage order.
pub(crate) async fn list_options(
    executor: impl sqlx::PgExecutor<'_>,
    question_id: &str,
) -> Result<Vec<QuestionOption>, sqlx::Error> {
    sqlx::query_as::<_, QuestionOption>(
        "SELECT qa.answer_id, a.text
         FROM question_answers qa
         JOIN answers a ON a.id = qa.answer_id
         WHERE qa.question_id = $1
         ORDER BY a.id",
    )
    .bind(question_id)
    .fetch_all(executor)
    .await
}

/// `(question_id, answer_id)` pairs of the authoritative correct answers.
pub(crate) async fn list_correct_answer_ids(
    executor: impl sqlx::PgExecutor<'_>,
    question_ids: &[String],
) -> Result<Vec<(String, String)>, sqlx::Error> {
    if question_ids.is_empty() {
        return Ok(Vec::new());
    }

    sqlx::query_as::<_, (String, String)>(
        "SELECT question_id, answer_id
         FROM question_answers
         WHERE question_id = ANY($1) AND is_correct",
    )
    .bind(question_ids)
    .fetch_all(executor)
    .await
}

#[cfg(test)]
pub(crate) async fn create_category(
    pool: &PgPool,
    id: &str,
    name: &str,
) -> Result<(), sqlx::Error> {
    sqlx::query("INSERT INTO question_categories (id, name) VALUES ($1, $2)")
        .bind(id)
        .bind(name)
        .execute(pool)
        .await?;
    Ok(())
}

#[cfg(test)]
pub(crate) struct CreateQuestion<'a> {
    pub(crate) id: &'a str,
    pub(crate) exam_id: &'a str,
    pub(crate) category_id: &'a str,
    pub(crate) text: &'a str,
    pub(crate) question_type: crate::db::types::QuestionType,
}

#[cfg(test)]
pub(crate) async fn create(
    pool: &PgPool,
    question: CreateQuestion<'_>,
) -> Result<Question, sqlx::Error> {
    sqlx::query_as::<_, Question>(&format!(
        "INSERT INTO questions (id, exam_id, category_id, text, type)
         VALUES ($1, $2, $3, $4, $5)
         RETURNING {COLUMNS}"
    ))
    .bind(question.id)
    .bind(question.exam_id)
    .bind(question.category_id)
    .bind(question.text)
    .bind(question.question_type)
    .fetch_one(pool)
    .await
}

#[cfg(test)]
pub(crate) async fn add_answer(
    pool: &PgPool,
    question_id: &str,
    answer_id: &str,
    text: &str,
    is_correct: bool,
) -> Result<(), sqlx::Error> {
    sqlx::query("INSERT INTO answers (id, text) VALUES ($1, $2) ON CONFLICT (id) DO NOTHING")
        .bind(answer_id)
        .bind(text)
        .execute(pool)
        .await?;
    sqlx::query(
        "INSERT INTO question_answers (question_id, answer_id, is_correct) VALUES ($1, $2, $3)",
    )
    .bind(question_id)
    .bind(answer_id)
    .bind(is_correct)
    .execute(pool)
    .await?;
    Ok(())
}
