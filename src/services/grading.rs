use std::collections::{BTreeMap, BTreeSet};

use sqlx::{PgConnection, PgPool};

use crate::core::time::primitive_now_utc;
use crate::db::models::ExamAttempt;
use crate::db::types::AttemptStatus;
use crate::repositories;
use crate::services::attempt_access::load_owned_attempt;
use crate::services::errors::AttemptError;

#[derive(Debug)]
pub(crate) struct AttemptVerdict {
    pub(crate) attempt: ExamAttempt,
    pub(crate) passing_threshold: f64,
    pub(crate) passed: bool,
}

#[derive(Debug, PartialEq, Eq)]
pub(crate) enum CheckOutcome {
    Correct,
    Wrong { correct_answers: Vec<String> },
}

/// Exact set equality: every correct option and nothing else.
pub(crate) fn is_correct(submitted: &BTreeSet<String>, correct: &BTreeSet<String>) -> bool {
    submitted == correct
}

/// Percentage of answered questions that are correct, rounded half away from zero.
pub(crate) fn compute_grade(correct: usize, answered: usize) -> i32 {
    if answered == 0 {
        return 0;
    }
    (100.0 * correct as f64 / answered as f64).round() as i32
}

/// Mean passing grade over the attempt's exams.
pub(crate) fn passing_threshold(passing_grades: &[i32]) -> Option<f64> {
    if passing_grades.is_empty() {
        return None;
    }
    let total = passing_grades.iter().map(|grade| f64::from(*grade)).sum::<f64>();
    Some(total / passing_grades.len() as f64)
}

pub(crate) fn passed(grade: i32, threshold: f64) -> bool {
    f64::from(grade) >= threshold
}

pub(crate) fn is_complete(answered: i64, total: i64) -> bool {
    answered >= total
}

fn group_pairs<I>(pairs: I) -> BTreeMap<String, BTreeSet<String>>
where
    I: IntoIterator<Item = (String, Option<String>)>,
{
    let mut grouped = BTreeMap::<String, BTreeSet<String>>::new();
    for (question_id, answer_id) in pairs {
        let entry = grouped.entry(question_id).or_default();
        if let Some(answer_id) = answer_id {
            entry.insert(answer_id);
        }
    }
    grouped
}

/// Grades stored selections against the correct answer pairs of the same questions.
pub(crate) fn grade_selections(
    selections: Vec<(String, Option<String>)>,
    correct_pairs: Vec<(String, String)>,
) -> i32 {
    let submitted = group_pairs(selections);
    let correct = group_pairs(
        correct_pairs.into_iter().map(|(question_id, answer_id)| (question_id, Some(answer_id))),
    );
    let empty = BTreeSet::new();

    let correct_count = submitted
        .iter()
        .filter(|(question_id, answers)| {
            is_correct(answers, correct.get(question_id.as_str()).unwrap_or(&empty))
        })
        .count();

    compute_grade(correct_count, submitted.len())
}

pub(crate) async fn calculate_grade(
    conn: &mut PgConnection,
    attempt_id: &str,
) -> Result<i32, AttemptError> {
    let selections = repositories::answer_attempts::list_selections(&mut *conn, attempt_id).await?;
    let question_ids = selections
        .iter()
        .map(|(question_id, _)| question_id.clone())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect::<Vec<_>>();
    let correct_pairs =
        repositories::questions::list_correct_answer_ids(&mut *conn, &question_ids).await?;

    Ok(grade_selections(selections, correct_pairs))
}

/// `(answered, total)` question counts for an attempt.
pub(crate) async fn answered_progress(
    conn: &mut PgConnection,
    attempt_id: &str,
) -> Result<(i64, i64), AttemptError> {
    let answered = repositories::answer_attempts::count_by_attempt(&mut *conn, attempt_id).await?;
    let total = repositories::attempts::count_questions(&mut *conn, attempt_id).await?;
    Ok((answered, total))
}

pub(crate) async fn all_questions_answered(
    conn: &mut PgConnection,
    attempt_id: &str,
) -> Result<bool, AttemptError> {
    let (answered, total) = answered_progress(conn, attempt_id).await?;
    Ok(is_complete(answered, total))
}

async fn threshold_for(
    executor: impl sqlx::PgExecutor<'_>,
    attempt_id: &str,
) -> Result<f64, AttemptError> {
    let exams = repositories::exams::list_by_attempt(executor, attempt_id).await?;
    let grades = exams.iter().map(|exam| exam.passing_grade).collect::<Vec<_>>();
    passing_threshold(&grades).ok_or_else(|| AttemptError::not_found("Exam not found"))
}

/// Grades and closes the attempt. Finishing again recomputes the same grade.
pub(crate) async fn finish_attempt(
    db: &PgPool,
    user_id: &str,
    attempt_id: &str,
) -> Result<AttemptVerdict, AttemptError> {
    let mut tx = db.begin().await?;
    repositories::attempts::acquire_attempt_lock(&mut *tx, attempt_id).await?;

    let attempt = load_owned_attempt(&mut *tx, attempt_id, user_id).await?;
    let (answered, total) = answered_progress(&mut *tx, attempt_id).await?;
    if !is_complete(answered, total) {
        return Err(AttemptError::Incomplete { answered, total });
    }

    let grade = calculate_grade(&mut *tx, attempt_id).await?;
    let finished =
        repositories::attempts::finish(&mut *tx, attempt_id, grade, primitive_now_utc()).await?;
    let passing_threshold = threshold_for(&mut *tx, attempt_id).await?;
    tx.commit().await?;

    let passed = passed(finished.grade, passing_threshold);
    if attempt.status == AttemptStatus::InProgress {
        metrics::counter!(
            "exam_attempts_finished_total",
            "passed" => if passed { "true" } else { "false" }
        )
        .increment(1);
    }
    tracing::info!(
        attempt_id,
        grade = finished.grade,
        passed,
        passing_threshold,
        "Exam attempt finished"
    );

    Ok(AttemptVerdict { attempt: finished, passing_threshold, passed })
}

pub(crate) async fn attempt_result(
    db: &PgPool,
    user_id: &str,
    attempt_id: &str,
) -> Result<AttemptVerdict, AttemptError> {
    let attempt = load_owned_attempt(db, attempt_id, user_id).await?;
    if attempt.status != AttemptStatus::Finished {
        return Err(AttemptError::not_found("Attempt is not finished yet"));
    }

    let passing_threshold = threshold_for(db, attempt_id).await?;
    let passed = passed(attempt.grade, passing_threshold);
    Ok(AttemptVerdict { attempt, passing_threshold, passed })
}

/// Practice helper: grades one selection without touching any attempt.
pub(crate) async fn check_answer(
    db: &PgPool,
    question_id: &str,
    answer_ids: &[String],
) -> Result<CheckOutcome, AttemptError> {
    let submitted = answer_ids.iter().cloned().collect::<BTreeSet<_>>();
    if submitted.is_empty() {
        return Err(AttemptError::BadRequest("answers must not be empty".to_string()));
    }

    repositories::questions::find_by_id(db, question_id)
        .await?
        .ok_or_else(|| AttemptError::not_found("Question not found"))?;

    let correct = repositories::questions::list_correct_answer_ids(db, &[question_id.to_string()])
        .await?
        .into_iter()
        .map(|(_, answer_id)| answer_id)
        .collect::<BTreeSet<_>>();

    if is_correct(&submitted, &correct) {
        Ok(CheckOutcome::Correct)
    } else {
        Ok(CheckOutcome::Wrong { correct_answers: correct.into_iter().collect() })
    }
}
