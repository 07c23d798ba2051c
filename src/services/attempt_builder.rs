use sqlx::PgPool;
use uuid::Uuid;

use crate::core::time::primitive_now_utc;
use crate::db::models::{Exam, ExamAttempt, User};
use crate::db::types::AttemptMode;
use crate::repositories;
use crate::services::attempt_timing;
use crate::services::errors::AttemptError;
use crate::services::randomness::{self, RandomSource};

/// What an attempt draws its questions from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum AttemptScope {
    Exam(String),
    Subject(String),
}

impl AttemptScope {
    pub(crate) fn as_str(&self) -> &'static str {
        match self {
            AttemptScope::Exam(_) => "exam",
            AttemptScope::Subject(_) => "subject",
        }
    }
}

#[derive(Debug)]
pub(crate) struct CreatedAttempt {
    pub(crate) attempt: ExamAttempt,
    pub(crate) exam_ids: Vec<String>,
    pub(crate) question_ids: Vec<String>,
}

/// Upper bound on sampled questions: the exam's `question_count`, or the
/// configured cap for subject-wide attempts.
pub(crate) fn question_cap(scope: &AttemptScope, exams: &[Exam], subject_cap: usize) -> usize {
    match scope {
        AttemptScope::Exam(_) => exams
            .first()
            .and_then(|exam| usize::try_from(exam.question_count).ok())
            .unwrap_or(0),
        AttemptScope::Subject(_) => subject_cap,
    }
}

/// Uniform sample without replacement. A pool no larger than `cap` is taken whole.
pub(crate) fn sample_questions(
    random: &dyn RandomSource,
    question_pool: &[String],
    cap: usize,
) -> Vec<String> {
    randomness::sample(random, question_pool, cap)
}

pub(crate) fn attempt_duration(exams: &[Exam], extra_time_minutes: i32) -> Option<i32> {
    let durations = exams.iter().map(|exam| exam.duration_minutes).collect::<Vec<_>>();
    attempt_timing::base_duration_minutes(&durations)
        .map(|base| attempt_timing::effective_duration_minutes(base, extra_time_minutes))
}

async fn resolve_exams(db: &PgPool, scope: &AttemptScope) -> Result<Vec<Exam>, AttemptError> {
    match scope {
        AttemptScope::Exam(exam_id) => {
            let exam = repositories::exams::find_by_id(db, exam_id)
                .await?
                .ok_or_else(|| AttemptError::not_found("Exam not found"))?;
            Ok(vec![exam])
        }
        AttemptScope::Subject(subject_id) => {
            repositories::subjects::find_by_id(db, subject_id)
                .await?
                .ok_or_else(|| AttemptError::not_found("Subject not found"))?;

            let exams = repositories::exams::list_by_subject(db, subject_id).await?;
            if exams.is_empty() {
                return Err(AttemptError::not_found("Subject has no exams"));
            }
            Ok(exams)
        }
    }
}

pub(crate) async fn create_attempt(
    db: &PgPool,
    random: &dyn RandomSource,
    subject_cap: usize,
    user: &User,
    mode: AttemptMode,
    scope: &AttemptScope,
) -> Result<CreatedAttempt, AttemptError> {
    let exams = resolve_exams(db, scope).await?;
    let exam_ids = exams.iter().map(|exam| exam.id.clone()).collect::<Vec<_>>();

    let question_pool = repositories::questions::list_ids_by_exams(db, &exam_ids).await?;
    if question_pool.is_empty() {
        return Err(AttemptError::BadRequest("No questions available for this attempt".to_string()));
    }

    let cap = question_cap(scope, &exams, subject_cap);
    let question_ids = sample_questions(random, &question_pool, cap);
    let duration_minutes = attempt_duration(&exams, user.extra_time_minutes)
        .ok_or_else(|| AttemptError::not_found("Exam not found"))?;

    let mut tx = db.begin().await?;
    let attempt_id = Uuid::new_v4().to_string();
    let attempt = repositories::attempts::create(
        &mut *tx,
        repositories::attempts::CreateAttempt {
            id: &attempt_id,
            user_id: &user.id,
            created_at: primitive_now_utc(),
            duration_minutes,
            mode,
        },
    )
    .await?;
    repositories::attempts::link_exams(&mut *tx, &attempt.id, &exam_ids).await?;
    repositories::attempts::link_questions(&mut *tx, &attempt.id, &question_ids).await?;
    tx.commit().await?;

    metrics::counter!(
        "exam_attempts_created_total",
        "mode" => mode.as_str(),
        "scope" => scope.as_str()
    )
    .increment(1);
    tracing::info!(
        attempt_id = %attempt.id,
        user_id = %user.id,
        mode = mode.as_str(),
        scope = scope.as_str(),
        questions = question_ids.len(),
        pool_size = question_pool.len(),
        duration_minutes = attempt.duration_minutes,
        "Exam attempt created"
    );

    Ok(CreatedAttempt { attempt, exam_ids, question_ids })
}
