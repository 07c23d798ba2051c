use std::collections::{BTreeSet, HashSet};

use serde::Serialize;
use sqlx::PgPool;
use time::PrimitiveDateTime;
use uuid::Uuid;

use crate::core::time::primitive_now_utc;
use crate::db::models::{ExamAttempt, QuestionOption};
use crate::db::types::AttemptStatus;
use crate::repositories;
use crate::schemas::question::{AnswerOptionResponse, QuestionPayload};
use crate::services::attempt_access::load_owned_attempt;
use crate::services::attempt_timing;
use crate::services::errors::AttemptError;
use crate::services::randomness::{self, RandomSource};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub(crate) enum RecordOutcome {
    Created,
    Unchanged,
    Updated,
}

impl RecordOutcome {
    pub(crate) fn as_str(self) -> &'static str {
        match self {
            RecordOutcome::Created => "created",
            RecordOutcome::Unchanged => "unchanged",
            RecordOutcome::Updated => "updated",
        }
    }
}

#[derive(Debug)]
pub(crate) struct RecordedAnswer {
    pub(crate) answer_ids: Vec<String>,
    pub(crate) question: QuestionPayload,
}

/// Full-replace upsert: the submitted set always becomes the stored set.
pub(crate) fn decide_outcome(
    stored: Option<&BTreeSet<String>>,
    submitted: &BTreeSet<String>,
) -> RecordOutcome {
    match stored {
        None => RecordOutcome::Created,
        Some(stored) if stored == submitted => RecordOutcome::Unchanged,
        Some(_) => RecordOutcome::Updated,
    }
}

/// Writes are closed once the attempt is finished, and in exam mode once time is up.
pub(crate) fn ensure_writable(
    attempt: &ExamAttempt,
    now: PrimitiveDateTime,
) -> Result<(), AttemptError> {
    if attempt.status != AttemptStatus::InProgress {
        return Err(AttemptError::not_found("Attempt is already finished"));
    }

    if attempt.mode.enforces_deadline()
        && attempt_timing::is_expired(attempt.created_at, attempt.duration_minutes, now)
    {
        return Err(AttemptError::Expired);
    }

    Ok(())
}

pub(crate) fn ensure_known_options(
    submitted: &BTreeSet<String>,
    options: &[QuestionOption],
) -> Result<(), AttemptError> {
    let known = options.iter().map(|option| option.answer_id.as_str()).collect::<HashSet<_>>();
    match submitted.iter().find(|answer_id| !known.contains(answer_id.as_str())) {
        Some(answer_id) => Err(AttemptError::BadRequest(format!(
            "Answer {answer_id} is not an option for this question"
        ))),
        None => Ok(()),
    }
}

/// First question, in the attempt's fixed order, with no recorded answer.
pub(crate) fn first_unanswered<'a>(
    question_ids: &'a [String],
    answered: &HashSet<String>,
) -> Option<&'a str> {
    question_ids.iter().find(|id| !answered.contains(id.as_str())).map(String::as_str)
}

pub(crate) async fn submit_answer(
    db: &PgPool,
    user_id: &str,
    attempt_id: &str,
    question_id: &str,
    answer_ids: &[String],
) -> Result<RecordOutcome, AttemptError> {
    let submitted = answer_ids.iter().cloned().collect::<BTreeSet<_>>();
    if submitted.is_empty() {
        return Err(AttemptError::BadRequest("answers must not be empty".to_string()));
    }

    let mut tx = db.begin().await?;
    repositories::attempts::acquire_attempt_lock(&mut *tx, attempt_id).await?;

    let attempt = load_owned_attempt(&mut *tx, attempt_id, user_id).await?;
    let now = primitive_now_utc();
    ensure_writable(&attempt, now)?;

    if !repositories::attempts::contains_question(&mut *tx, attempt_id, question_id).await? {
        return Err(AttemptError::not_found("Question not found in this attempt"));
    }

    let options = repositories::questions::list_options(&mut *tx, question_id).await?;
    ensure_known_options(&submitted, &options)?;

    let existing =
        repositories::answer_attempts::find_for_update(&mut *tx, attempt_id, question_id).await?;
    let stored = match &existing {
        Some(record) => Some(
            repositories::answer_attempts::list_answer_ids(&mut *tx, &record.id)
                .await?
                .into_iter()
                .collect::<BTreeSet<_>>(),
        ),
        None => None,
    };

    let outcome = decide_outcome(stored.as_ref(), &submitted);
    let selection = submitted.into_iter().collect::<Vec<_>>();

    match (outcome, existing) {
        (RecordOutcome::Created, _) => {
            let record_id = Uuid::new_v4().to_string();
            let record = repositories::answer_attempts::create(
                &mut *tx,
                &record_id,
                attempt_id,
                question_id,
                now,
            )
            .await?;
            repositories::answer_attempts::insert_answers(&mut *tx, &record.id, &selection)
                .await?;
        }
        (RecordOutcome::Updated, Some(record)) => {
            repositories::answer_attempts::clear_answers(&mut *tx, &record.id).await?;
            repositories::answer_attempts::insert_answers(&mut *tx, &record.id, &selection)
                .await?;
            repositories::answer_attempts::touch(&mut *tx, &record.id, now).await?;
        }
        _ => {}
    }

    tx.commit().await?;

    metrics::counter!("answer_submissions_total", "outcome" => outcome.as_str()).increment(1);
    tracing::info!(
        attempt_id,
        question_id,
        outcome = outcome.as_str(),
        answers = selection.len(),
        "Answer recorded"
    );

    Ok(outcome)
}

pub(crate) async fn get_next_unanswered(
    db: &PgPool,
    random: &dyn RandomSource,
    user_id: &str,
    attempt_id: &str,
) -> Result<Option<QuestionPayload>, AttemptError> {
    load_owned_attempt(db, attempt_id, user_id).await?;

    let question_ids = repositories::attempts::list_question_ids(db, attempt_id).await?;
    let answered = repositories::answer_attempts::list_answered_question_ids(db, attempt_id)
        .await?
        .into_iter()
        .collect::<HashSet<_>>();

    match first_unanswered(&question_ids, &answered) {
        Some(question_id) => Ok(Some(question_payload(db, random, question_id).await?)),
        None => Ok(None),
    }
}

pub(crate) async fn get_recorded_answer(
    db: &PgPool,
    random: &dyn RandomSource,
    user_id: &str,
    attempt_id: &str,
    question_id: &str,
) -> Result<RecordedAnswer, AttemptError> {
    load_owned_attempt(db, attempt_id, user_id).await?;

    if !repositories::attempts::contains_question(db, attempt_id, question_id).await? {
        return Err(AttemptError::not_found("Question not found in this attempt"));
    }

    let record = repositories::answer_attempts::find_for_question(db, attempt_id, question_id)
        .await?
        .ok_or_else(|| AttemptError::not_found("No answer recorded for this question"))?;
    let answer_ids = repositories::answer_attempts::list_answer_ids(db, &record.id).await?;
    let question = question_payload(db, random, question_id).await?;

    Ok(RecordedAnswer { answer_ids, question })
}

/// Question with its correct and wrong options merged in a fresh random order.
pub(crate) async fn question_payload(
    db: &PgPool,
    random: &dyn RandomSource,
    question_id: &str,
) -> Result<QuestionPayload, AttemptError> {
    let question = repositories::questions::find_by_id(db, question_id)
        .await?
        .ok_or_else(|| AttemptError::not_found("Question not found"))?;
    let options = repositories::questions::list_options(db, question_id).await?;

    let answers = randomness::shuffle(random, options)
        .into_iter()
        .map(|option| AnswerOptionResponse { id: option.answer_id, text: option.text })
        .collect();

    Ok(QuestionPayload {
        id: question.id,
        text: question.text,
        question_type: question.question_type,
        answers,
    })
}
