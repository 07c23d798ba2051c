use sqlx::PgPool;

use crate::core::time::primitive_now_utc;
use crate::repositories;
use crate::services::attempt_access::load_owned_attempt;
use crate::services::errors::AttemptError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum FlagAction {
    Added,
    Removed,
}

#[derive(Debug)]
pub(crate) struct FlagToggle {
    pub(crate) flagged: bool,
    pub(crate) flagged_questions: Vec<String>,
}

/// Flips membership of `question_id` in `flags`.
pub(crate) fn toggle(flags: &mut Vec<String>, question_id: &str) -> FlagAction {
    if let Some(position) = flags.iter().position(|id| id == question_id) {
        flags.remove(position);
        FlagAction::Removed
    } else {
        flags.push(question_id.to_string());
        FlagAction::Added
    }
}

/// Allowed in any attempt status; the question must belong to the attempt.
pub(crate) async fn toggle_flag(
    db: &PgPool,
    user_id: &str,
    attempt_id: &str,
    question_id: &str,
) -> Result<FlagToggle, AttemptError> {
    let mut tx = db.begin().await?;
    repositories::attempts::acquire_attempt_lock(&mut *tx, attempt_id).await?;
    load_owned_attempt(&mut *tx, attempt_id, user_id).await?;

    if !repositories::attempts::contains_question(&mut *tx, attempt_id, question_id).await? {
        return Err(AttemptError::not_found("Question not found in this attempt"));
    }

    let mut flags =
        repositories::attempts::list_flagged_question_ids(&mut *tx, attempt_id).await?;
    let action = toggle(&mut flags, question_id);
    match action {
        FlagAction::Added => {
            repositories::attempts::add_flag(
                &mut *tx,
                attempt_id,
                question_id,
                primitive_now_utc(),
            )
            .await?;
        }
        FlagAction::Removed => {
            repositories::attempts::remove_flag(&mut *tx, attempt_id, question_id).await?;
        }
    }

    let flagged_questions =
        repositories::attempts::list_flagged_question_ids(&mut *tx, attempt_id).await?;
    tx.commit().await?;

    tracing::debug!(attempt_id, question_id, action = ?action, "Question flag toggled");

    Ok(FlagToggle { flagged: action == FlagAction::Added, flagged_questions })
}
