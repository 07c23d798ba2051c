use axum::extract::{Path, State};
use axum::{routing::post, Json, Router};
use validator::Validate;

use crate::api::errors::ApiError;
use crate::api::guards::CurrentUser;
use crate::core::state::AppState;
use crate::schemas::question::{CheckAnswerRequest, CheckAnswerResponse, CheckResult};
use crate::services::grading::{self, CheckOutcome};

pub(crate) fn router() -> Router<AppState> {
    Router::new().route("/:question_id/check", post(check_answer))
}

async fn check_answer(
    Path(question_id): Path<String>,
    CurrentUser(_user): CurrentUser,
    State(state): State<AppState>,
    Json(payload): Json<CheckAnswerRequest>,
) -> Result<Json<CheckAnswerResponse>, ApiError> {
    payload.validate().map_err(|e| ApiError::BadRequest(e.to_string()))?;

    let response = match grading::check_answer(state.db(), &question_id, &payload.answers).await? {
        CheckOutcome::Correct => {
            CheckAnswerResponse { result: CheckResult::Correct, correct_answers: None }
        }
        CheckOutcome::Wrong { correct_answers } => {
            CheckAnswerResponse { result: CheckResult::Wrong, correct_answers: Some(correct_answers) }
        }
    };

    Ok(Json(response))
}
