use axum::extract::{Path, State};
use axum::{routing::get, Json, Router};

use crate::api::errors::ApiError;
use crate::api::guards::CurrentUser;
use crate::core::state::AppState;
use crate::repositories;
use crate::schemas::catalog::{ExamIntroResponse, ExamResponse, SubjectResponse};
use crate::services::attempt_timing;

pub(crate) fn router() -> Router<AppState> {
    Router::new()
        .route("/subjects", get(list_subjects))
        .route("/subjects/:subject_id/exams", get(list_exams_for_subject))
        .route("/exams/:exam_id", get(get_exam_intro))
}

async fn list_subjects(State(state): State<AppState>) -> Result<Json<Vec<SubjectResponse>>, ApiError> {
    let subjects = repositories::subjects::list_all(state.db())
        .await
        .map_err(|e| ApiError::internal(e, "Failed to list subjects"))?;

    Ok(Json(subjects.into_iter().map(SubjectResponse::from).collect()))
}

async fn list_exams_for_subject(
    Path(subject_id): Path<String>,
    State(state): State<AppState>,
) -> Result<Json<Vec<ExamResponse>>, ApiError> {
    let subject = repositories::subjects::find_by_id(state.db(), &subject_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to fetch subject"))?;
    if subject.is_none() {
        return Err(ApiError::NotFound("Subject not found".to_string()));
    }

    let exams = repositories::exams::list_by_subject(state.db(), &subject_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to list exams"))?;

    Ok(Json(exams.into_iter().map(ExamResponse::from).collect()))
}

async fn get_exam_intro(
    Path(exam_id): Path<String>,
    CurrentUser(user): CurrentUser,
    State(state): State<AppState>,
) -> Result<Json<ExamIntroResponse>, ApiError> {
    let exam = repositories::exams::find_by_id(state.db(), &exam_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to fetch exam"))?
        .ok_or_else(|| ApiError::NotFound("Exam not found".to_string()))?;

    let effective_duration_minutes =
        attempt_timing::effective_duration_minutes(exam.duration_minutes, user.extra_time_minutes);

    Ok(Json(ExamIntroResponse {
        exam: ExamResponse::from(exam),
        extra_time_minutes: user.extra_time_minutes,
        effective_duration_minutes,
    }))
}
