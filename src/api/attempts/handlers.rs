use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use validator::Validate;

use crate::api::errors::ApiError;
use crate::api::guards::CurrentUser;
use crate::core::state::AppState;
use crate::core::time::{format_primitive, primitive_now_utc};
use crate::repositories;
use crate::schemas::attempt::{
    AnswerSubmit, AttemptCreate, AttemptCreatedResponse, AttemptListQuery, AttemptListResponse,
    AttemptResponse, AttemptResultResponse, AttemptSummaryResponse, FlagToggleResponse,
    NextQuestionResponse, RecordedAnswerResponse, SubmitAnswerResponse,
};
use crate::services::answer_recorder::{self, RecordOutcome};
use crate::services::attempt_access::load_owned_attempt;
use crate::services::attempt_builder::{self, AttemptScope};
use crate::services::grading::{self, AttemptVerdict};
use crate::services::{attempt_timing, flags};

/// Exactly one of `exam_id` and `subject_id` selects the scope.
pub(super) fn scope_from_request(
    exam_id: Option<String>,
    subject_id: Option<String>,
) -> Result<AttemptScope, ApiError> {
    match (exam_id, subject_id) {
        (Some(exam_id), None) => Ok(AttemptScope::Exam(exam_id)),
        (None, Some(subject_id)) => Ok(AttemptScope::Subject(subject_id)),
        _ => Err(ApiError::BadRequest(
            "Exactly one of exam_id or subject_id is required".to_string(),
        )),
    }
}

fn verdict_response(verdict: AttemptVerdict) -> AttemptResultResponse {
    AttemptResultResponse {
        id: verdict.attempt.id,
        status: verdict.attempt.status,
        grade: verdict.attempt.grade,
        passed: verdict.passed,
        passing_threshold: verdict.passing_threshold,
        finished_at: verdict.attempt.finished_at.map(format_primitive),
    }
}

pub(super) async fn create_attempt(
    CurrentUser(user): CurrentUser,
    State(state): State<AppState>,
    Json(payload): Json<AttemptCreate>,
) -> Result<(StatusCode, Json<AttemptCreatedResponse>), ApiError> {
    payload.validate().map_err(|e| ApiError::BadRequest(e.to_string()))?;
    let scope = scope_from_request(payload.exam_id, payload.subject_id)?;

    let created = attempt_builder::create_attempt(
        state.db(),
        state.random(),
        state.settings().exam().subject_question_cap,
        &user,
        payload.mode,
        &scope,
    )
    .await?;

    let time_left_seconds = attempt_timing::time_left_seconds(
        created.attempt.created_at,
        created.attempt.duration_minutes,
        primitive_now_utc(),
    );

    Ok((
        StatusCode::CREATED,
        Json(AttemptCreatedResponse {
            attempt: AttemptResponse::from(&created.attempt),
            exams: created.exam_ids,
            questions: created.question_ids,
            time_left_seconds,
        }),
    ))
}

pub(super) async fn list_my_attempts(
    CurrentUser(user): CurrentUser,
    State(state): State<AppState>,
    Query(params): Query<AttemptListQuery>,
) -> Result<Json<AttemptListResponse>, ApiError> {
    let attempts = repositories::attempts::list_by_user(
        state.db(),
        &user.id,
        params.status,
        params.skip,
        params.limit,
    )
    .await
    .map_err(|e| ApiError::internal(e, "Failed to list attempts"))?;

    Ok(Json(AttemptListResponse {
        items: attempts.iter().map(AttemptResponse::from).collect(),
        skip: params.skip,
        limit: params.limit,
    }))
}

pub(super) async fn get_attempt_summary(
    Path(attempt_id): Path<String>,
    CurrentUser(user): CurrentUser,
    State(state): State<AppState>,
) -> Result<Json<AttemptSummaryResponse>, ApiError> {
    let mut conn =
        state.db().acquire().await.map_err(|e| ApiError::internal(e, "Failed to acquire connection"))?;

    let attempt = load_owned_attempt(&mut *conn, &attempt_id, &user.id).await?;
    let exams = repositories::attempts::list_exam_ids(&mut *conn, &attempt_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to fetch attempt exams"))?;
    let questions = repositories::attempts::list_question_ids(&mut *conn, &attempt_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to fetch attempt questions"))?;
    let answered_question_ids =
        repositories::answer_attempts::list_answered_question_ids(&mut *conn, &attempt_id)
            .await
            .map_err(|e| ApiError::internal(e, "Failed to fetch answered questions"))?;
    let flagged_questions =
        repositories::attempts::list_flagged_question_ids(&mut *conn, &attempt_id)
            .await
            .map_err(|e| ApiError::internal(e, "Failed to fetch flagged questions"))?;
    let all_answered = grading::all_questions_answered(&mut conn, &attempt_id).await?;

    let time_left_seconds = attempt_timing::time_left_seconds(
        attempt.created_at,
        attempt.duration_minutes,
        primitive_now_utc(),
    );

    Ok(Json(AttemptSummaryResponse {
        id: attempt.id,
        mode: attempt.mode,
        status: attempt.status,
        grade: attempt.grade,
        exams,
        question_count: questions.len(),
        questions,
        answered_question_ids,
        all_answered,
        flagged_questions,
        attempt_duration_minutes: attempt.duration_minutes,
        time_left_seconds,
        created_at: format_primitive(attempt.created_at),
    }))
}

pub(super) async fn get_next_question(
    Path(attempt_id): Path<String>,
    CurrentUser(user): CurrentUser,
    State(state): State<AppState>,
) -> Result<Json<NextQuestionResponse>, ApiError> {
    let question =
        answer_recorder::get_next_unanswered(state.db(), state.random(), &user.id, &attempt_id)
            .await?;

    Ok(Json(NextQuestionResponse { question }))
}

pub(super) async fn submit_answer(
    Path(attempt_id): Path<String>,
    CurrentUser(user): CurrentUser,
    State(state): State<AppState>,
    Json(payload): Json<AnswerSubmit>,
) -> Result<(StatusCode, Json<SubmitAnswerResponse>), ApiError> {
    payload.validate().map_err(|e| ApiError::BadRequest(e.to_string()))?;

    let outcome = answer_recorder::submit_answer(
        state.db(),
        &user.id,
        &attempt_id,
        &payload.question_id,
        &payload.answers,
    )
    .await?;

    let status = match outcome {
        RecordOutcome::Created => StatusCode::CREATED,
        RecordOutcome::Unchanged | RecordOutcome::Updated => StatusCode::OK,
    };

    Ok((status, Json(SubmitAnswerResponse { outcome })))
}

pub(super) async fn get_recorded_answer(
    Path((attempt_id, question_id)): Path<(String, String)>,
    CurrentUser(user): CurrentUser,
    State(state): State<AppState>,
) -> Result<Json<RecordedAnswerResponse>, ApiError> {
    let recorded = answer_recorder::get_recorded_answer(
        state.db(),
        state.random(),
        &user.id,
        &attempt_id,
        &question_id,
    )
    .await?;

    Ok(Json(RecordedAnswerResponse { answer_ids: recorded.answer_ids, question: recorded.question }))
}

pub(super) async fn toggle_flag(
    Path((attempt_id, question_id)): Path<(String, String)>,
    CurrentUser(user): CurrentUser,
    State(state): State<AppState>,
) -> Result<Json<FlagToggleResponse>, ApiError> {
    let toggled = flags::toggle_flag(state.db(), &user.id, &attempt_id, &question_id).await?;

    Ok(Json(FlagToggleResponse {
        question_id,
        flagged: toggled.flagged,
        flagged_questions: toggled.flagged_questions,
    }))
}

pub(super) async fn finish_attempt(
    Path(attempt_id): Path<String>,
    CurrentUser(user): CurrentUser,
    State(state): State<AppState>,
) -> Result<Json<AttemptResultResponse>, ApiError> {
    let verdict = grading::finish_attempt(state.db(), &user.id, &attempt_id).await?;
    Ok(Json(verdict_response(verdict)))
}

pub(super) async fn get_attempt_result(
    Path(attempt_id): Path<String>,
    CurrentUser(user): CurrentUser,
    State(state): State<AppState>,
) -> Result<Json<AttemptResultResponse>, ApiError> {
    let verdict = grading::attempt_result(state.db(), &user.id, &attempt_id).await?;
    Ok(Json(verdict_response(verdict)))
}
