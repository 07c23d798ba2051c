use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::core::time::format_primitive;
use crate::db::models::ExamAttempt;
use crate::db::types::{AttemptMode, AttemptStatus};
use crate::schemas::question::QuestionPayload;
use crate::services::answer_recorder::RecordOutcome;

#[derive(Debug, Deserialize, Validate)]
pub(crate) struct AttemptCreate {
    pub(crate) mode: AttemptMode,
    #[serde(default)]
    #[serde(alias = "examId")]
    #[validate(length(min = 1, message = "exam_id must not be empty"))]
    pub(crate) exam_id: Option<String>,
    #[serde(default)]
    #[serde(alias = "subjectId")]
    #[validate(length(min = 1, message = "subject_id must not be empty"))]
    pub(crate) subject_id: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
pub(crate) struct AnswerSubmit {
    #[serde(alias = "questionId")]
    #[validate(length(min = 1, message = "question_id must not be empty"))]
    pub(crate) question_id: String,
    #[serde(default)]
    pub(crate) answers: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct AttemptListQuery {
    #[serde(default)]
    pub(crate) skip: i64,
    #[serde(default = "default_limit")]
    pub(crate) limit: i64,
    #[serde(default)]
    pub(crate) status: Option<AttemptStatus>,
}

pub(crate) const fn default_limit() -> i64 {
    100
}

#[derive(Debug, Serialize)]
pub(crate) struct AttemptResponse {
    pub(crate) id: String,
    pub(crate) mode: AttemptMode,
    pub(crate) status: AttemptStatus,
    pub(crate) grade: i32,
    pub(crate) duration_minutes: i32,
    pub(crate) created_at: String,
    pub(crate) finished_at: Option<String>,
}

impl From<&ExamAttempt> for AttemptResponse {
    fn from(attempt: &ExamAttempt) -> Self {
        Self {
            id: attempt.id.clone(),
            mode: attempt.mode,
            status: attempt.status,
            grade: attempt.grade,
            duration_minutes: attempt.duration_minutes,
            created_at: format_primitive(attempt.created_at),
            finished_at: attempt.finished_at.map(format_primitive),
        }
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct AttemptCreatedResponse {
    #[serde(flatten)]
    pub(crate) attempt: AttemptResponse,
    pub(crate) exams: Vec<String>,
    pub(crate) questions: Vec<String>,
    pub(crate) time_left_seconds: i64,
}

#[derive(Debug, Serialize)]
pub(crate) struct AttemptSummaryResponse {
    pub(crate) id: String,
    pub(crate) mode: AttemptMode,
    pub(crate) status: AttemptStatus,
    pub(crate) grade: i32,
    pub(crate) exams: Vec<String>,
    pub(crate) questions: Vec<String>,
    pub(crate) question_count: usize,
    pub(crate) answered_question_ids: Vec<String>,
    pub(crate) all_answered: bool,
    pub(crate) flagged_questions: Vec<String>,
    pub(crate) attempt_duration_minutes: i32,
    pub(crate) time_left_seconds: i64,
    pub(crate) created_at: String,
}

#[derive(Debug, Serialize)]
pub(crate) struct AttemptListResponse {
    pub(crate) items: Vec<AttemptResponse>,
    pub(crate) skip: i64,
    pub(crate) limit: i64,
}

#[derive(Debug, Serialize)]
pub(crate) struct NextQuestionResponse {
    pub(crate) question: Option<QuestionPayload>,
}

#[derive(Debug, Serialize)]
pub(crate) struct SubmitAnswerResponse {
    pub(crate) outcome: RecordOutcome,
}

#[derive(Debug, Serialize)]
pub(crate) struct RecordedAnswerResponse {
    pub(crate) answer_ids: Vec<String>,
    pub(crate) question: QuestionPayload,
}

#[derive(Debug, Serialize)]
pub(crate) struct FlagToggleResponse {
    pub(crate) question_id: String,
    pub(crate) flagged: bool,
    pub(crate) flagged_questions: Vec<String>,
}

#[derive(Debug, Serialize)]
pub(crate) struct AttemptResultResponse {
    pub(crate) id: String,
    pub(crate) status: AttemptStatus,
    pub(crate) grade: i32,
    pub(crate) passed: bool,
    pub(crate) passing_threshold: f64,
    pub(crate) finished_at: Option<String>,
}
