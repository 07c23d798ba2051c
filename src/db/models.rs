use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use time::PrimitiveDateTime;

use crate::db::types::{AttemptMode, AttemptStatus, QuestionType};

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub(crate) struct User {
    pub(crate) id: String,
    pub(crate) username: String,
    pub(crate) extra_time_minutes: i32,
    pub(crate) is_active: bool,
    pub(crate) created_at: PrimitiveDateTime,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub(crate) struct Subject {
    pub(crate) id: String,
    pub(crate) name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub(crate) struct Exam {
    pub(crate) id: String,
    pub(crate) subject_id: String,
    pub(crate) name: String,
    pub(crate) duration_minutes: i32,
    pub(crate) passing_grade: i32,
    pub(crate) question_count: i32,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub(crate) struct Question {
    pub(crate) id: String,
    pub(crate) exam_id: String,
    pub(crate) category_id: String,
    pub(crate) text: String,
    #[sqlx(rename = "type")]
    pub(crate) question_type: QuestionType,
    pub(crate) weight: i32,
}

/// An answer joined with its role for one question.
#[derive(Debug, Clone, FromRow)]
pub(crate) struct QuestionOption {
    pub(crate) answer_id: String,
    pub(crate) text: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub(crate) struct ExamAttempt {
    pub(crate) id: String,
    pub(crate) user_id: String,
    pub(crate) created_at: PrimitiveDateTime,
    pub(crate) duration_minutes: i32,
    pub(crate) grade: i32,
    pub(crate) status: AttemptStatus,
    pub(crate) mode: AttemptMode,
    pub(crate) finished_at: Option<PrimitiveDateTime>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub(crate) struct AnswerAttempt {
    pub(crate) id: String,
    pub(crate) attempt_id: String,
    pub(crate) question_id: String,
    pub(crate) created_at: PrimitiveDateTime,
    pub(crate) updated_at: PrimitiveDateTime,
}
