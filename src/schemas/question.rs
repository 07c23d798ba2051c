use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::db::types::QuestionType;

#[derive(Debug, Clone, Serialize)]
pub(crate) struct AnswerOptionResponse {
    pub(crate) id: String,
    pub(crate) text: String,
}

/// A question as shown to the user. Correctness is never exposed here.
#[derive(Debug, Clone, Serialize)]
pub(crate) struct QuestionPayload {
    pub(crate) id: String,
    pub(crate) text: String,
    #[serde(rename = "type")]
    pub(crate) question_type: QuestionType,
    pub(crate) answers: Vec<AnswerOptionResponse>,
}

#[derive(Debug, Deserialize, Validate)]
pub(crate) struct CheckAnswerRequest {
    #[validate(length(min = 1, message = "answers must not be empty"))]
    pub(crate) answers: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub(crate) enum CheckResult {
    Correct,
    Wrong,
}

#[derive(Debug, Serialize)]
pub(crate) struct CheckAnswerResponse {
    pub(crate) result: CheckResult,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) correct_answers: Option<Vec<String>>,
}
