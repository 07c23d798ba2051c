use serde::{Deserialize, Serialize};
use sqlx::Type;

/// Presentation hint only: grading treats both kinds as set comparison.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(type_name = "questiontype", rename_all = "snake_case")]
pub(crate) enum QuestionType {
    MultipleChoice,
    MultipleSelect,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(type_name = "attemptstatus", rename_all = "snake_case")]
pub(crate) enum AttemptStatus {
    InProgress,
    Finished,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(type_name = "attemptmode", rename_all = "lowercase")]
pub(crate) enum AttemptMode {
    Practice,
    Exam,
}

impl AttemptMode {
    pub(crate) fn as_str(self) -> &'static str {
        match self {
            AttemptMode::Practice => "practice",
            AttemptMode::Exam => "exam",
        }
    }

    /// Only exam mode rejects writes once the clock runs out.
    pub(crate) fn enforces_deadline(self) -> bool {
        matches!(self, AttemptMode::Exam)
    }
}
