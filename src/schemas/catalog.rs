use serde::Serialize;

use crate::db::models::{Exam, Subject};

#[derive(Debug, Serialize)]
pub(crate) struct SubjectResponse {
    pub(crate) id: String,
    pub(crate) name: String,
}

impl From<Subject> for SubjectResponse {
    fn from(subject: Subject) -> Self {
        Self { id: subject.id, name: subject.name }
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct ExamResponse {
    pub(crate) id: String,
    pub(crate) subject_id: String,
    pub(crate) name: String,
    pub(crate) duration_minutes: i32,
    pub(crate) passing_grade: i32,
    pub(crate) question_count: i32,
}

impl From<Exam> for ExamResponse {
    fn from(exam: Exam) -> Self {
        Self {
            id: exam.id,
            subject_id: exam.subject_id,
            name: exam.name,
            duration_minutes: exam.duration_minutes,
            passing_grade: exam.passing_grade,
            question_count: exam.question_count,
        }
    }
}

/// Exam detail shown before starting, with the caller's own time allowance.
#[derive(Debug, Serialize)]
pub(crate) struct ExamIntroResponse {
    #[serde(flatten)]
    pub(crate) exam: ExamResponse,
    pub(crate) extra_time_minutes: i32,
    pub(crate) effective_duration_minutes: i32,
}
