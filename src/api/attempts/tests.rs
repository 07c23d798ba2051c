use axum::http::{Method, StatusCode};
use serde_json::json;
use time::Duration;
use tower::ServiceExt;

use super::handlers::scope_from_request;
use crate::api::errors::ApiError;
use crate::core::time::primitive_now_utc;
use crate::repositories;
use crate::services::attempt_builder::AttemptScope;
use crate::test_support::{self, ExamFixture, SeededExam, TestContext};

async fn send(
    ctx: &TestContext,
    method: Method,
    uri: &str,
    token: &str,
    body: Option<serde_json::Value>,
) -> (StatusCode, serde_json::Value) {
    let response = ctx
        .app
        .clone()
        .oneshot(test_support::json_request(method, uri, Some(token), body))
        .await
        .expect("response");
    let status = response.status();
    (status, test_support::read_json(response).await)
}

async fn seed_scenario_exam(ctx: &TestContext) -> SeededExam {
    let subject = test_support::insert_subject(ctx.state.db(), "Chemistry").await;
    test_support::insert_exam(
        ctx.state.db(),
        &subject.id,
        ExamFixture {
            name: "Exam E",
            duration_minutes: 120,
            passing_grade: 75,
            question_count: 2,
            correct_per_question: &[1, 2, 1],
        },
    )
    .await
}

async fn start_attempt(
    ctx: &TestContext,
    token: &str,
    mode: &str,
    exam_id: &str,
) -> (String, Vec<String>) {
    let (status, created) = send(
        ctx,
        Method::POST,
        "/api/v1/attempts",
        token,
        Some(json!({"mode": mode, "exam_id": exam_id})),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "response: {created}");

    let attempt_id = created["id"].as_str().expect("attempt id").to_string();
    let questions = created["questions"]
        .as_array()
        .expect("questions")
        .iter()
        .map(|value| value.as_str().expect("question id").to_string())
        .collect();
    (attempt_id, questions)
}

#[test]
fn scope_requires_exactly_one_target() {
    assert_eq!(
        scope_from_request(Some("e1".to_string()), None).expect("exam scope"),
        AttemptScope::Exam("e1".to_string())
    );
    assert_eq!(
        scope_from_request(None, Some("s1".to_string())).expect("subject scope"),
        AttemptScope::Subject("s1".to_string())
    );
    assert!(matches!(scope_from_request(None, None), Err(ApiError::BadRequest(_))));
    assert!(matches!(
        scope_from_request(Some("e1".to_string()), Some("s1".to_string())),
        Err(ApiError::BadRequest(_))
    ));
}

#[tokio::test]
async fn exam_attempt_end_to_end_scenario() {
    let ctx = test_support::setup_test_context().await;
    let exam = seed_scenario_exam(&ctx).await;
    let user = test_support::insert_user(ctx.state.db(), "student-u", 30).await;
    let token = test_support::bearer_token(&user.id, ctx.state.settings());

    let (status, created) = send(
        &ctx,
        Method::POST,
        "/api/v1/attempts",
        &token,
        Some(json!({"mode": "exam", "exam_id": exam.exam.id})),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "response: {created}");
    assert_eq!(created["duration_minutes"], 150);
    assert_eq!(created["status"], "in_progress");
    assert_eq!(created["grade"], 0);
    assert_eq!(created["exams"], json!([exam.exam.id]));
    let attempt_id = created["id"].as_str().expect("attempt id").to_string();
    let questions = created["questions"].as_array().expect("questions").clone();
    assert_eq!(questions.len(), 2);

    let first = exam.question(questions[0].as_str().expect("id")).clone();
    let second = exam.question(questions[1].as_str().expect("id")).clone();

    let (status, next) =
        send(&ctx, Method::GET, &format!("/api/v1/attempts/{attempt_id}/next-question"), &token, None)
            .await;
    assert_eq!(status, StatusCode::OK, "response: {next}");
    assert_eq!(next["question"]["id"], first.id);
    let offered = next["question"]["answers"].as_array().expect("answers").len();
    assert_eq!(offered, first.correct.len() + first.wrong.len());
    assert!(next["question"]["answers"][0].get("is_correct").is_none());

    let (status, body) = send(
        &ctx,
        Method::POST,
        &format!("/api/v1/attempts/{attempt_id}/answers"),
        &token,
        Some(json!({"question_id": first.id, "answers": first.correct})),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "response: {body}");
    assert_eq!(body["outcome"], "created");

    let (status, next) =
        send(&ctx, Method::GET, &format!("/api/v1/attempts/{attempt_id}/next-question"), &token, None)
            .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(next["question"]["id"], second.id);

    let (status, body) = send(
        &ctx,
        Method::POST,
        &format!("/api/v1/attempts/{attempt_id}/answers"),
        &token,
        Some(json!({"question_id": second.id, "answers": second.wrong})),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "response: {body}");

    let (status, next) =
        send(&ctx, Method::GET, &format!("/api/v1/attempts/{attempt_id}/next-question"), &token, None)
            .await;
    assert_eq!(status, StatusCode::OK);
    assert!(next["question"].is_null());

    let (status, result) =
        send(&ctx, Method::POST, &format!("/api/v1/attempts/{attempt_id}/finish"), &token, None)
            .await;
    assert_eq!(status, StatusCode::OK, "response: {result}");
    assert_eq!(result["grade"], 50);
    assert_eq!(result["passed"], false);
    assert_eq!(result["status"], "finished");
    assert_eq!(result["passing_threshold"], 75.0);

    let (status, again) =
        send(&ctx, Method::POST, &format!("/api/v1/attempts/{attempt_id}/finish"), &token, None)
            .await;
    assert_eq!(status, StatusCode::OK, "response: {again}");
    assert_eq!(again["grade"], 50);
    assert_eq!(again["finished_at"], result["finished_at"]);

    let (status, stored) =
        send(&ctx, Method::GET, &format!("/api/v1/attempts/{attempt_id}/result"), &token, None)
            .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(stored["grade"], 50);

    let (status, _) = send(
        &ctx,
        Method::POST,
        &format!("/api/v1/attempts/{attempt_id}/answers"),
        &token,
        Some(json!({"question_id": second.id, "answers": second.correct})),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn resubmission_is_idempotent_and_replaces_answers() {
    let ctx = test_support::setup_test_context().await;
    let exam = seed_scenario_exam(&ctx).await;
    let user = test_support::insert_user(ctx.state.db(), "student-r", 0).await;
    let token = test_support::bearer_token(&user.id, ctx.state.settings());
    let (attempt_id, questions) = start_attempt(&ctx, &token, "practice", &exam.exam.id).await;
    let question = exam.question(&questions[0]).clone();
    let answers_uri = format!("/api/v1/attempts/{attempt_id}/answers");

    let (status, body) = send(
        &ctx,
        Method::POST,
        &answers_uri,
        &token,
        Some(json!({"question_id": question.id, "answers": question.correct})),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["outcome"], "created");

    let (status, body) = send(
        &ctx,
        Method::POST,
        &answers_uri,
        &token,
        Some(json!({"question_id": question.id, "answers": question.correct})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["outcome"], "unchanged");

    let (status, body) = send(
        &ctx,
        Method::POST,
        &answers_uri,
        &token,
        Some(json!({"question_id": question.id, "answers": question.wrong})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["outcome"], "updated");

    let (status, recorded) = send(
        &ctx,
        Method::GET,
        &format!("/api/v1/attempts/{attempt_id}/questions/{}", question.id),
        &token,
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK, "response: {recorded}");
    assert_eq!(recorded["answer_ids"], json!(question.wrong));
    assert_eq!(recorded["question"]["id"], question.id);

    let count = repositories::answer_attempts::count_by_attempt(ctx.state.db(), &attempt_id)
        .await
        .expect("count");
    assert_eq!(count, 1);
}

#[tokio::test]
async fn submission_validation_errors() {
    let ctx = test_support::setup_test_context().await;
    let exam = seed_scenario_exam(&ctx).await;
    let user = test_support::insert_user(ctx.state.db(), "student-v", 0).await;
    let token = test_support::bearer_token(&user.id, ctx.state.settings());
    let (attempt_id, questions) = start_attempt(&ctx, &token, "exam", &exam.exam.id).await;
    let answers_uri = format!("/api/v1/attempts/{attempt_id}/answers");
    let question = exam.question(&questions[0]).clone();

    let (status, _) = send(
        &ctx,
        Method::POST,
        &answers_uri,
        &token,
        Some(json!({"question_id": question.id, "answers": []})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let outside = exam
        .questions
        .iter()
        .find(|candidate| !questions.contains(&candidate.id))
        .expect("unsampled question");
    let (status, _) = send(
        &ctx,
        Method::POST,
        &answers_uri,
        &token,
        Some(json!({"question_id": outside.id, "answers": outside.correct})),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = send(
        &ctx,
        Method::POST,
        &answers_uri,
        &token,
        Some(json!({"question_id": question.id, "answers": outside.correct})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = send(
        &ctx,
        Method::GET,
        &format!("/api/v1/attempts/{attempt_id}/questions/{}", question.id),
        &token,
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn deadline_applies_to_exam_mode_only() {
    let ctx = test_support::setup_test_context().await;
    let exam = seed_scenario_exam(&ctx).await;
    let user = test_support::insert_user(ctx.state.db(), "student-d", 0).await;
    let token = test_support::bearer_token(&user.id, ctx.state.settings());
    let long_ago = primitive_now_utc() - Duration::hours(5);

    let (exam_attempt, exam_questions) = start_attempt(&ctx, &token, "exam", &exam.exam.id).await;
    repositories::attempts::backdate(ctx.state.db(), &exam_attempt, long_ago)
        .await
        .expect("backdate");
    let question = exam.question(&exam_questions[0]).clone();

    let (status, body) = send(
        &ctx,
        Method::POST,
        &format!("/api/v1/attempts/{exam_attempt}/answers"),
        &token,
        Some(json!({"question_id": question.id, "answers": question.correct})),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND, "response: {body}");
    assert_eq!(body["detail"], "Attempt time has expired");

    let (status, summary) =
        send(&ctx, Method::GET, &format!("/api/v1/attempts/{exam_attempt}"), &token, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(summary["time_left_seconds"], 0);

    let (practice_attempt, practice_questions) =
        start_attempt(&ctx, &token, "practice", &exam.exam.id).await;
    repositories::attempts::backdate(ctx.state.db(), &practice_attempt, long_ago)
        .await
        .expect("backdate");
    let question = exam.question(&practice_questions[0]).clone();

    let (status, body) = send(
        &ctx,
        Method::POST,
        &format!("/api/v1/attempts/{practice_attempt}/answers"),
        &token,
        Some(json!({"question_id": question.id, "answers": question.correct})),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "response: {body}");
}

#[tokio::test]
async fn finish_requires_every_question() {
    let ctx = test_support::setup_test_context().await;
    let exam = seed_scenario_exam(&ctx).await;
    let user = test_support::insert_user(ctx.state.db(), "student-f", 0).await;
    let token = test_support::bearer_token(&user.id, ctx.state.settings());
    let (attempt_id, questions) = start_attempt(&ctx, &token, "exam", &exam.exam.id).await;

    let (status, body) =
        send(&ctx, Method::POST, &format!("/api/v1/attempts/{attempt_id}/finish"), &token, None)
            .await;
    assert_eq!(status, StatusCode::CONFLICT, "response: {body}");

    let question = exam.question(&questions[0]).clone();
    send(
        &ctx,
        Method::POST,
        &format!("/api/v1/attempts/{attempt_id}/answers"),
        &token,
        Some(json!({"question_id": question.id, "answers": question.correct})),
    )
    .await;

    let (status, _) =
        send(&ctx, Method::POST, &format!("/api/v1/attempts/{attempt_id}/finish"), &token, None)
            .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, _) =
        send(&ctx, Method::GET, &format!("/api/v1/attempts/{attempt_id}/result"), &token, None)
            .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, summary) =
        send(&ctx, Method::GET, &format!("/api/v1/attempts/{attempt_id}"), &token, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(summary["status"], "in_progress");
    assert_eq!(summary["all_answered"], false);
    assert_eq!(summary["answered_question_ids"], json!([question.id]));
}

#[tokio::test]
async fn flag_toggle_round_trip() {
    let ctx = test_support::setup_test_context().await;
    let exam = seed_scenario_exam(&ctx).await;
    let user = test_support::insert_user(ctx.state.db(), "student-g", 0).await;
    let token = test_support::bearer_token(&user.id, ctx.state.settings());
    let (attempt_id, questions) = start_attempt(&ctx, &token, "exam", &exam.exam.id).await;
    let flag_uri = format!("/api/v1/attempts/{attempt_id}/flags/{}", questions[1]);

    let (status, body) = send(&ctx, Method::POST, &flag_uri, &token, None).await;
    assert_eq!(status, StatusCode::OK, "response: {body}");
    assert_eq!(body["flagged"], true);
    assert_eq!(body["flagged_questions"], json!([questions[1]]));

    let (status, body) = send(&ctx, Method::POST, &flag_uri, &token, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["flagged"], false);
    assert_eq!(body["flagged_questions"], json!([]));

    let outside = exam
        .questions
        .iter()
        .find(|candidate| !questions.contains(&candidate.id))
        .expect("unsampled question");
    let (status, _) = send(
        &ctx,
        Method::POST,
        &format!("/api/v1/attempts/{attempt_id}/flags/{}", outside.id),
        &token,
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn subject_attempt_spans_all_exams() {
    let ctx = test_support::setup_test_context().await;
    let subject = test_support::insert_subject(ctx.state.db(), "Physics").await;
    let first = test_support::insert_exam(
        ctx.state.db(),
        &subject.id,
        ExamFixture {
            name: "Mechanics",
            duration_minutes: 60,
            passing_grade: 70,
            question_count: 1,
            correct_per_question: &[1, 1],
        },
    )
    .await;
    let second = test_support::insert_exam(
        ctx.state.db(),
        &subject.id,
        ExamFixture {
            name: "Optics",
            duration_minutes: 91,
            passing_grade: 90,
            question_count: 1,
            correct_per_question: &[1, 2],
        },
    )
    .await;
    let user = test_support::insert_user(ctx.state.db(), "student-s", 15).await;
    let token = test_support::bearer_token(&user.id, ctx.state.settings());

    let (status, created) = send(
        &ctx,
        Method::POST,
        "/api/v1/attempts",
        &token,
        Some(json!({"mode": "practice", "subject_id": subject.id})),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "response: {created}");
    assert_eq!(created["duration_minutes"], 91);
    assert_eq!(created["exams"].as_array().expect("exams").len(), 2);

    let attempt_id = created["id"].as_str().expect("attempt id").to_string();
    let sampled = created["questions"].as_array().expect("questions").clone();
    assert_eq!(sampled.len(), 4);

    for value in &sampled {
        let id = value.as_str().expect("id");
        let question = first
            .questions
            .iter()
            .chain(second.questions.iter())
            .find(|question| question.id == id)
            .expect("question from subject pool");
        send(
            &ctx,
            Method::POST,
            &format!("/api/v1/attempts/{attempt_id}/answers"),
            &token,
            Some(json!({"question_id": question.id, "answers": question.correct})),
        )
        .await;
    }

    let (status, result) =
        send(&ctx, Method::POST, &format!("/api/v1/attempts/{attempt_id}/finish"), &token, None)
            .await;
    assert_eq!(status, StatusCode::OK, "response: {result}");
    assert_eq!(result["grade"], 100);
    assert_eq!(result["passing_threshold"], 80.0);
    assert_eq!(result["passed"], true);
}

#[tokio::test]
async fn duration_is_fixed_at_creation() {
    let ctx = test_support::setup_test_context().await;
    let exam = seed_scenario_exam(&ctx).await;
    let user = test_support::insert_user(ctx.state.db(), "student-x", 30).await;
    let token = test_support::bearer_token(&user.id, ctx.state.settings());
    let (attempt_id, _) = start_attempt(&ctx, &token, "exam", &exam.exam.id).await;

    repositories::users::update_extra_time(ctx.state.db(), &user.id, 90)
        .await
        .expect("update extra time");
    repositories::exams::update_duration(ctx.state.db(), &exam.exam.id, 10)
        .await
        .expect("update duration");

    let (status, summary) =
        send(&ctx, Method::GET, &format!("/api/v1/attempts/{attempt_id}"), &token, None).await;
    assert_eq!(status, StatusCode::OK, "response: {summary}");
    assert_eq!(summary["attempt_duration_minutes"], 150);
    assert!(summary["time_left_seconds"].as_i64().expect("time left") > 140 * 60);

    let (status, intro) =
        send(&ctx, Method::GET, &format!("/api/v1/exams/{}", exam.exam.id), &token, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(intro["effective_duration_minutes"], 100);
}

#[tokio::test]
async fn attempts_are_private_to_their_owner() {
    let ctx = test_support::setup_test_context().await;
    let exam = seed_scenario_exam(&ctx).await;
    let owner = test_support::insert_user(ctx.state.db(), "owner", 0).await;
    let intruder = test_support::insert_user(ctx.state.db(), "intruder", 0).await;
    let owner_token = test_support::bearer_token(&owner.id, ctx.state.settings());
    let intruder_token = test_support::bearer_token(&intruder.id, ctx.state.settings());
    let (attempt_id, questions) = start_attempt(&ctx, &owner_token, "exam", &exam.exam.id).await;

    for (method, uri) in [
        (Method::GET, format!("/api/v1/attempts/{attempt_id}")),
        (Method::GET, format!("/api/v1/attempts/{attempt_id}/next-question")),
        (Method::POST, format!("/api/v1/attempts/{attempt_id}/flags/{}", questions[0])),
        (Method::POST, format!("/api/v1/attempts/{attempt_id}/finish")),
    ] {
        let (status, _) = send(&ctx, method, &uri, &intruder_token, None).await;
        assert_eq!(status, StatusCode::NOT_FOUND, "{uri}");
    }

    let (status, list) = send(&ctx, Method::GET, "/api/v1/attempts", &intruder_token, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(list["items"], json!([]));

    let (status, list) = send(&ctx, Method::GET, "/api/v1/attempts", &owner_token, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(list["items"][0]["id"], attempt_id);
}

#[tokio::test]
async fn create_attempt_rejects_bad_scope() {
    let ctx = test_support::setup_test_context().await;
    let exam = seed_scenario_exam(&ctx).await;
    let user = test_support::insert_user(ctx.state.db(), "student-b", 0).await;
    let token = test_support::bearer_token(&user.id, ctx.state.settings());

    let (status, _) = send(
        &ctx,
        Method::POST,
        "/api/v1/attempts",
        &token,
        Some(json!({"mode": "exam", "exam_id": exam.exam.id, "subject_id": exam.exam.subject_id})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = send(
        &ctx,
        Method::POST,
        "/api/v1/attempts",
        &token,
        Some(json!({"mode": "exam", "exam_id": "missing-exam"})),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let empty_subject = test_support::insert_subject(ctx.state.db(), "Empty").await;
    let (status, _) = send(
        &ctx,
        Method::POST,
        "/api/v1/attempts",
        &token,
        Some(json!({"mode": "practice", "subject_id": empty_subject.id})),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}
