mod handlers;

use axum::{routing::get, routing::post, Router};

use crate::core::state::AppState;

pub(crate) fn router() -> Router<AppState> {
    Router::new()
        .route("/", post(handlers::create_attempt).get(handlers::list_my_attempts))
        .route("/:attempt_id", get(handlers::get_attempt_summary))
        .route("/:attempt_id/next-question", get(handlers::get_next_question))
        .route("/:attempt_id/answers", post(handlers::submit_answer))
        .route("/:attempt_id/questions/:question_id", get(handlers::get_recorded_answer))
        .route("/:attempt_id/flags/:question_id", post(handlers::toggle_flag))
        .route("/:attempt_id/finish", post(handlers::finish_attempt))
        .route("/:attempt_id/result", get(handlers::get_attempt_result))
}

#[cfg(test)]
mod tests;
