mod handlers;
mod queries;
mod slots;

use axum::{routing::get, routing::post, Router};

use crate::core::state::AppState;

pub(crate) fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(handlers::list_quizzes).post(handlers::create_quiz))
        .route(
            "/:quiz_id",
            get(handlers::get_quiz).patch(handlers::update_quiz).delete(handlers::delete_quiz),
        )
        .route("/:quiz_id/status", post(handlers::change_status))
        .route("/:quiz_id/slots", get(slots::get_slots).post(slots::replace_slots))
        .route("/:quiz_id/marking", get(slots::run_marking))
}

#[cfg(test)]
mod tests;
