use std::sync::Arc;

use axum::{Router, routing::get};

use crate::state::UiState;

mod catalog;
mod report;
mod users;

pub(crate) fn router(state: Arc<UiState>) -> Router {
    Router::new()
        .route("/", get(catalog::get))
        .route("/catalog", get(catalog::get))
        .route("/report", get(report::get))
        .route("/users", get(users::get).post(users::post))
        .with_state(state)
}
