use std::sync::Arc;

use axum::{
    Json,
    extract::State,
    response::{IntoResponse, Response},
};

use crate::{catalog::build_catalog, error::UiError, state::UiState};

pub(crate) async fn get(State(state): State<Arc<UiState>>) -> Result<Response, UiError> {
    let catalog = build_catalog(&state.client, &state.config.registry)
        .await
        .map_err(UiError::Upstream)?;

    Ok(Json(catalog).into_response())
}
