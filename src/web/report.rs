use std::sync::Arc;

use axum::{
    Json,
    extract::{Query, State},
    response::{IntoResponse, Response},
};
use serde::Deserialize;

use crate::{error::UiError, scanner, state::UiState};

#[derive(Debug, Deserialize)]
pub(crate) struct ReportQuery {
    image: String,
    registry: Option<String>,
    reference: Option<String>,
}

pub(crate) async fn get(
    Query(ReportQuery {
        image,
        registry,
        reference,
    }): Query<ReportQuery>,
    State(state): State<Arc<UiState>>,
) -> Result<Response, UiError> {
    let Some(scanner_config) = &state.config.scanner else {
        return Err(UiError::ReportingDisabled {});
    };

    let registry = registry.unwrap_or_else(|| state.config.registry.clone());
    let reference = reference.as_deref().unwrap_or("latest");

    let report = scanner::analysis(
        &state.client,
        &scanner_config.url,
        &registry,
        &image,
        reference,
    )
    .await
    .map_err(UiError::Upstream)?;

    Ok(Json(report).into_response())
}
