use std::sync::Arc;

use axum::{
    Form, Json,
    extract::State,
    response::{IntoResponse, Redirect, Response},
};
use serde::Deserialize;

use crate::{error::UiError, state::UiState};

#[derive(Debug, Deserialize)]
pub(crate) struct UserForm {
    method: String,
    username: String,
    password: Option<String>,
}

pub(crate) async fn get(State(state): State<Arc<UiState>>) -> Result<Response, UiError> {
    let Some(accounts) = &state.accounts else {
        return Err(UiError::AccountManagementDisabled {});
    };

    // Hashes never leave the store.
    let usernames = accounts.usernames().await.map_err(UiError::Account)?;

    Ok(Json(serde_json::json!({ "users": usernames })).into_response())
}

pub(crate) async fn post(
    State(state): State<Arc<UiState>>,
    Form(UserForm {
        method,
        username,
        password,
    }): Form<UserForm>,
) -> Result<Response, UiError> {
    let Some(accounts) = &state.accounts else {
        return Err(UiError::AccountManagementDisabled {});
    };

    match method.as_str() {
        "add" => {
            let password = password.unwrap_or_default();
            accounts
                .add(&username, &password)
                .await
                .map_err(UiError::Account)?;
        }
        "delete" => {
            accounts.delete(&username).await.map_err(UiError::Account)?;
        }
        _ => return Err(UiError::UnknownAction {}),
    }

    Ok(Redirect::to("/users").into_response())
}
