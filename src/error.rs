use axum::{
    body::Body,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use tracing::{error, warn};

use crate::accounts::AccountError;
use crate::client::ClientError;

pub(crate) enum UiError {
    AccountManagementDisabled {},
    ReportingDisabled {},
    UnknownAction {},
    Account(AccountError),
    Upstream(ClientError),
    Unhandled(anyhow::Error),
}

fn format_error(e: &anyhow::Error) -> String {
    let mut s = String::new();
    s.push_str(&format!("{}", e));
    for cause in e.chain().skip(1) {
        s.push_str(&format!("\nCaused by: {}", cause));
    }
    s
}

pub(crate) fn simple_error(code: &str, message: &str) -> Body {
    Body::from(
        serde_json::json!({
            "errors": [{
                "code": code,
                "message": message
            }]
        })
        .to_string(),
    )
}

impl IntoResponse for UiError {
    fn into_response(self) -> Response {
        match self {
            Self::AccountManagementDisabled {} => Response::builder()
                .status(StatusCode::NOT_FOUND)
                .body(simple_error(
                    "ACCOUNTS_DISABLED",
                    "account management is not enabled",
                )),
            Self::ReportingDisabled {} => Response::builder()
                .status(StatusCode::NOT_FOUND)
                .body(simple_error(
                    "REPORTS_DISABLED",
                    "vulnerability reporting is not enabled",
                )),
            Self::UnknownAction {} => Response::builder()
                .status(StatusCode::BAD_REQUEST)
                .body(simple_error("UNKNOWN_ACTION", "unsupported form action")),
            Self::Account(err) => {
                let status = match &err {
                    AccountError::AlreadyExists => StatusCode::CONFLICT,
                    AccountError::NotFound => StatusCode::NOT_FOUND,
                    AccountError::UsernameInvalid => StatusCode::BAD_REQUEST,
                    AccountError::Hash(_) | AccountError::Io(_) | AccountError::Yaml(_) => {
                        error!(error = %err, "Account store failure");
                        StatusCode::INTERNAL_SERVER_ERROR
                    }
                };

                Response::builder()
                    .status(status)
                    .body(simple_error("ACCOUNT_ERROR", &err.to_string()))
            }
            Self::Upstream(err) => {
                warn!(error = %err, "Upstream failure");

                Response::builder()
                    .status(StatusCode::BAD_GATEWAY)
                    .body(simple_error("UPSTREAM_ERROR", &err.to_string()))
            }
            Self::Unhandled(err) => {
                error!(
                    error = %format_error(&err),
                    backtrace = ?err.backtrace(),
                    "Unhandled error"
                );
                Response::builder()
                    .status(StatusCode::INTERNAL_SERVER_ERROR)
                    .body(Body::empty())
            }
        }
        .unwrap_or_else(|err| {
            let err = err.into();
            error!(
                error = %format_error(&err),
                "Failed to render error response"
            );
            (StatusCode::INTERNAL_SERVER_ERROR, Body::empty()).into_response()
        })
    }
}

impl<E> From<E> for UiError
where
    E: Into<anyhow::Error>,
{
    fn from(err: E) -> Self {
        Self::Unhandled(err.into())
    }
}
