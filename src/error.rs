use crate::adapters::push::PushError;
use axum::{
    Json,
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

const STALE_TOKENS_MESSAGE: &str = "Invalid or expired device tokens. Please refresh the page to get new tokens.";
const STALE_TOKENS_DETAILS: &str =
    "Some device tokens are no longer valid. The app will automatically clean up invalid tokens.";

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Invalid request: {0}")]
    Validation(String),
    #[error("No devices registered")]
    NoRecipients,
    #[error("Invalid or expired device tokens")]
    StaleTokens,
    #[error("Failed to send notification: {0}")]
    Provider(#[from] PushError),
}

pub type Result<T> = std::result::Result<T, AppError>;

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        Self::Validation(rejection.body_text())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, body) = match self {
            Self::Validation(msg) => {
                tracing::debug!(message = %msg, "Bad request");
                (StatusCode::BAD_REQUEST, json!({ "error": msg }))
            }
            Self::NoRecipients => {
                tracing::debug!("Dispatch requested with no registered devices");
                (StatusCode::BAD_REQUEST, json!({ "error": "No devices registered" }))
            }
            Self::StaleTokens => {
                tracing::warn!("Provider reported stale device tokens");
                (StatusCode::BAD_REQUEST, json!({ "error": STALE_TOKENS_MESSAGE, "details": STALE_TOKENS_DETAILS }))
            }
            Self::Provider(e) => {
                tracing::error!(error = %e, "Error sending message");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    json!({ "error": "Failed to send notification", "details": e.detail() }),
                )
            }
        };

        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        assert_eq!(AppError::Validation("x".into()).into_response().status(), StatusCode::BAD_REQUEST);
        assert_eq!(AppError::NoRecipients.into_response().status(), StatusCode::BAD_REQUEST);
        assert_eq!(AppError::StaleTokens.into_response().status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            AppError::Provider(PushError::Auth("denied".into())).into_response().status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
