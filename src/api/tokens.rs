use crate::api::AppState;
use crate::api::schemas::tokens::{
    ClearTokensResponse, RegisterTokenRequest, RegisterTokenResponse, TokensCountResponse,
};
use crate::error::Result;
use axum::{Json, extract::State, extract::rejection::JsonRejection, response::IntoResponse};

/// Registers a device token for future broadcasts.
///
/// # Errors
/// Returns `AppError::Validation` if the token is missing or the body is not valid JSON.
pub async fn register_token(
    State(state): State<AppState>,
    payload: std::result::Result<Json<RegisterTokenRequest>, JsonRejection>,
) -> Result<impl IntoResponse> {
    let Json(payload) = payload?;
    let registration = state.registry.register(payload.token)?;
    tracing::info!(
        newly_added = registration.newly_added,
        total = registration.total_count,
        "Device token registered"
    );

    Ok(Json(RegisterTokenResponse {
        success: true,
        message: "Token registered successfully".into(),
        total_tokens: registration.total_count,
    }))
}

/// Lists the registered tokens.
pub async fn tokens_count(State(state): State<AppState>) -> impl IntoResponse {
    let tokens = state.registry.list();
    Json(TokensCountResponse { count: tokens.len(), tokens })
}

/// Forgets every registered token.
pub async fn clear_tokens(State(state): State<AppState>) -> impl IntoResponse {
    let previous = state.registry.clear();
    tracing::info!(count = previous, "Cleared registered tokens");
    Json(ClearTokensResponse { success: true, message: format!("Cleared {previous} tokens"), count: state.registry.count() })
}
