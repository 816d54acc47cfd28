use crate::api::AppState;
use crate::api::schemas::notifications::{
    SendNotificationRequest, SendNotificationResponse, SendToDeviceRequest, SendToDeviceResponse,
};
use crate::error::Result;
use axum::{Json, extract::State, extract::rejection::JsonRejection, response::IntoResponse};

/// Broadcasts a notification to every registered device.
///
/// # Errors
/// Returns `AppError::Validation` if the title or body is missing.
/// Returns `AppError::NoRecipients` if no device is registered.
/// Returns `AppError::StaleTokens` or `AppError::Provider` if the provider call failed.
pub async fn send_notification(
    State(state): State<AppState>,
    payload: std::result::Result<Json<SendNotificationRequest>, JsonRejection>,
) -> Result<impl IntoResponse> {
    let Json(payload) = payload?;
    let payload = payload.into_payload()?;
    let outcome = state.dispatcher.dispatch_to_all(&payload).await?;
    Ok(Json(SendNotificationResponse::from(outcome)))
}

/// Sends a notification to one device, registered or not.
///
/// # Errors
/// Returns `AppError::Validation` if the token, title or body is missing.
/// Returns `AppError::Provider` if the provider did not accept the message.
pub async fn send_notification_to_device(
    State(state): State<AppState>,
    payload: std::result::Result<Json<SendToDeviceRequest>, JsonRejection>,
) -> Result<impl IntoResponse> {
    let Json(payload) = payload?;
    let (token, payload) = payload.into_parts()?;
    let response = state.dispatcher.dispatch_to_one(&token, &payload).await?;
    Ok(Json(SendToDeviceResponse { success: true, message: "Notification sent successfully", response }))
}
