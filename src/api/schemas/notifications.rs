use crate::domain::notification::{DeliveryResult, DispatchOutcome, MessageId, NotificationPayload};
use crate::domain::token::DeviceToken;
use crate::error::{AppError, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[derive(Debug, Deserialize)]
pub struct SendNotificationRequest {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub body: Option<String>,
    #[serde(default)]
    pub data: Option<HashMap<String, String>>,
}

impl SendNotificationRequest {
    /// Validates the request into a payload.
    ///
    /// # Errors
    /// Returns `AppError::Validation` if the title or body is missing.
    pub fn into_payload(self) -> Result<NotificationPayload> {
        NotificationPayload::new(self.title, self.body, self.data)
    }
}

#[derive(Debug, Deserialize)]
pub struct SendToDeviceRequest {
    #[serde(default)]
    pub token: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub body: Option<String>,
    #[serde(default)]
    pub data: Option<HashMap<String, String>>,
}

impl SendToDeviceRequest {
    /// Validates the request into a target token and payload.
    ///
    /// # Errors
    /// Returns `AppError::Validation` if the token, title or body is missing.
    pub fn into_parts(self) -> Result<(DeviceToken, NotificationPayload)> {
        let present = |field: &Option<String>| field.as_deref().is_some_and(|v| !v.trim().is_empty());
        if !(present(&self.token) && present(&self.title) && present(&self.body)) {
            return Err(AppError::Validation("Token, title and body are required".into()));
        }
        let token = DeviceToken::parse(self.token)?;
        let payload = NotificationPayload::new(self.title, self.body, self.data)?;
        Ok((token, payload))
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SendNotificationResponse {
    pub success: bool,
    pub message: &'static str,
    pub success_count: usize,
    pub failure_count: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response: Option<MessageId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub responses: Option<Vec<DeliveryResult>>,
}

impl From<DispatchOutcome> for SendNotificationResponse {
    fn from(outcome: DispatchOutcome) -> Self {
        let success_count = outcome.success_count();
        let failure_count = outcome.failure_count();
        let (response, responses) = match outcome {
            DispatchOutcome::Single { response } => (Some(response), None),
            DispatchOutcome::Batch { responses } => (None, Some(responses)),
        };
        Self { success: true, message: "Notification sent successfully", success_count, failure_count, response, responses }
    }
}

#[derive(Debug, Serialize)]
pub struct SendToDeviceResponse {
    pub success: bool,
    pub message: &'static str,
    pub response: MessageId,
}
