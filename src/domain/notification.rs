use crate::error::{AppError, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// Content of one notification. Title and body are guaranteed non-empty.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotificationPayload {
    title: String,
    body: String,
    data: HashMap<String, String>,
}

impl NotificationPayload {
    /// Builds a payload from optional request fields.
    ///
    /// # Errors
    /// Returns `AppError::Validation` if the title or body is missing or blank.
    pub fn new(title: Option<String>, body: Option<String>, data: Option<HashMap<String, String>>) -> Result<Self> {
        let title = title.filter(|t| !t.trim().is_empty());
        let body = body.filter(|b| !b.trim().is_empty());
        match (title, body) {
            (Some(title), Some(body)) => Ok(Self { title, body, data: data.unwrap_or_default() }),
            _ => Err(AppError::Validation("Title and body are required".into())),
        }
    }

    #[must_use]
    pub fn title(&self) -> &str {
        &self.title
    }

    #[must_use]
    pub fn body(&self) -> &str {
        &self.body
    }

    #[must_use]
    pub const fn data(&self) -> &HashMap<String, String> {
        &self.data
    }
}

/// Identifier the provider assigned to an accepted message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MessageId(pub String);

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum DeliveryErrorKind {
    InvalidRecipient,
    Auth,
    Transport,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeliveryError {
    pub kind: DeliveryErrorKind,
    pub detail: String,
}

/// Result for one recipient of a multi-target delivery, aligned by position with the submitted tokens.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeliveryResult {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message_id: Option<MessageId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<DeliveryError>,
}

impl DeliveryResult {
    #[must_use]
    pub const fn delivered(message_id: MessageId) -> Self {
        Self { success: true, message_id: Some(message_id), error: None }
    }

    #[must_use]
    pub fn failed(kind: DeliveryErrorKind, detail: impl Into<String>) -> Self {
        Self { success: false, message_id: None, error: Some(DeliveryError { kind, detail: detail.into() }) }
    }

    /// True when the provider reported the recipient itself as permanently invalid.
    #[must_use]
    pub fn is_invalid_recipient(&self) -> bool {
        self.error.as_ref().is_some_and(|e| e.kind == DeliveryErrorKind::InvalidRecipient)
    }
}

/// Aggregate result of a dispatch to every registered device.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// Exactly one recipient, sent through the single-target path.
    Single { response: MessageId },
    /// Several recipients, sent through the multi-target path.
    Batch { responses: Vec<DeliveryResult> },
}

impl DispatchOutcome {
    #[must_use]
    pub fn success_count(&self) -> usize {
        match self {
            Self::Single { .. } => 1,
            Self::Batch { responses } => responses.iter().filter(|r| r.success).count(),
        }
    }

    #[must_use]
    pub fn failure_count(&self) -> usize {
        match self {
            Self::Single { .. } => 0,
            Self::Batch { responses } => responses.iter().filter(|r| !r.success).count(),
        }
    }
}
