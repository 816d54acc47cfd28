use crate::domain::notification::{DeliveryErrorKind, DeliveryResult, MessageId, NotificationPayload};
use crate::domain::token::DeviceToken;
use async_trait::async_trait;
use thiserror::Error;

pub mod fcm;

/// Provider failure, classified once at the adapter boundary.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PushError {
    #[error("Token is no longer registered: {0}")]
    InvalidRecipient(String),
    #[error("Provider rejected credentials: {0}")]
    Auth(String),
    #[error("External service error: {0}")]
    Transport(String),
}

impl PushError {
    #[must_use]
    pub const fn kind(&self) -> DeliveryErrorKind {
        match self {
            Self::InvalidRecipient(_) => DeliveryErrorKind::InvalidRecipient,
            Self::Auth(_) => DeliveryErrorKind::Auth,
            Self::Transport(_) => DeliveryErrorKind::Transport,
        }
    }

    #[must_use]
    pub fn detail(&self) -> &str {
        match self {
            Self::InvalidRecipient(d) | Self::Auth(d) | Self::Transport(d) => d,
        }
    }
}

impl From<Result<MessageId, PushError>> for DeliveryResult {
    fn from(res: Result<MessageId, PushError>) -> Self {
        match res {
            Ok(id) => Self::delivered(id),
            Err(e) => Self::failed(e.kind(), e.detail()),
        }
    }
}

#[async_trait]
pub trait PushProvider: Send + Sync + std::fmt::Debug {
    /// Delivers a notification to exactly one device.
    ///
    /// # Errors
    /// Returns `PushError::InvalidRecipient` if the token is no longer valid and should be forgotten.
    async fn send_one(&self, token: &DeviceToken, payload: &NotificationPayload) -> Result<MessageId, PushError>;

    /// Delivers a notification to many devices.
    ///
    /// The returned results are positionally aligned with `tokens`; per-recipient rejections are
    /// reported there rather than as an error.
    ///
    /// # Errors
    /// Returns an error only when the call failed as a whole: either no recipient was attempted,
    /// or every recipient failed for a reason that is not about the recipient itself.
    async fn send_batch(
        &self,
        tokens: &[DeviceToken],
        payload: &NotificationPayload,
    ) -> Result<Vec<DeliveryResult>, PushError>;
}
