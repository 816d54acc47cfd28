use crate::error::{AppError, Result};
use serde::Serialize;
use std::fmt;

/// Upper bound on accepted token length; FCM web tokens are well under this.
pub const MAX_TOKEN_LEN: usize = 4096;

/// Opaque identifier issued by the push provider for one subscribed client.
///
/// The only way to build one is [`DeviceToken::parse`], so a `DeviceToken` is never empty.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct DeviceToken(String);

impl DeviceToken {
    /// Validates a raw token string.
    ///
    /// # Errors
    /// Returns `AppError::Validation` if the token is missing, blank or longer than [`MAX_TOKEN_LEN`].
    pub fn parse(raw: Option<String>) -> Result<Self> {
        let raw = raw.unwrap_or_default();
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(AppError::Validation("Token is required".into()));
        }
        if trimmed.len() > MAX_TOKEN_LEN {
            return Err(AppError::Validation(format!("Token is too long (max {MAX_TOKEN_LEN} characters)")));
        }
        Ok(Self(trimmed.to_owned()))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl AsRef<str> for DeviceToken {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DeviceToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_success() {
        let token = DeviceToken::parse(Some("valid_fcm_token_123".into())).unwrap();
        assert_eq!(token.as_str(), "valid_fcm_token_123");
    }

    #[test]
    fn test_parse_trims_whitespace() {
        let token = DeviceToken::parse(Some("  abc  ".into())).unwrap();
        assert_eq!(token.as_str(), "abc");
    }

    #[test]
    fn test_parse_missing_or_blank() {
        assert!(matches!(DeviceToken::parse(None), Err(AppError::Validation(_))));
        assert!(matches!(DeviceToken::parse(Some(String::new())), Err(AppError::Validation(_))));
        assert!(matches!(DeviceToken::parse(Some("   ".into())), Err(AppError::Validation(_))));
    }

    #[test]
    fn test_parse_too_long() {
        let res = DeviceToken::parse(Some("A".repeat(MAX_TOKEN_LEN + 1)));
        match res {
            Err(AppError::Validation(msg)) => assert_eq!(msg, "Token is too long (max 4096 characters)"),
            other => panic!("unexpected result: {other:?}"),
        }
    }
}
