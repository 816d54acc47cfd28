use crate::adapters::push::{PushError, PushProvider};
use crate::config::FcmConfig;
use crate::domain::notification::{DeliveryResult, MessageId, NotificationPayload};
use crate::domain::token::DeviceToken;
use anyhow::Context;
use async_trait::async_trait;
use futures::{StreamExt, stream};
use jsonwebtoken::{Algorithm, EncodingKey, Header};
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;
use time::OffsetDateTime;
use tokio::sync::Mutex;

const MESSAGING_SCOPE: &str = "https://www.googleapis.com/auth/firebase.messaging";
const JWT_BEARER_GRANT: &str = "urn:ietf:params:oauth:grant-type:jwt-bearer";
const ASSERTION_LIFETIME_SECS: i64 = 3600;
/// Access tokens closer than this to expiry are refreshed before use.
const REFRESH_MARGIN_SECS: i64 = 60;

#[derive(Debug, Serialize)]
struct AssertionClaims<'a> {
    iss: &'a str,
    sub: &'a str,
    scope: &'a str,
    aud: &'a str,
    iat: i64,
    exp: i64,
}

#[derive(Debug, Deserialize)]
struct AccessTokenResponse {
    access_token: String,
    expires_in: i64,
}

#[derive(Debug, Clone)]
struct CachedAccessToken {
    value: String,
    expires_at: i64,
}

#[derive(Debug, Serialize)]
struct SendRequest<'a> {
    message: OutboundMessage<'a>,
}

#[derive(Debug, Serialize)]
struct OutboundMessage<'a> {
    token: &'a str,
    notification: OutboundNotification<'a>,
    data: &'a HashMap<String, String>,
}

#[derive(Debug, Serialize)]
struct OutboundNotification<'a> {
    title: &'a str,
    body: &'a str,
}

#[derive(Debug, Deserialize)]
struct SendResponse {
    name: String,
}

#[derive(Debug, Default, Deserialize)]
struct ErrorEnvelope {
    #[serde(default)]
    error: ErrorBody,
}

#[derive(Debug, Default, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    message: String,
    #[serde(default)]
    status: String,
    #[serde(default)]
    details: Vec<ErrorDetail>,
}

#[derive(Debug, Deserialize)]
struct ErrorDetail {
    #[serde(rename = "errorCode", default)]
    error_code: Option<String>,
}

/// Push provider speaking the FCM HTTP v1 API with service-account credentials.
pub struct FcmPushProvider {
    http: reqwest::Client,
    project_id: String,
    client_email: String,
    signing_key: EncodingKey,
    token_uri: String,
    api_base_url: String,
    batch_concurrency: usize,
    access_token: Mutex<Option<CachedAccessToken>>,
}

impl std::fmt::Debug for FcmPushProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FcmPushProvider")
            .field("project_id", &self.project_id)
            .field("client_email", &self.client_email)
            .field("api_base_url", &self.api_base_url)
            .field("batch_concurrency", &self.batch_concurrency)
            .finish_non_exhaustive()
    }
}

impl FcmPushProvider {
    /// Builds the provider from service-account configuration.
    ///
    /// # Errors
    /// Returns an error if the private key is not a valid RSA PEM or the HTTP client cannot be built.
    pub fn new(config: &FcmConfig) -> anyhow::Result<Self> {
        let signing_key = EncodingKey::from_rsa_pem(config.private_key_pem().as_bytes())
            .context("Firebase private key is not a valid RSA PEM")?;
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.provider_timeout_secs))
            .build()
            .context("Failed to build FCM HTTP client")?;

        Ok(Self {
            http,
            project_id: config.project_id.clone(),
            client_email: config.client_email.clone(),
            signing_key,
            token_uri: config.token_uri.clone(),
            api_base_url: config.api_base_url.trim_end_matches('/').to_string(),
            batch_concurrency: config.batch_concurrency.max(1),
            access_token: Mutex::new(None),
        })
    }

    /// Returns a cached OAuth2 access token, exchanging a freshly signed assertion when needed.
    async fn access_token(&self) -> Result<String, PushError> {
        let mut cached = self.access_token.lock().await;
        let now = OffsetDateTime::now_utc().unix_timestamp();
        if let Some(token) = cached.as_ref()
            && token.expires_at > now + REFRESH_MARGIN_SECS
        {
            return Ok(token.value.clone());
        }

        let claims = AssertionClaims {
            iss: &self.client_email,
            sub: &self.client_email,
            scope: MESSAGING_SCOPE,
            aud: &self.token_uri,
            iat: now,
            exp: now + ASSERTION_LIFETIME_SECS,
        };
        let assertion = jsonwebtoken::encode(&Header::new(Algorithm::RS256), &claims, &self.signing_key)
            .map_err(|e| PushError::Auth(format!("Failed to sign token assertion: {e}")))?;

        let response = self
            .http
            .post(&self.token_uri)
            .form(&[("grant_type", JWT_BEARER_GRANT), ("assertion", assertion.as_str())])
            .send()
            .await
            .map_err(|e| PushError::Transport(format!("Access token request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(if status.is_client_error() {
                PushError::Auth(format!("Access token request rejected ({status}): {body}"))
            } else {
                PushError::Transport(format!("Access token request failed ({status}): {body}"))
            });
        }

        let token: AccessTokenResponse = response
            .json()
            .await
            .map_err(|e| PushError::Transport(format!("Failed to parse access token response: {e}")))?;

        tracing::debug!(expires_in = token.expires_in, "Obtained FCM access token");
        *cached = Some(CachedAccessToken { value: token.access_token.clone(), expires_at: now + token.expires_in });
        Ok(token.access_token)
    }

    async fn post_message(
        &self,
        access_token: &str,
        token: &DeviceToken,
        payload: &NotificationPayload,
    ) -> Result<MessageId, PushError> {
        let url = format!("{}/v1/projects/{}/messages:send", self.api_base_url, self.project_id);
        let request = SendRequest {
            message: OutboundMessage {
                token: token.as_str(),
                notification: OutboundNotification { title: payload.title(), body: payload.body() },
                data: payload.data(),
            },
        };

        let response = self
            .http
            .post(&url)
            .bearer_auth(access_token)
            .json(&request)
            .send()
            .await
            .map_err(|e| PushError::Transport(format!("FCM send request failed: {e}")))?;

        let status = response.status();
        if status.is_success() {
            let sent: SendResponse = response
                .json()
                .await
                .map_err(|e| PushError::Transport(format!("Failed to parse FCM response: {e}")))?;
            tracing::debug!(token = %token, message_id = %sent.name, "Push notification accepted");
            return Ok(MessageId(sent.name));
        }

        let body = response.text().await.unwrap_or_default();
        let err = classify_error(status, &body);
        tracing::debug!(token = %token, status = %status.as_u16(), error = %err, "Push notification rejected");
        Err(err)
    }
}

/// Maps an FCM error response onto a [`PushError`].
///
/// This is a heuristic over status codes and FCM error codes; FCM does not promise a stable
/// mapping, so anything unrecognised is treated as a transport fault.
fn classify_error(status: StatusCode, body: &str) -> PushError {
    let error = serde_json::from_str::<ErrorEnvelope>(body).unwrap_or_default().error;
    let error_code = error.details.iter().find_map(|d| d.error_code.as_deref()).unwrap_or_default();
    let detail = if error.message.is_empty() {
        format!("{} {}", status.as_u16(), body.trim())
    } else {
        format!("{} {}", status.as_u16(), error.message)
    };

    match (status.as_u16(), error_code) {
        (_, "UNREGISTERED" | "SENDER_ID_MISMATCH") | (404, _) => PushError::InvalidRecipient(detail),
        (_, "THIRD_PARTY_AUTH_ERROR") | (401 | 403, _) => PushError::Auth(detail),
        (400, _) if error.status == "INVALID_ARGUMENT" && error.message.to_ascii_lowercase().contains("registration token") => {
            PushError::InvalidRecipient(detail)
        }
        _ => PushError::Transport(detail),
    }
}

/// A batch in which nothing was delivered and no recipient was reported invalid has failed at the
/// provider, not at the recipients. Auth failures win over transport ones.
fn provider_wide_failure(outcomes: &[Result<MessageId, PushError>]) -> Option<PushError> {
    let mut errors = outcomes.iter().map(|o| o.as_ref().err()).collect::<Option<Vec<_>>>()?;
    if errors.is_empty() || errors.iter().any(|e| matches!(e, PushError::InvalidRecipient(_))) {
        return None;
    }
    errors.sort_by_key(|e| !matches!(e, PushError::Auth(_)));
    errors.first().copied().cloned()
}

#[async_trait]
impl PushProvider for FcmPushProvider {
    #[tracing::instrument(level = "debug", skip_all, err)]
    async fn send_one(&self, token: &DeviceToken, payload: &NotificationPayload) -> Result<MessageId, PushError> {
        let access_token = self.access_token().await?;
        self.post_message(&access_token, token, payload).await
    }

    #[tracing::instrument(level = "debug", skip_all, fields(recipients = tokens.len()), err)]
    async fn send_batch(
        &self,
        tokens: &[DeviceToken],
        payload: &NotificationPayload,
    ) -> Result<Vec<DeliveryResult>, PushError> {
        let access_token = self.access_token().await?;
        let sends: Vec<_> = tokens.iter().map(|token| self.post_message(&access_token, token, payload)).collect();
        let outcomes: Vec<Result<MessageId, PushError>> =
            stream::iter(sends).buffered(self.batch_concurrency).collect().await;

        if let Some(err) = provider_wide_failure(&outcomes) {
            tracing::warn!(error = %err, recipients = tokens.len(), "Every send in the batch failed at the provider");
            return Err(err);
        }
        Ok(outcomes.into_iter().map(DeliveryResult::from).collect())
    }
}
