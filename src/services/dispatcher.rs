use crate::adapters::push::{PushError, PushProvider};
use crate::domain::notification::{DispatchOutcome, MessageId, NotificationPayload};
use crate::domain::token::DeviceToken;
use crate::error::{AppError, Result};
use crate::services::token_registry::TokenRegistry;
use opentelemetry::{KeyValue, global, metrics::Counter};
use std::sync::Arc;

#[derive(Clone, Debug)]
struct Metrics {
    dispatches: Counter<u64>,
    deliveries: Counter<u64>,
    pruned_tokens: Counter<u64>,
}

impl Metrics {
    fn new() -> Self {
        let meter = global::meter("fanout-server");
        Self {
            dispatches: meter
                .u64_counter("push_dispatch_total")
                .with_description("Total dispatch requests by target selection")
                .build(),
            deliveries: meter
                .u64_counter("push_deliveries_total")
                .with_description("Total per-recipient delivery attempts by result")
                .build(),
            pruned_tokens: meter
                .u64_counter("push_pruned_tokens_total")
                .with_description("Total tokens removed after the provider rejected them")
                .build(),
        }
    }

    fn record_deliveries(&self, succeeded: usize, failed: usize) {
        self.deliveries.add(u64::try_from(succeeded).unwrap_or(u64::MAX), &[KeyValue::new("result", "success")]);
        self.deliveries.add(u64::try_from(failed).unwrap_or(u64::MAX), &[KeyValue::new("result", "failure")]);
    }
}

/// Sends notifications through the push provider and keeps the registry in line with what the
/// provider reports.
#[derive(Clone, Debug)]
pub struct NotificationDispatcher {
    registry: Arc<TokenRegistry>,
    provider: Arc<dyn PushProvider>,
    metrics: Metrics,
}

impl NotificationDispatcher {
    #[must_use]
    pub fn new(registry: Arc<TokenRegistry>, provider: Arc<dyn PushProvider>) -> Self {
        Self { registry, provider, metrics: Metrics::new() }
    }

    /// Sends the payload to every registered device.
    ///
    /// Recipients are the registry snapshot taken on entry. With several recipients, every token
    /// the provider reports as an invalid recipient is removed from the registry; auth and
    /// transport failures leave their tokens in place. A single recipient goes through the
    /// unicast path and is never removed.
    ///
    /// # Errors
    /// Returns `AppError::NoRecipients` if nothing is registered.
    /// Returns `AppError::StaleTokens` if the provider rejected the call because its recipient is invalid.
    /// Returns `AppError::Provider` for any other call-level provider failure.
    #[tracing::instrument(level = "debug", skip_all, err)]
    pub async fn dispatch_to_all(&self, payload: &NotificationPayload) -> Result<DispatchOutcome> {
        let recipients = self.registry.list();
        self.metrics.dispatches.add(1, &[KeyValue::new("target", "all")]);

        let outcome = match recipients.as_slice() {
            [] => return Err(AppError::NoRecipients),
            [only] => {
                let response = self.provider.send_one(only, payload).await.map_err(|e| {
                    self.metrics.record_deliveries(0, 1);
                    Self::classify_broadcast_error(e)
                })?;
                tracing::info!(token = %only, message_id = %response, "Sent notification to single device");
                DispatchOutcome::Single { response }
            }
            tokens => {
                let responses =
                    self.provider.send_batch(tokens, payload).await.map_err(Self::classify_broadcast_error)?;

                let rejected: Vec<&DeviceToken> = tokens
                    .iter()
                    .zip(&responses)
                    .filter(|(_, result)| result.is_invalid_recipient())
                    .map(|(t, _)| t)
                    .collect();
                for token in &rejected {
                    tracing::info!(token = %token, "Removing invalid token");
                }
                self.registry.remove(rejected.iter().copied());
                self.metrics.pruned_tokens.add(u64::try_from(rejected.len()).unwrap_or(u64::MAX), &[]);

                let outcome = DispatchOutcome::Batch { responses };
                tracing::info!(
                    success_count = outcome.success_count(),
                    failure_count = outcome.failure_count(),
                    "Sent notification to multiple devices"
                );
                outcome
            }
        };

        self.metrics.record_deliveries(outcome.success_count(), outcome.failure_count());
        Ok(outcome)
    }

    /// Sends the payload to one device. The registry is never touched, whatever the outcome.
    ///
    /// # Errors
    /// Returns `AppError::Provider` if the provider did not accept the message.
    #[tracing::instrument(level = "debug", skip_all, fields(token = %token), err)]
    pub async fn dispatch_to_one(&self, token: &DeviceToken, payload: &NotificationPayload) -> Result<MessageId> {
        self.metrics.dispatches.add(1, &[KeyValue::new("target", "device")]);
        match self.provider.send_one(token, payload).await {
            Ok(response) => {
                self.metrics.record_deliveries(1, 0);
                tracing::info!(message_id = %response, "Sent notification to device");
                Ok(response)
            }
            Err(e) => {
                self.metrics.record_deliveries(0, 1);
                Err(AppError::Provider(e))
            }
        }
    }

    fn classify_broadcast_error(err: PushError) -> AppError {
        match err {
            PushError::InvalidRecipient(detail) => {
                tracing::warn!(detail = %detail, "Provider reported the recipient as invalid");
                AppError::StaleTokens
            }
            other => AppError::Provider(other),
        }
    }
}
