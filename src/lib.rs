#![forbid(unsafe_code)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![warn(clippy::unwrap_used)]
#![warn(clippy::todo)]
#![warn(clippy::panic)]
#![warn(clippy::dbg_macro)]
#![warn(clippy::print_stdout)]
#![warn(clippy::print_stderr)]
#![warn(clippy::clone_on_ref_ptr)]
#![warn(unreachable_pub)]
#![warn(missing_debug_implementations)]
#![warn(unused_qualifications)]
#![deny(unused_must_use)]

pub mod adapters;
pub mod api;
pub mod config;
pub mod domain;
pub mod error;
pub mod services;
pub mod telemetry;

use crate::adapters::push::PushProvider;
use crate::adapters::push::fcm::FcmPushProvider;
use crate::api::ServiceContainer;
use crate::config::Config;
use crate::services::dispatcher::NotificationDispatcher;
use crate::services::token_registry::TokenRegistry;
use std::sync::Arc;
use tokio::sync::watch;

/// Wires the registry, push provider and dispatcher together.
#[derive(Debug)]
pub struct AppBuilder {
    config: Config,
    registry: Option<Arc<TokenRegistry>>,
    push_provider: Option<Arc<dyn PushProvider>>,
}

impl AppBuilder {
    #[must_use]
    pub const fn new(config: Config) -> Self {
        Self { config, registry: None, push_provider: None }
    }

    #[must_use]
    pub fn with_registry(mut self, registry: Arc<TokenRegistry>) -> Self {
        self.registry = Some(registry);
        self
    }

    #[must_use]
    pub fn with_push_provider(mut self, provider: Arc<dyn PushProvider>) -> Self {
        self.push_provider = Some(provider);
        self
    }

    /// Builds the service container. Without an explicit provider, an FCM provider is created
    /// from the configured service-account credentials.
    ///
    /// # Errors
    /// Returns an error if the FCM credentials are malformed.
    pub fn build(self) -> anyhow::Result<ServiceContainer> {
        let registry = self.registry.unwrap_or_default();
        let provider = match self.push_provider {
            Some(provider) => provider,
            None => {
                let fcm = FcmPushProvider::new(&self.config.fcm)?;
                tracing::info!(project_id = %self.config.fcm.project_id, "FCM push provider configured");
                Arc::new(fcm)
            }
        };

        let dispatcher = NotificationDispatcher::new(Arc::clone(&registry), provider);
        Ok(ServiceContainer { registry, dispatcher })
    }
}

/// Routes panics through `tracing` so they reach the configured log sinks.
pub fn setup_panic_hook() {
    std::panic::set_hook(Box::new(|info| {
        let location = info.location().map(ToString::to_string).unwrap_or_default();
        let payload = info
            .payload()
            .downcast_ref::<&str>()
            .map(ToString::to_string)
            .or_else(|| info.payload().downcast_ref::<String>().cloned())
            .unwrap_or_default();
        tracing::error!(location = %location, panic = %payload, "Panic occurred");
    }));
}

/// Flips the shutdown channel on SIGINT or SIGTERM.
pub fn spawn_signal_handler(shutdown_tx: watch::Sender<bool>) {
    tokio::spawn(async move {
        let ctrl_c = async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!(error = %e, "Failed to listen for Ctrl+C");
                std::future::pending::<()>().await;
            }
        };

        #[cfg(unix)]
        let terminate = async {
            match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
                Ok(mut signal) => {
                    signal.recv().await;
                }
                Err(e) => {
                    tracing::error!(error = %e, "Failed to install SIGTERM handler");
                    std::future::pending::<()>().await;
                }
            }
        };

        #[cfg(not(unix))]
        let terminate = std::future::pending::<()>();

        tokio::select! {
            () = ctrl_c => {},
            () = terminate => {},
        }

        tracing::info!("Shutdown signal received, starting graceful shutdown");
        let _ = shutdown_tx.send(true);
    });
}
