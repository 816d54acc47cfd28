#![allow(
    dead_code,
    clippy::unwrap_used,
    clippy::panic,
    clippy::missing_panics_doc,
    clippy::must_use_candidate,
    missing_debug_implementations,
    unreachable_pub
)]
use async_trait::async_trait;
use fanout_server::AppBuilder;
use fanout_server::adapters::push::{PushError, PushProvider};
use fanout_server::config::{Config, FcmConfig, LogFormat, ServerConfig, TelemetryConfig};
use fanout_server::domain::notification::{DeliveryResult, MessageId, NotificationPayload};
use fanout_server::domain::token::DeviceToken;
use fanout_server::services::token_registry::TokenRegistry;
use std::collections::HashSet;
use std::sync::{Arc, Mutex, Once};
use tokio::sync::watch;

static INIT: Once = Once::new();

pub fn setup_tracing() {
    INIT.call_once(|| {
        let filter = tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| "warn".into())
            .add_directive("fanout_server=debug".parse().unwrap())
            .add_directive("tower=warn".parse().unwrap())
            .add_directive("hyper=warn".parse().unwrap())
            .add_directive("reqwest=warn".parse().unwrap());

        tracing_subscriber::fmt().with_env_filter(filter).init();
    });
}

pub fn get_test_config() -> Config {
    Config {
        server: ServerConfig {
            host: "127.0.0.1".to_string(),
            port: 0,
            shutdown_timeout_secs: 1,
            cors_allowed_origins: vec!["*".to_string()],
        },
        fcm: FcmConfig {
            project_id: "test-project".to_string(),
            client_email: "relay@test-project.iam.gserviceaccount.com".to_string(),
            private_key: include_str!("fixtures/test_service_account_key.pem").to_string(),
            token_uri: "http://127.0.0.1:9/token".to_string(),
            api_base_url: "http://127.0.0.1:9".to_string(),
            batch_concurrency: 4,
            provider_timeout_secs: 5,
        },
        telemetry: TelemetryConfig { log_format: LogFormat::Text, log_level: "warn".to_string(), otlp_endpoint: None },
    }
}

/// One call observed by [`ScriptedPushProvider`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SentCall {
    One(String),
    Batch(Vec<String>),
}

/// In-process provider: accepts every token except the rejected ones, or fails whole calls on demand.
#[derive(Debug, Default)]
pub struct ScriptedPushProvider {
    rejected: Mutex<HashSet<String>>,
    call_error: Mutex<Option<PushError>>,
    calls: Mutex<Vec<SentCall>>,
}

impl ScriptedPushProvider {
    pub fn reject(&self, token: &str) {
        self.rejected.lock().unwrap().insert(token.to_string());
    }

    pub fn fail_calls_with(&self, err: PushError) {
        *self.call_error.lock().unwrap() = Some(err);
    }

    pub fn calls(&self) -> Vec<SentCall> {
        self.calls.lock().unwrap().clone()
    }

    fn deliver(&self, token: &DeviceToken) -> Result<MessageId, PushError> {
        if self.rejected.lock().unwrap().contains(token.as_str()) {
            Err(PushError::InvalidRecipient(format!("404 {token} is not registered")))
        } else {
            Ok(MessageId(format!("projects/test-project/messages/{token}")))
        }
    }
}

#[async_trait]
impl PushProvider for ScriptedPushProvider {
    async fn send_one(&self, token: &DeviceToken, _payload: &NotificationPayload) -> Result<MessageId, PushError> {
        self.calls.lock().unwrap().push(SentCall::One(token.to_string()));
        if let Some(err) = self.call_error.lock().unwrap().clone() {
            return Err(err);
        }
        self.deliver(token)
    }

    async fn send_batch(
        &self,
        tokens: &[DeviceToken],
        _payload: &NotificationPayload,
    ) -> Result<Vec<DeliveryResult>, PushError> {
        self.calls.lock().unwrap().push(SentCall::Batch(tokens.iter().map(ToString::to_string).collect()));
        if let Some(err) = self.call_error.lock().unwrap().clone() {
            return Err(err);
        }
        Ok(tokens.iter().map(|t| DeliveryResult::from(self.deliver(t))).collect())
    }
}

pub struct TestApp {
    pub server_url: String,
    pub client: reqwest::Client,
    pub registry: Arc<TokenRegistry>,
    scripted: Option<Arc<ScriptedPushProvider>>,
    shutdown_tx: watch::Sender<bool>,
}

impl TestApp {
    pub async fn spawn() -> Self {
        let provider = Arc::new(ScriptedPushProvider::default());
        let mut app = Self::spawn_with_provider(get_test_config(), Arc::clone(&provider) as Arc<dyn PushProvider>).await;
        app.scripted = Some(provider);
        app
    }

    /// Spawns the API on an ephemeral port with the given provider.
    pub async fn spawn_with_provider(config: Config, provider: Arc<dyn PushProvider>) -> Self {
        setup_tracing();

        let registry = Arc::new(TokenRegistry::new());
        let services = AppBuilder::new(config.clone())
            .with_registry(Arc::clone(&registry))
            .with_push_provider(provider)
            .build()
            .unwrap();
        let router = fanout_server::api::app_router(&config, services);

        let listener = tokio::net::TcpListener::bind(format!("{}:0", config.server.host)).await.unwrap();
        let addr = listener.local_addr().unwrap();

        let (shutdown_tx, mut shutdown_rx) = watch::channel(false);
        tokio::spawn(async move {
            axum::serve(listener, router)
                .with_graceful_shutdown(async move {
                    let _ = shutdown_rx.wait_for(|&s| s).await;
                })
                .await
                .unwrap();
        });

        Self {
            server_url: format!("http://{addr}"),
            client: reqwest::Client::new(),
            registry,
            scripted: None,
            shutdown_tx,
        }
    }

    /// The scripted provider behind an app started with [`TestApp::spawn`].
    pub fn provider(&self) -> &ScriptedPushProvider {
        self.scripted.as_deref().expect("app was spawned with an external provider")
    }

    pub async fn register(&self, token: &str) -> reqwest::Response {
        self.client
            .post(format!("{}/register-token", self.server_url))
            .json(&serde_json::json!({ "token": token }))
            .send()
            .await
            .unwrap()
    }

    pub async fn post_json(&self, path: &str, body: &serde_json::Value) -> reqwest::Response {
        self.client.post(format!("{}{path}", self.server_url)).json(body).send().await.unwrap()
    }

    pub async fn registered_tokens(&self) -> Vec<String> {
        let body: serde_json::Value =
            self.client.get(format!("{}/tokens-count", self.server_url)).send().await.unwrap().json().await.unwrap();
        let mut tokens: Vec<String> =
            body["tokens"].as_array().unwrap().iter().map(|t| t.as_str().unwrap().to_string()).collect();
        tokens.sort();
        tokens
    }
}

impl Drop for TestApp {
    fn drop(&mut self) {
        let _ = self.shutdown_tx.send(true);
    }
}
