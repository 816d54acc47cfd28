use crate::config::Config;
use crate::services::dispatcher::NotificationDispatcher;
use crate::services::token_registry::TokenRegistry;
use axum::body::Body;
use axum::http::{HeaderName, HeaderValue, Request};
use axum::{
    Router,
    routing::{get, post},
};
use std::sync::Arc;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::request_id::{PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::trace::TraceLayer;

pub mod health;
pub mod middleware;
pub mod notifications;
pub mod schemas;
pub mod tokens;

#[derive(Clone, Debug)]
pub struct AppState {
    pub registry: Arc<TokenRegistry>,
    pub dispatcher: NotificationDispatcher,
}

#[derive(Debug)]
pub struct ServiceContainer {
    pub registry: Arc<TokenRegistry>,
    pub dispatcher: NotificationDispatcher,
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    let allow_origin = if origins.iter().any(|o| o == "*") {
        AllowOrigin::from(Any)
    } else {
        let parsed: Vec<HeaderValue> = origins
            .iter()
            .filter_map(|origin| match HeaderValue::from_str(origin) {
                Ok(value) => Some(value),
                Err(e) => {
                    tracing::warn!(origin = %origin, error = %e, "Ignoring invalid CORS origin");
                    None
                }
            })
            .collect();
        AllowOrigin::list(parsed)
    };

    CorsLayer::new().allow_origin(allow_origin).allow_methods(Any).allow_headers(Any)
}

/// Configures and returns the application router.
pub fn app_router(config: &Config, services: ServiceContainer) -> Router {
    let request_id_header = HeaderName::from_static(middleware::REQUEST_ID_HEADER);
    let cors = cors_layer(&config.server.cors_allowed_origins);

    let state = AppState { registry: services.registry, dispatcher: services.dispatcher };

    Router::new()
        .route("/register-token", post(tokens::register_token))
        .route("/tokens-count", get(tokens::tokens_count))
        .route("/clear-tokens", post(tokens::clear_tokens))
        .route("/send-notification", post(notifications::send_notification))
        .route("/send-notification-to-device", post(notifications::send_notification_to_device))
        .route("/health", get(health::health))
        .layer(cors)
        .layer(PropagateRequestIdLayer::new(request_id_header.clone()))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(|request: &Request<Body>| {
                    let request_id = request
                        .extensions()
                        .get::<tower_http::request_id::RequestId>()
                        .and_then(|id| id.header_value().to_str().ok())
                        .unwrap_or_default()
                        .to_string();

                    tracing::info_span!(
                        "request",
                        "request_id" = %request_id,
                        "http.request.method" = %request.method(),
                        "url.path" = %request.uri().path(),
                        "http.response.status_code" = tracing::field::Empty,
                        "otel.kind" = "server",
                    )
                })
                .on_response(
                    |response: &axum::http::Response<_>, latency: std::time::Duration, _span: &tracing::Span| {
                        let status = response.status();
                        tracing::Span::current().record("http.response.status_code", status.as_u16());

                        tracing::info!(
                            latency_ms = %latency.as_millis(),
                            status = %status.as_u16(),
                            "request completed"
                        );
                    },
                )
                .on_failure(|error, _latency, _span: &tracing::Span| {
                    tracing::error!(error = %error, "request failed");
                }),
        )
        .layer(SetRequestIdLayer::new(request_id_header, middleware::MakeRequestUuidOrHeader))
        .with_state(state)
}
