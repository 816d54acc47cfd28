use crate::api::schemas::health::HealthResponse;
use axum::{Json, response::IntoResponse};
use time::OffsetDateTime;

/// Liveness check: answers as long as the server is running.
pub async fn health() -> impl IntoResponse {
    Json(HealthResponse { status: "OK", timestamp: OffsetDateTime::now_utc() })
}
