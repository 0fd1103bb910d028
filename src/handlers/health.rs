use crate::db::BackendKind;
use crate::router::VaultState;
use axum::{Json, extract::State, http::StatusCode};
use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::warn;

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub timestamp: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub database: Option<BackendKind>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub testimonial_count: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// GET /api/health: counts testimonials through the facade, so it reports
/// 503 until the database is ready.
pub async fn health(State(state): State<VaultState>) -> (StatusCode, Json<HealthResponse>) {
    match state.submissions.count().await {
        Ok(count) => (
            StatusCode::OK,
            Json(HealthResponse {
                status: "healthy",
                timestamp: Utc::now(),
                database: state.db.kind(),
                testimonial_count: Some(count),
                error: None,
            }),
        ),
        Err(e) => {
            warn!(error = %e, "health check failed");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(HealthResponse {
                    status: "unhealthy",
                    timestamp: Utc::now(),
                    database: None,
                    testimonial_count: None,
                    error: Some(e.to_string()),
                }),
            )
        }
    }
}
