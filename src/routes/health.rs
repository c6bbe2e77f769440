// src/routes/health.rs
//! Health check endpoints for the NovaCRM backend.
//!
//! - `GET /health/`: quick liveness check for load balancers and monitoring
//! - `GET /health/detailed`: uptime and dependency status for dashboards
//! - `GET /health/ready`: readiness probe; 503 until critical dependencies are ready
//!
//! Follows the Explicit Module Boundary Pattern (EMBP): handlers and response
//! shapes stay internal, the gateway (`mod.rs`) only sees [`router`].

use axum::{extract::State, routing::get, Json, Router};
use chrono::Utc;
use serde::Serialize;
use tracing::warn;

use super::error::ApiError;
use crate::{AppState, HealthStatus, Status};

/// JSON response body for `GET /health/`.
#[derive(Debug, Serialize)]
struct HealthCheckResponse {
    status: Status,
    /// ISO-8601 evaluation time.
    timestamp: String,
    version: String,
}

impl From<&HealthStatus> for HealthCheckResponse {
    fn from(health: &HealthStatus) -> Self {
        Self {
            status: health.status,
            timestamp: health.timestamp_iso(),
            version: health.version.clone(),
        }
    }
}

/// JSON response body for `GET /health/detailed`.
#[derive(Debug, Serialize)]
struct HealthCheckDetailedResponse {
    status: Status,
    timestamp: String,
    version: String,
    uptime_seconds: f64,
    database_connected: bool,
    ai_engine_available: bool,
}

#[derive(Debug, Serialize)]
struct ReadinessResponse {
    ready: bool,
}

/// Handle `GET /health/`.
///
/// Deliberately lightweight: never touches the database or the AI engine.
async fn health_check(State(state): State<AppState>) -> Json<HealthCheckResponse> {
    // ---
    let health = HealthStatus::new(Status::Healthy, Utc::now(), &state.config.app.version);
    Json(HealthCheckResponse::from(&health))
}

/// Handle `GET /health/detailed`.
///
/// Reports `degraded` when any dependency is unavailable.
async fn health_check_detailed(
    State(state): State<AppState>,
) -> Json<HealthCheckDetailedResponse> {
    // ---
    let database_connected = state.dependencies.database_ready();
    let ai_engine_available = state.dependencies.ai_engine_ready();

    let status = if database_connected && ai_engine_available {
        Status::Healthy
    } else {
        Status::Degraded
    };
    let health = HealthStatus::new(status, Utc::now(), &state.config.app.version);

    Json(HealthCheckDetailedResponse {
        status: health.status,
        timestamp: health.timestamp_iso(),
        version: health.version,
        uptime_seconds: state.uptime().as_secs_f64(),
        database_connected,
        ai_engine_available,
    })
}

/// Handle `GET /health/ready`.
///
/// Orchestrators keep traffic away from the instance while this returns 503.
async fn readiness_probe(
    State(state): State<AppState>,
) -> Result<Json<ReadinessResponse>, ApiError> {
    // ---
    let database_ready = state.dependencies.database_ready();
    let ai_engine_ready = state.dependencies.ai_engine_ready();

    if !(database_ready && ai_engine_ready) {
        warn!(database_ready, ai_engine_ready, "Readiness check failed");
        return Err(ApiError::ServiceUnavailable(
            "Service unavailable - dependencies not ready".to_string(),
        ));
    }

    Ok(Json(ReadinessResponse { ready: true }))
}

/// Create a subrouter containing the `/health` routes.
///
/// `/health` and `/health/` are served by the same handler.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/health", get(health_check))
        .route("/health/", get(health_check))
        .route("/health/detailed", get(health_check_detailed))
        .route("/health/ready", get(readiness_probe))
}
