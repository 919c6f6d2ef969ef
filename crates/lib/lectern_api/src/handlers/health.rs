//! Health check endpoint.

use axum::Json;
use axum::extract::State;
use tracing::warn;

use crate::AppState;
use crate::models::HealthResponse;

/// `GET /api/health`: always 200; reports database reachability.
pub async fn health_handler(State(state): State<AppState>) -> Json<HealthResponse> {
    let database = match &state.pool {
        None => "in-memory",
        Some(pool) => match sqlx::query("SELECT 1").execute(pool).await {
            Ok(_) => "connected",
            Err(e) => {
                warn!("database health check failed: {e}");
                "unavailable"
            }
        },
    };
    Json(HealthResponse {
        status: "ok".into(),
        version: lectern_core::version().into(),
        database: database.into(),
    })
}
