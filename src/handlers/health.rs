// handlers/health.rs - GET /health

use axum::{extract::State, http::StatusCode, response::Json};
use serde_json::{json, Value};

use crate::state::AppState;

pub async fn health_get(State(state): State<AppState>) -> (StatusCode, Json<Value>) {
    let now = chrono::Utc::now();
    let storage = state.store.kind();

    match state.store.health_check().await {
        Ok(()) => (
            StatusCode::OK,
            Json(json!({
                "status": "ok",
                "timestamp": now,
                "storage": storage
            })),
        ),
        Err(e) => {
            tracing::error!("Health check failed: {}", e);
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({
                    "status": "degraded",
                    "timestamp": now,
                    "storage": storage,
                    "error": "storage unavailable"
                })),
            )
        }
    }
}
