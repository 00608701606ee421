use crate::state::AppState;
use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};

// ============================================================================
// Health endpoints
// ============================================================================

pub async fn health(State(state): State<AppState>) -> impl IntoResponse {
    match state.hub.stats().await {
        Some(stats) => (
            StatusCode::OK,
            Json(serde_json::json!({
                "status": "ok",
                "sessions": stats.sessions,
                "cached_visits": stats.cached_visits,
            })),
        ),
        None => (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(serde_json::json!({ "status": "stopped" })),
        ),
    }
}

// ============================================================================
// Metrics endpoints
// ============================================================================

pub async fn metrics(State(state): State<AppState>) -> impl IntoResponse {
    match state.metrics {
        Some(handle) => (StatusCode::OK, handle.render()),
        None => (
            StatusCode::NOT_FOUND,
            "metrics recorder not installed".to_string(),
        ),
    }
}
