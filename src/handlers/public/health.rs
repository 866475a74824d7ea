use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use serde_json::json;

use crate::handlers::AppState;

/// GET / - service banner
pub async fn root() -> Json<serde_json::Value> {
    Json(json!({
        "success": true,
        "data": {
            "name": "DevFlow API",
            "version": env!("CARGO_PKG_VERSION"),
            "endpoints": {
                "health": "/health (public)",
                "questions": "/api/questions[/:id] (read public, write requires session)",
                "answers": "/api/questions/:id/answers, /api/answers/:id",
                "votes": "/api/votes[/:target_type/:target_id] (session)",
                "collections": "/api/collections[/:question_id] (session)",
                "users": "/api/users/me (session)",
            }
        }
    }))
}

/// GET /health - storage connectivity
pub async fn health(State(state): State<AppState>) -> impl IntoResponse {
    let now = chrono::Utc::now();

    match state.store.health_check().await {
        Ok(()) => (
            StatusCode::OK,
            Json(json!({
                "success": true,
                "data": { "status": "ok", "timestamp": now, "database": "ok" }
            })),
        ),
        Err(e) => {
            tracing::error!("Health check failed: {}", e);
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({
                    "success": false,
                    "error": { "message": "database unavailable" },
                    "data": { "status": "degraded", "timestamp": now }
                })),
            )
        }
    }
}
