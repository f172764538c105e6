use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use serde_json::{json, Value};

use crate::server::AppState;

/// GET / - service banner
pub async fn root() -> Json<Value> {
    Json(json!({
        "name": "Ingenialists API",
        "version": env!("CARGO_PKG_VERSION"),
        "endpoints": {
            "users": "/v1/users[/:id]",
            "auth": "/v1/auth, /v1/auth/google-login, /v1/auth/google-callback",
            "categories": "/v1/categories[/:id]",
            "articles": "/v1/articles[/:id]",
        }
    }))
}

/// GET /health - liveness including the store
pub async fn health(State(state): State<AppState>) -> impl IntoResponse {
    let now = chrono::Utc::now();

    match state.health.health_check().await {
        Ok(_) => (
            StatusCode::OK,
            Json(json!({
                "status": "ok",
                "timestamp": now,
                "database": "ok"
            })),
        ),
        Err(e) => {
            tracing::error!("Health check failed: {}", e);
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({
                    "status": "degraded",
                    "timestamp": now,
                    "database": "unavailable"
                })),
            )
        }
    }
}
