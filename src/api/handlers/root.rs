use axum::{http::StatusCode, Json, response::IntoResponse};
use serde_json::json;

pub async fn root() -> impl IntoResponse {
    Json(json!({
        "name": "Settlement API",
        "version": env!("CARGO_PKG_VERSION"),
        "description": "Order ledger and seller payout settlement",
        "status": "operational",
        "endpoints": {
            "health": "/health",
            "checkout": "/api/checkout",
            "admin": "/admin"
        }
    }))
}

pub async fn health_check() -> impl IntoResponse {
    (StatusCode::OK, Json(json!({
        "status": "healthy",
        "timestamp": chrono::Utc::now().to_rfc3339()
    })))
}
