//! Health and status endpoints

use actix_web::{web, HttpResponse};

use crate::app::AppState;

/// `GET /health` — liveness probe
pub async fn health() -> HttpResponse {
    HttpResponse::Ok().json(serde_json::json!({
        "status": "healthy",
        "service": "authgrid",
        "version": env!("CARGO_PKG_VERSION"),
        "timestamp": chrono::Utc::now().to_rfc3339(),
    }))
}

/// `GET /v1/status` — engine counter snapshot and active realms
pub async fn status(state: web::Data<AppState>) -> HttpResponse {
    let snapshot = state.engine.snapshot();
    HttpResponse::Ok().json(serde_json::json!({
        "running": state.engine.is_running(),
        "instance_id": state.engine.instance_id(),
        "realms": state.engine.active_realms(),
        "counters": snapshot,
    }))
}
