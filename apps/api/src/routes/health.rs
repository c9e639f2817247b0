use axum::extract::State;
use axum::Json;
use serde_json::{json, Value};

use crate::state::AppState;

/// GET /health
///
/// Reports whether the two provider keys are present — never their values.
pub async fn health_handler(State(state): State<AppState>) -> Json<Value> {
    Json(json!({
        "status": "healthy",
        "service": "running",
        "config": {
            "deepgram_configured": !state.config.deepgram_api_key.is_empty(),
            "mistral_configured": !state.config.mistral_api_key.is_empty(),
        }
    }))
}

/// GET /
///
/// Static service descriptor listing the available endpoints.
pub async fn root_handler() -> Json<Value> {
    Json(json!({
        "message": "Clarity Interview AI API",
        "version": env!("CARGO_PKG_VERSION"),
        "status": "operational",
        "endpoints": {
            "health": "/health",
            "process_interview": "/process-interview",
            "transcribe_ws": "/ws/transcribe"
        }
    }))
}
