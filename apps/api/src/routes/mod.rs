pub mod health;

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};

use crate::config::MAX_AUDIO_SIZE_MB;
use crate::interview::handlers::handle_process_interview;
use crate::relay::ws_transcribe_handler;
use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(health::root_handler))
        .route("/health", get(health::health_handler))
        .route("/process-interview", post(handle_process_interview))
        .route("/ws/transcribe", get(ws_transcribe_handler))
        .layer(DefaultBodyLimit::max(MAX_AUDIO_SIZE_MB * 1024 * 1024))
        .with_state(state)
}
