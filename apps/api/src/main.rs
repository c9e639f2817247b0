mod coaching;
mod config;
mod errors;
mod interview;
mod relay;
mod routes;
mod state;
#[cfg(test)]
mod test_support;
mod transcription;

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Result;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::coaching::MistralClient;
use crate::config::Config;
use crate::routes::build_router;
use crate::state::AppState;
use crate::transcription::DeepgramClient;

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first (fails on missing provider keys)
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            let crate_target = env!("CARGO_PKG_NAME").replace('-', "_");
            EnvFilter::new(format!("{crate_target}={}", &config.rust_log))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Clarity Interview API v{}", env!("CARGO_PKG_VERSION"));

    // Initialize provider clients
    let transcriber = Arc::new(DeepgramClient::new(config.deepgram_api_key.clone()));
    info!("Deepgram client initialized (model: {})", config::DEEPGRAM_MODEL);

    let coach = Arc::new(MistralClient::new(config.mistral_api_key.clone()));
    info!("Mistral client initialized (model: {})", config::MISTRAL_MODEL);

    // Build app state
    let state = AppState {
        transcriber,
        coach,
        config: config.clone(),
    };

    // Build router
    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive()); // TODO: tighten CORS in production

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
