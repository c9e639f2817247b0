use anyhow::{Context, Result};

/// Deepgram model used for both batch and live transcription.
pub const DEEPGRAM_MODEL: &str = "nova-2";
/// Mistral model used for coaching suggestions.
pub const MISTRAL_MODEL: &str = "mistral-small-latest";
/// Transcription language for all provider calls.
pub const LANGUAGE: &str = "en";

/// Audio file extensions accepted by the batch pipeline. Checked before any
/// network call is made; this is a pure format check, not decoding.
pub const ALLOWED_AUDIO_FORMATS: [&str; 5] = [".mp3", ".wav", ".m4a", ".ogg", ".flac"];

/// Maximum accepted upload size for the batch endpoint. Raises axum's 2 MB
/// default, which is far below typical interview recordings.
pub const MAX_AUDIO_SIZE_MB: usize = 100;

/// Application configuration loaded from environment variables.
/// Startup fails if a required provider key is missing.
#[derive(Debug, Clone)]
pub struct Config {
    pub deepgram_api_key: String,
    pub mistral_api_key: String,
    pub port: u16,
    pub rust_log: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        Ok(Config {
            deepgram_api_key: require_env("DEEPGRAM_API_KEY")?,
            mistral_api_key: require_env("MISTRAL_API_KEY")?,
            port: std::env::var("PORT")
                .unwrap_or_else(|_| "8000".to_string())
                .parse::<u16>()
                .context("PORT must be a valid port number")?,
            rust_log: std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
        })
    }
}

fn require_env(key: &str) -> Result<String> {
    std::env::var(key).with_context(|| format!("Required environment variable '{key}' is not set"))
}

/// Returns true when `filename` ends in one of the allowed audio extensions
/// (case-insensitive).
pub fn is_allowed_audio_format(filename: &str) -> bool {
    let lower = filename.to_lowercase();
    ALLOWED_AUDIO_FORMATS.iter().any(|ext| lower.ends_with(ext))
}
