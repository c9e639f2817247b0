use std::sync::Arc;

use crate::coaching::CoachingModel;
use crate::config::Config;
use crate::transcription::Transcriber;

/// Shared application state injected into all route handlers via Axum
/// extractors. Provider clients are trait objects so tests can substitute
/// fakes; nothing here is mutable across requests.
#[derive(Clone)]
pub struct AppState {
    pub transcriber: Arc<dyn Transcriber>,
    pub coach: Arc<dyn CoachingModel>,
    pub config: Config,
}
