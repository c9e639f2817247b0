//! Fake provider backends shared across test modules.

use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use crate::coaching::{CoachingModel, CoachingResponse, InterviewContext};
use crate::config::{DEEPGRAM_MODEL, LANGUAGE};
use crate::errors::AppError;
use crate::state::AppState;
use crate::transcription::{wer_estimate, TranscriptionResult, Transcriber};

/// Canned transcriber. Either returns a fixed transcript, echoes the audio
/// file's contents back as the transcript, or fails with a fixed message.
pub struct FakeTranscriber {
    transcript: Option<String>,
    confidence: f64,
    fail_with: Option<String>,
    pub calls: AtomicUsize,
}

impl FakeTranscriber {
    pub fn returning(transcript: &str, confidence: f64) -> Self {
        Self {
            transcript: Some(transcript.to_string()),
            confidence,
            fail_with: None,
            calls: AtomicUsize::new(0),
        }
    }

    /// Reads the audio file back as the transcript, so concurrent callers can
    /// verify they only ever see their own input.
    pub fn echoing(confidence: f64) -> Self {
        Self {
            transcript: None,
            confidence,
            fail_with: None,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn failing(message: &str) -> Self {
        Self {
            transcript: None,
            confidence: 0.0,
            fail_with: Some(message.to_string()),
            calls: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl Transcriber for FakeTranscriber {
    async fn transcribe_file(
        &self,
        path: &Path,
        _diarize: bool,
    ) -> Result<TranscriptionResult, AppError> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        if let Some(message) = &self.fail_with {
            return Err(AppError::transcription(message.clone()));
        }

        let transcript = match &self.transcript {
            Some(fixed) => fixed.clone(),
            None => tokio::fs::read_to_string(path)
                .await
                .map_err(|e| AppError::ResourceNotFound(e.to_string()))?,
        };

        Ok(TranscriptionResult {
            wer_estimate: wer_estimate(self.confidence),
            word_count: transcript.split_whitespace().count(),
            transcript,
            confidence: self.confidence,
            speaker_segments: None,
            model: DEEPGRAM_MODEL.to_string(),
            language: LANGUAGE.to_string(),
        })
    }
}

/// Canned coach. Records the question and resume it was called with.
pub struct FakeCoach {
    fail_with: Option<String>,
    pub calls: AtomicUsize,
    pub last_question: Mutex<Option<String>>,
    pub last_resume: Mutex<Option<String>>,
}

impl FakeCoach {
    pub fn new() -> Self {
        Self {
            fail_with: None,
            calls: AtomicUsize::new(0),
            last_question: Mutex::new(None),
            last_resume: Mutex::new(None),
        }
    }

    pub fn failing(message: &str) -> Self {
        Self {
            fail_with: Some(message.to_string()),
            ..Self::new()
        }
    }
}

#[async_trait]
impl CoachingModel for FakeCoach {
    async fn generate_suggestion(
        &self,
        question: &str,
        context: &InterviewContext,
    ) -> Result<CoachingResponse, AppError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        *self.last_question.lock().unwrap() = Some(question.to_string());
        *self.last_resume.lock().unwrap() = context.resume.clone();

        if let Some(message) = &self.fail_with {
            return Err(AppError::response_generation(message.clone()));
        }

        Ok(CoachingResponse {
            suggestion: format!("Try this: {question}"),
            tokens_used: 42,
            model: "fake-model".to_string(),
            finish_reason: "stop".to_string(),
        })
    }
}

/// Builds an `AppState` around fake providers with placeholder keys.
pub fn test_state(
    transcriber: Arc<FakeTranscriber>,
    coach: Arc<FakeCoach>,
) -> AppState {
    AppState {
        transcriber,
        coach,
        config: crate::config::Config {
            deepgram_api_key: "dg-secret-key".to_string(),
            mistral_api_key: "mistral-secret-key".to_string(),
            port: 8000,
            rust_log: "info".to_string(),
        },
    }
}
