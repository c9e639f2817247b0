//! The batch pipeline: transcribe an audio file, then coach a response.
//!
//! Two sequential outbound calls per invocation. The coaching call is never
//! attempted if transcription fails. No retries, no persistence; concurrent
//! invocations share no state.

use std::path::Path;

use serde::Serialize;
use tracing::info;

use crate::coaching::{CoachingModel, CoachingResponse, InterviewContext};
use crate::errors::AppError;
use crate::transcription::{TranscriptionResult, Transcriber};

pub mod handlers;

/// Combined output of one pipeline invocation.
#[derive(Debug, Clone, Serialize)]
pub struct InterviewOutcome {
    pub transcription: TranscriptionResult,
    pub suggestion: CoachingResponse,
}

/// Runs the full pipeline: transcribe `audio_path`, then generate a coaching
/// suggestion from the raw transcript plus optional candidate context.
pub async fn process_audio(
    transcriber: &dyn Transcriber,
    coach: &dyn CoachingModel,
    audio_path: &Path,
    diarize: bool,
    context: &InterviewContext,
) -> Result<InterviewOutcome, AppError> {
    let transcription = transcriber.transcribe_file(audio_path, diarize).await?;

    info!(
        "Transcript ready ({} words, wer_estimate {:.2}%)",
        transcription.word_count, transcription.wer_estimate
    );

    let suggestion = coach
        .generate_suggestion(&transcription.transcript, context)
        .await?;

    Ok(InterviewOutcome {
        transcription,
        suggestion,
    })
}

// ────────────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────────────
