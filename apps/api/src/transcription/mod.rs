//! Batch transcription via the Deepgram prerecorded API.
//!
//! ARCHITECTURAL RULE: no other module may call Deepgram's REST API directly.
//! Callers go through the `Transcriber` trait so tests can substitute fakes.

use std::path::Path;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::config::{DEEPGRAM_MODEL, LANGUAGE};
use crate::errors::AppError;

const DEEPGRAM_API_URL: &str = "https://api.deepgram.com/v1/listen";

// ────────────────────────────────────────────────────────────────────────────
// Domain types
// ────────────────────────────────────────────────────────────────────────────

/// One diarized span of speech attributed to a single speaker.
/// Consecutive words from the same speaker always collapse into one segment.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SpeakerSegment {
    pub speaker: u32,
    pub text: String,
    pub confidence: f64,
}

/// The result of one transcription call. Immutable once produced.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranscriptionResult {
    pub transcript: String,
    /// Provider confidence in [0, 1].
    pub confidence: f64,
    /// Derived cost proxy: (1 − confidence) × 100. Not a true WER.
    pub wer_estimate: f64,
    pub word_count: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub speaker_segments: Option<Vec<SpeakerSegment>>,
    pub model: String,
    pub language: String,
}

/// Derives the WER estimate from a confidence value, clamped to [0, 100].
pub fn wer_estimate(confidence: f64) -> f64 {
    ((1.0 - confidence) * 100.0).clamp(0.0, 100.0)
}

// ────────────────────────────────────────────────────────────────────────────
// Trait definition
// ────────────────────────────────────────────────────────────────────────────

/// The transcription backend. Carried in `AppState` as `Arc<dyn Transcriber>`.
#[async_trait]
pub trait Transcriber: Send + Sync {
    /// Transcribes the audio file at `path`. When `diarize` is set, the result
    /// carries per-speaker segments and the transcript is reconstructed from
    /// them in chronological order.
    async fn transcribe_file(
        &self,
        path: &Path,
        diarize: bool,
    ) -> Result<TranscriptionResult, AppError>;
}

// ────────────────────────────────────────────────────────────────────────────
// Deepgram prerecorded response shapes
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct PrerecordedResponse {
    pub results: TranscriptionResults,
}

#[derive(Debug, Deserialize)]
pub struct TranscriptionResults {
    pub channels: Vec<Channel>,
    /// Present when the request asked for utterance-level diarization.
    #[serde(default)]
    pub utterances: Option<Vec<Utterance>>,
}

#[derive(Debug, Deserialize)]
pub struct Channel {
    pub alternatives: Vec<Alternative>,
}

#[derive(Debug, Deserialize)]
pub struct Alternative {
    pub transcript: String,
    pub confidence: f64,
    #[serde(default)]
    pub words: Vec<Word>,
}

#[derive(Debug, Deserialize)]
pub struct Word {
    pub word: String,
    pub confidence: f64,
    /// Smart-formatted form, when the provider supplies one.
    #[serde(default)]
    pub punctuated_word: Option<String>,
    /// Word-level speaker tag. Only present when diarization was requested.
    #[serde(default)]
    pub speaker: Option<u32>,
}

#[derive(Debug, Deserialize)]
pub struct Utterance {
    pub transcript: String,
    pub confidence: f64,
    #[serde(default)]
    pub speaker: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct DeepgramError {
    err_msg: String,
}

// ────────────────────────────────────────────────────────────────────────────
// Deepgram client
// ────────────────────────────────────────────────────────────────────────────

/// Deepgram prerecorded transcription client. One REST call per file; no
/// retries — a provider failure is terminal for the request.
pub struct DeepgramClient {
    client: Client,
    api_key: String,
}

impl DeepgramClient {
    pub fn new(api_key: String) -> Self {
        Self {
            client: Client::builder()
                .timeout(std::time::Duration::from_secs(120))
                .build()
                .expect("Failed to build HTTP client"),
            api_key,
        }
    }
}

#[async_trait]
impl Transcriber for DeepgramClient {
    async fn transcribe_file(
        &self,
        path: &Path,
        diarize: bool,
    ) -> Result<TranscriptionResult, AppError> {
        let buffer = tokio::fs::read(path).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                AppError::ResourceNotFound(path.display().to_string())
            } else {
                AppError::transcription(format!("failed to read audio file: {e}"))
            }
        })?;

        debug!("Transcribing {} ({} bytes)", path.display(), buffer.len());

        let mut query: Vec<(&str, &str)> = vec![
            ("model", DEEPGRAM_MODEL),
            ("language", LANGUAGE),
            ("smart_format", "true"),
            ("punctuate", "true"),
        ];
        if diarize {
            query.push(("diarize", "true"));
            query.push(("utterances", "true"));
        }

        let response = self
            .client
            .post(DEEPGRAM_API_URL)
            .query(&query)
            .header("Authorization", format!("Token {}", self.api_key))
            .header("Content-Type", "application/octet-stream")
            .body(buffer)
            .send()
            .await
            .map_err(|e| AppError::transcription(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<DeepgramError>(&body)
                .map(|e| e.err_msg)
                .unwrap_or(body);
            return Err(AppError::transcription(format!(
                "API returned {status}: {message}"
            )));
        }

        let parsed: PrerecordedResponse = response
            .json()
            .await
            .map_err(|e| AppError::transcription(format!("unexpected response shape: {e}")))?;

        let result = build_result(parsed, diarize)?;
        info!(
            "Transcription complete: {} words, confidence {:.2}",
            result.word_count, result.confidence
        );
        Ok(result)
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Result reconstruction
// ────────────────────────────────────────────────────────────────────────────

/// Builds a `TranscriptionResult` from a provider response.
///
/// Diarized responses come in two shapes depending on provider API version:
/// utterance-tagged (`results.utterances` populated) or word-tagged (speaker
/// labels on each word of the first alternative). Both are handled; the
/// utterance shape wins when present.
pub fn build_result(
    response: PrerecordedResponse,
    diarize: bool,
) -> Result<TranscriptionResult, AppError> {
    let alternative = response
        .results
        .channels
        .first()
        .and_then(|c| c.alternatives.first())
        .ok_or_else(|| AppError::transcription("response contained no alternatives"))?;

    let (segments, utterance_level) = if diarize {
        match response.results.utterances.as_deref() {
            Some(utterances) if !utterances.is_empty() => {
                (Some(segments_from_utterances(utterances)), true)
            }
            _ => {
                let segments = segments_from_words(&alternative.words);
                ((!segments.is_empty()).then_some(segments), false)
            }
        }
    } else {
        (None, false)
    };

    // Utterance segments carry their own confidences: the overall confidence
    // is their arithmetic mean. Word-tagged segments inherit the aggregate
    // confidence of the single alternative.
    let (transcript, confidence) = match &segments {
        Some(segments) if utterance_level => {
            let mean = segments.iter().map(|s| s.confidence).sum::<f64>() / segments.len() as f64;
            (reconstruct_transcript(segments), mean)
        }
        Some(segments) => (reconstruct_transcript(segments), alternative.confidence),
        None => (alternative.transcript.clone(), alternative.confidence),
    };

    let word_count = transcript.split_whitespace().count();

    Ok(TranscriptionResult {
        wer_estimate: wer_estimate(confidence),
        transcript,
        confidence,
        word_count,
        speaker_segments: segments,
        model: DEEPGRAM_MODEL.to_string(),
        language: LANGUAGE.to_string(),
    })
}

/// Groups word-level speaker tags into segments, merging consecutive words
/// from the same speaker. A contiguous same-speaker run is never split. A
/// segment's confidence is the mean over its words.
pub fn segments_from_words(words: &[Word]) -> Vec<SpeakerSegment> {
    struct Run {
        speaker: u32,
        text: String,
        confidence_sum: f64,
        words: usize,
    }

    let mut runs: Vec<Run> = Vec::new();

    for word in words {
        let speaker = word.speaker.unwrap_or(0);
        let text = word.punctuated_word.as_deref().unwrap_or(&word.word);

        match runs.last_mut() {
            Some(run) if run.speaker == speaker => {
                run.text.push(' ');
                run.text.push_str(text);
                run.confidence_sum += word.confidence;
                run.words += 1;
            }
            _ => runs.push(Run {
                speaker,
                text: text.to_string(),
                confidence_sum: word.confidence,
                words: 1,
            }),
        }
    }

    runs.into_iter()
        .map(|run| SpeakerSegment {
            speaker: run.speaker,
            text: run.text,
            confidence: run.confidence_sum / run.words as f64,
        })
        .collect()
}

/// One segment per provider utterance, in emission order.
pub fn segments_from_utterances(utterances: &[Utterance]) -> Vec<SpeakerSegment> {
    utterances
        .iter()
        .map(|u| SpeakerSegment {
            speaker: u.speaker.unwrap_or(0),
            text: u.transcript.clone(),
            confidence: u.confidence,
        })
        .collect()
}

/// Concatenates segment texts in chronological order. This is the raw
/// transcript handed to the coaching step.
pub fn reconstruct_transcript(segments: &[SpeakerSegment]) -> String {
    segments
        .iter()
        .map(|s| s.text.as_str())
        .collect::<Vec<_>>()
        .join(" ")
}

// ────────────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────────────
