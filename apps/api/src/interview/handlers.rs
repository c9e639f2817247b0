//! Axum route handler for the batch interview pipeline.

use std::time::Instant;

use axum::extract::{Multipart, State};
use axum::Json;
use serde::Serialize;
use tracing::info;

use crate::coaching::{CoachingResponse, InterviewContext};
use crate::config::{is_allowed_audio_format, ALLOWED_AUDIO_FORMATS};
use crate::errors::AppError;
use crate::interview::process_audio;
use crate::state::AppState;
use crate::transcription::TranscriptionResult;

#[derive(Debug, Serialize)]
pub struct ProcessInterviewResponse {
    pub success: bool,
    pub transcription: TranscriptionResult,
    pub suggestion: CoachingResponse,
    pub processing_time_seconds: f64,
}

/// POST /process-interview (multipart)
///
/// Fields: `audio` (binary, required), `resume` (text, optional),
/// `job_description` (text, optional), `diarize` (optional, "true"/"false").
///
/// The audio extension is validated against the allow-list before any
/// network call. The upload is spilled to a temp file that is removed when
/// the handler returns.
pub async fn handle_process_interview(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<ProcessInterviewResponse>, AppError> {
    let started = Instant::now();

    let mut audio: Option<(String, bytes::Bytes)> = None;
    let mut context = InterviewContext::default();
    let mut diarize = false;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::Validation(format!("malformed multipart body: {e}")))?
    {
        match field.name() {
            Some("audio") => {
                let filename = field
                    .file_name()
                    .ok_or_else(|| {
                        AppError::Validation("audio field must carry a filename".to_string())
                    })?
                    .to_string();
                let data = field
                    .bytes()
                    .await
                    .map_err(|e| AppError::Validation(format!("failed to read audio: {e}")))?;
                audio = Some((filename, data));
            }
            Some("resume") => {
                let text = field
                    .text()
                    .await
                    .map_err(|e| AppError::Validation(format!("failed to read resume: {e}")))?;
                if !text.is_empty() {
                    context.resume = Some(text);
                }
            }
            Some("job_description") => {
                let text = field.text().await.map_err(|e| {
                    AppError::Validation(format!("failed to read job_description: {e}"))
                })?;
                if !text.is_empty() {
                    context.job_description = Some(text);
                }
            }
            Some("diarize") => {
                let text = field
                    .text()
                    .await
                    .map_err(|e| AppError::Validation(format!("failed to read diarize: {e}")))?;
                diarize = text.eq_ignore_ascii_case("true");
            }
            _ => {} // unknown fields ignored
        }
    }

    let (filename, data) =
        audio.ok_or_else(|| AppError::Validation("audio field is required".to_string()))?;

    // Format check happens before any network call.
    if !is_allowed_audio_format(&filename) {
        return Err(AppError::InvalidFormat(ALLOWED_AUDIO_FORMATS.join(", ")));
    }

    let suffix = extension_of(&filename);
    let tmp = tempfile::Builder::new()
        .suffix(&suffix)
        .tempfile()
        .map_err(|e| AppError::Internal(anyhow::anyhow!("failed to create temp file: {e}")))?;
    tokio::fs::write(tmp.path(), &data)
        .await
        .map_err(|e| AppError::Internal(anyhow::anyhow!("failed to write temp file: {e}")))?;

    info!("Processing interview upload {filename} ({} bytes)", data.len());

    let outcome = process_audio(
        state.transcriber.as_ref(),
        state.coach.as_ref(),
        tmp.path(),
        diarize,
        &context,
    )
    .await?;

    let processing_time_seconds = (started.elapsed().as_secs_f64() * 100.0).round() / 100.0;

    Ok(Json(ProcessInterviewResponse {
        success: true,
        transcription: outcome.transcription,
        suggestion: outcome.suggestion,
        processing_time_seconds,
    }))
}

/// Lowercased extension including the dot, or empty when absent.
fn extension_of(filename: &str) -> String {
    filename
        .rfind('.')
        .map(|i| filename[i..].to_lowercase())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::Ordering;
    use std::sync::Arc;

    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use tower::ServiceExt;

    use super::*;
    use crate::routes::build_router;
    use crate::test_support::{test_state, FakeCoach, FakeTranscriber};

    const BOUNDARY: &str = "interview-test-boundary";

    fn multipart_request(filename: &str) -> Request<Body> {
        let body = format!(
            "--{BOUNDARY}\r\n\
             Content-Disposition: form-data; name=\"audio\"; filename=\"{filename}\"\r\n\
             Content-Type: application/octet-stream\r\n\r\n\
             fake audio bytes\r\n\
             --{BOUNDARY}--\r\n"
        );
        Request::builder()
            .method("POST")
            .uri("/process-interview")
            .header(
                "content-type",
                format!("multipart/form-data; boundary={BOUNDARY}"),
            )
            .body(Body::from(body))
            .unwrap()
    }

    #[test]
    fn test_extension_of() {
        assert_eq!(extension_of("clip.MP3"), ".mp3");
        assert_eq!(extension_of("a.b.wav"), ".wav");
        assert_eq!(extension_of("noext"), "");
    }

    #[tokio::test]
    async fn test_unsupported_extension_rejected_before_any_provider_call() {
        let transcriber = Arc::new(FakeTranscriber::returning("unused", 0.9));
        let coach = Arc::new(FakeCoach::new());
        let app = build_router(test_state(transcriber.clone(), coach.clone()));

        let response = app.oneshot(multipart_request("clip.aac")).await.unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(transcriber.calls.load(Ordering::SeqCst), 0);
        assert_eq!(coach.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_missing_audio_field_is_bad_request() {
        let app = build_router(test_state(
            Arc::new(FakeTranscriber::returning("unused", 0.9)),
            Arc::new(FakeCoach::new()),
        ));

        let body = format!(
            "--{BOUNDARY}\r\n\
             Content-Disposition: form-data; name=\"resume\"\r\n\r\n\
             some resume\r\n\
             --{BOUNDARY}--\r\n"
        );
        let request = Request::builder()
            .method("POST")
            .uri("/process-interview")
            .header(
                "content-type",
                format!("multipart/form-data; boundary={BOUNDARY}"),
            )
            .body(Body::from(body))
            .unwrap();

        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_successful_upload_returns_combined_result() {
        let transcriber = Arc::new(FakeTranscriber::returning("Tell me about yourself", 0.95));
        let coach = Arc::new(FakeCoach::new());
        let app = build_router(test_state(transcriber, coach));

        let response = app.oneshot(multipart_request("clip.wav")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let json: serde_json::Value = serde_json::from_slice(&bytes).unwrap();

        assert_eq!(json["success"], true);
        assert_eq!(json["transcription"]["transcript"], "Tell me about yourself");
        assert_eq!(json["transcription"]["confidence"], 0.95);
        assert!(json["suggestion"]["suggestion"].as_str().is_some());
        assert!(json["processing_time_seconds"].as_f64().is_some());
    }

    #[tokio::test]
    async fn test_multi_megabyte_upload_is_accepted() {
        // Interview recordings routinely run to tens of megabytes; the router
        // must raise axum's 2 MB default body limit.
        let transcriber = Arc::new(FakeTranscriber::returning("Tell me about yourself", 0.95));
        let coach = Arc::new(FakeCoach::new());
        let app = build_router(test_state(transcriber, coach));

        let payload = "a".repeat(3 * 1024 * 1024);
        let body = format!(
            "--{BOUNDARY}\r\n\
             Content-Disposition: form-data; name=\"audio\"; filename=\"long.wav\"\r\n\
             Content-Type: application/octet-stream\r\n\r\n\
             {payload}\r\n\
             --{BOUNDARY}--\r\n"
        );
        let request = Request::builder()
            .method("POST")
            .uri("/process-interview")
            .header(
                "content-type",
                format!("multipart/form-data; boundary={BOUNDARY}"),
            )
            .body(Body::from(body))
            .unwrap();

        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_provider_failure_surfaces_as_500_with_detail() {
        let app = build_router(test_state(
            Arc::new(FakeTranscriber::failing("auth rejected")),
            Arc::new(FakeCoach::new()),
        ));

        let response = app.oneshot(multipart_request("clip.mp3")).await.unwrap();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let json: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        let detail = json["detail"].as_str().unwrap();
        assert!(detail.contains("Transcription failed"));
        assert!(detail.contains("auth rejected"));
    }
}
