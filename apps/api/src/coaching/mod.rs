//! Coaching suggestions via the Mistral chat-completions API.
//!
//! ARCHITECTURAL RULE: no other module may call Mistral directly. Callers go
//! through the `CoachingModel` trait so tests can substitute fakes.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::config::MISTRAL_MODEL;
use crate::errors::AppError;

pub mod prompts;

const MISTRAL_API_URL: &str = "https://api.mistral.ai/v1/chat/completions";
const TEMPERATURE: f64 = 0.7;
const MAX_TOKENS: u32 = 300;
const TOP_P: f64 = 0.9;

// ────────────────────────────────────────────────────────────────────────────
// Domain types
// ────────────────────────────────────────────────────────────────────────────

/// Optional candidate background supplied by the caller. Read-only.
#[derive(Debug, Clone, Default)]
pub struct InterviewContext {
    pub resume: Option<String>,
    pub job_description: Option<String>,
}

/// The result of one coaching call. Immutable once produced.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CoachingResponse {
    pub suggestion: String,
    pub tokens_used: u32,
    pub model: String,
    pub finish_reason: String,
}

// ────────────────────────────────────────────────────────────────────────────
// Trait definition
// ────────────────────────────────────────────────────────────────────────────

/// The coaching backend. Carried in `AppState` as `Arc<dyn CoachingModel>`.
#[async_trait]
pub trait CoachingModel: Send + Sync {
    /// Generates a suggested answer for `question`, optionally grounded in
    /// the candidate's resume and the target job description.
    async fn generate_suggestion(
        &self,
        question: &str,
        context: &InterviewContext,
    ) -> Result<CoachingResponse, AppError>;
}

// ────────────────────────────────────────────────────────────────────────────
// Mistral chat-completions wire shapes
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f64,
    max_tokens: u32,
    top_p: f64,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    model: String,
    choices: Vec<Choice>,
    usage: Usage,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: AssistantMessage,
    finish_reason: String,
}

#[derive(Debug, Deserialize)]
struct AssistantMessage {
    content: String,
}

#[derive(Debug, Deserialize)]
struct Usage {
    total_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct MistralError {
    message: String,
}

// ────────────────────────────────────────────────────────────────────────────
// Mistral client
// ────────────────────────────────────────────────────────────────────────────

/// Mistral chat client. One completion call per invocation; no retries — a
/// provider failure is terminal for the request.
pub struct MistralClient {
    client: Client,
    api_key: String,
    model: String,
}

impl MistralClient {
    pub fn new(api_key: String) -> Self {
        Self {
            client: Client::builder()
                .timeout(std::time::Duration::from_secs(120))
                .build()
                .expect("Failed to build HTTP client"),
            api_key,
            model: MISTRAL_MODEL.to_string(),
        }
    }
}

#[async_trait]
impl CoachingModel for MistralClient {
    async fn generate_suggestion(
        &self,
        question: &str,
        context: &InterviewContext,
    ) -> Result<CoachingResponse, AppError> {
        let system = prompts::build_system_prompt(context);
        let user = prompts::build_user_prompt(question);

        let preview: String = question.chars().take(50).collect();
        debug!("Generating suggestion for: {preview}...");

        let request_body = ChatRequest {
            model: &self.model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: &system,
                },
                ChatMessage {
                    role: "user",
                    content: &user,
                },
            ],
            temperature: TEMPERATURE,
            max_tokens: MAX_TOKENS,
            top_p: TOP_P,
        };

        let response = self
            .client
            .post(MISTRAL_API_URL)
            .bearer_auth(&self.api_key)
            .header("content-type", "application/json")
            .json(&request_body)
            .send()
            .await
            .map_err(|e| AppError::response_generation(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<MistralError>(&body)
                .map(|e| e.message)
                .unwrap_or(body);
            return Err(AppError::response_generation(format!(
                "API returned {status}: {message}"
            )));
        }

        let parsed: ChatResponse = response
            .json()
            .await
            .map_err(|e| AppError::response_generation(format!("unexpected response shape: {e}")))?;

        let choice = parsed
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| AppError::response_generation("response contained no choices"))?;

        info!(
            "Suggestion generated: {} tokens, finish_reason {}",
            parsed.usage.total_tokens, choice.finish_reason
        );

        Ok(CoachingResponse {
            suggestion: choice.message.content,
            tokens_used: parsed.usage.total_tokens,
            model: parsed.model,
            finish_reason: choice.finish_reason,
        })
    }
}
