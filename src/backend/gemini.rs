//! Native Gemini `generateContent` backend.
//!
//! The request carries one user turn: the instruction text followed by every
//! page as an `inlineData` part. `generationConfig` asks for
//! `application/json` constrained by the statement schema, so the model's
//! answer is already JSON; it is still validated downstream.

use super::{ExtractionRequest, VisionBackend};
use crate::config::{Credential, ScanConfig};
use crate::error::{BackendError, ScanError};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

const PROVIDER: &str = "gemini";

/// [`VisionBackend`] talking to the Gemini REST API.
#[derive(Debug, Clone)]
pub struct GeminiBackend {
    client: reqwest::Client,
    credential: Credential,
    label: String,
    endpoint: String,
    temperature: Option<f32>,
    max_output_tokens: usize,
    timeout_secs: u64,
}

impl GeminiBackend {
    /// Build the backend. `credential` comes from [`Credential::from_env`]
    /// at startup.
    pub fn new(credential: Credential, config: &ScanConfig) -> Result<Self, ScanError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.api_timeout_secs))
            .build()
            .map_err(|e| ScanError::Configuration(format!("HTTP client: {e}")))?;

        Ok(Self {
            client,
            credential,
            label: format!("{PROVIDER}/{}", config.model),
            endpoint: format!(
                "{}/models/{}:generateContent",
                config.api_base.trim_end_matches('/'),
                config.model
            ),
            temperature: config.temperature,
            max_output_tokens: config.max_output_tokens,
            timeout_secs: config.api_timeout_secs,
        })
    }

    /// The full `generateContent` URL.
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    async fn call(&self, request: &ExtractionRequest) -> Result<String, BackendError> {
        let body = build_request_body(request, self.temperature, self.max_output_tokens);

        let response = self
            .client
            .post(&self.endpoint)
            .header("x-goog-api-key", self.credential.expose())
            .json(&body)
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(map_status(status.as_u16(), &text));
        }

        let parsed: GenerateContentResponse =
            response.json().await.map_err(|e| self.transport_error(e))?;

        if let Some(usage) = &parsed.usage_metadata {
            debug!(
                "{}: {} input tokens, {} output tokens",
                self.label, usage.prompt_token_count, usage.candidates_token_count
            );
        }

        response_text(parsed)
    }

    fn transport_error(&self, e: reqwest::Error) -> BackendError {
        if e.is_timeout() {
            BackendError::Timeout {
                provider: PROVIDER.to_string(),
                secs: self.timeout_secs,
            }
        } else {
            BackendError::Transport {
                provider: PROVIDER.to_string(),
                detail: e.to_string(),
            }
        }
    }
}

impl VisionBackend for GeminiBackend {
    fn name(&self) -> &str {
        &self.label
    }

    async fn generate(&self, request: &ExtractionRequest) -> Result<String, BackendError> {
        let start = Instant::now();
        info!(
            "Sending {} page images ({} bytes) to {}",
            request.images.len(),
            request.image_bytes(),
            self.label
        );
        let result = self.call(request).await;
        match &result {
            Ok(text) => debug!(
                "{} answered in {}ms ({} chars)",
                self.label,
                start.elapsed().as_millis(),
                text.len()
            ),
            Err(e) => warn!("{} call failed: {}", self.label, e),
        }
        result
    }
}

// ── Wire types ───────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest<'a> {
    contents: Vec<Content<'a>>,
    generation_config: GenerationConfig<'a>,
}

#[derive(Debug, Serialize)]
struct Content<'a> {
    role: &'a str,
    parts: Vec<Part<'a>>,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
enum Part<'a> {
    Text {
        text: &'a str,
    },
    #[serde(rename_all = "camelCase")]
    InlineData {
        inline_data: Blob<'a>,
    },
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct Blob<'a> {
    mime_type: &'a str,
    data: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig<'a> {
    response_mime_type: &'a str,
    response_schema: &'a Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    max_output_tokens: usize,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    prompt_feedback: Option<PromptFeedback>,
    usage_metadata: Option<UsageMetadata>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    content: Option<CandidateContent>,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Debug, Deserialize)]
struct CandidatePart {
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    block_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UsageMetadata {
    #[serde(default)]
    prompt_token_count: u64,
    #[serde(default)]
    candidates_token_count: u64,
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    message: String,
    #[serde(default)]
    status: String,
}

// ── Request / response mapping ───────────────────────────────────────────

/// The `generateContent` body for `request`.
fn build_request_body(
    request: &ExtractionRequest,
    temperature: Option<f32>,
    max_output_tokens: usize,
) -> GenerateContentRequest<'_> {
    let mut parts = Vec::with_capacity(request.images.len() + 1);
    parts.push(Part::Text {
        text: &request.instruction,
    });
    parts.extend(request.images.iter().map(|img| Part::InlineData {
        inline_data: Blob {
            mime_type: &img.mime_type,
            data: &img.data,
        },
    }));

    GenerateContentRequest {
        contents: vec![Content { role: "user", parts }],
        generation_config: GenerationConfig {
            response_mime_type: "application/json",
            response_schema: &request.schema,
            temperature,
            max_output_tokens,
        },
    }
}

/// Concatenate the text parts of the first candidate.
fn response_text(response: GenerateContentResponse) -> Result<String, BackendError> {
    let block_reason = response.prompt_feedback.and_then(|f| f.block_reason);

    let candidate = match response.candidates.into_iter().next() {
        Some(c) => c,
        None => {
            return Err(BackendError::EmptyResponse {
                provider: PROVIDER.to_string(),
                reason: block_reason
                    .map(|r| format!("prompt blocked ({r})"))
                    .unwrap_or_else(|| "no candidates".to_string()),
            })
        }
    };

    let text: String = candidate
        .content
        .map(|c| c.parts.into_iter().filter_map(|p| p.text).collect())
        .unwrap_or_default();

    if text.trim().is_empty() {
        return Err(BackendError::EmptyResponse {
            provider: PROVIDER.to_string(),
            reason: format!(
                "finish reason {}",
                candidate.finish_reason.as_deref().unwrap_or("unknown")
            ),
        });
    }
    Ok(text)
}

/// Classify a non-success HTTP response.
///
/// Gemini reports a bad key as HTTP 400 with status `INVALID_ARGUMENT` and a
/// message naming the key, so that case counts as an auth failure too.
fn map_status(status: u16, body: &str) -> BackendError {
    let (message, api_status) = match serde_json::from_str::<ErrorEnvelope>(body) {
        Ok(env) => (env.error.message, env.error.status),
        Err(_) => (body.chars().take(300).collect(), String::new()),
    };

    let key_rejected = message.contains("API key") || api_status == "UNAUTHENTICATED";
    match status {
        401 | 403 => BackendError::Auth {
            provider: PROVIDER.to_string(),
            detail: message,
        },
        400 if key_rejected => BackendError::Auth {
            provider: PROVIDER.to_string(),
            detail: message,
        },
        429 => BackendError::RateLimited {
            provider: PROVIDER.to_string(),
        },
        _ => BackendError::Status {
            provider: PROVIDER.to_string(),
            status,
            detail: message,
        },
    }
}
