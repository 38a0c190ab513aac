//! Backend over any `edgequake-llm` vision provider.
//!
//! OpenAI, Anthropic, Ollama and the other providers have no common way to
//! pass a response schema, so the schema travels in the system prompt (see
//! [`crate::prompts::instruction_with_schema`]) and the images go on a single
//! user message. Provider credentials are read by the provider factory from
//! its own environment variables (`OPENAI_API_KEY`, …).

use super::{ExtractionRequest, VisionBackend};
use crate::config::ScanConfig;
use crate::error::{BackendError, ScanError};
use crate::prompts::instruction_with_schema;
use edgequake_llm::{ChatMessage, CompletionOptions, ImageData, LLMProvider, ProviderFactory};
use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// [`VisionBackend`] wrapping an `Arc<dyn LLMProvider>`.
#[derive(Clone)]
pub struct ProviderBackend {
    provider: Arc<dyn LLMProvider>,
    provider_name: String,
    label: String,
    temperature: Option<f32>,
    max_tokens: usize,
    timeout_secs: u64,
}

impl fmt::Debug for ProviderBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderBackend")
            .field("label", &self.label)
            .field("provider", &"<dyn LLMProvider>")
            .field("temperature", &self.temperature)
            .field("max_tokens", &self.max_tokens)
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

impl ProviderBackend {
    /// Wrap a pre-built provider.
    pub fn new(
        provider: Arc<dyn LLMProvider>,
        provider_name: impl Into<String>,
        config: &ScanConfig,
    ) -> Self {
        let provider_name = provider_name.into();
        Self {
            provider,
            label: format!("{}/{}", provider_name, config.model),
            provider_name,
            temperature: config.temperature,
            max_tokens: config.max_output_tokens,
            timeout_secs: config.api_timeout_secs,
        }
    }

    /// Instantiate a named provider (`openai`, `anthropic`, `ollama`, …)
    /// for `config.model`.
    pub fn from_name(provider_name: &str, config: &ScanConfig) -> Result<Self, ScanError> {
        let provider = ProviderFactory::create_llm_provider(provider_name, &config.model)
            .map_err(|e| {
                ScanError::Configuration(format!(
                    "LLM provider '{provider_name}' is not configured: {e}"
                ))
            })?;
        Ok(Self::new(provider, provider_name, config))
    }

    fn build_messages(request: &ExtractionRequest) -> Vec<ChatMessage> {
        let images: Vec<ImageData> = request
            .images
            .iter()
            .map(|img| ImageData::new(img.data.clone(), img.mime_type.as_str()))
            .collect();

        vec![
            ChatMessage::system(instruction_with_schema(
                &request.instruction,
                &request.schema,
            )),
            ChatMessage::user_with_images("", images),
        ]
    }

    fn build_options(&self) -> CompletionOptions {
        CompletionOptions {
            temperature: self.temperature,
            max_tokens: Some(self.max_tokens),
            ..Default::default()
        }
    }
}

impl VisionBackend for ProviderBackend {
    fn name(&self) -> &str {
        &self.label
    }

    async fn generate(&self, request: &ExtractionRequest) -> Result<String, BackendError> {
        let start = Instant::now();
        let messages = Self::build_messages(request);
        let options = self.build_options();
        info!(
            "Sending {} page images ({} bytes) to {}",
            request.images.len(),
            request.image_bytes(),
            self.label
        );

        let call = self.provider.chat(&messages, Some(&options));
        let response = match tokio::time::timeout(Duration::from_secs(self.timeout_secs), call).await
        {
            Ok(Ok(response)) => response,
            Ok(Err(e)) => {
                let err = classify_provider_error(&self.provider_name, &e.to_string());
                warn!("{} call failed: {}", self.label, err);
                return Err(err);
            }
            Err(_) => {
                warn!("{} timed out after {}s", self.label, self.timeout_secs);
                return Err(BackendError::Timeout {
                    provider: self.provider_name.clone(),
                    secs: self.timeout_secs,
                });
            }
        };

        debug!(
            "{}: {} input tokens, {} output tokens, {:?}",
            self.label,
            response.prompt_tokens,
            response.completion_tokens,
            start.elapsed()
        );

        if response.content.trim().is_empty() {
            return Err(BackendError::EmptyResponse {
                provider: self.provider_name.clone(),
                reason: "empty completion".to_string(),
            });
        }
        Ok(response.content)
    }
}

/// Sort a provider error message into a [`BackendError`].
///
/// Providers only expose errors as text, so this keys off the status codes
/// and phrases they put in it.
fn classify_provider_error(provider: &str, message: &str) -> BackendError {
    let lower = message.to_lowercase();
    if lower.contains("401")
        || lower.contains("403")
        || lower.contains("unauthorized")
        || lower.contains("invalid api key")
        || lower.contains("authentication")
    {
        BackendError::Auth {
            provider: provider.to_string(),
            detail: message.to_string(),
        }
    } else if lower.contains("429") || lower.contains("rate limit") {
        BackendError::RateLimited {
            provider: provider.to_string(),
        }
    } else {
        BackendError::Transport {
            provider: provider.to_string(),
            detail: message.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::encode::PageImage;
    use crate::schema::statement_schema;

    #[test]
    fn messages_are_system_prompt_then_one_user_turn() {
        let request = ExtractionRequest {
            instruction: "extract".into(),
            images: vec![
                PageImage {
                    page_num: 1,
                    mime_type: "image/jpeg".into(),
                    data: "AAAA".into(),
                },
                PageImage {
                    page_num: 2,
                    mime_type: "image/jpeg".into(),
                    data: "BBBB".into(),
                },
            ],
            schema: statement_schema(),
        };
        let messages = ProviderBackend::build_messages(&request);
        assert_eq!(messages.len(), 2);
    }

    #[test]
    fn provider_errors_are_classified() {
        assert!(matches!(
            classify_provider_error("openai", "HTTP 401 Unauthorized"),
            BackendError::Auth { .. }
        ));
        assert!(matches!(
            classify_provider_error("openai", "429 Too Many Requests"),
            BackendError::RateLimited { .. }
        ));
        assert!(matches!(
            classify_provider_error("ollama", "connection refused"),
            BackendError::Transport { .. }
        ));
    }
}
