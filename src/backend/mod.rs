//! Hosted-model backends.
//!
//! A backend receives one [`ExtractionRequest`] (instruction, every page
//! image, response schema) and returns the model's raw text. It does not
//! parse or validate; that is [`crate::pipeline::llm::parse_statement`]'s job,
//! so every backend is held to the same contract.
//!
//! | Backend | Schema enforcement |
//! |---------|--------------------|
//! | [`GeminiBackend`] | native `responseSchema` |
//! | [`ProviderBackend`] | schema embedded in the system prompt |

pub mod gemini;
pub mod provider;

pub use gemini::GeminiBackend;
pub use provider::ProviderBackend;

use crate::error::BackendError;
use crate::pipeline::encode::PageImage;
use serde_json::Value;
use std::future::Future;

/// Everything sent to the model in its single call for a statement.
#[derive(Debug, Clone)]
pub struct ExtractionRequest {
    pub instruction: String,
    /// One per page, in page order.
    pub images: Vec<PageImage>,
    pub schema: Value,
}

impl ExtractionRequest {
    /// Total size of the base64 image payloads.
    pub fn image_bytes(&self) -> usize {
        self.images.iter().map(|i| i.data.len()).sum()
    }
}

/// A hosted vision model that answers an [`ExtractionRequest`] with text.
///
/// Constructed once at startup and shared by reference; implementations
/// hold their own credential and HTTP client.
pub trait VisionBackend: Send + Sync {
    /// Short label for logs, e.g. `gemini/gemini-2.5-flash`.
    fn name(&self) -> &str;

    /// Issue exactly one model call.
    fn generate(
        &self,
        request: &ExtractionRequest,
    ) -> impl Future<Output = Result<String, BackendError>> + Send;
}
