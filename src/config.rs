//! Configuration for statement extraction.
//!
//! Everything that shapes a run lives in [`ScanConfig`], built through
//! [`ScanConfigBuilder`]. The hosted-model credential is kept apart in
//! [`Credential`]: it is read once at startup, handed to the backend that
//! needs it, and never printed.

use crate::error::ScanError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// Environment variable holding the hosted-model credential.
pub const API_KEY_ENV: &str = "API_KEY";

/// Checked when [`API_KEY_ENV`] is absent.
pub const API_KEY_FALLBACK_ENV: &str = "GEMINI_API_KEY";

/// Default hosted model.
pub const DEFAULT_MODEL: &str = "gemini-2.5-flash";

/// Default base URL of the Gemini REST API.
pub const DEFAULT_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Configuration for one extraction pipeline.
///
/// # Example
/// ```rust
/// use statement_scan::ScanConfig;
///
/// let config = ScanConfig::builder()
///     .render_scale(2.0)
///     .model("gemini-2.5-pro")
///     .build()
///     .unwrap();
/// assert_eq!(config.render_scale, 2.0);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanConfig {
    /// Page render scale relative to the PDF's native size. Range 0.5–4.0.
    /// Default: 1.5.
    pub render_scale: f32,

    /// Cap on either edge of a rendered page, in pixels. Default: 4096.
    ///
    /// Applied after scaling; aspect ratio is preserved.
    pub max_rendered_pixels: u32,

    /// JPEG quality for page images sent to the model. Range 1–100. Default: 90.
    pub jpeg_quality: u8,

    /// Hosted model identifier. Default: `gemini-2.5-flash`.
    pub model: String,

    /// Base URL for the native Gemini backend.
    pub api_base: String,

    /// Sampling temperature. `None` leaves the provider default in place.
    pub temperature: Option<f32>,

    /// Output token cap for the model call. Default: 8192.
    ///
    /// A long statement with a few hundred transactions stays well below it.
    pub max_output_tokens: usize,

    /// Timeout for the single model call, in seconds. Default: 120.
    pub api_timeout_secs: u64,

    /// User password for encrypted statements.
    #[serde(skip_serializing)]
    pub password: Option<String>,

    /// Explicit path to the pdfium shared library.
    pub pdfium_lib_path: Option<PathBuf>,

    /// Replacement for the built-in extraction instruction.
    pub instruction: Option<String>,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            render_scale: 1.5,
            max_rendered_pixels: 4096,
            jpeg_quality: 90,
            model: DEFAULT_MODEL.to_string(),
            api_base: DEFAULT_API_BASE.to_string(),
            temperature: None,
            max_output_tokens: 8192,
            api_timeout_secs: 120,
            password: None,
            pdfium_lib_path: None,
            instruction: None,
        }
    }
}

impl ScanConfig {
    /// Create a new builder for `ScanConfig`.
    pub fn builder() -> ScanConfigBuilder {
        ScanConfigBuilder {
            config: Self::default(),
        }
    }
}

/// Builder for [`ScanConfig`].
#[derive(Debug)]
pub struct ScanConfigBuilder {
    config: ScanConfig,
}

impl ScanConfigBuilder {
    pub fn render_scale(mut self, scale: f32) -> Self {
        self.config.render_scale = scale.clamp(0.5, 4.0);
        self
    }

    pub fn max_rendered_pixels(mut self, px: u32) -> Self {
        self.config.max_rendered_pixels = px.max(100);
        self
    }

    pub fn jpeg_quality(mut self, quality: u8) -> Self {
        self.config.jpeg_quality = quality.clamp(1, 100);
        self
    }

    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.config.model = model.into();
        self
    }

    pub fn api_base(mut self, base: impl Into<String>) -> Self {
        self.config.api_base = base.into();
        self
    }

    pub fn temperature(mut self, t: f32) -> Self {
        self.config.temperature = Some(t.clamp(0.0, 2.0));
        self
    }

    pub fn max_output_tokens(mut self, n: usize) -> Self {
        self.config.max_output_tokens = n;
        self
    }

    pub fn api_timeout_secs(mut self, secs: u64) -> Self {
        self.config.api_timeout_secs = secs;
        self
    }

    pub fn password(mut self, pwd: impl Into<String>) -> Self {
        self.config.password = Some(pwd.into());
        self
    }

    pub fn pdfium_lib_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.pdfium_lib_path = Some(path.into());
        self
    }

    pub fn instruction(mut self, instruction: impl Into<String>) -> Self {
        self.config.instruction = Some(instruction.into());
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<ScanConfig, ScanError> {
        let c = &self.config;
        if !(0.5..=4.0).contains(&c.render_scale) {
            return Err(ScanError::Configuration(format!(
                "render scale must be 0.5–4.0, got {}",
                c.render_scale
            )));
        }
        if c.model.trim().is_empty() {
            return Err(ScanError::Configuration("model must not be empty".into()));
        }
        if c.api_timeout_secs == 0 {
            return Err(ScanError::Configuration(
                "API timeout must be at least 1 second".into(),
            ));
        }
        if c.max_output_tokens == 0 {
            return Err(ScanError::Configuration(
                "max output tokens must be at least 1".into(),
            ));
        }
        Ok(self.config)
    }
}

// ── Credential ───────────────────────────────────────────────────────────

/// The hosted-model API key.
///
/// `Debug` is redacted so the key never reaches a log line.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential(String);

impl Credential {
    /// Wrap a key, refusing an empty one.
    pub fn new(key: impl Into<String>) -> Result<Self, ScanError> {
        let key = key.into();
        let key = key.trim();
        if key.is_empty() {
            return Err(ScanError::Configuration(format!(
                "{API_KEY_ENV} environment variable not set."
            )));
        }
        Ok(Self(key.to_string()))
    }

    /// Read the key from [`API_KEY_ENV`], falling back to [`API_KEY_FALLBACK_ENV`].
    pub fn from_env() -> Result<Self, ScanError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Same as [`Credential::from_env`] against an arbitrary variable source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ScanError> {
        let value = [API_KEY_ENV, API_KEY_FALLBACK_ENV]
            .iter()
            .filter_map(|name| lookup(name))
            .find(|v| !v.trim().is_empty())
            .unwrap_or_default();
        Self::new(value)
    }

    /// The raw key, for building the request.
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Credential(<redacted>)")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn defaults_render_at_one_and_a_half_scale() {
        let c = ScanConfig::default();
        assert_eq!(c.render_scale, 1.5);
        assert_eq!(c.model, "gemini-2.5-flash");
        assert_eq!(c.api_timeout_secs, 120);
        assert!(c.password.is_none());
    }

    #[test]
    fn builder_clamps_out_of_range_values() {
        let c = ScanConfig::builder()
            .render_scale(10.0)
            .jpeg_quality(0)
            .temperature(5.0)
            .build()
            .unwrap();
        assert_eq!(c.render_scale, 4.0);
        assert_eq!(c.jpeg_quality, 1);
        assert_eq!(c.temperature, Some(2.0));
    }

    #[test]
    fn builder_rejects_empty_model() {
        let err = ScanConfig::builder().model("  ").build().unwrap_err();
        assert!(matches!(err, ScanError::Configuration(_)));
    }

    #[test]
    fn builder_rejects_zero_timeout() {
        let err = ScanConfig::builder().api_timeout_secs(0).build().unwrap_err();
        assert!(err.to_string().contains("timeout"));
    }

    #[test]
    fn credential_missing_is_configuration_error() {
        let err = Credential::from_lookup(|_| None).unwrap_err();
        assert!(matches!(err, ScanError::Configuration(_)));
        assert!(err.to_string().contains("API_KEY"));
    }

    #[test]
    fn credential_blank_is_rejected() {
        let vars: HashMap<&str, String> = [(API_KEY_ENV, "   ".to_string())].into();
        assert!(Credential::from_lookup(|k| vars.get(k).cloned()).is_err());
    }

    #[test]
    fn credential_falls_back_to_gemini_key() {
        let vars: HashMap<&str, String> = [(API_KEY_FALLBACK_ENV, "g-key".to_string())].into();
        let c = Credential::from_lookup(|k| vars.get(k).cloned()).unwrap();
        assert_eq!(c.expose(), "g-key");
    }

    #[test]
    fn credential_prefers_primary_key() {
        let vars: HashMap<&str, String> = [
            (API_KEY_ENV, "primary".to_string()),
            (API_KEY_FALLBACK_ENV, "fallback".to_string()),
        ]
        .into();
        let c = Credential::from_lookup(|k| vars.get(k).cloned()).unwrap();
        assert_eq!(c.expose(), "primary");
    }

    #[test]
    fn credential_debug_is_redacted() {
        let c = Credential::new("secret-123").unwrap();
        let shown = format!("{c:?}");
        assert!(!shown.contains("secret-123"));
    }
}
