//! Configuration types for image-to-build-plan generation.
//!
//! All pipeline behaviour is controlled through [`GenerationConfig`], built
//! via its [`GenerationConfigBuilder`]. A config is read-only once built and
//! is shared by reference; nothing in the pipeline mutates it, so two runs
//! with the same config and inputs take exactly the same path.

use crate::error::BuildPlanError;
use crate::progress::ProgressCallback;
use edgequake_llm::LLMProvider;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// Default longest-edge ceiling, in pixels, for submitted images.
///
/// Images larger than this are downscaled by the vision backend anyway;
/// resizing locally keeps upload size and latency down.
pub const DEFAULT_MAX_EDGE: u32 = 1568;

/// Default model identifier.
pub const DEFAULT_MODEL: &str = "claude-sonnet-4-5";

/// Configuration for a build-plan generation run.
///
/// Built via [`GenerationConfig::builder()`] or using
/// [`GenerationConfig::default()`].
///
/// # Example
/// ```rust
/// use img2build::GenerationConfig;
///
/// let config = GenerationConfig::builder()
///     .max_edge(1024)
///     .max_output_tokens(4096)
///     .model("claude-sonnet-4-5")
///     .build()
///     .unwrap();
/// ```
#[derive(Clone)]
pub struct GenerationConfig {
    /// Longest-edge ceiling for the submitted image in pixels. Default: 1568.
    ///
    /// Smaller images are never upscaled.
    pub max_edge: u32,

    /// Maximum tokens the model may generate. Default: 1024.
    ///
    /// Build plans grow linearly with block count; a cap that is too low
    /// truncates the JSON mid-array and the run fails with
    /// [`BuildPlanError::MalformedData`].
    pub max_output_tokens: usize,

    /// Backend model identifier. Default: `claude-sonnet-4-5`.
    pub model: String,

    /// LLM provider name (e.g. "anthropic", "openai", "gemini").
    /// If None along with `provider`, the provider is auto-detected.
    pub provider_name: Option<String>,

    /// Pre-constructed LLM provider. Takes precedence over `provider_name`.
    pub provider: Option<Arc<dyn LLMProvider>>,

    /// Sampling temperature. Default: 0.0.
    pub temperature: f32,

    /// Backend call timeout in seconds. Default: 120. `0` disables the timeout.
    pub api_timeout_secs: u64,

    /// Download timeout for URL inputs in seconds. Default: 60. `0` disables it.
    pub download_timeout_secs: u64,

    /// Encoding used for the normalised image. Default: PNG.
    pub image_encoding: ImageEncoding,

    /// Custom system prompt. If None, uses the built-in default.
    pub system_prompt: Option<String>,

    /// Optional stage progress callback.
    pub progress_callback: Option<ProgressCallback>,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            max_edge: DEFAULT_MAX_EDGE,
            max_output_tokens: 1024,
            model: DEFAULT_MODEL.to_string(),
            provider_name: None,
            provider: None,
            temperature: 0.0,
            api_timeout_secs: 120,
            download_timeout_secs: 60,
            image_encoding: ImageEncoding::default(),
            system_prompt: None,
            progress_callback: None,
        }
    }
}

impl fmt::Debug for GenerationConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GenerationConfig")
            .field("max_edge", &self.max_edge)
            .field("max_output_tokens", &self.max_output_tokens)
            .field("model", &self.model)
            .field("provider_name", &self.provider_name)
            .field("provider", &self.provider.as_ref().map(|_| "<dyn LLMProvider>"))
            .field("temperature", &self.temperature)
            .field("api_timeout_secs", &self.api_timeout_secs)
            .field("download_timeout_secs", &self.download_timeout_secs)
            .field("image_encoding", &self.image_encoding)
            .field("system_prompt", &self.system_prompt.as_ref().map(|p| p.len()))
            .field("progress_callback", &self.progress_callback.is_some())
            .finish()
    }
}

impl GenerationConfig {
    /// Create a new builder for `GenerationConfig`.
    pub fn builder() -> GenerationConfigBuilder {
        GenerationConfigBuilder {
            config: Self::default(),
        }
    }
}

/// Builder for [`GenerationConfig`].
pub struct GenerationConfigBuilder {
    config: GenerationConfig,
}

impl fmt::Debug for GenerationConfigBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GenerationConfigBuilder")
            .field("config", &self.config)
            .finish()
    }
}

impl GenerationConfigBuilder {
    pub fn max_edge(mut self, px: u32) -> Self {
        self.config.max_edge = px;
        self
    }

    pub fn max_output_tokens(mut self, n: usize) -> Self {
        self.config.max_output_tokens = n;
        self
    }

    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.config.model = model.into();
        self
    }

    pub fn provider_name(mut self, name: impl Into<String>) -> Self {
        self.config.provider_name = Some(name.into());
        self
    }

    pub fn provider(mut self, provider: Arc<dyn LLMProvider>) -> Self {
        self.config.provider = Some(provider);
        self
    }

    pub fn temperature(mut self, t: f32) -> Self {
        self.config.temperature = t.clamp(0.0, 2.0);
        self
    }

    pub fn api_timeout_secs(mut self, secs: u64) -> Self {
        self.config.api_timeout_secs = secs;
        self
    }

    pub fn download_timeout_secs(mut self, secs: u64) -> Self {
        self.config.download_timeout_secs = secs;
        self
    }

    pub fn image_encoding(mut self, encoding: ImageEncoding) -> Self {
        self.config.image_encoding = encoding;
        self
    }

    pub fn system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.config.system_prompt = Some(prompt.into());
        self
    }

    pub fn progress_callback(mut self, cb: ProgressCallback) -> Self {
        self.config.progress_callback = Some(cb);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<GenerationConfig, BuildPlanError> {
        let c = &self.config;
        if c.max_edge == 0 {
            return Err(BuildPlanError::InvalidConfig(
                "max_edge must be ≥ 1".into(),
            ));
        }
        if c.max_output_tokens == 0 {
            return Err(BuildPlanError::InvalidConfig(
                "max_output_tokens must be ≥ 1".into(),
            ));
        }
        if c.model.trim().is_empty() {
            return Err(BuildPlanError::InvalidConfig(
                "model identifier must not be empty".into(),
            ));
        }
        Ok(self.config)
    }
}

// ── Enums ────────────────────────────────────────────────────────────────

/// Encoding used when re-encoding the normalised image for upload.
///
/// PNG is lossless and keeps the alpha channel; JPEG is smaller but drops
/// transparency (pixels are flattened to RGB first).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageEncoding {
    #[default]
    Png,
    Jpeg,
}

impl ImageEncoding {
    pub fn mime_type(&self) -> &'static str {
        match self {
            ImageEncoding::Png => "image/png",
            ImageEncoding::Jpeg => "image/jpeg",
        }
    }

    pub(crate) fn image_format(&self) -> image::ImageFormat {
        match self {
            ImageEncoding::Png => image::ImageFormat::Png,
            ImageEncoding::Jpeg => image::ImageFormat::Jpeg,
        }
    }
}

impl fmt::Display for ImageEncoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ImageEncoding::Png => f.write_str("png"),
            ImageEncoding::Jpeg => f.write_str("jpeg"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_backend_limits() {
        let c = GenerationConfig::default();
        assert_eq!(c.max_edge, 1568);
        assert_eq!(c.max_output_tokens, 1024);
        assert_eq!(c.model, "claude-sonnet-4-5");
        assert_eq!(c.image_encoding, ImageEncoding::Png);
    }

    #[test]
    fn builder_rejects_zero_max_edge() {
        let err = GenerationConfig::builder().max_edge(0).build().unwrap_err();
        assert!(err.to_string().contains("max_edge"));
    }

    #[test]
    fn builder_rejects_empty_model() {
        assert!(GenerationConfig::builder().model("  ").build().is_err());
    }

    #[test]
    fn temperature_is_clamped() {
        let c = GenerationConfig::builder().temperature(9.0).build().unwrap();
        assert_eq!(c.temperature, 2.0);
    }

    #[test]
    fn encoding_mime_types() {
        assert_eq!(ImageEncoding::Png.mime_type(), "image/png");
        assert_eq!(ImageEncoding::Jpeg.mime_type(), "image/jpeg");
    }

    #[test]
    fn debug_lists_every_setting() {
        let c = GenerationConfig::builder()
            .download_timeout_secs(7)
            .progress_callback(std::sync::Arc::new(crate::progress::NoopProgressCallback))
            .build()
            .unwrap();
        let dbg = format!("{c:?}");
        assert!(dbg.contains("download_timeout_secs: 7"), "{dbg}");
        assert!(dbg.contains("progress_callback: true"), "{dbg}");
    }
}
