//! Backend invocation: send a [`GenerationRequest`] and get text back.
//!
//! The pipeline only depends on the [`GenerationBackend`] trait, so the
//! orchestrator can be driven by a deterministic stub in tests and by
//! [`LlmBackend`] (any `edgequake-llm` vision provider) in production.
//!
//! ## What this module does not do
//!
//! - No retries. One request, at most one backend call; callers that want
//!   retries run the whole pipeline again.
//! - No timeout or cancellation; the orchestrator wraps [`GenerationBackend::invoke`]
//!   in both so every backend gets the same behaviour.
//! - No parsing. The response text is returned verbatim.

use crate::config::{GenerationConfig, DEFAULT_MODEL};
use crate::error::BuildPlanError;
use crate::pipeline::request::GenerationRequest;
use async_trait::async_trait;
use edgequake_llm::{ChatMessage, CompletionOptions, ImageData, LLMProvider, ProviderFactory};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Raw text from the backend plus token accounting.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct BackendResponse {
    /// Full text of the first response segment.
    pub text: String,
    pub input_tokens: u64,
    pub output_tokens: u64,
}

impl BackendResponse {
    pub fn from_text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ..Default::default()
        }
    }
}

/// A multimodal generation service.
#[async_trait]
pub trait GenerationBackend: Send + Sync {
    /// Short label used in logs and errors.
    fn name(&self) -> &str;

    /// Perform exactly one generation call.
    async fn invoke(&self, request: &GenerationRequest) -> Result<BackendResponse, BuildPlanError>;
}

/// [`GenerationBackend`] over an `edgequake-llm` provider.
pub struct LlmBackend {
    provider: Arc<dyn LLMProvider>,
    label: String,
}

impl LlmBackend {
    pub fn new(provider: Arc<dyn LLMProvider>, label: impl Into<String>) -> Self {
        Self {
            provider,
            label: label.into(),
        }
    }

    /// Resolve the provider described by `config`.
    ///
    /// Resolution order, most specific first:
    ///
    /// 1. **Pre-built provider** (`config.provider`), used as-is.
    /// 2. **Named provider** (`config.provider_name`) with `config.model`;
    ///    the factory reads the matching API key from the environment.
    /// 3. **Environment pair** `IMG2BUILD_PROVIDER` + `IMG2BUILD_MODEL`.
    /// 4. **First known API key** in [`KEYED_PROVIDERS`] order, with
    ///    `config.model`. When the model is still the Claude default and the
    ///    key belongs to another provider, that provider's default model is
    ///    used instead.
    /// 5. **Full auto-detection** via `ProviderFactory::from_env`. The
    ///    provider picks its own model here, so a warning is logged.
    pub fn from_config(config: &GenerationConfig) -> Result<Self, BuildPlanError> {
        if let Some(ref provider) = config.provider {
            return Ok(Self::new(Arc::clone(provider), "custom"));
        }

        if let Some(ref name) = config.provider_name {
            return create_vision_provider(name, &config.model);
        }

        if let (Ok(prov), Ok(model)) = (
            std::env::var("IMG2BUILD_PROVIDER"),
            std::env::var("IMG2BUILD_MODEL"),
        ) {
            if !prov.is_empty() && !model.is_empty() {
                return create_vision_provider(&prov, &model);
            }
        }

        if let Some((provider, model)) =
            keyed_provider(&config.model, |var| std::env::var(var).ok())
        {
            return create_vision_provider(provider, &model);
        }

        let (llm_provider, _embedding) =
            ProviderFactory::from_env().map_err(|e| BuildPlanError::ProviderNotConfigured {
                provider: "auto".to_string(),
                hint: format!(
                    "No LLM provider could be auto-detected from environment.\n\
                    Set ANTHROPIC_API_KEY, OPENAI_API_KEY, GEMINI_API_KEY, or configure a provider.\n\
                    Error: {}",
                    e
                ),
            })?;

        warn!(
            "Auto-detected provider uses its own default model; '{}' is not applied. \
            Set --provider to choose the model explicitly.",
            config.model
        );
        Ok(Self::new(llm_provider, "auto"))
    }
}

/// API key variable, provider name and that provider's default vision model.
pub static KEYED_PROVIDERS: [(&str, &str, &str); 3] = [
    ("ANTHROPIC_API_KEY", "anthropic", DEFAULT_MODEL),
    ("OPENAI_API_KEY", "openai", "gpt-4.1"),
    ("GEMINI_API_KEY", "gemini", "gemini-2.5-flash"),
];

/// Pick the first provider whose key `lookup` finds, and the model to run.
fn keyed_provider(
    model: &str,
    lookup: impl Fn(&str) -> Option<String>,
) -> Option<(&'static str, String)> {
    let (_, provider, default_model) = KEYED_PROVIDERS
        .iter()
        .find(|(var, _, _)| lookup(*var).is_some_and(|key| !key.is_empty()))?;

    let model = if model == DEFAULT_MODEL && *default_model != DEFAULT_MODEL {
        info!("No model chosen for {}; using {}", provider, default_model);
        default_model.to_string()
    } else {
        model.to_string()
    };
    Some((*provider, model))
}

#[async_trait]
impl GenerationBackend for LlmBackend {
    fn name(&self) -> &str {
        &self.label
    }

    async fn invoke(&self, request: &GenerationRequest) -> Result<BackendResponse, BuildPlanError> {
        let messages = build_messages(request);
        let options = build_options(request);

        let response = self
            .provider
            .chat(&messages, Some(&options))
            .await
            .map_err(|e| BuildPlanError::Backend {
                backend: self.label.clone(),
                message: format!("{}", e),
            })?;

        debug!(
            "{}: {} input tokens, {} output tokens",
            self.label, response.prompt_tokens, response.completion_tokens
        );

        Ok(BackendResponse {
            text: response.content,
            input_tokens: response.prompt_tokens as u64,
            output_tokens: response.completion_tokens as u64,
        })
    }
}

fn create_vision_provider(provider_name: &str, model: &str) -> Result<LlmBackend, BuildPlanError> {
    let provider = ProviderFactory::create_llm_provider(provider_name, model).map_err(|e| {
        BuildPlanError::ProviderNotConfigured {
            provider: provider_name.to_string(),
            hint: format!("{e}"),
        }
    })?;
    Ok(LlmBackend::new(provider, provider_name))
}

/// Message layout: the system instruction, then one user turn holding the
/// image followed by the instruction text.
fn build_messages(request: &GenerationRequest) -> Vec<ChatMessage> {
    let image = ImageData::new(request.image.data_base64.clone(), request.image.mime_type)
        .with_detail("high");
    vec![
        ChatMessage::system(request.system_prompt.as_str()),
        ChatMessage::user_with_images(request.instruction.as_str(), vec![image]),
    ]
}

fn build_options(request: &GenerationRequest) -> CompletionOptions {
    CompletionOptions {
        temperature: Some(request.temperature),
        max_tokens: Some(request.max_output_tokens),
        ..Default::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::request::ImageAttachment;

    fn request() -> GenerationRequest {
        GenerationRequest {
            system_prompt: "sys".into(),
            prompt_version: None,
            instruction: "build".into(),
            image: ImageAttachment {
                data_base64: "AQID".into(),
                mime_type: "image/png",
                width: 1,
                height: 1,
            },
            model: "m".into(),
            max_output_tokens: 1024,
            temperature: 0.0,
        }
    }

    #[test]
    fn build_options_from_request() {
        let opts = build_options(&request());
        assert_eq!(opts.temperature, Some(0.0));
        assert_eq!(opts.max_tokens, Some(1024));
    }

    #[test]
    fn one_system_and_one_user_message() {
        assert_eq!(build_messages(&request()).len(), 2);
    }

    #[test]
    fn response_from_text_has_zero_tokens() {
        let r = BackendResponse::from_text("{}");
        assert_eq!(r.text, "{}");
        assert_eq!((r.input_tokens, r.output_tokens), (0, 0));
    }

    fn env<'a>(vars: &'a [(&'a str, &'a str)]) -> impl Fn(&str) -> Option<String> + 'a {
        move |name| {
            vars.iter()
                .find(|(k, _)| *k == name)
                .map(|(_, v)| v.to_string())
        }
    }

    #[test]
    fn openai_key_honours_configured_model() {
        let picked = keyed_provider("gpt-4.1-mini", env(&[("OPENAI_API_KEY", "sk-x")]));
        assert_eq!(picked, Some(("openai", "gpt-4.1-mini".to_string())));
    }

    #[test]
    fn default_claude_model_is_swapped_for_other_providers() {
        let picked = keyed_provider(DEFAULT_MODEL, env(&[("GEMINI_API_KEY", "g")]));
        assert_eq!(picked, Some(("gemini", "gemini-2.5-flash".to_string())));
    }

    #[test]
    fn anthropic_key_wins_when_several_are_set() {
        let picked = keyed_provider(
            DEFAULT_MODEL,
            env(&[("OPENAI_API_KEY", "sk-x"), ("ANTHROPIC_API_KEY", "sk-ant")]),
        );
        assert_eq!(picked, Some(("anthropic", DEFAULT_MODEL.to_string())));
    }

    #[test]
    fn empty_or_absent_keys_fall_through() {
        assert_eq!(keyed_provider("m", env(&[("OPENAI_API_KEY", "")])), None);
        assert_eq!(keyed_provider("m", env(&[])), None);
    }
}
