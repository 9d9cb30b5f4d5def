//! Generation request assembly.
//!
//! A [`GenerationRequest`] is the logical, transport-free description of one
//! backend call: the fixed system instruction, exactly one image, exactly
//! one instruction string, and the sampling limits. Turning it into a
//! provider-specific payload is the job of [`crate::pipeline::backend`].
//!
//! Building the request is pure: the same image, instruction and config
//! always yield an equal request.

use crate::config::GenerationConfig;
use crate::pipeline::normalize::NormalizedImage;
use crate::prompts::{self, DEFAULT_INSTRUCTION, PROMPT_VERSION};

/// The image part of a request, already base64-encoded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageAttachment {
    pub data_base64: String,
    pub mime_type: &'static str,
    pub width: u32,
    pub height: u32,
}

/// One single-image, single-turn generation request.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationRequest {
    pub system_prompt: String,
    /// Version of the built-in prompt, or `None` for a caller override.
    pub prompt_version: Option<&'static str>,
    pub instruction: String,
    pub image: ImageAttachment,
    pub model: String,
    pub max_output_tokens: usize,
    pub temperature: f32,
}

/// Assemble the request for `image` and `instruction`.
///
/// A blank instruction falls back to [`DEFAULT_INSTRUCTION`].
pub fn build_request(
    image: &NormalizedImage,
    instruction: &str,
    config: &GenerationConfig,
) -> GenerationRequest {
    let (system_prompt, prompt_version) = match config.system_prompt {
        Some(ref custom) => (custom.clone(), None),
        None => (prompts::system_prompt(), Some(PROMPT_VERSION)),
    };

    let instruction = match instruction.trim() {
        "" => DEFAULT_INSTRUCTION.to_string(),
        text => text.to_string(),
    };

    GenerationRequest {
        system_prompt,
        prompt_version,
        instruction,
        image: ImageAttachment {
            data_base64: image.to_base64(),
            mime_type: image.mime_type(),
            width: image.width,
            height: image.height,
        },
        model: config.model.clone(),
        max_output_tokens: config.max_output_tokens,
        temperature: config.temperature,
    }
}
