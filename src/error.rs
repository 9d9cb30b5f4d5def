//! Error types for the img2build library.
//!
//! Two layers reflect two questions a caller asks about a failure:
//!
//! * [`BuildPlanError`]: **what** went wrong (unreadable image, transport
//!   failure, malformed response, schema violation, …). Every pipeline stage
//!   returns this type.
//!
//! * [`PipelineError`]: **where** it went wrong. The orchestrator wraps the
//!   first stage failure with its [`Stage`] and, for response-parsing
//!   failures, the raw backend text so the caller can log or display it.
//!
//! No stage recovers silently: the first error aborts the run and no
//! partially-populated [`crate::plan::BuildPlan`] is ever returned.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// All errors produced by the build-plan pipeline stages.
#[derive(Debug, Error)]
pub enum BuildPlanError {
    // ── Input errors ──────────────────────────────────────────────────────
    /// Image file was not found at the given path.
    #[error("Image file not found: '{path}'\nCheck the path exists and is readable.")]
    InputNotFound { path: PathBuf },

    /// Process does not have read permission on the file.
    #[error("Permission denied reading '{path}'\nTry: chmod +r {path:?}")]
    PermissionDenied { path: PathBuf },

    /// The path exists but could not be read as a file (a directory, an I/O
    /// fault, …).
    #[error("Failed to read image '{path}': {reason}")]
    InputReadFailed { path: PathBuf, reason: String },

    /// HTTP URL was syntactically valid but download failed.
    #[error("Failed to download '{url}': {reason}\nCheck your internet connection.")]
    DownloadFailed { url: String, reason: String },

    // ── Image errors ──────────────────────────────────────────────────────
    /// The input bytes could not be decoded as an image.
    #[error("Input is not a decodable image: {detail}")]
    Decode { detail: String },

    /// The normalised image could not be re-encoded for submission.
    #[error("Failed to encode normalised image as {format}: {detail}")]
    Encode { format: String, detail: String },

    // ── Backend errors ────────────────────────────────────────────────────
    /// The configured provider is not initialised (missing API key etc.).
    #[error("LLM provider '{provider}' is not configured.\n{hint}")]
    ProviderNotConfigured { provider: String, hint: String },

    /// Network, transport or authentication failure from the generation call.
    #[error("Backend '{backend}' failed: {message}")]
    Backend { backend: String, message: String },

    /// The generation call did not answer within the configured timeout.
    #[error("Backend call timed out after {secs}s\nIncrease --api-timeout.")]
    Timeout { secs: u64 },

    /// The caller aborted the pending generation call.
    #[error("Generation was cancelled before the backend responded")]
    Cancelled,

    // ── Response errors ───────────────────────────────────────────────────
    /// The extracted candidate is not parseable JSON.
    #[error("Response is not valid JSON (line {line}, column {column}): {message}")]
    MalformedData {
        message: String,
        line: usize,
        column: usize,
    },

    /// The JSON parsed but does not match the build-plan schema.
    #[error("Build plan violates schema at '{field}': {kind}")]
    SchemaViolation { field: String, kind: ViolationKind },

    // ── I/O errors ────────────────────────────────────────────────────────
    /// Could not create or write the output plan file.
    #[error("Failed to write output file '{path}': {source}")]
    OutputWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl BuildPlanError {
    /// True for failures caused by the content of the backend response.
    ///
    /// These are the errors for which the raw response is worth keeping.
    pub fn is_response_error(&self) -> bool {
        matches!(
            self,
            BuildPlanError::MalformedData { .. } | BuildPlanError::SchemaViolation { .. }
        )
    }

    /// The offending field path, for schema violations.
    pub fn field(&self) -> Option<&str> {
        match self {
            BuildPlanError::SchemaViolation { field, .. } => Some(field),
            _ => None,
        }
    }
}

/// Why a field failed schema validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ViolationKind {
    /// Required field is absent.
    Missing,
    /// Field is present with the wrong JSON type.
    WrongType {
        expected: &'static str,
        found: &'static str,
    },
    /// String field is present but empty.
    Empty,
}

impl fmt::Display for ViolationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ViolationKind::Missing => write!(f, "required field is missing"),
            ViolationKind::WrongType { expected, found } => {
                write!(f, "expected {expected}, found {found}")
            }
            ViolationKind::Empty => write!(f, "must not be empty"),
        }
    }
}

/// Pipeline stage names used to tag errors and progress events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Input,
    Normalize,
    Request,
    Backend,
    Extract,
    Validate,
    Output,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Input => "input",
            Stage::Normalize => "normalize",
            Stage::Request => "request",
            Stage::Backend => "backend",
            Stage::Extract => "extract",
            Stage::Validate => "validate",
            Stage::Output => "output",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The first failure of a pipeline run, tagged with its stage.
#[derive(Debug, Error)]
#[error("{stage} stage failed: {source}")]
pub struct PipelineError {
    pub stage: Stage,
    #[source]
    pub source: BuildPlanError,
    /// Raw backend text, kept for `MalformedData` and `SchemaViolation`.
    pub raw_response: Option<String>,
}

impl PipelineError {
    pub fn new(stage: Stage, source: BuildPlanError) -> Self {
        Self {
            stage,
            source,
            raw_response: None,
        }
    }

    /// Attach the raw response, but only for response-content failures.
    pub fn with_raw_response(mut self, raw: &str) -> Self {
        if self.source.is_response_error() {
            self.raw_response = Some(raw.to_string());
        }
        self
    }

    /// Borrow the underlying stage error.
    pub fn kind(&self) -> &BuildPlanError {
        &self.source
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self.source, BuildPlanError::Cancelled)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn schema_violation_display_names_field() {
        let e = BuildPlanError::SchemaViolation {
            field: "blocks[2].x".into(),
            kind: ViolationKind::WrongType {
                expected: "integer",
                found: "string",
            },
        };
        let msg = e.to_string();
        assert!(msg.contains("blocks[2].x"), "got: {msg}");
        assert!(msg.contains("expected integer, found string"), "got: {msg}");
    }

    #[test]
    fn malformed_data_display_has_position() {
        let e = BuildPlanError::MalformedData {
            message: "expected value".into(),
            line: 1,
            column: 2,
        };
        assert!(e.to_string().contains("line 1, column 2"));
    }

    #[test]
    fn pipeline_error_tags_stage() {
        let e = PipelineError::new(Stage::Normalize, BuildPlanError::Decode { detail: "bad".into() });
        assert_eq!(e.to_string(), "normalize stage failed: Input is not a decodable image: bad");
    }

    #[test]
    fn raw_response_kept_only_for_response_errors() {
        let kept = PipelineError::new(
            Stage::Validate,
            BuildPlanError::MalformedData {
                message: "x".into(),
                line: 1,
                column: 1,
            },
        )
        .with_raw_response("not json");
        assert_eq!(kept.raw_response.as_deref(), Some("not json"));

        let dropped = PipelineError::new(Stage::Backend, BuildPlanError::Cancelled)
            .with_raw_response("ignored");
        assert!(dropped.raw_response.is_none());
        assert!(dropped.is_cancelled());
    }

    #[test]
    fn timeout_display() {
        let e = BuildPlanError::Timeout { secs: 30 };
        assert!(e.to_string().contains("30s"));
    }
}
