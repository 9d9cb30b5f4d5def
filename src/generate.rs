//! Pipeline orchestration: image in, validated build plan (or error) out.
//!
//! One call runs the stages strictly in order:
//!
//! ```text
//! normalize ──▶ request ──▶ backend ──▶ extract ──▶ validate
//! (resize)      (prompt)    (1 call)    (fences)    (parse + schema)
//! ```
//!
//! The first failing stage ends the run with a [`PipelineError`] tagged
//! with that stage. There is no shared state between calls and no automatic
//! retry, so running the same inputs against a deterministic backend always
//! produces the same plan. Callers who want retries call again; each call
//! re-normalises the image from scratch.

use crate::config::GenerationConfig;
use crate::error::{BuildPlanError, PipelineError, Stage};
use crate::output::{GenerationOutput, GenerationStats, ImageInspection};
use crate::pipeline::backend::{BackendResponse, GenerationBackend, LlmBackend};
use crate::pipeline::normalize::{self, NormalizedImage};
use crate::pipeline::{extract, input, request, validate};
use crate::plan::BuildPlan;
use crate::progress::ProgressCallback;
use std::future::Future;
use std::path::Path;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Generate a build plan from raw image bytes.
///
/// This is the primary entry point for the library. The backend is resolved
/// from `config` (see [`LlmBackend::from_config`]).
///
/// # Errors
/// Returns the first stage failure: `Decode` (normalize), provider or
/// transport failures (backend), `MalformedData` or `SchemaViolation`
/// (validate).
///
/// The provider is resolved before the image is decoded, so a missing API
/// key is reported as `ProviderNotConfigured` at [`Stage::Backend`] even
/// when the image is also unreadable. Use [`generate_with_backend`] to get
/// strict stage order.
pub async fn generate_build_plan(
    raw_image: &[u8],
    instruction: &str,
    config: &GenerationConfig,
) -> Result<BuildPlan, PipelineError> {
    Ok(generate(raw_image, instruction, config).await?.plan)
}

/// Like [`generate_build_plan`] but also returns stats and the raw response.
///
/// Provider resolution happens first, before normalisation.
pub async fn generate(
    raw_image: &[u8],
    instruction: &str,
    config: &GenerationConfig,
) -> Result<GenerationOutput, PipelineError> {
    let backend =
        LlmBackend::from_config(config).map_err(|e| PipelineError::new(Stage::Backend, e))?;
    generate_with_backend(&backend, raw_image, instruction, config).await
}

/// Run the pipeline against an explicit backend.
pub async fn generate_with_backend(
    backend: &dyn GenerationBackend,
    raw_image: &[u8],
    instruction: &str,
    config: &GenerationConfig,
) -> Result<GenerationOutput, PipelineError> {
    generate_with_cancel(
        backend,
        raw_image,
        instruction,
        config,
        std::future::pending::<()>(),
    )
    .await
}

/// Run the pipeline, aborting the backend call if `cancel` resolves first.
///
/// `cancel` can be any future: `tokio::signal::ctrl_c()` mapped to `()`,
/// a `oneshot::Receiver`, a `Notify::notified()`, … On cancellation the
/// result is [`BuildPlanError::Cancelled`] and no response is parsed.
pub async fn generate_with_cancel<C>(
    backend: &dyn GenerationBackend,
    raw_image: &[u8],
    instruction: &str,
    config: &GenerationConfig,
    cancel: C,
) -> Result<GenerationOutput, PipelineError>
where
    C: Future<Output = ()>,
{
    let total_start = Instant::now();
    let stages = StageReporter::new(config.progress_callback.as_ref());
    info!(
        "Starting generation: backend {}, model {}, max edge {}px",
        backend.name(),
        config.model,
        config.max_edge
    );

    // ── Step 1: Normalise image ──────────────────────────────────────────
    let t = stages.start(Stage::Normalize);
    let normalized = stages.finish(
        Stage::Normalize,
        t,
        normalize_off_thread(raw_image.to_vec(), config).await,
    )?;

    let mut stats = GenerationStats {
        original_width: normalized.original_width,
        original_height: normalized.original_height,
        submitted_width: normalized.width,
        submitted_height: normalized.height,
        submitted_bytes: normalized.bytes.len(),
        ..Default::default()
    };

    // ── Step 2: Build request ────────────────────────────────────────────
    let t = stages.start(Stage::Request);
    let req = request::build_request(&normalized, instruction, config);
    drop(normalized);
    stages.finish(Stage::Request, t, Ok(()))?;
    debug!(
        "Request: prompt version {:?}, {} max tokens, image {}x{} {}",
        req.prompt_version, req.max_output_tokens, req.image.width, req.image.height, req.image.mime_type
    );

    // ── Step 3: Invoke backend ───────────────────────────────────────────
    let t = stages.start(Stage::Backend);
    let call = invoke_with_timeout(backend, &req, config.api_timeout_secs);
    let outcome = tokio::select! {
        biased;
        _ = cancel => Err(BuildPlanError::Cancelled),
        r = call => r,
    };
    stats.backend_duration_ms = t.elapsed().as_millis() as u64;
    let response = stages.finish(Stage::Backend, t, outcome)?;
    stats.input_tokens = response.input_tokens;
    stats.output_tokens = response.output_tokens;
    let raw = response.text;

    debug!("Raw response from {} ({} chars):\n{}", backend.name(), raw.len(), raw);

    // ── Step 4: Extract candidate ────────────────────────────────────────
    let t = stages.start(Stage::Extract);
    let extraction = extract::extract_with_trace(&raw);
    stats.fences_stripped = extraction.applied.len();
    stages.finish(Stage::Extract, t, Ok(()))?;

    // ── Step 5: Parse and validate ───────────────────────────────────────
    let t = stages.start(Stage::Validate);
    let plan = stages
        .finish(
            Stage::Validate,
            t,
            validate::parse_and_validate(&extraction.candidate),
        )
        .map_err(|e| {
            warn!("Unusable response from {}:\n{}", backend.name(), raw);
            e.with_raw_response(&raw)
        })?;

    stats.total_duration_ms = total_start.elapsed().as_millis() as u64;
    info!(
        "Build plan '{}': {} blocks, {} tokens out, {}ms total",
        plan.name,
        plan.len(),
        stats.output_tokens,
        stats.total_duration_ms
    );

    Ok(GenerationOutput {
        plan,
        stats,
        raw_response: raw,
    })
}

/// Resolve a local path or URL, then run [`generate`].
pub async fn generate_from_source(
    source: impl AsRef<str>,
    instruction: &str,
    config: &GenerationConfig,
) -> Result<GenerationOutput, PipelineError> {
    let raw = resolve(source.as_ref(), config).await?;
    generate(&raw, instruction, config).await
}

/// Generate a plan and write it as pretty JSON to `output_path`.
///
/// Uses atomic write (temp file + rename) to prevent partial files.
pub async fn generate_to_file(
    source: impl AsRef<str>,
    output_path: impl AsRef<Path>,
    instruction: &str,
    config: &GenerationConfig,
) -> Result<GenerationOutput, PipelineError> {
    let output = generate_from_source(source, instruction, config).await?;
    write_plan(&output.plan, output_path.as_ref())
        .await
        .map_err(|e| PipelineError::new(Stage::Output, e))?;
    Ok(output)
}

/// Synchronous wrapper around [`generate_build_plan`].
///
/// Creates a temporary tokio runtime internally; do not call from inside
/// an async context.
pub fn generate_build_plan_sync(
    raw_image: &[u8],
    instruction: &str,
    config: &GenerationConfig,
) -> Result<BuildPlan, PipelineError> {
    tokio::runtime::Runtime::new()
        .map_err(|e| {
            PipelineError::new(
                Stage::Input,
                BuildPlanError::Internal(format!("Failed to create tokio runtime: {}", e)),
            )
        })?
        .block_on(generate_build_plan(raw_image, instruction, config))
}

/// Normalise an image without calling the backend.
///
/// Does not require an LLM provider or API key.
pub async fn inspect(
    source: impl AsRef<str>,
    config: &GenerationConfig,
) -> Result<ImageInspection, PipelineError> {
    let raw = resolve(source.as_ref(), config).await?;
    let img = normalize_off_thread(raw, config)
        .await
        .map_err(|e| PipelineError::new(Stage::Normalize, e))?;
    Ok(ImageInspection {
        original_width: img.original_width,
        original_height: img.original_height,
        normalized_width: img.width,
        normalized_height: img.height,
        encoded_bytes: img.bytes.len(),
    })
}

/// Write `plan` as pretty JSON, atomically.
pub async fn write_plan(plan: &BuildPlan, path: &Path) -> Result<(), BuildPlanError> {
    let write_err = |e: std::io::Error| BuildPlanError::OutputWriteFailed {
        path: path.to_path_buf(),
        source: e,
    };

    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            tokio::fs::create_dir_all(parent).await.map_err(write_err)?;
        }
    }

    let mut json = plan.to_json_pretty();
    json.push('\n');

    let tmp_path = path.with_extension("json.tmp");
    tokio::fs::write(&tmp_path, json).await.map_err(write_err)?;
    tokio::fs::rename(&tmp_path, path).await.map_err(write_err)?;
    Ok(())
}

// ── Internal helpers ─────────────────────────────────────────────────────

async fn resolve(source: &str, config: &GenerationConfig) -> Result<Vec<u8>, PipelineError> {
    input::resolve_input(source, config.download_timeout_secs)
        .await
        .map(|raw| raw.bytes)
        .map_err(|e| PipelineError::new(Stage::Input, e))
}

/// Decoding and Lanczos resampling are CPU-bound; keep them off the
/// async worker threads.
async fn normalize_off_thread(
    raw: Vec<u8>,
    config: &GenerationConfig,
) -> Result<NormalizedImage, BuildPlanError> {
    let max_edge = config.max_edge;
    let encoding = config.image_encoding;
    tokio::task::spawn_blocking(move || normalize::normalize(&raw, max_edge, encoding))
        .await
        .map_err(|e| BuildPlanError::Internal(format!("Normalize task panicked: {}", e)))?
}

async fn invoke_with_timeout(
    backend: &dyn GenerationBackend,
    req: &request::GenerationRequest,
    timeout_secs: u64,
) -> Result<BackendResponse, BuildPlanError> {
    if timeout_secs == 0 {
        return backend.invoke(req).await;
    }
    tokio::time::timeout(Duration::from_secs(timeout_secs), backend.invoke(req))
        .await
        .unwrap_or(Err(BuildPlanError::Timeout { secs: timeout_secs }))
}

/// Emits progress callbacks and stage-tags errors.
struct StageReporter<'a> {
    callback: Option<&'a ProgressCallback>,
}

impl<'a> StageReporter<'a> {
    fn new(callback: Option<&'a ProgressCallback>) -> Self {
        Self { callback }
    }

    fn start(&self, stage: Stage) -> Instant {
        if let Some(cb) = self.callback {
            cb.on_stage_start(stage);
        }
        Instant::now()
    }

    fn finish<T>(
        &self,
        stage: Stage,
        started: Instant,
        result: Result<T, BuildPlanError>,
    ) -> Result<T, PipelineError> {
        match result {
            Ok(v) => {
                if let Some(cb) = self.callback {
                    cb.on_stage_complete(stage, started.elapsed().as_millis() as u64);
                }
                Ok(v)
            }
            Err(e) => {
                warn!("{} stage failed: {}", stage, e);
                if let Some(cb) = self.callback {
                    cb.on_stage_error(stage, &e.to_string());
                }
                Err(PipelineError::new(stage, e))
            }
        }
    }
}
