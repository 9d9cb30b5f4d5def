//! # img2build
//!
//! Turn an image into a validated block build plan using Vision Language
//! Models (VLMs).
//!
//! ## Why this crate?
//!
//! A vision model can look at a photo of a castle and describe it as a list
//! of blocks, but its answer is free text: sometimes wrapped in Markdown
//! fences, sometimes truncated, sometimes missing a coordinate. A block
//! placing agent needs strict guarantees. This crate sits in between and
//! either hands over a fully valid [`BuildPlan`] or a typed error saying
//! which stage failed and why.
//!
//! ## Pipeline Overview
//!
//! ```text
//! image bytes
//!  │
//!  ├─ 1. Normalize  decode, cap longest edge (Lanczos3), re-encode
//!  ├─ 2. Request    versioned system prompt + image + instruction
//!  ├─ 3. Backend    one call to claude / gpt / gemini / … (timeout, cancel)
//!  ├─ 4. Extract    strip ```json fences by ordered rules
//!  └─ 5. Validate   parse JSON, then check schema field by field
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use img2build::{generate_build_plan, GenerationConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // Provider auto-detected from ANTHROPIC_API_KEY / OPENAI_API_KEY / …
//!     let config = GenerationConfig::default();
//!     let image = std::fs::read("castle.png")?;
//!     let plan = generate_build_plan(&image, "", &config).await?;
//!     println!("{}: {} blocks", plan.name, plan.blocks.len());
//!     Ok(())
//! }
//! ```
//!
//! ## Wire format
//!
//! ```json
//! {"schematic_name": "hut", "blocks": [{"block_type": "stone", "x": 0, "y": 0, "z": 0}]}
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `img2build` binary (clap + anyhow + tracing-subscriber) |

// ── Modules ──────────────────────────────────────────────────────────────

pub mod config;
pub mod error;
pub mod generate;
pub mod output;
pub mod pipeline;
pub mod plan;
pub mod progress;
pub mod prompts;
pub mod session;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{GenerationConfig, GenerationConfigBuilder, ImageEncoding};
pub use error::{BuildPlanError, PipelineError, Stage, ViolationKind};
pub use generate::{
    generate, generate_build_plan, generate_build_plan_sync, generate_from_source,
    generate_to_file, generate_with_backend, generate_with_cancel, inspect, write_plan,
};
pub use output::{GenerationOutput, GenerationStats, ImageInspection};
pub use pipeline::backend::{BackendResponse, GenerationBackend, LlmBackend};
pub use pipeline::extract::{extract_candidate, FenceRule};
pub use pipeline::normalize::{normalize, NormalizedImage};
pub use pipeline::request::{build_request, GenerationRequest};
pub use pipeline::validate::parse_and_validate;
pub use plan::{BlockPlacement, BuildPlan};
pub use progress::{GenerationProgressCallback, NoopProgressCallback, ProgressCallback};
pub use session::{SessionPolicy, SessionRegistry, StartResponse, StartStatus};
