//! CLI binary for img2build.
//!
//! A thin shim over the library crate that maps CLI flags
//! to `GenerationConfig` and prints the resulting build plan.

use anyhow::{Context, Result};
use clap::Parser;
use img2build::{
    generate_with_cancel, inspect, pipeline::input, write_plan, GenerationConfig,
    GenerationProgressCallback, ImageEncoding, LlmBackend, ProgressCallback, Stage,
};
use indicatif::{ProgressBar, ProgressStyle};
use std::io::{self, Write};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn red(s: &str) -> String {
    format!("\x1b[31m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}

// ── CLI progress callback using indicatif ────────────────────────────────────

/// Spinner that names the running stage and prints a line per finished stage.
struct CliProgressCallback {
    bar: ProgressBar,
}

impl CliProgressCallback {
    fn new() -> Arc<Self> {
        let bar = ProgressBar::new_spinner();
        bar.set_style(
            ProgressStyle::with_template("{spinner:.cyan} {msg}  {elapsed:.dim}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner())
                .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"]),
        );
        bar.enable_steady_tick(Duration::from_millis(80));
        Arc::new(Self { bar })
    }
}

impl GenerationProgressCallback for CliProgressCallback {
    fn on_stage_start(&self, stage: Stage) {
        let msg = match stage {
            Stage::Backend => "waiting for model…".to_string(),
            other => format!("{other}…"),
        };
        self.bar.set_message(msg);
    }

    fn on_stage_complete(&self, stage: Stage, elapsed_ms: u64) {
        self.bar.println(format!(
            "  {} {:<10} {}",
            green("✓"),
            stage,
            dim(&format!("{:.1}s", elapsed_ms as f64 / 1000.0))
        ));
        if stage == Stage::Validate {
            self.bar.finish_and_clear();
        }
    }

    fn on_stage_error(&self, stage: Stage, error: &str) {
        // Truncate very long error messages to keep output tidy.
        let msg = match error.char_indices().nth(79) {
            Some((i, _)) => format!("{}\u{2026}", &error[..i]),
            None => error.to_string(),
        };
        self.bar
            .println(format!("  {} {:<10} {}", red("✗"), stage, red(&msg)));
        self.bar.finish_and_clear();
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Basic generation (plan JSON on stdout)
  img2build castle.png

  # Write the plan to a file
  img2build castle.png -o castle.json

  # Steer the model
  img2build --instruction "Only the gatehouse, max 200 blocks" castle.png

  # Use a specific provider / model
  img2build --provider openai --model gpt-4.1 castle.png

  # From a URL
  img2build https://example.org/hut.jpg -o hut.json

  # See how the image will be resized (no API key needed)
  img2build --inspect-only castle.png

ENVIRONMENT VARIABLES:
  ANTHROPIC_API_KEY       Anthropic API key (default provider)
  OPENAI_API_KEY          OpenAI API key
  GEMINI_API_KEY          Google Gemini API key
  IMG2BUILD_PROVIDER      Override provider (anthropic, openai, gemini, ollama)
  IMG2BUILD_MODEL         Override model ID
  TOKENS                  Max output tokens (same as --max-tokens)
  RUST_LOG                Fine-grained log filter (e.g. img2build=debug)
"#;

/// Turn an image into a block build plan using Vision LLMs.
#[derive(Parser, Debug)]
#[command(
    name = "img2build",
    version,
    about = "Turn an image into a block build plan using Vision LLMs",
    long_about = "Send an image to a Vision Language Model and turn its answer into a validated \
build plan: a named list of block types at integer x/y/z coordinates, ready for a block-placing \
agent. Supports Anthropic, OpenAI, Google Gemini and any OpenAI-compatible endpoint.",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// Local image path or HTTP/HTTPS URL.
    input: String,

    /// Instruction sent with the image.
    #[arg(short, long, env = "IMG2BUILD_INSTRUCTION", default_value = "")]
    instruction: String,

    /// Write the plan JSON to this file instead of stdout.
    #[arg(short, long, env = "IMG2BUILD_OUTPUT")]
    output: Option<PathBuf>,

    /// LLM model ID.
    #[arg(long, env = "IMG2BUILD_MODEL", default_value = img2build::config::DEFAULT_MODEL)]
    model: String,

    /// LLM provider: anthropic, openai, gemini, ollama, azure.
    #[arg(long, env = "IMG2BUILD_PROVIDER")]
    provider: Option<String>,

    /// Longest image edge in pixels before upload.
    #[arg(long, env = "IMG2BUILD_MAX_EDGE", default_value_t = img2build::config::DEFAULT_MAX_EDGE,
          value_parser = clap::value_parser!(u32).range(1..))]
    max_edge: u32,

    /// Max LLM output tokens.
    #[arg(long, env = "TOKENS", default_value_t = 1024)]
    max_tokens: usize,

    /// LLM temperature (0.0–2.0).
    #[arg(long, env = "IMG2BUILD_TEMPERATURE", default_value_t = 0.0)]
    temperature: f32,

    /// LLM call timeout in seconds (0 = none).
    #[arg(long, env = "IMG2BUILD_API_TIMEOUT", default_value_t = 120)]
    api_timeout: u64,

    /// HTTP download timeout in seconds (0 = none).
    #[arg(long, env = "IMG2BUILD_DOWNLOAD_TIMEOUT", default_value_t = 60)]
    download_timeout: u64,

    /// Encoding of the uploaded image.
    #[arg(long, env = "IMG2BUILD_FORMAT", value_enum, default_value = "png")]
    format: FormatArg,

    /// Path to a text file containing a custom system prompt.
    #[arg(long, env = "IMG2BUILD_SYSTEM_PROMPT")]
    system_prompt: Option<PathBuf>,

    /// Print block counts and bounds after generating.
    #[arg(long)]
    summary: bool,

    /// Print image dimensions before/after normalisation only; no LLM call.
    #[arg(long)]
    inspect_only: bool,

    /// Disable the spinner.
    #[arg(long, env = "IMG2BUILD_NO_PROGRESS")]
    no_progress: bool,

    /// Enable DEBUG-level tracing logs (includes the raw model response).
    #[arg(short, long, env = "IMG2BUILD_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, env = "IMG2BUILD_QUIET")]
    quiet: bool,
}

#[derive(clap::ValueEnum, Clone, Debug)]
enum FormatArg {
    Png,
    Jpeg,
}

impl From<FormatArg> for ImageEncoding {
    fn from(v: FormatArg) -> Self {
        match v {
            FormatArg::Png => ImageEncoding::Png,
            FormatArg::Jpeg => ImageEncoding::Jpeg,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // The spinner already reports stage progress, so INFO logs would only
    // interleave with it.
    let show_progress = !cli.quiet && !cli.no_progress && !cli.verbose;
    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet || show_progress {
        "error"
    } else {
        "info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    let progress_cb: Option<ProgressCallback> = if show_progress {
        Some(CliProgressCallback::new() as Arc<dyn GenerationProgressCallback>)
    } else {
        None
    };

    let config = build_config(&cli, progress_cb).await?;

    // ── Inspect-only mode ────────────────────────────────────────────────
    if cli.inspect_only {
        let info = inspect(&cli.input, &config)
            .await
            .context("Failed to inspect image")?;
        println!("File:        {}", cli.input);
        println!(
            "Original:    {}x{}",
            info.original_width, info.original_height
        );
        println!(
            "Normalised:  {}x{}  (max edge {})",
            info.normalized_width, info.normalized_height, config.max_edge
        );
        println!("Encoded:     {} bytes {}", info.encoded_bytes, config.image_encoding);
        return Ok(());
    }

    // ── Run generation ───────────────────────────────────────────────────
    let raw = input::resolve_input(&cli.input, config.download_timeout_secs)
        .await
        .context("Failed to read input image")?;
    let backend = LlmBackend::from_config(&config).context("No usable LLM provider")?;

    let cancel = async {
        // If the signal handler cannot be installed, never cancel.
        if tokio::signal::ctrl_c().await.is_err() {
            std::future::pending::<()>().await;
        }
    };

    let output = match generate_with_cancel(&backend, &raw.bytes, &cli.instruction, &config, cancel)
        .await
    {
        Ok(output) => output,
        Err(e) => {
            if let Some(ref raw_response) = e.raw_response {
                eprintln!("{}\n{}", dim("Raw model response:"), raw_response);
            }
            return Err(e).context("Generation failed");
        }
    };

    if let Some(ref output_path) = cli.output {
        write_plan(&output.plan, output_path)
            .await
            .context("Failed to write plan")?;
    } else {
        let stdout = io::stdout();
        let mut handle = stdout.lock();
        writeln!(handle, "{}", output.plan.to_json_pretty()).context("Failed to write to stdout")?;
    }

    if cli.summary && !cli.quiet {
        eprintln!("{}", bold(&format!("{}  ({} blocks)", output.plan.name, output.plan.len())));
        for (block_type, count) in output.plan.block_counts() {
            eprintln!("  {:>6}  {}", count, block_type);
        }
        if let Some(b) = output.plan.bounds() {
            let (sx, sy, sz) = b.size();
            eprintln!("  {} {}x{}x{}", dim("size"), sx, sy, sz);
        }
    }

    if !cli.quiet {
        let target = cli
            .output
            .as_ref()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| "stdout".to_string());
        eprintln!(
            "{}  '{}'  {} blocks  {}ms  →  {}",
            green("✔"),
            output.plan.name,
            output.plan.len(),
            output.stats.total_duration_ms,
            bold(&target),
        );
        eprintln!(
            "   {} tokens in  /  {} tokens out",
            dim(&output.stats.input_tokens.to_string()),
            dim(&output.stats.output_tokens.to_string()),
        );
    }

    Ok(())
}

/// Map CLI args to `GenerationConfig`.
async fn build_config(cli: &Cli, progress: Option<ProgressCallback>) -> Result<GenerationConfig> {
    let mut builder = GenerationConfig::builder()
        .max_edge(cli.max_edge)
        .max_output_tokens(cli.max_tokens)
        .model(cli.model.clone())
        .temperature(cli.temperature)
        .api_timeout_secs(cli.api_timeout)
        .download_timeout_secs(cli.download_timeout)
        .image_encoding(cli.format.clone().into());

    if let Some(ref name) = cli.provider {
        builder = builder.provider_name(name.clone());
    }

    if let Some(ref path) = cli.system_prompt {
        let prompt = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read system prompt from {:?}", path))?;
        builder = builder.system_prompt(prompt);
    }

    if let Some(cb) = progress {
        builder = builder.progress_callback(cb);
    }

    builder.build().context("Invalid configuration")
}
