//! Result types returned by the generation entry points.

use crate::plan::BuildPlan;
use serde::{Deserialize, Serialize};

/// A validated plan together with run statistics and the raw model text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerationOutput {
    pub plan: BuildPlan,
    pub stats: GenerationStats,
    /// Backend text before fence stripping, kept for offline debugging.
    pub raw_response: String,
}

/// Per-run statistics.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerationStats {
    pub original_width: u32,
    pub original_height: u32,
    pub submitted_width: u32,
    pub submitted_height: u32,
    pub submitted_bytes: usize,
    pub input_tokens: u64,
    pub output_tokens: u64,
    /// Number of fence markers stripped from the response (0–2).
    pub fences_stripped: usize,
    pub backend_duration_ms: u64,
    pub total_duration_ms: u64,
}

/// Result of normalising an image without calling the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageInspection {
    pub original_width: u32,
    pub original_height: u32,
    pub normalized_width: u32,
    pub normalized_height: u32,
    pub encoded_bytes: usize,
}
