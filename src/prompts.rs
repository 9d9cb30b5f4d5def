//! System instruction for image-to-build-plan generation.
//!
//! Keeping the instruction here, rather than next to the transport code,
//! means the schema the model is told about and the schema the validator
//! enforces can be checked against each other in one place (see the tests
//! at the bottom of this file).
//!
//! Callers can override the instruction via
//! [`crate::config::GenerationConfig::system_prompt`]; the constants here are
//! used only when no override is provided.

/// Bumped whenever [`system_prompt`] changes in a way that could
/// alter model output. Logged with every request.
pub const PROMPT_VERSION: &str = "2";

/// Instruction text sent alongside the image when the caller gives none.
pub const DEFAULT_INSTRUCTION: &str =
    "Analyze this image and produce a Minecraft build plan in JSON.";

/// The worked example embedded in the system prompt.
///
/// Must itself be a valid build plan.
pub const WORKED_EXAMPLE: &str = r#"{
    "schematic_name": "small_house",
    "blocks": [
        {"block_type": "stone", "x": 0, "y": 0, "z": 0},
        {"block_type": "stone", "x": 1, "y": 0, "z": 0},
        {"block_type": "stone", "x": 2, "y": 0, "z": 0},
        {"block_type": "stone", "x": 0, "y": 0, "z": 1},
        {"block_type": "stone", "x": 2, "y": 0, "z": 1},
        {"block_type": "stone", "x": 0, "y": 0, "z": 2},
        {"block_type": "stone", "x": 1, "y": 0, "z": 2},
        {"block_type": "stone", "x": 2, "y": 0, "z": 2},
        {"block_type": "oak_planks", "x": 1, "y": 1, "z": 1},
        {"block_type": "oak_planks", "x": 1, "y": 2, "z": 1},
        {"block_type": "stone", "x": 0, "y": 1, "z": 0},
        {"block_type": "stone", "x": 2, "y": 1, "z": 0},
        {"block_type": "stone", "x": 0, "y": 1, "z": 2},
        {"block_type": "stone", "x": 2, "y": 1, "z": 2},
        {"block_type": "stone", "x": 0, "y": 2, "z": 0},
        {"block_type": "stone", "x": 2, "y": 2, "z": 0},
        {"block_type": "stone", "x": 0, "y": 2, "z": 2},
        {"block_type": "stone", "x": 2, "y": 2, "z": 2}
    ]
}"#;

const TASK: &str = "You are a bot designed to generate highly detailed JSON output for building \
intricate structures in Minecraft from a source image, following the provided schema and examples.";

const SCHEMA: &str = r#"**JSON Output Requirements:**
Return raw JSON with this schema:

{
    "schematic_name": string,
    "blocks": [
        {"block_type": string, "x": integer, "y": integer, "z": integer},
        ...
    ]
}"#;

const CONSTRAINTS: &str = r#"**Instructions:**
    - Use only valid Minecraft block IDs (e.g., "stone_bricks", "oak_planks").
    - Determine facing directions for orientable blocks based on the bot's fixed position.
    - Every block entry must have all four fields; coordinates are integers.
    - Only return RAW JSON, no comments or markdown."#;

/// Default system prompt for turning an image into a build plan.
///
/// Assembled from four parts: the task, the output schema, the worked
/// example and the hard constraints.
pub fn system_prompt() -> String {
    format!(
        "{TASK}\n\n{SCHEMA}\n\n**Refer to this detailed schematic to generate a highly intricate build:**\n\nExample:\n{WORKED_EXAMPLE}\n\n{CONSTRAINTS}"
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::validate::parse_and_validate;

    #[test]
    fn worked_example_is_a_valid_plan() {
        let plan = parse_and_validate(WORKED_EXAMPLE).expect("example must validate");
        assert_eq!(plan.name, "small_house");
        assert_eq!(plan.blocks.len(), 18);
    }

    #[test]
    fn prompt_mentions_every_schema_field() {
        let prompt = system_prompt();
        for field in ["schematic_name", "blocks", "block_type", "\"x\"", "\"y\"", "\"z\""] {
            assert!(prompt.contains(field), "prompt is missing {field}");
        }
    }

    #[test]
    fn prompt_forbids_markdown() {
        assert!(system_prompt().contains("no comments or markdown"));
    }

    #[test]
    fn prompt_is_stable() {
        assert_eq!(system_prompt(), system_prompt());
    }
}
