//! Parsing and schema validation of the extracted candidate.
//!
//! Model output is untrusted input, so this runs as two separate phases:
//!
//! 1. [`parse_document`]: syntax only. Any JSON document is accepted; a
//!    syntax error becomes [`BuildPlanError::MalformedData`] carrying
//!    serde_json's line and column.
//! 2. [`validate_plan`]: shape only. Walks the parsed [`Value`] in a fixed
//!    order (`schematic_name`, `blocks`, then each block's `block_type`, `x`,
//!    `y`, `z`, blocks in array order) and stops at the first problem with
//!    [`BuildPlanError::SchemaViolation`] naming the field path, e.g.
//!    `blocks[3].y`.
//!
//! Deserialising straight into [`BuildPlan`] with serde would merge both
//! phases and report only serde's message, without a stable field path.
//! Nothing is ever guessed or defaulted: a plan either validates exactly or
//! the run fails.
//!
//! Unknown extra keys (e.g. a `"facing"` hint on a block) are ignored.

use crate::error::{BuildPlanError, ViolationKind};
use crate::plan::{BlockPlacement, BuildPlan};
use serde_json::{Map, Value};

/// Parse `candidate` as a JSON document.
pub fn parse_document(candidate: &str) -> Result<Value, BuildPlanError> {
    serde_json::from_str(candidate).map_err(|e| BuildPlanError::MalformedData {
        message: e.to_string(),
        line: e.line(),
        column: e.column(),
    })
}

/// Check a parsed document against the build-plan schema.
pub fn validate_plan(doc: &Value) -> Result<BuildPlan, BuildPlanError> {
    let root = doc
        .as_object()
        .ok_or_else(|| wrong_type("$", "object", doc))?;

    let name = required_string(root, "schematic_name", "schematic_name")?;

    let blocks_value = root.get("blocks").ok_or_else(|| missing("blocks"))?;
    let entries = blocks_value
        .as_array()
        .ok_or_else(|| wrong_type("blocks", "array", blocks_value))?;

    let mut blocks = Vec::with_capacity(entries.len());
    for (i, entry) in entries.iter().enumerate() {
        blocks.push(validate_block(i, entry)?);
    }

    Ok(BuildPlan { name, blocks })
}

/// Both phases in sequence.
pub fn parse_and_validate(candidate: &str) -> Result<BuildPlan, BuildPlanError> {
    let doc = parse_document(candidate)?;
    validate_plan(&doc)
}

fn validate_block(index: usize, entry: &Value) -> Result<BlockPlacement, BuildPlanError> {
    let path = format!("blocks[{index}]");
    let obj = entry
        .as_object()
        .ok_or_else(|| wrong_type(&path, "object", entry))?;

    let block_type = required_string(obj, "block_type", &format!("{path}.block_type"))?;
    let x = required_integer(obj, "x", &path)?;
    let y = required_integer(obj, "y", &path)?;
    let z = required_integer(obj, "z", &path)?;

    Ok(BlockPlacement {
        block_type,
        x,
        y,
        z,
    })
}

fn required_string(
    obj: &Map<String, Value>,
    key: &str,
    path: &str,
) -> Result<String, BuildPlanError> {
    let value = obj.get(key).ok_or_else(|| missing(path))?;
    let s = value
        .as_str()
        .ok_or_else(|| wrong_type(path, "string", value))?;
    if s.is_empty() {
        return Err(BuildPlanError::SchemaViolation {
            field: path.to_string(),
            kind: ViolationKind::Empty,
        });
    }
    Ok(s.to_string())
}

fn required_integer(
    obj: &Map<String, Value>,
    key: &str,
    block_path: &str,
) -> Result<i64, BuildPlanError> {
    let path = format!("{block_path}.{key}");
    let value = obj.get(key).ok_or_else(|| missing(&path))?;
    value
        .as_i64()
        .ok_or_else(|| wrong_type(&path, "integer", value))
}

fn missing(path: &str) -> BuildPlanError {
    BuildPlanError::SchemaViolation {
        field: path.to_string(),
        kind: ViolationKind::Missing,
    }
}

fn wrong_type(path: &str, expected: &'static str, found: &Value) -> BuildPlanError {
    BuildPlanError::SchemaViolation {
        field: path.to_string(),
        kind: ViolationKind::WrongType {
            expected,
            found: json_type_name(found),
        },
    }
}

fn json_type_name(v: &Value) -> &'static str {
    match v {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(n) if n.is_i64() => "integer",
        Value::Number(n) if n.is_u64() => "integer out of range",
        // serde_json stores integer literals beyond i64/u64 as f64.
        Value::Number(n) if n.as_f64().is_some_and(is_out_of_range_integer) => {
            "integer out of range"
        }
        Value::Number(_) => "float",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

fn is_out_of_range_integer(f: f64) -> bool {
    const I64_SPAN: f64 = 9_223_372_036_854_775_808.0;
    f.is_finite() && f.fract() == 0.0 && f.abs() >= I64_SPAN
}

#[cfg(test)]
mod tests {
    use super::*;

    fn violation(input: &str) -> (String, ViolationKind) {
        match parse_and_validate(input) {
            Err(BuildPlanError::SchemaViolation { field, kind }) => (field, kind),
            other => panic!("expected schema violation, got {other:?}"),
        }
    }

    #[test]
    fn accepts_valid_plan() {
        let plan = parse_and_validate(
            r#"{"schematic_name":"hut","blocks":[
                {"block_type":"stone","x":0,"y":0,"z":0},
                {"block_type":"glass","x":-4,"y":12,"z":9000000000}
            ]}"#,
        )
        .unwrap();
        assert_eq!(plan.name, "hut");
        assert_eq!(plan.blocks[0], BlockPlacement::new("stone", 0, 0, 0));
        assert_eq!(plan.blocks[1], BlockPlacement::new("glass", -4, 12, 9_000_000_000));
    }

    #[test]
    fn accepts_empty_blocks() {
        let plan = parse_and_validate(r#"{"schematic_name":"void","blocks":[]}"#).unwrap();
        assert!(plan.is_empty());
    }

    #[test]
    fn ignores_unknown_keys() {
        let plan = parse_and_validate(
            r#"{"schematic_name":"a","notes":"hi","blocks":[{"block_type":"torch","x":1,"y":2,"z":3,"facing":"north"}]}"#,
        )
        .unwrap();
        assert_eq!(plan.blocks.len(), 1);
    }

    #[test]
    fn not_json_is_malformed() {
        let err = parse_and_validate("not json at all").unwrap_err();
        match err {
            BuildPlanError::MalformedData { line, column, .. } => {
                assert_eq!(line, 1);
                assert!(column >= 1);
            }
            other => panic!("expected malformed data, got {other:?}"),
        }
    }

    #[test]
    fn truncated_json_is_malformed() {
        let err = parse_and_validate(r#"{"schematic_name":"a","blocks":[{"block_type":"st"#)
            .unwrap_err();
        assert!(matches!(err, BuildPlanError::MalformedData { .. }));
    }

    #[test]
    fn missing_schematic_name() {
        assert_eq!(
            violation(r#"{"blocks":[]}"#),
            ("schematic_name".into(), ViolationKind::Missing)
        );
    }

    #[test]
    fn empty_schematic_name() {
        assert_eq!(
            violation(r#"{"schematic_name":"","blocks":[]}"#),
            ("schematic_name".into(), ViolationKind::Empty)
        );
    }

    #[test]
    fn whitespace_strings_are_not_empty() {
        let plan = parse_and_validate(
            r#"{"schematic_name":" ","blocks":[{"block_type":" ","x":0,"y":0,"z":0}]}"#,
        )
        .unwrap();
        assert_eq!(plan.name, " ");
        assert_eq!(plan.blocks[0].block_type, " ");
    }

    #[test]
    fn schematic_name_wrong_type() {
        assert_eq!(
            violation(r#"{"schematic_name":5,"blocks":[]}"#),
            (
                "schematic_name".into(),
                ViolationKind::WrongType {
                    expected: "string",
                    found: "integer"
                }
            )
        );
        assert_eq!(
            violation(r#"{"schematic_name":null,"blocks":[]}"#),
            (
                "schematic_name".into(),
                ViolationKind::WrongType {
                    expected: "string",
                    found: "null"
                }
            )
        );
    }

    #[test]
    fn block_type_wrong_type() {
        assert_eq!(
            violation(r#"{"schematic_name":"a","blocks":[{"block_type":7,"x":0,"y":0,"z":0}]}"#),
            (
                "blocks[0].block_type".into(),
                ViolationKind::WrongType {
                    expected: "string",
                    found: "integer"
                }
            )
        );
    }

    #[test]
    fn missing_blocks() {
        assert_eq!(
            violation(r#"{"schematic_name":"a"}"#),
            ("blocks".into(), ViolationKind::Missing)
        );
    }

    #[test]
    fn blocks_not_array() {
        assert_eq!(
            violation(r#"{"schematic_name":"a","blocks":{}}"#),
            (
                "blocks".into(),
                ViolationKind::WrongType {
                    expected: "array",
                    found: "object"
                }
            )
        );
    }

    #[test]
    fn root_not_object() {
        let (field, _) = violation("[1,2]");
        assert_eq!(field, "$");
    }

    #[test]
    fn each_block_field_is_required() {
        for missing_key in ["block_type", "x", "y", "z"] {
            let mut block = serde_json::json!({"block_type":"stone","x":0,"y":0,"z":0});
            block.as_object_mut().unwrap().remove(missing_key);
            let doc = serde_json::json!({"schematic_name":"a","blocks":[block]});
            let (field, kind) = violation(&doc.to_string());
            assert_eq!(field, format!("blocks[0].{missing_key}"));
            assert_eq!(kind, ViolationKind::Missing);
        }
    }

    #[test]
    fn float_coordinate_is_wrong_type() {
        assert_eq!(
            violation(r#"{"schematic_name":"a","blocks":[{"block_type":"stone","x":0,"y":1.5,"z":0}]}"#),
            (
                "blocks[0].y".into(),
                ViolationKind::WrongType {
                    expected: "integer",
                    found: "float"
                }
            )
        );
    }

    #[test]
    fn string_coordinate_is_wrong_type() {
        let (field, kind) = violation(
            r#"{"schematic_name":"a","blocks":[{"block_type":"stone","x":"0","y":0,"z":0}]}"#,
        );
        assert_eq!(field, "blocks[0].x");
        assert!(matches!(kind, ViolationKind::WrongType { found: "string", .. }));
    }

    #[test]
    fn reports_first_bad_block_in_order() {
        let (field, _) = violation(
            r#"{"schematic_name":"a","blocks":[
                {"block_type":"stone","x":0,"y":0,"z":0},
                {"block_type":"stone","x":0,"y":0},
                {"x":0,"y":0,"z":0}
            ]}"#,
        );
        assert_eq!(field, "blocks[1].z");
    }

    #[test]
    fn block_entry_must_be_object() {
        let (field, kind) = violation(r#"{"schematic_name":"a","blocks":["stone"]}"#);
        assert_eq!(field, "blocks[0]");
        assert!(matches!(kind, ViolationKind::WrongType { expected: "object", .. }));
    }

    #[test]
    fn empty_block_type_rejected() {
        let (field, kind) = violation(
            r#"{"schematic_name":"a","blocks":[{"block_type":"","x":0,"y":0,"z":0}]}"#,
        );
        assert_eq!(field, "blocks[0].block_type");
        assert_eq!(kind, ViolationKind::Empty);
    }

    #[test]
    fn huge_unsigned_coordinate_rejected() {
        let (field, kind) = violation(
            r#"{"schematic_name":"a","blocks":[{"block_type":"s","x":18446744073709551615,"y":0,"z":0}]}"#,
        );
        assert_eq!(field, "blocks[0].x");
        assert!(matches!(
            kind,
            ViolationKind::WrongType {
                found: "integer out of range",
                ..
            }
        ));
    }

    #[test]
    fn integer_below_i64_range_is_out_of_range() {
        let (field, kind) = violation(
            r#"{"schematic_name":"a","blocks":[{"block_type":"s","x":-9223372036854775809,"y":0,"z":0}]}"#,
        );
        assert_eq!(field, "blocks[0].x");
        assert_eq!(
            kind,
            ViolationKind::WrongType {
                expected: "integer",
                found: "integer out of range"
            }
        );
    }

    #[test]
    fn fractional_float_is_still_float() {
        assert_eq!(json_type_name(&serde_json::json!(2.5)), "float");
        assert_eq!(json_type_name(&serde_json::json!(1e300)), "integer out of range");
    }
}
