//! The build-plan data contract shared with the block-placement consumer.
//!
//! On the wire a plan is a JSON object:
//!
//! ```json
//! {
//!   "schematic_name": "hut",
//!   "blocks": [
//!     {"block_type": "stone", "x": 0, "y": 0, "z": 0}
//!   ]
//! }
//! ```
//!
//! In Rust the top-level name field is [`BuildPlan::name`]; serde renames it
//! to `schematic_name` so serialising a plan reproduces the wire shape exactly.
//!
//! Values of these types are only constructed by
//! [`crate::pipeline::validate::validate_plan`] (or by callers directly), never
//! by deserialising untrusted text, so every `BuildPlan` in circulation has
//! already passed schema validation.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A named, ordered list of block placements.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildPlan {
    /// Non-empty identifier for the structure.
    #[serde(rename = "schematic_name")]
    pub name: String,

    /// Placements in the order the model emitted them.
    pub blocks: Vec<BlockPlacement>,
}

/// One block at an absolute integer coordinate.
///
/// `block_type` is only checked for non-emptiness here; the consumer owns
/// the registry of placeable types.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BlockPlacement {
    pub block_type: String,
    pub x: i64,
    pub y: i64,
    pub z: i64,
}

impl BlockPlacement {
    pub fn new(block_type: impl Into<String>, x: i64, y: i64, z: i64) -> Self {
        Self {
            block_type: block_type.into(),
            x,
            y,
            z,
        }
    }
}

/// Axis-aligned bounding box of a plan, inclusive on both corners.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bounds {
    pub min: (i64, i64, i64),
    pub max: (i64, i64, i64),
}

impl Bounds {
    /// Extent along each axis, in blocks.
    pub fn size(&self) -> (u64, u64, u64) {
        (
            self.max.0.abs_diff(self.min.0) + 1,
            self.max.1.abs_diff(self.min.1) + 1,
            self.max.2.abs_diff(self.min.2) + 1,
        )
    }
}

impl BuildPlan {
    pub fn new(name: impl Into<String>, blocks: Vec<BlockPlacement>) -> Self {
        Self {
            name: name.into(),
            blocks,
        }
    }

    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    /// Count placements per block type, sorted by type name.
    pub fn block_counts(&self) -> BTreeMap<&str, usize> {
        let mut counts = BTreeMap::new();
        for b in &self.blocks {
            *counts.entry(b.block_type.as_str()).or_insert(0) += 1;
        }
        counts
    }

    /// Bounding box of all placements, or `None` for an empty plan.
    pub fn bounds(&self) -> Option<Bounds> {
        let first = self.blocks.first()?;
        let init = Bounds {
            min: (first.x, first.y, first.z),
            max: (first.x, first.y, first.z),
        };
        Some(self.blocks.iter().skip(1).fold(init, |acc, b| Bounds {
            min: (acc.min.0.min(b.x), acc.min.1.min(b.y), acc.min.2.min(b.z)),
            max: (acc.max.0.max(b.x), acc.max.1.max(b.y), acc.max.2.max(b.z)),
        }))
    }

    /// Serialise to the pretty-printed wire format.
    pub fn to_json_pretty(&self) -> String {
        // Plain strings and integers cannot fail to serialise.
        serde_json::to_string_pretty(self).unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hut() -> BuildPlan {
        BuildPlan::new(
            "hut",
            vec![
                BlockPlacement::new("stone", 0, 0, 0),
                BlockPlacement::new("stone", 2, 0, -1),
                BlockPlacement::new("oak_planks", 1, 3, 1),
            ],
        )
    }

    #[test]
    fn serialises_with_wire_field_names() {
        let json = serde_json::to_value(hut()).unwrap();
        assert_eq!(json["schematic_name"], "hut");
        assert!(json.get("name").is_none());
        assert_eq!(json["blocks"][2]["block_type"], "oak_planks");
        assert_eq!(json["blocks"][1]["z"], -1);
    }

    #[test]
    fn block_counts_are_sorted_by_type() {
        let plan = hut();
        let counts: Vec<_> = plan.block_counts().into_iter().collect();
        assert_eq!(counts, vec![("oak_planks", 1), ("stone", 2)]);
    }

    #[test]
    fn bounds_cover_all_blocks() {
        let b = hut().bounds().unwrap();
        assert_eq!(b.min, (0, 0, -1));
        assert_eq!(b.max, (2, 3, 1));
        assert_eq!(b.size(), (3, 4, 3));
    }

    #[test]
    fn empty_plan_has_no_bounds() {
        let plan = BuildPlan::new("nothing", vec![]);
        assert!(plan.is_empty());
        assert!(plan.bounds().is_none());
        assert_eq!(plan.to_json_pretty(), "{\n  \"schematic_name\": \"nothing\",\n  \"blocks\": []\n}");
    }
}
