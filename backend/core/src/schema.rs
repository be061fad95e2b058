//! Tool schema surface offered to the language model.
//!
//! The set is versioned implicitly by `ToolName::ALL`: adding a tool means
//! adding a variant there, a `ToolSpec` here, and a handler in the executor.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::tool::ToolName;

/// One tool definition: name, description, and JSON Schema for its input.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolSpec {
    pub name: String,
    pub description: String,
    pub input_schema: Value,
}

fn object_schema(properties: Value, required: &[&str]) -> Value {
    json!({
        "type": "object",
        "properties": properties,
        "required": required,
    })
}

fn style_properties() -> Value {
    json!({
        "fill": { "type": "string", "description": "Fill color (hex or CSS name). Defaults to the user's current color." },
        "stroke": { "type": "string" },
        "stroke_width": { "type": "number", "minimum": 0 },
        "opacity": { "type": "number", "minimum": 0, "maximum": 1 },
        "rotation": { "type": "number", "minimum": 0, "maximum": 360 }
    })
}

fn creation_properties(extra: Value) -> Value {
    let mut props = json!({
        "x": { "type": "number", "description": "Left edge. Defaults to the viewport centre." },
        "y": { "type": "number", "description": "Top edge. Defaults to the viewport centre." },
        "count": { "type": "integer", "minimum": 1, "description": "Number of identical objects to create." },
        "columns": { "type": "integer", "minimum": 1, "description": "Grid columns when count > 1." },
        "spacing": { "type": "number", "minimum": 0, "description": "Gap between copies when count > 1." }
    });
    merge(&mut props, style_properties());
    merge(&mut props, extra);
    props
}

fn target_properties(extra: Value) -> Value {
    let mut props = json!({
        "object_id": { "type": "integer", "description": "Target object. Omit to use the current selection." },
        "object_ids": { "type": "array", "items": { "type": "integer" } }
    });
    merge(&mut props, extra);
    props
}

fn arrangement_properties(extra: Value) -> Value {
    let mut props = json!({
        "object_ids": {
            "type": "array",
            "items": { "type": "integer" },
            "description": "Objects to arrange, in order. Omit to use the current selection."
        }
    });
    merge(&mut props, extra);
    props
}

fn merge(target: &mut Value, extra: Value) {
    if let (Value::Object(target), Value::Object(extra)) = (target, extra) {
        target.extend(extra);
    }
}

impl ToolSpec {
    pub fn for_tool(tool: ToolName) -> Self {
        let (description, input_schema) = match tool {
            ToolName::CreateRectangle => (
                "Create one or more rectangles.",
                object_schema(
                    creation_properties(json!({
                        "width": { "type": "number", "minimum": 1 },
                        "height": { "type": "number", "minimum": 1 }
                    })),
                    &[],
                ),
            ),
            ToolName::CreateCircle => (
                "Create one or more circles.",
                object_schema(
                    creation_properties(json!({
                        "radius": { "type": "number", "minimum": 1 }
                    })),
                    &[],
                ),
            ),
            ToolName::CreateText => (
                "Create one or more text labels.",
                object_schema(
                    creation_properties(json!({
                        "text": { "type": "string" },
                        "font_size": { "type": "number", "minimum": 1 },
                        "font_family": { "type": "string" }
                    })),
                    &["text"],
                ),
            ),
            ToolName::MoveObject => (
                "Move objects to an absolute position, or by an offset when use_delta is true.",
                object_schema(
                    target_properties(json!({
                        "x": { "type": "number" },
                        "y": { "type": "number" },
                        "use_delta": { "type": "boolean" }
                    })),
                    &[],
                ),
            ),
            ToolName::ResizeObject => (
                "Resize objects by explicit width/height or by a scale factor.",
                object_schema(
                    target_properties(json!({
                        "width": { "type": "number", "minimum": 1 },
                        "height": { "type": "number", "minimum": 1 },
                        "scale": { "type": "number", "exclusiveMinimum": 0 }
                    })),
                    &[],
                ),
            ),
            ToolName::RotateObject => (
                "Set the rotation of objects in degrees.",
                object_schema(
                    target_properties(json!({
                        "rotation": { "type": "number", "minimum": 0, "maximum": 360 }
                    })),
                    &["rotation"],
                ),
            ),
            ToolName::UpdateStyle => (
                "Change fill, stroke, stroke width or opacity of objects.",
                object_schema(target_properties(style_properties()), &[]),
            ),
            ToolName::UpdateText => (
                "Change the content or font size of text objects.",
                object_schema(
                    target_properties(json!({
                        "text": { "type": "string" },
                        "font_size": { "type": "number", "minimum": 1 }
                    })),
                    &[],
                ),
            ),
            ToolName::DeleteObject => (
                "Delete objects from the canvas.",
                object_schema(target_properties(json!({})), &[]),
            ),
            ToolName::SelectObjects => (
                "Find objects matching filters and return their ids.",
                object_schema(
                    json!({
                        "kind": { "type": "string", "enum": ["rectangle", "circle", "text"] },
                        "fill": { "type": "string" },
                        "text_contains": { "type": "string" },
                        "in_viewport": { "type": "boolean" }
                    }),
                    &[],
                ),
            ),
            ToolName::ToggleVisibility => (
                "Show or hide a single object.",
                object_schema(
                    json!({ "object_id": { "type": "integer" } }),
                    &["object_id"],
                ),
            ),
            ToolName::ArrangeGrid => (
                "Arrange objects in a grid. Give columns or rows, not both.",
                object_schema(
                    arrangement_properties(json!({
                        "columns": { "type": "integer", "minimum": 1 },
                        "rows": { "type": "integer", "minimum": 1 },
                        "spacing": { "type": "number", "minimum": 0 },
                        "cell_width": { "type": "number", "minimum": 1 },
                        "cell_height": { "type": "number", "minimum": 1 },
                        "origin_x": { "type": "number" },
                        "origin_y": { "type": "number" }
                    })),
                    &[],
                ),
            ),
            ToolName::ArrangeCircle => (
                "Distribute objects evenly around a circle.",
                object_schema(
                    arrangement_properties(json!({
                        "radius": { "type": "number", "minimum": 1 },
                        "center_x": { "type": "number" },
                        "center_y": { "type": "number" },
                        "start_angle": { "type": "number" }
                    })),
                    &[],
                ),
            ),
            ToolName::ArrangeStar => (
                "Arrange objects on the vertices of a star, alternating outer and inner radius.",
                object_schema(
                    arrangement_properties(json!({
                        "points": { "type": "integer", "minimum": 2 },
                        "outer_radius": { "type": "number", "minimum": 1 },
                        "inner_radius": { "type": "number", "minimum": 0 },
                        "center_x": { "type": "number" },
                        "center_y": { "type": "number" },
                        "start_angle": { "type": "number" }
                    })),
                    &[],
                ),
            ),
            ToolName::ArrangeAlongPath => (
                "Place objects along a line, arc, cubic bezier, or spiral.",
                object_schema(
                    arrangement_properties(json!({
                        "path_type": { "type": "string", "enum": ["line", "arc", "bezier", "spiral"] },
                        "start_x": { "type": "number" },
                        "start_y": { "type": "number" },
                        "end_x": { "type": "number" },
                        "end_y": { "type": "number" },
                        "control1_x": { "type": "number" },
                        "control1_y": { "type": "number" },
                        "control2_x": { "type": "number" },
                        "control2_y": { "type": "number" },
                        "center_x": { "type": "number" },
                        "center_y": { "type": "number" },
                        "radius": { "type": "number", "minimum": 0 },
                        "start_angle": { "type": "number" },
                        "end_angle": { "type": "number" },
                        "start_radius": { "type": "number", "minimum": 0 },
                        "end_radius": { "type": "number", "minimum": 0 },
                        "rotations": { "type": "number", "exclusiveMinimum": 0 }
                    })),
                    &["path_type"],
                ),
            ),
            ToolName::ArrangeRelative => (
                "Position objects relative to other objects.",
                object_schema(
                    json!({
                        "constraints": {
                            "type": "array",
                            "items": {
                                "type": "object",
                                "properties": {
                                    "object_id": { "type": "integer" },
                                    "relation": {
                                        "type": "string",
                                        "enum": [
                                            "above", "below", "left_of", "right_of",
                                            "aligned_horizontally_with", "aligned_vertically_with",
                                            "centered_between"
                                        ]
                                    },
                                    "reference_id": { "type": "integer" },
                                    "reference_ids": {
                                        "type": "array",
                                        "items": { "type": "integer" },
                                        "description": "Exactly two ids, for centered_between."
                                    }
                                },
                                "required": ["object_id", "relation"]
                            }
                        },
                        "spacing": { "type": "number", "minimum": 0 }
                    }),
                    &["constraints"],
                ),
            ),
        };

        Self {
            name: tool.as_str().to_string(),
            description: description.to_string(),
            input_schema,
        }
    }
}

/// Every tool definition, in `ToolName::ALL` order.
pub fn canvas_tools() -> Vec<ToolSpec> {
    ToolName::ALL.iter().map(|t| ToolSpec::for_tool(*t)).collect()
}
