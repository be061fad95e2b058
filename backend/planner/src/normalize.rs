//! Cross-provider tool-call normalization.
//!
//! Providers disagree on argument encoding (objects vs JSON strings), on
//! whether ids are numbers or strings, and on whether a call id is present
//! at all. Everything downstream sees one canonical shape.

use serde_json::{Map, Number, Value};
use thiserror::Error;
use tracing::{debug, warn};

use canvaspilot_core::{AdapterError, NormalizedToolCall, RawToolCall, ToolName};

/// Structurally invalid tool-call input. Indicates an adapter bug.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum NormalizeError {
    #[error("tool call {index} ({name}): arguments are not valid JSON: {reason}")]
    InvalidJson {
        index: usize,
        name: String,
        reason: String,
    },

    #[error("tool call {index} ({name}): arguments must be an object, got {found}")]
    NotAnObject {
        index: usize,
        name: String,
        found: &'static str,
    },
}

impl From<NormalizeError> for AdapterError {
    fn from(err: NormalizeError) -> Self {
        AdapterError::MalformedResponse(err.to_string())
    }
}

const ID_FIELDS: &[&str] = &["object_id", "reference_id"];
const ID_LIST_FIELDS: &[&str] = &["object_ids", "reference_ids"];
const INTEGER_FIELDS: &[&str] = &["count", "columns", "rows", "points"];
const BOOL_FIELDS: &[&str] = &["use_delta", "in_viewport"];
const ENUM_FIELDS: &[&str] = &["path_type", "relation", "kind"];
const NUMBER_FIELDS: &[&str] = &[
    "x",
    "y",
    "width",
    "height",
    "radius",
    "scale",
    "rotation",
    "opacity",
    "stroke_width",
    "font_size",
    "spacing",
    "cell_width",
    "cell_height",
    "origin_x",
    "origin_y",
    "center_x",
    "center_y",
    "start_angle",
    "end_angle",
    "outer_radius",
    "inner_radius",
    "start_x",
    "start_y",
    "end_x",
    "end_y",
    "control1_x",
    "control1_y",
    "control2_x",
    "control2_y",
    "start_radius",
    "end_radius",
    "rotations",
];

/// Canonicalize raw provider tool calls.
///
/// Unknown tool names are dropped with a warning. Only arguments that are
/// not a JSON object (or a string holding one) are an error.
pub fn normalize(raw: &[RawToolCall]) -> Result<Vec<NormalizedToolCall>, NormalizeError> {
    let mut calls = Vec::with_capacity(raw.len());

    for (index, call) in raw.iter().enumerate() {
        let Some(name) = ToolName::from_name(&call.name) else {
            warn!(tool = %call.name, index, "Dropping call to unknown tool");
            continue;
        };

        let mut input = parse_input(index, call)?;
        coerce_fields(&mut input);
        apply_defaults(name, &mut input);

        let call_id = call
            .call_id
            .clone()
            .filter(|id| !id.trim().is_empty())
            .unwrap_or_else(|| format!("call_{index}"));

        calls.push(NormalizedToolCall {
            call_id,
            name,
            input,
        });
    }

    debug!(received = raw.len(), kept = calls.len(), "Normalized tool calls");
    Ok(calls)
}

fn parse_input(index: usize, call: &RawToolCall) -> Result<Map<String, Value>, NormalizeError> {
    let value = match &call.input {
        Value::String(s) if s.trim().is_empty() => return Ok(Map::new()),
        Value::String(s) => serde_json::from_str(s).map_err(|e| NormalizeError::InvalidJson {
            index,
            name: call.name.clone(),
            reason: e.to_string(),
        })?,
        other => other.clone(),
    };

    match value {
        Value::Object(map) => Ok(map.into_iter().filter(|(_, v)| !v.is_null()).collect()),
        Value::Null => Ok(Map::new()),
        other => Err(NormalizeError::NotAnObject {
            index,
            name: call.name.clone(),
            found: type_name(&other),
        }),
    }
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

fn coerce_fields(input: &mut Map<String, Value>) {
    for (key, value) in input.iter_mut() {
        let key = key.as_str();
        if ID_FIELDS.contains(&key) {
            coerce_id(value);
        } else if ID_LIST_FIELDS.contains(&key) {
            coerce_id_list(value);
        } else if INTEGER_FIELDS.contains(&key) {
            coerce_number(value);
            coerce_integral(value);
        } else if NUMBER_FIELDS.contains(&key) {
            coerce_number(value);
        } else if BOOL_FIELDS.contains(&key) {
            coerce_bool(value);
        } else if ENUM_FIELDS.contains(&key) {
            coerce_enum(value);
        } else if key == "constraints" {
            if let Value::Array(items) = value {
                for item in items.iter_mut() {
                    if let Value::Object(constraint) = item {
                        coerce_fields(constraint);
                    }
                }
            }
        }
    }
}

fn parse_id(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64().or_else(|| {
            n.as_f64()
                .filter(|f| f.fract() == 0.0 && f.is_finite())
                .map(|f| f as i64)
        }),
        Value::String(s) => {
            let s = s.trim().trim_start_matches('#');
            s.parse::<i64>().ok().or_else(|| {
                s.parse::<f64>()
                    .ok()
                    .filter(|f| f.fract() == 0.0 && f.is_finite())
                    .map(|f| f as i64)
            })
        }
        _ => None,
    }
}

/// Values that do not look like ids are left alone for the executor to reject.
fn coerce_id(value: &mut Value) {
    if let Some(id) = parse_id(value) {
        *value = Value::from(id);
    }
}

fn coerce_id_list(value: &mut Value) {
    let items: Vec<Value> = match value {
        Value::Array(items) => std::mem::take(items),
        Value::String(s) if s.contains(',') => s
            .split(',')
            .map(str::trim)
            .filter(|part| !part.is_empty())
            .map(|part| Value::String(part.to_string()))
            .collect(),
        Value::Number(_) | Value::String(_) => vec![value.take()],
        _ => return,
    };
    *value = Value::Array(
        items
            .into_iter()
            .map(|item| parse_id(&item).map(Value::from).unwrap_or(item))
            .collect(),
    );
}

fn coerce_number(value: &mut Value) {
    if let Value::String(s) = value {
        if let Some(n) = s
            .trim()
            .parse::<f64>()
            .ok()
            .and_then(Number::from_f64)
        {
            *value = Value::Number(n);
        }
    }
}

fn coerce_integral(value: &mut Value) {
    if let Value::Number(n) = value {
        if n.as_i64().is_none() {
            if let Some(f) = n.as_f64().filter(|f| f.fract() == 0.0 && f.is_finite()) {
                *value = Value::from(f as i64);
            }
        }
    }
}

fn coerce_bool(value: &mut Value) {
    let parsed = match value {
        Value::String(s) => match s.trim().to_ascii_lowercase().as_str() {
            "true" | "yes" | "1" => Some(true),
            "false" | "no" | "0" => Some(false),
            _ => None,
        },
        Value::Number(n) => n.as_i64().map(|i| i != 0),
        _ => None,
    };
    if let Some(b) = parsed {
        *value = Value::Bool(b);
    }
}

fn coerce_enum(value: &mut Value) {
    if let Value::String(s) = value {
        *s = s.trim().to_ascii_lowercase().replace(['-', ' '], "_");
    }
}

fn apply_defaults(name: ToolName, input: &mut Map<String, Value>) {
    if name.is_creation() {
        input.entry("count").or_insert(Value::from(1));
    }
    if name == ToolName::MoveObject {
        input.entry("use_delta").or_insert(Value::Bool(false));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn one(call: RawToolCall) -> NormalizedToolCall {
        let mut calls = normalize(&[call]).unwrap();
        assert_eq!(calls.len(), 1);
        calls.remove(0)
    }

    #[test]
    fn test_string_ids_become_integers() {
        let call = one(RawToolCall::new(
            "c1",
            "move_object",
            json!({ "object_id": "17", "object_ids": ["3", 4, 5.0], "x": "12.5" }),
        ));
        assert_eq!(call.input["object_id"], json!(17));
        assert_eq!(call.input["object_ids"], json!([3, 4, 5]));
        assert_eq!(call.input["x"], json!(12.5));
        assert_eq!(call.input["use_delta"], json!(false));
    }

    #[test]
    fn test_stringified_arguments_are_parsed() {
        let call = one(RawToolCall::new(
            "c1",
            "create_circle",
            Value::String("{\"radius\": \"40\", \"count\": \"3\"}".to_string()),
        ));
        assert_eq!(call.name, ToolName::CreateCircle);
        assert_eq!(call.input["radius"], json!(40.0));
        assert_eq!(call.input["count"], json!(3));
        assert_eq!(call.count(), 3);
    }

    #[test]
    fn test_creation_defaults_count_to_one() {
        let call = one(RawToolCall::new("c1", "create_rectangle", json!({})));
        assert_eq!(call.input["count"], json!(1));
    }

    #[test]
    fn test_unknown_tools_are_dropped_without_aborting() {
        let calls = normalize(&[
            RawToolCall::new("a", "create_rectangle", json!({})),
            RawToolCall::new("b", "launch_rockets", json!({})),
            RawToolCall::new("c", "delete_object", json!({ "object_id": 1 })),
        ])
        .unwrap();
        let names: Vec<_> = calls.iter().map(|c| c.name).collect();
        assert_eq!(names, vec![ToolName::CreateRectangle, ToolName::DeleteObject]);
        assert_eq!(calls[1].call_id, "c");
    }

    #[test]
    fn test_missing_call_ids_are_synthesised_by_position() {
        let raw = RawToolCall {
            call_id: None,
            name: "arrange_grid".to_string(),
            input: json!({ "columns": 2.0 }),
        };
        let calls = normalize(&[raw.clone(), raw]).unwrap();
        assert_eq!(calls[0].call_id, "call_0");
        assert_eq!(calls[1].call_id, "call_1");
        assert_eq!(calls[0].input["columns"], json!(2));
    }

    #[test]
    fn test_scalar_and_comma_separated_id_lists() {
        let scalar = one(RawToolCall::new("c", "arrange_circle", json!({ "object_ids": "9" })));
        assert_eq!(scalar.input["object_ids"], json!([9]));

        let csv = one(RawToolCall::new("c", "arrange_circle", json!({ "object_ids": "1, 2,3" })));
        assert_eq!(csv.input["object_ids"], json!([1, 2, 3]));
    }

    #[test]
    fn test_constraints_are_coerced() {
        let call = one(RawToolCall::new(
            "c",
            "arrange_relative",
            json!({
                "constraints": [
                    { "object_id": "2", "relation": "Left-Of", "reference_id": "1" },
                    { "object_id": 3, "relation": "centered between", "reference_ids": "1,2" }
                ]
            }),
        ));
        assert_eq!(
            call.input["constraints"],
            json!([
                { "object_id": 2, "relation": "left_of", "reference_id": 1 },
                { "object_id": 3, "relation": "centered_between", "reference_ids": [1, 2] }
            ])
        );
    }

    #[test]
    fn test_bools_and_enums() {
        let call = one(RawToolCall::new(
            "c",
            "select_objects",
            json!({ "in_viewport": "TRUE", "kind": " Circle " }),
        ));
        assert_eq!(call.input["in_viewport"], json!(true));
        assert_eq!(call.input["kind"], json!("circle"));
    }

    #[test]
    fn test_nulls_are_treated_as_absent() {
        let call = one(RawToolCall::new("c", "create_text", json!({ "text": "hi", "x": null })));
        assert!(!call.input.contains_key("x"));
    }

    #[test]
    fn test_non_numeric_id_is_left_for_executor() {
        let call = one(RawToolCall::new("c", "delete_object", json!({ "object_id": "abc" })));
        assert_eq!(call.input["object_id"], json!("abc"));
    }

    #[test]
    fn test_structurally_invalid_arguments_error() {
        let bad_json = RawToolCall::new("c", "create_text", Value::String("{not json".into()));
        assert!(matches!(
            normalize(&[bad_json]),
            Err(NormalizeError::InvalidJson { index: 0, .. })
        ));

        let array = RawToolCall::new("c", "create_text", json!([1, 2]));
        let err = normalize(&[array]).unwrap_err();
        assert!(matches!(err, NormalizeError::NotAnObject { found: "array", .. }));
        assert!(matches!(AdapterError::from(err), AdapterError::MalformedResponse(_)));
    }

    #[test]
    fn test_empty_input_normalizes_to_empty() {
        assert!(normalize(&[]).unwrap().is_empty());
    }
}
