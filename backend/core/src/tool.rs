use std::fmt;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::ToolError;
use crate::types::{CanvasObject, ObjectId, ObjectKind};

/// The closed set of tools offered to the language model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolName {
    CreateRectangle,
    CreateCircle,
    CreateText,
    MoveObject,
    ResizeObject,
    RotateObject,
    UpdateStyle,
    UpdateText,
    DeleteObject,
    SelectObjects,
    ToggleVisibility,
    ArrangeGrid,
    ArrangeCircle,
    ArrangeStar,
    ArrangeAlongPath,
    ArrangeRelative,
}

impl ToolName {
    pub const ALL: [ToolName; 16] = [
        ToolName::CreateRectangle,
        ToolName::CreateCircle,
        ToolName::CreateText,
        ToolName::MoveObject,
        ToolName::ResizeObject,
        ToolName::RotateObject,
        ToolName::UpdateStyle,
        ToolName::UpdateText,
        ToolName::DeleteObject,
        ToolName::SelectObjects,
        ToolName::ToggleVisibility,
        ToolName::ArrangeGrid,
        ToolName::ArrangeCircle,
        ToolName::ArrangeStar,
        ToolName::ArrangeAlongPath,
        ToolName::ArrangeRelative,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ToolName::CreateRectangle => "create_rectangle",
            ToolName::CreateCircle => "create_circle",
            ToolName::CreateText => "create_text",
            ToolName::MoveObject => "move_object",
            ToolName::ResizeObject => "resize_object",
            ToolName::RotateObject => "rotate_object",
            ToolName::UpdateStyle => "update_style",
            ToolName::UpdateText => "update_text",
            ToolName::DeleteObject => "delete_object",
            ToolName::SelectObjects => "select_objects",
            ToolName::ToggleVisibility => "toggle_visibility",
            ToolName::ArrangeGrid => "arrange_grid",
            ToolName::ArrangeCircle => "arrange_circle",
            ToolName::ArrangeStar => "arrange_star",
            ToolName::ArrangeAlongPath => "arrange_along_path",
            ToolName::ArrangeRelative => "arrange_relative",
        }
    }

    /// Look up a tool by its wire name. `None` for anything outside the set.
    pub fn from_name(name: &str) -> Option<Self> {
        let name = name.trim();
        Self::ALL.iter().copied().find(|tool| tool.as_str() == name)
    }

    /// Creation tools only insert rows and can join the atomic batch.
    pub fn is_creation(&self) -> bool {
        self.created_kind().is_some()
    }

    pub fn is_arrangement(&self) -> bool {
        matches!(
            self,
            ToolName::ArrangeGrid
                | ToolName::ArrangeCircle
                | ToolName::ArrangeStar
                | ToolName::ArrangeAlongPath
                | ToolName::ArrangeRelative
        )
    }

    pub fn created_kind(&self) -> Option<ObjectKind> {
        match self {
            ToolName::CreateRectangle => Some(ObjectKind::Rectangle),
            ToolName::CreateCircle => Some(ObjectKind::Circle),
            ToolName::CreateText => Some(ObjectKind::Text),
            _ => None,
        }
    }
}

impl fmt::Display for ToolName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A tool call exactly as a provider adapter extracted it.
///
/// `input` is either a JSON object or, for providers that stringify
/// arguments, a JSON string holding one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawToolCall {
    pub call_id: Option<String>,
    pub name: String,
    pub input: Value,
}

impl RawToolCall {
    pub fn new(call_id: impl Into<String>, name: impl Into<String>, input: Value) -> Self {
        Self {
            call_id: Some(call_id.into()),
            name: name.into(),
            input,
        }
    }
}

/// A tool call with a known name and canonically typed input.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NormalizedToolCall {
    /// Provider-supplied; traceability only, never used for ordering.
    pub call_id: String,
    pub name: ToolName,
    pub input: Map<String, Value>,
}

impl NormalizedToolCall {
    /// Deserialize the input into a tool-specific parameter struct.
    pub fn params<T: DeserializeOwned>(&self) -> Result<T, ToolError> {
        serde_json::from_value(Value::Object(self.input.clone()))
            .map_err(|e| ToolError::validation(format!("{}: {}", self.name, e)))
    }

    pub fn count(&self) -> u64 {
        self.input.get("count").and_then(Value::as_u64).unwrap_or(1)
    }
}

/// Tool-specific success value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum ToolValue {
    /// One created, updated, or deleted object.
    Object(CanvasObject),
    /// Several objects from one call (count > 1, multi-target, arrangements).
    ObjectList(Vec<CanvasObject>),
    /// Ids matched by a selection tool.
    Selection(Vec<ObjectId>),
    /// New state of a toggled flag, with the object it was applied to.
    Toggle { object: CanvasObject, enabled: bool },
}

impl ToolValue {
    pub fn objects(&self) -> Vec<&CanvasObject> {
        match self {
            ToolValue::Object(obj) => vec![obj],
            ToolValue::ObjectList(objs) => objs.iter().collect(),
            ToolValue::Toggle { object, .. } => vec![object],
            ToolValue::Selection(_) => Vec::new(),
        }
    }
}

/// Outcome of one normalized tool call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolResult {
    pub call_id: String,
    pub tool: ToolName,
    pub result: Result<ToolValue, ToolError>,
}

impl ToolResult {
    pub fn ok(call: &NormalizedToolCall, value: ToolValue) -> Self {
        Self {
            call_id: call.call_id.clone(),
            tool: call.name,
            result: Ok(value),
        }
    }

    pub fn err(call: &NormalizedToolCall, error: ToolError) -> Self {
        Self {
            call_id: call.call_id.clone(),
            tool: call.name,
            result: Err(error),
        }
    }

    pub fn is_ok(&self) -> bool {
        self.result.is_ok()
    }
}

/// Per-command tallies behind the "created X, updated Y" summary.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutcomeCounts {
    pub created: usize,
    pub updated: usize,
    pub deleted: usize,
    pub failed: usize,
}

impl OutcomeCounts {
    pub fn tally(results: &[ToolResult]) -> Self {
        let mut counts = Self::default();
        for result in results {
            match &result.result {
                Ok(value) => {
                    let n = value.objects().len();
                    match result.tool {
                        tool if tool.is_creation() => counts.created += n,
                        ToolName::DeleteObject => counts.deleted += n,
                        _ => counts.updated += n,
                    }
                }
                Err(_) => counts.failed += 1,
            }
        }
        counts
    }
}

impl fmt::Display for OutcomeCounts {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "created {}, updated {}, deleted {}, {} failed",
            self.created, self.updated, self.deleted, self.failed
        )
    }
}

/// The dispatcher's successful terminal value for one command.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum CommandOutcome {
    /// One result per normalized tool call, in the model's order.
    Applied(Vec<ToolResult>),
    /// The model answered in prose without requesting any tools.
    Text(String),
}

impl CommandOutcome {
    pub fn results(&self) -> &[ToolResult] {
        match self {
            CommandOutcome::Applied(results) => results,
            CommandOutcome::Text(_) => &[],
        }
    }

    pub fn summary(&self) -> String {
        match self {
            CommandOutcome::Applied(results) => OutcomeCounts::tally(results).to_string(),
            CommandOutcome::Text(text) => text.clone(),
        }
    }
}
