use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

use crate::message::Interaction;

/// Store-assigned identity of a canvas object.
pub type ObjectId = i64;

/// Identity of a shared canvas.
pub type CanvasId = Uuid;

/// Opaque, type-dependent rendering attributes (fill, stroke, font, rotation, ...).
pub type RenderData = Map<String, Value>;

/// Width/height used when an object's render data carries none.
pub const DEFAULT_OBJECT_SIZE: f64 = 100.0;

/// The shape family of a canvas object.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ObjectKind {
    Rectangle,
    Circle,
    Text,
}

impl ObjectKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ObjectKind::Rectangle => "rectangle",
            ObjectKind::Circle => "circle",
            ObjectKind::Text => "text",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "rectangle" | "rect" => Some(ObjectKind::Rectangle),
            "circle" => Some(ObjectKind::Circle),
            "text" => Some(ObjectKind::Text),
            _ => None,
        }
    }
}

impl fmt::Display for ObjectKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A point in canvas coordinates (+x right, +y down).
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub x: f64,
    pub y: f64,
}

impl Position {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn offset(self, dx: f64, dy: f64) -> Self {
        Self::new(self.x + dx, self.y + dy)
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({:.1}, {:.1})", self.x, self.y)
    }
}

fn dimension(render_data: &RenderData, key: &str) -> f64 {
    render_data
        .get(key)
        .and_then(Value::as_f64)
        .filter(|v| *v > 0.0)
        .unwrap_or(DEFAULT_OBJECT_SIZE)
}

/// Canonical creation payload for one canvas object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObjectAttrs {
    #[serde(rename = "type")]
    pub kind: ObjectKind,
    pub position: Position,
    #[serde(default)]
    pub render_data: RenderData,
}

impl ObjectAttrs {
    pub fn new(kind: ObjectKind, position: Position) -> Self {
        Self {
            kind,
            position,
            render_data: RenderData::new(),
        }
    }

    pub fn with(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.render_data.insert(key.to_string(), value.into());
        self
    }

    pub fn width(&self) -> f64 {
        dimension(&self.render_data, "width")
    }

    pub fn height(&self) -> f64 {
        dimension(&self.render_data, "height")
    }
}

/// A persisted canvas object as returned by the store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CanvasObject {
    pub id: ObjectId,
    pub canvas_id: CanvasId,
    #[serde(rename = "type")]
    pub kind: ObjectKind,
    pub position: Position,
    #[serde(default)]
    pub render_data: RenderData,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl CanvasObject {
    pub fn width(&self) -> f64 {
        dimension(&self.render_data, "width")
    }

    pub fn height(&self) -> f64 {
        dimension(&self.render_data, "height")
    }

    pub fn is_hidden(&self) -> bool {
        self.render_data
            .get("hidden")
            .and_then(Value::as_bool)
            .unwrap_or(false)
    }

    pub fn fill(&self) -> Option<&str> {
        self.render_data.get("fill").and_then(Value::as_str)
    }

    pub fn text(&self) -> Option<&str> {
        self.render_data.get("text").and_then(Value::as_str)
    }
}

/// A partial update for one object. `Null` render-data values remove the key.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ObjectPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub position: Option<Position>,
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub render_data: RenderData,
}

impl ObjectPatch {
    pub fn move_to(position: Position) -> Self {
        Self {
            position: Some(position),
            render_data: RenderData::new(),
        }
    }

    pub fn set(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.render_data.insert(key.to_string(), value.into());
        self
    }

    pub fn is_empty(&self) -> bool {
        self.position.is_none() && self.render_data.is_empty()
    }

    /// Apply the patch in place. Timestamps are the store's responsibility.
    pub fn apply_to(&self, object: &mut CanvasObject) {
        if let Some(position) = self.position {
            object.position = position;
        }
        for (key, value) in &self.render_data {
            if value.is_null() {
                object.render_data.remove(key);
            } else {
                object.render_data.insert(key.clone(), value.clone());
            }
        }
    }
}

/// The issuing client's visible region.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Viewport {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
    #[serde(default = "default_zoom")]
    pub zoom: f64,
}

fn default_zoom() -> f64 {
    1.0
}

impl Default for Viewport {
    fn default() -> Self {
        Self {
            x: 0.0,
            y: 0.0,
            width: 1280.0,
            height: 800.0,
            zoom: 1.0,
        }
    }
}

impl Viewport {
    pub fn center(&self) -> Position {
        Position::new(self.x + self.width / 2.0, self.y + self.height / 2.0)
    }

    pub fn contains(&self, position: Position) -> bool {
        position.x >= self.x
            && position.x <= self.x + self.width
            && position.y >= self.y
            && position.y <= self.y + self.height
    }
}

/// Client-side state sent along with a command.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommandContext {
    pub current_color: String,
    #[serde(default)]
    pub viewport: Viewport,
    /// Recent interactions on this canvas, oldest first. Prompt enrichment only.
    #[serde(default)]
    pub recent: Vec<Interaction>,
}

impl Default for CommandContext {
    fn default() -> Self {
        Self {
            current_color: "#4A90D9".to_string(),
            viewport: Viewport::default(),
            recent: Vec::new(),
        }
    }
}

/// One user command against one canvas.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommandRequest {
    pub text: String,
    pub canvas_id: CanvasId,
    #[serde(default)]
    pub selected_ids: Vec<ObjectId>,
    #[serde(default)]
    pub context: CommandContext,
}

impl CommandRequest {
    pub fn new(canvas_id: CanvasId, text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            canvas_id,
            selected_ids: Vec::new(),
            context: CommandContext::default(),
        }
    }

    pub fn with_selection(mut self, ids: Vec<ObjectId>) -> Self {
        self.selected_ids = ids;
        self
    }
}
