//! Typed parameters for each tool, deserialized from normalized input.
//!
//! Unknown fields are ignored. Range checks live next to each struct so the
//! handlers can assume valid values.

use serde::Deserialize;

use canvaspilot_core::{ObjectId, ToolError};

pub const DEFAULT_SPACING: f64 = 20.0;
pub const DEFAULT_RECT_SIZE: f64 = 100.0;
pub const DEFAULT_CIRCLE_RADIUS: f64 = 50.0;
pub const DEFAULT_FONT_SIZE: f64 = 16.0;

pub(crate) fn check_range(field: &str, value: Option<f64>, min: f64, max: f64) -> Result<(), ToolError> {
    match value {
        Some(v) if !(min..=max).contains(&v) => Err(ToolError::validation(format!(
            "{field} must be between {min} and {max}, got {v}"
        ))),
        _ => Ok(()),
    }
}

pub(crate) fn check_positive(field: &str, value: Option<f64>) -> Result<(), ToolError> {
    match value {
        Some(v) if !(v > 0.0 && v.is_finite()) => Err(ToolError::validation(format!(
            "{field} must be positive, got {v}"
        ))),
        _ => Ok(()),
    }
}

/// `object_id` / `object_ids`; both absent means "the selection".
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Targets {
    pub object_id: Option<ObjectId>,
    pub object_ids: Option<Vec<ObjectId>>,
}

impl Targets {
    /// Explicit ids first, then the selection. Duplicates keep first position.
    pub fn resolve(&self, selected: &[ObjectId]) -> Result<Vec<ObjectId>, ToolError> {
        let explicit: Vec<ObjectId> = match (&self.object_ids, self.object_id) {
            (Some(ids), _) if !ids.is_empty() => ids.clone(),
            (_, Some(id)) => vec![id],
            _ => selected.to_vec(),
        };
        let mut ids = Vec::with_capacity(explicit.len());
        for id in explicit {
            if !ids.contains(&id) {
                ids.push(id);
            }
        }
        if ids.is_empty() {
            return Err(ToolError::validation(
                "no target objects: pass object_id(s) or select objects first",
            ));
        }
        Ok(ids)
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct StyleParams {
    pub fill: Option<String>,
    pub stroke: Option<String>,
    pub stroke_width: Option<f64>,
    pub opacity: Option<f64>,
    pub rotation: Option<f64>,
}

impl StyleParams {
    pub fn validate(&self) -> Result<(), ToolError> {
        check_range("opacity", self.opacity, 0.0, 1.0)?;
        check_range("rotation", self.rotation, 0.0, 360.0)?;
        check_range("stroke_width", self.stroke_width, 0.0, f64::MAX)
    }

    pub fn is_empty(&self) -> bool {
        self.fill.is_none()
            && self.stroke.is_none()
            && self.stroke_width.is_none()
            && self.opacity.is_none()
            && self.rotation.is_none()
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateParams {
    pub x: Option<f64>,
    pub y: Option<f64>,
    #[serde(default = "one")]
    pub count: u64,
    pub columns: Option<usize>,
    pub spacing: Option<f64>,
    #[serde(flatten)]
    pub style: StyleParams,
    pub width: Option<f64>,
    pub height: Option<f64>,
    pub radius: Option<f64>,
    pub text: Option<String>,
    pub font_size: Option<f64>,
    pub font_family: Option<String>,
}

fn one() -> u64 {
    1
}

impl CreateParams {
    pub fn validate(&self, max_count: u64) -> Result<(), ToolError> {
        if self.count == 0 || self.count > max_count {
            return Err(ToolError::validation(format!(
                "count must be between 1 and {max_count}, got {}",
                self.count
            )));
        }
        if self.columns == Some(0) {
            return Err(ToolError::validation("columns must be at least 1"));
        }
        check_range("spacing", self.spacing, 0.0, f64::MAX)?;
        check_positive("width", self.width)?;
        check_positive("height", self.height)?;
        check_positive("radius", self.radius)?;
        check_positive("font_size", self.font_size)?;
        self.style.validate()
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct MoveParams {
    pub x: Option<f64>,
    pub y: Option<f64>,
    #[serde(default)]
    pub use_delta: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ResizeParams {
    pub width: Option<f64>,
    pub height: Option<f64>,
    pub scale: Option<f64>,
}

impl ResizeParams {
    pub fn validate(&self) -> Result<(), ToolError> {
        if self.width.is_none() && self.height.is_none() && self.scale.is_none() {
            return Err(ToolError::validation("resize needs width, height or scale"));
        }
        check_positive("width", self.width)?;
        check_positive("height", self.height)?;
        check_positive("scale", self.scale)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct RotateParams {
    pub rotation: f64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UpdateTextParams {
    pub text: Option<String>,
    pub font_size: Option<f64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SelectParams {
    pub kind: Option<String>,
    pub fill: Option<String>,
    pub text_contains: Option<String>,
    pub in_viewport: Option<bool>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ToggleParams {
    pub object_id: ObjectId,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GridArgs {
    pub columns: Option<usize>,
    pub rows: Option<usize>,
    pub spacing: Option<f64>,
    pub cell_width: Option<f64>,
    pub cell_height: Option<f64>,
    pub origin_x: Option<f64>,
    pub origin_y: Option<f64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CircleArgs {
    pub radius: Option<f64>,
    pub center_x: Option<f64>,
    pub center_y: Option<f64>,
    pub start_angle: Option<f64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StarArgs {
    pub points: Option<usize>,
    pub outer_radius: Option<f64>,
    pub inner_radius: Option<f64>,
    pub center_x: Option<f64>,
    pub center_y: Option<f64>,
    pub start_angle: Option<f64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PathArgs {
    pub path_type: String,
    pub start_x: Option<f64>,
    pub start_y: Option<f64>,
    pub end_x: Option<f64>,
    pub end_y: Option<f64>,
    pub control1_x: Option<f64>,
    pub control1_y: Option<f64>,
    pub control2_x: Option<f64>,
    pub control2_y: Option<f64>,
    pub center_x: Option<f64>,
    pub center_y: Option<f64>,
    pub radius: Option<f64>,
    pub start_angle: Option<f64>,
    pub end_angle: Option<f64>,
    pub start_radius: Option<f64>,
    pub end_radius: Option<f64>,
    pub rotations: Option<f64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ConstraintArgs {
    pub object_id: ObjectId,
    pub relation: String,
    pub reference_id: Option<ObjectId>,
    pub reference_ids: Option<Vec<ObjectId>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RelativeArgs {
    pub constraints: Vec<ConstraintArgs>,
    pub spacing: Option<f64>,
}
