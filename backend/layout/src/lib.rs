//! Layout Engine: pure geometry for named arrangements.
//!
//! Every function returns exactly one placement per input id, in input
//! order. Callers zip the result positionally against the id list.

pub mod grid;
pub mod path;
pub mod radial;
pub mod relational;

use std::collections::HashMap;

use thiserror::Error;
use tracing::debug;

use canvaspilot_core::{CanvasObject, ObjectId, Position, ToolError};

pub use grid::{grid, grid_cells, grid_dimensions, GridParams};
pub use path::{along_path, PathShape};
pub use radial::{centroid, circular, star, CircularParams, StarParams};
pub use relational::{relational, Constraint, Relation, RelationalParams};

#[derive(Debug, Clone, Error, PartialEq)]
pub enum LayoutError {
    #[error("object {0} is not on the canvas")]
    UnknownObject(ObjectId),

    #[error("invalid layout parameter: {0}")]
    InvalidParameter(String),
}

impl From<LayoutError> for ToolError {
    fn from(err: LayoutError) -> Self {
        match err {
            LayoutError::UnknownObject(id) => ToolError::ObjectNotFound(id),
            LayoutError::InvalidParameter(msg) => ToolError::ValidationFailure(msg),
        }
    }
}

/// Current geometry of one object: top-left position and size.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Frame {
    pub id: ObjectId,
    pub position: Position,
    pub width: f64,
    pub height: f64,
}

impl Frame {
    pub fn new(id: ObjectId, position: Position, width: f64, height: f64) -> Self {
        Self {
            id,
            position,
            width,
            height,
        }
    }

    pub fn center(&self) -> Position {
        self.position.offset(self.width / 2.0, self.height / 2.0)
    }
}

impl From<&CanvasObject> for Frame {
    fn from(obj: &CanvasObject) -> Self {
        Frame::new(obj.id, obj.position, obj.width(), obj.height())
    }
}

/// Target position for one object.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Placement {
    pub object_id: ObjectId,
    pub position: Position,
}

/// Kind-specific layout parameters.
#[derive(Debug, Clone, PartialEq)]
pub enum LayoutKind {
    Grid(GridParams),
    Circular(CircularParams),
    Star(StarParams),
    Path(PathShape),
    Relational(RelationalParams),
}

/// A named arrangement over an ordered list of target ids.
#[derive(Debug, Clone, PartialEq)]
pub struct LayoutSpec {
    pub ids: Vec<ObjectId>,
    pub kind: LayoutKind,
}

impl LayoutSpec {
    pub fn new(ids: Vec<ObjectId>, kind: LayoutKind) -> Self {
        Self { ids, kind }
    }

    /// Relational specs target their constraint subjects, in first-mention order.
    pub fn relational(params: RelationalParams) -> Self {
        let mut ids: Vec<ObjectId> = Vec::new();
        for c in &params.constraints {
            if !ids.contains(&c.subject) {
                ids.push(c.subject);
            }
        }
        Self {
            ids,
            kind: LayoutKind::Relational(params),
        }
    }

    pub fn name(&self) -> &'static str {
        match &self.kind {
            LayoutKind::Grid(_) => "grid",
            LayoutKind::Circular(_) => "circular",
            LayoutKind::Star(_) => "star",
            LayoutKind::Path(shape) => shape.name(),
            LayoutKind::Relational(_) => "relational",
        }
    }
}

/// Compute target positions for `spec.ids` given the known frames.
///
/// `frames` may hold more objects than the layout moves; relational
/// layouts read reference objects from it.
pub fn compute(
    spec: &LayoutSpec,
    frames: &HashMap<ObjectId, Frame>,
) -> Result<Vec<Placement>, LayoutError> {
    let targets = spec
        .ids
        .iter()
        .map(|id| frames.get(id).copied().ok_or(LayoutError::UnknownObject(*id)))
        .collect::<Result<Vec<_>, _>>()?;

    let placements = match &spec.kind {
        LayoutKind::Grid(params) => grid(&targets, params)?,
        LayoutKind::Circular(params) => circular(&targets, params)?,
        LayoutKind::Star(params) => star(&targets, params)?,
        LayoutKind::Path(shape) => along_path(&targets, shape)?,
        LayoutKind::Relational(params) => relational(&targets, frames, params)?,
    };

    debug_assert_eq!(placements.len(), spec.ids.len());
    debug!(layout = spec.name(), objects = placements.len(), "Layout computed");
    Ok(placements)
}

/// Fraction of the way along an ordered sequence; 0 for a single item.
pub(crate) fn progress(index: usize, n: usize) -> f64 {
    if n <= 1 {
        0.0
    } else {
        index as f64 / (n - 1) as f64
    }
}

/// Point at `angle_deg` on a circle (0° = +x, 90° = +y / down).
pub(crate) fn polar(center: Position, radius: f64, angle_deg: f64) -> Position {
    let theta = angle_deg.to_radians();
    Position::new(center.x + radius * theta.cos(), center.y + radius * theta.sin())
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;

    pub fn frames(n: usize) -> Vec<Frame> {
        (0..n)
            .map(|i| Frame::new(i as ObjectId + 1, Position::new(i as f64 * 10.0, 0.0), 50.0, 50.0))
            .collect()
    }

    pub fn assert_close(a: Position, b: Position) {
        assert!(
            (a.x - b.x).abs() < 1e-6 && (a.y - b.y).abs() < 1e-6,
            "expected {b}, got {a}"
        );
    }
}
