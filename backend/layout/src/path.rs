use canvaspilot_core::Position;

use crate::radial::centroid;
use crate::{polar, progress, Frame, LayoutError, Placement};

/// A parametric path. Item `i` of `n` sits at `t = i / (n - 1)`.
#[derive(Debug, Clone, PartialEq)]
pub enum PathShape {
    Line {
        start: Position,
        end: Position,
    },
    /// Angles in degrees, 0° = +x, 90° = +y (down).
    Arc {
        center: Option<Position>,
        radius: f64,
        start_angle: f64,
        end_angle: f64,
    },
    /// Cubic Bézier through `start` and `end` with two control points.
    Bezier {
        start: Position,
        control1: Position,
        control2: Position,
        end: Position,
    },
    Spiral {
        center: Option<Position>,
        start_radius: f64,
        end_radius: f64,
        rotations: f64,
        start_angle: f64,
    },
}

impl PathShape {
    pub fn name(&self) -> &'static str {
        match self {
            PathShape::Line { .. } => "path_line",
            PathShape::Arc { .. } => "path_arc",
            PathShape::Bezier { .. } => "path_bezier",
            PathShape::Spiral { .. } => "path_spiral",
        }
    }

    fn validate(&self) -> Result<(), LayoutError> {
        match self {
            PathShape::Arc { radius, .. } if *radius < 0.0 => Err(LayoutError::InvalidParameter(
                "arc radius must be non-negative".to_string(),
            )),
            PathShape::Spiral {
                start_radius,
                end_radius,
                rotations,
                ..
            } => {
                if *start_radius < 0.0 || *end_radius < 0.0 {
                    Err(LayoutError::InvalidParameter(
                        "spiral radii must be non-negative".to_string(),
                    ))
                } else if *rotations <= 0.0 {
                    Err(LayoutError::InvalidParameter(
                        "spiral rotations must be positive".to_string(),
                    ))
                } else {
                    Ok(())
                }
            }
            _ => Ok(()),
        }
    }

    /// Point at parameter `t` in `[0, 1]`.
    fn point_at(&self, t: f64, fallback_center: Position) -> Position {
        match self {
            PathShape::Line { start, end } => lerp(*start, *end, t),
            PathShape::Arc {
                center,
                radius,
                start_angle,
                end_angle,
            } => polar(
                center.unwrap_or(fallback_center),
                *radius,
                start_angle + t * (end_angle - start_angle),
            ),
            PathShape::Bezier {
                start,
                control1,
                control2,
                end,
            } => cubic_bezier(*start, *control1, *control2, *end, t),
            PathShape::Spiral {
                center,
                start_radius,
                end_radius,
                rotations,
                start_angle,
            } => polar(
                center.unwrap_or(fallback_center),
                start_radius + t * (end_radius - start_radius),
                start_angle + t * rotations * 360.0,
            ),
        }
    }
}

fn lerp(a: Position, b: Position, t: f64) -> Position {
    Position::new(a.x + (b.x - a.x) * t, a.y + (b.y - a.y) * t)
}

/// B(t) = (1-t)³·P0 + 3(1-t)²t·P1 + 3(1-t)t²·P2 + t³·P3
fn cubic_bezier(p0: Position, p1: Position, p2: Position, p3: Position, t: f64) -> Position {
    let u = 1.0 - t;
    let b0 = u * u * u;
    let b1 = 3.0 * u * u * t;
    let b2 = 3.0 * u * t * t;
    let b3 = t * t * t;
    Position::new(
        b0 * p0.x + b1 * p1.x + b2 * p2.x + b3 * p3.x,
        b0 * p0.y + b1 * p1.y + b2 * p2.y + b3 * p3.y,
    )
}

pub fn along_path(targets: &[Frame], shape: &PathShape) -> Result<Vec<Placement>, LayoutError> {
    shape.validate()?;
    let fallback_center = centroid(targets);
    let n = targets.len();

    Ok(targets
        .iter()
        .enumerate()
        .map(|(i, frame)| Placement {
            object_id: frame.id,
            position: shape.point_at(progress(i, n), fallback_center),
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{assert_close, frames};

    #[test]
    fn test_line_interpolates_endpoints() {
        let shape = PathShape::Line {
            start: Position::new(0.0, 0.0),
            end: Position::new(300.0, 150.0),
        };
        let placements = along_path(&frames(4), &shape).unwrap();
        assert_close(placements[0].position, Position::new(0.0, 0.0));
        assert_close(placements[1].position, Position::new(100.0, 50.0));
        assert_close(placements[3].position, Position::new(300.0, 150.0));
    }

    #[test]
    fn test_single_item_sits_at_path_start() {
        let shape = PathShape::Line {
            start: Position::new(5.0, 6.0),
            end: Position::new(100.0, 100.0),
        };
        let placements = along_path(&frames(1), &shape).unwrap();
        assert_close(placements[0].position, Position::new(5.0, 6.0));
    }

    #[test]
    fn test_arc_quarter_circle() {
        let shape = PathShape::Arc {
            center: Some(Position::new(0.0, 0.0)),
            radius: 10.0,
            start_angle: 0.0,
            end_angle: 90.0,
        };
        let placements = along_path(&frames(2), &shape).unwrap();
        assert_close(placements[0].position, Position::new(10.0, 0.0));
        assert_close(placements[1].position, Position::new(0.0, 10.0));
    }

    #[test]
    fn test_bezier_endpoints_and_midpoint() {
        let shape = PathShape::Bezier {
            start: Position::new(0.0, 0.0),
            control1: Position::new(0.0, 100.0),
            control2: Position::new(100.0, 100.0),
            end: Position::new(100.0, 0.0),
        };
        let placements = along_path(&frames(3), &shape).unwrap();
        assert_close(placements[0].position, Position::new(0.0, 0.0));
        // t = 0.5: x = 0.375*0 + 0.375*100 + 0.125*100 = 50, y = 0.375*100 + 0.375*100 = 75
        assert_close(placements[1].position, Position::new(50.0, 75.0));
        assert_close(placements[2].position, Position::new(100.0, 0.0));
    }

    #[test]
    fn test_spiral_radius_grows_across_rotations() {
        let center = Position::new(0.0, 0.0);
        let shape = PathShape::Spiral {
            center: Some(center),
            start_radius: 0.0,
            end_radius: 100.0,
            rotations: 1.0,
            start_angle: 0.0,
        };
        let placements = along_path(&frames(3), &shape).unwrap();
        assert_close(placements[0].position, center);
        // t = 0.5: half a turn at radius 50
        assert_close(placements[1].position, Position::new(-50.0, 0.0));
        assert_close(placements[2].position, Position::new(100.0, 0.0));
    }

    #[test]
    fn test_spiral_rejects_zero_rotations() {
        let shape = PathShape::Spiral {
            center: None,
            start_radius: 0.0,
            end_radius: 10.0,
            rotations: 0.0,
            start_angle: 0.0,
        };
        assert!(along_path(&frames(2), &shape).is_err());
    }
}
