use canvaspilot_core::Position;

use crate::{polar, Frame, LayoutError, Placement};

#[derive(Debug, Clone, PartialEq)]
pub struct CircularParams {
    pub radius: f64,
    /// Defaults to the centroid of the targets' current positions.
    pub center: Option<Position>,
    pub start_angle: f64,
}

impl Default for CircularParams {
    fn default() -> Self {
        Self {
            radius: 200.0,
            center: None,
            start_angle: 0.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct StarParams {
    pub points: usize,
    pub outer_radius: f64,
    /// Defaults to `0.4 * outer_radius`.
    pub inner_radius: Option<f64>,
    pub center: Option<Position>,
    /// -90° puts the first outer vertex straight up.
    pub start_angle: f64,
}

impl Default for StarParams {
    fn default() -> Self {
        Self {
            points: 5,
            outer_radius: 200.0,
            inner_radius: None,
            center: None,
            start_angle: -90.0,
        }
    }
}

impl StarParams {
    pub fn inner(&self) -> f64 {
        self.inner_radius.unwrap_or(0.4 * self.outer_radius)
    }
}

/// Mean of the targets' positions; the origin when there are none.
pub fn centroid(targets: &[Frame]) -> Position {
    if targets.is_empty() {
        return Position::default();
    }
    let n = targets.len() as f64;
    let (sx, sy) = targets
        .iter()
        .fold((0.0, 0.0), |(sx, sy), f| (sx + f.position.x, sy + f.position.y));
    Position::new(sx / n, sy / n)
}

/// Evenly spaced over 360° at a fixed radius.
pub fn circular(targets: &[Frame], params: &CircularParams) -> Result<Vec<Placement>, LayoutError> {
    if params.radius < 0.0 {
        return Err(LayoutError::InvalidParameter("radius must be non-negative".to_string()));
    }
    let center = params.center.unwrap_or_else(|| centroid(targets));
    let step = if targets.is_empty() {
        0.0
    } else {
        360.0 / targets.len() as f64
    };

    Ok(targets
        .iter()
        .enumerate()
        .map(|(i, frame)| Placement {
            object_id: frame.id,
            position: polar(center, params.radius, params.start_angle + i as f64 * step),
        })
        .collect())
}

/// Alternating outer (even index) and inner (odd index) vertices over
/// `2 * points` evenly spaced angles.
pub fn star(targets: &[Frame], params: &StarParams) -> Result<Vec<Placement>, LayoutError> {
    if params.points < 2 {
        return Err(LayoutError::InvalidParameter("a star needs at least 2 points".to_string()));
    }
    let inner = params.inner();
    if params.outer_radius < 0.0 || inner < 0.0 {
        return Err(LayoutError::InvalidParameter("radii must be non-negative".to_string()));
    }
    let center = params.center.unwrap_or_else(|| centroid(targets));
    let step = 360.0 / (2 * params.points) as f64;

    Ok(targets
        .iter()
        .enumerate()
        .map(|(i, frame)| {
            let radius = if i % 2 == 0 { params.outer_radius } else { inner };
            Placement {
                object_id: frame.id,
                position: polar(center, radius, params.start_angle + i as f64 * step),
            }
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{assert_close, frames};

    fn distance(a: Position, b: Position) -> f64 {
        ((a.x - b.x).powi(2) + (a.y - b.y).powi(2)).sqrt()
    }

    fn angle(center: Position, p: Position) -> f64 {
        (p.y - center.y).atan2(p.x - center.x).to_degrees()
    }

    #[test]
    fn test_centroid() {
        // frames(3) sits at x = 0, 10, 20
        assert_close(centroid(&frames(3)), Position::new(10.0, 0.0));
    }

    #[test]
    fn test_circle_quarter_turns() {
        let params = CircularParams {
            radius: 100.0,
            center: Some(Position::new(0.0, 0.0)),
            start_angle: 0.0,
        };
        let placements = circular(&frames(4), &params).unwrap();
        assert_close(placements[0].position, Position::new(100.0, 0.0));
        assert_close(placements[1].position, Position::new(0.0, 100.0));
        assert_close(placements[2].position, Position::new(-100.0, 0.0));
        assert_close(placements[3].position, Position::new(0.0, -100.0));
    }

    #[test]
    fn test_star_alternates_radii() {
        let center = Position::new(500.0, 500.0);
        let params = StarParams {
            points: 3,
            outer_radius: 300.0,
            inner_radius: Some(120.0),
            center: Some(center),
            start_angle: -90.0,
        };
        let placements = star(&frames(6), &params).unwrap();
        assert_eq!(placements.len(), 6);
        for (i, p) in placements.iter().enumerate() {
            let expected = if i % 2 == 0 { 300.0 } else { 120.0 };
            assert!((distance(center, p.position) - expected).abs() < 1e-6);
        }
        for pair in placements.windows(2) {
            let delta = (angle(center, pair[1].position) - angle(center, pair[0].position))
                .rem_euclid(360.0);
            assert!((delta - 60.0).abs() < 1e-6, "step was {delta}");
        }
    }

    #[test]
    fn test_star_default_inner_radius() {
        let params = StarParams {
            outer_radius: 100.0,
            ..Default::default()
        };
        assert!((params.inner() - 40.0).abs() < 1e-9);
    }

    #[test]
    fn test_star_rejects_single_point() {
        let params = StarParams {
            points: 1,
            ..Default::default()
        };
        assert!(star(&frames(2), &params).is_err());
    }

    #[test]
    fn test_circle_uses_centroid_by_default() {
        let placements = circular(&frames(1), &CircularParams::default()).unwrap();
        assert_close(placements[0].position, Position::new(200.0, 0.0));
    }
}
