//! Declarative pairwise positioning.
//!
//! Constraints are applied once each, in declaration order, against the
//! working positions at that moment. There is no fixed-point iteration:
//! "A below B, B below C" moves A relative to B's old position.

use std::collections::HashMap;

use canvaspilot_core::{ObjectId, Position};

use crate::{Frame, LayoutError, Placement};

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Relation {
    Above(ObjectId),
    Below(ObjectId),
    LeftOf(ObjectId),
    RightOf(ObjectId),
    /// Same row: vertical centres match.
    AlignedHorizontallyWith(ObjectId),
    /// Same column: horizontal centres match.
    AlignedVerticallyWith(ObjectId),
    CenteredBetween(ObjectId, ObjectId),
}

impl Relation {
    fn references(&self) -> Vec<ObjectId> {
        match *self {
            Relation::Above(r)
            | Relation::Below(r)
            | Relation::LeftOf(r)
            | Relation::RightOf(r)
            | Relation::AlignedHorizontallyWith(r)
            | Relation::AlignedVerticallyWith(r) => vec![r],
            Relation::CenteredBetween(a, b) => vec![a, b],
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Constraint {
    pub subject: ObjectId,
    pub relation: Relation,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RelationalParams {
    pub constraints: Vec<Constraint>,
    pub spacing: f64,
}

/// Resolve `constraints` and return the final position of every target.
///
/// `frames` supplies reference objects that are not themselves targets.
pub fn relational(
    targets: &[Frame],
    frames: &HashMap<ObjectId, Frame>,
    params: &RelationalParams,
) -> Result<Vec<Placement>, LayoutError> {
    let mut working: HashMap<ObjectId, Frame> = targets.iter().map(|f| (f.id, *f)).collect();

    for constraint in &params.constraints {
        if constraint.relation.references().contains(&constraint.subject) {
            return Err(LayoutError::InvalidParameter(format!(
                "object {} cannot be positioned relative to itself",
                constraint.subject
            )));
        }
        let lookup = |id: ObjectId| -> Result<Frame, LayoutError> {
            working
                .get(&id)
                .or_else(|| frames.get(&id))
                .copied()
                .ok_or(LayoutError::UnknownObject(id))
        };
        let subject = lookup(constraint.subject)?;
        let position = resolve(&subject, constraint.relation, params.spacing, lookup)?;
        working.insert(subject.id, Frame { position, ..subject });
    }

    targets
        .iter()
        .map(|frame| {
            working
                .get(&frame.id)
                .map(|f| Placement {
                    object_id: frame.id,
                    position: f.position,
                })
                .ok_or(LayoutError::UnknownObject(frame.id))
        })
        .collect()
}

fn resolve<F>(
    subject: &Frame,
    relation: Relation,
    spacing: f64,
    lookup: F,
) -> Result<Position, LayoutError>
where
    F: Fn(ObjectId) -> Result<Frame, LayoutError>,
{
    let centered_x = |r: &Frame| r.position.x + (r.width - subject.width) / 2.0;
    let centered_y = |r: &Frame| r.position.y + (r.height - subject.height) / 2.0;

    let position = match relation {
        Relation::Above(id) => {
            let r = lookup(id)?;
            Position::new(centered_x(&r), r.position.y - spacing - subject.height)
        }
        Relation::Below(id) => {
            let r = lookup(id)?;
            Position::new(centered_x(&r), r.position.y + r.height + spacing)
        }
        Relation::LeftOf(id) => {
            let r = lookup(id)?;
            Position::new(r.position.x - spacing - subject.width, centered_y(&r))
        }
        Relation::RightOf(id) => {
            let r = lookup(id)?;
            Position::new(r.position.x + r.width + spacing, centered_y(&r))
        }
        Relation::AlignedHorizontallyWith(id) => {
            let r = lookup(id)?;
            Position::new(subject.position.x, centered_y(&r))
        }
        Relation::AlignedVerticallyWith(id) => {
            let r = lookup(id)?;
            Position::new(centered_x(&r), subject.position.y)
        }
        Relation::CenteredBetween(a, b) => {
            let (a, b) = (lookup(a)?.center(), lookup(b)?.center());
            Position::new(
                (a.x + b.x) / 2.0 - subject.width / 2.0,
                (a.y + b.y) / 2.0 - subject.height / 2.0,
            )
        }
    };
    Ok(position)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::assert_close;

    fn frame(id: ObjectId, x: f64, y: f64) -> Frame {
        Frame::new(id, Position::new(x, y), 100.0, 50.0)
    }

    fn run(targets: &[Frame], others: &[Frame], constraints: Vec<Constraint>) -> Vec<Placement> {
        let frames: HashMap<_, _> = targets.iter().chain(others).map(|f| (f.id, *f)).collect();
        let params = RelationalParams {
            constraints,
            spacing: 20.0,
        };
        relational(targets, &frames, &params).unwrap()
    }

    #[test]
    fn test_below_and_right_of() {
        let reference = frame(1, 100.0, 100.0);
        let placements = run(
            &[frame(2, 0.0, 0.0), frame(3, 0.0, 0.0)],
            &[reference],
            vec![
                Constraint { subject: 2, relation: Relation::Below(1) },
                Constraint { subject: 3, relation: Relation::RightOf(1) },
            ],
        );
        assert_close(placements[0].position, Position::new(100.0, 170.0));
        assert_close(placements[1].position, Position::new(220.0, 100.0));
    }

    #[test]
    fn test_above_and_left_of() {
        let reference = frame(1, 300.0, 300.0);
        let placements = run(
            &[frame(2, 0.0, 0.0), frame(3, 0.0, 0.0)],
            &[reference],
            vec![
                Constraint { subject: 2, relation: Relation::Above(1) },
                Constraint { subject: 3, relation: Relation::LeftOf(1) },
            ],
        );
        assert_close(placements[0].position, Position::new(300.0, 230.0));
        assert_close(placements[1].position, Position::new(180.0, 300.0));
    }

    #[test]
    fn test_alignment_keeps_other_axis() {
        let reference = frame(1, 500.0, 400.0);
        let placements = run(
            &[frame(2, 10.0, 20.0), frame(3, 30.0, 40.0)],
            &[reference],
            vec![
                Constraint { subject: 2, relation: Relation::AlignedHorizontallyWith(1) },
                Constraint { subject: 3, relation: Relation::AlignedVerticallyWith(1) },
            ],
        );
        assert_close(placements[0].position, Position::new(10.0, 400.0));
        assert_close(placements[1].position, Position::new(500.0, 40.0));
    }

    #[test]
    fn test_centered_between() {
        let placements = run(
            &[frame(3, 0.0, 0.0)],
            &[frame(1, 0.0, 0.0), frame(2, 200.0, 100.0)],
            vec![Constraint { subject: 3, relation: Relation::CenteredBetween(1, 2) }],
        );
        assert_close(placements[0].position, Position::new(100.0, 50.0));
    }

    #[test]
    fn test_chained_relations_follow_declaration_order() {
        let base = frame(3, 0.0, 0.0);
        // B below C first, then A below B: A sees B's new position.
        let in_order = run(
            &[frame(1, 0.0, 500.0), frame(2, 0.0, 900.0)],
            &[base],
            vec![
                Constraint { subject: 2, relation: Relation::Below(3) },
                Constraint { subject: 1, relation: Relation::Below(2) },
            ],
        );
        assert_close(in_order[1].position, Position::new(0.0, 70.0));
        assert_close(in_order[0].position, Position::new(0.0, 140.0));

        // Reversed: A is placed against B's original position.
        let reversed = run(
            &[frame(1, 0.0, 500.0), frame(2, 0.0, 900.0)],
            &[base],
            vec![
                Constraint { subject: 1, relation: Relation::Below(2) },
                Constraint { subject: 2, relation: Relation::Below(3) },
            ],
        );
        assert_close(reversed[0].position, Position::new(0.0, 970.0));
    }

    #[test]
    fn test_self_reference_rejected() {
        let targets = [frame(1, 0.0, 0.0)];
        let frames: HashMap<_, _> = targets.iter().map(|f| (f.id, *f)).collect();
        let params = RelationalParams {
            constraints: vec![Constraint { subject: 1, relation: Relation::Below(1) }],
            spacing: 20.0,
        };
        assert!(relational(&targets, &frames, &params).is_err());
    }

    #[test]
    fn test_missing_reference_reported() {
        let targets = [frame(1, 0.0, 0.0)];
        let frames: HashMap<_, _> = targets.iter().map(|f| (f.id, *f)).collect();
        let params = RelationalParams {
            constraints: vec![Constraint { subject: 1, relation: Relation::Above(42) }],
            spacing: 20.0,
        };
        assert_eq!(
            relational(&targets, &frames, &params).unwrap_err(),
            LayoutError::UnknownObject(42)
        );
    }
}
