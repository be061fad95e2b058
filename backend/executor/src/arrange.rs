use std::collections::HashMap;

use canvaspilot_core::{
    NormalizedToolCall, ObjectId, ObjectPatch, ObjectStore, Position, ToolError, ToolName,
    ToolValue,
};
use canvaspilot_layout::{
    compute, CircularParams, Constraint, Frame, GridParams, LayoutKind, LayoutSpec, PathShape,
    Relation, RelationalParams, StarParams,
};

use crate::executor::ExecContext;
use crate::params::{
    CircleArgs, ConstraintArgs, GridArgs, PathArgs, RelativeArgs, StarArgs, Targets,
    DEFAULT_SPACING,
};

/// Run an arrangement tool: build the layout, compute it against current
/// geometry, then move each target. Result objects follow id-list order.
pub(crate) fn arrange(
    store: &dyn ObjectStore,
    call: &NormalizedToolCall,
    ctx: &ExecContext,
) -> Result<ToolValue, ToolError> {
    let spec = layout_spec(call, ctx)?;
    let frames: HashMap<ObjectId, Frame> = store
        .list_objects(ctx.canvas_id)?
        .iter()
        .map(|o| (o.id, Frame::from(o)))
        .collect();

    let placements = compute(&spec, &frames)?;
    let objects = placements
        .iter()
        .map(|p| {
            store
                .update_one(ctx.canvas_id, p.object_id, &ObjectPatch::move_to(p.position))
                .map_err(ToolError::from)
        })
        .collect::<Result<Vec<_>, _>>()?;
    Ok(ToolValue::ObjectList(objects))
}

fn center(x: Option<f64>, y: Option<f64>) -> Result<Option<Position>, ToolError> {
    match (x, y) {
        (Some(x), Some(y)) => Ok(Some(Position::new(x, y))),
        (None, None) => Ok(None),
        _ => Err(ToolError::validation("center_x and center_y must be given together")),
    }
}

fn point(label: &str, x: Option<f64>, y: Option<f64>) -> Result<Position, ToolError> {
    match (x, y) {
        (Some(x), Some(y)) => Ok(Position::new(x, y)),
        _ => Err(ToolError::validation(format!(
            "{label}_x and {label}_y are required"
        ))),
    }
}

pub(crate) fn layout_spec(call: &NormalizedToolCall, ctx: &ExecContext) -> Result<LayoutSpec, ToolError> {
    if call.name == ToolName::ArrangeRelative {
        let args: RelativeArgs = call.params()?;
        return Ok(LayoutSpec::relational(relational_params(&args)?));
    }

    let ids = call.params::<Targets>()?.resolve(&ctx.selected_ids)?;
    let kind = match call.name {
        ToolName::ArrangeGrid => {
            let args: GridArgs = call.params()?;
            LayoutKind::Grid(GridParams {
                columns: args.columns,
                rows: args.rows,
                spacing: args.spacing.unwrap_or(DEFAULT_SPACING),
                cell_width: args.cell_width,
                cell_height: args.cell_height,
                origin_x: args.origin_x,
                origin_y: args.origin_y,
            })
        }
        ToolName::ArrangeCircle => {
            let args: CircleArgs = call.params()?;
            let defaults = CircularParams::default();
            LayoutKind::Circular(CircularParams {
                radius: args.radius.unwrap_or(defaults.radius),
                center: center(args.center_x, args.center_y)?,
                start_angle: args.start_angle.unwrap_or(defaults.start_angle),
            })
        }
        ToolName::ArrangeStar => {
            let args: StarArgs = call.params()?;
            let defaults = StarParams::default();
            LayoutKind::Star(StarParams {
                points: args.points.unwrap_or(defaults.points),
                outer_radius: args.outer_radius.unwrap_or(defaults.outer_radius),
                inner_radius: args.inner_radius,
                center: center(args.center_x, args.center_y)?,
                start_angle: args.start_angle.unwrap_or(defaults.start_angle),
            })
        }
        ToolName::ArrangeAlongPath => LayoutKind::Path(path_shape(&call.params()?)?),
        other => {
            return Err(ToolError::validation(format!("{other} is not an arrangement")));
        }
    };
    Ok(LayoutSpec::new(ids, kind))
}

fn path_shape(args: &PathArgs) -> Result<PathShape, ToolError> {
    let shape = match args.path_type.as_str() {
        "line" => PathShape::Line {
            start: point("start", args.start_x, args.start_y)?,
            end: point("end", args.end_x, args.end_y)?,
        },
        "arc" => PathShape::Arc {
            center: center(args.center_x, args.center_y)?,
            radius: args
                .radius
                .ok_or_else(|| ToolError::validation("arc path requires radius"))?,
            start_angle: args.start_angle.unwrap_or(0.0),
            end_angle: args.end_angle.unwrap_or(180.0),
        },
        "bezier" => PathShape::Bezier {
            start: point("start", args.start_x, args.start_y)?,
            control1: point("control1", args.control1_x, args.control1_y)?,
            control2: point("control2", args.control2_x, args.control2_y)?,
            end: point("end", args.end_x, args.end_y)?,
        },
        "spiral" => PathShape::Spiral {
            center: center(args.center_x, args.center_y)?,
            start_radius: args.start_radius.unwrap_or(0.0),
            end_radius: args
                .end_radius
                .ok_or_else(|| ToolError::validation("spiral path requires end_radius"))?,
            rotations: args.rotations.unwrap_or(1.0),
            start_angle: args.start_angle.unwrap_or(0.0),
        },
        other => {
            return Err(ToolError::validation(format!(
                "unknown path_type '{other}' (expected line, arc, bezier or spiral)"
            )))
        }
    };
    Ok(shape)
}

fn relation(args: &ConstraintArgs) -> Result<Relation, ToolError> {
    let reference = || {
        args.reference_id
            .or_else(|| args.reference_ids.as_ref().and_then(|ids| ids.first().copied()))
            .ok_or_else(|| {
                ToolError::validation(format!(
                    "{} constraint on object {} needs reference_id",
                    args.relation, args.object_id
                ))
            })
    };
    let relation = match args.relation.as_str() {
        "above" => Relation::Above(reference()?),
        "below" => Relation::Below(reference()?),
        "left_of" => Relation::LeftOf(reference()?),
        "right_of" => Relation::RightOf(reference()?),
        "aligned_horizontally_with" => Relation::AlignedHorizontallyWith(reference()?),
        "aligned_vertically_with" => Relation::AlignedVerticallyWith(reference()?),
        "centered_between" => match args.reference_ids.as_deref() {
            Some([a, b]) => Relation::CenteredBetween(*a, *b),
            _ => {
                return Err(ToolError::validation(format!(
                    "centered_between on object {} needs exactly two reference_ids",
                    args.object_id
                )))
            }
        },
        other => {
            return Err(ToolError::validation(format!("unknown relation '{other}'")));
        }
    };
    Ok(relation)
}

fn relational_params(args: &RelativeArgs) -> Result<RelationalParams, ToolError> {
    if args.constraints.is_empty() {
        return Err(ToolError::validation("arrange_relative needs at least one constraint"));
    }
    let constraints = args
        .constraints
        .iter()
        .map(|c| {
            Ok(Constraint {
                subject: c.object_id,
                relation: relation(c)?,
            })
        })
        .collect::<Result<Vec<_>, ToolError>>()?;
    Ok(RelationalParams {
        constraints,
        spacing: args.spacing.unwrap_or(DEFAULT_SPACING),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use canvaspilot_core::Viewport;
    use serde_json::json;
    use uuid::Uuid;

    fn ctx(selected: Vec<ObjectId>) -> ExecContext {
        ExecContext {
            canvas_id: Uuid::new_v4(),
            selected_ids: selected,
            current_color: "#000".to_string(),
            viewport: Viewport::default(),
            max_count: 200,
        }
    }

    fn call(name: ToolName, input: serde_json::Value) -> NormalizedToolCall {
        NormalizedToolCall {
            call_id: "c".to_string(),
            name,
            input: input.as_object().cloned().unwrap_or_default(),
        }
    }

    #[test]
    fn test_grid_spec_uses_selection_when_no_ids() {
        let spec = layout_spec(&call(ToolName::ArrangeGrid, json!({ "columns": 3 })), &ctx(vec![5, 6])).unwrap();
        assert_eq!(spec.ids, vec![5, 6]);
        match spec.kind {
            LayoutKind::Grid(p) => {
                assert_eq!(p.columns, Some(3));
                assert_eq!(p.spacing, 20.0);
            }
            other => panic!("unexpected kind {other:?}"),
        }
    }

    #[test]
    fn test_star_defaults() {
        let spec = layout_spec(&call(ToolName::ArrangeStar, json!({ "object_ids": [1, 2] })), &ctx(vec![])).unwrap();
        assert_eq!(spec.kind, LayoutKind::Star(StarParams::default()));
    }

    #[test]
    fn test_path_requires_endpoints() {
        let err = layout_spec(
            &call(ToolName::ArrangeAlongPath, json!({ "object_ids": [1], "path_type": "line", "start_x": 0 })),
            &ctx(vec![]),
        )
        .unwrap_err();
        assert!(matches!(err, ToolError::ValidationFailure(_)));

        let err = layout_spec(
            &call(ToolName::ArrangeAlongPath, json!({ "object_ids": [1], "path_type": "zigzag" })),
            &ctx(vec![]),
        )
        .unwrap_err();
        assert!(err.to_string().contains("zigzag"));
    }

    #[test]
    fn test_relational_spec_targets_subjects() {
        let spec = layout_spec(
            &call(
                ToolName::ArrangeRelative,
                json!({
                    "constraints": [
                        { "object_id": 2, "relation": "below", "reference_id": 1 },
                        { "object_id": 3, "relation": "centered_between", "reference_ids": [1, 2] },
                        { "object_id": 2, "relation": "right_of", "reference_ids": [4] }
                    ]
                }),
            ),
            &ctx(vec![9]),
        )
        .unwrap();
        assert_eq!(spec.ids, vec![2, 3]);
        match spec.kind {
            LayoutKind::Relational(p) => {
                assert_eq!(p.constraints[1].relation, Relation::CenteredBetween(1, 2));
                assert_eq!(p.constraints[2].relation, Relation::RightOf(4));
            }
            other => panic!("unexpected kind {other:?}"),
        }
    }

    #[test]
    fn test_centered_between_needs_two_references() {
        let err = layout_spec(
            &call(
                ToolName::ArrangeRelative,
                json!({ "constraints": [{ "object_id": 3, "relation": "centered_between", "reference_id": 1 }] }),
            ),
            &ctx(vec![]),
        )
        .unwrap_err();
        assert!(matches!(err, ToolError::ValidationFailure(_)));
    }
}
