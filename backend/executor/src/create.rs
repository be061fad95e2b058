use serde_json::Value;

use canvaspilot_core::{NormalizedToolCall, ObjectAttrs, ObjectKind, Position, ToolError};
use canvaspilot_layout::grid_cells;

use crate::executor::ExecContext;
use crate::params::{
    CreateParams, DEFAULT_CIRCLE_RADIUS, DEFAULT_FONT_SIZE, DEFAULT_RECT_SIZE, DEFAULT_SPACING,
};

/// Rough glyph box used to size text objects without a renderer.
const CHAR_WIDTH_RATIO: f64 = 0.6;
const LINE_HEIGHT_RATIO: f64 = 1.2;

/// Expand one creation call into `count` rows, laid out on a grid when
/// `count > 1`. Fails without producing rows if the parameters are invalid.
pub(crate) fn expand(call: &NormalizedToolCall, ctx: &ExecContext) -> Result<Vec<ObjectAttrs>, ToolError> {
    let kind = call
        .name
        .created_kind()
        .ok_or_else(|| ToolError::validation(format!("{} does not create objects", call.name)))?;
    let params: CreateParams = call.params()?;
    params.validate(ctx.max_count)?;

    let template = template(kind, &params, ctx)?;
    let (width, height) = (template.width(), template.height());

    // Default placement centres the first object on the viewport.
    let center = ctx.viewport.center();
    let origin = Position::new(
        params.x.unwrap_or(center.x - width / 2.0),
        params.y.unwrap_or(center.y - height / 2.0),
    );
    let spacing = params.spacing.unwrap_or(DEFAULT_SPACING);
    let cells = grid_cells(params.count as usize, params.columns, None)?;

    Ok(cells
        .into_iter()
        .map(|(col, row)| ObjectAttrs {
            position: origin.offset(
                col as f64 * (width + spacing),
                row as f64 * (height + spacing),
            ),
            ..template.clone()
        })
        .collect())
}

fn template(kind: ObjectKind, params: &CreateParams, ctx: &ExecContext) -> Result<ObjectAttrs, ToolError> {
    let fill = params
        .style
        .fill
        .clone()
        .unwrap_or_else(|| ctx.current_color.clone());
    let mut attrs = ObjectAttrs::new(kind, Position::default()).with("fill", fill);

    attrs = match kind {
        ObjectKind::Rectangle => attrs
            .with("width", params.width.unwrap_or(DEFAULT_RECT_SIZE))
            .with("height", params.height.unwrap_or(DEFAULT_RECT_SIZE)),
        ObjectKind::Circle => {
            let radius = params.radius.unwrap_or(DEFAULT_CIRCLE_RADIUS);
            attrs
                .with("radius", radius)
                .with("width", 2.0 * radius)
                .with("height", 2.0 * radius)
        }
        ObjectKind::Text => {
            let text = params
                .text
                .as_deref()
                .filter(|t| !t.is_empty())
                .ok_or_else(|| ToolError::validation("create_text requires non-empty text"))?;
            let font_size = params.font_size.unwrap_or(DEFAULT_FONT_SIZE);
            let chars = text.lines().map(|l| l.chars().count()).max().unwrap_or(1).max(1);
            let lines = text.lines().count().max(1);
            let mut attrs = attrs
                .with("text", text)
                .with("font_size", font_size)
                .with(
                    "width",
                    params.width.unwrap_or(chars as f64 * font_size * CHAR_WIDTH_RATIO),
                )
                .with(
                    "height",
                    params
                        .height
                        .unwrap_or(lines as f64 * font_size * LINE_HEIGHT_RATIO),
                );
            if let Some(family) = &params.font_family {
                attrs = attrs.with("font_family", family.as_str());
            }
            attrs
        }
    };

    let optional: [(&str, Option<Value>); 4] = [
        ("stroke", params.style.stroke.clone().map(Value::from)),
        ("stroke_width", params.style.stroke_width.map(Value::from)),
        ("opacity", params.style.opacity.map(Value::from)),
        ("rotation", params.style.rotation.map(Value::from)),
    ];
    for (key, value) in optional {
        if let Some(value) = value {
            attrs = attrs.with(key, value);
        }
    }
    Ok(attrs)
}
