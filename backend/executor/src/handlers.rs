//! Individual (non-batched) tool handlers.
//!
//! Multi-target calls apply to each target in order and stop at the first
//! failure; objects already changed stay changed.

use canvaspilot_core::{
    CanvasObject, NormalizedToolCall, ObjectId, ObjectKind, ObjectPatch, ObjectStore, Position,
    ToolError, ToolName, ToolValue,
};

use crate::arrange;
use crate::executor::ExecContext;
use crate::params::{
    check_positive, check_range, MoveParams, ResizeParams, RotateParams, SelectParams,
    StyleParams, Targets, ToggleParams, UpdateTextParams,
};

pub(crate) fn run(
    store: &dyn ObjectStore,
    call: &NormalizedToolCall,
    ctx: &ExecContext,
) -> Result<ToolValue, ToolError> {
    match call.name {
        ToolName::MoveObject => move_objects(store, call, ctx),
        ToolName::ResizeObject => resize_objects(store, call, ctx),
        ToolName::RotateObject => {
            let params: RotateParams = call.params()?;
            check_range("rotation", Some(params.rotation), 0.0, 360.0)?;
            let patch = ObjectPatch::default().set("rotation", params.rotation);
            patch_targets(store, call, ctx, |_| Ok(patch.clone()))
        }
        ToolName::UpdateStyle => update_style(store, call, ctx),
        ToolName::UpdateText => update_text(store, call, ctx),
        ToolName::DeleteObject => {
            let ids = targets(call, ctx)?;
            each_target(&ids, |id| Ok(store.delete_one(ctx.canvas_id, id)?))
        }
        ToolName::SelectObjects => select_objects(store, call, ctx),
        ToolName::ToggleVisibility => toggle_visibility(store, call, ctx),
        name if name.is_arrangement() => arrange::arrange(store, call, ctx),
        name => Err(ToolError::validation(format!(
            "{name} cannot run as an individual call"
        ))),
    }
}

fn targets(call: &NormalizedToolCall, ctx: &ExecContext) -> Result<Vec<ObjectId>, ToolError> {
    call.params::<Targets>()?.resolve(&ctx.selected_ids)
}

/// One target yields `Object`, several yield `ObjectList`.
pub(crate) fn each_target<F>(ids: &[ObjectId], mut apply: F) -> Result<ToolValue, ToolError>
where
    F: FnMut(ObjectId) -> Result<CanvasObject, ToolError>,
{
    let mut objects = ids
        .iter()
        .map(|id| apply(*id))
        .collect::<Result<Vec<_>, _>>()?;
    if objects.len() == 1 {
        Ok(ToolValue::Object(objects.remove(0)))
    } else {
        Ok(ToolValue::ObjectList(objects))
    }
}

/// Read each target, derive its patch, and write it back.
fn patch_targets<F>(
    store: &dyn ObjectStore,
    call: &NormalizedToolCall,
    ctx: &ExecContext,
    mut derive: F,
) -> Result<ToolValue, ToolError>
where
    F: FnMut(&CanvasObject) -> Result<ObjectPatch, ToolError>,
{
    let ids = targets(call, ctx)?;
    each_target(&ids, |id| {
        let current = store.get_object(ctx.canvas_id, id)?;
        let patch = derive(&current)?;
        Ok(store.update_one(ctx.canvas_id, id, &patch)?)
    })
}

fn move_objects(
    store: &dyn ObjectStore,
    call: &NormalizedToolCall,
    ctx: &ExecContext,
) -> Result<ToolValue, ToolError> {
    let params: MoveParams = call.params()?;
    if params.x.is_none() && params.y.is_none() {
        return Err(ToolError::validation("move_object needs x and/or y"));
    }
    patch_targets(store, call, ctx, |current| {
        let position = if params.use_delta {
            current
                .position
                .offset(params.x.unwrap_or(0.0), params.y.unwrap_or(0.0))
        } else {
            Position::new(
                params.x.unwrap_or(current.position.x),
                params.y.unwrap_or(current.position.y),
            )
        };
        Ok(ObjectPatch::move_to(position))
    })
}

fn resize_objects(
    store: &dyn ObjectStore,
    call: &NormalizedToolCall,
    ctx: &ExecContext,
) -> Result<ToolValue, ToolError> {
    let params: ResizeParams = call.params()?;
    params.validate()?;
    patch_targets(store, call, ctx, |current| {
        let (width, height) = match params.scale {
            Some(scale) => (current.width() * scale, current.height() * scale),
            None => (
                params.width.unwrap_or(current.width()),
                params.height.unwrap_or(current.height()),
            ),
        };
        let mut patch = ObjectPatch::default()
            .set("width", width)
            .set("height", height);
        if current.kind == ObjectKind::Circle {
            // Circles stay round: the larger dimension wins.
            let diameter = width.max(height);
            patch = patch
                .set("width", diameter)
                .set("height", diameter)
                .set("radius", diameter / 2.0);
        }
        Ok(patch)
    })
}

fn update_style(
    store: &dyn ObjectStore,
    call: &NormalizedToolCall,
    ctx: &ExecContext,
) -> Result<ToolValue, ToolError> {
    let style: StyleParams = call.params()?;
    style.validate()?;
    if style.is_empty() {
        return Err(ToolError::validation(
            "update_style needs at least one of fill, stroke, stroke_width, opacity, rotation",
        ));
    }
    let mut patch = ObjectPatch::default();
    if let Some(fill) = &style.fill {
        patch = patch.set("fill", fill.as_str());
    }
    if let Some(stroke) = &style.stroke {
        patch = patch.set("stroke", stroke.as_str());
    }
    if let Some(width) = style.stroke_width {
        patch = patch.set("stroke_width", width);
    }
    if let Some(opacity) = style.opacity {
        patch = patch.set("opacity", opacity);
    }
    if let Some(rotation) = style.rotation {
        patch = patch.set("rotation", rotation);
    }
    patch_targets(store, call, ctx, |_| Ok(patch.clone()))
}

fn update_text(
    store: &dyn ObjectStore,
    call: &NormalizedToolCall,
    ctx: &ExecContext,
) -> Result<ToolValue, ToolError> {
    let params: UpdateTextParams = call.params()?;
    check_positive("font_size", params.font_size)?;
    if params.text.is_none() && params.font_size.is_none() {
        return Err(ToolError::validation("update_text needs text and/or font_size"));
    }
    patch_targets(store, call, ctx, |current| {
        if current.kind != ObjectKind::Text {
            return Err(ToolError::validation(format!(
                "object {} is a {}, not a text object",
                current.id, current.kind
            )));
        }
        let mut patch = ObjectPatch::default();
        if let Some(text) = &params.text {
            patch = patch.set("text", text.as_str());
        }
        if let Some(size) = params.font_size {
            patch = patch.set("font_size", size);
        }
        Ok(patch)
    })
}

fn select_objects(
    store: &dyn ObjectStore,
    call: &NormalizedToolCall,
    ctx: &ExecContext,
) -> Result<ToolValue, ToolError> {
    let params: SelectParams = call.params()?;
    let kind = match params.kind.as_deref() {
        Some(k) => Some(
            ObjectKind::parse(k)
                .ok_or_else(|| ToolError::validation(format!("unknown object kind '{k}'")))?,
        ),
        None => None,
    };
    let fill = params.fill.as_deref().map(str::to_ascii_lowercase);
    let needle = params.text_contains.as_deref().map(str::to_lowercase);

    let ids = store
        .list_objects(ctx.canvas_id)?
        .into_iter()
        .filter(|o| kind.map_or(true, |k| o.kind == k))
        .filter(|o| {
            fill.as_deref()
                .map_or(true, |f| o.fill().map(str::to_ascii_lowercase).as_deref() == Some(f))
        })
        .filter(|o| {
            needle.as_deref().map_or(true, |n| {
                o.text().is_some_and(|t| t.to_lowercase().contains(n))
            })
        })
        .filter(|o| match params.in_viewport {
            Some(wanted) => ctx.viewport.contains(o.position) == wanted,
            None => true,
        })
        .map(|o| o.id)
        .collect();
    Ok(ToolValue::Selection(ids))
}

fn toggle_visibility(
    store: &dyn ObjectStore,
    call: &NormalizedToolCall,
    ctx: &ExecContext,
) -> Result<ToolValue, ToolError> {
    let params: ToggleParams = call.params()?;
    let current = store.get_object(ctx.canvas_id, params.object_id)?;
    let hidden = !current.is_hidden();
    let object = store.update_one(
        ctx.canvas_id,
        params.object_id,
        &ObjectPatch::default().set("hidden", hidden),
    )?;
    Ok(ToolValue::Toggle {
        object,
        enabled: !hidden,
    })
}
