//! System prompt and per-command context block.

use std::fmt::Write as _;

use canvaspilot_core::{canvas_tools, CanvasObject, CommandRequest, ProviderRequest};

pub const DEFAULT_MAX_CONTEXT_OBJECTS: usize = 100;

const SYSTEM_PROMPT: &str = "You are the canvas assistant of a shared, real-time drawing board. \
You change the canvas only by calling the provided tools.

COORDINATES:
- Canvas pixels. +x points right, +y points down. (0, 0) is the top-left of the canvas.
- x/y of an object is its top-left corner. Angles are degrees; 0 is +x, 90 is straight down.

RULES:
1. Prefer one creation call with count > 1 over many identical calls.
2. When the user says \"this\", \"these\" or \"selected\", omit object ids: the selection is used.
3. Use the arrange_* tools for grids, circles, stars, paths and relative placement.
4. Only reference object ids that appear in the canvas state below.
5. If the request needs no change to the canvas, answer in plain text without calling tools.";

/// Builds the provider request for one command.
#[derive(Debug, Clone)]
pub struct PromptBuilder {
    max_context_objects: usize,
}

impl PromptBuilder {
    pub fn new(max_context_objects: usize) -> Self {
        Self { max_context_objects }
    }

    pub fn system_prompt(&self) -> &'static str {
        SYSTEM_PROMPT
    }

    /// Canvas state plus the user's command, as sent in the final user turn.
    pub fn build_prompt(&self, request: &CommandRequest, objects: &[CanvasObject]) -> String {
        let mut out = String::new();
        let ctx = &request.context;

        let _ = writeln!(out, "CANVAS STATE ({} objects):", objects.len());
        for object in objects.iter().take(self.max_context_objects) {
            let _ = writeln!(out, "- {}", describe(object));
        }
        if objects.len() > self.max_context_objects {
            let _ = writeln!(
                out,
                "- ... and {} more objects not shown",
                objects.len() - self.max_context_objects
            );
        }

        if request.selected_ids.is_empty() {
            let _ = writeln!(out, "SELECTED: none");
        } else {
            let ids: Vec<String> = request.selected_ids.iter().map(|id| format!("#{id}")).collect();
            let _ = writeln!(out, "SELECTED: {}", ids.join(", "));
        }
        let _ = writeln!(out, "CURRENT COLOR: {}", ctx.current_color);
        let vp = &ctx.viewport;
        let _ = writeln!(
            out,
            "VIEWPORT: x={:.0} y={:.0} width={:.0} height={:.0} (centre {})",
            vp.x,
            vp.y,
            vp.width,
            vp.height,
            vp.center()
        );
        let _ = write!(out, "\nCOMMAND: {}", request.text.trim());
        out
    }

    pub fn build_request(
        &self,
        request: &CommandRequest,
        objects: &[CanvasObject],
        max_tokens: u32,
        temperature: f32,
    ) -> ProviderRequest {
        ProviderRequest {
            system_prompt: SYSTEM_PROMPT.to_string(),
            prompt: self.build_prompt(request, objects),
            tools: canvas_tools(),
            context: request
                .context
                .recent
                .iter()
                .flat_map(|i| i.to_messages())
                .collect(),
            max_tokens,
            temperature,
        }
    }
}

impl Default for PromptBuilder {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_CONTEXT_OBJECTS)
    }
}

fn describe(object: &CanvasObject) -> String {
    let mut line = format!(
        "#{} {} at {} size {:.0}x{:.0}",
        object.id,
        object.kind,
        object.position,
        object.width(),
        object.height()
    );
    if let Some(fill) = object.fill() {
        let _ = write!(line, " fill={fill}");
    }
    if let Some(text) = object.text() {
        let shown: String = text.chars().take(40).collect();
        let _ = write!(line, " text={shown:?}");
    }
    if object.is_hidden() {
        line.push_str(" hidden");
    }
    line
}

#[cfg(test)]
mod tests {
    use super::*;
    use canvaspilot_core::{Interaction, ObjectKind, Position, Role};
    use chrono::Utc;
    use serde_json::json;
    use uuid::Uuid;

    fn object(id: i64, kind: ObjectKind) -> CanvasObject {
        let now = Utc::now();
        CanvasObject {
            id,
            canvas_id: Uuid::nil(),
            kind,
            position: Position::new(10.0, 20.0),
            render_data: json!({ "width": 30, "height": 40, "fill": "#abcdef", "text": "Hi" })
                .as_object()
                .cloned()
                .unwrap_or_default(),
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_prompt_lists_objects_selection_and_command() {
        let request = CommandRequest::new(Uuid::nil(), "  make it red ").with_selection(vec![7]);
        let prompt = PromptBuilder::default().build_prompt(&request, &[object(7, ObjectKind::Text)]);

        assert!(prompt.contains("CANVAS STATE (1 objects)"));
        assert!(prompt.contains("#7 text"));
        assert!(prompt.contains("fill=#abcdef"));
        assert!(prompt.contains("text=\"Hi\""));
        assert!(prompt.contains("SELECTED: #7"));
        assert!(prompt.contains("CURRENT COLOR: #4A90D9"));
        assert!(prompt.ends_with("COMMAND: make it red"));
    }

    #[test]
    fn test_prompt_truncates_long_canvases() {
        let objects: Vec<_> = (1..=5).map(|id| object(id, ObjectKind::Rectangle)).collect();
        let request = CommandRequest::new(Uuid::nil(), "tidy up");
        let prompt = PromptBuilder::new(2).build_prompt(&request, &objects);

        assert!(prompt.contains("#2 rectangle"));
        assert!(!prompt.contains("#3 rectangle"));
        assert!(prompt.contains("and 3 more objects"));
        assert!(prompt.contains("SELECTED: none"));
    }

    #[test]
    fn test_request_carries_tools_and_recent_history() {
        let mut request = CommandRequest::new(Uuid::nil(), "again");
        request
            .context
            .recent
            .push(Interaction::new("add a circle", "created 1, updated 0, deleted 0, 0 failed"));

        let built = PromptBuilder::default().build_request(&request, &[], 1024, 0.2);
        assert_eq!(built.tools.len(), canvas_tools().len());
        assert_eq!(built.context.len(), 2);
        assert_eq!(built.context[0].role, Role::User);
        assert_eq!(built.context[0].content, "add a circle");
        assert_eq!(built.max_tokens, 1024);
        assert!(built.system_prompt.contains("+y points down"));
    }
}
