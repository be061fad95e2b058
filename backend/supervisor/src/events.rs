use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use canvaspilot_core::{CanvasId, CommandOutcome};

/// Command lifecycle notification. Each command emits `Started` and then
/// at most one terminal event.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CommandEvent {
    Started {
        command_id: Uuid,
        canvas_id: CanvasId,
        text: String,
        at: DateTime<Utc>,
    },
    Completed {
        command_id: Uuid,
        canvas_id: CanvasId,
        summary: String,
        outcome: CommandOutcome,
        at: DateTime<Utc>,
    },
    Failed {
        command_id: Uuid,
        canvas_id: CanvasId,
        error: String,
        user_message: String,
        at: DateTime<Utc>,
    },
    TimedOut {
        command_id: Uuid,
        canvas_id: CanvasId,
        after_ms: u64,
        at: DateTime<Utc>,
    },
    Cancelled {
        command_id: Uuid,
        canvas_id: CanvasId,
        at: DateTime<Utc>,
    },
}

impl CommandEvent {
    pub fn command_id(&self) -> Uuid {
        match self {
            CommandEvent::Started { command_id, .. }
            | CommandEvent::Completed { command_id, .. }
            | CommandEvent::Failed { command_id, .. }
            | CommandEvent::TimedOut { command_id, .. }
            | CommandEvent::Cancelled { command_id, .. } => *command_id,
        }
    }

    pub fn canvas_id(&self) -> CanvasId {
        match self {
            CommandEvent::Started { canvas_id, .. }
            | CommandEvent::Completed { canvas_id, .. }
            | CommandEvent::Failed { canvas_id, .. }
            | CommandEvent::TimedOut { canvas_id, .. }
            | CommandEvent::Cancelled { canvas_id, .. } => *canvas_id,
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, CommandEvent::Started { .. })
    }

    pub fn kind(&self) -> &'static str {
        match self {
            CommandEvent::Started { .. } => "started",
            CommandEvent::Completed { .. } => "completed",
            CommandEvent::Failed { .. } => "failed",
            CommandEvent::TimedOut { .. } => "timed_out",
            CommandEvent::Cancelled { .. } => "cancelled",
        }
    }
}
