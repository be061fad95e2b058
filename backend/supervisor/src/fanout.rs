//! Shapes command results for canvas-scoped fan-out.

use std::collections::HashMap;
use std::sync::RwLock;

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tracing::debug;

use canvaspilot_core::{CanvasId, CanvasObject, ToolName, ToolResult, ToolValue};

const BUS_CAPACITY: usize = 256;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CanvasMessageKind {
    ObjectCreated,
    ObjectUpdated,
    ObjectDeleted,
}

/// One object change, as published to everyone viewing the canvas.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CanvasMessage {
    pub canvas_id: CanvasId,
    pub kind: CanvasMessageKind,
    pub object: CanvasObject,
}

/// One message per created, updated or deleted object, in result order.
/// Failed calls and selections produce nothing.
pub fn canvas_messages(canvas_id: CanvasId, results: &[ToolResult]) -> Vec<CanvasMessage> {
    let mut messages = Vec::new();
    for result in results {
        let Ok(value) = &result.result else {
            continue;
        };
        if matches!(value, ToolValue::Selection(_)) {
            continue;
        }
        let kind = match result.tool {
            tool if tool.is_creation() => CanvasMessageKind::ObjectCreated,
            ToolName::DeleteObject => CanvasMessageKind::ObjectDeleted,
            _ => CanvasMessageKind::ObjectUpdated,
        };
        messages.extend(value.objects().into_iter().map(|object| CanvasMessage {
            canvas_id,
            kind,
            object: object.clone(),
        }));
    }
    messages
}

/// Per-canvas broadcast hub for in-process subscribers.
#[derive(Debug, Default)]
pub struct CanvasBus {
    channels: RwLock<HashMap<CanvasId, broadcast::Sender<CanvasMessage>>>,
}

impl CanvasBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&self, canvas_id: CanvasId) -> broadcast::Receiver<CanvasMessage> {
        let mut channels = match self.channels.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        channels
            .entry(canvas_id)
            .or_insert_with(|| broadcast::channel(BUS_CAPACITY).0)
            .subscribe()
    }

    /// Returns how many subscribers received each message.
    pub fn publish(&self, messages: Vec<CanvasMessage>) -> usize {
        let channels = match self.channels.read() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        let mut delivered = 0;
        for message in messages {
            if let Some(tx) = channels.get(&message.canvas_id) {
                // No receivers is fine.
                delivered += tx.send(message).unwrap_or(0);
            }
        }
        debug!(delivered, "Canvas messages published");
        delivered
    }
}
