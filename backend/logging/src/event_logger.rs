//! Pipeline Event Logger
//!
//! One structured record per dispatcher phase, tool call, outcome or error,
//! keyed by command id and emitted on the `pipeline_events` target.

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::info;

use crate::redact::redact_sensitive_data;

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PipelineEvent {
    Phase {
        phase: String,
    },
    ToolCall {
        call_id: String,
        tool_name: String,
        arguments_json: String,
    },
    Outcome {
        summary: String,
    },
    Error {
        error_msg: String,
    },
}

impl PipelineEvent {
    fn redact(&mut self) {
        match self {
            PipelineEvent::ToolCall { arguments_json, .. } => {
                *arguments_json = redact_sensitive_data(arguments_json);
            }
            PipelineEvent::Outcome { summary } => {
                *summary = redact_sensitive_data(summary);
            }
            PipelineEvent::Error { error_msg } => {
                *error_msg = redact_sensitive_data(error_msg);
            }
            PipelineEvent::Phase { .. } => {}
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct EventLogEntry {
    pub command_id: String,
    pub timestamp: DateTime<Utc>,
    pub event: PipelineEvent,
}

pub struct EventLogger;

impl EventLogger {
    /// Redact and emit one event. Returns the entry as written.
    pub fn log_event(command_id: &str, mut event: PipelineEvent) -> EventLogEntry {
        event.redact();

        let entry = EventLogEntry {
            command_id: command_id.to_string(),
            timestamp: Utc::now(),
            event,
        };

        let json = serde_json::to_string(&entry).unwrap_or_default();
        info!(target: "pipeline_events", command_id = %entry.command_id, event = %json, "Pipeline event");
        entry
    }
}
