//! Structured logging for canvaspilot.
//!
//! Console and rolling NDJSON output, redaction of credentials in logged
//! text, and the per-command pipeline event log.

pub mod event_logger;
pub mod logger;
pub mod redact;

pub use event_logger::{EventLogEntry, EventLogger, PipelineEvent};
pub use logger::{init_logger, LogFormat, LoggerOptions};
pub use redact::redact_sensitive_data;
