//! canvaspilot Execution Supervisor
//!
//! Runs each command as an independent task under a wall-clock timeout and
//! guarantees at most one terminal outcome per command.

pub mod events;
pub mod fanout;
pub mod slot;
pub mod supervisor;

pub use events::CommandEvent;
pub use fanout::{canvas_messages, CanvasBus, CanvasMessage, CanvasMessageKind};
pub use slot::TerminalSlot;
pub use supervisor::{CommandHandle, CommandSupervisor, SupervisorSettings, DEFAULT_COMMAND_TIMEOUT};
