//! canvaspilot Command Dispatcher
//!
//! Turns one natural-language command into tool calls and executes them:
//! context building, provider call, normalization, batch execution.

pub mod dispatcher;
pub mod history;
pub mod prompt;

pub use dispatcher::{CommandDispatcher, DispatchPhase, DispatcherSettings};
pub use history::RecentInteractions;
pub use prompt::PromptBuilder;
